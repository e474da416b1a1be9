//! # Directory
//!
//! Navigation and file management commands

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use super::{ImplFtpSession, TlsStream};
use crate::cancel::CancelToken;
use crate::command::Command;
use crate::regex::{MDTM_RE, SIZE_RE};
use crate::{FtpError, FtpResult, Status};

impl<T> ImplFtpSession<T>
where
    T: TlsStream,
{
    /// Change the current directory to the path specified.
    pub fn cwd(&mut self, token: &CancelToken, path: &str) -> FtpResult<Status> {
        debug!("Changing working directory to {path}");
        self.guarded(token, |session| {
            session
                .roundtrip(
                    Command::Cwd(path.to_string()),
                    &[Status::RequestedFileActionOk],
                )
                .map(|response| response.status)
        })
    }

    /// Move the current directory to the parent directory.
    pub fn cdup(&mut self, token: &CancelToken) -> FtpResult<Status> {
        debug!("Going to parent directory");
        self.guarded(token, |session| {
            session
                .roundtrip(
                    Command::Cdup,
                    &[Status::CommandOk, Status::RequestedFileActionOk],
                )
                .map(|response| response.status)
        })
    }

    /// Gets the current directory
    pub fn pwd(&mut self, token: &CancelToken) -> FtpResult<String> {
        debug!("Getting working directory");
        self.guarded(token, |session| {
            let response = session.roundtrip(Command::Pwd, &[Status::PathCreated])?;
            let body = response.as_string().map_err(|_| FtpError::BadResponse)?;
            match (body.find('"'), body.rfind('"')) {
                (Some(begin), Some(end)) if begin < end => Ok(body[begin + 1..end].to_string()),
                _ => Err(FtpError::BadResponse),
            }
        })
    }

    /// Retrieves the size of the file in bytes at `path` if it exists.
    pub fn size(&mut self, token: &CancelToken, path: &str) -> FtpResult<u64> {
        debug!("Getting file size for {path}");
        self.guarded(token, |session| {
            let response = session.roundtrip(Command::Size(path.to_string()), &[Status::File])?;
            let body = response.as_string().map_err(|_| FtpError::BadResponse)?;
            let caps = SIZE_RE.captures(&body).ok_or(FtpError::BadResponse)?;
            caps[1].parse::<u64>().map_err(|_| FtpError::BadResponse)
        })
    }

    /// Retrieves the modification time of the file at `path` if it exists.
    pub fn mdtm(&mut self, token: &CancelToken, path: &str) -> FtpResult<NaiveDateTime> {
        debug!("Getting modification time for {path}");
        self.guarded(token, |session| {
            let response = session.roundtrip(Command::Mdtm(path.to_string()), &[Status::File])?;
            let body = response.as_string().map_err(|_| FtpError::BadResponse)?;
            let caps = MDTM_RE.captures(&body).ok_or(FtpError::BadResponse)?;
            let field = |i: usize| caps[i].parse::<u32>().map_err(|_| FtpError::BadResponse);
            let year = caps[1].parse::<i32>().map_err(|_| FtpError::BadResponse)?;
            let date = NaiveDate::from_ymd_opt(year, field(2)?, field(3)?)
                .ok_or(FtpError::BadResponse)?;
            let time = NaiveTime::from_hms_opt(field(4)?, field(5)?, field(6)?)
                .ok_or(FtpError::BadResponse)?;
            Ok(NaiveDateTime::new(date, time))
        })
    }

    /// Renames the file from_name to to_name
    pub fn rename(&mut self, token: &CancelToken, from_name: &str, to_name: &str) -> FtpResult<Status> {
        debug!("Renaming '{from_name}' to '{to_name}'");
        self.guarded(token, |session| {
            session.roundtrip(
                Command::RenameFrom(from_name.to_string()),
                &[Status::RequestFilePending],
            )?;
            session
                .roundtrip(
                    Command::RenameTo(to_name.to_string()),
                    &[Status::RequestedFileActionOk],
                )
                .map(|response| response.status)
        })
    }

    /// Remove the remote file from the server.
    pub fn rm(&mut self, token: &CancelToken, path: &str) -> FtpResult<Status> {
        debug!("Removing file {path}");
        self.guarded(token, |session| {
            session
                .roundtrip(
                    Command::Dele(path.to_string()),
                    &[Status::RequestedFileActionOk],
                )
                .map(|response| response.status)
        })
    }

    /// This creates a new directory on the server.
    pub fn mkdir(&mut self, token: &CancelToken, path: &str) -> FtpResult<Status> {
        debug!("Creating directory at {path}");
        self.guarded(token, |session| {
            session
                .roundtrip(Command::Mkd(path.to_string()), &[Status::PathCreated])
                .map(|response| response.status)
        })
    }

    /// Removes the remote directory at `path`, which must be empty.
    pub fn rmdir(&mut self, token: &CancelToken, path: &str) -> FtpResult<Status> {
        debug!("Removing directory {path}");
        self.guarded(token, |session| {
            session
                .roundtrip(
                    Command::Rmd(path.to_string()),
                    &[Status::RequestedFileActionOk],
                )
                .map(|response| response.status)
        })
    }

    /// Remove the directory at `path` with all its content.
    ///
    /// Subdirectories are emptied and removed first; the directory itself goes last.
    /// The first failure stops the removal: whatever was deleted until then stays deleted.
    /// On success returns the status of the last `RMD`.
    pub fn rmdir_recursive(&mut self, token: &CancelToken, path: &str) -> FtpResult<Status> {
        debug!("Removing directory tree {path}");
        self.cwd(token, path)?;
        let current = self.pwd(token)?;
        let entries = self.list(token, None)?;
        for entry in entries
            .iter()
            .filter(|entry| entry.name() != "." && entry.name() != "..")
        {
            if entry.is_directory() {
                let child = format!("{}/{}", current.trim_end_matches('/'), entry.name());
                self.rmdir_recursive(token, &child)?;
            } else {
                self.rm(token, entry.name())?;
            }
        }
        self.cdup(token)?;
        self.rmdir(token, &current)
    }
}
