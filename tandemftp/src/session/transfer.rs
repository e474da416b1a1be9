//! # Transfer
//!
//! Commands carrying their payload on a data connection: retrieval, upload and listings

use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

use chrono::Utc;

use super::{DataStream, ImplFtpSession, TlsStream};
use crate::cancel::{CancelToken, Watch};
use crate::command::Command;
use crate::list::{parse_list_line, parse_mlsx_line, Entry, ListingParser};
use crate::types::Response;
use crate::{FtpError, FtpResult, Status};

/// Size of the chunks written on the data connection
const CHUNK_SIZE: usize = 8 * 1024;

/// A readable data connection with an explicit close
pub trait TransferStream: Read {
    /// Close the data connection and read the reply which ends the transfer.
    /// Closing an already closed stream does nothing.
    fn close(&mut self) -> FtpResult<()>;

    /// Set the longest silence tolerated on the data connection before a read fails.
    /// The window restarts on every read.
    fn set_timeout(&self, timeout: Option<Duration>) -> FtpResult<()>;
}

/// An open data connection.
///
/// It holds the session until it's closed or dropped, so no other command can be sent meanwhile.
/// Dropping it without closing closes it anyway, logging any error.
pub struct Retrieval<'a, T>
where
    T: TlsStream,
{
    session: &'a mut ImplFtpSession<T>,
    stream: Option<DataStream<T>>,
    watch: Option<Watch>,
    token: CancelToken,
}

impl<'a, T> Retrieval<'a, T>
where
    T: TlsStream,
{
    /// `victim` is a handle to the socket under `stream`, shut down if `token` fires
    fn new(
        session: &'a mut ImplFtpSession<T>,
        stream: DataStream<T>,
        victim: TcpStream,
        token: &CancelToken,
    ) -> Self {
        Self {
            session,
            stream: Some(stream),
            watch: Some(Watch::spawn(token, victim)),
            token: token.clone(),
        }
    }

    /// Copy `reader` into the data connection
    fn upload<R>(&mut self, reader: &mut R) -> FtpResult<u64>
    where
        R: Read,
    {
        let Some(stream) = self.stream.as_mut() else {
            return Ok(0);
        };
        let mut buffer = vec![0; CHUNK_SIZE];
        let mut written: u64 = 0;
        loop {
            self.token.check()?;
            let read = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(read) => read,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(FtpError::ConnectionError(err)),
            };
            stream
                .write_all(&buffer[..read])
                .map_err(|err| transfer_error(&self.token, err))?;
            written += read as u64;
        }
        stream
            .flush()
            .map_err(|err| transfer_error(&self.token, err))?;

        Ok(written)
    }

    /// Close the data connection, then read the final reply.
    /// Returns `None` if the stream was already closed.
    fn finish(&mut self, expected: &[Status]) -> FtpResult<Option<Response>> {
        let Some(stream) = self.stream.take() else {
            return Ok(None);
        };
        debug!("Finalizing data stream");
        // the watcher holds a handle to the socket too: both must go for the socket to be closed
        let watch = self.watch.take();
        drop(stream);
        drop(watch);
        trace!("dropped stream");
        self.session
            .guarded(&self.token, |session| {
                session.control.read_response_in(expected)
            })
            .map(Some)
    }

    /// Map an io error from the data connection, telling cancellation apart
    fn error(&self, err: io::Error) -> FtpError {
        transfer_error(&self.token, err)
    }
}

impl<T> Read for Retrieval<'_, T>
where
    T: TlsStream,
{
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let Some(stream) = self.stream.as_mut() else {
            return Ok(0);
        };
        let result = stream.read(buf);
        if self.token.is_cancelled() {
            return Err(io::Error::other(FtpError::Cancelled));
        }
        result
    }
}

impl<T> TransferStream for Retrieval<'_, T>
where
    T: TlsStream,
{
    fn close(&mut self) -> FtpResult<()> {
        self.finish(&[
            Status::ClosingDataConnection,
            Status::RequestedFileActionOk,
        ])
        .map(|_| ())
    }

    fn set_timeout(&self, timeout: Option<Duration>) -> FtpResult<()> {
        match self.stream.as_ref() {
            Some(stream) => stream.set_timeout(timeout),
            None => Ok(()),
        }
    }
}

impl<T> Drop for Retrieval<'_, T>
where
    T: TlsStream,
{
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            error!("Failed to close data stream: {err}");
        }
    }
}

fn transfer_error(token: &CancelToken, err: io::Error) -> FtpError {
    if token.is_cancelled() {
        FtpError::Cancelled
    } else {
        FtpError::ConnectionError(err)
    }
}

impl<T> ImplFtpSession<T>
where
    T: TlsStream,
{
    /// Retrieve the file at `path`.
    ///
    /// ```rust,ignore
    /// use std::io::Read;
    /// use tandemftp::TransferStream;
    ///
    /// let mut stream = session.retr(&token, "readme.txt")?;
    /// let mut text = String::new();
    /// stream.read_to_string(&mut text)?;
    /// stream.close()?;
    /// ```
    pub fn retr(&mut self, token: &CancelToken, path: &str) -> FtpResult<Retrieval<'_, T>> {
        self.retr_from(token, path, 0)
    }

    /// Retrieve the file at `path`, skipping its first `offset` bytes
    pub fn retr_from(
        &mut self,
        token: &CancelToken,
        path: &str,
        offset: u64,
    ) -> FtpResult<Retrieval<'_, T>> {
        debug!("Retrieving '{path}' from offset {offset}");
        self.data_command(token, offset, Command::Retr(path.to_string()))
    }

    /// Simple way to retr a file from the server. This stores the file in a buffer in memory.
    pub fn retr_as_buffer(&mut self, token: &CancelToken, path: &str) -> FtpResult<Vec<u8>> {
        let mut stream = self.retr(token, path)?;
        let mut buffer = Vec::new();
        stream
            .read_to_end(&mut buffer)
            .map_err(|err| stream.error(err))?;
        stream.close()?;
        Ok(buffer)
    }

    /// Store the content of `reader` as the file at `path`.
    /// Returns the status of the reply ending the transfer.
    pub fn put_file<R>(&mut self, token: &CancelToken, path: &str, reader: &mut R) -> FtpResult<Status>
    where
        R: Read,
    {
        self.put_file_from(token, path, reader, 0)
    }

    /// Store the content of `reader` in the file at `path`, starting at `offset`
    pub fn put_file_from<R>(
        &mut self,
        token: &CancelToken,
        path: &str,
        reader: &mut R,
        offset: u64,
    ) -> FtpResult<Status>
    where
        R: Read,
    {
        debug!("Put file {path} from offset {offset}");
        let mut stream = self.data_command(token, offset, Command::Store(path.to_string()))?;
        let copied = stream.upload(reader);
        let finished = stream.finish(&[Status::ClosingDataConnection]);
        let written = copied?;
        debug!("Written {written} bytes to {path}");
        finished?
            .map(|response| response.status)
            .ok_or(FtpError::BadResponse)
    }

    /// List the entries of the directory at `path` (the working directory if `None`).
    ///
    /// `MLSD` is used when the server advertises `MLST`, `LIST` otherwise.
    /// Lines which can't be parsed are skipped.
    pub fn list(&mut self, token: &CancelToken, path: Option<&str>) -> FtpResult<Vec<Entry>> {
        debug!("Reading {} directory content", path.unwrap_or("working"));
        let path = path.map(|x| x.to_string());
        let (command, parser): (Command, ListingParser) = if self.mlsd_supported {
            (Command::Mlsd(path), parse_mlsx_line)
        } else {
            (Command::List(path), parse_list_line)
        };
        let now = Utc::now();
        let tz = self.config.time_zone;
        let mut entries = Vec::new();
        self.stream_lines(token, command, |line| match parser(line, now, tz) {
            Ok(entry) => entries.push(entry),
            Err(err) => trace!("Skipping listing line '{line}': {err}"),
        })?;

        Ok(entries)
    }

    /// List the names in the directory at `path` (the working directory if `None`)
    pub fn nlst(&mut self, token: &CancelToken, path: Option<&str>) -> FtpResult<Vec<String>> {
        debug!("Getting file names for {} directory", path.unwrap_or("working"));
        let mut names = Vec::new();
        self.stream_lines(
            token,
            Command::Nlst(path.map(|x| x.to_string())),
            |line| names.push(line.to_string()),
        )?;

        Ok(names)
    }

    /// Open a data connection for `command`.
    ///
    /// The address is negotiated with EPSV/PASV, then `REST` is sent if `offset` isn't 0,
    /// then the command, whose preliminary reply must be 125 or 150.
    pub(crate) fn data_command(
        &mut self,
        token: &CancelToken,
        offset: u64,
        command: Command,
    ) -> FtpResult<Retrieval<'_, T>> {
        // the socket handle is taken before the command is sent, so an open transfer always gets a watcher
        let (stream, victim) = self.guarded(token, |session| {
            let tcp = session.open_data_conn(token)?;
            let victim = tcp.try_clone().map_err(FtpError::ConnectionError)?;
            match session.start_transfer(tcp, offset, command) {
                Ok(stream) => Ok((stream, victim)),
                Err(err) => {
                    if let Err(err) = victim.shutdown(Shutdown::Both) {
                        trace!("failed to close data connection: {err}");
                    }
                    Err(err)
                }
            }
        })?;
        Ok(Retrieval::new(self, stream, victim, token))
    }

    fn start_transfer(
        &mut self,
        tcp: TcpStream,
        offset: u64,
        command: Command,
    ) -> FtpResult<DataStream<T>> {
        if offset != 0 {
            self.roundtrip(Command::Rest(offset), &[Status::RequestFilePending])?;
        }
        self.control.perform(&command)?;
        self.control
            .read_response_in(&[Status::AlreadyOpen, Status::AboutToSend])?;
        // set before wrapping, so the TLS handshake is bounded too
        tcp.set_read_timeout(self.config.data_timeout)
            .and_then(|_| tcp.set_write_timeout(self.config.data_timeout))
            .map_err(FtpError::ConnectionError)?;
        self.config.wrap(tcp)
    }

    /// Run `command` and pass every line of its data connection to `on_line`.
    /// The idle timeout is renewed on every line, and the token checked after every line.
    fn stream_lines<F>(&mut self, token: &CancelToken, command: Command, mut on_line: F) -> FtpResult<()>
    where
        F: FnMut(&str),
    {
        let mut stream = self.data_command(token, 0, command)?;
        let timeout = stream.session.config.data_timeout;
        let mut reader = BufReader::new(&mut stream);
        let mut line = Vec::new();
        loop {
            reader.get_ref().set_timeout(timeout)?;
            line.clear();
            match reader.read_until(b'\n', &mut line) {
                Ok(0) => break,
                Ok(_) => {}
                Err(err) => return Err(reader.get_ref().error(err)),
            }
            token.check()?;
            let text = String::from_utf8_lossy(&line);
            let text = text.trim_end_matches(['\r', '\n']);
            if text.is_empty() {
                continue;
            }
            trace!("STREAM IN: {text}");
            on_line(text);
        }
        drop(reader);
        stream.close()
    }
}
