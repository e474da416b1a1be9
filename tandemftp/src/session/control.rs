//! # Control
//!
//! Line transport of the control connection: writes command lines and reads replies

use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::net::TcpStream;

use super::{DataStream, TlsStream};
use crate::command::Command;
use crate::types::Response;
use crate::{FtpError, FtpResult, Status};

/// The control connection of a session
pub(crate) struct ControlChannel<T>
where
    T: TlsStream,
{
    reader: BufReader<DataStream<T>>,
    /// Receives a copy of the raw traffic
    trace: Option<Box<dyn Write + Send>>,
}

impl<T> ControlChannel<T>
where
    T: TlsStream,
{
    pub fn new(stream: DataStream<T>, trace: Option<Box<dyn Write + Send>>) -> Self {
        Self {
            reader: BufReader::new(stream),
            trace,
        }
    }

    /// Write a command line
    pub fn perform(&mut self, command: &Command) -> FtpResult<()> {
        trace!("CC OUT: {}", command.log_line());
        let line = format!("{command}\r\n");
        self.tee(line.as_bytes());
        let stream = self.reader.get_mut();
        stream
            .write_all(line.as_bytes())
            .and_then(|_| stream.flush())
            .map_err(FtpError::ConnectionError)
    }

    /// Read a reply, failing with `UnexpectedResponse` if its status isn't `expected`
    pub fn read_response(&mut self, expected: Status) -> FtpResult<Response> {
        self.read_response_in(&[expected])
    }

    /// Read a reply, failing with `UnexpectedResponse` if its status isn't one of `expected`
    pub fn read_response_in(&mut self, expected: &[Status]) -> FtpResult<Response> {
        let response = self.read_reply()?;
        if expected.contains(&response.status) {
            Ok(response)
        } else {
            Err(FtpError::UnexpectedResponse(response))
        }
    }

    /// Read a whole reply, whatever its status.
    ///
    /// A reply whose first line is `xyz-` goes on until a line starting with `xyz ` (or just `xyz`).
    pub fn read_reply(&mut self) -> FtpResult<Response> {
        let mut line = Vec::new();
        self.read_line(&mut line)?;
        let mut body = line.clone();

        let code = code_from_buffer(&line)?;
        let status = Status::from(code);
        trace!("Code parsed from response: {} ({})", status, code);

        if line.get(3) == Some(&b'-') {
            let code = [line[0], line[1], line[2]];
            loop {
                line.clear();
                self.read_line(&mut line)?;
                body.extend(line.iter());
                if line.starts_with(&code) && line.get(3) != Some(&b'-') {
                    break;
                }
            }
        }

        Ok(Response::new(status, body))
    }

    /// Another handle to the control socket
    pub fn tcp_handle(&self) -> FtpResult<TcpStream> {
        self.reader.get_ref().tcp_handle()
    }

    /// Shutdown the control socket
    pub fn shutdown(&self) {
        self.reader.get_ref().shutdown();
    }

    /// Read bytes from reader until 0x0A is found. EOF is an error
    fn read_line(&mut self, line: &mut Vec<u8>) -> FtpResult<()> {
        let read = self
            .reader
            .read_until(0x0A, line)
            .map_err(FtpError::ConnectionError)?;
        if read == 0 {
            return Err(FtpError::ConnectionError(
                std::io::Error::new(ErrorKind::UnexpectedEof, "control connection closed"),
            ));
        }
        trace!("CC IN: {}", String::from_utf8_lossy(line).trim_end());
        self.tee(line);
        Ok(())
    }

    fn tee(&mut self, bytes: &[u8]) {
        if let Some(trace) = self.trace.as_mut() {
            if let Err(err) = trace.write_all(bytes) {
                error!("failed to write control trace: {err}");
            }
        }
    }
}

/// Get the reply code from the first three bytes of a line
fn code_from_buffer(buf: &[u8]) -> FtpResult<u32> {
    let code = buf.get(0..3).ok_or(FtpError::BadResponse)?;
    if !code.iter().all(u8::is_ascii_digit) {
        return Err(FtpError::BadResponse);
    }
    std::str::from_utf8(code)
        .map_err(|_| FtpError::BadResponse)?
        .parse::<u32>()
        .map_err(|_| FtpError::BadResponse)
}
