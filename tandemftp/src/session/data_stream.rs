//! # Data Stream
//!
//! The socket under a control or data connection: plain tcp, or TLS for FTPS sessions

use std::io::{Read, Result, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

use super::tls::TlsStream;
use crate::{FtpError, FtpResult};

/// Data Stream used for communications. It can be both of type Tcp in case of plain communication or Ssl in case of FTPS
#[derive(Debug)]
pub enum DataStream<T>
where
    T: TlsStream,
{
    Tcp(TcpStream),
    Ssl(Box<T>),
}

impl<T> DataStream<T>
where
    T: TlsStream,
{
    /// Returns a reference to the underlying TcpStream.
    pub fn get_ref(&self) -> &TcpStream {
        match self {
            DataStream::Tcp(ref stream) => stream,
            DataStream::Ssl(ref stream) => stream.get_ref(),
        }
    }

    /// Another handle to the underlying socket, used to shut it down from a watcher thread
    pub(crate) fn tcp_handle(&self) -> FtpResult<TcpStream> {
        self.get_ref()
            .try_clone()
            .map_err(FtpError::ConnectionError)
    }

    /// Set the same timeout on reads and writes.
    /// The timeout applies to each call, so any progress renews it.
    pub(crate) fn set_timeout(&self, timeout: Option<Duration>) -> FtpResult<()> {
        let stream = self.get_ref();
        stream
            .set_read_timeout(timeout)
            .and_then(|_| stream.set_write_timeout(timeout))
            .map_err(FtpError::ConnectionError)
    }

    /// Shutdown both directions of the underlying socket
    pub(crate) fn shutdown(&self) {
        if let Err(err) = self.get_ref().shutdown(Shutdown::Both) {
            trace!("socket shutdown failed: {err}");
        }
    }
}

impl<T> Read for DataStream<T>
where
    T: TlsStream,
{
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        match self {
            DataStream::Tcp(ref mut stream) => stream.read(buf),
            DataStream::Ssl(ref mut stream) => stream.mut_ref().read(buf),
        }
    }
}

impl<T> Write for DataStream<T>
where
    T: TlsStream,
{
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        match self {
            DataStream::Tcp(ref mut stream) => stream.write(buf),
            DataStream::Ssl(ref mut stream) => stream.mut_ref().write(buf),
        }
    }

    fn flush(&mut self) -> Result<()> {
        match self {
            DataStream::Tcp(ref mut stream) => stream.flush(),
            DataStream::Ssl(ref mut stream) => stream.mut_ref().flush(),
        }
    }
}
