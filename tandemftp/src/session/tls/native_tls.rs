//! # Native tls
//!
//! Native tls implementation of TLS types

use std::net::TcpStream;

use native_tls::{TlsConnector, TlsStream};

use super::{TlsConnector as FtpTlsConnector, TlsStream as FtpTlsStream};
use crate::{FtpError, FtpResult};

#[derive(Debug)]
/// A Wrapper for the tls connector
pub struct NativeTlsConnector {
    connector: TlsConnector,
}

impl From<TlsConnector> for NativeTlsConnector {
    fn from(connector: TlsConnector) -> Self {
        Self { connector }
    }
}

impl FtpTlsConnector for NativeTlsConnector {
    type Stream = NativeTlsStream;

    fn connect(&self, domain: &str, stream: TcpStream) -> FtpResult<Self::Stream> {
        self.connector
            .connect(domain, stream)
            .map(NativeTlsStream::from)
            .map_err(|e| FtpError::SecureError(format!("{e}")))
    }
}

/// Tls stream wrapper, shutting down the TLS session on drop
#[derive(Debug)]
pub struct NativeTlsStream {
    stream: TlsStream<TcpStream>,
}

impl FtpTlsStream for NativeTlsStream {
    type InnerStream = TlsStream<TcpStream>;

    fn get_ref(&self) -> &TcpStream {
        self.stream.get_ref()
    }

    fn mut_ref(&mut self) -> &mut Self::InnerStream {
        &mut self.stream
    }
}

impl From<TlsStream<TcpStream>> for NativeTlsStream {
    fn from(stream: TlsStream<TcpStream>) -> Self {
        Self { stream }
    }
}

impl Drop for NativeTlsStream {
    fn drop(&mut self) {
        if let Err(err) = self.stream.shutdown() {
            debug!("Failed to shutdown TLS stream: {err}");
        } else {
            trace!("TLS stream shut down");
        }
    }
}
