//! # Passive
//!
//! Negotiation of the data connection address: EPSV first, PASV as fallback

use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpStream};

use super::{ImplFtpSession, TlsStream};
use crate::cancel::CancelToken;
use crate::command::Command;
use crate::regex::{EPSV_PORT_RE, PASV_PORT_RE};
use crate::types::Response;
use crate::{FtpError, FtpResult, Status};

impl<T> ImplFtpSession<T>
where
    T: TlsStream,
{
    /// Get the address to connect the data connection to.
    ///
    /// EPSV is tried unless disabled or already failed in this session; on any EPSV failure PASV is used,
    /// now and for every following data connection.
    pub(crate) fn data_conn_addr(&mut self) -> FtpResult<SocketAddr> {
        if !self.config.disable_epsv && !self.skip_epsv {
            match self.epsv() {
                Ok(addr) => return Ok(addr),
                Err(err) => {
                    debug!("EPSV failed ({err}); using PASV for the rest of the session");
                    self.skip_epsv = true;
                }
            }
        }
        self.pasv()
    }

    /// Open the tcp socket of a data connection; the dial is abandoned if `token` fires
    pub(crate) fn open_data_conn(&mut self, token: &CancelToken) -> FtpResult<TcpStream> {
        let addr = self.data_conn_addr()?;
        debug!("Connecting to data channel at {addr}");
        self.config.dial(&addr.to_string(), token)
    }

    /// Runs the EPSV to enter Extended passive mode.
    fn epsv(&mut self) -> FtpResult<SocketAddr> {
        debug!("EPSV command");
        let response = self.roundtrip(Command::Epsv, &[Status::ExtendedPassiveMode])?;
        let port = parse_epsv_port(&response)?;
        trace!("Got port number from EPSV: {}", port);
        Ok(SocketAddr::new(self.host, port))
    }

    /// Runs the PASV command  to enter passive mode.
    fn pasv(&mut self) -> FtpResult<SocketAddr> {
        debug!("PASV command");
        let response = self.roundtrip(Command::Pasv, &[Status::PassiveMode])?;
        let addr = parse_passive_address(&response)?;
        trace!("Passive address: {addr}");
        Ok(addr)
    }
}

/// Parse the port of a `229 Entering Extended Passive Mode (|||port|)` reply
pub(crate) fn parse_epsv_port(response: &Response) -> FtpResult<u16> {
    let response_str = response.as_string().map_err(|_| FtpError::BadResponse)?;
    let caps = EPSV_PORT_RE
        .captures(&response_str)
        .ok_or(FtpError::BadResponse)?;
    caps[1].parse::<u16>().map_err(|_| FtpError::BadResponse)
}

/// Parse the address of a `227 Entering Passive Mode (h1,h2,h3,h4,p1,p2)` reply
pub(crate) fn parse_passive_address(response: &Response) -> FtpResult<SocketAddr> {
    let response_str = response.as_string().map_err(|_| FtpError::BadResponse)?;
    trace!("PASV response: {response_str}");
    let caps = PASV_PORT_RE
        .captures(&response_str)
        .ok_or(FtpError::BadResponse)?;
    let mut fields = [0u8; 6];
    for (i, field) in fields.iter_mut().enumerate() {
        *field = caps[i + 1]
            .parse::<u8>()
            .map_err(|_| FtpError::BadResponse)?;
    }
    let [oct1, oct2, oct3, oct4, msb, lsb] = fields;
    let ip = Ipv4Addr::new(oct1, oct2, oct3, oct4);
    let port = (u16::from(msb) << 8) | u16::from(lsb);

    Ok(SocketAddr::new(IpAddr::V4(ip), port))
}
