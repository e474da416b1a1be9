//! # Session
//!
//! The FTP session: one control connection and, at most, one data connection at a time.
//!
//! Every operation takes a [`CancelToken`]: firing it aborts the pending operation, which then returns
//! [`FtpError::Cancelled`]. An operation cancelled while waiting on the control connection leaves the session unusable.

mod control;
mod data_stream;
mod directory;
mod passive;
mod tls;
mod transfer;

use std::net::{IpAddr, Shutdown};
use std::time::Duration;

use self::control::ControlChannel;
pub use self::data_stream::DataStream;
#[cfg(feature = "secure")]
pub use self::tls::TlsConnector;
pub use self::tls::{NoTlsStream, TlsStream};
#[cfg(feature = "native-tls")]
pub use self::tls::{NativeTlsConnector, NativeTlsStream};
#[cfg(feature = "rustls")]
pub use self::tls::{RustlsConnector, RustlsStream};
pub use self::transfer::{Retrieval, TransferStream};
use crate::cancel::{self, CancelToken};
use crate::command::feat::parse_features;
#[cfg(feature = "secure")]
use crate::command::ProtectionLevel;
use crate::command::Command;
use crate::types::{FileType, Features, Response};
use crate::{FtpError, FtpResult, SessionConfig, Status};

/// Longest wait for the server goodbye on quit
const GOODBYE_TIMEOUT: Duration = Duration::from_secs(1);

/// Stream to interface with the FTP server.
/// Use the [`crate::FtpSession`] alias for plain sessions, or one of the TLS aliases for FTPS.
pub struct ImplFtpSession<T>
where
    T: TlsStream,
{
    control: ControlChannel<T>,
    /// Address of the server, used to reach the port announced by EPSV
    host: IpAddr,
    features: Features,
    /// Set once EPSV fails; PASV is used for the rest of the session
    skip_epsv: bool,
    mlsd_supported: bool,
    welcome_msg: Option<String>,
    config: SessionConfig<T>,
}

impl<T> ImplFtpSession<T>
where
    T: TlsStream,
{
    /// Connect to `addr` (`host:port`) and wait for the server to be ready.
    ///
    /// The control connection is the stream of `config` if any, else it's dialed with the connect function
    /// or with the connect timeout of `config`. When `config` carries a TLS connector and no connect function,
    /// the connection is secured before the greeting is read. Once the server is ready, its features are discovered with `FEAT`.
    ///
    /// ```rust,ignore
    /// use tandemftp::{CancelToken, FtpSession, SessionConfig};
    ///
    /// let token = CancelToken::new();
    /// let mut session = FtpSession::connect("127.0.0.1:10021", SessionConfig::default(), &token).unwrap();
    /// session.login(&token, "test", "test").unwrap();
    /// session.quit(&token).unwrap();
    /// ```
    pub fn connect(addr: &str, mut config: SessionConfig<T>, token: &CancelToken) -> FtpResult<Self> {
        debug!("Connecting to server {addr}");
        let stream = match config.stream.take() {
            Some(stream) => stream,
            None => config.dial(addr, token)?,
        };
        debug!("Established connection with server");
        let host = stream.peer_addr().map_err(FtpError::ConnectionError)?.ip();
        let victim = stream.try_clone().map_err(FtpError::ConnectionError)?;
        let watched = victim.try_clone().map_err(FtpError::ConnectionError)?;
        let trace = config.trace.take();

        let result = cancel::guard(token, watched, move || {
            let control = ControlChannel::new(config.wrap(stream)?, trace);
            let mut session = Self {
                control,
                host,
                features: Features::new(),
                skip_epsv: false,
                mlsd_supported: false,
                welcome_msg: None,
                config,
            };
            debug!("Reading server response...");
            let response = session.control.read_response(Status::Ready)?;
            let welcome_msg = response.as_string().ok();
            debug!("Server READY; response: {:?}", welcome_msg);
            session.welcome_msg = welcome_msg;
            session.discover_features()?;
            Ok(session)
        });
        if let Err(err) = result.as_ref() {
            error!("Failed to establish session with {addr}: {err}");
            if let Err(err) = victim.shutdown(Shutdown::Both) {
                trace!("failed to close control connection: {err}");
            }
        }

        result
    }

    /// Log in to the server.
    ///
    /// `USER` is sent first; the password is sent only if the server asks for it.
    /// Then the transfer type is set to binary and, if the server supports it, UTF-8 is turned on.
    /// On secure sessions the data connections are protected with `PBSZ 0` and `PROT P`; errors on these are ignored.
    pub fn login(&mut self, token: &CancelToken, user: &str, password: &str) -> FtpResult<()> {
        debug!("Signin in with user '{user}'");
        self.guarded(token, |session| {
            let response = session.roundtrip(
                Command::User(user.to_string()),
                &[Status::LoggedIn, Status::NeedPassword],
            )?;
            if response.status == Status::NeedPassword {
                debug!("Password required");
                session.roundtrip(Command::Pass(password.to_string()), &[Status::LoggedIn])?;
            }
            debug!("Login OK");
            session.roundtrip(Command::Type(FileType::Binary), &[Status::CommandOk])?;
            let utf8 = session.set_utf8();
            #[cfg(feature = "secure")]
            if session.config.is_secure() {
                session.protect_data_channel();
            }
            utf8
        })
    }

    /// Send a command line and read its reply.
    /// With `expected` set, any other reply status fails with [`FtpError::UnexpectedResponse`].
    pub fn execute(
        &mut self,
        token: &CancelToken,
        expected: Option<Status>,
        command: &str,
    ) -> FtpResult<Response> {
        debug!("Executing command {command}");
        self.guarded(token, |session| {
            session.control.perform(&Command::Custom(command.to_string()))?;
            match expected {
                Some(status) => session.control.read_response(status),
                None => session.control.read_reply(),
            }
        })
    }

    /// This does nothing. This is usually just used to keep the connection open.
    pub fn noop(&mut self, token: &CancelToken) -> FtpResult<()> {
        debug!("Pinging server");
        self.guarded(token, |session| {
            session
                .roundtrip(Command::Noop, &[Status::CommandOk])
                .map(|_| ())
        })
    }

    /// Log out the current user with `REIN`, keeping the connection open.
    /// Many servers don't implement it and reply 502.
    pub fn logout(&mut self, token: &CancelToken) -> FtpResult<()> {
        debug!("Logging out");
        self.guarded(token, |session| {
            session
                .roundtrip(Command::Rein, &[Status::Ready])
                .map(|_| ())
        })
    }

    /// Sets the type of file to be transferred. That is the implementation
    /// of `TYPE` command.
    pub fn transfer_type(&mut self, token: &CancelToken, file_type: FileType) -> FtpResult<()> {
        debug!("Setting transfer type {}", file_type);
        self.guarded(token, |session| {
            session
                .roundtrip(Command::Type(file_type), &[Status::CommandOk])
                .map(|_| ())
        })
    }

    /// Quits the current FTP session and closes the control connection.
    /// The server goodbye is read if it comes within a second; the session can't be used anymore afterwards.
    pub fn quit(&mut self, token: &CancelToken) -> FtpResult<()> {
        debug!("Quitting stream");
        let result = self.guarded(token, |session| {
            session.control.perform(&Command::Quit)?;
            if let Err(err) = session
                .control
                .tcp_handle()
                .and_then(|socket| {
                    socket
                        .set_read_timeout(Some(GOODBYE_TIMEOUT))
                        .map_err(FtpError::ConnectionError)
                })
                .and_then(|_| session.control.read_response(Status::Closing))
            {
                debug!("No goodbye from server: {err}");
            }
            Ok(())
        });
        self.control.shutdown();
        result
    }

    /// Returns welcome message retrieved from server (if available)
    pub fn welcome_msg(&self) -> Option<&str> {
        self.welcome_msg.as_deref()
    }

    /// Features advertised by the server on connect
    pub fn features(&self) -> &Features {
        &self.features
    }

    /// Whether the connections of this session are secured with TLS
    pub fn is_secure(&self) -> bool {
        self.config.is_secure()
    }

    // -- private

    /// Run `op` while watching `token`; if it fires, the control connection is shut down
    pub(crate) fn guarded<R, F>(&mut self, token: &CancelToken, op: F) -> FtpResult<R>
    where
        F: FnOnce(&mut Self) -> FtpResult<R>,
    {
        let victim = self.control.tcp_handle()?;
        cancel::guard(token, victim, || op(self))
    }

    /// Send a command and read a reply with one of the `expected` statuses
    pub(crate) fn roundtrip(&mut self, command: Command, expected: &[Status]) -> FtpResult<Response> {
        self.control.perform(&command)?;
        self.control.read_response_in(expected)
    }

    /// Run `FEAT`. Servers without extensions may reply with an error, which means no features
    fn discover_features(&mut self) -> FtpResult<()> {
        debug!("Getting server supported features");
        self.control.perform(&Command::Feat)?;
        let response = self.control.read_reply()?;
        self.features = if response.status == Status::System {
            parse_features(&response.lines())
        } else {
            debug!("FEAT not supported: {response}");
            Features::new()
        };
        self.mlsd_supported = self.features.contains_key("MLST");
        debug!(
            "Server features: {:?}; MLSD supported: {}",
            self.features, self.mlsd_supported
        );
        Ok(())
    }

    /// Turn on UTF-8 if the server advertises it
    fn set_utf8(&mut self) -> FtpResult<()> {
        if !self.features.contains_key("UTF8") {
            return Ok(());
        }
        debug!("Enabling UTF-8");
        self.roundtrip(
            Command::Opts(String::from("UTF8"), Some(String::from("ON"))),
            &[
                Status::CommandOk,
                Status::CommandNotImplemented,
                Status::BadArguments,
            ],
        )
        .map(|_| ())
    }

    #[cfg(feature = "secure")]
    fn protect_data_channel(&mut self) {
        if let Err(err) = self.roundtrip(Command::Pbsz(0), &[Status::CommandOk]) {
            error!("PBSZ failed: {err}");
        }
        if let Err(err) = self.roundtrip(
            Command::Prot(ProtectionLevel::Private),
            &[Status::CommandOk],
        ) {
            error!("PROT failed: {err}");
        }
    }
}
