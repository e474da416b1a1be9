//! # Config
//!
//! Options of a session, fixed before connecting

use std::fmt;
use std::io::{self, Write};
#[cfg(not(feature = "secure"))]
use std::marker::PhantomData;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};

use crate::cancel::{self, CancelToken};
use crate::session::DataStream;
#[cfg(feature = "secure")]
use crate::session::TlsConnector;
use crate::session::TlsStream;
use crate::{FtpError, FtpResult};

/// Custom dialer, called with `host:port` for the control connection (unless a stream is provided)
/// and for every data connection. The sockets it returns are used as they are: they're never wrapped with TLS.
pub type ConnectFn = dyn Fn(&str) -> FtpResult<TcpStream> + Send + Sync;

/// Session options.
///
/// ```rust
/// use std::time::Duration;
/// use tandemftp::SessionConfig;
///
/// let config = SessionConfig::default()
///     .with_connect_timeout(Duration::from_secs(10))
///     .with_data_timeout(Duration::from_secs(30))
///     .with_disable_epsv(true);
/// # let _: SessionConfig = config;
/// ```
pub struct SessionConfig<T = crate::session::NoTlsStream>
where
    T: TlsStream,
{
    /// Bound on dialing, for both the control and the data connections. Default: none
    pub(crate) connect_timeout: Option<Duration>,
    /// Already connected control socket; when set nothing is dialed for the control connection
    pub(crate) stream: Option<TcpStream>,
    pub(crate) connect_fn: Option<Box<ConnectFn>>,
    #[cfg(feature = "secure")]
    pub(crate) tls: Option<TlsConfig<T>>,
    /// Never try EPSV; go straight to PASV. Default: false
    pub(crate) disable_epsv: bool,
    /// Time zone of the times printed in LIST output. Default: UTC
    pub(crate) time_zone: FixedOffset,
    /// Sink receiving a copy of every byte sent and received on the control connection
    pub(crate) trace: Option<Box<dyn Write + Send>>,
    /// Longest silence tolerated on a data connection. Default: none
    pub(crate) data_timeout: Option<Duration>,
    #[cfg(not(feature = "secure"))]
    marker: PhantomData<T>,
}

/// Connector and server name used to secure both connections
#[cfg(feature = "secure")]
#[cfg_attr(docsrs, doc(cfg(feature = "secure")))]
pub(crate) struct TlsConfig<T>
where
    T: TlsStream,
{
    connector: Box<dyn TlsConnector<Stream = T> + Send + Sync>,
    domain: String,
}

impl<T> Default for SessionConfig<T>
where
    T: TlsStream,
{
    fn default() -> Self {
        Self {
            connect_timeout: None,
            stream: None,
            connect_fn: None,
            #[cfg(feature = "secure")]
            tls: None,
            disable_epsv: false,
            time_zone: Utc.fix(),
            trace: None,
            data_timeout: None,
            #[cfg(not(feature = "secure"))]
            marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for SessionConfig<T>
where
    T: TlsStream,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("connect_timeout", &self.connect_timeout)
            .field("stream", &self.stream)
            .field("connect_fn", &self.connect_fn.is_some())
            .field("secure", &self.is_secure())
            .field("disable_epsv", &self.disable_epsv)
            .field("time_zone", &self.time_zone)
            .field("trace", &self.trace.is_some())
            .field("data_timeout", &self.data_timeout)
            .finish()
    }
}

impl<T> SessionConfig<T>
where
    T: TlsStream,
{
    /// Set the timeout used when dialing the control and data connections
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Use an already connected socket as control connection
    pub fn with_stream(mut self, stream: TcpStream) -> Self {
        self.stream = Some(stream);
        self
    }

    /// Use a custom function to dial the control (if no stream is given) and the data connections.
    /// The function owns the transport: TLS settings are ignored while it's set.
    pub fn with_connect_fn<F>(mut self, connect: F) -> Self
    where
        F: Fn(&str) -> FtpResult<TcpStream> + Send + Sync + 'static,
    {
        self.connect_fn = Some(Box::new(connect));
        self
    }

    /// Secure the control connection and every data connection with `connector`,
    /// unless a connect function is set.
    /// `domain` is the server name checked against the certificate.
    #[cfg(feature = "secure")]
    #[cfg_attr(docsrs, doc(cfg(feature = "secure")))]
    pub fn with_tls<C>(mut self, connector: C, domain: impl ToString) -> Self
    where
        C: TlsConnector<Stream = T> + Send + Sync + 'static,
    {
        self.tls = Some(TlsConfig {
            connector: Box::new(connector),
            domain: domain.to_string(),
        });
        self
    }

    /// Never send EPSV
    pub fn with_disable_epsv(mut self, disable: bool) -> Self {
        self.disable_epsv = disable;
        self
    }

    /// Time zone the server prints LIST times in
    pub fn with_time_zone(mut self, tz: FixedOffset) -> Self {
        self.time_zone = tz;
        self
    }

    /// Copy the control connection traffic into `sink`
    pub fn with_trace<W>(mut self, sink: W) -> Self
    where
        W: Write + Send + 'static,
    {
        self.trace = Some(Box::new(sink));
        self
    }

    /// Fail a transfer if its data connection stays silent for longer than `timeout`
    pub fn with_data_timeout(mut self, timeout: Duration) -> Self {
        self.data_timeout = Some(timeout);
        self
    }

    /// Whether connections are secured with TLS
    pub fn is_secure(&self) -> bool {
        #[cfg(feature = "secure")]
        {
            self.tls().is_some()
        }
        #[cfg(not(feature = "secure"))]
        {
            false
        }
    }

    /// Open a tcp connection to `addr` (`host:port`).
    /// Unless a connect function is set, the dial is abandoned as soon as `token` fires.
    pub(crate) fn dial(&self, addr: &str, token: &CancelToken) -> FtpResult<TcpStream> {
        trace!("dialing {addr}");
        if let Some(connect) = self.connect_fn.as_ref() {
            token.check()?;
            return connect(addr);
        }
        let addr = addr.to_string();
        let timeout = self.connect_timeout;
        cancel::detach(token, move || connect_tcp(&addr, timeout))
    }

    /// TLS settings in effect: none while a connect function owns the transport
    #[cfg(feature = "secure")]
    fn tls(&self) -> Option<&TlsConfig<T>> {
        self.tls.as_ref().filter(|_| self.connect_fn.is_none())
    }

    /// Wrap a connected socket, securing it if TLS is in effect
    pub(crate) fn wrap(&self, stream: TcpStream) -> FtpResult<DataStream<T>> {
        #[cfg(feature = "secure")]
        if let Some(tls) = self.tls() {
            debug!("Securing connection to {}", tls.domain);
            return tls
                .connector
                .connect(&tls.domain, stream)
                .map(|stream| DataStream::Ssl(Box::new(stream)));
        }

        Ok(DataStream::Tcp(stream))
    }
}

/// Connect to `addr`, trying every resolved address in turn when a timeout is given
fn connect_tcp(addr: &str, timeout: Option<Duration>) -> FtpResult<TcpStream> {
    let Some(timeout) = timeout else {
        return TcpStream::connect(addr).map_err(FtpError::ConnectionError);
    };
    let mut last_err = None;
    for addr in addr.to_socket_addrs().map_err(FtpError::ConnectionError)? {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(err) => {
                debug!("failed to connect to {addr}: {err}");
                last_err = Some(err);
            }
        }
    }
    Err(FtpError::ConnectionError(last_err.unwrap_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            "could not resolve to any address",
        )
    })))
}

#[cfg(test)]
mod test {

    use std::net::TcpListener;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::session::NoTlsStream;

    #[test]
    fn should_have_sane_defaults() {
        let config = SessionConfig::<NoTlsStream>::default();
        assert_eq!(config.connect_timeout, None);
        assert_eq!(config.data_timeout, None);
        assert!(config.stream.is_none());
        assert!(config.connect_fn.is_none());
        assert!(config.trace.is_none());
        assert!(!config.disable_epsv);
        assert!(!config.is_secure());
        assert_eq!(config.time_zone.local_minus_utc(), 0);
    }

    #[test]
    fn should_build_config() {
        let config = SessionConfig::<NoTlsStream>::default()
            .with_connect_timeout(Duration::from_secs(3))
            .with_data_timeout(Duration::from_secs(5))
            .with_disable_epsv(true)
            .with_time_zone(FixedOffset::east_opt(3600).unwrap())
            .with_trace(Vec::new());
        assert_eq!(config.connect_timeout, Some(Duration::from_secs(3)));
        assert_eq!(config.data_timeout, Some(Duration::from_secs(5)));
        assert!(config.disable_epsv);
        assert_eq!(config.time_zone.local_minus_utc(), 3600);
        assert!(config.trace.is_some());
    }

    #[test]
    fn should_dial_with_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let config =
            SessionConfig::<NoTlsStream>::default().with_connect_timeout(Duration::from_secs(2));
        let stream = config.dial(&addr, &CancelToken::new()).unwrap();
        assert_eq!(
            stream.peer_addr().unwrap(),
            listener.local_addr().unwrap()
        );
    }

    #[test]
    fn should_dial_with_connect_fn() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let real_addr = listener.local_addr().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let config = SessionConfig::<NoTlsStream>::default().with_connect_fn(move |addr| {
            assert_eq!(addr, "ftp.example.com:21");
            counter.fetch_add(1, Ordering::SeqCst);
            TcpStream::connect(real_addr).map_err(FtpError::ConnectionError)
        });
        assert!(config.dial("ftp.example.com:21", &CancelToken::new()).is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn should_propagate_connect_fn_errors() {
        let config = SessionConfig::<NoTlsStream>::default().with_connect_fn(|addr| {
            let addr: std::net::SocketAddr = addr.parse().map_err(FtpError::InvalidAddress)?;
            TcpStream::connect(addr).map_err(FtpError::ConnectionError)
        });
        assert!(matches!(
            config.dial("not an address", &CancelToken::new()),
            Err(FtpError::InvalidAddress(_))
        ));
    }

    #[test]
    fn should_fail_dialing_closed_port() {
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().to_string()
        };
        let config =
            SessionConfig::<NoTlsStream>::default().with_connect_timeout(Duration::from_secs(1));
        assert!(matches!(
            config.dial(&addr, &CancelToken::new()),
            Err(FtpError::ConnectionError(_))
        ));
    }

    #[test]
    fn should_not_wrap_plain_streams() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let config = SessionConfig::<NoTlsStream>::default();
        let stream = config
            .dial(&listener.local_addr().unwrap().to_string(), &CancelToken::new())
            .unwrap();
        assert!(matches!(config.wrap(stream).unwrap(), DataStream::Tcp(_)));
    }

    #[test]
    #[cfg(feature = "secure")]
    fn should_leave_tls_to_connect_fn() {
        use crate::test_server::{PlainConnector, PlainStream};

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let connector = PlainConnector::default();
        let config = SessionConfig::<PlainStream>::default().with_tls(connector.clone(), "localhost");
        assert!(config.is_secure());
        let stream = config.dial(&addr, &CancelToken::new()).unwrap();
        assert!(matches!(config.wrap(stream).unwrap(), DataStream::Ssl(_)));
        assert_eq!(connector.handshakes(), 1);

        let config = config
            .with_connect_fn(|addr| TcpStream::connect(addr).map_err(FtpError::ConnectionError));
        assert!(!config.is_secure());
        let stream = config.dial(&addr, &CancelToken::new()).unwrap();
        assert!(matches!(config.wrap(stream).unwrap(), DataStream::Tcp(_)));
        assert_eq!(connector.handshakes(), 1);
    }

    #[test]
    fn should_not_dial_with_cancelled_token() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let token = CancelToken::new();
        token.cancel();
        let config = SessionConfig::<NoTlsStream>::default();
        assert!(matches!(
            config.dial(&listener.local_addr().unwrap().to_string(), &token),
            Err(FtpError::Cancelled)
        ));
    }
}
