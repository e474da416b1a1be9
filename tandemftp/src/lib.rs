#![crate_name = "tandemftp"]
#![crate_type = "lib"]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! # tandemftp
//!
//! tandemftp is an FTP client engine written in Rust with optional FTPS support.
//! It is built for clients which drive many sessions at once and must be able to stop any of them at any time:
//!
//! - Every operation takes a [`CancelToken`]; firing it aborts the operation, even while it's blocked on a socket
//! - Passive mode negotiation tries `EPSV` first and falls back to `PASV` for the rest of the session
//! - Transfers can be resumed from an offset with `REST`
//! - Data connections fail after a configurable idle time, renewed on every read
//! - Directory listings use `MLSD` when the server supports it, `LIST` otherwise, with a parser for both formats
//! - Directories can be removed recursively
//!
//! ## Get started
//!
//! To get started, first add **tandemftp** to your dependencies:
//!
//! ```toml
//! tandemftp = "^0.1"
//! ```
//!
//! ### Features
//!
//! #### SSL/TLS Support
//!
//! If you want to enable **support for FTPS**, you must enable the `native-tls` or `rustls` feature in your cargo dependencies, based on the TLS provider you prefer.
//!
//! ```toml
//! tandemftp = { version = "^0.1", features = ["native-tls"] }
//! # or
//! tandemftp = { version = "^0.1", features = ["rustls"] }
//! ```
//!
//! > 💡 If you don't know what to choose, `native-tls` should be preferred for compatibility reasons.
//!
//! ## Usage
//!
//! Here is a basic usage example:
//!
//! ```rust,no_run
//! use std::io::Cursor;
//! use tandemftp::{CancelToken, FtpSession, SessionConfig};
//!
//! let token = CancelToken::new();
//! let mut session = FtpSession::connect("127.0.0.1:10021", SessionConfig::default(), &token)
//!     .unwrap_or_else(|err| panic!("{}", err));
//! assert!(session.login(&token, "test", "test").is_ok());
//! session.put_file(&token, "hello.txt", &mut Cursor::new("hello")).unwrap();
//! for entry in session.list(&token, None).unwrap() {
//!     println!("{} {}", entry.name(), entry.size());
//! }
//!
//! // Disconnect from server
//! assert!(session.quit(&token).is_ok());
//! ```
//!
//! ## Cancellation
//!
//! A [`CancelToken`] can be cloned and fired from any thread:
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use tandemftp::{CancelToken, FtpError, FtpSession, SessionConfig};
//!
//! let token = CancelToken::new();
//! let mut session = FtpSession::connect("127.0.0.1:10021", SessionConfig::default(), &token).unwrap();
//! session.login(&token, "test", "test").unwrap();
//! let canceller = token.clone();
//! std::thread::spawn(move || {
//!     std::thread::sleep(Duration::from_secs(5));
//!     canceller.cancel();
//! });
//! match session.retr_as_buffer(&token, "huge.bin") {
//!     Err(FtpError::Cancelled) => println!("gave up"),
//!     other => println!("{:?}", other.map(|data| data.len())),
//! }
//! ```
//!
//! ## FTPS
//!
//! The session is secured with implicit TLS when the config carries a connector:
//! both the control connection and every data connection are wrapped.
//! A custom connect function owns the transport: with one set, nothing is wrapped.
//!
//! ### FTPS Usage
//!
//! ```rust,ignore
//! use tandemftp::{CancelToken, NativeTlsConnector, NativeTlsFtpSession, SessionConfig};
//! use tandemftp::native_tls::TlsConnector;
//!
//! let token = CancelToken::new();
//! let config = SessionConfig::default()
//!     .with_tls(NativeTlsConnector::from(TlsConnector::new().unwrap()), "test.rebex.net");
//! let mut session = NativeTlsFtpSession::connect("test.rebex.net:21", config, &token).unwrap();
//! session.login(&token, "demo", "password").unwrap();
//! assert!(session.quit(&token).is_ok());
//! ```
//!

#![doc(html_playground_url = "https://play.rust-lang.org")]

// -- common deps
#[macro_use]
extern crate lazy_regex;
#[macro_use]
extern crate log;

// -- private
mod cancel;
pub(crate) mod command;
mod config;
mod regex;
mod session;
mod status;
#[cfg(test)]
mod test_server;

// -- public
pub mod list;
pub mod types;

// -- secure deps
#[cfg(feature = "native-tls")]
pub extern crate native_tls_crate as native_tls;
#[cfg(feature = "rustls")]
pub extern crate rustls_crate as rustls;

// -- export
pub use cancel::CancelToken;
pub use config::{ConnectFn, SessionConfig};
#[cfg(feature = "secure")]
pub use session::TlsConnector;
pub use session::{DataStream, ImplFtpSession, NoTlsStream, Retrieval, TlsStream, TransferStream};
#[cfg(feature = "native-tls")]
pub use session::{NativeTlsConnector, NativeTlsStream};
#[cfg(feature = "rustls")]
pub use session::{RustlsConnector, RustlsStream};
pub use status::Status;
pub use types::{Features, FileType, FormatControl, FtpError, FtpResult, Response};

/// A plain FTP session
pub type FtpSession = ImplFtpSession<NoTlsStream>;
/// An FTPS session secured with native-tls
#[cfg(feature = "native-tls")]
pub type NativeTlsFtpSession = ImplFtpSession<NativeTlsStream>;
/// An FTPS session secured with rustls
#[cfg(feature = "rustls")]
pub type RustlsFtpSession = ImplFtpSession<RustlsStream>;

// -- test logging
#[cfg(test)]
pub fn log_init() {
    let _ = env_logger::builder().is_test(true).try_init();
}
