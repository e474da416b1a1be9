//! # Types
//!
//! Error and reply types shared by the whole engine, plus the values accepted by `TYPE`

use std::collections::HashMap;
use std::fmt;
use std::string::FromUtf8Error;

use thiserror::Error;

use super::Status;

/// A shorthand for a Result whose error type is always an FtpError.
pub type FtpResult<T> = std::result::Result<T, FtpError>;

/// `FtpError` describes everything that can go wrong while talking to an FTP server.
///
/// Nothing in this crate retries on error: every variant surfaces directly to the caller.
#[derive(Debug, Error)]
pub enum FtpError {
    /// Socket-level failure on the control or the data connection, idle timeouts included
    #[error("Connection error: {0}")]
    ConnectionError(std::io::Error),
    /// There was an error with the secure stream
    #[cfg(feature = "secure")]
    #[cfg_attr(docsrs, doc(cfg(feature = "secure")))]
    #[error("Secure error: {0}")]
    SecureError(String),
    /// The server replied with a status the command didn't expect.
    /// Contains the reply, so callers may branch on the code (e.g. 550 "already exists").
    #[error("Invalid response: {0}")]
    UnexpectedResponse(Response),
    /// A reply which should contain a parsable structure (PASV tuple, EPSV port, quoted path, size) didn't
    #[error("Response contains an invalid syntax")]
    BadResponse,
    /// The operation was aborted through its cancel token
    #[error("Operation cancelled")]
    Cancelled,
    /// The address provided was invalid; meant for connect functions parsing the address they're given
    #[error("Invalid address: {0}")]
    InvalidAddress(std::net::AddrParseError),
}

/// Reply read from the control connection
#[derive(Clone, Debug, Error)]
pub struct Response {
    pub status: Status,
    /// Raw reply, all lines included
    pub body: Vec<u8>,
}

/// Text Format Control used in `TYPE` command
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum FormatControl {
    /// Default text format control (is NonPrint)
    Default,
    /// Non-print (not destined for printing)
    NonPrint,
    /// Telnet format control (\<CR\>, \<FF\>, etc.)
    Telnet,
    /// ASA (Fortran) Carriage Control
    Asa,
}

/// File Type used in `TYPE` command
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum FileType {
    /// ASCII text (the argument is the text format control)
    Ascii(FormatControl),
    /// EBCDIC text (the argument is the text format control)
    Ebcdic(FormatControl),
    /// Image,
    Image,
    /// Binary (the synonym to Image)
    Binary,
    /// Local format (the argument is the number of bits in one byte on local machine)
    Local(u8),
}

/// Features returned by FEAT command (token as sent by the server, optional parameters)
pub type Features = HashMap<String, Option<String>>;

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}",
            self.status.code(),
            self.as_string().ok().unwrap_or_default()
        )
    }
}

impl Response {
    /// Instantiates a new `Response`
    pub fn new(status: Status, body: Vec<u8>) -> Self {
        Self { status, body }
    }

    /// Get response as string
    pub fn as_string(&self) -> Result<String, FromUtf8Error> {
        String::from_utf8(self.body.clone()).map(|x| x.trim_end().to_string())
    }

    /// Get the reply lines, lossily decoded and stripped of their line terminators
    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.body)
            .lines()
            .map(|line| line.trim_end_matches('\r').to_string())
            .collect()
    }
}

impl fmt::Display for FormatControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatControl::Default | FormatControl::NonPrint => write!(f, "N"),
            FormatControl::Telnet => write!(f, "T"),
            FormatControl::Asa => write!(f, "C"),
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileType::Ascii(fc) => write!(f, "A {fc}"),
            FileType::Ebcdic(fc) => write!(f, "E {fc}"),
            FileType::Image | FileType::Binary => write!(f, "I"),
            FileType::Local(bits) => write!(f, "L {bits}"),
        }
    }
}

#[cfg(test)]
mod test {

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn fmt_error() {
        assert_eq!(
            FtpError::ConnectionError(std::io::Error::new(std::io::ErrorKind::NotFound, "omar"))
                .to_string()
                .as_str(),
            "Connection error: omar"
        );
        #[cfg(feature = "secure")]
        assert_eq!(
            FtpError::SecureError("omar".to_string())
                .to_string()
                .as_str(),
            "Secure error: omar"
        );
        assert_eq!(
            FtpError::UnexpectedResponse(Response::new(
                Status::ExceededStorage,
                b"552 error".to_vec()
            ))
            .to_string()
            .as_str(),
            "Invalid response: [552] 552 error"
        );
        assert_eq!(
            FtpError::BadResponse.to_string().as_str(),
            "Response contains an invalid syntax"
        );
        assert_eq!(
            FtpError::Cancelled.to_string().as_str(),
            "Operation cancelled"
        );
    }

    #[test]
    fn should_split_response_lines() {
        let response = Response::new(
            Status::System,
            b"211-Features:\r\n MLST type*;size*\r\n UTF8\r\n211 End\r\n".to_vec(),
        );
        assert_eq!(
            response.lines(),
            vec!["211-Features:", " MLST type*;size*", " UTF8", "211 End"]
        );
        assert_eq!(
            response.as_string().unwrap(),
            "211-Features:\r\n MLST type*;size*\r\n UTF8\r\n211 End"
        );
    }

    #[test]
    fn fmt_response() {
        let response: Response = Response::new(
            Status::FileUnavailable,
            b"550 Can't create directory: File exists\r\n".to_vec(),
        );
        assert_eq!(
            response.to_string().as_str(),
            "[550] 550 Can't create directory: File exists"
        );
    }

    #[test]
    fn fmt_file_type() {
        assert_eq!(
            FileType::Ascii(FormatControl::Telnet).to_string().as_str(),
            "A T"
        );
        assert_eq!(FileType::Binary.to_string().as_str(), "I");
        assert_eq!(FileType::Image.to_string().as_str(), "I");
        assert_eq!(
            FileType::Ebcdic(FormatControl::Asa).to_string().as_str(),
            "E C"
        );
        assert_eq!(
            FileType::Ascii(FormatControl::Default).to_string().as_str(),
            "A N"
        );
        assert_eq!(FileType::Local(2).to_string().as_str(), "L 2");
    }
}
