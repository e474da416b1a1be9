//! # Command
//!
//! The set of FTP commands sent on the control connection

pub mod feat;

use std::fmt;

use crate::types::FileType;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Ftp commands with their arguments
pub enum Command {
    /// Change directory to parent directory
    Cdup,
    /// Change working directory
    Cwd(String),
    /// Any command line not covered by this enum
    Custom(String),
    /// Remove file at specified path
    Dele(String),
    /// Extended passive mode <https://www.rfc-editor.org/rfc/rfc2428#section-3>
    Epsv,
    /// List the extensions supported by the server <https://www.rfc-editor.org/rfc/rfc2389>
    Feat,
    /// List entries at specified path. If path is not provided list entries at current working directory
    List(Option<String>),
    /// Get modification time for file at specified path
    Mdtm(String),
    /// Make directory
    Mkd(String),
    /// Machine-readable listing of a directory <https://www.rfc-editor.org/rfc/rfc3659#section-7>
    Mlsd(Option<String>),
    /// Get the list of file names at specified path. If path is not provided list entries at current working directory
    Nlst(Option<String>),
    /// Ping server
    Noop,
    /// Set an option for a command, e.g. `OPTS UTF8 ON`
    Opts(String, Option<String>),
    /// Provide login password
    Pass(String),
    /// Passive mode
    Pasv,
    /// Protection buffer size
    #[cfg(feature = "secure")]
    Pbsz(usize),
    /// Set protection level for the data channel
    #[cfg(feature = "secure")]
    Prot(ProtectionLevel),
    /// Print working directory
    Pwd,
    /// Quit
    Quit,
    /// Reinitialize the session, logging out the current user
    Rein,
    /// Select file to rename
    RenameFrom(String),
    /// Rename selected file to
    RenameTo(String),
    /// Resume transfer from offset
    Rest(u64),
    /// Retrieve file
    Retr(String),
    /// Remove directory
    Rmd(String),
    /// Get file size of specified path
    Size(String),
    /// Put file at specified path
    Store(String),
    /// Set transfer type
    Type(FileType),
    /// Provide user to login as
    User(String),
}

#[cfg(feature = "secure")]
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(unused)]
/// Protection level; argument for `Prot` command
pub enum ProtectionLevel {
    Clear,
    Private,
}

impl Command {
    /// Line to write in logs. Passwords are masked.
    pub fn log_line(&self) -> String {
        match self {
            Self::Pass(_) => "PASS ******".to_string(),
            cmd => cmd.to_string(),
        }
    }
}

// -- stringify

fn with_optional_arg(f: &mut fmt::Formatter<'_>, name: &str, arg: &Option<String>) -> fmt::Result {
    match arg.as_deref() {
        Some(arg) => write!(f, "{name} {arg}"),
        None => write!(f, "{name}"),
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cdup => write!(f, "CDUP"),
            Self::Cwd(d) => write!(f, "CWD {d}"),
            Self::Custom(line) => write!(f, "{line}"),
            Self::Dele(p) => write!(f, "DELE {p}"),
            Self::Epsv => write!(f, "EPSV"),
            Self::Feat => write!(f, "FEAT"),
            Self::List(p) => with_optional_arg(f, "LIST", p),
            Self::Mdtm(p) => write!(f, "MDTM {p}"),
            Self::Mkd(p) => write!(f, "MKD {p}"),
            Self::Mlsd(p) => with_optional_arg(f, "MLSD", p),
            Self::Nlst(p) => with_optional_arg(f, "NLST", p),
            Self::Noop => write!(f, "NOOP"),
            Self::Opts(option, value) => with_optional_arg(f, &format!("OPTS {option}"), value),
            Self::Pass(p) => write!(f, "PASS {p}"),
            Self::Pasv => write!(f, "PASV"),
            #[cfg(feature = "secure")]
            Self::Pbsz(sz) => write!(f, "PBSZ {sz}"),
            #[cfg(feature = "secure")]
            Self::Prot(level) => write!(f, "PROT {level}"),
            Self::Pwd => write!(f, "PWD"),
            Self::Quit => write!(f, "QUIT"),
            Self::Rein => write!(f, "REIN"),
            Self::RenameFrom(p) => write!(f, "RNFR {p}"),
            Self::RenameTo(p) => write!(f, "RNTO {p}"),
            Self::Rest(offset) => write!(f, "REST {offset}"),
            Self::Retr(p) => write!(f, "RETR {p}"),
            Self::Rmd(p) => write!(f, "RMD {p}"),
            Self::Size(p) => write!(f, "SIZE {p}"),
            Self::Store(p) => write!(f, "STOR {p}"),
            Self::Type(t) => write!(f, "TYPE {t}"),
            Self::User(u) => write!(f, "USER {u}"),
        }
    }
}

#[cfg(feature = "secure")]
impl fmt::Display for ProtectionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clear => write!(f, "C"),
            Self::Private => write!(f, "P"),
        }
    }
}
