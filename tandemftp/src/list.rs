//! # List
//!
//! This module exposes the parsers for the LIST and MLSD commands output.
//! There's no specification regarding the LIST command output, so it basically depends on the implementation of the
//! remote FTP server; the parser understands the POSIX `ls -l` format and the DOS format used by IIS.
//! MLSD output is instead specified by [RFC 3659](https://www.rfc-editor.org/rfc/rfc3659#section-7).
//!
//! Both parsers share the [`ListingParser`] signature: they take the line, the reference time used to complete
//! dates without a year, and the time zone of the server, used for the listings which print local times.
//!
//! ```rust
//! use chrono::{FixedOffset, Utc};
//! use tandemftp::list::parse_list_line;
//!
//! let entry = parse_list_line(
//!     "-rw-r--r-- 1 ftp ftp 8192 Nov 5 2018 omar.txt",
//!     Utc::now(),
//!     FixedOffset::east_opt(0).unwrap(),
//! )
//! .unwrap();
//! assert_eq!(entry.name(), "omar.txt");
//! assert_eq!(entry.size(), 8192);
//! ```

mod entry_type;

use std::fmt;

use chrono::{DateTime, Datelike, FixedOffset, Months, NaiveDate, NaiveDateTime, TimeZone, Utc};
pub use entry_type::EntryType;
use lazy_regex::{Lazy, Regex};
use thiserror::Error;

// -- Regex

/// POSIX system regex to parse list output
static POSIX_LS_RE: Lazy<Regex> = lazy_regex!(
    r#"^([\-ldbcps])([\-rwxsStT]{9})[+@.]?\s+(\d+)\s+([^ ]+)\s+([^ ]+)\s+(\d+)\s+([^ ]+\s+\d{1,2}\s+(?:\d{1,2}:\d{1,2}|\d{4}))\s+(.+)$"#
);
/// DOS system regex to parse list output
static DOS_LS_RE: Lazy<Regex> =
    lazy_regex!(r#"^(\d{2}\-\d{2}\-\d{2}\s+\d{2}:\d{2}\s*[AP]M)\s+(<DIR>)?([\d,]*)\s+(.+)$"#);

/// Signature shared by the listing parsers: `(line, reference time, server time zone)`
pub type ListingParser = fn(&str, DateTime<Utc>, FixedOffset) -> Result<Entry, ParseError>;

// -- Entry

/// A directory entry on the remote system, as reported by a listing
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Entry {
    name: String,
    /// Target of the link, if the entry is a symlink and the listing reports it
    target: Option<String>,
    entry_type: EntryType,
    /// Size in bytes
    size: u64,
    /// Last modification time
    time: DateTime<Utc>,
}

// -- Error

#[derive(Debug, Error, Eq, PartialEq)]
pub enum ParseError {
    #[error("Syntax error: invalid line")]
    SyntaxError,
    #[error("Invalid date")]
    InvalidDate,
    #[error("Bad file size")]
    BadSize,
}

impl Entry {
    // -- getters

    /// Get entry name
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns, if available, the path the symlink is pointing to
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// Get entry type
    pub fn entry_type(&self) -> EntryType {
        self.entry_type
    }

    /// Get whether entry is a directory
    pub fn is_directory(&self) -> bool {
        self.entry_type.is_directory()
    }

    /// Get whether entry is a file
    pub fn is_file(&self) -> bool {
        self.entry_type.is_file()
    }

    /// Get whether entry is a symlink
    pub fn is_symlink(&self) -> bool {
        self.entry_type.is_symlink()
    }

    /// Size in bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Last modification time
    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }
}

impl fmt::Display for Entry {
    /// `ls -l` alike: type, size, modification time and name
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.entry_type {
            EntryType::Directory => 'd',
            EntryType::File => '-',
            EntryType::Symlink => 'l',
        };
        write!(
            f,
            "{kind} {:>12} {} {}",
            self.size,
            self.time.format("%Y-%m-%d %H:%M"),
            self.name
        )?;
        match self.target.as_deref() {
            Some(target) => write!(f, " -> {target}"),
            None => Ok(()),
        }
    }
}

// -- parsers

/// Parse a LIST output line, trying the POSIX format first and then the DOS format.
///
/// Times are read in `tz`. A POSIX date without a year (`Nov 5 13:46`) gets the year of `now`,
/// or the previous one if that would put it more than a day in the future.
pub fn parse_list_line(line: &str, now: DateTime<Utc>, tz: FixedOffset) -> Result<Entry, ParseError> {
    match parse_posix_line(line, now, tz) {
        Err(ParseError::SyntaxError) => parse_dos_line(line, tz),
        result => result,
    }
}

/// Parse a MLSD or MLST output line, e.g. `type=file;size=8192;modify=20181105163248; omar.txt`.
///
/// `modify` is always UTC, so the reference time and time zone are not used.
pub fn parse_mlsx_line(
    line: &str,
    _now: DateTime<Utc>,
    _tz: FixedOffset,
) -> Result<Entry, ParseError> {
    let (facts, name) = line.split_once(' ').ok_or(ParseError::SyntaxError)?;
    if name.is_empty() {
        return Err(ParseError::SyntaxError);
    }
    let mut entry = Entry {
        name: name.to_string(),
        target: None,
        entry_type: EntryType::File,
        size: 0,
        time: DateTime::UNIX_EPOCH,
    };
    for fact in facts.split(';') {
        let Some((key, value)) = fact.split_once('=') else {
            continue;
        };
        match key.to_lowercase().as_str() {
            "type" => match value.to_lowercase().as_str() {
                "dir" => entry.entry_type = EntryType::Directory,
                "cdir" => {
                    entry.entry_type = EntryType::Directory;
                    entry.name = String::from(".");
                }
                "pdir" => {
                    entry.entry_type = EntryType::Directory;
                    entry.name = String::from("..");
                }
                "file" => entry.entry_type = EntryType::File,
                "link" | "os.unix=symlink" => entry.entry_type = EntryType::Symlink,
                kind if kind.starts_with("os.unix=slink") => {
                    entry.entry_type = EntryType::Symlink;
                    entry.target = value
                        .split_once(':')
                        .map(|(_, target)| target.to_string())
                        .filter(|target| !target.is_empty());
                }
                _ => return Err(ParseError::SyntaxError),
            },
            "size" | "sizd" => {
                entry.size = value.parse::<u64>().map_err(|_| ParseError::BadSize)?;
            }
            "modify" => {
                entry.time = parse_mlsx_time(value)?;
            }
            _ => continue,
        }
    }
    trace!("Parsed MLSX line {line}: {entry:?}");

    Ok(entry)
}

/// Parse a POSIX `ls -l` line.
///
/// ```text
/// -rw-r--r-- 1 ftp ftp 8192 Nov 5 2018 omar.txt
/// lrwxrwxrwx 1 ftp ftp   12 Nov 5 13:46 cargo -> Cargo.toml
/// ```
fn parse_posix_line(line: &str, now: DateTime<Utc>, tz: FixedOffset) -> Result<Entry, ParseError> {
    let metadata = POSIX_LS_RE.captures(line).ok_or(ParseError::SyntaxError)?;
    // NOTE: metadata fmt: (regex, file_type, permissions, link_count, uid, gid, filesize, mtime, filename)
    let entry_type = match &metadata[1] {
        "d" => EntryType::Directory,
        "l" => EntryType::Symlink,
        _ => EntryType::File,
    };
    let size = metadata[6]
        .parse::<u64>()
        .map_err(|_| ParseError::BadSize)?;
    let time = parse_lstime(&metadata[7], now, tz)?;
    let (name, target) = match entry_type {
        EntryType::Symlink => match metadata[8].split_once(" -> ") {
            Some((name, target)) => (name.to_string(), Some(target.to_string())),
            None => (metadata[8].to_string(), None),
        },
        _ => (metadata[8].to_string(), None),
    };
    trace!("Parsed POSIX line {line}");

    Ok(Entry {
        name,
        target,
        entry_type,
        size,
        time,
    })
}

/// Parse a DOS listing line.
///
/// ```text
/// 10-19-20  03:19PM <DIR> pub
/// 04-08-14  03:09PM 403   readme.txt
/// ```
fn parse_dos_line(line: &str, tz: FixedOffset) -> Result<Entry, ParseError> {
    let metadata = DOS_LS_RE.captures(line).ok_or(ParseError::SyntaxError)?;
    // NOTE: metadata fmt: (regex, date_time, is_dir?, file_size?, file_name)
    let time = parse_dostime(&metadata[1], tz)?;
    let entry_type = match metadata.get(2) {
        Some(_) => EntryType::Directory,
        None => EntryType::File,
    };
    let size = match (entry_type, metadata.get(3)) {
        (EntryType::File, Some(size)) if !size.as_str().is_empty() => size
            .as_str()
            .replace(',', "")
            .parse::<u64>()
            .map_err(|_| ParseError::BadSize)?,
        _ => 0,
    };
    trace!("Parsed DOS line {line}");

    Ok(Entry {
        name: metadata[4].to_string(),
        target: None,
        entry_type,
        size,
        time,
    })
}

/// Convert MLSD time (`YYYYMMDDhhmmss[.sss]`, UTC) to a datetime
fn parse_mlsx_time(tm: &str) -> Result<DateTime<Utc>, ParseError> {
    let tm = tm.get(..14).ok_or(ParseError::InvalidDate)?;
    NaiveDateTime::parse_from_str(tm, "%Y%m%d%H%M%S")
        .map(|dt| dt.and_utc())
        .map_err(|_| ParseError::InvalidDate)
}

/// Convert ls syntax time to a datetime.
/// ls time has two possible syntax:
/// 1. if the file is recent: %b %d %H:%M (e.g. Nov 5 13:46)
/// 2. else: %b %d %Y (e.g. Nov 5 2019)
fn parse_lstime(tm: &str, now: DateTime<Utc>, tz: FixedOffset) -> Result<DateTime<Utc>, ParseError> {
    let tm = tm.split_whitespace().collect::<Vec<&str>>().join(" ");
    if let Ok(date) = NaiveDate::parse_from_str(&tm, "%b %d %Y") {
        return localize(date.and_hms_opt(0, 0, 0).ok_or(ParseError::InvalidDate)?, tz);
    }
    let this_year = now.with_timezone(&tz).year();
    let time = NaiveDateTime::parse_from_str(&format!("{tm} {this_year}"), "%b %d %H:%M %Y")
        .map_err(|_| ParseError::InvalidDate)
        .and_then(|dt| localize(dt, tz))?;
    if time > now + chrono::Duration::days(1) {
        time.checked_sub_months(Months::new(12))
            .ok_or(ParseError::InvalidDate)
    } else {
        Ok(time)
    }
}

/// Parse date time string in DOS representation ("%m-%d-%y %I:%M%p")
fn parse_dostime(tm: &str, tz: FixedOffset) -> Result<DateTime<Utc>, ParseError> {
    let tm = tm.split_whitespace().collect::<Vec<&str>>().join(" ");
    NaiveDateTime::parse_from_str(&tm, "%m-%d-%y %I:%M%p")
        .or_else(|_| NaiveDateTime::parse_from_str(&tm, "%m-%d-%y %I:%M %p"))
        .map_err(|_| ParseError::InvalidDate)
        .and_then(|dt| localize(dt, tz))
}

/// Read a naive datetime in the server time zone
fn localize(dt: NaiveDateTime, tz: FixedOffset) -> Result<DateTime<Utc>, ParseError> {
    tz.from_local_datetime(&dt)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or(ParseError::InvalidDate)
}
