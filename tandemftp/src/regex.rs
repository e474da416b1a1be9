//! # FTP Regex
//!
//! Regular expressions used to pull values out of control replies

use lazy_regex::{Lazy, Regex};

/// Extracts the data address from a PASV reply, which carries it as `(h1,h2,h3,h4,p1,p2)`.
pub static PASV_PORT_RE: Lazy<Regex> =
    lazy_regex!(r"\((\d+),\s*(\d+),\s*(\d+),\s*(\d+),\s*(\d+),\s*(\d+)\)");

/// Extracts the port from an EPSV reply, e.g. `229 Entering Extended Passive Mode (|||6446|)`
pub static EPSV_PORT_RE: Lazy<Regex> = lazy_regex!(r"\|\|\|(\d+)\|");

/// `YYYYMMDDhhmmss` timestamp in a MDTM reply
pub static MDTM_RE: Lazy<Regex> = lazy_regex!(r"\b(\d{4})(\d{2})(\d{2})(\d{2})(\d{2})(\d{2})\b");

/// Trailing integer of a SIZE reply
pub static SIZE_RE: Lazy<Regex> = lazy_regex!(r"\s+(\d+)\s*$");

#[cfg(test)]
mod test {

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn should_capture_pasv_tuple() {
        let caps = PASV_PORT_RE
            .captures("227 Entering Passive Mode (192,168,1,20,19,137).")
            .unwrap();
        let fields: Vec<u8> = (1..=6).map(|i| caps[i].parse().unwrap()).collect();
        assert_eq!(fields, vec![192, 168, 1, 20, 19, 137]);
        // some servers put spaces after the commas
        assert!(PASV_PORT_RE
            .captures("227 Entering Passive Mode (10, 0, 0, 1, 4, 1)")
            .is_some());
        assert!(PASV_PORT_RE
            .captures("227 Entering Passive Mode 10,0,0,1,4,1")
            .is_none());
        assert!(PASV_PORT_RE
            .captures("227 Entering Passive Mode (10,0,0,1,4)")
            .is_none());
    }

    #[test]
    fn should_capture_epsv_port() {
        let caps = EPSV_PORT_RE
            .captures("229 Entering Extended Passive Mode (|||6446|)")
            .unwrap();
        assert_eq!(caps[1].parse::<u16>().unwrap(), 6446);
        assert!(EPSV_PORT_RE
            .captures("229 Entering Extended Passive Mode (||6446|)")
            .is_none());
        assert!(EPSV_PORT_RE.captures("229 Entering Extended Passive Mode").is_none());
    }

    #[test]
    fn should_capture_mdtm_timestamp() {
        let caps = MDTM_RE.captures("213 20230201111632").unwrap();
        let fields: Vec<u32> = (1..=6).map(|i| caps[i].parse().unwrap()).collect();
        assert_eq!(fields, vec![2023, 2, 1, 11, 16, 32]);
    }

    #[test]
    fn should_capture_size() {
        let caps = SIZE_RE.captures("213 42\r\n").unwrap();
        assert_eq!(caps[1].parse::<u64>().unwrap(), 42);
        assert!(SIZE_RE.captures("213 unknown").is_none());
    }
}
