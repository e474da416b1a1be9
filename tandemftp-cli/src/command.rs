use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Cdup,
    Connect(String, bool),
    Cwd(String),
    Feat,
    Help,
    List(Option<String>),
    Login,
    Mdtm(String),
    Mkdir(String),
    Nlst(Option<String>),
    Noop,
    Put(PathBuf, String, u64),
    Pwd,
    Quit,
    Rename(String, String),
    Retr(String, PathBuf, u64),
    Rm(String),
    Rmdir(String),
    Rmtree(String),
    Size(String),
}

impl FromStr for Command {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Split string by space
        let mut args = s.split_ascii_whitespace();
        // Match args
        match args.next() {
            Some(cmd) => match cmd.to_ascii_uppercase().as_str() {
                "CDUP" => Ok(Self::Cdup),
                "CONNECT" => match args.next() {
                    Some(addr) => Ok(Self::Connect(addr.to_string(), false)),
                    None => Err("Missing `addr` field"),
                },
                "CONNECT+S" => match args.next() {
                    Some(addr) => Ok(Self::Connect(addr.to_string(), true)),
                    None => Err("Missing `addr` field"),
                },
                "CWD" => match args.next() {
                    Some(p) => Ok(Self::Cwd(p.to_string())),
                    None => Err("Missing `dir` field"),
                },
                "FEAT" => Ok(Self::Feat),
                "HELP" => Ok(Self::Help),
                "LIST" => Ok(Self::List(args.next().map(|x| x.to_string()))),
                "LOGIN" => Ok(Self::Login),
                "MDTM" => match args.next() {
                    Some(file) => Ok(Self::Mdtm(file.to_string())),
                    None => Err("Missing `file` field"),
                },
                "MKDIR" => match args.next() {
                    Some(dir) => Ok(Self::Mkdir(dir.to_string())),
                    None => Err("Missing `dir` field"),
                },
                "NLST" => Ok(Self::Nlst(args.next().map(|x| x.to_string()))),
                "NOOP" => Ok(Self::Noop),
                "PUT" => {
                    let local: PathBuf = match args.next() {
                        Some(l) => PathBuf::from(l),
                        None => return Err("Missing `source` field"),
                    };
                    let dest = match args.next() {
                        Some(d) => d.to_string(),
                        None => return Err("Missing `dest` field"),
                    };
                    Ok(Self::Put(local, dest, offset(args.next())?))
                }
                "PWD" => Ok(Self::Pwd),
                "QUIT" => Ok(Self::Quit),
                "RENAME" => {
                    let src: String = match args.next() {
                        Some(s) => s.to_string(),
                        None => return Err("Missing `src` field"),
                    };
                    match args.next() {
                        Some(d) => Ok(Self::Rename(src, d.to_string())),
                        None => Err("Missing `dest` field"),
                    }
                }
                "RETR" => {
                    let file: String = match args.next() {
                        Some(f) => f.to_string(),
                        None => return Err("Missing `file` field"),
                    };
                    let dest = match args.next() {
                        Some(d) => PathBuf::from(d),
                        None => return Err("Missing `dest` field"),
                    };
                    Ok(Self::Retr(file, dest, offset(args.next())?))
                }
                "RM" => match args.next() {
                    Some(file) => Ok(Self::Rm(file.to_string())),
                    None => Err("Missing `file` field"),
                },
                "RMDIR" => match args.next() {
                    Some(dir) => Ok(Self::Rmdir(dir.to_string())),
                    None => Err("Missing `dir` field"),
                },
                "RMTREE" => match args.next() {
                    Some(dir) => Ok(Self::Rmtree(dir.to_string())),
                    None => Err("Missing `dir` field"),
                },
                "SIZE" => match args.next() {
                    Some(file) => Ok(Self::Size(file.to_string())),
                    None => Err("Missing `file` field"),
                },
                _ => Err("Unknown command"),
            },
            None => Err("Unknown command"),
        }
    }
}

/// Optional resume offset; 0 if missing
fn offset(arg: Option<&str>) -> Result<u64, &'static str> {
    match arg {
        Some(offset) => offset.parse().map_err(|_| "Invalid `offset` field"),
        None => Ok(0),
    }
}

#[cfg(test)]
mod test {

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn should_parse_commands() {
        assert_eq!(Command::from_str("cdup").unwrap(), Command::Cdup);
        assert_eq!(
            Command::from_str("CONNECT+S ftp.example.com:21").unwrap(),
            Command::Connect(String::from("ftp.example.com:21"), true)
        );
        assert_eq!(Command::from_str("LIST").unwrap(), Command::List(None));
        assert_eq!(
            Command::from_str("nlst /pub\n").unwrap(),
            Command::Nlst(Some(String::from("/pub")))
        );
        assert_eq!(
            Command::from_str("RMTREE /tmp/old").unwrap(),
            Command::Rmtree(String::from("/tmp/old"))
        );
    }

    #[test]
    fn should_parse_resume_offsets() {
        assert_eq!(
            Command::from_str("RETR big.iso ./big.iso 1024").unwrap(),
            Command::Retr(String::from("big.iso"), PathBuf::from("./big.iso"), 1024)
        );
        assert_eq!(
            Command::from_str("PUT ./a.txt a.txt").unwrap(),
            Command::Put(PathBuf::from("./a.txt"), String::from("a.txt"), 0)
        );
        assert!(Command::from_str("RETR big.iso ./big.iso many").is_err());
    }

    #[test]
    fn should_reject_bad_commands() {
        assert!(Command::from_str("").is_err());
        assert!(Command::from_str("MODE ACTIVE").is_err());
        assert!(Command::from_str("CWD").is_err());
        assert!(Command::from_str("RENAME a").is_err());
    }
}
