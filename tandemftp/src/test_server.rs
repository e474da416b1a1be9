//! # Test server
//!
//! An in-process FTP server with an in-memory filesystem, good enough to drive sessions in tests.
//!
//! Paths under `/slow` and `/stall` are special when listed: `/slow` yields 15 lines 100ms apart,
//! `/stall` yields one line then goes silent for 3 seconds.

use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
#[cfg(feature = "secure")]
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Modification time reported for every file
const MODIFY: &str = "20240310123015";

#[derive(Debug, Clone, Copy)]
pub struct ServerOptions {
    /// Advertise `MLST` and serve `MLSD`
    pub mlsd: bool,
    /// Serve `EPSV`; reply 502 otherwise
    pub epsv: bool,
    /// Advertise `UTF8`
    pub utf8: bool,
    /// Reply to `FEAT`; reply 502 otherwise
    pub feat: bool,
    /// First line sent to clients; the connection is closed after it, unless it's a 220
    pub greeting: &'static str,
    /// Reply to `OPTS UTF8 ON`
    pub utf8_reply: &'static str,
    /// Reply to `PROT`
    pub prot_reply: &'static str,
    /// Reply to `QUIT`; otherwise it's ignored and the connection stays open
    pub goodbye: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            mlsd: true,
            epsv: true,
            utf8: true,
            feat: true,
            greeting: "220 tandem mock server ready",
            utf8_reply: "200 UTF8 enabled",
            prot_reply: "200 Protection level set to P",
            goodbye: true,
        }
    }
}

/// Absolute path to content; `None` is a directory
type Filesystem = BTreeMap<String, Option<Vec<u8>>>;

#[derive(Default)]
struct Shared {
    commands: Vec<String>,
    fs: Filesystem,
}

pub struct MockServer {
    addr: String,
    shared: Arc<Mutex<Shared>>,
}

impl MockServer {
    /// Start listening on a random local port; every client is served on its own thread
    pub fn start(options: ServerOptions) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let mut shared = Shared::default();
        shared.fs.insert(String::from("/"), None);
        let shared = Arc::new(Mutex::new(shared));
        {
            let shared = shared.clone();
            thread::spawn(move || {
                for stream in listener.incoming().flatten() {
                    let shared = shared.clone();
                    thread::spawn(move || Client::new(stream, options, shared).serve());
                }
            });
        }

        Self { addr, shared }
    }

    pub fn addr(&self) -> String {
        self.addr.clone()
    }

    /// Command lines received so far, from every client
    pub fn commands(&self) -> Vec<String> {
        self.shared.lock().unwrap().commands.clone()
    }

    pub fn clear_commands(&self) {
        self.shared.lock().unwrap().commands.clear();
    }

    pub fn exists(&self, path: &str) -> bool {
        self.shared.lock().unwrap().fs.contains_key(path)
    }
}

struct Client {
    stream: TcpStream,
    options: ServerOptions,
    shared: Arc<Mutex<Shared>>,
    cwd: String,
    user: Option<String>,
    rename_from: Option<String>,
    offset: usize,
    passive: Option<TcpListener>,
}

impl Client {
    fn new(stream: TcpStream, options: ServerOptions, shared: Arc<Mutex<Shared>>) -> Self {
        Self {
            stream,
            options,
            shared,
            cwd: String::from("/"),
            user: None,
            rename_from: None,
            offset: 0,
            passive: None,
        }
    }

    fn serve(mut self) {
        if self.reply(self.options.greeting).is_err() || !self.options.greeting.starts_with("220") {
            return;
        }
        let mut reader = BufReader::new(self.stream.try_clone().unwrap());
        let mut line = String::new();
        loop {
            line.clear();
            match reader.read_line(&mut line) {
                Ok(0) | Err(_) => return,
                Ok(_) => {}
            }
            let command = line.trim_end_matches(['\r', '\n']).to_string();
            self.state().commands.push(command.clone());
            let (verb, arg) = match command.split_once(' ') {
                Some((verb, arg)) => (verb.to_uppercase(), arg.to_string()),
                None => (command.to_uppercase(), String::new()),
            };
            let result = match verb.as_str() {
                "QUIT" if !self.options.goodbye => Ok(()),
                "QUIT" => {
                    let _ = self.reply("221 Goodbye");
                    return;
                }
                "HANG" => Ok(()),
                _ => self.handle(&verb, &arg),
            };
            if result.is_err() {
                return;
            }
        }
    }

    fn handle(&mut self, verb: &str, arg: &str) -> std::io::Result<()> {
        match verb {
            "FEAT" if self.options.feat => {
                let mut lines = vec![String::from("211-Features:")];
                if self.options.mlsd {
                    lines.push(String::from(" MLST type*;size*;modify*;"));
                }
                if self.options.utf8 {
                    lines.push(String::from(" UTF8"));
                }
                lines.push(String::from(" EPSV"));
                lines.push(String::from(" REST STREAM"));
                lines.push(String::from("211 End"));
                self.reply(&lines.join("\r\n"))
            }
            "USER" => {
                self.user = Some(arg.to_string());
                if arg == "nopass" {
                    self.reply("230 Logged in")
                } else {
                    self.reply("331 Password required")
                }
            }
            "PASS" if self.user.as_deref() == Some(arg) => self.reply("230 Logged in"),
            "PASS" => self.reply("530 Login incorrect"),
            "TYPE" => self.reply("200 Type set"),
            "OPTS" => self.reply(self.options.utf8_reply),
            "PBSZ" => self.reply("200 PBSZ=0"),
            "PROT" => self.reply(self.options.prot_reply),
            "NOOP" => self.reply("200 NOOP ok"),
            "EPSV" if self.options.epsv => {
                let port = self.listen()?;
                self.reply(&format!(
                    "229 Entering Extended Passive Mode (|||{port}|)"
                ))
            }
            "PASV" => {
                let port = self.listen()?;
                self.reply(&format!(
                    "227 Entering Passive Mode (127,0,0,1,{},{})",
                    port >> 8,
                    port & 0xff
                ))
            }
            "REST" => match arg.parse::<usize>() {
                Ok(offset) => {
                    self.offset = offset;
                    self.reply(&format!("350 Restarting at {offset}"))
                }
                Err(_) => self.reply("501 Bad offset"),
            },
            "RETR" => self.retr(arg),
            "STOR" => self.stor(arg),
            "LIST" | "MLSD" | "NLST" => self.listing(verb, arg),
            "CWD" => {
                let path = self.resolve(arg);
                if self.is_dir(&path) {
                    self.cwd = path;
                    self.reply("250 Directory changed")
                } else {
                    self.reply("550 No such directory")
                }
            }
            "CDUP" => {
                self.cwd = parent(&self.cwd);
                self.reply("200 Directory changed")
            }
            "PWD" => self.reply(&format!("257 \"{}\" is the current directory", self.cwd)),
            "RNFR" => {
                let path = self.resolve(arg);
                if self.state().fs.contains_key(&path) {
                    self.rename_from = Some(path);
                    self.reply("350 Ready for destination name")
                } else {
                    self.reply("550 No such file or directory")
                }
            }
            "RNTO" => match self.rename_from.take() {
                Some(from) => {
                    let to = self.resolve(arg);
                    let mut shared = self.shared.lock().unwrap();
                    let moved: Vec<String> = shared
                        .fs
                        .keys()
                        .filter(|k| **k == from || k.starts_with(&format!("{from}/")))
                        .cloned()
                        .collect();
                    for key in moved {
                        if let Some(content) = shared.fs.remove(&key) {
                            shared.fs.insert(format!("{to}{}", &key[from.len()..]), content);
                        }
                    }
                    drop(shared);
                    self.reply("250 Rename successful")
                }
                None => self.reply("503 RNFR first"),
            },
            "DELE" => {
                let path = self.resolve(arg);
                if self.is_file(&path) {
                    self.state().fs.remove(&path);
                    self.reply("250 File removed")
                } else {
                    self.reply("550 No such file")
                }
            }
            "MKD" => {
                let path = self.resolve(arg);
                if self.is_dir(&parent(&path)) && !self.state().fs.contains_key(&path) {
                    self.state().fs.insert(path.clone(), None);
                    self.reply(&format!("257 \"{path}\" created"))
                } else {
                    self.reply("550 Cannot create directory")
                }
            }
            "RMD" => {
                let path = self.resolve(arg);
                if path != "/" && self.is_dir(&path) && self.children(&path).is_empty() {
                    self.state().fs.remove(&path);
                    self.reply("250 Directory removed")
                } else {
                    self.reply("550 Cannot remove directory")
                }
            }
            "SIZE" => {
                let path = self.resolve(arg);
                if path == "/magic-file" {
                    return self.reply("213 42");
                }
                let size = self.state().fs.get(&path).cloned().flatten().map(|c| c.len());
                match size {
                    Some(size) => self.reply(&format!("213 {size}")),
                    None => self.reply("550 No such file"),
                }
            }
            "MDTM" => {
                let path = self.resolve(arg);
                if self.is_file(&path) {
                    self.reply(&format!("213 {MODIFY}"))
                } else {
                    self.reply("550 No such file")
                }
            }
            _ => self.reply("502 Command not implemented"),
        }
    }

    fn retr(&mut self, arg: &str) -> std::io::Result<()> {
        let path = self.resolve(arg);
        let offset = std::mem::take(&mut self.offset);
        let content = self.state().fs.get(&path).cloned().flatten();
        let Some(content) = content else {
            self.passive = None;
            return self.reply("550 No such file");
        };
        let Some(mut data) = self.open_data()? else {
            return Ok(());
        };
        let sent = data.write_all(content.get(offset..).unwrap_or_default());
        drop(data);
        self.transfer_complete(sent)
    }

    fn stor(&mut self, arg: &str) -> std::io::Result<()> {
        let path = self.resolve(arg);
        let offset = std::mem::take(&mut self.offset);
        if !self.is_dir(&parent(&path)) || self.is_dir(&path) {
            self.passive = None;
            return self.reply("553 Cannot store file");
        }
        let Some(mut data) = self.open_data()? else {
            return Ok(());
        };
        let mut received = Vec::new();
        let read = data.read_to_end(&mut received);
        drop(data);
        if read.is_ok() {
            let mut content = self.state().fs.get(&path).cloned().flatten().unwrap_or_default();
            content.truncate(offset);
            content.extend(received);
            self.state().fs.insert(path, Some(content));
        }
        self.transfer_complete(read.map(|_| ()))
    }

    fn listing(&mut self, verb: &str, arg: &str) -> std::io::Result<()> {
        let path = self.resolve(if arg.is_empty() { "." } else { arg });
        match path.as_str() {
            "/slow" => return self.send_slowly(),
            "/stall" => return self.stall(),
            _ => {}
        }
        if !self.is_dir(&path) {
            self.passive = None;
            return self.reply("550 No such directory");
        }
        let children = self.children(&path);
        let lines: Vec<String> = match verb {
            "MLSD" => ["type=cdir", "type=pdir"]
                .iter()
                .zip([".", ".."])
                .map(|(kind, name)| format!("{kind};modify={MODIFY}; {name}"))
                .chain(children.iter().map(|(name, content)| match content {
                    Some(content) => {
                        format!("type=file;size={};modify={MODIFY}; {name}", content.len())
                    }
                    None => format!("type=dir;modify={MODIFY}; {name}"),
                }))
                .collect(),
            "LIST" => std::iter::once(format!("total {}", children.len()))
                .chain(children.iter().map(|(name, content)| match content {
                    Some(content) => format!(
                        "-rw-r--r-- 1 ftp ftp {} Mar 10 12:30 {name}",
                        content.len()
                    ),
                    None => format!("drwxr-xr-x 2 ftp ftp 4096 Mar 10 12:30 {name}"),
                }))
                .collect(),
            _ => children
                .iter()
                .map(|(name, _)| {
                    if arg.is_empty() {
                        name.clone()
                    } else {
                        format!("{}/{name}", arg.trim_end_matches('/'))
                    }
                })
                .collect(),
        };
        let Some(mut data) = self.open_data()? else {
            return Ok(());
        };
        let sent = lines
            .iter()
            .try_for_each(|line| write!(data, "{line}\r\n"));
        drop(data);
        self.transfer_complete(sent)
    }

    fn send_slowly(&mut self) -> std::io::Result<()> {
        let Some(mut data) = self.open_data()? else {
            return Ok(());
        };
        let sent = (0..15).try_for_each(|i| {
            thread::sleep(Duration::from_millis(100));
            write!(data, "slow-{i}\r\n")
        });
        drop(data);
        self.transfer_complete(sent)
    }

    fn stall(&mut self) -> std::io::Result<()> {
        let Some(mut data) = self.open_data()? else {
            return Ok(());
        };
        let sent = write!(data, "stalled\r\n").and_then(|_| {
            thread::sleep(Duration::from_secs(3));
            write!(data, "woken\r\n")
        });
        drop(data);
        self.transfer_complete(sent)
    }

    // -- data connection

    fn listen(&mut self) -> std::io::Result<u16> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        self.passive = Some(listener);
        Ok(port)
    }

    /// Accept the data connection and send the preliminary reply
    fn open_data(&mut self) -> std::io::Result<Option<TcpStream>> {
        let Some(listener) = self.passive.take() else {
            self.reply("425 Use PASV or EPSV first")?;
            return Ok(None);
        };
        let (data, _) = listener.accept()?;
        self.reply("150 Opening data connection")?;
        Ok(Some(data))
    }

    fn transfer_complete(&mut self, result: std::io::Result<()>) -> std::io::Result<()> {
        match result {
            Ok(()) => self.reply("226 Transfer complete"),
            Err(_) => self.reply("426 Connection closed; transfer aborted"),
        }
    }

    // -- filesystem

    fn state(&self) -> std::sync::MutexGuard<'_, Shared> {
        self.shared.lock().unwrap()
    }

    fn is_dir(&self, path: &str) -> bool {
        matches!(self.state().fs.get(path), Some(None))
    }

    fn is_file(&self, path: &str) -> bool {
        matches!(self.state().fs.get(path), Some(Some(_)))
    }

    /// Names and contents of the entries in the directory at `path`, sorted by name
    fn children(&self, path: &str) -> Vec<(String, Option<Vec<u8>>)> {
        self.state()
            .fs
            .iter()
            .filter(|(key, _)| key.as_str() != "/" && parent(key) == path)
            .map(|(key, content)| (name_of(key).to_string(), content.clone()))
            .collect()
    }

    fn resolve(&self, path: &str) -> String {
        let base = if path.starts_with('/') { "" } else { self.cwd.as_str() };
        let mut parts: Vec<&str> = Vec::new();
        for part in base.split('/').chain(path.split('/')) {
            match part {
                "" | "." => {}
                ".." => {
                    parts.pop();
                }
                part => parts.push(part),
            }
        }
        format!("/{}", parts.join("/"))
    }

    fn reply(&mut self, line: &str) -> std::io::Result<()> {
        write!(self.stream, "{line}\r\n")?;
        self.stream.flush()
    }
}

fn parent(path: &str) -> String {
    match path.rsplit_once('/') {
        Some(("", _)) | None => String::from("/"),
        Some((head, _)) => head.to_string(),
    }
}

fn name_of(path: &str) -> &str {
    path.rsplit_once('/').map(|(_, name)| name).unwrap_or(path)
}

/// Connector which leaves the socket as it is, counting the connections it was asked to secure
#[cfg(feature = "secure")]
#[derive(Debug, Clone, Default)]
pub struct PlainConnector {
    handshakes: Arc<AtomicUsize>,
}

#[cfg(feature = "secure")]
impl PlainConnector {
    pub fn handshakes(&self) -> usize {
        self.handshakes.load(Ordering::SeqCst)
    }
}

#[cfg(feature = "secure")]
impl crate::TlsConnector for PlainConnector {
    type Stream = PlainStream;

    fn connect(&self, domain: &str, stream: TcpStream) -> crate::FtpResult<Self::Stream> {
        assert_eq!(domain, "localhost");
        self.handshakes.fetch_add(1, Ordering::SeqCst);
        Ok(PlainStream(stream))
    }
}

#[cfg(feature = "secure")]
#[derive(Debug)]
pub struct PlainStream(TcpStream);

#[cfg(feature = "secure")]
impl crate::TlsStream for PlainStream {
    type InnerStream = TcpStream;

    fn get_ref(&self) -> &TcpStream {
        &self.0
    }

    fn mut_ref(&mut self) -> &mut Self::InnerStream {
        &mut self.0
    }
}
