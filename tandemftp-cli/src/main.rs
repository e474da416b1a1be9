//! # tandemftp client
//!
//! This is a client you can install via `cargo install tandemftp-cli` on your system to connect and work with FTP servers
//!

// -- mods
mod actions;
mod args;
mod command;

use actions::*;
use args::Args;
use command::Command;

use env_logger::Builder as LogBuilder;
use log::LevelFilter;
use std::io;
use std::io::Write;
use std::str::FromStr;
use tandemftp::{CancelToken, NativeTlsFtpSession as FtpSession};

const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
const APP_AUTHORS: &str = env!("CARGO_PKG_AUTHORS");

fn usage() {
    println!("Available commands:");
    println!("CDUP                                Go to parent directory");
    println!("CONNECT <addr:port>                 Connect to remote host");
    println!("CONNECT+S <addr:port>               Connect to remote host using FTPS");
    println!("CWD <dir>                           Change working directory");
    println!("FEAT                                Print features advertised by the server");
    println!("HELP                                Print this help");
    println!("LIST [dir]                          List files. If directory is not provided, current directory is used");
    println!("LOGIN                               Login to remote");
    println!("MDTM <file>                         Get modification time for `file`");
    println!("MKDIR <dir>                         Create directory");
    println!("NLST [dir]                          List file names");
    println!("NOOP                                Ping server");
    println!("PUT <file> <dest> [offset]          Upload local file `file` to `dest`, resuming from `offset`");
    println!("PWD                                 Print working directory");
    println!("QUIT                                Quit tandemftp");
    println!("RENAME <source> <dest>              Rename file `source` to `dest`");
    println!("RETR <file> <dest> [offset]         Download `file` to `dest`, resuming from `offset`");
    println!("RM <file>                           Remove file");
    println!("RMDIR <dir>                         Remove empty directory");
    println!("RMTREE <dir>                        Remove directory and all its content");
    println!("SIZE <file>                         Get `file` size");
}

fn input() -> Option<Command> {
    loop {
        print!(">> ");
        let _ = io::stdout().flush();
        let mut input: String = String::new();
        match io::stdin().read_line(&mut input) {
            Ok(0) => return None,
            Ok(_) => {}
            Err(err) => {
                eprintln!("Failed to read stdin: {err}");
                return None;
            }
        }
        // Try to create command
        match Command::from_str(input.as_str()) {
            Ok(cmd) => return Some(cmd),
            Err(err) => println!("{err}"),
        }
    }
}

fn main() {
    let args: Args = argh::from_env();
    // print version
    if args.version {
        println!("tandemftp {APP_VERSION} - developed by {APP_AUTHORS}")
    }
    // init logger
    LogBuilder::new()
        .filter_level(if args.debug {
            LevelFilter::Trace
        } else if args.verbose {
            LevelFilter::Info
        } else {
            LevelFilter::Off
        })
        .init();
    // Main loop
    let mut ftp: Option<FtpSession> = None;

    // connect if host is specified
    if let Some(host) = args.host.clone() {
        perform(&args, &mut ftp, Command::Connect(host, false));
    }

    loop {
        match input() {
            None | Some(Command::Quit) => {
                // Break if quit
                quit(&CancelToken::new(), ftp);
                break;
            }
            Some(Command::Help) => usage(),
            Some(cmd) => perform(&args, &mut ftp, cmd),
        }
    }
}

fn perform(args: &Args, ftp: &mut Option<FtpSession>, command: Command) {
    let token = CancelToken::new();
    match ftp {
        Some(ftp) => perform_connected(&token, args, ftp, command),
        None => {
            if let Some(session) = perform_uninitialized(&token, args, command) {
                *ftp = Some(session);
            }
        }
    }
}

fn perform_uninitialized(token: &CancelToken, args: &Args, command: Command) -> Option<FtpSession> {
    match command {
        Command::Connect(remote, secure) => connect(token, args, remote.as_str(), secure),
        _ => {
            eprintln!("Can't perform command: you must connect to remote first");
            None
        }
    }
}

fn perform_connected(token: &CancelToken, args: &Args, ftp: &mut FtpSession, command: Command) {
    match command {
        Command::Cdup => cdup(token, ftp),
        Command::Connect(remote, secure) => {
            if let Some(session) = connect(token, args, remote.as_str(), secure) {
                *ftp = session;
            }
        }
        Command::Cwd(dir) => cwd(token, ftp, dir.as_str()),
        Command::List(p) => list(token, ftp, p.as_deref()),
        Command::Feat => feat(ftp),
        Command::Login => login(token, ftp),
        Command::Mdtm(p) => mdtm(token, ftp, p.as_str()),
        Command::Mkdir(p) => mkdir(token, ftp, p.as_str()),
        Command::Nlst(p) => nlst(token, ftp, p.as_deref()),
        Command::Noop => noop(token, ftp),
        Command::Put(src, dest, offset) => put(token, ftp, src.as_path(), dest.as_str(), offset),
        Command::Pwd => pwd(token, ftp),
        Command::Rename(src, dest) => rename(token, ftp, src.as_str(), dest.as_str()),
        Command::Retr(file, dest, offset) => {
            retr(token, ftp, file.as_str(), dest.as_path(), offset)
        }
        Command::Rm(file) => rm(token, ftp, file.as_str()),
        Command::Rmdir(dir) => rmdir(token, ftp, dir.as_str()),
        Command::Rmtree(dir) => rmtree(token, ftp, dir.as_str()),
        Command::Size(file) => size(token, ftp, file.as_str()),
        Command::Help | Command::Quit => {
            eprintln!("Something unexpected happened")
        }
    }
}
