use super::{Args, FtpSession};

use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::Path;
use tandemftp::native_tls::TlsConnector;
use tandemftp::{CancelToken, NativeTlsConnector, SessionConfig, TransferStream};

pub fn quit(token: &CancelToken, mut ftp: Option<FtpSession>) {
    if let Some(mut ftp) = ftp.take() {
        match ftp.quit(token) {
            Ok(_) => println!("OK"),
            Err(err) => eprintln!("Failed to disconnect from remote: {}", err),
        }
    }
}

pub fn cdup(token: &CancelToken, ftp: &mut FtpSession) {
    match ftp.cdup(token) {
        Ok(_) => println!("OK"),
        Err(err) => eprintln!("CDUP error: {}", err),
    }
}

pub fn connect(token: &CancelToken, args: &Args, remote: &str, secure: bool) -> Option<FtpSession> {
    let mut config = SessionConfig::default().with_disable_epsv(args.disable_epsv);
    if let Some(timeout) = args.connect_timeout() {
        config = config.with_connect_timeout(timeout);
    }
    if let Some(timeout) = args.data_timeout() {
        config = config.with_data_timeout(timeout);
    }
    // if secure, enable TLS
    if secure {
        let ctx = match TlsConnector::builder()
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true)
            .build()
        {
            Ok(tls) => tls,
            Err(err) => {
                eprintln!("Failed to setup TLS stream: {}", err);
                return None;
            }
        };
        // Get address without port
        let address = remote.split(':').next().unwrap_or(remote);
        config = config.with_tls(NativeTlsConnector::from(ctx), address);
    }
    match FtpSession::connect(remote, config, token) {
        Ok(session) => {
            if let Some(welcome) = session.welcome_msg() {
                println!("{welcome}");
            }
            println!("OK");
            Some(session)
        }
        Err(err) => {
            eprintln!("Failed to connect to remote: {}", err);
            None
        }
    }
}

pub fn cwd(token: &CancelToken, ftp: &mut FtpSession, dir: &str) {
    match ftp.cwd(token, dir) {
        Ok(_) => println!("OK"),
        Err(err) => eprintln!("CWD error: {}", err),
    }
}

pub fn feat(ftp: &mut FtpSession) {
    let mut features: Vec<_> = ftp.features().iter().collect();
    features.sort();
    for (name, params) in features {
        match params {
            Some(params) => println!("{name} {params}"),
            None => println!("{name}"),
        }
    }
}

pub fn list(token: &CancelToken, ftp: &mut FtpSession, p: Option<&str>) {
    match ftp.list(token, p) {
        Ok(files) => {
            files.iter().for_each(|f| println!("{}", f));
        }
        Err(err) => eprintln!("LIST error: {}", err),
    }
}

pub fn nlst(token: &CancelToken, ftp: &mut FtpSession, p: Option<&str>) {
    match ftp.nlst(token, p) {
        Ok(names) => {
            names.iter().for_each(|n| println!("{}", n));
        }
        Err(err) => eprintln!("NLST error: {}", err),
    }
}

pub fn login(token: &CancelToken, ftp: &mut FtpSession) {
    // Read username
    print!("Username: ");
    let _ = io::stdout().flush();
    let mut username = String::new();
    if let Err(err) = io::stdin().read_line(&mut username) {
        eprintln!("Could not read username: {}", err);
        return;
    }
    // Read password
    let password: String = match rpassword::prompt_password("Password: ") {
        Ok(p) => p,
        Err(err) => {
            eprintln!("Could not read password: {}", err);
            return;
        }
    };
    // Login
    match ftp.login(token, username.trim(), password.as_str()) {
        Ok(_) => println!("OK"),
        Err(err) => eprintln!("LOGIN error: {}", err),
    }
}

pub fn mdtm(token: &CancelToken, ftp: &mut FtpSession, f: &str) {
    match ftp.mdtm(token, f) {
        Ok(time) => println!("OK: {}", time),
        Err(err) => eprintln!("MDTM error: {}", err),
    }
}

pub fn mkdir(token: &CancelToken, ftp: &mut FtpSession, f: &str) {
    match ftp.mkdir(token, f) {
        Ok(_) => println!("OK"),
        Err(err) => eprintln!("MKDIR error: {}", err),
    }
}

pub fn noop(token: &CancelToken, ftp: &mut FtpSession) {
    match ftp.noop(token) {
        Ok(_) => println!("OK"),
        Err(err) => eprintln!("NOOP error: {}", err),
    }
}

pub fn put(token: &CancelToken, ftp: &mut FtpSession, local: &Path, dest: &str, offset: u64) {
    let mut reader = match File::open(local) {
        Ok(r) => r,
        Err(err) => {
            eprintln!("Failed to open local file for read: {}", err);
            return;
        }
    };
    if let Err(err) = reader.seek(SeekFrom::Start(offset)) {
        eprintln!("Failed to seek local file: {}", err);
        return;
    }
    match ftp.put_file_from(token, dest, &mut reader, offset) {
        Ok(_) => println!("OK"),
        Err(err) => eprintln!("PUT error: {}", err),
    }
}

pub fn pwd(token: &CancelToken, ftp: &mut FtpSession) {
    match ftp.pwd(token) {
        Ok(p) => println!("OK: {}", p),
        Err(err) => eprintln!("PWD error: {}", err),
    }
}

pub fn rename(token: &CancelToken, ftp: &mut FtpSession, src: &str, dest: &str) {
    match ftp.rename(token, src, dest) {
        Ok(_) => println!("OK"),
        Err(err) => eprintln!("RENAME error: {}", err),
    }
}

pub fn retr(token: &CancelToken, ftp: &mut FtpSession, file: &str, dest: &Path, offset: u64) {
    // resuming appends to what has been downloaded already
    let opened = if offset == 0 {
        File::create(dest)
    } else {
        OpenOptions::new().append(true).open(dest)
    };
    let mut dest: File = match opened {
        Ok(d) => d,
        Err(err) => {
            eprintln!("Failed to open destination file: {}", err);
            return;
        }
    };
    let mut stream = match ftp.retr_from(token, file, offset) {
        Ok(stream) => stream,
        Err(err) => {
            eprintln!("RETR error: {}", err);
            return;
        }
    };
    match io::copy(&mut stream, &mut dest) {
        Ok(bytes) => match stream.close() {
            Ok(()) => println!("OK: {} bytes", bytes),
            Err(err) => eprintln!("RETR error: {}", err),
        },
        Err(err) => eprintln!("RETR error: {}", err),
    }
}

pub fn rm(token: &CancelToken, ftp: &mut FtpSession, file: &str) {
    match ftp.rm(token, file) {
        Ok(_) => println!("OK"),
        Err(err) => eprintln!("RM error: {}", err),
    }
}

pub fn rmdir(token: &CancelToken, ftp: &mut FtpSession, dir: &str) {
    match ftp.rmdir(token, dir) {
        Ok(_) => println!("OK"),
        Err(err) => eprintln!("RMDIR error: {}", err),
    }
}

pub fn rmtree(token: &CancelToken, ftp: &mut FtpSession, dir: &str) {
    match ftp.rmdir_recursive(token, dir) {
        Ok(_) => println!("OK"),
        Err(err) => eprintln!("RMTREE error: {}", err),
    }
}

pub fn size(token: &CancelToken, ftp: &mut FtpSession, file: &str) {
    match ftp.size(token, file) {
        Ok(size) => println!("OK: {}", size),
        Err(err) => eprintln!("SIZE error: {}", err),
    }
}
