use std::time::Duration;

use argh::FromArgs;

#[derive(FromArgs)]
#[argh(description = "Interactive FTP client. Type HELP once started to see the available commands")]
pub struct Args {
    #[argh(switch, short = 'D', description = "enable TRACE log level")]
    pub debug: bool,
    #[argh(switch, short = 'v', description = "verbose mode")]
    pub verbose: bool,
    #[argh(switch, short = 'V', description = "print version")]
    pub version: bool,
    #[argh(option, description = "connect timeout in seconds")]
    pub timeout: Option<u64>,
    #[argh(
        option,
        description = "seconds a data connection may stay silent before the transfer fails"
    )]
    pub data_timeout: Option<u64>,
    #[argh(switch, description = "never use EPSV; always use PASV")]
    pub disable_epsv: bool,
    #[argh(positional, description = "host to connect to")]
    pub host: Option<String>,
}

impl Args {
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_secs)
    }

    pub fn data_timeout(&self) -> Option<Duration> {
        self.data_timeout.map(Duration::from_secs)
    }
}
