//! # Status
//!
//! Reply codes defined by RFC 959 and its extensions, as returned on the control connection

use thiserror::Error;

/// Declares `Status` and its code lookup from one `code => Variant: "description"` table
macro_rules! reply_codes {
    ($($code:literal => $variant:ident: $desc:tt,)+) => {
        /// Status code carried by a control connection reply
        #[derive(Debug, Copy, Clone, Error, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[repr(u32)]
        pub enum Status {
            $(
                #[error($desc)]
                $variant = $code,
            )+
            #[error("unknown reply code")]
            Unknown = 0,
        }

        impl From<u32> for Status {
            fn from(code: u32) -> Self {
                match code {
                    $($code => Self::$variant,)+
                    _ => Self::Unknown,
                }
            }
        }
    };
}

reply_codes! {
    // 1xx: preliminary
    110 => RestartMarker: "restart marker reply",
    120 => ReadyMinute: "service ready in (n) minutes",
    125 => AlreadyOpen: "data connection already open, transfer starting",
    150 => AboutToSend: "file status okay, about to open data connection",
    // 2xx: completion
    200 => CommandOk: "command okay",
    202 => CommandNotImplemented: "command not implemented, superfluous at this site",
    211 => System: "system status, or system help reply",
    212 => Directory: "directory status",
    213 => File: "file status",
    214 => Help: "help message",
    215 => Name: "NAME system type",
    220 => Ready: "service ready for new user",
    221 => Closing: "service closing control connection",
    225 => DataConnectionOpen: "data connection open; no transfer in progress",
    226 => ClosingDataConnection: "closing data connection",
    227 => PassiveMode: "entering passive mode",
    228 => LongPassiveMode: "entering long passive mode",
    229 => ExtendedPassiveMode: "entering extended passive mode",
    230 => LoggedIn: "user logged in, proceed",
    231 => LoggedOut: "user logged out; service terminated",
    232 => LogoutAck: "logout command noted, will complete when transfer done",
    234 => AuthOk: "security mechanism accepted",
    250 => RequestedFileActionOk: "requested file action okay, completed",
    257 => PathCreated: "pathname created",
    // 3xx: intermediate
    331 => NeedPassword: "user name okay, need password",
    332 => LoginNeedAccount: "need account for login",
    350 => RequestFilePending: "requested file action pending further information",
    // 4xx: transient failure
    421 => NotAvailable: "service not available, closing control connection",
    425 => CannotOpenDataConnection: "can't open data connection",
    426 => TransferAborted: "connection closed; transfer aborted",
    430 => InvalidCredentials: "invalid username or password",
    434 => HostUnavailable: "requested host unavailable",
    450 => RequestFileActionIgnored: "requested file action not taken",
    451 => ActionAborted: "requested action aborted; local error in processing",
    452 => RequestedActionNotTaken: "requested action not taken; insufficient storage",
    // 5xx: permanent failure
    500 => BadCommand: "syntax error, command unrecognized",
    501 => BadArguments: "syntax error in parameters or arguments",
    502 => NotImplemented: "command not implemented",
    503 => BadSequence: "bad sequence of commands",
    504 => NotImplementedParameter: "command not implemented for that parameter",
    530 => NotLoggedIn: "user not logged in",
    532 => StoringNeedAccount: "need account for storing files",
    550 => FileUnavailable: "requested action not taken; file unavailable",
    551 => PageTypeUnknown: "requested action aborted; page type unknown",
    552 => ExceededStorage: "requested file action aborted; exceeded storage allocation",
    553 => BadFilename: "requested action not taken; file name not allowed",
}

impl Status {
    /// Get the numeric reply code
    pub fn code(&self) -> u32 {
        *self as u32
    }

    /// Get the reply description
    pub fn desc(&self) -> String {
        self.to_string()
    }
}
