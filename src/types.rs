//! The set of valid values for FTP commands

use std::convert::From;
use std::error::Error;
use std::fmt;
use std::io;
use std::net::AddrParseError;

/// A shorthand for a Result whose error type is always an FtpError.
pub type Result<T> = ::std::result::Result<T, FtpError>;

/// `FtpError` is a library-global error type to describe the different kinds of
/// errors that might occur while using FTP.
#[derive(Debug)]
pub enum FtpError {
    ConnectionError(io::Error),
    SecureError(String),
    InvalidResponse(String),
    InvalidAddress(AddrParseError),
    /// The server answered with a reply code the command did not expect.
    UnexpectedResponse(Line),
    /// Reading or writing a local file failed.
    LocalError(io::Error),
    /// Invalid connection URL, unsupported scheme or missing capability.
    ConfigurationError(String),
    /// A command other than `connect`/`ssl_connect` was issued without a session.
    NotConnected,
    /// No handler is registered for the command.
    UnknownCommand(String),
    /// A command failed; the message has been normalized.
    CommandError(String),
    /// A path segment exists but is not a directory.
    DirectoryConflict(String),
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

/// Progress of a non-blocking transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStatus {
    Finished,
    MoreData,
}

/// Runtime options of a session, read with `get_option` and changed with `set_option`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FtpOption {
    /// Network timeout in seconds.
    TimeoutSec,
    /// Seek the local file to the resume position before a resumed transfer.
    AutoSeek,
}

/// `Line` contains a command code and the contents of a line of text read from the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line(pub u32, pub String);

impl fmt::Display for FormatControl {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            FormatControl::Default | FormatControl::NonPrint => f.write_str("N"),
            FormatControl::Telnet => f.write_str("T"),
            FormatControl::Asa => f.write_str("C"),
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            FileType::Ascii(ref fc) => write!(f, "A {}", fc),
            FileType::Ebcdic(ref fc) => write!(f, "E {}", fc),
            FileType::Image | FileType::Binary => f.write_str("I"),
            FileType::Local(ref bits) => write!(f, "L {}", bits),
        }
    }
}

impl Line {
    /// The reply text without its leading code.
    pub fn text(&self) -> &str {
        let text = self.1.trim_end();
        if text.starts_with(&self.0.to_string()) {
            text.get(4..).unwrap_or("").trim_start()
        } else {
            text
        }
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.0, self.text())
    }
}

impl fmt::Display for FtpError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            FtpError::ConnectionError(ref ioerr) => write!(f, "FTP ConnectionError: {}", ioerr),
            FtpError::SecureError(ref desc) => write!(f, "FTP SecureError: {}", desc),
            FtpError::InvalidResponse(ref desc) => write!(f, "FTP InvalidResponse: {}", desc),
            FtpError::InvalidAddress(ref perr) => write!(f, "FTP InvalidAddress: {}", perr),
            FtpError::UnexpectedResponse(ref line) => {
                write!(f, "FTP UnexpectedResponse: {}", line)
            }
            FtpError::LocalError(ref ioerr) => write!(f, "FTP LocalError: {}", ioerr),
            FtpError::ConfigurationError(ref desc) => {
                write!(f, "FTP ConfigurationError: {}", desc)
            }
            FtpError::NotConnected => f.write_str(
                "Not connected to FTP server. Call connect() or ssl_connect() first.",
            ),
            FtpError::UnknownCommand(ref name) => write!(f, "Call to undefined command {}().", name),
            FtpError::CommandError(ref msg) => f.write_str(msg),
            FtpError::DirectoryConflict(ref path) => {
                write!(f, "Cannot create directory '{}'.", path)
            }
        }
    }
}

impl Error for FtpError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match *self {
            FtpError::ConnectionError(ref ioerr) | FtpError::LocalError(ref ioerr) => Some(ioerr),
            FtpError::InvalidAddress(ref perr) => Some(perr),
            _ => None,
        }
    }
}

impl From<io::Error> for FtpError {
    fn from(err: io::Error) -> FtpError {
        FtpError::ConnectionError(err)
    }
}
