//! The seam between the command dispatcher and the FTP transport.
//!
//! `Session` is one open control connection; `Connector` opens them. The
//! dispatcher only ever talks to these traits, `FtpStream` and `TcpConnector`
//! are the implementations used over the network.

use std::fs::File;
use std::io::{copy, Read, Write};
use std::time::Duration;

use chrono::{DateTime, Utc};
#[cfg(feature = "secure")]
use openssl::ssl::{SslConnector, SslMethod};

use super::ftp::FtpStream;
use super::types::{FileType, FtpError, Result, TransferStatus};

/// An open FTP control connection.
pub trait Session {
    fn login(&mut self, user: &str, password: &str) -> Result<()>;
    fn set_passive(&mut self, passive: bool) -> Result<()>;
    fn cwd(&mut self, path: &str) -> Result<()>;
    fn cdup(&mut self) -> Result<()>;
    fn pwd(&mut self) -> Result<String>;
    /// Returns the created directory as reported by the server.
    fn mkdir(&mut self, path: &str) -> Result<String>;
    fn rmdir(&mut self, path: &str) -> Result<()>;
    fn rm(&mut self, path: &str) -> Result<()>;
    fn nlst(&mut self, path: Option<&str>) -> Result<Vec<String>>;
    /// Long listing of `path`, descending into subdirectories (`LIST -R`)
    /// when `recursive` is set.
    fn list(&mut self, path: Option<&str>, recursive: bool) -> Result<Vec<String>>;
    fn size(&mut self, path: &str) -> Result<Option<usize>>;
    fn mdtm(&mut self, path: &str) -> Result<Option<DateTime<Utc>>>;
    fn rename(&mut self, from: &str, to: &str) -> Result<()>;
    fn transfer_type(&mut self, file_type: FileType) -> Result<()>;

    /// Downloads `remote` starting at byte `offset` into `writer`.
    fn retr_to(&mut self, remote: &str, offset: u64, writer: &mut dyn Write) -> Result<u64>;
    /// Uploads `reader` to `remote`, the server writing from byte `offset`.
    fn stor_from(&mut self, remote: &str, offset: u64, reader: &mut dyn Read) -> Result<u64>;
    fn begin_retr(&mut self, remote: &str, offset: u64, local: File) -> Result<TransferStatus>;
    fn begin_stor(&mut self, remote: &str, offset: u64, local: File) -> Result<TransferStatus>;
    fn continue_transfer(&mut self) -> Result<TransferStatus>;

    /// Raw command; returns every reply line.
    fn quote(&mut self, command: &str) -> Result<Vec<String>>;
    /// SITE command; returns the reply text.
    fn site(&mut self, command: &str) -> Result<String>;
    fn alloc(&mut self, size: u64) -> Result<String>;
    fn syst(&mut self) -> Result<String>;
    fn timeout(&self) -> Option<Duration>;
    fn set_timeout(&mut self, timeout: Option<Duration>) -> Result<()>;
    fn quit(&mut self) -> Result<()>;

    fn chmod(&mut self, mode: u32, path: &str) -> Result<()> {
        self.site(&format!("CHMOD {:o} {}", mode, path)).map(|_| ())
    }

    fn exec(&mut self, command: &str) -> Result<()> {
        self.site(&format!("EXEC {}", command)).map(|_| ())
    }
}

/// Opens control connections.
pub trait Connector {
    fn connect(&self, host: &str, port: u16, timeout: Option<Duration>) -> Result<Box<dyn Session>>;
    fn ssl_connect(&self, host: &str, port: u16, timeout: Option<Duration>) -> Result<Box<dyn Session>>;
    /// False when `ssl_connect` can never succeed.
    fn supports_tls(&self) -> bool;
}

/// Connects over TCP with `FtpStream`, securing the connection with explicit
/// FTPS when the `secure` feature is enabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    fn connect(&self, host: &str, port: u16, timeout: Option<Duration>) -> Result<Box<dyn Session>> {
        debug!("connecting to {}:{}", host, port);
        let stream = FtpStream::connect_timeout(host, port, timeout)?;
        Ok(Box::new(stream))
    }

    #[cfg(feature = "secure")]
    fn ssl_connect(&self, host: &str, port: u16, timeout: Option<Duration>) -> Result<Box<dyn Session>> {
        debug!("connecting to {}:{} with TLS", host, port);
        let connector = SslConnector::builder(SslMethod::tls())
            .map_err(|e| FtpError::SecureError(e.to_string()))?
            .build();
        let stream = FtpStream::connect_timeout(host, port, timeout)?.into_secure(connector, host)?;
        Ok(Box::new(stream))
    }

    #[cfg(not(feature = "secure"))]
    fn ssl_connect(&self, _host: &str, _port: u16, _timeout: Option<Duration>) -> Result<Box<dyn Session>> {
        Err(FtpError::ConfigurationError(
            "FTPS support is not compiled in, enable the `secure` feature".to_owned(),
        ))
    }

    fn supports_tls(&self) -> bool {
        cfg!(feature = "secure")
    }
}

impl Session for FtpStream {
    fn login(&mut self, user: &str, password: &str) -> Result<()> {
        FtpStream::login(self, user, password)
    }

    fn set_passive(&mut self, passive: bool) -> Result<()> {
        FtpStream::set_passive(self, passive);
        Ok(())
    }

    fn cwd(&mut self, path: &str) -> Result<()> {
        FtpStream::cwd(self, path)
    }

    fn cdup(&mut self) -> Result<()> {
        FtpStream::cdup(self)
    }

    fn pwd(&mut self) -> Result<String> {
        FtpStream::pwd(self)
    }

    fn mkdir(&mut self, path: &str) -> Result<String> {
        FtpStream::mkdir(self, path)
    }

    fn rmdir(&mut self, path: &str) -> Result<()> {
        FtpStream::rmdir(self, path)
    }

    fn rm(&mut self, path: &str) -> Result<()> {
        FtpStream::rm(self, path)
    }

    fn nlst(&mut self, path: Option<&str>) -> Result<Vec<String>> {
        FtpStream::nlst(self, path)
    }

    fn list(&mut self, path: Option<&str>, recursive: bool) -> Result<Vec<String>> {
        if recursive {
            FtpStream::list_recursive(self, path)
        } else {
            FtpStream::list(self, path)
        }
    }

    fn size(&mut self, path: &str) -> Result<Option<usize>> {
        FtpStream::size(self, path)
    }

    fn mdtm(&mut self, path: &str) -> Result<Option<DateTime<Utc>>> {
        FtpStream::mdtm(self, path)
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        FtpStream::rename(self, from, to)
    }

    fn transfer_type(&mut self, file_type: FileType) -> Result<()> {
        FtpStream::transfer_type(self, file_type)
    }

    fn retr_to(&mut self, remote: &str, offset: u64, writer: &mut dyn Write) -> Result<u64> {
        if offset > 0 {
            self.resume_transfer(offset)?;
        }
        self.retr(remote, |stream| copy(stream, &mut *writer).map_err(FtpError::ConnectionError))
    }

    fn stor_from(&mut self, remote: &str, offset: u64, reader: &mut dyn Read) -> Result<u64> {
        if offset > 0 {
            self.resume_transfer(offset)?;
        }
        self.put(remote, reader)
    }

    fn begin_retr(&mut self, remote: &str, offset: u64, local: File) -> Result<TransferStatus> {
        if offset > 0 {
            self.resume_transfer(offset)?;
        }
        self.nb_retr(remote, local)
    }

    fn begin_stor(&mut self, remote: &str, offset: u64, local: File) -> Result<TransferStatus> {
        if offset > 0 {
            self.resume_transfer(offset)?;
        }
        self.nb_stor(remote, local)
    }

    fn continue_transfer(&mut self) -> Result<TransferStatus> {
        self.nb_continue()
    }

    fn quote(&mut self, command: &str) -> Result<Vec<String>> {
        FtpStream::quote(self, command)
    }

    fn site(&mut self, command: &str) -> Result<String> {
        FtpStream::site(self, command).map(|line| line.text().to_owned())
    }

    fn alloc(&mut self, size: u64) -> Result<String> {
        FtpStream::alloc(self, size)
    }

    fn syst(&mut self) -> Result<String> {
        FtpStream::syst(self)
    }

    fn timeout(&self) -> Option<Duration> {
        FtpStream::timeout(self)
    }

    fn set_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        FtpStream::set_timeout(self, timeout)
    }

    fn quit(&mut self) -> Result<()> {
        FtpStream::quit(self)
    }
}
