//! FTP module.

use std::borrow::Cow;
use std::fs::File;
use std::io::{self, copy, BufRead, BufReader, BufWriter, ErrorKind, Read, Write};
use std::net::{IpAddr, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::str::FromStr;
use std::time::Duration;

use chrono::offset::TimeZone;
use chrono::{DateTime, Utc};
#[cfg(feature = "secure")]
use openssl::ssl::SslConnector;
use regex::Regex;

use super::data_stream::DataStream;
use super::status;
use super::types::{FileType, FtpError, Line, Result, TransferStatus};

lazy_static! {
    // This regex extracts IP and Port details from PASV command response.
    // The regex looks for the pattern (h1,h2,h3,h4,p1,p2).
    static ref PORT_RE: Regex = Regex::new(r"\((\d+),(\d+),(\d+),(\d+),(\d+),(\d+)\)").unwrap();

    // This regex extracts the port from EPSV command response: (|||port|).
    static ref EPSV_RE: Regex = Regex::new(r"\(\|\|\|(\d+)\|\)").unwrap();

    // This regex extracts modification time from MDTM command response.
    static ref MDTM_RE: Regex = Regex::new(r"\b(\d{4})(\d{2})(\d{2})(\d{2})(\d{2})(\d{2})\b").unwrap();

    // This regex extracts file size from SIZE command response.
    static ref SIZE_RE: Regex = Regex::new(r"\s+(\d+)\s*$").unwrap();
}

/// Bytes moved by one step of a non-blocking transfer.
const CHUNK_SIZE: usize = 8192;

#[derive(Debug, Clone, Copy)]
enum Direction {
    Download,
    Upload,
}

/// A non-blocking transfer waiting for `nb_continue`.
#[derive(Debug)]
struct PendingTransfer {
    data: DataStream,
    local: File,
    direction: Direction,
}

/// Stream to interface with the FTP server. This interface is only for the command stream.
#[derive(Debug)]
pub struct FtpStream {
    reader: BufReader<DataStream>,
    passive: bool,
    timeout: Option<Duration>,
    pending: Option<PendingTransfer>,
    #[cfg(feature = "secure")]
    tls: Option<(SslConnector, String)>,
}

impl FtpStream {
    /// Creates an FTP Stream.
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<FtpStream> {
        let stream = TcpStream::connect(addr).map_err(FtpError::ConnectionError)?;
        FtpStream::from_tcp(stream, None)
    }

    /// Creates an FTP Stream, giving up on each resolved address of `host` after
    /// `timeout`. The same timeout then applies to every read and write.
    pub fn connect_timeout(host: &str, port: u16, timeout: Option<Duration>) -> Result<FtpStream> {
        let timeout = match timeout {
            Some(timeout) => timeout,
            None => return FtpStream::connect((host, port)),
        };

        let mut last_err = None;
        for addr in (host, port).to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => return FtpStream::from_tcp(stream, Some(timeout)),
                Err(err) => last_err = Some(err),
            }
        }
        Err(FtpError::ConnectionError(last_err.unwrap_or_else(|| {
            io::Error::new(ErrorKind::AddrNotAvailable, format!("could not resolve {}", host))
        })))
    }

    fn from_tcp(stream: TcpStream, timeout: Option<Duration>) -> Result<FtpStream> {
        let data = DataStream::Tcp(stream);
        data.set_timeout(timeout)?;
        let mut ftp_stream = FtpStream {
            reader: BufReader::new(data),
            passive: true,
            timeout,
            pending: None,
            #[cfg(feature = "secure")]
            tls: None,
        };
        ftp_stream.read_response(status::READY)?;
        Ok(ftp_stream)
    }

    /// Switch to a secure mode if possible, using a provided TLS connector.
    /// `domain` is the name the server certificate is verified against.
    /// This method does nothing if the connection is already secured.
    ///
    /// ## Example
    ///
    /// ```rust,no_run
    /// use ftp_session::FtpStream;
    /// use openssl::ssl::{SslConnector, SslMethod};
    ///
    /// let connector = SslConnector::builder(SslMethod::tls()).unwrap().build();
    /// let ftp_stream = FtpStream::connect("127.0.0.1:21").unwrap();
    /// let mut ftp_stream = ftp_stream.into_secure(connector, "localhost").unwrap();
    /// let _ = ftp_stream.quit();
    /// ```
    #[cfg(feature = "secure")]
    pub fn into_secure(mut self, connector: SslConnector, domain: &str) -> Result<FtpStream> {
        if let DataStream::Ssl(_) = *self.reader.get_ref() {
            return Ok(self);
        }
        // Ask the server to start securing data.
        self.write_str("AUTH TLS\r\n")?;
        self.read_response(status::AUTH_OK)?;
        let tcp = match self.reader.into_inner() {
            DataStream::Tcp(stream) => stream,
            DataStream::Ssl(_) => {
                return Err(FtpError::SecureError("control channel is already secured".to_owned()))
            }
        };
        let stream = connector
            .connect(domain, tcp)
            .map_err(|e| FtpError::SecureError(e.to_string()))?;

        let mut secured_ftp_stream = FtpStream {
            reader: BufReader::new(DataStream::Ssl(stream)),
            passive: self.passive,
            timeout: self.timeout,
            pending: None,
            tls: Some((connector, domain.to_owned())),
        };
        // Set protection buffer size
        secured_ftp_stream.write_str("PBSZ 0\r\n")?;
        secured_ftp_stream.read_response(status::COMMAND_OK)?;
        // Change the level of data protection to Private
        secured_ftp_stream.write_str("PROT P\r\n")?;
        secured_ftp_stream.read_response(status::COMMAND_OK)?;
        Ok(secured_ftp_stream)
    }

    /// Execute command which send data back in a separate stream. The
    /// preliminary reply must be one of `open_codes`.
    fn data_command(&mut self, cmd: &str, open_codes: &[u32]) -> Result<DataStream> {
        let stream = if self.passive {
            let addr = self.pasv()?;
            self.write_str(cmd)?;
            let stream = TcpStream::connect(addr).map_err(FtpError::ConnectionError)?;
            self.read_response_in(open_codes)?;
            stream
        } else {
            let listener = self.active()?;
            self.write_str(cmd)?;
            // The server only connects back once it accepted the command.
            self.read_response_in(open_codes)?;
            let (stream, _) = listener.accept().map_err(FtpError::ConnectionError)?;
            stream
        };
        let data = self.secure_data(stream)?;
        data.set_timeout(self.timeout)?;
        Ok(data)
    }

    #[cfg(feature = "secure")]
    fn secure_data(&self, stream: TcpStream) -> Result<DataStream> {
        match self.tls {
            Some((ref connector, ref domain)) => connector
                .connect(domain, stream)
                .map(DataStream::Ssl)
                .map_err(|e| FtpError::SecureError(e.to_string())),
            None => Ok(DataStream::Tcp(stream)),
        }
    }

    #[cfg(not(feature = "secure"))]
    fn secure_data(&self, stream: TcpStream) -> Result<DataStream> {
        Ok(DataStream::Tcp(stream))
    }

    /// Returns a reference to the underlying TcpStream.
    ///
    /// Example:
    /// ```no_run
    /// use std::time::Duration;
    /// use ftp_session::FtpStream;
    ///
    /// let stream = FtpStream::connect("127.0.0.1:21")
    ///                        .expect("Couldn't connect to the server...");
    /// stream.get_ref().set_read_timeout(Some(Duration::from_secs(10)))
    ///                 .expect("set_read_timeout call failed");
    /// ```
    pub fn get_ref(&self) -> &TcpStream {
        self.reader.get_ref().get_ref()
    }

    /// Selects passive (`PASV`/`EPSV`) or active (`PORT`/`EPRT`) data connections.
    pub fn set_passive(&mut self, passive: bool) {
        self.passive = passive;
    }

    /// True when data connections are opened in passive mode.
    pub fn is_passive(&self) -> bool {
        self.passive
    }

    /// The network timeout of the control and data connections.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Changes the network timeout of the control connection and of every
    /// later data connection.
    pub fn set_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.reader.get_ref().set_timeout(timeout)?;
        self.timeout = timeout;
        Ok(())
    }

    /// Log in to the FTP server.
    pub fn login(&mut self, user: &str, password: &str) -> Result<()> {
        self.write_str(format!("USER {}\r\n", user))?;
        let Line(code, _) = self.read_response_in(&[status::LOGGED_IN, status::NEED_PASSWORD])?;
        if code == status::NEED_PASSWORD {
            self.write_str(format!("PASS {}\r\n", password))?;
            self.read_response(status::LOGGED_IN)?;
        }
        Ok(())
    }

    /// Change the current directory to the path specified.
    pub fn cwd(&mut self, path: &str) -> Result<()> {
        self.write_str(format!("CWD {}\r\n", path))?;
        self.read_response(status::REQUESTED_FILE_ACTION_OK).map(|_| ())
    }

    /// Move the current directory to the parent directory.
    pub fn cdup(&mut self) -> Result<()> {
        self.write_str("CDUP\r\n")?;
        self.read_response_in(&[status::COMMAND_OK, status::REQUESTED_FILE_ACTION_OK])
            .map(|_| ())
    }

    /// Gets the current directory
    pub fn pwd(&mut self) -> Result<String> {
        self.write_str("PWD\r\n")?;
        let Line(_, content) = self.read_response(status::PATH_CREATED)?;
        quoted_path(&content)
            .ok_or_else(|| FtpError::InvalidResponse(format!("Invalid PWD Response: {}", content)))
    }

    /// This creates a new directory on the server and returns its name as
    /// reported by the server.
    pub fn mkdir(&mut self, pathname: &str) -> Result<String> {
        self.write_str(format!("MKD {}\r\n", pathname))?;
        let Line(_, content) = self.read_response(status::PATH_CREATED)?;
        Ok(quoted_path(&content).unwrap_or_else(|| pathname.to_owned()))
    }

    /// Runs the PASV command, or EPSV when the control connection is IPv6.
    fn pasv(&mut self) -> Result<SocketAddr> {
        if self.get_ref().peer_addr()?.is_ipv6() {
            return self.epsv();
        }
        self.write_str("PASV\r\n")?;
        // PASV response format : 227 Entering Passive Mode (h1,h2,h3,h4,p1,p2).
        let Line(_, line) = self.read_response(status::PASSIVE_MODE)?;
        let invalid = || FtpError::InvalidResponse(format!("Invalid PASV response: {}", line.trim_end()));
        let caps = PORT_RE.captures(&line).ok_or_else(invalid)?;
        let mut fields = [0u8; 6];
        for (i, field) in fields.iter_mut().enumerate() {
            *field = caps[i + 1].parse().map_err(|_| invalid())?;
        }
        let port = (u16::from(fields[4]) << 8) + u16::from(fields[5]);
        let addr = format!("{}.{}.{}.{}:{}", fields[0], fields[1], fields[2], fields[3], port);
        SocketAddr::from_str(&addr).map_err(FtpError::InvalidAddress)
    }

    /// Runs the EPSV command; the data connection goes to the control peer.
    fn epsv(&mut self) -> Result<SocketAddr> {
        self.write_str("EPSV\r\n")?;
        // EPSV response format : 229 Entering Extended Passive Mode (|||port|).
        let Line(_, line) = self.read_response(status::EXTENDED_PASSIVE_MODE)?;
        let port = EPSV_RE
            .captures(&line)
            .and_then(|caps| caps[1].parse::<u16>().ok())
            .ok_or_else(|| FtpError::InvalidResponse(format!("Invalid EPSV response: {}", line.trim_end())))?;
        let ip = self.get_ref().peer_addr()?.ip();
        Ok(SocketAddr::new(ip, port))
    }

    /// Listens for the server to connect back and announces the address
    /// with PORT, or EPRT when the control connection is IPv6.
    fn active(&mut self) -> Result<TcpListener> {
        let ip = self.get_ref().local_addr()?.ip();
        let listener = TcpListener::bind((ip, 0)).map_err(FtpError::ConnectionError)?;
        let port = listener.local_addr()?.port();
        let command = match ip {
            IpAddr::V4(ip) => {
                let o = ip.octets();
                format!("PORT {},{},{},{},{},{}\r\n", o[0], o[1], o[2], o[3], port >> 8, port & 0xff)
            }
            IpAddr::V6(ip) => format!("EPRT |2|{}|{}|\r\n", ip, port),
        };
        self.write_str(command)?;
        self.read_response(status::COMMAND_OK)?;
        Ok(listener)
    }

    /// Sets the type of file to be transferred. That is the implementation
    /// of `TYPE` command.
    pub fn transfer_type(&mut self, file_type: FileType) -> Result<()> {
        self.write_str(format!("TYPE {}\r\n", file_type))?;
        self.read_response(status::COMMAND_OK).map(|_| ())
    }

    /// Makes the next transfer start at `offset` bytes (`REST`).
    pub fn resume_transfer(&mut self, offset: u64) -> Result<()> {
        self.write_str(format!("REST {}\r\n", offset))?;
        self.read_response(status::REQUEST_FILE_PENDING).map(|_| ())
    }

    /// Quits the current FTP session.
    pub fn quit(&mut self) -> Result<()> {
        self.pending = None;
        self.write_str("QUIT\r\n")?;
        self.read_response(status::CLOSING).map(|_| ())
    }

    /// Renames the file from_name to to_name
    pub fn rename(&mut self, from_name: &str, to_name: &str) -> Result<()> {
        self.write_str(format!("RNFR {}\r\n", from_name))?;
        self.read_response(status::REQUEST_FILE_PENDING)?;
        self.write_str(format!("RNTO {}\r\n", to_name))?;
        self.read_response(status::REQUESTED_FILE_ACTION_OK).map(|_| ())
    }

    /// The implementation of `RETR` command where `filename` is the name of the file
    /// to download from FTP and `reader` is the function which operates with the
    /// data stream opened.
    ///
    /// ```no_run
    /// # use ftp_session::{FtpStream, FtpError};
    /// # use std::io::Read;
    /// # let mut conn = FtpStream::connect("127.0.0.1:21").unwrap();
    /// let text = conn.retr("retr.txt", |stream| {
    ///     let mut buf = Vec::new();
    ///     stream.read_to_end(&mut buf).map(|_| buf).map_err(FtpError::ConnectionError)
    /// }).unwrap();
    /// ```
    pub fn retr<F, T>(&mut self, filename: &str, mut reader: F) -> Result<T>
    where
        F: FnMut(&mut dyn Read) -> Result<T>,
    {
        let retr_command = format!("RETR {}\r\n", filename);
        let res = {
            let mut data_stream = BufReader::new(
                self.data_command(&retr_command, &[status::ABOUT_TO_SEND, status::ALREADY_OPEN])?,
            );
            reader(&mut data_stream)?
        };
        self.read_response_in(&[status::CLOSING_DATA_CONNECTION, status::REQUESTED_FILE_ACTION_OK])?;
        Ok(res)
    }

    /// Removes the remote pathname from the server.
    pub fn rmdir(&mut self, pathname: &str) -> Result<()> {
        self.write_str(format!("RMD {}\r\n", pathname))?;
        self.read_response(status::REQUESTED_FILE_ACTION_OK).map(|_| ())
    }

    /// Remove the remote file from the server.
    pub fn rm(&mut self, filename: &str) -> Result<()> {
        self.write_str(format!("DELE {}\r\n", filename))?;
        self.read_response(status::REQUESTED_FILE_ACTION_OK).map(|_| ())
    }

    /// Send STOR command and returns a BufWriter, which references the file created on the server.
    /// The returned stream must be then correctly manipulated to write the content of the source file to the remote destination.
    /// The stream must be then correctly dropped and the closing reply read.
    fn put_with_stream(&mut self, filename: &str) -> Result<BufWriter<DataStream>> {
        let stor_command = format!("STOR {}\r\n", filename);
        let stream = self.data_command(&stor_command, &[status::ALREADY_OPEN, status::ABOUT_TO_SEND])?;
        Ok(BufWriter::new(stream))
    }

    /// This stores a file on the server and returns the number of bytes sent.
    /// r argument must be any struct which implements the Read trait
    pub fn put<R: Read + ?Sized>(&mut self, filename: &str, r: &mut R) -> Result<u64> {
        let sent = {
            let mut data_stream = self.put_with_stream(filename)?;
            let sent = copy(r, &mut data_stream).map_err(FtpError::ConnectionError)?;
            data_stream.flush()?;
            sent
        };
        self.read_response_in(&[status::CLOSING_DATA_CONNECTION, status::REQUESTED_FILE_ACTION_OK])?;
        Ok(sent)
    }

    /// Starts a non-blocking download of `filename` into `local` and moves the first chunk.
    pub fn nb_retr(&mut self, filename: &str, local: File) -> Result<TransferStatus> {
        self.start_transfer(format!("RETR {}\r\n", filename), local, Direction::Download)
    }

    /// Starts a non-blocking upload of `local` to `filename` and moves the first chunk.
    pub fn nb_stor(&mut self, filename: &str, local: File) -> Result<TransferStatus> {
        self.start_transfer(format!("STOR {}\r\n", filename), local, Direction::Upload)
    }

    fn start_transfer(&mut self, cmd: String, local: File, direction: Direction) -> Result<TransferStatus> {
        if self.pending.is_some() {
            return Err(FtpError::CommandError("a transfer is already in progress".to_owned()));
        }
        let data = self.data_command(&cmd, &[status::ABOUT_TO_SEND, status::ALREADY_OPEN])?;
        self.pending = Some(PendingTransfer { data, local, direction });
        self.nb_continue()
    }

    /// Moves the next chunk of the pending non-blocking transfer.
    pub fn nb_continue(&mut self) -> Result<TransferStatus> {
        let mut pending = match self.pending.take() {
            Some(pending) => pending,
            None => return Err(FtpError::CommandError("no transfer in progress".to_owned())),
        };

        let mut buf = [0u8; CHUNK_SIZE];
        let step = match pending.direction {
            Direction::Download => pending
                .data
                .read(&mut buf)
                .map_err(FtpError::ConnectionError)
                .and_then(|n| pending.local.write_all(&buf[..n]).map(|_| n).map_err(FtpError::LocalError)),
            Direction::Upload => pending
                .local
                .read(&mut buf)
                .map_err(FtpError::LocalError)
                .and_then(|n| pending.data.write_all(&buf[..n]).map(|_| n).map_err(FtpError::ConnectionError)),
        };

        match step {
            Ok(0) => {
                drop(pending);
                self.read_response_in(&[status::CLOSING_DATA_CONNECTION, status::REQUESTED_FILE_ACTION_OK])?;
                Ok(TransferStatus::Finished)
            }
            Ok(_) => {
                self.pending = Some(pending);
                Ok(TransferStatus::MoreData)
            }
            Err(err) => {
                drop(pending);
                // The server still reports the aborted transfer.
                let _ = self.read_reply();
                Err(err)
            }
        }
    }

    /// Execute a command which returns list of strings in a separate stream
    fn list_command(&mut self, cmd: Cow<'static, str>) -> Result<Vec<String>> {
        let mut text = String::new();
        {
            let mut data_stream = self.data_command(&cmd, &[status::ABOUT_TO_SEND, status::ALREADY_OPEN])?;
            data_stream.read_to_string(&mut text).map_err(FtpError::ConnectionError)?;
        }
        self.read_response_in(&[status::CLOSING_DATA_CONNECTION, status::REQUESTED_FILE_ACTION_OK])?;
        Ok(text.lines().filter(|s| !s.is_empty()).map(String::from).collect())
    }

    /// Execute `LIST` command which returns the detailed file listing in human readable format.
    /// If `pathname` is omited then the list of files in the current directory will be
    /// returned otherwise it will the list of files on `pathname`.
    pub fn list(&mut self, pathname: Option<&str>) -> Result<Vec<String>> {
        let command = pathname.map_or("LIST\r\n".into(), |path| format!("LIST {}\r\n", path).into());
        self.list_command(command)
    }

    /// Same as `list`, but asks the server to descend into subdirectories with `LIST -R`.
    pub fn list_recursive(&mut self, pathname: Option<&str>) -> Result<Vec<String>> {
        let command = pathname.map_or("LIST -R\r\n".into(), |path| format!("LIST -R {}\r\n", path).into());
        self.list_command(command)
    }

    /// Execute `NLST` command which returns the list of file names only.
    /// If `pathname` is omited then the list of files in the current directory will be
    /// returned otherwise it will the list of files on `pathname`.
    pub fn nlst(&mut self, pathname: Option<&str>) -> Result<Vec<String>> {
        let command = pathname.map_or("NLST\r\n".into(), |path| format!("NLST {}\r\n", path).into());
        self.list_command(command)
    }

    /// Retrieves the modification time of the file at `pathname` if it exists.
    /// In case the file does not exist `None` is returned.
    pub fn mdtm(&mut self, pathname: &str) -> Result<Option<DateTime<Utc>>> {
        self.write_str(format!("MDTM {}\r\n", pathname))?;
        let Line(_, content) = self.read_response(status::FILE)?;

        Ok(MDTM_RE.captures(&content).and_then(|caps| {
            let field = |i: usize| caps[i].parse::<u32>().unwrap_or(0);
            Utc.with_ymd_and_hms(field(1) as i32, field(2), field(3), field(4), field(5), field(6))
                .single()
        }))
    }

    /// Retrieves the size of the file in bytes at `pathname` if it exists.
    /// In case the file does not exist `None` is returned.
    pub fn size(&mut self, pathname: &str) -> Result<Option<usize>> {
        self.write_str(format!("SIZE {}\r\n", pathname))?;
        let Line(_, content) = self.read_response(status::FILE)?;
        Ok(SIZE_RE.captures(&content).and_then(|caps| caps[1].parse().ok()))
    }

    /// Sends `command` verbatim and returns every line of the reply.
    pub fn quote(&mut self, command: &str) -> Result<Vec<String>> {
        self.write_str(format!("{}\r\n", command))?;
        self.read_reply().map(|(_, lines)| lines)
    }

    /// Sends a `SITE` command; any 2xx reply is a success.
    pub fn site(&mut self, command: &str) -> Result<Line> {
        self.write_str(format!("SITE {}\r\n", command))?;
        let (code, mut lines) = self.read_reply()?;
        let line = Line(code, lines.pop().unwrap_or_default());
        if status::is_completion(code) {
            Ok(line)
        } else {
            Err(FtpError::UnexpectedResponse(line))
        }
    }

    /// Reserves `size` bytes on the server for the next upload (`ALLO`).
    pub fn alloc(&mut self, size: u64) -> Result<String> {
        self.write_str(format!("ALLO {}\r\n", size))?;
        self.read_response_in(&[status::COMMAND_OK, status::COMMAND_NOT_IMPLEMENTED])
            .map(|line| line.text().to_owned())
    }

    /// Returns the system type reported by `SYST`.
    pub fn syst(&mut self) -> Result<String> {
        self.write_str("SYST\r\n")?;
        self.read_response(status::NAME).map(|line| line.text().to_owned())
    }

    fn write_str<S: AsRef<str>>(&mut self, command: S) -> Result<()> {
        let command = command.as_ref();
        if command.starts_with("PASS ") {
            trace!("CMD PASS ******");
        } else {
            trace!("CMD {}", command.trim_end());
        }

        let stream = self.reader.get_mut();
        stream
            .write_all(command.as_bytes())
            .map_err(FtpError::ConnectionError)
    }

    pub fn read_response(&mut self, expected_code: u32) -> Result<Line> {
        self.read_response_in(&[expected_code])
    }

    /// Retrieve single line response
    pub fn read_response_in(&mut self, expected_code: &[u32]) -> Result<Line> {
        let (code, mut lines) = self.read_reply()?;
        let line = Line(code, lines.pop().unwrap_or_default());
        if expected_code.contains(&code) {
            Ok(line)
        } else {
            Err(FtpError::UnexpectedResponse(line))
        }
    }

    /// Reads a complete, possibly multi-line, reply.
    fn read_reply(&mut self) -> Result<(u32, Vec<String>)> {
        let mut line = String::new();
        self.reader.read_line(&mut line).map_err(FtpError::ConnectionError)?;
        trace!("FTP {}", line.trim_end());

        let prefix = match line.get(0..3) {
            Some(prefix) if line.len() >= 4 => prefix.to_owned(),
            _ => return Err(FtpError::InvalidResponse("error: could not read reply code".to_owned())),
        };
        let code: u32 = prefix
            .parse()
            .map_err(|err| FtpError::InvalidResponse(format!("error: could not parse reply code: {}", err)))?;

        // multiple line reply
        // loop while the line does not begin with the code and a space
        let expected = format!("{} ", prefix);
        let mut lines = Vec::new();
        loop {
            let done = line.starts_with(&expected);
            lines.push(line.trim_end().to_owned());
            if done {
                return Ok((code, lines));
            }
            line.clear();
            let read = self.reader.read_line(&mut line).map_err(FtpError::ConnectionError)?;
            if read == 0 {
                return Err(FtpError::ConnectionError(io::Error::new(
                    ErrorKind::UnexpectedEof,
                    "connection closed in the middle of a reply",
                )));
            }
            trace!("FTP {}", line.trim_end());
        }
    }
}

/// Extracts the double-quoted path of a 257 reply, undoing `""` escapes.
fn quoted_path(content: &str) -> Option<String> {
    match (content.find('"'), content.rfind('"')) {
        (Some(begin), Some(end)) if begin < end => Some(content[begin + 1..end].replace("\"\"", "\"")),
        _ => None,
    }
}
