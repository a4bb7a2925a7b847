//! An in-memory FTP server behind the `Session` and `Connector` traits.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{self, ErrorKind, Read, Write};
use std::rc::Rc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use ftp_session::types::Line;
use ftp_session::{Connector, FileType, FtpError, Result, Session, TransferStatus};

/// Bytes moved per non-blocking step, small so transfers take several.
const CHUNK: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Dir,
    File(Vec<u8>),
}

pub type Shared = Rc<RefCell<Server>>;

/// Virtual filesystem plus a log of every command sessions received.
#[derive(Debug)]
pub struct Server {
    pub nodes: BTreeMap<String, Node>,
    pub log: Vec<String>,
    pub generation: u64,
    /// Directories CWD refuses to enter.
    pub denied: BTreeSet<String>,
    pub refuse_connections: bool,
    pub reject_logins: bool,
    /// NLST of a directory includes `.` and `..`.
    pub list_dots: bool,
    /// NLST of a directory includes the directory itself as a full path.
    pub list_self: bool,
    /// NLST of an empty directory fails with 450 instead of listing nothing.
    pub empty_nlst_fails: bool,
}

impl Server {
    pub fn new() -> Shared {
        let mut nodes = BTreeMap::new();
        nodes.insert("/".to_owned(), Node::Dir);
        Rc::new(RefCell::new(Server {
            nodes,
            log: Vec::new(),
            generation: 0,
            denied: BTreeSet::new(),
            refuse_connections: false,
            reject_logins: false,
            list_dots: true,
            list_self: false,
            empty_nlst_fails: false,
        }))
    }

    pub fn add_dir(&mut self, path: &str) {
        let path = normalize(path);
        let mut current = String::new();
        for part in path.split('/').filter(|p| !p.is_empty()) {
            current.push('/');
            current.push_str(part);
            self.nodes.entry(current.clone()).or_insert(Node::Dir);
        }
    }

    pub fn add_file(&mut self, path: &str, content: &[u8]) {
        let path = normalize(path);
        self.add_dir(parent(&path));
        self.nodes.insert(path, Node::File(content.to_vec()));
    }

    pub fn is_dir(&self, path: &str) -> bool {
        self.nodes.get(&normalize(path)) == Some(&Node::Dir)
    }

    pub fn exists(&self, path: &str) -> bool {
        self.nodes.contains_key(&normalize(path))
    }

    pub fn contents(&self, path: &str) -> Option<Vec<u8>> {
        match self.nodes.get(&normalize(path)) {
            Some(Node::File(data)) => Some(data.clone()),
            _ => None,
        }
    }

    /// Names directly inside `dir`.
    pub fn children(&self, dir: &str) -> Vec<String> {
        let dir = normalize(dir);
        let prefix = if dir == "/" { "/".to_owned() } else { format!("{}/", dir) };
        self.nodes
            .keys()
            .filter(|path| path.len() > prefix.len() && path.starts_with(&prefix))
            .map(|path| path[prefix.len()..].to_owned())
            .filter(|name| !name.contains('/'))
            .collect()
    }

    /// Every open session fails from now on, as if the network dropped.
    pub fn drop_connections(&mut self) {
        self.generation += 1;
    }

    /// Logged commands starting with `verb`.
    pub fn commands(&self, verb: &str) -> Vec<String> {
        self.log.iter().filter(|line| line.starts_with(verb)).cloned().collect()
    }
}

pub fn normalize(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
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

fn parent(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(at) => &path[..at],
    }
}

fn reject(code: u32, text: &str) -> FtpError {
    FtpError::UnexpectedResponse(Line(code, format!("{} {}", code, text)))
}

pub struct MemoryConnector {
    pub server: Shared,
    pub tls: bool,
}

impl MemoryConnector {
    pub fn new(server: &Shared) -> MemoryConnector {
        MemoryConnector { server: server.clone(), tls: true }
    }

    pub fn without_tls(server: &Shared) -> MemoryConnector {
        MemoryConnector { server: server.clone(), tls: false }
    }

    fn open(&self, verb: &str, host: &str, port: u16, timeout: Option<Duration>) -> Result<Box<dyn Session>> {
        let mut server = self.server.borrow_mut();
        server.log.push(format!("{} {}:{}", verb, host, port));
        if server.refuse_connections {
            return Err(FtpError::ConnectionError(io::Error::new(
                ErrorKind::ConnectionRefused,
                "Connection refused",
            )));
        }
        Ok(Box::new(MemorySession {
            server: self.server.clone(),
            generation: server.generation,
            cwd: "/".to_owned(),
            passive: false,
            timeout,
            closed: false,
            pending: None,
        }))
    }
}

impl Connector for MemoryConnector {
    fn connect(&self, host: &str, port: u16, timeout: Option<Duration>) -> Result<Box<dyn Session>> {
        self.open("CONNECT", host, port, timeout)
    }

    fn ssl_connect(&self, host: &str, port: u16, timeout: Option<Duration>) -> Result<Box<dyn Session>> {
        if !self.tls {
            return Err(FtpError::ConfigurationError("no TLS".to_owned()));
        }
        self.open("SSL_CONNECT", host, port, timeout)
    }

    fn supports_tls(&self) -> bool {
        self.tls
    }
}

enum Pending {
    Download { remaining: Vec<u8>, local: File },
    Upload { remote: String, received: Vec<u8>, local: File },
}

pub struct MemorySession {
    server: Shared,
    generation: u64,
    cwd: String,
    passive: bool,
    timeout: Option<Duration>,
    closed: bool,
    pending: Option<Pending>,
}

impl MemorySession {
    fn alive(&self) -> Result<()> {
        if self.closed || self.server.borrow().generation != self.generation {
            return Err(FtpError::ConnectionError(io::Error::new(ErrorKind::BrokenPipe, "Broken pipe")));
        }
        Ok(())
    }

    fn send(&mut self, command: String) -> Result<()> {
        self.alive()?;
        self.server.borrow_mut().log.push(command);
        Ok(())
    }

    fn resolve(&self, path: &str) -> String {
        if path.starts_with('/') {
            normalize(path)
        } else {
            normalize(&format!("{}/{}", self.cwd, path))
        }
    }

    fn file(&self, path: &str) -> Result<Vec<u8>> {
        self.server
            .borrow()
            .contents(path)
            .ok_or_else(|| reject(550, "No such file or directory"))
    }

    fn store(&mut self, path: &str, data: Vec<u8>) -> Result<()> {
        let mut server = self.server.borrow_mut();
        if !server.is_dir(parent(path)) || server.is_dir(path) {
            return Err(reject(553, "Could not create file."));
        }
        server.nodes.insert(path.to_owned(), Node::File(data));
        Ok(())
    }
}

impl Session for MemorySession {
    fn login(&mut self, user: &str, password: &str) -> Result<()> {
        self.send(format!("USER {}", user))?;
        self.send(format!("PASS {}", password))?;
        if self.server.borrow().reject_logins {
            return Err(reject(530, "Login incorrect."));
        }
        Ok(())
    }

    fn set_passive(&mut self, passive: bool) -> Result<()> {
        self.send(format!("PASV {}", if passive { "on" } else { "off" }))?;
        self.passive = passive;
        Ok(())
    }

    fn cwd(&mut self, path: &str) -> Result<()> {
        let target = self.resolve(path);
        self.send(format!("CWD {}", target))?;
        let server = self.server.borrow();
        if server.denied.contains(&target) {
            return Err(reject(550, "Permission denied."));
        }
        if !server.is_dir(&target) {
            return Err(reject(550, "Failed to change directory."));
        }
        drop(server);
        self.cwd = target;
        Ok(())
    }

    fn cdup(&mut self) -> Result<()> {
        self.send("CDUP".to_owned())?;
        self.cwd = parent(&self.cwd).to_owned();
        Ok(())
    }

    fn pwd(&mut self) -> Result<String> {
        self.send("PWD".to_owned())?;
        Ok(self.cwd.clone())
    }

    fn mkdir(&mut self, path: &str) -> Result<String> {
        let target = self.resolve(path);
        self.send(format!("MKD {}", target))?;
        let mut server = self.server.borrow_mut();
        if server.exists(&target) {
            return Err(reject(550, "Create directory operation failed."));
        }
        if !server.is_dir(parent(&target)) {
            return Err(reject(550, "Create directory operation failed."));
        }
        server.nodes.insert(target.clone(), Node::Dir);
        Ok(target)
    }

    fn rmdir(&mut self, path: &str) -> Result<()> {
        let target = self.resolve(path);
        self.send(format!("RMD {}", target))?;
        let mut server = self.server.borrow_mut();
        if target == "/" || !server.is_dir(&target) || !server.children(&target).is_empty() {
            return Err(reject(550, "Remove directory operation failed."));
        }
        server.nodes.remove(&target);
        Ok(())
    }

    fn rm(&mut self, path: &str) -> Result<()> {
        let target = self.resolve(path);
        self.send(format!("DELE {}", target))?;
        let mut server = self.server.borrow_mut();
        if server.contents(&target).is_none() {
            return Err(reject(550, "No such file or directory"));
        }
        server.nodes.remove(&target);
        Ok(())
    }

    fn nlst(&mut self, path: Option<&str>) -> Result<Vec<String>> {
        let target = self.resolve(path.unwrap_or("."));
        self.send(format!("NLST {}", target))?;
        let server = self.server.borrow();
        match server.nodes.get(&target) {
            Some(Node::Dir) => {
                let children = server.children(&target);
                if server.empty_nlst_fails && children.is_empty() {
                    return Err(reject(450, "No files found"));
                }
                let mut names = Vec::new();
                if server.list_dots {
                    names.push(".".to_owned());
                    names.push("..".to_owned());
                }
                if server.list_self {
                    names.push(target.clone());
                }
                names.extend(children);
                Ok(names)
            }
            Some(Node::File(_)) => Ok(vec![path.unwrap_or(".").to_owned()]),
            None => Err(reject(550, "No such file or directory")),
        }
    }

    fn list(&mut self, path: Option<&str>, recursive: bool) -> Result<Vec<String>> {
        let target = self.resolve(path.unwrap_or("."));
        self.send(format!("LIST {}{}", if recursive { "-R " } else { "" }, target))?;
        let server = self.server.borrow();
        let mut pending = vec![target];
        let mut lines = Vec::new();
        while let Some(dir) = pending.pop() {
            if recursive && !lines.is_empty() {
                lines.push(format!("{}:", dir));
            }
            for name in server.children(&dir) {
                let full = normalize(&format!("{}/{}", dir, name));
                match server.nodes.get(&full) {
                    Some(Node::File(data)) => lines.push(format!("-rw-r--r-- 1 ftp ftp {} Jan 01 00:00 {}", data.len(), name)),
                    _ => {
                        lines.push(format!("drwxr-xr-x 2 ftp ftp 0 Jan 01 00:00 {}", name));
                        if recursive {
                            pending.push(full);
                        }
                    }
                }
            }
        }
        Ok(lines)
    }

    fn size(&mut self, path: &str) -> Result<Option<usize>> {
        let target = self.resolve(path);
        self.send(format!("SIZE {}", target))?;
        self.file(&target).map(|data| Some(data.len()))
    }

    fn mdtm(&mut self, path: &str) -> Result<Option<DateTime<Utc>>> {
        let target = self.resolve(path);
        self.send(format!("MDTM {}", target))?;
        self.file(&target)?;
        Ok(Utc.with_ymd_and_hms(2020, 2, 29, 12, 30, 0).single())
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        let (from, to) = (self.resolve(from), self.resolve(to));
        self.send(format!("RENAME {} {}", from, to))?;
        let mut server = self.server.borrow_mut();
        match server.nodes.remove(&from) {
            Some(node) => {
                server.nodes.insert(to, node);
                Ok(())
            }
            None => Err(reject(550, "RNFR command failed.")),
        }
    }

    fn transfer_type(&mut self, file_type: FileType) -> Result<()> {
        self.send(format!("TYPE {}", file_type))
    }

    fn retr_to(&mut self, remote: &str, offset: u64, writer: &mut dyn Write) -> Result<u64> {
        let target = self.resolve(remote);
        self.send(format!("RETR {}", target))?;
        let data = self.file(&target)?;
        let rest = data.get(offset as usize..).unwrap_or(&[]);
        writer.write_all(rest).map_err(FtpError::LocalError)?;
        Ok(rest.len() as u64)
    }

    fn stor_from(&mut self, remote: &str, offset: u64, reader: &mut dyn Read) -> Result<u64> {
        let target = self.resolve(remote);
        self.send(format!("STOR {}", target))?;
        let mut received = Vec::new();
        reader.read_to_end(&mut received).map_err(FtpError::LocalError)?;
        let sent = received.len() as u64;
        let mut data = self.server.borrow().contents(&target).unwrap_or_default();
        data.truncate(offset as usize);
        data.extend(received);
        self.store(&target, data)?;
        Ok(sent)
    }

    fn begin_retr(&mut self, remote: &str, offset: u64, local: File) -> Result<TransferStatus> {
        let target = self.resolve(remote);
        self.send(format!("RETR {}", target))?;
        let data = self.file(&target)?;
        let remaining = data.get(offset as usize..).unwrap_or(&[]).to_vec();
        self.pending = Some(Pending::Download { remaining, local });
        self.continue_transfer()
    }

    fn begin_stor(&mut self, remote: &str, offset: u64, local: File) -> Result<TransferStatus> {
        let target = self.resolve(remote);
        self.send(format!("STOR {}", target))?;
        let mut received = self.server.borrow().contents(&target).unwrap_or_default();
        received.truncate(offset as usize);
        self.pending = Some(Pending::Upload { remote: target, received, local });
        self.continue_transfer()
    }

    fn continue_transfer(&mut self) -> Result<TransferStatus> {
        self.alive()?;
        match self.pending.take() {
            None => Err(FtpError::CommandError("no transfer in progress".to_owned())),
            Some(Pending::Download { mut remaining, mut local }) => {
                let n = remaining.len().min(CHUNK);
                if n == 0 {
                    return Ok(TransferStatus::Finished);
                }
                let rest = remaining.split_off(n);
                local.write_all(&remaining).map_err(FtpError::LocalError)?;
                self.pending = Some(Pending::Download { remaining: rest, local });
                Ok(TransferStatus::MoreData)
            }
            Some(Pending::Upload { remote, mut received, mut local }) => {
                let mut buf = [0u8; CHUNK];
                let n = local.read(&mut buf).map_err(FtpError::LocalError)?;
                if n == 0 {
                    self.store(&remote, received)?;
                    return Ok(TransferStatus::Finished);
                }
                received.extend_from_slice(&buf[..n]);
                self.pending = Some(Pending::Upload { remote, received, local });
                Ok(TransferStatus::MoreData)
            }
        }
    }

    fn quote(&mut self, command: &str) -> Result<Vec<String>> {
        self.send(format!("QUOTE {}", command))?;
        if command.eq_ignore_ascii_case("HELP") {
            Ok(vec![
                "214-The following commands are recognized.".to_owned(),
                "214 Help OK.".to_owned(),
            ])
        } else {
            Ok(vec!["500 Unknown command.".to_owned()])
        }
    }

    fn site(&mut self, command: &str) -> Result<String> {
        self.send(format!("SITE {}", command))?;
        let mut words = command.split_whitespace();
        match (words.next(), words.next(), words.next()) {
            (Some("CHMOD"), Some(_), Some(path)) => {
                let target = self.resolve(path);
                if self.server.borrow().exists(&target) {
                    Ok("SITE CHMOD command ok.".to_owned())
                } else {
                    Err(reject(550, "SITE CHMOD command failed."))
                }
            }
            _ => Err(reject(500, "Unknown SITE command.")),
        }
    }

    fn alloc(&mut self, size: u64) -> Result<String> {
        self.send(format!("ALLO {}", size))?;
        Ok("No storage allocation necessary.".to_owned())
    }

    fn syst(&mut self) -> Result<String> {
        self.send("SYST".to_owned())?;
        Ok("UNIX Type: L8".to_owned())
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn set_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.alive()?;
        self.timeout = timeout;
        Ok(())
    }

    fn quit(&mut self) -> Result<()> {
        self.send("QUIT".to_owned())?;
        self.closed = true;
        Ok(())
    }
}
