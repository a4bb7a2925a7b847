//! Named commands: argument and reply values, the alias table and the
//! registry of typed handlers the dispatcher looks commands up in.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::session::{Connector, Session};
use super::types::{FileType, FtpError, FtpOption, Result, TransferStatus};

/// Resume position asking a transfer to continue where the target file ends.
pub const AUTORESUME: i64 = -1;

/// Default port of `connect` and `ssl_connect`.
pub const DEFAULT_PORT: u16 = 21;

/// An argument of a named command.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Str(String),
    Int(i64),
    Bool(bool),
    Type(FileType),
    Opt(FtpOption),
    Handle(FileHandle),
}

impl Arg {
    fn kind(&self) -> &'static str {
        match *self {
            Arg::Str(_) => "string",
            Arg::Int(_) => "integer",
            Arg::Bool(_) => "boolean",
            Arg::Type(_) => "transfer mode",
            Arg::Opt(_) => "option",
            Arg::Handle(_) => "file handle",
        }
    }
}

impl<'a> From<&'a str> for Arg {
    fn from(value: &'a str) -> Arg {
        Arg::Str(value.to_owned())
    }
}

impl From<String> for Arg {
    fn from(value: String) -> Arg {
        Arg::Str(value)
    }
}

impl From<i64> for Arg {
    fn from(value: i64) -> Arg {
        Arg::Int(value)
    }
}

impl From<i32> for Arg {
    fn from(value: i32) -> Arg {
        Arg::Int(i64::from(value))
    }
}

impl From<u16> for Arg {
    fn from(value: u16) -> Arg {
        Arg::Int(i64::from(value))
    }
}

impl From<u32> for Arg {
    fn from(value: u32) -> Arg {
        Arg::Int(i64::from(value))
    }
}

impl From<bool> for Arg {
    fn from(value: bool) -> Arg {
        Arg::Bool(value)
    }
}

impl From<FileType> for Arg {
    fn from(value: FileType) -> Arg {
        Arg::Type(value)
    }
}

impl From<FtpOption> for Arg {
    fn from(value: FtpOption) -> Arg {
        Arg::Opt(value)
    }
}

impl From<FileHandle> for Arg {
    fn from(value: FileHandle) -> Arg {
        Arg::Handle(value)
    }
}

impl From<File> for Arg {
    fn from(value: File) -> Arg {
        Arg::Handle(FileHandle::new(value))
    }
}

/// An open local file for `fget`, `fput` and their non-blocking forms.
///
/// Clones share the file and its cursor, so after a transfer the caller
/// carries on from where it stopped. Two handles are equal when they share
/// the same file.
#[derive(Debug, Clone)]
pub struct FileHandle(Arc<File>);

impl FileHandle {
    pub fn new(file: File) -> FileHandle {
        FileHandle(Arc::new(file))
    }

    pub fn file(&self) -> &File {
        &self.0
    }
}

impl PartialEq for FileHandle {
    fn eq(&self, other: &FileHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl From<File> for FileHandle {
    fn from(file: File) -> FileHandle {
        FileHandle::new(file)
    }
}

/// The value a command produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    None,
    Bool(bool),
    Int(i64),
    Text(String),
    List(Vec<String>),
    Size(Option<usize>),
    Time(Option<DateTime<Utc>>),
    Transfer(TransferStatus),
    Value(Arg),
    /// A silent command failed.
    Failed,
}

impl Reply {
    pub fn is_failed(&self) -> bool {
        *self == Reply::Failed
    }

    pub fn into_text(self) -> Option<String> {
        match self {
            Reply::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn into_list(self) -> Option<Vec<String>> {
        match self {
            Reply::List(list) => Some(list),
            _ => None,
        }
    }
}

/// Positional arguments of one invocation, with typed accessors.
pub(crate) struct Args<'a> {
    name: &'a str,
    values: &'a [Arg],
}

impl<'a> Args<'a> {
    pub(crate) fn new(name: &'a str, values: &'a [Arg]) -> Args<'a> {
        Args { name, values }
    }

    fn arity(&self, min: usize, max: usize) -> Result<()> {
        let given = self.values.len();
        if given >= min && given <= max {
            return Ok(());
        }
        let expected = if min == max {
            format!("exactly {}", min)
        } else if given < min {
            format!("at least {}", min)
        } else {
            format!("at most {}", max)
        };
        Err(FtpError::CommandError(format!(
            "{}() expects {} parameters, {} given",
            self.name, expected, given
        )))
    }

    fn mismatch(&self, index: usize, expected: &str) -> FtpError {
        FtpError::CommandError(format!(
            "{}() expects parameter {} to be {}, {} given",
            self.name,
            index + 1,
            expected,
            self.values[index].kind()
        ))
    }

    fn str(&self, index: usize) -> Result<&'a str> {
        match self.values[index] {
            Arg::Str(ref value) => Ok(value.as_str()),
            _ => Err(self.mismatch(index, "string")),
        }
    }

    fn opt_str(&self, index: usize) -> Result<Option<&'a str>> {
        if index < self.values.len() {
            self.str(index).map(Some)
        } else {
            Ok(None)
        }
    }

    fn int(&self, index: usize) -> Result<i64> {
        match self.values[index] {
            Arg::Int(value) => Ok(value),
            _ => Err(self.mismatch(index, "integer")),
        }
    }

    fn int_or(&self, index: usize, default: i64) -> Result<i64> {
        if index < self.values.len() {
            self.int(index)
        } else {
            Ok(default)
        }
    }

    fn bool(&self, index: usize) -> Result<bool> {
        match self.values[index] {
            Arg::Bool(value) => Ok(value),
            _ => Err(self.mismatch(index, "boolean")),
        }
    }

    fn bool_or(&self, index: usize, default: bool) -> Result<bool> {
        if index < self.values.len() {
            self.bool(index)
        } else {
            Ok(default)
        }
    }

    fn handle(&self, index: usize) -> Result<&'a FileHandle> {
        match self.values[index] {
            Arg::Handle(ref handle) => Ok(handle),
            _ => Err(self.mismatch(index, "file handle")),
        }
    }

    fn file_type_or(&self, index: usize, default: FileType) -> Result<FileType> {
        match self.values.get(index) {
            None => Ok(default),
            Some(&Arg::Type(ref file_type)) => Ok(file_type.clone()),
            Some(_) => Err(self.mismatch(index, "transfer mode")),
        }
    }

    fn option(&self, index: usize) -> Result<FtpOption> {
        match self.values[index] {
            Arg::Opt(option) => Ok(option),
            _ => Err(self.mismatch(index, "option")),
        }
    }

    fn count(&self, index: usize, what: &str) -> Result<u64> {
        let value = self.int(index)?;
        if value < 0 {
            return Err(FtpError::CommandError(format!(
                "{}() expects {} to be positive, {} given",
                self.name, what, value
            )));
        }
        Ok(value as u64)
    }
}

/// What a session handler may touch besides its arguments.
pub(crate) struct Context<'a> {
    pub(crate) session: &'a mut dyn Session,
    pub(crate) autoseek: &'a mut bool,
}

/// Host, port and timeout of a `connect`/`ssl_connect` call.
pub(crate) struct Endpoint<'a> {
    pub(crate) host: &'a str,
    pub(crate) port: u16,
    pub(crate) timeout: Option<Duration>,
}

impl<'a> Endpoint<'a> {
    /// Reads `host, [port], [timeout]`; `default_timeout` applies when the
    /// timeout is omitted.
    pub(crate) fn from_args(args: &Args<'a>, default_timeout: Option<Duration>) -> Result<Endpoint<'a>> {
        args.arity(1, 3)?;
        let host = args.str(0)?;
        let port = args.int_or(1, i64::from(DEFAULT_PORT))?;
        if port <= 0 || port > i64::from(u16::MAX) {
            return Err(FtpError::CommandError(format!("{}() got invalid port {}", args.name, port)));
        }
        let timeout = if args.values.len() > 2 {
            match args.count(2, "timeout")? {
                0 => return Err(FtpError::CommandError(format!("{}() expects timeout to be positive, 0 given", args.name))),
                secs => Some(Duration::from_secs(secs)),
            }
        } else {
            default_timeout
        };
        Ok(Endpoint { host, port: port as u16, timeout })
    }
}

pub(crate) type ConnectFn = fn(&dyn Connector, &Endpoint) -> Result<Box<dyn Session>>;
pub(crate) type SessionFn = fn(&mut Context, &Args) -> Result<Reply>;

/// A registered command.
#[derive(Clone, Copy)]
pub(crate) enum Handler {
    /// Opens a new session; runs without one.
    Connect(ConnectFn),
    /// Runs against the active session.
    Session(SessionFn),
}

lazy_static! {
    /// Alternate spellings accepted for canonical command names.
    static ref ALIASES: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert("sslconnect", "ssl_connect");
        m.insert("getoption", "get_option");
        m.insert("setoption", "set_option");
        m.insert("nbcontinue", "nb_continue");
        m.insert("nbget", "nb_get");
        m.insert("nbput", "nb_put");
        m.insert("nbfget", "nb_fget");
        m.insert("nbfput", "nb_fput");
        m.insert("quit", "close");
        m
    };

    static ref COMMANDS: HashMap<&'static str, Handler> = {
        let mut m: HashMap<&'static str, Handler> = HashMap::new();
        m.insert("connect", Handler::Connect(connect));
        m.insert("ssl_connect", Handler::Connect(ssl_connect));
        m.insert("login", Handler::Session(login));
        m.insert("pasv", Handler::Session(pasv));
        m.insert("chdir", Handler::Session(chdir));
        m.insert("cdup", Handler::Session(cdup));
        m.insert("pwd", Handler::Session(pwd));
        m.insert("mkdir", Handler::Session(mkdir));
        m.insert("rmdir", Handler::Session(rmdir));
        m.insert("delete", Handler::Session(delete));
        m.insert("nlist", Handler::Session(nlist));
        m.insert("rawlist", Handler::Session(rawlist));
        m.insert("size", Handler::Session(size));
        m.insert("mdtm", Handler::Session(mdtm));
        m.insert("rename", Handler::Session(rename));
        m.insert("get", Handler::Session(get));
        m.insert("put", Handler::Session(put));
        m.insert("nb_get", Handler::Session(nb_get));
        m.insert("nb_put", Handler::Session(nb_put));
        m.insert("fget", Handler::Session(fget));
        m.insert("fput", Handler::Session(fput));
        m.insert("nb_fget", Handler::Session(nb_fget));
        m.insert("nb_fput", Handler::Session(nb_fput));
        m.insert("nb_continue", Handler::Session(nb_continue));
        m.insert("raw", Handler::Session(raw));
        m.insert("site", Handler::Session(site));
        m.insert("exec", Handler::Session(exec));
        m.insert("chmod", Handler::Session(chmod));
        m.insert("alloc", Handler::Session(alloc));
        m.insert("systype", Handler::Session(systype));
        m.insert("get_option", Handler::Session(get_option));
        m.insert("set_option", Handler::Session(set_option));
        m.insert("close", Handler::Session(close));
        m
    };
}

/// Maps a lowercase name through the alias table.
pub fn canonical(name: &str) -> &str {
    ALIASES.get(name).cloned().unwrap_or(name)
}

/// The alias table as `(alias, canonical)` pairs.
pub fn aliases() -> Vec<(&'static str, &'static str)> {
    let mut pairs: Vec<_> = ALIASES.iter().map(|(alias, name)| (*alias, *name)).collect();
    pairs.sort();
    pairs
}

/// Every canonical command name, sorted.
pub fn commands() -> Vec<&'static str> {
    let mut names: Vec<_> = COMMANDS.keys().cloned().collect();
    names.sort();
    names
}

pub(crate) fn lookup(canonical: &str) -> Option<Handler> {
    COMMANDS.get(canonical).cloned()
}

/// Checks that every alias points at a registered command.
pub(crate) fn validate() -> Result<()> {
    match ALIASES.iter().find(|&(_, name)| !COMMANDS.contains_key(name)) {
        Some((alias, name)) => Err(FtpError::ConfigurationError(format!(
            "alias '{}' points at unregistered command '{}'",
            alias, name
        ))),
        None => Ok(()),
    }
}

fn connect(connector: &dyn Connector, endpoint: &Endpoint) -> Result<Box<dyn Session>> {
    connector.connect(endpoint.host, endpoint.port, endpoint.timeout)
}

fn ssl_connect(connector: &dyn Connector, endpoint: &Endpoint) -> Result<Box<dyn Session>> {
    connector.ssl_connect(endpoint.host, endpoint.port, endpoint.timeout)
}

fn login(ctx: &mut Context, args: &Args) -> Result<Reply> {
    args.arity(2, 2)?;
    ctx.session.login(args.str(0)?, args.str(1)?)?;
    Ok(Reply::Bool(true))
}

fn pasv(ctx: &mut Context, args: &Args) -> Result<Reply> {
    args.arity(1, 1)?;
    ctx.session.set_passive(args.bool(0)?)?;
    Ok(Reply::Bool(true))
}

fn chdir(ctx: &mut Context, args: &Args) -> Result<Reply> {
    args.arity(1, 1)?;
    ctx.session.cwd(args.str(0)?)?;
    Ok(Reply::Bool(true))
}

fn cdup(ctx: &mut Context, args: &Args) -> Result<Reply> {
    args.arity(0, 0)?;
    ctx.session.cdup()?;
    Ok(Reply::Bool(true))
}

fn pwd(ctx: &mut Context, args: &Args) -> Result<Reply> {
    args.arity(0, 0)?;
    ctx.session.pwd().map(Reply::Text)
}

fn mkdir(ctx: &mut Context, args: &Args) -> Result<Reply> {
    args.arity(1, 1)?;
    ctx.session.mkdir(args.str(0)?).map(Reply::Text)
}

fn rmdir(ctx: &mut Context, args: &Args) -> Result<Reply> {
    args.arity(1, 1)?;
    ctx.session.rmdir(args.str(0)?)?;
    Ok(Reply::Bool(true))
}

fn delete(ctx: &mut Context, args: &Args) -> Result<Reply> {
    args.arity(1, 1)?;
    ctx.session.rm(args.str(0)?)?;
    Ok(Reply::Bool(true))
}

fn nlist(ctx: &mut Context, args: &Args) -> Result<Reply> {
    args.arity(0, 1)?;
    ctx.session.nlst(args.opt_str(0)?).map(Reply::List)
}

fn rawlist(ctx: &mut Context, args: &Args) -> Result<Reply> {
    args.arity(0, 2)?;
    ctx.session.list(args.opt_str(0)?, args.bool_or(1, false)?).map(Reply::List)
}

fn size(ctx: &mut Context, args: &Args) -> Result<Reply> {
    args.arity(1, 1)?;
    ctx.session.size(args.str(0)?).map(Reply::Size)
}

fn mdtm(ctx: &mut Context, args: &Args) -> Result<Reply> {
    args.arity(1, 1)?;
    ctx.session.mdtm(args.str(0)?).map(Reply::Time)
}

fn rename(ctx: &mut Context, args: &Args) -> Result<Reply> {
    args.arity(2, 2)?;
    ctx.session.rename(args.str(0)?, args.str(1)?)?;
    Ok(Reply::Bool(true))
}

/// Byte a download into `file` resumes at; `AUTORESUME` means where `file` ends.
fn download_offset(file: &File, resume: i64) -> Result<u64> {
    match resume {
        AUTORESUME => Ok(file.metadata().map_err(FtpError::LocalError)?.len()),
        n if n >= 0 => Ok(n as u64),
        n => Err(FtpError::CommandError(format!("invalid resume position {}", n))),
    }
}

/// Byte an upload to `remote` starts at; `AUTORESUME` means the remote size.
fn upload_offset(session: &mut dyn Session, remote: &str, start: i64) -> Result<u64> {
    match start {
        AUTORESUME => Ok(session.size(remote).unwrap_or(None).unwrap_or(0) as u64),
        n if n >= 0 => Ok(n as u64),
        n => Err(FtpError::CommandError(format!("invalid start position {}", n))),
    }
}

fn seek(mut file: &File, offset: u64) -> Result<()> {
    file.seek(SeekFrom::Start(offset)).map(|_| ()).map_err(FtpError::LocalError)
}

/// Opens `local` for a download resuming at `resume`, which may be `AUTORESUME`.
fn open_download(local: &str, resume: i64, autoseek: bool) -> Result<(File, u64)> {
    if resume == 0 {
        return File::create(local).map(|file| (file, 0)).map_err(FtpError::LocalError);
    }
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .open(local)
        .map_err(FtpError::LocalError)?;
    let offset = download_offset(&file, resume)?;
    if autoseek {
        seek(&file, offset)?;
    }
    Ok((file, offset))
}

/// Opens `local` for an upload to `remote` starting at `start`, which may be `AUTORESUME`.
fn open_upload(session: &mut dyn Session, remote: &str, local: &str, start: i64, autoseek: bool) -> Result<(File, u64)> {
    let file = File::open(local).map_err(FtpError::LocalError)?;
    let offset = upload_offset(session, remote, start)?;
    if autoseek && offset > 0 {
        seek(&file, offset)?;
    }
    Ok((file, offset))
}

/// Positions an open handle the way `open_download` positions a fresh file.
fn position_download(handle: &FileHandle, resume: i64, autoseek: bool) -> Result<u64> {
    let offset = download_offset(handle.file(), resume)?;
    if autoseek && offset > 0 {
        seek(handle.file(), offset)?;
    }
    Ok(offset)
}

fn position_upload(session: &mut dyn Session, remote: &str, handle: &FileHandle, start: i64, autoseek: bool) -> Result<u64> {
    let offset = upload_offset(session, remote, start)?;
    if autoseek && offset > 0 {
        seek(handle.file(), offset)?;
    }
    Ok(offset)
}

fn detach(handle: &FileHandle) -> Result<File> {
    handle.file().try_clone().map_err(FtpError::LocalError)
}

fn get(ctx: &mut Context, args: &Args) -> Result<Reply> {
    args.arity(2, 4)?;
    let (local, remote) = (args.str(0)?, args.str(1)?);
    ctx.session.transfer_type(args.file_type_or(2, FileType::Binary)?)?;
    let (mut file, offset) = open_download(local, args.int_or(3, 0)?, *ctx.autoseek)?;
    ctx.session.retr_to(remote, offset, &mut file)?;
    Ok(Reply::Bool(true))
}

fn put(ctx: &mut Context, args: &Args) -> Result<Reply> {
    args.arity(2, 4)?;
    let (remote, local) = (args.str(0)?, args.str(1)?);
    ctx.session.transfer_type(args.file_type_or(2, FileType::Binary)?)?;
    let (mut file, offset) = open_upload(ctx.session, remote, local, args.int_or(3, 0)?, *ctx.autoseek)?;
    ctx.session.stor_from(remote, offset, &mut file)?;
    Ok(Reply::Bool(true))
}

fn nb_get(ctx: &mut Context, args: &Args) -> Result<Reply> {
    args.arity(2, 4)?;
    let (local, remote) = (args.str(0)?, args.str(1)?);
    ctx.session.transfer_type(args.file_type_or(2, FileType::Binary)?)?;
    let (file, offset) = open_download(local, args.int_or(3, 0)?, *ctx.autoseek)?;
    ctx.session.begin_retr(remote, offset, file).map(Reply::Transfer)
}

fn nb_put(ctx: &mut Context, args: &Args) -> Result<Reply> {
    args.arity(2, 4)?;
    let (remote, local) = (args.str(0)?, args.str(1)?);
    ctx.session.transfer_type(args.file_type_or(2, FileType::Binary)?)?;
    let (file, offset) = open_upload(ctx.session, remote, local, args.int_or(3, 0)?, *ctx.autoseek)?;
    ctx.session.begin_stor(remote, offset, file).map(Reply::Transfer)
}

fn fget(ctx: &mut Context, args: &Args) -> Result<Reply> {
    args.arity(2, 4)?;
    let (handle, remote) = (args.handle(0)?, args.str(1)?);
    ctx.session.transfer_type(args.file_type_or(2, FileType::Binary)?)?;
    let offset = position_download(handle, args.int_or(3, 0)?, *ctx.autoseek)?;
    let mut writer = handle.file();
    ctx.session.retr_to(remote, offset, &mut writer)?;
    Ok(Reply::Bool(true))
}

fn fput(ctx: &mut Context, args: &Args) -> Result<Reply> {
    args.arity(2, 4)?;
    let (remote, handle) = (args.str(0)?, args.handle(1)?);
    ctx.session.transfer_type(args.file_type_or(2, FileType::Binary)?)?;
    let offset = position_upload(ctx.session, remote, handle, args.int_or(3, 0)?, *ctx.autoseek)?;
    let mut reader = handle.file();
    ctx.session.stor_from(remote, offset, &mut reader)?;
    Ok(Reply::Bool(true))
}

fn nb_fget(ctx: &mut Context, args: &Args) -> Result<Reply> {
    args.arity(2, 4)?;
    let (handle, remote) = (args.handle(0)?, args.str(1)?);
    ctx.session.transfer_type(args.file_type_or(2, FileType::Binary)?)?;
    let offset = position_download(handle, args.int_or(3, 0)?, *ctx.autoseek)?;
    ctx.session.begin_retr(remote, offset, detach(handle)?).map(Reply::Transfer)
}

fn nb_fput(ctx: &mut Context, args: &Args) -> Result<Reply> {
    args.arity(2, 4)?;
    let (remote, handle) = (args.str(0)?, args.handle(1)?);
    ctx.session.transfer_type(args.file_type_or(2, FileType::Binary)?)?;
    let offset = position_upload(ctx.session, remote, handle, args.int_or(3, 0)?, *ctx.autoseek)?;
    ctx.session.begin_stor(remote, offset, detach(handle)?).map(Reply::Transfer)
}

fn nb_continue(ctx: &mut Context, args: &Args) -> Result<Reply> {
    args.arity(0, 0)?;
    ctx.session.continue_transfer().map(Reply::Transfer)
}

fn raw(ctx: &mut Context, args: &Args) -> Result<Reply> {
    args.arity(1, 1)?;
    ctx.session.quote(args.str(0)?).map(Reply::List)
}

fn site(ctx: &mut Context, args: &Args) -> Result<Reply> {
    args.arity(1, 1)?;
    ctx.session.site(args.str(0)?)?;
    Ok(Reply::Bool(true))
}

fn exec(ctx: &mut Context, args: &Args) -> Result<Reply> {
    args.arity(1, 1)?;
    ctx.session.exec(args.str(0)?)?;
    Ok(Reply::Bool(true))
}

fn chmod(ctx: &mut Context, args: &Args) -> Result<Reply> {
    args.arity(2, 2)?;
    let mode = args.int(0)?;
    if mode < 0 || mode > 0o7777 {
        return Err(FtpError::CommandError(format!("invalid permissions {:o}", mode)));
    }
    ctx.session.chmod(mode as u32, args.str(1)?)?;
    Ok(Reply::Int(mode))
}

fn alloc(ctx: &mut Context, args: &Args) -> Result<Reply> {
    args.arity(1, 1)?;
    let size = args.count(0, "size")?;
    ctx.session.alloc(size).map(Reply::Text)
}

fn systype(ctx: &mut Context, args: &Args) -> Result<Reply> {
    args.arity(0, 0)?;
    ctx.session.syst().map(Reply::Text)
}

fn get_option(ctx: &mut Context, args: &Args) -> Result<Reply> {
    args.arity(1, 1)?;
    let value = match args.option(0)? {
        FtpOption::TimeoutSec => Arg::Int(ctx.session.timeout().map_or(0, |t| t.as_secs() as i64)),
        FtpOption::AutoSeek => Arg::Bool(*ctx.autoseek),
    };
    Ok(Reply::Value(value))
}

fn set_option(ctx: &mut Context, args: &Args) -> Result<Reply> {
    args.arity(2, 2)?;
    match args.option(0)? {
        FtpOption::TimeoutSec => match args.count(1, "timeout")? {
            0 => return Err(FtpError::CommandError("timeout must be greater than 0".to_owned())),
            secs => ctx.session.set_timeout(Some(Duration::from_secs(secs)))?,
        },
        FtpOption::AutoSeek => *ctx.autoseek = args.bool(1)?,
    }
    Ok(Reply::Bool(true))
}

fn close(ctx: &mut Context, args: &Args) -> Result<Reply> {
    args.arity(0, 0)?;
    ctx.session.quit()?;
    Ok(Reply::Bool(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_alias_points_at_a_command() {
        assert!(validate().is_ok());
        for (alias, name) in aliases() {
            assert!(lookup(name).is_some(), "{} -> {}", alias, name);
            assert_eq!(canonical(alias), name);
        }
    }

    #[test]
    fn canonical_names_map_to_themselves() {
        for name in commands() {
            assert_eq!(canonical(name), name);
        }
        assert_eq!(canonical("nosuchcommand"), "nosuchcommand");
    }

    #[test]
    fn connect_family_needs_no_session() {
        for name in &["connect", "ssl_connect"] {
            match lookup(name) {
                Some(Handler::Connect(_)) => {}
                _ => panic!("{} is not a connect handler", name),
            }
        }
        match lookup("login") {
            Some(Handler::Session(_)) => {}
            _ => panic!("login is not a session handler"),
        }
    }

    #[test]
    fn arity_errors_name_the_command() {
        let values = vec![Arg::from("user")];
        let args = Args::new("login", &values);
        let err = args.arity(2, 2).unwrap_err();
        assert_eq!(err.to_string(), "login() expects exactly 2 parameters, 1 given");
    }

    #[test]
    fn type_mismatch_reports_position() {
        let values = vec![Arg::from(true)];
        let args = Args::new("chdir", &values);
        let err = args.str(0).unwrap_err();
        assert_eq!(err.to_string(), "chdir() expects parameter 1 to be string, boolean given");
    }

    #[test]
    fn endpoint_defaults_port_and_timeout() {
        let values = vec![Arg::from("ftp.example.com")];
        let args = Args::new("connect", &values);
        let endpoint = Endpoint::from_args(&args, Some(Duration::from_secs(90))).unwrap();
        assert_eq!(endpoint.host, "ftp.example.com");
        assert_eq!(endpoint.port, DEFAULT_PORT);
        assert_eq!(endpoint.timeout, Some(Duration::from_secs(90)));

        let values = vec![Arg::from("h"), Arg::from(2121), Arg::from(5)];
        let args = Args::new("connect", &values);
        let endpoint = Endpoint::from_args(&args, None).unwrap();
        assert_eq!(endpoint.port, 2121);
        assert_eq!(endpoint.timeout, Some(Duration::from_secs(5)));

        let values = vec![Arg::from("h"), Arg::from(70000)];
        let args = Args::new("connect", &values);
        assert!(Endpoint::from_args(&args, None).is_err());
    }
}
