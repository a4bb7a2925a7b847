//! The command dispatcher and connection manager.

use std::time::Duration;

use super::command::{self, Arg, Args, Context, Endpoint, Handler, Reply, DEFAULT_PORT};
use super::location::Location;
use super::message;
use super::replay::ReplayLog;
use super::session::{Connector, Session, TcpConnector};
use super::types::{FileType, FtpError, Result};

/// Settings applied when a `Client` opens its session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectOptions {
    /// Passive mode set after connecting from a URL.
    pub passive: bool,
    /// Connect timeout, also used for every network read and write.
    pub timeout: Option<Duration>,
}

impl Default for ConnectOptions {
    fn default() -> ConnectOptions {
        ConnectOptions {
            passive: true,
            timeout: Some(Duration::from_secs(90)),
        }
    }
}

/// An FTP client driven by command names.
///
/// Every command goes through [`Client::invoke`]: the name is looked up
/// case-insensitively (a `try` prefix makes the call silent, aliases such as
/// `nbget` resolve to their canonical command), run against the session, and
/// any failure comes back as `FtpError::CommandError` with a normalized
/// message. The calls that establish session state are kept in a
/// [`ReplayLog`] so [`Client::reconnect`] can rebuild the session after the
/// connection dropped.
///
/// ```no_run
/// use ftp_session::{Arg, Client};
///
/// let mut client = Client::new().unwrap();
/// client.invoke("connect", vec![Arg::from("ftp.example.com")]).unwrap();
/// client.login("anonymous", "guest@example.com").unwrap();
/// client.invoke("pasv", vec![Arg::from(true)]).unwrap();
/// if client.invoke("trydelete", vec![Arg::from("stale.txt")]).unwrap().is_failed() {
///     println!("nothing to delete");
/// }
/// ```
pub struct Client {
    connector: Box<dyn Connector>,
    session: Option<Box<dyn Session>>,
    replay: ReplayLog,
    options: ConnectOptions,
    autoseek: bool,
}

impl Client {
    /// A client connecting over TCP with default options.
    pub fn new() -> Result<Client> {
        Client::with_options(TcpConnector, ConnectOptions::default())
    }

    pub fn with_connector<C: Connector + 'static>(connector: C) -> Result<Client> {
        Client::with_options(connector, ConnectOptions::default())
    }

    pub fn with_options<C: Connector + 'static>(connector: C, options: ConnectOptions) -> Result<Client> {
        command::validate()?;
        Ok(Client {
            connector: Box::new(connector),
            session: None,
            replay: ReplayLog::new(),
            options,
            autoseek: true,
        })
    }

    /// Connects to `url` over TCP, see [`Client::from_url_with`].
    pub fn from_url(url: &str, options: ConnectOptions) -> Result<Client> {
        Client::from_url_with(TcpConnector, url, options)
    }

    /// Connects to `url`, logs in when the URL carries a user, sets the
    /// passive mode from `options` and changes to the URL path if any.
    pub fn from_url_with<C: Connector + 'static>(connector: C, url: &str, options: ConnectOptions) -> Result<Client> {
        let location: Location = url.parse()?;
        if location.secure && !connector.supports_tls() {
            return Err(FtpError::ConfigurationError(
                "secure connections need the `secure` feature".to_owned(),
            ));
        }

        let mut client = Client::with_options(connector, options)?;
        let port = location.port.unwrap_or(DEFAULT_PORT);
        let connect = if location.secure { "ssl_connect" } else { "connect" };
        client.invoke(connect, vec![Arg::from(location.host.as_str()), Arg::from(port)])?;
        if let Some(ref user) = location.user {
            let password = location.password.as_ref().map_or("", String::as_str);
            client.login(user, password)?;
        }
        let passive = client.options.passive;
        client.pasv(passive)?;
        if let Some(ref path) = location.path {
            client.chdir(path)?;
        }
        Ok(client)
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    pub fn replay_log(&self) -> &ReplayLog {
        &self.replay
    }

    /// Runs the command called `name` with `args`.
    ///
    /// A name starting with `try` runs silently: a failure of the command
    /// returns `Reply::Failed` instead of an error. `UnknownCommand` and
    /// `NotConnected` are returned either way.
    pub fn invoke(&mut self, name: &str, args: Vec<Arg>) -> Result<Reply> {
        let lower = name.to_lowercase();
        let (silent, bare) = match lower.strip_prefix("try") {
            Some(rest) => (true, rest),
            None => (false, lower.as_str()),
        };
        let canonical = command::canonical(bare);
        let handler = match command::lookup(canonical) {
            Some(handler) => handler,
            None => return Err(FtpError::UnknownCommand(name.to_owned())),
        };
        if let Handler::Session(_) = handler {
            if self.session.is_none() {
                return Err(FtpError::NotConnected);
            }
        }
        debug!("invoke {}({} args){}", canonical, args.len(), if silent { " silently" } else { "" });

        match self.execute(canonical, handler, args) {
            Ok(reply) => Ok(reply),
            Err(err) => {
                let message = message::normalize(&err.to_string());
                if silent {
                    debug!("{}() failed: {}", canonical, message);
                    Ok(Reply::Failed)
                } else {
                    Err(FtpError::CommandError(message))
                }
            }
        }
    }

    fn execute(&mut self, canonical: &str, handler: Handler, args: Vec<Arg>) -> Result<Reply> {
        match handler {
            Handler::Connect(open) => {
                self.replay.reset(canonical, args.clone());
                self.session = None;
                let endpoint = Endpoint::from_args(&Args::new(canonical, &args), self.options.timeout)?;
                let session = open(&*self.connector, &endpoint)?;
                self.session = Some(session);
                self.autoseek = true;
                Ok(Reply::None)
            }
            Handler::Session(run) => {
                let session = match self.session {
                    Some(ref mut session) => session,
                    None => return Err(FtpError::NotConnected),
                };
                let result = {
                    let mut ctx = Context {
                        session: &mut **session,
                        autoseek: &mut self.autoseek,
                    };
                    run(&mut ctx, &Args::new(canonical, &args))
                };
                if canonical == "close" {
                    self.session = None;
                    return result;
                }
                let reply = result?;
                match canonical {
                    "login" | "pasv" => self.replay.record(canonical, args),
                    "chdir" | "cdup" => {
                        let cwd = session.pwd()?;
                        self.replay.record("chdir", vec![Arg::Str(cwd)]);
                    }
                    _ => {}
                }
                Ok(reply)
            }
        }
    }

    /// Closes the session (ignoring failures) and replays the replay log.
    ///
    /// If a replayed call fails its error is returned and the replay log is
    /// left as it was before, so a later `reconnect` tries the whole sequence
    /// again.
    pub fn reconnect(&mut self) -> Result<()> {
        if self.replay.is_empty() {
            return Err(FtpError::NotConnected);
        }
        info!("reconnecting, replaying {:?}", self.replay.names());
        if let Some(mut session) = self.session.take() {
            if let Err(err) = session.quit() {
                debug!("ignoring failure to close the old session: {}", err);
            }
        }
        let saved = self.replay.clone();
        for (name, args) in saved.iter() {
            if let Err(err) = self.invoke(name, args.to_vec()) {
                warn!("replaying {}() failed: {}", name, err);
                self.replay = saved.clone();
                return Err(err);
            }
        }
        Ok(())
    }

    /// Runs `op` straight on the session, bypassing the command table and
    /// the replay log.
    pub(crate) fn with_session<T, F>(&mut self, op: F) -> Result<T>
    where
        F: FnOnce(&mut dyn Session) -> Result<T>,
    {
        match self.session {
            Some(ref mut session) => op(&mut **session),
            None => Err(FtpError::NotConnected),
        }
    }

    pub fn connect(&mut self, host: &str, port: u16) -> Result<()> {
        self.invoke("connect", vec![Arg::from(host), Arg::from(port)]).map(|_| ())
    }

    pub fn ssl_connect(&mut self, host: &str, port: u16) -> Result<()> {
        self.invoke("ssl_connect", vec![Arg::from(host), Arg::from(port)]).map(|_| ())
    }

    pub fn login(&mut self, user: &str, password: &str) -> Result<()> {
        self.invoke("login", vec![Arg::from(user), Arg::from(password)]).map(|_| ())
    }

    pub fn pasv(&mut self, passive: bool) -> Result<()> {
        self.invoke("pasv", vec![Arg::from(passive)]).map(|_| ())
    }

    pub fn chdir(&mut self, path: &str) -> Result<()> {
        self.invoke("chdir", vec![Arg::from(path)]).map(|_| ())
    }

    pub fn cdup(&mut self) -> Result<()> {
        self.invoke("cdup", Vec::new()).map(|_| ())
    }

    pub fn pwd(&mut self) -> Result<String> {
        let reply = self.invoke("pwd", Vec::new())?;
        reply.into_text().ok_or_else(|| unexpected("pwd"))
    }

    pub fn mkdir(&mut self, path: &str) -> Result<String> {
        let reply = self.invoke("mkdir", vec![Arg::from(path)])?;
        reply.into_text().ok_or_else(|| unexpected("mkdir"))
    }

    pub fn rmdir(&mut self, path: &str) -> Result<()> {
        self.invoke("rmdir", vec![Arg::from(path)]).map(|_| ())
    }

    pub fn delete(&mut self, path: &str) -> Result<()> {
        self.invoke("delete", vec![Arg::from(path)]).map(|_| ())
    }

    pub fn nlist(&mut self, path: &str) -> Result<Vec<String>> {
        let reply = self.invoke("nlist", vec![Arg::from(path)])?;
        reply.into_list().ok_or_else(|| unexpected("nlist"))
    }

    /// Downloads `remote` into the local file `local`.
    pub fn get(&mut self, local: &str, remote: &str, mode: FileType) -> Result<()> {
        self.invoke("get", vec![Arg::from(local), Arg::from(remote), Arg::from(mode)])
            .map(|_| ())
    }

    /// Uploads the local file `local` to `remote`.
    pub fn put(&mut self, remote: &str, local: &str, mode: FileType) -> Result<()> {
        self.invoke("put", vec![Arg::from(remote), Arg::from(local), Arg::from(mode)])
            .map(|_| ())
    }

    pub fn close(&mut self) -> Result<()> {
        self.invoke("close", Vec::new()).map(|_| ())
    }
}

fn unexpected(name: &str) -> FtpError {
    FtpError::InvalidResponse(format!("{}() returned an unexpected reply", name))
}
