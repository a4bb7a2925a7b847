//! Recursive directory operations built from single commands: existence
//! checks, recursive mkdir and delete, and mirroring a remote tree to disk.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;

use super::client::Client;
use super::command::Arg;
use super::message;
use super::types::{FileType, FtpError, Result};

/// Deepest directory level the walkers descend to.
pub const MAX_TREE_DEPTH: usize = 256;

enum Step {
    Visit(String, usize),
    RemoveDir(String),
}

impl Client {
    /// True if `path` shows up in the name list of its parent directory.
    ///
    /// A parent the server refuses to list means `false`; a broken
    /// connection is an error.
    pub fn exists(&mut self, path: &str) -> Result<bool> {
        let (parent, name) = split_parent(path);
        if name.is_empty() {
            return self.is_dir(path);
        }
        let entries = self.entries(parent)?;
        Ok(entries.iter().any(|entry| entry == path || basename(entry) == name))
    }

    /// True if the server lets us change into `path`. The working directory
    /// is left unchanged.
    ///
    /// A directory we may not enter looks the same as a missing one.
    pub fn is_dir(&mut self, path: &str) -> Result<bool> {
        let home = self.pwd()?;
        self.enters(path, &home)
    }

    /// Changes into `path` and straight back to the absolute directory
    /// `home`. The working directory ends up where it was, so nothing is
    /// recorded for replay.
    fn enters(&mut self, path: &str, home: &str) -> Result<bool> {
        self.with_session(|session| {
            match session.cwd(path) {
                Ok(()) => {}
                Err(ref err) if is_rejection(err) => {
                    debug!("cannot enter {}: {}", path, err);
                    return Ok(false);
                }
                Err(err) => return Err(err),
            }
            session.cwd(home)?;
            Ok(true)
        })
        .map_err(surface)
    }

    /// Names listed in `dir`. Servers answer NLST of an empty directory with
    /// 450, so any refused listing counts as empty.
    fn entries(&mut self, dir: &str) -> Result<Vec<String>> {
        self.with_session(|session| match session.nlst(Some(dir)) {
            Err(ref err) if is_rejection(err) => {
                debug!("no listing for {}: {}", dir, err);
                Ok(Vec::new())
            }
            other => other,
        })
        .map_err(surface)
    }

    /// Creates `path` and every missing parent. Existing directories along
    /// the way are fine, anything else in the way is a `DirectoryConflict`.
    pub fn mkdir_recursive(&mut self, path: &str) -> Result<()> {
        let mut prefix = String::with_capacity(path.len());
        for (i, part) in path.split('/').enumerate() {
            if i > 0 {
                prefix.push('/');
            }
            prefix.push_str(part);
            if part.is_empty() {
                continue;
            }
            if self.invoke("trymkdir", vec![Arg::from(prefix.as_str())])?.is_failed() && !self.is_dir(&prefix)? {
                return Err(FtpError::DirectoryConflict(prefix));
            }
        }
        Ok(())
    }

    /// Deletes `path`, a file or a whole directory tree.
    pub fn delete_recursive(&mut self, path: &str) -> Result<()> {
        let mut steps = vec![Step::Visit(path.to_owned(), 0)];
        while let Some(step) = steps.pop() {
            match step {
                Step::RemoveDir(dir) => self.rmdir(&dir)?,
                Step::Visit(path, depth) => {
                    if !self.invoke("trydelete", vec![Arg::from(path.as_str())])?.is_failed() {
                        continue;
                    }
                    check_depth(&path, depth)?;
                    let entries = self.entries(&path)?;
                    steps.push(Step::RemoveDir(path.clone()));
                    for entry in entries.iter().rev().filter(|entry| !is_dot(entry)) {
                        let child = qualify(&path, entry);
                        if child != path {
                            steps.push(Step::Visit(child, depth + 1));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Mirrors the remote directory `remote_root` into `local_root`.
    ///
    /// Remote paths matching `exclude` are skipped together with everything
    /// below them; directories are matched with a trailing `/` as well, so
    /// `/cache/` excludes a `cache` directory. Files are transferred in
    /// binary mode.
    pub fn download_dir<P: AsRef<Path>>(&mut self, local_root: P, remote_root: &str, exclude: &Regex) -> Result<()> {
        let local_root = local_root.as_ref();
        fs::create_dir_all(local_root).map_err(FtpError::LocalError)?;

        let root = match remote_root.trim_end_matches('/') {
            "" if remote_root.starts_with('/') => "/",
            trimmed => trimmed,
        };
        let home = self.pwd()?;
        let mut pending: Vec<(String, PathBuf, usize)> = vec![(root.to_owned(), local_root.to_path_buf(), 0)];
        while let Some((dir, local_dir, depth)) = pending.pop() {
            check_depth(&dir, depth)?;
            for entry in self.entries(&dir)? {
                if is_dot(&entry) {
                    continue;
                }
                let remote = qualify(&dir, &entry);
                if remote == dir || exclude.is_match(&remote) {
                    continue;
                }
                let local = local_dir.join(basename(&remote));
                if self.enters(&remote, &home)? {
                    if exclude.is_match(&format!("{}/", remote)) {
                        debug!("excluding directory {}", remote);
                        continue;
                    }
                    fs::create_dir_all(&local).map_err(FtpError::LocalError)?;
                    pending.push((remote, local, depth + 1));
                } else {
                    debug!("downloading {} to {}", remote, local.display());
                    self.get(&local.to_string_lossy(), &remote, FileType::Binary)?;
                }
            }
        }
        Ok(())
    }
}

/// The server refused the command, as opposed to the connection failing.
fn is_rejection(err: &FtpError) -> bool {
    match *err {
        FtpError::UnexpectedResponse(_) => true,
        _ => false,
    }
}

fn surface(err: FtpError) -> FtpError {
    match err {
        FtpError::NotConnected => FtpError::NotConnected,
        other => FtpError::CommandError(message::normalize(&other.to_string())),
    }
}

fn check_depth(path: &str, depth: usize) -> Result<()> {
    if depth > MAX_TREE_DEPTH {
        return Err(FtpError::CommandError(format!(
            "directory tree deeper than {} levels at '{}'",
            MAX_TREE_DEPTH, path
        )));
    }
    Ok(())
}

/// Splits `path` into the directory to list and the name to look for.
fn split_parent(path: &str) -> (&str, &str) {
    let path = path.trim_end_matches('/');
    match path.rfind('/') {
        Some(0) => ("/", &path[1..]),
        Some(at) => (&path[..at], &path[at + 1..]),
        None => (".", path),
    }
}

fn basename(path: &str) -> &str {
    let path = path.trim_end_matches('/');
    path.rsplit('/').next().unwrap_or(path)
}

fn is_dot(entry: &str) -> bool {
    let name = basename(entry);
    name == "." || name == ".."
}

/// Listing entries with a `/` are already full paths, bare names live in `dir`.
fn qualify(dir: &str, entry: &str) -> String {
    if entry.contains('/') {
        entry.to_owned()
    } else {
        format!("{}/{}", dir.trim_end_matches('/'), entry)
    }
}
