//! Connection URLs: `ftp://[user[:pass]@]host[:port][/path]`, `ftps://...`
//! and `sftp://...` (both connect with explicit FTPS).

use std::borrow::Cow;
use std::str::FromStr;

use percent_encoding::percent_decode_str;
use url::{Host, Url};

use super::types::{FtpError, Result};

/// A parsed connection URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub secure: bool,
    pub host: String,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub path: Option<String>,
}

impl FromStr for Location {
    type Err = FtpError;

    fn from_str(raw: &str) -> Result<Location> {
        let raw: Cow<str> = if raw.contains("://") {
            raw.into()
        } else {
            format!("ftp://{}", raw).into()
        };
        let url = Url::parse(&raw).map_err(|e| FtpError::ConfigurationError(format!("invalid URL: {}", e)))?;

        let secure = match url.scheme() {
            "ftp" => false,
            "ftps" | "sftp" => true,
            other => {
                return Err(FtpError::ConfigurationError(format!("unsupported URL scheme '{}'", other)))
            }
        };
        let host = match url.host() {
            Some(Host::Ipv6(addr)) => addr.to_string(),
            Some(Host::Ipv4(addr)) => addr.to_string(),
            Some(Host::Domain(name)) if !name.is_empty() => name.to_owned(),
            _ => return Err(FtpError::ConfigurationError("URL has no host".to_owned())),
        };
        let user = match url.username() {
            "" => None,
            name => Some(decode(name)?),
        };
        let password = url.password().map(decode).transpose()?;
        let path = match url.path() {
            "" | "/" => None,
            path => Some(decode(path)?),
        };

        Ok(Location {
            secure,
            host,
            port: url.port(),
            user,
            password,
            path,
        })
    }
}

fn decode(part: &str) -> Result<String> {
    percent_decode_str(part)
        .decode_utf8()
        .map(Cow::into_owned)
        .map_err(|_| FtpError::ConfigurationError("URL contains invalid UTF-8".to_owned()))
}
