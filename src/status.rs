//! FTP reply codes the transport expects (RFC 959 and RFC 2428)

// 1xx: the data connection is (being) opened
pub const ALREADY_OPEN: u32 = 125;
pub const ABOUT_TO_SEND: u32 = 150;

// 2xx
pub const COMMAND_OK: u32 = 200;
/// Also the reply to an `ALLO` the server has no use for.
pub const COMMAND_NOT_IMPLEMENTED: u32 = 202;
pub const FILE: u32 = 213;
pub const NAME: u32 = 215;
pub const READY: u32 = 220;
pub const CLOSING: u32 = 221;
pub const CLOSING_DATA_CONNECTION: u32 = 226;
pub const PASSIVE_MODE: u32 = 227;
pub const EXTENDED_PASSIVE_MODE: u32 = 229;
pub const LOGGED_IN: u32 = 230;
pub const AUTH_OK: u32 = 234;
pub const REQUESTED_FILE_ACTION_OK: u32 = 250;
pub const PATH_CREATED: u32 = 257;

// 3xx
pub const NEED_PASSWORD: u32 = 331;
pub const REQUEST_FILE_PENDING: u32 = 350;

/// True for 2xx replies.
pub fn is_completion(code: u32) -> bool {
    (200..300).contains(&code)
}
