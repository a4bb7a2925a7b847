//! Normalization of failure messages before they reach the caller.

use regex::Regex;

lazy_static! {
    static ref TAG_RE: Regex = Regex::new(r"<[^<>]*>").unwrap();
}

/// Turns the text of a failed command into the message surfaced to callers.
///
/// Markup is stripped and HTML entities decoded when the text contains tags,
/// then everything up to and including the first `": "` is dropped: that is
/// the name of whatever raised the error (`FTP UnexpectedResponse: ...`,
/// `ftp_chdir(): ...`), not part of the message.
pub fn normalize(raw: &str) -> String {
    let text = if TAG_RE.is_match(raw) {
        let stripped = TAG_RE.replace_all(raw, "");
        html_escape::decode_html_entities(&stripped).into_owned()
    } else {
        raw.to_owned()
    };

    let message = match text.find(": ") {
        Some(at) => text[at + 2..].trim(),
        None => text.trim(),
    };
    if message.is_empty() {
        text.trim().to_owned()
    } else {
        message.to_owned()
    }
}
