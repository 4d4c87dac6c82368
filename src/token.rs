//! Discovery token encoding and recognition.
//!
//! When the remote side of an edit finishes preparing a repository, it
//! announces the result by printing a single line of the form
//! `<xeno-init>BASE64(JSON)</xeno-init>` to its stdout. The local side
//! watches command output for that line and uses the payload to clone.
//!
//! The JSON payload is a map with fixed single-character keys (`"0"`..`"3"`)
//! so the wire form stays stable across implementations. Recognition is
//! anchored to the start of the text: a token that does not begin at
//! position 0 is ignored, which keeps a remote user from spoofing one into
//! the middle of ordinary shell output.

use std::path::Path;
use std::sync::LazyLock;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Non-greedy so that two tokens arriving on one line cannot merge into a
/// single match.
static TOKEN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^<xeno-init>(.*?)</xeno-init>").expect("static regex compiles"));

/// Payload of a discovery token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryToken {
    #[serde(rename = "0")]
    pub remote_version: String,
    #[serde(rename = "1")]
    pub is_file: bool,
    #[serde(rename = "2")]
    pub remote_path: String,
    #[serde(rename = "3")]
    pub repo_path: String,
}

/// Encodes a discovery token announcing `repo_path` as the repository
/// prepared for editing `remote_path`.
///
/// The token must be printed on its own line with no preceding characters,
/// or the other side will not recognize it.
pub fn encode(remote_path: &str, repo_path: &str) -> String {
    let token = DiscoveryToken {
        remote_version: env!("CARGO_PKG_VERSION").to_string(),
        is_file: Path::new(remote_path).is_file(),
        remote_path: remote_path.to_string(),
        repo_path: repo_path.to_string(),
    };
    let json = serde_json::to_string(&token).expect("token payload serializes");
    format!("<xeno-init>{}</xeno-init>", BASE64.encode(json))
}

/// Attempts to decode a discovery token from `text`.
///
/// Returns `None` if the text does not start with a token or if any decoding
/// step fails. Trailing bytes after the closing tag are permitted.
pub fn decode(text: &str) -> Option<DiscoveryToken> {
    let captured = TOKEN_REGEX.captures(text)?;
    let raw = BASE64.decode(captured.get(1)?.as_str()).ok()?;
    serde_json::from_slice(&raw).ok()
}
