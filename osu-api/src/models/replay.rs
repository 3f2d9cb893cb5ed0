use serde::Deserialize;

/// Replay data returned by `get_replay`
///
/// `content` is the LZMA replay stream, encoded as named by `encoding`
/// (always `base64` in practice).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Replay {
    pub content: String,
    pub encoding: String,
}
