//! Error type for `bhulekh-store`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] bhulekh_core::Error),

  #[error("codec error: {0}")]
  Codec(#[from] bhulekh_codec::Error),

  #[error("database error: {0}")]
  Database(#[from] rusqlite::Error),

  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  /// A channel was constructed without the credentials it needs.
  #[error("channel not configured: missing {0}")]
  NotConfigured(&'static str),

  #[error("upload rejected with status {status}: {body}")]
  UploadFailed { status: u16, body: String },

  /// A blob was fetched but failed the ciphertext shape check, or every
  /// gateway returned something unusable.
  #[error("no usable blob: {0}")]
  UnusableBlob(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
