//! Error type for `bhulekh-codec`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] bhulekh_core::Error),

  #[error("ciphertext is not valid base64: {0}")]
  Base64(#[from] base64::DecodeError),

  #[error("decrypted blob is not valid UTF-8; wrong passphrase or corrupt data")]
  NotUtf8(#[from] std::string::FromUtf8Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
