//! The storage cipher: XOR stream over a SHA-256-derived key, base64 text
//! form.
//!
//! This is obfuscation, not confidentiality. The passphrase ships in the
//! binary, and XOR with a repeating key offers no protection against an
//! attacker who has both a blob and this source. It exists to keep casual
//! eyes off personal data in backup files and to give restore a cheap
//! integrity gate (wrong key or bit-rot decodes to non-UTF-8 garbage).

use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use sha2::{Digest, Sha256};

use crate::Result;

/// Passphrase baked into every deployment. Changing it orphans all existing
/// backups, so it is a constant rather than configuration.
const PASSPHRASE: &str = "bhulekh-property-ledger-storage-v1";

/// Ciphertexts shorter than this are rejected before any decode attempt;
/// even an empty ledger snapshot encrypts to far more.
const MIN_CIPHERTEXT_LEN: usize = 64;

/// XOR stream cipher keyed by the SHA-256 digest of a passphrase.
#[derive(Debug, Clone)]
pub struct Cipher {
  key: [u8; 32],
}

impl Default for Cipher {
  fn default() -> Self { Self::with_passphrase(PASSPHRASE) }
}

impl Cipher {
  /// The cipher every production path uses.
  pub fn new() -> Self { Self::default() }

  pub fn with_passphrase(passphrase: &str) -> Self {
    Self {
      key: Sha256::digest(passphrase.as_bytes()).into(),
    }
  }

  /// Encrypt plaintext into base64 (standard alphabet, padded).
  pub fn encrypt(&self, plaintext: &str) -> String {
    self.encrypt_bytes(plaintext.as_bytes())
  }

  /// Decode and decrypt a blob produced by [`Cipher::encrypt`]. Fails if
  /// the recovered bytes are not UTF-8 (wrong key or corruption).
  pub fn decrypt(&self, ciphertext: &str) -> Result<String> {
    Ok(String::from_utf8(self.decrypt_bytes(ciphertext)?)?)
  }

  /// Encrypt an arbitrary byte string. The round trip with
  /// [`Cipher::decrypt_bytes`] is an identity for any input.
  pub fn encrypt_bytes(&self, data: &[u8]) -> String {
    B64.encode(self.xor(data))
  }

  /// Decode and decrypt to raw bytes, with no UTF-8 requirement.
  pub fn decrypt_bytes(&self, ciphertext: &str) -> Result<Vec<u8>> {
    Ok(self.xor(&B64.decode(ciphertext.trim())?))
  }

  fn xor(&self, data: &[u8]) -> Vec<u8> {
    data
      .iter()
      .zip(self.key.iter().cycle())
      .map(|(byte, key)| byte ^ key)
      .collect()
  }
}

/// Cheap shape check for downloaded blobs before attempting a decode:
/// non-trivial length and nothing outside the base64 alphabet. Catches
/// gateway HTML error pages and truncated responses.
pub fn looks_like_ciphertext(blob: &str) -> bool {
  let blob = blob.trim();
  blob.len() >= MIN_CIPHERTEXT_LEN
    && blob.bytes().all(|b| {
      b.is_ascii_alphanumeric() || b == b'+' || b == b'/' || b == b'='
    })
}

#[cfg(test)]
mod tests {
  use super::{Cipher, looks_like_ciphertext};

  #[test]
  fn round_trip_preserves_plaintext() {
    let cipher = Cipher::new();
    let plain = r#"{"records":[],"saved_at":"2024-01-01T00:00:00+00:00"}"#;
    assert_eq!(cipher.decrypt(&cipher.encrypt(plain)).unwrap(), plain);
  }

  #[test]
  fn round_trip_survives_multibyte_text() {
    let cipher = Cipher::new();
    // Owner names and villages are routinely Kannada/Devanagari.
    let plain = "ಮಾಲೀಕ — रमेश कुमार — ₹1,00,000";
    assert_eq!(cipher.decrypt(&cipher.encrypt(plain)).unwrap(), plain);
  }

  #[test]
  fn byte_round_trip_is_an_identity_for_any_input() {
    let cipher = Cipher::new();
    // Every byte value, including sequences that are not valid UTF-8.
    let data: Vec<u8> = (0..=255u8).cycle().take(1024).collect();
    assert_eq!(
      cipher.decrypt_bytes(&cipher.encrypt_bytes(&data)).unwrap(),
      data
    );
    assert!(cipher.decrypt(&cipher.encrypt_bytes(&[0xFF, 0xFE])).is_err());
  }

  #[test]
  fn wrong_passphrase_never_yields_the_plaintext() {
    let plain = "{\"records\": []}";
    let blob = Cipher::new().encrypt(plain);
    // Usually a UTF-8 error; at worst, garbage that is not the input.
    match Cipher::with_passphrase("other").decrypt(&blob) {
      Ok(text) => assert_ne!(text, plain),
      Err(_) => {}
    }
  }

  #[test]
  fn ciphertext_shape_check_rejects_html_and_short_blobs() {
    let real = Cipher::new().encrypt(&"x".repeat(100));
    assert!(looks_like_ciphertext(&real));
    assert!(!looks_like_ciphertext("<!DOCTYPE html><html><body>404 not found, sorry about that</body></html>"));
    assert!(!looks_like_ciphertext("QUJD"));
  }
}
