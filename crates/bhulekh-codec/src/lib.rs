//! Storage codec for the bhulekh ledger: deterministic snapshot
//! serialization plus the obfuscation cipher used for every blob at rest.
//!
//! Decoding always runs the full decrypt → parse → re-verify path; a blob
//! whose chain no longer validates is salvaged down to its longest
//! verifiable prefix rather than rejected outright.

mod cipher;
mod snapshot;

pub mod error;

pub use cipher::{Cipher, looks_like_ciphertext};
pub use error::{Error, Result};
pub use snapshot::{RestoreOutcome, Snapshot, decode, encode};
