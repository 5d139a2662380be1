//! Core types and operations for the bhulekh property ledger.
//!
//! This crate owns the hash-linked record chain, the per-property and
//! identity indices, and every mutation/query/search operation. It is
//! deliberately free of I/O dependencies; persistence lives in
//! `bhulekh-codec` and `bhulekh-store`.

pub mod canonical;
pub mod error;
pub mod identity;
pub mod ledger;
pub mod record;
pub mod search;
pub mod state;

pub use error::{Error, Result};
pub use ledger::Ledger;
pub use record::{Payload, Record};

#[cfg(test)]
mod tests;
