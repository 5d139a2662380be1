//! Persistence adapter for the bhulekh ledger.
//!
//! Every channel stores the same encrypted snapshot text produced by
//! `bhulekh-codec`; the channels differ only in where the blob lives (a
//! local file, a SQLite backup table, a pinned IPFS object). The restore
//! driver tries them in a fixed priority order and falls back to a fresh
//! genesis ledger when none can produce a usable blob.

mod channel;
mod cid;
mod local;
mod remote;
mod restore;
mod sqlite;

pub mod error;

pub use channel::{BackupChannel, BackupMeta};
pub use cid::CidRegistry;
pub use error::{Error, Result};
pub use local::LocalFileChannel;
pub use remote::PinataChannel;
pub use restore::{
  BackupReport, Outcome, RestoredLedger, backup_ledger, restore_ledger,
};
pub use sqlite::{MAX_BACKUP_ROWS, SqliteChannel};
