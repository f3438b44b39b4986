//! Commit log.
//!
//! Every successful [`crate::RecordStore::save`] appends one frame holding
//! the whole batch of staged mutations, so a batch is either fully on disk
//! or not at all.
//!
//! Frame layout (little-endian):
//!
//! ```text
//! | magic "IPCL" (4) | version (2) | payload len (4) | CBOR payload | crc32 (4) |
//! ```
//!
//! The CRC covers header and payload. On open, frames are replayed in
//! order; the first torn or checksum-failing frame ends the log and
//! everything from it onward is truncated.

mod frame;
mod writer;

pub(crate) use frame::{CommitBatch, Mutation};
pub(crate) use writer::CommitLog;
