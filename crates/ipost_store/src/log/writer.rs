//! Commit log writer and replay.

use crate::error::StoreResult;
use crate::log::frame::{scan_frames, CommitBatch};
use ipost_storage::StorageBackend;
use tracing::{debug, warn};

/// Append-only commit log over a storage backend.
pub(crate) struct CommitLog {
    backend: Box<dyn StorageBackend>,
    sync_on_commit: bool,
}

impl CommitLog {
    /// Opens the log and replays every intact batch.
    ///
    /// A torn or corrupt tail is truncated so the next append starts on a
    /// frame boundary.
    pub(crate) fn open(
        mut backend: Box<dyn StorageBackend>,
        sync_on_commit: bool,
    ) -> StoreResult<(Self, Vec<CommitBatch>)> {
        let bytes = backend.read_all()?;
        let scan = scan_frames(&bytes)?;

        if let Some(problem) = &scan.tail_problem {
            let dropped = bytes.len() - scan.valid_len;
            warn!(dropped, problem = %problem, "truncating damaged commit log tail");
            backend.truncate(scan.valid_len as u64)?;
            backend.sync()?;
        }
        debug!(batches = scan.batches.len(), "replayed commit log");

        Ok((
            Self {
                backend,
                sync_on_commit,
            },
            scan.batches,
        ))
    }

    /// Appends one batch as a single frame.
    ///
    /// If the write or sync fails, the log is cut back to where it was so a
    /// failed commit leaves no bytes behind.
    pub(crate) fn append(&mut self, batch: &CommitBatch) -> StoreResult<u64> {
        let frame = batch.encode_frame()?;
        let before = self.backend.size()?;

        let result = self.backend.append(&frame).and_then(|offset| {
            self.backend.flush()?;
            if self.sync_on_commit {
                self.backend.sync()?;
            }
            Ok(offset)
        });

        match result {
            Ok(offset) => Ok(offset),
            Err(err) => {
                if let Err(rollback) = self.rollback_to(before) {
                    warn!(error = %rollback, "could not cut failed commit from log");
                }
                Err(err.into())
            }
        }
    }

    /// Cuts the log to `size` even when the backend reports no growth; a
    /// short write can leave bytes the backend never counted.
    fn rollback_to(&mut self, size: u64) -> StoreResult<()> {
        self.backend.truncate(size)?;
        Ok(())
    }

    /// Bytes currently in the log.
    pub(crate) fn size(&self) -> StoreResult<u64> {
        Ok(self.backend.size()?)
    }
}

impl std::fmt::Debug for CommitLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommitLog")
            .field("sync_on_commit", &self.sync_on_commit)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::frame::Mutation;
    use crate::record::UserRecord;
    use ipost_storage::{InMemoryBackend, StorageError, StorageResult};

    /// Backend that tracks its size separately from the bytes it holds. The
    /// append numbered `tear_on` writes half its data without counting it.
    struct ShortWriteDisk {
        inner: InMemoryBackend,
        counted: u64,
        appends: u32,
        tear_on: u32,
    }

    impl StorageBackend for ShortWriteDisk {
        fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
            self.inner.read_at(offset, len)
        }
        fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
            self.appends += 1;
            if self.appends == self.tear_on {
                self.inner.append(&data[..data.len() / 2])?;
                return Err(StorageError::injected("no space left"));
            }
            let offset = self.counted;
            self.inner.append(data)?;
            self.counted += data.len() as u64;
            Ok(offset)
        }
        fn flush(&mut self) -> StorageResult<()> {
            Ok(())
        }
        fn sync(&mut self) -> StorageResult<()> {
            Ok(())
        }
        fn size(&self) -> StorageResult<u64> {
            Ok(self.counted)
        }
        fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
            self.inner.truncate(new_size)?;
            self.counted = new_size;
            Ok(())
        }
    }

    fn batch(sequence: u64) -> CommitBatch {
        CommitBatch {
            sequence,
            mutations: vec![Mutation::InsertUser(UserRecord::new(
                "Robert Johnson",
                "@robertj",
                "person.2.fill",
            ))],
        }
    }

    #[test]
    fn appended_batches_replay() {
        let backend = InMemoryBackend::new();
        let (mut log, replayed) = CommitLog::open(Box::new(backend.clone()), true).unwrap();
        assert!(replayed.is_empty());

        log.append(&batch(1)).unwrap();
        log.append(&batch(2)).unwrap();

        let (_, replayed) = CommitLog::open(Box::new(backend), true).unwrap();
        let sequences: Vec<_> = replayed.iter().map(|b| b.sequence).collect();
        assert_eq!(sequences, [1, 2]);
    }

    #[test]
    fn open_truncates_torn_tail() {
        let good = batch(1).encode_frame().unwrap();
        let torn = batch(2).encode_frame().unwrap();
        let mut bytes = good.clone();
        bytes.extend_from_slice(&torn[..7]);
        let backend = InMemoryBackend::with_data(bytes);

        let (log, replayed) = CommitLog::open(Box::new(backend.clone()), true).unwrap();
        assert_eq!(replayed.len(), 1);
        assert_eq!(log.size().unwrap(), good.len() as u64);
        assert_eq!(backend.data(), good);
    }

    #[test]
    fn short_write_is_cut_before_next_commit() {
        let inner = InMemoryBackend::new();
        let disk = ShortWriteDisk {
            inner: inner.clone(),
            counted: 0,
            appends: 0,
            tear_on: 2,
        };
        let (mut log, _) = CommitLog::open(Box::new(disk), true).unwrap();
        log.append(&batch(1)).unwrap();
        let committed = inner.data();

        assert!(log.append(&batch(2)).is_err());
        assert_eq!(inner.data(), committed);

        log.append(&batch(3)).unwrap();
        let (_, replayed) = CommitLog::open(Box::new(inner), true).unwrap();
        let sequences: Vec<_> = replayed.iter().map(|b| b.sequence).collect();
        assert_eq!(sequences, [1, 3]);
    }
}
