//! Fault injection for the storage layer.

use ipost_storage::{InMemoryBackend, StorageBackend, StorageError, StorageResult};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Shared switch controlling a [`FaultyBackend`].
///
/// Clones control the same backend, so a test can keep one while the
/// backend itself is owned by the store on the coordinator thread.
#[derive(Debug, Clone, Default)]
pub struct FaultSwitch {
    failing: Arc<AtomicBool>,
    tearing: Arc<AtomicBool>,
    injected: Arc<AtomicUsize>,
}

impl FaultSwitch {
    /// Makes every following append and sync fail.
    pub fn arm(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    /// Lets writes through again.
    pub fn disarm(&self) {
        self.failing.store(false, Ordering::SeqCst);
    }

    /// Makes the next append write the first half of its bytes and then
    /// fail, the way a disk that fills up mid-write does. One-shot.
    pub fn tear_next_append(&self) {
        self.tearing.store(true, Ordering::SeqCst);
    }

    /// Whether writes currently fail.
    pub fn is_armed(&self) -> bool {
        self.failing.load(Ordering::SeqCst)
    }

    /// How many operations were failed so far.
    pub fn injected(&self) -> usize {
        self.injected.load(Ordering::SeqCst)
    }

    fn check(&self, what: &str) -> StorageResult<()> {
        if self.is_armed() {
            self.injected.fetch_add(1, Ordering::SeqCst);
            return Err(StorageError::injected(format!("{what} failed")));
        }
        Ok(())
    }

    fn take_tear(&self) -> bool {
        let tear = self.tearing.swap(false, Ordering::SeqCst);
        if tear {
            self.injected.fetch_add(1, Ordering::SeqCst);
        }
        tear
    }
}

/// Backend wrapper whose writes fail while its [`FaultSwitch`] is armed,
/// or leave a torn prefix after [`FaultSwitch::tear_next_append`].
///
/// Reads and truncation always pass through, so a failed append can be
/// rolled back by the commit log.
#[derive(Debug)]
pub struct FaultyBackend<B = InMemoryBackend> {
    inner: B,
    switch: FaultSwitch,
}

impl FaultyBackend<InMemoryBackend> {
    /// Wraps a fresh in-memory backend. The returned backend shares its
    /// buffer with the one passed to the store, so tests can inspect it.
    pub fn in_memory() -> (Self, FaultSwitch, InMemoryBackend) {
        let inner = InMemoryBackend::new();
        let (backend, switch) = Self::wrap(inner.clone());
        (backend, switch, inner)
    }
}

impl<B: StorageBackend> FaultyBackend<B> {
    /// Wraps `inner` with a disarmed switch.
    pub fn wrap(inner: B) -> (Self, FaultSwitch) {
        let switch = FaultSwitch::default();
        (
            Self {
                inner,
                switch: switch.clone(),
            },
            switch,
        )
    }
}

impl<B: StorageBackend> StorageBackend for FaultyBackend<B> {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        self.inner.read_at(offset, len)
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        self.switch.check("append")?;
        if self.switch.take_tear() {
            self.inner.append(&data[..data.len() / 2])?;
            return Err(StorageError::injected("append torn"));
        }
        self.inner.append(data)
    }

    fn flush(&mut self) -> StorageResult<()> {
        self.inner.flush()
    }

    fn sync(&mut self) -> StorageResult<()> {
        self.switch.check("sync")?;
        self.inner.sync()
    }

    fn size(&self) -> StorageResult<u64> {
        self.inner.size()
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        self.inner.truncate(new_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn armed_switch_fails_writes_only() {
        let (mut backend, switch, inner) = FaultyBackend::in_memory();
        backend.append(b"ok").unwrap();

        switch.arm();
        assert!(backend.append(b"nope").is_err());
        assert!(backend.sync().is_err());
        assert_eq!(backend.read_at(0, 2).unwrap(), b"ok");
        assert_eq!(switch.injected(), 2);

        switch.disarm();
        backend.append(b"!").unwrap();
        assert_eq!(inner.data(), b"ok!");
    }

    #[test]
    fn torn_append_leaves_prefix_once() {
        let (mut backend, switch, inner) = FaultyBackend::in_memory();
        switch.tear_next_append();
        assert!(backend.append(b"abcd").is_err());
        assert_eq!(inner.data(), b"ab");
        assert_eq!(switch.injected(), 1);

        backend.append(b"!").unwrap();
        assert_eq!(inner.data(), b"ab!");
    }
}
