//! Commit frame encoding.

use crate::error::{StoreError, StoreResult};
use crate::ids::UserId;
use crate::record::{PostRecord, UserRecord};
use serde::{Deserialize, Serialize};

/// Magic bytes opening every frame.
pub(crate) const FRAME_MAGIC: [u8; 4] = *b"IPCL";

/// Current frame format version.
pub(crate) const FRAME_VERSION: u16 = 1;

/// magic (4) + version (2) + length (4)
pub(crate) const HEADER_SIZE: usize = 10;

pub(crate) const CRC_SIZE: usize = 4;

/// One staged change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) enum Mutation {
    InsertUser(UserRecord),
    InsertPost(PostRecord),
    /// Removes the user and every post they wrote.
    DeleteUser(UserId),
}

/// The unit of atomicity: everything staged between two saves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct CommitBatch {
    pub sequence: u64,
    pub mutations: Vec<Mutation>,
}

impl CommitBatch {
    /// Encodes the batch as a complete frame.
    pub(crate) fn encode_frame(&self) -> StoreResult<Vec<u8>> {
        let mut payload = Vec::new();
        ciborium::into_writer(self, &mut payload).map_err(|e| StoreError::encode(e.to_string()))?;

        let len = u32::try_from(payload.len())
            .map_err(|_| StoreError::encode("commit batch larger than 4 GiB"))?;

        let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len() + CRC_SIZE);
        frame.extend_from_slice(&FRAME_MAGIC);
        frame.extend_from_slice(&FRAME_VERSION.to_le_bytes());
        frame.extend_from_slice(&len.to_le_bytes());
        frame.extend_from_slice(&payload);
        let crc = compute_crc32(&frame);
        frame.extend_from_slice(&crc.to_le_bytes());
        Ok(frame)
    }
}

/// Outcome of scanning a log buffer.
#[derive(Debug, Default)]
pub(crate) struct Scan {
    pub batches: Vec<CommitBatch>,
    /// Length of the valid prefix.
    pub valid_len: usize,
    /// Why scanning stopped early, if it did.
    pub tail_problem: Option<String>,
}

/// Splits `bytes` into commit batches.
///
/// A frame with a good checksum but an unknown version is a hard error:
/// truncating it would silently drop data written by a newer build.
pub(crate) fn scan_frames(bytes: &[u8]) -> StoreResult<Scan> {
    let mut scan = Scan::default();
    let mut cursor = 0usize;

    while cursor < bytes.len() {
        let rest = &bytes[cursor..];
        if rest.len() < HEADER_SIZE {
            scan.tail_problem = Some(format!("{} trailing bytes shorter than a header", rest.len()));
            break;
        }
        if rest[..4] != FRAME_MAGIC {
            scan.tail_problem = Some(format!("bad magic at offset {cursor}"));
            break;
        }

        let version = u16::from_le_bytes([rest[4], rest[5]]);
        let len = u32::from_le_bytes([rest[6], rest[7], rest[8], rest[9]]) as usize;
        let frame_len = HEADER_SIZE + len + CRC_SIZE;
        if rest.len() < frame_len {
            scan.tail_problem = Some(format!(
                "frame at offset {cursor} needs {frame_len} bytes, {} present",
                rest.len()
            ));
            break;
        }

        let body_end = HEADER_SIZE + len;
        let stored = u32::from_le_bytes([
            rest[body_end],
            rest[body_end + 1],
            rest[body_end + 2],
            rest[body_end + 3],
        ]);
        let computed = compute_crc32(&rest[..body_end]);
        if stored != computed {
            scan.tail_problem = Some(format!(
                "checksum mismatch at offset {cursor}: expected {stored:08x}, got {computed:08x}"
            ));
            break;
        }

        if version != FRAME_VERSION {
            return Err(StoreError::invalid_format(format!(
                "commit frame version {version} is not supported (expected {FRAME_VERSION})"
            )));
        }

        let batch: CommitBatch = ciborium::from_reader(&rest[HEADER_SIZE..body_end])
            .map_err(|e| StoreError::decode(e.to_string()))?;
        scan.batches.push(batch);
        cursor += frame_len;
        scan.valid_len = cursor;
    }

    Ok(scan)
}

/// CRC32 (IEEE polynomial).
pub(crate) fn compute_crc32(data: &[u8]) -> u32 {
    const TABLE: [u32; 256] = {
        let mut table = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            let mut crc = i as u32;
            let mut j = 0;
            while j < 8 {
                if crc & 1 != 0 {
                    crc = (crc >> 1) ^ 0xEDB8_8320;
                } else {
                    crc >>= 1;
                }
                j += 1;
            }
            table[i] = crc;
            i += 1;
        }
        table
    };

    let mut crc = 0xFFFF_FFFF_u32;
    for &byte in data {
        let index = ((crc ^ u32::from(byte)) & 0xFF) as usize;
        crc = (crc >> 8) ^ TABLE[index];
    }
    !crc
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_batch(sequence: u64) -> CommitBatch {
        let user = UserRecord::new("John Doe", "@johndoe", "person.fill");
        let post = PostRecord::new("hello", Some("book.fill".into()), Utc::now(), user.id);
        CommitBatch {
            sequence,
            mutations: vec![Mutation::InsertUser(user), Mutation::InsertPost(post)],
        }
    }

    #[test]
    fn crc32_known_value() {
        assert_eq!(compute_crc32(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn frames_scan_in_order() {
        let mut log = sample_batch(1).encode_frame().unwrap();
        log.extend(sample_batch(2).encode_frame().unwrap());

        let scan = scan_frames(&log).unwrap();
        assert_eq!(scan.batches.len(), 2);
        assert_eq!(scan.batches[1].sequence, 2);
        assert_eq!(scan.valid_len, log.len());
        assert!(scan.tail_problem.is_none());
    }

    #[test]
    fn torn_tail_is_reported_not_fatal() {
        let first = sample_batch(1).encode_frame().unwrap();
        let second = sample_batch(2).encode_frame().unwrap();
        let mut log = first.clone();
        log.extend_from_slice(&second[..second.len() / 2]);

        let scan = scan_frames(&log).unwrap();
        assert_eq!(scan.batches.len(), 1);
        assert_eq!(scan.valid_len, first.len());
        assert!(scan.tail_problem.is_some());
    }

    #[test]
    fn flipped_byte_fails_checksum() {
        let mut log = sample_batch(1).encode_frame().unwrap();
        let middle = log.len() / 2;
        log[middle] ^= 0xFF;

        let scan = scan_frames(&log).unwrap();
        assert!(scan.batches.is_empty());
        assert_eq!(scan.valid_len, 0);
        assert!(scan.tail_problem.unwrap().contains("checksum"));
    }

    #[test]
    fn unknown_version_is_an_error() {
        let mut frame = sample_batch(1).encode_frame().unwrap();
        frame[4] = 9;
        let body_end = frame.len() - CRC_SIZE;
        let crc = compute_crc32(&frame[..body_end]);
        frame[body_end..].copy_from_slice(&crc.to_le_bytes());

        assert!(matches!(
            scan_frames(&frame),
            Err(StoreError::InvalidFormat { .. })
        ));
    }
}
