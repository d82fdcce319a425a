//! Duplicate-resolution ledger for ASS/SSA samples
//!
//! Matroska files with ordered chapters replay the same subtitle blocks
//! under a new outer timeline. Every replayed block carries the ReadOrder it
//! had the first time, and the markup engine ignores a chunk whose ReadOrder
//! it already holds. The ledger drops true replays (same ReadOrder, same
//! text) and moves distinct text that reuses a ReadOrder into its own band
//! (`read_order + n * COLLISION_STRIDE`, `n` = prior texts under that key).

use bytes::{BufMut, Bytes, BytesMut};
use std::collections::HashMap;

use crate::types::SubtitleChunk;

/// Width of one collision band
pub const COLLISION_STRIDE: i64 = 30_000;

/// A chunk the ledger has let through
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkRecord {
    /// ReadOrder the chunk was ingested under (after renumbering)
    pub read_order: i64,
    pub start: i64,
    pub stop: i64,
    /// Text as received, before renumbering
    pub text: Bytes,
}

/// What to do with an incoming chunk
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Already ingested: a seek or chapter replay
    Drop,
    /// Append `data` to the document
    Ingest {
        original_read_order: i64,
        read_order: i64,
        data: Bytes,
    },
}

/// Multi-map of ReadOrder to every distinct text seen under it
#[derive(Debug, Default)]
pub struct DuplicateLedger {
    records: HashMap<i64, Vec<ChunkRecord>>,
    len: usize,
}

impl DuplicateLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide whether `chunk` is new, recording it when it is
    pub fn resolve(&mut self, chunk: &SubtitleChunk) -> Resolution {
        let read_order = parse_read_order(&chunk.data);

        if self.is_empty() {
            self.insert(
                read_order,
                ChunkRecord {
                    read_order,
                    start: chunk.start,
                    stop: chunk.stop,
                    text: chunk.data.clone(),
                },
            );
            return Resolution::Ingest {
                original_read_order: read_order,
                read_order,
                data: chunk.data.clone(),
            };
        }

        let bucket = self.records.get(&read_order).map(Vec::as_slice).unwrap_or(&[]);
        if bucket.iter().any(|r| r.text == chunk.data) {
            tracing::trace!("ReadOrder {} replayed, dropping duplicate", read_order);
            return Resolution::Drop;
        }

        let collisions = bucket.len() as i64;
        let renumbered = read_order.saturating_add(collisions.saturating_mul(COLLISION_STRIDE));
        let data = rewrite_read_order(&chunk.data, renumbered);
        if collisions > 0 {
            tracing::debug!(
                "ReadOrder {} collides with {} earlier line(s), renumbered to {}",
                read_order,
                collisions,
                renumbered
            );
        }

        // keyed by the original ReadOrder so the next collision counts this one
        self.insert(
            read_order,
            ChunkRecord {
                read_order: renumbered,
                start: chunk.start,
                stop: chunk.stop,
                text: chunk.data.clone(),
            },
        );

        Resolution::Ingest {
            original_read_order: read_order,
            read_order: renumbered,
            data,
        }
    }

    fn insert(&mut self, key: i64, record: ChunkRecord) {
        self.records.entry(key).or_default().push(record);
        self.len += 1;
    }

    /// Records stored under `read_order`
    pub fn records(&self, read_order: i64) -> &[ChunkRecord] {
        self.records.get(&read_order).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of records stored under `read_order`
    pub fn count(&self, read_order: i64) -> usize {
        self.records(read_order).len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.len = 0;
    }
}

/// Integer value of the field before the first comma.
///
/// Follows `strtol` rules: leading whitespace, optional sign, then as many
/// digits as present. Anything unparsable yields 0.
pub fn parse_read_order(data: &[u8]) -> i64 {
    let field = match data.iter().position(|&b| b == b',') {
        Some(pos) => &data[..pos],
        None => data,
    };
    let mut bytes = field.iter().skip_while(|b| b.is_ascii_whitespace()).peekable();

    let negative = match bytes.peek() {
        Some(b'-') => {
            bytes.next();
            true
        }
        Some(b'+') => {
            bytes.next();
            false
        }
        _ => false,
    };

    let mut value: i64 = 0;
    for &b in bytes.take_while(|b| b.is_ascii_digit()) {
        value = value.saturating_mul(10).saturating_add(i64::from(b - b'0'));
    }
    if negative {
        -value
    } else {
        value
    }
}

/// Replace the leading ReadOrder field with `read_order`
pub fn rewrite_read_order(data: &[u8], read_order: i64) -> Bytes {
    let rest = match data.iter().position(|&b| b == b',') {
        Some(pos) => &data[pos..],
        None => &[][..],
    };
    let number = read_order.to_string();
    let mut out = BytesMut::with_capacity(number.len() + rest.len());
    out.put_slice(number.as_bytes());
    out.put_slice(rest);
    out.freeze()
}
