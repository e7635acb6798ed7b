//! Embedded, ordered, time-keyed archive store.
//!
//! One `sled` tree per log `type` ("bucket" in the spec's vocabulary). Keys
//! are the 8-byte big-endian `utime` plus a 4-byte big-endian sub-sequence
//! that disambiguates messages sharing a `utime` (see the module-level note
//! on `last_keys` below) while preserving "lexicographic order == chronological
//! order" for the whole 12-byte key.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

use crate::message::Message;

const SEQ_LEN: usize = 4;
const UTIME_LEN: usize = 8;
const KEY_LEN: usize = UTIME_LEN + SEQ_LEN;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("archive storage error: {0}")]
    Storage(#[from] sled::Error),
    #[error("failed to serialize message: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type ArchiveResult<T> = Result<T, ArchiveError>;

fn encode_key(utime: i64, seq: u32) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    key[..UTIME_LEN].copy_from_slice(&utime.to_be_bytes());
    key[UTIME_LEN..].copy_from_slice(&seq.to_be_bytes());
    key
}

fn key_utime(key: &[u8]) -> i64 {
    let mut buf = [0u8; UTIME_LEN];
    buf.copy_from_slice(&key[..UTIME_LEN]);
    i64::from_be_bytes(buf)
}

/// The largest possible key for a given `utime` (all-ones sub-sequence). A
/// range bounded above by this value finds the newest record at or before
/// `utime` in one `next_back()` call, which is this implementation's
/// equivalent of BoltDB's "seek forward, then step back if not exact".
fn upper_bound_for(utime: i64) -> [u8; KEY_LEN] {
    encode_key(utime, u32::MAX)
}

/// Durable, ordered storage of [`Message`]s keyed by `utime`, partitioned by
/// `type`.
#[derive(Clone)]
pub struct Archive {
    db: sled::Db,
    /// Per-type (last utime written, next sub-sequence to use). Guards
    /// against two messages in the same type sharing a `utime` from
    /// colliding in the key space (see SPEC_FULL.md's Open Question
    /// resolution).
    last_keys: Arc<Mutex<HashMap<String, (i64, u32)>>>,
}

impl Archive {
    pub fn open(path: &std::path::Path) -> ArchiveResult<Self> {
        let db = sled::open(path)?;
        Ok(Self {
            db,
            last_keys: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    #[cfg(test)]
    pub fn open_temporary() -> (Self, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let archive = Self::open(dir.path()).unwrap();
        (archive, dir)
    }

    /// Idempotently create the bucket named `msg.type`, insert the record
    /// keyed by `utime`. Duplicate `utime`s within a bucket are disambiguated
    /// by an incrementing sub-sequence rather than overwritten.
    pub fn write(&self, msg: &Message) -> ArchiveResult<()> {
        let tree = self.db.open_tree(msg.r#type.as_bytes())?;

        let seq = {
            let mut last = self.last_keys.lock();
            let entry = last.entry(msg.r#type.clone()).or_insert((msg.utime, 0));
            if entry.0 == msg.utime {
                entry.1 += 1;
            } else {
                *entry = (msg.utime, 0);
            }
            entry.1
        };

        let key = encode_key(msg.utime, seq);
        let value = serde_json::to_vec(msg)?;
        tree.insert(key, value)?;
        Ok(())
    }

    /// Reverse-chronological, filtered, bounded read over a bucket.
    ///
    /// `tag_filter` empty means "any tag"; an empty string inside
    /// `tag_filter` is a wildcard that matches any tag. Returns records in
    /// chronological order (oldest first).
    #[allow(clippy::too_many_arguments)]
    pub fn slice(
        &self,
        type_: &str,
        host: &str,
        tag_filter: &[String],
        start_utime: i64,
        end_utime: i64,
        limit: usize,
        min_priority: u8,
    ) -> ArchiveResult<Vec<Message>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        if !self.db.tree_names().iter().any(|n| n == type_.as_bytes()) {
            return Ok(Vec::new());
        }
        let tree = self.db.open_tree(type_.as_bytes())?;

        let mut cursor = if start_utime == 0 {
            tree.iter().next_back()
        } else {
            tree.range(..=upper_bound_for(start_utime).as_slice()).next_back()
        };

        let mut accepted: Vec<Message> = Vec::new();

        while let Some(entry) = cursor {
            let (key, value) = entry?;
            let utime = key_utime(&key);
            let is_boundary = end_utime != 0 && utime == end_utime;

            let msg: Message = serde_json::from_slice(&value)?;
            if msg.priority >= min_priority
                && (host.is_empty() || msg.id == host)
                && tag_matches(&msg.tag, tag_filter)
            {
                accepted.push(msg);
            }

            if is_boundary || accepted.len() >= limit {
                break;
            }

            cursor = tree.range(..key).next_back();
        }

        accepted.reverse();
        Ok(accepted)
    }

    /// Delete every key strictly older than `cutoff` (age retention rule).
    /// Scans the bucket from oldest forward and stops at the first key at
    /// or past `cutoff`, since keys are monotonic. A missing bucket is a
    /// no-op. Returns the number of deleted records.
    pub fn reap_older_than(&self, type_: &str, cutoff: i64) -> u64 {
        let Ok(tree) = self.db.open_tree(type_.as_bytes()) else {
            return 0;
        };
        let mut deleted = 0u64;
        for entry in tree.iter() {
            let Ok((key, _)) = entry else { break };
            if key_utime(&key) >= cutoff {
                break;
            }
            if tree.remove(&key).is_ok() {
                deleted += 1;
            }
        }
        deleted
    }

    /// Delete every record beyond the newest `limit` (count retention rule).
    /// Scans from newest backward, counting retained records; once the
    /// count exceeds `limit`, every subsequent (older) record is deleted.
    pub fn reap_over_count(&self, type_: &str, limit: u64) -> u64 {
        let Ok(tree) = self.db.open_tree(type_.as_bytes()) else {
            return 0;
        };
        let mut retained = 0u64;
        let mut deleted = 0u64;
        for entry in tree.iter().rev() {
            let Ok((key, _)) = entry else { break };
            retained += 1;
            if retained > limit && tree.remove(&key).is_ok() {
                deleted += 1;
            }
        }
        deleted
    }
}

fn tag_matches(tags: &[String], filter: &[String]) -> bool {
    if filter.is_empty() {
        return true;
    }
    filter.iter().any(|f| f.is_empty() || tags.iter().any(|t| t == f))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn msg(utime: i64, id: &str, tag: &[&str], type_: &str, priority: u8, content: &str) -> Message {
        Message {
            time: Utc::now(),
            utime,
            id: id.to_string(),
            tag: tag.iter().map(|s| s.to_string()).collect(),
            r#type: type_.to_string(),
            priority,
            content: content.to_string(),
            raw: None,
        }
    }

    #[test]
    fn write_then_slice_exact_window_returns_single_message() {
        let (archive, _dir) = Archive::open_temporary();
        let m = msg(100, "host-a", &["web"], "app", 2, "hello");
        archive.write(&m).unwrap();

        let got = archive
            .slice("app", &m.id, &m.tag, m.utime, m.utime, 1, 0)
            .unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].content, "hello");
    }

    #[test]
    fn slice_returns_newest_n_in_chronological_order() {
        let (archive, _dir) = Archive::open_temporary();
        for i in 1..=5i64 {
            archive
                .write(&msg(i, "h", &[], "app", 0, &format!("m{i}")))
                .unwrap();
        }

        let got = archive.slice("app", "", &[], 0, 0, 3, 0).unwrap();
        let contents: Vec<_> = got.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m3", "m4", "m5"]);
    }

    #[test]
    fn absent_bucket_returns_empty_not_error() {
        let (archive, _dir) = Archive::open_temporary();
        let got = archive.slice("missing", "", &[], 0, 0, 10, 0).unwrap();
        assert!(got.is_empty());
    }

    #[test]
    fn host_and_tag_and_priority_filters_apply() {
        let (archive, _dir) = Archive::open_temporary();
        archive.write(&msg(1, "a", &["web"], "app", 1, "a1")).unwrap();
        archive.write(&msg(2, "b", &["db"], "app", 4, "b1")).unwrap();
        archive.write(&msg(3, "a", &["db"], "app", 4, "a2")).unwrap();

        let got = archive.slice("app", "a", &[], 0, 0, 10, 0).unwrap();
        assert_eq!(got.len(), 2);

        let got = archive.slice("app", "", &["db".to_string()], 0, 0, 10, 0).unwrap();
        assert_eq!(got.len(), 2);

        let got = archive.slice("app", "", &[], 0, 0, 10, 4).unwrap();
        assert_eq!(got.len(), 2);
    }

    #[test]
    fn duplicate_utime_is_disambiguated_not_overwritten() {
        let (archive, _dir) = Archive::open_temporary();
        archive.write(&msg(7, "a", &[], "app", 0, "first")).unwrap();
        archive.write(&msg(7, "a", &[], "app", 0, "second")).unwrap();

        let got = archive.slice("app", "", &[], 0, 0, 10, 0).unwrap();
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].content, "first");
        assert_eq!(got[1].content, "second");
    }

    #[test]
    fn legacy_tag_shape_is_upgraded_when_reading_back() {
        let (archive, dir) = Archive::open_temporary();
        let tree = archive.db.open_tree("app").unwrap();
        let key = encode_key(42, 0);
        let legacy_json = br#"{"time":"2024-01-01T00:00:00Z","utime":42,"id":"h","tag":"solo","type":"app","priority":2,"message":"hi"}"#;
        tree.insert(key, legacy_json.to_vec()).unwrap();
        drop(tree);

        let got = archive.slice("app", "", &[], 0, 0, 10, 0).unwrap();
        assert_eq!(got[0].tag, vec!["solo".to_string()]);
        drop(dir);
    }
}
