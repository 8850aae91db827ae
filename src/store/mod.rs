//! The shared, in-memory keyspace: values, expiry, and the notification
//! mechanism that wakes blocked `XREAD` callers.

pub mod radix;
pub mod stream;
pub mod value;

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::Notify;

pub use value::Value;

use crate::persist::aof::AofWriter;
use crate::util::now_ms;

/// One key's value plus an optional absolute expiry deadline, in
/// milliseconds since the Unix epoch.
struct Entry {
    value: Value,
    expires_at: Option<u64>,
}

/// The keyspace plus expiry table. A single coarse lock: nearly every
/// command, reads included (lazy expiry may delete), needs write
/// access, so a plain mutex is the honest lock type rather than an
/// `RwLock` that would need upgrading on the common path.
#[derive(Default)]
pub struct Keyspace {
    map: HashMap<Bytes, Entry>,
}

impl Keyspace {
    /// Removes `key` if its deadline has passed, returning whether it
    /// is now (or already was) absent.
    fn expire_if_due(&mut self, key: &[u8], now: u64) -> bool {
        let Some(entry) = self.map.get(key) else { return true };
        match entry.expires_at {
            Some(deadline) if deadline <= now => {
                self.map.remove(key);
                true
            }
            _ => false,
        }
    }

    pub fn get(&mut self, key: &[u8]) -> Option<&Value> {
        let now = now_ms();
        if self.expire_if_due(key, now) {
            return None;
        }
        self.map.get(key).map(|e| &e.value)
    }

    pub fn get_mut(&mut self, key: &[u8]) -> Option<&mut Value> {
        let now = now_ms();
        if self.expire_if_due(key, now) {
            return None;
        }
        self.map.get_mut(key).map(|e| &mut e.value)
    }

    /// Returns the entry for `key`, inserting `default()` if absent or
    /// expired. Used by mutating commands (`LPUSH`, `SADD`, ...) that
    /// operate on an implicit empty container.
    pub fn get_or_insert_with(&mut self, key: &Bytes, default: impl FnOnce() -> Value) -> &mut Value {
        let now = now_ms();
        self.expire_if_due(key, now);
        &mut self
            .map
            .entry(key.clone())
            .or_insert_with(|| Entry { value: default(), expires_at: None })
            .value
    }

    pub fn set(&mut self, key: Bytes, value: Value, expires_at: Option<u64>) {
        self.map.insert(key, Entry { value, expires_at });
    }

    /// Removes `key` unconditionally. Returns whether it was present
    /// (and not already expired).
    pub fn remove(&mut self, key: &[u8]) -> bool {
        let now = now_ms();
        if self.expire_if_due(key, now) {
            return false;
        }
        self.map.remove(key).is_some()
    }

    pub fn exists(&mut self, key: &[u8]) -> bool {
        let now = now_ms();
        !self.expire_if_due(key, now) && self.map.contains_key(key)
    }

    pub fn set_expiry(&mut self, key: &[u8], expires_at: Option<u64>) -> bool {
        let now = now_ms();
        if self.expire_if_due(key, now) {
            return false;
        }
        match self.map.get_mut(key) {
            Some(e) => {
                e.expires_at = expires_at;
                true
            }
            None => false,
        }
    }

    /// All live (non-expired) keys. Sweeps expired entries as a side
    /// effect, same as any other read path.
    pub fn keys(&mut self) -> Vec<Bytes> {
        let now = now_ms();
        let expired: Vec<Bytes> =
            self.map.iter().filter(|(_, e)| matches!(e.expires_at, Some(d) if d <= now)).map(|(k, _)| k.clone()).collect();
        for k in expired {
            self.map.remove(&k);
        }
        self.map.keys().cloned().collect()
    }

    /// Iterates live keys and values without mutating, for snapshotting.
    /// Does not perform lazy expiry; `SAVE` accepts a best-effort view.
    pub fn iter_for_snapshot(&self) -> impl Iterator<Item = (&Bytes, &Value)> {
        let now = now_ms();
        self.map.iter().filter(move |(_, e)| !matches!(e.expires_at, Some(d) if d <= now)).map(|(k, e)| (k, &e.value))
    }
}

/// Where `SAVE` writes its RDB snapshot.
#[derive(Clone)]
pub struct RdbPath {
    pub dir: std::path::PathBuf,
    pub dbfilename: String,
}

impl RdbPath {
    pub fn full_path(&self) -> std::path::PathBuf {
        self.dir.join(&self.dbfilename)
    }
}

/// Shared server state: the keyspace, a wakeup signal for blocked
/// `XREAD` callers, and the append-only log writer.
pub struct Shared {
    pub keyspace: Mutex<Keyspace>,
    pub notify: Notify,
    pub aof: Mutex<Option<AofWriter>>,
    pub rdb_path: RdbPath,
}

/// A cheaply-cloneable handle to the shared server state, passed to
/// every connection task and dispatcher call.
#[derive(Clone)]
pub struct Corestore(pub Arc<Shared>);

impl Corestore {
    pub fn new(aof: Option<AofWriter>) -> Self {
        Self::with_rdb_path(aof, RdbPath { dir: std::env::temp_dir(), dbfilename: "redis.rdb".to_string() })
    }

    pub fn with_rdb_path(aof: Option<AofWriter>, rdb_path: RdbPath) -> Self {
        Corestore(Arc::new(Shared {
            keyspace: Mutex::new(Keyspace::default()),
            notify: Notify::new(),
            aof: Mutex::new(aof),
            rdb_path,
        }))
    }

    /// Wakes any task blocked in `XREAD ... BLOCK`. Called after every
    /// mutation that appends to a stream.
    pub fn notify_writers(&self) {
        self.0.notify.notify_waiters();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expired_key_reads_as_absent_and_is_removed() {
        let mut ks = Keyspace::default();
        ks.set(Bytes::from_static(b"k"), Value::Str(Bytes::from_static(b"v")), Some(1));
        assert!(ks.get(b"k").is_none());
        assert!(!ks.exists(b"k"));
    }

    #[test]
    fn unexpired_key_reads_back() {
        let mut ks = Keyspace::default();
        ks.set(Bytes::from_static(b"k"), Value::Str(Bytes::from_static(b"v")), None);
        assert!(ks.get(b"k").is_some());
    }

    #[test]
    fn get_or_insert_with_creates_default_once() {
        let mut ks = Keyspace::default();
        let key = Bytes::from_static(b"l");
        ks.get_or_insert_with(&key, || Value::List(Vec::new()));
        if let Value::List(l) = ks.get_mut(b"l").unwrap() {
            l.push(Bytes::from_static(b"x"));
        }
        assert_eq!(ks.get(b"l").unwrap().as_list().unwrap(), &vec![Bytes::from_static(b"x")]);
    }
}
