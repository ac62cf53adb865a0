//! Monotonic identifier sequences used to mint collision-free relationship,
//! footnote, and revision ids.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use anyhow::anyhow;

/// A strictly increasing counter rendered through a template.
///
/// The template uses `{}` for the numeric position (default: the bare
/// number). Values are never reused by one instance; the counter is atomic so
/// a sequence shared across threads still issues unique values. Wraparound of
/// the underlying u64 is not checked.
pub struct Sequence {
    next: AtomicU64,
    template: String,
}

impl Sequence {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(start: u64) -> Self {
        Self {
            next: AtomicU64::new(start),
            template: "{}".to_string(),
        }
    }

    pub fn with_template(start: u64, template: impl Into<String>) -> Self {
        Self {
            next: AtomicU64::new(start),
            template: template.into(),
        }
    }

    /// Shorthand for the canonical relationship-id shape (`rId1`, `rId2`, ...).
    pub fn relationship_ids(start: u64) -> Self {
        Self::with_template(start, "rId{}")
    }

    pub fn next_value(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::SeqCst);
        self.render(n)
    }

    fn render(&self, n: u64) -> String {
        self.template.replacen("{}", &n.to_string(), 1)
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Self::new()
    }
}

/// A [`Sequence`] that can additionally bind issued values to string keys.
pub struct MappingSequence {
    seq: Sequence,
    map: Mutex<HashMap<String, String>>,
}

impl MappingSequence {
    pub fn new(seq: Sequence) -> Self {
        Self {
            seq,
            map: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the value previously assigned to `key`, minting one on first
    /// use. Idempotent per key.
    pub fn get_or_next_value(&self, key: &str) -> String {
        let mut map = self.map.lock().expect("mapping sequence lock");
        if let Some(v) = map.get(key) {
            return v.clone();
        }
        let v = self.seq.next_value();
        map.insert(key.to_string(), v.clone());
        v
    }

    /// Always mints a new value and (re)binds it to `key`, overwriting any
    /// previous binding. Callers must not rely on idempotence here.
    pub fn next_value_for(&self, key: &str) -> String {
        let v = self.seq.next_value();
        self.map
            .lock()
            .expect("mapping sequence lock")
            .insert(key.to_string(), v.clone());
        v
    }

    /// Looks up the value bound to `key`; an unmapped key is a caller bug and
    /// surfaces as an error rather than a silent default.
    pub fn value(&self, key: &str) -> anyhow::Result<String> {
        self.map
            .lock()
            .expect("mapping sequence lock")
            .get(key)
            .cloned()
            .ok_or_else(|| anyhow!("no value assigned for key: {key}"))
    }
}
