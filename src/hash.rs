//! Fixed-capacity, linearly probed map from alias names to their expansions.
//!
//! Every occupied bucket stores a single string that encodes both halves of
//! the entry as `<key> '<value>'`. The key is recovered by reading the bucket
//! up to its first space, so keys may not contain spaces.
//!
//! The table never grows. In the default [`DeletionMode::Clear`] mode a
//! removed bucket goes back to empty, exactly like a never-used one. Because
//! [`StringMap::insert`] stops probing at the first empty bucket, removing an
//! entry can leave a later entry with the same key unreachable for insertion:
//! re-inserting that key lands in the cleared slot and the old bucket stays
//! behind as a stale duplicate. [`StringMap::lookup`] skips empty buckets and
//! is not affected. [`DeletionMode::Tombstone`] is an alternative that marks
//! removed buckets instead of clearing them.

use thiserror::Error;

/// Separates the key from the quoted value inside a bucket.
const DELIMITER: char = ' ';

/// What [`StringMap::remove`] leaves behind in the freed bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeletionMode {
    /// The bucket becomes empty again.
    #[default]
    Clear,
    /// The bucket is marked as deleted. Probing continues past it and
    /// insertion may reuse it.
    Tombstone,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Bucket {
    Empty,
    Occupied(String),
    Tombstone,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    /// Every bucket was probed without finding a free or matching one.
    #[error("hash table is full, cannot map {key:?}")]
    Full { key: String },
    /// The key would break the `<key> '<value>'` bucket encoding.
    #[error("invalid key {key:?}: keys must be non-empty and contain no spaces")]
    InvalidKey { key: String },
}

/// Open-addressing string map with linear probing.
#[derive(Debug, Clone)]
pub struct StringMap {
    buckets: Vec<Bucket>,
    mode: DeletionMode,
}

/// Polynomial rolling hash of `key`, reduced modulo `capacity`.
///
/// Accumulates `h = h * 19 + byte` over every byte of the key, wrapping on
/// overflow.
pub fn hash(key: &str, capacity: usize) -> usize {
    let mut h: u32 = 0;
    for &byte in key.as_bytes() {
        h = h.wrapping_mul(19).wrapping_add(u32::from(byte));
    }
    h as usize % capacity.max(1)
}

/// The key part of an encoded bucket: everything before the first space.
fn bucket_key(entry: &str) -> &str {
    entry.split_once(DELIMITER).map_or(entry, |(key, _)| key)
}

/// The value part of an encoded bucket, without the surrounding quotes.
fn bucket_value(entry: &str) -> &str {
    entry
        .split_once(DELIMITER)
        .map(|(_, quoted)| quoted)
        .and_then(|quoted| quoted.strip_prefix('\''))
        .and_then(|quoted| quoted.strip_suffix('\''))
        .unwrap_or("")
}

fn encode(key: &str, value: &str) -> String {
    format!("{key}{DELIMITER}'{value}'")
}

impl StringMap {
    /// Create a map with `capacity` buckets (at least one) that clears buckets
    /// on removal.
    pub fn new(capacity: usize) -> Self {
        Self::with_mode(capacity, DeletionMode::Clear)
    }

    pub fn with_mode(capacity: usize, mode: DeletionMode) -> Self {
        Self {
            buckets: vec![Bucket::Empty; capacity.max(1)],
            mode,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    pub fn mode(&self) -> DeletionMode {
        self.mode
    }

    /// Number of occupied buckets.
    pub fn len(&self) -> usize {
        self.buckets
            .iter()
            .filter(|b| matches!(b, Bucket::Occupied(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw encoded content of bucket `index`, if it is occupied.
    pub fn bucket(&self, index: usize) -> Option<&str> {
        match self.buckets.get(index) {
            Some(Bucket::Occupied(entry)) => Some(entry),
            _ => None,
        }
    }

    /// Bucket indices in probe order for `key`, one full cycle.
    fn probe(&self, key: &str) -> impl Iterator<Item = usize> + use<> {
        let capacity = self.capacity();
        let start = hash(key, capacity);
        (0..capacity).map(move |step| (start + step) % capacity)
    }

    /// Look up the value mapped to `key`.
    pub fn lookup(&self, key: &str) -> Option<&str> {
        log::trace!("hash: lookup {key:?}");
        for index in self.probe(key) {
            if let Bucket::Occupied(entry) = &self.buckets[index] {
                log::trace!("hash: lookup > {entry}");
                if bucket_key(entry) == key {
                    log::trace!("hash: lookup found {key:?} in bucket {index}");
                    return Some(bucket_value(entry));
                }
            }
        }
        log::trace!("hash: lookup found nothing for {key:?}");
        None
    }

    /// Map `key` to `value`, returning the index of the bucket used.
    ///
    /// An existing entry for `key` found before the first empty bucket is
    /// overwritten in place.
    pub fn insert(&mut self, key: &str, value: &str) -> Result<usize, MapError> {
        if key.is_empty() || key.contains(DELIMITER) {
            return Err(MapError::InvalidKey {
                key: key.to_owned(),
            });
        }
        log::trace!("hash: mapping {key:?} to {value:?}");

        let mut reusable = None;
        for index in self.probe(key) {
            match &self.buckets[index] {
                Bucket::Empty => {
                    let index = reusable.unwrap_or(index);
                    return Ok(self.store(index, key, value));
                }
                Bucket::Occupied(entry) if bucket_key(entry) == key => {
                    return Ok(self.store(index, key, value));
                }
                Bucket::Tombstone if reusable.is_none() => reusable = Some(index),
                _ => {}
            }
        }

        match reusable {
            Some(index) => Ok(self.store(index, key, value)),
            None => Err(MapError::Full {
                key: key.to_owned(),
            }),
        }
    }

    fn store(&mut self, index: usize, key: &str, value: &str) -> usize {
        log::trace!("hash: {key:?} mapped to {value:?} in bucket {index}");
        self.buckets[index] = Bucket::Occupied(encode(key, value));
        index
    }

    /// Remove the first entry for `key` along its probe sequence and return
    /// its value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        log::trace!("hash: unmapping {key:?}");
        let index = self.probe(key).find(|&index| {
            matches!(&self.buckets[index], Bucket::Occupied(entry) if bucket_key(entry) == key)
        })?;

        let freed = match self.mode {
            DeletionMode::Clear => Bucket::Empty,
            DeletionMode::Tombstone => Bucket::Tombstone,
        };
        match std::mem::replace(&mut self.buckets[index], freed) {
            Bucket::Occupied(entry) => {
                log::trace!("hash: unmapped {key:?} from bucket {index}");
                Some(bucket_value(&entry).to_owned())
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_hash_is_polynomial_in_19() {
        assert_eq!(hash("a", 1000), 97);
        // 97 * 19 + 98
        assert_eq!(hash("ab", 100_000), 1941);
        assert_eq!(hash("ab", 100), 41);
        assert_eq!(hash("", 7), 0);
    }

    #[test]
    fn test_zero_capacity_is_raised_to_one() {
        let mut map = StringMap::new(0);
        assert_eq!(map.capacity(), 1);
        assert_eq!(map.insert("ll", "ls -la"), Ok(0));
        assert_eq!(map.lookup("ll"), Some("ls -la"));
    }

    #[test]
    fn test_lookup_after_insert() {
        let mut map = StringMap::new(8);
        for (key, value) in [("ll", "ls -la"), ("gs", "git status"), ("la", "ls -A")] {
            map.insert(key, value).unwrap();
            assert_eq!(map.lookup(key), Some(value));
        }
        assert_eq!(map.len(), 3);
        assert_eq!(map.lookup("missing"), None);
    }

    #[test]
    fn test_bucket_encodes_key_and_value() {
        let mut map = StringMap::new(1);
        let index = map.insert("ll", "ls -la").unwrap();
        assert_eq!(map.bucket(index), Some("ll 'ls -la'"));
    }

    #[test]
    fn test_insert_existing_key_overwrites_in_place() {
        let mut map = StringMap::new(4);
        let first = map.insert("ll", "ls -l").unwrap();
        let second = map.insert("ll", "ls -la").unwrap();
        assert_eq!(first, second);
        assert_eq!(map.len(), 1);
        assert_eq!(map.lookup("ll"), Some("ls -la"));
    }

    #[test]
    fn test_colliding_keys_probe_linearly_with_wraparound() {
        // "c" (99) and "g" (103) both hash to bucket 3 of 4.
        let mut map = StringMap::new(4);
        assert_eq!(map.insert("c", "one"), Ok(3));
        assert_eq!(map.insert("g", "two"), Ok(0));
        assert_eq!(map.lookup("c"), Some("one"));
        assert_eq!(map.lookup("g"), Some("two"));
    }

    #[test]
    fn test_insert_into_full_table_fails() {
        let mut map = StringMap::new(2);
        map.insert("a", "1").unwrap();
        map.insert("b", "2").unwrap();
        assert_matches!(map.insert("c", "3"), Err(MapError::Full { key }) if key == "c");
        // Overwriting still works when the table is full.
        assert!(map.insert("a", "one").is_ok());
    }

    #[test]
    fn test_keys_with_spaces_are_rejected() {
        let mut map = StringMap::new(2);
        assert_matches!(map.insert("two words", "x"), Err(MapError::InvalidKey { .. }));
        assert_matches!(map.insert("", "x"), Err(MapError::InvalidKey { .. }));
    }

    #[test]
    fn test_remove_returns_value_and_clears_bucket() {
        let mut map = StringMap::new(4);
        let index = map.insert("ll", "ls -la").unwrap();
        assert_eq!(map.remove("ll").as_deref(), Some("ls -la"));
        assert_eq!(map.bucket(index), None);
        assert_eq!(map.lookup("ll"), None);
        assert_eq!(map.remove("ll"), None);
    }

    #[test]
    fn test_lookup_reaches_past_cleared_bucket() {
        // "a", "e" and "i" all start probing at bucket 1 of 4.
        let mut map = StringMap::new(4);
        assert_eq!(map.insert("a", "first"), Ok(1));
        assert_eq!(map.insert("e", "second"), Ok(2));
        assert_eq!(map.insert("i", "third"), Ok(3));

        map.remove("a");

        assert_eq!(map.lookup("e"), Some("second"));
        assert_eq!(map.lookup("i"), Some("third"));
    }

    #[test]
    fn test_reinsert_across_cleared_bucket_leaves_stale_duplicate() {
        let mut map = StringMap::new(4);
        map.insert("a", "first").unwrap();
        map.insert("e", "old").unwrap();
        map.remove("a");

        // Probing for "e" stops at the cleared bucket 1.
        assert_eq!(map.insert("e", "new"), Ok(1));
        assert_eq!(map.len(), 2);
        assert_eq!(map.bucket(2), Some("e 'old'"));
        assert_eq!(map.lookup("e"), Some("new"));

        // Removing "e" once only drops the first copy.
        map.remove("e");
        assert_eq!(map.lookup("e"), Some("old"));
    }

    #[test]
    fn test_tombstone_mode_overwrites_existing_entry() {
        let mut map = StringMap::with_mode(4, DeletionMode::Tombstone);
        map.insert("a", "first").unwrap();
        map.insert("e", "old").unwrap();
        map.remove("a");

        assert_eq!(map.insert("e", "new"), Ok(2));
        assert_eq!(map.len(), 1);
        assert_eq!(map.lookup("e"), Some("new"));

        // A fresh key reuses the tombstone.
        assert_eq!(map.insert("i", "third"), Ok(1));
    }

    #[test]
    fn test_tombstone_mode_reuses_tombstone_when_otherwise_full() {
        let mut map = StringMap::with_mode(2, DeletionMode::Tombstone);
        map.insert("a", "1").unwrap();
        map.insert("b", "2").unwrap();
        map.remove("a");
        assert!(map.insert("c", "3").is_ok());
        assert_eq!(map.lookup("b"), Some("2"));
        assert_eq!(map.lookup("c"), Some("3"));
    }
}
