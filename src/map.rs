//! Static lookup table with single-probe reads.

use std::borrow::Borrow;

use dyn_size_of::GetSize;
use rayon::prelude::*;

use crate::hash::{BuildFnv1a, BuildKeyHash};
use crate::search::{self, BuildConf, PerfectModulus, SearchExhausted};
use crate::stats::SearchStatsCollector;

/// Static lookup table for a fixed set of keys, built over a perfect modulus.
///
/// The table is read-only after construction. [`Map::get`] computes one hash,
/// one modulus reduction and one key comparison; there is no chaining and no
/// probing sequence. Concurrent lookups from multiple threads need no
/// synchronization, since no call mutates shared state.
pub struct Map<K, V, S = BuildFnv1a> {
    slots: Box<[Option<(K, V)>]>,
    hash_builder: S,
}

impl<K, V, S> Map<K, V, S> {
    /// Returns the table size, i.e. the divisor that reduces a hash code to a slot index.
    ///
    /// At least the number of entries the table was built from, but usually larger;
    /// the construction finds some collision-free size, not the smallest one.
    #[inline] pub fn modulus(&self) -> usize { self.slots.len() }

    /// Returns the number of entries stored in the table.
    ///
    /// The time complexity is proportional to [`modulus`](Map::modulus).
    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    /// Returns whether the table stores no entries.
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// Returns an iterator over the stored entries, in slot order.
    pub fn entries(&self) -> impl Iterator<Item = &(K, V)> {
        self.slots.iter().flatten()
    }

    /// Returns the hash function the table was built with.
    #[inline] pub fn hasher(&self) -> &S { &self.hash_builder }

    /// Gets the value associated with the given `key`.
    ///
    /// Exactly one slot is inspected. [`None`] is returned if the slot is
    /// empty or its stored key differs from `key`; the latter happens when a
    /// key outside the set the table was built from collides with a stored
    /// one, and the key comparison (not the hash) is what rules the false
    /// positive out. A miss is routine control flow, not a failure.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
        where K: Borrow<Q>, Q: Eq + ?Sized, S: BuildKeyHash<Q>
    {
        let slot = self.hash_builder.hash_key(key) as usize % self.slots.len();
        let (stored_key, value) = self.slots[slot].as_ref()?;
        (stored_key.borrow() == key).then_some(value)
    }
}

impl<K, V, S: BuildKeyHash<K>> Map<K, V, S> {
    /// Builds the table by placing each of `entries` at the slot its key
    /// hashes to under the certified `modulus`.
    ///
    /// Entries are placed in input order with unconditional overwrite, which
    /// is safe because `modulus` certifies that no two of the hashed keys
    /// share a slot. The certificate is not tied to `entries` by the type
    /// system though: passing a [`PerfectModulus`] obtained for a *different*
    /// key set (or with duplicate keys among `entries`) silently loses all
    /// but the last entry placed at a colliding slot. Obtaining the modulus
    /// from the same entries, as [`Map::try_with_conf`] does, is the caller's
    /// obligation.
    pub fn with_modulus(entries: Vec<(K, V)>, hash_builder: S, modulus: PerfectModulus) -> Self {
        let mut slots: Vec<Option<(K, V)>> = (0..modulus.as_usize()).map(|_| None).collect();
        for (key, value) in entries {
            let slot = hash_builder.hash_key(&key) as usize % slots.len();
            slots[slot] = Some((key, value));
        }
        Self { slots: slots.into_boxed_slice(), hash_builder }
    }
}

impl<K, V, S> Map<K, V, S>
    where K: Sync, V: Sync, S: BuildKeyHash<K> + Sync
{
    /// Constructs [`Map`] for the given `entries`, using the build
    /// configuration `conf` and reporting search statistics to `stats`.
    ///
    /// Searches for a collision-free modulus first and builds the slot array
    /// only on success. If the search exhausts its attempt budget, no table
    /// is produced; this almost certainly means `entries` contains duplicate
    /// keys or keys indistinguishable by the hash function used.
    pub fn try_with_conf_stats<C: SearchStatsCollector>(entries: Vec<(K, V)>, conf: BuildConf<S>, stats: &mut C)
        -> Result<Self, SearchExhausted>
    {
        let codes: Vec<u32> = if conf.use_multiple_threads && rayon::current_num_threads() > 1 {
            entries.par_iter().map(|(key, _)| conf.hash_builder.hash_key(key)).collect()
        } else {
            entries.iter().map(|(key, _)| conf.hash_builder.hash_key(key)).collect()
        };
        let modulus = search::modulus_for_codes_conf(&codes, conf.attempt_limit, conf.use_multiple_threads, stats)?;
        Ok(Self::with_modulus(entries, conf.hash_builder, modulus))
    }

    /// Constructs [`Map`] for the given `entries`, using the build configuration `conf`.
    #[inline]
    pub fn try_with_conf(entries: Vec<(K, V)>, conf: BuildConf<S>) -> Result<Self, SearchExhausted> {
        Self::try_with_conf_stats(entries, conf, &mut ())
    }

    /// Constructs [`Map`] for the given `entries`, using the build
    /// configuration `conf` and reporting search statistics to `stats`.
    ///
    /// Panics if the modulus search fails. Then it is almost certain that
    /// `entries` contains duplicate keys.
    pub fn with_conf_stats<C: SearchStatsCollector>(entries: Vec<(K, V)>, conf: BuildConf<S>, stats: &mut C) -> Self {
        Self::try_with_conf_stats(entries, conf, stats)
            .expect("Constructing phtable::Map failed. Probably the input contains duplicate keys.")
    }

    /// Constructs [`Map`] for the given `entries`, using the build configuration `conf`.
    ///
    /// Panics if the modulus search fails. Then it is almost certain that
    /// `entries` contains duplicate keys.
    #[inline]
    pub fn with_conf(entries: Vec<(K, V)>, conf: BuildConf<S>) -> Self {
        Self::with_conf_stats(entries, conf, &mut ())
    }
}

impl<K, V> Map<K, V>
    where K: AsRef<[u8]> + Sync, V: Sync
{
    /// Constructs [`Map`] for the given `entries`, hashing keys with FNV-1a.
    ///
    /// Panics if the modulus search fails. Then it is almost certain that
    /// `entries` contains duplicate keys.
    pub fn new(entries: Vec<(K, V)>) -> Self {
        Self::with_conf(entries, Default::default())
    }
}

impl<K, V> From<Vec<(K, V)>> for Map<K, V>
    where K: AsRef<[u8]> + Sync, V: Sync
{
    fn from(entries: Vec<(K, V)>) -> Self {
        Self::new(entries)
    }
}

impl<K: GetSize, V: GetSize, S> GetSize for Map<K, V, S> {
    fn size_bytes_dyn(&self) -> usize {
        std::mem::size_of::<Option<(K, V)>>() * self.slots.len()
            + self.slots.iter().flatten()
                .map(|(k, v)| k.size_bytes_dyn() + v.size_bytes_dyn()).sum::<usize>()
    }
    fn size_bytes_content_dyn(&self) -> usize {
        std::mem::size_of::<Option<(K, V)>>() * self.slots.len()
            + self.slots.iter().flatten()
                .map(|(k, v)| k.size_bytes_content_dyn() + v.size_bytes_content_dyn()).sum::<usize>()
    }
    const USES_DYN_MEM: bool = true;
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitm::{BitAccess, BitVec};

    /// Asserts that `keys` hashed with `hasher` occupy pairwise distinct slots modulo `modulus`.
    fn assert_collision_free<K, S: BuildKeyHash<K>>(keys: &[K], hasher: &S, modulus: usize) {
        let mut seen = Box::<[u64]>::with_zeroed_bits(modulus);
        for key in keys {
            let slot = hasher.hash_key(key) as usize % modulus;
            assert!(!seen.get_bit(slot), "two keys share slot {}", slot);
            seen.set_bit(slot);
        }
    }

    fn empty_handler() -> &'static str { "" }
    fn settings_handler() -> &'static str { "settings!!" }

    type Handler = fn() -> &'static str;

    fn urls() -> Vec<(&'static str, Handler)> {
        vec![
            ("/login", empty_handler as Handler),
            ("/profile", empty_handler),
            ("/feed", empty_handler),
            ("/notification", empty_handler),
            ("/settings", settings_handler),
            ("/videos", empty_handler),
            ("/notes", empty_handler),
            ("/logout", empty_handler),
            ("/messenger", empty_handler),
            ("/stories", empty_handler),
        ]
    }

    #[test]
    fn route_table() {
        let urls = urls();
        let map = Map::with_conf(urls.clone(), BuildConf::mt(false));
        assert!(map.modulus() >= urls.len());
        assert_eq!(map.len(), urls.len());
        let keys: Vec<&str> = urls.iter().map(|(k, _)| *k).collect();
        assert_collision_free(&keys, map.hasher(), map.modulus());
        for (key, handler) in &urls {
            assert_eq!(map.get(key), Some(handler));
        }
        assert_eq!((map.get("/settings").unwrap())(), "settings!!");
        assert_eq!((map.get("/login").unwrap())(), "");
        assert_eq!(map.get("/unknown"), None);
        assert_eq!(map.get("hello"), None);
    }

    #[test]
    fn miss_on_absent_keys() {
        let entries: Vec<(String, usize)> = (0..64).map(|i| (format!("entry-{}", i), i)).collect();
        let map = Map::new(entries.clone());
        for (key, value) in &entries {
            assert_eq!(map.get(key.as_str()), Some(value));
        }
        // probe many absent keys; some of them land on occupied slots and
        // must be rejected by the key comparison
        for i in 0..1000 {
            let absent = format!("absent-{}", i);
            assert!(entries.iter().all(|(key, _)| *key != absent));
            assert_eq!(map.get(absent.as_str()), None);
        }
    }

    #[test]
    fn empty_and_singleton() {
        let empty = Map::new(Vec::<(&str, u32)>::new());
        assert_eq!(empty.modulus(), 1);
        assert_eq!(empty.len(), 0);
        assert!(empty.is_empty());
        assert_eq!(empty.get("anything"), None);

        let single = Map::new(vec![("alone", 7u32)]);
        assert!(single.modulus() >= 1);
        assert_eq!(single.len(), 1);
        assert!(!single.is_empty());
        assert_eq!(single.get("alone"), Some(&7));
        assert_eq!(single.get("other"), None);
    }

    #[test]
    fn entries_iterates_everything() {
        let map = Map::new(vec![("a", 1), ("b", 2), ("c", 3)]);
        let mut stored: Vec<(&str, i32)> = map.entries().copied().collect();
        stored.sort();
        assert_eq!(stored, vec![("a", 1), ("b", 2), ("c", 3)]);
    }

    #[test]
    fn slot_of_every_entry_matches_its_key() {
        let map = Map::new((0..100u32).map(|i| (i.to_string(), i)).collect::<Vec<_>>());
        for (slot, entry) in map.slots.iter().enumerate() {
            if let Some((key, _)) = entry {
                assert_eq!(map.hasher().hash_key(key.as_str()) as usize % map.modulus(), slot);
            }
        }
    }

    #[test]
    fn build_via_explicit_modulus() {
        let urls = urls();
        let keys: Vec<&str> = urls.iter().map(|(k, _)| *k).collect();
        let conf = BuildConf::mt(false);
        let modulus = search::modulus(&keys, &conf).unwrap();
        let map = Map::with_modulus(urls.clone(), conf.hash_builder, modulus);
        assert_eq!(map.modulus(), modulus.as_usize());
        for (key, handler) in &urls {
            assert_eq!(map.get(key), Some(handler));
        }
    }

    #[test]
    fn duplicate_keys_fail_the_search() {
        assert!(Map::try_with_conf(vec![("a", 1), ("a", 2)], BuildConf::limit(50)).is_err());
        assert!(Map::try_with_conf(vec![("a", 1), ("b", 2), ("a", 3)], BuildConf::limit(50)).is_err());
    }

    #[test]
    fn reported_size_covers_the_slot_array() {
        let map: Map<Vec<u8>, u32> = Map::new(
            (0..10u8).map(|i| (vec![i], i as u32)).collect());
        assert!(map.size_bytes_dyn()
            >= std::mem::size_of::<Option<(Vec<u8>, u32)>>() * map.modulus());
        assert!(map.size_bytes() > map.size_bytes_dyn());
    }
}
