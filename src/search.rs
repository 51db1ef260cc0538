//! Search for a table size under which a key set hashes without collision.

use std::fmt;

use rayon::prelude::*;

use crate::hash::{BuildFnv1a, BuildKeyHash};
use crate::sort::merge_sort;
use crate::stats::SearchStatsCollector;

/// Default number of candidate moduli probed before the search gives up.
pub const DEFAULT_ATTEMPT_LIMIT: u32 = 2000;

/// Distance between the key counts that successive attempts scale into candidate moduli.
const CANDIDATE_STEP: usize = 3;

/// Build configuration accepted by the search functions and by [`Map`](crate::Map) constructors.
///
/// See field descriptions for details.
#[derive(Clone)]
pub struct BuildConf<S = BuildFnv1a> {
    /// The hash function used both to choose the table size and to place and
    /// look up entries. (default: [`BuildFnv1a`])
    pub hash_builder: S,

    /// Number of candidate moduli probed before the search reports
    /// [`SearchExhausted`]. (default: [`DEFAULT_ATTEMPT_LIMIT`])
    pub attempt_limit: u32,

    /// Whether to hash keys and probe candidates using the default [rayon]
    /// thread pool. (default: `true`)
    ///
    /// The search result never depends on this flag; the multi-threaded path
    /// still returns the first successful candidate in attempt order.
    pub use_multiple_threads: bool,
}

impl Default for BuildConf {
    fn default() -> Self {
        Self {
            hash_builder: BuildFnv1a,
            attempt_limit: DEFAULT_ATTEMPT_LIMIT,
            use_multiple_threads: true,
        }
    }
}

impl BuildConf {
    /// Returns configuration that potentially uses
    /// [multiple threads](BuildConf::use_multiple_threads) during construction.
    pub fn mt(use_multiple_threads: bool) -> Self {
        Self { use_multiple_threads, ..Default::default() }
    }

    /// Returns configuration with a custom [`attempt_limit`](BuildConf::attempt_limit).
    pub fn limit(attempt_limit: u32) -> Self {
        Self { attempt_limit, ..Default::default() }
    }
}

impl<S> BuildConf<S> {
    /// Returns configuration that uses custom [`hash_builder`](BuildConf::hash_builder).
    pub fn hash(hash_builder: S) -> Self {
        Self { hash_builder, attempt_limit: DEFAULT_ATTEMPT_LIMIT, use_multiple_threads: true }
    }

    /// Returns configuration that uses custom [`hash_builder`](BuildConf::hash_builder)
    /// and [`attempt_limit`](BuildConf::attempt_limit).
    pub fn hash_limit(hash_builder: S, attempt_limit: u32) -> Self {
        Self { attempt_limit, ..Self::hash(hash_builder) }
    }

    /// Returns configuration that uses custom [`hash_builder`](BuildConf::hash_builder),
    /// [`attempt_limit`](BuildConf::attempt_limit) and potentially
    /// [multiple threads](BuildConf::use_multiple_threads) during construction.
    pub fn hash_limit_mt(hash_builder: S, attempt_limit: u32, use_multiple_threads: bool) -> Self {
        Self { hash_builder, attempt_limit, use_multiple_threads }
    }
}

/// A table size certified to be collision-free for some key set.
///
/// Values of this type are produced only by the search functions of this
/// module, which makes "the modulus comes from a successful search" a
/// type-level guarantee for [`Map::with_modulus`](crate::Map::with_modulus).
/// The certificate is tied to the key set and hash function it was obtained
/// for; pairing it with a different key set is not detectable and silently
/// loses entries during placement.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct PerfectModulus(usize);

impl PerfectModulus {
    /// Returns the table size as a plain integer.
    #[inline] pub fn as_usize(self) -> usize { self.0 }
}

impl fmt::Display for PerfectModulus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { self.0.fmt(f) }
}

/// Error returned when no probed candidate modulus was collision-free.
///
/// Table construction cannot proceed. This almost certainly means the input
/// contains duplicate keys (which collide under every modulus) or the hash
/// function distributes the key set pathologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("no collision-free modulus for {keys_len} keys found within {attempts} attempts")]
pub struct SearchExhausted {
    /// Number of keys the search was performed for.
    pub keys_len: usize,
    /// Number of candidate moduli probed.
    pub attempts: u32,
}

/// Returns whether the elements of `hash_codes` are pairwise distinct modulo `modulus`.
///
/// The reduced codes are sorted with [`merge_sort`] and scanned for an equal
/// adjacent pair, which costs *O(n log n)* per probe. Zero or one code never
/// collides. `modulus` must be nonzero.
pub fn is_collision_free(hash_codes: &[u32], modulus: usize) -> bool {
    let reduced: Vec<u32> = hash_codes.iter().map(|code| (*code as usize % modulus) as u32).collect();
    merge_sort(&reduced).windows(2).all(|pair| pair[0] != pair[1])
}

/// Returns the candidate modulus probed by the attempt with the given number
/// for a set of `keys_len` keys.
///
/// Candidates are key counts inflated by Euler's number, which decorrelates
/// them from small-integer patterns in typical hash outputs while growing
/// roughly linearly with the attempt number. The result is at least 1, so
/// even an empty key set gets a valid (positive) table size.
#[inline]
pub fn candidate(keys_len: usize, attempt: u32) -> usize {
    (((keys_len + attempt as usize * CANDIDATE_STEP) as f64 * std::f64::consts::E) as usize).max(1)
}

/// Searches for a collision-free modulus for the given `hash_codes`,
/// probing the candidates of attempts `0..attempt_limit` in order.
///
/// The first successful candidate wins; no attempt is made to shrink it
/// further. Each attempt is reported to `stats`. The search is deterministic:
/// equal inputs always produce an equal result.
pub fn modulus_for_codes_with_stats<C: SearchStatsCollector>(
    hash_codes: &[u32], attempt_limit: u32, stats: &mut C
) -> Result<PerfectModulus, SearchExhausted> {
    for attempt in 0..attempt_limit {
        let modulus = candidate(hash_codes.len(), attempt);
        stats.attempt(attempt, modulus);
        if is_collision_free(hash_codes, modulus) {
            stats.end(Some(modulus));
            return Ok(PerfectModulus(modulus));
        }
    }
    stats.end(None);
    Err(SearchExhausted { keys_len: hash_codes.len(), attempts: attempt_limit })
}

/// Searches for a collision-free modulus for the given `hash_codes`
/// using multiple threads.
///
/// Returns exactly what the sequential search returns: `find_first` keeps
/// the attempt order, so the earliest successful candidate wins even when a
/// later one is probed sooner.
fn modulus_for_codes_mt(hash_codes: &[u32], attempt_limit: u32) -> Result<PerfectModulus, SearchExhausted> {
    (0..attempt_limit).into_par_iter()
        .find_first(|attempt| is_collision_free(hash_codes, candidate(hash_codes.len(), *attempt)))
        .map(|attempt| PerfectModulus(candidate(hash_codes.len(), attempt)))
        .ok_or(SearchExhausted { keys_len: hash_codes.len(), attempts: attempt_limit })
}

pub(crate) fn modulus_for_codes_conf<C: SearchStatsCollector>(
    hash_codes: &[u32], attempt_limit: u32, use_multiple_threads: bool, stats: &mut C
) -> Result<PerfectModulus, SearchExhausted> {
    if use_multiple_threads && rayon::current_num_threads() > 1 {
        let result = modulus_for_codes_mt(hash_codes, attempt_limit);
        stats.end(result.ok().map(PerfectModulus::as_usize));
        result
    } else {
        modulus_for_codes_with_stats(hash_codes, attempt_limit, stats)
    }
}

pub(crate) fn hash_codes<K, S>(keys: &[K], hash_builder: &S, use_multiple_threads: bool) -> Vec<u32>
    where K: Sync, S: BuildKeyHash<K> + Sync
{
    if use_multiple_threads && rayon::current_num_threads() > 1 {
        keys.par_iter().map(|key| hash_builder.hash_key(key)).collect()
    } else {
        keys.iter().map(|key| hash_builder.hash_key(key)).collect()
    }
}

/// Searches for a modulus under which `keys`, hashed with the
/// [`hash_builder`](BuildConf::hash_builder) of `conf`, occupy pairwise
/// distinct slots. Reports statistics to `stats`.
///
/// For a fixed key set and configuration the result is always the same,
/// which keeps table layouts reproducible across rebuilds.
pub fn modulus_with_stats<K, S, C>(keys: &[K], conf: &BuildConf<S>, stats: &mut C) -> Result<PerfectModulus, SearchExhausted>
    where K: Sync, S: BuildKeyHash<K> + Sync, C: SearchStatsCollector
{
    let codes = hash_codes(keys, &conf.hash_builder, conf.use_multiple_threads);
    modulus_for_codes_conf(&codes, conf.attempt_limit, conf.use_multiple_threads, stats)
}

/// Searches for a modulus under which `keys`, hashed with the
/// [`hash_builder`](BuildConf::hash_builder) of `conf`, occupy pairwise
/// distinct slots.
#[inline]
pub fn modulus<K, S>(keys: &[K], conf: &BuildConf<S>) -> Result<PerfectModulus, SearchExhausted>
    where K: Sync, S: BuildKeyHash<K> + Sync
{
    modulus_with_stats(keys, conf, &mut ())
}
