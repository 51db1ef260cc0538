//! 32-bit key hashing, with FNV-1 and FNV-1a as interchangeable strategies.

/// FNV offset basis.
const OFFSET: u32 = 0x811C9DC5;

/// FNV prime.
const PRIME: u32 = 0x01000193;

/// Calculates the FNV-1 hash of `bytes` (multiply first, xor second).
#[inline]
pub fn fnv1(bytes: &[u8]) -> u32 {
    bytes.iter().fold(OFFSET, |state, byte| {
        (*byte as u32).wrapping_mul(PRIME) ^ state
    })
}

/// Calculates the FNV-1a hash of `bytes` (xor first, multiply second).
#[inline]
pub fn fnv1a(bytes: &[u8]) -> u32 {
    bytes.iter().fold(OFFSET, |state, byte| {
        (*byte as u32 ^ state).wrapping_mul(PRIME)
    })
}

/// A 32-bit hash function over keys of type `K`.
///
/// Implementations must be pure and deterministic: the same key always
/// yields the same code, with no observable side effects. The whole
/// perfect-hash construction relies on this; an impure implementation makes
/// the modulus found during the search meaningless at lookup time.
pub trait BuildKeyHash<K: ?Sized> {
    /// Calculates the 32-bit hash of `key`.
    fn hash_key(&self, key: &K) -> u32;
}

/// [`BuildKeyHash`] that calculates the [FNV-1](fnv1) hash
/// of the byte representation of the key.
#[derive(Default, Copy, Clone)]
pub struct BuildFnv1;

impl<K: AsRef<[u8]> + ?Sized> BuildKeyHash<K> for BuildFnv1 {
    #[inline] fn hash_key(&self, key: &K) -> u32 { fnv1(key.as_ref()) }
}

/// [`BuildKeyHash`] that calculates the [FNV-1a](fnv1a) hash
/// of the byte representation of the key.
#[derive(Default, Copy, Clone)]
pub struct BuildFnv1a;

impl<K: AsRef<[u8]> + ?Sized> BuildKeyHash<K> for BuildFnv1a {
    #[inline] fn hash_key(&self, key: &K) -> u32 { fnv1a(key.as_ref()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vectors() {
        assert_eq!(fnv1(b"hello"), 0xe31c0e3f);
        assert_eq!(fnv1a(b"hello"), 0x4f9f2cab);
    }

    #[test]
    fn empty_input_is_offset_basis() {
        assert_eq!(fnv1(b""), OFFSET);
        assert_eq!(fnv1a(b""), OFFSET);
    }

    #[test]
    fn strategies_agree_with_free_functions() {
        assert_eq!(BuildFnv1.hash_key("hello"), fnv1(b"hello"));
        assert_eq!(BuildFnv1a.hash_key("hello"), fnv1a(b"hello"));
        assert_eq!(BuildFnv1a.hash_key(&b"hello"[..]), fnv1a(b"hello"));
    }
}
