//! FxHash helpers for in-memory keys.
//!
//! Content hashes that end up on disk or on the wire use blake3
//! (`freshness::ContentHash`); these are for process-local identity only.
//!
//! ```ignore
//! let h = hash::compute("some content"); // -> u64
//! let fp = hash::fingerprint("some content"); // -> "a1b2c3d4"
//! let p = hash::pairs([("id", "3"), ("title", "x")]);
//! ```

use rustc_hash::FxHasher;
use std::hash::Hasher;

#[inline]
pub fn compute<T: AsRef<[u8]> + ?Sized>(data: &T) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write(data.as_ref());
    hasher.finish()
}

/// Hash key/value pairs independently of their order.
pub fn pairs<'a, I>(items: I) -> u64
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut items: Vec<_> = items.into_iter().collect();
    items.sort_unstable();

    let mut hasher = FxHasher::default();
    for (key, value) in items {
        hasher.write(key.as_bytes());
        hasher.write_u8(0xff);
        hasher.write(value.as_bytes());
        hasher.write_u8(0xfe);
    }
    hasher.finish()
}

/// 8-char hex fingerprint.
#[inline]
pub fn fingerprint<T: AsRef<[u8]> + ?Sized>(value: &T) -> String {
    short(compute(value))
}

#[inline]
pub fn short(hash: u64) -> String {
    format!("{hash:016x}")[..8].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pairs_order_independent() {
        let a = pairs([("id", "1"), ("title", "hi")]);
        let b = pairs([("title", "hi"), ("id", "1")]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_pairs_no_boundary_collision() {
        assert_ne!(pairs([("ab", "c")]), pairs([("a", "bc")]));
    }

    #[test]
    fn test_fingerprint_len() {
        assert_eq!(fingerprint("view Main {}").len(), 8);
        assert_eq!(fingerprint("x"), fingerprint("x"));
    }
}
