//! Identifier generation and the stable hash behind variant assignment.
//!
//! Both use SipHash-1-3 with fixed keys: the output depends only on the
//! input bytes, so ids and assignments are reproducible across processes
//! and releases. Cryptographic strength is not a goal.

use std::hash::Hasher;
use std::sync::atomic::{AtomicU64, Ordering};

use siphasher::sip::SipHasher13;

/// Fixed SipHash keys. Changing them reshuffles every assignment.
const STABLE_KEYS: (u64, u64) = (0, 0);

/// Stable 64-bit hash of the concatenation of `parts` (no separator).
///
/// Assignment hashes `experiment_id ‖ entity_id` through this function.
#[must_use]
pub fn stable_hash(parts: &[&str]) -> u64 {
    let mut hasher = SipHasher13::new_with_keys(STABLE_KEYS.0, STABLE_KEYS.1);
    for part in parts {
        hasher.write(part.as_bytes());
    }
    hasher.finish()
}

/// Produces record identifiers.
pub trait IdGenerator: Send + Sync {
    /// Derive a fresh identifier from the record's content.
    ///
    /// Two calls with identical `parts` must still return distinct ids.
    fn generate(&self, parts: &[&str]) -> String;
}

/// Content-hash id generator with a monotonic sequence mixed in.
///
/// Ids are 16 lowercase hex characters.
#[derive(Debug, Default)]
pub struct HashIdGenerator {
    sequence: AtomicU64,
}

impl HashIdGenerator {
    /// Create a generator starting at sequence 0.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            sequence: AtomicU64::new(0),
        }
    }
}

impl IdGenerator for HashIdGenerator {
    fn generate(&self, parts: &[&str]) -> String {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        let mut hasher = SipHasher13::new_with_keys(STABLE_KEYS.0, STABLE_KEYS.1);
        for part in parts {
            hasher.write(part.as_bytes());
            // Field separator so ("ab", "c") and ("a", "bc") differ
            hasher.write_u8(0x1f);
        }
        hasher.write(&seq.to_le_bytes());
        format!("{:016x}", hasher.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_stable_hash_is_deterministic() {
        assert_eq!(stable_hash(&["exp-1", "acct-9"]), stable_hash(&["exp-1", "acct-9"]));
        assert_ne!(stable_hash(&["exp-1", "acct-9"]), stable_hash(&["exp-1", "acct-8"]));
    }

    #[test]
    fn test_stable_hash_is_plain_concatenation() {
        assert_eq!(stable_hash(&["ab", "c"]), stable_hash(&["a", "bc"]));
        assert_eq!(stable_hash(&["abc"]), stable_hash(&["a", "b", "c"]));
    }

    #[test]
    fn test_generated_ids_are_unique_for_identical_content() {
        let ids = HashIdGenerator::new();
        let generated: HashSet<String> = (0..1000).map(|_| ids.generate(&["same", "input"])).collect();
        assert_eq!(generated.len(), 1000);
    }

    #[test]
    fn test_generated_id_format() {
        let id = HashIdGenerator::new().generate(&["name", "2024-01-01T00:00:00Z"]);
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}
