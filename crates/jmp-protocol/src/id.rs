//! Identifier generators for reply envelopes.

use std::sync::atomic::{AtomicI64, Ordering};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use rand_core::{OsRng, RngCore};

use crate::envelope::Identifier;

/// Number of random bytes behind each [`RandomIdGenerator`] identifier.
pub const RANDOM_ID_BYTES: usize = 12;

/// Source of fresh message identifiers.
pub trait IdGenerator: Send + Sync {
    /// Returns a new identifier.
    fn next_id(&self) -> Identifier;
}

impl<F> IdGenerator for F
where
    F: Fn() -> Identifier + Send + Sync,
{
    fn next_id(&self) -> Identifier {
        self()
    }
}

/// Base64 text identifiers drawn from the operating system RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIdGenerator;

impl IdGenerator for RandomIdGenerator {
    fn next_id(&self) -> Identifier {
        let mut raw = [0_u8; RANDOM_ID_BYTES];
        OsRng.fill_bytes(&mut raw);
        Identifier::Text(BASE64.encode(raw))
    }
}

/// Increasing integer identifiers.
///
/// The sequence stops at `i64::MAX`: once reached, every further call
/// returns `i64::MAX` instead of wrapping to negative values.
#[derive(Debug)]
pub struct SequentialIdGenerator {
    next: AtomicI64,
}

impl SequentialIdGenerator {
    /// Starts the sequence at `start`.
    #[must_use]
    pub const fn new(start: i64) -> Self {
        Self {
            next: AtomicI64::new(start),
        }
    }
}

impl Default for SequentialIdGenerator {
    fn default() -> Self {
        Self::new(1)
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> Identifier {
        let issued = self
            .next
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
                current.checked_add(1)
            });
        match issued {
            Ok(id) | Err(id) => Identifier::Integer(id),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn random_ids_are_base64_of_twelve_bytes() {
        let id = RandomIdGenerator.next_id();
        let text = id.as_text().expect("text id");
        let decoded = BASE64.decode(text).expect("valid base64");
        assert_eq!(decoded.len(), RANDOM_ID_BYTES);
    }

    #[test]
    fn random_ids_do_not_repeat() {
        let ids: HashSet<_> = (0..64).map(|_| RandomIdGenerator.next_id()).collect();
        assert_eq!(ids.len(), 64);
    }

    #[test]
    fn sequential_ids_count_up_from_start() {
        let generator = SequentialIdGenerator::new(10);
        let ids: Vec<_> = (0..3).map(|_| generator.next_id()).collect();
        assert_eq!(
            ids,
            vec![
                Identifier::Integer(10),
                Identifier::Integer(11),
                Identifier::Integer(12)
            ]
        );
    }

    #[test]
    fn sequential_ids_stop_at_the_largest_integer() {
        let generator = SequentialIdGenerator::new(i64::MAX - 1);
        let ids: Vec<_> = (0..4).map(|_| generator.next_id()).collect();
        assert_eq!(
            ids,
            vec![
                Identifier::Integer(i64::MAX - 1),
                Identifier::Integer(i64::MAX),
                Identifier::Integer(i64::MAX),
                Identifier::Integer(i64::MAX)
            ]
        );
    }

    #[test]
    fn closures_generate_ids() {
        let generator = || Identifier::from("fixed");
        assert_eq!(IdGenerator::next_id(&generator), Identifier::from("fixed"));
    }
}
