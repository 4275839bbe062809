//! Opaque identifiers.

use base58::{FromBase58, ToBase58};
use rand::RngCore;

/// Number of random bytes behind every identifier (128 bits).
pub const IDENTIFIER_ENTROPY: usize = 16;

/// Generates a fresh, unguessable identifier.
///
/// Identifiers are base58 so that they are URL-safe without escaping and
/// contain no visually ambiguous characters.
pub fn random_identifier() -> String {
    let mut bytes = [0u8; IDENTIFIER_ENTROPY];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.to_base58()
}

/// Longest base58 rendering of [IDENTIFIER_ENTROPY] bytes.
pub const IDENTIFIER_MAX_LENGTH: usize = 22;

/// Whether `candidate` could have come from [random_identifier].
pub fn is_identifier(candidate: &str) -> bool {
    !candidate.is_empty()
        && candidate.len() <= IDENTIFIER_MAX_LENGTH
        && candidate
            .from_base58()
            .is_ok_and(|bytes| bytes.len() == IDENTIFIER_ENTROPY)
}
