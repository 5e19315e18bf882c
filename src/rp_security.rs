//! Message authentication for simulated frames.
//!
//! The tag is a BLAKE3 keyed hash over a canonical `"{binding}|{command}"` string,
//! rendered as hex and truncated. The truncation length is a simulation knob, not a
//! security parameter.

use crate::rp_interface::{Counter, MAX_MAC_LENGTH};

/// The freshness value a MAC binds the command to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacBinding<'a> {
    Counter(Counter),
    Nonce(&'a str),
}

fn derive_key(shared_key: &str) -> [u8; 32] {
    *blake3::hash(shared_key.as_bytes()).as_bytes()
}

/// Compute the truncated hex tag for `(binding, command)` under `shared_key`.
///
/// Deterministic: identical inputs always give the same tag.
pub fn compute_mac(
    binding: MacBinding<'_>,
    command: &str,
    shared_key: &str,
    mac_length: usize,
) -> String {
    let mut hasher = blake3::Hasher::new_keyed(&derive_key(shared_key));
    match binding {
        MacBinding::Counter(counter) => hasher.update(counter.to_string().as_bytes()),
        MacBinding::Nonce(nonce) => hasher.update(nonce.as_bytes()),
    };
    hasher.update(b"|");
    hasher.update(command.as_bytes());

    let hex = hasher.finalize().to_hex();
    hex.as_str()[..mac_length.min(MAX_MAC_LENGTH)].to_string()
}

/// Compare two tags without an early exit on the first differing byte.
///
/// Length mismatch returns false immediately.
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    if a.len() != b.len() {
        return false;
    }

    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Recompute the tag and compare it against `mac`
pub fn verify_mac(
    binding: MacBinding<'_>,
    command: &str,
    mac: &str,
    shared_key: &str,
    mac_length: usize,
) -> bool {
    let expected = compute_mac(binding, command, shared_key, mac_length);
    constant_time_compare(&expected, mac)
}
