//! Receiver-side verification.
//!
//! Each defense mode is a `Verifier` variant carrying its own parameters. A verifier is a
//! function over `(frame, state)` that reports an outcome and only touches the state on
//! paths that advance it.
//!
//! ## Sliding window
//!
//! The window mode keeps the highest accepted counter plus a u128 mask where bit `k`
//! records that `last_counter - k` was accepted:
//!
//! ```text
//! last_counter = 10, window = 5
//! bit:     4   3   2   1   0
//! counter: 6   7   8   9   10
//! ```
//!
//! A new high-water mark shifts the mask left by the jump; an older counter inside the
//! window sets its bit once and is a replay afterwards.

use rand::Rng;

use crate::rp_interface::{
    Counter, DefenseMode, Frame, ReceiverState, SimError, VerificationResult, VerifyReason,
    MAX_NONCE_BITS, MAX_WINDOW_SIZE,
};
use crate::rp_security::{verify_mac, MacBinding};

/// Mode-specific verification parameters
#[derive(Debug, Clone, PartialEq)]
pub enum Verifier {
    NoDefense,
    RollingMac {
        shared_key: String,
        mac_length: usize,
    },
    Window {
        shared_key: String,
        mac_length: usize,
        window_size: usize,
    },
    Challenge {
        shared_key: String,
        mac_length: usize,
    },
}

impl Verifier {
    /// Window mode rejects a window of 0 or one wider than the mask.
    pub fn new(
        mode: DefenseMode,
        shared_key: &str,
        mac_length: usize,
        window_size: usize,
    ) -> Result<Self, SimError> {
        let shared_key = shared_key.to_string();
        Ok(match mode {
            DefenseMode::NoDefense => Verifier::NoDefense,
            DefenseMode::RollingMac => Verifier::RollingMac {
                shared_key,
                mac_length,
            },
            DefenseMode::Window => {
                if window_size == 0 || window_size > MAX_WINDOW_SIZE {
                    return Err(SimError::InvalidWindowSize(window_size));
                }
                Verifier::Window {
                    shared_key,
                    mac_length,
                    window_size,
                }
            }
            DefenseMode::Challenge => Verifier::Challenge {
                shared_key,
                mac_length,
            },
        })
    }

    pub fn mode(&self) -> DefenseMode {
        match self {
            Verifier::NoDefense => DefenseMode::NoDefense,
            Verifier::RollingMac { .. } => DefenseMode::RollingMac,
            Verifier::Window { .. } => DefenseMode::Window,
            Verifier::Challenge { .. } => DefenseMode::Challenge,
        }
    }

    pub fn verify(&self, frame: &Frame, state: &mut ReceiverState) -> VerificationResult {
        match self {
            Verifier::NoDefense => VerificationResult::accept(VerifyReason::NoDefenseAccept),
            Verifier::RollingMac {
                shared_key,
                mac_length,
            } => verify_rolling(frame, state, shared_key, *mac_length),
            Verifier::Window {
                shared_key,
                mac_length,
                window_size,
            } => verify_window(frame, state, shared_key, *mac_length, *window_size),
            Verifier::Challenge {
                shared_key,
                mac_length,
            } => verify_challenge(frame, state, shared_key, *mac_length),
        }
    }
}

/// Counter and MAC of a counter-mode frame, if the MAC checks out
fn authenticated_counter(
    frame: &Frame,
    shared_key: &str,
    mac_length: usize,
) -> Result<Counter, VerifyReason> {
    let (counter, mac) = match (frame.counter, frame.mac.as_deref()) {
        (Some(counter), Some(mac)) => (counter, mac),
        _ => return Err(VerifyReason::MissingSecurityFields),
    };

    if !verify_mac(
        MacBinding::Counter(counter),
        &frame.command,
        mac,
        shared_key,
        mac_length,
    ) {
        return Err(VerifyReason::MacMismatch);
    }
    Ok(counter)
}

fn verify_rolling(
    frame: &Frame,
    state: &mut ReceiverState,
    shared_key: &str,
    mac_length: usize,
) -> VerificationResult {
    let counter = match authenticated_counter(frame, shared_key, mac_length) {
        Ok(counter) => counter,
        Err(reason) => return VerificationResult::reject(reason),
    };

    if counter <= state.last_counter {
        return VerificationResult::reject(VerifyReason::CounterReplay);
    }

    state.last_counter = counter;
    VerificationResult::accept(VerifyReason::RollingAccept)
}

fn verify_window(
    frame: &Frame,
    state: &mut ReceiverState,
    shared_key: &str,
    mac_length: usize,
    window_size: usize,
) -> VerificationResult {
    let counter = match authenticated_counter(frame, shared_key, mac_length) {
        Ok(counter) => counter,
        Err(reason) => return VerificationResult::reject(reason),
    };

    if state.last_counter < 0 {
        state.last_counter = counter;
        state.received_mask = 1;
        return VerificationResult::accept(VerifyReason::WindowAcceptInitial);
    }

    let window = window_size as Counter;
    let diff = counter - state.last_counter;

    if diff > 0 {
        // forward jumps are capped by the window, which also bounds the shift
        if diff > window {
            return VerificationResult::reject(VerifyReason::CounterOutOfWindow);
        }
        state.received_mask = state.received_mask.checked_shl(diff as u32).unwrap_or(0) | 1;
        state.last_counter = counter;
        return VerificationResult::accept(VerifyReason::WindowAcceptNew);
    }

    let offset = -diff;
    if offset >= window {
        return VerificationResult::reject(VerifyReason::CounterTooOld);
    }

    let bit = 1u128 << offset;
    if state.received_mask & bit != 0 {
        return VerificationResult::reject(VerifyReason::CounterReplay);
    }

    state.received_mask |= bit;
    VerificationResult::accept(VerifyReason::WindowAcceptOld)
}

fn verify_challenge(
    frame: &Frame,
    state: &mut ReceiverState,
    shared_key: &str,
    mac_length: usize,
) -> VerificationResult {
    let (nonce, mac) = match (frame.nonce.as_deref(), frame.mac.as_deref()) {
        (Some(nonce), Some(mac)) => (nonce, mac),
        _ => return VerificationResult::reject(VerifyReason::MissingChallengeFields),
    };

    let expected = match state.expected_nonce.as_deref() {
        Some(expected) => expected,
        None => return VerificationResult::reject(VerifyReason::NoOutstandingChallenge),
    };

    if nonce != expected {
        return VerificationResult::reject(VerifyReason::ChallengeMismatch);
    }

    if !verify_mac(
        MacBinding::Nonce(nonce),
        &frame.command,
        mac,
        shared_key,
        mac_length,
    ) {
        return VerificationResult::reject(VerifyReason::MacMismatch);
    }

    // single use
    state.expected_nonce = None;
    VerificationResult::accept(VerifyReason::ChallengeAccept)
}

/// Render `bits` random bits as zero-padded lower-case hex
fn draw_nonce<R: Rng + ?Sized>(rng: &mut R, bits: u32) -> String {
    let raw: u64 = rng.gen();
    let value = if bits >= 64 { raw } else { raw & ((1u64 << bits) - 1) };
    let width = ((bits + 3) / 4) as usize;
    format!("{:0width$x}", value, width = width)
}

/// Unified receiver dispatching to the verifier of its mode
pub struct Receiver {
    verifier: Verifier,
    state: ReceiverState,
}

impl Receiver {
    pub fn new(
        mode: DefenseMode,
        shared_key: &str,
        mac_length: usize,
        window_size: usize,
    ) -> Result<Self, SimError> {
        Ok(Self {
            verifier: Verifier::new(mode, shared_key, mac_length, window_size)?,
            state: ReceiverState::default(),
        })
    }

    pub fn mode(&self) -> DefenseMode {
        self.verifier.mode()
    }

    pub fn state(&self) -> &ReceiverState {
        &self.state
    }

    pub fn process(&mut self, frame: &Frame) -> VerificationResult {
        self.verifier.verify(frame, &mut self.state)
    }

    /// Issue a fresh challenge. The previous outstanding nonce, if any, is replaced.
    pub fn issue_nonce<R: Rng + ?Sized>(&mut self, rng: &mut R, bits: u32) -> Result<String, SimError> {
        if self.mode() != DefenseMode::Challenge {
            return Err(SimError::NotChallengeMode);
        }
        if bits == 0 || bits > MAX_NONCE_BITS {
            return Err(SimError::InvalidNonceBits(bits));
        }

        let nonce = draw_nonce(rng, bits);
        self.state.expected_nonce = Some(nonce.clone());
        Ok(nonce)
    }

    pub fn reset(&mut self) {
        self.state = ReceiverState::default();
    }
}
