//! Shared types for the replay simulation: frames, defense modes, receiver state,
//! verification outcomes and the crate error type.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Sender-side sequence number. Signed so the receiver can start at -1.
pub type Counter = i64;

/// Receiver state before any frame was accepted
pub const UNINITIALIZED_COUNTER: Counter = -1;

/// Largest window the u128 receive mask can track
pub const MAX_WINDOW_SIZE: usize = 128;

/// Longest MAC, in hex characters, a BLAKE3 output can provide
pub const MAX_MAC_LENGTH: usize = 64;

/// Largest nonce a single u64 draw can provide
pub const MAX_NONCE_BITS: u32 = 64;

// ============================================================================
// Modes
// ============================================================================

/// Receiver protection mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DefenseMode {
    #[serde(rename = "no_def", alias = "no_defense")]
    NoDefense,
    #[serde(rename = "rolling", alias = "rolling_mac")]
    RollingMac,
    #[serde(rename = "window")]
    Window,
    #[serde(rename = "challenge")]
    Challenge,
}

impl DefenseMode {
    pub const ALL: [DefenseMode; 4] = [
        DefenseMode::NoDefense,
        DefenseMode::RollingMac,
        DefenseMode::Window,
        DefenseMode::Challenge,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DefenseMode::NoDefense => "no_def",
            DefenseMode::RollingMac => "rolling",
            DefenseMode::Window => "window",
            DefenseMode::Challenge => "challenge",
        }
    }
}

impl fmt::Display for DefenseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for DefenseMode {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "no_def" | "no_defense" => Ok(DefenseMode::NoDefense),
            "rolling" | "rolling_mac" => Ok(DefenseMode::RollingMac),
            "window" => Ok(DefenseMode::Window),
            "challenge" => Ok(DefenseMode::Challenge),
            other => Err(SimError::UnknownMode(other.to_string())),
        }
    }
}

/// How the attacker schedules replay attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttackMode {
    /// All replays fired after the legitimate traffic
    #[serde(rename = "post", alias = "post_run")]
    PostRun,
    /// Replays interleaved with the legitimate traffic
    #[serde(rename = "inline")]
    Inline,
}

impl AttackMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttackMode::PostRun => "post",
            AttackMode::Inline => "inline",
        }
    }
}

impl fmt::Display for AttackMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for AttackMode {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "post" | "post_run" => Ok(AttackMode::PostRun),
            "inline" => Ok(AttackMode::Inline),
            other => Err(SimError::UnknownAttackMode(other.to_string())),
        }
    }
}

// ============================================================================
// Frames and receiver state
// ============================================================================

/// A command frame as it travels over the air.
///
/// `is_attack` is simulation metadata: it is never part of the authenticated
/// content and only exists so the driver can score deliveries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: String,
    pub counter: Option<Counter>,
    pub mac: Option<String>,
    pub nonce: Option<String>,
    pub is_attack: bool,
}

impl Frame {
    /// Unauthenticated frame carrying only a command
    pub fn plain(command: &str) -> Self {
        Self {
            command: command.to_string(),
            counter: None,
            mac: None,
            nonce: None,
            is_attack: false,
        }
    }

    /// Clone marked as attacker provenance. Authentication fields are copied verbatim.
    pub fn replayed(&self) -> Self {
        Self {
            is_attack: true,
            ..self.clone()
        }
    }
}

/// Mutable acceptance state owned by one receiver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiverState {
    /// Highest accepted counter, -1 before the first acceptance
    pub last_counter: Counter,

    /// Outstanding challenge, cleared once it authenticates a frame
    pub expected_nonce: Option<String>,

    /// Bit k set: counter `last_counter - k` was already accepted
    pub received_mask: u128,
}

impl Default for ReceiverState {
    fn default() -> Self {
        Self {
            last_counter: UNINITIALIZED_COUNTER,
            expected_nonce: None,
            received_mask: 0,
        }
    }
}

// ============================================================================
// Verification outcomes
// ============================================================================

/// Why a frame was accepted or rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifyReason {
    NoDefenseAccept,
    MissingSecurityFields,
    MacMismatch,
    CounterReplay,
    RollingAccept,
    WindowAcceptInitial,
    WindowAcceptNew,
    WindowAcceptOld,
    CounterOutOfWindow,
    CounterTooOld,
    MissingChallengeFields,
    NoOutstandingChallenge,
    ChallengeMismatch,
    ChallengeAccept,
}

impl VerifyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerifyReason::NoDefenseAccept => "no_defense_accept",
            VerifyReason::MissingSecurityFields => "missing_security_fields",
            VerifyReason::MacMismatch => "mac_mismatch",
            VerifyReason::CounterReplay => "counter_replay",
            VerifyReason::RollingAccept => "rolling_accept",
            VerifyReason::WindowAcceptInitial => "window_accept_initial",
            VerifyReason::WindowAcceptNew => "window_accept_new",
            VerifyReason::WindowAcceptOld => "window_accept_old",
            VerifyReason::CounterOutOfWindow => "counter_out_of_window",
            VerifyReason::CounterTooOld => "counter_too_old",
            VerifyReason::MissingChallengeFields => "missing_challenge_fields",
            VerifyReason::NoOutstandingChallenge => "no_outstanding_challenge",
            VerifyReason::ChallengeMismatch => "challenge_mismatch",
            VerifyReason::ChallengeAccept => "challenge_accept",
        }
    }
}

impl fmt::Display for VerifyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Outcome of a single `Receiver::process` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerificationResult {
    pub accepted: bool,
    pub reason: VerifyReason,
}

impl VerificationResult {
    pub fn accept(reason: VerifyReason) -> Self {
        Self {
            accepted: true,
            reason,
        }
    }

    pub fn reject(reason: VerifyReason) -> Self {
        Self {
            accepted: false,
            reason,
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Configuration and I/O failures.
///
/// Verification failures and an empty attacker pool are simulation outcomes,
/// not errors, and never show up here.
#[derive(Debug, Clone, PartialEq)]
pub enum SimError {
    /// Defense mode name not recognised
    UnknownMode(String),

    /// Attack scheduling name not recognised
    UnknownAttackMode(String),

    /// No commands to draw legitimate traffic from
    EmptyCommandSet,

    /// Fixed command trace given but empty
    EmptyCommandSequence,

    /// Window mode needs 1..=128
    InvalidWindowSize(usize),

    /// Probability outside [0, 1]
    InvalidProbability { name: &'static str, value: f64 },

    /// MAC length must be 1..=64 hex characters
    InvalidMacLength(usize),

    /// Nonce length must be 1..=64 bits
    InvalidNonceBits(u32),

    /// Challenge frame requested before a nonce was issued
    MissingNonce,

    /// Nonce requested from a receiver that does not run challenge-response
    NotChallengeMode,

    /// Reading or writing a file failed
    Io(String),

    /// Scenario, trace or result text could not be parsed
    Parse(String),
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::UnknownMode(m) => write!(
                f,
                "unsupported mode '{}', valid options: no_def, rolling, window, challenge",
                m
            ),
            SimError::UnknownAttackMode(m) => write!(
                f,
                "unsupported attack mode '{}', valid options: post, inline",
                m
            ),
            SimError::EmptyCommandSet => write!(f, "command set is empty"),
            SimError::EmptyCommandSequence => write!(f, "provided command sequence is empty"),
            SimError::InvalidWindowSize(w) => write!(
                f,
                "window_size must be between 1 and {} for window mode, got {}",
                MAX_WINDOW_SIZE, w
            ),
            SimError::InvalidProbability { name, value } => {
                write!(f, "{} must be within [0, 1], got {}", name, value)
            }
            SimError::InvalidMacLength(l) => write!(
                f,
                "mac_length must be between 1 and {}, got {}",
                MAX_MAC_LENGTH, l
            ),
            SimError::InvalidNonceBits(b) => write!(
                f,
                "challenge_nonce_bits must be between 1 and {}, got {}",
                MAX_NONCE_BITS, b
            ),
            SimError::MissingNonce => {
                write!(f, "challenge mode frame requires a nonce issued by the receiver")
            }
            SimError::NotChallengeMode => {
                write!(f, "nonce issuance is only supported in challenge mode")
            }
            SimError::Io(e) => write!(f, "i/o error: {}", e),
            SimError::Parse(e) => write!(f, "parse error: {}", e),
        }
    }
}

impl std::error::Error for SimError {}

impl From<std::io::Error> for SimError {
    fn from(e: std::io::Error) -> Self {
        SimError::Io(e.to_string())
    }
}

impl From<serde_yaml::Error> for SimError {
    fn from(e: serde_yaml::Error) -> Self {
        SimError::Parse(e.to_string())
    }
}
