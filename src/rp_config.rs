//! Simulation configuration and YAML scenario files

use std::fs;
use std::path::Path;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::rp_commands::{default_commands, CommandSource};
use crate::rp_interface::{
    AttackMode, DefenseMode, SimError, MAX_MAC_LENGTH, MAX_NONCE_BITS, MAX_WINDOW_SIZE,
};
use crate::rp_sweep::SweepSpec;

/// Configuration for a single scenario.
///
/// Sweeps clone it with one field overridden; every field can be omitted in YAML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Receiver protection mode
    pub mode: DefenseMode,

    /// When the attacker fires its replays
    pub attack_mode: AttackMode,

    /// Legitimate transmissions per run
    pub num_legit: usize,

    /// Replay attempts per run (post-run scheduling)
    pub num_replay: usize,

    /// Probability a frame is lost on the channel
    pub p_loss: f64,

    /// Probability a surviving frame is delayed
    pub p_reorder: f64,

    /// Sliding window width (window mode only)
    pub window_size: usize,

    /// Truncated MAC length in hex characters
    pub mac_length: usize,

    pub shared_key: String,

    /// Probability the attacker misses a transmission
    pub attacker_record_loss: f64,

    /// Chance of each inline injection after a legitimate frame
    pub inline_attack_probability: f64,

    /// Maximum inline injections after a legitimate frame
    pub inline_attack_burst: usize,

    /// Nonce width for challenge-response
    pub challenge_nonce_bits: u32,

    /// Fixed command trace, cycled by index (takes precedence over `command_set`)
    pub command_sequence: Option<Vec<String>>,

    /// Vocabulary for random legitimate commands
    pub command_set: Vec<String>,

    /// Only replay frames carrying one of these commands
    pub target_commands: Option<Vec<String>>,

    /// Random seed (None = generate random)
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            mode: DefenseMode::NoDefense,
            attack_mode: AttackMode::PostRun,
            num_legit: 20,
            num_replay: 100,
            p_loss: 0.0,
            p_reorder: 0.0,
            window_size: 5,
            mac_length: 8,
            shared_key: "sim_shared_key".to_string(),
            attacker_record_loss: 0.0,
            inline_attack_probability: 0.3,
            inline_attack_burst: 1,
            challenge_nonce_bits: 32,
            command_sequence: None,
            command_set: default_commands(),
            target_commands: None,
            seed: None,
        }
    }
}

fn check_probability(name: &'static str, value: f64) -> Result<(), SimError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(SimError::InvalidProbability { name, value })
    }
}

impl SimulationConfig {
    /// Clone with a different defense mode
    pub fn with_mode(&self, mode: DefenseMode) -> Self {
        Self {
            mode,
            ..self.clone()
        }
    }

    /// Get or generate seed
    pub fn resolve_seed(&self) -> u64 {
        self.seed
            .unwrap_or_else(|| StdRng::from_entropy().next_u64())
    }

    pub fn command_source(&self) -> Result<CommandSource<'_>, SimError> {
        CommandSource::new(self.command_sequence.as_deref(), &self.command_set)
    }

    /// Reject anything that cannot be simulated. Mode-specific checks only apply
    /// to the configured mode.
    pub fn validate(&self) -> Result<(), SimError> {
        check_probability("p_loss", self.p_loss)?;
        check_probability("p_reorder", self.p_reorder)?;
        check_probability("attacker_record_loss", self.attacker_record_loss)?;
        check_probability("inline_attack_probability", self.inline_attack_probability)?;

        if self.mac_length == 0 || self.mac_length > MAX_MAC_LENGTH {
            return Err(SimError::InvalidMacLength(self.mac_length));
        }

        match self.mode {
            DefenseMode::Window
                if self.window_size == 0 || self.window_size > MAX_WINDOW_SIZE =>
            {
                return Err(SimError::InvalidWindowSize(self.window_size));
            }
            DefenseMode::Challenge
                if self.challenge_nonce_bits == 0
                    || self.challenge_nonce_bits > MAX_NONCE_BITS =>
            {
                return Err(SimError::InvalidNonceBits(self.challenge_nonce_bits));
            }
            _ => {}
        }

        self.command_source()?;
        Ok(())
    }
}

// ============================================================================
// Scenario files
// ============================================================================

fn default_modes() -> Vec<DefenseMode> {
    DefenseMode::ALL.to_vec()
}

fn default_runs() -> usize {
    200
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioMeta {
    pub name: Option<String>,
    pub description: Option<String>,
    pub hypothesis: Option<String>,
}

/// A scenario as stored on disk.
///
/// ```yaml
/// meta:
///   name: Reordering stress
/// runs: 200
/// modes: [rolling, window]
/// config:
///   p_reorder: 0.3
///   window_size: 5
/// sweep:
///   parameter: p_loss
///   values: [0.0, 0.1, 0.2]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioFile {
    #[serde(default)]
    pub meta: ScenarioMeta,

    #[serde(default)]
    pub config: SimulationConfig,

    #[serde(default = "default_modes")]
    pub modes: Vec<DefenseMode>,

    #[serde(default = "default_runs")]
    pub runs: usize,

    #[serde(default)]
    pub sweep: Option<SweepSpec>,
}

impl ScenarioFile {
    pub fn from_yaml_str(text: &str) -> Result<Self, SimError> {
        let scenario: ScenarioFile = serde_yaml::from_str(text)?;
        for mode in &scenario.modes {
            scenario.config.with_mode(*mode).validate()?;
        }
        Ok(scenario)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SimError> {
        let text = fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }
}
