//! Experiment driver.
//!
//! `simulate_one_run` plays one randomized trial: legitimate traffic through a lossy
//! channel, an attacker recording everything it hears, and replays injected either
//! inline or after the legitimate traffic. `run_many_experiments` repeats that per
//! defense mode and aggregates the rates.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::rp_attacker::Attacker;
use crate::rp_channel::Channel;
use crate::rp_config::SimulationConfig;
use crate::rp_interface::{AttackMode, DefenseMode, Frame, SimError, VerifyReason};
use crate::rp_receiver::Receiver;
use crate::rp_sender::Sender;

// ============================================================================
// Results
// ============================================================================

/// Counters produced by a single Monte Carlo run
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationRunResult {
    pub mode: DefenseMode,
    pub legit_sent: usize,
    pub legit_accepted: usize,
    pub attack_attempts: usize,
    pub attack_success: usize,

    /// Frames still in flight at the end, delivered by the final flush
    pub late_deliveries: usize,

    /// Verification outcomes of delivered legitimate frames
    pub legit_outcomes: BTreeMap<VerifyReason, usize>,

    /// Verification outcomes of delivered replays
    pub attack_outcomes: BTreeMap<VerifyReason, usize>,
}

fn safe_div(num: usize, denom: usize) -> f64 {
    if denom == 0 {
        0.0
    } else {
        num as f64 / denom as f64
    }
}

impl SimulationRunResult {
    fn new(mode: DefenseMode) -> Self {
        Self {
            mode,
            legit_sent: 0,
            legit_accepted: 0,
            attack_attempts: 0,
            attack_success: 0,
            late_deliveries: 0,
            legit_outcomes: BTreeMap::new(),
            attack_outcomes: BTreeMap::new(),
        }
    }

    /// Accepted / sent, 0.0 when nothing was sent
    pub fn legit_accept_rate(&self) -> f64 {
        safe_div(self.legit_accepted, self.legit_sent)
    }

    /// Successes / attempts, 0.0 when nothing was attempted
    pub fn attack_success_rate(&self) -> f64 {
        safe_div(self.attack_success, self.attack_attempts)
    }
}

/// Aggregated statistics over many runs for a single mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateStats {
    pub mode: DefenseMode,
    pub runs: usize,
    pub avg_legit_rate: f64,
    pub std_legit_rate: f64,
    pub avg_attack_rate: f64,
    pub std_attack_rate: f64,
    pub p_loss: f64,
    pub p_reorder: f64,
    /// 0 for modes without a window
    pub window_size: usize,
    pub num_legit: usize,
    pub num_replay: usize,
    pub attack_mode: AttackMode,
}

impl AggregateStats {
    fn from_rates(config: &SimulationConfig, legit: &[f64], attack: &[f64]) -> Self {
        Self {
            mode: config.mode,
            runs: legit.len(),
            avg_legit_rate: mean(legit),
            std_legit_rate: population_std(legit),
            avg_attack_rate: mean(attack),
            std_attack_rate: population_std(attack),
            p_loss: config.p_loss,
            p_reorder: config.p_reorder,
            window_size: if config.mode == DefenseMode::Window {
                config.window_size
            } else {
                0
            },
            num_legit: config.num_legit,
            num_replay: config.num_replay,
            attack_mode: config.attack_mode,
        }
    }
}

/// Arithmetic mean, 0.0 for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Standard deviation dividing by N, 0.0 for an empty slice
pub fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

// ============================================================================
// Single run
// ============================================================================

/// Per-run participants. Nothing here outlives the run.
struct RunContext {
    sender: Sender,
    receiver: Receiver,
    attacker: Attacker,
    channel: Channel,
    result: SimulationRunResult,
}

impl RunContext {
    fn new(config: &SimulationConfig) -> Result<Self, SimError> {
        Ok(Self {
            sender: Sender::new(config.mode, &config.shared_key, config.mac_length),
            receiver: Receiver::new(
                config.mode,
                &config.shared_key,
                config.mac_length,
                config.window_size,
            )?,
            attacker: Attacker::new(
                config.attacker_record_loss,
                config.target_commands.as_deref(),
            ),
            channel: Channel::new(config.p_loss, config.p_reorder),
            result: SimulationRunResult::new(config.mode),
        })
    }

    fn deliver(&mut self, frames: Vec<Frame>) {
        for frame in frames {
            let verdict = self.receiver.process(&frame);
            if frame.is_attack {
                *self.result.attack_outcomes.entry(verdict.reason).or_insert(0) += 1;
                if verdict.accepted {
                    self.result.attack_success += 1;
                }
            } else {
                *self.result.legit_outcomes.entry(verdict.reason).or_insert(0) += 1;
                if verdict.accepted {
                    self.result.legit_accepted += 1;
                }
            }
        }
    }

    fn transmit<R: Rng + ?Sized>(&mut self, frame: Frame, rng: &mut R) {
        let arrived = self.channel.send(frame, rng);
        self.deliver(arrived);
    }

    /// Pick and send one replay. False when the attacker has nothing to offer.
    fn inject<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        match self.attacker.pick_frame(rng) {
            Some(frame) => {
                self.result.attack_attempts += 1;
                self.transmit(frame, rng);
                true
            }
            None => false,
        }
    }

    fn inline_attacks<R: Rng + ?Sized>(&mut self, config: &SimulationConfig, rng: &mut R) {
        let p = config.inline_attack_probability;
        for _ in 0..config.inline_attack_burst {
            if !(p > 0.0 && rng.gen::<f64>() < p) {
                break;
            }
            if !self.inject(rng) {
                break;
            }
        }
    }

    fn post_run_attacks<R: Rng + ?Sized>(&mut self, config: &SimulationConfig, rng: &mut R) {
        for _ in 0..config.num_replay {
            if !self.inject(rng) {
                break;
            }
        }
    }
}

/// Simulate one trial of `config`.
///
/// Only configuration problems are errors; an attacker with nothing recorded just
/// stops early.
pub fn simulate_one_run<R: Rng + ?Sized>(
    config: &SimulationConfig,
    rng: &mut R,
) -> Result<SimulationRunResult, SimError> {
    config.validate()?;
    let commands = config.command_source()?;
    let mut ctx = RunContext::new(config)?;

    for i in 0..config.num_legit {
        let command = commands.choose(i, rng);
        let nonce = match config.mode {
            DefenseMode::Challenge => Some(
                ctx.receiver
                    .issue_nonce(rng, config.challenge_nonce_bits)?,
            ),
            _ => None,
        };

        let frame = ctx.sender.next_frame(command, nonce.as_deref())?;
        ctx.result.legit_sent += 1;
        ctx.attacker.observe(&frame, rng);
        ctx.transmit(frame, rng);

        if config.attack_mode == AttackMode::Inline {
            ctx.inline_attacks(config, rng);
        }
    }

    if config.attack_mode == AttackMode::PostRun {
        ctx.post_run_attacks(config, rng);
    }

    let late = ctx.channel.flush();
    ctx.result.late_deliveries = late.len();
    ctx.deliver(late);

    let result = ctx.result;
    debug!(
        "{} run: legit {}/{} attack {}/{} late {}",
        result.mode,
        result.legit_accepted,
        result.legit_sent,
        result.attack_success,
        result.attack_attempts,
        result.late_deliveries
    );
    Ok(result)
}

// ============================================================================
// Monte Carlo
// ============================================================================

/// Run `runs` trials for each mode in `modes`.
///
/// Run `i` of every mode is seeded from the same scenario seed, so modes are compared
/// under the same channel and attacker draws wherever their behavior allows. `seed`
/// falls back to the config seed, then to entropy.
pub fn run_many_experiments(
    base_config: &SimulationConfig,
    modes: &[DefenseMode],
    runs: usize,
    seed: Option<u64>,
) -> Result<Vec<AggregateStats>, SimError> {
    let configs: Vec<SimulationConfig> = modes.iter().map(|m| base_config.with_mode(*m)).collect();
    for config in &configs {
        config.validate()?;
    }

    let seed = seed.unwrap_or_else(|| base_config.resolve_seed());
    let mut master = StdRng::seed_from_u64(seed);

    let mut legit: Vec<Vec<f64>> = vec![Vec::with_capacity(runs); configs.len()];
    let mut attack: Vec<Vec<f64>> = vec![Vec::with_capacity(runs); configs.len()];

    for _ in 0..runs {
        let scenario_seed = master.next_u64();
        for (idx, config) in configs.iter().enumerate() {
            let mut rng = StdRng::seed_from_u64(scenario_seed);
            let result = simulate_one_run(config, &mut rng)?;
            legit[idx].push(result.legit_accept_rate());
            attack[idx].push(result.attack_success_rate());
        }
    }

    let aggregates: Vec<AggregateStats> = configs
        .iter()
        .enumerate()
        .map(|(idx, config)| AggregateStats::from_rates(config, &legit[idx], &attack[idx]))
        .collect();

    for stats in &aggregates {
        info!(
            "{:<9} runs={} legit={:.3}±{:.3} attack={:.3}±{:.3} (p_loss={} p_reorder={} seed={})",
            stats.mode,
            stats.runs,
            stats.avg_legit_rate,
            stats.std_legit_rate,
            stats.avg_attack_rate,
            stats.std_attack_rate,
            stats.p_loss,
            stats.p_reorder,
            seed
        );
    }

    Ok(aggregates)
}

// ============================================================================
// Result dumps
// ============================================================================

pub fn records_to_yaml<T: Serialize>(records: &[T]) -> Result<String, SimError> {
    Ok(serde_yaml::to_string(records)?)
}

pub fn records_from_yaml<T: DeserializeOwned>(text: &str) -> Result<Vec<T>, SimError> {
    Ok(serde_yaml::from_str(text)?)
}

pub fn write_records<T: Serialize, P: AsRef<Path>>(path: P, records: &[T]) -> Result<(), SimError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, records_to_yaml(records)?)?;
    Ok(())
}
