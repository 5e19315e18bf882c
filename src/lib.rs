//! # replay-sim - Replay Attack Defense Simulator
//!
//! Monte Carlo evaluation of replay-attack defenses for a command channel
//! (remote lock/unlock and similar) under lossy, reordering network conditions.
//!
//! ## Core Components
//!
//! - **Sender / Receiver**: frame factory and the four verification state machines
//!   (no defense, rolling counter + MAC, sliding window + MAC, challenge-response)
//! - **Channel**: loss and bounded-delay reordering over a logical tick clock
//! - **Attacker**: eavesdropping recorder that replays captured frames verbatim
//! - **Experiment driver**: single runs and per-mode aggregation across many runs
//!
//! ## Usage
//!
//! ```no_run
//! use replay_sim::{run_many_experiments, DefenseMode, SimulationConfig};
//!
//! let config = SimulationConfig {
//!     p_reorder: 0.3,
//!     window_size: 5,
//!     ..Default::default()
//! };
//!
//! let stats = run_many_experiments(&config, &DefenseMode::ALL, 200, Some(42))?;
//! for s in &stats {
//!     println!("{}: legit {:.3} attack {:.3}", s.mode, s.avg_legit_rate, s.avg_attack_rate);
//! }
//! # Ok::<(), replay_sim::SimError>(())
//! ```
//!
//! Everything runs on a single logical timeline per trial; each run owns its
//! sender, receiver, attacker and channel.

pub mod rp_interface;
pub mod rp_security;
pub mod rp_commands;

pub mod rp_attacker;
pub mod rp_channel;
pub mod rp_receiver;
pub mod rp_sender;

pub mod rp_config;
pub mod rp_experiment;
pub mod rp_sweep;

// Re-export commonly used types
pub use rp_config::{ScenarioFile, ScenarioMeta, SimulationConfig};
pub use rp_experiment::{
    run_many_experiments, simulate_one_run, AggregateStats, SimulationRunResult,
};
pub use rp_interface::{
    AttackMode, DefenseMode, Frame, ReceiverState, SimError, VerificationResult, VerifyReason,
};
pub use rp_sweep::{run_sweep, SweepParameter, SweepRecord, SweepSpec};
