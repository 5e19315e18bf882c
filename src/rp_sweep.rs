//! Single-parameter sweeps: hold the base configuration fixed, vary one field, and
//! collect one flat record per (value, mode).

use serde::{Deserialize, Serialize};

use crate::rp_config::SimulationConfig;
use crate::rp_experiment::{run_many_experiments, AggregateStats};
use crate::rp_interface::{DefenseMode, SimError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SweepParameter {
    #[serde(rename = "p_loss")]
    PLoss,
    #[serde(rename = "p_reorder")]
    PReorder,
    #[serde(rename = "window_size", alias = "window")]
    WindowSize,
}

impl SweepParameter {
    pub fn as_str(&self) -> &'static str {
        match self {
            SweepParameter::PLoss => "p_loss",
            SweepParameter::PReorder => "p_reorder",
            SweepParameter::WindowSize => "window_size",
        }
    }

    /// Clone `base` with this parameter set to `value`
    pub fn apply(&self, base: &SimulationConfig, value: f64) -> Result<SimulationConfig, SimError> {
        let mut config = base.clone();
        match self {
            SweepParameter::PLoss => config.p_loss = value,
            SweepParameter::PReorder => config.p_reorder = value,
            SweepParameter::WindowSize => {
                if value < 0.0 || value.fract() != 0.0 {
                    return Err(SimError::Parse(format!(
                        "window_size sweep values must be non-negative integers, got {}",
                        value
                    )));
                }
                config.window_size = value as usize;
            }
        }
        Ok(config)
    }
}

/// What a scenario file asks to sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepSpec {
    pub parameter: SweepParameter,
    pub values: Vec<f64>,
}

/// One aggregate row plus the sweep point that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepRecord {
    #[serde(flatten)]
    pub stats: AggregateStats,
    pub sweep_type: SweepParameter,
    pub sweep_value: f64,
}

pub fn run_sweep(
    base: &SimulationConfig,
    modes: &[DefenseMode],
    parameter: SweepParameter,
    values: &[f64],
    runs: usize,
    seed: Option<u64>,
) -> Result<Vec<SweepRecord>, SimError> {
    let mut records = Vec::with_capacity(values.len() * modes.len());
    for &value in values {
        let config = parameter.apply(base, value)?;
        for stats in run_many_experiments(&config, modes, runs, seed)? {
            records.push(SweepRecord {
                stats,
                sweep_type: parameter,
                sweep_value: value,
            });
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rp_experiment::{records_from_yaml, records_to_yaml};

    #[test]
    fn test_apply_overrides_one_field() {
        let base = SimulationConfig::default();

        let config = SweepParameter::PLoss.apply(&base, 0.2).unwrap();
        assert_eq!(config.p_loss, 0.2);
        assert_eq!(config.p_reorder, base.p_reorder);

        let config = SweepParameter::PReorder.apply(&base, 0.15).unwrap();
        assert_eq!(config.p_reorder, 0.15);
        assert_eq!(config.p_loss, base.p_loss);

        let config = SweepParameter::WindowSize.apply(&base, 9.0).unwrap();
        assert_eq!(config.window_size, 9);
    }

    #[test]
    fn test_fractional_window_rejected() {
        let base = SimulationConfig::default();
        assert!(matches!(
            SweepParameter::WindowSize.apply(&base, 2.5),
            Err(SimError::Parse(_))
        ));
        assert!(SweepParameter::WindowSize.apply(&base, -1.0).is_err());
    }

    #[test]
    fn test_loss_sweep_produces_record_per_value_and_mode() {
        let base = SimulationConfig {
            num_legit: 10,
            num_replay: 10,
            ..Default::default()
        };
        let modes = [DefenseMode::NoDefense, DefenseMode::RollingMac];
        let values = [0.0, 0.3];
        let records = run_sweep(&base, &modes, SweepParameter::PLoss, &values, 20, Some(42)).unwrap();

        assert_eq!(records.len(), 4);
        assert_eq!(records[0].sweep_value, 0.0);
        assert_eq!(records[0].stats.mode, DefenseMode::NoDefense);
        assert_eq!(records[3].sweep_value, 0.3);
        assert_eq!(records[3].stats.mode, DefenseMode::RollingMac);
        assert_eq!(records[3].stats.p_loss, 0.3);

        // loss hurts legitimate traffic for the undefended receiver
        assert!(records[2].stats.avg_legit_rate < records[0].stats.avg_legit_rate);
    }

    #[test]
    fn test_window_sweep_reports_window_sizes() {
        let base = SimulationConfig {
            p_loss: 0.15,
            p_reorder: 0.15,
            ..Default::default()
        };
        let records = run_sweep(
            &base,
            &[DefenseMode::Window],
            SweepParameter::WindowSize,
            &[1.0, 5.0],
            10,
            Some(3),
        )
        .unwrap();
        assert_eq!(records[0].stats.window_size, 1);
        assert_eq!(records[1].stats.window_size, 5);
    }

    #[test]
    fn test_invalid_sweep_value_fails() {
        let base = SimulationConfig::default();
        let err = run_sweep(
            &base,
            &[DefenseMode::Window],
            SweepParameter::WindowSize,
            &[0.0],
            5,
            Some(1),
        )
        .unwrap_err();
        assert_eq!(err, SimError::InvalidWindowSize(0));
    }

    #[test]
    fn test_sweep_records_are_flat_and_round_trip() {
        let base = SimulationConfig::default();
        let records = run_sweep(
            &base,
            &[DefenseMode::Challenge],
            SweepParameter::PReorder,
            &[0.1],
            5,
            Some(7),
        )
        .unwrap();

        let text = records_to_yaml(&records).unwrap();
        assert!(text.contains("sweep_type: p_reorder"));
        assert!(text.contains("mode: challenge"));
        assert!(!text.contains("stats:"));

        let parsed: Vec<SweepRecord> = records_from_yaml(&text).unwrap();
        assert_eq!(parsed, records);
    }
}
