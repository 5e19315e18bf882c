use log::{error, info};
use simple_logger::SimpleLogger;

use replay_sim::{run_many_experiments, AttackMode, DefenseMode, SimulationConfig};

fn main() {
    SimpleLogger::new().init().unwrap();

    info!("starting");

    let runs = 200;
    let scenarios = [
        ("ideal channel", 0.0, 0.0, AttackMode::PostRun),
        ("lossy channel", 0.1, 0.0, AttackMode::PostRun),
        ("reordering channel", 0.1, 0.3, AttackMode::PostRun),
        ("reordering, inline replays", 0.1, 0.3, AttackMode::Inline),
    ];

    let base = SimulationConfig::default();
    let seed = base.resolve_seed();
    info!("let seed = {};", seed);

    for (name, p_loss, p_reorder, attack_mode) in scenarios {
        let config = SimulationConfig {
            p_loss,
            p_reorder,
            attack_mode,
            ..base.clone()
        };

        info!("{}: p_loss={} p_reorder={} attack={}", name, p_loss, p_reorder, attack_mode);
        match run_many_experiments(&config, &DefenseMode::ALL, runs, Some(seed)) {
            Ok(stats) => {
                for s in &stats {
                    info!(
                        "  {:<9} legit {:>6.2}%  attack {:>6.2}%",
                        s.mode,
                        s.avg_legit_rate * 100.0,
                        s.avg_attack_rate * 100.0
                    );
                }
            }
            Err(e) => error!("{}: {}", name, e),
        }
    }

    info!("done");
}
