// Scenario Runner - Load and execute scenario YAML files
//
// Usage:
//   cargo run --bin scenario_runner scenarios/reorder_stress.yaml
//   cargo run --bin scenario_runner scenarios/  (runs all .yaml files in directory)
//   cargo run --bin scenario_runner scenarios/loss_sweep.yaml --seed 42 --out results/loss.yaml
//   cargo run --bin scenario_runner scenarios/baseline.yaml --commands traces/garage.txt

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use simple_logger::SimpleLogger;

use replay_sim::rp_commands::load_command_sequence;
use replay_sim::rp_experiment::write_records;
use replay_sim::{
    run_many_experiments, run_sweep, AggregateStats, ScenarioFile, SimError, SweepRecord,
};

struct RunnerArgs {
    path: PathBuf,
    seed: Option<u64>,
    out: Option<PathBuf>,
    commands: Option<Vec<String>>,
}

fn main() {
    SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .init()
        .unwrap();

    let args: Vec<String> = env::args().collect();
    let runner_args = match parse_args(&args) {
        Some(a) => a,
        None => {
            eprintln!(
                "Usage: {} <scenario.yaml | directory/> [--seed N] [--out results.yaml] [--commands trace.txt]",
                args[0]
            );
            eprintln!("\nExamples:");
            eprintln!("  {} scenarios/reorder_stress.yaml", args[0]);
            eprintln!("  {} scenarios/", args[0]);
            eprintln!("  {} scenarios/loss_sweep.yaml --seed 42 --out results/loss.yaml", args[0]);
            std::process::exit(1);
        }
    };

    let scenarios = if runner_args.path.is_dir() {
        find_scenarios(&runner_args.path)
    } else if runner_args.path.is_file() {
        vec![runner_args.path.clone()]
    } else {
        eprintln!("Error: Path does not exist: {}", runner_args.path.display());
        std::process::exit(1);
    };

    if scenarios.is_empty() {
        eprintln!("No .yaml files found in {}", runner_args.path.display());
        std::process::exit(1);
    }

    let mut failed = 0;
    for (i, path) in scenarios.iter().enumerate() {
        println!("\n{}/{} Running: {}\n", i + 1, scenarios.len(), path.display());
        // one output per scenario when several run
        let out = runner_args.out.as_ref().map(|o| {
            if scenarios.len() > 1 {
                o.with_file_name(format!(
                    "{}_{}",
                    path.file_stem().and_then(|s| s.to_str()).unwrap_or("scenario"),
                    o.file_name().and_then(|s| s.to_str()).unwrap_or("results.yaml")
                ))
            } else {
                o.clone()
            }
        });

        if let Err(e) = run_scenario_file(
            path,
            runner_args.seed,
            out.as_deref(),
            runner_args.commands.as_deref(),
        ) {
            eprintln!("Failed {}: {}", path.display(), e);
            failed += 1;
        }
    }

    if failed > 0 {
        std::process::exit(1);
    }
}

fn parse_args(args: &[String]) -> Option<RunnerArgs> {
    let path = PathBuf::from(args.get(1)?);
    let mut seed = None;
    let mut out = None;
    let mut commands = None;

    let mut rest = args[2..].iter();
    while let Some(flag) = rest.next() {
        match flag.as_str() {
            "--seed" => seed = Some(rest.next()?.parse().ok()?),
            "--out" => out = Some(PathBuf::from(rest.next()?)),
            "--commands" => match load_command_sequence(rest.next()?) {
                Ok(sequence) => commands = Some(sequence),
                Err(e) => {
                    eprintln!("Cannot load command trace: {}", e);
                    return None;
                }
            },
            other => {
                eprintln!("Unknown argument: {}", other);
                return None;
            }
        }
    }

    Some(RunnerArgs {
        path,
        seed,
        out,
        commands,
    })
}

fn find_scenarios(dir: &Path) -> Vec<PathBuf> {
    let mut scenarios = Vec::new();
    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            let ext = path.extension().and_then(|s| s.to_str());
            if ext == Some("yaml") || ext == Some("yml") {
                scenarios.push(path);
            }
        }
    }
    scenarios.sort();
    scenarios
}

fn run_scenario_file(
    path: &Path,
    seed: Option<u64>,
    out: Option<&Path>,
    commands: Option<&[String]>,
) -> Result<(), SimError> {
    let mut scenario = ScenarioFile::load(path)?;
    if let Some(sequence) = commands {
        scenario.config.command_sequence = Some(sequence.to_vec());
    }

    println!("╔════════════════════════════════════════════════════════╗");
    match scenario.meta.name {
        Some(ref name) => println!("║  {}", name),
        None => println!(
            "║  Scenario: {}",
            path.file_stem().and_then(|s| s.to_str()).unwrap_or("?")
        ),
    }
    println!("╚════════════════════════════════════════════════════════╝\n");

    if let Some(ref desc) = scenario.meta.description {
        println!("{}\n", desc);
    }
    if let Some(ref hypothesis) = scenario.meta.hypothesis {
        println!("Hypothesis:");
        println!("  {}\n", hypothesis);
    }

    let seed = seed.or(scenario.config.seed);
    let config = &scenario.config;
    println!("Configuration:");
    println!("  Runs: {}", scenario.runs);
    println!(
        "  Modes: {}",
        scenario
            .modes
            .iter()
            .map(|m| m.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!("  Legit/Replay: {}/{}", config.num_legit, config.num_replay);
    println!("  Attack mode: {}", config.attack_mode);
    println!("  p_loss: {}  p_reorder: {}", config.p_loss, config.p_reorder);
    println!("  Window: {}", config.window_size);
    if let Some(ref sequence) = config.command_sequence {
        println!("  Command trace: {} commands", sequence.len());
    }
    match seed {
        Some(s) => println!("  Seed: {}\n", s),
        None => println!("  Seed: random\n"),
    }

    match scenario.sweep {
        Some(ref sweep) => {
            info!(
                "sweeping {} over {} values",
                sweep.parameter.as_str(),
                sweep.values.len()
            );
            let records = run_sweep(
                config,
                &scenario.modes,
                sweep.parameter,
                &sweep.values,
                scenario.runs,
                seed,
            )?;
            print_sweep(&records);
            if let Some(out) = out {
                write_records(out, &records)?;
                println!("\nSaved sweep records to {}", out.display());
            }
        }
        None => {
            let stats = run_many_experiments(config, &scenario.modes, scenario.runs, seed)?;
            print_table(&stats);
            if let Some(out) = out {
                write_records(out, &stats)?;
                println!("\nSaved aggregate metrics to {}", out.display());
            }
        }
    }

    println!("\n✓ Scenario complete!");
    Ok(())
}

fn print_table(stats: &[AggregateStats]) {
    if stats.is_empty() {
        warn!("no modes requested");
        return;
    }

    println!(
        "{:<10} {:>6} {:>18} {:>18}",
        "Mode", "Runs", "Legit (avg ± std)", "Attack (avg ± std)"
    );
    println!("{}", "-".repeat(56));
    for s in stats {
        println!(
            "{:<10} {:>6} {:>9.2}% ± {:>5.2} {:>9.2}% ± {:>5.2}",
            s.mode.as_str(),
            s.runs,
            s.avg_legit_rate * 100.0,
            s.std_legit_rate * 100.0,
            s.avg_attack_rate * 100.0,
            s.std_attack_rate * 100.0
        );
    }
}

fn print_sweep(records: &[SweepRecord]) {
    println!(
        "{:<12} {:>8} {:<10} {:>10} {:>10}",
        "Parameter", "Value", "Mode", "Legit", "Attack"
    );
    println!("{}", "-".repeat(54));
    for r in records {
        println!(
            "{:<12} {:>8.3} {:<10} {:>9.2}% {:>9.2}%",
            r.sweep_type.as_str(),
            r.sweep_value,
            r.stats.mode.as_str(),
            r.stats.avg_legit_rate * 100.0,
            r.stats.avg_attack_rate * 100.0
        );
    }
}
