//! Command vocabulary for legitimate traffic: a default set drawn at random,
//! or a fixed trace cycled by transmission index.

use std::fs;
use std::path::Path;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::rp_interface::SimError;

/// Default remote-control vocabulary
pub const DEFAULT_COMMANDS: [&str; 6] = ["LOCK", "UNLOCK", "START", "STOP", "OPEN", "CLOSE"];

pub fn default_commands() -> Vec<String> {
    DEFAULT_COMMANDS.iter().map(|c| c.to_string()).collect()
}

/// Where the command for transmission `i` comes from
#[derive(Debug, Clone, Copy)]
pub enum CommandSource<'a> {
    /// Cycle through a fixed trace by index
    Trace(&'a [String]),
    /// Uniform draw from a command set
    Random(&'a [String]),
}

impl<'a> CommandSource<'a> {
    /// A fixed trace takes precedence over the command set.
    pub fn new(sequence: Option<&'a [String]>, command_set: &'a [String]) -> Result<Self, SimError> {
        match sequence {
            Some([]) => Err(SimError::EmptyCommandSequence),
            Some(trace) => Ok(CommandSource::Trace(trace)),
            None if command_set.is_empty() => Err(SimError::EmptyCommandSet),
            None => Ok(CommandSource::Random(command_set)),
        }
    }

    /// Command for transmission `index`. Trace mode draws no randomness.
    pub fn choose<R: Rng + ?Sized>(&self, index: usize, rng: &mut R) -> &'a str {
        match *self {
            CommandSource::Trace(trace) => trace[index % trace.len()].as_str(),
            CommandSource::Random(set) => set.choose(rng).map(|c| c.as_str()).unwrap_or(""),
        }
    }
}

/// Parse a command trace: one command per line, `#` starts a comment line.
pub fn parse_command_sequence(text: &str) -> Result<Vec<String>, SimError> {
    let commands: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect();

    if commands.is_empty() {
        return Err(SimError::EmptyCommandSequence);
    }
    Ok(commands)
}

pub fn load_command_sequence<P: AsRef<Path>>(path: P) -> Result<Vec<String>, SimError> {
    let text = fs::read_to_string(path)?;
    parse_command_sequence(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_trace_cycles_by_index() {
        let trace = vec!["LOCK".to_string(), "UNLOCK".to_string()];
        let set = default_commands();
        let source = CommandSource::new(Some(trace.as_slice()), &set).unwrap();
        let mut rng = StdRng::seed_from_u64(1);

        let picked: Vec<&str> = (0..5).map(|i| source.choose(i, &mut rng)).collect();
        assert_eq!(picked, vec!["LOCK", "UNLOCK", "LOCK", "UNLOCK", "LOCK"]);
    }

    #[test]
    fn test_random_draws_from_set() {
        let set = default_commands();
        let source = CommandSource::new(None, &set).unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        for i in 0..50 {
            let command = source.choose(i, &mut rng);
            assert!(DEFAULT_COMMANDS.contains(&command));
        }
    }

    #[test]
    fn test_empty_sources_are_config_errors() {
        let empty: Vec<String> = Vec::new();
        let set = default_commands();
        assert_eq!(
            CommandSource::new(Some(empty.as_slice()), &set).unwrap_err(),
            SimError::EmptyCommandSequence
        );
        assert_eq!(
            CommandSource::new(None, &empty).unwrap_err(),
            SimError::EmptyCommandSet
        );
    }

    #[test]
    fn test_parse_command_sequence() {
        let text = "# morning routine\nUNLOCK\n\n  START \nSTOP\n# done\nLOCK\n";
        assert_eq!(
            parse_command_sequence(text).unwrap(),
            vec!["UNLOCK", "START", "STOP", "LOCK"]
        );
        assert_eq!(
            parse_command_sequence("# nothing\n\n").unwrap_err(),
            SimError::EmptyCommandSequence
        );
    }

    #[test]
    fn test_load_missing_trace_is_io_error() {
        let err = load_command_sequence("/nonexistent/trace.txt").unwrap_err();
        assert!(matches!(err, SimError::Io(_)));
    }
}
