use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::rp_interface::Frame;

/// Eavesdropping record-and-replay adversary.
///
/// Sees every frame before the channel, can resend any of them, and can never
/// compute a MAC or answer a fresh challenge.
pub struct Attacker {
    record_loss: f64,
    target_commands: Option<HashSet<String>>,
    recorded: Vec<Frame>,
}

impl Attacker {
    /// An empty target list means "replay anything".
    pub fn new(record_loss: f64, target_commands: Option<&[String]>) -> Self {
        let target_commands = target_commands
            .filter(|targets| !targets.is_empty())
            .map(|targets| targets.iter().cloned().collect());
        Self {
            record_loss,
            target_commands,
            recorded: Vec::new(),
        }
    }

    pub fn observe<R: Rng + ?Sized>(&mut self, frame: &Frame, rng: &mut R) {
        if self.record_loss > 0.0 && rng.gen::<f64>() < self.record_loss {
            return;
        }
        self.recorded.push(frame.clone());
    }

    /// Pick a recorded frame to resend, as a fresh attack-marked copy.
    ///
    /// `None` when nothing (matching the target filter) was recorded.
    pub fn pick_frame<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Frame> {
        let template = match &self.target_commands {
            None => self.recorded.choose(rng)?,
            Some(targets) => {
                let candidates: Vec<&Frame> = self
                    .recorded
                    .iter()
                    .filter(|f| targets.contains(&f.command))
                    .collect();
                *candidates.choose(rng)?
            }
        };
        Some(template.replayed())
    }

    pub fn recorded_count(&self) -> usize {
        self.recorded.len()
    }

    pub fn clear(&mut self) {
        self.recorded.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn frame(command: &str, counter: i64) -> Frame {
        Frame {
            command: command.to_string(),
            counter: Some(counter),
            mac: Some(format!("{:08x}", counter)),
            nonce: None,
            is_attack: false,
        }
    }

    #[test]
    fn test_empty_attacker_has_nothing_to_replay() {
        let mut rng = StdRng::seed_from_u64(1);
        let attacker = Attacker::new(0.0, None);
        assert!(attacker.pick_frame(&mut rng).is_none());
    }

    #[test]
    fn test_observe_records_copies() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut attacker = Attacker::new(0.0, None);
        attacker.observe(&frame("LOCK", 1), &mut rng);
        attacker.observe(&frame("UNLOCK", 2), &mut rng);
        assert_eq!(attacker.recorded_count(), 2);

        attacker.clear();
        assert_eq!(attacker.recorded_count(), 0);
    }

    #[test]
    fn test_full_record_loss_records_nothing() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut attacker = Attacker::new(1.0, None);
        for i in 0..20 {
            attacker.observe(&frame("LOCK", i), &mut rng);
        }
        assert_eq!(attacker.recorded_count(), 0);
    }

    #[test]
    fn test_partial_record_loss() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut attacker = Attacker::new(0.5, None);
        for i in 0..1000 {
            attacker.observe(&frame("LOCK", i), &mut rng);
        }
        let kept = attacker.recorded_count();
        assert!(kept > 400 && kept < 600, "kept {}", kept);
    }

    #[test]
    fn test_picked_frame_is_verbatim_attack_copy() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut attacker = Attacker::new(0.0, None);
        let original = frame("UNLOCK", 7);
        attacker.observe(&original, &mut rng);

        let picked = attacker.pick_frame(&mut rng).unwrap();
        assert!(picked.is_attack);
        assert_eq!(picked.command, original.command);
        assert_eq!(picked.counter, original.counter);
        assert_eq!(picked.mac, original.mac);

        // the recording itself is untouched
        let again = attacker.pick_frame(&mut rng).unwrap();
        assert_eq!(again, picked);
        assert!(!attacker.recorded[0].is_attack);
    }

    #[test]
    fn test_target_filter_only_picks_matching_commands() {
        let mut rng = StdRng::seed_from_u64(6);
        let targets = vec!["UNLOCK".to_string()];
        let mut attacker = Attacker::new(0.0, Some(targets.as_slice()));

        attacker.observe(&frame("LOCK", 1), &mut rng);
        assert!(attacker.pick_frame(&mut rng).is_none());

        attacker.observe(&frame("UNLOCK", 2), &mut rng);
        attacker.observe(&frame("LOCK", 3), &mut rng);
        for _ in 0..20 {
            let picked = attacker.pick_frame(&mut rng).unwrap();
            assert_eq!(picked.command, "UNLOCK");
            assert_eq!(picked.counter, Some(2));
        }
    }

    #[test]
    fn test_empty_target_list_means_any() {
        let mut rng = StdRng::seed_from_u64(7);
        let targets: Vec<String> = Vec::new();
        let mut attacker = Attacker::new(0.0, Some(targets.as_slice()));
        attacker.observe(&frame("LOCK", 1), &mut rng);
        assert!(attacker.pick_frame(&mut rng).is_some());
    }

    #[test]
    fn test_pick_is_roughly_uniform() {
        let mut rng = StdRng::seed_from_u64(8);
        let mut attacker = Attacker::new(0.0, None);
        for i in 0..4 {
            attacker.observe(&frame("STOP", i), &mut rng);
        }

        let mut counts = [0usize; 4];
        for _ in 0..4000 {
            let picked = attacker.pick_frame(&mut rng).unwrap();
            counts[picked.counter.unwrap() as usize] += 1;
        }
        for count in counts {
            assert!(count > 800 && count < 1200, "{:?}", counts);
        }
    }
}
