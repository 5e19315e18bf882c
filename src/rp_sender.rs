use crate::rp_interface::{Counter, DefenseMode, Frame, SimError};
use crate::rp_security::{compute_mac, MacBinding};

/// Per-session frame factory.
///
/// Counters start at 1 and strictly increase for the lifetime of the instance.
pub struct Sender {
    mode: DefenseMode,
    shared_key: String,
    mac_length: usize,
    counter: Counter,
}

impl Sender {
    pub fn new(mode: DefenseMode, shared_key: &str, mac_length: usize) -> Self {
        Self {
            mode,
            shared_key: shared_key.to_string(),
            mac_length,
            counter: 0,
        }
    }

    /// Last counter handed out, 0 before the first frame
    pub fn counter(&self) -> Counter {
        self.counter
    }

    /// Build the next frame for `command`.
    ///
    /// Challenge mode needs the nonce the receiver just issued and fails with
    /// `SimError::MissingNonce` without one. Other modes ignore `nonce`.
    pub fn next_frame(&mut self, command: &str, nonce: Option<&str>) -> Result<Frame, SimError> {
        match self.mode {
            DefenseMode::NoDefense => Ok(Frame::plain(command)),
            DefenseMode::RollingMac | DefenseMode::Window => {
                self.counter += 1;
                let mac = compute_mac(
                    MacBinding::Counter(self.counter),
                    command,
                    &self.shared_key,
                    self.mac_length,
                );
                Ok(Frame {
                    command: command.to_string(),
                    counter: Some(self.counter),
                    mac: Some(mac),
                    nonce: None,
                    is_attack: false,
                })
            }
            DefenseMode::Challenge => {
                let nonce = nonce.ok_or(SimError::MissingNonce)?;
                let mac = compute_mac(
                    MacBinding::Nonce(nonce),
                    command,
                    &self.shared_key,
                    self.mac_length,
                );
                Ok(Frame {
                    command: command.to_string(),
                    counter: None,
                    mac: Some(mac),
                    nonce: Some(nonce.to_string()),
                    is_attack: false,
                })
            }
        }
    }
}
