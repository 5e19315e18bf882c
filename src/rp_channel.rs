//! Lossy, reordering channel.
//!
//! Every `send` advances a logical tick. Surviving frames are scheduled at
//! `tick + delay` in a min-heap keyed by `(delivery_tick, sequence)`, so frames due at
//! the same tick come out in submission order.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::ops::RangeInclusive;

use log::trace;
use rand::Rng;

use crate::rp_interface::Frame;

/// Delay, in ticks, applied to a reordered frame
pub const REORDER_DELAY_TICKS: RangeInclusive<u64> = 1..=3;

#[derive(Debug)]
struct ScheduledFrame {
    delivery_tick: u64,
    sequence: u64,
    frame: Frame,
}

impl PartialEq for ScheduledFrame {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for ScheduledFrame {}

impl PartialOrd for ScheduledFrame {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledFrame {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key().cmp(&other.key())
    }
}

impl ScheduledFrame {
    fn key(&self) -> (u64, u64) {
        (self.delivery_tick, self.sequence)
    }
}

/// Draw with probability `p`, consuming no randomness when `p` is 0
fn roll<R: Rng + ?Sized>(p: f64, rng: &mut R) -> bool {
    p > 0.0 && rng.gen::<f64>() < p
}

pub struct Channel {
    p_loss: f64,
    p_reorder: f64,
    current_tick: u64,
    next_sequence: u64,
    queue: BinaryHeap<Reverse<ScheduledFrame>>,
}

impl Channel {
    pub fn new(p_loss: f64, p_reorder: f64) -> Self {
        Self {
            p_loss,
            p_reorder,
            current_tick: 0,
            next_sequence: 0,
            queue: BinaryHeap::new(),
        }
    }

    pub fn current_tick(&self) -> u64 {
        self.current_tick
    }

    /// Frames scheduled but not delivered yet
    pub fn in_flight(&self) -> usize {
        self.queue.len()
    }

    /// Transmit `frame` and return everything that arrives at this tick.
    ///
    /// Loss is decided before reordering.
    pub fn send<R: Rng + ?Sized>(&mut self, frame: Frame, rng: &mut R) -> Vec<Frame> {
        self.current_tick += 1;

        if roll(self.p_loss, rng) {
            trace!("tick {}: dropped {}", self.current_tick, frame.command);
        } else {
            let delay = if roll(self.p_reorder, rng) {
                rng.gen_range(REORDER_DELAY_TICKS)
            } else {
                0
            };
            if delay > 0 {
                trace!(
                    "tick {}: delayed {} by {}",
                    self.current_tick,
                    frame.command,
                    delay
                );
            }

            self.queue.push(Reverse(ScheduledFrame {
                delivery_tick: self.current_tick + delay,
                sequence: self.next_sequence,
                frame,
            }));
            self.next_sequence += 1;
        }

        let mut arrived = Vec::new();
        while let Some(Reverse(head)) = self.queue.peek() {
            if head.delivery_tick > self.current_tick {
                break;
            }
            if let Some(Reverse(scheduled)) = self.queue.pop() {
                arrived.push(scheduled.frame);
            }
        }
        arrived
    }

    /// Deliver everything still scheduled, in delivery order, regardless of tick
    pub fn flush(&mut self) -> Vec<Frame> {
        let mut arrived = Vec::with_capacity(self.queue.len());
        while let Some(Reverse(scheduled)) = self.queue.pop() {
            arrived.push(scheduled.frame);
        }
        arrived
    }
}
