use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use super::{PlayerId, Slot};
use crate::sync::{ActionQueue, StopSignal};

/// Key press source for a computer player: picks slots uniformly at random
/// and feeds them into the player's action queue, blocking while it is full.
pub struct KeyGenerator {
    player: PlayerId,
    actions: Arc<ActionQueue<Slot>>,
    table_size: usize,
    stop: StopSignal,
    key_delay: Duration,
    rng: StdRng,
}

impl KeyGenerator {
    pub fn new(
        player: PlayerId,
        actions: Arc<ActionQueue<Slot>>,
        table_size: usize,
        stop: StopSignal,
    ) -> Self {
        KeyGenerator {
            player,
            actions,
            table_size,
            stop,
            key_delay: Duration::ZERO,
            rng: StdRng::from_os_rng(),
        }
    }

    pub fn with_key_delay(mut self, delay: Duration) -> Self {
        self.key_delay = delay;
        self
    }

    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// Next slot to press.
    pub fn next_slot(&mut self) -> Slot {
        self.rng.random_range(0..self.table_size)
    }

    /// Generator thread body. Returns once stopped or the queue is closed.
    pub fn run(mut self) {
        info!(player = self.player, "key generator starting");
        if self.table_size > 0 {
            while !self.stop.is_triggered() {
                let slot = self.next_slot();
                if self.actions.put(slot).is_err() {
                    break;
                }
                if !self.key_delay.is_zero() {
                    thread::sleep(self.key_delay);
                }
            }
        }
        info!(player = self.player, "key generator terminated");
    }
}
