use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, error, info};

use super::board::{Board, CandidateSet};
use super::generator::KeyGenerator;
use super::{PlayerId, Slot};
use crate::error::QueueClosed;
use crate::sync::{ActionQueue, CandidateQueue, StopSignal};
use crate::ui::GameDisplay;

/// How often the remaining freeze time is republished.
const FREEZE_TICK: Duration = Duration::from_millis(10);

/// The dealer's ruling on a submitted candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// A legal set: the player scores and is frozen for the point cooldown.
    Legal,
    /// Not a set: the player is frozen for the penalty cooldown.
    Illegal,
    /// The board changed before the dealer got to it: no effect.
    Stale,
}

/// What a single consumed move request did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Dropped,
    Unmarked,
    Marked,
    Submitted(CandidateSet),
}

/// Freeze durations applied after a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreezeTiming {
    pub point: Duration,
    pub penalty: Duration,
}

impl Default for FreezeTiming {
    fn default() -> Self {
        FreezeTiming {
            point: Duration::from_millis(1000),
            penalty: Duration::from_millis(3000),
        }
    }
}

/// Settings for the automated key press generator of a computer player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComputerInput {
    pub key_delay: Duration,
}

/// One player's actor: consumes its action queue, toggles tokens, submits
/// candidates and waits for the dealer's verdict.
pub struct Player {
    id: PlayerId,
    board: Arc<Board>,
    display: Arc<dyn GameDisplay>,
    actions: Arc<ActionQueue<Slot>>,
    candidates: Arc<CandidateQueue<CandidateSet>>,
    verdicts: Receiver<Verdict>,
    score: Arc<AtomicU32>,
    stop: StopSignal,
    freeze: FreezeTiming,
    computer: Option<ComputerInput>,
}

impl Player {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: PlayerId,
        board: Arc<Board>,
        display: Arc<dyn GameDisplay>,
        actions: Arc<ActionQueue<Slot>>,
        candidates: Arc<CandidateQueue<CandidateSet>>,
        verdicts: Receiver<Verdict>,
        stop: StopSignal,
        freeze: FreezeTiming,
    ) -> Self {
        Player {
            id,
            board,
            display,
            actions,
            candidates,
            verdicts,
            score: Arc::new(AtomicU32::new(0)),
            stop,
            freeze,
            computer: None,
        }
    }

    /// Drive this player from a random key press generator instead of a human.
    pub fn with_computer_input(mut self, input: ComputerInput) -> Self {
        self.computer = Some(input);
        self
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn is_human(&self) -> bool {
        self.computer.is_none()
    }

    pub fn score(&self) -> u32 {
        self.score.load(Ordering::SeqCst)
    }

    /// Shared handle the dealer reads for the final tally.
    pub fn score_handle(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.score)
    }

    /// Player thread body. Returns when the game stops.
    pub fn run(self) {
        info!(player = self.id, human = self.is_human(), "player thread starting");
        let generator = self.computer.and_then(|input| self.spawn_generator(input));

        while !self.stop.is_triggered() {
            let Some(slot) = self.actions.take() else {
                break;
            };
            if let MoveOutcome::Submitted(candidate) = self.handle_slot(slot) {
                debug!(player = self.id, ?candidate, "candidate submitted");
                let Some(verdict) = self.await_verdict() else {
                    break;
                };
                self.apply_verdict(verdict);
            }
        }

        if let Some(generator) = generator {
            if generator.join().is_err() {
                error!(player = self.id, "key generator panicked");
            }
        }
        info!(player = self.id, "player thread terminated");
    }

    fn spawn_generator(&self, input: ComputerInput) -> Option<thread::JoinHandle<()>> {
        let generator = KeyGenerator::new(
            self.id,
            Arc::clone(&self.actions),
            self.board.table_size(),
            self.stop.clone(),
        )
        .with_key_delay(input.key_delay);
        match thread::Builder::new()
            .name(format!("computer-{}", self.id))
            .spawn(move || generator.run())
        {
            Ok(handle) => Some(handle),
            Err(e) => {
                error!(player = self.id, error = %e, "failed to spawn key generator");
                None
            }
        }
    }

    /// Apply one move request to the board.
    ///
    /// An empty slot is ignored. A slot this player already marked is
    /// unmarked. Otherwise it is marked if the player holds fewer than three
    /// tokens, and a third token submits the candidate to the dealer.
    pub fn handle_slot(&self, slot: Slot) -> MoveOutcome {
        if self.board.card_at(slot).is_none() {
            return MoveOutcome::Dropped;
        }
        if self.board.remove_token(self.id, slot) {
            return MoveOutcome::Unmarked;
        }
        if !self.board.try_mark_slot(self.id, slot) {
            return MoveOutcome::Dropped;
        }
        let Some(candidate) = self.board.extract_candidate(self.id) else {
            return MoveOutcome::Marked;
        };
        match self.candidates.put(candidate) {
            Ok(()) => MoveOutcome::Submitted(candidate),
            Err(QueueClosed) => MoveOutcome::Marked,
        }
    }

    /// Block until the dealer rules on the pending candidate. `None` if the
    /// game shut down first.
    pub fn await_verdict(&self) -> Option<Verdict> {
        self.verdicts.recv().ok()
    }

    /// Score or freeze according to `verdict`, then drop any move requests
    /// that piled up meanwhile.
    pub fn apply_verdict(&self, verdict: Verdict) {
        match verdict {
            Verdict::Legal => self.point(),
            Verdict::Illegal => self.penalty(),
            Verdict::Stale => {}
        }
        let dropped = self.actions.clear();
        if dropped > 0 {
            debug!(player = self.id, dropped, "discarded stale move requests");
        }
    }

    /// Award a point and freeze for the point cooldown.
    pub fn point(&self) {
        let score = self.score.fetch_add(1, Ordering::SeqCst) + 1;
        self.display.score(self.id, score);
        self.freeze_for(self.freeze.point);
    }

    /// Freeze for the penalty cooldown.
    pub fn penalty(&self) {
        self.freeze_for(self.freeze.penalty);
    }

    fn freeze_for(&self, duration: Duration) {
        let until = Instant::now() + duration;
        loop {
            let remaining = until.saturating_duration_since(Instant::now());
            if remaining.is_zero() || self.stop.is_triggered() {
                break;
            }
            self.display.freeze(self.id, remaining);
            thread::sleep(remaining.min(FREEZE_TICK));
        }
        self.display.freeze(self.id, Duration::ZERO);
    }
}
