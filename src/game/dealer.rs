use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::mpsc::SyncSender;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, error, info, warn};

use super::board::{Board, CandidateSet};
use super::player::Verdict;
use super::rules::SetRules;
use super::{Card, PlayerId, Slot};
use crate::sync::{ActionQueue, CandidateQueue, StopSignal};
use crate::ui::GameDisplay;

/// Countdown polling step while far from expiry.
const COARSE_TICK: Duration = Duration::from_secs(1);
/// Countdown polling step inside the warning window.
const FINE_TICK: Duration = Duration::from_millis(10);

/// Round timing and diagnostics for the dealer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DealerSettings {
    pub turn_timeout: Duration,
    pub turn_timeout_warning: Duration,
    /// Log every legal set on the table after each deal.
    pub hints: bool,
}

impl Default for DealerSettings {
    fn default() -> Self {
        DealerSettings {
            turn_timeout: Duration::from_secs(60),
            turn_timeout_warning: Duration::from_secs(5),
            hints: false,
        }
    }
}

/// Final result of a game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSummary {
    pub scores: Vec<u32>,
    pub winners: Vec<PlayerId>,
}

impl GameSummary {
    /// Every player whose score equals the highest score.
    pub fn from_scores(scores: Vec<u32>) -> Self {
        let best = scores.iter().copied().max();
        let winners = scores
            .iter()
            .enumerate()
            .filter(|&(_, &score)| Some(score) == best)
            .map(|(player, _)| player)
            .collect();
        GameSummary { scores, winners }
    }
}

/// The dealer's handle on one player: where to send verdicts, the queue to
/// close on shutdown, the score to tally, and the thread to join.
pub struct Seat {
    pub id: PlayerId,
    actions: Arc<ActionQueue<Slot>>,
    verdicts: SyncSender<Verdict>,
    score: Arc<AtomicU32>,
    thread: Option<JoinHandle<()>>,
}

impl Seat {
    pub fn new(
        id: PlayerId,
        actions: Arc<ActionQueue<Slot>>,
        verdicts: SyncSender<Verdict>,
        score: Arc<AtomicU32>,
    ) -> Self {
        Seat {
            id,
            actions,
            verdicts,
            score,
            thread: None,
        }
    }

    pub fn with_thread(mut self, thread: JoinHandle<()>) -> Self {
        self.thread = Some(thread);
        self
    }

    fn deliver(&self, verdict: Verdict) {
        if self.verdicts.send(verdict).is_err() {
            debug!(player = self.id, ?verdict, "player gone, verdict dropped");
        }
    }

    /// Wake the player out of any blocking wait and join its thread.
    fn dismiss(self) {
        let Seat {
            id,
            actions,
            verdicts,
            thread,
            ..
        } = self;
        actions.close();
        drop(verdicts);
        if let Some(thread) = thread {
            if thread.join().is_err() {
                error!(player = id, "player thread panicked");
            }
        }
    }
}

/// Owns the deck and the round lifecycle: deal, count down while validating
/// submitted candidates, reclaim the table, and finally tally the winners.
pub struct Dealer {
    board: Arc<Board>,
    rules: Arc<dyn SetRules>,
    display: Arc<dyn GameDisplay>,
    candidates: Arc<CandidateQueue<CandidateSet>>,
    seats: Vec<Seat>,
    deck: Vec<Card>,
    slot_order: Vec<Slot>,
    stop: StopSignal,
    settings: DealerSettings,
    reshuffle_at: Instant,
    rng: StdRng,
}

impl Dealer {
    pub fn new(
        board: Arc<Board>,
        rules: Arc<dyn SetRules>,
        display: Arc<dyn GameDisplay>,
        candidates: Arc<CandidateQueue<CandidateSet>>,
        stop: StopSignal,
        deck_size: usize,
    ) -> Self {
        let slot_order = (0..board.table_size()).collect();
        Dealer {
            board,
            rules,
            display,
            candidates,
            seats: Vec::new(),
            deck: (0..deck_size).collect(),
            slot_order,
            stop,
            settings: DealerSettings::default(),
            reshuffle_at: Instant::now(),
            rng: StdRng::from_os_rng(),
        }
    }

    pub fn with_settings(mut self, settings: DealerSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_seats(mut self, seats: Vec<Seat>) -> Self {
        self.seats = seats;
        self
    }

    /// Replace the deck, in draw order.
    pub fn with_deck(mut self, deck: Vec<Card>) -> Self {
        self.deck = deck;
        self
    }

    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn deck(&self) -> &[Card] {
        &self.deck
    }

    /// Time left before the current round times out.
    pub fn remaining(&self) -> Duration {
        self.reshuffle_at.saturating_duration_since(Instant::now())
    }

    /// Dealer thread body: play rounds until stopped or no set is left, then
    /// shut the players down and announce the winners.
    pub fn run(mut self) -> GameSummary {
        info!(players = self.seats.len(), deck = self.deck.len(), "dealer starting");
        let mut round = 0;
        while !self.should_finish() {
            round += 1;
            info!(round, deck = self.deck.len(), "round starting");
            self.deal();
            self.timer_loop();
            self.end_round();
        }
        let summary = self.finish();
        info!(rounds = round, scores = ?summary.scores, winners = ?summary.winners, "dealer terminated");
        summary
    }

    /// True once a stop was requested or the remaining cards hold no set.
    pub fn should_finish(&self) -> bool {
        if self.stop.is_triggered() {
            return true;
        }
        if !self.rules.has_any_set(&self.deck) {
            info!(deck = self.deck.len(), "no legal set left");
            return true;
        }
        false
    }

    /// Shuffle, fill the table, restart the countdown and open marking.
    pub fn deal(&mut self) {
        self.deck.shuffle(&mut self.rng);
        self.slot_order.shuffle(&mut self.rng);
        self.place_cards_on_table();
        self.reset_countdown();
        self.board.set_marking_enabled(true);
        if self.settings.hints {
            self.log_hints();
        }
    }

    /// Fill every empty slot from the front of the deck, in the current
    /// slot order. Returns how many cards were placed.
    pub fn place_cards_on_table(&mut self) -> usize {
        let mut placed = 0;
        for index in 0..self.slot_order.len() {
            if self.deck.is_empty() {
                break;
            }
            let slot = self.slot_order[index];
            if self.board.card_at(slot).is_some() {
                continue;
            }
            let card = self.deck.remove(0);
            if self.board.place_card(card, slot) {
                placed += 1;
            } else {
                warn!(card, slot, "card placement refused");
                self.deck.insert(0, card);
            }
        }
        placed
    }

    fn timer_loop(&mut self) {
        while !self.stop.is_triggered() && Instant::now() < self.reshuffle_at {
            let first = self.candidates.take_timeout(self.poll_interval());
            self.update_countdown();
            if let Some(candidate) = first {
                self.drain_candidates(candidate);
            }
            self.place_cards_on_table();
        }
        if !self.stop.is_triggered() {
            debug!("round timed out");
        }
    }

    /// How long to wait for a candidate before refreshing the countdown.
    pub fn poll_interval(&self) -> Duration {
        let remaining = self.remaining();
        let warning = self.settings.turn_timeout_warning;
        if remaining > warning {
            (remaining - warning).clamp(FINE_TICK, COARSE_TICK)
        } else {
            FINE_TICK
        }
    }

    /// Examine `first` and every candidate queued behind it.
    pub fn drain_candidates(&mut self, first: CandidateSet) {
        let mut next = Some(first);
        while let Some(candidate) = next {
            self.examine(candidate);
            next = self.candidates.try_take();
        }
    }

    /// Rule on one candidate and tell its player. A legal set is taken off
    /// the table, the freed slots are refilled and the countdown restarts.
    pub fn examine(&mut self, candidate: CandidateSet) -> Verdict {
        let verdict = if !self.board.is_still_valid(&candidate) {
            Verdict::Stale
        } else if self.rules.is_legal_set(&candidate.cards) {
            for slot in candidate.slots {
                self.board.remove_card(slot);
            }
            Verdict::Legal
        } else {
            Verdict::Illegal
        };
        debug!(player = candidate.player, cards = ?candidate.cards, ?verdict, "candidate examined");

        match self.seats.get(candidate.player) {
            Some(seat) => seat.deliver(verdict),
            None => warn!(player = candidate.player, "candidate from unknown player"),
        }

        if verdict == Verdict::Legal {
            self.slot_order.shuffle(&mut self.rng);
            self.place_cards_on_table();
            self.reset_countdown();
        }
        verdict
    }

    fn reset_countdown(&mut self) {
        self.reshuffle_at = Instant::now() + self.settings.turn_timeout;
        self.display.countdown(self.settings.turn_timeout, false);
    }

    fn update_countdown(&self) {
        let remaining = self.remaining();
        self.display
            .countdown(remaining, remaining < self.settings.turn_timeout_warning);
    }

    /// Close marking, answer anything still queued as stale, and return every
    /// card on the table to the deck.
    pub fn end_round(&mut self) {
        self.board.set_marking_enabled(false);
        self.answer_pending_as_stale();
        let reclaimed = self.board.reclaim_all_cards_to_deck(&mut self.deck);
        // A submission racing the marking switch can land during the reclaim.
        let late = self.answer_pending_as_stale();
        debug!(reclaimed, late, deck = self.deck.len(), "table reclaimed");
    }

    /// Answer every queued candidate with `Stale`. Returns how many there were.
    fn answer_pending_as_stale(&self) -> usize {
        let mut answered = 0;
        while let Some(candidate) = self.candidates.try_take() {
            if let Some(seat) = self.seats.get(candidate.player) {
                seat.deliver(Verdict::Stale);
            }
            answered += 1;
        }
        answered
    }

    fn log_hints(&self) {
        let cards: Vec<Card> = self
            .board
            .cards_on_table()
            .into_iter()
            .map(|(_, card)| card)
            .collect();
        for set in self.rules.find_sets(&cards, usize::MAX) {
            let mut slots: Vec<Slot> = set
                .iter()
                .filter_map(|&card| self.board.slot_of(card))
                .collect();
            slots.sort_unstable();
            info!(?slots, cards = ?set, "hint: set on table");
        }
    }

    /// Stop every player, wait for them, then publish the winners.
    fn finish(&mut self) -> GameSummary {
        self.board.set_marking_enabled(false);
        self.stop.trigger();
        self.candidates.close();

        // Reverse seat order, mirroring how the players were started.
        let seats: Vec<Seat> = self.seats.drain(..).rev().collect();
        let mut scores = vec![0; seats.len()];
        for seat in seats {
            let score = Arc::clone(&seat.score);
            let id = seat.id;
            seat.dismiss();
            if let Some(entry) = scores.get_mut(id) {
                *entry = score.load(Ordering::SeqCst);
            }
        }

        let summary = GameSummary::from_scores(scores);
        self.display.winners(&summary.winners);
        self.display.dispose();
        summary
    }
}
