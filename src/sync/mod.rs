//! Blocking primitives shared by the dealer and player threads: the two-tier
//! admission lock, the per-player action queue, the candidate queue and the
//! stop signal.

mod action_queue;
mod admission;
mod candidate_queue;
mod stop;

pub use action_queue::{ActionQueue, ACTION_QUEUE_CAPACITY};
pub use admission::{AdmissionLock, DealerGuard, PlayerGuard};
pub use candidate_queue::CandidateQueue;
pub use stop::StopSignal;
