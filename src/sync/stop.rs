use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Game-wide termination flag, cloned into every actor thread.
///
/// Created clear at startup and raised once at shutdown; it is never lowered.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag. Returns `true` for the call that actually raised it.
    pub fn trigger(&self) -> bool {
        !self.0.swap(true, Ordering::SeqCst)
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_is_shared_and_sticky() {
        let stop = StopSignal::new();
        let clone = stop.clone();
        assert!(!clone.is_triggered());
        assert!(stop.trigger());
        assert!(!clone.trigger());
        assert!(clone.is_triggered());
    }
}
