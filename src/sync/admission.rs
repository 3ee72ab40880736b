use parking_lot::{Condvar, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::ops::{Deref, DerefMut};

#[derive(Debug, Default)]
struct Gate {
    active_players: usize,
    dealer_active: bool,
    dealers_waiting: usize,
}

/// Two-tier gate over shared state: many concurrent player-class holders, or
/// exactly one dealer-class holder.
///
/// Once a dealer announces intent, new player-class acquisitions yield until
/// the dealer has entered and left, so a steady stream of players cannot
/// starve it. The dealer flag stays raised for the whole critical section.
///
/// The gate decides who may enter; the inner `RwLock` only provides the
/// references and is never contended while the gate is respected.
#[derive(Debug)]
pub struct AdmissionLock<T> {
    gate: Mutex<Gate>,
    turnstile: Condvar,
    data: RwLock<T>,
}

impl<T> AdmissionLock<T> {
    pub fn new(data: T) -> Self {
        AdmissionLock {
            gate: Mutex::new(Gate::default()),
            turnstile: Condvar::new(),
            data: RwLock::new(data),
        }
    }

    fn gate(&self) -> MutexGuard<'_, Gate> {
        self.gate.lock()
    }

    /// Enter as a player. Blocks while a dealer holds or is waiting for the lock.
    pub fn acquire_player(&self) -> PlayerGuard<'_, T> {
        let mut gate = self.gate();
        while gate.dealer_active || gate.dealers_waiting > 0 {
            self.turnstile.wait(&mut gate);
        }
        gate.active_players += 1;
        drop(gate);

        let data = self.data.read();
        PlayerGuard { lock: self, data }
    }

    /// Enter as the dealer. Blocks until no player and no other dealer is inside.
    pub fn acquire_dealer(&self) -> DealerGuard<'_, T> {
        let mut gate = self.gate();
        gate.dealers_waiting += 1;
        while gate.active_players > 0 || gate.dealer_active {
            self.turnstile.wait(&mut gate);
        }
        gate.dealers_waiting -= 1;
        gate.dealer_active = true;
        drop(gate);

        let data = self.data.write();
        DealerGuard { lock: self, data }
    }

    fn release_player(&self) {
        let mut gate = self.gate();
        gate.active_players -= 1;
        if gate.active_players == 0 {
            self.turnstile.notify_all();
        }
    }

    fn release_dealer(&self) {
        let mut gate = self.gate();
        gate.dealer_active = false;
        self.turnstile.notify_all();
    }

    /// Number of player-class holders currently inside.
    pub fn active_players(&self) -> usize {
        self.gate().active_players
    }

    /// True while a dealer-class holder is inside.
    pub fn dealer_active(&self) -> bool {
        self.gate().dealer_active
    }
}

/// Shared access held by a player. Released on drop.
pub struct PlayerGuard<'a, T> {
    lock: &'a AdmissionLock<T>,
    data: RwLockReadGuard<'a, T>,
}

impl<T> Deref for PlayerGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.data
    }
}

impl<T> Drop for PlayerGuard<'_, T> {
    fn drop(&mut self) {
        // The read guard field is dropped right after; an admitted dealer
        // waits on it at most for that instant.
        self.lock.release_player();
    }
}

/// Exclusive access held by the dealer. Released on drop.
pub struct DealerGuard<'a, T> {
    lock: &'a AdmissionLock<T>,
    data: RwLockWriteGuard<'a, T>,
}

impl<T> Deref for DealerGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.data
    }
}

impl<T> DerefMut for DealerGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.data
    }
}

impl<T> Drop for DealerGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.release_dealer();
    }
}
