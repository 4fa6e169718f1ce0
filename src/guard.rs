// src/guard.rs
//! Skip-if-busy flags. A blocked caller is dropped, never queued.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Single in-flight flag for a whole cycle.
#[derive(Debug, Default)]
pub struct CycleGuard {
    busy: AtomicBool,
}

impl CycleGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` while another permit is alive.
    pub fn try_enter(&self) -> Option<CyclePermit<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| CyclePermit { guard: self })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

pub struct CyclePermit<'a> {
    guard: &'a CycleGuard,
}

impl Drop for CyclePermit<'_> {
    fn drop(&mut self) {
        self.guard.busy.store(false, Ordering::Release);
    }
}

/// One in-flight flag per key (e.g. per vertical).
#[derive(Debug, Default)]
pub struct KeyedGuard {
    held: Mutex<HashSet<String>>,
}

impl KeyedGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_enter(&self, key: &str) -> Option<KeyedPermit<'_>> {
        let mut held = self.held.lock().unwrap_or_else(|p| p.into_inner());
        if !held.insert(key.to_string()) {
            return None;
        }
        Some(KeyedPermit {
            guard: self,
            key: key.to_string(),
        })
    }

    pub fn is_held(&self, key: &str) -> bool {
        self.held
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .contains(key)
    }
}

pub struct KeyedPermit<'a> {
    guard: &'a KeyedGuard,
    key: String,
}

impl Drop for KeyedPermit<'_> {
    fn drop(&mut self) {
        self.guard
            .held
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(&self.key);
    }
}
