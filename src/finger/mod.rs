//! Finger Tables
//!
//! Each layer keeps an array of fingers. A finger points at a keyspace
//! location discovered by a random walk and is backed by the trail that walk
//! built. Slots are written round-robin, so the slot overwritten next is
//! always the one written longest ago.

use crate::trail::TrailKey;
use crate::HashCode;
use rand::Rng;
use std::fmt;

/// Position of a finger: layer and slot index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FingerSlot {
    pub layer: u16,
    pub index: usize,
}

impl fmt::Display for FingerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.layer, self.index)
    }
}

/// A pointer to a remote keyspace location.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Finger {
    /// Location reached by the walk. Meaningless until `valid`.
    pub destination: HashCode,
    /// Trail the walk built.
    pub trail: TrailKey,
    /// Set once the walk response arrived.
    pub valid: bool,
}

/// Fingers of one layer.
#[derive(Debug)]
pub struct FingerTable {
    layer: u16,
    fingers: Vec<Option<Finger>>,
    /// Size the array grows to.
    capacity: usize,
    /// Next slot to write.
    walk_offset: usize,
    number_valid: usize,
    /// Whether `sorted` reflects the current valid fingers.
    is_sorted: bool,
    /// Slot indices of valid fingers ordered by destination.
    sorted: Vec<usize>,
}

impl FingerTable {
    /// Create an empty table that grows up to `capacity` slots.
    pub fn new(layer: u16, capacity: usize) -> Self {
        Self {
            layer,
            fingers: Vec::new(),
            capacity: capacity.max(1),
            walk_offset: 0,
            number_valid: 0,
            is_sorted: true,
            sorted: Vec::new(),
        }
    }

    pub fn layer(&self) -> u16 {
        self.layer
    }

    /// Current array length.
    pub fn len(&self) -> usize {
        self.fingers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fingers.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn walk_offset(&self) -> usize {
        self.walk_offset
    }

    /// Number of fingers whose walk has completed.
    pub fn number_valid(&self) -> usize {
        self.number_valid
    }

    pub fn get(&self, index: usize) -> Option<&Finger> {
        self.fingers.get(index).and_then(|f| f.as_ref())
    }

    /// Slot the next walk will write, growing the array if below capacity.
    pub fn next_slot(&mut self) -> usize {
        if self.fingers.len() < self.capacity {
            self.fingers.resize(self.capacity, None);
        }
        if self.walk_offset >= self.fingers.len() {
            self.walk_offset = 0;
        }
        self.walk_offset
    }

    /// Remove whatever occupies `index`.
    pub fn take(&mut self, index: usize) -> Option<Finger> {
        let finger = self.fingers.get_mut(index)?.take()?;
        if finger.valid {
            self.number_valid -= 1;
            self.is_sorted = false;
        }
        Some(finger)
    }

    /// Put a pending finger for `trail` into `index` and advance the cursor.
    ///
    /// The slot must be empty; returns false otherwise.
    pub fn attach(&mut self, index: usize, trail: TrailKey) -> bool {
        match self.fingers.get_mut(index) {
            Some(slot @ None) => {
                *slot = Some(Finger {
                    destination: HashCode::ZERO,
                    trail,
                    valid: false,
                });
                self.walk_offset = (index + 1) % self.fingers.len();
                true
            }
            _ => false,
        }
    }

    /// Mark the finger in `index` valid with `destination`.
    ///
    /// Returns false if the slot is not a pending finger backed by `trail`.
    pub fn complete(&mut self, index: usize, trail: TrailKey, destination: HashCode) -> bool {
        match self.fingers.get_mut(index) {
            Some(Some(finger)) if finger.trail == trail && !finger.valid => {
                finger.destination = destination;
                finger.valid = true;
                self.number_valid += 1;
                self.is_sorted = false;
                true
            }
            _ => false,
        }
    }

    /// Empty `index` if it is backed by `trail`.
    ///
    /// Returns the removed finger, or `None` if the slot held something else.
    pub fn clear(&mut self, index: usize, trail: TrailKey) -> Option<Finger> {
        match self.get(index) {
            Some(finger) if finger.trail == trail => self.take(index),
            _ => None,
        }
    }

    /// Iterate over valid fingers with their slot index.
    pub fn iter_valid(&self) -> impl Iterator<Item = (usize, &Finger)> {
        self.fingers
            .iter()
            .enumerate()
            .filter_map(|(i, f)| f.as_ref().filter(|f| f.valid).map(|f| (i, f)))
    }

    /// The `k`-th valid finger in slot order, zero-based.
    pub fn select_kth_valid(&self, k: usize) -> Option<&Finger> {
        self.iter_valid().nth(k).map(|(_, f)| f)
    }

    /// A valid finger chosen uniformly at random.
    pub fn random_valid(&self) -> Option<&Finger> {
        if self.number_valid == 0 {
            return None;
        }
        let k = rand::rng().random_range(0..self.number_valid);
        self.select_kth_valid(k)
    }

    /// The valid finger whose destination is the first at or after `key`
    /// going clockwise around the keyspace.
    pub fn closest(&mut self, key: &HashCode) -> Option<Finger> {
        self.ensure_sorted();
        if self.sorted.is_empty() {
            return None;
        }
        let pos = self.sorted.partition_point(|&i| {
            self.fingers[i]
                .as_ref()
                .is_some_and(|f| f.destination < *key)
        });
        let index = self.sorted[pos % self.sorted.len()];
        self.fingers[index]
    }

    fn ensure_sorted(&mut self) {
        if self.is_sorted {
            return;
        }
        let mut sorted: Vec<(HashCode, usize)> = self
            .iter_valid()
            .map(|(i, f)| (f.destination, i))
            .collect();
        sorted.sort();
        self.sorted = sorted.into_iter().map(|(_, i)| i).collect();
        self.is_sorted = true;
    }
}
