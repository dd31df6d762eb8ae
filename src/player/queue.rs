use std::{collections::VecDeque, sync::Arc};

use rand::seq::SliceRandom;

use super::state::LoopMode;
use crate::song::Song;

/// Ordered play queue. Position 0 is the song that is or will be playing.
#[derive(Debug, Default)]
pub struct SongQueue {
    entries: VecDeque<Arc<Song>>,
}

impl SongQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn head(&self) -> Option<&Arc<Song>> {
        self.entries.front()
    }

    pub fn push(&mut self, song: Arc<Song>) {
        self.entries.push_back(song);
    }

    pub fn remove(&mut self, index: usize) -> Option<Arc<Song>> {
        self.entries.remove(index)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn to_vec(&self) -> Vec<Arc<Song>> {
        self.entries.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Song>> {
        self.entries.iter()
    }

    /// Moves `n` positions forward under `mode` and returns the entries that
    /// left the queue for good.
    ///
    /// - `Off`: the first `n` entries are dropped (all of them if `n` exceeds the length).
    /// - `All`: the first `n` entries move to the tail, in order.
    /// - `Single`: nothing moves.
    pub fn advance(&mut self, n: usize, mode: LoopMode) -> Vec<Arc<Song>> {
        match mode {
            LoopMode::Off => {
                let n = n.min(self.entries.len());
                self.entries.drain(..n).collect()
            }
            LoopMode::All => {
                if !self.entries.is_empty() {
                    let n = n % self.entries.len();
                    self.entries.rotate_left(n);
                }
                Vec::new()
            }
            LoopMode::Single => Vec::new(),
        }
    }

    /// Brings the last `n` entries to the front, most recent first in line.
    ///
    /// There is no play history: "previous" means whatever was most recently
    /// rotated to the tail.
    pub fn rotate_back(&mut self, n: usize) {
        if !self.entries.is_empty() {
            let n = n % self.entries.len();
            self.entries.rotate_right(n);
        }
    }

    /// Shuffles everything after `pinned` leading entries.
    pub fn shuffle(&mut self, pinned: usize) {
        let pinned = pinned.min(self.entries.len());
        let slice = self.entries.make_contiguous();
        slice[pinned..].shuffle(&mut rand::thread_rng());
    }
}
