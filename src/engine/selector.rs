//! Random task selection with anti-repetition.

use super::fetcher::Scope;
use crate::api::types::Task;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub struct Selector {
    rng: StdRng,
}

impl Default for Selector {
    fn default() -> Self {
        Self::new()
    }
}

impl Selector {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Pick a task uniformly at random from `eligible`.
    ///
    /// The task with id `previous` is skipped as long as something else is
    /// left to pick. A pick that `scope` no longer admits is dropped and the
    /// draw repeats. Returns `None` only when nothing valid remains.
    pub fn select<'a>(
        &mut self,
        eligible: &'a [Task],
        previous: Option<u64>,
        scope: &Scope,
    ) -> Option<&'a Task> {
        let mut remaining: Vec<&'a Task> = eligible.iter().collect();

        while !remaining.is_empty() {
            let fresh: Vec<usize> = (0..remaining.len())
                .filter(|&i| Some(remaining[i].id) != previous)
                .collect();
            let idx = if fresh.is_empty() {
                // Only the previous task is left; repeating it is unavoidable.
                self.rng.gen_range(0..remaining.len())
            } else {
                fresh[self.rng.gen_range(0..fresh.len())]
            };

            let task = remaining[idx];
            if scope.admits(task) {
                return Some(task);
            }
            tracing::debug!(task_id = task.id, state = ?task.state, "pick failed validation, drawing again");
            remaining.swap_remove(idx);
        }

        None
    }
}
