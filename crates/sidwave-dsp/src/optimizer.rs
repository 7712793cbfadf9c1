//! Stochastic local search over [`ParameterSet`]s.
//!
//! Greedy hill climb with lateral moves: perturb the current best, keep the
//! candidate when its score is no worse. No temperature, no restarts; it
//! can sit in a local optimum indefinitely, and it never terminates on its
//! own. The search is an [`Iterator`] of accepted improvements; the caller
//! decides when to stop consuming, or raises a [`StopSignal`] from another
//! thread.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info, trace};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::params::ParameterSet;
use crate::reference::ReferenceTable;
use crate::scorer;
use crate::waveform::WaveformType;

/// Cooperative stop flag, checked between iterations.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Current best candidate and its score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchState {
    pub params: ParameterSet,
    pub score: u32,
}

/// One accepted candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Improvement {
    /// 1-based count of candidates tried when this one was accepted.
    pub iteration: u64,
    pub params: ParameterSet,
    pub score: u32,
}

impl fmt::Display for Improvement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "// current score {}", self.score)?;
        write!(f, "{}", self.params)
    }
}

/// Seeded generator for reproducible runs; OS entropy when `seed` is `None`.
pub fn search_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(s) => ChaCha8Rng::seed_from_u64(s),
        None => ChaCha8Rng::from_entropy(),
    }
}

pub struct Optimizer<'a, R: Rng> {
    wave: WaveformType,
    reference: &'a ReferenceTable,
    rng: R,
    state: SearchState,
    initial_score: u32,
    iterations: u64,
    iteration_limit: Option<u64>,
    stop: StopSignal,
}

impl<'a, R: Rng> Optimizer<'a, R> {
    /// Score `initial` against `reference`; it becomes the current best.
    pub fn new(initial: ParameterSet, wave: WaveformType, reference: &'a ReferenceTable, rng: R) -> Self {
        let score = scorer::score(&initial, wave, reference);
        info!("wave {wave}: initial score {score}");
        Self {
            wave,
            reference,
            rng,
            state: SearchState {
                params: initial,
                score,
            },
            initial_score: score,
            iterations: 0,
            iteration_limit: None,
            stop: StopSignal::new(),
        }
    }

    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    /// Give up after `limit` candidates in total.
    pub fn with_iteration_limit(mut self, limit: u64) -> Self {
        self.iteration_limit = Some(limit);
        self
    }

    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    pub fn best(&self) -> &SearchState {
        &self.state
    }

    pub fn initial_score(&self) -> u32 {
        self.initial_score
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    pub fn wave(&self) -> WaveformType {
        self.wave
    }

    fn exhausted(&self) -> bool {
        self.stop.is_stopped() || self.iteration_limit.is_some_and(|limit| self.iterations >= limit)
    }
}

impl<R: Rng> Iterator for Optimizer<'_, R> {
    type Item = Improvement;

    /// Try candidates until one is accepted. `None` once stopped.
    fn next(&mut self) -> Option<Improvement> {
        while !self.exhausted() {
            self.iterations += 1;
            let candidate = self.state.params.perturb(&mut self.rng);
            let score = scorer::score(&candidate, self.wave, self.reference);

            if score <= self.state.score {
                debug!(
                    "wave {}: iteration {} accepted, score {} -> {}",
                    self.wave, self.iterations, self.state.score, score
                );
                self.state = SearchState {
                    params: candidate,
                    score,
                };
                return Some(Improvement {
                    iteration: self.iterations,
                    params: candidate,
                    score,
                });
            }
            trace!("wave {}: iteration {} rejected, score {score}", self.wave, self.iterations);
        }
        None
    }
}
