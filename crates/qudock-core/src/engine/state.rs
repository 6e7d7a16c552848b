use crate::core::models::molecule::Molecule;
use crate::core::scoring::bundle::ScoreBundle;
use serde::Serialize;

/// Phases of the optimizer's state machine. The three non-terminal phases
/// cycle `Initialized -> Evaluating -> Updating -> Evaluating ...` until one
/// of the terminal phases is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Initialized,
    Evaluating,
    Updating,
    Converged,
    MaxIterations,
    Failed,
}

/// Machine-readable termination kind of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TerminationKind {
    Converged,
    MaxIterations,
    Failed,
}

/// Why a run ended: the machine-readable kind plus a human-readable detail
/// string. No terminal state is recorded without both.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Termination {
    pub kind: TerminationKind,
    pub detail: String,
}

impl Termination {
    pub fn converged(detail: impl Into<String>) -> Self {
        Self {
            kind: TerminationKind::Converged,
            detail: detail.into(),
        }
    }

    pub fn max_iterations(detail: impl Into<String>) -> Self {
        Self {
            kind: TerminationKind::MaxIterations,
            detail: detail.into(),
        }
    }

    pub fn failed(detail: impl Into<String>) -> Self {
        Self {
            kind: TerminationKind::Failed,
            detail: detail.into(),
        }
    }
}

/// A scored candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Solution {
    pub candidate: Molecule,
    pub scores: ScoreBundle,
}

impl Solution {
    pub fn clinical_potential(&self) -> f64 {
        self.scores.clinical_potential
    }
}

/// The exported result of one optimization run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationRun {
    pub target: String,
    /// Every score bundle produced, in evaluation order.
    pub history: Vec<ScoreBundle>,
    /// The best-scoring candidate observed, `None` only when no evaluation
    /// ever succeeded.
    pub best: Option<Solution>,
    pub termination: Termination,
}

/// Mutable bookkeeping for a run in flight: history, monotonic best-so-far
/// tracking, the stagnation counter, and the sliding convergence window.
#[derive(Debug)]
pub struct RunTracker {
    target: String,
    history: Vec<ScoreBundle>,
    best_so_far: Vec<f64>,
    best: Option<Solution>,
    stagnant: usize,
}

impl RunTracker {
    pub fn new(target: &str) -> Self {
        Self {
            target: target.to_string(),
            history: Vec::new(),
            best_so_far: Vec::new(),
            best: None,
            stagnant: 0,
        }
    }

    /// Records one evaluation. Returns true when the candidate is a new best.
    ///
    /// The best-so-far series is monotone by construction, independent of
    /// whether the search itself improves monotonically.
    pub fn record(&mut self, candidate: &Molecule, scores: ScoreBundle) -> bool {
        self.history.push(scores);

        let is_new_best = self
            .best
            .as_ref()
            .map(|best| scores.clinical_potential > best.clinical_potential())
            .unwrap_or(true);

        if is_new_best {
            let mut candidate = candidate.clone();
            candidate.scores = Some(scores);
            self.best = Some(Solution { candidate, scores });
            self.stagnant = 0;
        } else {
            self.stagnant += 1;
        }

        let best_clinical = self
            .best
            .as_ref()
            .map(|b| b.clinical_potential())
            .unwrap_or(f64::NEG_INFINITY);
        self.best_so_far.push(best_clinical);

        is_new_best
    }

    pub fn history(&self) -> &[ScoreBundle] {
        &self.history
    }

    pub fn best(&self) -> Option<&Solution> {
        self.best.as_ref()
    }

    /// Consecutive evaluations without a new best.
    pub fn stagnant_iterations(&self) -> usize {
        self.stagnant
    }

    /// Resets the stagnation counter after the search has widened its
    /// neighborhood in response.
    pub fn reset_stagnation(&mut self) {
        self.stagnant = 0;
    }

    /// True once the best score has improved by less than `epsilon` across
    /// the last `window` iterations. Needs at least `window + 1` recorded
    /// evaluations to judge.
    pub fn converged(&self, window: usize, epsilon: f64) -> bool {
        let n = self.best_so_far.len();
        if n <= window {
            return false;
        }
        let improvement = self.best_so_far[n - 1] - self.best_so_far[n - 1 - window];
        improvement < epsilon
    }

    pub fn finish(self, termination: Termination) -> OptimizationRun {
        OptimizationRun {
            target: self.target,
            history: self.history,
            best: self.best,
            termination,
        }
    }
}
