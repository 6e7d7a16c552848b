use crate::core::models::molecule::Molecule;
use crate::core::scoring::bundle::ScoreBundle;
use crate::engine::state::Solution;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
#[error("no candidate recorded for run '{run_id}'")]
pub struct NotFoundError {
    pub run_id: String,
}

const DEFAULT_RETENTION: usize = 8;

#[derive(Debug)]
struct RunRecord {
    best: Solution,
    history: Vec<ScoreBundle>,
    /// Superseded best candidates, newest first, bounded by the retention
    /// window; older ones are discarded.
    superseded: VecDeque<Solution>,
}

/// Concurrent store of the best-known candidate and full score history per
/// optimization run.
///
/// The outer map is guarded by an `RwLock` and each run by its own `Mutex`,
/// which gives the required exclusivity: at most one writer per run_id at a
/// time, while reads and writes to other run_ids proceed concurrently. No
/// lock is ever held across a simulation call; callers record results after
/// an evaluation completes.
pub struct CandidateStore {
    runs: RwLock<HashMap<String, Arc<Mutex<RunRecord>>>>,
    retention: usize,
}

impl Default for CandidateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CandidateStore {
    pub fn new() -> Self {
        Self::with_retention(DEFAULT_RETENTION)
    }

    /// `retention` bounds how many superseded candidates are kept per run
    /// before being discarded.
    pub fn with_retention(retention: usize) -> Self {
        Self {
            runs: RwLock::new(HashMap::new()),
            retention,
        }
    }

    fn entry(&self, run_id: &str) -> Option<Arc<Mutex<RunRecord>>> {
        self.runs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(run_id)
            .cloned()
    }

    /// Idempotent upsert: appends to the run's history and replaces the best
    /// candidate only when the new clinical potential is strictly higher.
    pub fn record(&self, run_id: &str, candidate: &Molecule, scores: ScoreBundle) {
        let mut candidate = candidate.clone();
        candidate.scores = Some(scores);
        let solution = Solution { candidate, scores };

        let record = {
            let existing = self.entry(run_id);
            match existing {
                Some(record) => record,
                None => self
                    .runs
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .entry(run_id.to_string())
                    .or_insert_with(|| {
                        Arc::new(Mutex::new(RunRecord {
                            best: solution.clone(),
                            history: Vec::new(),
                            superseded: VecDeque::new(),
                        }))
                    })
                    .clone(),
            }
        };

        let mut record = record.lock().unwrap_or_else(PoisonError::into_inner);
        record.history.push(scores);
        if solution.clinical_potential() > record.best.clinical_potential() {
            let old = std::mem::replace(&mut record.best, solution);
            record.superseded.push_front(old);
            record.superseded.truncate(self.retention);
        }
    }

    /// The current best candidate for the run.
    pub fn best(&self, run_id: &str) -> Result<Solution, NotFoundError> {
        let record = self.entry(run_id).ok_or_else(|| NotFoundError {
            run_id: run_id.to_string(),
        })?;
        let record = record.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(record.best.clone())
    }

    /// The full ordered score history for the run.
    pub fn history(&self, run_id: &str) -> Result<Vec<ScoreBundle>, NotFoundError> {
        let record = self.entry(run_id).ok_or_else(|| NotFoundError {
            run_id: run_id.to_string(),
        })?;
        let record = record.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(record.history.clone())
    }

    /// Superseded candidates still inside the retention window, newest first.
    pub fn superseded(&self, run_id: &str) -> Result<Vec<Solution>, NotFoundError> {
        let record = self.entry(run_id).ok_or_else(|| NotFoundError {
            run_id: run_id.to_string(),
        })?;
        let record = record.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(record.superseded.iter().cloned().collect())
    }
}
