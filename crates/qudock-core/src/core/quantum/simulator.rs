use super::circuit::{Circuit, Gate};
use nalgebra::Complex;
use rand::RngCore;
use rand::distributions::{Distribution, WeightedIndex};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

/// Hard allocation ceiling for the dense state vector, independent of the
/// configured circuit capacity. 2^22 amplitudes is 64 MiB of Complex<f64>.
const MAX_STATE_QUBITS: usize = 22;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum SimulationError {
    #[error("gate touches qubit {qubit} but the circuit declares only {qubit_count} qubits")]
    QubitOutOfRange { qubit: usize, qubit_count: usize },
    #[error("{qubits}-qubit state vector exceeds the {limit}-qubit simulation limit")]
    StateTooLarge { qubits: usize, limit: usize },
    #[error("shot-based sampling requires at least one shot")]
    ZeroShots,
    #[error("measurement distribution has no probability mass to sample from")]
    DegenerateDistribution,
    #[error("evaluation deadline exceeded")]
    Timeout,
    #[error("evaluation cancelled by caller")]
    Cancelled,
}

/// Cooperative cancellation flag shared between an optimization run and its
/// caller. Cloning shares the flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Time and cancellation budget for a single evaluation.
///
/// The budget is checked between circuit executions, never mid-execution:
/// simulation is treated as a pure, timeboxed external computation that is
/// not interrupted once started.
#[derive(Debug, Clone)]
pub struct EvalBudget {
    cancel: CancelToken,
    deadline: Option<Instant>,
}

impl EvalBudget {
    pub fn new(cancel: CancelToken, timeout: Option<Duration>) -> Self {
        Self {
            cancel,
            deadline: timeout.map(|t| Instant::now() + t),
        }
    }

    /// A budget that never cancels and never times out.
    pub fn unbounded() -> Self {
        Self {
            cancel: CancelToken::new(),
            deadline: None,
        }
    }

    pub fn checkpoint(&self) -> Result<(), SimulationError> {
        if self.cancel.is_cancelled() {
            return Err(SimulationError::Cancelled);
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(SimulationError::Timeout);
            }
        }
        Ok(())
    }
}

/// How a result was obtained: exactly from the state vector, or estimated
/// from repeated sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Exact,
    Sampled { shots: usize },
}

/// Measurement statistics from one circuit execution.
///
/// Ephemeral by design: produced and consumed within a single evaluation
/// cycle and never persisted. The outcome map is sparse (zero-probability
/// basis states are pruned) and iterates in deterministic basis order.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationResult {
    qubit_count: usize,
    mode: ExecutionMode,
    outcomes: BTreeMap<u64, f64>,
    standard_error: f64,
}

impl SimulationResult {
    pub fn qubit_count(&self) -> usize {
        self.qubit_count
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Standard error of the ground-state probability estimate. Zero in
    /// exact mode; callers must treat sampled-mode scores as estimates with
    /// this statistical noise.
    pub fn standard_error(&self) -> f64 {
        self.standard_error
    }

    pub fn outcomes(&self) -> impl Iterator<Item = (u64, f64)> + '_ {
        self.outcomes.iter().map(|(&basis, &p)| (basis, p))
    }

    pub fn probability_of(&self, basis: u64) -> f64 {
        self.outcomes.get(&basis).copied().unwrap_or(0.0)
    }

    /// Probability of the all-zeros basis state.
    pub fn ground_state_probability(&self) -> f64 {
        self.probability_of(0)
    }

    /// Probability that the given qubit measures |1>.
    pub fn one_probability(&self, qubit: usize) -> f64 {
        let mask = 1u64 << qubit;
        self.outcomes()
            .filter(|(basis, _)| basis & mask != 0)
            .map(|(_, p)| p)
            .sum()
    }

    /// Mean and variance of the excitation count (number of |1> qubits)
    /// under the measurement distribution.
    pub fn excitation_moments(&self) -> (f64, f64) {
        let mut mean = 0.0;
        let mut second = 0.0;
        for (basis, p) in self.outcomes() {
            let ones = basis.count_ones() as f64;
            mean += p * ones;
            second += p * ones * ones;
        }
        (mean, (second - mean * mean).max(0.0))
    }

    /// Splits the probability mass by the parity of the lowest qubit,
    /// yielding the (electrostatic, van-der-Waals) diagnostic components.
    pub fn parity_split(&self) -> (f64, f64) {
        let mut even = 0.0;
        let mut odd = 0.0;
        for (basis, p) in self.outcomes() {
            if basis & 1 == 0 {
                even += p;
            } else {
                odd += p;
            }
        }
        let total = even + odd;
        if total > 0.0 {
            (even / total, odd / total)
        } else {
            (0.0, 0.0)
        }
    }
}

/// Execution seam between the optimizer and the simulation backend.
///
/// Implementations must be stateless across calls; any randomness comes from
/// the injected generator so that runs are reproducible from a seed.
pub trait Executor: Send + Sync {
    fn execute(
        &self,
        circuit: &Circuit,
        budget: &EvalBudget,
        rng: &mut dyn RngCore,
    ) -> Result<SimulationResult, SimulationError>;
}

/// Dense state-vector backend.
///
/// Circuits up to `exact_qubit_threshold` qubits are evaluated exactly and
/// deterministically from |amplitude|^2; wider circuits fall back to
/// shot-based sampling of the same distribution and carry statistical noise.
#[derive(Debug, Clone)]
pub struct StateVectorSimulator {
    exact_qubit_threshold: usize,
    shot_count: usize,
}

impl StateVectorSimulator {
    pub fn new(exact_qubit_threshold: usize, shot_count: usize) -> Self {
        Self {
            exact_qubit_threshold,
            shot_count,
        }
    }

    fn probabilities(&self, circuit: &Circuit) -> Result<Vec<f64>, SimulationError> {
        let n = circuit.qubit_count();
        if n > MAX_STATE_QUBITS {
            return Err(SimulationError::StateTooLarge {
                qubits: n,
                limit: MAX_STATE_QUBITS,
            });
        }
        for gate in circuit.gates() {
            if gate.max_qubit() >= n {
                return Err(SimulationError::QubitOutOfRange {
                    qubit: gate.max_qubit(),
                    qubit_count: n,
                });
            }
        }

        let mut state = vec![Complex::new(0.0, 0.0); 1 << n];
        state[0] = Complex::new(1.0, 0.0);
        for gate in circuit.gates() {
            apply_gate(&mut state, *gate);
        }
        Ok(state.iter().map(|amp| amp.norm_sqr()).collect())
    }
}

impl Executor for StateVectorSimulator {
    fn execute(
        &self,
        circuit: &Circuit,
        budget: &EvalBudget,
        rng: &mut dyn RngCore,
    ) -> Result<SimulationResult, SimulationError> {
        budget.checkpoint()?;

        let n = circuit.qubit_count();
        let probabilities = self.probabilities(circuit)?;

        let result = if n <= self.exact_qubit_threshold {
            debug!(qubits = n, "exact state-vector execution");
            let outcomes = probabilities
                .iter()
                .enumerate()
                .filter(|&(_, &p)| p > 1e-12)
                .map(|(basis, &p)| (basis as u64, p))
                .collect();
            SimulationResult {
                qubit_count: n,
                mode: ExecutionMode::Exact,
                outcomes,
                standard_error: 0.0,
            }
        } else {
            if self.shot_count == 0 {
                return Err(SimulationError::ZeroShots);
            }
            debug!(qubits = n, shots = self.shot_count, "shot-based execution");
            let support: Vec<(u64, f64)> = probabilities
                .iter()
                .enumerate()
                .filter(|&(_, &p)| p > 0.0)
                .map(|(basis, &p)| (basis as u64, p))
                .collect();
            let weights = WeightedIndex::new(support.iter().map(|(_, p)| *p))
                .map_err(|_| SimulationError::DegenerateDistribution)?;

            let mut counts: BTreeMap<u64, u64> = BTreeMap::new();
            for _ in 0..self.shot_count {
                let (basis, _) = support[weights.sample(rng)];
                *counts.entry(basis).or_insert(0) += 1;
            }

            let shots = self.shot_count as f64;
            let outcomes: BTreeMap<u64, f64> = counts
                .into_iter()
                .map(|(basis, count)| (basis, count as f64 / shots))
                .collect();
            let p0 = outcomes.get(&0).copied().unwrap_or(0.0);
            SimulationResult {
                qubit_count: n,
                mode: ExecutionMode::Sampled {
                    shots: self.shot_count,
                },
                outcomes,
                standard_error: (p0 * (1.0 - p0) / shots).sqrt(),
            }
        };

        // A deadline that expired during execution still counts against this
        // evaluation, even though execution itself is never interrupted.
        if let Some(deadline) = budget.deadline {
            if Instant::now() >= deadline {
                return Err(SimulationError::Timeout);
            }
        }
        Ok(result)
    }
}

fn apply_gate(state: &mut [Complex<f64>], gate: Gate) {
    match gate {
        Gate::X { qubit } => {
            let mask = 1usize << qubit;
            for i in 0..state.len() {
                if i & mask == 0 {
                    state.swap(i, i | mask);
                }
            }
        }
        Gate::Ry { qubit, angle } => {
            let mask = 1usize << qubit;
            let (sin, cos) = (angle / 2.0).sin_cos();
            for i in 0..state.len() {
                if i & mask == 0 {
                    let j = i | mask;
                    let a = state[i];
                    let b = state[j];
                    state[i] = a * cos - b * sin;
                    state[j] = a * sin + b * cos;
                }
            }
        }
        Gate::Rz { qubit, angle } => {
            let mask = 1usize << qubit;
            let lower = Complex::from_polar(1.0, -angle / 2.0);
            let upper = Complex::from_polar(1.0, angle / 2.0);
            for (i, amp) in state.iter_mut().enumerate() {
                *amp *= if i & mask == 0 { lower } else { upper };
            }
        }
        Gate::Cz { control, target } => {
            let mask = (1usize << control) | (1usize << target);
            for (i, amp) in state.iter_mut().enumerate() {
                if i & mask == mask {
                    *amp = -*amp;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::f64::consts::PI;

    fn rng(seed: u64) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(seed)
    }

    #[test]
    fn empty_circuit_leaves_the_ground_state() {
        let sim = StateVectorSimulator::new(16, 128);
        let result = sim
            .execute(&Circuit::new(2), &EvalBudget::unbounded(), &mut rng(0))
            .unwrap();
        assert_eq!(result.mode(), ExecutionMode::Exact);
        assert!((result.ground_state_probability() - 1.0).abs() < 1e-12);
        assert_eq!(result.standard_error(), 0.0);
    }

    #[test]
    fn x_gate_flips_the_qubit() {
        let mut circuit = Circuit::new(1);
        circuit.push(Gate::X { qubit: 0 });
        let sim = StateVectorSimulator::new(16, 128);
        let result = sim
            .execute(&circuit, &EvalBudget::unbounded(), &mut rng(0))
            .unwrap();
        assert!((result.probability_of(1) - 1.0).abs() < 1e-12);
        assert!((result.one_probability(0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn ry_half_pi_gives_uniform_split() {
        let mut circuit = Circuit::new(1);
        circuit.push(Gate::Ry {
            qubit: 0,
            angle: PI / 2.0,
        });
        let sim = StateVectorSimulator::new(16, 128);
        let result = sim
            .execute(&circuit, &EvalBudget::unbounded(), &mut rng(0))
            .unwrap();
        assert!((result.probability_of(0) - 0.5).abs() < 1e-12);
        assert!((result.probability_of(1) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn exact_mode_is_deterministic_across_calls() {
        let mut circuit = Circuit::new(3);
        circuit.push(Gate::Ry {
            qubit: 0,
            angle: 0.7,
        });
        circuit.push(Gate::Ry {
            qubit: 2,
            angle: 1.3,
        });
        circuit.push(Gate::Cz {
            control: 0,
            target: 2,
        });
        let sim = StateVectorSimulator::new(16, 128);
        let a = sim
            .execute(&circuit, &EvalBudget::unbounded(), &mut rng(7))
            .unwrap();
        let b = sim
            .execute(&circuit, &EvalBudget::unbounded(), &mut rng(7))
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn sampled_mode_is_reproducible_from_the_seed() {
        let mut circuit = Circuit::new(2);
        circuit.push(Gate::Ry {
            qubit: 0,
            angle: PI / 3.0,
        });
        circuit.push(Gate::Ry {
            qubit: 1,
            angle: PI / 5.0,
        });
        // Threshold below the width forces sampling.
        let sim = StateVectorSimulator::new(1, 256);
        let a = sim
            .execute(&circuit, &EvalBudget::unbounded(), &mut rng(42))
            .unwrap();
        let b = sim
            .execute(&circuit, &EvalBudget::unbounded(), &mut rng(42))
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(a.mode(), ExecutionMode::Sampled { shots: 256 });
        assert!(a.standard_error() > 0.0);
    }

    #[test]
    fn sampled_probabilities_sum_to_one() {
        let mut circuit = Circuit::new(2);
        circuit.push(Gate::Ry {
            qubit: 0,
            angle: 1.0,
        });
        let sim = StateVectorSimulator::new(1, 500);
        let result = sim
            .execute(&circuit, &EvalBudget::unbounded(), &mut rng(3))
            .unwrap();
        let total: f64 = result.outcomes().map(|(_, p)| p).sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn zero_shots_in_sampled_mode_is_an_error() {
        let sim = StateVectorSimulator::new(0, 0);
        let result = sim.execute(&Circuit::new(1), &EvalBudget::unbounded(), &mut rng(0));
        assert_eq!(result.unwrap_err(), SimulationError::ZeroShots);
    }

    #[test]
    fn out_of_range_qubit_is_a_malformed_circuit() {
        let mut circuit = Circuit::new(1);
        circuit.push(Gate::X { qubit: 3 });
        let sim = StateVectorSimulator::new(16, 128);
        let result = sim.execute(&circuit, &EvalBudget::unbounded(), &mut rng(0));
        assert_eq!(
            result.unwrap_err(),
            SimulationError::QubitOutOfRange {
                qubit: 3,
                qubit_count: 1
            }
        );
    }

    #[test]
    fn oversized_state_vector_is_rejected() {
        let sim = StateVectorSimulator::new(16, 128);
        let result = sim.execute(
            &Circuit::new(MAX_STATE_QUBITS + 1),
            &EvalBudget::unbounded(),
            &mut rng(0),
        );
        assert!(matches!(
            result.unwrap_err(),
            SimulationError::StateTooLarge { .. }
        ));
    }

    #[test]
    fn cancelled_budget_short_circuits() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let budget = EvalBudget::new(cancel, None);
        let sim = StateVectorSimulator::new(16, 128);
        let result = sim.execute(&Circuit::new(1), &budget, &mut rng(0));
        assert_eq!(result.unwrap_err(), SimulationError::Cancelled);
    }

    #[test]
    fn expired_deadline_is_a_timeout() {
        let budget = EvalBudget::new(CancelToken::new(), Some(Duration::ZERO));
        let sim = StateVectorSimulator::new(16, 128);
        let result = sim.execute(&Circuit::new(1), &budget, &mut rng(0));
        assert_eq!(result.unwrap_err(), SimulationError::Timeout);
    }

    #[test]
    fn excitation_moments_match_a_known_state() {
        let mut circuit = Circuit::new(2);
        circuit.push(Gate::X { qubit: 0 });
        circuit.push(Gate::X { qubit: 1 });
        let sim = StateVectorSimulator::new(16, 128);
        let result = sim
            .execute(&circuit, &EvalBudget::unbounded(), &mut rng(0))
            .unwrap();
        let (mean, variance) = result.excitation_moments();
        assert!((mean - 2.0).abs() < 1e-12);
        assert!(variance.abs() < 1e-12);
    }

    #[test]
    fn parity_split_separates_even_and_odd_mass() {
        let mut circuit = Circuit::new(1);
        circuit.push(Gate::Ry {
            qubit: 0,
            angle: PI / 2.0,
        });
        let sim = StateVectorSimulator::new(16, 128);
        let result = sim
            .execute(&circuit, &EvalBudget::unbounded(), &mut rng(0))
            .unwrap();
        let (even, odd) = result.parity_split();
        assert!((even - 0.5).abs() < 1e-12);
        assert!((odd - 0.5).abs() < 1e-12);
    }
}
