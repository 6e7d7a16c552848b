use crate::core::models::molecule::Molecule;
use crate::core::models::reference::MutationReference;
use crate::core::quantum::circuit::build_molecular_circuit;
use crate::core::quantum::simulator::{
    CancelToken, EvalBudget, Executor, SimulationError, StateVectorSimulator,
};
use crate::core::scoring::bundle::ScoreBundle;
use crate::core::scoring::engine::Scorer;
use crate::engine::config::OptimizerConfig;
use crate::engine::error::EngineError;
use crate::engine::perturb::UpdateRule;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::state::{OptimizationRun, Phase, RunTracker, Termination};
use crate::engine::store::CandidateStore;
use rand::RngCore;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};

/// Runs one complete optimization against a single target mutation.
///
/// The run is keyed in the candidate store by the reference's mutation id.
/// The returned best candidate carries the maximum clinical potential
/// observed anywhere in the run's history, independent of the path the
/// search took.
///
/// Encoding and circuit-capacity failures indicate malformed input or
/// misconfiguration and surface as `Err`; simulation failures go through the
/// retry policy (drop one qubit per atom, retry once) and, if unrecoverable,
/// terminate the run with a `Failed` termination rather than an `Err`.
#[instrument(skip_all, name = "optimization_run", fields(target = %reference.mutation_id))]
pub fn run(
    initial: &Molecule,
    reference: &MutationReference,
    config: &OptimizerConfig,
    executor: &dyn Executor,
    store: &CandidateStore,
    reporter: &ProgressReporter,
    cancel: &CancelToken,
) -> Result<OptimizationRun, EngineError> {
    config
        .validate()
        .map_err(|e| EngineError::Config(e.to_string()))?;

    let run_id = reference.mutation_id.as_str();
    let wild_type = reference.wild_type_molecule();
    let reference_distribution = reference.reference_distribution();
    let scorer = Scorer::new(&config.weights, &reference_distribution);
    let rule = UpdateRule {
        local_step: config.local_step,
        nudge: config.nudge,
        restart_factor: config.restart_factor,
    };

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut tracker = RunTracker::new(run_id);
    let mut current = initial.clone();
    current.target = reference.mutation_id.clone();
    let mut effective_qpa = config.qubits_per_atom;

    let mut phase = Phase::Initialized;
    info!(
        ?phase,
        atoms = current.atom_count(),
        qubits_per_atom = effective_qpa,
        max_iterations = config.max_iterations,
        "starting optimization run"
    );
    reporter.report(Progress::RunStart {
        target: reference.mutation_id.clone(),
    });

    for iteration in 0..config.max_iterations {
        phase = Phase::Evaluating;
        debug!(iteration, ?phase, "evaluating candidate");

        let scores = match evaluate(
            &current,
            &wild_type,
            effective_qpa,
            config,
            executor,
            cancel,
            &mut rng,
            &scorer,
        ) {
            Ok(scores) => scores,
            Err(EngineError::Simulation { source }) => {
                if let SimulationError::Cancelled = source {
                    info!(iteration, "run cancelled by caller");
                    reporter.report(Progress::RunFinish);
                    return Ok(tracker
                        .finish(Termination::failed(format!("evaluation aborted: {source}"))));
                }
                if effective_qpa <= 1 {
                    warn!(iteration, error = %source, "simulation failed with no fidelity level left");
                    reporter.report(Progress::RunFinish);
                    return Ok(tracker.finish(Termination::failed(format!(
                        "simulation failed at {effective_qpa} qubit(s) per atom with no reduced-fidelity retry available: {source}"
                    ))));
                }

                effective_qpa -= 1;
                warn!(iteration, error = %source, qubits_per_atom = effective_qpa, "simulation failed; retrying at reduced fidelity");
                reporter.report(Progress::Retry {
                    qubits_per_atom: effective_qpa,
                });
                match evaluate(
                    &current,
                    &wild_type,
                    effective_qpa,
                    config,
                    executor,
                    cancel,
                    &mut rng,
                    &scorer,
                ) {
                    Ok(scores) => scores,
                    Err(EngineError::Simulation { source }) => {
                        warn!(iteration, error = %source, "retry at reduced fidelity failed");
                        reporter.report(Progress::RunFinish);
                        return Ok(tracker.finish(Termination::failed(format!(
                            "simulation failed after one reduced-fidelity retry at {effective_qpa} qubit(s) per atom: {source}"
                        ))));
                    }
                    Err(other) => return Err(other),
                }
            }
            Err(other) => return Err(other),
        };

        let is_new_best = tracker.record(&current, scores);
        store.record(run_id, &current, scores);
        reporter.report(Progress::Iteration {
            index: iteration,
            clinical_potential: scores.clinical_potential,
        });
        if is_new_best {
            debug!(iteration, clinical_potential = scores.clinical_potential, "new best candidate");
            reporter.report(Progress::NewBest {
                clinical_potential: scores.clinical_potential,
            });
        }

        if tracker.converged(config.convergence_window, config.convergence_epsilon) {
            phase = Phase::Converged;
            info!(iteration, ?phase, "run converged");
            reporter.report(Progress::RunFinish);
            return Ok(tracker.finish(Termination::converged(format!(
                "best clinical potential improved by less than {} over {} iterations",
                config.convergence_epsilon, config.convergence_window
            ))));
        }

        if iteration + 1 < config.max_iterations {
            phase = Phase::Updating;
            if tracker.stagnant_iterations() >= config.stagnation_window {
                debug!(iteration, ?phase, "stagnation restart: widening the search neighborhood");
                current = rule.widened(&current, &mut rng);
                tracker.reset_stagnation();
            } else {
                let best = tracker.best().map(|s| s.candidate.clone());
                current = rule.local(&current, best.as_ref(), &mut rng);
            }
        }
    }

    phase = Phase::MaxIterations;
    info!(?phase, "iteration budget exhausted");
    reporter.report(Progress::RunFinish);
    Ok(tracker.finish(Termination::max_iterations(format!(
        "iteration budget of {} exhausted",
        config.max_iterations
    ))))
}

/// One evaluation cycle: the candidate simulated alone in the mutant-site
/// context, then together with the wild-type site coordinates, then scored.
/// The budget is checked by the adapter between the two circuit executions.
#[allow(clippy::too_many_arguments)]
fn evaluate(
    candidate: &Molecule,
    wild_type: &Molecule,
    qubits_per_atom: usize,
    config: &OptimizerConfig,
    executor: &dyn Executor,
    cancel: &CancelToken,
    rng: &mut dyn RngCore,
    scorer: &Scorer,
) -> Result<ScoreBundle, EngineError> {
    let budget = EvalBudget::new(cancel.clone(), config.eval_timeout());

    let mutant_circuit = build_molecular_circuit(
        candidate,
        qubits_per_atom,
        config.interaction_cutoff,
        config.max_qubits,
    )?;
    let combined = candidate.joined(wild_type);
    let wild_type_circuit = build_molecular_circuit(
        &combined,
        qubits_per_atom,
        config.interaction_cutoff,
        config.max_qubits,
    )?;

    let mutant_context = executor.execute(&mutant_circuit, &budget, rng)?;
    let wild_type_context = executor.execute(&wild_type_circuit, &budget, rng)?;

    Ok(scorer.score(&mutant_context, &wild_type_context))
}

/// Runs independent optimizations for every target mutation in parallel.
///
/// Each run gets its own derived seed and its own simulator instance; the
/// only shared state is the candidate store, which serializes writers per
/// run id. Cancelling the shared token stops all runs at their next
/// checkpoint.
pub fn run_many(
    initial: &Molecule,
    references: &[MutationReference],
    config: &OptimizerConfig,
    store: &CandidateStore,
    reporter: &ProgressReporter,
    cancel: &CancelToken,
) -> Vec<Result<OptimizationRun, EngineError>> {
    references
        .par_iter()
        .enumerate()
        .map(|(index, reference)| {
            let mut run_config = config.clone();
            run_config.seed = config.seed.wrapping_add(index as u64);
            let simulator = StateVectorSimulator::new(
                run_config.exact_qubit_threshold,
                run_config.shot_count,
            );
            run(
                initial, reference, &run_config, &simulator, store, reporter, cancel,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::quantum::circuit::Circuit;
    use crate::core::quantum::simulator::SimulationResult;
    use crate::engine::state::TerminationKind;
    use std::collections::BTreeMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn reference() -> MutationReference {
        let mut distribution = BTreeMap::new();
        distribution.insert("000000".to_string(), 0.6);
        distribution.insert("110000".to_string(), 0.4);
        MutationReference {
            mutation_id: "T790M".to_string(),
            wild_type_coordinates: vec![(0.2, 0.1, 0.1, 0.0), (-0.1, 0.2, 0.1, 0.0)],
            reference_binding_distribution: distribution,
        }
    }

    fn initial_candidate() -> Molecule {
        Molecule::from_coordinates(
            "seed",
            &[(0.0, 0.0, 0.1, 0.1), (0.2, 0.1, 0.0, -0.1)],
        )
    }

    fn config(max_iterations: usize) -> OptimizerConfig {
        OptimizerConfig::builder()
            .qubits_per_atom(3)
            .interaction_cutoff(2.0)
            .shot_count(64)
            .max_iterations(max_iterations)
            .convergence_epsilon(0.0)
            .stagnation_window(3)
            .seed(11)
            .build()
            .unwrap()
    }

    fn simulator(config: &OptimizerConfig) -> StateVectorSimulator {
        StateVectorSimulator::new(config.exact_qubit_threshold, config.shot_count)
    }

    /// Adapter that fails every execution, counting attempts.
    struct FailingExecutor {
        attempts: AtomicUsize,
    }

    impl FailingExecutor {
        fn new() -> Self {
            Self {
                attempts: AtomicUsize::new(0),
            }
        }
    }

    impl Executor for FailingExecutor {
        fn execute(
            &self,
            _circuit: &Circuit,
            _budget: &EvalBudget,
            _rng: &mut dyn RngCore,
        ) -> Result<SimulationResult, SimulationError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(SimulationError::StateTooLarge {
                qubits: 64,
                limit: 22,
            })
        }
    }

    /// Adapter that returns the same distribution for every circuit, so no
    /// iteration after the first ever improves.
    struct ConstantExecutor {
        result: SimulationResult,
    }

    impl ConstantExecutor {
        fn new() -> Self {
            let sim = StateVectorSimulator::new(16, 64);
            let mut circuit = Circuit::new(2);
            circuit.push(crate::core::quantum::circuit::Gate::Ry {
                qubit: 0,
                angle: 1.0,
            });
            let result = sim
                .execute(
                    &circuit,
                    &EvalBudget::unbounded(),
                    &mut rand_chacha::ChaCha8Rng::seed_from_u64(0),
                )
                .unwrap();
            Self { result }
        }
    }

    impl Executor for ConstantExecutor {
        fn execute(
            &self,
            _circuit: &Circuit,
            _budget: &EvalBudget,
            _rng: &mut dyn RngCore,
        ) -> Result<SimulationResult, SimulationError> {
            Ok(self.result.clone())
        }
    }

    #[test]
    fn single_iteration_run_exhausts_the_budget() {
        let config = config(1);
        let store = CandidateStore::new();
        let run = run(
            &initial_candidate(),
            &reference(),
            &config,
            &simulator(&config),
            &store,
            &ProgressReporter::new(),
            &CancelToken::new(),
        )
        .unwrap();

        assert_eq!(run.termination.kind, TerminationKind::MaxIterations);
        assert_eq!(run.history.len(), 1);
        assert!(run.best.is_some());
        assert!(run.termination.detail.contains("budget of 1"));
    }

    #[test]
    fn best_candidate_dominates_the_whole_history() {
        let config = config(10);
        let store = CandidateStore::new();
        let run = run(
            &initial_candidate(),
            &reference(),
            &config,
            &simulator(&config),
            &store,
            &ProgressReporter::new(),
            &CancelToken::new(),
        )
        .unwrap();

        let best = run.best.as_ref().unwrap().clinical_potential();
        assert_eq!(run.history.len(), 10);
        for scores in &run.history {
            assert!(best >= scores.clinical_potential);
        }

        // The store agrees with the run result.
        let stored = store.best("T790M").unwrap();
        assert_eq!(stored.clinical_potential(), best);
        assert_eq!(store.history("T790M").unwrap().len(), 10);
    }

    #[test]
    fn identical_seeds_give_identical_runs() {
        let config = config(5);
        let a = run(
            &initial_candidate(),
            &reference(),
            &config,
            &simulator(&config),
            &CandidateStore::new(),
            &ProgressReporter::new(),
            &CancelToken::new(),
        )
        .unwrap();
        let b = run(
            &initial_candidate(),
            &reference(),
            &config,
            &simulator(&config),
            &CandidateStore::new(),
            &ProgressReporter::new(),
            &CancelToken::new(),
        )
        .unwrap();

        assert_eq!(a.history, b.history);
        assert_eq!(a.best, b.best);
    }

    #[test]
    fn loose_epsilon_converges_right_after_the_window_fills() {
        let mut config = config(50);
        config.convergence_epsilon = 10.0;
        config.convergence_window = 2;

        let run = run(
            &initial_candidate(),
            &reference(),
            &config,
            &simulator(&config),
            &CandidateStore::new(),
            &ProgressReporter::new(),
            &CancelToken::new(),
        )
        .unwrap();

        assert_eq!(run.termination.kind, TerminationKind::Converged);
        assert_eq!(run.history.len(), 3);
    }

    #[test]
    fn stagnant_search_widens_and_still_exhausts_the_budget() {
        let mut config = config(6);
        config.stagnation_window = 2;
        let store = CandidateStore::new();

        // Constant scores: the first evaluation is the only new best, the
        // stagnation counter fills twice, and both restart widenings run
        // without disturbing termination or history accounting.
        let run = run(
            &initial_candidate(),
            &reference(),
            &config,
            &ConstantExecutor::new(),
            &store,
            &ProgressReporter::new(),
            &CancelToken::new(),
        )
        .unwrap();

        assert_eq!(run.termination.kind, TerminationKind::MaxIterations);
        assert_eq!(run.history.len(), 6);
        let best = run.best.unwrap().clinical_potential();
        assert!(run
            .history
            .iter()
            .all(|scores| scores.clinical_potential == best));
    }

    #[test]
    fn failing_adapter_retries_once_at_reduced_fidelity_then_fails() {
        let config = config(10);
        let executor = FailingExecutor::new();
        let events = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            events.lock().unwrap().push(event);
        }));

        let run = run(
            &initial_candidate(),
            &reference(),
            &config,
            &executor,
            &CandidateStore::new(),
            &reporter,
            &CancelToken::new(),
        )
        .unwrap();

        assert_eq!(run.termination.kind, TerminationKind::Failed);
        assert!(run.history.is_empty());
        assert!(run.best.is_none());
        // One attempt at 3 qubits per atom, exactly one retry at 2.
        assert_eq!(executor.attempts.load(Ordering::SeqCst), 2);

        let retries: Vec<usize> = events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                Progress::Retry { qubits_per_atom } => Some(*qubits_per_atom),
                _ => None,
            })
            .collect();
        assert_eq!(retries, vec![2]);
        assert!(run.termination.detail.contains("after one reduced-fidelity retry"));
    }

    #[test]
    fn single_qubit_fidelity_fails_without_retrying() {
        let mut config = config(10);
        config.qubits_per_atom = 1;
        let executor = FailingExecutor::new();

        let run = run(
            &initial_candidate(),
            &reference(),
            &config,
            &executor,
            &CandidateStore::new(),
            &ProgressReporter::new(),
            &CancelToken::new(),
        )
        .unwrap();

        assert_eq!(run.termination.kind, TerminationKind::Failed);
        assert_eq!(executor.attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cancelled_token_fails_the_run_without_retry() {
        let config = config(10);
        let cancel = CancelToken::new();
        cancel.cancel();

        let run = run(
            &initial_candidate(),
            &reference(),
            &config,
            &simulator(&config),
            &CandidateStore::new(),
            &ProgressReporter::new(),
            &cancel,
        )
        .unwrap();

        assert_eq!(run.termination.kind, TerminationKind::Failed);
        assert!(run.termination.detail.contains("aborted"));
        assert!(run.history.is_empty());
    }

    #[test]
    fn non_finite_initial_coordinates_are_a_hard_error() {
        let config = config(5);
        let broken = Molecule::from_coordinates("seed", &[(f64::NAN, 0.0, 0.0, 0.0)]);

        let result = run(
            &broken,
            &reference(),
            &config,
            &simulator(&config),
            &CandidateStore::new(),
            &ProgressReporter::new(),
            &CancelToken::new(),
        );
        assert!(matches!(result, Err(EngineError::Encoding { .. })));
    }

    #[test]
    fn combined_context_overflowing_capacity_is_a_hard_error() {
        let mut config = config(5);
        // Candidate alone fits (6 qubits); candidate + wild-type (12) does not.
        config.max_qubits = 8;

        let result = run(
            &initial_candidate(),
            &reference(),
            &config,
            &simulator(&config),
            &CandidateStore::new(),
            &ProgressReporter::new(),
            &CancelToken::new(),
        );
        assert!(matches!(result, Err(EngineError::CircuitSize { .. })));
    }

    #[test]
    fn run_many_optimizes_each_target_independently() {
        let config = config(3);
        let store = CandidateStore::new();
        let second = MutationReference {
            mutation_id: "L858R".to_string(),
            ..reference()
        };
        let references = vec![reference(), second];

        let results = run_many(
            &initial_candidate(),
            &references,
            &config,
            &store,
            &ProgressReporter::new(),
            &CancelToken::new(),
        );

        assert_eq!(results.len(), 2);
        for (result, reference) in results.iter().zip(&references) {
            let run = result.as_ref().unwrap();
            assert_eq!(run.target, reference.mutation_id);
            assert_eq!(run.history.len(), 3);
            assert!(store.best(&reference.mutation_id).is_ok());
        }
    }
}
