use crate::core::scoring::bundle::ScoringWeights;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

fn invalid(name: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidParameter {
        name,
        reason: reason.into(),
    }
}

/// Complete optimizer configuration.
///
/// Every recognized option is an explicit, validated field; there is no
/// pass-through dictionary. Construct via [`OptimizerConfigBuilder`] or
/// deserialize from TOML with [`OptimizerConfig::from_toml_str`]; both paths
/// run the same validation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptimizerConfig {
    /// Width of each atom's qubit register.
    pub qubits_per_atom: usize,
    /// Entangling cutoff distance in Angstroms (inclusive).
    pub interaction_cutoff: f64,
    /// Shots per execution when sampling above the exact threshold.
    pub shot_count: usize,
    /// Widest circuit still simulated exactly from the state vector.
    #[serde(default = "defaults::exact_qubit_threshold")]
    pub exact_qubit_threshold: usize,
    /// Declared simulator capacity; wider circuits are a construction error.
    #[serde(default = "defaults::max_qubits")]
    pub max_qubits: usize,
    #[serde(default)]
    pub weights: ScoringWeights,
    pub max_iterations: usize,
    pub convergence_epsilon: f64,
    /// Sliding window (iterations) over which convergence is judged.
    #[serde(default = "defaults::convergence_window")]
    pub convergence_window: usize,
    /// Consecutive non-improving iterations before the search widens.
    pub stagnation_window: usize,
    /// Half-width of the local uniform perturbation step, in Angstroms.
    #[serde(default = "defaults::local_step")]
    pub local_step: f64,
    /// Fraction of the displacement toward the best-known geometry applied
    /// per update.
    #[serde(default = "defaults::nudge")]
    pub nudge: f64,
    /// Multiplier widening the perturbation neighborhood on stagnation.
    #[serde(default = "defaults::restart_factor")]
    pub restart_factor: f64,
    #[serde(default)]
    pub seed: u64,
    /// Per-evaluation timeout in milliseconds; `None` disables the deadline.
    #[serde(default)]
    pub eval_timeout_ms: Option<u64>,
}

mod defaults {
    pub(super) fn exact_qubit_threshold() -> usize {
        16
    }
    pub(super) fn max_qubits() -> usize {
        20
    }
    pub(super) fn convergence_window() -> usize {
        4
    }
    pub(super) fn local_step() -> f64 {
        0.05
    }
    pub(super) fn nudge() -> f64 {
        0.25
    }
    pub(super) fn restart_factor() -> f64 {
        5.0
    }
}

impl OptimizerConfig {
    pub fn builder() -> OptimizerConfigBuilder {
        OptimizerConfigBuilder::new()
    }

    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: OptimizerConfig =
            toml::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn eval_timeout(&self) -> Option<Duration> {
        self.eval_timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.qubits_per_atom == 0 {
            return Err(invalid("qubits_per_atom", "must be at least 1"));
        }
        if !(self.interaction_cutoff > 0.0) {
            return Err(invalid("interaction_cutoff", "must be positive"));
        }
        if self.shot_count == 0 {
            return Err(invalid("shot_count", "must be at least 1"));
        }
        if self.max_qubits == 0 {
            return Err(invalid("max_qubits", "must be at least 1"));
        }
        if self.max_iterations == 0 {
            return Err(invalid("max_iterations", "must be at least 1"));
        }
        if !(self.convergence_epsilon >= 0.0) {
            return Err(invalid("convergence_epsilon", "must be non-negative"));
        }
        if self.convergence_window == 0 {
            return Err(invalid("convergence_window", "must be at least 1"));
        }
        if self.stagnation_window == 0 {
            return Err(invalid("stagnation_window", "must be at least 1"));
        }
        if !(self.local_step > 0.0) {
            return Err(invalid("local_step", "must be positive"));
        }
        if !(0.0..=1.0).contains(&self.nudge) {
            return Err(invalid("nudge", "must lie in [0, 1]"));
        }
        if !(self.restart_factor >= 1.0) {
            return Err(invalid("restart_factor", "must be at least 1"));
        }
        self.weights
            .validate()
            .map_err(|e| invalid("weights", e.to_string()))?;
        Ok(())
    }
}

#[derive(Default)]
pub struct OptimizerConfigBuilder {
    qubits_per_atom: Option<usize>,
    interaction_cutoff: Option<f64>,
    shot_count: Option<usize>,
    exact_qubit_threshold: Option<usize>,
    max_qubits: Option<usize>,
    weights: Option<ScoringWeights>,
    max_iterations: Option<usize>,
    convergence_epsilon: Option<f64>,
    convergence_window: Option<usize>,
    stagnation_window: Option<usize>,
    local_step: Option<f64>,
    nudge: Option<f64>,
    restart_factor: Option<f64>,
    seed: Option<u64>,
    eval_timeout_ms: Option<u64>,
}

impl OptimizerConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn qubits_per_atom(mut self, n: usize) -> Self {
        self.qubits_per_atom = Some(n);
        self
    }
    pub fn interaction_cutoff(mut self, cutoff: f64) -> Self {
        self.interaction_cutoff = Some(cutoff);
        self
    }
    pub fn shot_count(mut self, shots: usize) -> Self {
        self.shot_count = Some(shots);
        self
    }
    pub fn exact_qubit_threshold(mut self, threshold: usize) -> Self {
        self.exact_qubit_threshold = Some(threshold);
        self
    }
    pub fn max_qubits(mut self, capacity: usize) -> Self {
        self.max_qubits = Some(capacity);
        self
    }
    pub fn weights(mut self, weights: ScoringWeights) -> Self {
        self.weights = Some(weights);
        self
    }
    pub fn max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = Some(iterations);
        self
    }
    pub fn convergence_epsilon(mut self, epsilon: f64) -> Self {
        self.convergence_epsilon = Some(epsilon);
        self
    }
    pub fn convergence_window(mut self, window: usize) -> Self {
        self.convergence_window = Some(window);
        self
    }
    pub fn stagnation_window(mut self, window: usize) -> Self {
        self.stagnation_window = Some(window);
        self
    }
    pub fn local_step(mut self, step: f64) -> Self {
        self.local_step = Some(step);
        self
    }
    pub fn nudge(mut self, nudge: f64) -> Self {
        self.nudge = Some(nudge);
        self
    }
    pub fn restart_factor(mut self, factor: f64) -> Self {
        self.restart_factor = Some(factor);
        self
    }
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
    pub fn eval_timeout_ms(mut self, millis: u64) -> Self {
        self.eval_timeout_ms = Some(millis);
        self
    }

    pub fn build(self) -> Result<OptimizerConfig, ConfigError> {
        let config = OptimizerConfig {
            qubits_per_atom: self
                .qubits_per_atom
                .ok_or(ConfigError::MissingParameter("qubits_per_atom"))?,
            interaction_cutoff: self
                .interaction_cutoff
                .ok_or(ConfigError::MissingParameter("interaction_cutoff"))?,
            shot_count: self
                .shot_count
                .ok_or(ConfigError::MissingParameter("shot_count"))?,
            exact_qubit_threshold: self
                .exact_qubit_threshold
                .unwrap_or_else(defaults::exact_qubit_threshold),
            max_qubits: self.max_qubits.unwrap_or_else(defaults::max_qubits),
            weights: self.weights.unwrap_or_default(),
            max_iterations: self
                .max_iterations
                .ok_or(ConfigError::MissingParameter("max_iterations"))?,
            convergence_epsilon: self
                .convergence_epsilon
                .ok_or(ConfigError::MissingParameter("convergence_epsilon"))?,
            convergence_window: self
                .convergence_window
                .unwrap_or_else(defaults::convergence_window),
            stagnation_window: self
                .stagnation_window
                .ok_or(ConfigError::MissingParameter("stagnation_window"))?,
            local_step: self.local_step.unwrap_or_else(defaults::local_step),
            nudge: self.nudge.unwrap_or_else(defaults::nudge),
            restart_factor: self
                .restart_factor
                .unwrap_or_else(defaults::restart_factor),
            seed: self.seed.unwrap_or_default(),
            eval_timeout_ms: self.eval_timeout_ms,
        };
        config.validate()?;
        Ok(config)
    }
}
