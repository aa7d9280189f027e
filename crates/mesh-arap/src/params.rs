//! Parameters for ARAP energy evaluation.
//!
//! The defaults reproduce the reference formulation exactly:
//! `E = 0.01 * (sum ||r_e||^2 + 1e-6 * ||V_ref - V_q||^2)`.
//!
//! With the `params-config` feature, parameters can be loaded from and saved
//! to TOML or JSON:
//!
//! ```toml
//! regularization_weight = 1e-6
//! energy_scale = 0.01
//! parallel_threshold = 4096
//! ```

use crate::error::{ArapError, ArapResult};

/// Default weight of the `||V_ref - V_q||^2` regularization term.
pub const DEFAULT_REGULARIZATION_WEIGHT: f64 = 1e-6;

/// Default normalization applied to the summed energy.
pub const DEFAULT_ENERGY_SCALE: f64 = 0.01;

/// Parameters for ARAP energy evaluation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "params-config",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct ArapParams {
    /// Weight of the translation regularizer (lambda).
    pub regularization_weight: f64,

    /// Fixed normalization constant multiplied into the final energy.
    pub energy_scale: f64,

    /// Accumulators with a Frobenius norm at or below this value are treated
    /// as degenerate and resolve to the identity rotation.
    /// 0.0 means only exactly-zero accumulators are degenerate.
    pub degenerate_tolerance: f64,

    /// Convergence epsilon for the per-vertex SVD.
    pub svd_epsilon: f64,

    /// Iteration cap for the per-vertex SVD. A solve that does not converge
    /// falls back to the identity rotation.
    pub svd_max_iterations: usize,

    /// Vertex count at which the batched rotation solve moves onto the
    /// rayon thread pool.
    pub parallel_threshold: usize,

    /// Reject NaN/Infinity coordinates before evaluating.
    pub validate_coordinates: bool,
}

impl Default for ArapParams {
    fn default() -> Self {
        Self {
            regularization_weight: DEFAULT_REGULARIZATION_WEIGHT,
            energy_scale: DEFAULT_ENERGY_SCALE,
            degenerate_tolerance: 0.0,
            svd_epsilon: f64::EPSILON,
            svd_max_iterations: 1000,
            parallel_threshold: 4096,
            validate_coordinates: true,
        }
    }
}

impl ArapParams {
    /// Create params with the reference defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the regularization weight (lambda).
    pub fn with_regularization_weight(mut self, weight: f64) -> Self {
        self.regularization_weight = weight;
        self
    }

    /// Disable the translation regularizer.
    pub fn without_regularization(mut self) -> Self {
        self.regularization_weight = 0.0;
        self
    }

    /// Set the energy normalization constant.
    pub fn with_energy_scale(mut self, scale: f64) -> Self {
        self.energy_scale = scale;
        self
    }

    /// Set the degenerate-accumulator tolerance.
    pub fn with_degenerate_tolerance(mut self, tolerance: f64) -> Self {
        self.degenerate_tolerance = tolerance;
        self
    }

    /// Set the SVD iteration cap.
    pub fn with_svd_max_iterations(mut self, max_iterations: usize) -> Self {
        self.svd_max_iterations = max_iterations;
        self
    }

    /// Set the vertex count at which rotation solves run in parallel.
    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    /// Always solve rotations on the calling thread.
    pub fn sequential(mut self) -> Self {
        self.parallel_threshold = usize::MAX;
        self
    }

    /// Skip the NaN/Infinity scan of the input positions.
    pub fn without_coordinate_validation(mut self) -> Self {
        self.validate_coordinates = false;
        self
    }

    /// Check that every parameter is in range.
    ///
    /// # Errors
    ///
    /// Returns [`ArapError::InvalidParameter`] for negative or non-finite
    /// weights and tolerances.
    pub fn validate(&self) -> ArapResult<()> {
        check_non_negative("regularization_weight", self.regularization_weight)?;
        check_non_negative("energy_scale", self.energy_scale)?;
        check_non_negative("degenerate_tolerance", self.degenerate_tolerance)?;
        if !(self.svd_epsilon.is_finite() && self.svd_epsilon > 0.0) {
            return Err(ArapError::invalid_parameter(
                "svd_epsilon",
                format!("must be finite and positive, got {}", self.svd_epsilon),
            ));
        }
        Ok(())
    }
}

fn check_non_negative(name: &'static str, value: f64) -> ArapResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ArapError::invalid_parameter(
            name,
            format!("must be finite and non-negative, got {}", value),
        ))
    }
}

// =========================================================================
// Parameter files
// =========================================================================

/// Errors that can occur when loading or saving parameter files.
#[cfg(feature = "params-config")]
#[derive(Debug, thiserror::Error)]
pub enum ParamsConfigError {
    /// I/O error reading or writing file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
    /// TOML serialization error.
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(feature = "params-config")]
impl ArapParams {
    /// Load parameters from a TOML string. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or doesn't match the schema.
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Load parameters from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file can't be read or the TOML is invalid.
    pub fn from_toml_file(path: impl AsRef<std::path::Path>) -> Result<Self, ParamsConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Ok(toml::from_str(&contents)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Save parameters to a TOML file.
    pub fn save_toml(&self, path: impl AsRef<std::path::Path>) -> Result<(), ParamsConfigError> {
        let toml_str = self.to_toml()?;
        std::fs::write(path, toml_str)?;
        Ok(())
    }

    /// Load parameters from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json_str)
    }

    /// Serialize to a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
