//! Error types for ARAP energy evaluation with rich diagnostics.
//!
//! Every failure is surfaced to the caller before any computation starts:
//! the energy pipeline is pure, so there are no transient failures and
//! nothing is retried.
//!
//! # Error Codes
//!
//! Each error has a unique code in the format `ARAP-XXXX`:
//! - `ARAP-2xxx`: Input validation errors (vertex counts, edge indices, coordinates)
//! - `ARAP-3xxx`: Configuration errors (shape collaborator is missing data)
//! - `ARAP-4xxx`: Parameter errors
//!
//! # Example
//!
//! ```
//! use mesh_arap::{ArapError, ErrorCode};
//!
//! let err = ArapError::vertex_count_mismatch(4, 3);
//! assert_eq!(err.code(), ErrorCode::VertexCountMismatch);
//! assert_eq!(err.code().as_str(), "ARAP-2001");
//! ```

use miette::Diagnostic;
use thiserror::Error;

/// Result type alias for ARAP operations.
pub type ArapResult<T> = Result<T, ArapError>;

/// Machine-readable error codes for ARAP operations.
///
/// Codes follow the pattern `ARAP-XXXX` where:
/// - 2xxx = Validation errors
/// - 3xxx = Configuration errors
/// - 4xxx = Parameter errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Validation errors (2xxx)
    /// ARAP-2001: Reference and query vertex counts differ
    VertexCountMismatch = 2001,
    /// ARAP-2002: Edge references a vertex outside the vertex set
    InvalidEdgeIndex = 2002,
    /// ARAP-2003: Vertex has NaN or Infinity coordinate
    InvalidCoordinate = 2003,

    // Configuration errors (3xxx)
    /// ARAP-3001: Shape exposes no neighbor graph
    MissingNeighborGraph = 3001,
    /// ARAP-3002: Shape exposes no Hessian/Laplacian
    MissingHessian = 3002,

    // Parameter errors (4xxx)
    /// ARAP-4001: Energy parameter out of range
    InvalidParameter = 4001,
}

impl ErrorCode {
    /// Returns the error code as a string in the format `ARAP-XXXX`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::VertexCountMismatch => "ARAP-2001",
            ErrorCode::InvalidEdgeIndex => "ARAP-2002",
            ErrorCode::InvalidCoordinate => "ARAP-2003",
            ErrorCode::MissingNeighborGraph => "ARAP-3001",
            ErrorCode::MissingHessian => "ARAP-3002",
            ErrorCode::InvalidParameter => "ARAP-4001",
        }
    }

    /// Returns true for errors caused by malformed input arrays.
    pub fn is_validation(&self) -> bool {
        (*self as u32) / 1000 == 2
    }

    /// Returns true for errors caused by a misconfigured shape collaborator.
    pub fn is_configuration(&self) -> bool {
        (*self as u32) / 1000 == 3
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Recovery suggestions for ARAP errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoverySuggestion {
    /// Check the caller's input arrays.
    CheckInputs { checks: Vec<String> },
    /// Provide the missing data on the shape object.
    ConfigureShape { missing: String },
    /// Adjust parameters for the operation.
    AdjustParameters { parameters: Vec<(String, String)> },
}

impl std::fmt::Display for RecoverySuggestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecoverySuggestion::CheckInputs { checks } => {
                write!(f, "Check the input arrays for: {}", checks.join(", "))
            }
            RecoverySuggestion::ConfigureShape { missing } => {
                write!(f, "Attach a {} to the shape before evaluating", missing)
            }
            RecoverySuggestion::AdjustParameters { parameters } => {
                let params: Vec<String> = parameters
                    .iter()
                    .map(|(k, v)| format!("{} = {}", k, v))
                    .collect();
                write!(f, "Try adjusting: {}", params.join(", "))
            }
        }
    }
}

/// Errors that can occur while evaluating the ARAP energy.
///
/// Each error variant includes:
/// - A human-readable message
/// - A machine-readable error code
/// - Recovery suggestions
#[derive(Debug, Error, Diagnostic)]
pub enum ArapError {
    /// Reference and query configurations have different vertex counts.
    #[error(
        "vertex count mismatch: reference has {reference} vertices, query has {query} vertices"
    )]
    #[diagnostic(
        code(arap::validation::vertex_count),
        help("Both configurations must describe the same mesh with matching vertex correspondence.")
    )]
    VertexCountMismatch { reference: usize, query: usize },

    /// An edge references a vertex index outside the vertex set.
    #[error(
        "invalid edge index: edge {edge_index} references vertex {vertex_index}, but the shape only has {vertex_count} vertices"
    )]
    #[diagnostic(
        code(arap::validation::edge_index),
        help("The neighbor graph must be built against the same vertex array as the positions.")
    )]
    InvalidEdgeIndex {
        edge_index: usize,
        vertex_index: u32,
        vertex_count: usize,
    },

    /// Invalid coordinate value (NaN or Infinity).
    #[error("invalid coordinate at vertex {vertex_index}: {coordinate} is {value}")]
    #[diagnostic(
        code(arap::validation::coordinate),
        help("Check for numerical blow-up in the optimizer step that produced these positions.")
    )]
    InvalidCoordinate {
        vertex_index: usize,
        coordinate: &'static str,
        value: f64,
    },

    /// The shape exposes no neighbor graph.
    #[error("shape has no neighbor graph")]
    #[diagnostic(
        code(arap::config::neighbors),
        help("Attach the precomputed edge list to the shape; it is never synthesized.")
    )]
    MissingNeighborGraph,

    /// The shape exposes no Hessian/Laplacian.
    #[error("shape has no neighbor Hessian")]
    #[diagnostic(
        code(arap::config::hessian),
        help("Attach the precomputed Laplacian/Hessian to the shape; it is never synthesized.")
    )]
    MissingHessian,

    /// A parameter is out of range.
    #[error("invalid parameter {name}: {details}")]
    #[diagnostic(code(arap::params::invalid))]
    InvalidParameter { name: &'static str, details: String },
}

impl ArapError {
    /// Returns the machine-readable error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            ArapError::VertexCountMismatch { .. } => ErrorCode::VertexCountMismatch,
            ArapError::InvalidEdgeIndex { .. } => ErrorCode::InvalidEdgeIndex,
            ArapError::InvalidCoordinate { .. } => ErrorCode::InvalidCoordinate,
            ArapError::MissingNeighborGraph => ErrorCode::MissingNeighborGraph,
            ArapError::MissingHessian => ErrorCode::MissingHessian,
            ArapError::InvalidParameter { .. } => ErrorCode::InvalidParameter,
        }
    }

    /// Returns a recovery suggestion for this error.
    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        match self {
            ArapError::VertexCountMismatch { .. } => RecoverySuggestion::CheckInputs {
                checks: vec!["vertex correspondence".into(), "array lengths".into()],
            },
            ArapError::InvalidEdgeIndex { .. } => RecoverySuggestion::CheckInputs {
                checks: vec!["neighbor graph indices".into(), "0-based indexing".into()],
            },
            ArapError::InvalidCoordinate { .. } => RecoverySuggestion::CheckInputs {
                checks: vec!["non-finite coordinates".into()],
            },
            ArapError::MissingNeighborGraph => RecoverySuggestion::ConfigureShape {
                missing: "neighbor graph".into(),
            },
            ArapError::MissingHessian => RecoverySuggestion::ConfigureShape {
                missing: "neighbor Hessian".into(),
            },
            ArapError::InvalidParameter { name, .. } => RecoverySuggestion::AdjustParameters {
                parameters: vec![((*name).into(), "a finite, non-negative value".into())],
            },
        }
    }

    // Constructor helpers for common error patterns

    /// Create a VertexCountMismatch error.
    pub fn vertex_count_mismatch(reference: usize, query: usize) -> Self {
        ArapError::VertexCountMismatch { reference, query }
    }

    /// Create an InvalidEdgeIndex error.
    pub fn invalid_edge_index(edge_index: usize, vertex_index: u32, vertex_count: usize) -> Self {
        ArapError::InvalidEdgeIndex {
            edge_index,
            vertex_index,
            vertex_count,
        }
    }

    /// Create an InvalidCoordinate error.
    pub fn invalid_coordinate(vertex_index: usize, coordinate: &'static str, value: f64) -> Self {
        ArapError::InvalidCoordinate {
            vertex_index,
            coordinate,
            value,
        }
    }

    /// Create an InvalidParameter error.
    pub fn invalid_parameter(name: &'static str, details: impl Into<String>) -> Self {
        ArapError::InvalidParameter {
            name,
            details: details.into(),
        }
    }
}
