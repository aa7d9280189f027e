//! Tracing extensions for ARAP energy evaluation.
//!
//! The library never installs a subscriber. Enable output in your application:
//!
//! ```rust,ignore
//! use tracing_subscriber::{fmt, prelude::*, EnvFilter};
//!
//! tracing_subscriber::registry()
//!     .with(fmt::layer())
//!     .with(EnvFilter::from_default_env())
//!     .init();
//!
//! // RUST_LOG=mesh_arap=debug for per-call energy breakdowns
//! ```
//!
//! # Targets
//!
//! - `mesh_arap::timing`: operation start (debug) and duration (info)
//! - `mesh_arap::energy`: energy breakdown per evaluation (debug)
//! - `mesh_arap::rotation`: degenerate accumulators (debug, from
//!   [`log_degenerate_vertices`]); SVD fallbacks (warn, from the rotation solve)
//! - `mesh_arap::gradient`: gradient norms (debug)
//! - `mesh_arap::perf`: fine-grained sections (trace)

use std::time::Instant;
use tracing::span::EnteredSpan;
use tracing::{debug, info, trace};

use crate::energy::EnergyBreakdown;

/// A performance timer that logs duration on drop.
///
/// The `arap_operation` span stays entered until the timer is dropped, so
/// events logged during the evaluation carry the graph dimensions.
///
/// ```rust,ignore
/// use mesh_arap::tracing_ext::OperationTimer;
///
/// fn evaluate(vertices: usize, edges: usize) {
///     let _timer = OperationTimer::with_context("arap_energy", vertices, edges);
///     // ... do work ...
/// } // Timer logs duration when dropped
/// ```
pub struct OperationTimer {
    name: &'static str,
    start: Instant,
    _span: EnteredSpan,
}

impl OperationTimer {
    /// Create a timer with the graph dimensions as context fields.
    pub fn with_context(name: &'static str, vertex_count: usize, edge_count: usize) -> Self {
        let span = tracing::info_span!(
            "arap_operation",
            operation = name,
            vertices = vertex_count,
            edges = edge_count
        );
        debug!(
            target: "mesh_arap::timing",
            operation = name,
            vertices = vertex_count,
            edges = edge_count,
            "Starting operation"
        );
        Self {
            name,
            start: Instant::now(),
            _span: span.entered(),
        }
    }

    /// Get the elapsed time.
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for OperationTimer {
    fn drop(&mut self) {
        let elapsed_ms = self.elapsed_ms();
        info!(
            target: "mesh_arap::timing",
            operation = self.name,
            elapsed_ms = format!("{:.3}", elapsed_ms),
            "Operation completed"
        );
    }
}

/// Log the terms of one energy evaluation.
pub fn log_energy_breakdown(breakdown: &EnergyBreakdown) {
    debug!(
        target: "mesh_arap::energy",
        rigidity = breakdown.rigidity,
        regularization = breakdown.regularization,
        energy = breakdown.energy,
        "ARAP energy evaluated"
    );
}

/// Log vertices whose rotation fell back to the identity, at debug level.
///
/// Every vertex of an edgeless graph is degenerate; this stays at debug.
pub fn log_degenerate_vertices(degenerate: &[usize], vertex_count: usize) {
    if degenerate.is_empty() {
        return;
    }
    debug!(
        target: "mesh_arap::rotation",
        degenerate = degenerate.len(),
        vertices = vertex_count,
        first = degenerate[0],
        "Degenerate accumulators resolved to identity rotation"
    );
}

/// Log the size of a computed gradient.
pub fn log_gradient_norm(vert_new_norm: f64, vert_ref_norm: f64) {
    debug!(
        target: "mesh_arap::gradient",
        vert_new_norm = vert_new_norm,
        vert_ref_norm = vert_ref_norm,
        "ARAP gradient evaluated"
    );
}

/// Log a performance-critical section.
///
/// Returns a guard that logs when dropped.
#[must_use]
pub fn log_perf_section(name: &'static str) -> impl Drop {
    struct PerfGuard {
        name: &'static str,
        start: Instant,
    }
    impl Drop for PerfGuard {
        fn drop(&mut self) {
            let elapsed = self.start.elapsed();
            trace!(
                target: "mesh_arap::perf",
                section = self.name,
                elapsed_us = elapsed.as_micros(),
                "Performance section completed"
            );
        }
    }
    PerfGuard {
        name,
        start: Instant::now(),
    }
}
