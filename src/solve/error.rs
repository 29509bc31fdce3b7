//! Error taxonomy for the solution strategies.

use thiserror::Error;

use crate::model::NetworkError;

/// Failures surfaced by the strategies and the built-in solver.
///
/// Non-convergence of the distributed loop is deliberately *not* an error;
/// it is reported through
/// [`DistributedResult`](crate::solve::coordinator::DistributedResult).
#[derive(Debug, Error)]
pub enum SolveError {
    /// The home's charging requirement cannot be met. Hard failure for that
    /// home; no price adjustment can repair it.
    #[error("home {home}: infeasible subproblem ({reason})")]
    Infeasible { home: String, reason: String },

    /// Baseline load alone pushes a node outside the voltage bounds, so no
    /// charging schedule exists at all.
    #[error(
        "baseline load puts node {node} at {voltage:.4} pu in hour {hour}, \
         outside [{vmin}, {vmax}]"
    )]
    NetworkInfeasible {
        node: usize,
        hour: usize,
        voltage: f32,
        vmin: f32,
        vmax: f32,
    },

    /// Malformed inputs, rejected before any solver invocation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Malformed feeder topology.
    #[error(transparent)]
    Network(#[from] NetworkError),

    /// Every EV home failed its subproblem; there is no partial result to
    /// return.
    #[error("all {0} EV homes failed to solve")]
    AllHomesFailed(usize),
}
