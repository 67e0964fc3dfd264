use std::fs::File;
use std::io::Write;
use std::path::Path;

use indexmap::IndexMap;
use mcs_core::errors::ErrorInfo;
use mcs_core::McsError;
use serde::{Deserialize, Serialize};

/// Per-operator diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorSummary {
    /// Accepted proposals.
    pub accepted: u64,
    /// Rejected proposals, including impossible moves.
    pub rejected: u64,
    /// Observed acceptance rate.
    pub acceptance_rate: Option<f64>,
    /// Current value of the tunable knob, for tunable operators.
    pub tuned_value: Option<f64>,
    /// Tuning advice; empty when the operator performs acceptably.
    pub suggestion: String,
}

/// Diagnostics of a chain after a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainSummary {
    /// Iterations performed by the chain so far.
    pub iterations: u64,
    /// Log probability of the final state.
    pub log_probability: f64,
    /// Diagnostics keyed by operator id, in operator order.
    pub operators: IndexMap<String, OperatorSummary>,
}

impl ChainSummary {
    /// Operators that produced tuning advice.
    pub fn suggestions(&self) -> impl Iterator<Item = (&str, &str)> {
        self.operators
            .iter()
            .filter(|(_, op)| !op.suggestion.is_empty())
            .map(|(id, op)| (id.as_str(), op.suggestion.as_str()))
    }

    /// Renders the summary as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, McsError> {
        serde_json::to_string_pretty(self)
            .map_err(|err| McsError::Serde(ErrorInfo::new("summary-serialize", err.to_string())))
    }

    /// Writes the JSON rendering to `path`.
    pub fn write_json(&self, path: &Path) -> Result<(), McsError> {
        let json = self.to_json()?;
        let mut file = File::create(path).map_err(|err| io_error(path, err))?;
        file.write_all(json.as_bytes())
            .map_err(|err| io_error(path, err))
    }
}

fn io_error(path: &Path, err: std::io::Error) -> McsError {
    McsError::Serde(
        ErrorInfo::new("summary-write", err.to_string())
            .with_context("path", path.display().to_string()),
    )
}
