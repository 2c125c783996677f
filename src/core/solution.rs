use super::{CompletionLayout, Error, FormulationKind, ModelSpec, Result};
use crate::coefficient;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Outcome of an optimization.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Status {
    Optimal,
    Infeasible,
    TimeLimit,
    Error,
    Unknown,
}

impl Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Optimal => "Optimal",
            Self::Infeasible => "Infeasible",
            Self::TimeLimit => "TimeLimit",
            Self::Error => "Error",
            Self::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// Untyped output of a solver backend.
/// `values` holds one entry per model variable, or nothing when there is no incumbent.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawResult {
    pub status: Option<Status>,
    pub objective: Option<f64>,
    pub runtime: f64,
    pub values: Vec<f64>,
}

/// Solution of one instance with one formulation.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Solution {
    pub formulation: FormulationKind,
    pub instance_id: usize,
    pub status: Status,
    pub objective_value: Option<f64>,
    pub runtime_seconds: f64,
    /// Completion time per job, or per position for the positional formulation.
    pub variable_values: Vec<f64>,
    pub heuristic_value: Option<u64>,
}

impl Solution {
    /// Attaches the objective of the heuristic schedule.
    #[must_use]
    pub fn with_heuristic_value(mut self, value: u64) -> Self {
        self.heuristic_value = Some(value);
        self
    }
}

impl Display for Solution {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} #{}: {} in {:.2} sec",
            self.formulation, self.instance_id, self.status, self.runtime_seconds
        )?;
        if let Some(objective) = self.objective_value {
            write!(f, ", objective {objective}")?;
        }
        if let Some(heuristic) = self.heuristic_value {
            write!(f, ", heuristic {heuristic}")?;
        }
        Ok(())
    }
}

/// Maps the raw output of a solver back to the completion times of the model.
///
/// # Errors
/// - If the status is missing.
/// - If the value vector does not hold one value per variable. It may only be empty
///   when there is no incumbent, i.e. no objective.
/// - If the objective or runtime is not a finite number.
pub fn extract(spec: &ModelSpec, raw: &RawResult) -> Result<Solution> {
    let status = raw
        .status
        .ok_or_else(|| Error::MalformedResult(format!("{}: missing status", spec.name())))?;

    let expected = spec.variables().len();
    let no_incumbent = raw.values.is_empty() && raw.objective.is_none();
    if !no_incumbent && raw.values.len() != expected {
        return Err(Error::MalformedResult(format!(
            "{}: {} values for {expected} variables",
            spec.name(),
            raw.values.len()
        )));
    }
    if raw.objective.is_some_and(|objective| !objective.is_finite()) {
        return Err(Error::MalformedResult(format!(
            "{}: objective is not finite",
            spec.name()
        )));
    }
    if !raw.runtime.is_finite() || raw.runtime < 0.0 {
        return Err(Error::MalformedResult(format!(
            "{}: invalid runtime {}",
            spec.name(),
            raw.runtime
        )));
    }

    let variable_values = if raw.values.is_empty() {
        Vec::new()
    } else {
        completion_values(spec.completion(), &raw.values)
    };

    Ok(Solution {
        formulation: spec.formulation(),
        instance_id: spec.instance_id(),
        status,
        objective_value: raw.objective,
        runtime_seconds: raw.runtime,
        variable_values,
        heuristic_value: None,
    })
}

fn completion_values(layout: &CompletionLayout, values: &[f64]) -> Vec<f64> {
    match layout {
        CompletionLayout::Direct(block) => values[block.indices()].to_vec(),
        CompletionLayout::TimeIndexed(blocks) => blocks
            .iter()
            .map(|time| {
                let iter = values[time.block.indices()].iter().enumerate();
                iter.map(|(k, x)| coefficient(time.time(k)) * x).sum()
            })
            .collect(),
    }
}
