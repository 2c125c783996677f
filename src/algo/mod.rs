#[cfg(feature = "gurobi")]
mod gurobi;
pub mod list;
mod positional;
mod precedence;
mod time_indexed;

#[cfg(feature = "gurobi")]
pub use gurobi::Gurobi;
pub use list::schedule;
pub use positional::Positional;
pub use precedence::Precedence;
pub use time_indexed::TimeIndexed;

use crate::core::{
    Error, Formulation, FormulationKind, Instance, ModelSpec, Result, Schedule, WarmStart,
};
use tracing::debug;

/// Returns the builder of the given formulation.
#[must_use]
pub fn formulation(kind: FormulationKind) -> &'static dyn Formulation {
    match kind {
        FormulationKind::Precedence => &Precedence,
        FormulationKind::Positional => &Positional,
        FormulationKind::TimeIndexed => &TimeIndexed,
    }
}

/// Compiles the instance into the model of the given formulation.
///
/// # Errors
/// - If the instance has no jobs or a job without processing time.
/// - If the model cannot be allocated.
pub fn compile(instance: &Instance, kind: FormulationKind) -> Result<ModelSpec> {
    instance.validate()?;

    let spec = formulation(kind).build(instance)?;
    debug!(
        model = spec.name(),
        variables = spec.variables().len(),
        constraints = spec.constraints().len(),
        "Compiled model"
    );
    Ok(spec)
}

/// Compiles the instance and translates the heuristic schedule into a warm start.
///
/// # Errors
/// - If the formulation does not accept a warm start.
/// - If the schedule does not cover every job of the instance or is not feasible for it.
/// - If compiling fails.
pub fn compile_with_warm_start(
    instance: &Instance,
    kind: FormulationKind,
    schedule: &Schedule,
) -> Result<(ModelSpec, WarmStart)> {
    if kind != FormulationKind::Positional {
        return Err(Error::WarmStartUnsupported(kind));
    }

    let spec = compile(instance, kind)?;
    let start = formulation(kind).warm_start(&spec, instance, schedule)?;
    Ok((spec, start))
}
