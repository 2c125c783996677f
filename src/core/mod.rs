mod error;
mod model;
mod problem;
mod schedule;
mod solution;

pub use error::*;
pub use model::*;
pub use problem::*;
pub use schedule::*;
pub use solution::*;

/// A MILP formulation of the problem.
pub trait Formulation {
    /// Returns the tag of the formulation.
    fn kind(&self) -> FormulationKind;

    /// Builds the model of the given instance.
    /// The instance is already validated.
    ///
    /// # Errors
    /// - If the model arrays cannot be allocated.
    /// - If the builder produces an inconsistent model.
    fn build(&self, instance: &Instance) -> Result<ModelSpec>;

    /// Returns the one line description of the formulation.
    fn describe(&self) -> &'static str;

    /// Translates a heuristic schedule into initial values of the model built for `instance`.
    ///
    /// # Errors
    /// - If the formulation does not accept a warm start.
    /// - If the schedule is not a feasible schedule of `instance`.
    fn warm_start(
        &self,
        _spec: &ModelSpec,
        _instance: &Instance,
        _schedule: &Schedule,
    ) -> Result<WarmStart> {
        Err(Error::WarmStartUnsupported(self.kind()))
    }

    /// Returns the name of the formulation.
    fn name(&self) -> &'static str {
        self.kind().name()
    }
}

/// Solves compiled models.
pub trait SolverBackend {
    /// Solves the model, starting from the given values if any.
    ///
    /// # Errors
    /// - If the backend rejects a variable or a constraint.
    /// - If the optimization fails.
    fn solve(&mut self, spec: &ModelSpec, warm_start: Option<&WarmStart>) -> Result<RawResult>;

    /// Returns the name of the backend.
    fn name(&self) -> &str;
}
