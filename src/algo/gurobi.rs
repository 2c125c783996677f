use crate::core::{
    ModelSpec, RawResult, Relation, Result, SolverBackend, Status, VarKind, WarmStart,
};
use grb::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Gurobi solver backend.
/// One environment is shared by every model it solves.
pub struct Gurobi {
    env: Env,
    solution_dir: Option<PathBuf>,
}

impl Gurobi {
    /// Starts a Gurobi environment logging to `log_file`,
    /// with the given time limit in seconds for every optimization.
    ///
    /// # Errors
    /// - If the environment cannot be started (e.g. missing license).
    pub fn new(log_file: &Path, time_limit: f64) -> Result<Self> {
        let mut env = Env::new(&log_file.to_string_lossy())?;
        env.set(param::LogToConsole, 0)?;
        env.set(param::TimeLimit, time_limit)?;
        Ok(Self {
            env,
            solution_dir: None,
        })
    }

    /// Writes every solved model into `dir/<formulation>/` as `<instance>.mps`,
    /// plus `<instance>.sol` and `<instance>.json` when an incumbent exists.
    #[must_use]
    pub fn with_solution_dir(mut self, dir: PathBuf) -> Self {
        self.solution_dir = Some(dir);
        self
    }

    fn output_path(dir: &Path, spec: &ModelSpec, extension: &str) -> PathBuf {
        let file = format!("{}.{extension}", spec.instance_id());
        dir.join(spec.formulation().name()).join(file)
    }

    fn status(model: &Model) -> Result<Status> {
        Ok(match model.status()? {
            grb::Status::Optimal => Status::Optimal,
            grb::Status::Infeasible | grb::Status::InfOrUnbd => Status::Infeasible,
            grb::Status::TimeLimit => Status::TimeLimit,
            grb::Status::Numeric => Status::Error,
            _ => Status::Unknown,
        })
    }
}

impl SolverBackend for Gurobi {
    #[allow(clippy::useless_conversion)]
    fn solve(&mut self, spec: &ModelSpec, warm_start: Option<&WarmStart>) -> Result<RawResult> {
        let mut model = Model::with_env(spec.name(), &self.env)?;

        let mut vars = Vec::with_capacity(spec.variables().len());
        for var in spec.variables() {
            let (vtype, ub) = match var.kind {
                VarKind::Binary => (VarType::Binary, 1.0),
                VarKind::Integer => (VarType::Integer, f64::INFINITY),
                VarKind::Continuous => (VarType::Continuous, f64::INFINITY),
            };
            vars.push(model.add_var(&var.name, vtype, 0.0, 0.0, ub, std::iter::empty())?);
        }

        for constr in spec.constraints() {
            let expr = constr.terms.iter().map(|&(i, coeff)| coeff * vars[i]).grb_sum();
            let rhs = constr.rhs;
            let inequality = match constr.relation {
                Relation::LessEqual => c!(expr <= rhs),
                Relation::Equal => c!(expr == rhs),
                Relation::GreaterEqual => c!(expr >= rhs),
            };
            model.add_constr(&constr.name, inequality)?;
        }

        let objective = spec.variables().iter().zip(&vars);
        let objective = objective.filter(|(var, _)| var.objective != 0.0);
        model.set_objective(objective.map(|(var, &x)| var.objective * x).grb_sum(), Minimize)?;

        if let Some(start) = warm_start {
            for &(i, value) in &start.values {
                model.set_obj_attr(attr::Start, &vars[i], value)?;
            }
        }

        model.optimize()?;

        let status = Self::status(&model)?;
        let runtime = model.get_attr(attr::Runtime)?;
        let (objective, values) = if model.get_attr(attr::SolCount)? > 0 {
            let mut values = Vec::with_capacity(vars.len());
            for var in &vars {
                values.push(model.get_obj_attr(attr::X, var)?);
            }
            (Some(model.get_attr(attr::ObjVal)?), values)
        } else {
            (None, Vec::new())
        };

        if let Some(dir) = &self.solution_dir {
            let extensions: &[&str] = if objective.is_some() {
                &["mps", "sol", "json"]
            } else {
                &["mps"]
            };
            for extension in extensions {
                let path = Self::output_path(dir, spec, extension);
                if let Err(err) = model.write(&path.to_string_lossy()) {
                    warn!(model = spec.name(), "Cannot write {}: {err}", path.display());
                }
            }
        }

        debug!(model = spec.name(), ?status, runtime, "Optimized");

        Ok(RawResult {
            status: Some(status),
            objective,
            runtime,
            values,
        })
    }

    fn name(&self) -> &'static str {
        "gurobi"
    }
}
