use crate::algo::{compile, compile_with_warm_start, list};
use crate::core::{
    extract, Error, FormulationKind, Instance, ModelSpec, Solution, SolverBackend, Status,
};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Default time limit of one optimization, in seconds.
pub const TIME_LIMIT: f64 = 15.0 * 60.0;

/// Settings of a run over formulations and instances.
#[derive(Clone, Debug)]
pub struct RunConfig {
    /// Folder receiving `solution.csv`, `error.csv` and one subfolder per formulation.
    pub output: PathBuf,
    pub formulations: Vec<FormulationKind>,
    /// Seeds the positional formulation with the heuristic schedule.
    pub warm_start: bool,
    pub time_limit: f64,
    /// Accepted for compatibility, models are solved one after another.
    pub workers: usize,
    /// Writes `<formulation>/<instance>.lp` before solving.
    pub write_lp: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from("output"),
            formulations: FormulationKind::ALL.to_vec(),
            warm_start: false,
            time_limit: TIME_LIMIT,
            workers: 1,
            write_lp: true,
        }
    }
}

/// Step of the pipeline at which a pair failed.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Stage {
    Compile,
    Write,
    Optimize,
    Extract,
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let name = match self {
            Self::Compile => "Compile",
            Self::Write => "Write",
            Self::Optimize => "Optimize",
            Self::Extract => "Extract",
        };
        f.write_str(name)
    }
}

/// A formulation and instance pair that could not be solved.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Failure {
    pub formulation: FormulationKind,
    pub instance_id: usize,
    pub stage: Stage,
    pub message: String,
}

impl Failure {
    fn new(formulation: FormulationKind, instance_id: usize, stage: Stage, err: &Error) -> Self {
        Self {
            formulation,
            instance_id,
            stage,
            message: err.to_string(),
        }
    }
}

impl Display for Failure {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(
            f,
            "{} #{}: {} failed: {}",
            self.formulation, self.instance_id, self.stage, self.message
        )
    }
}

/// Report of a run.
#[derive(Debug, Default)]
pub struct Report {
    solutions: Vec<Solution>,
    failures: Vec<Failure>,
}

impl Report {
    /// Get the solved pairs.
    #[must_use]
    pub fn solutions(&self) -> &[Solution] {
        &self.solutions
    }

    /// Get the failed pairs.
    #[must_use]
    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }
}

impl Display for Report {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        for solution in &self.solutions {
            writeln!(f, "{solution}")?;
        }
        for failure in &self.failures {
            writeln!(f, "{failure}")?;
        }
        writeln!(f, "-------------------")
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct SolutionRecord {
    solver: &'static str,
    instance: usize,
    status: Status,
    runtime: String,
    objective: Option<f64>,
    heuristic: Option<u64>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct FailureRecord<'a> {
    solver: &'static str,
    instance: usize,
    stage: Stage,
    message: &'a str,
}

/// CSV writers for the solution and error logs.
/// Both logs carry their header even when no row is written.
pub struct Sink<W: Write> {
    solutions: csv::Writer<W>,
    errors: csv::Writer<W>,
}

impl Sink<BufWriter<File>> {
    /// Creates `solution.csv` and `error.csv` inside `dir`.
    ///
    /// # Errors
    /// - If a file cannot be created.
    pub fn create(dir: &Path) -> crate::core::Result<Self> {
        let solutions = BufWriter::new(File::create(dir.join("solution.csv"))?);
        let errors = BufWriter::new(File::create(dir.join("error.csv"))?);
        Self::new(solutions, errors)
    }
}

impl<W: Write> Sink<W> {
    /// Wraps the two writers and writes the headers.
    ///
    /// # Errors
    /// - If a header cannot be written.
    pub fn new(solutions: W, errors: W) -> crate::core::Result<Self> {
        let builder = || {
            let mut builder = csv::WriterBuilder::new();
            builder.has_headers(false);
            builder
        };

        let mut solutions = builder().from_writer(solutions);
        solutions.write_record(["Solver", "Instance", "Status", "Runtime", "Objective", "Heuristic"])?;
        let mut errors = builder().from_writer(errors);
        errors.write_record(["Solver", "Instance", "Stage", "Message"])?;
        Ok(Self { solutions, errors })
    }

    fn solution(&mut self, solution: &Solution) -> crate::core::Result<()> {
        self.solutions.serialize(SolutionRecord {
            solver: solution.formulation.name(),
            instance: solution.instance_id,
            status: solution.status,
            runtime: format!("{:.2}", solution.runtime_seconds),
            objective: solution.objective_value,
            heuristic: solution.heuristic_value,
        })?;
        Ok(())
    }

    fn failure(&mut self, failure: &Failure) -> crate::core::Result<()> {
        self.errors.serialize(FailureRecord {
            solver: failure.formulation.name(),
            instance: failure.instance_id,
            stage: failure.stage,
            message: &failure.message,
        })?;
        Ok(())
    }

    /// Flushes both logs.
    ///
    /// # Errors
    /// - If a writer fails.
    pub fn flush(&mut self) -> crate::core::Result<()> {
        self.solutions.flush()?;
        self.errors.flush()?;
        Ok(())
    }

    /// Flushes the logs and returns the inner writers.
    ///
    /// # Errors
    /// - If a writer fails.
    pub fn into_inner(self) -> crate::core::Result<(W, W)> {
        let solutions = self.solutions.into_inner().map_err(csv::IntoInnerError::into_error)?;
        let errors = self.errors.into_inner().map_err(csv::IntoInnerError::into_error)?;
        Ok((solutions, errors))
    }
}

/// Summary of one compiled model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelSummary {
    pub name: String,
    pub variables: usize,
    pub constraints: usize,
}

impl From<&ModelSpec> for ModelSummary {
    fn from(spec: &ModelSpec) -> Self {
        Self {
            name: spec.name().into(),
            variables: spec.variables().len(),
            constraints: spec.constraints().len(),
        }
    }
}

impl Display for ModelSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(
            f,
            "{}: {} variables, {} constraints",
            self.name, self.variables, self.constraints
        )
    }
}

/// Path of the LP file of a model inside `output`.
#[must_use]
pub fn lp_path(output: &Path, spec: &ModelSpec) -> PathBuf {
    output
        .join(spec.formulation().name())
        .join(format!("{}.lp", spec.instance_id()))
}

fn write_lp(output: &Path, spec: &ModelSpec) -> crate::core::Result<()> {
    let mut writer = BufWriter::new(File::create(lp_path(output, spec))?);
    spec.write_lp(&mut writer)?;
    writer.flush()?;
    Ok(())
}

fn create_dirs(output: &Path, formulations: &[FormulationKind]) -> anyhow::Result<()> {
    for kind in formulations {
        let dir = output.join(kind.name());
        std::fs::create_dir_all(&dir).with_context(|| format!("Cannot create {}", dir.display()))?;
    }
    Ok(())
}

/// Compiles every instance with every formulation and writes the LP files into `output`.
/// No solver is involved; failed models are logged and skipped.
///
/// # Errors
/// - If an output folder cannot be created.
pub fn export(
    instances: &[Instance],
    formulations: &[FormulationKind],
    output: &Path,
) -> anyhow::Result<Vec<ModelSummary>> {
    create_dirs(output, formulations)?;

    let mut summaries = Vec::new();
    for &kind in formulations {
        for instance in instances {
            let result = compile(instance, kind).and_then(|spec| {
                write_lp(output, &spec)?;
                Ok(ModelSummary::from(&spec))
            });
            match result {
                Ok(summary) => summaries.push(summary),
                Err(err) => error!(formulation = %kind, instance = instance.id, "{err}"),
            }
        }
    }
    Ok(summaries)
}

/// Solves every instance with every configured formulation, formulation-major.
/// Each pair is written to the sink as soon as it is done; a failed pair is
/// recorded with its stage and the run moves on.
///
/// # Errors
/// - If an output folder cannot be created.
/// - If the sink cannot be written.
pub fn run<W: Write>(
    instances: &[Instance],
    config: &RunConfig,
    backend: &mut dyn SolverBackend,
    sink: &mut Sink<W>,
) -> anyhow::Result<Report> {
    if config.workers != 1 {
        warn!(workers = config.workers, "Parallel solving is not supported, running sequentially");
    }
    if config.write_lp {
        create_dirs(&config.output, &config.formulations)?;
    }

    let mut report = Report::default();
    for &kind in &config.formulations {
        info!(formulation = %kind, backend = backend.name(), instances = instances.len(), "Solving");

        for instance in instances {
            match solve(instance, kind, config, backend) {
                Ok(solution) => {
                    info!("{solution}");
                    sink.solution(&solution)?;
                    report.solutions.push(solution);
                }
                Err(failure) => {
                    error!("{failure}");
                    sink.failure(&failure)?;
                    report.failures.push(failure);
                }
            }
        }
    }

    sink.flush()?;
    Ok(report)
}

fn solve(
    instance: &Instance,
    kind: FormulationKind,
    config: &RunConfig,
    backend: &mut dyn SolverBackend,
) -> std::result::Result<Solution, Failure> {
    let fail = |stage| move |err: Error| Failure::new(kind, instance.id, stage, &err);

    instance.validate().map_err(fail(Stage::Compile))?;
    let heuristic = list::schedule(instance);
    let (spec, start) = if config.warm_start && kind == FormulationKind::Positional {
        let (spec, start) =
            compile_with_warm_start(instance, kind, &heuristic).map_err(fail(Stage::Compile))?;
        (spec, Some(start))
    } else {
        (compile(instance, kind).map_err(fail(Stage::Compile))?, None)
    };

    if config.write_lp {
        write_lp(&config.output, &spec).map_err(fail(Stage::Write))?;
    }

    let raw = backend
        .solve(&spec, start.as_ref())
        .map_err(fail(Stage::Optimize))?;
    let solution = extract(&spec, &raw).map_err(fail(Stage::Extract))?;
    Ok(solution.with_heuristic_value(heuristic.total_completion_time()))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::{Job, RawResult, WarmStart};

    fn instances() -> Vec<Instance> {
        vec![
            Instance::new(1, vec![Job::new(3, 5), Job::new(1, 0), Job::new(4, 2)]),
            Instance::new(2, vec![]),
            Instance::new(3, vec![Job::new(2, 0)]),
        ]
    }

    fn config() -> RunConfig {
        RunConfig {
            write_lp: false,
            ..RunConfig::default()
        }
    }

    fn sink() -> anyhow::Result<Sink<Vec<u8>>> {
        Ok(Sink::new(Vec::new(), Vec::new())?)
    }

    /// Reports every model as optimal at the given objective, recording warm starts.
    #[derive(Default)]
    struct Fixed {
        solved: Vec<String>,
        warm_started: Vec<String>,
    }

    impl SolverBackend for Fixed {
        fn solve(&mut self, spec: &ModelSpec, warm_start: Option<&WarmStart>) -> crate::core::Result<RawResult> {
            self.solved.push(spec.name().into());
            let mut values = vec![0.0; spec.variables().len()];
            if let Some(start) = warm_start {
                self.warm_started.push(spec.name().into());
                for &(i, value) in &start.values {
                    values[i] = value;
                }
            }
            Ok(RawResult {
                status: Some(Status::Optimal),
                objective: Some(spec.objective_value(&values)),
                runtime: 0.5,
                values,
            })
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    /// Fails the first optimization and returns a truncated result afterwards.
    struct Broken {
        calls: usize,
    }

    impl SolverBackend for Broken {
        fn solve(&mut self, _: &ModelSpec, _: Option<&WarmStart>) -> crate::core::Result<RawResult> {
            self.calls += 1;
            if self.calls == 1 {
                return Err(Error::Backend("license expired".into()));
            }
            Ok(RawResult {
                status: Some(Status::Optimal),
                objective: Some(1.0),
                runtime: 0.1,
                values: vec![1.0],
            })
        }

        fn name(&self) -> &'static str {
            "broken"
        }
    }

    #[test]
    fn test_run() -> anyhow::Result<()> {
        crate::logging::init_test();
        let mut backend = Fixed::default();
        let mut sink = sink()?;
        let report = run(&instances(), &config(), &mut backend, &mut sink)?;

        assert_eq!(report.solutions().len(), 6);
        assert_eq!(report.failures().len(), 3);
        assert_eq!(backend.solved.len(), 6);
        assert_eq!(backend.solved[0], "precedence_1");
        assert!(backend.warm_started.is_empty());

        for failure in report.failures() {
            assert_eq!(failure.instance_id, 2);
            assert_eq!(failure.stage, Stage::Compile);
        }
        for solution in report.solutions() {
            assert_eq!(solution.status, Status::Optimal);
            let expected = if solution.instance_id == 1 { 16 } else { 2 };
            assert_eq!(solution.heuristic_value, Some(expected));
        }
        Ok(())
    }

    #[test]
    fn overflowing_instance_fails_at_compile() -> anyhow::Result<()> {
        let half = u64::MAX / 2 + 1;
        let instances = vec![Instance::new(8, vec![Job::new(half, 0), Job::new(half, 0)])];
        let config = RunConfig {
            warm_start: true,
            ..config()
        };
        let mut backend = Fixed::default();
        let report = run(&instances, &config, &mut backend, &mut sink()?)?;

        assert!(backend.solved.is_empty());
        assert_eq!(report.failures().len(), 3);
        assert!(report.failures().iter().all(|f| f.stage == Stage::Compile));
        Ok(())
    }

    #[test]
    fn warm_start_reaches_positional_only() -> anyhow::Result<()> {
        let mut backend = Fixed::default();
        let config = RunConfig {
            warm_start: true,
            ..config()
        };
        let report = run(&instances(), &config, &mut backend, &mut sink()?)?;

        assert_eq!(backend.warm_started, vec!["positional_1", "positional_3"]);
        let positional = report
            .solutions()
            .iter()
            .find(|s| s.formulation == FormulationKind::Positional && s.instance_id == 1);
        let Some(positional) = positional else {
            anyhow::bail!("missing positional solution");
        };
        assert_eq!(positional.objective_value, Some(16.0));
        assert_eq!(positional.variable_values, vec![1.0, 6.0, 9.0]);
        Ok(())
    }

    #[test]
    fn failures_are_logged_with_stage() -> anyhow::Result<()> {
        crate::logging::init_test();
        let instances = vec![instances().swap_remove(0)];
        let config = RunConfig {
            formulations: vec![FormulationKind::Precedence, FormulationKind::TimeIndexed],
            ..config()
        };
        let mut sink = sink()?;
        let report = run(&instances, &config, &mut Broken { calls: 0 }, &mut sink)?;

        assert!(report.solutions().is_empty());
        let stages: Vec<_> = report.failures().iter().map(|f| f.stage).collect();
        assert_eq!(stages, vec![Stage::Optimize, Stage::Extract]);

        let (solutions, errors) = sink.into_inner()?;
        assert_eq!(
            String::from_utf8(solutions)?,
            "Solver,Instance,Status,Runtime,Objective,Heuristic\n"
        );
        let errors = String::from_utf8(errors)?;
        let mut lines = errors.lines();
        assert_eq!(lines.next(), Some("Solver,Instance,Stage,Message"));
        assert_eq!(
            lines.next(),
            Some("precedence,1,Optimize,solver backend failed: license expired")
        );
        assert!(lines.next().is_some_and(|line| line.starts_with("time_indexed,1,Extract,")));
        assert_eq!(lines.next(), None);
        Ok(())
    }

    #[test]
    fn solution_log_format() -> anyhow::Result<()> {
        let instances = vec![Instance::new(3, vec![Job::new(2, 0)])];
        let config = RunConfig {
            formulations: vec![FormulationKind::Positional],
            ..config()
        };
        let mut sink = sink()?;
        run(&instances, &config, &mut Fixed::default(), &mut sink)?;

        let (solutions, _) = sink.into_inner()?;
        assert_eq!(
            String::from_utf8(solutions)?,
            "Solver,Instance,Status,Runtime,Objective,Heuristic\npositional,3,Optimal,0.50,0.0,2\n"
        );
        Ok(())
    }

    #[test]
    fn test_export() -> anyhow::Result<()> {
        let output = std::env::temp_dir().join("srd_export_test");
        let summaries = export(&instances(), &FormulationKind::ALL, &output)?;

        assert_eq!(summaries.len(), 6);
        assert_eq!(
            summaries[0],
            ModelSummary {
                name: "precedence_1".into(),
                variables: 6,
                constraints: 9,
            }
        );
        assert_eq!(summaries[4].to_string(), "time_indexed_1: 34 variables, 18 constraints");

        let lp = std::fs::read_to_string(output.join("positional").join("1.lp"))?;
        assert!(lp.starts_with("\\ Model positional_1"));
        assert!(!output.join("positional").join("2.lp").exists());
        std::fs::remove_dir_all(output)?;
        Ok(())
    }
}
