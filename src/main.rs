use clap::Parser;
use srd::core::FormulationKind;
use srd::data::{self, GeneratorConfig, RunConfig};
use srd::logging;
use std::path::PathBuf;
use tracing::info;

/// Application compiling single machine scheduling instances with release dates into MILP models.
#[derive(Debug, Parser)]
enum Application {
    /// Generate the benchmark instances.
    Generate {
        /// Path of the instance file to create.
        #[clap(short, long, default_value = "instances.csv")]
        output: PathBuf,
        /// Seed of the random streams. Picked at random if absent.
        #[clap(short, long)]
        seed: Option<u64>,
    },
    /// Compile every instance and write the LP files, without solving.
    Compile {
        /// The instance file.
        #[clap(short, long, default_value = "instances.csv")]
        input: PathBuf,
        /// The output directory.
        #[clap(short, long, default_value = "output")]
        output: PathBuf,
        /// Formulations to compile.
        #[clap(short, long, value_delimiter = ',', default_values_t = FormulationKind::ALL)]
        formulations: Vec<FormulationKind>,
    },
    /// Solve every instance with every formulation.
    Run {
        /// Number of workers. Models are solved sequentially whatever the value.
        #[clap(short, long, default_value = "8")]
        workers: usize,
        /// The instance file.
        #[clap(short, long, default_value = "instances.csv")]
        input: PathBuf,
        /// The output directory.
        #[clap(short, long, default_value = "output")]
        output: PathBuf,
        /// Time limit of one optimization in seconds.
        #[clap(short, long, default_value_t = data::TIME_LIMIT)]
        time_limit: f64,
        /// Start the positional formulation from the heuristic schedule.
        #[clap(long)]
        warm_start: bool,
        /// Formulations to solve.
        #[clap(short, long, value_delimiter = ',', default_values_t = FormulationKind::ALL)]
        formulations: Vec<FormulationKind>,
    },
}

#[cfg(feature = "gurobi")]
fn solve(instances: &[srd::core::Instance], config: &RunConfig) -> anyhow::Result<()> {
    use anyhow::Context;

    std::fs::create_dir_all(&config.output)
        .with_context(|| format!("Cannot create {}", config.output.display()))?;

    let mut gurobi = srd::algo::Gurobi::new(&config.output.join("model.log"), config.time_limit)?
        .with_solution_dir(config.output.clone());
    let mut sink = data::Sink::create(&config.output)?;
    let report = data::run(instances, config, &mut gurobi, &mut sink)?;
    println!("{report}");
    Ok(())
}

#[cfg(not(feature = "gurobi"))]
fn solve(_: &[srd::core::Instance], _: &RunConfig) -> anyhow::Result<()> {
    anyhow::bail!("Solving requires a build with the `gurobi` feature")
}

fn main() -> anyhow::Result<()> {
    logging::init();

    match Application::parse() {
        Application::Generate { output, seed } => {
            let seed = seed.unwrap_or_else(data::random_seed);
            let instances = GeneratorConfig::default().generate(seed);
            data::save_instances(&output, &instances)?;
            info!(seed, path = %output.display(), "Generated {} instances", instances.len());
            Ok(())
        }
        Application::Compile {
            input,
            output,
            formulations,
        } => {
            let instances = data::load_instances(&input)?;
            info!(path = %input.display(), "Loaded {} instances", instances.len());
            for summary in data::export(&instances, &formulations, &output)? {
                println!("{summary}");
            }
            Ok(())
        }
        Application::Run {
            workers,
            input,
            output,
            time_limit,
            warm_start,
            formulations,
        } => {
            let instances = data::load_instances(&input)?;
            info!(path = %input.display(), "Loaded {} instances", instances.len());
            let config = RunConfig {
                output,
                formulations,
                warm_start,
                time_limit,
                workers,
                write_lp: true,
            };
            solve(&instances, &config)
        }
    }
}
