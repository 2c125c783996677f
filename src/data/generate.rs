use crate::core::{Instance, Job};
use rand::prelude::*;

/// Modulus of the Lehmer generator, `2^31 - 1`.
pub const MODULUS: u64 = 2_147_483_647;
const MULTIPLIER: u64 = 48_271;
/// Jump multiplier separating the initial states of consecutive streams.
const A256: u64 = 22_925;
/// Number of independent streams.
pub const STREAMS: usize = 256;
pub const DEFAULT_SEED: u64 = 123_456_789;

const JOBS_STREAM: usize = 0;
const PROCESSING_TIME_STREAM: usize = 1;
const RELEASE_DATE_STREAM: usize = 2;

/// Multi-stream Lehmer random number generator.
///
/// Every stream is a multiplicative congruential generator
/// `x <- 48271 x mod (2^31 - 1)`. The initial states are planted from one seed,
/// each `8 367 782` draws apart from the previous one.
#[derive(Clone, Debug)]
pub struct Streams {
    seeds: [u64; STREAMS],
}

impl Streams {
    /// Plants the states of all streams from `seed`.
    /// A seed that reduces to zero modulo `MODULUS` is replaced by `DEFAULT_SEED`.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        let seed = match seed % MODULUS {
            0 => DEFAULT_SEED,
            seed => seed,
        };

        let mut state = seed;
        let seeds = std::array::from_fn(|j| {
            if j > 0 {
                state = state * A256 % MODULUS;
            }
            state
        });
        Self { seeds }
    }

    /// Current state of the given stream.
    #[must_use]
    pub const fn seed(&self, stream: usize) -> u64 {
        self.seeds[stream % STREAMS]
    }

    fn advance(&mut self, stream: usize) -> u64 {
        let seed = &mut self.seeds[stream % STREAMS];
        *seed = *seed * MULTIPLIER % MODULUS;
        *seed
    }

    /// Draws a real number uniformly distributed in `(0, 1)` from the given stream.
    #[allow(clippy::cast_precision_loss)]
    pub fn random(&mut self, stream: usize) -> f64 {
        self.advance(stream) as f64 / MODULUS as f64
    }

    /// Draws an integer uniformly distributed in `[a, b]` from the given stream.
    pub fn uniform(&mut self, stream: usize, a: u64, b: u64) -> u64 {
        debug_assert!(a <= b, "Empty range [{a}, {b}]");
        // floor((b - a + 1) * x / m), exact in integers.
        a + (b - a + 1) * self.advance(stream) / MODULUS
    }
}

impl Default for Streams {
    fn default() -> Self {
        Self::new(DEFAULT_SEED)
    }
}

/// Parameter grid of the instance generator.
/// One class per combination of upper bounds, visited jobs-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratorConfig {
    pub job_bounds: Vec<u64>,
    pub processing_time_bounds: Vec<u64>,
    pub release_date_bounds: Vec<u64>,
    pub instances_per_class: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            job_bounds: vec![10, 25, 50],
            processing_time_bounds: vec![5, 10, 15],
            release_date_bounds: vec![5, 15, 25],
            instances_per_class: 4,
        }
    }
}

impl GeneratorConfig {
    /// Number of instances `generate` produces.
    #[must_use]
    pub fn number_of_instances(&self) -> usize {
        self.job_bounds.len()
            * self.processing_time_bounds.len()
            * self.release_date_bounds.len()
            * self.instances_per_class
    }

    /// Generates the instances of every class, numbered from 1.
    /// The number of jobs, processing times and release dates are drawn
    /// uniformly in `[1, bound]` from separate streams.
    #[must_use]
    pub fn generate(&self, seed: u64) -> Vec<Instance> {
        let mut streams = Streams::new(seed);
        let mut instances = Vec::with_capacity(self.number_of_instances());

        for &jobs_bound in &self.job_bounds {
            for &processing_bound in &self.processing_time_bounds {
                for &release_bound in &self.release_date_bounds {
                    for _ in 0..self.instances_per_class {
                        let n = streams.uniform(JOBS_STREAM, 1, jobs_bound);
                        let jobs = (0..n)
                            .map(|_| {
                                let p = streams.uniform(PROCESSING_TIME_STREAM, 1, processing_bound);
                                let r = streams.uniform(RELEASE_DATE_STREAM, 1, release_bound);
                                Job::new(p, r)
                            })
                            .collect();
                        instances.push(Instance::new(instances.len() + 1, jobs));
                    }
                }
            }
        }

        instances
    }
}

/// Picks a random valid seed.
#[must_use]
pub fn random_seed() -> u64 {
    thread_rng().gen_range(1..MODULUS)
}
