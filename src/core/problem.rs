use super::{Error, Result};
use serde::{Deserialize, Serialize};

/// A job. Contains the processing time and release date of the job.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Serialize, PartialEq)]
pub struct Job {
    pub processing_time: u64,
    pub release_date: u64,
}

impl Job {
    /// Creates a new job.
    #[must_use]
    pub const fn new(processing_time: u64, release_date: u64) -> Self {
        Self {
            processing_time,
            release_date,
        }
    }

    /// Earliest time the job can be completed.
    #[must_use]
    pub const fn earliest_completion(&self) -> u64 {
        self.processing_time + self.release_date
    }
}

/// Bound on the horizon of a valid instance.
/// Times up to it are exact as `f64` model coefficients and leave room for the big-M.
pub const MAX_HORIZON: u64 = 1 << 53;

/// An instance of the single machine scheduling problem with release dates.
#[non_exhaustive]
#[derive(Clone, Debug, Deserialize, Eq, Serialize, PartialEq)]
pub struct Instance {
    pub id: usize,
    pub jobs: Vec<Job>,
}

impl Instance {
    /// Creates a new instance of the scheduling problem.
    #[must_use]
    pub const fn new(id: usize, jobs: Vec<Job>) -> Self {
        Self { id, jobs }
    }

    /// Creates an instance from parallel vectors of processing times and release dates.
    ///
    /// # Errors
    /// - If the vectors have different lengths.
    pub fn from_vectors(id: usize, processing_times: &[u64], release_dates: &[u64]) -> Result<Self> {
        if processing_times.len() != release_dates.len() {
            return Err(Error::SizeMismatch {
                expected: processing_times.len(),
                found: release_dates.len(),
            });
        }

        let iter = processing_times.iter().zip(release_dates);
        let jobs = iter.map(|(&p, &r)| Job::new(p, r)).collect();
        Ok(Self::new(id, jobs))
    }

    /// Returns the number of jobs.
    #[must_use]
    pub fn number_of_jobs(&self) -> usize {
        self.jobs.len()
    }

    /// Returns the processing times in job order.
    pub fn processing_times(&self) -> impl Iterator<Item = u64> + '_ {
        self.jobs.iter().map(|job| job.processing_time)
    }

    /// Returns the release dates in job order.
    pub fn release_dates(&self) -> impl Iterator<Item = u64> + '_ {
        self.jobs.iter().map(|job| job.release_date)
    }

    /// Sum of all processing times.
    #[must_use]
    pub fn total_processing_time(&self) -> u64 {
        self.processing_times().sum()
    }

    /// Latest release date, 0 for an empty instance.
    #[must_use]
    pub fn max_release_date(&self) -> u64 {
        self.release_dates().max().unwrap_or_default()
    }

    /// Upper bound on the completion time of the last job in any schedule without
    /// unnecessary idle time: `sum(p_j) + max(r_j)`.
    #[must_use]
    pub fn horizon(&self) -> u64 {
        self.total_processing_time() + self.max_release_date()
    }

    /// Checks that the instance is well formed.
    /// Every time derived from the instance is then bounded by the horizon,
    /// which stays below `MAX_HORIZON`.
    ///
    /// # Errors
    /// - If the instance has no jobs.
    /// - If a job has zero processing time.
    /// - If the horizon reaches `MAX_HORIZON`.
    pub fn validate(&self) -> Result<()> {
        if self.jobs.is_empty() {
            return Err(Error::EmptyInstance);
        }

        if let Some(j) = self.jobs.iter().position(|job| job.processing_time == 0) {
            return Err(Error::InvalidInstance(format!(
                "job {j} of instance {} has zero processing time",
                self.id
            )));
        }

        let horizon = self
            .processing_times()
            .try_fold(self.max_release_date(), u64::checked_add)
            .filter(|&horizon| horizon < MAX_HORIZON);
        match horizon {
            Some(_) => Ok(()),
            None => Err(Error::InvalidInstance(format!(
                "horizon of instance {} exceeds {MAX_HORIZON}",
                self.id
            ))),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn instance() -> Instance {
        Instance::new(1, vec![Job::new(3, 5), Job::new(1, 0), Job::new(4, 2)])
    }

    #[test]
    fn horizon_is_total_processing_plus_latest_release() {
        let instance = instance();
        assert_eq!(instance.total_processing_time(), 8);
        assert_eq!(instance.max_release_date(), 5);
        assert_eq!(instance.horizon(), 13);
    }

    #[test]
    fn from_vectors_keeps_job_order() -> anyhow::Result<()> {
        let instance = Instance::from_vectors(1, &[3, 1, 4], &[5, 0, 2])?;
        assert_eq!(instance, self::instance());
        assert!(Instance::from_vectors(1, &[3, 1], &[5]).is_err());
        Ok(())
    }

    #[test]
    fn validate_rejects_empty_and_zero_length_jobs() {
        assert!(instance().validate().is_ok());
        assert!(matches!(
            Instance::new(2, vec![]).validate(),
            Err(Error::EmptyInstance)
        ));
        assert!(matches!(
            Instance::new(3, vec![Job::new(0, 1)]).validate(),
            Err(Error::InvalidInstance(_))
        ));
    }

    #[test]
    fn validate_rejects_overflowing_horizon() {
        let half = u64::MAX / 2 + 1;
        let overflow = Instance::new(4, vec![Job::new(half, 0), Job::new(half, 0)]);
        assert!(matches!(overflow.validate(), Err(Error::InvalidInstance(_))));

        let late = Instance::new(5, vec![Job::new(1, u64::MAX)]);
        assert!(matches!(late.validate(), Err(Error::InvalidInstance(_))));

        let inexact = Instance::new(6, vec![Job::new(MAX_HORIZON, 0)]);
        assert!(matches!(inexact.validate(), Err(Error::InvalidInstance(_))));

        let largest = Instance::new(7, vec![Job::new(MAX_HORIZON - 2, 1)]);
        assert!(largest.validate().is_ok());
    }
}
