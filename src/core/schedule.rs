use super::Instance;

/// A single machine schedule: job order and the completion time at every position.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Schedule {
    order: Vec<usize>,
    completion_times: Vec<u64>,
}

impl Schedule {
    /// Builds the earliest schedule processing the jobs in the given order.
    /// Every job starts at the completion of its predecessor or at its release date,
    /// whichever is later.
    ///
    /// # Panics
    /// - If the order references a job outside the instance.
    #[must_use]
    pub fn from_order(instance: &Instance, order: Vec<usize>) -> Self {
        let mut completion_times = Vec::with_capacity(order.len());
        let mut machine_free = 0;

        for &j in &order {
            let job = instance.jobs[j];
            let start = machine_free.max(job.release_date);
            machine_free = start + job.processing_time;
            completion_times.push(machine_free);
        }

        Self {
            order,
            completion_times,
        }
    }

    /// Jobs in processing order.
    #[must_use]
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Completion times indexed by position.
    #[must_use]
    pub fn completion_times(&self) -> &[u64] {
        &self.completion_times
    }

    /// Returns the number of scheduled jobs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Completion time of the given job.
    #[must_use]
    pub fn completion_time_of(&self, job: usize) -> Option<u64> {
        let position = self.order.iter().position(|&j| j == job)?;
        Some(self.completion_times[position])
    }

    /// Completion times indexed by job.
    #[must_use]
    pub fn completion_times_by_job(&self) -> Vec<u64> {
        let mut times = vec![0; self.order.len()];
        for (&j, &time) in self.order.iter().zip(&self.completion_times) {
            times[j] = time;
        }
        times
    }

    /// Sum of all completion times.
    #[must_use]
    pub fn total_completion_time(&self) -> u64 {
        self.completion_times.iter().sum()
    }

    /// Checks that the schedule is a permutation of the instance jobs
    /// and respects release dates and machine capacity.
    #[must_use]
    pub fn verify(&self, instance: &Instance) -> bool {
        let n = instance.number_of_jobs();
        if self.order.len() != n || self.completion_times.len() != n {
            return false;
        }

        let mut seen = vec![false; n];
        let mut machine_free = 0;
        for (&j, &completion) in self.order.iter().zip(&self.completion_times) {
            if j >= n || std::mem::replace(&mut seen[j], true) {
                return false;
            }
            let job = instance.jobs[j];
            let Some(start) = completion.checked_sub(job.processing_time) else {
                return false;
            };
            if start < job.release_date || start < machine_free {
                return false;
            }
            machine_free = completion;
        }

        true
    }
}
