use crate::core::{Instance, Schedule};

/// Release date list scheduling.
/// Jobs are processed in ascending release date order, ties broken by job index,
/// each starting as soon as the machine is free and the job is released.
/// Runs in `O(n log n)`; the schedule is feasible but not optimal in general.
#[must_use]
pub fn schedule(instance: &Instance) -> Schedule {
    let mut order: Vec<usize> = (0..instance.number_of_jobs()).collect();
    // Stable sort keeps equal release dates in index order.
    order.sort_by_key(|&j| instance.jobs[j].release_date);

    Schedule::from_order(instance, order)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::Job;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_list() -> anyhow::Result<()> {
        let instance = Instance::from_vectors(1, &[3, 1, 4], &[5, 0, 2])?;
        let schedule = schedule(&instance);

        assert_eq!(schedule.order(), &[1, 2, 0]);
        assert_eq!(schedule.completion_times(), &[1, 6, 9]);
        assert_eq!(schedule.total_completion_time(), 16);
        assert_eq!(schedule.completion_time_of(0), Some(9));
        Ok(())
    }

    #[test]
    fn ties_keep_index_order() {
        let jobs = vec![Job::new(2, 3), Job::new(1, 0), Job::new(5, 3), Job::new(1, 3)];
        let schedule = schedule(&Instance::new(1, jobs));

        assert_eq!(schedule.order(), &[1, 0, 2, 3]);
        assert_eq!(schedule.completion_times(), &[1, 5, 10, 11]);
    }

    #[test]
    fn single_job_starts_at_release() {
        let schedule = schedule(&Instance::new(1, vec![Job::new(4, 7)]));
        assert_eq!(schedule.total_completion_time(), 11);
    }

    #[test]
    fn random_schedules_are_valid() {
        let mut rng = StdRng::seed_from_u64(42);
        for id in 0..50 {
            let n = rng.gen_range(1..=25);
            let jobs = (0..n)
                .map(|_| Job::new(rng.gen_range(1..=15), rng.gen_range(0..=25)))
                .collect();
            let instance = Instance::new(id, jobs);
            let schedule = schedule(&instance);

            assert!(schedule.verify(&instance), "Invalid schedule {schedule:?}");
            let lower_bound: u64 = instance.jobs.iter().map(Job::earliest_completion).sum();
            assert!(schedule.total_completion_time() >= lower_bound);
            assert_eq!(schedule, super::schedule(&instance));
        }
    }
}
