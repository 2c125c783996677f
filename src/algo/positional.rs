use crate::coefficient;
use crate::core::{
    CompletionLayout, Error, Formulation, FormulationKind, Instance, ModelBuilder, ModelSpec,
    Relation, Result, Schedule, VarBlock, VarKind, WarmStart,
};

/// Permutation formulation assigning every job to a position of the sequence.
///
/// Variables: `C_h` completion time of the `h`-th position, `x_j_h` (1 if job `j` is at position `h`).
/// ```text
/// min   sum C_h
/// s.t.  sum_h x_j_h = 1                              for all j
///       sum_j x_j_h = 1                              for all h
///       C_1 >= sum_j p_j x_j_1
///       C_h >= C_(h-1) + sum_j p_j x_j_h             for h = 2..n
///       C_h >= sum_j (p_j + r_j) x_j_h               for all h
///       C_h >= 0                                     for all h
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct Positional;

/// Variable blocks of a positional model.
#[derive(Clone, Copy)]
struct Layout {
    n: usize,
    c: VarBlock,
    x: VarBlock,
}

impl Layout {
    /// Index of `x_j_h`. Assignment variables are stored job-major.
    fn x(&self, j: usize, h: usize) -> usize {
        self.x.index(j * self.n + h)
    }

    /// Recovers the layout from a model built by `Positional`.
    fn of(spec: &ModelSpec, n: usize) -> Result<Self> {
        let CompletionLayout::Direct(c) = *spec.completion() else {
            return Err(Error::Indexing(format!("{} has no position block", spec.name())));
        };
        if c.len() != n || spec.variables().len() != n + n * n {
            return Err(Error::SizeMismatch {
                expected: n + n * n,
                found: spec.variables().len(),
            });
        }

        let x = c.following(n * n);
        Ok(Self { n, c, x })
    }
}

impl Formulation for Positional {
    fn kind(&self) -> FormulationKind {
        FormulationKind::Positional
    }

    fn describe(&self) -> &'static str {
        "assignment of jobs to sequence positions with positional completion times"
    }

    fn build(&self, instance: &Instance) -> Result<ModelSpec> {
        let n = instance.number_of_jobs();

        let mut model = ModelBuilder::new(self.kind(), instance.id);
        model.reserve(n + n * n, 5 * n)?;

        let c = model.add_block(n, |h| (format!("C_{}", h + 1), VarKind::Continuous, 1.0))?;
        let x = model.add_block(n * n, |k| {
            (format!("x_{}_{}", k / n + 1, k % n + 1), VarKind::Binary, 0.0)
        })?;
        let layout = Layout { n, c, x };

        for j in 0..n {
            let terms = (0..n).map(|h| (layout.x(j, h), 1.0)).collect();
            model.add_constr(format!("job_{}", j + 1), terms, Relation::Equal, 1.0)?;
        }

        for h in 0..n {
            let terms = (0..n).map(|j| (layout.x(j, h), 1.0)).collect();
            model.add_constr(format!("position_{}", h + 1), terms, Relation::Equal, 1.0)?;
        }

        let processing = |h: usize| {
            let iter = instance.jobs.iter().enumerate();
            iter.map(move |(j, job)| (layout.x(j, h), -coefficient(job.processing_time)))
        };

        let mut terms = vec![(c.index(0), 1.0)];
        terms.extend(processing(0));
        model.add_constr("sequence_1".into(), terms, Relation::GreaterEqual, 0.0)?;

        for h in 1..n {
            let mut terms = vec![(c.index(h), 1.0), (c.index(h - 1), -1.0)];
            terms.extend(processing(h));
            model.add_constr(format!("sequence_{}", h + 1), terms, Relation::GreaterEqual, 0.0)?;
        }

        for h in 0..n {
            let mut terms = vec![(c.index(h), 1.0)];
            let iter = instance.jobs.iter().enumerate();
            terms.extend(iter.map(|(j, job)| (layout.x(j, h), -coefficient(job.earliest_completion()))));
            model.add_constr(format!("release_{}", h + 1), terms, Relation::GreaterEqual, 0.0)?;
        }

        for h in 0..n {
            let terms = vec![(c.index(h), 1.0)];
            model.add_constr(format!("nonnegative_{}", h + 1), terms, Relation::GreaterEqual, 0.0)?;
        }

        model.build(CompletionLayout::Direct(c))
    }

    fn warm_start(&self, spec: &ModelSpec, instance: &Instance, schedule: &Schedule) -> Result<WarmStart> {
        let n = instance.number_of_jobs();
        if schedule.len() != n {
            return Err(Error::SizeMismatch {
                expected: n,
                found: schedule.len(),
            });
        }
        if !schedule.verify(instance) {
            return Err(Error::InfeasibleSchedule(instance.id));
        }

        let layout = Layout::of(spec, n)?;
        let mut values = Vec::new();
        values.try_reserve_exact(2 * n)?;

        let iter = schedule.order().iter().zip(schedule.completion_times());
        for (h, (&j, &completion)) in iter.enumerate() {
            values.push((layout.c.index(h), coefficient(completion)));
            values.push((layout.x(j, h), 1.0));
        }

        Ok(WarmStart { values })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::algo::list;
    use crate::core::Job;

    fn instance() -> Instance {
        Instance::new(1, vec![Job::new(3, 5), Job::new(1, 0), Job::new(4, 2)])
    }

    /// Assignment placing `order[h]` at position `h` with the given position completion times.
    fn assignment(n: usize, order: &[usize], completions: &[f64]) -> Vec<f64> {
        let mut values = completions.to_vec();
        values.resize(n + n * n, 0.0);
        for (h, &j) in order.iter().enumerate() {
            values[n + j * n + h] = 1.0;
        }
        values
    }

    #[test]
    fn test_positional_sizes() -> anyhow::Result<()> {
        let model = Positional.build(&instance())?;
        assert_eq!(model.variables().len(), 12);
        assert_eq!(model.constraints().len(), 15);
        assert_eq!(model.find("x_3_1"), Some(3 + 6));
        Ok(())
    }

    #[test]
    fn heuristic_sequence_is_feasible() -> anyhow::Result<()> {
        let instance = instance();
        let model = Positional.build(&instance)?;
        let values = assignment(3, &[1, 2, 0], &[1.0, 6.0, 9.0]);

        assert!(model.violations(&values, 1e-9)?.is_empty());
        assert!((model.objective_value(&values) - 16.0).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn assignment_must_be_a_permutation() -> anyhow::Result<()> {
        let model = Positional.build(&instance())?;

        // Job 2 placed twice, job 1 never.
        let values = assignment(3, &[1, 1, 2], &[1.0, 2.0, 6.0]);
        assert!(!model.violations(&values, 1e-9)?.is_empty());

        // Jobs 1 and 2 both on the first position.
        let mut values = assignment(3, &[1, 2, 0], &[1.0, 6.0, 9.0]);
        values[3] = 1.0;
        assert!(!model.violations(&values, 1e-9)?.is_empty());
        Ok(())
    }

    #[test]
    fn release_dates_bound_positions() -> anyhow::Result<()> {
        let model = Positional.build(&instance())?;
        // Job 1 first cannot complete before 3 + 5.
        let values = assignment(3, &[0, 1, 2], &[3.0, 4.0, 8.0]);
        assert!(!model.violations(&values, 1e-9)?.is_empty());
        Ok(())
    }

    #[test]
    fn warm_start_follows_heuristic() -> anyhow::Result<()> {
        let instance = instance();
        let model = Positional.build(&instance)?;
        let schedule = list::schedule(&instance);
        let start = Positional.warm_start(&model, &instance, &schedule)?;

        // C_1, x_2_1, C_2, x_3_2, C_3, x_1_3
        let expected = vec![(0, 1.0), (6, 1.0), (1, 6.0), (10, 1.0), (2, 9.0), (5, 1.0)];
        assert_eq!(start.values, expected);

        let mut values = vec![0.0; model.variables().len()];
        for &(i, value) in &start.values {
            values[i] = value;
        }
        assert!(model.violations(&values, 1e-9)?.is_empty());
        Ok(())
    }

    #[test]
    fn warm_start_rejects_foreign_schedule() -> anyhow::Result<()> {
        let instance = instance();
        let model = Positional.build(&instance)?;
        let other = Instance::new(2, vec![Job::new(1, 0)]);
        let schedule = list::schedule(&other);
        assert!(matches!(
            Positional.warm_start(&model, &instance, &schedule),
            Err(Error::SizeMismatch { .. })
        ));

        // Same job count, but the completions ignore the processing times of this instance.
        let unit = Instance::new(3, vec![Job::new(1, 0); 3]);
        let schedule = list::schedule(&unit);
        assert!(matches!(
            Positional.warm_start(&model, &instance, &schedule),
            Err(Error::InfeasibleSchedule(1))
        ));
        Ok(())
    }
}
