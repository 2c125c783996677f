use crate::core::{
    CompletionLayout, Formulation, FormulationKind, Instance, ModelBuilder, ModelSpec, Relation,
    Result, TimeBlock, VarKind,
};
use crate::{cast_u64, cast_usize, coefficient};

/// Time-indexed formulation with one binary variable per job and completion time.
///
/// With horizon `T = sum p_j + max r_j`, job `j` owns `x_j_t` for `t` in `[p_j, T]`.
/// ```text
/// min   sum_j sum_t t x_j_t
/// s.t.  sum_t x_j_t = 1                                   for all j
///       sum_j sum_(t - p_j <= tau < t) x_j_t <= 1         for tau = 0..T-1
///       sum_(t < r_j + p_j) x_j_t = 0                     for all j with r_j > 0
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct TimeIndexed;

impl TimeIndexed {
    /// Number of variables of the model: `sum (T - p_j + 1)`.
    #[must_use]
    pub fn variable_count(instance: &Instance) -> usize {
        let horizon = instance.horizon();
        let iter = instance.processing_times();
        iter.map(|p| cast_usize(horizon - p + 1)).sum()
    }
}

impl Formulation for TimeIndexed {
    fn kind(&self) -> FormulationKind {
        FormulationKind::TimeIndexed
    }

    fn describe(&self) -> &'static str {
        "one binary per job and completion time over the horizon sum(p) + max(r)"
    }

    fn build(&self, instance: &Instance) -> Result<ModelSpec> {
        let n = instance.number_of_jobs();
        let horizon = instance.horizon();
        let slots = cast_usize(horizon);

        let mut model = ModelBuilder::new(self.kind(), instance.id);
        model.reserve(Self::variable_count(instance), 2 * n + slots)?;

        let mut blocks = Vec::new();
        blocks.try_reserve_exact(n)?;
        for (j, job) in instance.jobs.iter().enumerate() {
            let first_time = job.processing_time;
            let len = cast_usize(horizon - first_time + 1);
            let block = model.add_block(len, |k| {
                let t = first_time + cast_u64(k);
                (format!("x_{}_{t}", j + 1), VarKind::Binary, coefficient(t))
            })?;
            blocks.push(TimeBlock { block, first_time });
        }

        for (j, time) in blocks.iter().enumerate() {
            let terms = time.block.indices().map(|i| (i, 1.0)).collect();
            model.add_constr(format!("complete_{}", j + 1), terms, Relation::Equal, 1.0)?;
        }

        // Slot `tau` is the unit interval [tau, tau + 1). Completing at `t` occupies it
        // iff t - p_j <= tau < t, i.e. t in [tau + 1, tau + p_j].
        for tau in 0..horizon {
            let mut terms = Vec::new();
            for time in &blocks {
                let p = time.first_time;
                let from = (tau + 1).max(p);
                let to = (tau + p).min(horizon);
                if from > to {
                    continue;
                }
                let positions = cast_usize(from - p)..=cast_usize(to - p);
                terms.extend(positions.map(|k| (time.block.index(k), 1.0)));
            }
            if terms.is_empty() {
                continue;
            }
            model.add_constr(format!("slot_{tau}"), terms, Relation::LessEqual, 1.0)?;
        }

        // Completions before r_j + p_j stay in the block and are pinned to zero.
        for (j, (time, job)) in blocks.iter().zip(&instance.jobs).enumerate() {
            let early = cast_usize(job.release_date);
            if early == 0 {
                continue;
            }
            let terms = (0..early).map(|k| (time.block.index(k), 1.0)).collect();
            model.add_constr(format!("release_{}", j + 1), terms, Relation::Equal, 0.0)?;
        }

        model.build(CompletionLayout::TimeIndexed(blocks))
    }
}
