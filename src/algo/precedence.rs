use crate::coefficient;
use crate::core::{
    CompletionLayout, Formulation, FormulationKind, Instance, ModelBuilder, ModelSpec, Relation,
    Result, VarKind,
};

/// Disjunctive formulation with one ordering variable per pair of jobs.
///
/// Variables: `C_j` completion times, `x_i_j` for `i < j` (1 if job `i` precedes job `j`).
/// ```text
/// min   sum C_j
/// s.t.  C_j >= p_j + r_j                          for all j
///       C_i - C_j + M x_i_j <= M - p_j            for all i < j
///       C_j - C_i - M x_i_j <= -p_i               for all i < j
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct Precedence;

impl Precedence {
    /// The big-M constant, strictly above the latest completion time of any
    /// schedule without unnecessary idle time.
    #[must_use]
    pub fn big_m(instance: &Instance) -> u64 {
        instance.horizon() + 1
    }
}

/// Position of the pair `(i, j)`, `i < j`, in the lexicographic enumeration of pairs.
fn pair_position(n: usize, i: usize, j: usize) -> usize {
    debug_assert!(i < j && j < n, "Invalid pair ({i}, {j}) of {n} jobs");
    i * n - i * (i + 1) / 2 + (j - i - 1)
}

fn pairs(n: usize) -> impl Iterator<Item = (usize, usize)> {
    (0..n).flat_map(move |i| (i + 1..n).map(move |j| (i, j)))
}

impl Formulation for Precedence {
    fn kind(&self) -> FormulationKind {
        FormulationKind::Precedence
    }

    fn describe(&self) -> &'static str {
        "disjunctive big-M model over pairwise precedence variables"
    }

    fn build(&self, instance: &Instance) -> Result<ModelSpec> {
        let n = instance.number_of_jobs();
        let pair_count = n * n.saturating_sub(1) / 2;
        let big_m = coefficient(Self::big_m(instance));

        let mut model = ModelBuilder::new(self.kind(), instance.id);
        model.reserve(n + pair_count, n + 2 * pair_count)?;

        let c = model.add_block(n, |j| (format!("C_{}", j + 1), VarKind::Continuous, 1.0))?;
        let pair_vars = pairs(n).collect::<Vec<_>>();
        let x = model.add_block(pair_count, |k| {
            let (i, j) = pair_vars[k];
            (format!("x_{}_{}", i + 1, j + 1), VarKind::Binary, 0.0)
        })?;
        let x_index = |i: usize, j: usize| x.index(pair_position(n, i, j));

        for (j, job) in instance.jobs.iter().enumerate() {
            model.add_constr(
                format!("release_{}", j + 1),
                vec![(c.index(j), 1.0)],
                Relation::GreaterEqual,
                coefficient(job.earliest_completion()),
            )?;
        }

        for (i, j) in pairs(n) {
            let pj = coefficient(instance.jobs[j].processing_time);
            model.add_constr(
                format!("before_{}_{}", i + 1, j + 1),
                vec![(c.index(i), 1.0), (c.index(j), -1.0), (x_index(i, j), big_m)],
                Relation::LessEqual,
                big_m - pj,
            )?;
        }

        for (i, j) in pairs(n) {
            let pi = coefficient(instance.jobs[i].processing_time);
            model.add_constr(
                format!("after_{}_{}", i + 1, j + 1),
                vec![(c.index(j), 1.0), (c.index(i), -1.0), (x_index(i, j), -big_m)],
                Relation::LessEqual,
                -pi,
            )?;
        }

        model.build(CompletionLayout::Direct(c))
    }
}
