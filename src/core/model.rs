use super::{Error, Result};
use ahash::{HashSet, HashSetExt};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::io::Write;
use std::ops::Range;

/// The three MILP formulations of the problem.
#[derive(
    Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, clap::ValueEnum,
)]
pub enum FormulationKind {
    Precedence,
    Positional,
    #[value(name = "time_indexed")]
    TimeIndexed,
}

impl FormulationKind {
    /// Every formulation, in the order the run driver visits them.
    pub const ALL: [Self; 3] = [Self::Precedence, Self::Positional, Self::TimeIndexed];

    /// Returns the name of the formulation.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Precedence => "precedence",
            Self::Positional => "positional",
            Self::TimeIndexed => "time_indexed",
        }
    }
}

impl Display for FormulationKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Domain of a decision variable.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum VarKind {
    Binary,
    Integer,
    Continuous,
}

/// A decision variable.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Variable {
    pub name: String,
    pub kind: VarKind,
    pub objective: f64,
}

impl Variable {
    #[must_use]
    pub const fn new(name: String, kind: VarKind, objective: f64) -> Self {
        Self {
            name,
            kind,
            objective,
        }
    }
}

/// Relation between the left hand side and the right hand side of a constraint.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Relation {
    LessEqual,
    Equal,
    GreaterEqual,
}

impl Relation {
    const fn symbol(self) -> &'static str {
        match self {
            Self::LessEqual => "<=",
            Self::Equal => "=",
            Self::GreaterEqual => ">=",
        }
    }

    fn holds(self, lhs: f64, rhs: f64, tolerance: f64) -> bool {
        match self {
            Self::LessEqual => lhs <= rhs + tolerance,
            Self::Equal => (lhs - rhs).abs() <= tolerance,
            Self::GreaterEqual => lhs + tolerance >= rhs,
        }
    }
}

/// A linear constraint over variable indices.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Constraint {
    pub name: String,
    pub terms: Vec<(usize, f64)>,
    pub relation: Relation,
    pub rhs: f64,
}

impl Constraint {
    /// Value of the left hand side for the given variable values.
    fn lhs(&self, values: &[f64]) -> f64 {
        self.terms.iter().map(|&(i, coeff)| coeff * values[i]).sum()
    }

    /// Returns whether the constraint references the given variable.
    #[must_use]
    pub fn references(&self, index: usize) -> bool {
        self.terms.iter().any(|&(i, _)| i == index)
    }
}

/// Contiguous group of variables created together.
/// Local positions are mapped to global variable indices by adding the base offset.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize)]
pub struct VarBlock {
    base: usize,
    len: usize,
}

impl VarBlock {
    /// Global index of the `k`-th variable of the block.
    ///
    /// # Panics
    /// - In debug mode, if `k` is not a position of the block.
    #[must_use]
    pub fn index(&self, k: usize) -> usize {
        debug_assert!(k < self.len, "Position {k} outside block of {}", self.len);
        self.base + k
    }

    /// Global indices of the block.
    #[must_use]
    pub const fn indices(&self) -> Range<usize> {
        self.base..self.base + self.len
    }

    /// Block of `len` variables starting right after this one.
    #[must_use]
    pub const fn following(self, len: usize) -> Self {
        Self {
            base: self.base + self.len,
            len,
        }
    }

    #[must_use]
    pub const fn base(&self) -> usize {
        self.base
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Time-indexed block of a job: the `k`-th variable means completion at `first_time + k`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
pub struct TimeBlock {
    pub block: VarBlock,
    pub first_time: u64,
}

impl TimeBlock {
    /// Completion time represented by the `k`-th variable of the block.
    #[must_use]
    pub fn time(&self, k: usize) -> u64 {
        self.first_time + crate::cast_u64(k)
    }
}

/// Where the completion times of the jobs live in the variable vector.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum CompletionLayout {
    /// One completion time variable per job (or per position).
    Direct(VarBlock),
    /// One time-indexed block per job.
    TimeIndexed(Vec<TimeBlock>),
}

impl CompletionLayout {
    /// Number of primary completion values.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Direct(block) => block.len(),
            Self::TimeIndexed(blocks) => blocks.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Optimization direction. Every formulation minimizes total completion time.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub enum Sense {
    #[default]
    Minimize,
}

/// Initial values handed to the solver for a subset of variables.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct WarmStart {
    pub values: Vec<(usize, f64)>,
}

/// A compiled MILP model, ready for a solver backend.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ModelSpec {
    name: String,
    formulation: FormulationKind,
    instance_id: usize,
    variables: Vec<Variable>,
    constraints: Vec<Constraint>,
    completion: CompletionLayout,
}

impl ModelSpec {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn formulation(&self) -> FormulationKind {
        self.formulation
    }

    #[must_use]
    pub const fn instance_id(&self) -> usize {
        self.instance_id
    }

    #[must_use]
    pub const fn sense(&self) -> Sense {
        Sense::Minimize
    }

    #[must_use]
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    #[must_use]
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    #[must_use]
    pub const fn completion(&self) -> &CompletionLayout {
        &self.completion
    }

    /// Returns the index of the variable with the given name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<usize> {
        self.variables.iter().position(|var| var.name == name)
    }

    /// Objective value of the given assignment.
    #[must_use]
    pub fn objective_value(&self, values: &[f64]) -> f64 {
        let iter = self.variables.iter().zip(values);
        iter.map(|(var, value)| var.objective * value).sum()
    }

    /// Returns the indices of the constraints violated by the given assignment.
    /// Integrality and binary bounds are checked too; such violations are reported
    /// as `usize::MAX`.
    ///
    /// # Errors
    /// - If `values` does not have one entry per variable.
    pub fn violations(&self, values: &[f64], tolerance: f64) -> Result<Vec<usize>> {
        if values.len() != self.variables.len() {
            return Err(Error::MalformedResult(format!(
                "{}: {} values for {} variables",
                self.name,
                values.len(),
                self.variables.len()
            )));
        }

        let mut violated: Vec<usize> = self
            .constraints
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.relation.holds(c.lhs(values), c.rhs, tolerance))
            .map(|(i, _)| i)
            .collect();

        let domain_ok = self.variables.iter().zip(values).all(|(var, &value)| {
            let integral = (value - value.round()).abs() <= tolerance;
            match var.kind {
                VarKind::Binary => integral && (-tolerance..=1.0 + tolerance).contains(&value),
                VarKind::Integer => integral,
                VarKind::Continuous => true,
            }
        });
        if !domain_ok {
            violated.push(usize::MAX);
        }

        Ok(violated)
    }

    /// Writes the model in CPLEX LP format.
    ///
    /// # Errors
    /// - If writing fails.
    pub fn write_lp(&self, writer: &mut impl Write) -> std::io::Result<()> {
        const TERMS_PER_LINE: usize = 8;

        writeln!(writer, "\\ Model {} ({})", self.name, self.formulation)?;
        writeln!(writer, "Minimize")?;
        write!(writer, " obj:")?;
        let objective = self.variables.iter().filter(|var| var.objective != 0.0);
        for (i, var) in objective.enumerate() {
            if i > 0 && i % TERMS_PER_LINE == 0 {
                write!(writer, "\n     ")?;
            }
            write!(writer, " {:+} {}", var.objective, var.name)?;
        }
        writeln!(writer)?;

        writeln!(writer, "Subject To")?;
        for constr in &self.constraints {
            write!(writer, " {}:", constr.name)?;
            for (i, &(index, coeff)) in constr.terms.iter().enumerate() {
                if i > 0 && i % TERMS_PER_LINE == 0 {
                    write!(writer, "\n   ")?;
                }
                write!(writer, " {coeff:+} {}", self.variables[index].name)?;
            }
            writeln!(writer, " {} {}", constr.relation.symbol(), constr.rhs)?;
        }

        for (section, kind) in [("Binary", VarKind::Binary), ("General", VarKind::Integer)] {
            let mut vars = self.variables.iter().filter(|var| var.kind == kind).peekable();
            if vars.peek().is_some() {
                writeln!(writer, "{section}")?;
                for var in vars {
                    writeln!(writer, " {}", var.name)?;
                }
            }
        }

        writeln!(writer, "End")
    }

    /// Returns the model in CPLEX LP format.
    #[cfg(test)]
    fn to_lp_string(&self) -> String {
        let mut buffer = Vec::new();
        // Writing into a vector cannot fail.
        let _ = self.write_lp(&mut buffer);
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

/// Incremental builder of a `ModelSpec`.
/// Assigns dense indices to variables and checks every constraint against them.
#[derive(Debug)]
pub struct ModelBuilder {
    name: String,
    formulation: FormulationKind,
    instance_id: usize,
    variables: Vec<Variable>,
    constraints: Vec<Constraint>,
    names: HashSet<String>,
}

impl ModelBuilder {
    /// Creates an empty model for the given formulation and instance.
    #[must_use]
    pub fn new(formulation: FormulationKind, instance_id: usize) -> Self {
        Self {
            name: format!("{formulation}_{instance_id}"),
            formulation,
            instance_id,
            variables: Vec::new(),
            constraints: Vec::new(),
            names: HashSet::new(),
        }
    }

    /// Reserves room for the expected number of variables and constraints.
    ///
    /// # Errors
    /// - If the memory cannot be allocated.
    pub fn reserve(&mut self, variables: usize, constraints: usize) -> Result<()> {
        self.variables.try_reserve_exact(variables)?;
        self.constraints.try_reserve_exact(constraints)?;
        self.names.try_reserve(variables)?;
        Ok(())
    }

    /// Number of variables created so far.
    #[must_use]
    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    /// Number of constraints added so far.
    #[must_use]
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Adds a variable and returns its index.
    ///
    /// # Errors
    /// - If a variable with the same name exists.
    pub fn add_var(&mut self, name: String, kind: VarKind, objective: f64) -> Result<usize> {
        if !self.names.insert(name.clone()) {
            return Err(Error::Indexing(format!("duplicate variable `{name}`")));
        }
        self.variables.push(Variable::new(name, kind, objective));
        Ok(self.variables.len() - 1)
    }

    /// Adds `len` variables produced by `init` for every local position.
    ///
    /// # Errors
    /// - If the memory cannot be allocated.
    /// - If a variable name is duplicated.
    pub fn add_block(
        &mut self,
        len: usize,
        mut init: impl FnMut(usize) -> (String, VarKind, f64),
    ) -> Result<VarBlock> {
        self.variables.try_reserve(len)?;
        let base = self.variables.len();
        for k in 0..len {
            let (name, kind, objective) = init(k);
            self.add_var(name, kind, objective)?;
        }
        Ok(VarBlock { base, len })
    }

    /// Adds a constraint.
    ///
    /// # Errors
    /// - If the constraint has no terms.
    /// - If a term references a variable that does not exist.
    pub fn add_constr(
        &mut self,
        name: String,
        terms: Vec<(usize, f64)>,
        relation: Relation,
        rhs: f64,
    ) -> Result<()> {
        if terms.is_empty() {
            return Err(Error::Indexing(format!("constraint `{name}` has no terms")));
        }
        let count = self.variables.len();
        if let Some(&(index, _)) = terms.iter().find(|&&(index, _)| index >= count) {
            return Err(Error::Indexing(format!(
                "constraint `{name}` references variable {index} of {count}"
            )));
        }

        self.constraints.try_reserve(1)?;
        self.constraints.push(Constraint {
            name,
            terms,
            relation,
            rhs,
        });
        Ok(())
    }

    /// Finishes the model.
    ///
    /// # Errors
    /// - If the completion layout points outside the variables.
    pub fn build(self, completion: CompletionLayout) -> Result<ModelSpec> {
        let count = self.variables.len();
        let outside = match &completion {
            CompletionLayout::Direct(block) => block.indices().end > count,
            CompletionLayout::TimeIndexed(blocks) => {
                blocks.iter().any(|time| time.block.indices().end > count)
            }
        };
        if outside {
            return Err(Error::Indexing(format!(
                "completion layout of `{}` exceeds {count} variables",
                self.name
            )));
        }

        Ok(ModelSpec {
            name: self.name,
            formulation: self.formulation,
            instance_id: self.instance_id,
            variables: self.variables,
            constraints: self.constraints,
            completion,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn knapsack() -> anyhow::Result<ModelSpec> {
        let mut builder = ModelBuilder::new(FormulationKind::Precedence, 7);
        let c = builder.add_block(2, |k| (format!("C_{}", k + 1), VarKind::Continuous, 1.0))?;
        let x = builder.add_var("x_1_2".into(), VarKind::Binary, 0.0)?;
        builder.add_constr(
            "c_0".into(),
            vec![(c.index(0), 1.0), (c.index(1), -1.0), (x, 10.0)],
            Relation::LessEqual,
            8.0,
        )?;
        builder.add_constr("c_1".into(), vec![(c.index(1), 1.0)], Relation::GreaterEqual, 2.0)?;
        Ok(builder.build(CompletionLayout::Direct(c))?)
    }

    #[test]
    fn blocks_get_dense_indices() -> anyhow::Result<()> {
        let mut builder = ModelBuilder::new(FormulationKind::TimeIndexed, 1);
        let first = builder.add_block(3, |k| (format!("a_{k}"), VarKind::Binary, 0.0))?;
        let second = builder.add_block(2, |k| (format!("b_{k}"), VarKind::Binary, 0.0))?;
        assert_eq!(first.indices(), 0..3);
        assert_eq!(second.base(), 3);
        assert_eq!(second.index(1), 4);
        assert_eq!(builder.variable_count(), 5);
        Ok(())
    }

    #[test]
    fn constraints_must_reference_existing_variables() -> anyhow::Result<()> {
        let mut builder = ModelBuilder::new(FormulationKind::Positional, 1);
        let x = builder.add_var("x".into(), VarKind::Binary, 0.0)?;
        assert!(matches!(
            builder.add_constr("bad".into(), vec![(x + 1, 1.0)], Relation::Equal, 1.0),
            Err(Error::Indexing(_))
        ));
        assert!(matches!(
            builder.add_constr("empty".into(), vec![], Relation::Equal, 1.0),
            Err(Error::Indexing(_))
        ));
        assert_eq!(builder.constraint_count(), 0);
        Ok(())
    }

    #[test]
    fn duplicate_names_are_rejected() -> anyhow::Result<()> {
        let mut builder = ModelBuilder::new(FormulationKind::Positional, 1);
        builder.add_var("x".into(), VarKind::Binary, 0.0)?;
        assert!(builder.add_var("x".into(), VarKind::Binary, 0.0).is_err());
        Ok(())
    }

    #[test]
    fn layout_outside_model_is_rejected() -> anyhow::Result<()> {
        let mut builder = ModelBuilder::new(FormulationKind::Precedence, 1);
        builder.add_var("C_1".into(), VarKind::Continuous, 1.0)?;
        let layout = CompletionLayout::Direct(VarBlock { base: 0, len: 2 });
        assert!(builder.build(layout).is_err());
        Ok(())
    }

    #[test]
    fn violations_check_constraints_and_domains() -> anyhow::Result<()> {
        let model = knapsack()?;
        assert!(model.violations(&[3.0, 5.0, 1.0], 1e-9)?.is_empty());
        assert_eq!(model.violations(&[3.0, 1.0, 0.0], 1e-9)?, vec![1]);
        assert_eq!(model.violations(&[3.0, 5.0, 0.5], 1e-9)?, vec![usize::MAX]);
        assert!(matches!(
            model.violations(&[3.0, 5.0], 1e-9),
            Err(Error::MalformedResult(_))
        ));
        assert!((model.objective_value(&[3.0, 5.0, 1.0]) - 8.0).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn lp_output_lists_sections() -> anyhow::Result<()> {
        let lp = knapsack()?.to_lp_string();
        assert!(lp.starts_with("\\ Model precedence_7 (precedence)\nMinimize\n obj: +1 C_1 +1 C_2\n"));
        assert!(lp.contains(" c_0: +1 C_1 -1 C_2 +10 x_1_2 <= 8\n"));
        assert!(lp.contains(" c_1: +1 C_2 >= 2\n"));
        assert!(lp.contains("Binary\n x_1_2\n"));
        assert!(!lp.contains("General"));
        assert!(lp.ends_with("End\n"));
        Ok(())
    }
}
