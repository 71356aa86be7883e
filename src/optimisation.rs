//! A solver-agnostic representation of an optimisation problem.
//!
//! Formulations build an [`OptimisationModel`] from columns (decision variables) and rows (linear
//! constraints). Solver backends translate it into their own problem type, so the same model can
//! be solved by any backend or written to disk with [`lp_file::write_lp`].
use crate::region::RegionID;
use crate::site::TechPoint;
use crate::technology::TechnologyID;
use indexmap::IndexMap;
use std::fmt;
use std::ops::{Bound, RangeBounds};

pub mod lp_file;

/// A decision variable in the optimisation
///
/// Note that this type does **not** include the value of the variable; it just refers to a
/// particular column of the problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Variable(usize);

impl Variable {
    /// The index of the column for this variable
    pub fn index(self) -> usize {
        self.0
    }
}

/// What a decision variable represents
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VariableKey {
    /// Fraction of a site's capacity potential to deploy (or whether to select it)
    Site(TechPoint),
    /// Fraction of a region's demand covered at a given timestep
    DemandCoverage {
        /// The region
        region_id: RegionID,
        /// Index into the time horizon
        timestep: usize,
    },
}

impl fmt::Display for VariableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Site(tech_point) => write!(f, "site {tech_point}"),
            Self::DemandCoverage {
                region_id,
                timestep,
            } => write!(f, "demand coverage in {region_id} at timestep {timestep}"),
        }
    }
}

/// A map for easy lookup of variables in the problem.
///
/// The entries are ordered (see [`IndexMap`]) and their position matches the column index.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct VariableMap(IndexMap<VariableKey, Variable>);

impl VariableMap {
    /// Get the [`Variable`] for the given key, if there is one
    pub fn get(&self, key: &VariableKey) -> Option<Variable> {
        self.0.get(key).copied()
    }

    /// Get the site variable for the given tech point, if there is one
    pub fn get_site(&self, tech_point: &TechPoint) -> Option<Variable> {
        self.get(&VariableKey::Site(tech_point.clone()))
    }

    /// The key for the given variable
    pub fn key(&self, variable: Variable) -> &VariableKey {
        let (key, _) = self
            .0
            .get_index(variable.index())
            .expect("Variable does not belong to this model");
        key
    }

    /// Iterate over keys and variables in column order
    pub fn iter(&self) -> impl Iterator<Item = (&VariableKey, Variable)> {
        self.0.iter().map(|(key, var)| (key, *var))
    }

    /// The number of variables
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no variables
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// What a constraint represents
#[derive(Debug, Clone, PartialEq)]
pub enum ConstraintKey {
    /// Renewable generation must meet a share of demand over a bucket of timesteps
    GenerationTarget {
        /// The region
        region_id: RegionID,
        /// Index of the time bucket
        bucket: usize,
    },
    /// Demand coverage at a timestep is limited by generation
    DemandBalance {
        /// The region
        region_id: RegionID,
        /// Index into the time horizon
        timestep: usize,
    },
    /// Deployment at a site cannot fall below its existing capacity
    ExistingCapacityFloor(TechPoint),
    /// Total deployed capacity of a technology must equal its target
    CapacityTarget(TechnologyID),
    /// The number of sites selected in a region must equal its target
    SiteCount(RegionID),
}

impl fmt::Display for ConstraintKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GenerationTarget { region_id, bucket } => {
                write!(f, "generation target for {region_id} in bucket {bucket}")
            }
            Self::DemandBalance {
                region_id,
                timestep,
            } => write!(f, "demand balance for {region_id} at timestep {timestep}"),
            Self::ExistingCapacityFloor(tech_point) => {
                write!(f, "existing capacity floor for {tech_point}")
            }
            Self::CapacityTarget(technology_id) => {
                write!(f, "capacity target for {technology_id}")
            }
            Self::SiteCount(region_id) => write!(f, "site count for {region_id}"),
        }
    }
}

/// Whether the objective is minimised or maximised
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    /// Minimise the objective
    Minimise,
    /// Maximise the objective
    Maximise,
}

/// A decision variable's bounds, objective coefficient and domain
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Lower bound (may be `-inf`)
    pub lower: f64,
    /// Upper bound (may be `inf`)
    pub upper: f64,
    /// Objective coefficient
    pub objective: f64,
    /// Whether the variable is restricted to integer values
    pub integer: bool,
}

/// A linear constraint `lower <= sum(coeff * var) <= upper`
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// What the constraint represents
    pub key: ConstraintKey,
    /// Lower bound (may be `-inf`)
    pub lower: f64,
    /// Upper bound (may be `inf`)
    pub upper: f64,
    /// Coefficients of the variables involved
    pub terms: Vec<(Variable, f64)>,
}

impl Row {
    /// Whether the row is an equality constraint
    pub fn is_equality(&self) -> bool {
        self.lower == self.upper
    }
}

/// Convert a range into a pair of lower and upper bounds.
///
/// # Panics
///
/// Panics if either bound is exclusive.
fn bounds_to_pair<B: RangeBounds<f64>>(bounds: B) -> (f64, f64) {
    let lower = match bounds.start_bound() {
        Bound::Included(v) => *v,
        Bound::Excluded(_) => panic!("Exclusive lower bounds are not supported"),
        Bound::Unbounded => f64::NEG_INFINITY,
    };
    let upper = match bounds.end_bound() {
        Bound::Included(v) => *v,
        Bound::Excluded(_) => panic!("Exclusive upper bounds are not supported"),
        Bound::Unbounded => f64::INFINITY,
    };

    (lower, upper)
}

/// A linear (or mixed-integer linear) optimisation problem
#[derive(Debug, Clone, PartialEq)]
pub struct OptimisationModel {
    sense: Sense,
    columns: Vec<Column>,
    rows: Vec<Row>,
    variables: VariableMap,
}

impl OptimisationModel {
    /// Create an empty model with the given objective sense
    pub fn new(sense: Sense) -> Self {
        Self {
            sense,
            columns: Vec::new(),
            rows: Vec::new(),
            variables: VariableMap::default(),
        }
    }

    /// Add a continuous variable with the given bounds
    pub fn add_column<B: RangeBounds<f64>>(&mut self, key: VariableKey, bounds: B) -> Variable {
        self.push_column(key, bounds, false)
    }

    /// Add an integer variable with the given bounds
    pub fn add_integer_column<B: RangeBounds<f64>>(
        &mut self,
        key: VariableKey,
        bounds: B,
    ) -> Variable {
        self.push_column(key, bounds, true)
    }

    fn push_column<B: RangeBounds<f64>>(
        &mut self,
        key: VariableKey,
        bounds: B,
        integer: bool,
    ) -> Variable {
        let (lower, upper) = bounds_to_pair(bounds);
        let var = Variable(self.columns.len());
        let existing = self.variables.0.insert(key, var);
        assert!(existing.is_none(), "Duplicate variable key");
        self.columns.push(Column {
            lower,
            upper,
            objective: 0.0,
            integer,
        });

        var
    }

    /// Set the objective coefficient for a variable
    pub fn set_objective_coefficient(&mut self, var: Variable, coeff: f64) {
        self.columns[var.index()].objective = coeff;
    }

    /// Add a constraint with the given bounds
    pub fn add_row<B, I>(&mut self, key: ConstraintKey, bounds: B, terms: I)
    where
        B: RangeBounds<f64>,
        I: IntoIterator<Item = (Variable, f64)>,
    {
        let (lower, upper) = bounds_to_pair(bounds);
        self.rows.push(Row {
            key,
            lower,
            upper,
            terms: terms.into_iter().collect(),
        });
    }

    /// The objective sense
    pub fn sense(&self) -> Sense {
        self.sense
    }

    /// The columns, in order
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// The rows, in order
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// The variables and what they represent
    pub fn variables(&self) -> &VariableMap {
        &self.variables
    }

    /// Whether any variable is restricted to integer values
    pub fn has_integer_columns(&self) -> bool {
        self.columns.iter().any(|col| col.integer)
    }

    /// Evaluate the objective for the given column values
    pub fn evaluate_objective(&self, values: &[f64]) -> f64 {
        self.columns
            .iter()
            .zip(values)
            .map(|(col, value)| col.objective * value)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::site::Coordinate;

    fn site(longitude: f64) -> VariableKey {
        VariableKey::Site(TechPoint::new("wind".into(), Coordinate::new(longitude, 0.0)))
    }

    #[test]
    fn test_add_columns_and_rows() {
        let mut model = OptimisationModel::new(Sense::Minimise);
        let y0 = model.add_column(site(0.0), 0.0..=1.0);
        let y1 = model.add_integer_column(site(1.0), 0.0..=1.0);
        model.set_objective_coefficient(y0, 2.0);
        model.add_row(
            ConstraintKey::SiteCount("R1".into()),
            1.0..=1.0,
            [(y0, 1.0), (y1, 1.0)],
        );
        model.add_row(ConstraintKey::CapacityTarget("wind".into()), 3.0.., [(y0, 1.0)]);

        assert_eq!(y1.index(), 1);
        assert!(model.has_integer_columns());
        assert_eq!(model.variables().get(&site(1.0)), Some(y1));
        assert_eq!(model.variables().key(y0), &site(0.0));
        assert!(model.rows()[0].is_equality());
        assert_eq!(model.rows()[1].upper, f64::INFINITY);
        assert_eq!(model.evaluate_objective(&[0.5, 1.0]), 1.0);
    }

    #[test]
    #[should_panic(expected = "Duplicate variable key")]
    fn test_duplicate_column() {
        let mut model = OptimisationModel::new(Sense::Maximise);
        model.add_column(site(0.0), 0.0..=1.0);
        model.add_column(site(0.0), 0.0..=1.0);
    }

    #[test]
    #[should_panic(expected = "Exclusive upper bounds are not supported")]
    fn test_exclusive_bound() {
        let mut model = OptimisationModel::new(Sense::Maximise);
        model.add_column(site(0.0), 0.0..1.0);
    }
}
