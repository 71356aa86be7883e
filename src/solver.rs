//! Solver backends and the solver-independent result of a solve.
use crate::optimisation::{OptimisationModel, VariableKey};
use anyhow::Result;
use indexmap::IndexMap;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

pub mod clarabel;
pub mod highs;

/// The outcome of a solve, independent of the backend used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
pub enum SolutionStatus {
    /// An optimal solution was found
    #[strum(serialize = "optimal")]
    #[serde(rename = "optimal")]
    Optimal,
    /// The problem has no feasible solution
    #[strum(serialize = "infeasible")]
    #[serde(rename = "infeasible")]
    Infeasible,
    /// The objective is unbounded
    #[strum(serialize = "unbounded")]
    #[serde(rename = "unbounded")]
    Unbounded,
    /// The solver stopped early; the incumbent solution is returned
    #[strum(serialize = "timeLimitReached")]
    #[serde(rename = "timeLimitReached")]
    TimeLimitReached,
    /// The solver failed for another reason
    #[strum(serialize = "solverError")]
    #[serde(rename = "solverError")]
    SolverError,
}

impl SolutionStatus {
    /// Whether variable values are available for this status
    pub fn has_solution(self) -> bool {
        matches!(self, Self::Optimal | Self::TimeLimitReached)
    }
}

/// The values returned by a solver backend
#[derive(Debug, Clone, PartialEq)]
pub struct RawSolution {
    /// The outcome of the solve
    pub status: SolutionStatus,
    /// The objective value (`NaN` if there is no solution)
    pub objective: f64,
    /// The value of every variable (empty if there is no solution)
    pub values: IndexMap<VariableKey, f64>,
    /// Diagnostic message from the solver
    pub message: String,
}

impl RawSolution {
    /// A result with no solution values
    pub fn failed(status: SolutionStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            objective: f64::NAN,
            values: IndexMap::new(),
            message: message.into(),
        }
    }

    /// Pair the column values returned by a solver with the model's variable keys
    pub fn from_columns(
        model: &OptimisationModel,
        status: SolutionStatus,
        objective: f64,
        columns: &[f64],
        message: impl Into<String>,
    ) -> Self {
        let values = model
            .variables()
            .iter()
            .map(|(key, var)| (key.clone(), columns[var.index()]))
            .collect();

        Self {
            status,
            objective,
            values,
            message: message.into(),
        }
    }
}

/// The value of a solver option
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SolverOptionValue {
    /// A boolean option
    Bool(bool),
    /// An integer option
    Int(i32),
    /// A floating-point option
    Float(f64),
    /// A string option
    String(String),
}

/// Options passed through to the solver, keyed by name
pub type SolverOptions = IndexMap<String, SolverOptionValue>;

/// The available solver backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
pub enum SolverName {
    /// The HiGHS LP/MIP solver
    #[strum(serialize = "highs")]
    Highs,
    /// The Clarabel interior-point solver (continuous problems only)
    #[strum(serialize = "clarabel")]
    Clarabel,
}

impl SolverName {
    /// The names of every backend
    pub fn accepted_names() -> Vec<String> {
        Self::iter().map(|name| name.to_string()).collect()
    }
}

/// A solver capable of solving an [`OptimisationModel`]
pub trait SolverBackend {
    /// The name of the backend
    fn name(&self) -> SolverName;

    /// Solve the model.
    ///
    /// A failure to find a solution is reported through [`RawSolution::status`]. Errors are
    /// reserved for problems with the request itself (e.g. an invalid option).
    fn solve(&self, model: &OptimisationModel, options: &SolverOptions) -> Result<RawSolution>;
}

/// Get the backend with the given name
pub fn get_backend(name: SolverName) -> Box<dyn SolverBackend> {
    match name {
        SolverName::Highs => Box::new(highs::HighsBackend),
        SolverName::Clarabel => Box::new(clarabel::ClarabelBackend),
    }
}

/// Solve the model with the given backend
pub fn solve(
    model: &OptimisationModel,
    name: SolverName,
    options: &SolverOptions,
) -> Result<RawSolution> {
    let backend = get_backend(name);
    info!(
        "Solving model with {} variables and {} constraints using {}",
        model.columns().len(),
        model.rows().len(),
        backend.name()
    );
    let solution = backend.solve(model, options)?;
    match solution.status {
        SolutionStatus::Optimal => info!("Optimal solution found (objective: {})", solution.objective),
        SolutionStatus::TimeLimitReached => warn!(
            "Solver stopped before reaching optimality (objective: {})",
            solution.objective
        ),
        status => warn!("Solver finished with status {status}: {}", solution.message),
    }

    Ok(solution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::str::FromStr;

    #[rstest]
    #[case(SolutionStatus::Optimal, "optimal", true)]
    #[case(SolutionStatus::TimeLimitReached, "timeLimitReached", true)]
    #[case(SolutionStatus::Infeasible, "infeasible", false)]
    #[case(SolutionStatus::SolverError, "solverError", false)]
    fn test_solution_status(
        #[case] status: SolutionStatus,
        #[case] name: &str,
        #[case] has_solution: bool,
    ) {
        assert_eq!(status.to_string(), name);
        assert_eq!(status.has_solution(), has_solution);
    }

    #[test]
    fn test_solver_name() {
        assert_eq!(SolverName::from_str("highs").unwrap(), SolverName::Highs);
        assert!(SolverName::from_str("gurobi").is_err());
        assert_eq!(SolverName::accepted_names(), ["highs", "clarabel"]);
    }

    #[test]
    fn test_get_backend() {
        for name in SolverName::iter() {
            assert_eq!(get_backend(name).name(), name);
        }
    }
}
