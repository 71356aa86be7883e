//! The Clarabel backend, via `good_lp`.
//!
//! Clarabel is an interior-point solver, so it only handles continuous problems. Formulations with
//! binary variables must be solved with HiGHS.
use super::{RawSolution, SolutionStatus, SolverBackend, SolverName, SolverOptions};
use crate::optimisation::{Column, OptimisationModel, Sense};
use anyhow::Result;
use good_lp::solvers::clarabel::clarabel;
use good_lp::{
    Expression, ResolutionError, Solution, SolverModel, Variable, constraint, variable, variables,
};
use log::warn;

/// Distance from a column bound within which an interior-point value is moved onto the bound
const BOUND_TOLERANCE: f64 = 1e-7;

/// Solves continuous models with Clarabel
pub struct ClarabelBackend;

/// Build a linear expression from a list of terms
fn linear_expression(
    cols: &[Variable],
    terms: &[(crate::optimisation::Variable, f64)],
) -> Expression {
    let mut expr = Expression::from(0.0);
    for (var, coeff) in terms {
        expr += *coeff * cols[var.index()];
    }

    expr
}

/// Move a value onto the nearest finite bound of its column if it lies within [`BOUND_TOLERANCE`]
fn snap_to_bounds(column: &Column, value: f64) -> f64 {
    if column.lower.is_finite() && (value - column.lower).abs() <= BOUND_TOLERANCE {
        column.lower
    } else if column.upper.is_finite() && (value - column.upper).abs() <= BOUND_TOLERANCE {
        column.upper
    } else {
        value
    }
}

impl SolverBackend for ClarabelBackend {
    fn name(&self) -> SolverName {
        SolverName::Clarabel
    }

    fn solve(&self, model: &OptimisationModel, options: &SolverOptions) -> Result<RawSolution> {
        if model.has_integer_columns() {
            return Ok(RawSolution::failed(
                SolutionStatus::SolverError,
                "Clarabel cannot solve problems with integer variables",
            ));
        }

        if !options.is_empty() {
            warn!("Solver options are ignored by the clarabel backend");
        }

        let mut vars = variables!();
        let cols: Vec<Variable> = model
            .columns()
            .iter()
            .map(|col| {
                let mut definition = variable();
                if col.lower.is_finite() {
                    definition = definition.min(col.lower);
                }
                if col.upper.is_finite() {
                    definition = definition.max(col.upper);
                }
                vars.add(definition)
            })
            .collect();

        let mut objective = Expression::from(0.0);
        for (col, var) in model.columns().iter().zip(&cols) {
            objective += col.objective * *var;
        }

        let problem = match model.sense() {
            Sense::Minimise => vars.minimise(objective),
            Sense::Maximise => vars.maximise(objective),
        };
        let mut problem = problem.using(clarabel);

        for row in model.rows() {
            let expr = linear_expression(&cols, &row.terms);
            if row.is_equality() {
                let rhs = row.lower;
                problem = problem.with(constraint!(expr == rhs));
                continue;
            }

            if row.lower.is_finite() {
                let lhs = expr.clone();
                let lower = row.lower;
                problem = problem.with(constraint!(lhs >= lower));
            }
            if row.upper.is_finite() {
                let upper = row.upper;
                problem = problem.with(constraint!(expr <= upper));
            }
        }

        let solution = match problem.solve() {
            Ok(solution) => solution,
            Err(err) => {
                let status = match err {
                    ResolutionError::Infeasible => SolutionStatus::Infeasible,
                    ResolutionError::Unbounded => SolutionStatus::Unbounded,
                    _ => SolutionStatus::SolverError,
                };
                return Ok(RawSolution::failed(status, err.to_string()));
            }
        };

        // Interior-point solutions approach the bounds without reaching them
        let values: Vec<f64> = model
            .columns()
            .iter()
            .zip(&cols)
            .map(|(column, var)| snap_to_bounds(column, solution.value(*var)))
            .collect();
        // Clarabel does not report the value of a linear objective directly
        let objective = model.evaluate_objective(&values);
        Ok(RawSolution::from_columns(
            model,
            SolutionStatus::Optimal,
            objective,
            &values,
            "Clarabel solve succeeded",
        ))
    }
}
