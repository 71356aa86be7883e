//! The HiGHS backend.
use super::{
    RawSolution, SolutionStatus, SolverBackend, SolverName, SolverOptionValue, SolverOptions,
};
use crate::optimisation::{OptimisationModel, Sense};
use ::highs::{HighsModelStatus, RowProblem as Problem};
use anyhow::Result;

/// Solves models with HiGHS, supporting both continuous and binary variables
pub struct HighsBackend;

impl From<Sense> for ::highs::Sense {
    fn from(sense: Sense) -> Self {
        match sense {
            Sense::Minimise => ::highs::Sense::Minimise,
            Sense::Maximise => ::highs::Sense::Maximise,
        }
    }
}

/// Map a HiGHS model status onto a [`SolutionStatus`]
fn convert_status(status: HighsModelStatus) -> SolutionStatus {
    match status {
        HighsModelStatus::Optimal | HighsModelStatus::ModelEmpty => SolutionStatus::Optimal,
        HighsModelStatus::Infeasible => SolutionStatus::Infeasible,
        HighsModelStatus::Unbounded | HighsModelStatus::UnboundedOrInfeasible => {
            SolutionStatus::Unbounded
        }
        HighsModelStatus::ReachedTimeLimit | HighsModelStatus::ReachedIterationLimit => {
            SolutionStatus::TimeLimitReached
        }
        _ => SolutionStatus::SolverError,
    }
}

/// Enable logging for the HiGHS solver
fn enable_highs_logging(model: &mut ::highs::Model) {
    // Skip this step if logging is disabled (e.g. when running tests)
    if let Ok(log_level) = std::env::var(crate::log::LOG_LEVEL_ENV_VAR)
        && log_level.eq_ignore_ascii_case("off")
    {
        return;
    }

    model.set_option("log_to_console", true);
    model.set_option("output_flag", true);
}

impl SolverBackend for HighsBackend {
    fn name(&self) -> SolverName {
        SolverName::Highs
    }

    fn solve(&self, model: &OptimisationModel, options: &SolverOptions) -> Result<RawSolution> {
        let mut problem = Problem::default();
        let cols: Vec<_> = model
            .columns()
            .iter()
            .map(|col| {
                let bounds = col.lower..=col.upper;
                if col.integer {
                    problem.add_integer_column(col.objective, bounds)
                } else {
                    problem.add_column(col.objective, bounds)
                }
            })
            .collect();

        for row in model.rows() {
            problem.add_row(
                row.lower..=row.upper,
                row.terms.iter().map(|(var, coeff)| (cols[var.index()], *coeff)),
            );
        }

        let mut highs_model = problem.optimise(model.sense().into());
        enable_highs_logging(&mut highs_model);
        for (name, value) in options {
            match value {
                SolverOptionValue::Bool(v) => highs_model.set_option(name.as_str(), *v),
                SolverOptionValue::Int(v) => highs_model.set_option(name.as_str(), *v),
                SolverOptionValue::Float(v) => highs_model.set_option(name.as_str(), *v),
                SolverOptionValue::String(v) => highs_model.set_option(name.as_str(), v.as_str()),
            }
        }

        let solved = highs_model.solve();
        let highs_status = solved.status();
        let status = convert_status(highs_status);
        let message = format!("HiGHS model status: {highs_status:?}");
        if !status.has_solution() {
            return Ok(RawSolution::failed(status, message));
        }

        let solution = solved.get_solution();
        Ok(RawSolution::from_columns(
            model,
            status,
            solved.objective_value(),
            solution.columns(),
            message,
        ))
    }
}
