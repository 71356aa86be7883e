//! The stages of a site-selection run, from a loaded model to a solution on disk.
//!
//! Each stage takes the output of the one before it and returns a new value. Parameters shared by
//! every stage are carried in a [`RunContext`].
use crate::data::SiteData;
use crate::formulation::{Formulation, build_model};
use crate::model::Model;
use crate::optimisation::OptimisationModel;
use crate::optimisation::lp_file::write_lp;
use crate::output::metadata::write_metadata;
use crate::output::{DataWriter, ObjectiveSummary, write_objective};
use crate::solution::{Solution, extract_solution};
use crate::solver::{self, RawSolution, SolverName};
use anyhow::Result;
use log::{debug, info};
use std::path::Path;

/// The output file name for the LP dump of the assembled model
const LP_FILE_NAME: &str = "model.lp";

/// Parameters resolved once at the start of a run and passed to every stage
pub struct RunContext<'a> {
    /// Path to the model folder
    pub model_path: &'a Path,
    /// The formulation to build
    pub formulation: Formulation,
    /// The solver backend to use
    pub solver: SolverName,
    /// The model being run
    pub model: &'a Model,
}

impl<'a> RunContext<'a> {
    /// Resolve the formulation and solver named in the model's parameters
    pub fn new(model: &'a Model) -> Result<Self> {
        Ok(Self {
            model_path: &model.model_path,
            formulation: model.parameters.formulation.formulation()?,
            solver: model.parameters.solver.solver_name()?,
            model,
        })
    }

    /// The validated site data
    pub fn data(&self) -> &'a SiteData {
        &self.model.data
    }
}

/// Assemble the optimisation model for the requested formulation
pub fn build_stage(ctx: &RunContext) -> Result<OptimisationModel> {
    build_model(&ctx.model.parameters.formulation, ctx.data())
}

/// Hand the model to the solver backend
pub fn solve_stage(ctx: &RunContext, model: &OptimisationModel) -> Result<RawSolution> {
    solver::solve(model, ctx.solver, &ctx.model.parameters.solver.options)
}

/// Map the solver's output back onto tech points
pub fn extract_stage(
    ctx: &RunContext,
    raw: &RawSolution,
    model: &OptimisationModel,
) -> Result<Solution> {
    let solution = extract_solution(
        raw,
        model,
        ctx.data(),
        ctx.model.parameters.solver.selection_epsilon,
    )?;
    info!(
        "Selected {} of {} candidate sites ({} GW installed)",
        solution.selected.len(),
        ctx.data().index().len(),
        solution.total_installed_capacity().value()
    );
    for (technology_id, coordinates) in solution.selected_by_technology() {
        debug!("{technology_id}: {} sites selected", coordinates.len());
    }

    Ok(solution)
}

/// Build, solve and extract the solution for a model without writing anything to disk
pub fn solve_model(model: &Model) -> Result<Solution> {
    let ctx = RunContext::new(model)?;
    let opt_model = build_stage(&ctx)?;
    let raw = solve_stage(&ctx, &opt_model)?;
    extract_stage(&ctx, &raw, &opt_model)
}

/// Run the model and write the results to `output_path`.
///
/// # Arguments
///
/// * `model` - The model to run
/// * `output_path` - The folder to which output files will be written
/// * `debug_model` - Whether to write additional information to CSV files
pub fn run(model: &Model, output_path: &Path, debug_model: bool) -> Result<Solution> {
    let ctx = RunContext::new(model)?;
    let formulation_name = ctx.formulation.to_string();
    let solver_name = ctx.solver.to_string();
    write_metadata(output_path, ctx.model_path, &formulation_name, &solver_name)?;

    let opt_model = build_stage(&ctx)?;
    if model.parameters.formulation.write_lp {
        let lp_path = output_path.join(LP_FILE_NAME);
        write_lp(&opt_model, &lp_path)?;
        info!("Model written to {}", lp_path.display());
    }

    let raw = solve_stage(&ctx, &opt_model)?;
    let solution = extract_stage(&ctx, &raw, &opt_model)?;

    let mut writer = DataWriter::create(output_path, debug_model)?;
    writer.write_solution(&solution, ctx.data())?;
    writer.write_debug_info(ctx.data())?;
    writer.flush()?;

    write_objective(
        output_path,
        &ObjectiveSummary {
            formulation: &formulation_name,
            solver: &solver_name,
            status: solution.status,
            objective: solution.objective,
            total_installed_capacity: solution.total_installed_capacity().value(),
            selected_sites: solution.selected.len(),
        },
    )?;

    Ok(solution)
}
