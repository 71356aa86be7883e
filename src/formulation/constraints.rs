//! Variables and constraints shared between formulations.
use crate::data::SiteData;
use crate::optimisation::{ConstraintKey, OptimisationModel, Variable, VariableKey};
use crate::region::RegionID;
use crate::site::TechPoint;
use std::ops::Range;

/// Add a continuous site fraction variable in `[0, 1]` for every tech point
pub fn add_site_fraction_variables(model: &mut OptimisationModel, data: &SiteData) {
    for tech_point in data.index().tech_points() {
        model.add_column(VariableKey::Site(tech_point.clone()), 0.0..=1.0);
    }
}

/// Add a demand coverage variable in `[0, 1]` for every region and timestep
pub fn add_demand_coverage_variables(model: &mut OptimisationModel, data: &SiteData) {
    for region_id in data.regions().keys() {
        for timestep in 0..data.horizon().len() {
            model.add_column(
                VariableKey::DemandCoverage {
                    region_id: region_id.clone(),
                    timestep,
                },
                0.0..=1.0,
            );
        }
    }
}

/// The site variable for a tech point.
///
/// # Panics
///
/// If the variable has not been added.
pub fn site_variable(model: &OptimisationModel, tech_point: &TechPoint) -> Variable {
    model
        .variables()
        .get_site(tech_point)
        .unwrap_or_else(|| panic!("No site variable for {tech_point}"))
}

/// Require each site's deployment to be at least its existing capacity fraction.
///
/// Sites without existing capacity are covered by the variable's lower bound already.
pub fn add_existing_capacity_floors(model: &mut OptimisationModel, data: &SiteData) {
    for (tech_point, fraction) in data.existing_capacity_fraction() {
        if fraction.value() <= 0.0 {
            continue;
        }

        let var = site_variable(model, tech_point);
        model.add_row(
            ConstraintKey::ExistingCapacityFloor(tech_point.clone()),
            fraction.value()..,
            [(var, 1.0)],
        );
    }
}

/// Terms giving the generation (GWh) of every site in a region over the given timesteps
pub fn regional_generation_terms(
    model: &OptimisationModel,
    data: &SiteData,
    region_id: &RegionID,
    steps: Range<usize>,
) -> Vec<(Variable, f64)> {
    data.index()
        .members_of(region_id)
        .filter_map(|tech_point| {
            let var = model.variables().get_site(tech_point)?;
            let generation = data.generation_potential_in(tech_point, steps.clone());
            Some((var, generation.value()))
        })
        .collect()
}
