//! Deploy a fixed capacity of each technology so as to cover as much demand as possible.
//!
//! Only a single region is supported. For every timestep `t`:
//!
//! ```text
//! sum over sites s of (generation_potential[s, t] * y[s]) >= demand[t] * x[t]
//! ```
//!
//! and for every technology `k`, `sum over sites s of k (capacity_potential[s] * y[s])` equals the
//! required capacity for `k`. The objective is to maximise `sum over t of x[t]`.
use super::constraints::{
    add_demand_coverage_variables, add_existing_capacity_floors, add_site_fraction_variables,
    regional_generation_terms, site_variable,
};
use super::{FormulationBuilder, check_deployment_vector_length};
use crate::data::SiteData;
use crate::error::ResiteError;
use crate::optimisation::{ConstraintKey, OptimisationModel, Sense, VariableKey};
use anyhow::Result;

/// Maximise demand coverage given per-technology capacity requirements
pub struct DemandWithCapacity;

impl FormulationBuilder for DemandWithCapacity {
    fn sense(&self) -> Sense {
        Sense::Maximise
    }

    fn validate(&self, data: &SiteData, deployment_vector: &[f64]) -> Result<()> {
        if data.regions().len() != 1 {
            Err(ResiteError::invalid_configuration(format!(
                "meet_demand_with_capacity supports a single region only, but there are {}",
                data.regions().len()
            )))?;
        }

        check_deployment_vector_length(deployment_vector, data.technologies().len(), "technologies")
    }

    fn add_variables(&self, model: &mut OptimisationModel, data: &SiteData) {
        add_site_fraction_variables(model, data);
        add_demand_coverage_variables(model, data);
    }

    fn add_constraints(
        &self,
        model: &mut OptimisationModel,
        data: &SiteData,
        deployment_vector: &[f64],
    ) {
        for region_id in data.regions().keys() {
            for (timestep, demand) in data.demand()[region_id].iter().enumerate() {
                let coverage = model
                    .variables()
                    .get(&VariableKey::DemandCoverage {
                        region_id: region_id.clone(),
                        timestep,
                    })
                    .expect("Demand coverage variables are added for every timestep");
                let mut terms =
                    regional_generation_terms(model, data, region_id, timestep..timestep + 1);
                terms.push((coverage, -demand.value()));
                model.add_row(
                    ConstraintKey::DemandBalance {
                        region_id: region_id.clone(),
                        timestep,
                    },
                    0.0..,
                    terms,
                );
            }
        }

        for (technology_id, required) in data.technologies().keys().zip(deployment_vector) {
            let terms: Vec<_> = data
                .index()
                .points_for_technology(technology_id)
                .map(|tp| (site_variable(model, tp), data.capacity_potential()[tp].value()))
                .collect();
            model.add_row(
                ConstraintKey::CapacityTarget(technology_id.clone()),
                *required..=*required,
                terms,
            );
        }

        add_existing_capacity_floors(model, data);
    }

    fn add_objective(&self, model: &mut OptimisationModel, _data: &SiteData) {
        let coverage: Vec<_> = model
            .variables()
            .iter()
            .filter(|(key, _)| matches!(key, VariableKey::DemandCoverage { .. }))
            .map(|(_, var)| var)
            .collect();
        for var in coverage {
            model.set_objective_coefficient(var, 1.0);
        }
    }
}
