//! Select a fixed number of sites in each region, maximising a per-site score.
//!
//! Site variables are binary. Sites which could never generate anything are left out of the
//! model, unless they already host capacity.
use super::constraints::site_variable;
use super::{FormulationBuilder, check_deployment_vector_length};
use crate::data::SiteData;
use crate::error::ResiteError;
use crate::optimisation::{ConstraintKey, OptimisationModel, Sense, VariableKey};
use crate::site::TechPoint;
use anyhow::Result;

/// The per-site quantity being maximised
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteScore {
    /// Total generation over the horizon (GWh)
    Generation,
    /// Sum of capacity factors over the horizon
    CapacityFactor,
}

/// Choose exactly `N[r]` sites in each region `r`
pub struct SiteCount {
    score: SiteScore,
}

impl SiteCount {
    /// Create a new [`SiteCount`] maximising the given score
    pub fn new(score: SiteScore) -> Self {
        Self { score }
    }

    fn score(&self, data: &SiteData, tech_point: &TechPoint) -> f64 {
        match self.score {
            SiteScore::Generation => data.total_generation_potential(tech_point).value(),
            SiteScore::CapacityFactor => data.capacity_factors()[tech_point]
                .iter()
                .map(|cf| cf.value())
                .sum(),
        }
    }
}

/// Whether a tech point can be chosen
fn is_selectable(data: &SiteData, tech_point: &TechPoint) -> bool {
    data.has_existing_capacity(tech_point)
        || data.total_generation_potential(tech_point).value() > 0.0
}

impl FormulationBuilder for SiteCount {
    fn sense(&self) -> Sense {
        Sense::Maximise
    }

    fn validate(&self, data: &SiteData, deployment_vector: &[f64]) -> Result<()> {
        check_deployment_vector_length(deployment_vector, data.regions().len(), "regions")?;

        for (region_id, count) in data.regions().keys().zip(deployment_vector) {
            if count.fract() != 0.0 {
                Err(ResiteError::invalid_configuration(format!(
                    "The number of sites to select in region {region_id} must be a whole \
                    number (got {count})"
                )))?;
            }

            let available = data
                .index()
                .members_of(region_id)
                .filter(|tp| is_selectable(data, tp))
                .count();
            if *count > available as f64 {
                Err(ResiteError::invalid_configuration(format!(
                    "Cannot select {count} sites in region {region_id}, which only has \
                    {available} candidate sites"
                )))?;
            }
        }

        Ok(())
    }

    fn add_variables(&self, model: &mut OptimisationModel, data: &SiteData) {
        for tech_point in data.index().tech_points() {
            if is_selectable(data, tech_point) {
                model.add_integer_column(VariableKey::Site(tech_point.clone()), 0.0..=1.0);
            }
        }
    }

    fn add_constraints(
        &self,
        model: &mut OptimisationModel,
        data: &SiteData,
        deployment_vector: &[f64],
    ) {
        for (region_id, count) in data.regions().keys().zip(deployment_vector) {
            let terms: Vec<_> = data
                .index()
                .members_of(region_id)
                .filter_map(|tp| model.variables().get_site(tp))
                .map(|var| (var, 1.0))
                .collect();
            model.add_row(
                ConstraintKey::SiteCount(region_id.clone()),
                *count..=*count,
                terms,
            );
        }
    }

    fn add_objective(&self, model: &mut OptimisationModel, data: &SiteData) {
        for tech_point in data.index().tech_points() {
            if is_selectable(data, tech_point) {
                let var = site_variable(model, tech_point);
                model.set_objective_coefficient(var, self.score(data, tech_point));
            }
        }
    }
}
