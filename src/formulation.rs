//! The catalogue of site-selection formulations.
//!
//! Every formulation shares the same vocabulary of decision variables (a site variable per tech
//! point and, for some, a demand coverage variable per region and timestep) but differs in its
//! constraints and objective. Each is implemented by a [`FormulationBuilder`].
use crate::data::SiteData;
use crate::error::ResiteError;
use crate::optimisation::{OptimisationModel, Sense};
use crate::time::TimeBucketing;
use anyhow::Result;
use itertools::Itertools;
use log::info;
use serde::Deserialize;
use std::str::FromStr;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

mod constraints;
mod demand_with_capacity;
use demand_with_capacity::DemandWithCapacity;
mod res_targets;
use res_targets::ResTargets;
mod site_count;
use site_count::{SiteCount, SiteScore};

/// The available formulations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
pub enum Formulation {
    /// Meet a renewable share of demand over the whole horizon, at minimum capacity
    #[strum(serialize = "meet_RES_targets_agg")]
    MeetResTargetsAgg,
    /// Meet a renewable share of demand in every hour, at minimum capacity
    #[strum(serialize = "meet_RES_targets_hourly")]
    MeetResTargetsHourly,
    /// Meet a renewable share of demand on every day, at minimum capacity
    #[strum(serialize = "meet_RES_targets_daily")]
    MeetResTargetsDaily,
    /// Meet a renewable share of demand in every week, at minimum capacity
    #[strum(serialize = "meet_RES_targets_weekly")]
    MeetResTargetsWeekly,
    /// Meet a renewable share of demand in every month, at minimum capacity
    #[strum(serialize = "meet_RES_targets_monthly")]
    MeetResTargetsMonthly,
    /// Deploy a fixed capacity of each technology so as to cover as much demand as possible
    #[strum(serialize = "meet_demand_with_capacity")]
    MeetDemandWithCapacity,
    /// Select a fixed number of sites per region, maximising generation
    #[strum(serialize = "maximize_generation")]
    MaximizeGeneration,
    /// Select a fixed number of sites per region, maximising summed capacity factors
    #[strum(serialize = "maximize_aggr_cap_factor")]
    MaximizeAggrCapFactor,
}

impl Formulation {
    /// Look up a formulation by name.
    ///
    /// Fails with [`ResiteError::UnsupportedFormulation`] if the name is not in the catalogue.
    pub fn from_name(name: &str) -> Result<Self> {
        let formulation = Self::from_str(name).map_err(|_| ResiteError::UnsupportedFormulation {
            name: name.to_string(),
            accepted: Self::iter().join(", "),
        })?;

        Ok(formulation)
    }

    /// How demand targets are bucketed in time, for formulations with renewable share targets
    pub fn time_bucketing(self) -> Option<TimeBucketing> {
        match self {
            Self::MeetResTargetsAgg => Some(TimeBucketing::Aggregate),
            Self::MeetResTargetsHourly => Some(TimeBucketing::Hourly),
            Self::MeetResTargetsDaily => Some(TimeBucketing::Daily),
            Self::MeetResTargetsWeekly => Some(TimeBucketing::Weekly),
            Self::MeetResTargetsMonthly => Some(TimeBucketing::Monthly),
            _ => None,
        }
    }

    fn builder(self) -> Box<dyn FormulationBuilder> {
        if let Some(bucketing) = self.time_bucketing() {
            return Box::new(ResTargets::new(bucketing));
        }

        match self {
            Self::MeetDemandWithCapacity => Box::new(DemandWithCapacity),
            Self::MaximizeGeneration => Box::new(SiteCount::new(SiteScore::Generation)),
            Self::MaximizeAggrCapFactor => Box::new(SiteCount::new(SiteScore::CapacityFactor)),
            _ => unreachable!("{self} has renewable share targets"),
        }
    }
}

/// The `[formulation]` section of the model file
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FormulationRequest {
    /// Name of the formulation
    pub name: String,
    /// Per-region or per-technology targets, depending on the formulation
    #[serde(default)]
    pub deployment_vector: Vec<f64>,
    /// Whether to write the assembled model to an LP file
    #[serde(default)]
    pub write_lp: bool,
}

impl FormulationRequest {
    /// The requested formulation
    pub fn formulation(&self) -> Result<Formulation> {
        Formulation::from_name(&self.name)
    }
}

/// Builds the variables, constraints and objective of one formulation
trait FormulationBuilder {
    /// The optimisation sense
    fn sense(&self) -> Sense;

    /// Check the deployment vector against the data, before anything is built
    fn validate(&self, data: &SiteData, deployment_vector: &[f64]) -> Result<()>;

    /// Add variables to the model
    fn add_variables(&self, model: &mut OptimisationModel, data: &SiteData);

    /// Add constraints to the model
    fn add_constraints(
        &self,
        model: &mut OptimisationModel,
        data: &SiteData,
        deployment_vector: &[f64],
    );

    /// Set objective coefficients
    fn add_objective(&self, model: &mut OptimisationModel, data: &SiteData);
}

/// Check that the deployment vector has one entry per item
fn check_deployment_vector_length(
    deployment_vector: &[f64],
    expected: usize,
    what: &str,
) -> Result<()> {
    if deployment_vector.len() != expected {
        Err(ResiteError::invalid_configuration(format!(
            "Deployment vector has {} entries, but there are {expected} {what}",
            deployment_vector.len()
        )))?;
    }

    Ok(())
}

/// Build the optimisation model for the requested formulation.
///
/// # Arguments
///
/// * `request` - The formulation name and its deployment vector
/// * `data` - Validated site data
pub fn build_model(request: &FormulationRequest, data: &SiteData) -> Result<OptimisationModel> {
    let formulation = request.formulation()?;
    if let Some(value) = request
        .deployment_vector
        .iter()
        .find(|value| !value.is_finite() || **value < 0.0)
    {
        Err(ResiteError::invalid_configuration(format!(
            "Deployment vector entries must be finite and not negative (got {value})"
        )))?;
    }

    let builder = formulation.builder();
    builder.validate(data, &request.deployment_vector)?;

    let mut model = OptimisationModel::new(builder.sense());
    builder.add_variables(&mut model, data);
    builder.add_constraints(&mut model, data, &request.deployment_vector);
    builder.add_objective(&mut model, data);
    info!(
        "Built {formulation} model with {} variables and {} constraints",
        model.columns().len(),
        model.rows().len()
    );

    Ok(model)
}
