//! Validated, index-aligned site data shared by every formulation.
use crate::error::ResiteError;
use crate::index::SiteIndex;
use crate::input::PreparedData;
use crate::region::{RegionID, RegionMap};
use crate::site::{TechPoint, TechPointMap};
use crate::technology::TechnologyMap;
use crate::time::TimeHorizon;
use crate::units::{Capacity, Dimensionless, Energy};
use anyhow::Result;
use indexmap::IndexMap;
use std::ops::Range;

/// Input tables aligned to a [`SiteIndex`].
///
/// Every tech point table has exactly one entry for each tech point in the index, stored in
/// canonical order, and every time series has one value per timestamp of the horizon.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteData {
    index: SiteIndex,
    technologies: TechnologyMap,
    regions: RegionMap,
    horizon: TimeHorizon,
    capacity_factors: TechPointMap<Vec<Dimensionless>>,
    capacity_potential: TechPointMap<Capacity>,
    existing_capacity: TechPointMap<Capacity>,
    existing_capacity_fraction: TechPointMap<Dimensionless>,
    generation_potential: TechPointMap<Vec<Energy>>,
    demand: IndexMap<RegionID, Vec<Energy>>,
}

impl SiteData {
    /// Align the prepared tables to the index and derive generation potential.
    ///
    /// Fails with [`ResiteError::DataAlignment`] if any table does not match the index.
    pub fn new(index: SiteIndex, prepared: PreparedData) -> Result<Self> {
        let n_steps = prepared.horizon.len();
        let capacity_factors = align_to_index("capacity factors", prepared.capacity_factors, &index)?;
        check_series_lengths("capacity factors", capacity_factors.values(), n_steps)?;
        let capacity_potential =
            align_to_index("capacity potential", prepared.capacity_potential, &index)?;
        let existing_capacity =
            align_to_index("existing capacity", prepared.existing_capacity, &index)?;
        let existing_capacity_fraction = align_to_index(
            "existing capacity fraction",
            prepared.existing_capacity_fraction,
            &index,
        )?;

        let mut demand = prepared.demand;
        let mut aligned_demand = IndexMap::new();
        for region_id in prepared.regions.keys() {
            let series = demand.swap_remove(region_id).ok_or_else(|| {
                ResiteError::data_alignment("demand", format!("No series for region {region_id}"))
            })?;
            aligned_demand.insert(region_id.clone(), series);
        }
        if let Some(region_id) = demand.keys().next() {
            Err(ResiteError::data_alignment(
                "demand",
                format!("Series provided for unknown region {region_id}"),
            ))?;
        }
        check_series_lengths("demand", aligned_demand.values(), n_steps)?;

        let generation_potential = capacity_factors.map(|tp, series| {
            let potential = capacity_potential[tp];
            series
                .iter()
                .map(|cf| potential.energy_per_timestep(*cf))
                .collect()
        });

        Ok(Self {
            index,
            technologies: prepared.technologies,
            regions: prepared.regions,
            horizon: prepared.horizon,
            capacity_factors,
            capacity_potential,
            existing_capacity,
            existing_capacity_fraction,
            generation_potential,
            demand: aligned_demand,
        })
    }

    /// The site index
    pub fn index(&self) -> &SiteIndex {
        &self.index
    }

    /// The technologies which have candidate sites
    pub fn technologies(&self) -> &TechnologyMap {
        &self.technologies
    }

    /// All regions, in the order deployment vectors refer to them
    pub fn regions(&self) -> &RegionMap {
        &self.regions
    }

    /// The time axis
    pub fn horizon(&self) -> &TimeHorizon {
        &self.horizon
    }

    /// Capacity factor series for every tech point
    pub fn capacity_factors(&self) -> &TechPointMap<Vec<Dimensionless>> {
        &self.capacity_factors
    }

    /// Capacity potential (GW) for every tech point
    pub fn capacity_potential(&self) -> &TechPointMap<Capacity> {
        &self.capacity_potential
    }

    /// Existing capacity (GW) for every tech point
    pub fn existing_capacity(&self) -> &TechPointMap<Capacity> {
        &self.existing_capacity
    }

    /// Existing capacity as a fraction of potential, for every tech point
    pub fn existing_capacity_fraction(&self) -> &TechPointMap<Dimensionless> {
        &self.existing_capacity_fraction
    }

    /// Generation potential (GWh per timestep) for every tech point
    pub fn generation_potential(&self) -> &TechPointMap<Vec<Energy>> {
        &self.generation_potential
    }

    /// Demand series (GWh per timestep) for every region
    pub fn demand(&self) -> &IndexMap<RegionID, Vec<Energy>> {
        &self.demand
    }

    /// Generation potential of a tech point summed over the given timesteps
    pub fn generation_potential_in(&self, tech_point: &TechPoint, steps: Range<usize>) -> Energy {
        self.generation_potential[tech_point][steps].iter().copied().sum()
    }

    /// Generation potential of a tech point summed over the whole horizon
    pub fn total_generation_potential(&self, tech_point: &TechPoint) -> Energy {
        self.generation_potential_in(tech_point, 0..self.horizon.len())
    }

    /// Demand of a region summed over the given timesteps
    pub fn demand_in(&self, region_id: &RegionID, steps: Range<usize>) -> Energy {
        self.demand[region_id][steps].iter().copied().sum()
    }

    /// Whether the tech point has capacity installed already
    pub fn has_existing_capacity(&self, tech_point: &TechPoint) -> bool {
        self.existing_capacity[tech_point] > Capacity(0.0)
    }
}

/// Reorder a table to match the index, checking that it covers exactly the index's tech points
fn align_to_index<T>(
    table: &'static str,
    mut values: TechPointMap<T>,
    index: &SiteIndex,
) -> Result<TechPointMap<T>> {
    let mut aligned = TechPointMap::new();
    for tech_point in index.tech_points() {
        let value = values.remove(tech_point).ok_or_else(|| {
            ResiteError::data_alignment(table, format!("No entry for {tech_point}"))
        })?;
        aligned.insert(tech_point.clone(), value);
    }

    if let Some(extra) = values.keys().next() {
        Err(ResiteError::data_alignment(
            table,
            format!("Entry for {extra}, which is not in the site index"),
        ))?;
    }

    Ok(aligned)
}

fn check_series_lengths<'a, T: 'a, I>(table: &'static str, series: I, n_steps: usize) -> Result<()>
where
    I: Iterator<Item = &'a Vec<T>>,
{
    for values in series {
        if values.len() != n_steps {
            Err(ResiteError::data_alignment(
                table,
                format!(
                    "Series has {} values, but the time horizon has {n_steps} timesteps",
                    values.len()
                ),
            ))?;
        }
    }

    Ok(())
}
