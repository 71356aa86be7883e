//! Mapping raw solver output back onto tech points.
use crate::data::SiteData;
use crate::error::ResiteError;
use crate::optimisation::{OptimisationModel, VariableKey};
use crate::site::{Coordinate, TechPoint, TechPointMap};
use crate::solver::{RawSolution, SolutionStatus};
use crate::technology::TechnologyID;
use crate::units::{Capacity, Dimensionless, Energy};
use anyhow::Result;
use indexmap::{IndexMap, IndexSet};

/// The result of a site-selection run
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    /// The status reported by the solver
    pub status: SolutionStatus,
    /// The objective value, as reported by the solver
    pub objective: f64,
    /// The value of the site variable for every tech point (zero where no variable was built)
    pub site_fractions: TechPointMap<f64>,
    /// Installed capacity (GW) for every tech point
    pub installed_capacity: TechPointMap<Capacity>,
    /// Tech points whose installed capacity exceeds the selection threshold, in canonical order
    pub selected: IndexSet<TechPoint>,
}

/// Per-technology totals for a solution
#[derive(Debug, Clone, PartialEq)]
pub struct TechnologySummary {
    /// The technology
    pub technology_id: TechnologyID,
    /// Candidate points after filtering
    pub initial_points: usize,
    /// Points selected
    pub selected_points: usize,
    /// Points which already host capacity
    pub points_with_existing_capacity: usize,
    /// Total capacity potential of all candidate points (GW)
    pub initial_potential: Capacity,
    /// Total capacity potential of selected points (GW)
    pub selected_potential: Capacity,
    /// Total existing capacity (GW)
    pub existing_capacity: Capacity,
    /// Total installed capacity in the solution (GW)
    pub optimal_capacity: Capacity,
    /// Total generation of installed capacity over the horizon (GWh)
    pub generation: Energy,
}

impl Solution {
    /// Selected coordinates grouped by technology, in canonical order
    pub fn selected_by_technology(&self) -> IndexMap<TechnologyID, Vec<Coordinate>> {
        let mut map = IndexMap::<TechnologyID, Vec<Coordinate>>::new();
        for tech_point in &self.selected {
            map.entry(tech_point.technology_id.clone())
                .or_default()
                .push(tech_point.coordinate);
        }

        map
    }

    /// Total installed capacity over every tech point
    pub fn total_installed_capacity(&self) -> Capacity {
        self.installed_capacity.values().copied().sum()
    }

    /// Capacity factor series of the selected tech points
    pub fn selected_capacity_factors<'a>(
        &'a self,
        data: &'a SiteData,
    ) -> impl Iterator<Item = (&'a TechPoint, &'a [Dimensionless])> {
        self.selected
            .iter()
            .map(|tp| (tp, data.capacity_factors()[tp].as_slice()))
    }

    /// Summarise the solution for each technology
    pub fn summarise(&self, data: &SiteData) -> Vec<TechnologySummary> {
        data.technologies()
            .keys()
            .map(|technology_id| {
                let points: Vec<_> = data.index().points_for_technology(technology_id).collect();
                let sum_capacity = |table: &TechPointMap<Capacity>, selected_only: bool| {
                    points
                        .iter()
                        .filter(|tp| !selected_only || self.selected.contains(**tp))
                        .map(|tp| table[*tp])
                        .sum::<Capacity>()
                };
                let generation = points
                    .iter()
                    .map(|tp| {
                        let installed = self.installed_capacity[*tp];
                        data.capacity_factors()[*tp]
                            .iter()
                            .map(|cf| installed.energy_per_timestep(*cf))
                            .sum::<Energy>()
                    })
                    .sum::<Energy>();

                TechnologySummary {
                    technology_id: technology_id.clone(),
                    initial_points: points.len(),
                    selected_points: points
                        .iter()
                        .filter(|tp| self.selected.contains(**tp))
                        .count(),
                    points_with_existing_capacity: points
                        .iter()
                        .filter(|tp| data.has_existing_capacity(tp))
                        .count(),
                    initial_potential: sum_capacity(data.capacity_potential(), false),
                    selected_potential: sum_capacity(data.capacity_potential(), true),
                    existing_capacity: sum_capacity(data.existing_capacity(), false),
                    optimal_capacity: sum_capacity(&self.installed_capacity, false),
                    generation,
                }
            })
            .collect()
    }
}

/// Map solver output back into installed capacities and selected sites.
///
/// Installed capacity is the site variable's value multiplied by the site's capacity potential. A
/// site is selected if its installed capacity is strictly greater than `selection_epsilon`.
///
/// # Arguments
///
/// * `raw` - The solver output
/// * `model` - The model which was solved
/// * `data` - The site data the model was built from
/// * `selection_epsilon` - Threshold (GW) above which a site counts as selected
pub fn extract_solution(
    raw: &RawSolution,
    model: &OptimisationModel,
    data: &SiteData,
    selection_epsilon: f64,
) -> Result<Solution> {
    if !raw.status.has_solution() {
        Err(ResiteError::NoSolution {
            status: raw.status,
            message: raw.message.clone(),
        })?;
    }

    let mut site_fractions = TechPointMap::new();
    for tech_point in data.index().tech_points() {
        let value = match model.variables().get_site(tech_point) {
            Some(_) => {
                let key = VariableKey::Site(tech_point.clone());
                *raw.values.get(&key).ok_or_else(|| {
                    ResiteError::data_alignment(
                        "solution",
                        format!("No value returned for {tech_point}"),
                    )
                })?
            }
            None => 0.0,
        };
        site_fractions.insert(tech_point.clone(), value);
    }

    let installed_capacity =
        site_fractions.map(|tp, value| data.capacity_potential()[tp] * Dimensionless(*value));
    let selected = installed_capacity
        .iter()
        .filter(|(_, capacity)| capacity.value() > selection_epsilon)
        .map(|(tp, _)| tp.clone())
        .collect();

    Ok(Solution {
        status: raw.status,
        objective: raw.objective,
        site_fractions,
        installed_capacity,
        selected,
    })
}
