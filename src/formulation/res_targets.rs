//! Formulations which meet a renewable share of demand at minimum deployed capacity.
//!
//! For every region `r` and time bucket `b`:
//!
//! ```text
//! sum over sites s in r, timesteps t in b of (generation_potential[s, t] * y[s])
//!     >= target[r] * sum over t in b of demand[r, t]
//! ```
//!
//! The objective is to minimise `sum over s of (y[s] * capacity_potential[s])`.
use super::constraints::{
    add_existing_capacity_floors, add_site_fraction_variables, regional_generation_terms,
    site_variable,
};
use super::{FormulationBuilder, check_deployment_vector_length};
use crate::data::SiteData;
use crate::optimisation::{ConstraintKey, OptimisationModel, Sense};
use crate::time::TimeBucketing;
use anyhow::Result;

/// Meet per-region renewable share targets in every time bucket
pub struct ResTargets {
    bucketing: TimeBucketing,
}

impl ResTargets {
    /// Create a new [`ResTargets`] with the given time bucketing
    pub fn new(bucketing: TimeBucketing) -> Self {
        Self { bucketing }
    }
}

impl FormulationBuilder for ResTargets {
    fn sense(&self) -> Sense {
        Sense::Minimise
    }

    fn validate(&self, data: &SiteData, deployment_vector: &[f64]) -> Result<()> {
        check_deployment_vector_length(deployment_vector, data.regions().len(), "regions")
    }

    fn add_variables(&self, model: &mut OptimisationModel, data: &SiteData) {
        add_site_fraction_variables(model, data);
    }

    fn add_constraints(
        &self,
        model: &mut OptimisationModel,
        data: &SiteData,
        deployment_vector: &[f64],
    ) {
        let buckets = self.bucketing.partition(data.horizon().timestamps());
        for (region_id, target) in data.regions().keys().zip(deployment_vector) {
            for (bucket, steps) in buckets.iter().enumerate() {
                let required = *target * data.demand_in(region_id, steps.clone()).value();
                let terms = regional_generation_terms(model, data, region_id, steps.clone());
                model.add_row(
                    ConstraintKey::GenerationTarget {
                        region_id: region_id.clone(),
                        bucket,
                    },
                    required..,
                    terms,
                );
            }
        }

        add_existing_capacity_floors(model, data);
    }

    fn add_objective(&self, model: &mut OptimisationModel, data: &SiteData) {
        for (tech_point, potential) in data.capacity_potential() {
            let var = site_variable(model, tech_point);
            model.set_objective_coefficient(var, potential.value());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{TestPoint, make_prepared_data, site_data, to_site_data};
    use crate::formulation::{FormulationRequest, build_model};
    use crate::optimisation::Row;
    use crate::solver::highs::HighsBackend;
    use crate::solver::{SolverBackend, SolverOptions};
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    fn build(data: &SiteData, name: &str, deployment_vector: Vec<f64>) -> OptimisationModel {
        let request = FormulationRequest {
            name: name.into(),
            deployment_vector,
            write_lp: false,
        };
        build_model(&request, data).unwrap()
    }

    fn generation_rows(model: &OptimisationModel) -> Vec<&Row> {
        model
            .rows()
            .iter()
            .filter(|row| matches!(row.key, ConstraintKey::GenerationTarget { .. }))
            .collect()
    }

    #[rstest]
    fn test_aggregate_target(site_data: SiteData) {
        let model = build(&site_data, "meet_RES_targets_agg", vec![1.0]);
        let rows = generation_rows(&model);
        assert_eq!(rows.len(), 1);
        // 10 GW at cf 0.5 and 5 GW at cf 0.2 over four hours
        assert_eq!(rows[0].lower, 12.0);
        let coeffs: Vec<_> = rows[0].terms.iter().map(|(_, c)| *c).collect();
        assert_eq!(coeffs, [20.0, 4.0]);
        assert_eq!(model.columns()[0].objective, 10.0);
    }

    #[rstest]
    fn test_hourly_target(site_data: SiteData) {
        let model = build(&site_data, "meet_RES_targets_hourly", vec![0.5]);
        let rows = generation_rows(&model);
        assert_eq!(rows.len(), 4);
        assert!(rows.iter().all(|row| row.lower == 1.5));
    }

    #[rstest]
    #[case("meet_RES_targets_agg", 1, 4.0)]
    #[case("meet_RES_targets_daily", 2, 6.0)]
    #[case("meet_RES_targets_weekly", 1, 4.0)]
    #[case("meet_RES_targets_monthly", 1, 4.0)]
    fn test_bucketed_targets(
        #[case] name: &str,
        #[case] n_buckets: usize,
        #[case] expected_capacity: f64,
    ) {
        // Two days of demand, the second three times the first
        let demand: Vec<_> = (0..48).map(|t| if t < 24 { 1.0 } else { 3.0 }).collect();
        let data = to_site_data(make_prepared_data(
            vec![TestPoint::new("wind", 0.0, 10.0, vec![0.5; 48])],
            vec![("R1", demand)],
        ));
        let model = build(&data, name, vec![1.0]);
        assert_eq!(generation_rows(&model).len(), n_buckets);

        let solution = HighsBackend.solve(&model, &SolverOptions::new()).unwrap();
        assert_approx_eq!(f64, solution.objective, expected_capacity, epsilon = 1e-6);
    }

    #[test]
    fn test_existing_capacity_floor_added() {
        let data = to_site_data(make_prepared_data(
            vec![
                TestPoint::new("wind", 0.0, 10.0, vec![0.5; 2]).with_existing(2.5),
                TestPoint::new("wind", 1.0, 5.0, vec![0.5; 2]),
            ],
            vec![("R1", vec![1.0; 2])],
        ));
        let model = build(&data, "meet_RES_targets_agg", vec![0.1]);
        let floors: Vec<_> = model
            .rows()
            .iter()
            .filter(|row| matches!(row.key, ConstraintKey::ExistingCapacityFloor(_)))
            .collect();
        assert_eq!(floors.len(), 1);
        assert_eq!(floors[0].lower, 0.25);

        // The floor dominates the tiny target
        let solution = HighsBackend.solve(&model, &SolverOptions::new()).unwrap();
        assert_approx_eq!(f64, solution.objective, 2.5, epsilon = 1e-6);
    }
}
