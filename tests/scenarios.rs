//! Integration tests running whole models through the library API with the HiGHS backend.
use float_cmp::assert_approx_eq;
use resite::error::ResiteError;
use resite::pipeline::solve_model;
use resite::site::{Coordinate, TechPoint};
use resite::solver::SolutionStatus;

use model_dir::{TestModel, TestPoint, two_wind_sites};

const TOLERANCE: f64 = 1e-6;

fn wind_at(longitude: f64) -> TechPoint {
    TechPoint::new("wind".into(), Coordinate::new(longitude, 0.0))
}

#[test]
fn test_res_targets_combines_sites() {
    let (_dir, model) = TestModel::new("meet_RES_targets_agg", vec![1.0], two_wind_sites()).load();
    let solution = solve_model(&model).unwrap();

    assert_eq!(solution.status, SolutionStatus::Optimal);
    assert_approx_eq!(f64, solution.objective, 6.0, epsilon = TOLERANCE);
    assert_approx_eq!(
        f64,
        solution.total_installed_capacity().value(),
        6.0,
        epsilon = TOLERANCE
    );
}

#[test]
fn test_maximize_generation_selects_best_site() {
    let (_dir, model) = TestModel::new("maximize_generation", vec![1.0], two_wind_sites()).load();
    let solution = solve_model(&model).unwrap();

    assert_eq!(solution.selected.len(), 1);
    assert!(solution.selected.contains(&wind_at(0.0)));
    assert_approx_eq!(
        f64,
        solution.installed_capacity[&wind_at(0.0)].value(),
        10.0,
        epsilon = TOLERANCE
    );
    assert_approx_eq!(
        f64,
        solution.installed_capacity[&wind_at(0.5)].value(),
        0.0,
        epsilon = TOLERANCE
    );
}

#[test]
fn test_existing_capacity_without_potential() {
    let mut points = two_wind_sites();
    points.push(TestPoint::new("wind", 1.0, 0.0, 0.5).with_existing(2.0));
    let (_dir, model) = TestModel::new("meet_RES_targets_agg", vec![1.0], points).load();

    let fraction = model.data.existing_capacity_fraction()[&wind_at(1.0)];
    assert_approx_eq!(f64, fraction.value(), 1.0);

    let solution = solve_model(&model).unwrap();
    assert_approx_eq!(f64, solution.site_fractions[&wind_at(1.0)], 1.0, epsilon = TOLERANCE);
    assert_eq!(solution.installed_capacity[&wind_at(1.0)].value(), 0.0);
    assert!(!solution.selected.contains(&wind_at(1.0)));
}

#[test]
fn test_binary_selection_keeps_existing_sites() {
    let mut points = two_wind_sites();
    points.push(TestPoint::new("wind", 1.0, 0.0, 0.5).with_existing(2.0));
    let (_dir, model) = TestModel::new("maximize_generation", vec![3.0], points).load();
    let solution = solve_model(&model).unwrap();

    assert_approx_eq!(f64, solution.site_fractions[&wind_at(1.0)], 1.0, epsilon = TOLERANCE);
    assert_eq!(solution.selected.len(), 2);
}

#[test]
fn test_bucketed_res_targets() {
    // With constant data every bucketing needs the same 6 GW as the aggregate target
    for formulation in [
        "meet_RES_targets_daily",
        "meet_RES_targets_weekly",
        "meet_RES_targets_monthly",
    ] {
        let (_dir, model) = TestModel::new(formulation, vec![1.0], two_wind_sites()).load();
        let solution = solve_model(&model).unwrap();

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert_approx_eq!(f64, solution.objective, 6.0, epsilon = TOLERANCE);
    }
}

#[test]
fn test_capacity_bound_and_existing_floor() {
    let points = vec![
        TestPoint::new("wind", 0.0, 10.0, 0.5),
        TestPoint::new("wind", 0.5, 5.0, 0.1).with_existing(4.0),
        TestPoint::new("pv", 0.5, 2.0, 0.3),
    ];
    for formulation in ["meet_RES_targets_agg", "meet_RES_targets_hourly"] {
        let (_dir, model) = TestModel::new(formulation, vec![0.5], points.clone()).load();
        let solution = solve_model(&model).unwrap();

        for (tech_point, capacity) in &solution.installed_capacity {
            let potential = model.data.capacity_potential()[tech_point].value();
            assert!(capacity.value() <= potential + TOLERANCE);

            let floor = model.data.existing_capacity_fraction()[tech_point].value();
            assert!(solution.site_fractions[tech_point] >= floor - TOLERANCE);
        }
        assert!(solution.installed_capacity[&wind_at(0.5)].value() >= 4.0 - TOLERANCE);
    }
}

#[test]
fn test_run_is_idempotent() {
    let points = vec![
        TestPoint::new("wind", 0.0, 10.0, 0.5),
        TestPoint::new("wind", 0.5, 5.0, 0.5),
        TestPoint::new("pv", 0.0, 5.0, 0.2),
    ];
    let (_dir, model) = TestModel::new("maximize_aggr_cap_factor", vec![2.0], points).load();

    let first = solve_model(&model).unwrap();
    let second = solve_model(&model).unwrap();
    assert_eq!(first.objective, second.objective);
    assert_eq!(first.selected, second.selected);
}

#[test]
fn test_meet_demand_with_capacity() {
    // 6 GW of wind at a capacity factor of 0.5 covers the 3 GWh of demand in every hour
    let (_dir, model) =
        TestModel::new("meet_demand_with_capacity", vec![6.0], two_wind_sites()).load();
    let solution = solve_model(&model).unwrap();

    assert_approx_eq!(f64, solution.objective, 4.0, epsilon = TOLERANCE);
    assert_approx_eq!(
        f64,
        solution.total_installed_capacity().value(),
        6.0,
        epsilon = TOLERANCE
    );
}

#[test]
fn test_infeasible_target() {
    // At most 30 GWh can be generated, against 80 GWh of demand
    let (_dir, model) = TestModel::new("meet_RES_targets_agg", vec![1.0], two_wind_sites())
        .with_regions(vec![("R1", 20.0)])
        .load();
    let err = solve_model(&model).unwrap_err();

    let Some(ResiteError::NoSolution { status, .. }) = err.downcast_ref::<ResiteError>() else {
        panic!("Unexpected error: {err:?}");
    };
    assert!(!status.has_solution());
}
