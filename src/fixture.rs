//! Fixtures for tests
use crate::data::SiteData;
use crate::index::build_indices;
use crate::input::{PreparedData, compute_existing_capacity_fraction};
use crate::region::{Region, RegionID, RegionShape, RegionShapeMap};
use crate::site::{Coordinate, TechPoint, TechPointMap, TechPointsMap};
use crate::technology::{Technology, TechnologyMap};
use crate::time::{TimeHorizon, parse_timestamp};
use crate::units::{Capacity, Dimensionless, Energy};
use indexmap::IndexMap;
use rstest::fixture;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

/// A candidate point for building test data
pub struct TestPoint {
    pub technology: &'static str,
    pub coordinate: Coordinate,
    pub potential: f64,
    pub existing: f64,
    pub capacity_factors: Vec<f64>,
}

impl TestPoint {
    pub fn new(
        technology: &'static str,
        longitude: f64,
        potential: f64,
        capacity_factors: Vec<f64>,
    ) -> Self {
        Self {
            technology,
            coordinate: Coordinate::new(longitude, 0.0),
            potential,
            existing: 0.0,
            capacity_factors,
        }
    }

    pub fn with_existing(mut self, existing: f64) -> Self {
        self.existing = existing;
        self
    }
}

/// The unit square
#[fixture]
pub fn square_shape() -> RegionShape {
    RegionShape::new(vec![
        Coordinate::new(0.0, 0.0),
        Coordinate::new(1.0, 0.0),
        Coordinate::new(1.0, 1.0),
        Coordinate::new(0.0, 1.0),
    ])
}

/// A horizon of `n_steps` hours starting at midnight on 1 January 2018
pub fn horizon(n_steps: i64) -> TimeHorizon {
    let start = parse_timestamp("2018-01-01T00:00").unwrap();
    TimeHorizon::new(start, start + chrono::TimeDelta::hours(n_steps - 1)).unwrap()
}

/// Build prepared data from points and per-region demand series.
///
/// Each region's outline spans longitudes `[offset, offset + 1]` where `offset` is the region's
/// position multiplied by ten, so points with longitude 10.5 fall in the second region.
pub fn make_prepared_data(points: Vec<TestPoint>, demand: Vec<(&str, Vec<f64>)>) -> PreparedData {
    let n_steps = demand[0].1.len();
    let regions: IndexMap<RegionID, Region> = demand
        .iter()
        .map(|(id, _)| {
            (
                (*id).into(),
                Region {
                    id: (*id).into(),
                    description: format!("Region {id}"),
                },
            )
        })
        .collect();
    let region_shapes: RegionShapeMap = regions
        .keys()
        .enumerate()
        .map(|(i, id)| {
            let x0 = 10.0 * i as f64;
            let shape = RegionShape::new(vec![
                Coordinate::new(x0, -1.0),
                Coordinate::new(x0 + 1.0, -1.0),
                Coordinate::new(x0 + 1.0, 1.0),
                Coordinate::new(x0, 1.0),
            ]);
            (id.clone(), shape)
        })
        .collect();

    let mut technologies = TechnologyMap::new();
    let mut tech_points = TechPointsMap::new();
    let mut capacity_factors = TechPointMap::new();
    let mut capacity_potential = TechPointMap::new();
    let mut existing_capacity = TechPointMap::new();
    let mut existing_capacity_fraction = TechPointMap::new();
    for point in points {
        assert_eq!(point.capacity_factors.len(), n_steps);
        let id = point.technology.into();
        technologies.entry(id).or_insert_with(|| Technology {
            id: point.technology.into(),
            description: point.technology.to_string(),
            min_capacity_factor: None,
        });
        tech_points
            .entry(point.technology.into())
            .or_insert_with(Vec::new)
            .push(point.coordinate);
        let tp = TechPoint::new(point.technology.into(), point.coordinate);
        let potential = Capacity(point.potential);
        let existing = Capacity(point.existing);
        capacity_factors.insert(
            tp.clone(),
            point
                .capacity_factors
                .into_iter()
                .map(Dimensionless)
                .collect(),
        );
        capacity_potential.insert(tp.clone(), potential);
        existing_capacity.insert(tp.clone(), existing);
        existing_capacity_fraction.insert(tp, compute_existing_capacity_fraction(existing, potential));
    }

    PreparedData {
        technologies,
        regions,
        region_shapes,
        horizon: horizon(n_steps as i64),
        tech_points,
        capacity_factors,
        capacity_potential,
        existing_capacity,
        existing_capacity_fraction,
        demand: demand
            .into_iter()
            .map(|(id, values)| (id.into(), values.into_iter().map(Energy).collect()))
            .collect(),
    }
}

/// Turn prepared data into site data
pub fn to_site_data(prepared: PreparedData) -> SiteData {
    let index = build_indices(&prepared.tech_points, &prepared.region_shapes).unwrap();
    SiteData::new(index, prepared).unwrap()
}

/// Two wind sites in one region over four hours, with a demand of 3 GWh per hour
#[fixture]
pub fn prepared_data() -> PreparedData {
    make_prepared_data(
        vec![
            TestPoint::new("wind", 1.0, 5.0, vec![0.2; 4]),
            TestPoint::new("wind", 0.0, 10.0, vec![0.5; 4]),
        ],
        vec![("R1", vec![3.0; 4])],
    )
}

#[fixture]
pub fn site_data(prepared_data: PreparedData) -> SiteData {
    to_site_data(prepared_data)
}
