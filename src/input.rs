//! Common routines for handling input data.
//!
//! This module also contains the data preparation stage, which turns the files in a model
//! directory into a [`PreparedData`] ready for index building.
use crate::data::SiteData;
use crate::error::ResiteError;
use crate::id::{HasID, IDLike};
use crate::index::build_indices;
use crate::model::{FilteringLayers, Model, ModelParameters};
use crate::region::{RegionID, RegionMap, RegionShapeMap};
use crate::site::{Coordinate, TechPoint, TechPointMap, TechPointsMap};
use crate::technology::TechnologyMap;
use crate::time::TimeHorizon;
use crate::units::{Capacity, Dimensionless, Energy};
use anyhow::{Context, Result, bail, ensure};
use indexmap::IndexMap;
use itertools::Itertools;
use log::{info, warn};
use serde::de::{Deserialize, DeserializeOwned, Deserializer};
use std::fs;
use std::path::Path;

mod capacity_factor;
use capacity_factor::read_capacity_factors;
mod demand;
use demand::read_demand;
mod point;
use point::{PointRecord, read_points};
mod region;
use region::{read_region_shapes, read_regions};
mod technology;
use technology::read_technologies;

/// Tolerance used when checking whether a coordinate lies on the resource grid
const GRID_TOLERANCE: f64 = 1e-6;

/// Read a series of type `T`s from a CSV file.
///
/// Will raise an error if the file is empty.
///
/// # Arguments
///
/// * `file_path` - Path to the CSV file
pub fn read_csv<'a, T: DeserializeOwned + 'a>(
    file_path: &'a Path,
) -> Result<impl Iterator<Item = T> + 'a> {
    let vec = read_csv_internal(file_path)?;
    ensure!(
        !vec.is_empty(),
        "CSV file {} cannot be empty",
        file_path.display()
    );

    Ok(vec.into_iter())
}

fn read_csv_internal<'a, T: DeserializeOwned + 'a>(file_path: &'a Path) -> Result<Vec<T>> {
    let vec = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(file_path)
        .with_context(|| input_err_msg(file_path))?
        .into_deserialize()
        .process_results(|iter| iter.collect_vec())
        .with_context(|| input_err_msg(file_path))?;

    Ok(vec)
}

/// Parse a TOML file at the specified path.
///
/// # Arguments
///
/// * `file_path` - Path to the TOML file
///
/// # Returns
///
/// * The deserialised TOML data or an error if the file could not be read or parsed.
pub fn read_toml<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let toml_str = fs::read_to_string(file_path).with_context(|| input_err_msg(file_path))?;
    let toml_data = toml::from_str(&toml_str).with_context(|| input_err_msg(file_path))?;
    Ok(toml_data)
}

/// Read a f64, checking that it is between 0 and 1
pub fn deserialise_proportion<'de, D>(deserialiser: D) -> Result<Dimensionless, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserialiser)?;
    if !(0.0..=1.0).contains(&value) {
        Err(serde::de::Error::custom("Value must be between 0 and 1"))?;
    }

    Ok(Dimensionless(value))
}

/// Format an error message to include the file path. To be used with `anyhow::Context`.
pub fn input_err_msg<P: AsRef<Path>>(file_path: P) -> String {
    format!("Error reading {}", file_path.as_ref().display())
}

/// Read a CSV file of items with IDs.
///
/// IDs must be unique and the file must not be empty. Entries are kept in file order.
pub fn read_csv_id_file<T, ID: IDLike>(file_path: &Path) -> Result<IndexMap<ID, T>>
where
    T: HasID<ID> + DeserializeOwned,
{
    fn fill_and_validate_map<T, ID: IDLike>(file_path: &Path) -> Result<IndexMap<ID, T>>
    where
        T: HasID<ID> + DeserializeOwned,
    {
        let mut map = IndexMap::new();
        for record in read_csv::<T>(file_path)? {
            let id = record.get_id().clone();
            ensure!(!id.borrow().is_empty(), "IDs cannot be empty");
            let existing = map.insert(id.clone(), record).is_some();
            ensure!(!existing, "Duplicate ID found: {id}");
        }

        Ok(map)
    }

    fill_and_validate_map(file_path).with_context(|| input_err_msg(file_path))
}

/// Everything produced by the data preparation stage.
///
/// All tables keyed by [`TechPoint`] share the same set of keys, namely every coordinate listed
/// in `tech_points`.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedData {
    /// Technologies which have at least one eligible point
    pub technologies: TechnologyMap,
    /// All regions
    pub regions: RegionMap,
    /// The outline of each region
    pub region_shapes: RegionShapeMap,
    /// The shared time axis
    pub horizon: TimeHorizon,
    /// Eligible coordinates for each technology
    pub tech_points: TechPointsMap,
    /// Capacity factor time series for each tech point
    pub capacity_factors: TechPointMap<Vec<Dimensionless>>,
    /// Maximum installable capacity for each tech point
    pub capacity_potential: TechPointMap<Capacity>,
    /// Capacity already installed at each tech point
    pub existing_capacity: TechPointMap<Capacity>,
    /// Existing capacity as a fraction of capacity potential
    pub existing_capacity_fraction: TechPointMap<Dimensionless>,
    /// Demand time series for each region
    pub demand: IndexMap<RegionID, Vec<Energy>>,
}

/// Read a model from the specified directory.
///
/// This runs data preparation and index building, producing the immutable data used by every
/// formulation.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
pub fn load_model<P: AsRef<Path>>(model_dir: P) -> Result<Model> {
    let model_dir = model_dir.as_ref();
    let parameters = ModelParameters::from_path(model_dir)?;
    let prepared = prepare_data(model_dir, &parameters)?;
    let index = build_indices(&prepared.tech_points, &prepared.region_shapes)?;
    let data = SiteData::new(index, prepared)?;

    Ok(Model {
        model_path: model_dir.to_path_buf(),
        parameters,
        data,
    })
}

/// Read and filter all input data for a model.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `parameters` - Parameters read from `model.toml`
pub fn prepare_data(model_dir: &Path, parameters: &ModelParameters) -> Result<PreparedData> {
    let horizon = parameters.time_horizon.to_horizon()?;
    let mut technologies = read_technologies(model_dir)?;
    let regions = read_regions(model_dir)?;
    let region_shapes = read_region_shapes(model_dir, &regions)?;
    let points = read_points(model_dir, &technologies)?;
    let mut capacity_factors = read_capacity_factors(model_dir, &technologies, &horizon)?;
    let demand = read_demand(model_dir, &regions, &horizon)?;

    check_series_match_points(&points, &capacity_factors)?;

    info!("Filtering coordinates");
    let points = filter_points(
        points,
        &capacity_factors,
        &technologies,
        &region_shapes,
        parameters.spatial_resolution,
        &parameters.filtering_layers,
    );
    capacity_factors = points
        .keys()
        .map(|tp| (tp.clone(), capacity_factors[tp].clone()))
        .collect();

    let tech_points = group_by_technology(points.keys());
    technologies.retain(|id, _| {
        let keep = tech_points.contains_key(id);
        if !keep {
            warn!("No eligible points remain for technology {id}; it will be ignored");
        }
        keep
    });

    let (capacity_potential, existing_capacity) = apply_existing_capacity(&points);
    let existing_capacity_fraction = capacity_potential.map(|tp, potential| {
        compute_existing_capacity_fraction(existing_capacity[tp], *potential)
    });

    Ok(PreparedData {
        technologies,
        regions,
        region_shapes,
        horizon,
        tech_points,
        capacity_factors,
        capacity_potential,
        existing_capacity,
        existing_capacity_fraction,
        demand,
    })
}

/// Check that every listed point has a capacity factor series and vice versa
fn check_series_match_points(
    points: &TechPointMap<PointRecord>,
    capacity_factors: &TechPointMap<Vec<Dimensionless>>,
) -> Result<()> {
    if let Some(tp) = points.keys().find(|tp| !capacity_factors.contains_key(tp)) {
        Err(ResiteError::data_alignment(
            "capacity factors",
            format!("No capacity factor series provided for {tp}"),
        ))?;
    }

    if let Some(tp) = capacity_factors.keys().find(|tp| !points.contains_key(tp)) {
        Err(ResiteError::data_alignment(
            "capacity factors",
            format!("Capacity factor series provided for {tp}, which is not a candidate point"),
        ))?;
    }

    Ok(())
}

/// Apply the enabled filtering layers, returning the points which remain.
///
/// Points with existing capacity are always kept.
fn filter_points(
    points: TechPointMap<PointRecord>,
    capacity_factors: &TechPointMap<Vec<Dimensionless>>,
    technologies: &TechnologyMap,
    region_shapes: &RegionShapeMap,
    spatial_resolution: f64,
    layers: &FilteringLayers,
) -> TechPointMap<PointRecord> {
    let mut dropped = IndexMap::<&'static str, usize>::new();
    let kept = points
        .iter()
        .filter(|(tp, record)| {
            if record.existing_capacity > Capacity(0.0) {
                return true;
            }

            let reason = if !is_on_grid(&tp.coordinate, spatial_resolution) {
                Some("off the resource grid")
            } else if layers.region_shapes
                && !region_shapes
                    .values()
                    .any(|shape| shape.contains(&tp.coordinate))
            {
                Some("outside every region")
            } else if layers.resource_quality
                && is_low_quality(&capacity_factors[*tp], technologies, tp)
            {
                Some("below the resource quality threshold")
            } else {
                None
            };

            if let Some(reason) = reason {
                *dropped.entry(reason).or_default() += 1;
                return false;
            }

            true
        })
        .map(|(tp, record)| (tp.clone(), record.clone()))
        .collect();

    for (reason, count) in dropped {
        warn!("Dropped {count} candidate point(s) {reason}");
    }

    kept
}

/// Whether the coordinate is a multiple of the grid resolution in both dimensions
fn is_on_grid(coordinate: &Coordinate, spatial_resolution: f64) -> bool {
    let on_grid = |value: f64| {
        let steps = value / spatial_resolution;
        (steps - steps.round()).abs() < GRID_TOLERANCE
    };

    on_grid(coordinate.longitude) && on_grid(coordinate.latitude)
}

/// Whether the mean capacity factor is below the technology's threshold
fn is_low_quality(
    series: &[Dimensionless],
    technologies: &TechnologyMap,
    tech_point: &TechPoint,
) -> bool {
    let Some(threshold) = technologies[&tech_point.technology_id].min_capacity_factor else {
        return false;
    };

    let mean = series.iter().map(|cf| cf.value()).sum::<f64>() / series.len() as f64;
    mean < threshold.value()
}

/// Group tech points by technology, with coordinates in order of appearance
fn group_by_technology<'a, I>(tech_points: I) -> TechPointsMap
where
    I: Iterator<Item = &'a TechPoint>,
{
    let mut map = TechPointsMap::new();
    for tp in tech_points {
        map.entry(tp.technology_id.clone())
            .or_default()
            .push(tp.coordinate);
    }

    map
}

/// Split point records into capacity potential and existing capacity tables.
///
/// Existing capacity cannot be ignored, so where it exceeds a non-zero potential, the potential is
/// raised to match. A zero potential is left as is: such a site cannot host any further capacity.
fn apply_existing_capacity(
    points: &TechPointMap<PointRecord>,
) -> (TechPointMap<Capacity>, TechPointMap<Capacity>) {
    let mut num_raised = 0;
    let potential = points.map(|tp, record| {
        if record.capacity_potential > Capacity(0.0)
            && record.existing_capacity > record.capacity_potential
        {
            log::debug!(
                "Raising capacity potential of {tp} from {} to existing capacity of {} GW",
                record.capacity_potential.value(),
                record.existing_capacity.value()
            );
            num_raised += 1;
            record.existing_capacity
        } else {
            record.capacity_potential
        }
    });

    if num_raised > 0 {
        warn!(
            "Existing capacity exceeds capacity potential at {num_raised} point(s); \
            capacity potential has been raised to match"
        );
    }

    let existing = points.map(|_, record| record.existing_capacity);
    (potential, existing)
}

/// The fraction of capacity potential which is already installed.
///
/// This is 1.0 when the potential is zero, which fixes the site's decision variable at its only
/// feasible value.
pub fn compute_existing_capacity_fraction(
    existing: Capacity,
    potential: Capacity,
) -> Dimensionless {
    if potential <= Capacity(0.0) {
        return Dimensionless(1.0);
    }

    Dimensionless((existing / potential).value().clamp(0.0, 1.0))
}

/// Check that a value is finite and not negative
pub fn check_non_negative(value: f64, name: &str) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        bail!("{name} must be a finite number greater than or equal to zero (got {value})");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, square_shape};
    use crate::region::RegionShape;
    use crate::technology::Technology;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;
    use serde::Deserialize;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Record {
        id: String,
        value: u32,
    }

    /// Create an example CSV file in dir_path
    fn create_csv_file(dir_path: &Path, contents: &str) -> std::path::PathBuf {
        let file_path = dir_path.join("test.csv");
        let mut file = File::create(&file_path).unwrap();
        writeln!(file, "{contents}").unwrap();
        file_path
    }

    #[test]
    fn test_read_csv() {
        let dir = tempdir().unwrap();
        let file_path = create_csv_file(dir.path(), "id,value\nhello,1\nworld,2\n");
        let records: Vec<Record> = read_csv(&file_path).unwrap().collect();
        assert_eq!(
            records,
            &[
                Record {
                    id: "hello".to_string(),
                    value: 1,
                },
                Record {
                    id: "world".to_string(),
                    value: 2,
                }
            ]
        );

        // File with no data (only column headers)
        let file_path = create_csv_file(dir.path(), "id,value\n");
        assert!(read_csv::<Record>(&file_path).is_err());
    }

    #[test]
    fn test_read_toml() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test.toml");
        {
            let mut file = File::create(&file_path).unwrap();
            writeln!(file, "id = \"hello\"\nvalue = 1").unwrap();
        }

        assert_eq!(
            read_toml::<Record>(&file_path).unwrap(),
            Record {
                id: "hello".to_string(),
                value: 1,
            }
        );

        {
            let mut file = File::create(&file_path).unwrap();
            writeln!(file, "bad toml syntax").unwrap();
        }

        assert!(read_toml::<Record>(&file_path).is_err());
    }

    #[rstest]
    #[case(Capacity(2.0), Capacity(8.0), 0.25)]
    #[case(Capacity(0.0), Capacity(8.0), 0.0)]
    #[case(Capacity(0.0), Capacity(0.0), 1.0)]
    #[case(Capacity(3.0), Capacity(0.0), 1.0)]
    #[case(Capacity(9.0), Capacity(8.0), 1.0)]
    fn test_compute_existing_capacity_fraction(
        #[case] existing: Capacity,
        #[case] potential: Capacity,
        #[case] expected: f64,
    ) {
        assert_approx_eq!(
            f64,
            compute_existing_capacity_fraction(existing, potential).value(),
            expected
        );
    }

    #[rstest]
    #[case(Coordinate::new(1.5, -2.0), 0.5, true)]
    #[case(Coordinate::new(1.25, 2.0), 0.5, false)]
    #[case(Coordinate::new(0.3, 0.6), 0.1, true)]
    fn test_is_on_grid(#[case] coordinate: Coordinate, #[case] res: f64, #[case] expected: bool) {
        assert_eq!(is_on_grid(&coordinate, res), expected);
    }

    fn record(potential: f64, existing: f64) -> PointRecord {
        PointRecord {
            capacity_potential: Capacity(potential),
            existing_capacity: Capacity(existing),
        }
    }

    #[test]
    fn test_apply_existing_capacity() {
        let a = TechPoint::new("wind".into(), Coordinate::new(0.0, 0.0));
        let b = TechPoint::new("wind".into(), Coordinate::new(1.0, 0.0));
        let c = TechPoint::new("wind".into(), Coordinate::new(2.0, 0.0));
        let points: TechPointMap<_> = [
            (a.clone(), record(10.0, 2.0)),
            (b.clone(), record(5.0, 7.0)),
            (c.clone(), record(0.0, 3.0)),
        ]
        .into_iter()
        .collect();

        let (potential, existing) = apply_existing_capacity(&points);
        assert_eq!(potential[&a], Capacity(10.0));
        assert_eq!(potential[&b], Capacity(7.0));
        assert_eq!(potential[&c], Capacity(0.0));
        assert_eq!(existing[&c], Capacity(3.0));
    }

    #[rstest]
    fn test_filter_points(square_shape: RegionShape) {
        let inside = TechPoint::new("wind".into(), Coordinate::new(0.5, 0.5));
        let outside = TechPoint::new("wind".into(), Coordinate::new(2.0, 2.0));
        let outside_existing = TechPoint::new("wind".into(), Coordinate::new(3.0, 3.0));
        let poor = TechPoint::new("wind".into(), Coordinate::new(1.0, 0.5));
        let off_grid = TechPoint::new("wind".into(), Coordinate::new(0.25, 0.5));

        let points: TechPointMap<_> = [
            (inside.clone(), record(1.0, 0.0)),
            (outside.clone(), record(1.0, 0.0)),
            (outside_existing.clone(), record(1.0, 0.5)),
            (poor.clone(), record(1.0, 0.0)),
            (off_grid.clone(), record(1.0, 0.0)),
        ]
        .into_iter()
        .collect();
        let capacity_factors = points.map(|tp, _| {
            let cf = if *tp == poor { 0.1 } else { 0.4 };
            vec![Dimensionless(cf); 2]
        });
        let technologies: TechnologyMap = [(
            "wind".into(),
            Technology {
                id: "wind".into(),
                description: "Wind".into(),
                min_capacity_factor: Some(Dimensionless(0.2)),
            },
        )]
        .into_iter()
        .collect();
        let shapes: RegionShapeMap = [("R1".into(), square_shape)].into_iter().collect();

        let all_layers = FilteringLayers {
            resource_quality: true,
            region_shapes: true,
        };
        let kept = filter_points(
            points.clone(),
            &capacity_factors,
            &technologies,
            &shapes,
            0.5,
            &all_layers,
        );
        let kept: Vec<_> = kept.keys().cloned().collect();
        assert_eq!(kept, vec![inside.clone(), outside_existing.clone()]);

        // With no layers enabled, only the grid check applies
        let kept = filter_points(
            points,
            &capacity_factors,
            &technologies,
            &shapes,
            0.5,
            &FilteringLayers::default(),
        );
        assert_eq!(kept.len(), 4);
        assert!(!kept.contains_key(&off_grid));
    }

    #[test]
    fn test_check_series_match_points() {
        let a = TechPoint::new("wind".into(), Coordinate::new(0.0, 0.0));
        let b = TechPoint::new("wind".into(), Coordinate::new(1.0, 0.0));
        let points: TechPointMap<_> = [(a.clone(), record(1.0, 0.0))].into_iter().collect();

        let cfs: TechPointMap<_> = [(a.clone(), vec![Dimensionless(0.5)])].into_iter().collect();
        assert!(check_series_match_points(&points, &cfs).is_ok());

        let cfs: TechPointMap<_> = [
            (a.clone(), vec![Dimensionless(0.5)]),
            (b, vec![Dimensionless(0.5)]),
        ]
        .into_iter()
        .collect();
        assert_error!(
            check_series_match_points(&points, &cfs),
            "Data alignment error in capacity factors: Capacity factor series provided for \
            wind at (1, 0), which is not a candidate point"
        );

        let cfs = TechPointMap::new();
        let err = check_series_match_points(&points, &cfs).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ResiteError>(),
            Some(ResiteError::DataAlignment { .. })
        ));
    }

    #[test]
    fn test_check_non_negative() {
        assert!(check_non_negative(0.0, "x").is_ok());
        assert!(check_non_negative(-1.0, "x").is_err());
        assert!(check_non_negative(f64::NAN, "x").is_err());
    }
}
