//! Code for reading candidate points from a CSV file.
use super::*;
use crate::id::IDCollection;
use serde::Deserialize;
use std::path::Path;

const POINTS_FILE_NAME: &str = "points.csv";

/// A candidate point as it appears in the CSV file
#[derive(Debug, Deserialize, PartialEq)]
struct PointRaw {
    technology_id: String,
    longitude: f64,
    latitude: f64,
    capacity_potential: f64,
    existing_capacity: Option<f64>,
}

/// Capacity data for a candidate point
#[derive(Debug, Clone, PartialEq)]
pub struct PointRecord {
    /// Maximum installable capacity (GW)
    pub capacity_potential: Capacity,
    /// Capacity already installed (GW)
    pub existing_capacity: Capacity,
}

/// Read candidate points for every technology.
///
/// A coordinate may appear at most once per technology.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `technologies` - All known technologies
pub fn read_points(
    model_dir: &Path,
    technologies: &TechnologyMap,
) -> Result<TechPointMap<PointRecord>> {
    let file_path = model_dir.join(POINTS_FILE_NAME);
    let points = read_csv(&file_path)?;
    read_points_from_iter(points, technologies).with_context(|| input_err_msg(&file_path))
}

fn read_points_from_iter<I>(iter: I, technologies: &TechnologyMap) -> Result<TechPointMap<PointRecord>>
where
    I: Iterator<Item = PointRaw>,
{
    let mut points = TechPointMap::new();
    for point in iter {
        let technology_id = technologies.get_id(&point.technology_id)?;
        let coordinate = Coordinate::new(point.longitude, point.latitude);
        ensure!(
            point.longitude.is_finite() && point.latitude.is_finite(),
            "Invalid coordinate {coordinate} for technology {technology_id}"
        );
        let existing_capacity = point.existing_capacity.unwrap_or(0.0);
        check_non_negative(point.capacity_potential, "capacity_potential")?;
        check_non_negative(existing_capacity, "existing_capacity")?;

        let tech_point = TechPoint::new(technology_id, coordinate);
        let record = PointRecord {
            capacity_potential: Capacity(point.capacity_potential),
            existing_capacity: Capacity(existing_capacity),
        };
        ensure!(
            points.insert(tech_point.clone(), record).is_none(),
            "Duplicate candidate point: {tech_point}"
        );
    }

    Ok(points)
}
