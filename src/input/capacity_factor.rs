//! Code for reading capacity factor time series from a CSV file.
use super::*;
use crate::id::IDCollection;
use crate::time::parse_timestamp;
use serde::Deserialize;
use std::path::Path;

const CAPACITY_FACTORS_FILE_NAME: &str = "capacity_factors.csv";

/// One capacity factor value as it appears in the CSV file
#[derive(Debug, Deserialize, PartialEq)]
struct CapacityFactorRaw {
    technology_id: String,
    longitude: f64,
    latitude: f64,
    time: String,
    #[serde(deserialize_with = "deserialise_proportion")]
    capacity_factor: Dimensionless,
}

/// Read capacity factor time series for every tech point.
///
/// Rows with timestamps outside the time horizon are ignored. Every series must have exactly one
/// value for each timestamp in the horizon.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `technologies` - All known technologies
/// * `horizon` - The time axis
pub fn read_capacity_factors(
    model_dir: &Path,
    technologies: &TechnologyMap,
    horizon: &TimeHorizon,
) -> Result<TechPointMap<Vec<Dimensionless>>> {
    let file_path = model_dir.join(CAPACITY_FACTORS_FILE_NAME);
    let rows = read_csv(&file_path)?;
    read_capacity_factors_from_iter(rows, technologies, horizon)
        .with_context(|| input_err_msg(&file_path))
}

fn read_capacity_factors_from_iter<I>(
    iter: I,
    technologies: &TechnologyMap,
    horizon: &TimeHorizon,
) -> Result<TechPointMap<Vec<Dimensionless>>>
where
    I: Iterator<Item = CapacityFactorRaw>,
{
    let first = horizon.timestamps().first().copied();
    let last = horizon.timestamps().last().copied();
    let mut series = IndexMap::<TechPoint, Vec<Option<Dimensionless>>>::new();
    for row in iter {
        let time = parse_timestamp(&row.time)?;
        if first.is_none_or(|first| time < first) || last.is_none_or(|last| time > last) {
            continue;
        }

        let technology_id = technologies.get_id(&row.technology_id)?;
        let tech_point =
            TechPoint::new(technology_id, Coordinate::new(row.longitude, row.latitude));
        let idx = horizon
            .position(&time)
            .with_context(|| format!("Timestamp {} is not on the hourly time axis", row.time))?;
        let values = series
            .entry(tech_point.clone())
            .or_insert_with(|| vec![None; horizon.len()]);
        if values[idx].replace(row.capacity_factor).is_some() {
            Err(ResiteError::data_alignment(
                "capacity factors",
                format!("Duplicate value for {tech_point} at {}", row.time),
            ))?;
        }
    }

    series
        .into_iter()
        .map(|(tech_point, values)| {
            let values = complete_series(values).ok_or_else(|| {
                ResiteError::data_alignment(
                    "capacity factors",
                    format!("Series for {tech_point} does not cover the whole time horizon"),
                )
            })?;
            Ok::<_, anyhow::Error>((tech_point, values))
        })
        .collect()
}

/// Unwrap every value of a series, or return `None` if any are missing
pub(super) fn complete_series<T>(values: Vec<Option<T>>) -> Option<Vec<T>> {
    values.into_iter().collect()
}
