//! Code for reading regional demand time series from a CSV file.
use super::*;
use super::capacity_factor::complete_series;
use crate::id::IDCollection;
use crate::time::parse_timestamp;
use serde::Deserialize;
use std::path::Path;

const DEMAND_FILE_NAME: &str = "demand.csv";

/// One demand value as it appears in the CSV file
#[derive(Debug, Deserialize, PartialEq)]
struct DemandRaw {
    region_id: String,
    time: String,
    demand: f64,
}

/// Read the demand time series (GWh per timestep) for every region.
///
/// Rows outside the time horizon are ignored. Every region must have a value for every timestamp.
pub fn read_demand(
    model_dir: &Path,
    regions: &RegionMap,
    horizon: &TimeHorizon,
) -> Result<IndexMap<RegionID, Vec<Energy>>> {
    let file_path = model_dir.join(DEMAND_FILE_NAME);
    let rows = read_csv(&file_path)?;
    read_demand_from_iter(rows, regions, horizon).with_context(|| input_err_msg(&file_path))
}

fn read_demand_from_iter<I>(
    iter: I,
    regions: &RegionMap,
    horizon: &TimeHorizon,
) -> Result<IndexMap<RegionID, Vec<Energy>>>
where
    I: Iterator<Item = DemandRaw>,
{
    let mut series: IndexMap<RegionID, Vec<Option<Energy>>> = regions
        .keys()
        .map(|id| (id.clone(), vec![None; horizon.len()]))
        .collect();
    for row in iter {
        let region_id = regions.get_id(&row.region_id)?;
        let time = parse_timestamp(&row.time)?;
        let Some(idx) = horizon.position(&time) else {
            continue;
        };
        check_non_negative(row.demand, "demand")?;
        if series[&region_id][idx].replace(Energy(row.demand)).is_some() {
            Err(ResiteError::data_alignment(
                "demand",
                format!("Duplicate value for region {region_id} at {}", row.time),
            ))?;
        }
    }

    series
        .into_iter()
        .map(|(region_id, values)| {
            let values = complete_series(values).ok_or_else(|| {
                ResiteError::data_alignment(
                    "demand",
                    format!("Series for region {region_id} does not cover the whole time horizon"),
                )
            })?;
            Ok::<_, anyhow::Error>((region_id, values))
        })
        .collect()
}
