//! Code for reading regions and their outlines from CSV files.
use super::*;
use crate::id::IDCollection;
use crate::region::{RegionMap, RegionShape, RegionShapeMap};
use serde::Deserialize;
use std::path::Path;

const REGIONS_FILE_NAME: &str = "regions.csv";
const REGION_SHAPES_FILE_NAME: &str = "region_shapes.csv";

/// Reads regions from a CSV file.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
///
/// # Returns
///
/// A `RegionMap` with the parsed regions data or an error. Regions are kept in file order, which
/// is the order in which deployment vector entries are matched to regions.
pub fn read_regions(model_dir: &Path) -> Result<RegionMap> {
    read_csv_id_file(&model_dir.join(REGIONS_FILE_NAME))
}

/// A single vertex of a region's outline
#[derive(Debug, Deserialize, PartialEq)]
struct RegionShapeVertexRaw {
    region_id: String,
    longitude: f64,
    latitude: f64,
}

/// Reads region outlines from a CSV file.
///
/// Each row is one vertex, with the vertices of each region listed in order around its boundary.
/// Every region must have an outline.
pub fn read_region_shapes(model_dir: &Path, regions: &RegionMap) -> Result<RegionShapeMap> {
    let file_path = model_dir.join(REGION_SHAPES_FILE_NAME);
    let vertices = read_csv(&file_path)?;
    read_region_shapes_from_iter(vertices, regions).with_context(|| input_err_msg(&file_path))
}

fn read_region_shapes_from_iter<I>(iter: I, regions: &RegionMap) -> Result<RegionShapeMap>
where
    I: Iterator<Item = RegionShapeVertexRaw>,
{
    let mut vertices = IndexMap::<RegionID, Vec<Coordinate>>::new();
    for vertex in iter {
        let region_id = regions.get_id(&vertex.region_id)?;
        ensure!(
            vertex.longitude.is_finite() && vertex.latitude.is_finite(),
            "Invalid vertex for region {region_id}"
        );
        vertices
            .entry(region_id)
            .or_default()
            .push(Coordinate::new(vertex.longitude, vertex.latitude));
    }

    // Keep region order, not file order
    let mut shapes = RegionShapeMap::new();
    for region_id in regions.keys() {
        let region_vertices = vertices
            .swap_remove(region_id)
            .with_context(|| format!("No outline provided for region {region_id}"))?;
        ensure!(
            region_vertices.len() >= 3,
            "The outline of region {region_id} must have at least three vertices"
        );
        shapes.insert(region_id.clone(), RegionShape::new(region_vertices));
    }

    Ok(shapes)
}
