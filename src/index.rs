//! The canonical ordering of tech points and their assignment to regions.
use crate::region::{RegionID, RegionShapeMap};
use crate::site::{TechPoint, TechPointsMap};
use crate::technology::TechnologyID;
use anyhow::{Result, ensure};
use indexmap::{IndexMap, IndexSet};
use log::warn;
use std::collections::HashSet;

/// Ordered collections identifying every candidate site.
///
/// Tech points are sorted by technology, then longitude, then latitude. Every table keyed by tech
/// point must cover exactly [`SiteIndex::tech_points`].
#[derive(Debug, Clone, PartialEq)]
pub struct SiteIndex {
    tech_points: IndexSet<TechPoint>,
    region_members: IndexMap<RegionID, IndexSet<TechPoint>>,
}

impl SiteIndex {
    /// Every tech point, in canonical order
    pub fn tech_points(&self) -> &IndexSet<TechPoint> {
        &self.tech_points
    }

    /// The tech points in each region, in canonical order.
    ///
    /// Regions appear in the same order as in the region table.
    pub fn region_members(&self) -> &IndexMap<RegionID, IndexSet<TechPoint>> {
        &self.region_members
    }

    /// The tech points in the given region
    pub fn members_of<'a>(
        &'a self,
        region_id: &RegionID,
    ) -> impl Iterator<Item = &'a TechPoint> + use<'a> {
        self.region_members
            .get(region_id)
            .into_iter()
            .flat_map(|members| members.iter())
    }

    /// The tech points for the given technology, in canonical order
    pub fn points_for_technology<'a>(
        &'a self,
        technology_id: &'a TechnologyID,
    ) -> impl Iterator<Item = &'a TechPoint> {
        self.tech_points
            .iter()
            .filter(move |tp| tp.technology_id == *technology_id)
    }

    /// The number of tech points
    pub fn len(&self) -> usize {
        self.tech_points.len()
    }

    /// Whether there are no tech points
    pub fn is_empty(&self) -> bool {
        self.tech_points.is_empty()
    }
}

/// Build the site index from filtered points and region outlines.
///
/// A point belongs to every region whose outline contains it. Regions which contain no points are
/// kept (with a warning), so that their constraints can still be built.
///
/// # Arguments
///
/// * `tech_points` - Candidate coordinates for each technology
/// * `region_shapes` - The outline of each region
pub fn build_indices(
    tech_points: &TechPointsMap,
    region_shapes: &RegionShapeMap,
) -> Result<SiteIndex> {
    let mut all_points = Vec::new();
    for (technology_id, coordinates) in tech_points {
        let mut seen = HashSet::new();
        for coordinate in coordinates {
            ensure!(
                seen.insert(*coordinate),
                "Coordinate {coordinate} is listed more than once for technology {technology_id}"
            );
            all_points.push(TechPoint::new(technology_id.clone(), *coordinate));
        }
    }
    all_points.sort();
    let tech_points: IndexSet<_> = all_points.into_iter().collect();

    let region_members = region_shapes
        .iter()
        .map(|(region_id, shape)| {
            let members: IndexSet<_> = tech_points
                .iter()
                .filter(|tp| shape.contains(&tp.coordinate))
                .cloned()
                .collect();
            if members.is_empty() {
                warn!("Region {region_id} contains no candidate sites");
            }
            (region_id.clone(), members)
        })
        .collect();

    Ok(SiteIndex {
        tech_points,
        region_members,
    })
}
