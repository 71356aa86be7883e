//! Technologies are the kinds of generator which can be deployed at a site (e.g. onshore wind).
use crate::id::{define_id_getter, define_id_type};
use crate::units::Dimensionless;
use indexmap::IndexMap;
use serde::Deserialize;

define_id_type! {TechnologyID}

/// A map of [`Technology`]s, keyed by technology ID
pub type TechnologyMap = IndexMap<TechnologyID, Technology>;

/// A technology which can be deployed at candidate sites
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Technology {
    /// A unique identifier for the technology (e.g. "wind_onshore")
    pub id: TechnologyID,
    /// A text description of the technology
    pub description: String,
    /// Minimum mean capacity factor for a site to pass the resource quality filter
    pub min_capacity_factor: Option<Dimensionless>,
}
define_id_getter! {Technology, TechnologyID}
