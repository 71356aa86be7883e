//! Candidate sites: coordinates, (technology, coordinate) pairs and tables keyed by them.
use crate::technology::TechnologyID;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A (longitude, latitude) pair identifying a candidate site.
///
/// Equality and hashing are on the exact bit patterns of the two values, so a coordinate read back
/// from an output file compares equal to the original only if it was not perturbed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Coordinate {
    /// Longitude in degrees
    pub longitude: f64,
    /// Latitude in degrees
    pub latitude: f64,
}

impl Coordinate {
    /// Create a new [`Coordinate`]
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }

    fn key(self) -> (u64, u64) {
        // Treat -0.0 and 0.0 as the same point
        (
            (self.longitude + 0.0).to_bits(),
            (self.latitude + 0.0).to_bits(),
        )
    }
}

impl PartialEq for Coordinate {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Coordinate {}

impl Hash for Coordinate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl PartialOrd for Coordinate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Coordinate {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.longitude + 0.0)
            .total_cmp(&(other.longitude + 0.0))
            .then_with(|| (self.latitude + 0.0).total_cmp(&(other.latitude + 0.0)))
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.longitude, self.latitude)
    }
}

/// A (technology, coordinate) pair: the atomic unit of decision
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TechPoint {
    /// The technology which could be deployed
    pub technology_id: TechnologyID,
    /// Where it could be deployed
    pub coordinate: Coordinate,
}

impl TechPoint {
    /// Create a new [`TechPoint`]
    pub fn new(technology_id: TechnologyID, coordinate: Coordinate) -> Self {
        Self {
            technology_id,
            coordinate,
        }
    }
}

impl fmt::Display for TechPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.technology_id, self.coordinate)
    }
}

/// Candidate coordinates for each technology
pub type TechPointsMap = IndexMap<TechnologyID, Vec<Coordinate>>;

/// A table holding one value per [`TechPoint`].
///
/// Entries are kept in insertion order, which for tables built from a
/// [`SiteIndex`](crate::index::SiteIndex) is the index's canonical order.
#[derive(Debug, Clone, PartialEq)]
pub struct TechPointMap<T>(IndexMap<TechPoint, T>);

impl<T> Default for TechPointMap<T> {
    fn default() -> Self {
        Self(IndexMap::new())
    }
}

impl<T> TechPointMap<T> {
    /// Create a new, empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, returning the old value if there was one
    pub fn insert(&mut self, tech_point: TechPoint, value: T) -> Option<T> {
        self.0.insert(tech_point, value)
    }

    /// Remove the value for the given tech point, returning it if present
    pub fn remove(&mut self, tech_point: &TechPoint) -> Option<T> {
        self.0.swap_remove(tech_point)
    }

    /// Get the value for the given tech point, if present
    pub fn get(&self, tech_point: &TechPoint) -> Option<&T> {
        self.0.get(tech_point)
    }

    /// Whether the map contains the given tech point
    pub fn contains_key(&self, tech_point: &TechPoint) -> bool {
        self.0.contains_key(tech_point)
    }

    /// The number of entries
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the map is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over entries in order
    pub fn iter(&self) -> indexmap::map::Iter<'_, TechPoint, T> {
        self.0.iter()
    }

    /// Iterate over the keys in order
    pub fn keys(&self) -> indexmap::map::Keys<'_, TechPoint, T> {
        self.0.keys()
    }

    /// Iterate over the values in order
    pub fn values(&self) -> indexmap::map::Values<'_, TechPoint, T> {
        self.0.values()
    }

    /// Build a new map by applying `f` to every value
    pub fn map<U, F>(&self, mut f: F) -> TechPointMap<U>
    where
        F: FnMut(&TechPoint, &T) -> U,
    {
        TechPointMap(self.0.iter().map(|(k, v)| (k.clone(), f(k, v))).collect())
    }
}

impl<T> std::ops::Index<&TechPoint> for TechPointMap<T> {
    type Output = T;

    fn index(&self, tech_point: &TechPoint) -> &T {
        self.0
            .get(tech_point)
            .unwrap_or_else(|| panic!("No entry for {tech_point}"))
    }
}

impl<T> FromIterator<(TechPoint, T)> for TechPointMap<T> {
    fn from_iter<I: IntoIterator<Item = (TechPoint, T)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a, T> IntoIterator for &'a TechPointMap<T> {
    type Item = (&'a TechPoint, &'a T);
    type IntoIter = indexmap::map::Iter<'a, TechPoint, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
