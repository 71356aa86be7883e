//! The module responsible for writing output data to disk.
use crate::data::SiteData;
use crate::site::TechPoint;
use crate::solution::Solution;
use crate::solver::SolutionStatus;
use crate::technology::TechnologyID;
use crate::time::TIMESTAMP_FORMAT;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::fs::File;
use std::path::{Path, PathBuf};

pub mod metadata;

/// The root folder in which model-specific output folders will be created
const OUTPUT_DIRECTORY_ROOT: &str = "resite_results";

/// The output file name for installed capacities
const INSTALLED_CAPACITY_FILE_NAME: &str = "installed_capacity.csv";

/// The output file name for selected sites
const SELECTED_SITES_FILE_NAME: &str = "selected_sites.csv";

/// The output file name for the capacity factors of selected sites
const SELECTED_CAPACITY_FACTORS_FILE_NAME: &str = "selected_capacity_factors.csv";

/// The output file name for the per-technology summary
const SUMMARY_FILE_NAME: &str = "summary.csv";

/// The output file name for the objective and status
const OBJECTIVE_FILE_NAME: &str = "objective.toml";

/// The output file name for existing capacity fractions
const EXISTING_CAPACITY_FRACTION_FILE_NAME: &str = "debug_existing_capacity_fraction.csv";

/// The output file name for generation potential
const GENERATION_POTENTIAL_FILE_NAME: &str = "debug_generation_potential.csv";

/// Get the model name from the specified directory path
pub fn get_output_dir(model_dir: &Path) -> Result<PathBuf> {
    // Canonicalise in case the user has specified "."
    let model_dir = model_dir
        .canonicalize()
        .context("Could not resolve path to model")?;

    let model_name = model_dir
        .file_name()
        .context("Model cannot be in root folder")?
        .to_str()
        .context("Invalid chars in model dir name")?;

    Ok(output_dir_for_model(model_name))
}

/// The default output folder for a model with the given name
pub fn output_dir_for_model(model_name: &str) -> PathBuf {
    [OUTPUT_DIRECTORY_ROOT, model_name].iter().collect()
}

/// Create a new output directory for the model, optionally overwriting existing data.
///
/// # Returns
///
/// `true` if an existing, non-empty folder was deleted first, otherwise `false`.
pub fn create_output_directory(output_dir: &Path, allow_overwrite: bool) -> Result<bool> {
    let overwrite = if output_dir.exists() {
        let is_empty = fs::read_dir(output_dir)
            .with_context(|| format!("Could not read output folder {}", output_dir.display()))?
            .next()
            .is_none();
        if is_empty {
            return Ok(false);
        }

        anyhow::ensure!(
            allow_overwrite,
            "Output folder {} already exists and is not empty. Use --overwrite to replace it.",
            output_dir.display()
        );
        fs::remove_dir_all(output_dir).with_context(|| {
            format!("Could not delete output folder {}", output_dir.display())
        })?;
        true
    } else {
        false
    };

    fs::create_dir_all(output_dir)
        .with_context(|| format!("Could not create output folder {}", output_dir.display()))?;

    Ok(overwrite)
}

/// The leading columns shared by every per-tech-point output file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct TechPointRow {
    technology_id: TechnologyID,
    longitude: f64,
    latitude: f64,
}

impl From<&TechPoint> for TechPointRow {
    fn from(tech_point: &TechPoint) -> Self {
        Self {
            technology_id: tech_point.technology_id.clone(),
            longitude: tech_point.coordinate.longitude,
            latitude: tech_point.coordinate.latitude,
        }
    }
}

/// Represents a row in the installed capacity CSV file.
///
/// This will be written along with a [`TechPointRow`].
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct InstalledCapacityRow {
    capacity: f64,
}

/// Represents a row in the selected sites CSV file.
///
/// This will be written along with a [`TechPointRow`].
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct SelectedSiteRow {
    existing_capacity: f64,
    capacity_potential: f64,
    installed_capacity: f64,
}

/// Represents a row in the selected capacity factors CSV file.
///
/// This will be written along with a [`TechPointRow`].
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct CapacityFactorRow {
    time: String,
    capacity_factor: f64,
}

/// Represents a row in the summary CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct SummaryRow {
    technology_id: TechnologyID,
    initial_points: usize,
    selected_points: usize,
    points_with_existing_capacity: usize,
    initial_potential: f64,
    selected_potential: f64,
    existing_capacity: f64,
    optimal_capacity: f64,
    generation: f64,
}

/// Represents a row in a debug file holding one value per tech point.
///
/// This will be written along with a [`TechPointRow`].
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct DebugValueRow {
    value: f64,
}

/// The contents of the objective file
#[derive(Serialize, Debug, PartialEq)]
pub struct ObjectiveSummary<'a> {
    /// Name of the formulation which was solved
    pub formulation: &'a str,
    /// Name of the solver backend
    pub solver: &'a str,
    /// The status reported by the solver
    pub status: SolutionStatus,
    /// The objective value
    pub objective: f64,
    /// Total installed capacity over all sites (GW)
    pub total_installed_capacity: f64,
    /// Number of selected sites
    pub selected_sites: usize,
}

/// Write the objective and status of a run in TOML format
pub fn write_objective(output_path: &Path, summary: &ObjectiveSummary) -> Result<()> {
    let file_path = output_path.join(OBJECTIVE_FILE_NAME);
    fs::write(&file_path, toml::to_string(summary)?)
        .with_context(|| format!("Could not write {}", file_path.display()))?;

    Ok(())
}

/// For writing extra debug information about the model
struct DebugDataWriter {
    existing_capacity_fraction_writer: csv::Writer<File>,
    generation_potential_writer: csv::Writer<File>,
}

impl DebugDataWriter {
    /// Open CSV files to write debug info to
    ///
    /// # Arguments
    ///
    /// * `output_path` - Folder where files will be saved
    fn create(output_path: &Path) -> Result<Self> {
        let new_writer = |file_name| {
            let file_path = output_path.join(file_name);
            csv::Writer::from_path(file_path)
        };

        Ok(Self {
            existing_capacity_fraction_writer: new_writer(EXISTING_CAPACITY_FRACTION_FILE_NAME)?,
            generation_potential_writer: new_writer(GENERATION_POTENTIAL_FILE_NAME)?,
        })
    }

    /// Write all debug info to output files
    fn write_debug_info(&mut self, data: &SiteData) -> Result<()> {
        for (tech_point, fraction) in data.existing_capacity_fraction() {
            let row = DebugValueRow {
                value: fraction.value(),
            };
            self.existing_capacity_fraction_writer
                .serialize((TechPointRow::from(tech_point), row))?;
        }

        for tech_point in data.index().tech_points() {
            let row = DebugValueRow {
                value: data.total_generation_potential(tech_point).value(),
            };
            self.generation_potential_writer
                .serialize((TechPointRow::from(tech_point), row))?;
        }

        Ok(())
    }

    /// Flush the underlying streams
    fn flush(&mut self) -> Result<()> {
        self.existing_capacity_fraction_writer.flush()?;
        self.generation_potential_writer.flush()?;

        Ok(())
    }
}

/// An object for writing the results of a run to file
pub struct DataWriter {
    installed_capacity_writer: csv::Writer<File>,
    selected_sites_writer: csv::Writer<File>,
    capacity_factors_writer: csv::Writer<File>,
    summary_writer: csv::Writer<File>,
    debug_writer: Option<DebugDataWriter>,
}

impl DataWriter {
    /// Open CSV files to write output data to
    ///
    /// # Arguments
    ///
    /// * `output_path` - Folder where files will be saved
    /// * `save_debug_info` - Whether to include extra CSV files for debugging model
    pub fn create(output_path: &Path, save_debug_info: bool) -> Result<Self> {
        let new_writer = |file_name| {
            let file_path = output_path.join(file_name);
            csv::Writer::from_path(file_path)
        };

        let debug_writer = if save_debug_info {
            Some(DebugDataWriter::create(output_path)?)
        } else {
            None
        };

        Ok(Self {
            installed_capacity_writer: new_writer(INSTALLED_CAPACITY_FILE_NAME)?,
            selected_sites_writer: new_writer(SELECTED_SITES_FILE_NAME)?,
            capacity_factors_writer: new_writer(SELECTED_CAPACITY_FACTORS_FILE_NAME)?,
            summary_writer: new_writer(SUMMARY_FILE_NAME)?,
            debug_writer,
        })
    }

    /// Write every result table for a solution
    pub fn write_solution(&mut self, solution: &Solution, data: &SiteData) -> Result<()> {
        self.write_installed_capacity(solution)?;
        self.write_selected_sites(solution, data)?;
        self.write_selected_capacity_factors(solution, data)?;
        self.write_summary(solution, data)?;

        Ok(())
    }

    /// Write the installed capacity of every tech point to a CSV file
    fn write_installed_capacity(&mut self, solution: &Solution) -> Result<()> {
        for (tech_point, capacity) in &solution.installed_capacity {
            let row = InstalledCapacityRow {
                capacity: capacity.value(),
            };
            self.installed_capacity_writer
                .serialize((TechPointRow::from(tech_point), row))?;
        }

        Ok(())
    }

    /// Write the selected tech points to a CSV file
    fn write_selected_sites(&mut self, solution: &Solution, data: &SiteData) -> Result<()> {
        for tech_point in &solution.selected {
            let row = SelectedSiteRow {
                existing_capacity: data.existing_capacity()[tech_point].value(),
                capacity_potential: data.capacity_potential()[tech_point].value(),
                installed_capacity: solution.installed_capacity[tech_point].value(),
            };
            self.selected_sites_writer
                .serialize((TechPointRow::from(tech_point), row))?;
        }

        Ok(())
    }

    /// Write the capacity factor series of selected tech points to a CSV file
    fn write_selected_capacity_factors(
        &mut self,
        solution: &Solution,
        data: &SiteData,
    ) -> Result<()> {
        let timestamps = data.horizon().timestamps();
        for (tech_point, series) in solution.selected_capacity_factors(data) {
            for (timestamp, capacity_factor) in timestamps.iter().zip(series) {
                let row = CapacityFactorRow {
                    time: timestamp.format(TIMESTAMP_FORMAT).to_string(),
                    capacity_factor: capacity_factor.value(),
                };
                self.capacity_factors_writer
                    .serialize((TechPointRow::from(tech_point), row))?;
            }
        }

        Ok(())
    }

    /// Write per-technology totals to a CSV file
    fn write_summary(&mut self, solution: &Solution, data: &SiteData) -> Result<()> {
        for summary in solution.summarise(data) {
            let row = SummaryRow {
                technology_id: summary.technology_id,
                initial_points: summary.initial_points,
                selected_points: summary.selected_points,
                points_with_existing_capacity: summary.points_with_existing_capacity,
                initial_potential: summary.initial_potential.value(),
                selected_potential: summary.selected_potential.value(),
                existing_capacity: summary.existing_capacity.value(),
                optimal_capacity: summary.optimal_capacity.value(),
                generation: summary.generation.value(),
            };
            self.summary_writer.serialize(row)?;
        }

        Ok(())
    }

    /// Write debug information to CSV files
    pub fn write_debug_info(&mut self, data: &SiteData) -> Result<()> {
        if let Some(wtr) = &mut self.debug_writer {
            wtr.write_debug_info(data)?;
        }

        Ok(())
    }

    /// Flush the underlying streams
    pub fn flush(&mut self) -> Result<()> {
        self.installed_capacity_writer.flush()?;
        self.selected_sites_writer.flush()?;
        self.capacity_factors_writer.flush()?;
        self.summary_writer.flush()?;
        if let Some(wtr) = &mut self.debug_writer {
            wtr.flush()?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::site_data;
    use crate::site::{Coordinate, TechPointMap};
    use crate::units::Dimensionless;
    use float_cmp::assert_approx_eq;
    use itertools::Itertools;
    use rstest::{fixture, rstest};
    use serde::de::DeserializeOwned;
    use tempfile::tempdir;

    fn tech_point(longitude: f64) -> TechPoint {
        TechPoint::new("wind".into(), Coordinate::new(longitude, 0.0))
    }

    /// Build the site at longitude 0 at full potential and leave the other empty
    #[fixture]
    fn solution(site_data: SiteData) -> (Solution, SiteData) {
        let site_fractions: TechPointMap<f64> = site_data
            .index()
            .tech_points()
            .iter()
            .map(|tp| {
                let value = if *tp == tech_point(0.0) { 1.0 } else { 0.0 };
                (tp.clone(), value)
            })
            .collect();
        let installed_capacity = site_fractions
            .map(|tp, value| site_data.capacity_potential()[tp] * Dimensionless(*value));
        let solution = Solution {
            status: SolutionStatus::Optimal,
            objective: 10.0,
            site_fractions,
            installed_capacity,
            selected: [tech_point(0.0)].into_iter().collect(),
        };

        (solution, site_data)
    }

    fn write_all(dir: &Path, solution: &Solution, data: &SiteData, debug: bool) {
        let mut writer = DataWriter::create(dir, debug).unwrap();
        writer.write_solution(solution, data).unwrap();
        writer.write_debug_info(data).unwrap();
        writer.flush().unwrap();
    }

    fn read_rows<T: DeserializeOwned>(path: &Path) -> Vec<T> {
        csv::Reader::from_path(path)
            .unwrap()
            .into_deserialize()
            .try_collect()
            .unwrap()
    }

    #[rstest]
    fn test_write_installed_capacity(solution: (Solution, SiteData)) {
        let (solution, data) = solution;
        let dir = tempdir().unwrap();
        write_all(dir.path(), &solution, &data, false);

        let path = dir.path().join(INSTALLED_CAPACITY_FILE_NAME);
        let points: Vec<TechPointRow> = read_rows(&path);
        let capacities: Vec<InstalledCapacityRow> = read_rows(&path);
        assert_eq!(
            points,
            [
                TechPointRow::from(&tech_point(0.0)),
                TechPointRow::from(&tech_point(1.0))
            ]
        );
        assert_eq!(
            capacities,
            [
                InstalledCapacityRow { capacity: 10.0 },
                InstalledCapacityRow { capacity: 0.0 }
            ]
        );
    }

    #[rstest]
    fn test_write_selected_sites(solution: (Solution, SiteData)) {
        let (solution, data) = solution;
        let dir = tempdir().unwrap();
        write_all(dir.path(), &solution, &data, false);

        let path = dir.path().join(SELECTED_SITES_FILE_NAME);
        let points: Vec<TechPointRow> = read_rows(&path);
        let sites: Vec<SelectedSiteRow> = read_rows(&path);
        assert_eq!(points, [TechPointRow::from(&tech_point(0.0))]);
        assert_eq!(
            sites,
            [SelectedSiteRow {
                existing_capacity: 0.0,
                capacity_potential: 10.0,
                installed_capacity: 10.0,
            }]
        );

        let rows: Vec<CapacityFactorRow> =
            read_rows(&dir.path().join(SELECTED_CAPACITY_FACTORS_FILE_NAME));
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[1].time, "2018-01-01T01:00");
        assert_approx_eq!(f64, rows[1].capacity_factor, 0.5);
    }

    #[rstest]
    fn test_write_summary(solution: (Solution, SiteData)) {
        let (solution, data) = solution;
        let dir = tempdir().unwrap();
        write_all(dir.path(), &solution, &data, false);

        let rows: Vec<SummaryRow> = read_rows(&dir.path().join(SUMMARY_FILE_NAME));
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.initial_points, 2);
        assert_eq!(row.selected_points, 1);
        assert_eq!(row.points_with_existing_capacity, 0);
        assert_approx_eq!(f64, row.initial_potential, 15.0);
        assert_approx_eq!(f64, row.selected_potential, 10.0);
        assert_approx_eq!(f64, row.optimal_capacity, 10.0);
        assert_approx_eq!(f64, row.generation, 20.0);
    }

    #[rstest]
    fn test_write_debug_info(solution: (Solution, SiteData)) {
        let (solution, data) = solution;
        let dir = tempdir().unwrap();

        write_all(dir.path(), &solution, &data, false);
        assert!(!dir.path().join(GENERATION_POTENTIAL_FILE_NAME).exists());

        write_all(dir.path(), &solution, &data, true);
        let rows: Vec<DebugValueRow> = read_rows(&dir.path().join(GENERATION_POTENTIAL_FILE_NAME));
        assert_eq!(rows.len(), 2);
        assert_approx_eq!(f64, rows[0].value, 20.0);
        assert_approx_eq!(f64, rows[1].value, 4.0);

        let rows: Vec<DebugValueRow> =
            read_rows(&dir.path().join(EXISTING_CAPACITY_FRACTION_FILE_NAME));
        assert!(rows.iter().all(|row| row.value == 0.0));
    }

    #[test]
    fn test_coordinates_round_trip() {
        let tp = TechPoint::new("pv".into(), Coordinate::new(0.1 + 0.2, -33.333_333_333_333_336));
        let dir = tempdir().unwrap();
        let path = dir.path().join("points.csv");
        {
            let mut writer = csv::Writer::from_path(&path).unwrap();
            writer.serialize(TechPointRow::from(&tp)).unwrap();
            writer.flush().unwrap();
        }

        let rows: Vec<TechPointRow> = read_rows(&path);
        assert_eq!(Coordinate::new(rows[0].longitude, rows[0].latitude), tp.coordinate);
    }

    #[rstest]
    fn test_write_objective(solution: (Solution, SiteData)) {
        let (solution, _) = solution;
        let dir = tempdir().unwrap();
        let summary = ObjectiveSummary {
            formulation: "meet_RES_targets_agg",
            solver: "highs",
            status: solution.status,
            objective: solution.objective,
            total_installed_capacity: solution.total_installed_capacity().value(),
            selected_sites: solution.selected.len(),
        };
        write_objective(dir.path(), &summary).unwrap();

        let contents = fs::read_to_string(dir.path().join(OBJECTIVE_FILE_NAME)).unwrap();
        let value: toml::Table = toml::from_str(&contents).unwrap();
        assert_eq!(value["status"].as_str(), Some("optimal"));
        assert_eq!(value["selected_sites"].as_integer(), Some(1));
        assert_eq!(value["objective"].as_float(), Some(10.0));
    }

    #[test]
    fn test_get_output_dir() {
        let dir = tempdir().unwrap();
        let model_dir = dir.path().join("my_model");
        fs::create_dir(&model_dir).unwrap();
        assert_eq!(
            get_output_dir(&model_dir).unwrap(),
            Path::new("resite_results").join("my_model")
        );
        assert!(get_output_dir(&dir.path().join("missing")).is_err());
    }

    #[test]
    fn test_create_output_directory() {
        let dir = tempdir().unwrap();
        let output_dir = dir.path().join("results");

        // New folder
        assert!(!create_output_directory(&output_dir, false).unwrap());
        assert!(output_dir.is_dir());

        // Empty existing folder
        assert!(!create_output_directory(&output_dir, false).unwrap());

        // Non-empty folder
        fs::write(output_dir.join("file.txt"), "data").unwrap();
        assert!(create_output_directory(&output_dir, false).is_err());
        assert!(create_output_directory(&output_dir, true).unwrap());
        assert!(!output_dir.join("file.txt").exists());
    }
}
