//! Defines the `ModelParameters` struct, which represents the contents of `model.toml`.
use crate::error::ResiteError;
use crate::formulation::FormulationRequest;
use crate::input::{input_err_msg, read_toml};
use crate::solver::{SolverName, SolverOptions};
use crate::time::{TimeHorizon, parse_timestamp};
use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;

const MODEL_PARAMETERS_FILE_NAME: &str = "model.toml";

/// Represents the contents of the entire model file.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ModelParameters {
    /// The period to optimise over
    pub time_horizon: TimeHorizonParameters,
    /// Spacing (in degrees) of the resource grid
    pub spatial_resolution: f64,
    /// The formulation to build and its parameters
    pub formulation: FormulationRequest,
    /// Solver choice and options
    #[serde(default)]
    pub solver: SolverParameters,
    /// Which filtering layers to apply to candidate points
    #[serde(default)]
    pub filtering_layers: FilteringLayers,
}

/// The `[time_horizon]` section of the model file
#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TimeHorizonParameters {
    /// First timestamp (inclusive)
    pub start: String,
    /// Last timestamp (inclusive)
    pub end: String,
}

impl TimeHorizonParameters {
    /// Build the hourly time axis
    pub fn to_horizon(&self) -> Result<TimeHorizon> {
        TimeHorizon::new(parse_timestamp(&self.start)?, parse_timestamp(&self.end)?)
    }
}

fn default_solver_name() -> String {
    SolverName::Highs.to_string()
}

/// The `[solver]` section of the model file
#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SolverParameters {
    /// Which solver backend to use
    #[serde(default = "default_solver_name")]
    pub name: String,
    /// Options passed through to the solver
    #[serde(default)]
    pub options: SolverOptions,
    /// Minimum installed capacity (GW) for a site to count as selected
    #[serde(default)]
    pub selection_epsilon: f64,
}

impl Default for SolverParameters {
    fn default() -> Self {
        Self {
            name: default_solver_name(),
            options: SolverOptions::default(),
            selection_epsilon: 0.0,
        }
    }
}

impl SolverParameters {
    /// The requested solver backend
    pub fn solver_name(&self) -> Result<SolverName> {
        let name = SolverName::from_str(&self.name).map_err(|_| {
            ResiteError::invalid_configuration(format!("Unknown solver '{}'", self.name))
        })?;

        Ok(name)
    }
}

/// The `[filtering_layers]` section of the model file
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct FilteringLayers {
    /// Drop points whose mean capacity factor is below their technology's threshold
    pub resource_quality: bool,
    /// Drop points which lie outside every region
    pub region_shapes: bool,
}

impl ModelParameters {
    /// Read a model file from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing model configuration files
    ///
    /// # Returns
    ///
    /// The model file contents as a [`ModelParameters`] struct or an error if the file is invalid
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<ModelParameters> {
        let file_path = model_dir.as_ref().join(MODEL_PARAMETERS_FILE_NAME);
        let model_params: ModelParameters = read_toml(&file_path)?;

        model_params
            .validate()
            .with_context(|| input_err_msg(file_path))?;

        Ok(model_params)
    }

    /// Validate parameters after reading in file
    fn validate(&self) -> Result<()> {
        // time_horizon
        self.time_horizon.to_horizon()?;

        // spatial_resolution
        ensure!(
            self.spatial_resolution.is_finite() && self.spatial_resolution > 0.0,
            "spatial_resolution must be a finite number greater than zero"
        );

        // formulation
        self.formulation.formulation()?;

        // solver
        self.solver.solver_name()?;
        ensure!(
            self.solver.selection_epsilon.is_finite() && self.solver.selection_epsilon >= 0.0,
            "selection_epsilon must be a finite number greater than or equal to zero"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use crate::formulation::Formulation;
    use crate::solver::SolverOptionValue;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    const VALID_MODEL: &str = r#"
spatial_resolution = 0.5

[time_horizon]
start = "2018-01-01T00:00"
end = "2018-01-01T23:00"

[formulation]
name = "meet_RES_targets_daily"
deployment_vector = [0.3, 0.5]

[solver]
name = "clarabel"
options = { time_limit = 60.0, threads = 2 }
"#;

    fn write_model_file(dir: &Path, contents: &str) {
        let mut file = File::create(dir.join(MODEL_PARAMETERS_FILE_NAME)).unwrap();
        writeln!(file, "{contents}").unwrap();
    }

    #[test]
    fn test_model_params_from_path() {
        let dir = tempdir().unwrap();
        write_model_file(dir.path(), VALID_MODEL);

        let params = ModelParameters::from_path(dir.path()).unwrap();
        assert_eq!(
            params.formulation.formulation().unwrap(),
            Formulation::MeetResTargetsDaily
        );
        assert_eq!(params.formulation.deployment_vector, [0.3, 0.5]);
        assert!(!params.formulation.write_lp);
        assert_eq!(params.solver.solver_name().unwrap(), SolverName::Clarabel);
        assert_eq!(
            params.solver.options["threads"],
            SolverOptionValue::Int(2)
        );
        let option_names: Vec<_> = params.solver.options.keys().collect();
        assert_eq!(option_names, ["time_limit", "threads"]);
        assert_eq!(params.filtering_layers, FilteringLayers::default());
        assert_eq!(params.time_horizon.to_horizon().unwrap().len(), 24);
    }

    #[test]
    fn test_model_params_unknown_formulation() {
        let dir = tempdir().unwrap();
        write_model_file(
            dir.path(),
            &VALID_MODEL.replace("meet_RES_targets_daily", "minimise_cost"),
        );

        let err = ModelParameters::from_path(dir.path()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ResiteError>(),
            Some(ResiteError::UnsupportedFormulation { .. })
        ));
    }

    #[test]
    fn test_model_params_unknown_solver() {
        let dir = tempdir().unwrap();
        write_model_file(dir.path(), &VALID_MODEL.replace("clarabel", "cplex"));

        let err = ModelParameters::from_path(dir.path()).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ResiteError>(),
            Some(&ResiteError::invalid_configuration("Unknown solver 'cplex'"))
        );
    }

    #[test]
    fn test_model_params_unknown_filter() {
        let dir = tempdir().unwrap();
        let contents = format!("{VALID_MODEL}\n[filtering_layers]\nprotected_areas = true");
        write_model_file(dir.path(), &contents);
        assert!(ModelParameters::from_path(dir.path()).is_err());
    }

    #[test]
    fn test_model_params_bad_resolution() {
        let dir = tempdir().unwrap();
        write_model_file(
            dir.path(),
            &VALID_MODEL.replace("spatial_resolution = 0.5", "spatial_resolution = 0.0"),
        );
        let err = ModelParameters::from_path(dir.path()).unwrap_err();
        assert_eq!(
            err.chain().nth(1).unwrap().to_string(),
            "spatial_resolution must be a finite number greater than zero"
        );
    }

    #[test]
    fn test_model_params_missing_file() {
        let dir = tempdir().unwrap();
        assert_error!(
            ModelParameters::from_path(dir.path()),
            format!(
                "Error reading {}",
                dir.path().join(MODEL_PARAMETERS_FILE_NAME).display()
            )
        );
    }
}
