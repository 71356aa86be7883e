//! Code for reading technologies from a CSV file.
use super::*;
use crate::technology::{Technology, TechnologyMap};
use std::path::Path;

const TECHNOLOGIES_FILE_NAME: &str = "technologies.csv";

/// Read technologies from a CSV file.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
pub fn read_technologies(model_dir: &Path) -> Result<TechnologyMap> {
    let file_path = model_dir.join(TECHNOLOGIES_FILE_NAME);
    let technologies = read_csv_id_file::<Technology, _>(&file_path)?;
    for technology in technologies.values() {
        if let Some(threshold) = technology.min_capacity_factor {
            ensure!(
                (0.0..=1.0).contains(&threshold.value()),
                "{}: min_capacity_factor for technology {} must be between 0 and 1",
                input_err_msg(&file_path),
                technology.id
            );
        }
    }

    Ok(technologies)
}
