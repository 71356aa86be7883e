//! Site selection and capacity siting for renewable energy planning studies.
//!
//! A model directory is read into validated, index-aligned site data, one of several
//! optimisation formulations is built over it, and the result of the solve is mapped back onto
//! candidate sites.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod cli;
pub mod data;
pub mod error;
pub mod formulation;
pub mod id;
pub mod index;
pub mod input;
pub mod log;
pub mod model;
pub mod optimisation;
pub mod output;
pub mod pipeline;
pub mod region;
pub mod settings;
pub mod site;
pub mod solution;
pub mod solver;
pub mod technology;
pub mod time;
pub mod units;

#[cfg(test)]
mod fixture;

/// Get the config folder for the program (e.g. `~/.config/resite` on Linux)
pub fn get_resite_config_dir() -> PathBuf {
    let Some(mut config_dir) = dirs::config_dir() else {
        // No config dir on this platform, so use the current directory
        return PathBuf::new();
    };

    config_dir.push("resite");
    config_dir
}
