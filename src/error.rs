//! Errors which are fatal to a site-selection run.
//!
//! These are raised through [`anyhow`], so callers which need to distinguish between them can use
//! `err.downcast_ref::<ResiteError>()`.
use crate::solver::SolutionStatus;
use derive_more::{Display, Error};

/// The kinds of error which can abort a run
#[derive(Debug, Display, Error, PartialEq)]
pub enum ResiteError {
    /// A mismatch between formulation, regions and deployment vector, found before solving
    #[display("Invalid configuration: {message}")]
    InvalidConfiguration {
        /// Description of the problem
        message: String,
    },
    /// The requested formulation is not in the catalogue
    #[display("Unsupported formulation '{name}'. Accepted formulations are: {accepted}")]
    UnsupportedFormulation {
        /// The name which was requested
        name: String,
        /// Comma-separated list of accepted names
        accepted: String,
    },
    /// A table's index does not match the universe of tech points
    #[display("Data alignment error in {table}: {message}")]
    DataAlignment {
        /// The name of the offending table
        table: &'static str,
        /// Description of the problem
        message: String,
    },
    /// Solution extraction was attempted for a solve which did not produce a usable solution
    #[display("No solution available (solver status: {status}): {message}")]
    NoSolution {
        /// The status reported by the solver
        status: SolutionStatus,
        /// The solver's diagnostic message
        message: String,
    },
}

impl ResiteError {
    /// Create a new [`ResiteError::InvalidConfiguration`]
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Create a new [`ResiteError::DataAlignment`]
    pub fn data_alignment(table: &'static str, message: impl Into<String>) -> Self {
        Self::DataAlignment {
            table,
            message: message.into(),
        }
    }
}
