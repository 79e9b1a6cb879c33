use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// builder defaults
pub const ID_COL: &str = "ensg";
pub const MIN_POP_SCORE: f64 = 0.5;
pub const MIN_SET_SIZE: usize = 10;
pub const MIN_RECURSE_SET_SIZE: usize = 40;

// pruner defaults
pub const PRUNE_SIMILARITY: f64 = 0.45;

// cell values treated as missing in annotation tables
pub const NA_TOKENS: [&str; 4] = ["", "NA", "NaN", "nan"];

// the structure source that attaches a sink at the composite root
pub const ROOT_SOURCE: &str = "root";

// os
#[cfg(not(windows))]
const TICK_SETTINGS: (&str, u64) = ("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ", 80);
#[cfg(windows)]
const TICK_SETTINGS: (&str, u64) = (r"+-x| ", 200);

/// return a pre-configured progress bar
pub fn get_progress_bar(length: u64, msg: &str) -> ProgressBar {
    let progressbar_style = ProgressStyle::default_spinner()
        .tick_chars(TICK_SETTINGS.0)
        .template(" {spinner} {msg:<30} {wide_bar} ETA {eta_precise} ")
        .expect("no template error");

    let progress_bar = ProgressBar::new(length);

    progress_bar.set_style(progressbar_style);
    progress_bar.enable_steady_tick(Duration::from_millis(TICK_SETTINGS.1));
    progress_bar.set_message(msg.to_owned());

    progress_bar
}

/// traversal order of leaves during pruning
///
/// The names are kept from the reference pipeline: `TopDown` processes the
/// deepest leaves first, `BottomUp` the shallowest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PruneDirection {
    TopDown,
    BottomUp,
}

impl FromStr for PruneDirection {
    type Err = CliError;

    fn from_str(s: &str) -> Result<Self, CliError> {
        match s {
            "topdown" => Ok(PruneDirection::TopDown),
            "bottomup" => Ok(PruneDirection::BottomUp),
            _ => Err(CliError::InvalidInput(format!(
                "invalid prune direction: {} [expected topdown/bottomup]",
                s
            ))),
        }
    }
}

/// error handling for CLI
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// argument validation
pub fn validate(arg: &PathBuf) -> Result<(), CliError> {
    if !arg.exists() {
        return Err(CliError::InvalidInput(format!("{:?} does not exist", arg)));
    }

    if !arg.is_file() {
        return Err(CliError::InvalidInput(format!("{:?} is not a file", arg)));
    }

    match std::fs::metadata(arg) {
        Ok(metadata) if metadata.len() == 0 => {
            Err(CliError::InvalidInput(format!("file {:?} is empty", arg)))
        }
        Ok(_) => Ok(()),
        Err(e) => Err(CliError::IoError(e)),
    }
}

/// check that a fraction-like threshold stays in [0, 1]
pub fn validate_fraction(value: f64, what: &str) -> Result<(), CliError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(CliError::InvalidInput(format!(
            "{} must be within [0, 1], got {}",
            what, value
        )));
    }

    Ok(())
}

/// argument checker for all subcommands
pub trait ArgCheck {
    fn check(&self) -> Result<(), CliError> {
        self.validate_args()
    }

    fn validate_args(&self) -> Result<(), CliError> {
        for input in self.get_inputs() {
            validate(input)?;
        }

        self.check_thresholds()
    }

    fn check_thresholds(&self) -> Result<(), CliError> {
        Ok(())
    }

    fn get_inputs(&self) -> Vec<&PathBuf>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prune_direction_from_str() {
        assert_eq!(
            "topdown".parse::<PruneDirection>().unwrap(),
            PruneDirection::TopDown
        );
        assert_eq!(
            "bottomup".parse::<PruneDirection>().unwrap(),
            PruneDirection::BottomUp
        );
        assert!("sideways".parse::<PruneDirection>().is_err());
    }

    #[test]
    fn test_validate_fraction() {
        assert!(validate_fraction(0.0, "score").is_ok());
        assert!(validate_fraction(0.45, "score").is_ok());
        assert!(validate_fraction(1.0, "score").is_ok());
        assert!(validate_fraction(1.1, "score").is_err());
        assert!(validate_fraction(-0.1, "score").is_err());
    }

    #[test]
    fn test_validate_missing_file() {
        let missing = PathBuf::from("does/not/exist.json");
        assert!(validate(&missing).is_err());
    }
}
