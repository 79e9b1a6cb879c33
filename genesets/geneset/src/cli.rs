use clap::{Parser, Subcommand};
use config::{validate_fraction, ArgCheck, CliError, PruneDirection};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "geneset")]
#[command(about = "geneset: gene-set tree construction and pruning")]
#[command(version = config::VERSION)]
pub struct Args {
    #[command(subcommand)]
    pub command: SubArgs,
}

#[derive(Debug, Subcommand)]
pub enum SubArgs {
    #[command(name = "make")]
    Make {
        #[command(flatten)]
        args: MakeArgs,
    },
    #[command(name = "check")]
    Check {
        #[command(flatten)]
        args: CheckArgs,
    },
}

#[derive(Debug, Parser)]
pub struct MakeArgs {
    #[arg(
        value_name = "PATH",
        help = "JSON with the table CSV paths and the structure pair list"
    )]
    pub gene_lists: PathBuf,

    #[arg(value_name = "PATH", help = "Output tree JSON representation")]
    pub out_json: PathBuf,

    #[arg(value_name = "PATH", help = "Output tree visual representation")]
    pub out_repr: PathBuf,

    #[arg(
        long = "min-pop-score",
        value_name = "SCORE",
        default_value_t = config::MIN_POP_SCORE,
        help = "Minimum fraction of non-null values to consider cols"
    )]
    pub min_pop_score: f64,

    #[arg(
        long = "min-set-size",
        value_name = "SIZE",
        default_value_t = config::MIN_SET_SIZE,
        help = "Minimum generated set size"
    )]
    pub min_set_size: usize,

    #[arg(
        long = "min-recurse-set-size",
        value_name = "SIZE",
        default_value_t = config::MIN_RECURSE_SET_SIZE,
        help = "Minimum size of set to recurse on"
    )]
    pub min_recurse_set_size: usize,

    #[arg(long = "no-recurse", help = "Suppress recursion")]
    pub no_recurse: bool,

    #[arg(long = "no-prune", help = "Do not run pruning on the gene lists")]
    pub no_prune: bool,

    #[arg(
        long = "prune-similarity",
        value_name = "SCORE",
        default_value_t = config::PRUNE_SIMILARITY,
        help = "Node similarity threshold for pruning"
    )]
    pub prune_similarity: f64,

    #[arg(
        long = "prune-direction",
        value_name = "DIRECTION",
        default_value = "bottomup",
        help = "Direction to prune nodes in [topdown/bottomup]"
    )]
    pub prune_direction: String,

    #[arg(
        short = 'd',
        long = "delimiter",
        value_name = "CHAR",
        default_value_t = ',',
        help = "Column delimiter of the input tables"
    )]
    pub delimiter: char,

    #[arg(short = 'v', long = "verbose", help = "Increase verbosity")]
    pub verbose: bool,
}

impl MakeArgs {
    pub fn from(args: Vec<String>) -> Self {
        let mut full_args = vec![env!("CARGO_PKG_NAME").to_string()];
        full_args.extend(args);

        MakeArgs::parse_from(full_args)
    }

    pub fn direction(&self) -> anyhow::Result<PruneDirection> {
        Ok(self.prune_direction.parse()?)
    }
}

impl ArgCheck for MakeArgs {
    fn get_inputs(&self) -> Vec<&PathBuf> {
        vec![&self.gene_lists]
    }

    fn check_thresholds(&self) -> Result<(), CliError> {
        validate_fraction(self.min_pop_score, "min-pop-score")?;
        validate_fraction(self.prune_similarity, "prune-similarity")?;
        self.prune_direction.parse::<PruneDirection>()?;

        if !self.delimiter.is_ascii() {
            return Err(CliError::InvalidInput(format!(
                "delimiter must be a single ASCII character, got {:?}",
                self.delimiter
            )));
        }

        Ok(())
    }
}

#[derive(Debug, Parser)]
pub struct CheckArgs {
    #[arg(value_name = "PATH", help = "First tree JSON to compare")]
    pub one: PathBuf,

    #[arg(value_name = "PATH", help = "Second tree JSON to compare")]
    pub two: PathBuf,

    #[arg(short = 'v', long = "verbose", help = "Increase verbosity")]
    pub verbose: bool,
}

impl CheckArgs {
    pub fn from(args: Vec<String>) -> Self {
        let mut full_args = vec![env!("CARGO_PKG_NAME").to_string()];
        full_args.extend(args);

        CheckArgs::parse_from(full_args)
    }
}

impl ArgCheck for CheckArgs {
    fn get_inputs(&self) -> Vec<&PathBuf> {
        vec![&self.one, &self.two]
    }
}
