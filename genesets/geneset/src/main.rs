//! Entry point for the geneset CLI
//!
//! Two subcommands are offered: `make`, which runs the full gene-set tree
//! pipeline (load tables, build per-table trees, paste them together,
//! prune, serialize), and `check`, which compares two serialized trees and
//! exits non-zero when they are not congruent.

use clap::Parser;
use config::ArgCheck;
use log::{error, info, Level};
use simple_logger::init_with_level;

use geneset::cli::{Args, SubArgs};
use geneset::core;

fn main() {
    let start = std::time::Instant::now();
    let args: Args = Args::parse();

    match args.command {
        SubArgs::Make { args } => {
            let level = if args.verbose { Level::Debug } else { Level::Info };
            init_with_level(level).unwrap();

            args.check().unwrap_or_else(|e| {
                error!("{}", e);
                std::process::exit(1);
            });

            core::make_genesets(args).unwrap_or_else(|e| {
                error!("{}", e);
                std::process::exit(1);
            });
        }
        SubArgs::Check { args } => {
            let level = if args.verbose { Level::Debug } else { Level::Info };
            init_with_level(level).unwrap();

            args.check().unwrap_or_else(|e| {
                error!("{}", e);
                std::process::exit(1);
            });

            let congruent = core::check_genesets(&args).unwrap_or_else(|e| {
                error!("{}", e);
                std::process::exit(1);
            });

            if !congruent {
                std::process::exit(1);
            }
        }
    }

    let elapsed = start.elapsed();
    info!("Elapsed time: {:.3?}", elapsed);
}
