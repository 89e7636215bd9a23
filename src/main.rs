//! # segment-prep
//!
//! Preprocesses record shards ahead of segment generation: records get validated,
//! keyed for the shuffle and (in append mode) checked for time bucket consistency.
//!
//! ## Getting started
//!
//! ```sh
//! segment-prep 0.1.0
//! segment preprocessing tool.
//!
//! USAGE:
//!     segment-prep <SUBCOMMAND>
//!
//! FLAGS:
//!     -h, --help       Prints help information
//!     -V, --version    Prints version information
//!
//! SUBCOMMANDS:
//!     help          Prints this message or the help of the given subcommand(s)
//!     map           Map a single shard
//!     preprocess    Map every shard of a folder, in parallel
//! ```
//!
use std::path::Path;

use log::{debug, info};
use structopt::StructOpt;

use segment_prep::config::{self, ConfigurationContext};
use segment_prep::error::Error;
use segment_prep::pipeline::{MapShard, Pipeline, Preprocess};

mod cli;

/// Load the config file and apply overrides on top.
fn load_config(path: &Path, defines: Vec<(String, String)>) -> Result<ConfigurationContext, Error> {
    let mut raw = config::load_json(path)?;
    raw.extend(defines);
    ConfigurationContext::setup(&raw)
}

fn main() -> Result<(), Error> {
    env_logger::init();

    let opt = cli::SegmentPrep::from_args();
    debug!("cli args\n{:#?}", opt);

    match opt {
        cli::SegmentPrep::Map(m) => {
            let conf = load_config(&m.config, m.defines)?;
            let summary = MapShard::new(m.src, m.dst, conf).run()?;
            info!("{}", serde_json::to_string(&summary)?);
        }
        cli::SegmentPrep::Preprocess(p) => {
            let conf = load_config(&p.config, p.defines)?;
            let summaries = Preprocess::new(p.src, p.dst, conf).run()?;
            for (shard, summary) in summaries {
                info!("{:?}: {}", shard, serde_json::to_string(&summary)?);
            }
        }
    };
    Ok(())
}
