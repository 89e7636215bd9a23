//! Command line arguments and parameters management/parsing.
use std::path::PathBuf;

use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(name = "segment-prep", about = "segment preprocessing tool.")]
/// Holds every command that is callable by the `segment-prep` command.
pub enum SegmentPrep {
    #[structopt(about = "Map a single shard")]
    Map(Map),
    #[structopt(about = "Map every shard of a folder, in parallel")]
    Preprocess(Preprocess),
}

/// Parse a `key=value` override.
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .ok_or_else(|| format!("invalid key=value: no `=` found in {s:?}"))
}

#[derive(Debug, StructOpt)]
/// Map command and parameters.
///
/// ```sh
/// segment-prep-map 0.1.0
/// Map a single shard
///
/// USAGE:
///     segment-prep map [OPTIONS] <config> <src> <dst>
///
/// OPTIONS:
///     -D <defines>...    override a configuration entry (key=value)
///
/// ARGS:
///     <config>    job configuration (JSON object of strings)
///     <src>       source shard (avro)
///     <dst>       destination pair file (avro)
/// ```
pub struct Map {
    #[structopt(parse(from_os_str), help = "job configuration (JSON object of strings)")]
    pub config: PathBuf,
    #[structopt(parse(from_os_str), help = "source shard (avro)")]
    pub src: PathBuf,
    #[structopt(parse(from_os_str), help = "destination pair file (avro)")]
    pub dst: PathBuf,
    #[structopt(
        short = "D",
        parse(try_from_str = parse_key_val),
        number_of_values = 1,
        help = "override a configuration entry (key=value)"
    )]
    pub defines: Vec<(String, String)>,
}

#[derive(Debug, StructOpt)]
/// Preprocess command and parameters.
pub struct Preprocess {
    #[structopt(parse(from_os_str), help = "job configuration (JSON object of strings)")]
    pub config: PathBuf,
    #[structopt(parse(from_os_str), help = "source folder (contains *.avro shards)")]
    pub src: PathBuf,
    #[structopt(parse(from_os_str), help = "destination folder")]
    pub dst: PathBuf,
    #[structopt(
        short = "D",
        parse(try_from_str = parse_key_val),
        number_of_values = 1,
        help = "override a configuration entry (key=value)"
    )]
    pub defines: Vec<(String, String)>,
}
