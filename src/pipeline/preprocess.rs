//! Shard preprocessing pipelines
//!
//! Input shards are Avro object containers, one per worker.
//! Each shard is mapped into a pair container of the same name in the destination folder.
//!
//! # Processing
//! 1. The configuration is resolved once, and shared (read-only) by every worker.
//! 1. Each shard gets its own [Mapper], so that time baselines never leak from a shard to another.
//! 1. Shards are processed in parallel, records of a shard sequentially.
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use log::{debug, error, info, warn};
use rayon::prelude::*;

use crate::config::ConfigurationContext;
use crate::error::Error;
use crate::io::{pair_schema, AvroPairEmitter, ShardReader};
use crate::processing::{KeyDeriver, Mapper, ShardSummary};

use super::Pipeline;

/// Map a single shard from `src` into `dst`.
///
/// Pairs are written next to `dst` and moved into place once the whole shard is mapped,
/// so that a failed shard leaves no output behind.
/// Shards without records produce no output file.
pub fn map_shard(
    src: &Path,
    dst: &Path,
    config: &ConfigurationContext,
) -> Result<ShardSummary, Error> {
    info!("[{:?}] starting", src);
    if dst.exists() {
        error!("{:?} already exists!", dst);
        return Err(
            std::io::Error::new(std::io::ErrorKind::AlreadyExists, format!("{dst:?}")).into(),
        );
    }

    let reader = ShardReader::from_path(src)?;
    if reader.schema() != config.value_schema() {
        return Err(Error::SchemaMismatch {
            expected: config.value_schema().clone(),
            found: reader.schema().clone(),
        });
    }

    let partial = partial_path(dst)?;
    if partial.exists() {
        debug!("[{:?}] removing stale {:?}", src, partial);
        fs::remove_file(&partial)?;
    }

    let summary = match write_pairs(reader, &partial, config) {
        Ok(summary) => summary,
        Err(e) => {
            if partial.exists() {
                if let Err(rm) = fs::remove_file(&partial) {
                    error!("[{:?}] could not remove {:?}: {}", src, partial, rm);
                }
            }
            return Err(e);
        }
    };

    if summary.mapped == 0 {
        fs::remove_file(&partial)?;
        warn!("[{:?}] no records, no output written", src);
        return Ok(summary);
    }
    fs::rename(&partial, dst)?;

    if summary.warned {
        warn!(
            "[{:?}] {} records out of {} are not in time bucket {:?}",
            src,
            summary.mismatches,
            summary.mapped,
            summary.baseline.as_ref().map(|b| b.as_str())
        );
    }
    info!("[{:?}] done: {} records mapped", src, summary.mapped);
    Ok(summary)
}

/// `<dir>/.<file name>.partial`
fn partial_path(dst: &Path) -> Result<PathBuf, Error> {
    let file_name = dst
        .file_name()
        .and_then(|f| f.to_str())
        .ok_or_else(|| Error::Custom(format!("no file name in {dst:?}")))?;
    Ok(dst.with_file_name(format!(".{file_name}.partial")))
}

fn write_pairs<R: Read>(
    reader: ShardReader<'_, R>,
    path: &Path,
    config: &ConfigurationContext,
) -> Result<ShardSummary, Error> {
    let key_schema = KeyDeriver::new(config)?.key_schema().clone();
    let schema = pair_schema(&key_schema, config.value_schema())?;
    let emitter = AvroPairEmitter::from_path(path, &schema, key_schema)?;

    let mut mapper = Mapper::new(config, emitter)?;
    mapper.map_all(reader)?;
    let (summary, mut emitter) = mapper.finish();
    emitter.flush()?;
    Ok(summary)
}

/// Preprocess a single shard.
pub struct MapShard {
    src: PathBuf,
    dst: PathBuf,
    config: ConfigurationContext,
}

impl MapShard {
    pub fn new(src: PathBuf, dst: PathBuf, config: ConfigurationContext) -> Self {
        Self { src, dst, config }
    }
}

impl Pipeline<ShardSummary> for MapShard {
    fn run(&self) -> Result<ShardSummary, Error> {
        map_shard(&self.src, &self.dst, &self.config)
    }
}

/// Preprocess every `.avro` shard of a folder.
pub struct Preprocess {
    src: PathBuf,
    dst: PathBuf,
    config: ConfigurationContext,
}

impl Preprocess {
    pub fn new(src: PathBuf, dst: PathBuf, config: ConfigurationContext) -> Self {
        Self { src, dst, config }
    }

    /// list shards in source folder, sorted by path.
    fn get_shard_paths(&self) -> Result<Vec<PathBuf>, Error> {
        let src = self
            .src
            .to_str()
            .ok_or_else(|| Error::Custom(format!("non UTF-8 source path {:?}", self.src)))?;
        let pattern = Path::new(&glob::Pattern::escape(src)).join("*.avro");
        let pattern = pattern
            .to_str()
            .ok_or_else(|| Error::Custom(format!("non UTF-8 source path {:?}", self.src)))?;

        let mut paths = glob::glob(pattern)?.collect::<Result<Vec<_>, _>>()?;
        paths.sort();
        Ok(paths)
    }
}

impl Pipeline<Vec<(PathBuf, ShardSummary)>> for Preprocess {
    fn run(&self) -> Result<Vec<(PathBuf, ShardSummary)>, Error> {
        let shards = self.get_shard_paths()?;
        if shards.is_empty() {
            warn!("no shard found in {:?}", self.src);
        }
        debug!("shards: {:#?}", shards);

        fs::create_dir_all(&self.dst)?;

        let results = shards
            .into_par_iter()
            .map(|shard| {
                let file_name = shard
                    .file_name()
                    .ok_or_else(|| Error::Custom(format!("no file name in {shard:?}")))?;
                let dst = self.dst.join(file_name);
                match map_shard(&shard, &dst, &self.config) {
                    Ok(summary) => Ok((shard, summary)),
                    Err(e) => {
                        error!("[{:?}] failed: {}", shard, e);
                        Err(e)
                    }
                }
            })
            .collect::<Result<Vec<_>, Error>>()?;

        let warned = results.iter().filter(|(_, s)| s.warned).count();
        info!(
            "{} shards preprocessed, {} with multiple time buckets",
            results.len(),
            warned
        );
        Ok(results)
    }
}
