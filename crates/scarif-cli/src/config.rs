use clap::Parser;
use scarif_common::{Coord2, Result, ScarifError};
use scarif_format::{BlockLayout, EncoderOptions};
use scarif_logger::LogSeverity;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "scarif", about = "Convert a world save into a compact deduplicated container")]
pub struct Cli {
    /// World save directory (the one holding level.dat)
    pub world: PathBuf,
    /// Output file path
    pub output: PathBuf,
    /// Dimension directory such as DIM-1; the overworld when omitted
    #[arg(long)]
    pub dimension: Option<String>,
    /// Only convert this region, given as X,Z (repeatable)
    #[arg(long = "region", value_name = "X,Z", allow_hyphen_values = true)]
    pub regions: Vec<String>,
    /// Region files loaded at the same time
    #[arg(long)]
    pub workers: Option<usize>,
    /// zstd level for region batches
    #[arg(long)]
    pub level: Option<i32>,
    /// Unique chunks per compressed region batch
    #[arg(long)]
    pub region_size: Option<usize>,
    /// Upper bound for the trained dictionary, in bytes
    #[arg(long)]
    pub dictionary_size: Option<usize>,
    /// Block order inside a section: linear or hilbert
    #[arg(long)]
    pub layout: Option<String>,
    /// JSON file with defaults for any of the options above
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Numeric id registry dumped next to the world
    #[arg(long)]
    pub registry: Option<PathBuf>,
    #[arg(long)]
    pub log_level: Option<LogSeverity>,
}

/// Shape of the `--config` file. Every field is optional.
#[derive(Deserialize, Debug, Default, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub dimension: Option<String>,
    pub regions: Vec<[i32; 2]>,
    pub workers: Option<usize>,
    pub level: Option<i32>,
    pub region_size: Option<usize>,
    pub dictionary_size: Option<usize>,
    pub layout: Option<String>,
    pub registry: Option<PathBuf>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<FileConfig> {
        let text = fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|err| {
            ScarifError::ConfigError(format!("{}: {}", path.display(), err))
        })
    }
}

/// Everything one conversion run needs, after merging file and command line.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertConfig {
    pub world: PathBuf,
    pub output: PathBuf,
    pub dimension: Option<String>,
    /// `None` converts every region file of the dimension.
    pub regions: Option<Vec<Coord2>>,
    pub workers: usize,
    pub registry: Option<PathBuf>,
    pub encoder: EncoderOptions,
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl ConvertConfig {
    pub fn from_cli(cli: Cli) -> Result<ConvertConfig> {
        let file = match &cli.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        ConvertConfig::merge(cli, file)
    }

    /// Command-line values win over file values.
    pub fn merge(cli: Cli, file: FileConfig) -> Result<ConvertConfig> {
        let defaults = EncoderOptions::default();

        let layout = match cli.layout.or(file.layout) {
            Some(name) => BlockLayout::from_name(&name).ok_or_else(|| {
                ScarifError::ConfigError(format!("unknown layout '{}', expected linear or hilbert", name))
            })?,
            None => defaults.layout,
        };

        let encoder = EncoderOptions {
            region_size: cli.region_size.or(file.region_size).unwrap_or(defaults.region_size),
            level: cli.level.or(file.level).unwrap_or(defaults.level),
            dictionary_size: cli
                .dictionary_size
                .or(file.dictionary_size)
                .unwrap_or(defaults.dictionary_size),
            layout,
            ..defaults
        };
        if encoder.region_size == 0 {
            return Err(ScarifError::ConfigError("region size must be at least 1".into()));
        }
        if !(1..=22).contains(&encoder.level) {
            return Err(ScarifError::ConfigError(format!(
                "compression level {} outside 1..=22",
                encoder.level
            )));
        }

        let workers = cli.workers.or(file.workers).unwrap_or_else(default_workers);
        if workers == 0 {
            return Err(ScarifError::ConfigError("workers must be at least 1".into()));
        }

        let regions = if !cli.regions.is_empty() {
            Some(cli.regions.iter().map(|r| parse_region(r)).collect::<Result<Vec<_>>>()?)
        } else if !file.regions.is_empty() {
            Some(file.regions.iter().map(|[x, z]| Coord2::new(*x, *z)).collect())
        } else {
            None
        };

        Ok(ConvertConfig {
            world: cli.world,
            output: cli.output,
            dimension: cli.dimension.or(file.dimension),
            regions,
            workers,
            registry: cli.registry.or(file.registry),
            encoder,
        })
    }
}

/// Parses `X,Z` into a region coordinate.
pub fn parse_region(value: &str) -> Result<Coord2> {
    let invalid = || ScarifError::ConfigError(format!("region '{}' is not X,Z", value));
    let (x, z) = value.split_once(',').ok_or_else(invalid)?;
    let x = x.trim().parse().map_err(|_| invalid())?;
    let z = z.trim().parse().map_err(|_| invalid())?;
    Ok(Coord2::new(x, z))
}
