use crate::block_state::BlockState;
use crate::region::{parse_region_file_name, region_file_name, Region};
use scarif_common::{Coord3, RegionId, Result};
use scarif_logger::log;
use scarif_logger::LogSeverity::Warning;
use scarif_nbt::{Endianness, NbtCompression, NbtFile, Tag};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// A world save directory and its schema version from `level.dat`.
#[derive(Debug, Clone)]
pub struct World {
    path: PathBuf,
    pub data_version: i32,
}

/// Regions loaded during one run, keyed by coordinate and dimension. Missing files are
/// remembered as `None` so they are not probed twice. Nothing is evicted.
#[derive(Debug, Default)]
pub struct RegionCache {
    regions: HashMap<RegionId, Option<Region>>,
}

impl RegionCache {
    pub fn new() -> Self {
        RegionCache::default()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn contains(&self, id: &RegionId) -> bool {
        self.regions.contains_key(id)
    }
}

impl World {
    pub fn new(path: impl Into<PathBuf>, data_version: i32) -> Self {
        World {
            path: path.into(),
            data_version,
        }
    }

    pub fn open(path: impl Into<PathBuf>) -> Result<World> {
        let path = path.into();
        let level = NbtFile::read_file(path.join("level.dat"), NbtCompression::Gzip, Endianness::Big)?;
        let data_version = level
            .root
            .get("Data")
            .and_then(|data| data.get("DataVersion"))
            .and_then(Tag::as_i32);

        let data_version = match data_version {
            Some(version) => version,
            None => {
                log(
                    format!("{}: level.dat has no DataVersion, assuming 0", path.display()),
                    Warning,
                );
                0
            }
        };

        Ok(World { path, data_version })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `region/` for the overworld, `<dimension>/region/` otherwise (e.g. `DIM-1`).
    pub fn region_dir(&self, dimension: Option<&str>) -> PathBuf {
        match dimension {
            Some(dimension) => self.path.join(dimension).join("region"),
            None => self.path.join("region"),
        }
    }

    pub fn region_path(&self, id: &RegionId) -> PathBuf {
        self.region_dir(id.dimension.as_deref())
            .join(region_file_name(id.coord))
    }

    /// Every region file of a dimension, sorted by coordinate.
    pub fn region_ids(&self, dimension: Option<&str>) -> Result<Vec<RegionId>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(self.region_dir(dimension))? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("mca") {
                continue;
            }
            if let Some(coord) = parse_region_file_name(&path) {
                ids.push(RegionId::new(coord, dimension.map(str::to_string)));
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Loads a region from disk without caching; `None` if the file does not exist.
    pub fn load_region(&self, id: &RegionId) -> Result<Option<Region>> {
        let path = self.region_path(id);
        if !path.exists() {
            return Ok(None);
        }
        Region::load(&path, self.data_version).map(Some)
    }

    pub fn region<'c>(&self, cache: &'c mut RegionCache, id: &RegionId) -> Result<Option<&'c Region>> {
        if !cache.contains(id) {
            let region = self.load_region(id)?;
            cache.regions.insert(id.clone(), region);
        }
        Ok(cache.regions.get(id).and_then(Option::as_ref))
    }

    pub fn block_at(
        &self,
        cache: &mut RegionCache,
        pos: Coord3,
        dimension: Option<&str>,
    ) -> Result<Option<BlockState>> {
        let id = RegionId::new(pos.region(), dimension.map(str::to_string));
        let block = self
            .region(cache, &id)?
            .and_then(|region| region.chunk(pos.chunk()))
            .and_then(|chunk| chunk.block_at(pos))
            .cloned();
        Ok(block)
    }
}
