use crate::block_state::BlockState;
use crate::section::Section;
use scarif_common::{Coord2, Coord3, Result, ScarifError};
use scarif_nbt::{Compound, Tag};
use std::collections::BTreeMap;

/// One column of sections, plus block entity payloads keyed by chunk-local
/// position (x and z in 0..16, y absolute).
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub coord: Coord2,
    pub data_version: i32,
    sections: Vec<Section>,
    tiles: BTreeMap<Coord3, Compound>,
}

fn is_fully_generated(status: &str) -> bool {
    matches!(status, "full" | "minecraft:full")
}

impl Chunk {
    /// Sections are kept sorted by their vertical index.
    pub fn new(
        coord: Coord2,
        data_version: i32,
        mut sections: Vec<Section>,
        tiles: BTreeMap<Coord3, Compound>,
    ) -> Self {
        sections.sort_by_key(|section| section.y);
        Chunk {
            coord,
            data_version,
            sections,
            tiles,
        }
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, y: i8) -> Option<&Section> {
        self.sections
            .binary_search_by_key(&y, |section| section.y)
            .ok()
            .map(|i| &self.sections[i])
    }

    pub fn tiles(&self) -> &BTreeMap<Coord3, Compound> {
        &self.tiles
    }

    /// Block entity at a chunk-local or absolute position.
    pub fn tile(&self, pos: Coord3) -> Option<&Compound> {
        self.tiles.get(&pos.chunk_local())
    }

    /// Block at a chunk-local or absolute position; `None` when no section covers it.
    pub fn block_at(&self, pos: Coord3) -> Option<&BlockState> {
        let section_y = i8::try_from(pos.section_y()).ok()?;
        let local = pos.local();
        self.section(section_y)
            .map(|section| section.block_state(local.x as usize, local.y as usize, local.z as usize))
    }

    pub fn biome_at(&self, pos: Coord3) -> Option<&str> {
        let section_y = i8::try_from(pos.section_y()).ok()?;
        let local = pos.local();
        self.section(section_y)?
            .biome(local.x as usize, local.y as usize, local.z as usize)
    }

    /// Interprets a chunk root. Returns `None` for chunks that are not fully generated
    /// or have no sections at all.
    pub fn from_tag(root: &Tag, fallback_data_version: i32) -> Result<Option<Chunk>> {
        if root.as_compound().is_none() {
            return Err(ScarifError::decode("chunk root is not a compound"));
        }

        let data_version = root
            .get("DataVersion")
            .and_then(Tag::as_i32)
            .unwrap_or(fallback_data_version);

        // Before 21w43a everything sat inside a `Level` compound with capitalised keys.
        let (level, sections_key, tiles_key) = match root.get("Level") {
            Some(level) => (level, "Sections", "TileEntities"),
            None => (root, "sections", "block_entities"),
        };

        let status = level.get("Status").and_then(Tag::as_str).unwrap_or("");
        if !is_fully_generated(status) {
            return Ok(None);
        }

        let section_tags = match level.get(sections_key).and_then(Tag::as_list) {
            Some(list) if !list.is_empty() => list,
            _ => return Ok(None),
        };

        let x = level
            .get("xPos")
            .and_then(Tag::as_i32)
            .ok_or_else(|| ScarifError::decode("chunk without xPos"))?;
        let z = level
            .get("zPos")
            .and_then(Tag::as_i32)
            .ok_or_else(|| ScarifError::decode("chunk without zPos"))?;

        let mut sections = Vec::with_capacity(section_tags.len());
        for section_tag in section_tags {
            if let Some(section) = Section::from_tag(section_tag, data_version)? {
                sections.push(section);
            }
        }

        let mut tiles = BTreeMap::new();
        if let Some(tile_tags) = level.get(tiles_key).and_then(Tag::as_list) {
            for tile in tile_tags {
                let compound = tile
                    .as_compound()
                    .ok_or_else(|| ScarifError::decode("block entity is not a compound"))?;
                let pos = tile_position(tile)?;
                tiles.insert(pos.chunk_local(), compound.clone());
            }
        }

        Ok(Some(Chunk::new(Coord2::new(x, z), data_version, sections, tiles)))
    }
}

fn tile_position(tile: &Tag) -> Result<Coord3> {
    let axis = |key: &str| {
        tile.get(key)
            .and_then(Tag::as_i32)
            .ok_or_else(|| ScarifError::decode(format!("block entity without {}", key)))
    };
    Ok(Coord3::new(axis("x")?, axis("y")?, axis("z")?))
}
