use crate::block_state::BlockState;
use crate::packed::{self, PackingRegime};
use scarif_common::{Result, ScarifError};
use scarif_nbt::Tag;

pub const SECTION_EDGE: usize = 16;
pub const SECTION_BLOCKS: usize = SECTION_EDGE * SECTION_EDGE * SECTION_EDGE;
pub const SECTION_BIOMES: usize = SECTION_BLOCKS / 64;

const MIN_BLOCK_BITS: u32 = 4;
const MIN_BIOME_BITS: u32 = 0;

/// A palette plus one index per cell. A single-entry (or empty) palette carries no
/// index array; the one value covers the whole container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PalettedContainer<T> {
    palette: Vec<T>,
    indices: Option<Vec<u16>>,
}

impl<T> PalettedContainer<T> {
    pub fn single(value: T) -> Self {
        PalettedContainer {
            palette: vec![value],
            indices: None,
        }
    }

    pub fn empty() -> Self {
        PalettedContainer {
            palette: Vec::new(),
            indices: None,
        }
    }

    /// Builds a container, checking every index against the palette.
    pub fn new(palette: Vec<T>, indices: Option<Vec<u16>>) -> Result<Self> {
        if palette.len() < 2 {
            return Ok(PalettedContainer {
                palette,
                indices: None,
            });
        }

        let indices = indices.ok_or_else(|| {
            ScarifError::data(format!(
                "palette of {} entries has no index data",
                palette.len()
            ))
        })?;
        if let Some(&bad) = indices.iter().find(|&&i| i as usize >= palette.len()) {
            return Err(ScarifError::data(format!(
                "index {} outside palette of {} entries",
                bad,
                palette.len()
            )));
        }

        Ok(PalettedContainer {
            palette,
            indices: Some(indices),
        })
    }

    pub fn palette(&self) -> &[T] {
        &self.palette
    }

    pub fn indices(&self) -> Option<&[u16]> {
        self.indices.as_deref()
    }

    pub fn index_at(&self, cell: usize) -> usize {
        match &self.indices {
            Some(indices) => indices[cell] as usize,
            None => 0,
        }
    }

    pub fn get(&self, cell: usize) -> Option<&T> {
        self.palette.get(self.index_at(cell))
    }

    fn decode(
        palette: Vec<T>,
        data: Option<&[i64]>,
        cells: usize,
        min_bits: u32,
        regime: PackingRegime,
    ) -> Result<Self> {
        if palette.len() < 2 {
            return PalettedContainer::new(palette, None);
        }

        let data = data.ok_or_else(|| {
            ScarifError::data(format!(
                "palette of {} entries has no packed data",
                palette.len()
            ))
        })?;
        let bits = packed::bits_for_palette(palette.len(), min_bits);
        let indices = packed::unpack(data, cells, bits, regime)?;
        PalettedContainer::new(palette, Some(indices))
    }
}

/// One 16x16x16 slab of a chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub y: i8,
    pub blocks: PalettedContainer<BlockState>,
    pub biomes: PalettedContainer<String>,
}

impl Section {
    pub fn block_index(x: usize, y: usize, z: usize) -> usize {
        (y << 8) | (z << 4) | x
    }

    /// Biome cell for a block position; each biome covers 4x4x4 blocks.
    pub fn biome_index(x: usize, y: usize, z: usize) -> usize {
        ((y >> 2) << 4) | ((z >> 2) << 2) | (x >> 2)
    }

    /// Block at section-local coordinates (each 0..16).
    pub fn block_state(&self, x: usize, y: usize, z: usize) -> &BlockState {
        let index = self.blocks.index_at(Section::block_index(x, y, z));
        &self.blocks.palette[index]
    }

    /// Biome at section-local block coordinates; `None` for sections stored before
    /// biomes moved into sections.
    pub fn biome(&self, x: usize, y: usize, z: usize) -> Option<&str> {
        self.biomes
            .get(Section::biome_index(x, y, z))
            .map(String::as_str)
    }

    /// Decodes a section compound. Returns `None` for sections that carry no block
    /// palette (lighting-only sections above and below the world).
    pub fn from_tag(tag: &Tag, data_version: i32) -> Result<Option<Section>> {
        let y = tag
            .get("Y")
            .and_then(Tag::as_int_like)
            .ok_or_else(|| ScarifError::decode("section without Y"))?;
        let y = i8::try_from(y)
            .map_err(|_| ScarifError::decode(format!("section Y {} out of range", y)))?;

        let regime = PackingRegime::for_data_version(data_version);

        // Since 21w37a palettes live in `block_states`/`biomes` compounds.
        let (palette_tag, data_tag) = match tag.get("block_states") {
            Some(states) => (states.get("palette"), states.get("data")),
            None => (tag.get("Palette"), tag.get("BlockStates")),
        };
        let palette_tag = match palette_tag {
            Some(palette) => palette,
            None => return Ok(None),
        };

        let palette = palette_tag
            .as_list()
            .ok_or_else(|| ScarifError::decode("block palette is not a list"))?
            .iter()
            .map(BlockState::from_tag)
            .collect::<Result<Vec<_>>>()?;
        if palette.is_empty() {
            return Err(ScarifError::data(format!("section {} has an empty block palette", y)));
        }
        let data = long_array(data_tag, "block state data")?;
        let blocks =
            PalettedContainer::decode(palette, data, SECTION_BLOCKS, MIN_BLOCK_BITS, regime)?;

        let biomes = match tag.get("biomes") {
            Some(biomes) => {
                let palette = biomes
                    .get("palette")
                    .and_then(Tag::as_list)
                    .ok_or_else(|| ScarifError::decode("biome palette is not a list"))?
                    .iter()
                    .map(|entry| {
                        entry
                            .as_str()
                            .map(str::to_string)
                            .ok_or_else(|| ScarifError::decode("biome palette entry is not a string"))
                    })
                    .collect::<Result<Vec<_>>>()?;
                let data = long_array(biomes.get("data"), "biome data")?;
                PalettedContainer::decode(palette, data, SECTION_BIOMES, MIN_BIOME_BITS, regime)?
            }
            None => PalettedContainer::empty(),
        };

        Ok(Some(Section { y, blocks, biomes }))
    }
}

fn long_array<'a>(tag: Option<&'a Tag>, what: &str) -> Result<Option<&'a [i64]>> {
    match tag {
        None => Ok(None),
        Some(tag) => tag
            .as_long_array()
            .map(Some)
            .ok_or_else(|| ScarifError::decode(format!("{} is not a long array", what))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use scarif_nbt::Compound;

    fn states_tag(palette: &[BlockState], data: Option<Vec<i64>>) -> Tag {
        let mut states = Compound::new();
        states.insert(
            "palette".to_string(),
            Tag::list(palette.iter().map(BlockState::to_tag).collect()),
        );
        if let Some(data) = data {
            states.insert("data".to_string(), Tag::LongArray(data));
        }
        Tag::Compound(states)
    }

    fn section_tag(y: i8, states: Tag, biomes: Option<Tag>) -> Tag {
        let mut section = Compound::new();
        section.insert("Y".to_string(), Tag::Byte(y));
        section.insert("block_states".to_string(), states);
        if let Some(biomes) = biomes {
            section.insert("biomes".to_string(), biomes);
        }
        Tag::Compound(section)
    }

    #[test]
    fn test_single_entry_palette() {
        let stone = BlockState::new("minecraft:stone");
        let tag = section_tag(3, states_tag(&[stone.clone()], None), None);
        let section = Section::from_tag(&tag, 3465).unwrap().unwrap();

        assert_eq!(section.y, 3);
        assert!(section.blocks.indices().is_none());
        for i in 0..SECTION_BLOCKS {
            let (x, y, z) = (i & 15, i >> 8, (i >> 4) & 15);
            assert_eq!(section.block_state(x, y, z), &stone);
        }
        assert_eq!(section.biome(0, 0, 0), None);
    }

    #[test]
    fn test_two_entry_palette_both_regimes() {
        let palette = vec![BlockState::new("minecraft:stone"), BlockState::new("minecraft:air")];
        let mut indices = vec![0u16; SECTION_BLOCKS];
        indices[Section::block_index(1, 2, 3)] = 1;

        for data_version in [1976, 3465] {
            let regime = PackingRegime::for_data_version(data_version);
            let data = packed::pack(&indices, 4, regime);
            let tag = section_tag(0, states_tag(&palette, Some(data)), None);
            let section = Section::from_tag(&tag, data_version).unwrap().unwrap();

            assert_eq!(section.block_state(1, 2, 3).name, "minecraft:air");
            assert_eq!(section.block_state(3, 2, 1).name, "minecraft:stone");
        }
    }

    #[test]
    fn test_legacy_section_keys() {
        let palette = vec![BlockState::new("minecraft:air"), BlockState::new("minecraft:dirt")];
        let indices: Vec<u16> = (0..SECTION_BLOCKS).map(|i| (i % 2) as u16).collect();
        let mut section = Compound::new();
        section.insert("Y".to_string(), Tag::Byte(-1));
        section.insert(
            "Palette".to_string(),
            Tag::list(palette.iter().map(BlockState::to_tag).collect()),
        );
        section.insert(
            "BlockStates".to_string(),
            Tag::LongArray(packed::pack(&indices, 4, PackingRegime::Tight)),
        );

        let section = Section::from_tag(&Tag::Compound(section), 1976).unwrap().unwrap();
        assert_eq!(section.y, -1);
        assert_eq!(section.block_state(1, 0, 0).name, "minecraft:dirt");
        assert_eq!(section.block_state(0, 0, 0).name, "minecraft:air");
    }

    #[test]
    fn test_biomes() {
        let stone = BlockState::new("minecraft:stone");
        let mut biome_indices = vec![0u16; SECTION_BIOMES];
        biome_indices[Section::biome_index(15, 15, 15)] = 2;
        let mut biomes = Compound::new();
        biomes.insert(
            "palette".to_string(),
            Tag::list(
                ["minecraft:plains", "minecraft:forest", "minecraft:river"]
                    .iter()
                    .map(|b| Tag::String(b.to_string()))
                    .collect(),
            ),
        );
        biomes.insert(
            "data".to_string(),
            Tag::LongArray(packed::pack(&biome_indices, 2, PackingRegime::WordAligned)),
        );

        let tag = section_tag(0, states_tag(&[stone], None), Some(Tag::Compound(biomes)));
        let section = Section::from_tag(&tag, 3465).unwrap().unwrap();
        assert_eq!(section.biome(12, 13, 14), Some("minecraft:river"));
        assert_eq!(section.biome(0, 0, 0), Some("minecraft:plains"));
    }

    #[test]
    fn test_single_biome_needs_no_data() {
        let mut biomes = Compound::new();
        biomes.insert(
            "palette".to_string(),
            Tag::list(vec![Tag::String("minecraft:plains".into())]),
        );
        let tag = section_tag(
            0,
            states_tag(&[BlockState::new("minecraft:air")], None),
            Some(Tag::Compound(biomes)),
        );
        let section = Section::from_tag(&tag, 3465).unwrap().unwrap();
        assert_eq!(section.biome(7, 7, 7), Some("minecraft:plains"));
    }

    #[test]
    fn test_lighting_only_section_skipped() {
        let mut section = Compound::new();
        section.insert("Y".to_string(), Tag::Byte(-5));
        section.insert("SkyLight".to_string(), Tag::ByteArray(vec![0; 2048]));
        assert_eq!(Section::from_tag(&Tag::Compound(section), 3465).unwrap(), None);
    }

    #[test]
    fn test_short_data_is_data_error() {
        let palette = vec![BlockState::new("minecraft:stone"), BlockState::new("minecraft:air")];
        let tag = section_tag(0, states_tag(&palette, Some(vec![0; 16])), None);
        assert_matches!(
            Section::from_tag(&tag, 3465),
            Err(ScarifError::DataConsistencyError(_))
        );
    }

    #[test]
    fn test_missing_data_is_data_error() {
        let palette = vec![BlockState::new("minecraft:stone"), BlockState::new("minecraft:air")];
        let tag = section_tag(0, states_tag(&palette, None), None);
        assert_matches!(
            Section::from_tag(&tag, 3465),
            Err(ScarifError::DataConsistencyError(_))
        );
    }

    #[test]
    fn test_index_past_palette_rejected() {
        let palette = vec![BlockState::new("minecraft:stone"), BlockState::new("minecraft:air")];
        let indices = vec![5u16; SECTION_BLOCKS];
        let data = packed::pack(&indices, 4, PackingRegime::WordAligned);
        let tag = section_tag(0, states_tag(&palette, Some(data)), None);
        assert_matches!(
            Section::from_tag(&tag, 3465),
            Err(ScarifError::DataConsistencyError(_))
        );
    }

    #[test]
    fn test_index_layout() {
        assert_eq!(Section::block_index(1, 0, 0), 1);
        assert_eq!(Section::block_index(0, 0, 1), 16);
        assert_eq!(Section::block_index(0, 1, 0), 256);
        assert_eq!(Section::biome_index(4, 0, 0), 1);
        assert_eq!(Section::biome_index(0, 0, 4), 4);
        assert_eq!(Section::biome_index(0, 4, 0), 16);
    }
}
