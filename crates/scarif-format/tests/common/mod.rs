#![allow(dead_code)]

use scarif_common::Coord2;
use scarif_nbt::{Compound, NbtCompression, NbtFile, Tag};
use scarif_world::packed::{self, PackingRegime};
use scarif_world::region::{region_file_name, SECTOR_BYTES};
use scarif_world::{BlockState, Chunk, PalettedContainer, Section, SECTION_BLOCKS};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::Path;

pub const DATA_VERSION: i32 = 3465;

pub fn compound(entries: Vec<(&str, Tag)>) -> Tag {
    Tag::Compound(entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
}

/// A modern section compound; `indices` is required when the palette has 2+ entries.
pub fn section_tag(y: i8, palette: &[BlockState], indices: Option<&[u16]>) -> Tag {
    let mut states = Compound::new();
    states.insert(
        "palette".to_string(),
        Tag::list(palette.iter().map(BlockState::to_tag).collect()),
    );
    if let Some(indices) = indices {
        let bits = packed::bits_for_palette(palette.len(), 4);
        states.insert(
            "data".to_string(),
            Tag::LongArray(packed::pack(indices, bits, PackingRegime::WordAligned)),
        );
    }
    compound(vec![("Y", Tag::Byte(y)), ("block_states", Tag::Compound(states))])
}

pub fn chunk_tag(coord: Coord2, sections: Vec<Tag>) -> Tag {
    compound(vec![
        ("DataVersion", Tag::Int(DATA_VERSION)),
        ("xPos", Tag::Int(coord.x)),
        ("zPos", Tag::Int(coord.z)),
        ("Status", Tag::String("minecraft:full".to_string())),
        ("sections", Tag::list(sections)),
        ("block_entities", Tag::List(scarif_nbt::tag_id::END, vec![])),
    ])
}

/// Y=0 is stone except one air block at (0, 0, 0); Y=1 is all air.
pub fn stone_and_air_tag(coord: Coord2) -> Tag {
    let palette = [BlockState::new("minecraft:stone"), BlockState::new("minecraft:air")];
    let mut indices = vec![0u16; SECTION_BLOCKS];
    indices[0] = 1;
    chunk_tag(
        coord,
        vec![
            section_tag(0, &palette, Some(&indices)),
            section_tag(1, &[BlockState::new("minecraft:air")], None),
        ],
    )
}

/// One zlib record per chunk, each starting on its own sector after the two tables.
pub fn region_bytes(chunks: &[(Coord2, Tag)]) -> Vec<u8> {
    let sector = SECTOR_BYTES as usize;
    let mut locations = vec![0u8; sector];
    let mut timestamps = vec![0u8; sector];
    let mut body = Vec::new();

    for (coord, tag) in chunks {
        let mut raw = Vec::new();
        tag.write(&mut raw, "").unwrap();
        let mut payload = Vec::new();
        NbtCompression::Zlib.compress(&mut payload, &raw).unwrap();

        let mut record = Vec::new();
        record.extend_from_slice(&((payload.len() + 1) as u32).to_be_bytes());
        record.push(2);
        record.extend_from_slice(&payload);
        let sectors = record.len().div_ceil(sector);
        record.resize(sectors * sector, 0);

        let offset = 2 + body.len() / sector;
        let slot = coord.region_slot() * 4;
        let entry = ((offset as u32) << 8) | sectors as u32;
        locations[slot..slot + 4].copy_from_slice(&entry.to_be_bytes());
        timestamps[slot..slot + 4].copy_from_slice(&1_700_000_000u32.to_be_bytes());
        body.extend_from_slice(&record);
    }

    let mut file = locations;
    file.extend_from_slice(&timestamps);
    file.extend_from_slice(&body);
    file
}

/// Overwrites the location entry of one chunk in a region built by `region_bytes`.
pub fn set_location(region: &mut [u8], coord: Coord2, entry: u32) {
    let slot = coord.region_slot() * 4;
    region[slot..slot + 4].copy_from_slice(&entry.to_be_bytes());
}

pub fn location(region: &[u8], coord: Coord2) -> u32 {
    let slot = coord.region_slot() * 4;
    u32::from_be_bytes([region[slot], region[slot + 1], region[slot + 2], region[slot + 3]])
}

pub fn write_level(world: &Path, data_version: i32) {
    let level = compound(vec![(
        "Data",
        compound(vec![("DataVersion", Tag::Int(data_version))]),
    )]);
    NbtFile::new(String::new(), level)
        .write_gzip(&mut File::create(world.join("level.dat")).unwrap())
        .unwrap();
}

pub fn write_region(world: &Path, region: Coord2, bytes: &[u8]) {
    let dir = world.join("region");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(region_file_name(region)), bytes).unwrap();
}

/// A chunk built in memory: one stone section with a single block swapped for `marker`.
pub fn marked_chunk(coord: Coord2, marker: &str, at: usize) -> Chunk {
    let palette = vec![BlockState::new("minecraft:stone"), BlockState::new(marker)];
    let mut indices = vec![0u16; SECTION_BLOCKS];
    indices[at] = 1;
    let section = Section {
        y: 0,
        blocks: PalettedContainer::new(palette, Some(indices)).unwrap(),
        biomes: PalettedContainer::single("minecraft:plains".to_string()),
    };
    Chunk::new(coord, DATA_VERSION, vec![section], BTreeMap::new())
}

pub fn assert_same_blocks(expected: &Chunk, actual: &Chunk) {
    assert_eq!(expected.sections().len(), actual.sections().len());
    for (left, right) in expected.sections().iter().zip(actual.sections()) {
        assert_eq!(left.y, right.y);
        for i in 0..SECTION_BLOCKS {
            let (x, y, z) = (i & 15, i >> 8, (i >> 4) & 15);
            assert_eq!(
                left.block_state(x, y, z),
                right.block_state(x, y, z),
                "section {} block {}",
                left.y,
                i
            );
        }
    }
}
