//! Byte layout of one chunk blob:
//!
//! ```text
//! varint tile_count
//!   tile:    u8 (x << 4 | z), zigzag varint y, varint length, NBT compound without x/y/z
//! varint section_count
//!   section: i8 y
//!            varint block_palette_len, per entry: string name, varint property_count,
//!                                                 property_count * (string key, string value)
//!            4096 varint indices in block layout order, only when block_palette_len >= 2
//!            varint biome_palette_len, per entry: string name
//!            64 varint indices in linear order, only when biome_palette_len >= 2
//! ```
//!
//! Palettes are reordered by usage before writing, so equal chunks give equal bytes.

use crate::buffer::BlobBuffer;
use crate::hilbert::BlockLayout;
use crate::palette_order::reorder_by_frequency;
use scarif_common::{Coord2, Coord3, Result, ScarifError};
use scarif_nbt::{Compound, Tag};
use scarif_world::{BlockState, Chunk, PalettedContainer, Section, SECTION_BIOMES, SECTION_BLOCKS};
use std::collections::BTreeMap;

const TILE_POSITION_KEYS: [&str; 3] = ["x", "y", "z"];

pub fn encode_chunk(chunk: &Chunk, layout: BlockLayout) -> Result<Vec<u8>> {
    let mut buffer = BlobBuffer::new();

    buffer.write_varint(chunk.tiles().len() as u64);
    for (pos, tile) in chunk.tiles() {
        write_tile(&mut buffer, *pos, tile)?;
    }

    buffer.write_varint(chunk.sections().len() as u64);
    for section in chunk.sections() {
        write_section(&mut buffer, section, layout)?;
    }

    Ok(buffer.into_inner())
}

/// Rebuilds a chunk from its blob. Tile payloads get absolute `x`/`y`/`z` back; the
/// schema version is not stored and comes back as 0.
pub fn decode_chunk(bytes: &[u8], coord: Coord2, layout: BlockLayout) -> Result<Chunk> {
    let mut buffer = BlobBuffer::from_bytes(bytes.to_vec());

    let tile_count = buffer.read_varint_as::<usize>("tile count")?;
    let mut tiles = BTreeMap::new();
    for _ in 0..tile_count {
        let (pos, tile) = read_tile(&mut buffer, coord)?;
        tiles.insert(pos, tile);
    }

    let section_count = buffer.read_varint_as::<usize>("section count")?;
    let mut sections = Vec::with_capacity(section_count.min(64));
    for _ in 0..section_count {
        sections.push(read_section(&mut buffer, layout)?);
    }

    if buffer.remaining() != 0 {
        return Err(ScarifError::decode(format!(
            "{} trailing bytes after chunk {}",
            buffer.remaining(),
            coord
        )));
    }

    Ok(Chunk::new(coord, 0, sections, tiles))
}

fn write_tile(buffer: &mut BlobBuffer, pos: Coord3, tile: &Compound) -> Result<()> {
    buffer.write_u8((((pos.x & 0xF) << 4) | (pos.z & 0xF)) as u8);
    buffer.write_signed_varint(pos.y as i64);

    let mut stripped = tile.clone();
    for key in TILE_POSITION_KEYS {
        stripped.remove(key);
    }
    let nbt = Tag::Compound(stripped).to_bytes()?;
    buffer.write_varint(nbt.len() as u64);
    buffer.write_bytes(&nbt);
    Ok(())
}

fn read_tile(buffer: &mut BlobBuffer, coord: Coord2) -> Result<(Coord3, Compound)> {
    let packed = buffer.read_u8()?;
    let y = buffer.read_signed_varint()?;
    let y = i32::try_from(y).map_err(|_| ScarifError::decode(format!("tile y {} out of range", y)))?;
    let pos = Coord3::new((packed >> 4) as i32, y, (packed & 0xF) as i32);

    let length = buffer.read_varint_as::<usize>("tile length")?;
    let mut nbt = buffer.read_bytes(length)?;
    let (_, tag) = Tag::read(&mut nbt)?;
    let mut tile = match tag {
        Tag::Compound(compound) => compound,
        _ => return Err(ScarifError::decode("tile payload is not a compound")),
    };

    tile.insert("x".to_string(), Tag::Int(absolute(coord.x, pos.x)?));
    tile.insert("y".to_string(), Tag::Int(pos.y));
    tile.insert("z".to_string(), Tag::Int(absolute(coord.z, pos.z)?));
    Ok((pos, tile))
}

fn absolute(chunk: i32, local: i32) -> Result<i32> {
    chunk
        .checked_mul(16)
        .and_then(|base| base.checked_add(local))
        .ok_or_else(|| ScarifError::decode(format!("chunk coordinate {} out of range", chunk)))
}

fn write_section(buffer: &mut BlobBuffer, section: &Section, layout: BlockLayout) -> Result<()> {
    buffer.write_u8(section.y as u8);

    let blocks = reorder_by_frequency(&section.blocks)?;
    buffer.write_varint(blocks.palette().len() as u64);
    for state in blocks.palette() {
        buffer.write_string(&state.name);
        buffer.write_varint(state.properties.len() as u64);
        for (key, value) in &state.properties {
            buffer.write_string(key);
            buffer.write_string(value);
        }
    }
    if let Some(indices) = blocks.indices() {
        for step in 0..SECTION_BLOCKS {
            buffer.write_varint(indices[layout.linear_index(step)] as u64);
        }
    }

    let biomes = reorder_by_frequency(&section.biomes)?;
    buffer.write_varint(biomes.palette().len() as u64);
    for biome in biomes.palette() {
        buffer.write_string(biome);
    }
    if let Some(indices) = biomes.indices() {
        for &index in indices {
            buffer.write_varint(index as u64);
        }
    }
    Ok(())
}

fn read_section(buffer: &mut BlobBuffer, layout: BlockLayout) -> Result<Section> {
    let y = buffer.read_u8()? as i8;

    let palette_len = buffer.read_varint_as::<usize>("block palette length")?;
    if palette_len == 0 {
        return Err(ScarifError::decode(format!("section {} has an empty block palette", y)));
    }
    let mut palette = Vec::with_capacity(palette_len.min(SECTION_BLOCKS));
    for _ in 0..palette_len {
        let mut state = BlockState::new(buffer.read_string()?);
        let property_count = buffer.read_varint_as::<usize>("property count")?;
        for _ in 0..property_count {
            let key = buffer.read_string()?;
            let value = buffer.read_string()?;
            state.properties.insert(key, value);
        }
        palette.push(state);
    }
    let indices = if palette.len() >= 2 {
        let mut indices = vec![0u16; SECTION_BLOCKS];
        for step in 0..SECTION_BLOCKS {
            indices[layout.linear_index(step)] = buffer.read_varint_as("block index")?;
        }
        Some(indices)
    } else {
        None
    };
    let blocks = PalettedContainer::new(palette, indices)?;

    let biome_len = buffer.read_varint_as::<usize>("biome palette length")?;
    let mut biome_palette = Vec::with_capacity(biome_len.min(SECTION_BIOMES));
    for _ in 0..biome_len {
        biome_palette.push(buffer.read_string()?);
    }
    let biome_indices = if biome_palette.len() >= 2 {
        let mut indices = Vec::with_capacity(SECTION_BIOMES);
        for _ in 0..SECTION_BIOMES {
            indices.push(buffer.read_varint_as("biome index")?);
        }
        Some(indices)
    } else {
        None
    };
    let biomes = PalettedContainer::new(biome_palette, biome_indices)?;

    Ok(Section { y, blocks, biomes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn stone_and_air() -> Section {
        let palette = vec![BlockState::new("minecraft:air"), BlockState::new("minecraft:stone")];
        let mut indices = vec![1u16; SECTION_BLOCKS];
        indices[Section::block_index(3, 4, 5)] = 0;
        Section {
            y: 0,
            blocks: PalettedContainer::new(palette, Some(indices)).unwrap(),
            biomes: PalettedContainer::single("minecraft:plains".to_string()),
        }
    }

    fn chest_tile(x: i32, y: i32, z: i32) -> Compound {
        let mut tile = Compound::new();
        tile.insert("id".to_string(), Tag::String("minecraft:chest".into()));
        tile.insert("x".to_string(), Tag::Int(x));
        tile.insert("y".to_string(), Tag::Int(y));
        tile.insert("z".to_string(), Tag::Int(z));
        tile
    }

    fn assert_same_blocks(a: &Chunk, b: &Chunk) {
        assert_eq!(a.sections().len(), b.sections().len());
        for (left, right) in a.sections().iter().zip(b.sections()) {
            assert_eq!(left.y, right.y);
            for i in 0..SECTION_BLOCKS {
                let (x, y, z) = (i & 15, i >> 8, (i >> 4) & 15);
                assert_eq!(left.block_state(x, y, z), right.block_state(x, y, z));
                assert_eq!(left.biome(x, y, z), right.biome(x, y, z));
            }
        }
    }

    #[test]
    fn test_decode_restores_blocks_in_both_layouts() {
        let air = Section {
            y: 1,
            blocks: PalettedContainer::single(BlockState::new("minecraft:air")),
            biomes: PalettedContainer::empty(),
        };
        let chunk = Chunk::new(Coord2::new(0, 0), 3465, vec![stone_and_air(), air], BTreeMap::new());

        for layout in [BlockLayout::Linear, BlockLayout::Hilbert] {
            let blob = encode_chunk(&chunk, layout).unwrap();
            let decoded = decode_chunk(&blob, chunk.coord, layout).unwrap();
            assert_same_blocks(&chunk, &decoded);
            assert_eq!(
                decoded.section(0).unwrap().block_state(3, 4, 5).name,
                "minecraft:air"
            );
        }
    }

    #[test]
    fn test_palette_order_does_not_change_bytes() {
        let section = stone_and_air();
        let flipped_palette = vec![BlockState::new("minecraft:stone"), BlockState::new("minecraft:air")];
        let flipped_indices = section.blocks.indices().unwrap().iter().map(|&i| 1 - i).collect();
        let flipped = Section {
            y: 0,
            blocks: PalettedContainer::new(flipped_palette, Some(flipped_indices)).unwrap(),
            biomes: section.biomes.clone(),
        };

        let a = Chunk::new(Coord2::new(0, 0), 3465, vec![section], BTreeMap::new());
        let b = Chunk::new(Coord2::new(9, 9), 3465, vec![flipped], BTreeMap::new());
        assert_eq!(
            encode_chunk(&a, BlockLayout::Hilbert).unwrap(),
            encode_chunk(&b, BlockLayout::Hilbert).unwrap()
        );
    }

    #[test]
    fn test_single_entry_palette_has_no_indices() {
        let section = Section {
            y: -2,
            blocks: PalettedContainer::single(BlockState::new("minecraft:deepslate")),
            biomes: PalettedContainer::empty(),
        };
        let chunk = Chunk::new(Coord2::new(1, 1), 3465, vec![section], BTreeMap::new());
        let blob = encode_chunk(&chunk, BlockLayout::Hilbert).unwrap();

        // tiles, sections, y, palette len, name, property count, biome palette len
        let expected_len = 1 + 1 + 1 + 1 + (1 + "minecraft:deepslate".len()) + 1 + 1;
        assert_eq!(blob.len(), expected_len);

        let decoded = decode_chunk(&blob, chunk.coord, BlockLayout::Hilbert).unwrap();
        let section = decoded.section(-2).unwrap();
        assert!(section.blocks.indices().is_none());
        for i in 0..SECTION_BLOCKS {
            let (x, y, z) = (i & 15, i >> 8, (i >> 4) & 15);
            assert_eq!(section.block_state(x, y, z).name, "minecraft:deepslate");
        }
    }

    #[test]
    fn test_tiles_lose_and_regain_position() {
        let coord = Coord2::new(-2, 3);
        let absolute = Coord3::new(-29, -40, 55);
        let mut tiles = BTreeMap::new();
        tiles.insert(absolute.chunk_local(), chest_tile(absolute.x, absolute.y, absolute.z));
        let chunk = Chunk::new(coord, 3465, vec![stone_and_air()], tiles);

        let blob = encode_chunk(&chunk, BlockLayout::Linear).unwrap();
        let decoded = decode_chunk(&blob, coord, BlockLayout::Linear).unwrap();
        assert_eq!(decoded.tiles(), chunk.tiles());

        // Moving the same chest to another chunk gives the same blob.
        let mut moved = BTreeMap::new();
        moved.insert(absolute.chunk_local(), chest_tile(3 + 160, -40, 7 + 160));
        let other = Chunk::new(Coord2::new(10, 10), 3465, vec![stone_and_air()], moved);
        assert_eq!(encode_chunk(&other, BlockLayout::Linear).unwrap(), blob);
    }

    #[test]
    fn test_properties_survive() {
        let palette = vec![
            BlockState::new("minecraft:oak_stairs")
                .with_property("facing", "east")
                .with_property("half", "top"),
            BlockState::new("minecraft:air"),
        ];
        let indices: Vec<u16> = (0..SECTION_BLOCKS).map(|i| (i % 7 == 0) as u16).collect();
        let section = Section {
            y: 4,
            blocks: PalettedContainer::new(palette, Some(indices)).unwrap(),
            biomes: PalettedContainer::new(
                vec!["minecraft:plains".to_string(), "minecraft:river".to_string()],
                Some((0..SECTION_BIOMES).map(|i| (i % 2) as u16).collect()),
            )
            .unwrap(),
        };
        let chunk = Chunk::new(Coord2::new(0, 0), 3465, vec![section], BTreeMap::new());

        let blob = encode_chunk(&chunk, BlockLayout::Hilbert).unwrap();
        let decoded = decode_chunk(&blob, chunk.coord, BlockLayout::Hilbert).unwrap();
        assert_same_blocks(&chunk, &decoded);
    }

    #[test]
    fn test_truncated_blob() {
        let chunk = Chunk::new(Coord2::new(0, 0), 3465, vec![stone_and_air()], BTreeMap::new());
        let blob = encode_chunk(&chunk, BlockLayout::Linear).unwrap();
        assert_matches!(
            decode_chunk(&blob[..blob.len() - 3], chunk.coord, BlockLayout::Linear),
            Err(ScarifError::DecodeError(_))
        );
    }

    #[test]
    fn test_empty_block_palette_rejected() {
        // One section at y 0 with no block palette entries.
        let blob = [0, 1, 0, 0, 0];
        assert_matches!(
            decode_chunk(&blob, Coord2::new(0, 0), BlockLayout::Linear),
            Err(ScarifError::DecodeError(_))
        );
    }

    #[test]
    fn test_tile_coordinate_overflow() {
        let mut tiles = BTreeMap::new();
        tiles.insert(Coord3::new(1, 64, 2), chest_tile(1, 64, 2));
        let chunk = Chunk::new(Coord2::new(0, 0), 3465, vec![stone_and_air()], tiles);
        let blob = encode_chunk(&chunk, BlockLayout::Linear).unwrap();

        assert_matches!(
            decode_chunk(&blob, Coord2::new(i32::MAX, 0), BlockLayout::Linear),
            Err(ScarifError::DecodeError(_))
        );
        let far = decode_chunk(&blob, Coord2::new(-(1 << 27), 0), BlockLayout::Linear).unwrap();
        assert_eq!(
            far.tile(Coord3::new(1, 64, 2)).unwrap().get("x"),
            Some(&Tag::Int(i32::MIN + 1))
        );
    }

    #[test]
    fn test_trailing_bytes() {
        let chunk = Chunk::new(Coord2::new(0, 0), 3465, vec![], BTreeMap::new());
        let mut blob = encode_chunk(&chunk, BlockLayout::Linear).unwrap();
        blob.push(0);
        assert_matches!(
            decode_chunk(&blob, chunk.coord, BlockLayout::Linear),
            Err(ScarifError::DecodeError(_))
        );
    }
}
