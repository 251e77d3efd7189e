use crate::chunk_codec::decode_chunk;
use crate::header::{truncated, ChunkEntry, FileHeader, RegionEntry};
use crate::hilbert::BlockLayout;
use byteorder::{LittleEndian, ReadBytesExt};
use scarif_common::{Coord2, Result, ScarifError};
use scarif_world::Chunk;
use std::collections::BTreeMap;
use std::fs;
use std::io::Cursor;
use std::ops::Range;
use std::path::Path;

/// A compact container held in memory. Regions are decompressed on demand.
#[derive(Debug)]
pub struct ScarifReader {
    header: FileHeader,
    chunks: BTreeMap<Coord2, ChunkEntry>,
    regions: Vec<(RegionEntry, Range<usize>)>,
    dictionary: Vec<u8>,
    bytes: Vec<u8>,
}

impl ScarifReader {
    pub fn open(path: impl AsRef<Path>) -> Result<ScarifReader> {
        ScarifReader::from_bytes(fs::read(path)?)
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<ScarifReader> {
        let mut cursor = Cursor::new(bytes.as_slice());
        let header = FileHeader::read(&mut cursor)?;

        let mut chunks = BTreeMap::new();
        for _ in 0..header.chunk_count {
            let entry = ChunkEntry::read(&mut cursor)?;
            if entry.region >= header.region_count {
                return Err(ScarifError::decode(format!(
                    "chunk {} points at region {} of {}",
                    entry.coord, entry.region, header.region_count
                )));
            }
            chunks.insert(entry.coord, entry);
        }

        let mut region_entries = Vec::with_capacity(header.region_count as usize);
        for _ in 0..header.region_count {
            region_entries.push(RegionEntry::read(&mut cursor)?);
        }

        let dict_len = cursor.read_u32::<LittleEndian>().map_err(truncated)? as usize;
        let mut position = cursor.position() as usize;
        let dictionary = if dict_len == 0 {
            Vec::new()
        } else {
            let packed = slice(&bytes, position..position + dict_len)?;
            zstd::decode_all(packed)
                .map_err(|err| ScarifError::decode(format!("corrupt dictionary: {}", err)))?
        };
        position += dict_len;

        let mut regions = Vec::with_capacity(region_entries.len());
        for entry in region_entries {
            let range = position..position + entry.compressed_len as usize;
            slice(&bytes, range.clone())?;
            position = range.end;
            regions.push((entry, range));
        }
        if position != bytes.len() {
            return Err(ScarifError::decode(format!(
                "{} unexpected bytes after the last region",
                bytes.len() - position
            )));
        }

        Ok(ScarifReader {
            header,
            chunks,
            regions,
            dictionary,
            bytes,
        })
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    pub fn layout(&self) -> BlockLayout {
        self.header.layout()
    }

    pub fn has_dictionary(&self) -> bool {
        !self.dictionary.is_empty()
    }

    pub fn coords(&self) -> impl Iterator<Item = Coord2> + '_ {
        self.chunks.keys().copied()
    }

    pub fn entry(&self, coord: Coord2) -> Option<&ChunkEntry> {
        self.chunks.get(&coord)
    }

    pub fn region(&self, index: usize) -> Result<Vec<u8>> {
        let (entry, range) = self
            .regions
            .get(index)
            .ok_or_else(|| ScarifError::decode(format!("no region {}", index)))?;
        let packed = &self.bytes[range.clone()];

        let mut decompressor = if self.dictionary.is_empty() {
            zstd::bulk::Decompressor::new()
        } else {
            zstd::bulk::Decompressor::with_dictionary(&self.dictionary)
        }?;
        let raw = decompressor
            .decompress(packed, entry.raw_len as usize)
            .map_err(|err| ScarifError::decode(format!("corrupt region {}: {}", index, err)))?;
        if raw.len() != entry.raw_len as usize {
            return Err(ScarifError::decode(format!(
                "region {} inflated to {} bytes, expected {}",
                index,
                raw.len(),
                entry.raw_len
            )));
        }
        Ok(raw)
    }

    /// Encoded bytes of one chunk, `None` if the file has no chunk there.
    pub fn blob(&self, coord: Coord2) -> Result<Option<Vec<u8>>> {
        let entry = match self.chunks.get(&coord) {
            Some(entry) => entry,
            None => return Ok(None),
        };
        let region = self.region(entry.region as usize)?;
        let start = entry.offset as usize;
        let blob = slice(&region, start..start + entry.length as usize)?;
        Ok(Some(blob.to_vec()))
    }

    pub fn chunk(&self, coord: Coord2) -> Result<Option<Chunk>> {
        match self.blob(coord)? {
            Some(blob) => decode_chunk(&blob, coord, self.layout()).map(Some),
            None => Ok(None),
        }
    }
}

fn slice(bytes: &[u8], range: Range<usize>) -> Result<&[u8]> {
    bytes.get(range.clone()).ok_or_else(|| {
        ScarifError::decode(format!(
            "range {}..{} past the end of {} bytes",
            range.start,
            range.end,
            bytes.len()
        ))
    })
}
