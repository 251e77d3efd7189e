use crate::hilbert::BlockLayout;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use scarif_common::{Coord2, Result, ScarifError};
use std::io::{self, Read, Write};

/// "SCRF" read as a little-endian u32.
pub const MAGIC: u32 = 0x4652_4353;
pub const FORMAT_VERSION: u32 = 3;

pub const FLAG_HILBERT_LAYOUT: u32 = 1;

pub const FILE_HEADER_BYTES: usize = 5 * 4;
pub const CHUNK_ENTRY_BYTES: usize = 4 * 4 + 8 + 4;
pub const REGION_ENTRY_BYTES: usize = 2 * 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    pub chunk_count: u32,
    pub region_count: u32,
    pub flags: u32,
}

impl FileHeader {
    pub fn layout(&self) -> BlockLayout {
        if self.flags & FLAG_HILBERT_LAYOUT != 0 {
            BlockLayout::Hilbert
        } else {
            BlockLayout::Linear
        }
    }

    pub fn flags_for(layout: BlockLayout) -> u32 {
        match layout {
            BlockLayout::Hilbert => FLAG_HILBERT_LAYOUT,
            BlockLayout::Linear => 0,
        }
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u32::<LittleEndian>(MAGIC)?;
        writer.write_u32::<LittleEndian>(FORMAT_VERSION)?;
        writer.write_u32::<LittleEndian>(self.chunk_count)?;
        writer.write_u32::<LittleEndian>(self.region_count)?;
        writer.write_u32::<LittleEndian>(self.flags)
    }

    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let magic = reader.read_u32::<LittleEndian>().map_err(truncated)?;
        if magic != MAGIC {
            return Err(ScarifError::decode(format!("bad magic {:#010x}", magic)));
        }
        let version = reader.read_u32::<LittleEndian>().map_err(truncated)?;
        if version != FORMAT_VERSION {
            return Err(ScarifError::decode(format!("unsupported format version {}", version)));
        }
        Ok(FileHeader {
            chunk_count: reader.read_u32::<LittleEndian>().map_err(truncated)?,
            region_count: reader.read_u32::<LittleEndian>().map_err(truncated)?,
            flags: reader.read_u32::<LittleEndian>().map_err(truncated)?,
        })
    }
}

/// Where one chunk's blob lives: `offset` and `length` are within the decompressed region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkEntry {
    pub coord: Coord2,
    pub blob: u32,
    pub region: u32,
    pub offset: u64,
    pub length: u32,
}

impl ChunkEntry {
    pub fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_i32::<LittleEndian>(self.coord.x)?;
        writer.write_i32::<LittleEndian>(self.coord.z)?;
        writer.write_u32::<LittleEndian>(self.blob)?;
        writer.write_u32::<LittleEndian>(self.region)?;
        writer.write_u64::<LittleEndian>(self.offset)?;
        writer.write_u32::<LittleEndian>(self.length)
    }

    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let x = reader.read_i32::<LittleEndian>().map_err(truncated)?;
        let z = reader.read_i32::<LittleEndian>().map_err(truncated)?;
        Ok(ChunkEntry {
            coord: Coord2::new(x, z),
            blob: reader.read_u32::<LittleEndian>().map_err(truncated)?,
            region: reader.read_u32::<LittleEndian>().map_err(truncated)?,
            offset: reader.read_u64::<LittleEndian>().map_err(truncated)?,
            length: reader.read_u32::<LittleEndian>().map_err(truncated)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionEntry {
    pub compressed_len: u32,
    pub raw_len: u32,
}

impl RegionEntry {
    pub fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u32::<LittleEndian>(self.compressed_len)?;
        writer.write_u32::<LittleEndian>(self.raw_len)
    }

    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(RegionEntry {
            compressed_len: reader.read_u32::<LittleEndian>().map_err(truncated)?,
            raw_len: reader.read_u32::<LittleEndian>().map_err(truncated)?,
        })
    }
}

pub(crate) fn truncated(err: io::Error) -> ScarifError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        ScarifError::decode("file ended inside the header")
    } else {
        ScarifError::IoError(err)
    }
}
