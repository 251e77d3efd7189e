use crate::chunk::Chunk;
use byteorder::{BigEndian, ReadBytesExt};
use scarif_common::{Coord2, Result, ScarifError};
use scarif_logger::log;
use scarif_logger::LogSeverity::{Debug, Warning};
use scarif_nbt::{Endianness, NbtCompression, NbtFile, Tag};
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

pub const SECTOR_BYTES: u64 = 4096;
pub const REGION_CHUNKS: usize = 32 * 32;

/// Where a record sits in its region file, in 4096-byte sectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkLocation {
    pub offset: u32,
    pub sectors: u8,
}

impl ChunkLocation {
    pub fn from_entry(entry: u32) -> Self {
        ChunkLocation {
            offset: entry >> 8,
            sectors: (entry & 0xFF) as u8,
        }
    }

    /// The first two sectors hold the tables; anything pointing there is empty.
    pub fn is_present(&self) -> bool {
        self.offset >= 2 && self.sectors >= 1
    }
}

/// Compression marker in front of every record payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordCompression {
    Gzip = 1,
    Zlib = 2,
}

impl RecordCompression {
    pub fn from_byte(b: u8) -> Result<Self> {
        match b {
            1 => Ok(RecordCompression::Gzip),
            2 => Ok(RecordCompression::Zlib),
            other => Err(ScarifError::UnsupportedCompression(other)),
        }
    }

    fn framing(self) -> NbtCompression {
        match self {
            RecordCompression::Gzip => NbtCompression::Gzip,
            RecordCompression::Zlib => NbtCompression::Zlib,
        }
    }
}

/// Parses `r.<x>.<z>.mca` style names.
pub fn parse_region_file_name(path: &Path) -> Option<Coord2> {
    let stem = path.file_stem()?.to_str()?;
    let mut parts = stem.split('.');
    let _prefix = parts.next()?;
    let x = parts.next()?.parse().ok()?;
    let z = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(Coord2::new(x, z))
}

pub fn region_file_name(coord: Coord2) -> String {
    format!("r.{}.{}.mca", coord.x, coord.z)
}

/// The fully generated chunks of one region file.
#[derive(Debug, Clone)]
pub struct Region {
    pub coord: Coord2,
    pub chunks: HashMap<Coord2, Chunk>,
    timestamps: Vec<u32>,
}

impl Region {
    pub fn chunk(&self, coord: Coord2) -> Option<&Chunk> {
        self.chunks.get(&coord)
    }

    /// Last-modified time of a table slot, seconds since the epoch.
    pub fn timestamp(&self, slot: usize) -> Option<u32> {
        self.timestamps.get(slot).copied()
    }

    /// Reads every record of a region file. Records that fail to decode are logged and
    /// left out; only failures of the file itself are returned.
    pub fn load(path: &Path, fallback_data_version: i32) -> Result<Region> {
        let coord = parse_region_file_name(path).ok_or_else(|| {
            ScarifError::IoError(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a region file name: {}", path.display()),
            ))
        })?;

        let mut file = BufReader::new(File::open(path)?);
        let mut chunks = HashMap::new();

        if file.get_ref().metadata()?.len() == 0 {
            return Ok(Region {
                coord,
                chunks,
                timestamps: vec![0; REGION_CHUNKS],
            });
        }

        let mut locations = [0u32; REGION_CHUNKS];
        file.read_u32_into::<BigEndian>(&mut locations)?;
        let mut timestamps = vec![0u32; REGION_CHUNKS];
        file.read_u32_into::<BigEndian>(&mut timestamps)?;

        for (slot, &entry) in locations.iter().enumerate() {
            let location = ChunkLocation::from_entry(entry);
            if !location.is_present() {
                continue;
            }

            let decoded = read_record(&mut file, location)
                .and_then(|root| Chunk::from_tag(&root, fallback_data_version));
            match decoded {
                Ok(Some(chunk)) => {
                    chunks.insert(chunk.coord, chunk);
                }
                Ok(None) => {
                    log(
                        format!("{}: slot {} is not a finished chunk", path.display(), slot),
                        Debug,
                    );
                }
                Err(err) if err.is_record_local() => {
                    log(
                        format!("{}: skipping slot {}: {}", path.display(), slot, err),
                        Warning,
                    );
                }
                Err(err) => return Err(err),
            }
        }

        Ok(Region {
            coord,
            chunks,
            timestamps,
        })
    }
}

/// Reads and inflates one record, returning its root tag.
pub fn read_record<R: Read + Seek>(reader: &mut R, location: ChunkLocation) -> Result<Tag> {
    reader.seek(SeekFrom::Start(location.offset as u64 * SECTOR_BYTES))?;

    let length = reader.read_u32::<BigEndian>().map_err(truncated)?;
    if length < 1 {
        return Err(ScarifError::decode("record of zero length"));
    }
    let compression = RecordCompression::from_byte(reader.read_u8().map_err(truncated)?)?;

    let mut payload = Vec::new();
    (&mut *reader)
        .take(length as u64 - 1)
        .read_to_end(&mut payload)?;
    if payload.len() as u64 != length as u64 - 1 {
        return Err(ScarifError::decode(format!(
            "record declares {} bytes, {} available",
            length - 1,
            payload.len()
        )));
    }

    let bytes = compression
        .framing()
        .decompress(payload.as_slice())
        .map_err(|err| ScarifError::decode(format!("corrupt record payload: {}", err)))?;
    Ok(NbtFile::from_bytes(&bytes, Endianness::Big)?.root)
}

fn truncated(err: io::Error) -> ScarifError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        ScarifError::decode("record header past end of file")
    } else {
        ScarifError::IoError(err)
    }
}
