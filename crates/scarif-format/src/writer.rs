use crate::chunk_codec::encode_chunk;
use crate::header::{ChunkEntry, FileHeader, RegionEntry};
use crate::hilbert::BlockLayout;
use byteorder::{LittleEndian, WriteBytesExt};
use rayon::prelude::*;
use scarif_common::{Coord2, Result, ScarifError};
use scarif_logger::log;
use scarif_logger::LogSeverity::{Debug, Info, Warning};
use scarif_world::{Chunk, SECTION_BLOCKS};
use sha2::{Digest, Sha512};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

type BlobHash = [u8; 64];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderOptions {
    /// Unique blobs per compressed region.
    pub region_size: usize,
    pub level: i32,
    /// Upper bound for the trained dictionary, in bytes.
    pub dictionary_size: usize,
    pub dictionary_level: i32,
    pub layout: BlockLayout,
}

impl Default for EncoderOptions {
    fn default() -> Self {
        EncoderOptions {
            region_size: 16,
            level: 19,
            dictionary_size: 112_640,
            dictionary_level: 22,
            layout: BlockLayout::Hilbert,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EncodeStats {
    pub chunks: usize,
    pub unique_blobs: usize,
    pub regions: usize,
    /// Blocks across every encoded chunk, duplicates included.
    pub blocks: u64,
    pub bytes: u64,
}

/// Collects encoded chunks and writes them out as one compact container.
///
/// Identical blobs are stored once, keyed by their SHA-512. Blob numbering follows
/// chunk coordinate order, so the file does not depend on the order chunks arrive in.
#[derive(Debug)]
pub struct ScarifWriter {
    options: EncoderOptions,
    chunks: BTreeMap<Coord2, BlobHash>,
    blobs: HashMap<BlobHash, Vec<u8>>,
    blocks: BTreeMap<Coord2, u64>,
}

impl ScarifWriter {
    pub fn new(options: EncoderOptions) -> Self {
        ScarifWriter {
            options,
            chunks: BTreeMap::new(),
            blobs: HashMap::new(),
            blocks: BTreeMap::new(),
        }
    }

    pub fn options(&self) -> &EncoderOptions {
        &self.options
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn unique_blobs(&self) -> usize {
        self.chunks.values().collect::<HashSet<_>>().len()
    }

    /// Encodes one chunk. A chunk already added at the same coordinate is replaced.
    pub fn add_chunk(&mut self, chunk: &Chunk) -> Result<()> {
        let blob = encode_chunk(chunk, self.options.layout)?;
        self.insert(chunk, blob);
        Ok(())
    }

    /// Encodes many chunks in parallel.
    pub fn add_chunks<'a, I>(&mut self, chunks: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a Chunk>,
    {
        let chunks: Vec<&Chunk> = chunks.into_iter().collect();
        let layout = self.options.layout;
        let blobs = chunks
            .par_iter()
            .map(|chunk| encode_chunk(chunk, layout))
            .collect::<Result<Vec<_>>>()?;
        for (chunk, blob) in chunks.into_iter().zip(blobs) {
            self.insert(chunk, blob);
        }
        Ok(())
    }

    fn insert(&mut self, chunk: &Chunk, blob: Vec<u8>) {
        let mut hash = [0u8; 64];
        hash.copy_from_slice(&Sha512::digest(&blob));
        self.blobs.entry(hash).or_insert(blob);
        self.chunks.insert(chunk.coord, hash);
        self.blocks
            .insert(chunk.coord, (chunk.sections().len() * SECTION_BLOCKS) as u64);
    }

    /// Writes the container to `path` through a temporary file renamed on success.
    /// Nothing is left at `path` when any step fails.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<EncodeStats> {
        let path = path.as_ref();
        if self.options.region_size == 0 {
            return Err(ScarifError::encode("region size must be at least 1"));
        }
        if self.chunks.is_empty() {
            return Err(ScarifError::encode("no chunks to encode"));
        }

        let (blobs, entries) = self.layout_blobs()?;
        let regions: Vec<Vec<u8>> = blobs
            .chunks(self.options.region_size)
            .map(|group| group.concat())
            .collect();
        log(
            format!(
                "{} chunks, {} unique blobs in {} regions",
                entries.len(),
                blobs.len(),
                regions.len()
            ),
            Info,
        );

        let dictionary = self.train_dictionary(&regions)?;
        let compressed = self.compress_regions(&regions, &dictionary)?;
        let compressed_dictionary = if dictionary.is_empty() {
            Vec::new()
        } else {
            zstd::bulk::compress(&dictionary, self.options.dictionary_level)
                .map_err(|err| ScarifError::encode(format!("dictionary compression failed: {}", err)))?
        };

        let header = FileHeader {
            chunk_count: to_u32(entries.len(), "chunk count")?,
            region_count: to_u32(regions.len(), "region count")?,
            flags: FileHeader::flags_for(self.options.layout),
        };
        let mut region_entries = Vec::with_capacity(regions.len());
        for (raw, packed) in regions.iter().zip(&compressed) {
            region_entries.push(RegionEntry {
                compressed_len: to_u32(packed.len(), "compressed region length")?,
                raw_len: to_u32(raw.len(), "region length")?,
            });
        }

        let tmp = temp_path(path);
        let written = write_file(
            &tmp,
            &header,
            &entries,
            &region_entries,
            &compressed_dictionary,
            &compressed,
        )
        .and_then(|bytes| {
            fs::rename(&tmp, path)?;
            Ok(bytes)
        });
        let bytes = match written {
            Ok(bytes) => bytes,
            Err(err) => {
                let _ = fs::remove_file(&tmp);
                return Err(err);
            }
        };

        Ok(EncodeStats {
            chunks: entries.len(),
            unique_blobs: blobs.len(),
            regions: regions.len(),
            blocks: self.blocks.values().sum(),
            bytes,
        })
    }

    /// Numbers blobs by first appearance in coordinate order and builds the chunk table.
    fn layout_blobs(&self) -> Result<(Vec<&[u8]>, Vec<ChunkEntry>)> {
        let region_size = self.options.region_size;
        let mut index_of: HashMap<&BlobHash, u32> = HashMap::new();
        let mut blobs: Vec<&[u8]> = Vec::new();
        let mut offsets: Vec<u64> = Vec::new();
        let mut region_fill = 0u64;

        let mut entries = Vec::with_capacity(self.chunks.len());
        for (coord, hash) in &self.chunks {
            let blob = match index_of.get(hash) {
                Some(&blob) => blob,
                None => {
                    let bytes = self
                        .blobs
                        .get(hash)
                        .ok_or_else(|| ScarifError::encode(format!("blob for chunk {} is missing", coord)))?;
                    if blobs.len() % region_size == 0 {
                        region_fill = 0;
                    }
                    let blob = to_u32(blobs.len(), "blob count")?;
                    offsets.push(region_fill);
                    region_fill += bytes.len() as u64;
                    blobs.push(bytes.as_slice());
                    index_of.insert(hash, blob);
                    blob
                }
            };
            entries.push(ChunkEntry {
                coord: *coord,
                blob,
                region: blob / region_size as u32,
                offset: offsets[blob as usize],
                length: to_u32(blobs[blob as usize].len(), "blob length")?,
            });
        }
        Ok((blobs, entries))
    }

    fn train_dictionary(&self, regions: &[Vec<u8>]) -> Result<Vec<u8>> {
        if regions.is_empty() {
            return Err(ScarifError::encode("no regions to train a dictionary on"));
        }
        match zstd::dict::from_samples(regions, self.options.dictionary_size) {
            Ok(dictionary) => {
                log(format!("trained a {} byte dictionary", dictionary.len()), Debug);
                Ok(dictionary)
            }
            Err(err) => {
                log(
                    format!("dictionary training failed, compressing without one: {}", err),
                    Warning,
                );
                Ok(Vec::new())
            }
        }
    }

    fn compress_regions(&self, regions: &[Vec<u8>], dictionary: &[u8]) -> Result<Vec<Vec<u8>>> {
        let level = self.options.level;
        regions
            .par_iter()
            .map(|region| {
                let mut compressor = if dictionary.is_empty() {
                    zstd::bulk::Compressor::new(level)
                } else {
                    zstd::bulk::Compressor::with_dictionary(level, dictionary)
                }
                .map_err(|err| ScarifError::encode(format!("compressor setup failed: {}", err)))?;
                compressor
                    .compress(region)
                    .map_err(|err| ScarifError::encode(format!("region compression failed: {}", err)))
            })
            .collect()
    }
}

fn write_file(
    path: &Path,
    header: &FileHeader,
    entries: &[ChunkEntry],
    regions: &[RegionEntry],
    dictionary: &[u8],
    compressed: &[Vec<u8>],
) -> Result<u64> {
    let mut writer = BufWriter::new(File::create(path)?);
    header.write(&mut writer)?;
    for entry in entries {
        entry.write(&mut writer)?;
    }
    for region in regions {
        region.write(&mut writer)?;
    }
    writer.write_u32::<LittleEndian>(to_u32(dictionary.len(), "dictionary length")?)?;
    writer.write_all(dictionary)?;
    for region in compressed {
        writer.write_all(region)?;
    }
    let file = writer
        .into_inner()
        .map_err(|err| ScarifError::IoError(err.into_error()))?;
    file.sync_all()?;
    Ok(file.metadata()?.len())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

fn to_u32(value: usize, what: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| ScarifError::encode(format!("{} {} does not fit in 32 bits", what, value)))
}
