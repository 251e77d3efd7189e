use crate::{Endianness, Tag};
use flate2::read::{DeflateDecoder, GzDecoder, ZlibDecoder};
use flate2::write::{DeflateEncoder, GzEncoder, ZlibEncoder};
use flate2::Compression;
use scarif_common::Result;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Write};
use std::path::Path;

/// Byte-stream compressor wrapped around raw tag bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NbtCompression {
    None,
    Gzip,
    Zlib,
    Deflate,
}

impl NbtCompression {
    /// Fully inflates `reader`. Failures here are I/O errors, kept apart from
    /// malformed tag data found afterwards.
    pub fn decompress<R: Read>(self, reader: R) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        match self {
            NbtCompression::None => {
                let mut reader = reader;
                reader.read_to_end(&mut bytes)?;
            }
            NbtCompression::Gzip => {
                GzDecoder::new(reader).read_to_end(&mut bytes)?;
            }
            NbtCompression::Zlib => {
                ZlibDecoder::new(reader).read_to_end(&mut bytes)?;
            }
            NbtCompression::Deflate => {
                DeflateDecoder::new(reader).read_to_end(&mut bytes)?;
            }
        }
        Ok(bytes)
    }

    pub fn compress<W: Write>(self, writer: W, bytes: &[u8]) -> Result<()> {
        match self {
            NbtCompression::None => {
                let mut writer = writer;
                writer.write_all(bytes)?;
            }
            NbtCompression::Gzip => {
                let mut encoder = GzEncoder::new(writer, Compression::default());
                encoder.write_all(bytes)?;
                encoder.finish()?;
            }
            NbtCompression::Zlib => {
                let mut encoder = ZlibEncoder::new(writer, Compression::default());
                encoder.write_all(bytes)?;
                encoder.finish()?;
            }
            NbtCompression::Deflate => {
                let mut encoder = DeflateEncoder::new(writer, Compression::default());
                encoder.write_all(bytes)?;
                encoder.finish()?;
            }
        }
        Ok(())
    }
}

/// A complete named root with compression support.
#[derive(Debug, Clone, PartialEq)]
pub struct NbtFile {
    pub root: Tag,
    pub name: String,
}

impl NbtFile {
    pub fn new(name: String, root: Tag) -> Self {
        NbtFile { root, name }
    }

    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let (name, root) = Tag::read(reader)?;
        Ok(NbtFile { root, name })
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.root.write(writer, &self.name)
    }

    /// Parses an uncompressed tag tree held in memory.
    pub fn from_bytes(bytes: &[u8], endianness: Endianness) -> Result<Self> {
        let (name, root) = Tag::read_with(&mut Cursor::new(bytes), endianness)?;
        Ok(NbtFile { root, name })
    }

    pub fn read_compressed<R: Read>(
        reader: R,
        compression: NbtCompression,
        endianness: Endianness,
    ) -> Result<Self> {
        let bytes = compression.decompress(reader)?;
        Self::from_bytes(&bytes, endianness)
    }

    pub fn write_compressed<W: Write>(
        &self,
        writer: W,
        compression: NbtCompression,
        endianness: Endianness,
    ) -> Result<()> {
        let mut bytes = Vec::new();
        self.root.write_with(&mut bytes, &self.name, endianness)?;
        compression.compress(writer, &bytes)
    }

    pub fn read_gzip<R: Read>(reader: &mut R) -> Result<Self> {
        Self::read_compressed(reader, NbtCompression::Gzip, Endianness::Big)
    }

    pub fn write_gzip<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.write_compressed(writer, NbtCompression::Gzip, Endianness::Big)
    }

    pub fn read_file<P: AsRef<Path>>(
        path: P,
        compression: NbtCompression,
        endianness: Endianness,
    ) -> Result<Self> {
        let file = File::open(path)?;
        Self::read_compressed(BufReader::new(file), compression, endianness)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Compound;
    use assert_matches::assert_matches;
    use scarif_common::ScarifError;

    fn sample() -> NbtFile {
        let mut compound = Compound::new();
        compound.insert("name".to_string(), Tag::String("Test".to_string()));
        compound.insert("value".to_string(), Tag::Int(42));
        NbtFile::new("test".to_string(), Tag::Compound(compound))
    }

    #[test]
    fn test_nbt_file() {
        let original = sample();

        let mut buffer = Vec::new();
        original.write(&mut buffer).unwrap();
        let read = NbtFile::read(&mut Cursor::new(buffer)).unwrap();
        assert_eq!(read, original);

        let mut gzip_buffer = Vec::new();
        original.write_gzip(&mut gzip_buffer).unwrap();
        let gzip_read = NbtFile::read_gzip(&mut Cursor::new(gzip_buffer)).unwrap();
        assert_eq!(gzip_read, original);
    }

    #[test]
    fn test_every_compression_and_endianness() {
        let original = sample();
        for compression in [
            NbtCompression::None,
            NbtCompression::Gzip,
            NbtCompression::Zlib,
            NbtCompression::Deflate,
        ] {
            for endianness in [Endianness::Big, Endianness::Little] {
                let mut buffer = Vec::new();
                original
                    .write_compressed(&mut buffer, compression, endianness)
                    .unwrap();
                let read =
                    NbtFile::read_compressed(Cursor::new(buffer), compression, endianness).unwrap();
                assert_eq!(read, original);
            }
        }
    }

    #[test]
    fn test_corrupt_gzip_is_io_error() {
        let result = NbtFile::read_gzip(&mut Cursor::new(vec![1, 2, 3, 4, 5]));
        assert_matches!(result, Err(ScarifError::IoError(_)));
    }

    #[test]
    fn test_bad_payload_is_decode_error() {
        let mut buffer = Vec::new();
        NbtCompression::Zlib
            .compress(&mut buffer, &[10, 0, 0, 99])
            .unwrap();
        let result = NbtFile::read_compressed(Cursor::new(buffer), NbtCompression::Zlib, Endianness::Big);
        assert_matches!(result, Err(ScarifError::DecodeError(_)));
    }

    #[test]
    fn test_read_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("level.dat");
        let original = sample();
        original.write_gzip(&mut File::create(&path).unwrap()).unwrap();

        let read = NbtFile::read_file(&path, NbtCompression::Gzip, Endianness::Big).unwrap();
        assert_eq!(read, original);
    }
}
