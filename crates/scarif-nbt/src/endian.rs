use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};
use scarif_common::{Result, ScarifError};
use std::io::{self, Read, Write};

/// Byte order of numeric payloads. Names and string lengths are always big-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endianness {
    #[default]
    Big,
    Little,
}

// Truncation inside a tag stream is a malformed stream, not an I/O failure.
pub(crate) fn read_error(err: io::Error) -> ScarifError {
    match err.kind() {
        io::ErrorKind::UnexpectedEof => ScarifError::decode("unexpected end of tag stream"),
        io::ErrorKind::InvalidData => ScarifError::decode(err.to_string()),
        _ => ScarifError::IoError(err),
    }
}

pub(crate) struct TagReader<'a, R> {
    inner: &'a mut R,
    endianness: Endianness,
}

impl<'a, R: Read> TagReader<'a, R> {
    pub(crate) fn new(inner: &'a mut R, endianness: Endianness) -> Self {
        TagReader { inner, endianness }
    }

    pub(crate) fn u8(&mut self) -> Result<u8> {
        self.inner.read_u8().map_err(read_error)
    }

    pub(crate) fn i8(&mut self) -> Result<i8> {
        self.inner.read_i8().map_err(read_error)
    }

    pub(crate) fn i16(&mut self) -> Result<i16> {
        match self.endianness {
            Endianness::Big => self.inner.read_i16::<BigEndian>(),
            Endianness::Little => self.inner.read_i16::<LittleEndian>(),
        }
        .map_err(read_error)
    }

    pub(crate) fn i32(&mut self) -> Result<i32> {
        match self.endianness {
            Endianness::Big => self.inner.read_i32::<BigEndian>(),
            Endianness::Little => self.inner.read_i32::<LittleEndian>(),
        }
        .map_err(read_error)
    }

    pub(crate) fn i64(&mut self) -> Result<i64> {
        match self.endianness {
            Endianness::Big => self.inner.read_i64::<BigEndian>(),
            Endianness::Little => self.inner.read_i64::<LittleEndian>(),
        }
        .map_err(read_error)
    }

    pub(crate) fn f32(&mut self) -> Result<f32> {
        match self.endianness {
            Endianness::Big => self.inner.read_f32::<BigEndian>(),
            Endianness::Little => self.inner.read_f32::<LittleEndian>(),
        }
        .map_err(read_error)
    }

    pub(crate) fn f64(&mut self) -> Result<f64> {
        match self.endianness {
            Endianness::Big => self.inner.read_f64::<BigEndian>(),
            Endianness::Little => self.inner.read_f64::<LittleEndian>(),
        }
        .map_err(read_error)
    }

    /// Element count of a list or array; negative counts are rejected.
    pub(crate) fn length(&mut self) -> Result<usize> {
        let length = self.i32()?;
        if length < 0 {
            return Err(ScarifError::decode(format!("negative length: {}", length)));
        }
        Ok(length as usize)
    }

    pub(crate) fn string(&mut self) -> Result<String> {
        let length = self.inner.read_u16::<BigEndian>().map_err(read_error)?;
        let mut bytes = vec![0u8; length as usize];
        self.inner.read_exact(&mut bytes).map_err(read_error)?;
        String::from_utf8(bytes).map_err(|e| ScarifError::decode(e.to_string()))
    }
}

pub(crate) struct TagWriter<'a, W> {
    inner: &'a mut W,
    endianness: Endianness,
}

impl<'a, W: Write> TagWriter<'a, W> {
    pub(crate) fn new(inner: &'a mut W, endianness: Endianness) -> Self {
        TagWriter { inner, endianness }
    }

    pub(crate) fn u8(&mut self, value: u8) -> Result<()> {
        Ok(self.inner.write_u8(value)?)
    }

    pub(crate) fn i8(&mut self, value: i8) -> Result<()> {
        Ok(self.inner.write_i8(value)?)
    }

    pub(crate) fn i16(&mut self, value: i16) -> Result<()> {
        Ok(match self.endianness {
            Endianness::Big => self.inner.write_i16::<BigEndian>(value),
            Endianness::Little => self.inner.write_i16::<LittleEndian>(value),
        }?)
    }

    pub(crate) fn i32(&mut self, value: i32) -> Result<()> {
        Ok(match self.endianness {
            Endianness::Big => self.inner.write_i32::<BigEndian>(value),
            Endianness::Little => self.inner.write_i32::<LittleEndian>(value),
        }?)
    }

    pub(crate) fn i64(&mut self, value: i64) -> Result<()> {
        Ok(match self.endianness {
            Endianness::Big => self.inner.write_i64::<BigEndian>(value),
            Endianness::Little => self.inner.write_i64::<LittleEndian>(value),
        }?)
    }

    pub(crate) fn f32(&mut self, value: f32) -> Result<()> {
        Ok(match self.endianness {
            Endianness::Big => self.inner.write_f32::<BigEndian>(value),
            Endianness::Little => self.inner.write_f32::<LittleEndian>(value),
        }?)
    }

    pub(crate) fn f64(&mut self, value: f64) -> Result<()> {
        Ok(match self.endianness {
            Endianness::Big => self.inner.write_f64::<BigEndian>(value),
            Endianness::Little => self.inner.write_f64::<LittleEndian>(value),
        }?)
    }

    pub(crate) fn length(&mut self, length: usize) -> Result<()> {
        let length = i32::try_from(length)
            .map_err(|_| ScarifError::encode(format!("collection too long: {}", length)))?;
        self.i32(length)
    }

    pub(crate) fn string(&mut self, value: &str) -> Result<()> {
        let length = u16::try_from(value.len())
            .map_err(|_| ScarifError::encode(format!("string too long: {} bytes", value.len())))?;
        self.inner.write_u16::<BigEndian>(length)?;
        Ok(self.inner.write_all(value.as_bytes())?)
    }
}
