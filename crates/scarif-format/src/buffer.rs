use scarif_common::{Result, ScarifError};

/// Growable byte buffer with a read cursor, used for chunk blobs.
#[derive(Debug, Default, Clone)]
pub struct BlobBuffer {
    buffer: Vec<u8>,
    cursor: usize,
}

impl BlobBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            buffer: bytes,
            cursor: 0,
        }
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buffer
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.cursor
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let byte = *self
            .buffer
            .get(self.cursor)
            .ok_or_else(|| ScarifError::decode("blob ended early"))?;
        self.cursor += 1;
        Ok(byte)
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    pub fn read_bytes(&mut self, length: usize) -> Result<&[u8]> {
        if length > self.remaining() {
            return Err(ScarifError::decode(format!(
                "blob needs {} more bytes, {} left",
                length,
                self.remaining()
            )));
        }
        let bytes = &self.buffer[self.cursor..self.cursor + length];
        self.cursor += length;
        Ok(bytes)
    }

    /// Base-128 varint, least significant group first; the high bit of each byte marks
    /// a continuation.
    pub fn write_varint(&mut self, mut value: u64) {
        while value & !0x7F != 0 {
            self.buffer.push(((value & 0x7F) as u8) | 0x80);
            value >>= 7;
        }
        self.buffer.push(value as u8);
    }

    pub fn read_varint(&mut self) -> Result<u64> {
        let mut result = 0u64;
        let mut shift = 0;

        loop {
            let byte = self.read_u8()?;
            if shift == 63 && byte > 1 {
                return Err(ScarifError::decode("varint too big"));
            }
            result |= ((byte & 0x7F) as u64) << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
            if shift > 63 {
                return Err(ScarifError::decode("varint too big"));
            }
        }
    }

    /// Signed values go through a zigzag mapping so small negatives stay short.
    pub fn write_signed_varint(&mut self, value: i64) {
        self.write_varint(((value << 1) ^ (value >> 63)) as u64);
    }

    pub fn read_signed_varint(&mut self) -> Result<i64> {
        let raw = self.read_varint()?;
        Ok((raw >> 1) as i64 ^ -((raw & 1) as i64))
    }

    /// A varint that must fit the target width, used for counts and indices.
    pub fn read_varint_as<T: TryFrom<u64>>(&mut self, what: &str) -> Result<T> {
        let raw = self.read_varint()?;
        T::try_from(raw).map_err(|_| ScarifError::decode(format!("{} {} out of range", what, raw)))
    }

    pub fn write_string(&mut self, value: &str) {
        self.write_varint(value.len() as u64);
        self.buffer.extend_from_slice(value.as_bytes());
    }

    pub fn read_string(&mut self) -> Result<String> {
        let length = self.read_varint_as::<usize>("string length")?;
        let bytes = self.read_bytes(length)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| ScarifError::decode("string is not valid UTF-8"))
    }
}
