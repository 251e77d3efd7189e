mod endian;
pub mod file;

pub use endian::Endianness;
pub use file::{NbtCompression, NbtFile};

use endian::{TagReader, TagWriter};
use scarif_common::{Result, ScarifError};
use std::collections::BTreeMap;
use std::io::{Read, Write};

/// Tag type ids as they appear on the wire.
pub mod tag_id {
    pub const END: u8 = 0;
    pub const BYTE: u8 = 1;
    pub const SHORT: u8 = 2;
    pub const INT: u8 = 3;
    pub const LONG: u8 = 4;
    pub const FLOAT: u8 = 5;
    pub const DOUBLE: u8 = 6;
    pub const BYTE_ARRAY: u8 = 7;
    pub const STRING: u8 = 8;
    pub const LIST: u8 = 9;
    pub const COMPOUND: u8 = 10;
    pub const INT_ARRAY: u8 = 11;
    pub const LONG_ARRAY: u8 = 12;
}

const MAX_DEPTH: usize = 512;

pub type Compound = BTreeMap<String, Tag>;

#[derive(Debug, Clone, PartialEq)]
pub enum Tag {
    End,
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    ByteArray(Vec<i8>),
    String(String),
    /// Declared element type id, then the untagged elements.
    List(u8, Vec<Tag>),
    Compound(Compound),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
}

impl Tag {
    pub fn get_type_id(&self) -> u8 {
        match self {
            Tag::End => tag_id::END,
            Tag::Byte(_) => tag_id::BYTE,
            Tag::Short(_) => tag_id::SHORT,
            Tag::Int(_) => tag_id::INT,
            Tag::Long(_) => tag_id::LONG,
            Tag::Float(_) => tag_id::FLOAT,
            Tag::Double(_) => tag_id::DOUBLE,
            Tag::ByteArray(_) => tag_id::BYTE_ARRAY,
            Tag::String(_) => tag_id::STRING,
            Tag::List(..) => tag_id::LIST,
            Tag::Compound(_) => tag_id::COMPOUND,
            Tag::IntArray(_) => tag_id::INT_ARRAY,
            Tag::LongArray(_) => tag_id::LONG_ARRAY,
        }
    }

    /// Builds a list whose element type is taken from the first element.
    /// Empty lists get the End placeholder type.
    pub fn list(items: Vec<Tag>) -> Tag {
        let element_type = items.first().map_or(tag_id::END, Tag::get_type_id);
        Tag::List(element_type, items)
    }

    /// Reads one named tag from a big-endian stream.
    pub fn read<R: Read>(reader: &mut R) -> Result<(String, Tag)> {
        Tag::read_with(reader, Endianness::Big)
    }

    pub fn read_with<R: Read>(reader: &mut R, endianness: Endianness) -> Result<(String, Tag)> {
        Tag::read_named(&mut TagReader::new(reader, endianness), 0)
    }

    fn read_named<R: Read>(reader: &mut TagReader<R>, depth: usize) -> Result<(String, Tag)> {
        let type_id = reader.u8()?;
        if type_id == tag_id::END {
            return Ok((String::new(), Tag::End));
        }

        let name = reader.string()?;
        let tag = Tag::read_payload(reader, type_id, depth)?;
        Ok((name, tag))
    }

    fn read_payload<R: Read>(reader: &mut TagReader<R>, type_id: u8, depth: usize) -> Result<Tag> {
        if depth > MAX_DEPTH {
            return Err(ScarifError::decode("tag nesting too deep"));
        }

        match type_id {
            tag_id::END => Ok(Tag::End),
            tag_id::BYTE => Ok(Tag::Byte(reader.i8()?)),
            tag_id::SHORT => Ok(Tag::Short(reader.i16()?)),
            tag_id::INT => Ok(Tag::Int(reader.i32()?)),
            tag_id::LONG => Ok(Tag::Long(reader.i64()?)),
            tag_id::FLOAT => Ok(Tag::Float(reader.f32()?)),
            tag_id::DOUBLE => Ok(Tag::Double(reader.f64()?)),
            tag_id::BYTE_ARRAY => {
                let length = reader.length()?;
                let mut bytes = Vec::with_capacity(length.min(1 << 16));
                for _ in 0..length {
                    bytes.push(reader.i8()?);
                }
                Ok(Tag::ByteArray(bytes))
            }
            tag_id::STRING => Ok(Tag::String(reader.string()?)),
            tag_id::LIST => {
                let element_type = reader.u8()?;
                let length = reader.length()?;
                if element_type == tag_id::END && length > 0 {
                    return Err(ScarifError::decode(format!(
                        "list of {} End tags",
                        length
                    )));
                }
                let mut list = Vec::with_capacity(length.min(1 << 12));
                for _ in 0..length {
                    list.push(Tag::read_payload(reader, element_type, depth + 1)?);
                }
                Ok(Tag::List(element_type, list))
            }
            tag_id::COMPOUND => {
                let mut compound = Compound::new();
                loop {
                    let (name, tag) = Tag::read_named(reader, depth + 1)?;
                    if let Tag::End = tag {
                        break;
                    }
                    compound.insert(name, tag);
                }
                Ok(Tag::Compound(compound))
            }
            tag_id::INT_ARRAY => {
                let length = reader.length()?;
                let mut ints = Vec::with_capacity(length.min(1 << 14));
                for _ in 0..length {
                    ints.push(reader.i32()?);
                }
                Ok(Tag::IntArray(ints))
            }
            tag_id::LONG_ARRAY => {
                let length = reader.length()?;
                let mut longs = Vec::with_capacity(length.min(1 << 13));
                for _ in 0..length {
                    longs.push(reader.i64()?);
                }
                Ok(Tag::LongArray(longs))
            }
            _ => Err(ScarifError::decode(format!("Invalid tag type: {}", type_id))),
        }
    }

    /// Writes this tag, named, to a big-endian stream.
    pub fn write<W: Write>(&self, writer: &mut W, name: &str) -> Result<()> {
        self.write_with(writer, name, Endianness::Big)
    }

    pub fn write_with<W: Write>(&self, writer: &mut W, name: &str, endianness: Endianness) -> Result<()> {
        self.write_named(&mut TagWriter::new(writer, endianness), name)
    }

    fn write_named<W: Write>(&self, writer: &mut TagWriter<W>, name: &str) -> Result<()> {
        writer.u8(self.get_type_id())?;

        if !matches!(self, Tag::End) {
            writer.string(name)?;
        }

        self.write_payload(writer)
    }

    fn write_payload<W: Write>(&self, writer: &mut TagWriter<W>) -> Result<()> {
        match self {
            Tag::End => Ok(()),
            Tag::Byte(v) => writer.i8(*v),
            Tag::Short(v) => writer.i16(*v),
            Tag::Int(v) => writer.i32(*v),
            Tag::Long(v) => writer.i64(*v),
            Tag::Float(v) => writer.f32(*v),
            Tag::Double(v) => writer.f64(*v),
            Tag::ByteArray(v) => {
                writer.length(v.len())?;
                for &b in v {
                    writer.i8(b)?;
                }
                Ok(())
            }
            Tag::String(v) => writer.string(v),
            Tag::List(element_type, v) => {
                if let Some(stray) = v.iter().find(|tag| tag.get_type_id() != *element_type) {
                    return Err(ScarifError::encode(format!(
                        "list of type {} holds a tag of type {}",
                        element_type,
                        stray.get_type_id()
                    )));
                }
                writer.u8(*element_type)?;
                writer.length(v.len())?;
                for tag in v {
                    tag.write_payload(writer)?;
                }
                Ok(())
            }
            Tag::Compound(v) => {
                for (name, tag) in v {
                    if matches!(tag, Tag::End) {
                        return Err(ScarifError::encode(format!(
                            "compound entry '{}' is an End tag",
                            name
                        )));
                    }
                    tag.write_named(writer, name)?;
                }
                writer.u8(tag_id::END)
            }
            Tag::IntArray(v) => {
                writer.length(v.len())?;
                for &i in v {
                    writer.i32(i)?;
                }
                Ok(())
            }
            Tag::LongArray(v) => {
                writer.length(v.len())?;
                for &l in v {
                    writer.i64(l)?;
                }
                Ok(())
            }
        }
    }

    /// Serializes as an unnamed big-endian root.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        self.write(&mut buffer, "")?;
        Ok(buffer)
    }

    pub fn as_compound(&self) -> Option<&Compound> {
        match self {
            Tag::Compound(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Tag]> {
        match self {
            Tag::List(_, list) => Some(list),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Tag::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Tag::Long(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Tag::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_i16(&self) -> Option<i16> {
        match self {
            Tag::Short(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_i8(&self) -> Option<i8> {
        match self {
            Tag::Byte(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Tag::Double(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Tag::Float(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_long_array(&self) -> Option<&[i64]> {
        match self {
            Tag::LongArray(longs) => Some(longs),
            _ => None,
        }
    }

    /// Integer value of any integral scalar, widened.
    pub fn as_int_like(&self) -> Option<i64> {
        match self {
            Tag::Byte(n) => Some(*n as i64),
            Tag::Short(n) => Some(*n as i64),
            Tag::Int(n) => Some(*n as i64),
            Tag::Long(n) => Some(*n),
            _ => None,
        }
    }

    /// Child of a compound.
    pub fn get(&self, key: &str) -> Option<&Tag> {
        self.as_compound()?.get(key)
    }

    /// Shallow copy of a compound with the given keys removed. The source is untouched.
    pub fn compound_without(&self, keys: &[&str]) -> Option<Compound> {
        let mut copy = self.as_compound()?.clone();
        for key in keys {
            copy.remove(*key);
        }
        Some(copy)
    }
}
