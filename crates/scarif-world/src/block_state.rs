use scarif_common::{Result, ScarifError};
use scarif_nbt::{Compound, Tag};
use std::collections::BTreeMap;
use std::fmt;

/// A block type name plus its property values. Equality and hashing are structural.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockState {
    pub name: String,
    pub properties: BTreeMap<String, String>,
}

impl BlockState {
    pub fn new(name: impl Into<String>) -> Self {
        BlockState {
            name: name.into(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn is_air(&self) -> bool {
        matches!(
            self.name.as_str(),
            "minecraft:air" | "minecraft:cave_air" | "minecraft:void_air"
        )
    }

    /// Reads a palette entry: `Name` plus an optional `Properties` compound.
    pub fn from_tag(tag: &Tag) -> Result<Self> {
        let name = tag
            .get("Name")
            .and_then(Tag::as_str)
            .ok_or_else(|| ScarifError::decode("palette entry without a Name"))?;

        let mut properties = BTreeMap::new();
        if let Some(props) = tag.get("Properties") {
            let props = props
                .as_compound()
                .ok_or_else(|| ScarifError::decode("Properties is not a compound"))?;
            for (key, value) in props {
                properties.insert(key.clone(), property_value(key, value)?);
            }
        }

        Ok(BlockState {
            name: name.to_string(),
            properties,
        })
    }

    pub fn to_tag(&self) -> Tag {
        let mut compound = Compound::new();
        compound.insert("Name".to_string(), Tag::String(self.name.clone()));
        if !self.properties.is_empty() {
            let properties = self
                .properties
                .iter()
                .map(|(k, v)| (k.clone(), Tag::String(v.clone())))
                .collect();
            compound.insert("Properties".to_string(), Tag::Compound(properties));
        }
        Tag::Compound(compound)
    }
}

// Properties are strings on disk; integral scalars are accepted and rendered in decimal.
fn property_value(key: &str, value: &Tag) -> Result<String> {
    if let Some(s) = value.as_str() {
        return Ok(s.to_string());
    }
    value
        .as_int_like()
        .map(|n| n.to_string())
        .ok_or_else(|| {
            ScarifError::data(format!(
                "property '{}' has unsupported tag type {}",
                key,
                value.get_type_id()
            ))
        })
}

impl fmt::Display for BlockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.properties.is_empty() {
            let props: Vec<String> = self
                .properties
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            write!(f, "[{}]", props.join(","))?;
        }
        Ok(())
    }
}
