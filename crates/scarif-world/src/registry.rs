use scarif_common::{Result, ScarifError};
use scarif_nbt::{Endianness, NbtCompression, NbtFile, Tag};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

pub const BLOCK_REGISTRY: &str = "minecraft:block";
pub const BLOCK_ENTITY_TYPE_REGISTRY: &str = "minecraft:block_entity_type";
pub const ITEM_REGISTRY: &str = "minecraft:item";

/// Name to numeric id, both ways.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BiMap {
    by_name: HashMap<String, i32>,
    by_id: HashMap<i32, String>,
}

impl BiMap {
    pub fn insert(&mut self, name: String, id: i32) -> Result<()> {
        if self.by_name.contains_key(&name) || self.by_id.contains_key(&id) {
            return Err(ScarifError::data(format!(
                "registry entry {} = {} is not unique",
                name, id
            )));
        }
        self.by_id.insert(id, name.clone());
        self.by_name.insert(name, id);
        Ok(())
    }

    pub fn id(&self, name: &str) -> Option<i32> {
        self.by_name.get(name).copied()
    }

    pub fn name(&self, id: i32) -> Option<&str> {
        self.by_id.get(&id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// Numeric id tables dumped by the server next to the world (`data/fabricRegistry.dat`).
#[derive(Debug, Clone, Default)]
pub struct Registry {
    pub version: i32,
    registries: BTreeMap<String, BiMap>,
}

impl Registry {
    /// Loads a registry file; gzip and zlib framing are told apart by their header.
    pub fn load(path: impl AsRef<Path>) -> Result<Registry> {
        let bytes = fs::read(path)?;
        let compression = match bytes.first() {
            Some(0x1f) => NbtCompression::Gzip,
            Some(0x78) => NbtCompression::Zlib,
            _ => NbtCompression::None,
        };
        let raw = compression.decompress(bytes.as_slice())?;
        let file = NbtFile::from_bytes(&raw, Endianness::Big)?;
        Registry::from_tag(&file.root)
    }

    pub fn from_tag(root: &Tag) -> Result<Registry> {
        let version = root
            .get("version")
            .and_then(Tag::as_i32)
            .ok_or_else(|| ScarifError::decode("registry without a version"))?;
        let tables = root
            .get("registries")
            .and_then(Tag::as_compound)
            .ok_or_else(|| ScarifError::decode("registry without a registries compound"))?;

        let mut registries = BTreeMap::new();
        for (name, table) in tables {
            let table = table
                .as_compound()
                .ok_or_else(|| ScarifError::decode(format!("registry {} is not a compound", name)))?;
            let mut map = BiMap::default();
            for (key, id) in table {
                let id = id.as_i32().ok_or_else(|| {
                    ScarifError::decode(format!("registry {} entry {} is not an int", name, key))
                })?;
                map.insert(key.clone(), id)?;
            }
            registries.insert(name.clone(), map);
        }

        Ok(Registry { version, registries })
    }

    pub fn get(&self, registry: &str) -> Option<&BiMap> {
        self.registries.get(registry)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.registries.keys().map(String::as_str)
    }

    pub fn block_map(&self) -> Option<&BiMap> {
        self.get(BLOCK_REGISTRY)
    }

    pub fn block_entity_type_map(&self) -> Option<&BiMap> {
        self.get(BLOCK_ENTITY_TYPE_REGISTRY)
    }

    pub fn item_map(&self) -> Option<&BiMap> {
        self.get(ITEM_REGISTRY)
    }
}
