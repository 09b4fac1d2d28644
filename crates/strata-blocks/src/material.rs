use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::codec::MAX_MATERIAL;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaterialId(pub u16);

impl MaterialId {
    /// Empty space. Chunk voxels use 0 for "nothing here".
    pub const AIR: MaterialId = MaterialId(0);
    /// Stand-in for names the catalog does not know.
    pub const MISSING: MaterialId = MaterialId(1);

    #[inline]
    pub fn is_air(self) -> bool {
        self == Self::AIR
    }
}

#[derive(Clone, Debug)]
pub struct Material {
    pub id: MaterialId,
    pub key: String,
    pub liquid: bool,
}

#[derive(Debug, Error)]
pub enum MaterialError {
    #[error("material catalog is full ({0} entries max)")]
    Full(usize),
    #[error("material name `{0}` is reserved")]
    Reserved(String),
}

#[derive(Clone, Debug)]
pub struct MaterialCatalog {
    pub materials: Vec<Material>,
    pub by_key: HashMap<String, MaterialId>,
}

impl Default for MaterialCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl MaterialCatalog {
    /// Catalog holding only the two reserved entries.
    pub fn new() -> Self {
        let mut catalog = Self {
            materials: Vec::new(),
            by_key: HashMap::new(),
        };
        catalog.push_unchecked("air", false);
        catalog.push_unchecked("missing", false);
        catalog
    }

    fn push_unchecked(&mut self, key: &str, liquid: bool) -> MaterialId {
        let id = MaterialId(self.materials.len() as u16);
        self.by_key.insert(key.to_string(), id);
        self.materials.push(Material {
            id,
            key: key.to_string(),
            liquid,
        });
        id
    }

    /// Registers `key`, returning the existing id when already present.
    pub fn register(&mut self, key: &str, liquid: bool) -> Result<MaterialId, MaterialError> {
        if key == "air" || key == "missing" {
            return Err(MaterialError::Reserved(key.to_string()));
        }
        if let Some(id) = self.by_key.get(key) {
            return Ok(*id);
        }
        let capacity = usize::from(MAX_MATERIAL) + 1;
        if self.materials.len() >= capacity {
            return Err(MaterialError::Full(capacity));
        }
        Ok(self.push_unchecked(key, liquid))
    }

    pub fn from_entries(entries: &[MaterialEntry]) -> Result<Self, MaterialError> {
        let mut catalog = Self::new();
        for entry in entries {
            let (name, liquid) = match entry {
                MaterialEntry::Name(n) => (n.as_str(), false),
                MaterialEntry::Detail { name, liquid } => (name.as_str(), *liquid),
            };
            catalog.register(name, liquid)?;
        }
        Ok(catalog)
    }

    pub fn get_id(&self, key: &str) -> Option<MaterialId> {
        self.by_key.get(key).copied()
    }

    /// Id for `key`, or [`MaterialId::MISSING`] when unknown.
    #[inline]
    pub fn resolve(&self, key: &str) -> MaterialId {
        self.get_id(key).unwrap_or(MaterialId::MISSING)
    }

    pub fn get(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id.0 as usize)
    }

    pub fn name(&self, id: MaterialId) -> &str {
        self.get(id).map_or("missing", |m| m.key.as_str())
    }

    pub fn is_liquid(&self, id: MaterialId) -> bool {
        self.get(id).is_some_and(|m| m.liquid)
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
}

// --- Config ---

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum MaterialEntry {
    // Simple: "stone"
    Name(String),
    // Detailed: { name = "water", liquid = true }
    Detail {
        name: String,
        #[serde(default)]
        liquid: bool,
    },
}
