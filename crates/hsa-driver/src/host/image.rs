//! Native image format understood by the host driver
//!
//! ```text
//! ┌────────┬───────────┬─────────────────────────────────────────────┐
//! │ "HSAI" │ count u32 │ count × { len u32 │ name[len] │ offset u64 } │
//! └────────┴───────────┴─────────────────────────────────────────────┘
//! ```
//!
//! All integers are little-endian. Names are UTF-8 and include the
//! linkage marker (e.g. `&vector_add`).

use std::any::Any;
use std::collections::BTreeMap;

use crate::error::{DriverError, Result};
use crate::traits::BinaryModule;

/// Magic bytes opening every host image
pub const IMAGE_MAGIC: &[u8; 4] = b"HSAI";

/// Builds host images for tests and demos
#[derive(Debug, Clone, Default)]
pub struct ImageBuilder {
    symbols: Vec<(String, u64)>,
}

impl ImageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a symbol at the given code offset
    pub fn symbol(mut self, name: impl Into<String>, offset: u64) -> Self {
        self.symbols.push((name.into(), offset));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut image = Vec::new();
        image.extend_from_slice(IMAGE_MAGIC);
        image.extend_from_slice(&(self.symbols.len() as u32).to_le_bytes());
        for (name, offset) in &self.symbols {
            image.extend_from_slice(&(name.len() as u32).to_le_bytes());
            image.extend_from_slice(name.as_bytes());
            image.extend_from_slice(&offset.to_le_bytes());
        }
        image
    }
}

/// A parsed host image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostModule {
    symbols: BTreeMap<String, u64>,
}

impl HostModule {
    /// Parse an image produced by [`ImageBuilder`].
    pub fn from_memory(image: &[u8]) -> Result<Self> {
        let mut cursor = Cursor { image, offset: 0 };

        if cursor.take(4)? != IMAGE_MAGIC {
            return Err(DriverError::InvalidImage("bad magic".to_string()));
        }

        let count = cursor.u32()?;
        let mut symbols = BTreeMap::new();
        for _ in 0..count {
            let len = cursor.u32()? as usize;
            let name = std::str::from_utf8(cursor.take(len)?)
                .map_err(|err| DriverError::InvalidImage(format!("symbol name: {err}")))?
                .to_string();
            let offset = cursor.u64()?;
            if symbols.insert(name.clone(), offset).is_some() {
                return Err(DriverError::InvalidImage(format!("duplicate symbol {name}")));
            }
        }

        if cursor.offset != image.len() {
            return Err(DriverError::InvalidImage(format!(
                "{} trailing bytes",
                image.len() - cursor.offset
            )));
        }

        Ok(Self { symbols })
    }

    pub fn symbols(&self) -> impl Iterator<Item = (&str, u64)> {
        self.symbols.iter().map(|(name, &offset)| (name.as_str(), offset))
    }

    /// Whether some symbol starts at `offset`
    pub fn has_code_at(&self, offset: u64) -> bool {
        self.symbols.values().any(|&o| o == offset)
    }
}

impl BinaryModule for HostModule {
    fn find_symbol_offset(&self, symbol: &str) -> Option<u64> {
        self.symbols.get(symbol).copied()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct Cursor<'a> {
    image: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .offset
            .checked_add(len)
            .filter(|&end| end <= self.image.len())
            .ok_or_else(|| DriverError::InvalidImage(format!("truncated at byte {}", self.offset)))?;
        let bytes = &self.image[self.offset..end];
        self.offset = end;
        Ok(bytes)
    }

    fn u32(&mut self) -> Result<u32> {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(raw))
    }

    fn u64(&mut self) -> Result<u64> {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(raw))
    }
}
