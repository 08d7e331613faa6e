//! Launch geometry: normalizing global/local and grid/block sizes
//!
//! Sizes may be given with different ranks. Reconciliation only ever
//! appends `1`s on the right, so every supplied extent survives:
//!
//! ```text
//! global (4, 2)   local (2,)    ──▶  global (4, 2)   local (2, 1)
//! grid   (2, 3)   block (4, 5)  ──▶  global (8, 15)  local (4, 5)
//! ```

use std::fmt;

use crate::error::{LaunchError, Result};

/// Ordered extents along each launch dimension
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dims(Vec<u32>);

impl Dims {
    pub fn new(extents: impl Into<Vec<u32>>) -> Self {
        Self(extents.into())
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    pub fn rank(&self) -> usize {
        self.0.len()
    }

    /// Product of all extents
    pub fn work_items(&self) -> u64 {
        self.0.iter().fold(1u64, |acc, &extent| acc.saturating_mul(u64::from(extent)))
    }

    /// Right-pad with `1` up to `rank`. Never truncates.
    pub fn padded_to(&self, rank: usize) -> Self {
        let mut extents = self.0.clone();
        if extents.len() < rank {
            extents.resize(rank, 1);
        }
        Self(extents)
    }

    fn validate(&self, what: &str) -> Result<()> {
        if self.0.is_empty() {
            return Err(LaunchError::geometry(format!("{what} is empty")));
        }
        if let Some(axis) = self.0.iter().position(|&extent| extent == 0) {
            return Err(LaunchError::geometry(format!("{what} {self} has zero extent on axis {axis}")));
        }
        Ok(())
    }
}

impl AsRef<[u32]> for Dims {
    fn as_ref(&self) -> &[u32] {
        &self.0
    }
}

impl fmt::Display for Dims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, extent) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{extent}")?;
        }
        if self.0.len() == 1 {
            f.write_str(",")?;
        }
        f.write_str(")")
    }
}

impl From<u32> for Dims {
    fn from(extent: u32) -> Self {
        Self(vec![extent])
    }
}

impl From<Vec<u32>> for Dims {
    fn from(extents: Vec<u32>) -> Self {
        Self(extents)
    }
}

impl From<&[u32]> for Dims {
    fn from(extents: &[u32]) -> Self {
        Self(extents.to_vec())
    }
}

impl<const N: usize> From<[u32; N]> for Dims {
    fn from(extents: [u32; N]) -> Self {
        Self(extents.to_vec())
    }
}

impl From<(u32,)> for Dims {
    fn from((x,): (u32,)) -> Self {
        Self(vec![x])
    }
}

impl From<(u32, u32)> for Dims {
    fn from((x, y): (u32, u32)) -> Self {
        Self(vec![x, y])
    }
}

impl From<(u32, u32, u32)> for Dims {
    fn from((x, y, z): (u32, u32, u32)) -> Self {
        Self(vec![x, y, z])
    }
}

impl From<(u32, u32, u32, u32)> for Dims {
    fn from((x, y, z, w): (u32, u32, u32, u32)) -> Self {
        Self(vec![x, y, z, w])
    }
}

/// Canonical global size plus optional local (workgroup) size
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LaunchGeometry {
    global: Dims,
    local: Option<Dims>,
}

impl Default for LaunchGeometry {
    fn default() -> Self {
        Self {
            global: Dims::from(1),
            local: None,
        }
    }
}

impl LaunchGeometry {
    /// Normalize a global size and optional local size.
    ///
    /// Without a local size the global size is kept as given. With one, both
    /// are padded to the larger rank.
    ///
    /// # Errors
    ///
    /// [`LaunchError::InvalidGeometry`] for an empty size or a zero extent.
    pub fn resolve(global: Dims, local: Option<Dims>) -> Result<Self> {
        global.validate("global size")?;
        let Some(local) = local else {
            return Ok(Self { global, local: None });
        };
        local.validate("local size")?;

        let rank = global.rank().max(local.rank());
        Ok(Self {
            global: global.padded_to(rank),
            local: Some(local.padded_to(rank)),
        })
    }

    /// Geometry for `[grid, block]` launch notation.
    ///
    /// Pads both to equal rank, then `global[i] = grid[i] * block[i]` and
    /// `local = block`.
    pub fn from_grid(grid: Dims, block: Dims) -> Result<Self> {
        grid.validate("grid size")?;
        block.validate("block size")?;

        let rank = grid.rank().max(block.rank());
        let grid = grid.padded_to(rank);
        let block = block.padded_to(rank);

        let global = grid
            .as_slice()
            .iter()
            .zip(block.as_slice())
            .map(|(&g, &b)| {
                g.checked_mul(b)
                    .ok_or_else(|| LaunchError::geometry(format!("grid {grid} x block {block} overflows u32")))
            })
            .collect::<Result<Vec<_>>>()?;

        Self::resolve(Dims(global), Some(block))
    }

    pub fn global(&self) -> &Dims {
        &self.global
    }

    pub fn local(&self) -> Option<&Dims> {
        self.local.as_ref()
    }

    pub fn rank(&self) -> usize {
        self.global.rank()
    }

    /// Total number of execution instances
    pub fn work_items(&self) -> u64 {
        self.global.work_items()
    }
}

impl fmt::Display for LaunchGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.local {
            Some(local) => write!(f, "global={} local={}", self.global, local),
            None => write!(f, "global={}", self.global),
        }
    }
}
