//! Point defect value types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Integer lattice coordinates of a site in the structure.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Coords {
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

impl Coords {
    pub const fn new(x: i64, y: i64, z: i64) -> Self {
        Self { x, y, z }
    }

    /// Coordinates shifted by the given offset. Wraps at the `i64` bounds;
    /// use [`checked_offset`](Self::checked_offset) to detect leaving the
    /// representable lattice.
    pub const fn offset(self, dx: i64, dy: i64, dz: i64) -> Self {
        Self::new(
            self.x.wrapping_add(dx),
            self.y.wrapping_add(dy),
            self.z.wrapping_add(dz),
        )
    }

    /// Coordinates shifted by the given offset, or `None` on overflow.
    pub fn checked_offset(self, dx: i64, dy: i64, dz: i64) -> Option<Self> {
        Some(Self::new(
            self.x.checked_add(dx)?,
            self.y.checked_add(dy)?,
            self.z.checked_add(dz)?,
        ))
    }
}

impl From<(i64, i64, i64)> for Coords {
    fn from((x, y, z): (i64, i64, i64)) -> Self {
        Self::new(x, y, z)
    }
}

impl fmt::Display for Coords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// A typed point perturbation at a lattice site.
///
/// Equality and hashing cover both the type code and the coordinates. The
/// fields are private so a defect stored in a
/// [`DefectSet`](crate::compute::DefectSet) cannot be altered in place; to
/// move or retype a stored defect, remove it and insert a new value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Defect {
    #[serde(rename = "type")]
    kind: i32,
    coords: Coords,
}

impl Defect {
    pub fn new(kind: i32, coords: impl Into<Coords>) -> Self {
        Self {
            kind,
            coords: coords.into(),
        }
    }

    /// Type code of the defect.
    pub fn kind(&self) -> i32 {
        self.kind
    }

    pub fn coords(&self) -> Coords {
        self.coords
    }

    /// Same type code at a different site.
    pub fn moved_to(&self, coords: impl Into<Coords>) -> Self {
        Self::new(self.kind, coords)
    }
}

impl fmt::Display for Defect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{}]", self.kind, self.coords)
    }
}
