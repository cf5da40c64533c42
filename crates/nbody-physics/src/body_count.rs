//! Validated body count
//!
//! Every count handed to a context build is a positive multiple of
//! [`GROUPSIZE`] within `[MIN_BODIES, MAX_BODIES]`. Doubling and halving keep
//! that property because both bounds are powers of two times `GROUPSIZE`.

use crate::constants::{GROUPSIZE, MAX_BODIES, MIN_BODIES};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BodyCountError {
    #[error("body count {0} is not a multiple of the workgroup size {group}", group = GROUPSIZE)]
    NotGroupMultiple(u32),
    #[error("body count {0} is outside [{min}, {max}]", min = MIN_BODIES, max = MAX_BODIES)]
    OutOfRange(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BodyCount(u32);

impl BodyCount {
    pub const MIN: BodyCount = BodyCount(MIN_BODIES);
    pub const MAX: BodyCount = BodyCount(MAX_BODIES);

    pub fn new(count: u32) -> Result<Self, BodyCountError> {
        if !(MIN_BODIES..=MAX_BODIES).contains(&count) {
            return Err(BodyCountError::OutOfRange(count));
        }
        if count % GROUPSIZE != 0 {
            return Err(BodyCountError::NotGroupMultiple(count));
        }
        Ok(Self(count))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    pub fn as_usize(self) -> usize {
        self.0 as usize
    }

    /// Number of workgroups needed to cover every body exactly once
    pub fn workgroups(self) -> u32 {
        self.0 / GROUPSIZE
    }

    /// Twice the count, or `None` when already at [`MAX_BODIES`]
    pub fn grown(self) -> Option<Self> {
        if self.0 >= MAX_BODIES {
            return None;
        }
        Self::new(self.0 * 2).ok()
    }

    /// Half the count, or `None` when already at [`MIN_BODIES`]
    pub fn shrunk(self) -> Option<Self> {
        if self.0 <= MIN_BODIES {
            return None;
        }
        Self::new(self.0 / 2).ok()
    }
}

impl Default for BodyCount {
    fn default() -> Self {
        Self(crate::constants::DEFAULT_BODIES)
    }
}

impl fmt::Display for BodyCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
