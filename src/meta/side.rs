//! Double-buffered side pairs
//!
//! Two physical storage areas alternate between active and inactive. The
//! pair is a fixed two-element array indexed by [`Side`]; only `switch`
//! changes which element is active.

use std::fmt;

use serde::Serialize;

use super::errors::{MetaError, MetaResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    A,
    B,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }

    fn index(self) -> usize {
        match self {
            Side::A => 0,
            Side::B => 1,
        }
    }

    /// Lowercase label used in slot names.
    pub fn label(self) -> &'static str {
        match self {
            Side::A => "a",
            Side::B => "b",
        }
    }

    pub(crate) fn tag(self) -> u8 {
        self.index() as u8
    }

    pub(crate) fn from_tag(tag: u8) -> MetaResult<Side> {
        match tag {
            0 => Ok(Side::A),
            1 => Ok(Side::B),
            other => Err(MetaError::InvalidSide(other)),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Two descriptors, one of which is active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SidePair<T> {
    slots: [T; 2],
    active: Side,
}

impl<T> SidePair<T> {
    pub fn new(a: T, b: T, active: Side) -> Self {
        Self {
            slots: [a, b],
            active,
        }
    }

    pub fn active_side(&self) -> Side {
        self.active
    }

    pub fn active(&self) -> &T {
        &self.slots[self.active.index()]
    }

    pub fn inactive(&self) -> &T {
        &self.slots[self.active.other().index()]
    }

    /// The inactive descriptor is the only one that may be edited; the
    /// active one describes data that is already durable.
    pub fn inactive_mut(&mut self) -> &mut T {
        &mut self.slots[self.active.other().index()]
    }

    pub fn get(&self, side: Side) -> &T {
        &self.slots[side.index()]
    }

    /// Makes the inactive side active.
    pub fn switch(&mut self) {
        self.active = self.active.other();
    }
}

impl<T: Default> Default for SidePair<T> {
    fn default() -> Self {
        Self::new(T::default(), T::default(), Side::A)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_switch_swaps_active_and_inactive() {
        let mut pair = SidePair::new("left", "right", Side::A);
        assert_eq!(*pair.active(), "left");
        assert_eq!(*pair.inactive(), "right");

        pair.switch();
        assert_eq!(pair.active_side(), Side::B);
        assert_eq!(*pair.active(), "right");
        assert_eq!(*pair.inactive(), "left");
    }

    #[test]
    fn test_inactive_mut_leaves_active_untouched() {
        let mut pair: SidePair<u32> = SidePair::default();
        *pair.inactive_mut() = 7;
        assert_eq!(*pair.active(), 0);
        assert_eq!(*pair.get(Side::B), 7);
    }

    #[test]
    fn test_side_tags() {
        assert_eq!(Side::from_tag(Side::B.tag()).unwrap(), Side::B);
        assert_eq!(Side::from_tag(2), Err(MetaError::InvalidSide(2)));
    }
}
