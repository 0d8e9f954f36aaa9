//! Lanes and lane masks
//!
//! The track has exactly three rails. Lanes are ordinal (Left < Middle < Right)
//! and lane arithmetic clamps at the edges instead of wrapping.

use serde::{Deserialize, Serialize};

/// One of the three fixed lateral rail positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum Lane {
    Left = 0,
    #[default]
    Middle = 1,
    Right = 2,
}

impl Lane {
    pub const ALL: [Lane; 3] = [Lane::Left, Lane::Middle, Lane::Right];

    /// Ordinal index (Left = 0)
    #[inline]
    pub fn index(self) -> i32 {
        self as i32
    }

    /// Lane for an arbitrary ordinal, clamped to [Left, Right]
    pub fn clamped(value: i32) -> Self {
        match value {
            i32::MIN..=0 => Lane::Left,
            1 => Lane::Middle,
            _ => Lane::Right,
        }
    }

    /// Neighbouring lane in `direction` (-1 or +1), clamped at the edges
    pub fn step(self, direction: i32) -> Self {
        Self::clamped(self.index() + direction)
    }

    /// Signed rail position relative to Middle (-1, 0, +1)
    #[inline]
    pub fn signed(self) -> i32 {
        self.index() - 1
    }

    /// Lane whose rail is nearest to a lateral offset measured from Middle
    pub fn nearest(lateral_offset: f32, lane_width: f32) -> Self {
        if lane_width <= 0.0 {
            return Lane::Middle;
        }
        Self::clamped((lateral_offset / lane_width).round() as i32 + 1)
    }

    /// Lateral offset of this lane's rail; Middle is the centre line
    #[inline]
    pub fn offset(self, lane_width: f32) -> f32 {
        self.signed() as f32 * lane_width
    }

    /// Single-lane mask
    #[inline]
    pub fn mask(self) -> LaneMask {
        LaneMask(1 << self.index())
    }
}

/// Bitmask over {Left, Middle, Right}
///
/// Serialized as its raw bits so pattern tables stay compact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LaneMask(u8);

impl LaneMask {
    pub const NONE: LaneMask = LaneMask(0);
    pub const LEFT: LaneMask = LaneMask(1 << 0);
    pub const MIDDLE: LaneMask = LaneMask(1 << 1);
    pub const RIGHT: LaneMask = LaneMask(1 << 2);
    pub const ALL: LaneMask = LaneMask(0b111);

    /// Build from raw bits; bits above the three lanes are dropped
    pub fn from_bits(bits: u8) -> Self {
        LaneMask(bits & Self::ALL.0)
    }

    pub fn bits(self) -> u8 {
        self.0 & Self::ALL.0
    }

    pub fn contains(self, lane: Lane) -> bool {
        self.0 & lane.mask().0 != 0
    }

    pub fn is_empty(self) -> bool {
        self.bits() == 0
    }

    /// Set lanes in Left → Right order
    pub fn lanes(self) -> impl Iterator<Item = Lane> {
        Lane::ALL.into_iter().filter(move |&lane| self.contains(lane))
    }
}

impl std::ops::BitOr for LaneMask {
    type Output = LaneMask;

    fn bitor(self, rhs: Self) -> Self::Output {
        LaneMask(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for LaneMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl From<Lane> for LaneMask {
    fn from(lane: Lane) -> Self {
        lane.mask()
    }
}

/// Lane mask used by obstacle pattern rows
pub type ObstacleLaneMask = LaneMask;
/// Lane mask used by pickup pattern rows
pub type PickupLaneMask = LaneMask;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lane_clamps_at_edges() {
        assert_eq!(Lane::Left.step(-1), Lane::Left);
        assert_eq!(Lane::Right.step(1), Lane::Right);
        assert_eq!(Lane::Middle.step(-1), Lane::Left);
        assert_eq!(Lane::Middle.step(1), Lane::Right);
        assert_eq!(Lane::clamped(-40), Lane::Left);
        assert_eq!(Lane::clamped(17), Lane::Right);
    }

    #[test]
    fn test_lane_ordering() {
        assert!(Lane::Left < Lane::Middle);
        assert!(Lane::Middle < Lane::Right);
    }

    #[test]
    fn test_nearest_lane() {
        assert_eq!(Lane::nearest(-2.2, 2.2), Lane::Left);
        assert_eq!(Lane::nearest(0.3, 2.2), Lane::Middle);
        assert_eq!(Lane::nearest(1.2, 2.2), Lane::Right);
        assert_eq!(Lane::nearest(100.0, 2.2), Lane::Right);
        assert_eq!(Lane::nearest(-100.0, 2.2), Lane::Left);
    }

    #[test]
    fn test_offsets_centred_on_middle() {
        assert_eq!(Lane::Left.offset(2.2), -2.2);
        assert_eq!(Lane::Middle.offset(2.2), 0.0);
        assert_eq!(Lane::Right.offset(2.2), 2.2);
        for lane in Lane::ALL {
            assert_eq!(Lane::nearest(lane.offset(3.0), 3.0), lane);
        }
    }

    #[test]
    fn test_mask_composition() {
        let mask = LaneMask::LEFT | LaneMask::RIGHT;
        assert!(mask.contains(Lane::Left));
        assert!(!mask.contains(Lane::Middle));
        assert!(mask.contains(Lane::Right));
        assert_eq!(mask.lanes().collect::<Vec<_>>(), vec![Lane::Left, Lane::Right]);
        assert_eq!(LaneMask::from_bits(0xFF), LaneMask::ALL);
        assert!(LaneMask::NONE.is_empty());
    }

    #[test]
    fn test_mask_serializes_as_bits() {
        let json = serde_json::to_string(&LaneMask::ALL).unwrap();
        assert_eq!(json, "7");
        let mask: LaneMask = serde_json::from_str("2").unwrap();
        assert_eq!(mask, LaneMask::MIDDLE);
    }
}
