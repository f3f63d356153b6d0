//! Tunable geometric thresholds shared by the partition selector, the
//! divider and the gap connector.
//!
//! These numbers are not derived from anything else; changing them changes
//! the shape of every tree this crate produces.

/// Distance below which two points are considered to lie on the same line.
pub const DIST_EPSILON: f64 = 1.0 / 128.0;

/// Half-edges shorter than this, or split fragments shorter than this, are
/// penalized heavily by the partition cost function.
pub const IFFY_LEN: f64 = 4.0;

/// Angular tolerance (in degrees) used when checking whether a half-edge is
/// aligned with a partition direction during gap connection.
pub const ANG_EPSILON: f64 = 1.0 / 1024.0;

/// A SuperBlock stops subdividing once both of its sides are this small or
/// smaller, in map units.
pub const SUPERBLOCK_LEAF_SIZE: f64 = 256.0;

/// Successive intersections closer than this (map units) are merged.
pub const INTERSECTION_MERGE_GAP: f64 = 0.2;

/// Default BSP selector factor, per the builder's one public tunable.
pub const DEFAULT_BSP_FACTOR: i32 = 7;

/// Valid range for the BSP selector factor.
pub const BSP_FACTOR_RANGE: std::ops::RangeInclusive<i32> = 1..=32;
