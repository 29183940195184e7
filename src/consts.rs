//! Mathematical constants

/// 0.5 ln(2π)
pub const HALF_LN_2PI: f64 = 0.918_938_533_204_672_7;
/// ln(2π)
pub const LN_2PI: f64 = 1.837_877_066_409_345_3;
/// Smallest squared distance kept before taking a square root
pub const DISTANCE_FLOOR: f64 = 1E-30;
