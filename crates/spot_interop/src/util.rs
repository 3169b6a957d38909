// crates/spot_interop/src/util.rs

/// Round to the nearest integer with ties going away from zero:
/// 23.5 → 24 and -23.5 → -24.
pub fn round_away_from_zero(value: f64) -> f64 {
    value.round()
}
