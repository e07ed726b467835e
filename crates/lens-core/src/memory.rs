//! Cross-session memory record: a scalar bias and volatility that survive
//! between runs and seed the H-series of the next analysis.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::{clamp, clamp01};
use crate::time::now_unix_millis;

pub const DEFAULT_BIAS: f64 = 0.0;
pub const DEFAULT_VOL: f64 = 0.10;

/// Persisted scalar state. `bias ∈ [-1, 1]`, `vol ∈ [0, 1]`, `last` in Unix ms.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub bias: f64,
    pub vol: f64,
    pub last: u64,
}

impl MemoryRecord {
    /// Default record stamped at `now` (Unix ms).
    pub fn fresh(now: u64) -> Self {
        Self {
            bias: DEFAULT_BIAS,
            vol: DEFAULT_VOL,
            last: now,
        }
    }

    /// Build a record, clamping values into range. Non-finite values fall
    /// back to their defaults.
    pub fn new(bias: f64, vol: f64, last: u64) -> Self {
        let bias = if bias.is_finite() { bias } else { DEFAULT_BIAS };
        let vol = if vol.is_finite() { vol } else { DEFAULT_VOL };
        Self {
            bias: clamp(-1.0, 1.0, bias),
            vol: clamp01(vol),
            last,
        }
    }

    /// Parse a stored JSON record. Absent, corrupt or partial input falls
    /// back to defaults field by field; this never fails.
    pub fn from_json_lenient(raw: Option<&str>, now: u64) -> Self {
        let Some(Value::Object(map)) = raw.and_then(|r| serde_json::from_str::<Value>(r).ok())
        else {
            return Self::fresh(now);
        };

        let bias = map.get("bias").and_then(Value::as_f64).unwrap_or(DEFAULT_BIAS);
        let vol = map.get("vol").and_then(Value::as_f64).unwrap_or(DEFAULT_VOL);
        let last = map
            .get("last")
            .and_then(|v| {
                v.as_u64().or_else(|| {
                    v.as_f64()
                        .filter(|f| f.is_finite() && *f >= 0.0)
                        .map(|f| f as u64)
                })
            })
            .unwrap_or(now);

        Self::new(bias, vol, last)
    }

    pub fn to_json(&self) -> String {
        serde_json::json!({
            "bias": self.bias,
            "vol": self.vol,
            "last": self.last,
        })
        .to_string()
    }

    /// Seed of the H recurrence: `clamp01(0.5 + bias * 0.15)`.
    pub fn h_seed(&self) -> f64 {
        clamp01(0.5 + self.bias * 0.15)
    }

    /// Fold one analysis into the record.
    ///
    /// `bias' = clamp(-1, 1, 0.85 bias + 0.5 (mean - 0.5))`,
    /// `vol' = clamp01(0.8 vol + 0.6 volatility)`, `last' = now`.
    pub fn absorb(self, mean: f64, volatility: f64, now: u64) -> Self {
        Self::new(
            self.bias * 0.85 + (mean - 0.5) * 0.5,
            self.vol * 0.8 + volatility * 0.6,
            now,
        )
    }
}

impl Default for MemoryRecord {
    fn default() -> Self {
        Self::fresh(now_unix_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_absent_record_uses_defaults() {
        let m = MemoryRecord::from_json_lenient(None, 42);
        assert_eq!(m.bias, 0.0);
        assert_eq!(m.vol, 0.10);
        assert_eq!(m.last, 42);
    }

    #[test]
    fn test_corrupt_record_uses_defaults() {
        assert_eq!(
            MemoryRecord::from_json_lenient(Some("{not json"), 7),
            MemoryRecord::fresh(7)
        );
        assert_eq!(
            MemoryRecord::from_json_lenient(Some("[1,2,3]"), 7),
            MemoryRecord::fresh(7)
        );
        assert_eq!(
            MemoryRecord::from_json_lenient(Some(""), 7),
            MemoryRecord::fresh(7)
        );
    }

    #[test]
    fn test_partial_record_fills_fields() {
        let m = MemoryRecord::from_json_lenient(Some(r#"{"bias":0.4}"#), 9);
        assert_abs_diff_eq!(m.bias, 0.4);
        assert_eq!(m.vol, DEFAULT_VOL);
        assert_eq!(m.last, 9);
    }

    #[test]
    fn test_wrong_typed_fields_fall_back() {
        let m = MemoryRecord::from_json_lenient(
            Some(r#"{"bias":"high","vol":null,"last":1700000000000.0}"#),
            9,
        );
        assert_eq!(m.bias, DEFAULT_BIAS);
        assert_eq!(m.vol, DEFAULT_VOL);
        assert_eq!(m.last, 1_700_000_000_000);
    }

    #[test]
    fn test_out_of_range_values_clamped() {
        let m = MemoryRecord::from_json_lenient(Some(r#"{"bias":5,"vol":-2,"last":1}"#), 0);
        assert_eq!(m.bias, 1.0);
        assert_eq!(m.vol, 0.0);
        assert_eq!(m.last, 1);
    }

    #[test]
    fn test_non_finite_values_fall_back() {
        let m = MemoryRecord::new(f64::NAN, f64::INFINITY, 3);
        assert_eq!(m, MemoryRecord::fresh(3));
    }

    #[test]
    fn test_json_roundtrip() {
        let m = MemoryRecord::new(-0.25, 0.3, 1234);
        let back = MemoryRecord::from_json_lenient(Some(&m.to_json()), 0);
        assert_eq!(back, m);
    }

    #[test]
    fn test_h_seed() {
        assert_abs_diff_eq!(MemoryRecord::new(0.0, 0.1, 0).h_seed(), 0.5);
        assert_abs_diff_eq!(MemoryRecord::new(1.0, 0.1, 0).h_seed(), 0.65);
        assert_abs_diff_eq!(MemoryRecord::new(-1.0, 0.1, 0).h_seed(), 0.35);
    }

    #[test]
    fn test_absorb_update_rule() {
        let m = MemoryRecord::new(0.2, 0.1, 0).absorb(0.7, 0.05, 99);
        assert_abs_diff_eq!(m.bias, 0.2 * 0.85 + 0.2 * 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(m.vol, 0.08 + 0.03, epsilon = 1e-12);
        assert_eq!(m.last, 99);
    }

    #[test]
    fn test_absorb_stays_bounded() {
        let mut m = MemoryRecord::new(1.0, 1.0, 0);
        for i in 0..50 {
            m = m.absorb(1.0, 1.0, i);
            assert!((-1.0..=1.0).contains(&m.bias));
            assert!((0.0..=1.0).contains(&m.vol));
        }
    }
}
