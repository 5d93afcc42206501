//! Label decision policy.
//!
//! Which features get a text label is decided per feature and resolution,
//! with no knowledge of neighbouring labels, so the outcome is stable across
//! frames and pans. Tiers, checked in order:
//!
//! 1. label text on the allow-list: always labelled;
//! 2. `resolution < fine_threshold`: labelled;
//! 3. `resolution < medium_threshold`: labelled iff the decimation hash of the
//!    feature identifier is zero;
//! 4. otherwise unlabelled.
//!
//! `fine_threshold <= medium_threshold` is required, which makes the policy
//! monotonic: a label shown at some resolution is shown at every finer one.

use std::collections::BTreeSet;

use scene::{FeatureId, FeatureKey};

#[derive(Debug, Clone, PartialEq)]
pub struct LabelStyle {
    pub font_size_px: f32,
    pub color: [f32; 4],
    pub halo_color: [f32; 4],
    pub halo_width_px: f32,
    /// Screen-space offset from the anchor (y down).
    pub offset_px: [f32; 2],
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self {
            font_size_px: 12.0,
            color: [0.1, 0.1, 0.1, 1.0],
            halo_color: [1.0, 1.0, 1.0, 0.85],
            halo_width_px: 2.0,
            offset_px: [0.0, 0.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LabelPolicyError {
    ZeroStride,
    InvalidThreshold(f64),
    ThresholdsOutOfOrder { fine: f64, medium: f64 },
}

impl std::fmt::Display for LabelPolicyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LabelPolicyError::ZeroStride => write!(f, "decimation stride must be at least 1"),
            LabelPolicyError::InvalidThreshold(v) => {
                write!(f, "label threshold must be finite and non-negative, got {v}")
            }
            LabelPolicyError::ThresholdsOutOfOrder { fine, medium } => write!(
                f,
                "fine threshold {fine} must not exceed medium threshold {medium}"
            ),
        }
    }
}

impl std::error::Error for LabelPolicyError {}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelPolicy {
    allow_list: BTreeSet<String>,
    stride: u32,
    medium_threshold: f64,
    fine_threshold: f64,
    /// Attribute holding the label text.
    pub text_key: String,
    pub max_text_len: usize,
}

impl LabelPolicy {
    pub fn new(
        stride: u32,
        medium_threshold: f64,
        fine_threshold: f64,
    ) -> Result<Self, LabelPolicyError> {
        if stride == 0 {
            return Err(LabelPolicyError::ZeroStride);
        }
        for t in [medium_threshold, fine_threshold] {
            if !t.is_finite() || t < 0.0 {
                return Err(LabelPolicyError::InvalidThreshold(t));
            }
        }
        if fine_threshold > medium_threshold {
            return Err(LabelPolicyError::ThresholdsOutOfOrder {
                fine: fine_threshold,
                medium: medium_threshold,
            });
        }
        Ok(Self {
            allow_list: BTreeSet::new(),
            stride,
            medium_threshold,
            fine_threshold,
            text_key: "name".to_string(),
            max_text_len: 256,
        })
    }

    /// Points of interest: every 5th label at medium zoom.
    pub fn points_of_interest() -> Self {
        Self::preset(5, 3.0, 1.0)
    }

    /// Buildings and roads: every 10th label at medium zoom.
    pub fn buildings() -> Self {
        Self::preset(10, 2.0, 0.6)
    }

    /// A policy that never labels (base and raster layers).
    pub fn none() -> Self {
        Self::preset(1, 0.0, 0.0)
    }

    fn preset(stride: u32, medium_threshold: f64, fine_threshold: f64) -> Self {
        Self {
            allow_list: BTreeSet::new(),
            stride,
            medium_threshold,
            fine_threshold,
            text_key: "name".to_string(),
            max_text_len: 256,
        }
    }

    pub fn with_allow_list<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allow_list = names.into_iter().map(|s| s.into().trim().to_string()).collect();
        self
    }

    pub fn stride(&self) -> u32 {
        self.stride
    }

    pub fn medium_threshold(&self) -> f64 {
        self.medium_threshold
    }

    pub fn fine_threshold(&self) -> f64 {
        self.fine_threshold
    }

    pub fn is_allowed(&self, text: &str) -> bool {
        self.allow_list.contains(text.trim())
    }

    /// Should a feature with this key and label text be labelled at `resolution`?
    pub fn shows_label(&self, key: &FeatureKey, text: &str, resolution: f64) -> bool {
        if self.is_allowed(text) {
            return true;
        }
        if resolution < self.fine_threshold {
            return true;
        }
        if resolution < self.medium_threshold {
            return decimation_hash(key, self.stride) == Some(0);
        }
        false
    }
}

/// The decimal digits of a feature identifier reduced modulo `stride`.
///
/// `"building.1027"` and `1027` hash alike. Identifiers without any digit
/// have no hash (and so never pass the decimated tier). Fallback keys hash
/// their session counter, which is not stable across reloads.
pub fn decimation_hash(key: &FeatureKey, stride: u32) -> Option<u32> {
    if stride == 0 {
        return None;
    }
    match key {
        FeatureKey::Stable(FeatureId::Int(n)) => digits_mod(&n.to_string(), stride),
        FeatureKey::Stable(FeatureId::Text(s)) => digits_mod(s, stride),
        FeatureKey::Fallback(n) => Some((*n % stride as u64) as u32),
    }
}

fn digits_mod(text: &str, stride: u32) -> Option<u32> {
    let stride = stride as u64;
    let mut acc: Option<u64> = None;
    for d in text.bytes().filter(u8::is_ascii_digit) {
        let v = acc.unwrap_or(0);
        acc = Some((v * 10 + (d - b'0') as u64) % stride);
    }
    acc.map(|v| v as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_key(s: &str) -> FeatureKey {
        FeatureKey::Stable(FeatureId::Text(s.into()))
    }

    #[test]
    fn hash_uses_digits_only() {
        assert_eq!(decimation_hash(&text_key("building.1027"), 10), Some(7));
        assert_eq!(
            decimation_hash(&FeatureKey::Stable(FeatureId::Int(1027)), 10),
            Some(7)
        );
        assert_eq!(decimation_hash(&text_key("a1b2c5"), 5), Some(0));
        assert_eq!(decimation_hash(&text_key("no-digits"), 5), None);
        assert_eq!(decimation_hash(&FeatureKey::Fallback(12), 5), Some(2));
    }

    #[test]
    fn hash_never_overflows_on_long_identifiers() {
        let long = "9".repeat(200);
        assert_eq!(decimation_hash(&text_key(&long), 10), Some(9));
    }

    #[test]
    fn negative_ids_hash_their_digits() {
        assert_eq!(
            decimation_hash(&FeatureKey::Stable(FeatureId::Int(-15)), 5),
            Some(0)
        );
    }

    #[test]
    fn hash_is_deterministic() {
        for id in ["1", "poi.42", "x9y9", "000", "id-5050"] {
            let key = text_key(id);
            for stride in [1, 5, 10] {
                assert_eq!(decimation_hash(&key, stride), decimation_hash(&key, stride));
            }
        }
    }

    #[test]
    fn tiers_follow_resolution() {
        let p = LabelPolicy::points_of_interest();
        let shown = text_key("poi.10");
        let hidden = text_key("poi.11");

        // Coarse: nobody.
        assert!(!p.shows_label(&shown, "A", 5.0));
        // Medium: only hash == 0.
        assert!(p.shows_label(&shown, "A", 2.0));
        assert!(!p.shows_label(&hidden, "B", 2.0));
        // Fine: everybody.
        assert!(p.shows_label(&hidden, "B", 0.5));
    }

    #[test]
    fn allow_list_ignores_resolution() {
        let p = LabelPolicy::buildings().with_allow_list(["Thư viện"]);
        assert!(p.shows_label(&text_key("x"), " Thư viện ", 1e6));
    }

    #[test]
    fn policy_is_resolution_monotonic() {
        let p = LabelPolicy::points_of_interest();
        let resolutions: Vec<f64> = (0..80).map(|i| i as f64 * 0.05).collect();
        for id in 0..50i64 {
            let key = FeatureKey::Stable(FeatureId::Int(id));
            for (i, r2) in resolutions.iter().enumerate() {
                if !p.shows_label(&key, "label", *r2) {
                    continue;
                }
                for r1 in &resolutions[..i] {
                    assert!(
                        p.shows_label(&key, "label", *r1),
                        "id {id}: shown at {r2} but hidden at {r1}"
                    );
                }
            }
        }
    }

    #[test]
    fn construction_validates_thresholds() {
        assert_eq!(LabelPolicy::new(0, 2.0, 1.0), Err(LabelPolicyError::ZeroStride));
        assert!(matches!(
            LabelPolicy::new(5, 1.0, 2.0),
            Err(LabelPolicyError::ThresholdsOutOfOrder { .. })
        ));
        assert!(matches!(
            LabelPolicy::new(5, f64::NAN, 1.0),
            Err(LabelPolicyError::InvalidThreshold(_))
        ));
        let p = LabelPolicy::new(5, 3.0, 1.0).expect("valid");
        assert_eq!(p.stride(), 5);
    }

    #[test]
    fn none_policy_never_labels() {
        let p = LabelPolicy::none();
        assert!(!p.shows_label(&FeatureKey::Fallback(0), "x", 0.01));
    }
}
