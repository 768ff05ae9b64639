/// The rating record stored in each image's tag block
///
/// A record has three independent parts:
/// - `stars` (1-5), the discrete rating shown in the gallery
/// - `percent` (0-100), the model's raw score as a percentage
/// - `verdict`, the per-attribute scores plus the overall score
///
/// All three are optional because foreign or corrupt files may carry none of them.

use serde::de::{Deserializer, Error as _};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// JSON key of the overall score (name kept from the network's output layer)
pub const SCORE_KEY: &str = "fc11_score";

/// The eleven aesthetic attributes predicted by the network
///
/// Declaration order is the evaluation order used when building comments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Attribute {
    BalancingElement,
    ColorHarmony,
    Content,
    DepthOfField,
    Light,
    MotionBlur,
    Object,
    Repetition,
    Symmetry,
    RuleOfThirds,
    VividColor,
}

impl Attribute {
    pub const COUNT: usize = 11;

    pub const ALL: [Attribute; Attribute::COUNT] = [
        Attribute::BalancingElement,
        Attribute::ColorHarmony,
        Attribute::Content,
        Attribute::DepthOfField,
        Attribute::Light,
        Attribute::MotionBlur,
        Attribute::Object,
        Attribute::Repetition,
        Attribute::Symmetry,
        Attribute::RuleOfThirds,
        Attribute::VividColor,
    ];

    /// Key used both for the network output and the stored JSON document
    pub fn key(self) -> &'static str {
        match self {
            Attribute::BalancingElement => "fc9_BalancingElement",
            Attribute::ColorHarmony => "fc9_ColorHarmony",
            Attribute::Content => "fc9_Content",
            Attribute::DepthOfField => "fc9_DoF",
            Attribute::Light => "fc9_Light",
            Attribute::MotionBlur => "fc9_MotionBlur",
            Attribute::Object => "fc9_Object",
            Attribute::Repetition => "fc9_Repetition",
            Attribute::Symmetry => "fc9_Symmetry",
            Attribute::RuleOfThirds => "fc9_RuleOfThirds",
            Attribute::VividColor => "fc9_VividColor",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Per-attribute scores plus the overall score
///
/// The fixed-size array makes a partial verdict unrepresentable:
/// either every attribute has a value or there is no verdict at all.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    values: [f32; Attribute::COUNT],
    score: f32,
}

impl Verdict {
    pub fn new(values: [f32; Attribute::COUNT], score: f32) -> Self {
        Self { values, score }
    }

    /// Build a verdict from named values, `None` if any key is missing
    pub fn from_lookup<F>(mut lookup: F) -> Option<Self>
    where
        F: FnMut(&str) -> Option<f32>,
    {
        let mut values = [0.0; Attribute::COUNT];
        for attribute in Attribute::ALL {
            values[attribute.index()] = lookup(attribute.key())?;
        }
        let score = lookup(SCORE_KEY)?;
        Some(Self { values, score })
    }

    pub fn get(&self, attribute: Attribute) -> f32 {
        self.values[attribute.index()]
    }

    pub fn set(&mut self, attribute: Attribute, value: f32) {
        self.values[attribute.index()] = value;
    }

    /// Overall score in [0, 1]
    pub fn score(&self) -> f32 {
        self.score
    }

    /// Attributes in evaluation order
    pub fn iter(&self) -> impl Iterator<Item = (Attribute, f32)> + '_ {
        Attribute::ALL.iter().map(move |&a| (a, self.get(a)))
    }

    /// Percent score derived from the overall score, rounded and clamped to 0-100
    pub fn percent(&self) -> u8 {
        (self.score * 100.0).round().clamp(0.0, 100.0) as u8
    }

    /// Score as shown in the details panel (truncated, not rounded)
    pub fn display_score(&self) -> i32 {
        (self.score * 100.0) as i32
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl Serialize for Verdict {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Attribute::COUNT + 1))?;
        for (attribute, value) in self.iter() {
            map.serialize_entry(attribute.key(), &value)?;
        }
        map.serialize_entry(SCORE_KEY, &self.score)?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for Verdict {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = Map::<String, Value>::deserialize(deserializer)?;
        Verdict::from_lookup(|key| map.get(key).and_then(Value::as_f64).map(|v| v as f32))
            .ok_or_else(|| D::Error::custom("verdict document is missing keys"))
    }
}

/// Everything this application stores about one image
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RatingRecord {
    /// Discrete rating 1-5, `None` when unrated
    pub stars: Option<u8>,
    /// Model percentile 0-100
    pub percent: Option<u8>,
    pub verdict: Option<Verdict>,
}

impl RatingRecord {
    /// Record produced by a fresh inference
    ///
    /// Percent comes from the overall score, stars from the shared bucketing.
    pub fn from_verdict(verdict: Verdict) -> Self {
        let percent = verdict.percent();
        Self {
            stars: Some(stars_from_percent(percent)),
            percent: Some(percent),
            verdict: Some(verdict),
        }
    }

    /// Record for a manual star edit without re-running the model
    ///
    /// Carries no verdict, so writing it keeps whatever verdict is stored.
    pub fn manual(stars: u8) -> Option<Self> {
        Some(Self {
            stars: Some(stars),
            percent: Some(percent_from_stars(stars)?),
            verdict: None,
        })
    }

    pub fn is_unrated(&self) -> bool {
        self.stars.is_none()
    }
}

/// Bucket a percent score into a 1-5 star rating
///
/// Every star value derived from a percent goes through here.
pub fn stars_from_percent(percent: u8) -> u8 {
    match percent {
        0..=12 => 1,
        13..=37 => 2,
        38..=62 => 3,
        63..=87 => 4,
        _ => 5,
    }
}

/// Approximate percent for a star rating set by hand
///
/// Lossy and one-directional: it picks a fixed point inside each bucket so
/// that `stars_from_percent(percent_from_stars(s)) == s`, nothing more.
/// Returns `None` for values outside 1-5.
pub fn percent_from_stars(stars: u8) -> Option<u8> {
    match stars {
        1 => Some(10),
        2 => Some(35),
        3 => Some(60),
        4 => Some(80),
        5 => Some(95),
        _ => None,
    }
}

/// Star glyphs for the gallery label, empty stars when unrated
pub fn stars_glyph(stars: Option<u8>) -> String {
    let filled = stars.unwrap_or(0).min(5) as usize;
    let mut glyph = "★".repeat(filled);
    glyph.push_str(&"☆".repeat(5 - filled));
    glyph
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_verdict() -> Verdict {
        let mut values = [0.0; Attribute::COUNT];
        for (i, v) in values.iter_mut().enumerate() {
            *v = (i as f32 - 5.0) / 10.0;
        }
        Verdict::new(values, 0.734)
    }

    #[test]
    fn test_bucketing_boundaries() {
        let cases = [
            (0, 1), (12, 1), (13, 2), (37, 2), (38, 3),
            (62, 3), (63, 4), (87, 4), (88, 5), (100, 5),
        ];
        for (percent, stars) in cases {
            assert_eq!(stars_from_percent(percent), stars, "percent {}", percent);
        }
    }

    #[test]
    fn test_bucketing_monotonic_and_in_range() {
        let mut previous = 1;
        for percent in 0..=100u8 {
            let stars = stars_from_percent(percent);
            assert!((1..=5).contains(&stars));
            assert!(stars >= previous);
            previous = stars;
        }
    }

    #[test]
    fn test_manual_percent_lands_in_its_bucket() {
        for stars in 1..=5 {
            let percent = percent_from_stars(stars).unwrap();
            assert_eq!(stars_from_percent(percent), stars);
        }
        assert_eq!(percent_from_stars(0), None);
        assert_eq!(percent_from_stars(6), None);
        assert!(RatingRecord::manual(7).is_none());
    }

    #[test]
    fn test_record_from_verdict() {
        let record = RatingRecord::from_verdict(sample_verdict());
        assert_eq!(record.percent, Some(73));
        assert_eq!(record.stars, Some(4));
        assert!(record.verdict.is_some());
    }

    #[test]
    fn test_percent_is_clamped() {
        let high = Verdict::new([0.0; Attribute::COUNT], 1.3);
        let low = Verdict::new([0.0; Attribute::COUNT], -0.2);
        assert_eq!(high.percent(), 100);
        assert_eq!(low.percent(), 0);
    }

    #[test]
    fn test_verdict_json_uses_network_keys() {
        let json = sample_verdict().to_json().unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        let object = value.as_object().unwrap();

        assert_eq!(object.len(), 12);
        assert!(object.contains_key("fc9_DoF"));
        assert!(object.contains_key(SCORE_KEY));

        let restored = Verdict::from_json(&json).unwrap();
        assert_eq!(restored, sample_verdict());
    }

    #[test]
    fn test_partial_document_is_rejected() {
        let json = r#"{"fc9_BalancingElement": 0.2, "fc11_score": 0.5}"#;
        assert!(Verdict::from_json(json).is_err());
    }

    #[test]
    fn test_extra_keys_are_ignored() {
        let mut value = serde_json::to_value(sample_verdict()).unwrap();
        value["camera_notes"] = Value::from("hello");
        let restored: Verdict = serde_json::from_value(value).unwrap();
        assert_eq!(restored, sample_verdict());
    }

    #[test]
    fn test_stars_glyph() {
        assert_eq!(stars_glyph(None), "☆☆☆☆☆");
        assert_eq!(stars_glyph(Some(3)), "★★★☆☆");
        assert_eq!(stars_glyph(Some(5)), "★★★★★");
    }
}
