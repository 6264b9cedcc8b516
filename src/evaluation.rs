//! The validated evaluation returned to the presentation layer.
//!
//! Field names follow the JSON shape the model is instructed to emit
//! (camelCase), so a record serialises back to what was parsed. Only
//! `globalScore` and `criteria` are contractual; every other field is read
//! leniently (numeric strings, any letter case, absent values) so a reply
//! that passes validation is never rejected over its cosmetics.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// Structured compliance score for one roadmap deck.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationRecord {
    #[serde(deserialize_with = "lenient::number")]
    pub global_score: f64,
    #[serde(default = "default_max_score", deserialize_with = "lenient::number")]
    pub max_score: f64,
    #[serde(
        default,
        deserialize_with = "lenient::opt_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub percentage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<Grade>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub summary: String,
    pub criteria: Vec<CriterionResult>,
    #[serde(default, deserialize_with = "lenient::text_list")]
    pub general_recommendations: Vec<String>,
}

fn default_max_score() -> f64 {
    100.0
}

impl EvaluationRecord {
    /// Counts of (pass, warning, fail) criteria. Unrecognised statuses are
    /// not counted.
    pub fn status_counts(&self) -> (usize, usize, usize) {
        self.criteria
            .iter()
            .fold((0, 0, 0), |(p, w, f), c| match c.status {
                Some(CriterionStatus::Pass) => (p + 1, w, f),
                Some(CriterionStatus::Warning) => (p, w + 1, f),
                Some(CriterionStatus::Fail) => (p, w, f + 1),
                _ => (p, w, f),
            })
    }

    /// The reported percentage, or the one implied by the scores.
    pub fn score_percentage(&self) -> f64 {
        self.percentage.unwrap_or_else(|| {
            if self.max_score > 0.0 {
                self.global_score / self.max_score * 100.0
            } else {
                0.0
            }
        })
    }

    /// The reported grade, or the one the scale assigns.
    pub fn effective_grade(&self) -> Grade {
        self.grade
            .clone()
            .unwrap_or_else(|| Grade::for_percentage(self.score_percentage()))
    }

    /// Whether a reported grade agrees with the scale. Absent values are
    /// consistent by definition.
    pub fn grade_is_consistent(&self) -> bool {
        match &self.grade {
            Some(grade) => Grade::for_percentage(self.score_percentage()) == *grade,
            None => true,
        }
    }
}

/// Score for a single rubric criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriterionResult {
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::number")]
    pub score: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub max_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<CriterionStatus>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub details: String,
    #[serde(default, deserialize_with = "lenient::text_list")]
    pub recommendations: Vec<String>,
}

/// Criterion outcome. Matching is case-insensitive; anything else is kept
/// verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CriterionStatus {
    Pass,
    Warning,
    Fail,
    Other(String),
}

impl CriterionStatus {
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        match s.to_ascii_lowercase().as_str() {
            "pass" | "passed" => CriterionStatus::Pass,
            "warning" | "warn" => CriterionStatus::Warning,
            "fail" | "failed" => CriterionStatus::Fail,
            _ => CriterionStatus::Other(s.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            CriterionStatus::Pass => "pass",
            CriterionStatus::Warning => "warning",
            CriterionStatus::Fail => "fail",
            CriterionStatus::Other(s) => s,
        }
    }
}

impl Serialize for CriterionStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for CriterionStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(CriterionStatus::parse(&lenient::value_text(Value::deserialize(
            deserializer,
        )?)))
    }
}

/// Letter grade, best first. Unknown labels are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Grade {
    APlus,
    A,
    BPlus,
    B,
    C,
    D,
    F,
    Other(String),
}

impl Grade {
    /// Grading scale: A+ 90–100, A 80–89, B+ 70–79, B 60–69, C 50–59, D 40–49, F below.
    pub fn for_percentage(pct: f64) -> Self {
        match pct {
            p if p >= 90.0 => Grade::APlus,
            p if p >= 80.0 => Grade::A,
            p if p >= 70.0 => Grade::BPlus,
            p if p >= 60.0 => Grade::B,
            p if p >= 50.0 => Grade::C,
            p if p >= 40.0 => Grade::D,
            _ => Grade::F,
        }
    }

    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        match s.to_ascii_uppercase().as_str() {
            "A+" => Grade::APlus,
            "A" => Grade::A,
            "B+" => Grade::BPlus,
            "B" => Grade::B,
            "C" => Grade::C,
            "D" => Grade::D,
            "F" => Grade::F,
            _ => Grade::Other(s.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::BPlus => "B+",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
            Grade::Other(s) => s,
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Grade {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Grade {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Grade::parse(&lenient::value_text(Value::deserialize(
            deserializer,
        )?)))
    }
}

/// `deserialize_with` helpers that accept what a language model plausibly
/// emits for a field instead of only the exact JSON type.
mod lenient {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn to_number(v: &Value) -> Option<f64> {
        match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().trim_end_matches('%').trim_end().parse().ok(),
            _ => None,
        }
    }

    /// Strings verbatim, scalars via their JSON text, null as empty.
    pub fn value_text(v: Value) -> String {
        match v {
            Value::Null => String::new(),
            Value::String(s) => s,
            other => other.to_string(),
        }
    }

    pub fn number<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        match Value::deserialize(d)? {
            Value::Null => Ok(0.0),
            v => to_number(&v).ok_or_else(|| D::Error::custom(format!("expected a number, got {v}"))),
        }
    }

    pub fn opt_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        match Value::deserialize(d)? {
            Value::Null => Ok(None),
            v => to_number(&v)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("expected a number, got {v}"))),
        }
    }

    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(value_text(Value::deserialize(d)?))
    }

    /// A list of strings; a lone string becomes a one-element list.
    pub fn text_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Null => Vec::new(),
            Value::Array(items) => items.into_iter().map(value_text).collect(),
            Value::String(s) if s.trim().is_empty() => Vec::new(),
            other => vec![value_text(other)],
        })
    }
}
