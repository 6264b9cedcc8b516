//! Reply extraction: turn the model's free-form text into an
//! [`EvaluationRecord`], or say precisely why it could not.
//!
//! The model is told to answer with bare JSON but is a non-deterministic text
//! generator: it wraps the object in code fences, prefixes it with prose, or
//! drops a required field. Extraction runs these steps in order:
//!
//! 1. trim
//! 2. strip an outer ```` ``` ```` / ```` ```json ```` fence if the text starts with one
//! 3. strict JSON parse
//! 4. on failure, parse the greedy first-`{`-to-last-`}` substring
//! 5. require a truthy `globalScore` and a non-empty `criteria`
//!
//! Nothing beyond step 5 is contractual. The typed record reads every other
//! field leniently, so only a `globalScore` with no numeric reading or a
//! criterion that is not an object can still fail after validation.
//!
//! Step 4 is a heuristic: two separate objects in one reply get merged into
//! one invalid span and the reply is reported as unparsable.

use crate::error::AuditError;
use crate::evaluation::EvaluationRecord;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

/// Outcome of extracting a reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    /// Parsed and validated.
    Parsed(EvaluationRecord),
    /// No recoverable JSON object in the text.
    Unparsable { detail: String },
    /// Valid JSON that does not satisfy the evaluation contract.
    Incomplete { detail: String },
}

impl Extraction {
    pub fn into_result(self) -> Result<EvaluationRecord, AuditError> {
        match self {
            Extraction::Parsed(record) => Ok(record),
            Extraction::Unparsable { detail } => Err(AuditError::UnparsableResponse { detail }),
            Extraction::Incomplete { detail } => Err(AuditError::IncompleteResponse { detail }),
        }
    }
}

/// Extract and validate an evaluation from raw reply text.
pub fn extract_evaluation(raw: &str) -> Result<EvaluationRecord, AuditError> {
    extract(raw).into_result()
}

/// Run every extraction step and report the tagged outcome.
pub fn extract(raw: &str) -> Extraction {
    let text = strip_code_fence(raw.trim());

    let value = match parse_json(&text) {
        Ok(v) => v,
        Err(detail) => {
            warn!("Unparsable analysis reply: {}", detail);
            return Extraction::Unparsable { detail };
        }
    };

    if let Err(detail) = validate(&value) {
        warn!("Incomplete analysis reply: {}", detail);
        return Extraction::Incomplete { detail };
    }

    match serde_json::from_value::<EvaluationRecord>(value) {
        Ok(record) => {
            if !record.grade_is_consistent() {
                warn!(
                    "Grade {} does not match percentage {}",
                    record.effective_grade(),
                    record.score_percentage()
                );
            }
            debug!(
                "Extracted evaluation: score {} / {}, {} criteria",
                record.global_score,
                record.max_score,
                record.criteria.len()
            );
            Extraction::Parsed(record)
        }
        Err(e) => Extraction::Incomplete {
            detail: format!("evaluation shape mismatch: {e}"),
        },
    }
}

// ── Step 2: outer code fence ────────────────────────────────────────────────

static RE_LEADING_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^```(?:json)?\s*\n?").unwrap());
static RE_TRAILING_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n?```\s*$").unwrap());

fn strip_code_fence(text: &str) -> String {
    if !text.starts_with("```") {
        return text.to_string();
    }
    let without_leading = RE_LEADING_FENCE.replace(text, "");
    RE_TRAILING_FENCE.replace(&without_leading, "").into_owned()
}

// ── Steps 3–4: strict parse, then greedy brace span ─────────────────────────

static RE_BRACE_SPAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{.*\}").unwrap());

fn parse_json(text: &str) -> Result<Value, String> {
    let strict_err = match serde_json::from_str::<Value>(text) {
        Ok(v) => return Ok(v),
        Err(e) => e,
    };

    let span = RE_BRACE_SPAN
        .find(text)
        .ok_or_else(|| format!("no JSON object found ({strict_err})"))?;

    debug!("Strict parse failed, retrying on {}-byte brace span", span.len());
    serde_json::from_str::<Value>(span.as_str())
        .map_err(|e| format!("brace span is not valid JSON ({e})"))
}

// ── Step 5: contract check ──────────────────────────────────────────────────

fn validate(value: &Value) -> Result<(), String> {
    if !value.get("globalScore").is_some_and(is_truthy) {
        return Err("missing globalScore".into());
    }
    match value.get("criteria") {
        Some(Value::Array(items)) if !items.is_empty() => Ok(()),
        Some(Value::Array(_)) => Err("criteria is empty".into()),
        Some(v) if is_truthy(v) => Err("criteria is not a list".into()),
        _ => Err("missing criteria".into()),
    }
}

fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::{CriterionStatus, Grade};

    const BODY: &str = r#"{"globalScore":72,"maxScore":100,"percentage":72,"grade":"B+","summary":"ok","criteria":[{"name":"X","score":5,"maxScore":10,"status":"warning","details":"d","recommendations":[]}],"generalRecommendations":[]}"#;

    #[test]
    fn fenced_json_with_tag() {
        let input = format!("```json\n{BODY}\n```");
        let rec = extract_evaluation(&input).expect("should parse");
        assert_eq!(rec.percentage, Some(72.0));
        assert_eq!(rec.grade, Some(Grade::BPlus));
        assert_eq!(rec.criteria[0].status, Some(CriterionStatus::Warning));
    }

    #[test]
    fn fence_variants_match_bare_parse() {
        let bare = extract_evaluation(BODY).unwrap();
        for input in [
            format!("```\n{BODY}\n```"),
            format!("```json\n{BODY}```"),
            format!("```json {BODY} ```"),
            format!("  \n```json\n{BODY}\n```\n\n"),
            format!("```{BODY}```"),
        ] {
            assert_eq!(extract_evaluation(&input).unwrap(), bare, "input: {input:?}");
        }
    }

    #[test]
    fn strip_fence_only_when_leading() {
        assert_eq!(strip_code_fence("```json\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("{} ```"), "{} ```");
    }

    #[test]
    fn prose_around_object_is_recovered() {
        let input = format!("Sure, here is the evaluation:\n{BODY}\nLet me know if you need more.");
        let rec = extract_evaluation(&input).unwrap();
        assert_eq!(rec.global_score, 72.0);
    }

    #[test]
    fn no_braces_is_unparsable() {
        let out = extract("I could not read the slides, sorry.");
        assert!(matches!(out, Extraction::Unparsable { .. }));
        let err = extract_evaluation("plain text").unwrap_err();
        assert!(matches!(err, AuditError::UnparsableResponse { .. }));
    }

    #[test]
    fn broken_brace_span_is_unparsable() {
        let out = extract("result: {\"globalScore\": 50, \"criteria\": [ }");
        assert!(matches!(out, Extraction::Unparsable { .. }));
    }

    #[test]
    fn two_objects_merge_and_fail() {
        let input = format!("first {BODY} then second {BODY}");
        assert!(matches!(extract(&input), Extraction::Unparsable { .. }));
    }

    #[test]
    fn missing_global_score_is_incomplete() {
        let input = r#"Sure, here is the result {"criteria":[{"name":"X","score":5,"maxScore":10,"status":"pass"}]}  -- no globalScore field"#;
        match extract(input) {
            Extraction::Incomplete { detail } => assert!(detail.contains("globalScore")),
            other => panic!("expected Incomplete, got {other:?}"),
        }
        let err = extract_evaluation(input).unwrap_err();
        assert!(matches!(err, AuditError::IncompleteResponse { .. }));
    }

    #[test]
    fn zero_global_score_is_falsy() {
        let input = BODY.replace("\"globalScore\":72", "\"globalScore\":0");
        assert!(matches!(extract(&input), Extraction::Incomplete { .. }));
    }

    #[test]
    fn missing_or_empty_criteria_is_incomplete() {
        let missing = r#"{"globalScore":50,"percentage":50,"grade":"C"}"#;
        let empty = r#"{"globalScore":50,"percentage":50,"grade":"C","criteria":[]}"#;
        assert!(matches!(extract(missing), Extraction::Incomplete { .. }));
        assert!(matches!(extract(empty), Extraction::Incomplete { .. }));
    }

    #[test]
    fn non_object_json_is_incomplete() {
        assert!(matches!(extract("42"), Extraction::Incomplete { .. }));
        assert!(matches!(extract("null"), Extraction::Incomplete { .. }));
    }

    #[test]
    fn unknown_grade_is_kept() {
        let input = BODY.replace("\"B+\"", "\"excellent\"");
        let rec = extract_evaluation(&input).unwrap();
        assert_eq!(rec.grade, Some(Grade::Other("excellent".into())));
        assert!(!rec.grade_is_consistent());
    }

    #[test]
    fn score_and_criteria_alone_are_enough() {
        let input = r#"{"globalScore":72,"criteria":[{"name":"X","score":5,"maxScore":10,"status":"pass"}]}"#;
        let rec = extract_evaluation(input).unwrap();
        assert_eq!(rec.percentage, None);
        assert_eq!(rec.grade, None);
        assert_eq!(rec.effective_grade(), Grade::BPlus);
        assert_eq!(rec.criteria[0].status, Some(CriterionStatus::Pass));
    }

    #[test]
    fn capitalised_status_and_grade_are_accepted() {
        let input = BODY
            .replace("\"warning\"", "\"Warning\"")
            .replace("\"B+\"", "\"b+\"");
        let rec = extract_evaluation(&input).unwrap();
        assert_eq!(rec.criteria[0].status, Some(CriterionStatus::Warning));
        assert_eq!(rec.grade, Some(Grade::BPlus));

        let input = BODY.replace("\"warning\"", "\"Pass\"");
        let rec = extract_evaluation(&input).unwrap();
        assert_eq!(rec.criteria[0].status, Some(CriterionStatus::Pass));
    }

    #[test]
    fn numeric_strings_are_accepted() {
        let input = BODY
            .replace("\"globalScore\":72", "\"globalScore\":\"72\"")
            .replace("\"percentage\":72", "\"percentage\":\"72\"")
            .replace("\"score\":5", "\"score\":\"5\"");
        let rec = extract_evaluation(&input).unwrap();
        assert_eq!(rec, extract_evaluation(BODY).unwrap());
    }

    #[test]
    fn unreadable_score_is_incomplete() {
        let input = BODY.replace("\"globalScore\":72", "\"globalScore\":\"high\"");
        match extract(&input) {
            Extraction::Incomplete { detail } => assert!(detail.contains("shape")),
            other => panic!("expected Incomplete, got {other:?}"),
        }
    }

    #[test]
    fn extraction_is_idempotent() {
        let first = extract_evaluation(&format!("```json\n{BODY}\n```")).unwrap();
        let text = serde_json::to_string_pretty(&first).unwrap();
        let second = extract_evaluation(&text).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn truthiness_follows_json_semantics() {
        assert!(!is_truthy(&Value::Null));
        assert!(!is_truthy(&serde_json::json!(0)));
        assert!(!is_truthy(&serde_json::json!("")));
        assert!(!is_truthy(&serde_json::json!(false)));
        assert!(is_truthy(&serde_json::json!(0.5)));
        assert!(is_truthy(&serde_json::json!("72")));
        assert!(is_truthy(&serde_json::json!([])));
    }
}
