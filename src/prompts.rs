//! Prompts sent to the analysis model.
//!
//! The rubric is business content owned by the PMO; the code only cares that
//! it ends by describing the JSON shape [`crate::pipeline::extract`] expects.
//! Callers can replace it via [`crate::config::AuditConfig::rubric`].

use crate::document::DocumentKind;

/// Evaluation rubric and required output shape.
pub const DEFAULT_RUBRIC: &str = r#"You are a PMO (Project Management Office) expert assessing whether a project roadmap complies with the official template.

## REFERENCE TEMPLATE
The roadmap must follow this PMO template:
- **Layout**: landscape Gantt chart, title "FEUILLE DE ROUTE" at the top left
- **Mandatory legend** at the top right with 6 statuses and colour codes:
  - Green: Closed
  - Blue: No alert
  - Yellow/Orange: Started, moderate risk or slight delay
  - Red: Not started, high risk or significant delay
  - Light grey: New / to be planned
  - Grey: Suspended
- **Horizontal time axis** with months and weeks
- **Dashed vertical line** (with a triangle) marking the reference date
- **6 mandatory categories (rows)**:
  1. POLITICAL / GOVERNANCE — COPIL milestones (pentagon/arrow pictogram + "COPIL" label + date)
  2. ECONOMIC (BUDGET) — project estimate, payment due dates
  3. STRATEGIC (SD & BP) — business model, decrees, studies
  4. IMPLEMENTATION — Design, Development, Tests, Load tests, Security tests, Technical acceptance, Functional acceptance, Migration, Go-live
  5. SOCIETAL, ENVIRONMENTAL IMPACT — EEIES or impact studies
  6. LEGAL, PUBLIC PROCUREMENT — ToR, contracts (construction, hosting, etc.)
- **Pictograms**:
  - Milestones (COPIL, go-live, Go/NoGo) use a pentagon (arrow-shaped) pictogram with the label beside it
  - Activities are rectangular bars, length proportional to the timeline
  - Go-live must be a single-date milestone pictogram, NOT a bar spanning weeks

## EVALUATION CRITERIA (100 points total)

Score each criterion:

### 1. Template compliance (15 pts)
Official template used (layout, colours, style)? Title present? Legend complete and correct? Decorative elements and slide number consistent?

### 2. Governance and committees (15 pts)
COPILs planned with precise dates? Regular cadence? Pentagon pictograms used for milestones? Go/NoGo COPIL before go-live?

### 3. Implementation phase completeness (15 pts)
Design → Development → Tests → Acceptance → Migration → Go-live all present? Load and security tests planned? Technical AND functional acceptance distinct? Identifiable kick-off?

### 4. Go-live precision (10 pts)
Go-live is a single dated milestone? A go-live spread over several weeks scores very low. Go/NoGo planned before go-live?

### 5. Budget and payment schedule (10 pts)
Project estimate given? Payment due dates shown? Consistent with the ToR and stated percentages?

### 6. Legal and procurement (10 pts)
ToR identified? Required public contracts listed? Realistic contract durations?

### 7. Societal and environmental impact (5 pts)
EEIES or impact study planned? Positioned before or at the start of the project?

### 8. Timeline consistency (10 pts)
Logical dates without inconsistent overlaps? Phase dependencies respected? Realistic overall timeline?

### 9. Statuses and colour codes (5 pts)
Colours match the legend? Statuses consistent with visible progress?

### 10. Acceptance tests (5 pts)
User acceptance tests planned? Positioned after technical acceptance?

## RESPONSE FORMAT

Answer ONLY with valid JSON (no markdown, no backticks, no commentary) with exactly this structure:

{
  "globalScore": <number>,
  "maxScore": 100,
  "percentage": <number 0-100>,
  "grade": "<A+ / A / B+ / B / C / D / F>",
  "summary": "<2-3 sentence summary of the overall assessment>",
  "criteria": [
    {
      "name": "<criterion name>",
      "score": <number>,
      "maxScore": <number>,
      "status": "<pass|warning|fail>",
      "details": "<explanation of the assessment>",
      "recommendations": ["<recommendation 1>", "<recommendation 2>"]
    }
  ],
  "generalRecommendations": ["<general recommendation 1>", "<general recommendation 2>"]
}

Grading scale: A+ (90-100), A (80-89), B+ (70-79), B (60-69), C (50-59), D (40-49), F (<40)

Be precise, demanding but fair. Identify concrete strengths and gaps. Give actionable recommendations."#;

/// Framing sentence placed before the rubric, chosen by document kind.
pub fn framing(kind: DocumentKind, file_name: &str, attachment_count: usize) -> String {
    match kind {
        DocumentKind::SlideContainer => format!(
            "Here is a PMO roadmap in PowerPoint format (file: \"{file_name}\"). \
Analyse its content in detail: the texts, the structure, the elements present or missing.\n\n\
Note: this is a raw PowerPoint file, so focus on the CONTENT (texts, phases, dates, \
categories present) rather than detailed visual presentation. For a full visual analysis \
the user should upload a PDF."
        ),
        DocumentKind::Pdf => format!(
            "Here are {attachment_count} slide(s) of a PMO roadmap (file: \"{file_name}\"). \
Inspect EACH slide visually in detail: layout, colours, pictograms, shapes, texts, bars, milestones."
        ),
    }
}

/// Full text of the user turn: framing, blank line, rubric.
pub fn analysis_text(
    kind: DocumentKind,
    file_name: &str,
    attachment_count: usize,
    rubric: &str,
) -> String {
    format!(
        "{}\n\n{}",
        framing(kind, file_name, attachment_count),
        rubric
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rubric_describes_required_fields() {
        for field in ["\"globalScore\"", "\"criteria\"", "\"grade\"", "\"generalRecommendations\""] {
            assert!(DEFAULT_RUBRIC.contains(field), "rubric lacks {field}");
        }
    }

    #[test]
    fn framing_differs_by_kind() {
        let pages = framing(DocumentKind::Pdf, "deck.pdf", 3);
        let container = framing(DocumentKind::SlideContainer, "deck.pptx", 1);
        assert!(pages.contains("3 slide(s)"));
        assert!(pages.contains("deck.pdf"));
        assert!(container.contains("CONTENT"));
        assert!(container.contains("deck.pptx"));
        assert_ne!(pages, container);
    }

    #[test]
    fn analysis_text_appends_rubric() {
        let text = analysis_text(DocumentKind::Pdf, "a.pdf", 1, "RUBRIC");
        assert!(text.ends_with("\n\nRUBRIC"));
    }
}
