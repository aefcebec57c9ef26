//! Per-patient content personalization.
//!
//! A pure transformation: template blocks in, a new list of surviving,
//! transformed blocks out. The template's canonical copy is never
//! mutated, so concurrent jobs over the same template cannot alias each
//! other's personalization.

use chrono::NaiveDate;
use outreach_core::model::{BlockContent, ContentBlock, Patient};

/// Patients older than this get senior-specific supplemental text on
/// matched health-info blocks.
pub const SENIOR_AGE_YEARS: u32 = 65;

const SENIOR_NOTE: &str =
    "For patients over 65: please review this guidance with your care team at your next visit.";

/// Walk the template's blocks in order, dropping blocks the patient's
/// attributes do not satisfy and transforming the rest.
///
/// - `text` blocks get placeholder substitution over their text field
/// - `health-info` blocks targeting a condition the patient has are
///   marked personalized, with a senior note attached for patients
///   over [`SENIOR_AGE_YEARS`] (skipped when no birth date is on record)
/// - all other block types pass through unchanged
///
/// `today` is injected rather than read from the clock so date
/// placeholders are deterministic under test.
#[must_use]
pub fn personalize(blocks: &[ContentBlock], patient: &Patient, today: NaiveDate) -> Vec<ContentBlock> {
    blocks
        .iter()
        .filter(|block| block.included_for(patient))
        .map(|block| transform(block, patient, today))
        .collect()
}

fn transform(block: &ContentBlock, patient: &Patient, today: NaiveDate) -> ContentBlock {
    let content = match &block.content {
        BlockContent::Text { text } => BlockContent::Text {
            text: substitute_placeholders(text, patient, today),
        },
        BlockContent::HealthInfo {
            heading,
            body,
            condition,
            ..
        } => {
            let matched = condition
                .as_ref()
                .is_some_and(|c| patient.conditions.iter().any(|held| held == c));
            let senior_note = (matched
                && patient.age_on(today).is_some_and(|age| age > SENIOR_AGE_YEARS))
            .then(|| SENIOR_NOTE.to_string());

            BlockContent::HealthInfo {
                heading: heading.clone(),
                body: body.clone(),
                condition: condition.clone(),
                personalized: matched,
                senior_note,
            }
        }
        other => other.clone(),
    };

    ContentBlock {
        id: block.id.clone(),
        content,
        rules: block.rules.clone(),
    }
}

/// Substitute `{token}` placeholders with patient data in a single
/// left-to-right pass. Unknown tokens (and unterminated braces) are
/// left verbatim, so substituted values are never re-scanned.
#[must_use]
pub fn substitute_placeholders(text: &str, patient: &Patient, today: NaiveDate) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        let Some(close) = after.find('}') else {
            out.push_str(&rest[open..]);
            return out;
        };

        let token = &after[..close];
        if let Some(value) = lookup(token, patient, today) {
            out.push_str(&value);
        } else {
            out.push_str(&rest[open..=open + close + 1]);
        }
        rest = &after[close + 1..];
    }

    out.push_str(rest);
    out
}

fn lookup(token: &str, patient: &Patient, today: NaiveDate) -> Option<String> {
    match token {
        "first_name" => Some(patient.first_name.clone()),
        "last_name" => Some(patient.last_name.clone()),
        "full_name" => Some(patient.full_name()),
        "health_conditions" => Some(patient.conditions.join(", ")),
        "medications" => Some(patient.medications.join(", ")),
        "current_date" => Some(today.format("%B %-d, %Y").to_string()),
        "current_month" => Some(today.format("%B").to_string()),
        "current_year" => Some(today.format("%Y").to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use outreach_core::model::{ConsentStatus, TargetingCriteria};
    use pretty_assertions::assert_eq;

    use super::*;

    fn patient() -> Patient {
        Patient {
            id: "p1".into(),
            tenant_id: "t1".into(),
            email: "ana@example.com".into(),
            first_name: "Ana".into(),
            last_name: "Silva".into(),
            consent: ConsentStatus::Active,
            date_of_birth: NaiveDate::from_ymd_opt(1950, 3, 10),
            conditions: vec!["diabetes".into(), "hypertension".into()],
            medications: vec!["metformin".into()],
            dietary_restrictions: vec![],
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).expect("valid date")
    }

    fn text_block(id: &str, text: &str, rules: TargetingCriteria) -> ContentBlock {
        ContentBlock {
            id: id.into(),
            content: BlockContent::Text { text: text.into() },
            rules,
        }
    }

    #[test]
    fn test_every_occurrence_is_substituted() {
        let result =
            substitute_placeholders("Hello {first_name} {first_name}", &patient(), today());
        assert_eq!(result, "Hello Ana Ana");
    }

    #[test]
    fn test_unknown_tokens_and_unterminated_braces_pass_through() {
        let p = patient();
        assert_eq!(
            substitute_placeholders("Hi {first_name}, see {unknown_token}", &p, today()),
            "Hi Ana, see {unknown_token}"
        );
        assert_eq!(
            substitute_placeholders("Dangling {first_name", &p, today()),
            "Dangling {first_name"
        );
    }

    #[test]
    fn test_list_and_date_placeholders() {
        let result = substitute_placeholders(
            "{full_name}: {health_conditions} / {medications} on {current_date} ({current_month} {current_year})",
            &patient(),
            today(),
        );
        assert_eq!(
            result,
            "Ana Silva: diabetes, hypertension / metformin on June 1, 2025 (June 2025)"
        );
    }

    #[test]
    fn test_excluded_blocks_are_dropped_and_order_preserved() {
        let blocks = vec![
            text_block(
                "b1",
                "diabetic tips",
                TargetingCriteria {
                    conditions: vec!["diabetes".into()],
                    ..TargetingCriteria::default()
                },
            ),
            text_block(
                "b2",
                "asthma tips",
                TargetingCriteria {
                    conditions: vec!["asthma".into()],
                    ..TargetingCriteria::default()
                },
            ),
            text_block("b3", "for everyone", TargetingCriteria::default()),
        ];

        let survivors = personalize(&blocks, &patient(), today());
        let ids: Vec<_> = survivors.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["b1", "b3"]);
    }

    #[test]
    fn test_health_info_personalization_and_senior_note() {
        let block = ContentBlock {
            id: "h1".into(),
            content: BlockContent::HealthInfo {
                heading: "Managing diabetes".into(),
                body: "Check your levels daily.".into(),
                condition: Some("diabetes".into()),
                personalized: false,
                senior_note: None,
            },
            rules: TargetingCriteria::default(),
        };

        // Age 75 on the reference date: matched and senior
        let result = personalize(std::slice::from_ref(&block), &patient(), today());
        match &result[0].content {
            BlockContent::HealthInfo {
                personalized,
                senior_note,
                ..
            } => {
                assert!(personalized);
                assert!(senior_note.is_some());
            }
            other => panic!("unexpected content: {other:?}"),
        }

        // No birth date on record: personalized, but no senior note
        let mut ageless = patient();
        ageless.date_of_birth = None;
        let result = personalize(std::slice::from_ref(&block), &ageless, today());
        match &result[0].content {
            BlockContent::HealthInfo {
                personalized,
                senior_note,
                ..
            } => {
                assert!(personalized);
                assert!(senior_note.is_none());
            }
            other => panic!("unexpected content: {other:?}"),
        }

        // Condition mismatch: untouched
        let mut other_condition = patient();
        other_condition.conditions = vec!["asthma".into()];
        let result = personalize(std::slice::from_ref(&block), &other_condition, today());
        match &result[0].content {
            BlockContent::HealthInfo {
                personalized,
                senior_note,
                ..
            } => {
                assert!(!personalized);
                assert!(senior_note.is_none());
            }
            other => panic!("unexpected content: {other:?}"),
        }
    }
}
