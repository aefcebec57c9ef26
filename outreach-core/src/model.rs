//! Domain model shared across the queue and delivery crates.
//!
//! Everything here is plain data: the relational store owns persistence,
//! and templates are read-only for the duration of a send.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// The healthcare organization account that owns patients, templates,
/// and campaigns. Carries the sender identity used for dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: String,
    pub name: String,
    pub sender_email: String,
    pub sender_name: String,
}

/// Patient-level opt-in state gating eligibility for any delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConsentStatus {
    Active,
    Pending,
    Revoked,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: String,
    pub tenant_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub consent: ConsentStatus,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub conditions: Vec<String>,
    #[serde(default)]
    pub medications: Vec<String>,
    #[serde(default)]
    pub dietary_restrictions: Vec<String>,
}

impl Patient {
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Age in whole years on `date`, or `None` when no birth date is on
    /// record.
    #[must_use]
    pub fn age_on(&self, date: NaiveDate) -> Option<u32> {
        let born = self.date_of_birth?;
        let mut age = date.year() - born.year();
        if (date.month(), date.day()) < (born.month(), born.day()) {
            age -= 1;
        }
        u32::try_from(age).ok()
    }
}

/// Campaign send lifecycle. Transitions are monotonic for a given send:
/// draft/scheduled -> sending -> sent. A job never resurrects a campaign
/// that is already `Sent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CampaignStatus {
    Draft,
    Scheduled,
    Sending,
    Sent,
    Paused,
}

/// One scheduled or completed bulk-send of a template to a filtered
/// patient set.
///
/// The delivery core mutates `status`, the counters, and `sent_at`;
/// `open_count`/`click_count` belong to a separate analytics-ingestion
/// path and are never touched here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: String,
    pub tenant_id: String,
    pub template_id: String,
    pub subject: String,
    pub status: CampaignStatus,
    #[serde(default)]
    pub scheduled_at: Option<u64>,
    #[serde(default)]
    pub sent_at: Option<u64>,
    #[serde(default)]
    pub target_count: u32,
    #[serde(default)]
    pub sent_count: u32,
    #[serde(default)]
    pub open_count: u32,
    #[serde(default)]
    pub click_count: u32,
}

/// Attribute lists used both for campaign-level audience selection and
/// block-level inclusion.
///
/// Matching is an OR across all three categories, and an OR within each
/// list: a patient satisfying a single entry anywhere is a match.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetingCriteria {
    #[serde(default)]
    pub conditions: Vec<String>,
    #[serde(default)]
    pub medications: Vec<String>,
    #[serde(default)]
    pub dietary: Vec<String>,
}

impl TargetingCriteria {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty() && self.medications.is_empty() && self.dietary.is_empty()
    }

    /// Union semantics: at least one entry from any non-empty list.
    #[must_use]
    pub fn matches(&self, patient: &Patient) -> bool {
        fn any_overlap(targets: &[String], held: &[String]) -> bool {
            targets.iter().any(|t| held.iter().any(|h| h == t))
        }

        any_overlap(&self.conditions, &patient.conditions)
            || any_overlap(&self.medications, &patient.medications)
            || any_overlap(&self.dietary, &patient.dietary_restrictions)
    }
}

/// Type-specific content payload for a block, tagged by the closed set
/// of block types.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum BlockContent {
    Text {
        text: String,
    },
    Image {
        url: String,
        #[serde(default)]
        alt: String,
    },
    Button {
        label: String,
        url: String,
    },
    Divider,
    Spacer,
    HealthInfo {
        heading: String,
        body: String,
        /// Condition this block is about; an exact match against the
        /// patient's conditions marks the block as personalized.
        #[serde(default)]
        condition: Option<String>,
        /// Set by the personalizer, never by the template author.
        #[serde(default)]
        personalized: bool,
        /// Senior-specific supplemental text attached during
        /// personalization for patients over 65.
        #[serde(default)]
        senior_note: Option<String>,
    },
}

/// One addressable, independently includable unit of newsletter content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentBlock {
    pub id: String,
    #[serde(flatten)]
    pub content: BlockContent,
    /// Block-level inclusion rules. All lists empty means the block is
    /// unconditionally included.
    #[serde(default)]
    pub rules: TargetingCriteria,
}

impl ContentBlock {
    #[must_use]
    pub fn included_for(&self, patient: &Patient) -> bool {
        self.rules.is_empty() || self.rules.matches(patient)
    }
}

/// A newsletter template: an ordered list of content blocks plus the
/// campaign-level targeting criteria. Read-only to the delivery core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub blocks: Vec<ContentBlock>,
    #[serde(default)]
    pub targeting: TargetingCriteria,
}

/// Per-recipient, per-attempt record of whether a send was attempted
/// and succeeded.
///
/// Written exactly once per patient per job attempt and never mutated
/// by the core afterwards; the `opened` flag belongs to a separate
/// tracking path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryOutcome {
    pub campaign_id: String,
    pub patient_id: String,
    /// The job id of the attempt this record belongs to.
    pub job_id: String,
    pub sent: bool,
    pub delivered: bool,
    #[serde(default)]
    pub opened: bool,
    #[serde(default)]
    pub error: Option<String>,
    pub recorded_at: u64,
}
