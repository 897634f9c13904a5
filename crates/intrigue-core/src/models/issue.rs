use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IssueStatus {
    Review,
    Published,
}

impl IssueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Review => "review",
            Self::Published => "published",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "published" => Self::Published,
            _ => Self::Review,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    PendingReview,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingReview => "pending_review",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "approved" => Self::Approved,
            "rejected" => Self::Rejected,
            _ => Self::PendingReview,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Intro {
    #[serde(default, deserialize_with = "null_as_default")]
    pub headline: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub body: String,
}

/// One story inside an issue. Stories have no lifecycle of their own.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub headline: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub paragraphs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub take: Option<String>,
}

/// A newsletter issue - the artifact a workflow run produces.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub id: String,
    pub issue_number: i64,
    /// Display date, e.g. "October 18, 2026".
    pub date: String,
    pub intro: Intro,
    pub stories: Vec<Story>,
    pub status: IssueStatus,
    pub approval_status: ApprovalStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    pub last_updated: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_for: Option<DateTime<Utc>>,
}

/// The loosely-shaped draft that agents pass between steps.
///
/// Every field is optional so partially-formed model output still
/// deserializes; `into_issue` fills the gaps.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct IssueDraft {
    #[serde(default)]
    pub issue_number: Option<i64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub intro: Intro,
    #[serde(default, deserialize_with = "null_as_default")]
    pub stories: Vec<Story>,
}

/// Models emit `null` for fields they have nothing for; treat it as absent.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl IssueDraft {
    /// Stamp the draft into an issue. `issue_number` 0 means "assign on save".
    pub fn into_issue(self, now: DateTime<Utc>) -> Issue {
        let stories = self
            .stories
            .into_iter()
            .map(|mut s| {
                if s.id.is_empty() {
                    s.id = uuid::Uuid::new_v4().to_string();
                }
                s
            })
            .collect();

        Issue {
            id: uuid::Uuid::new_v4().to_string(),
            issue_number: self.issue_number.unwrap_or(0),
            date: display_date(now),
            intro: self.intro,
            stories,
            status: IssueStatus::Review,
            approval_status: ApprovalStatus::PendingReview,
            approved_at: None,
            approved_by: None,
            rejection_reason: None,
            last_updated: now,
            scheduled_for: None,
        }
    }
}

pub fn display_date(at: DateTime<Utc>) -> String {
    at.format("%B %-d, %Y").to_string()
}

/// Partial update for human edits in the admin panel.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateIssueInput {
    pub issue_number: Option<i64>,
    pub date: Option<String>,
    pub intro: Option<Intro>,
    pub stories: Option<Vec<Story>>,
    pub scheduled_for: Option<DateTime<Utc>>,
}
