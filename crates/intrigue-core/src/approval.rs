//! Approval Gate - the human checkpoint between a draft and publication.
//!
//! ```text
//! pending_review ──approve──► approved ──publish──► (status: published)
//!        │
//!        └──reject(reason)──► rejected
//! ```
//!
//! Nothing leaves `pending_review` on its own.

use chrono::Utc;

use crate::error::ServerError;
use crate::models::issue::{ApprovalStatus, Issue, IssueStatus};
use crate::store::IssueStore;

/// Apply a workflow's approval flag to a freshly produced issue. Returns
/// `true` when the run halts for human review.
pub fn apply_gate(issue: &mut Issue, requires_approval: bool) -> bool {
    issue.status = IssueStatus::Review;
    if requires_approval {
        issue.approval_status = ApprovalStatus::PendingReview;
        true
    } else {
        issue.approval_status = ApprovalStatus::Approved;
        issue.approved_at = Some(issue.last_updated);
        issue.approved_by = Some("workflow".to_string());
        false
    }
}

pub fn approve(issue: &mut Issue, approver: &str) -> Result<(), ServerError> {
    if issue.approval_status != ApprovalStatus::PendingReview {
        return Err(ServerError::Conflict(format!(
            "Issue {} is {}, only pending_review issues can be approved",
            issue.id,
            issue.approval_status.as_str()
        )));
    }
    let now = Utc::now();
    issue.approval_status = ApprovalStatus::Approved;
    issue.approved_at = Some(now);
    issue.approved_by = Some(approver.trim().to_string()).filter(|s| !s.is_empty());
    issue.rejection_reason = None;
    issue.last_updated = now;
    Ok(())
}

pub fn reject(issue: &mut Issue, reason: &str) -> Result<(), ServerError> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(ServerError::BadRequest("A rejection reason is required".to_string()));
    }
    if issue.approval_status != ApprovalStatus::PendingReview {
        return Err(ServerError::Conflict(format!(
            "Issue {} is {}, only pending_review issues can be rejected",
            issue.id,
            issue.approval_status.as_str()
        )));
    }
    issue.approval_status = ApprovalStatus::Rejected;
    issue.rejection_reason = Some(reason.to_string());
    issue.last_updated = Utc::now();
    Ok(())
}

pub fn publish(issue: &mut Issue) -> Result<(), ServerError> {
    if issue.approval_status != ApprovalStatus::Approved {
        return Err(ServerError::Conflict(format!(
            "Issue {} must be approved before publishing (currently {})",
            issue.id,
            issue.approval_status.as_str()
        )));
    }
    if issue.status == IssueStatus::Published {
        return Err(ServerError::Conflict(format!("Issue {} is already published", issue.id)));
    }
    issue.status = IssueStatus::Published;
    issue.last_updated = Utc::now();
    Ok(())
}

/// Store-backed wrappers: load, transition, save.
pub struct ApprovalService {
    issues: IssueStore,
}

impl ApprovalService {
    pub fn new(issues: IssueStore) -> Self {
        Self { issues }
    }

    pub async fn approve(&self, id: &str, approver: &str) -> Result<Issue, ServerError> {
        self.transition(id, |issue| approve(issue, approver)).await
    }

    pub async fn reject(&self, id: &str, reason: &str) -> Result<Issue, ServerError> {
        self.transition(id, |issue| reject(issue, reason)).await
    }

    pub async fn publish(&self, id: &str) -> Result<Issue, ServerError> {
        self.transition(id, publish).await
    }

    async fn transition<F>(&self, id: &str, apply: F) -> Result<Issue, ServerError>
    where
        F: FnOnce(&mut Issue) -> Result<(), ServerError>,
    {
        let mut issue = self
            .issues
            .get(id)
            .await?
            .ok_or_else(|| ServerError::NotFound(format!("Issue {} not found", id)))?;
        apply(&mut issue)?;
        self.issues.save(&issue).await?;
        tracing::info!(
            "[Approval] Issue #{} now {} / {}",
            issue.issue_number,
            issue.approval_status.as_str(),
            issue.status.as_str()
        );
        Ok(issue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::issue::IssueDraft;

    fn pending() -> Issue {
        let mut issue = IssueDraft::default().into_issue(Utc::now());
        apply_gate(&mut issue, true);
        issue
    }

    #[test]
    fn gate_holds_when_approval_required() {
        let mut issue = IssueDraft::default().into_issue(Utc::now());
        assert!(apply_gate(&mut issue, true));
        assert_eq!(issue.approval_status, ApprovalStatus::PendingReview);
        assert_eq!(issue.status, IssueStatus::Review);
    }

    #[test]
    fn gate_approves_but_never_publishes() {
        let mut issue = IssueDraft::default().into_issue(Utc::now());
        assert!(!apply_gate(&mut issue, false));
        assert_eq!(issue.approval_status, ApprovalStatus::Approved);
        assert_eq!(issue.status, IssueStatus::Review);
    }

    #[test]
    fn approve_then_publish() {
        let mut issue = pending();
        approve(&mut issue, "editor@bitcoinintrigue.com").unwrap();
        assert_eq!(issue.approved_by.as_deref(), Some("editor@bitcoinintrigue.com"));
        assert!(issue.approved_at.is_some());
        publish(&mut issue).unwrap();
        assert_eq!(issue.status, IssueStatus::Published);
        assert!(matches!(publish(&mut issue), Err(ServerError::Conflict(_))));
    }

    #[test]
    fn publish_requires_approval() {
        let mut issue = pending();
        assert!(matches!(publish(&mut issue), Err(ServerError::Conflict(_))));
        assert_eq!(issue.status, IssueStatus::Review);
    }

    #[test]
    fn reject_needs_a_reason() {
        let mut issue = pending();
        assert!(matches!(reject(&mut issue, "   "), Err(ServerError::BadRequest(_))));
        reject(&mut issue, "Price figures are stale").unwrap();
        assert_eq!(issue.approval_status, ApprovalStatus::Rejected);
        assert_eq!(issue.rejection_reason.as_deref(), Some("Price figures are stale"));
        assert!(matches!(approve(&mut issue, "x"), Err(ServerError::Conflict(_))));
    }
}
