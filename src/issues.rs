//! # Issue lifecycle service
//!
//! Issues are created by registered citizens in state `pending` and move
//! through `pending → working → solved` under admin action. Each admin
//! carries a denormalized per-status tally of the issues assigned to them;
//! every transition moves one count off the previous owner (if any) and
//! onto the acting admin, so the tallies track `assignedAdmin` across
//! reassignment.
//!
//! The counter bookkeeping is a plain read-modify-write with no
//! conditional update; concurrent transitions of the same issue can still
//! race (see DESIGN.md).

use std::sync::Arc;

use chrono::DateTime;
use serde_json::{json, to_value, Value};
use tracing::{info, warn};

use crate::{
    database::{RecordStore, StoreError, ADMINS, CITIZENS, ISSUES},
    error::AppError,
    mailer::Mailer,
    models::{Admin, Citizen, Issue, IssueStatus},
    utils::{generate_issue_id, normalize_email, now_millis},
};

/// Validated input for a new issue. The HTTP layer owns field validation;
/// this is what survives it.
pub struct NewIssue {
    pub title: String,
    pub description: String,
    pub location: String,
    pub image_url: String,
    pub citizen_email: String,
    pub jurisdiction: String,
}

fn decode<T: serde::de::DeserializeOwned>(document: Value) -> Result<T, AppError> {
    serde_json::from_value(document)
        .map_err(StoreError::from)
        .map_err(AppError::from)
}

pub struct IssueService {
    store: Arc<dyn RecordStore>,
    mailer: Arc<dyn Mailer>,
}

impl IssueService {
    pub fn new(store: Arc<dyn RecordStore>, mailer: Arc<dyn Mailer>) -> Self {
        Self { store, mailer }
    }

    /// Creates a `pending`, unassigned issue owned by a registered citizen
    /// and bumps that citizen's filed-issues counter. Unregistered
    /// reporters are rejected before anything is written.
    pub async fn report_issue(&self, new: NewIssue) -> Result<Issue, AppError> {
        let citizen_key = normalize_email(&new.citizen_email)?;

        let citizen: Citizen = decode(
            self.store
                .get(CITIZENS, &citizen_key)
                .await?
                .ok_or(AppError::NotFound("citizen"))?,
        )?;

        // Same-second reports share a timestamp; regenerate on the rare
        // suffix collision instead of silently overwriting.
        let mut id = generate_issue_id();
        while self.store.get(ISSUES, &id).await?.is_some() {
            id = generate_issue_id();
        }

        let now = now_millis();
        let issue = Issue {
            id,
            title: new.title,
            description: new.description,
            location: new.location,
            image_url: new.image_url,
            citizen_email: new.citizen_email.trim().to_string(),
            jurisdiction: new.jurisdiction,
            status: IssueStatus::Pending,
            assigned_admin: None,
            created_at: now,
            updated_at: now,
        };

        self.store
            .set(ISSUES, &issue.id, to_value(&issue).map_err(StoreError::from)?)
            .await?;

        self.store
            .update(
                CITIZENS,
                &citizen_key,
                json!({
                    "totalIssuesFiled": citizen.total_issues_filed + 1,
                    "updatedAt": now,
                }),
            )
            .await?;

        info!("issue {} reported by {citizen_key}", issue.id);

        Ok(issue)
    }

    /// Transitions an issue and reassigns it to the acting admin. The
    /// previous owner's counter for the old status is decremented (floored
    /// at zero); the acting admin's counter for the new status is
    /// incremented. An issue that was never assigned decrements nobody.
    pub async fn update_issue_status(
        &self,
        issue_id: &str,
        new_status: IssueStatus,
        acting_admin_email: &str,
    ) -> Result<Issue, AppError> {
        let acting_key = normalize_email(acting_admin_email)?;

        let mut acting: Admin = decode(
            self.store
                .get(ADMINS, &acting_key)
                .await?
                .ok_or(AppError::NotFound("admin"))?,
        )?;

        let mut issue: Issue = decode(
            self.store
                .get(ISSUES, issue_id)
                .await?
                .ok_or(AppError::NotFound("issue"))?,
        )?;

        let old_status = issue.status;
        let previous_admin = issue.assigned_admin.clone();
        let acting_email = acting.email.clone();

        let now = now_millis();
        issue.status = new_status;
        issue.assigned_admin = Some(acting_email.clone());
        issue.updated_at = now;

        self.store
            .update(
                ISSUES,
                issue_id,
                json!({
                    "status": new_status,
                    "assignedAdmin": acting_email,
                    "updatedAt": now,
                }),
            )
            .await?;

        match previous_admin {
            Some(prev_email) => {
                let prev_key = normalize_email(&prev_email)?;

                if prev_key == acting_key {
                    acting.reports.decrement(old_status);
                } else {
                    self.shed_previous_owner(&prev_key, old_status, now).await?;
                }
            }
            // First assignment: nothing was ever counted for this issue.
            None => {}
        }

        acting.reports.increment(new_status);

        self.store
            .update(
                ADMINS,
                &acting_key,
                json!({
                    "reports": to_value(&acting.reports).map_err(StoreError::from)?,
                    "updatedAt": now,
                }),
            )
            .await?;

        info!("issue {issue_id} moved {old_status} -> {new_status} by {acting_key}");

        Ok(issue)
    }

    async fn shed_previous_owner(
        &self,
        prev_key: &str,
        old_status: IssueStatus,
        now: i64,
    ) -> Result<(), AppError> {
        let Some(document) = self.store.get(ADMINS, prev_key).await? else {
            // Dangling back-reference: the previous owner's record is gone.
            warn!("previously assigned admin {prev_key} missing, skipping decrement");
            return Ok(());
        };

        let mut previous: Admin = decode(document)?;
        previous.reports.decrement(old_status);

        self.store
            .update(
                ADMINS,
                prev_key,
                json!({
                    "reports": to_value(&previous.reports).map_err(StoreError::from)?,
                    "updatedAt": now,
                }),
            )
            .await?;

        Ok(())
    }

    pub async fn get_issue(&self, issue_id: &str) -> Result<Issue, AppError> {
        decode(
            self.store
                .get(ISSUES, issue_id)
                .await?
                .ok_or(AppError::NotFound("issue"))?,
        )
    }

    /// Issues are queried by the owner's original (unnormalized) email,
    /// which is what the records carry in `citizenEmail`.
    pub async fn list_issues_by_citizen(&self, email: &str) -> Result<Vec<Issue>, AppError> {
        let documents = self
            .store
            .query_by_equality(ISSUES, "citizenEmail", &json!(email.trim()))
            .await?;

        documents.into_iter().map(decode).collect()
    }

    pub async fn list_all_issues(&self) -> Result<Vec<Issue>, AppError> {
        let documents = self.store.list(ISSUES).await?;

        documents.into_iter().map(decode).collect()
    }

    /// Mails a confirmation with the issue's details to the given address.
    pub async fn send_issue_details(&self, email: &str, issue_id: &str) -> Result<(), AppError> {
        let issue = self.get_issue(issue_id).await?;

        let reported_on = DateTime::from_timestamp_millis(issue.created_at)
            .map(|t| t.to_rfc2822())
            .unwrap_or_default();

        let subject = format!("Issue Report Confirmation - {}", issue.id);
        let body = format!(
            "Thank you for reporting your issue. Here are the details:\n\n\
             Issue ID: {}\n\
             Title: {}\n\
             Description: {}\n\
             Location: {}\n\
             Jurisdiction: {}\n\
             Status: {}\n\
             Reported On: {}\n\n\
             We'll notify you once there's an update on your issue.\n\
             Best Regards,\nCity Service Portal Team",
            issue.id,
            issue.title,
            issue.description,
            issue.location,
            issue.jurisdiction,
            issue.status,
            reported_on,
        );

        self.mailer.send(email.trim(), &subject, &body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{database::MemoryStore, mailer::doubles::RecordingMailer};

    const CITIZEN: &str = "asha@example.com";
    const CITIZEN_KEY: &str = "asha@example_com";
    const ADMIN_A: &str = "officer.a@city.gov";
    const ADMIN_A_KEY: &str = "officer_a@city_gov";
    const ADMIN_B: &str = "officer.b@city.gov";
    const ADMIN_B_KEY: &str = "officer_b@city_gov";

    fn service() -> (Arc<MemoryStore>, Arc<RecordingMailer>, IssueService) {
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(RecordingMailer::default());
        let service = IssueService::new(store.clone(), mailer.clone());

        (store, mailer, service)
    }

    async fn seed_citizen(store: &MemoryStore, email: &str, key: &str) {
        let citizen = Citizen {
            name: "Asha".to_string(),
            email: email.to_string(),
            phone_no: "9876543210".to_string(),
            dob: "1990-01-01".to_string(),
            address: "12 MG Road".to_string(),
            national_id: "123456789012".to_string(),
            total_issues_filed: 0,
            created_at: now_millis(),
            updated_at: now_millis(),
        };
        store.set(CITIZENS, key, to_value(&citizen).unwrap()).await.unwrap();
    }

    async fn seed_admin(store: &MemoryStore, email: &str, key: &str) {
        let admin = Admin {
            email: email.to_string(),
            officer_name: "Officer".to_string(),
            national_id: "210987654321".to_string(),
            department: "Sanitation".to_string(),
            reports: Default::default(),
            created_at: now_millis(),
            updated_at: now_millis(),
        };
        store.set(ADMINS, key, to_value(&admin).unwrap()).await.unwrap();
    }

    async fn admin_reports(store: &MemoryStore, key: &str) -> crate::models::ReportCounters {
        let doc = store.get(ADMINS, key).await.unwrap().unwrap();
        serde_json::from_value(doc["reports"].clone()).unwrap()
    }

    fn new_issue(citizen_email: &str) -> NewIssue {
        NewIssue {
            title: "Broken streetlight".to_string(),
            description: "Dark stretch near the park".to_string(),
            location: "5th Cross, Indiranagar".to_string(),
            image_url: "https://images.example.com/light.jpg".to_string(),
            citizen_email: citizen_email.to_string(),
            jurisdiction: "BBMP East".to_string(),
        }
    }

    #[tokio::test]
    async fn unregistered_citizen_cannot_report() {
        let (store, _, service) = service();

        let result = service.report_issue(new_issue(CITIZEN)).await;
        assert!(matches!(result, Err(AppError::NotFound("citizen"))));

        assert!(store.list(ISSUES).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reporting_creates_a_pending_issue_and_bumps_the_counter() {
        let (store, _, service) = service();
        seed_citizen(&store, CITIZEN, CITIZEN_KEY).await;

        let issue = service.report_issue(new_issue(CITIZEN)).await.unwrap();

        assert_eq!(issue.status, IssueStatus::Pending);
        assert!(issue.assigned_admin.is_none());
        assert!(issue.id.starts_with("IS-"));

        let citizen = store.get(CITIZENS, CITIZEN_KEY).await.unwrap().unwrap();
        assert_eq!(citizen["totalIssuesFiled"], 1);

        let fetched = service.get_issue(&issue.id).await.unwrap();
        assert_eq!(fetched.title, issue.title);
    }

    #[tokio::test]
    async fn first_transition_assigns_and_counts_only_the_new_status() {
        let (store, _, service) = service();
        seed_citizen(&store, CITIZEN, CITIZEN_KEY).await;
        seed_admin(&store, ADMIN_A, ADMIN_A_KEY).await;

        let issue = service.report_issue(new_issue(CITIZEN)).await.unwrap();
        let updated = service
            .update_issue_status(&issue.id, IssueStatus::Working, ADMIN_A)
            .await
            .unwrap();

        assert_eq!(updated.status, IssueStatus::Working);
        assert_eq!(updated.assigned_admin.as_deref(), Some(ADMIN_A));

        let reports = admin_reports(&store, ADMIN_A_KEY).await;
        assert_eq!(reports.working, 1);
        assert_eq!(reports.pending, 0);
        assert_eq!(reports.solved, 0);
    }

    #[tokio::test]
    async fn full_lifecycle_under_one_admin_counts_one_issue() {
        let (store, _, service) = service();
        seed_citizen(&store, CITIZEN, CITIZEN_KEY).await;
        seed_admin(&store, ADMIN_A, ADMIN_A_KEY).await;

        let issue = service.report_issue(new_issue(CITIZEN)).await.unwrap();

        service
            .update_issue_status(&issue.id, IssueStatus::Working, ADMIN_A)
            .await
            .unwrap();
        service
            .update_issue_status(&issue.id, IssueStatus::Solved, ADMIN_A)
            .await
            .unwrap();

        let reports = admin_reports(&store, ADMIN_A_KEY).await;
        assert_eq!(reports.pending, 0);
        assert_eq!(reports.working, 0);
        assert_eq!(reports.solved, 1);
    }

    #[tokio::test]
    async fn reassignment_moves_the_count_off_the_previous_owner() {
        let (store, _, service) = service();
        seed_citizen(&store, CITIZEN, CITIZEN_KEY).await;
        seed_admin(&store, ADMIN_A, ADMIN_A_KEY).await;
        seed_admin(&store, ADMIN_B, ADMIN_B_KEY).await;

        let issue = service.report_issue(new_issue(CITIZEN)).await.unwrap();

        service
            .update_issue_status(&issue.id, IssueStatus::Working, ADMIN_A)
            .await
            .unwrap();
        service
            .update_issue_status(&issue.id, IssueStatus::Solved, ADMIN_B)
            .await
            .unwrap();

        let a = admin_reports(&store, ADMIN_A_KEY).await;
        assert_eq!((a.pending, a.working, a.solved), (0, 0, 0));

        let b = admin_reports(&store, ADMIN_B_KEY).await;
        assert_eq!((b.pending, b.working, b.solved), (0, 0, 1));
    }

    #[tokio::test]
    async fn decrement_floors_at_zero() {
        let (store, _, service) = service();
        seed_citizen(&store, CITIZEN, CITIZEN_KEY).await;
        seed_admin(&store, ADMIN_A, ADMIN_A_KEY).await;

        // Issue assigned to A on paper, but A's counters were never bumped.
        let issue = service.report_issue(new_issue(CITIZEN)).await.unwrap();
        store
            .update(ISSUES, &issue.id, json!({"assignedAdmin": ADMIN_A}))
            .await
            .unwrap();

        service
            .update_issue_status(&issue.id, IssueStatus::Working, ADMIN_A)
            .await
            .unwrap();

        let reports = admin_reports(&store, ADMIN_A_KEY).await;
        assert_eq!(reports.pending, 0);
        assert_eq!(reports.working, 1);
    }

    #[tokio::test]
    async fn missing_previous_owner_skips_the_decrement() {
        let (store, _, service) = service();
        seed_citizen(&store, CITIZEN, CITIZEN_KEY).await;
        seed_admin(&store, ADMIN_B, ADMIN_B_KEY).await;

        let issue = service.report_issue(new_issue(CITIZEN)).await.unwrap();
        store
            .update(
                ISSUES,
                &issue.id,
                json!({"assignedAdmin": "gone@city.gov", "status": "working"}),
            )
            .await
            .unwrap();

        let updated = service
            .update_issue_status(&issue.id, IssueStatus::Solved, ADMIN_B)
            .await
            .unwrap();

        assert_eq!(updated.assigned_admin.as_deref(), Some(ADMIN_B));
        let b = admin_reports(&store, ADMIN_B_KEY).await;
        assert_eq!(b.solved, 1);
    }

    #[tokio::test]
    async fn unknown_admin_or_issue_is_not_found() {
        let (store, _, service) = service();
        seed_citizen(&store, CITIZEN, CITIZEN_KEY).await;

        let issue = service.report_issue(new_issue(CITIZEN)).await.unwrap();

        let no_admin = service
            .update_issue_status(&issue.id, IssueStatus::Working, ADMIN_A)
            .await;
        assert!(matches!(no_admin, Err(AppError::NotFound("admin"))));

        seed_admin(&store, ADMIN_A, ADMIN_A_KEY).await;
        let no_issue = service
            .update_issue_status("IS-00000000000000000", IssueStatus::Working, ADMIN_A)
            .await;
        assert!(matches!(no_issue, Err(AppError::NotFound("issue"))));
    }

    #[tokio::test]
    async fn citizen_listing_matches_on_the_original_email() {
        let (store, _, service) = service();
        seed_citizen(&store, CITIZEN, CITIZEN_KEY).await;
        seed_citizen(&store, "other@example.com", "other@example_com").await;

        service.report_issue(new_issue(CITIZEN)).await.unwrap();
        service.report_issue(new_issue(CITIZEN)).await.unwrap();
        service.report_issue(new_issue("other@example.com")).await.unwrap();

        let mine = service.list_issues_by_citizen(CITIZEN).await.unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|i| i.citizen_email == CITIZEN));

        let all = service.list_all_issues().await.unwrap();
        assert_eq!(all.len(), 3);

        let nobody = service.list_issues_by_citizen("ghost@example.com").await.unwrap();
        assert!(nobody.is_empty());
    }

    #[tokio::test]
    async fn issue_details_mail_carries_the_issue_fields() {
        let (store, mailer, service) = service();
        seed_citizen(&store, CITIZEN, CITIZEN_KEY).await;

        let issue = service.report_issue(new_issue(CITIZEN)).await.unwrap();
        service.send_issue_details(CITIZEN, &issue.id).await.unwrap();

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].subject.contains(&issue.id));
        assert!(sent[0].body.contains("Broken streetlight"));

        drop(sent);
        let missing = service.send_issue_details(CITIZEN, "IS-0").await;
        assert!(matches!(missing, Err(AppError::NotFound("issue"))));
    }
}
