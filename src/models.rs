use std::fmt;

use serde::{Deserialize, Serialize};

/// Which directory a verification code belongs to. Citizen and admin codes
/// live in separate collections so one can never satisfy the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Citizen,
    Admin,
}

impl Role {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "citizen" => Some(Role::Citizen),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn collection(&self) -> &'static str {
        match self {
            Role::Citizen => "otp_citizens",
            Role::Admin => "otp_admins",
        }
    }

    pub fn subject(&self) -> &'static str {
        match self {
            Role::Citizen => "Your verification code for citizen sign-in",
            Role::Admin => "Your verification code for admin sign-in",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueStatus {
    Pending,
    Working,
    Solved,
}

impl IssueStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(IssueStatus::Pending),
            "working" => Some(IssueStatus::Working),
            "solved" => Some(IssueStatus::Solved),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueStatus::Pending => "pending",
            IssueStatus::Working => "working",
            IssueStatus::Solved => "solved",
        }
    }
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Citizen {
    pub name: String,
    pub email: String,
    pub phone_no: String,
    pub dob: String,
    pub address: String,
    pub national_id: String,
    pub total_issues_filed: u64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Per-status tally of issues currently assigned to an admin. Denormalized;
/// kept in step with the issues collection by the lifecycle service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportCounters {
    pub pending: u64,
    pub working: u64,
    pub solved: u64,
}

impl ReportCounters {
    pub fn get(&self, status: IssueStatus) -> u64 {
        match status {
            IssueStatus::Pending => self.pending,
            IssueStatus::Working => self.working,
            IssueStatus::Solved => self.solved,
        }
    }

    fn slot(&mut self, status: IssueStatus) -> &mut u64 {
        match status {
            IssueStatus::Pending => &mut self.pending,
            IssueStatus::Working => &mut self.working,
            IssueStatus::Solved => &mut self.solved,
        }
    }

    pub fn increment(&mut self, status: IssueStatus) {
        *self.slot(status) += 1;
    }

    /// Floored at zero; a drifted counter must never go negative.
    pub fn decrement(&mut self, status: IssueStatus) {
        let slot = self.slot(status);
        *slot = slot.saturating_sub(1);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Admin {
    pub email: String,
    pub officer_name: String,
    pub national_id: String,
    pub department: String,
    pub reports: ReportCounters,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub id: String,
    pub title: String,
    pub description: String,
    pub location: String,
    pub image_url: String,
    pub citizen_email: String,
    pub jurisdiction: String,
    pub status: IssueStatus,
    #[serde(default)]
    pub assigned_admin: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationCode {
    pub code: String,
    pub created_at: i64,
    pub expires_at: i64,
}

// Request payloads. Field names mirror the wire format the frontend sends.

#[derive(Deserialize)]
pub struct SendCodeRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct VerifyCodeRequest {
    pub email: String,
    pub otp: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportIssueRequest {
    pub title: String,
    pub description: String,
    pub location: String,
    pub image_url: String,
    pub citizen_email: String,
    pub jurisdiction: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub status: String,
    pub admin_email: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCitizenRequest {
    pub name: String,
    pub email: String,
    pub phone_no: String,
    pub dob: String,
    pub address: String,
    pub national_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAdminRequest {
    pub email: String,
    pub officer_name: String,
    pub national_id: String,
    pub department: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendIssueDetailsRequest {
    pub email: String,
    pub issue_id: String,
}
