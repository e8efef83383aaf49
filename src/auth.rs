//! # Verification service
//!
//! Email ownership is proven with a short-lived 4-digit code: `send_code`
//! persists a fresh code for `(role, normalized email)` and mails it out,
//! `verify_code` checks a claimed code with expiry and single-use
//! semantics. Expiry is lazy; an expired record sits in the store until the
//! next verification attempt observes and removes it.

use std::sync::Arc;

use rand::Rng;
use serde_json::to_value;
use tracing::info;

use crate::{
    database::{RecordStore, StoreError},
    error::AppError,
    mailer::Mailer,
    models::{Role, VerificationCode},
    utils::{normalize_email, now_millis},
};

/// Codes are valid for 10 minutes from issuance.
pub const CODE_TTL_MILLIS: i64 = 10 * 60 * 1000;

/// Uniformly one of the 9000 four-digit strings. Not cryptographic; the
/// expiry window and single-use consumption bound the exposure.
fn generate_code() -> String {
    rand::rng().random_range(1000..10000).to_string()
}

pub struct VerificationService {
    store: Arc<dyn RecordStore>,
    mailer: Arc<dyn Mailer>,
}

impl VerificationService {
    pub fn new(store: Arc<dyn RecordStore>, mailer: Arc<dyn Mailer>) -> Self {
        Self { store, mailer }
    }

    /// Issues a fresh code, overwriting any pending one for this address
    /// and role. The code is persisted before dispatch: a failed send
    /// surfaces as `Dispatch` but does not roll the stored code back.
    pub async fn send_code(&self, role: Role, email: &str) -> Result<(), AppError> {
        let key = normalize_email(email)?;

        let now = now_millis();
        let record = VerificationCode {
            code: generate_code(),
            created_at: now,
            expires_at: now + CODE_TTL_MILLIS,
        };

        self.store
            .set(role.collection(), &key, to_value(&record).map_err(StoreError::from)?)
            .await?;

        let body = format!(
            "Your OTP is: {}. It will expire in 10 minutes.",
            record.code
        );
        self.mailer.send(email.trim(), role.subject(), &body).await?;

        info!("verification code issued for {key}");

        Ok(())
    }

    /// Four-way outcome: no record, expired (record removed), mismatch
    /// (record kept so the user can retry), or success (record consumed).
    pub async fn verify_code(
        &self,
        role: Role,
        email: &str,
        submitted: &str,
    ) -> Result<(), AppError> {
        let key = normalize_email(email)?;

        let document = self
            .store
            .get(role.collection(), &key)
            .await?
            .ok_or(AppError::CodeNotFoundOrExpired)?;

        let record: VerificationCode =
            serde_json::from_value(document).map_err(StoreError::from)?;

        if now_millis() > record.expires_at {
            self.store.delete(role.collection(), &key).await?;
            return Err(AppError::CodeExpired);
        }

        if submitted.trim() != record.code {
            return Err(AppError::CodeMismatch);
        }

        self.store.delete(role.collection(), &key).await?;

        info!("verification code consumed for {key}");

        Ok(())
    }
}
