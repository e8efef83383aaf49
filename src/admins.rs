//! Admin provisioning and lookup. Report counters start at zero and are
//! maintained by the issue lifecycle service from then on.

use serde_json::to_value;

use crate::{
    database::{RecordStore, StoreError, ADMINS},
    error::AppError,
    models::Admin,
    utils::{normalize_email, now_millis},
};

pub struct NewAdmin {
    pub email: String,
    pub officer_name: String,
    pub national_id: String,
    pub department: String,
}

pub async fn create(store: &dyn RecordStore, new: NewAdmin) -> Result<Admin, AppError> {
    let key = normalize_email(&new.email)?;

    if store.get(ADMINS, &key).await?.is_some() {
        return Err(AppError::Conflict("admin"));
    }

    let now = now_millis();
    let admin = Admin {
        email: new.email.trim().to_string(),
        officer_name: new.officer_name,
        national_id: new.national_id,
        department: new.department,
        reports: Default::default(),
        created_at: now,
        updated_at: now,
    };

    store
        .set(ADMINS, &key, to_value(&admin).map_err(StoreError::from)?)
        .await?;

    Ok(admin)
}

pub async fn get(store: &dyn RecordStore, email: &str) -> Result<Admin, AppError> {
    let key = normalize_email(email)?;

    let document = store
        .get(ADMINS, &key)
        .await?
        .ok_or(AppError::NotFound("admin"))?;

    serde_json::from_value(document)
        .map_err(StoreError::from)
        .map_err(AppError::from)
}
