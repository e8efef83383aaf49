//! Citizen self-registration and lookup.

use serde_json::to_value;

use crate::{
    database::{RecordStore, StoreError, CITIZENS},
    error::AppError,
    models::Citizen,
    utils::{normalize_email, now_millis},
};

pub struct NewCitizen {
    pub name: String,
    pub email: String,
    pub phone_no: String,
    pub dob: String,
    pub address: String,
    pub national_id: String,
}

pub async fn create(store: &dyn RecordStore, new: NewCitizen) -> Result<Citizen, AppError> {
    let key = normalize_email(&new.email)?;

    if store.get(CITIZENS, &key).await?.is_some() {
        return Err(AppError::Conflict("citizen"));
    }

    let now = now_millis();
    let citizen = Citizen {
        name: new.name,
        email: new.email.trim().to_string(),
        phone_no: new.phone_no,
        dob: new.dob,
        address: new.address,
        national_id: new.national_id,
        total_issues_filed: 0,
        created_at: now,
        updated_at: now,
    };

    store
        .set(CITIZENS, &key, to_value(&citizen).map_err(StoreError::from)?)
        .await?;

    Ok(citizen)
}

pub async fn get(store: &dyn RecordStore, email: &str) -> Result<Citizen, AppError> {
    let key = normalize_email(email)?;

    let document = store
        .get(CITIZENS, &key)
        .await?
        .ok_or(AppError::NotFound("citizen"))?;

    serde_json::from_value(document)
        .map_err(StoreError::from)
        .map_err(AppError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;

    fn registration() -> NewCitizen {
        NewCitizen {
            name: "Asha Rao".to_string(),
            email: "asha.rao@example.com".to_string(),
            phone_no: "9876543210".to_string(),
            dob: "1990-01-01".to_string(),
            address: "12 MG Road".to_string(),
            national_id: "123456789012".to_string(),
        }
    }

    #[tokio::test]
    async fn registers_once_then_conflicts() {
        let store = MemoryStore::new();

        let citizen = create(&store, registration()).await.unwrap();
        assert_eq!(citizen.total_issues_filed, 0);
        assert_eq!(citizen.email, "asha.rao@example.com");

        let duplicate = create(&store, registration()).await;
        assert!(matches!(duplicate, Err(AppError::Conflict("citizen"))));
    }

    #[tokio::test]
    async fn lookup_uses_the_normalized_key() {
        let store = MemoryStore::new();
        create(&store, registration()).await.unwrap();

        let found = get(&store, "asha.rao@example.com").await.unwrap();
        assert_eq!(found.name, "Asha Rao");

        let missing = get(&store, "nobody@example.com").await;
        assert!(matches!(missing, Err(AppError::NotFound("citizen"))));
    }
}
