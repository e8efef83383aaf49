//! HTTP handlers. Request parsing and field validation happen here; every
//! outcome is wrapped in the `{success, data?/error?, message?}` envelope.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};

use crate::{
    admins,
    citizens,
    error::AppError,
    images::MAX_IMAGE_BYTES,
    issues::NewIssue,
    models::{
        IssueStatus, NewAdminRequest, NewCitizenRequest, ReportIssueRequest, Role,
        SendCodeRequest, SendIssueDetailsRequest, UpdateStatusRequest, VerifyCodeRequest,
    },
    state::SharedState,
    utils::{require_email, require_national_id, require_text, require_url},
};

fn ok<T: Serialize>(data: T) -> Json<Value> {
    Json(json!({ "success": true, "data": data }))
}

fn created<T: Serialize>(message: &str, data: T) -> (StatusCode, Json<Value>) {
    (
        StatusCode::CREATED,
        Json(json!({ "success": true, "message": message, "data": data })),
    )
}

fn parse_role(raw: &str) -> Result<Role, AppError> {
    Role::parse(raw)
        .ok_or_else(|| AppError::Validation("role must be citizen or admin".to_string()))
}

fn parse_status(raw: &str) -> Result<IssueStatus, AppError> {
    IssueStatus::parse(raw).ok_or_else(|| {
        AppError::Validation("status must be one of pending, working, solved".to_string())
    })
}

pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "success": true,
        "message": "Server is running successfully",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

pub async fn send_code_handler(
    Path(role): Path<String>,
    State(state): State<SharedState>,
    Json(payload): Json<SendCodeRequest>,
) -> Result<Json<Value>, AppError> {
    let role = parse_role(&role)?;
    let email = require_email("email", &payload.email)?;

    state.verification.send_code(role, &email).await?;

    Ok(Json(json!({
        "success": true,
        "message": "OTP sent successfully",
        "email": email,
    })))
}

pub async fn verify_code_handler(
    Path(role): Path<String>,
    State(state): State<SharedState>,
    Json(payload): Json<VerifyCodeRequest>,
) -> Result<Json<Value>, AppError> {
    let role = parse_role(&role)?;
    let email = require_email("email", &payload.email)?;
    let otp = require_text("otp", &payload.otp)?;

    state.verification.verify_code(role, &email, &otp).await?;

    Ok(Json(json!({
        "success": true,
        "message": "OTP verified successfully",
        "email": email,
    })))
}

pub async fn send_issue_details_handler(
    State(state): State<SharedState>,
    Json(payload): Json<SendIssueDetailsRequest>,
) -> Result<Json<Value>, AppError> {
    let email = require_email("email", &payload.email)?;
    let issue_id = require_text("issueId", &payload.issue_id)?;

    state.issues.send_issue_details(&email, &issue_id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Issue details sent successfully",
        "email": email,
        "issueId": issue_id,
    })))
}

pub async fn report_issue_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ReportIssueRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let new = NewIssue {
        title: require_text("title", &payload.title)?,
        description: require_text("description", &payload.description)?,
        location: require_text("location", &payload.location)?,
        image_url: require_url("imageUrl", &payload.image_url)?,
        citizen_email: require_email("citizenEmail", &payload.citizen_email)?,
        jurisdiction: require_text("jurisdiction", &payload.jurisdiction)?,
    };

    let issue = state.issues.report_issue(new).await?;

    Ok(created("Issue reported successfully", issue))
}

pub async fn list_issues_handler(
    State(state): State<SharedState>,
) -> Result<Json<Value>, AppError> {
    Ok(ok(state.issues.list_all_issues().await?))
}

pub async fn get_issue_handler(
    Path(id): Path<String>,
    State(state): State<SharedState>,
) -> Result<Json<Value>, AppError> {
    Ok(ok(state.issues.get_issue(&id).await?))
}

pub async fn issues_by_citizen_handler(
    Path(email): Path<String>,
    State(state): State<SharedState>,
) -> Result<Json<Value>, AppError> {
    Ok(ok(state.issues.list_issues_by_citizen(&email).await?))
}

pub async fn update_status_handler(
    Path(id): Path<String>,
    State(state): State<SharedState>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let status = parse_status(&payload.status)?;
    let admin_email = require_email("adminEmail", &payload.admin_email)?;

    let issue = state
        .issues
        .update_issue_status(&id, status, &admin_email)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Issue status updated successfully",
        "data": issue,
    })))
}

pub async fn create_citizen_handler(
    State(state): State<SharedState>,
    Json(payload): Json<NewCitizenRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let new = citizens::NewCitizen {
        name: require_text("name", &payload.name)?,
        email: require_email("email", &payload.email)?,
        phone_no: require_text("phoneNo", &payload.phone_no)?,
        dob: require_text("dob", &payload.dob)?,
        address: require_text("address", &payload.address)?,
        national_id: require_national_id(&payload.national_id)?,
    };

    let citizen = citizens::create(state.store.as_ref(), new).await?;

    Ok(created("Citizen created successfully", citizen))
}

pub async fn get_citizen_handler(
    Path(email): Path<String>,
    State(state): State<SharedState>,
) -> Result<Json<Value>, AppError> {
    Ok(ok(citizens::get(state.store.as_ref(), &email).await?))
}

pub async fn create_admin_handler(
    State(state): State<SharedState>,
    Json(payload): Json<NewAdminRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let new = admins::NewAdmin {
        email: require_email("email", &payload.email)?,
        officer_name: require_text("officerName", &payload.officer_name)?,
        national_id: require_national_id(&payload.national_id)?,
        department: require_text("department", &payload.department)?,
    };

    let admin = admins::create(state.store.as_ref(), new).await?;

    Ok(created("Admin created successfully", admin))
}

pub async fn get_admin_handler(
    Path(email): Path<String>,
    State(state): State<SharedState>,
) -> Result<Json<Value>, AppError> {
    Ok(ok(admins::get(state.store.as_ref(), &email).await?))
}

pub async fn upload_image_handler(
    State(state): State<SharedState>,
    mut multipart: Multipart,
) -> Result<Json<Value>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| AppError::Validation("malformed multipart body".to_string()))?
    {
        if field.name() != Some("image") {
            continue;
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|_| AppError::Validation("image exceeds the 5 MB limit".to_string()))?;

        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(AppError::Validation(
                "image exceeds the 5 MB limit".to_string(),
            ));
        }

        let stored = state.images.store(bytes.to_vec(), "issue-reports").await?;

        return Ok(Json(json!({
            "success": true,
            "message": "Image uploaded successfully",
            "imageUrl": stored.url,
            "publicId": stored.id,
        })));
    }

    Err(AppError::Validation("No image file provided".to_string()))
}
