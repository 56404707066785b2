//! Hospital-side patient management.

use crate::{error::ApiResult, middleware::CurrentProfile, response::ApiResponse};
use crate::state::AppState;
use axum::{extract::State, response::Response, Form};
use carebridge_auth::{NationalIdentity, PatientImport};
use serde::Deserialize;
use tracing::info;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct ImportForm {
    pub national_id: String,
    #[validate(length(min = 1, message = "Full name is required"))]
    pub full_name: String,
    #[serde(default)]
    pub phone: Option<String>,
}

/// `POST /hospital/patients/import`
///
/// Creates a placeholder-email patient account for someone found in the
/// national database. The staff member stays signed in as themselves.
pub async fn import_patient(
    State(state): State<AppState>,
    CurrentProfile(staff): CurrentProfile,
    Form(form): Form<ImportForm>,
) -> ApiResult<Response> {
    form.validate()?;

    let import = PatientImport {
        national_id: NationalIdentity::parse(&form.national_id)?,
        full_name: form.full_name.trim().to_string(),
        phone: form.phone.filter(|p| !p.trim().is_empty()),
    };
    let profile = import
        .import(state.sessions.as_ref(), state.profiles.as_ref())
        .await?;

    info!(staff_id = %staff.id, patient_id = %profile.id, "Patient imported");
    Ok(ApiResponse::created(profile))
}
