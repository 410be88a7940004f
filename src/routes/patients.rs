//! Patient record endpoints under `/api/v1/patients`.

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use validator::Validate;

use super::error::ApiError;
#[cfg(feature = "utoipa")]
use super::error::ErrorMessage;
use crate::{
    AppState,
    models::{CreatePatient, NameQuery, Patient},
    services::PatientError,
};

pub const DELETED_MESSAGE: &str = "Patient deleted successfully";

pub fn patient_routes() -> Router<AppState> {
    Router::new()
        .route("/patients", get(list).post(create))
        .route("/patients/female", get(list_female))
        .route("/patients/byName", get(find_by_name))
        .route("/patients/{id}", get(get_by_id).delete(delete))
}

/// 204 for an empty list, otherwise 200 with the list.
fn list_response(patients: Vec<Patient>) -> Response {
    if patients.is_empty() {
        StatusCode::NO_CONTENT.into_response()
    } else {
        Json(patients).into_response()
    }
}

/// Extract and check a patient id from the path.
fn positive_id(id: Result<Path<i64>, PathRejection>) -> Result<i64, ApiError> {
    let Path(id) = id?;
    if id <= 0 {
        return Err(ApiError::bad_request("id must be greater than 0"));
    }
    Ok(id)
}

/// List all patients
///
/// Ordered by last name ascending. Returns 204 when there are no patients.
#[cfg_attr(feature = "utoipa", utoipa::path(
    get,
    path = "/api/v1/patients",
    tag = "patients",
    operation_id = "patient_list",
    responses(
        (status = 200, description = "Patients ordered by last name", body = Vec<Patient>),
        (status = 204, description = "No patients"),
    )
))]
#[tracing::instrument(name = "patients.list", skip(state))]
pub async fn list(State(state): State<AppState>) -> Result<Response, ApiError> {
    let patients = state.services.patients.list_all().await?;
    Ok(list_response(patients))
}

/// List female patients
#[cfg_attr(feature = "utoipa", utoipa::path(
    get,
    path = "/api/v1/patients/female",
    tag = "patients",
    operation_id = "patient_list_female",
    responses(
        (status = 200, description = "Female patients ordered by last name", body = Vec<Patient>),
        (status = 204, description = "No female patients"),
    )
))]
#[tracing::instrument(name = "patients.list_female", skip(state))]
pub async fn list_female(State(state): State<AppState>) -> Result<Response, ApiError> {
    let patients = state.services.patients.list_female().await?;
    Ok(list_response(patients))
}

/// Get a patient by ID
#[cfg_attr(feature = "utoipa", utoipa::path(
    get,
    path = "/api/v1/patients/{id}",
    tag = "patients",
    operation_id = "patient_get",
    params(("id" = i64, Path, description = "Patient ID, greater than 0")),
    responses(
        (status = 200, description = "Patient found", body = Patient),
        (status = 400, description = "Invalid ID", body = ErrorMessage),
        (status = 404, description = "Patient not found", body = ErrorMessage),
    )
))]
#[tracing::instrument(name = "patients.get", skip(state, id))]
pub async fn get_by_id(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Patient>, ApiError> {
    let id = positive_id(id)?;

    state
        .services
        .patients
        .get_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| PatientError::NotFound(id).into())
}

/// Find patients by exact first and last name
#[cfg_attr(feature = "utoipa", utoipa::path(
    get,
    path = "/api/v1/patients/byName",
    tag = "patients",
    operation_id = "patient_find_by_name",
    params(NameQuery),
    responses(
        (status = 200, description = "Matching patients", body = Vec<Patient>),
        (status = 400, description = "Missing or blank name", body = ErrorMessage),
        (status = 404, description = "No patient with that name", body = ErrorMessage),
    )
))]
#[tracing::instrument(name = "patients.find_by_name", skip(state, query))]
pub async fn find_by_name(
    State(state): State<AppState>,
    query: Result<Query<NameQuery>, QueryRejection>,
) -> Result<Json<Vec<Patient>>, ApiError> {
    let Query(query) = query?;
    query.validate()?;

    let patients = state
        .services
        .patients
        .find_by_name(&query.first_name, &query.last_name)
        .await?;

    if patients.is_empty() {
        return Err(ApiError::NotFound(format!(
            "Patient with firstName {} and lastName {} not found",
            query.first_name, query.last_name
        )));
    }

    Ok(Json(patients))
}

/// Create a patient
///
/// Every failed rule is reported; nothing is stored unless all rules pass.
/// `id` and `createdOn` in the body are ignored.
#[cfg_attr(feature = "utoipa", utoipa::path(
    post,
    path = "/api/v1/patients",
    tag = "patients",
    operation_id = "patient_create",
    request_body = CreatePatient,
    responses(
        (status = 201, description = "Patient created", body = Patient),
        (status = 400, description = "Validation failed", body = ErrorMessage),
    )
))]
#[tracing::instrument(name = "patients.create", skip(state, payload))]
pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<CreatePatient>, JsonRejection>,
) -> Result<(StatusCode, Json<Patient>), ApiError> {
    let Json(candidate) = payload?;
    let patient = state.services.patients.create(candidate).await?;
    Ok((StatusCode::CREATED, Json(patient)))
}

/// Delete a patient
#[cfg_attr(feature = "utoipa", utoipa::path(
    delete,
    path = "/api/v1/patients/{id}",
    tag = "patients",
    operation_id = "patient_delete",
    params(("id" = i64, Path, description = "Patient ID, greater than 0")),
    responses(
        (status = 200, description = "Patient deleted", body = String, example = json!(DELETED_MESSAGE)),
        (status = 400, description = "Invalid ID", body = ErrorMessage),
        (status = 404, description = "Patient not found", body = ErrorMessage),
    )
))]
#[tracing::instrument(name = "patients.delete", skip(state, id))]
pub async fn delete(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<&'static str>, ApiError> {
    let id = positive_id(id)?;
    state.services.patients.delete(id).await?;
    Ok(Json(DELETED_MESSAGE))
}
