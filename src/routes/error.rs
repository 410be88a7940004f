//! Error payload returned by the patient API.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{NaiveDateTime, Utc};
use serde::Serialize;
use validator::ValidationErrors;

use crate::{db::DbError, observability::metrics, services::PatientError};

/// JSON body of every API error.
///
/// `description` is left empty here and filled with `uri=<path>` by the
/// request middleware.
#[derive(Debug, Serialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ErrorMessage {
    #[cfg_attr(feature = "utoipa", schema(example = 404))]
    pub status_code: u16,
    /// UTC timestamp with millisecond precision
    #[serde(serialize_with = "serialize_timestamp")]
    #[cfg_attr(feature = "utoipa", schema(value_type = String, example = "2024-10-18T10:00:00.123"))]
    pub timestamp: NaiveDateTime,
    #[cfg_attr(feature = "utoipa", schema(example = json!(["Patient with Id 1 not found"])))]
    pub messages: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "utoipa", schema(example = "uri=/api/v1/patients/1"))]
    pub description: Option<String>,
}

fn serialize_timestamp<S: serde::Serializer>(
    ts: &NaiveDateTime,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&ts.format("%Y-%m-%dT%H:%M:%S%.3f"))
}

impl ErrorMessage {
    pub fn new(status: StatusCode, messages: Vec<String>) -> Self {
        Self {
            status_code: status.as_u16(),
            timestamp: Utc::now().naive_utc(),
            messages,
            description: None,
        }
    }
}

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(Vec<String>),
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(vec![message.into()])
    }
}

impl From<PatientError> for ApiError {
    fn from(err: PatientError) -> Self {
        match err {
            PatientError::Validation(violations) => ApiError::BadRequest(
                violations.iter().map(|v| v.message.to_string()).collect(),
            ),
            PatientError::NotFound(_) => ApiError::NotFound(err.to_string()),
            PatientError::Database(db_err) => db_err.into(),
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound => ApiError::NotFound("Resource not found".to_string()),
            _ => {
                tracing::error!(error = %err, "Database error");
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        ApiError::BadRequest(
            fields
                .into_iter()
                .flat_map(|(field, errs)| {
                    errs.iter().map(move |e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| format!("{} is invalid", field))
                    })
                })
                .collect(),
        )
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, messages) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", vec![msg]),
            ApiError::BadRequest(msgs) => (StatusCode::BAD_REQUEST, "bad_request", msgs),
            ApiError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", vec![msg])
            }
        };

        metrics::record_api_error(kind);

        (status, Json(ErrorMessage::new(status, messages))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use http_body_util::BodyExt;
    use serde_json::Value;

    use super::*;
    use crate::validation::{BIRTH_DAY_REQUIRED, Violation};

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_timestamp_has_millisecond_precision() {
        let message = ErrorMessage {
            status_code: 404,
            timestamp: NaiveDate::from_ymd_opt(2024, 10, 18)
                .unwrap()
                .and_hms_micro_opt(10, 0, 0, 123_456)
                .unwrap(),
            messages: vec!["gone".into()],
            description: None,
        };
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["timestamp"], "2024-10-18T10:00:00.123");
        assert_eq!(json["statusCode"], 404);
        assert!(json.get("description").is_none());
    }

    #[tokio::test]
    async fn test_not_found_response() {
        let response = ApiError::from(PatientError::NotFound(3)).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let json = body_json(response).await;
        assert_eq!(json["statusCode"], 404);
        assert_eq!(json["messages"][0], "Patient with Id 3 not found");
    }

    #[tokio::test]
    async fn test_validation_response_lists_every_message() {
        let err = PatientError::Validation(vec![
            Violation {
                field: "birthDay",
                message: BIRTH_DAY_REQUIRED,
            },
            Violation {
                field: "birthDay",
                message: "Patient age should be greater than 18",
            },
        ]);
        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = body_json(response).await;
        assert_eq!(
            json["messages"],
            serde_json::json!([BIRTH_DAY_REQUIRED, "Patient age should be greater than 18"])
        );
    }

    #[tokio::test]
    async fn test_database_error_is_internal() {
        let response = ApiError::from(DbError::Internal("boom".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = body_json(response).await;
        assert_eq!(json["statusCode"], 500);
        assert_eq!(json["messages"][0], "Internal error: boom");
    }
}
