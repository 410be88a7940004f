use utoipa::OpenApi;

use crate::{
    models,
    routes::{error::ErrorMessage, health, patients},
};

/// OpenAPI documentation for the patient records service
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Patient Records API",
        version = "0.1.0",
        description = r#"**Patient Records** stores basic demographic records for adult patients.

## Overview

All record endpoints live under `/api/v1/patients`:

- `GET /api/v1/patients` lists every patient, ordered by last name.
- `GET /api/v1/patients/female` lists female patients.
- `GET /api/v1/patients/byName?firstName=..&lastName=..` finds exact name matches.
- `GET /api/v1/patients/{id}` fetches one patient.
- `POST /api/v1/patients` creates a patient.
- `DELETE /api/v1/patients/{id}` deletes a patient.

List endpoints answer `204 No Content` when nothing matches.

## Validation

A new patient must have:

- `firstName` and `lastName` between 2 and 100 characters
- `gender` of `MALE`, `FEMALE` or `OTHER`
- `birthDay` in the past, at least 18 years ago

Every failed rule is reported in a single response.

## Errors

Failures share one body shape:

```json
{
  "statusCode": 404,
  "timestamp": "2024-10-18T09:12:44.512",
  "messages": ["Patient with Id 7 not found"],
  "description": "uri=/api/v1/patients/7"
}
```

## Retention

Records older than the configured retention period are purged on a cron
schedule. The purge runs in the background and has no HTTP surface.
"#,
    ),
    tags(
        (name = "patients", description = "Patient record management"),
        (name = "health", description = "Liveness, readiness and subsystem health"),
    ),
    paths(
        patients::list,
        patients::list_female,
        patients::get_by_id,
        patients::find_by_name,
        patients::create,
        patients::delete,
        health::health_check,
        health::liveness,
        health::readiness,
    ),
    components(schemas(
        models::Patient,
        models::CreatePatient,
        models::Gender,
        ErrorMessage,
        health::HealthStatus,
        health::SubsystemStatus,
        health::ComponentStatus,
    )),
    modifiers(&TagGroupsAddon)
)]
pub struct ApiDoc;

impl ApiDoc {
    /// Build the full OpenAPI spec.
    pub fn build() -> utoipa::openapi::OpenApi {
        Self::openapi()
    }
}

/// Tag groups modifier
struct TagGroupsAddon;

impl utoipa::Modify for TagGroupsAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        // x-tagGroups extension for Scalar sidebar organization
        let tag_groups = serde_json::json!([
            {
                "name": "Health & Infrastructure",
                "tags": ["health"]
            },
            {
                "name": "Records API",
                "tags": ["patients"]
            }
        ]);

        let extensions = openapi.extensions.get_or_insert_with(Default::default);
        extensions.insert("x-tagGroups".to_string(), tag_groups);
    }
}
