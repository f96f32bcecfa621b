//! Branch directory routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, patch, post},
};
use chrono::{DateTime, FixedOffset, NaiveTime};
use mbank_core::branch::{BranchPatch, BranchRuleError, Coordinates};
use mbank_core::lifecycle::LifecycleStatus;
use mbank_db::BranchRepository;
use mbank_db::entities::branches;
use mbank_db::repositories::{BranchError, CreateBranchInput};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    AppState,
    error::ApiResult,
    extractors::{ValidatedJson, double_option},
};

/// Creates the branch routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/branches",
            get(list_branches).route_layer(require!(ReadReference)),
        )
        .route(
            "/branches",
            post(create_branch).route_layer(require!(ManageReference)),
        )
        .route(
            "/branches/{id}",
            get(get_branch).route_layer(require!(ReadReference)),
        )
        .route(
            "/branches/{id}",
            patch(update_branch).route_layer(require!(ManageReference)),
        )
        .route(
            "/branches/{id}",
            delete(delete_branch).route_layer(require!(DeleteReference)),
        )
}

/// Latitude and longitude in degrees.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CoordinatesBody {
    /// Degrees north.
    pub latitude: Decimal,
    /// Degrees east.
    pub longitude: Decimal,
}

impl TryFrom<CoordinatesBody> for Coordinates {
    type Error = BranchRuleError;

    fn try_from(body: CoordinatesBody) -> Result<Self, Self::Error> {
        Self::new(body.latitude, body.longitude)
    }
}

/// Request body for creating a branch.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateBranchRequest {
    /// Branch name.
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    /// Street address.
    #[validate(length(min = 1, max = 500))]
    pub address: String,
    /// City.
    pub city: Option<String>,
    /// Province.
    pub province: Option<String>,
    /// Position.
    pub coordinates: Option<CoordinatesBody>,
    /// Contact phone.
    pub phone_number: Option<String>,
    /// Contact email.
    #[validate(email)]
    pub email: Option<String>,
    /// Opening time, `HH:MM:SS`.
    pub open_time: NaiveTime,
    /// Closing time, `HH:MM:SS`.
    pub close_time: NaiveTime,
    /// Working days, e.g. "Mon-Fri".
    pub work_days: Option<String>,
}

impl CreateBranchRequest {
    fn into_input(self) -> Result<CreateBranchInput, BranchRuleError> {
        Ok(CreateBranchInput {
            name: self.name,
            address: self.address,
            city: self.city,
            province: self.province,
            coordinates: self.coordinates.map(Coordinates::try_from).transpose()?,
            phone_number: self.phone_number,
            email: self.email,
            open_time: self.open_time,
            close_time: self.close_time,
            work_days: self.work_days,
        })
    }
}

/// Request body for patching a branch. `null` clears an optional field.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateBranchRequest {
    /// Branch name.
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    /// Street address.
    #[validate(length(min = 1, max = 500))]
    pub address: Option<String>,
    /// City.
    #[serde(default, deserialize_with = "double_option")]
    pub city: Option<Option<String>>,
    /// Province.
    #[serde(default, deserialize_with = "double_option")]
    pub province: Option<Option<String>>,
    /// Position.
    #[serde(default, deserialize_with = "double_option")]
    pub coordinates: Option<Option<CoordinatesBody>>,
    /// Contact phone.
    #[serde(default, deserialize_with = "double_option")]
    pub phone_number: Option<Option<String>>,
    /// Contact email.
    #[serde(default, deserialize_with = "double_option")]
    pub email: Option<Option<String>>,
    /// Opening time.
    pub open_time: Option<NaiveTime>,
    /// Closing time.
    pub close_time: Option<NaiveTime>,
    /// Working days.
    #[serde(default, deserialize_with = "double_option")]
    pub work_days: Option<Option<String>>,
}

impl TryFrom<UpdateBranchRequest> for BranchPatch {
    type Error = BranchRuleError;

    fn try_from(req: UpdateBranchRequest) -> Result<Self, Self::Error> {
        let coordinates = match req.coordinates {
            Some(Some(body)) => Some(Some(Coordinates::try_from(body)?)),
            Some(None) => Some(None),
            None => None,
        };
        Ok(Self {
            name: req.name,
            address: req.address,
            city: req.city,
            province: req.province,
            coordinates,
            phone_number: req.phone_number,
            email: req.email,
            open_time: req.open_time,
            close_time: req.close_time,
            work_days: req.work_days,
        })
    }
}

/// Branch response.
#[derive(Debug, Serialize)]
pub struct BranchResponse {
    /// Branch ID.
    pub id: Uuid,
    /// Name.
    pub name: String,
    /// Street address.
    pub address: String,
    /// City.
    pub city: Option<String>,
    /// Province.
    pub province: Option<String>,
    /// Position, when known.
    pub coordinates: Option<CoordinatesBody>,
    /// Contact phone.
    pub phone_number: Option<String>,
    /// Contact email.
    pub email: Option<String>,
    /// Opening time.
    pub open_time: NaiveTime,
    /// Closing time.
    pub close_time: NaiveTime,
    /// Working days.
    pub work_days: Option<String>,
    /// Lifecycle state.
    pub status: LifecycleStatus,
    /// Last change.
    pub updated_at: DateTime<FixedOffset>,
}

impl From<branches::Model> for BranchResponse {
    fn from(model: branches::Model) -> Self {
        let coordinates = model
            .latitude
            .zip(model.longitude)
            .map(|(latitude, longitude)| CoordinatesBody {
                latitude,
                longitude,
            });
        Self {
            id: model.id,
            name: model.name,
            address: model.address,
            city: model.city,
            province: model.province,
            coordinates,
            phone_number: model.phone_number,
            email: model.email,
            open_time: model.open_time,
            close_time: model.close_time,
            work_days: model.work_days,
            status: model.status.into(),
            updated_at: model.updated_at,
        }
    }
}

async fn list_branches(State(state): State<AppState>) -> ApiResult<Json<Vec<BranchResponse>>> {
    let branches = BranchRepository::new((*state.db).clone()).list().await?;
    Ok(Json(branches.into_iter().map(Into::into).collect()))
}

async fn get_branch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<BranchResponse>> {
    let branch = BranchRepository::new((*state.db).clone())
        .find_by_id(id)
        .await?
        .ok_or(BranchError::NotFound(id))?;
    Ok(Json(branch.into()))
}

async fn create_branch(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateBranchRequest>,
) -> ApiResult<impl IntoResponse> {
    let input = payload.into_input().map_err(BranchError::from)?;
    let branch = BranchRepository::new((*state.db).clone())
        .create(input)
        .await?;
    Ok((StatusCode::CREATED, Json(BranchResponse::from(branch))))
}

async fn update_branch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateBranchRequest>,
) -> ApiResult<Json<BranchResponse>> {
    let patch = BranchPatch::try_from(payload).map_err(BranchError::from)?;
    let branch = BranchRepository::new((*state.db).clone())
        .update(id, patch)
        .await?;
    Ok(Json(branch.into()))
}

async fn delete_branch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    BranchRepository::new((*state.db).clone()).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::routes::test_support::{app, body_json, send, token};
    use mbank_shared::TokenType;

    #[test]
    fn test_patch_distinguishes_null_from_absent() {
        let req: UpdateBranchRequest =
            serde_json::from_value(json!({ "city": null, "coordinates": null })).unwrap();
        let patch = BranchPatch::try_from(req).unwrap();
        assert_eq!(patch.city, Some(None));
        assert_eq!(patch.coordinates, Some(None));
        assert_eq!(patch.province, None);
    }

    #[test]
    fn test_patch_rejects_out_of_range_latitude() {
        let req: UpdateBranchRequest = serde_json::from_value(json!({
            "coordinates": { "latitude": "91", "longitude": "10" }
        }))
        .unwrap();
        assert!(matches!(
            BranchPatch::try_from(req),
            Err(BranchRuleError::InvalidCoordinate { axis: "latitude", .. })
        ));
    }

    #[tokio::test]
    async fn test_create_with_bad_coordinates_is_rejected_before_database() {
        let (app, state) = app();
        let admin = token(&state, &["ADMIN"], TokenType::Access);
        let response = send(
            app,
            "POST",
            "/api/v1/branches",
            Some(&admin),
            Some(json!({
                "name": "District 1",
                "address": "1 Le Loi",
                "coordinates": { "latitude": "10.77", "longitude": "200" },
                "open_time": "08:00:00",
                "close_time": "17:00:00"
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "validation_error");
    }
}
