use aide::axum::routing::{get_with, post_with};
use aide::axum::ApiRouter;
use aide::transform::TransformOperation;
use axum::Json;
use axum_extra::extract::WithRejection;
use log::info;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::database::AppState;
use crate::error::{ServiceError, ServiceResult};
use crate::models;
use crate::request_state::SessionState;

use super::utils::{data, require_id, Created, DataDto, JsonBody, NumberOrString, Success};

pub fn router(app_state: AppState) -> ApiRouter {
    ApiRouter::new()
        .api_route(
            "/api/pasaporte/sellar",
            post_with(stamp_cafe, stamp_cafe_docs),
        )
        .api_route("/api/pasaporte", get_with(get_passport, get_passport_docs))
        .api_route("/api/perfil", get_with(get_profile, get_profile_docs))
        .with_state(app_state)
}

#[derive(Debug, PartialEq, Deserialize, JsonSchema)]
pub struct StampDto {
    #[serde(rename = "id_cafeteria")]
    pub cafe_id: Option<NumberOrString>,
}

#[derive(Debug, PartialEq, Serialize, JsonSchema)]
pub struct StampResultDto {
    #[serde(rename = "id_cafeteria")]
    pub cafe_id: u64,
    #[serde(rename = "fecha_sello")]
    pub visited_at: String,
}

#[derive(Debug, PartialEq, Serialize, JsonSchema)]
pub struct StampResponseDto {
    pub message: String,
    pub data: StampResultDto,
}

async fn stamp_cafe(
    mut state: SessionState,
    WithRejection(Json(form), _): JsonBody<StampDto>,
) -> ServiceResult<Created<Success<StampResponseDto>>> {
    let account_id = state.session.account_id;
    let cafe_id = require_id(form.cafe_id.as_ref(), "id_cafeteria")?;

    let stamp = state.db.stamp_cafe(account_id, cafe_id).await?;
    info!("Account {} stamped cafe {}", account_id, cafe_id);

    Ok(Created(Success::new(StampResponseDto {
        message: "Cafe stamped".to_owned(),
        data: StampResultDto {
            cafe_id: stamp.cafe_id,
            visited_at: stamp.visited_at.to_rfc3339(),
        },
    })))
}

fn stamp_cafe_docs(op: TransformOperation) -> TransformOperation {
    op.description("Stamp a cafe in the passport of the caller. Every cafe can be stamped once.")
        .tag("passport")
        .response::<201, Json<Success<StampResponseDto>>>()
        .response_with::<400, (), _>(|res| res.description("Missing cafe id!"))
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .response_with::<404, (), _>(|res| res.description("The requested cafe does not exist!"))
        .response_with::<409, (), _>(|res| res.description("The cafe is already stamped!"))
        .security_requirement("SessionToken")
}

#[derive(Debug, PartialEq, Serialize, JsonSchema)]
pub struct PassportEntryDto {
    pub id: u64,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "direccion")]
    pub address: Option<String>,
    #[serde(rename = "imagen_url")]
    pub image: Option<String>,
    #[serde(rename = "latitud")]
    pub latitude: f64,
    #[serde(rename = "longitud")]
    pub longitude: f64,
    #[serde(rename = "visitado")]
    pub visited: bool,
    #[serde(rename = "fecha_sello")]
    pub visited_at: Option<String>,
}

impl From<&models::PassportEntry> for PassportEntryDto {
    fn from(value: &models::PassportEntry) -> Self {
        Self {
            id: value.cafe.id,
            name: value.cafe.name.to_owned(),
            address: value.cafe.address.to_owned(),
            image: value.cafe.image.to_owned(),
            latitude: value.cafe.latitude,
            longitude: value.cafe.longitude,
            visited: value.visited(),
            visited_at: value.visited_at.map(|v| v.to_rfc3339()),
        }
    }
}

async fn get_passport(
    mut state: SessionState,
) -> ServiceResult<Json<Success<DataDto<Vec<PassportEntryDto>>>>> {
    let account_id = state.session.account_id;

    let passport = state.db.get_passport(account_id).await?;
    Ok(data(passport.iter().map(|p| p.into()).collect()))
}

fn get_passport_docs(op: TransformOperation) -> TransformOperation {
    op.description("The passport of the caller: every cafe of the catalog and whether it was stamped.")
        .tag("passport")
        .response::<200, Json<Success<DataDto<Vec<PassportEntryDto>>>>>()
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .security_requirement("SessionToken")
}

#[derive(Debug, PartialEq, Serialize, JsonSchema)]
pub struct ProfileStampDto {
    #[serde(rename = "id_cafeteria")]
    pub cafe_id: u64,
    #[serde(rename = "nombre_cafeteria")]
    pub cafe_name: String,
    #[serde(rename = "imagen_url")]
    pub image: Option<String>,
    #[serde(rename = "fecha_sello")]
    pub visited_at: String,
}

impl From<&models::StampedCafe> for ProfileStampDto {
    fn from(value: &models::StampedCafe) -> Self {
        Self {
            cafe_id: value.cafe.id,
            cafe_name: value.cafe.name.to_owned(),
            image: value.cafe.image.to_owned(),
            visited_at: value.visited_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, PartialEq, Serialize, JsonSchema)]
pub struct ProfileFollowDto {
    #[serde(rename = "id_cafeteria")]
    pub cafe_id: u64,
    #[serde(rename = "nombre_cafeteria")]
    pub cafe_name: String,
    #[serde(rename = "imagen_url")]
    pub image: Option<String>,
}

impl From<&models::Cafe> for ProfileFollowDto {
    fn from(value: &models::Cafe) -> Self {
        Self {
            cafe_id: value.id,
            cafe_name: value.name.to_owned(),
            image: value.image.to_owned(),
        }
    }
}

#[derive(Debug, PartialEq, Serialize, JsonSchema)]
pub struct ProfileDto {
    pub id: u64,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "apellido")]
    pub last_name: String,
    #[serde(rename = "correo")]
    pub email: String,
    #[serde(rename = "usuario")]
    pub username: String,
    #[serde(rename = "rol")]
    pub role: String,
    #[serde(rename = "sellos")]
    pub stamps: Vec<ProfileStampDto>,
    #[serde(rename = "siguiendo")]
    pub following: Vec<ProfileFollowDto>,
}

#[derive(Debug, PartialEq, Serialize, JsonSchema)]
pub struct ProfileResponseDto {
    #[serde(rename = "usuario")]
    pub profile: ProfileDto,
}

async fn get_profile(mut state: SessionState) -> ServiceResult<Json<Success<ProfileResponseDto>>> {
    let account_id = state.session.account_id;

    // the token may outlive the account
    let account = state
        .db
        .get_account_by_id(account_id)
        .await?
        .ok_or(ServiceError::NotFound("Account not found"))?;
    let stamps = state.db.get_stamps_by_account(account_id).await?;
    let following = state.db.get_followed_cafes(account_id).await?;

    Ok(Json(Success::new(ProfileResponseDto {
        profile: ProfileDto {
            id: account.id,
            name: account.name,
            last_name: account.last_name,
            email: account.email,
            username: account.username,
            role: account.role.as_str().to_owned(),
            stamps: stamps.iter().map(|s| s.into()).collect(),
            following: following.iter().map(|c| c.into()).collect(),
        },
    })))
}

fn get_profile_docs(op: TransformOperation) -> TransformOperation {
    op.description("Profile of the caller with the stamps collected so far, newest first, and the followed cafes.")
        .tag("passport")
        .response::<200, Json<Success<ProfileResponseDto>>>()
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .response_with::<404, (), _>(|res| res.description("The account no longer exists!"))
        .security_requirement("SessionToken")
}
