use aide::axum::routing::{get_with, post_with};
use aide::axum::ApiRouter;
use aide::transform::TransformOperation;
use axum::extract::Path;
use axum::Json;
use axum_extra::extract::WithRejection;
use log::info;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::database::AppState;
use crate::error::{ServiceError, ServiceResult};
use crate::models;
use crate::request_state::{RequestState, SessionState};

use super::utils::{
    data, require_id, require_text, Created, DataDto, JsonBody, NumberOrString, PathParam, Success,
};

pub fn router(app_state: AppState) -> ApiRouter {
    ApiRouter::new()
        .api_route("/api/opiniones", post_with(create_opinion, create_opinion_docs))
        .api_route(
            "/api/opiniones/:id_cafeteria",
            get_with(list_opinions, list_opinions_docs),
        )
        .with_state(app_state)
}

#[derive(Debug, PartialEq, Serialize, JsonSchema)]
pub struct OpinionDto {
    pub id: u64,
    #[serde(rename = "id_usuario")]
    pub account_id: u64,
    #[serde(rename = "usuario")]
    pub username: String,
    #[serde(rename = "id_cafeteria")]
    pub cafe_id: u64,
    #[serde(rename = "calificacion")]
    pub rating: i32,
    #[serde(rename = "comentario")]
    pub text: String,
    #[serde(rename = "fecha_creacion")]
    pub created_at: String,
}

impl From<&models::Opinion> for OpinionDto {
    fn from(value: &models::Opinion) -> Self {
        Self {
            id: value.id,
            account_id: value.account_id,
            username: value.username.to_owned(),
            cafe_id: value.cafe_id,
            rating: value.rating,
            text: value.text.to_owned(),
            created_at: value.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, PartialEq, Deserialize, JsonSchema)]
pub struct CreateOpinionDto {
    #[serde(rename = "id_cafeteria")]
    pub cafe_id: Option<NumberOrString>,
    #[serde(rename = "calificacion")]
    pub rating: Option<NumberOrString>,
    #[serde(rename = "comentario")]
    pub text: Option<String>,
}

fn parse_rating(value: Option<&NumberOrString>) -> ServiceResult<i32> {
    let rating = value
        .ok_or_else(|| ServiceError::BadRequest("Missing field 'calificacion'".to_owned()))?
        .as_i64();

    match rating {
        Some(rating @ 1..=5) => Ok(rating as i32),
        _ => Err(ServiceError::BadRequest(
            "Rating must be between 1 and 5".to_owned(),
        )),
    }
}

async fn create_opinion(
    mut state: SessionState,
    WithRejection(Json(form), _): JsonBody<CreateOpinionDto>,
) -> ServiceResult<Created<Success<DataDto<OpinionDto>>>> {
    let account_id = state.session.account_id;

    let cafe_id = require_id(form.cafe_id.as_ref(), "id_cafeteria")?;
    let rating = parse_rating(form.rating.as_ref())?;
    let text = require_text(form.text.as_deref(), "comentario")?;

    let opinion = state
        .db
        .store_opinion(account_id, cafe_id, rating, &text)
        .await?;
    info!(
        "Account {} rated cafe {} with {}",
        account_id, cafe_id, rating
    );

    Ok(Created(data(OpinionDto::from(&opinion)).0))
}

fn create_opinion_docs(op: TransformOperation) -> TransformOperation {
    op.description("Rate a cafe with 1 to 5 stars and a comment.")
        .tag("opinions")
        .response::<201, Json<Success<DataDto<OpinionDto>>>>()
        .response_with::<400, (), _>(|res| res.description("Missing fields or rating out of range!"))
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .response_with::<404, (), _>(|res| res.description("The requested cafe does not exist!"))
        .security_requirement("SessionToken")
}

async fn list_opinions(
    mut state: RequestState,
    WithRejection(Path(cafe_id), _): PathParam<u64>,
) -> ServiceResult<Json<Success<DataDto<Vec<OpinionDto>>>>> {
    let opinions = state.db.get_opinions_by_cafe(cafe_id).await?;
    Ok(data(opinions.iter().map(|o| o.into()).collect()))
}

fn list_opinions_docs(op: TransformOperation) -> TransformOperation {
    op.description("List the opinions of a cafe, oldest first.")
        .tag("opinions")
        .response::<200, Json<Success<DataDto<Vec<OpinionDto>>>>>()
}
