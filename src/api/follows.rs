use aide::axum::routing::post_with;
use aide::axum::ApiRouter;
use aide::transform::TransformOperation;
use axum::Json;
use axum_extra::extract::WithRejection;
use log::info;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::database::AppState;
use crate::error::ServiceResult;
use crate::models;
use crate::request_state::SessionState;

use super::utils::{require_id, JsonBody, NumberOrString, Success};

pub fn router(app_state: AppState) -> ApiRouter {
    ApiRouter::new()
        .api_route("/api/seguir", post_with(toggle_follow, toggle_follow_docs))
        .with_state(app_state)
}

#[derive(Debug, PartialEq, Deserialize, JsonSchema)]
pub struct FollowDto {
    #[serde(rename = "id_cafeteria")]
    pub cafe_id: Option<NumberOrString>,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FollowStateDto {
    Siguiendo,
    NoSiguiendo,
}

impl From<models::FollowState> for FollowStateDto {
    fn from(value: models::FollowState) -> Self {
        match value {
            models::FollowState::Following => Self::Siguiendo,
            models::FollowState::NotFollowing => Self::NoSiguiendo,
        }
    }
}

#[derive(Debug, PartialEq, Serialize, JsonSchema)]
pub struct FollowResponseDto {
    #[serde(rename = "estado")]
    pub state: FollowStateDto,
}

async fn toggle_follow(
    mut state: SessionState,
    WithRejection(Json(form), _): JsonBody<FollowDto>,
) -> ServiceResult<Json<Success<FollowResponseDto>>> {
    let account_id = state.session.account_id;
    let cafe_id = require_id(form.cafe_id.as_ref(), "id_cafeteria")?;

    let follow_state = state.db.toggle_follow(account_id, cafe_id).await?;
    info!(
        "Account {} toggled follow of cafe {}: {:?}",
        account_id, cafe_id, follow_state
    );

    Ok(Json(Success::new(FollowResponseDto {
        state: follow_state.into(),
    })))
}

fn toggle_follow_docs(op: TransformOperation) -> TransformOperation {
    op.description("Follow a cafe, or stop following it if the caller already does.")
        .tag("follows")
        .response::<200, Json<Success<FollowResponseDto>>>()
        .response_with::<400, (), _>(|res| res.description("Missing cafe id!"))
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .response_with::<404, (), _>(|res| res.description("The requested cafe does not exist!"))
        .security_requirement("SessionToken")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_follow_state_wire_names() {
        let following = FollowResponseDto {
            state: models::FollowState::Following.into(),
        };
        let not_following = FollowResponseDto {
            state: models::FollowState::NotFollowing.into(),
        };

        assert_eq!(
            serde_json::to_value(Success::new(following)).unwrap(),
            serde_json::json!({ "success": true, "estado": "siguiendo" })
        );
        assert_eq!(
            serde_json::to_value(Success::new(not_following)).unwrap(),
            serde_json::json!({ "success": true, "estado": "no_siguiendo" })
        );
    }
}
