use std::sync::Arc;

use aide::axum::ApiRouter;
use aide::openapi::OpenApi;
use axum::{Extension, Router};
use log::info;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::api::{self, password_hash_create};
use crate::database::AppState;
use crate::docs::{api_docs, docs_routes};
use crate::env;
use crate::error::{ServiceError, ServiceResult};
use crate::models::{Account, Role};
use crate::token::TokenIssuer;
use crate::uploads::ImageStore;

/// Assemble the http application: the json api, its documentation under `/docs`, uploaded
/// images under `/uploads` and the static frontend for everything else.
pub fn build_app(app_state: AppState, public_dir: &str) -> Router {
    let mut api = OpenApi::default();
    let uploads = ServeDir::new(app_state.images.directory());

    ApiRouter::new()
        .merge(api::init(app_state))
        .nest_api_service("/docs", docs_routes())
        .finish_api_with(&mut api, api_docs)
        .layer(Extension(Arc::new(api)))
        .nest_service("/uploads", uploads)
        .fallback_service(ServeDir::new(public_dir))
        .layer(CorsLayer::permissive())
}

/// Signing setup for session tokens. Fails if no secret is configured.
fn token_issuer(secret: Option<&str>, lifetime_minutes: i64) -> ServiceResult<TokenIssuer> {
    let secret = secret.ok_or_else(|| {
        ServiceError::InternalServerError("TOKEN_SECRET must be set".to_owned())
    })?;

    Ok(TokenIssuer::new(
        secret.as_bytes(),
        chrono::Duration::minutes(lifetime_minutes),
    ))
}

pub async fn start() -> ServiceResult<()> {
    let tokens = token_issuer(env::TOKEN_SECRET.as_deref(), *env::TOKEN_LIFETIME_MINUTES)?;

    let images = ImageStore::new(env::UPLOAD_DIR.as_str());
    images.init().await?;

    let app_state = AppState::connect(
        env::DATABASE_URL.as_str(),
        *env::DATABASE_MAX_CONNECTIONS,
        tokens,
        images,
    )
    .await?;

    create_admin_user(&app_state).await?;

    let app = build_app(app_state, env::PUBLIC_DIR.as_str());

    let address = format!("{}:{}", env::API_HOST.as_str(), env::API_PORT.as_str());
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("Start http server at http://{}/", address);
    info!("Api documentation at http://{}/docs", address);

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

/// Create the configured admin account, or promote it if the username is already taken.
async fn create_admin_user(app_state: &AppState) -> ServiceResult<()> {
    let (username, password) = match (
        env::ADMIN_USERNAME.as_deref(),
        env::ADMIN_PASSWORD.as_deref(),
    ) {
        (Some(username), Some(password)) => (username, password),
        (None, None) => return Ok(()),
        _ => {
            return Err(ServiceError::InternalServerError(
                "ADMIN_USERNAME and ADMIN_PASSWORD must be set together".to_owned(),
            ))
        }
    };

    let mut db = app_state.connection().await?;

    if let Some(mut account) = db.get_account_by_username(username).await? {
        if account.role != Role::Admin {
            account.role = Role::Admin;
            db.store_account(account).await?;
            info!("Promoted account '{}' to admin", username);
        }
        return Ok(());
    }

    let (password_hash, password_salt) = password_hash_create(password)?;
    let account = db
        .store_account(Account {
            id: 0,
            name: username.to_owned(),
            last_name: String::new(),
            email: format!("{username}@localhost"),
            username: username.to_owned(),
            password_hash,
            password_salt,
            role: Role::Admin,
        })
        .await?;
    info!("Admin account '{}' was created with id {}", username, account.id);

    Ok(())
}
