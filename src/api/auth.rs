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
use crate::request_state::{RequestState, SessionState};

use super::utils::{require_text, Created, JsonBody, Success};
use super::{password_hash_create, password_hash_verify, DUMMY_PASSWORD_SALT};

pub fn router(app_state: AppState) -> ApiRouter {
    ApiRouter::new()
        .api_route("/api/login", post_with(login, login_docs))
        .api_route("/api/registro", post_with(register, register_docs))
        .api_route(
            "/api/verificar-sesion",
            get_with(verify_session, verify_session_docs),
        )
        .with_state(app_state)
}

#[derive(Debug, PartialEq, Deserialize, JsonSchema)]
pub struct LoginDto {
    /// The frontend sends the username in a field called `email`.
    #[serde(alias = "email", alias = "usuario")]
    pub username: Option<String>,
    #[serde(alias = "clave")]
    pub password: Option<String>,
}

#[derive(Debug, PartialEq, Serialize, JsonSchema)]
pub struct LoginResponseDto {
    pub token: String,
    pub id: u64,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "usuario")]
    pub username: String,
    #[serde(rename = "rol")]
    pub role: String,
}

/// Check `password` against `account`. Unknown accounts are still hashed against a dummy salt.
fn check_credentials(account: Option<&models::Account>, password: &str) -> ServiceResult<bool> {
    match account {
        Some(account) => {
            password_hash_verify(&account.password_hash, &account.password_salt, password)
        }
        None => {
            password_hash_verify(&[0u8; 32], DUMMY_PASSWORD_SALT, password)?;
            Ok(false)
        }
    }
}

async fn login(
    mut state: RequestState,
    WithRejection(Json(form), _): JsonBody<LoginDto>,
) -> ServiceResult<Json<Success<LoginResponseDto>>> {
    let username = require_text(form.username.as_deref(), "email")?;
    let password = match form.password {
        Some(password) if !password.is_empty() => password,
        _ => return Err(ServiceError::BadRequest("Missing field 'password'".to_owned())),
    };

    let account = state.db.get_account_by_username(&username).await?;

    let verified = check_credentials(account.as_ref(), &password)?;
    let account = account
        .filter(|_| verified)
        .ok_or(ServiceError::Unauthorized("Invalid username or password"))?;

    let token = state.tokens.issue(&account)?;
    info!("Account {} logged in", account.id);

    Ok(Json(Success::new(LoginResponseDto {
        token,
        id: account.id,
        name: account.name,
        username: account.username,
        role: account.role.as_str().to_owned(),
    })))
}

fn login_docs(op: TransformOperation) -> TransformOperation {
    op.description("Login with username and password and receive a bearer token.")
        .tag("auth")
        .response::<200, Json<Success<LoginResponseDto>>>()
        .response_with::<400, (), _>(|res| res.description("Missing username or password!"))
        .response_with::<401, (), _>(|res| res.description("Invalid username or password!"))
}

#[derive(Debug, PartialEq, Deserialize, JsonSchema)]
pub struct RegisterDto {
    #[serde(rename = "nombre")]
    pub name: Option<String>,
    #[serde(rename = "apellido")]
    pub last_name: Option<String>,
    #[serde(rename = "correo")]
    pub email: Option<String>,
    #[serde(rename = "usuario")]
    pub username: Option<String>,
    #[serde(rename = "clave")]
    pub password: Option<String>,
}

#[derive(Debug, PartialEq, Serialize, JsonSchema)]
pub struct RegisterResponseDto {
    pub message: String,
    #[serde(rename = "userId")]
    pub user_id: u64,
}

async fn register(
    mut state: RequestState,
    WithRejection(Json(form), _): JsonBody<RegisterDto>,
) -> ServiceResult<Created<Success<RegisterResponseDto>>> {
    let name = require_text(form.name.as_deref(), "nombre")?;
    let last_name = require_text(form.last_name.as_deref(), "apellido")?;
    let email = require_text(form.email.as_deref(), "correo")?;
    let username = require_text(form.username.as_deref(), "usuario")?;
    let password = match form.password {
        Some(password) if !password.is_empty() => password,
        _ => return Err(ServiceError::BadRequest("Missing field 'clave'".to_owned())),
    };

    if !email.contains('@') {
        return Err(ServiceError::BadRequest("Invalid email address".to_owned()));
    }

    let (password_hash, password_salt) = password_hash_create(&password)?;
    let account = models::Account {
        id: 0,
        name,
        last_name,
        email,
        username,
        password_hash,
        password_salt,
        role: models::Role::User,
    };

    let account = state.db.store_account(account).await?;
    info!("Registered account {} ({})", account.id, account.username);

    Ok(Created(Success::new(RegisterResponseDto {
        message: "Account registered".to_owned(),
        user_id: account.id,
    })))
}

fn register_docs(op: TransformOperation) -> TransformOperation {
    op.description("Register a new account.")
        .tag("auth")
        .response::<201, Json<Success<RegisterResponseDto>>>()
        .response_with::<400, (), _>(|res| res.description("Missing or invalid fields!"))
        .response_with::<409, (), _>(|res| {
            res.description("The email or username is already registered!")
        })
}

#[derive(Debug, PartialEq, Serialize, JsonSchema)]
pub struct SessionDto {
    pub id: u64,
    #[serde(rename = "usuario")]
    pub username: String,
    #[serde(rename = "rol")]
    pub role: String,
    #[serde(rename = "expira")]
    pub valid_until: String,
}

impl From<&models::Session> for SessionDto {
    fn from(value: &models::Session) -> Self {
        Self {
            id: value.account_id,
            username: value.username.to_owned(),
            role: value.role.as_str().to_owned(),
            valid_until: value.valid_until.to_rfc3339(),
        }
    }
}

async fn verify_session(state: SessionState) -> ServiceResult<Json<Success<SessionDto>>> {
    Ok(Json(Success::new(SessionDto::from(&state.session))))
}

fn verify_session_docs(op: TransformOperation) -> TransformOperation {
    op.description("Check the bearer token and return the identity it carries.")
        .tag("auth")
        .response::<200, Json<Success<SessionDto>>>()
        .response_with::<401, (), _>(|res| res.description("Missing or invalid login!"))
        .security_requirement("SessionToken")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(password: &str) -> models::Account {
        let (password_hash, password_salt) = password_hash_create(password).unwrap();
        models::Account {
            id: 1,
            name: "Ana".to_owned(),
            last_name: "Lopez".to_owned(),
            email: "ana@example.org".to_owned(),
            username: "ana".to_owned(),
            password_hash,
            password_salt,
            role: models::Role::User,
        }
    }

    #[test]
    fn test_check_credentials() {
        let ana = account("cafecito");

        assert_eq!(check_credentials(Some(&ana), "cafecito"), Ok(true));
        assert_eq!(check_credentials(Some(&ana), "te"), Ok(false));
    }

    #[test]
    fn test_check_credentials_unknown_account() {
        assert_eq!(check_credentials(None, "cafecito"), Ok(false));
        assert_eq!(check_credentials(None, ""), Ok(false));
    }
}
