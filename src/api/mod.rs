use aide::axum::ApiRouter;
use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::database::AppState;
use crate::error::{ServiceError, ServiceResult};

pub mod auth;
pub mod cafes;
pub mod follows;
pub mod opinions;
pub mod passport;
pub mod utils;


/// Length of the per account password salt. argon2 needs at least 8 bytes.
const PASSWORD_SALT_LENGTH: usize = 16;

/// Salt of the dummy hash computed for logins with an unknown username.
const DUMMY_PASSWORD_SALT: &str = "coffeepassportdummy";

pub fn init(app_state: AppState) -> ApiRouter {
    ApiRouter::new()
        .merge(auth::router(app_state.clone()))
        .merge(cafes::router(app_state.clone()))
        .merge(opinions::router(app_state.clone()))
        .merge(passport::router(app_state.clone()))
        .merge(follows::router(app_state))
}

/// Hash `password` with a fresh random salt. Returns the hash and the salt.
pub fn password_hash_create(password: &str) -> ServiceResult<(Vec<u8>, String)> {
    let salt: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(PASSWORD_SALT_LENGTH)
        .map(char::from)
        .collect();

    let hash = argon2rs::argon2i_simple(password, &salt);
    Ok((hash.to_vec(), salt))
}

/// Compare `password` against a stored hash in constant time.
pub fn password_hash_verify(hash: &[u8], salt: &str, password: &str) -> ServiceResult<bool> {
    if salt.len() < 8 {
        return Err(ServiceError::InternalServerError(
            "stored password salt is too short".to_owned(),
        ));
    }

    let computed = argon2rs::argon2i_simple(password, salt);
    Ok(argon2rs::verifier::constant_eq(&computed, hash))
}
