use log::info;
use sqlx::error::ErrorKind;
use sqlx::migrate::Migrator;
use sqlx::pool::PoolConnection;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};

use crate::error::{ServiceError, ServiceResult};
use crate::token::TokenIssuer;
use crate::uploads::ImageStore;

mod accounts;
mod cafes;
mod follows;
mod migration;
mod opinions;
mod passport;

#[cfg(test)]
mod tests;

/// Everything a request handler needs, built once at startup and shared by all requests.
#[derive(Clone)]
pub struct AppState {
    pub pool: Pool<Postgres>,
    pub tokens: TokenIssuer,
    pub images: ImageStore,
}

impl AppState {
    pub async fn connect(
        url: &str,
        max_connections: u32,
        tokens: TokenIssuer,
        images: ImageStore,
    ) -> ServiceResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;

        Self::from_pool(pool, tokens, images).await
    }

    pub async fn from_pool(
        pool: Pool<Postgres>,
        tokens: TokenIssuer,
        images: ImageStore,
    ) -> ServiceResult<Self> {
        let migrator = Migrator::new(migration::postgresql_migrations())
            .await
            .map_err(|err| ServiceError::InternalServerError(err.to_string()))?;
        migrator
            .run(&pool)
            .await
            .map_err(|err| ServiceError::InternalServerError(err.to_string()))?;
        info!("Database migrations are up to date");

        Ok(Self {
            pool,
            tokens,
            images,
        })
    }

    pub async fn connection(&self) -> ServiceResult<DatabaseConnection> {
        let connection = self.pool.acquire().await?;
        Ok(DatabaseConnection { connection })
    }
}

/// A single pooled connection, owned by one request.
pub struct DatabaseConnection {
    pub connection: PoolConnection<Postgres>,
}

/// Constraint that rejected a statement, if the error was a constraint violation.
fn constraint_violation(err: &sqlx::Error) -> Option<ErrorKind> {
    match err {
        sqlx::Error::Database(e) => Some(e.kind()),
        _ => None,
    }
}

/// Not-found error for the row a foreign key violation points at.
fn missing_reference(err: &sqlx::Error) -> ServiceError {
    let constraint = match err {
        sqlx::Error::Database(e) => e.constraint(),
        _ => None,
    };

    match constraint {
        Some(name) if name.ends_with("_account_fkey") => ServiceError::NotFound("Account not found"),
        _ => ServiceError::NotFound("Cafe not found"),
    }
}

fn to_id(value: i64) -> ServiceResult<u64> {
    u64::try_from(value)
        .map_err(|_| ServiceError::InternalServerError(format!("invalid id {value}")))
}

fn from_id(value: u64) -> ServiceResult<i64> {
    i64::try_from(value).map_err(|_| ServiceError::NotFound("Not found"))
}
