use chrono::{DateTime, Utc};
use sqlx::error::ErrorKind;
use sqlx::FromRow;

use crate::error::{ServiceError, ServiceResult};
use crate::models::{PassportEntry, Stamp, StampedCafe};

use super::cafes::CafeRow;
use super::{constraint_violation, from_id, missing_reference, to_id, DatabaseConnection};

#[derive(Debug, FromRow)]
struct StampRow {
    account_id: i64,
    cafe_id: i64,
    visited_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct PassportRow {
    #[sqlx(flatten)]
    cafe: CafeRow,
    visited_at: Option<DateTime<Utc>>,
}

#[derive(Debug, FromRow)]
struct StampedCafeRow {
    #[sqlx(flatten)]
    cafe: CafeRow,
    visited_at: DateTime<Utc>,
}

impl DatabaseConnection {
    /// Record that `account_id` visited `cafe_id`.
    ///
    /// There is no existence check before the insert: a second stamp for the same pair is
    /// rejected by the primary key and reported as `Conflict`, an unknown cafe is rejected by
    /// the foreign key and reported as `NotFound`.
    pub async fn stamp_cafe(&mut self, account_id: u64, cafe_id: u64) -> ServiceResult<Stamp> {
        let result = sqlx::query_as::<_, StampRow>(
            r#"
            INSERT INTO stamp (account_id, cafe_id)
            VALUES ($1, $2)
            RETURNING account_id, cafe_id, visited_at
            "#,
        )
        .bind(from_id(account_id)?)
        .bind(from_id(cafe_id).map_err(|_| ServiceError::NotFound("Cafe not found"))?)
        .fetch_one(&mut *self.connection)
        .await;

        match result {
            Ok(row) => Ok(Stamp {
                account_id: to_id(row.account_id)?,
                cafe_id: to_id(row.cafe_id)?,
                visited_at: row.visited_at,
            }),
            Err(err) => match constraint_violation(&err) {
                Some(ErrorKind::UniqueViolation) => Err(ServiceError::Conflict(
                    "You have already stamped this cafe",
                )),
                Some(ErrorKind::ForeignKeyViolation) => Err(missing_reference(&err)),
                _ => Err(err.into()),
            },
        }
    }

    /// The whole catalog, each cafe annotated with the stamp of `account_id` if there is one.
    pub async fn get_passport(&mut self, account_id: u64) -> ServiceResult<Vec<PassportEntry>> {
        let rows = sqlx::query_as::<_, PassportRow>(
            r#"
            SELECT c.id, c.name, c.address, c.latitude, c.longitude, c.image, s.visited_at
            FROM cafe c
            LEFT JOIN stamp s ON s.cafe_id = c.id AND s.account_id = $1
            ORDER BY c.id
            "#,
        )
        .bind(from_id(account_id)?)
        .fetch_all(&mut *self.connection)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(PassportEntry {
                    cafe: row.cafe.try_into()?,
                    visited_at: row.visited_at,
                })
            })
            .collect()
    }

    /// Stamps of `account_id`, most recent first.
    pub async fn get_stamps_by_account(
        &mut self,
        account_id: u64,
    ) -> ServiceResult<Vec<StampedCafe>> {
        let rows = sqlx::query_as::<_, StampedCafeRow>(
            r#"
            SELECT c.id, c.name, c.address, c.latitude, c.longitude, c.image, s.visited_at
            FROM stamp s
            JOIN cafe c ON c.id = s.cafe_id
            WHERE s.account_id = $1
            ORDER BY s.visited_at DESC, c.id
            "#,
        )
        .bind(from_id(account_id)?)
        .fetch_all(&mut *self.connection)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(StampedCafe {
                    cafe: row.cafe.try_into()?,
                    visited_at: row.visited_at,
                })
            })
            .collect()
    }
}
