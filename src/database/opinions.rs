use chrono::{DateTime, Utc};
use sqlx::error::ErrorKind;
use sqlx::FromRow;

use crate::error::{ServiceError, ServiceResult};
use crate::models::Opinion;

use super::{constraint_violation, from_id, missing_reference, to_id, DatabaseConnection};

#[derive(Debug, FromRow)]
struct OpinionRow {
    id: i64,
    account_id: i64,
    username: String,
    cafe_id: i64,
    rating: i32,
    text: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<OpinionRow> for Opinion {
    type Error = ServiceError;

    fn try_from(row: OpinionRow) -> Result<Self, Self::Error> {
        Ok(Opinion {
            id: to_id(row.id)?,
            account_id: to_id(row.account_id)?,
            username: row.username,
            cafe_id: to_id(row.cafe_id)?,
            rating: row.rating,
            text: row.text,
            created_at: row.created_at,
        })
    }
}

impl DatabaseConnection {
    pub async fn store_opinion(
        &mut self,
        account_id: u64,
        cafe_id: u64,
        rating: i32,
        text: &str,
    ) -> ServiceResult<Opinion> {
        let result = sqlx::query_as::<_, OpinionRow>(
            r#"
            WITH inserted AS (
                INSERT INTO opinion (account_id, cafe_id, rating, text)
                VALUES ($1, $2, $3, $4)
                RETURNING id, account_id, cafe_id, rating, text, created_at
            )
            SELECT i.id, i.account_id, a.username, i.cafe_id, i.rating, i.text, i.created_at
            FROM inserted i
            JOIN account a ON a.id = i.account_id
            "#,
        )
        .bind(from_id(account_id)?)
        .bind(from_id(cafe_id)?)
        .bind(rating)
        .bind(text)
        .fetch_one(&mut *self.connection)
        .await;

        match result {
            Ok(row) => row.try_into(),
            Err(err) => match constraint_violation(&err) {
                Some(ErrorKind::ForeignKeyViolation) => Err(missing_reference(&err)),
                Some(ErrorKind::CheckViolation) => Err(ServiceError::BadRequest(
                    "Rating must be between 1 and 5".to_owned(),
                )),
                _ => Err(err.into()),
            },
        }
    }

    /// Opinions of a cafe, oldest first.
    pub async fn get_opinions_by_cafe(&mut self, cafe_id: u64) -> ServiceResult<Vec<Opinion>> {
        let Ok(cafe_id) = from_id(cafe_id) else {
            return Ok(Vec::new());
        };

        let rows = sqlx::query_as::<_, OpinionRow>(
            r#"
            SELECT o.id, o.account_id, a.username, o.cafe_id, o.rating, o.text, o.created_at
            FROM opinion o
            JOIN account a ON a.id = o.account_id
            WHERE o.cafe_id = $1
            ORDER BY o.created_at, o.id
            "#,
        )
        .bind(cafe_id)
        .fetch_all(&mut *self.connection)
        .await?;

        rows.into_iter().map(Opinion::try_from).collect()
    }
}
