use sqlx::error::ErrorKind;

use crate::error::{ServiceError, ServiceResult};
use crate::models::{Cafe, FollowState};

use super::cafes::CafeRow;
use super::{constraint_violation, from_id, missing_reference, DatabaseConnection};

impl DatabaseConnection {
    /// Flip the follow relation between `account_id` and `cafe_id`.
    ///
    /// Deleting first means no separate existence check is needed. If a concurrent toggle
    /// inserts the same pair in between, `ON CONFLICT DO NOTHING` absorbs the duplicate.
    pub async fn toggle_follow(
        &mut self,
        account_id: u64,
        cafe_id: u64,
    ) -> ServiceResult<FollowState> {
        let account_id = from_id(account_id)?;
        let cafe_id = from_id(cafe_id).map_err(|_| ServiceError::NotFound("Cafe not found"))?;

        let deleted = sqlx::query("DELETE FROM follow WHERE account_id = $1 AND cafe_id = $2")
            .bind(account_id)
            .bind(cafe_id)
            .execute(&mut *self.connection)
            .await?;

        if deleted.rows_affected() > 0 {
            return Ok(FollowState::NotFollowing);
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO follow (account_id, cafe_id)
            VALUES ($1, $2)
            ON CONFLICT (account_id, cafe_id) DO NOTHING
            "#,
        )
        .bind(account_id)
        .bind(cafe_id)
        .execute(&mut *self.connection)
        .await;

        match inserted {
            Ok(_) => Ok(FollowState::Following),
            Err(err) if matches!(constraint_violation(&err), Some(ErrorKind::ForeignKeyViolation)) => {
                Err(missing_reference(&err))
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn get_followed_cafes(&mut self, account_id: u64) -> ServiceResult<Vec<Cafe>> {
        let rows = sqlx::query_as::<_, CafeRow>(
            r#"
            SELECT c.id, c.name, c.address, c.latitude, c.longitude, c.image
            FROM follow f
            JOIN cafe c ON c.id = f.cafe_id
            WHERE f.account_id = $1
            ORDER BY f.created_at, c.id
            "#,
        )
        .bind(from_id(account_id)?)
        .fetch_all(&mut *self.connection)
        .await?;

        rows.into_iter().map(Cafe::try_from).collect()
    }
}
