use sqlx::FromRow;

use crate::error::{ServiceError, ServiceResult};
use crate::models::{Cafe, RatedCafe};

use super::{from_id, to_id, DatabaseConnection};

#[derive(Debug, FromRow)]
pub(super) struct CafeRow {
    pub id: i64,
    pub name: String,
    pub address: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub image: Option<String>,
}

impl TryFrom<CafeRow> for Cafe {
    type Error = ServiceError;

    fn try_from(row: CafeRow) -> Result<Self, Self::Error> {
        Ok(Cafe {
            id: to_id(row.id)?,
            name: row.name,
            address: row.address,
            latitude: row.latitude,
            longitude: row.longitude,
            image: row.image,
        })
    }
}

#[derive(Debug, FromRow)]
struct RatedCafeRow {
    #[sqlx(flatten)]
    cafe: CafeRow,
    average_rating: f64,
    opinion_count: i64,
}

impl TryFrom<RatedCafeRow> for RatedCafe {
    type Error = ServiceError;

    fn try_from(row: RatedCafeRow) -> Result<Self, Self::Error> {
        Ok(RatedCafe {
            cafe: row.cafe.try_into()?,
            average_rating: row.average_rating,
            opinion_count: to_id(row.opinion_count)?,
        })
    }
}

// the average is rounded to one decimal and is 0 for cafes without opinions
const RATED_CAFE_SELECT: &str = r#"
    SELECT c.id, c.name, c.address, c.latitude, c.longitude, c.image,
           COALESCE(ROUND(AVG(o.rating)::NUMERIC, 1), 0)::DOUBLE PRECISION AS average_rating,
           COUNT(o.id) AS opinion_count
    FROM cafe c
    LEFT JOIN opinion o ON o.cafe_id = c.id
"#;

impl DatabaseConnection {
    pub async fn get_all_cafes(&mut self) -> ServiceResult<Vec<RatedCafe>> {
        let rows = sqlx::query_as::<_, RatedCafeRow>(&format!(
            "{RATED_CAFE_SELECT} GROUP BY c.id ORDER BY c.id"
        ))
        .fetch_all(&mut *self.connection)
        .await?;

        rows.into_iter().map(RatedCafe::try_from).collect()
    }

    pub async fn get_cafe_by_id(&mut self, id: u64) -> ServiceResult<Option<RatedCafe>> {
        let Ok(id) = from_id(id) else {
            return Ok(None);
        };

        let row = sqlx::query_as::<_, RatedCafeRow>(&format!(
            "{RATED_CAFE_SELECT} WHERE c.id = $1 GROUP BY c.id"
        ))
        .bind(id)
        .fetch_optional(&mut *self.connection)
        .await?;

        row.map(RatedCafe::try_from).transpose()
    }

    /// Insert `cafe` if its id is `0`, update it otherwise.
    pub async fn store_cafe(&mut self, cafe: Cafe) -> ServiceResult<Cafe> {
        let row = if cafe.id == 0 {
            sqlx::query_as::<_, CafeRow>(
                r#"
                INSERT INTO cafe (name, address, latitude, longitude, image)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id, name, address, latitude, longitude, image
                "#,
            )
            .bind(&cafe.name)
            .bind(&cafe.address)
            .bind(cafe.latitude)
            .bind(cafe.longitude)
            .bind(&cafe.image)
            .fetch_one(&mut *self.connection)
            .await?
        } else {
            sqlx::query_as::<_, CafeRow>(
                r#"
                UPDATE cafe
                SET name = $2, address = $3, latitude = $4, longitude = $5, image = $6
                WHERE id = $1
                RETURNING id, name, address, latitude, longitude, image
                "#,
            )
            .bind(from_id(cafe.id)?)
            .bind(&cafe.name)
            .bind(&cafe.address)
            .bind(cafe.latitude)
            .bind(cafe.longitude)
            .bind(&cafe.image)
            .fetch_optional(&mut *self.connection)
            .await?
            .ok_or(ServiceError::NotFound("Cafe not found"))?
        };

        row.try_into()
    }

    /// Delete a cafe and return the deleted row. Opinions, stamps and follows go with it.
    pub async fn delete_cafe(&mut self, id: u64) -> ServiceResult<Cafe> {
        let row = sqlx::query_as::<_, CafeRow>(
            r#"
            DELETE FROM cafe WHERE id = $1
            RETURNING id, name, address, latitude, longitude, image
            "#,
        )
        .bind(from_id(id)?)
        .fetch_optional(&mut *self.connection)
        .await?;

        row.ok_or(ServiceError::NotFound("Cafe not found"))?
            .try_into()
    }
}
