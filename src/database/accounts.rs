use sqlx::error::ErrorKind;
use sqlx::FromRow;

use crate::error::{ServiceError, ServiceResult};
use crate::models::{Account, Role};

use super::{constraint_violation, from_id, to_id, DatabaseConnection};

#[derive(Debug, FromRow)]
struct AccountRow {
    id: i64,
    name: String,
    last_name: String,
    email: String,
    username: String,
    password_hash: Vec<u8>,
    password_salt: String,
    role: String,
}

impl TryFrom<AccountRow> for Account {
    type Error = ServiceError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let role = Role::parse(&row.role).ok_or_else(|| {
            ServiceError::InternalServerError(format!("unknown account role '{}'", row.role))
        })?;

        Ok(Account {
            id: to_id(row.id)?,
            name: row.name,
            last_name: row.last_name,
            email: row.email,
            username: row.username,
            password_hash: row.password_hash,
            password_salt: row.password_salt,
            role,
        })
    }
}

const ACCOUNT_COLUMNS: &str =
    "id, name, last_name, email, username, password_hash, password_salt, role";

impl DatabaseConnection {
    pub async fn get_account_by_id(&mut self, id: u64) -> ServiceResult<Option<Account>> {
        let Ok(id) = from_id(id) else {
            return Ok(None);
        };

        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM account WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.connection)
        .await?;

        row.map(Account::try_from).transpose()
    }

    pub async fn get_account_by_username(
        &mut self,
        username: &str,
    ) -> ServiceResult<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM account WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&mut *self.connection)
        .await?;

        row.map(Account::try_from).transpose()
    }

    /// Insert `account` if its id is `0`, update it otherwise.
    ///
    /// A duplicate email or username is reported as `Conflict`.
    pub async fn store_account(&mut self, account: Account) -> ServiceResult<Account> {
        let result = if account.id == 0 {
            sqlx::query_as::<_, AccountRow>(&format!(
                r#"
                INSERT INTO account (name, last_name, email, username, password_hash, password_salt, role)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING {ACCOUNT_COLUMNS}
                "#
            ))
            .bind(&account.name)
            .bind(&account.last_name)
            .bind(&account.email)
            .bind(&account.username)
            .bind(&account.password_hash)
            .bind(&account.password_salt)
            .bind(account.role.as_str())
            .fetch_one(&mut *self.connection)
            .await
        } else {
            sqlx::query_as::<_, AccountRow>(&format!(
                r#"
                UPDATE account
                SET name = $2, last_name = $3, email = $4, username = $5,
                    password_hash = $6, password_salt = $7, role = $8
                WHERE id = $1
                RETURNING {ACCOUNT_COLUMNS}
                "#
            ))
            .bind(from_id(account.id)?)
            .bind(&account.name)
            .bind(&account.last_name)
            .bind(&account.email)
            .bind(&account.username)
            .bind(&account.password_hash)
            .bind(&account.password_salt)
            .bind(account.role.as_str())
            .fetch_one(&mut *self.connection)
            .await
        };

        match result {
            Ok(row) => Account::try_from(row),
            Err(sqlx::Error::RowNotFound) => Err(ServiceError::NotFound("Account not found")),
            Err(err) if matches!(constraint_violation(&err), Some(ErrorKind::UniqueViolation)) => {
                Err(ServiceError::Conflict(
                    "Email or username is already registered",
                ))
            }
            Err(err) => Err(err.into()),
        }
    }
}
