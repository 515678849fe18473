//! `PostgreSQL` guest store over the `users` table.

use std::time::Duration;

use async_trait::async_trait;
use guestlist_core::UserRecord;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;

use super::{StoreError, UserStore};

const COLUMNS: &str = "id, status, company, surname, name, guest, covid_pass, rank, \
                       contact_phone, contact_mail, checkin";

#[derive(Debug, Clone)]
pub struct PostgresUserStore {
    pool: PgPool,
}

impl PostgresUserStore {
    /// Opens a lazily-connecting pool.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Connection`] if the URL is malformed.
    pub fn connect_lazy(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect_lazy(url)
            .map_err(map_sqlx_error)?;
        Ok(Self { pool })
    }

    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Escapes `LIKE` metacharacters so the surname matches literally.
fn like_pattern(surname: &str) -> String {
    let mut pattern = String::with_capacity(surname.len() + 2);
    pattern.push('%');
    for c in surname.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn map_sqlx_error(e: sqlx::Error) -> StoreError {
    match e {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Configuration(_) => StoreError::Connection(e.to_string()),
        other => StoreError::Backend(other.to_string()),
    }
}

fn row_to_user(row: &PgRow) -> Result<UserRecord, StoreError> {
    let id: i64 = row.try_get("id").map_err(map_sqlx_error)?;
    Ok(UserRecord {
        id: u64::try_from(id).map_err(|_| StoreError::Backend(format!("negative id {id}")))?,
        status: row.try_get("status").map_err(map_sqlx_error)?,
        company: row.try_get("company").map_err(map_sqlx_error)?,
        surname: row.try_get("surname").map_err(map_sqlx_error)?,
        name: row.try_get("name").map_err(map_sqlx_error)?,
        guest: row.try_get("guest").map_err(map_sqlx_error)?,
        covid_pass: row.try_get("covid_pass").map_err(map_sqlx_error)?,
        rank: row.try_get("rank").map_err(map_sqlx_error)?,
        contact_phone: row.try_get("contact_phone").map_err(map_sqlx_error)?,
        contact_mail: row.try_get("contact_mail").map_err(map_sqlx_error)?,
        checkin: row.try_get("checkin").map_err(map_sqlx_error)?,
    })
}

fn id_param(id: u64) -> Result<i64, StoreError> {
    i64::try_from(id).map_err(|_| StoreError::NotFound { id })
}

#[async_trait]
impl UserStore for PostgresUserStore {
    async fn find_by_surname(&self, surname: &str) -> Result<Vec<UserRecord>, StoreError> {
        let sql = format!("SELECT {COLUMNS} FROM users WHERE surname ILIKE $1 ORDER BY id ASC");
        let rows = sqlx::query(&sql)
            .bind(like_pattern(surname))
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        rows.iter().map(row_to_user).collect()
    }

    async fn find_by_id(&self, id: u64) -> Result<UserRecord, StoreError> {
        let sql = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id_param(id)?)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?
            .ok_or(StoreError::NotFound { id })?;

        row_to_user(&row)
    }

    async fn update_user(&self, record: &UserRecord) -> Result<(), StoreError> {
        let result = sqlx::query(
            r"
            UPDATE users
            SET status = $2, company = $3, surname = $4, name = $5, guest = $6,
                covid_pass = $7, rank = $8, contact_phone = $9, contact_mail = $10,
                checkin = $11
            WHERE id = $1
            ",
        )
        .bind(id_param(record.id)?)
        .bind(&record.status)
        .bind(&record.company)
        .bind(&record.surname)
        .bind(&record.name)
        .bind(&record.guest)
        .bind(&record.covid_pass)
        .bind(&record.rank)
        .bind(&record.contact_phone)
        .bind(&record.contact_mail)
        .bind(record.checkin)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound { id: record.id });
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn initialize(&self) -> Result<(), StoreError> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS users (
                id            BIGSERIAL PRIMARY KEY,
                status        TEXT NOT NULL DEFAULT '',
                company       TEXT NOT NULL DEFAULT '',
                surname       TEXT NOT NULL DEFAULT '',
                name          TEXT NOT NULL DEFAULT '',
                guest         TEXT NOT NULL DEFAULT '',
                covid_pass    TEXT NOT NULL DEFAULT '',
                rank          TEXT NOT NULL DEFAULT '',
                contact_phone TEXT NOT NULL DEFAULT '',
                contact_mail  TEXT NOT NULL DEFAULT '',
                checkin       BOOLEAN NOT NULL DEFAULT FALSE
            )
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_users_surname ON users (lower(surname))")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
