// PostgreSQL RegistrationRepository Implementation

use crate::connection::with_transaction;
use crate::error::map_sqlx_error;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use erp_intake_core::domain::{
    ClientType, DomainError, ErpCode, NewRegistration, PriceGrade, Registration, RegistrationId,
    RegistrationPatch, RegistrationStatus,
};
use erp_intake_core::error::{AppError, Result};
use erp_intake_core::port::{ListQuery, RegistrationRepository};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use tracing::{debug, info};

pub struct PgRegistrationRepository {
    pool: PgPool,
}

impl PgRegistrationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl RegistrationRepository for PgRegistrationRepository {
    async fn insert_registration(&self, new: &NewRegistration) -> Result<Registration> {
        // Nothing reaches the store unless every field constraint holds
        new.validate()?;

        let new = new.clone();
        let row = with_transaction(&self.pool, move |conn| {
            Box::pin(async move { insert_row(conn, &new).await })
        })
        .await?;
        let record = row.into_registration()?;

        info!(
            registration_id = record.id,
            erp_code = record.erp_code,
            client_name = %record.client_name,
            "Registration inserted"
        );
        Ok(record)
    }

    async fn get_by_erp_code(&self, erp_code: ErpCode) -> Result<Option<Registration>> {
        let row = sqlx::query_as::<_, RegistrationRow>(
            "SELECT * FROM business_registrations WHERE erp_code = $1",
        )
        .bind(erp_code)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(RegistrationRow::into_registration).transpose()
    }

    async fn get_by_business_number(
        &self,
        business_number: &str,
    ) -> Result<Option<Registration>> {
        let row = sqlx::query_as::<_, RegistrationRow>(
            "SELECT * FROM business_registrations WHERE business_number = $1",
        )
        .bind(business_number)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(RegistrationRow::into_registration).transpose()
    }

    async fn get_by_id(&self, id: RegistrationId) -> Result<Option<Registration>> {
        let row = sqlx::query_as::<_, RegistrationRow>(
            "SELECT * FROM business_registrations WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(RegistrationRow::into_registration).transpose()
    }

    async fn update_registration(
        &self,
        id: RegistrationId,
        patch: &RegistrationPatch,
    ) -> Result<Registration> {
        patch.validate()?;

        if patch.is_empty() {
            return self
                .get_by_id(id)
                .await?
                .ok_or_else(|| not_found(id));
        }

        let patch = patch.clone();
        let row = with_transaction(&self.pool, move |conn| {
            Box::pin(async move { update_row(conn, id, &patch).await })
        })
        .await?
        .ok_or_else(|| not_found(id))?;

        info!(registration_id = id, "Registration updated");
        row.into_registration()
    }

    async fn list_by_status(
        &self,
        status: RegistrationStatus,
        query: ListQuery,
    ) -> Result<Vec<Registration>> {
        // ORDER BY comes from a closed enum, never from caller text
        let sql = format!(
            "SELECT * FROM business_registrations WHERE status = $1 ORDER BY {} LIMIT $2",
            query.order.as_sql()
        );
        let rows: Vec<RegistrationRow> = sqlx::query_as(&sql)
            .bind(status.as_str())
            .bind(query.limit.map(|l| l.max(0)))
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        rows.into_iter()
            .map(RegistrationRow::into_registration)
            .collect()
    }

    async fn count_by_status(&self, status: RegistrationStatus) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM business_registrations WHERE status = $1")
                .bind(status.as_str())
                .fetch_one(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        Ok(count)
    }

    async fn fetch_pending_job(&self) -> Result<Option<Registration>> {
        let row = with_transaction(&self.pool, |conn| Box::pin(claim_row(conn))).await?;

        match row {
            Some(row) => {
                let record = row.into_registration()?;
                info!(
                    registration_id = record.id,
                    erp_code = record.erp_code,
                    client_name = %record.client_name,
                    "Claimed pending registration"
                );
                Ok(Some(record))
            }
            None => {
                debug!("No claimable registration");
                Ok(None)
            }
        }
    }

    async fn update_status(
        &self,
        id: RegistrationId,
        status: RegistrationStatus,
    ) -> Result<Registration> {
        let row = with_transaction(&self.pool, move |conn| {
            Box::pin(async move { update_status_row(conn, id, status).await })
        })
        .await?
        .ok_or_else(|| not_found(id))?;

        info!(registration_id = id, status = %status, "Status updated");
        row.into_registration()
    }
}

fn not_found(id: RegistrationId) -> AppError {
    AppError::NotFound(format!("Registration {} not found", id))
}

async fn insert_row(conn: &mut PgConnection, new: &NewRegistration) -> Result<RegistrationRow> {
    if let Some(code) = new.erp_code {
        reserve_explicit_code(conn, code).await?;
    }

    sqlx::query_as::<_, RegistrationRow>(
        r#"
        INSERT INTO business_registrations (
            erp_code,
            client_name, business_name, representative_name,
            business_number, branch_number,
            postal_code, address1, address2,
            business_type, business_item,
            phone1, phone2, fax,
            contact_person1, mobile1, contact_person2, mobile2,
            client_type, price_grade,
            initial_balance, optimal_balance, memo,
            confidence, image_url,
            discord_user_id, discord_message_id
        ) VALUES (
            COALESCE($1, nextval('erp_code_seq')::INTEGER),
            $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
            $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27
        )
        RETURNING *
        "#,
    )
    .bind(new.erp_code)
    .bind(&new.client_name)
    .bind(&new.business_name)
    .bind(&new.representative_name)
    .bind(&new.business_number)
    .bind(&new.branch_number)
    .bind(&new.postal_code)
    .bind(&new.address1)
    .bind(&new.address2)
    .bind(&new.business_type)
    .bind(&new.business_item)
    .bind(&new.phone1)
    .bind(&new.phone2)
    .bind(&new.fax)
    .bind(&new.contact_person1)
    .bind(&new.mobile1)
    .bind(&new.contact_person2)
    .bind(&new.mobile2)
    .bind(&new.client_type)
    .bind(&new.price_grade)
    .bind(new.initial_balance)
    .bind(new.optimal_balance)
    .bind(&new.memo)
    .bind(new.confidence)
    .bind(&new.image_url)
    .bind(&new.discord_user_id)
    .bind(&new.discord_message_id)
    .fetch_one(conn)
    .await
    .map_err(map_sqlx_error)
}

/// Accept a caller-supplied code only above everything the sequence has
/// handed out, then move the sequence past it.
async fn reserve_explicit_code(conn: &mut PgConnection, code: ErpCode) -> Result<()> {
    // Conflicts with the ROW EXCLUSIVE lock every INSERT takes, so no
    // other insert can draw from the sequence until this transaction ends
    sqlx::query("LOCK TABLE business_registrations IN SHARE ROW EXCLUSIVE MODE")
        .execute(&mut *conn)
        .await
        .map_err(map_sqlx_error)?;

    let (last_value, is_called): (i64, bool) =
        sqlx::query_as("SELECT last_value, is_called FROM erp_code_seq")
            .fetch_one(&mut *conn)
            .await
            .map_err(map_sqlx_error)?;
    let last_assigned = if is_called { last_value } else { last_value - 1 };

    if i64::from(code) <= last_assigned {
        return Err(AppError::Validation(format!(
            "erp_code {} is not above the last assigned code {}",
            code, last_assigned
        )));
    }

    sqlx::query("SELECT setval('erp_code_seq', $1)")
        .bind(i64::from(code))
        .execute(&mut *conn)
        .await
        .map_err(map_sqlx_error)?;

    debug!(erp_code = code, "Sequence advanced past explicit ERP code");
    Ok(())
}

async fn update_row(
    conn: &mut PgConnection,
    id: RegistrationId,
    patch: &RegistrationPatch,
) -> Result<Option<RegistrationRow>> {
    // Column names come from the patch's fixed list
    let mut builder = QueryBuilder::<Postgres>::new("UPDATE business_registrations SET ");
    {
        let mut set = builder.separated(", ");
        for (column, value) in patch.text_fields() {
            set.push(column);
            set.push_unseparated(" = ");
            set.push_bind_unseparated(value.to_string());
        }
        for (column, value) in patch.integer_fields() {
            set.push(column);
            set.push_unseparated(" = ");
            set.push_bind_unseparated(value);
        }
    }
    builder.push(" WHERE id = ");
    builder.push_bind(id);
    builder.push(" RETURNING *");

    builder
        .build_query_as::<RegistrationRow>()
        .fetch_optional(conn)
        .await
        .map_err(map_sqlx_error)
}

/// Lock one pending row, skipping rows other claimants hold, and flip it
/// to processing in the same statement.
async fn claim_row(conn: &mut PgConnection) -> Result<Option<RegistrationRow>> {
    sqlx::query_as::<_, RegistrationRow>(
        r#"
        UPDATE business_registrations
        SET status = $1
        WHERE id = (
            SELECT id FROM business_registrations
            WHERE status = $2
            ORDER BY created_at, id
            LIMIT 1
            FOR UPDATE SKIP LOCKED
        )
        RETURNING *
        "#,
    )
    .bind(RegistrationStatus::Processing.as_str())
    .bind(RegistrationStatus::Pending.as_str())
    .fetch_optional(conn)
    .await
    .map_err(map_sqlx_error)
}

/// Terminal states keep the first processed_at, so repeats are stable
async fn update_status_row(
    conn: &mut PgConnection,
    id: RegistrationId,
    status: RegistrationStatus,
) -> Result<Option<RegistrationRow>> {
    sqlx::query_as::<_, RegistrationRow>(
        r#"
        UPDATE business_registrations
        SET status = $1,
            processed_at = CASE WHEN $2 THEN COALESCE(processed_at, NOW()) ELSE processed_at END
        WHERE id = $3
        RETURNING *
        "#,
    )
    .bind(status.as_str())
    .bind(status.is_terminal())
    .bind(id)
    .fetch_optional(conn)
    .await
    .map_err(map_sqlx_error)
}

/// PostgreSQL row representation
#[derive(Debug, sqlx::FromRow)]
struct RegistrationRow {
    id: i64,
    erp_code: i32,
    client_name: String,
    business_name: String,
    representative_name: Option<String>,
    business_number: Option<String>,
    branch_number: Option<String>,
    postal_code: Option<String>,
    address1: Option<String>,
    address2: Option<String>,
    business_type: Option<String>,
    business_item: Option<String>,
    phone1: Option<String>,
    phone2: Option<String>,
    fax: Option<String>,
    contact_person1: Option<String>,
    mobile1: Option<String>,
    contact_person2: Option<String>,
    mobile2: Option<String>,
    client_type: Option<String>, // CHAR(1)
    price_grade: Option<String>, // CHAR(1)
    initial_balance: i64,
    optimal_balance: i64,
    memo: Option<String>,
    confidence: Option<f64>,
    image_url: Option<String>,
    status: String,
    discord_user_id: Option<String>,
    discord_message_id: Option<String>,
    created_at: DateTime<Utc>,
    processed_at: Option<DateTime<Utc>>,
}

impl RegistrationRow {
    fn into_registration(self) -> Result<Registration> {
        // Check constraints keep these in range; anything else is corruption
        let id = self.id;
        let corrupt = |e: DomainError| AppError::Internal(format!("registration {}: {}", id, e));

        let status: RegistrationStatus = self.status.parse().map_err(corrupt)?;
        let client_type: Option<ClientType> = self
            .client_type
            .as_deref()
            .map(|c| c.trim().parse::<ClientType>())
            .transpose()
            .map_err(corrupt)?;
        let price_grade: Option<PriceGrade> = self
            .price_grade
            .as_deref()
            .map(|c| c.trim().parse::<PriceGrade>())
            .transpose()
            .map_err(corrupt)?;

        Ok(Registration {
            id: self.id,
            erp_code: self.erp_code,
            client_name: self.client_name,
            business_name: self.business_name,
            representative_name: self.representative_name,
            business_number: self.business_number,
            branch_number: self.branch_number,
            postal_code: self.postal_code,
            address1: self.address1,
            address2: self.address2,
            business_type: self.business_type,
            business_item: self.business_item,
            phone1: self.phone1,
            phone2: self.phone2,
            fax: self.fax,
            contact_person1: self.contact_person1,
            mobile1: self.mobile1,
            contact_person2: self.contact_person2,
            mobile2: self.mobile2,
            client_type,
            price_grade,
            initial_balance: self.initial_balance,
            optimal_balance: self.optimal_balance,
            memo: self.memo,
            confidence: self.confidence,
            image_url: self.image_url,
            status,
            discord_user_id: self.discord_user_id,
            discord_message_id: self.discord_message_id,
            created_at: self.created_at,
            processed_at: self.processed_at,
        })
    }
}
