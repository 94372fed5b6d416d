/// Customers owned by a team
///
/// Projects may reference a customer; the customer must belong to the
/// project's team.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

const CUSTOMER_COLUMNS: &str = "id, team_id, name, email, phone, company, address, city, country, \
                                notes, created_at, updated_at";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Customer {
    pub id: Uuid,
    pub team_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct CreateCustomer {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub notes: Option<String>,
}

impl Customer {
    pub async fn create<'e>(
        db: impl PgExecutor<'e>,
        team_id: Uuid,
        data: CreateCustomer,
    ) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO customers (team_id, name, email, phone, company, address, city, country, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            CUSTOMER_COLUMNS
        );

        sqlx::query_as::<_, Customer>(&query)
            .bind(team_id)
            .bind(data.name)
            .bind(data.email)
            .bind(data.phone)
            .bind(data.company)
            .bind(data.address)
            .bind(data.city)
            .bind(data.country)
            .bind(data.notes)
            .fetch_one(db)
            .await
    }

    /// Whether the customer exists and belongs to the team
    pub async fn belongs_to_team<'e>(
        db: impl PgExecutor<'e>,
        id: Uuid,
        team_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM customers WHERE id = $1 AND team_id = $2)")
            .bind(id)
            .bind(team_id)
            .fetch_one(db)
            .await
    }

    /// A team's customers, by name
    pub async fn list_for_team(pool: &PgPool, team_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM customers WHERE team_id = $1 ORDER BY name ASC",
            CUSTOMER_COLUMNS
        );

        sqlx::query_as::<_, Customer>(&query)
            .bind(team_id)
            .fetch_all(pool)
            .await
    }
}
