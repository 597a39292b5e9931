//! Repository for the `delivery_logs` table.

use aguaruta_core::delivery_log::{DeliveryLogFilter, NewDeliveryLog, UNDELIVERED_PREFIX};
use sqlx::PgPool;

use crate::models::delivery_log::DeliveryLog;

const COLUMNS: &str = "id, household_name, vehicle_code, liters, status, delivered_at, \
     latitude, longitude, created_at";

pub struct DeliveryLogRepo;

impl DeliveryLogRepo {
    /// Record one delivery. A missing timestamp defaults to now.
    pub async fn create(pool: &PgPool, input: &NewDeliveryLog) -> Result<DeliveryLog, sqlx::Error> {
        let query = format!(
            "INSERT INTO delivery_logs \
                (household_name, vehicle_code, liters, status, delivered_at, latitude, longitude) \
             VALUES ($1, $2, $3, $4, COALESCE($5, NOW()), $6, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DeliveryLog>(&query)
            .bind(&input.household_name)
            .bind(&input.vehicle_code)
            .bind(input.liters)
            .bind(&input.status)
            .bind(input.delivered_at)
            .bind(input.latitude)
            .bind(input.longitude)
            .fetch_one(pool)
            .await
    }

    /// List deliveries, newest first.
    ///
    /// Dates compare against the UTC calendar day of `delivered_at`, both
    /// bounds inclusive. Status and vehicle compare case-insensitively.
    pub async fn list(pool: &PgPool, filter: &DeliveryLogFilter) -> Result<Vec<DeliveryLog>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM delivery_logs \
             WHERE ($1::date IS NULL OR (delivered_at AT TIME ZONE 'UTC')::date >= $1) \
               AND ($2::date IS NULL OR (delivered_at AT TIME ZONE 'UTC')::date <= $2) \
               AND ($3::text IS NULL OR UPPER(status) = UPPER($3)) \
               AND ($4::text IS NULL OR UPPER(TRIM(vehicle_code)) = UPPER(TRIM($4))) \
               AND (NOT $5::boolean OR UPPER(TRIM(status)) LIKE $6::text || '%') \
             ORDER BY delivered_at DESC, id DESC"
        );
        sqlx::query_as::<_, DeliveryLog>(&query)
            .bind(filter.from)
            .bind(filter.to)
            .bind(&filter.status)
            .bind(&filter.vehicle)
            .bind(filter.undelivered_only)
            .bind(UNDELIVERED_PREFIX)
            .fetch_all(pool)
            .await
    }
}
