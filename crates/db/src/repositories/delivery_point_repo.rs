//! Repository for the `delivery_points` table.

use aguaruta_core::types::DbId;
use sqlx::PgPool;

use crate::models::delivery_point::{DeliveryPoint, RouteFilter, UpdateDeliveryPoint};

pub(crate) const COLUMNS: &str = "id, vehicle_code, household_name, weekday, liters, \
     phone, latitude, longitude, created_at, updated_at";

/// Read and patch access to the live route table.
///
/// Bulk replace and registration go through [`crate::store::PgDeliveryStore`]
/// so they can share one transaction.
pub struct DeliveryPointRepo;

impl DeliveryPointRepo {
    /// List the live routes ordered by vehicle, day and household.
    ///
    /// Vehicle and day filters compare case-insensitively.
    pub async fn list(pool: &PgPool, filter: &RouteFilter) -> Result<Vec<DeliveryPoint>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM delivery_points \
             WHERE ($1::text IS NULL OR UPPER(TRIM(vehicle_code)) = UPPER(TRIM($1))) \
               AND ($2::text IS NULL OR UPPER(TRIM(weekday)) = UPPER(TRIM($2))) \
             ORDER BY vehicle_code, weekday NULLS LAST, household_name, id"
        );
        sqlx::query_as::<_, DeliveryPoint>(&query)
            .bind(&filter.vehicle)
            .bind(&filter.day)
            .fetch_all(pool)
            .await
    }

    /// Find a delivery point by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<DeliveryPoint>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM delivery_points WHERE id = $1");
        sqlx::query_as::<_, DeliveryPoint>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Count every row of the live table.
    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM delivery_points")
            .fetch_one(pool)
            .await?;
        Ok(row.0)
    }

    /// Patch a delivery point. Returns `None` when the id does not exist.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateDeliveryPoint,
    ) -> Result<Option<DeliveryPoint>, sqlx::Error> {
        let query = format!(
            "UPDATE delivery_points SET
                vehicle_code   = COALESCE($2, vehicle_code),
                household_name = COALESCE($3, household_name),
                weekday        = COALESCE($4, weekday),
                liters         = COALESCE($5, liters),
                phone          = COALESCE($6, phone),
                latitude       = COALESCE($7, latitude),
                longitude      = COALESCE($8, longitude)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DeliveryPoint>(&query)
            .bind(id)
            .bind(&input.vehicle_code)
            .bind(&input.household_name)
            .bind(&input.weekday)
            .bind(input.liters)
            .bind(&input.phone)
            .bind(input.latitude)
            .bind(input.longitude)
            .fetch_optional(pool)
            .await
    }
}
