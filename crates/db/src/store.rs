//! PostgreSQL implementation of the core [`DeliveryStore`] seam.

use aguaruta_core::point::{NewDeliveryPoint, StoredPoint};
use aguaruta_core::roster::normalize_vehicle_code;
use aguaruta_core::store::{DeliveryStore, StoreError, StoreTransaction};
use aguaruta_core::types::DbId;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::delivery_point::DeliveryPoint;
use crate::repositories::delivery_point_repo::COLUMNS;

/// Advisory lock key taken by every bulk apply.
///
/// Transaction-scoped, so it is released on commit or rollback and
/// serializes bulk writers across processes sharing the database.
pub const BULK_APPLY_LOCK_ID: i64 = 736_492_018;

#[derive(Debug, Clone)]
pub struct PgDeliveryStore {
    pool: PgPool,
}

impl PgDeliveryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeliveryStore for PgDeliveryStore {
    type Tx = PgStoreTransaction;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        let tx = self.pool.begin().await.map_err(StoreError::backend)?;
        Ok(PgStoreTransaction { tx })
    }
}

/// An open database transaction. Dropping it without commit rolls back.
pub struct PgStoreTransaction {
    tx: Transaction<'static, Postgres>,
}

/// Column-wise arrays for an `UNNEST` insert.
#[derive(Default)]
struct Columns {
    vehicles: Vec<String>,
    names: Vec<String>,
    days: Vec<Option<String>>,
    liters: Vec<i32>,
    phones: Vec<Option<String>>,
    latitudes: Vec<Option<f64>>,
    longitudes: Vec<Option<f64>>,
}

impl Columns {
    fn push(&mut self, point: &NewDeliveryPoint) {
        self.vehicles.push(point.vehicle.clone());
        self.names.push(point.name.clone());
        self.days.push(point.day.clone());
        self.liters.push(point.liters);
        self.phones.push(point.phone.clone());
        self.latitudes.push(point.latitude);
        self.longitudes.push(point.longitude);
    }
}

#[async_trait]
impl StoreTransaction for PgStoreTransaction {
    async fn lock_bulk_writes(&mut self) -> Result<(), StoreError> {
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(BULK_APPLY_LOCK_ID)
            .execute(&mut *self.tx)
            .await
            .map_err(StoreError::backend)?;
        tracing::debug!(lock_id = BULK_APPLY_LOCK_ID, "Bulk apply lock acquired");
        Ok(())
    }

    async fn list_all(&mut self) -> Result<Vec<StoredPoint>, StoreError> {
        let query = format!("SELECT {COLUMNS} FROM delivery_points ORDER BY id");
        let rows = sqlx::query_as::<_, DeliveryPoint>(&query)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(StoreError::backend)?;
        Ok(rows.into_iter().map(StoredPoint::from).collect())
    }

    async fn list_by_vehicle(&mut self, vehicle: &str) -> Result<Vec<StoredPoint>, StoreError> {
        let query = format!(
            "SELECT {COLUMNS} FROM delivery_points \
             WHERE UPPER(TRIM(vehicle_code)) = $1 \
             ORDER BY id"
        );
        let rows = sqlx::query_as::<_, DeliveryPoint>(&query)
            .bind(normalize_vehicle_code(vehicle))
            .fetch_all(&mut *self.tx)
            .await
            .map_err(StoreError::backend)?;
        Ok(rows.into_iter().map(StoredPoint::from).collect())
    }

    async fn clear(&mut self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM delivery_points")
            .execute(&mut *self.tx)
            .await
            .map_err(StoreError::backend)?;
        Ok(result.rows_affected())
    }

    async fn restore(&mut self, rows: &[StoredPoint]) -> Result<u64, StoreError> {
        if rows.is_empty() {
            return Ok(0);
        }

        let ids: Vec<DbId> = rows.iter().map(|r| r.id).collect();
        let mut cols = Columns::default();
        for row in rows {
            cols.push(&NewDeliveryPoint {
                vehicle: row.vehicle.clone(),
                name: row.name.clone(),
                day: row.day.clone(),
                liters: row.liters,
                phone: row.phone.clone(),
                latitude: row.latitude,
                longitude: row.longitude,
            });
        }

        let result = sqlx::query(
            "INSERT INTO delivery_points \
                (id, vehicle_code, household_name, weekday, liters, phone, latitude, longitude) \
             SELECT * FROM UNNEST($1::bigint[], $2::text[], $3::text[], $4::text[], \
                                  $5::int[], $6::text[], $7::float8[], $8::float8[])",
        )
        .bind(&ids)
        .bind(&cols.vehicles)
        .bind(&cols.names)
        .bind(&cols.days)
        .bind(&cols.liters)
        .bind(&cols.phones)
        .bind(&cols.latitudes)
        .bind(&cols.longitudes)
        .execute(&mut *self.tx)
        .await
        .map_err(StoreError::backend)?;
        Ok(result.rows_affected())
    }

    async fn insert_many(&mut self, points: &[NewDeliveryPoint]) -> Result<u64, StoreError> {
        if points.is_empty() {
            return Ok(0);
        }

        let mut cols = Columns::default();
        for point in points {
            cols.push(point);
        }

        let result = sqlx::query(
            "INSERT INTO delivery_points \
                (vehicle_code, household_name, weekday, liters, phone, latitude, longitude) \
             SELECT * FROM UNNEST($1::text[], $2::text[], $3::text[], \
                                  $4::int[], $5::text[], $6::float8[], $7::float8[])",
        )
        .bind(&cols.vehicles)
        .bind(&cols.names)
        .bind(&cols.days)
        .bind(&cols.liters)
        .bind(&cols.phones)
        .bind(&cols.latitudes)
        .bind(&cols.longitudes)
        .execute(&mut *self.tx)
        .await
        .map_err(StoreError::backend)?;
        Ok(result.rows_affected())
    }

    async fn insert_one(&mut self, point: &NewDeliveryPoint) -> Result<DbId, StoreError> {
        let row: (DbId,) = sqlx::query_as(
            "INSERT INTO delivery_points \
                (vehicle_code, household_name, weekday, liters, phone, latitude, longitude) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING id",
        )
        .bind(&point.vehicle)
        .bind(&point.name)
        .bind(&point.day)
        .bind(point.liters)
        .bind(&point.phone)
        .bind(point.latitude)
        .bind(point.longitude)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(StoreError::backend)?;
        Ok(row.0)
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await.map_err(StoreError::backend)
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.tx.rollback().await.map_err(StoreError::backend)
    }
}
