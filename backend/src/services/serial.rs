//! Serial registry service
//!
//! Tracks individually serialized units per warehouse-product. A serial
//! number may appear in many historical rows, but at most one row per
//! warehouse-product is in a live state (available or reserved) at a
//! time; consumption stamps the consuming document line for traceability.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::{validate_serial_number, SerialState, SerialUnitSpec};

/// Serial registry service
#[derive(Clone)]
pub struct SerialRegistryService {
    db: PgPool,
}

/// One tracked unit
#[derive(Debug, Clone, serde::Serialize, FromRow)]
pub struct SerialUnit {
    pub id: Uuid,
    pub warehouse_product_id: Uuid,
    pub serial_number: String,
    pub batch_number: Option<String>,
    pub manufactured_at: Option<NaiveDate>,
    pub expired_at: Option<NaiveDate>,
    pub state: String,
    pub source_line_id: Option<Uuid>,
    pub consumed_by_line_id: Option<Uuid>,
    pub replaces_unit_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SerialUnit {
    pub fn state(&self) -> Option<SerialState> {
        SerialState::parse(&self.state)
    }
}

#[derive(Debug, FromRow)]
struct LockedUnit {
    id: Uuid,
    state: String,
    batch_number: Option<String>,
    manufactured_at: Option<NaiveDate>,
    expired_at: Option<NaiveDate>,
}

impl SerialRegistryService {
    /// Create a new SerialRegistryService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Register freshly received units as available stock.
    ///
    /// Fails with `DuplicateEntry` when any serial number already has a
    /// live unit under the same warehouse-product.
    pub async fn register_units(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        warehouse_product_id: Uuid,
        specs: &[SerialUnitSpec],
        source_line_id: Option<Uuid>,
    ) -> AppResult<Vec<Uuid>> {
        let mut ids = Vec::with_capacity(specs.len());
        for spec in specs {
            ids.push(
                self.register_unit(tx, warehouse_product_id, spec, source_line_id, None)
                    .await?,
            );
        }
        Ok(ids)
    }

    /// Register one unit, optionally linked to the unit it replaces
    pub async fn register_unit(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        warehouse_product_id: Uuid,
        spec: &SerialUnitSpec,
        source_line_id: Option<Uuid>,
        replaces_unit_id: Option<Uuid>,
    ) -> AppResult<Uuid> {
        validate_serial_number(&spec.serial_number)?;

        let live: Option<Uuid> = sqlx::query_scalar(
            r#"
            SELECT id FROM serial_units
            WHERE warehouse_product_id = $1 AND serial_number = $2
              AND state IN ('available', 'reserved')
            "#,
        )
        .bind(warehouse_product_id)
        .bind(&spec.serial_number)
        .fetch_optional(&mut **tx)
        .await?;

        if live.is_some() {
            return Err(AppError::DuplicateEntry(format!(
                "serial number '{}'",
                spec.serial_number
            )));
        }

        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO serial_units (warehouse_product_id, serial_number, batch_number,
                                      manufactured_at, expired_at, state, source_line_id,
                                      replaces_unit_id)
            VALUES ($1, $2, $3, $4, $5, 'available', $6, $7)
            RETURNING id
            "#,
        )
        .bind(warehouse_product_id)
        .bind(&spec.serial_number)
        .bind(&spec.batch_number)
        .bind(spec.manufactured_at)
        .bind(spec.expired_at)
        .bind(source_line_id)
        .bind(replaces_unit_id)
        .fetch_one(&mut **tx)
        .await?;

        Ok(id)
    }

    /// Move a unit to a reserved or consumed state for a document line.
    ///
    /// Returns the unit's attributes so transfer execution can re-register
    /// the same unit at the destination.
    pub async fn reserve_or_consume(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        warehouse_product_id: Uuid,
        serial_number: &str,
        target: SerialState,
        consumed_by_line_id: Option<Uuid>,
    ) -> AppResult<SerialUnitSpec> {
        let unit = sqlx::query_as::<_, LockedUnit>(
            r#"
            SELECT id, state, batch_number, manufactured_at, expired_at
            FROM serial_units
            WHERE warehouse_product_id = $1 AND serial_number = $2
            ORDER BY created_at DESC
            LIMIT 1
            FOR UPDATE
            "#,
        )
        .bind(warehouse_product_id)
        .bind(serial_number)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::SerialNotFound(serial_number.to_string()))?;

        let current = SerialState::parse(&unit.state)
            .ok_or_else(|| AppError::Internal(format!("corrupt serial state '{}'", unit.state)))?;

        if !current.may_become(target) {
            return Err(AppError::SerialAlreadyConsumed(format!(
                "Serial number '{}' is {} and cannot become {}",
                serial_number,
                current.as_str(),
                target.as_str()
            )));
        }

        sqlx::query(
            r#"
            UPDATE serial_units
            SET state = $1, consumed_by_line_id = $2, updated_at = NOW()
            WHERE id = $3
            "#,
        )
        .bind(target.as_str())
        .bind(consumed_by_line_id)
        .bind(unit.id)
        .execute(&mut **tx)
        .await?;

        Ok(SerialUnitSpec {
            serial_number: serial_number.to_string(),
            batch_number: unit.batch_number,
            manufactured_at: unit.manufactured_at,
            expired_at: unit.expired_at,
        })
    }

    /// Consume a batch of serials for one document line. Any failure
    /// aborts the caller's transaction, so the batch is all-or-nothing.
    pub async fn consume_batch(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        warehouse_product_id: Uuid,
        serial_numbers: &[String],
        target: SerialState,
        consumed_by_line_id: Uuid,
    ) -> AppResult<Vec<SerialUnitSpec>> {
        let mut specs = Vec::with_capacity(serial_numbers.len());
        for serial in serial_numbers {
            specs.push(
                self.reserve_or_consume(
                    tx,
                    warehouse_product_id,
                    serial,
                    target,
                    Some(consumed_by_line_id),
                )
                .await?,
            );
        }
        Ok(specs)
    }

    /// Release a reserved unit back to available
    pub async fn release(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        warehouse_product_id: Uuid,
        serial_number: &str,
    ) -> AppResult<()> {
        self.reserve_or_consume(
            tx,
            warehouse_product_id,
            serial_number,
            SerialState::Available,
            None,
        )
        .await?;
        Ok(())
    }

    /// Warranty replacement: mark the sold unit as replaced by a new
    /// available unit carrying the replacement serial number.
    pub async fn replace_unit(
        &self,
        sold_unit_id: Uuid,
        replacement: &SerialUnitSpec,
    ) -> AppResult<Uuid> {
        let mut tx = self.db.begin().await?;

        let sold = sqlx::query_as::<_, SerialUnit>(
            r#"
            SELECT id, warehouse_product_id, serial_number, batch_number, manufactured_at,
                   expired_at, state, source_line_id, consumed_by_line_id, replaces_unit_id,
                   created_at, updated_at
            FROM serial_units
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(sold_unit_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Serial unit".to_string()))?;

        if sold.state() != Some(SerialState::Sold) {
            return Err(AppError::ValidationError(format!(
                "Only sold units can be replaced; unit is '{}'",
                sold.state
            )));
        }

        let new_id = self
            .register_unit(
                &mut tx,
                sold.warehouse_product_id,
                replacement,
                None,
                Some(sold.id),
            )
            .await?;

        tx.commit().await?;
        Ok(new_id)
    }

    /// Latest unit for a serial number under a warehouse-product
    pub async fn get_unit(
        &self,
        warehouse_product_id: Uuid,
        serial_number: &str,
    ) -> AppResult<SerialUnit> {
        let unit = sqlx::query_as::<_, SerialUnit>(
            r#"
            SELECT id, warehouse_product_id, serial_number, batch_number, manufactured_at,
                   expired_at, state, source_line_id, consumed_by_line_id, replaces_unit_id,
                   created_at, updated_at
            FROM serial_units
            WHERE warehouse_product_id = $1 AND serial_number = $2
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(warehouse_product_id)
        .bind(serial_number)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::SerialNotFound(serial_number.to_string()))?;

        Ok(unit)
    }

    /// List units for a warehouse-product, optionally filtered by state
    pub async fn list_units(
        &self,
        warehouse_product_id: Uuid,
        state: Option<SerialState>,
    ) -> AppResult<Vec<SerialUnit>> {
        let units = sqlx::query_as::<_, SerialUnit>(
            r#"
            SELECT id, warehouse_product_id, serial_number, batch_number, manufactured_at,
                   expired_at, state, source_line_id, consumed_by_line_id, replaces_unit_id,
                   created_at, updated_at
            FROM serial_units
            WHERE warehouse_product_id = $1
              AND ($2::TEXT IS NULL OR state = $2)
            ORDER BY created_at
            "#,
        )
        .bind(warehouse_product_id)
        .bind(state.map(|s| s.as_str()))
        .fetch_all(&self.db)
        .await?;

        Ok(units)
    }

    /// Count of live (available or reserved) units
    pub async fn live_count(&self, warehouse_product_id: Uuid) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM serial_units
            WHERE warehouse_product_id = $1 AND state IN ('available', 'reserved')
            "#,
        )
        .bind(warehouse_product_id)
        .fetch_one(&self.db)
        .await?;

        Ok(count)
    }
}
