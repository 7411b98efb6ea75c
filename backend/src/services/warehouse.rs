//! Warehouse and product catalog service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::serial::SerialRegistryService;
use shared::validate_warehouse_code;

/// Warehouse and product catalog service
#[derive(Clone)]
pub struct WarehouseService {
    db: PgPool,
    serials: SerialRegistryService,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Warehouse {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Product {
    pub id: Uuid,
    pub sku: String,
    pub name: String,
    pub tracks_serials: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateWarehouseRequest {
    pub code: String,
    pub name: String,
    pub address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub tracks_serials: bool,
}

#[derive(Debug, Deserialize)]
pub struct StockProductRequest {
    pub warehouse_id: Uuid,
    pub product_id: Uuid,
    pub critical_level_qty: Option<i64>,
}

impl WarehouseService {
    /// Create a new WarehouseService instance
    pub fn new(db: PgPool) -> Self {
        let serials = SerialRegistryService::new(db.clone());
        Self { db, serials }
    }

    pub async fn create_warehouse(&self, req: CreateWarehouseRequest) -> AppResult<Warehouse> {
        validate_warehouse_code(&req.code)?;
        if req.name.trim().is_empty() {
            return Err(AppError::Validation {
                field: "name".to_string(),
                message: "Warehouse name is required".to_string(),
            });
        }

        let existing: Option<Uuid> = sqlx::query_scalar("SELECT id FROM warehouses WHERE code = $1")
            .bind(&req.code)
            .fetch_optional(&self.db)
            .await?;
        if existing.is_some() {
            return Err(AppError::DuplicateEntry("warehouse code".to_string()));
        }

        let warehouse = sqlx::query_as::<_, Warehouse>(
            r#"
            INSERT INTO warehouses (code, name, address)
            VALUES ($1, $2, $3)
            RETURNING id, code, name, address, created_at, updated_at
            "#,
        )
        .bind(&req.code)
        .bind(&req.name)
        .bind(&req.address)
        .fetch_one(&self.db)
        .await?;

        Ok(warehouse)
    }

    pub async fn get_warehouse(&self, id: Uuid) -> AppResult<Warehouse> {
        sqlx::query_as::<_, Warehouse>(
            "SELECT id, code, name, address, created_at, updated_at FROM warehouses WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Warehouse".to_string()))
    }

    pub async fn list_warehouses(&self) -> AppResult<Vec<Warehouse>> {
        let warehouses = sqlx::query_as::<_, Warehouse>(
            "SELECT id, code, name, address, created_at, updated_at FROM warehouses ORDER BY code",
        )
        .fetch_all(&self.db)
        .await?;
        Ok(warehouses)
    }

    pub async fn create_product(&self, req: CreateProductRequest) -> AppResult<Product> {
        if req.sku.trim().is_empty() {
            return Err(AppError::Validation {
                field: "sku".to_string(),
                message: "SKU is required".to_string(),
            });
        }
        if req.name.trim().is_empty() {
            return Err(AppError::Validation {
                field: "name".to_string(),
                message: "Product name is required".to_string(),
            });
        }

        let existing: Option<Uuid> = sqlx::query_scalar("SELECT id FROM products WHERE sku = $1")
            .bind(&req.sku)
            .fetch_optional(&self.db)
            .await?;
        if existing.is_some() {
            return Err(AppError::DuplicateEntry("SKU".to_string()));
        }

        let product = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (sku, name, tracks_serials)
            VALUES ($1, $2, $3)
            RETURNING id, sku, name, tracks_serials, created_at, updated_at
            "#,
        )
        .bind(&req.sku)
        .bind(&req.name)
        .bind(req.tracks_serials)
        .fetch_one(&self.db)
        .await?;

        Ok(product)
    }

    pub async fn get_product(&self, id: Uuid) -> AppResult<Product> {
        sqlx::query_as::<_, Product>(
            "SELECT id, sku, name, tracks_serials, created_at, updated_at FROM products WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))
    }

    pub async fn list_products(&self) -> AppResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            "SELECT id, sku, name, tracks_serials, created_at, updated_at FROM products ORDER BY sku",
        )
        .fetch_all(&self.db)
        .await?;
        Ok(products)
    }

    /// Stock a product in a warehouse, creating its ledger row at zero.
    /// Serial tracking is fixed from the product at stocking time.
    pub async fn stock_product(&self, req: StockProductRequest) -> AppResult<Uuid> {
        if let Some(level) = req.critical_level_qty {
            if level < 0 {
                return Err(AppError::Validation {
                    field: "critical_level_qty".to_string(),
                    message: "Critical level cannot be negative".to_string(),
                });
            }
        }

        let product = self.get_product(req.product_id).await?;
        self.get_warehouse(req.warehouse_id).await?;

        let existing: Option<Uuid> = sqlx::query_scalar(
            r#"
            SELECT id FROM warehouse_products
            WHERE warehouse_id = $1 AND product_id = $2 AND archived_at IS NULL
            "#,
        )
        .bind(req.warehouse_id)
        .bind(req.product_id)
        .fetch_optional(&self.db)
        .await?;
        if existing.is_some() {
            return Err(AppError::DuplicateEntry(
                "product in this warehouse".to_string(),
            ));
        }

        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO warehouse_products (warehouse_id, product_id, qty, has_serials,
                                            critical_level_qty)
            VALUES ($1, $2, 0, $3, $4)
            RETURNING id
            "#,
        )
        .bind(req.warehouse_id)
        .bind(req.product_id)
        .bind(product.tracks_serials)
        .bind(req.critical_level_qty)
        .fetch_one(&self.db)
        .await?;

        Ok(id)
    }

    /// Archive an empty stock level so it stops appearing in listings
    pub async fn archive_stock_level(&self, warehouse_product_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let qty: i64 = sqlx::query_scalar(
            r#"
            SELECT qty FROM warehouse_products
            WHERE id = $1 AND archived_at IS NULL
            FOR UPDATE
            "#,
        )
        .bind(warehouse_product_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Stock level".to_string()))?;

        if qty != 0 {
            return Err(AppError::ValidationError(format!(
                "Cannot archive a stock level with {} units on hand",
                qty
            )));
        }

        // qty 0 with live serials means the registry disagrees with the ledger
        let live = self.serials.live_count(warehouse_product_id).await?;
        if live > 0 {
            return Err(AppError::ValidationError(format!(
                "Cannot archive a stock level with {} live serial units",
                live
            )));
        }

        sqlx::query(
            "UPDATE warehouse_products SET archived_at = NOW(), updated_at = NOW() WHERE id = $1",
        )
        .bind(warehouse_product_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn update_critical_level(
        &self,
        warehouse_product_id: Uuid,
        critical_level_qty: Option<i64>,
    ) -> AppResult<()> {
        if let Some(level) = critical_level_qty {
            if level < 0 {
                return Err(AppError::Validation {
                    field: "critical_level_qty".to_string(),
                    message: "Critical level cannot be negative".to_string(),
                });
            }
        }

        let updated = sqlx::query(
            r#"
            UPDATE warehouse_products
            SET critical_level_qty = $1, updated_at = NOW()
            WHERE id = $2 AND archived_at IS NULL
            "#,
        )
        .bind(critical_level_qty)
        .bind(warehouse_product_id)
        .execute(&self.db)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(AppError::NotFound("Stock level".to_string()));
        }
        Ok(())
    }
}
