//! SQLite storage for receipts and line items.
//!
//! Every read goes to the database, so edits are visible to the next read.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, Transaction};
use tracing::{debug, info};

use crate::error::{Result, StoreError};
use crate::extract::ReceiptParser;
use crate::models::receipt::{
    LineItem, LineItemDraft, LineItemInput, Receipt, ReceiptDraft, ReceiptSummary, ReceiptUpdate,
};

/// Default maximum number of pooled connections for file databases.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Receipt repository backed by a SQLite pool.
#[derive(Debug, Clone)]
pub struct ReceiptStore {
    pool: SqlitePool,
}

impl ReceiptStore {
    /// Open (creating if missing) a database file and apply migrations.
    pub async fn connect(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(DEFAULT_MAX_CONNECTIONS)
            .connect_with(options)
            .await
            .map_err(StoreError::Database)?;

        info!("Opened receipt database {}", path.display());
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Private in-memory database, mainly for tests.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(StoreError::Database)?
            .foreign_keys(true);

        // One connection that never expires: each connection would get its own database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(StoreError::Database)?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Apply embedded schema migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(StoreError::Migrate)?;
        debug!("Database schema is up to date");
        Ok(())
    }

    /// Store a draft and its items in one transaction, returning the new id.
    pub async fn insert_draft(&self, draft: &ReceiptDraft) -> Result<i64> {
        let mut tx = self.pool.begin().await.map_err(StoreError::Database)?;

        let id = sqlx::query(
            r#"
            INSERT INTO receipts (store_name, purchase_date, total, raw_text, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&draft.store_name)
        .bind(draft.purchase_date)
        .bind(draft.total.map(|t| t.to_string()))
        .bind(&draft.raw_text)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(StoreError::Database)?
        .last_insert_rowid();

        insert_items(&mut tx, id, &draft.items).await?;
        tx.commit().await.map_err(StoreError::Database)?;

        info!("Stored receipt {} with {} items", id, draft.items.len());
        Ok(id)
    }

    /// All receipts, newest first.
    pub async fn list_receipts(&self) -> Result<Vec<ReceiptSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT r.id, r.store_name, r.purchase_date, r.total, r.created_at,
                   COUNT(i.id) AS item_count
            FROM receipts r
            LEFT JOIN items i ON i.receipt_id = r.id
            GROUP BY r.id
            ORDER BY r.created_at DESC, r.id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::Database)?;

        rows.iter()
            .map(|r| -> Result<ReceiptSummary> {
                Ok(ReceiptSummary {
                    id: r.try_get("id").map_err(StoreError::Database)?,
                    store_name: r.try_get("store_name").map_err(StoreError::Database)?,
                    purchase_date: r.try_get("purchase_date").map_err(StoreError::Database)?,
                    total: decimal_column(r, "total")?,
                    item_count: r.try_get("item_count").map_err(StoreError::Database)?,
                    created_at: r.try_get("created_at").map_err(StoreError::Database)?,
                })
            })
            .collect()
    }

    /// Every receipt with its items, oldest first.
    pub async fn all_receipts(&self) -> Result<Vec<Receipt>> {
        let ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM receipts ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::Database)?;

        let mut receipts = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(receipt) = self.get_receipt(id).await? {
                receipts.push(receipt);
            }
        }
        Ok(receipts)
    }

    /// A receipt with its items ordered by id.
    pub async fn get_receipt(&self, id: i64) -> Result<Option<Receipt>> {
        let row = sqlx::query(
            r#"
            SELECT id, store_name, purchase_date, total, raw_text, created_at
            FROM receipts
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::Database)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let items = sqlx::query(
            r#"
            SELECT id, receipt_id, description, unit_price, quantity
            FROM items
            WHERE receipt_id = ?
            ORDER BY id
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::Database)?;

        let items = items.iter().map(item_from_row).collect::<Result<Vec<_>>>()?;

        let store_name: Option<String> = row.try_get("store_name").map_err(StoreError::Database)?;
        let purchase_date: Option<NaiveDate> =
            row.try_get("purchase_date").map_err(StoreError::Database)?;
        let raw_text: String = row.try_get("raw_text").map_err(StoreError::Database)?;
        let created_at: DateTime<Utc> = row.try_get("created_at").map_err(StoreError::Database)?;

        Ok(Some(Receipt {
            id,
            store_name,
            purchase_date,
            total: decimal_column(&row, "total")?,
            raw_text,
            created_at,
            items,
        }))
    }

    /// Replace the editable header fields.
    pub async fn update_receipt(&self, id: i64, update: &ReceiptUpdate) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE receipts
            SET store_name = ?, purchase_date = ?, total = ?
            WHERE id = ?
            "#,
        )
        .bind(&update.store_name)
        .bind(update.purchase_date)
        .bind(update.total.map(|t| t.to_string()))
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(StoreError::Database)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::ReceiptNotFound(id).into());
        }
        debug!("Updated receipt {}", id);
        Ok(())
    }

    /// Delete a receipt; its items go with it.
    pub async fn delete_receipt(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM receipts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(StoreError::Database)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::ReceiptNotFound(id).into());
        }
        info!("Deleted receipt {}", id);
        Ok(())
    }

    /// Add an item to a receipt, returning the item id.
    pub async fn add_item(&self, receipt_id: i64, item: &LineItemInput) -> Result<i64> {
        self.ensure_receipt(receipt_id).await?;

        let id = sqlx::query(
            "INSERT INTO items (receipt_id, description, unit_price, quantity) VALUES (?, ?, ?, ?)",
        )
        .bind(receipt_id)
        .bind(&item.description)
        .bind(item.unit_price.to_string())
        .bind(i64::from(item.quantity.max(1)))
        .execute(&self.pool)
        .await
        .map_err(StoreError::Database)?
        .last_insert_rowid();

        debug!("Added item {} to receipt {}", id, receipt_id);
        Ok(id)
    }

    /// Overwrite an item of a receipt.
    pub async fn update_item(
        &self,
        receipt_id: i64,
        item_id: i64,
        item: &LineItemInput,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE items
            SET description = ?, unit_price = ?, quantity = ?
            WHERE id = ? AND receipt_id = ?
            "#,
        )
        .bind(&item.description)
        .bind(item.unit_price.to_string())
        .bind(i64::from(item.quantity.max(1)))
        .bind(item_id)
        .bind(receipt_id)
        .execute(&self.pool)
        .await
        .map_err(StoreError::Database)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::ItemNotFound {
                receipt_id,
                item_id,
            }
            .into());
        }
        Ok(())
    }

    /// Remove an item from a receipt.
    pub async fn delete_item(&self, receipt_id: i64, item_id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM items WHERE id = ? AND receipt_id = ?")
            .bind(item_id)
            .bind(receipt_id)
            .execute(&self.pool)
            .await
            .map_err(StoreError::Database)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::ItemNotFound {
                receipt_id,
                item_id,
            }
            .into());
        }
        debug!("Deleted item {} from receipt {}", item_id, receipt_id);
        Ok(())
    }

    /// Run extraction again on the stored raw text and replace fields and items.
    pub async fn reparse_receipt(
        &self,
        id: i64,
        parser: &dyn ReceiptParser,
    ) -> Result<ReceiptDraft> {
        let raw_text: Option<String> = sqlx::query_scalar("SELECT raw_text FROM receipts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::Database)?;
        let raw_text = raw_text.ok_or(StoreError::ReceiptNotFound(id))?;

        let draft = parser.parse(&raw_text);

        let mut tx = self.pool.begin().await.map_err(StoreError::Database)?;
        sqlx::query("UPDATE receipts SET store_name = ?, purchase_date = ?, total = ? WHERE id = ?")
            .bind(&draft.store_name)
            .bind(draft.purchase_date)
            .bind(draft.total.map(|t| t.to_string()))
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(StoreError::Database)?;
        sqlx::query("DELETE FROM items WHERE receipt_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(StoreError::Database)?;
        insert_items(&mut tx, id, &draft.items).await?;
        tx.commit().await.map_err(StoreError::Database)?;

        info!("Re-parsed receipt {}: {} items", id, draft.items.len());
        Ok(draft)
    }

    async fn ensure_receipt(&self, id: i64) -> Result<()> {
        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM receipts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::Database)?;

        match exists {
            Some(_) => Ok(()),
            None => Err(StoreError::ReceiptNotFound(id).into()),
        }
    }
}

async fn insert_items(
    tx: &mut Transaction<'_, Sqlite>,
    receipt_id: i64,
    items: &[LineItemDraft],
) -> Result<()> {
    for item in items {
        sqlx::query(
            "INSERT INTO items (receipt_id, description, unit_price, quantity) VALUES (?, ?, ?, ?)",
        )
        .bind(receipt_id)
        .bind(&item.description)
        .bind(item.unit_price.to_string())
        .bind(i64::from(item.quantity.max(1)))
        .execute(&mut **tx)
        .await
        .map_err(StoreError::Database)?;
    }
    Ok(())
}

fn item_from_row(row: &SqliteRow) -> Result<LineItem> {
    let quantity: i64 = row.try_get("quantity").map_err(StoreError::Database)?;
    let quantity = u32::try_from(quantity).map_err(|_| StoreError::Corrupt {
        column: "quantity",
        value: quantity.to_string(),
    })?;
    let unit_price: String = row.try_get("unit_price").map_err(StoreError::Database)?;
    let unit_price = Decimal::from_str(&unit_price).map_err(|_| StoreError::Corrupt {
        column: "unit_price",
        value: unit_price.clone(),
    })?;

    Ok(LineItem {
        id: row.try_get("id").map_err(StoreError::Database)?,
        receipt_id: row.try_get("receipt_id").map_err(StoreError::Database)?,
        description: row.try_get("description").map_err(StoreError::Database)?,
        unit_price,
        quantity,
    })
}

fn decimal_column(row: &SqliteRow, column: &'static str) -> Result<Option<Decimal>> {
    let value: Option<String> = row.try_get(column).map_err(StoreError::Database)?;
    value
        .map(|v| {
            Decimal::from_str(&v).map_err(|_| StoreError::Corrupt { column, value: v.clone() }.into())
        })
        .transpose()
}
