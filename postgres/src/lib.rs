//! `PostgreSQL` backend for the book distribution ledger.
//!
//! [`PostgresStore`] implements every storage trait from `distribution-core`
//! over a sqlx connection pool:
//!
//! - Aggregates are bumped in place with `SET points = points + $n`, so
//!   concurrent hand-outs at a busy center never lose an update
//! - A user-side append is one transaction: the totals update and the
//!   distribution row commit together
//! - The center-side increment is a separate single-statement update
//! - Listings follow insertion order through `seq` columns
//!
//! Amounts are stored as integers (paise and hundredths of a point).
//!
//! # Example
//!
//! ```no_run
//! use distribution_postgres::PostgresStore;
//! use distribution_runtime::EngineConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EngineConfig::from_env();
//! let store = PostgresStore::connect(&config.database).await?;
//! store.migrate().await?;
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Utc};
use distribution_core::{
    AggregateStore, Book, BookId, CatalogStore, Center, CenterId, Contribution,
    DistributionEvent, DistributionLedger, DistributionLog, EntityKind, Money, Points,
    StockEvent, StockId, StockLedger, StoreError, StoreFuture, Totals, User, UserId,
};
use distribution_runtime::DatabaseConfig;
use indexmap::IndexMap;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgConnection, PgPool};
use std::time::Duration;
use uuid::Uuid;

type BookRow = (Uuid, String, String, String, i64, i64);
type CenterRow = (Uuid, String, i64, i64, i64);
type UserRow = (Uuid, String, String, Uuid, i64, i64, i64, DateTime<Utc>);
type DistributionRow = (Uuid, Uuid, i64, DateTime<Utc>);
type StockRow = (Uuid, Uuid, Uuid, i32, i64, DateTime<Utc>);

const BOOK_COLUMNS: &str = "id, name, book_type, language, point, price";
const CENTER_COLUMNS: &str = "id, name, points, donation, loss";
const USER_COLUMNS: &str =
    "id, name, number, center_id, points, total_donation, total_loss, created_at";
const STOCK_COLUMNS: &str = "id, center_id, book_id, quantity, cost_paid, date";

/// Storage backend over a `PostgreSQL` pool.
#[derive(Clone, Debug)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Wraps an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a pool as described by `config`.
    ///
    /// # Errors
    ///
    /// [`StoreError::Unavailable`] if the database cannot be reached.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout))
            .connect(&config.url)
            .await
            .map_err(|e| StoreError::Unavailable(format!("Failed to connect: {e}")))?;
        tracing::info!(max_connections = config.max_connections, "Connected to PostgreSQL");
        Ok(Self::from_pool(pool))
    }

    /// Access the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations.
    ///
    /// # Errors
    ///
    /// [`StoreError::Backend`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(format!("Migration failed: {e}")))
    }

    async fn connection(
        &self,
        operation: &'static str,
    ) -> Result<sqlx::pool::PoolConnection<sqlx::Postgres>, StoreError> {
        self.pool
            .acquire()
            .await
            .map_err(|e| storage_error(operation, &e))
    }
}

fn storage_error(operation: &'static str, err: &sqlx::Error) -> StoreError {
    metrics::counter!("postgres_errors_total", "operation" => operation).increment(1);
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::Unavailable(format!("{operation}: {err}"))
        }
        _ => StoreError::Backend(format!("{operation}: {err}")),
    }
}

fn corrupt(what: &str, detail: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(format!("Corrupt {what} row: {detail}"))
}

fn book_from_row((id, name, book_type, language, point, price): BookRow) -> Result<Book, StoreError> {
    Ok(Book {
        id: BookId::from_uuid(id),
        name,
        book_type: book_type.parse().map_err(|e| corrupt("book", e))?,
        language: language.parse().map_err(|e| corrupt("book", e))?,
        point: Points::from_hundredths(point),
        price: Money::from_minor(price),
    })
}

fn center_from_row((id, name, points, donation, loss): CenterRow) -> Center {
    Center {
        id: CenterId::from_uuid(id),
        name,
        totals: Totals {
            points: Points::from_hundredths(points),
            donation: Money::from_minor(donation),
            loss: Money::from_minor(loss),
        },
    }
}

fn user_from_row(
    (id, name, number, center, points, donation, loss, created_at): UserRow,
    distributions: DistributionLog,
) -> User {
    User {
        id: UserId::from_uuid(id),
        name,
        number,
        center: CenterId::from_uuid(center),
        totals: Totals {
            points: Points::from_hundredths(points),
            donation: Money::from_minor(donation),
            loss: Money::from_minor(loss),
        },
        distributions,
        created_at,
    }
}

fn event_from_row((_, book, price_paid, date): DistributionRow) -> DistributionEvent {
    DistributionEvent {
        book: BookId::from_uuid(book),
        price_paid: Money::from_minor(price_paid),
        date,
    }
}

fn stock_from_row((id, center, book, quantity, cost_paid, date): StockRow) -> Result<StockEvent, StoreError> {
    Ok(StockEvent {
        id: StockId::from_uuid(id),
        center: CenterId::from_uuid(center),
        book: BookId::from_uuid(book),
        quantity: u32::try_from(quantity).map_err(|e| corrupt("stock", e))?,
        cost_paid: Money::from_minor(cost_paid),
        date,
    })
}

async fn load_user(conn: &mut PgConnection, id: UserId) -> Result<Option<User>, StoreError> {
    let row: Option<UserRow> = sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
        .bind(*id.as_uuid())
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| storage_error("user", &e))?;
    let Some(row) = row else {
        return Ok(None);
    };

    let events: Vec<DistributionRow> = sqlx::query_as(
        "SELECT user_id, book_id, price_paid, date FROM distributions WHERE user_id = $1 ORDER BY seq",
    )
    .bind(*id.as_uuid())
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| storage_error("user", &e))?;

    Ok(Some(user_from_row(row, events.into_iter().map(event_from_row).collect())))
}

async fn load_user_by_number(
    conn: &mut PgConnection,
    center: CenterId,
    number: &str,
) -> Result<Option<User>, StoreError> {
    let id: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM users WHERE center_id = $1 AND number = $2")
            .bind(*center.as_uuid())
            .bind(number)
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| storage_error("find_user_by_number", &e))?;
    match id {
        Some((id,)) => load_user(conn, UserId::from_uuid(id)).await,
        None => Ok(None),
    }
}

impl CatalogStore for PostgresStore {
    fn book(&self, id: BookId) -> StoreFuture<'_, Option<Book>> {
        Box::pin(async move {
            let row: Option<BookRow> =
                sqlx::query_as(&format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = $1"))
                    .bind(*id.as_uuid())
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(|e| storage_error("book", &e))?;
            row.map(book_from_row).transpose()
        })
    }

    fn books(&self) -> StoreFuture<'_, Vec<Book>> {
        Box::pin(async move {
            let rows: Vec<BookRow> =
                sqlx::query_as(&format!("SELECT {BOOK_COLUMNS} FROM books ORDER BY seq"))
                    .fetch_all(&self.pool)
                    .await
                    .map_err(|e| storage_error("books", &e))?;
            rows.into_iter().map(book_from_row).collect()
        })
    }

    fn center(&self, id: CenterId) -> StoreFuture<'_, Option<Center>> {
        Box::pin(async move {
            let row: Option<CenterRow> =
                sqlx::query_as(&format!("SELECT {CENTER_COLUMNS} FROM centers WHERE id = $1"))
                    .bind(*id.as_uuid())
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(|e| storage_error("center", &e))?;
            Ok(row.map(center_from_row))
        })
    }

    fn centers(&self) -> StoreFuture<'_, Vec<Center>> {
        Box::pin(async move {
            let rows: Vec<CenterRow> =
                sqlx::query_as(&format!("SELECT {CENTER_COLUMNS} FROM centers ORDER BY seq"))
                    .fetch_all(&self.pool)
                    .await
                    .map_err(|e| storage_error("centers", &e))?;
            Ok(rows.into_iter().map(center_from_row).collect())
        })
    }

    fn user(&self, id: UserId) -> StoreFuture<'_, Option<User>> {
        Box::pin(async move {
            let mut conn = self.connection("user").await?;
            load_user(&mut conn, id).await
        })
    }

    fn users_in_center(&self, center: CenterId) -> StoreFuture<'_, Vec<User>> {
        Box::pin(async move {
            let mut conn = self.connection("users_in_center").await?;
            let rows: Vec<UserRow> = sqlx::query_as(&format!(
                "SELECT {USER_COLUMNS} FROM users WHERE center_id = $1 ORDER BY seq"
            ))
            .bind(*center.as_uuid())
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| storage_error("users_in_center", &e))?;

            let events: Vec<DistributionRow> = sqlx::query_as(
                "SELECT d.user_id, d.book_id, d.price_paid, d.date
                 FROM distributions d JOIN users u ON u.id = d.user_id
                 WHERE u.center_id = $1
                 ORDER BY d.seq",
            )
            .bind(*center.as_uuid())
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| storage_error("users_in_center", &e))?;

            let mut logs: IndexMap<Uuid, DistributionLog> =
                rows.iter().map(|row| (row.0, DistributionLog::new())).collect();
            for event in events {
                if let Some(log) = logs.get_mut(&event.0) {
                    log.append(event_from_row(event));
                }
            }

            Ok(rows
                .into_iter()
                .map(|row| {
                    let log = logs.swap_remove(&row.0).unwrap_or_default();
                    user_from_row(row, log)
                })
                .collect())
        })
    }

    fn find_user_by_number(
        &self,
        center: CenterId,
        number: String,
    ) -> StoreFuture<'_, Option<User>> {
        Box::pin(async move {
            let mut conn = self.connection("find_user_by_number").await?;
            load_user_by_number(&mut conn, center, &number).await
        })
    }

    fn insert_book(&self, book: Book) -> StoreFuture<'_, Book> {
        Box::pin(async move {
            sqlx::query(
                "INSERT INTO books (id, name, book_type, language, point, price)
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(*book.id.as_uuid())
            .bind(&book.name)
            .bind(book.book_type.code())
            .bind(book.language.name())
            .bind(book.point.hundredths())
            .bind(book.price.minor())
            .execute(&self.pool)
            .await
            .map_err(|e| storage_error("insert_book", &e))?;
            tracing::debug!(book = %book.id, "Book inserted");
            Ok(book)
        })
    }

    fn insert_center(&self, center: Center) -> StoreFuture<'_, Center> {
        Box::pin(async move {
            sqlx::query(
                "INSERT INTO centers (id, name, points, donation, loss) VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(*center.id.as_uuid())
            .bind(&center.name)
            .bind(center.totals.points.hundredths())
            .bind(center.totals.donation.minor())
            .bind(center.totals.loss.minor())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db_err) = &e {
                    if db_err.is_unique_violation() {
                        return StoreError::Duplicate {
                            entity: EntityKind::Center,
                            detail: format!("name {:?} is taken", center.name),
                        };
                    }
                }
                storage_error("insert_center", &e)
            })?;
            tracing::debug!(center = %center.id, "Center inserted");
            Ok(center)
        })
    }

    fn insert_user(&self, user: User) -> StoreFuture<'_, User> {
        Box::pin(async move {
            sqlx::query(
                "INSERT INTO users
                    (id, name, number, center_id, points, total_donation, total_loss, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            )
            .bind(*user.id.as_uuid())
            .bind(&user.name)
            .bind(&user.number)
            .bind(*user.center.as_uuid())
            .bind(user.totals.points.hundredths())
            .bind(user.totals.donation.minor())
            .bind(user.totals.loss.minor())
            .bind(user.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db_err) = &e {
                    if db_err.is_unique_violation() {
                        return StoreError::Duplicate {
                            entity: EntityKind::User,
                            detail: format!("number {} already registered", user.number),
                        };
                    }
                    if db_err.is_foreign_key_violation() {
                        return StoreError::NotFound {
                            entity: EntityKind::Center,
                            id: user.center.to_string(),
                        };
                    }
                }
                storage_error("insert_user", &e)
            })?;
            tracing::debug!(user = %user.id, "User inserted");
            Ok(user)
        })
    }
}

impl DistributionLedger for PostgresStore {
    fn append_distribution(
        &self,
        user: UserId,
        event: DistributionEvent,
        contribution: Contribution,
    ) -> StoreFuture<'_, User> {
        Box::pin(async move {
            let op = "append_distribution";
            let mut tx = self.pool.begin().await.map_err(|e| storage_error(op, &e))?;

            let updated: Option<(Uuid,)> = sqlx::query_as(
                "UPDATE users
                 SET points = points + $2,
                     total_donation = total_donation + $3,
                     total_loss = total_loss + $4
                 WHERE id = $1
                 RETURNING id",
            )
            .bind(*user.as_uuid())
            .bind(contribution.points.hundredths())
            .bind(contribution.donation.minor())
            .bind(contribution.loss.minor())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| storage_error(op, &e))?;
            if updated.is_none() {
                return Err(StoreError::NotFound {
                    entity: EntityKind::User,
                    id: user.to_string(),
                });
            }

            sqlx::query(
                "INSERT INTO distributions (user_id, book_id, price_paid, date) VALUES ($1, $2, $3, $4)",
            )
            .bind(*user.as_uuid())
            .bind(*event.book.as_uuid())
            .bind(event.price_paid.minor())
            .bind(event.date)
            .execute(&mut *tx)
            .await
            .map_err(|e| storage_error(op, &e))?;

            let record = load_user(&mut tx, user).await?.ok_or_else(|| StoreError::NotFound {
                entity: EntityKind::User,
                id: user.to_string(),
            })?;
            tx.commit().await.map_err(|e| storage_error(op, &e))?;
            Ok(record)
        })
    }
}

impl AggregateStore for PostgresStore {
    fn increment_center(
        &self,
        center: CenterId,
        contribution: Contribution,
    ) -> StoreFuture<'_, Center> {
        Box::pin(async move {
            let row: Option<CenterRow> = sqlx::query_as(&format!(
                "UPDATE centers
                 SET points = points + $2, donation = donation + $3, loss = loss + $4
                 WHERE id = $1
                 RETURNING {CENTER_COLUMNS}"
            ))
            .bind(*center.as_uuid())
            .bind(contribution.points.hundredths())
            .bind(contribution.donation.minor())
            .bind(contribution.loss.minor())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| storage_error("increment_center", &e))?;
            row.map(center_from_row).ok_or_else(|| StoreError::NotFound {
                entity: EntityKind::Center,
                id: center.to_string(),
            })
        })
    }
}

impl StockLedger for PostgresStore {
    fn append_stock(&self, entry: StockEvent) -> StoreFuture<'_, StockEvent> {
        Box::pin(async move {
            let quantity = i32::try_from(entry.quantity)
                .map_err(|e| StoreError::Backend(format!("quantity out of range: {e}")))?;
            sqlx::query(
                "INSERT INTO stock (id, center_id, book_id, quantity, cost_paid, date)
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(*entry.id.as_uuid())
            .bind(*entry.center.as_uuid())
            .bind(*entry.book.as_uuid())
            .bind(quantity)
            .bind(entry.cost_paid.minor())
            .bind(entry.date)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db_err) = &e {
                    if db_err.is_foreign_key_violation() {
                        return StoreError::NotFound {
                            entity: EntityKind::Center,
                            id: entry.center.to_string(),
                        };
                    }
                }
                storage_error("append_stock", &e)
            })?;
            Ok(entry)
        })
    }

    fn stock_for_center(&self, center: CenterId) -> StoreFuture<'_, Vec<StockEvent>> {
        Box::pin(async move {
            let rows: Vec<StockRow> = sqlx::query_as(&format!(
                "SELECT {STOCK_COLUMNS} FROM stock WHERE center_id = $1 ORDER BY seq"
            ))
            .bind(*center.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| storage_error("stock_for_center", &e))?;
            rows.into_iter().map(stock_from_row).collect()
        })
    }
}
