//! SQLite-based storage implementation

use std::sync::Mutex;

use chrono::{DateTime, SecondsFormat, Utc};
use license_core::{latest_expiry, RedemptionContext, TokenId, TokenRecord};
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use super::{
    RedeemAttempt, Redemption, StoreResult, TokenFilter, TokenOrder, TokenQuery, TokenStore,
};
use crate::error::LicenseError;

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

const TOKEN_COLUMNS: &str = "id, owner_email, owner_name, owner_phone, created_at, expires_at, \
     redeemed, redeemed_at, bound_device_id, source_ip, device_info, redemption_timestamp";

/// SQLite-based token store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a SQLite database at the given path
    pub fn open(path: &str) -> Result<Self, LicenseError> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self, LicenseError> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, LicenseError> {
        Self::migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run database migrations
    fn migrate(conn: &Connection) -> Result<(), LicenseError> {
        let current_version = Self::get_schema_version(conn)?;

        if current_version < SCHEMA_VERSION {
            tracing::info!(
                current = current_version,
                target = SCHEMA_VERSION,
                "Running database migrations"
            );

            if current_version < 1 {
                Self::migrate_v1(conn)?;
            }

            conn.execute(
                "INSERT OR REPLACE INTO schema_version (version) VALUES (?1)",
                params![SCHEMA_VERSION],
            )?;

            tracing::info!("Database migrations complete");
        }

        Ok(())
    }

    /// Get current schema version (0 if no schema exists)
    fn get_schema_version(conn: &Connection) -> Result<i32, LicenseError> {
        let table_exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
            [],
            |row| row.get(0),
        )?;

        if !table_exists {
            return Ok(0);
        }

        Ok(conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
            row.get::<_, Option<i32>>(0).map(|v| v.unwrap_or(0))
        })?)
    }

    /// Migration to version 1: initial schema
    fn migrate_v1(conn: &Connection) -> Result<(), LicenseError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            );

            CREATE TABLE IF NOT EXISTS tokens (
                id TEXT PRIMARY KEY,
                owner_email TEXT NOT NULL,
                owner_name TEXT NOT NULL,
                owner_phone TEXT NOT NULL,
                created_at TEXT NOT NULL,
                expires_at TEXT NOT NULL,
                redeemed INTEGER NOT NULL DEFAULT 0,
                redeemed_at TEXT,
                bound_device_id TEXT,
                source_ip TEXT,
                device_info TEXT,
                redemption_timestamp TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_tokens_created_at ON tokens(created_at);
            CREATE INDEX IF NOT EXISTS idx_tokens_expires_at ON tokens(expires_at);
            "#,
        )?;

        Ok(())
    }

    fn select_by_id(conn: &Connection, id: &TokenId) -> StoreResult<Option<TokenRecord>> {
        let sql = format!("SELECT {} FROM tokens WHERE id = ?1", TOKEN_COLUMNS);
        Ok(conn
            .query_row(&sql, params![id.as_str()], row_to_record)
            .optional()?)
    }
}

/// Fixed-width RFC 3339, so text order matches time order.
///
/// Instants past [`latest_expiry`] would need a five-digit year and are
/// stored as that bound.
fn ts(at: DateTime<Utc>) -> String {
    at.min(latest_expiry())
        .to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(idx: usize, value: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_opt_ts(idx: usize, value: Option<String>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    value.map(|v| parse_ts(idx, v)).transpose()
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<TokenRecord> {
    let redeemed: i32 = row.get(6)?;
    let device_info: Option<String> = row.get(10)?;
    let redemption_timestamp = parse_opt_ts(11, row.get(11)?)?;

    let redemption_context = match (device_info, redemption_timestamp) {
        (Some(device_info), Some(timestamp)) => Some(RedemptionContext {
            source_ip: row.get(9)?,
            device_info,
            timestamp,
        }),
        _ => None,
    };

    Ok(TokenRecord {
        id: TokenId(row.get(0)?),
        owner_email: row.get(1)?,
        owner_name: row.get(2)?,
        owner_phone: row.get(3)?,
        created_at: parse_ts(4, row.get(4)?)?,
        expires_at: parse_ts(5, row.get(5)?)?,
        redeemed: redeemed != 0,
        redeemed_at: parse_opt_ts(7, row.get(7)?)?,
        bound_device_id: row.get(8)?,
        redemption_context,
    })
}

/// WHERE clause and its parameters for a filter
fn filter_clause(filter: &TokenFilter) -> (&'static str, Vec<String>) {
    match filter {
        TokenFilter::All => ("1 = 1", vec![]),
        TokenFilter::RedeemedExpiringBetween { from, to } => (
            "redeemed = 1 AND expires_at >= ?1 AND expires_at <= ?2",
            vec![ts(*from), ts(*to)],
        ),
        TokenFilter::ExpiredBefore(cutoff) => ("expires_at < ?1", vec![ts(*cutoff)]),
    }
}

impl TokenStore for SqliteStore {
    fn insert(&self, record: &TokenRecord) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        let context = record.redemption_context.as_ref();

        conn.execute(
            "INSERT INTO tokens (id, owner_email, owner_name, owner_phone, created_at, expires_at,
                                 redeemed, redeemed_at, bound_device_id, source_ip, device_info,
                                 redemption_timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                record.id.as_str(),
                record.owner_email,
                record.owner_name,
                record.owner_phone,
                ts(record.created_at),
                ts(record.expires_at),
                record.redeemed as i32,
                record.redeemed_at.map(ts),
                record.bound_device_id,
                context.and_then(|c| c.source_ip.clone()),
                context.map(|c| c.device_info.clone()),
                context.map(|c| ts(c.timestamp)),
            ],
        )
        .map_err(|e| {
            if let rusqlite::Error::SqliteFailure(ref err, _) = e {
                if err.code == rusqlite::ErrorCode::ConstraintViolation {
                    return LicenseError::DuplicateId;
                }
            }
            LicenseError::from(e)
        })?;

        Ok(())
    }

    fn get(&self, id: &TokenId) -> StoreResult<Option<TokenRecord>> {
        let conn = self.conn.lock().unwrap();
        Self::select_by_id(&conn, id)
    }

    fn redeem_if_available(
        &self,
        id: &TokenId,
        redemption: &Redemption,
    ) -> StoreResult<RedeemAttempt> {
        let conn = self.conn.lock().unwrap();
        let now = ts(redemption.redeemed_at);

        // The WHERE clause is the compare half of the compare-and-swap
        let rows_affected = conn.execute(
            "UPDATE tokens
             SET redeemed = 1,
                 redeemed_at = ?1,
                 bound_device_id = ?2,
                 source_ip = ?3,
                 device_info = ?4,
                 redemption_timestamp = ?5,
                 expires_at = MAX(expires_at, ?6)
             WHERE id = ?7 AND redeemed = 0 AND expires_at >= ?1",
            params![
                now,
                redemption.device_id,
                redemption.context.source_ip,
                redemption.context.device_info,
                ts(redemption.context.timestamp),
                ts(redemption.expires_at),
                id.as_str(),
            ],
        )?;

        // Still holding the connection lock, so this is the state the update saw
        Ok(match (rows_affected, Self::select_by_id(&conn, id)?) {
            (1, Some(record)) => RedeemAttempt::Redeemed(record),
            (_, Some(record)) => RedeemAttempt::Rejected(record),
            (_, None) => RedeemAttempt::Missing,
        })
    }

    fn extend_expiry(
        &self,
        id: &TokenId,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<Option<TokenRecord>> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "UPDATE tokens SET expires_at = MAX(expires_at, ?1) WHERE id = ?2",
            params![ts(expires_at), id.as_str()],
        )?;

        Self::select_by_id(&conn, id)
    }

    fn query(&self, query: &TokenQuery) -> StoreResult<Vec<TokenRecord>> {
        let conn = self.conn.lock().unwrap();
        let (clause, args) = filter_clause(&query.filter);
        let order = match query.order {
            TokenOrder::NewestFirst => "created_at DESC, id ASC",
            TokenOrder::SoonestExpiry => "expires_at ASC, id ASC",
        };
        // LIMIT -1 means no limit in SQLite
        let limit = query
            .limit
            .map(|l| i64::try_from(l).unwrap_or(i64::MAX))
            .unwrap_or(-1);
        let offset = i64::try_from(query.offset).unwrap_or(i64::MAX);

        let sql = format!(
            "SELECT {} FROM tokens WHERE {} ORDER BY {} LIMIT {} OFFSET {}",
            TOKEN_COLUMNS, clause, order, limit, offset
        );

        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map(params_from_iter(args.iter()), row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    fn count(&self, filter: &TokenFilter) -> StoreResult<u64> {
        let conn = self.conn.lock().unwrap();
        let (clause, args) = filter_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM tokens WHERE {}", clause);

        let count: i64 = conn.query_row(&sql, params_from_iter(args.iter()), |row| row.get(0))?;
        Ok(count as u64)
    }
}
