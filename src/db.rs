use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;

use crate::error::StoreError;
use crate::models::{TotalsRecord, TransactionRecord, TxType, User};
use crate::store::Store;

const INIT_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS users (
  id TEXT PRIMARY KEY NOT NULL
);

CREATE TABLE IF NOT EXISTS transactions (
  id               TEXT PRIMARY KEY NOT NULL,
  contract_address TEXT NOT NULL,
  block            INTEGER NOT NULL,
  timestamp        INTEGER NOT NULL,
  token            TEXT NOT NULL,
  type             TEXT NOT NULL,
  hash             TEXT NOT NULL,
  user_address     TEXT NOT NULL,
  from_address     TEXT NOT NULL,
  to_address       TEXT NOT NULL,
  coin_amount      TEXT NOT NULL, -- Decimal stored as string
  usd_amount       TEXT NOT NULL, -- Decimal stored as string
  factor           TEXT NOT NULL,
  pool_id          INTEGER
);

CREATE INDEX IF NOT EXISTS transactions_user ON transactions (user_address);

CREATE TABLE IF NOT EXISTS totals (
  user_address  TEXT PRIMARY KEY NOT NULL,
  added_gvt     TEXT NOT NULL,
  added_pwrd    TEXT NOT NULL,
  added_total   TEXT NOT NULL,
  removed_gvt   TEXT NOT NULL,
  removed_pwrd  TEXT NOT NULL,
  removed_total TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS checkpoint (
  id         INTEGER PRIMARY KEY CHECK (id = 1),
  last_block INTEGER NOT NULL
);
"#;

/// Connect to SQLite (with WAL mode for performance)
pub fn connect(path: &str) -> Result<Connection, StoreError> {
    let conn = Connection::open(path)?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    Ok(conn)
}

/// Run schema migrations
pub fn run_migrations(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(INIT_SQL)?;
    Ok(())
}

/// SQLite-backed [`Store`], the system of record.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Wrap a connection, creating the schema if needed.
    pub fn new(conn: Connection) -> Result<Self, StoreError> {
        run_migrations(&conn)?;
        Ok(Self { conn })
    }

    pub fn open(path: &str) -> Result<Self, StoreError> {
        Self::new(connect(path)?)
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        Self::new(Connection::open_in_memory()?)
    }

    /// Last block whose logs were all handed to the pipeline.
    pub fn load_checkpoint(&self) -> Result<Option<u64>, StoreError> {
        let block: Option<i64> = self
            .conn
            .query_row("SELECT last_block FROM checkpoint WHERE id = 1", [], |r| r.get(0))
            .optional()?;
        Ok(block.map(|b| b as u64))
    }

    pub fn save_checkpoint(&mut self, block: u64) -> Result<(), StoreError> {
        self.conn.execute(
            r#"
            INSERT INTO checkpoint (id, last_block) VALUES (1, ?1)
            ON CONFLICT(id) DO UPDATE SET last_block = excluded.last_block
            "#,
            params![block as i64],
        )?;
        Ok(())
    }
}

fn decimal(table: &'static str, id: &str, raw: &str) -> Result<Decimal, StoreError> {
    Decimal::from_str(raw).map_err(|e| StoreError::Corrupt {
        table,
        id: id.to_string(),
        reason: format!("bad decimal `{raw}`: {e}"),
    })
}

/// Raw transaction row; decimals and type are validated after the read.
struct TransactionRow {
    id: String,
    contract_address: String,
    block: i64,
    timestamp: i64,
    token: String,
    kind: String,
    hash: String,
    user_address: String,
    from_address: String,
    to_address: String,
    coin_amount: String,
    usd_amount: String,
    factor: String,
    pool_id: Option<u32>,
}

impl TransactionRow {
    fn from_row(r: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: r.get(0)?,
            contract_address: r.get(1)?,
            block: r.get(2)?,
            timestamp: r.get(3)?,
            token: r.get(4)?,
            kind: r.get(5)?,
            hash: r.get(6)?,
            user_address: r.get(7)?,
            from_address: r.get(8)?,
            to_address: r.get(9)?,
            coin_amount: r.get(10)?,
            usd_amount: r.get(11)?,
            factor: r.get(12)?,
            pool_id: r.get(13)?,
        })
    }

    fn into_record(self) -> Result<TransactionRecord, StoreError> {
        const TABLE: &str = "transactions";
        let kind = TxType::from_str(&self.kind).map_err(|reason| StoreError::Corrupt {
            table: TABLE,
            id: self.id.clone(),
            reason,
        })?;
        Ok(TransactionRecord {
            coin_amount: decimal(TABLE, &self.id, &self.coin_amount)?,
            usd_amount: decimal(TABLE, &self.id, &self.usd_amount)?,
            factor: decimal(TABLE, &self.id, &self.factor)?,
            kind,
            id: self.id,
            contract_address: self.contract_address,
            block: self.block,
            timestamp: self.timestamp,
            token: self.token,
            hash: self.hash,
            user_address: self.user_address,
            from_address: self.from_address,
            to_address: self.to_address,
            pool_id: self.pool_id,
        })
    }
}

fn upsert_transaction(conn: &Connection, tx: &TransactionRecord) -> Result<(), StoreError> {
    conn.execute(
        r#"
        INSERT INTO transactions (
            id, contract_address, block, timestamp, token, type, hash,
            user_address, from_address, to_address,
            coin_amount, usd_amount, factor, pool_id
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
        ON CONFLICT(id) DO UPDATE SET
            contract_address = excluded.contract_address,
            block            = excluded.block,
            timestamp        = excluded.timestamp,
            token            = excluded.token,
            type             = excluded.type,
            hash             = excluded.hash,
            user_address     = excluded.user_address,
            from_address     = excluded.from_address,
            to_address       = excluded.to_address,
            coin_amount      = excluded.coin_amount,
            usd_amount       = excluded.usd_amount,
            factor           = excluded.factor,
            pool_id          = excluded.pool_id
        "#,
        params![
            tx.id,
            tx.contract_address,
            tx.block,
            tx.timestamp,
            tx.token,
            tx.kind.as_str(),
            tx.hash,
            tx.user_address,
            tx.from_address,
            tx.to_address,
            tx.coin_amount.to_string(),
            tx.usd_amount.to_string(),
            tx.factor.to_string(),
            tx.pool_id,
        ],
    )?;
    Ok(())
}

fn upsert_totals(conn: &Connection, totals: &TotalsRecord) -> Result<(), StoreError> {
    conn.execute(
        r#"
        INSERT INTO totals (
            user_address, added_gvt, added_pwrd, added_total,
            removed_gvt, removed_pwrd, removed_total
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT(user_address) DO UPDATE SET
            added_gvt     = excluded.added_gvt,
            added_pwrd    = excluded.added_pwrd,
            added_total   = excluded.added_total,
            removed_gvt   = excluded.removed_gvt,
            removed_pwrd  = excluded.removed_pwrd,
            removed_total = excluded.removed_total
        "#,
        params![
            totals.user_address,
            totals.added_gvt.to_string(),
            totals.added_pwrd.to_string(),
            totals.added_total.to_string(),
            totals.removed_gvt.to_string(),
            totals.removed_pwrd.to_string(),
            totals.removed_total.to_string(),
        ],
    )?;
    Ok(())
}

impl Store for SqliteStore {
    fn load_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        let user = self
            .conn
            .query_row("SELECT id FROM users WHERE id = ?1", [id], |r| {
                Ok(User { id: r.get(0)? })
            })
            .optional()?;
        Ok(user)
    }

    fn save_user(&mut self, user: &User) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO users (id) VALUES (?1) ON CONFLICT(id) DO NOTHING",
            [&user.id],
        )?;
        Ok(())
    }

    fn load_transaction(&self, id: &str) -> Result<Option<TransactionRecord>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT id, contract_address, block, timestamp, token, type, hash,
                        user_address, from_address, to_address,
                        coin_amount, usd_amount, factor, pool_id
                 FROM transactions WHERE id = ?1",
                [id],
                TransactionRow::from_row,
            )
            .optional()?;
        row.map(TransactionRow::into_record).transpose()
    }

    fn save_transaction(&mut self, tx: &TransactionRecord) -> Result<(), StoreError> {
        upsert_transaction(&self.conn, tx)
    }

    fn load_totals(&self, user_address: &str) -> Result<Option<TotalsRecord>, StoreError> {
        let row: Option<[String; 6]> = self
            .conn
            .query_row(
                "SELECT added_gvt, added_pwrd, added_total,
                        removed_gvt, removed_pwrd, removed_total
                 FROM totals WHERE user_address = ?1",
                [user_address],
                |r| Ok([r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?, r.get(5)?]),
            )
            .optional()?;

        let Some(sums) = row else {
            return Ok(None);
        };
        let parse = |raw: &str| decimal("totals", user_address, raw);
        Ok(Some(TotalsRecord {
            user_address: user_address.to_string(),
            added_gvt: parse(&sums[0])?,
            added_pwrd: parse(&sums[1])?,
            added_total: parse(&sums[2])?,
            removed_gvt: parse(&sums[3])?,
            removed_pwrd: parse(&sums[4])?,
            removed_total: parse(&sums[5])?,
        }))
    }

    fn save_totals(&mut self, totals: &TotalsRecord) -> Result<(), StoreError> {
        upsert_totals(&self.conn, totals)
    }

    fn commit_transfer(
        &mut self,
        tx: &TransactionRecord,
        totals: Option<&TotalsRecord>,
    ) -> Result<(), StoreError> {
        let db_tx = self.conn.transaction()?;
        if let Some(totals) = totals {
            upsert_totals(&db_tx, totals)?;
        }
        upsert_transaction(&db_tx, tx)?;
        db_tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> TransactionRecord {
        TransactionRecord {
            id: id.to_string(),
            contract_address: "0x11".to_string(),
            block: 14_000_000,
            timestamp: 1_640_000_000,
            token: "pwrd".to_string(),
            kind: TxType::CoreDeposit,
            hash: "0xabc".to_string(),
            user_address: "0x22".to_string(),
            from_address: "0x0000000000000000000000000000000000000000".to_string(),
            to_address: "0x22".to_string(),
            coin_amount: "50.0000000".parse().unwrap(),
            usd_amount: "1000.000000000000000000".parse().unwrap(),
            factor: Decimal::ONE,
            pool_id: None,
        }
    }

    #[test]
    fn transaction_survives_a_round_trip() {
        let mut store = SqliteStore::in_memory().unwrap();
        let tx = record("0xabc-1");
        store.save_transaction(&tx).unwrap();

        let loaded = store.load_transaction("0xabc-1").unwrap().unwrap();
        assert_eq!(loaded, tx);
        // scale is preserved through the TEXT column
        assert_eq!(loaded.usd_amount.to_string(), "1000.000000000000000000");
        assert!(store.load_transaction("0xabc-2").unwrap().is_none());
    }

    #[test]
    fn saving_the_same_id_overwrites() {
        let mut store = SqliteStore::in_memory().unwrap();
        let mut tx = record("0xabc-1");
        tx.pool_id = Some(3);
        store.save_transaction(&tx).unwrap();
        store.save_transaction(&tx).unwrap();

        let count: i64 = store
            .conn
            .query_row("SELECT COUNT(*) FROM transactions", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(store.load_transaction("0xabc-1").unwrap().unwrap().pool_id, Some(3));
    }

    #[test]
    fn totals_and_users_upsert() {
        let mut store = SqliteStore::in_memory().unwrap();
        assert!(store.load_totals("0x22").unwrap().is_none());

        let mut totals = TotalsRecord::zero("0x22");
        totals.added_pwrd = "12.5".parse().unwrap();
        totals.added_total = totals.added_pwrd;
        store.save_totals(&totals).unwrap();
        totals.removed_gvt = "1".parse().unwrap();
        totals.removed_total = totals.removed_gvt;
        store.save_totals(&totals).unwrap();
        assert_eq!(store.load_totals("0x22").unwrap().unwrap(), totals);

        let user = User { id: "0x22".to_string() };
        store.save_user(&user).unwrap();
        store.save_user(&user).unwrap();
        assert_eq!(store.load_user("0x22").unwrap(), Some(user));
    }

    #[test]
    fn transfer_commit_is_all_or_nothing() {
        let mut store = SqliteStore::in_memory().unwrap();
        let mut totals = TotalsRecord::zero("0x22");
        totals.added_pwrd = "1".parse().unwrap();
        totals.added_total = totals.added_pwrd;

        store.commit_transfer(&record("0xabc-1"), Some(&totals)).unwrap();
        assert_eq!(store.load_totals("0x22").unwrap(), Some(totals.clone()));
        assert!(store.load_transaction("0xabc-1").unwrap().is_some());

        // the record write fails, so the totals written before it roll back
        store.conn.execute_batch("DROP TABLE transactions").unwrap();
        let mut doubled = totals.clone();
        doubled.added_pwrd = "2".parse().unwrap();
        doubled.added_total = doubled.added_pwrd;
        assert!(store.commit_transfer(&record("0xabc-2"), Some(&doubled)).is_err());
        assert_eq!(store.load_totals("0x22").unwrap(), Some(totals));
    }

    #[test]
    fn corrupt_decimal_is_reported() {
        let mut store = SqliteStore::in_memory().unwrap();
        store.save_transaction(&record("0xabc-1")).unwrap();
        store
            .conn
            .execute("UPDATE transactions SET usd_amount = 'n/a'", [])
            .unwrap();
        assert!(matches!(
            store.load_transaction("0xabc-1"),
            Err(StoreError::Corrupt { table: "transactions", .. })
        ));
    }

    #[test]
    fn checkpoint_moves_forward() {
        let mut store = SqliteStore::in_memory().unwrap();
        assert_eq!(store.load_checkpoint().unwrap(), None);
        store.save_checkpoint(10).unwrap();
        store.save_checkpoint(25).unwrap();
        assert_eq!(store.load_checkpoint().unwrap(), Some(25));
    }
}
