use anyhow::Context;
use rusqlite::Connection;
use std::path::Path;

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;

        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    fn migrate(&self) -> anyhow::Result<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }
}

const SCHEMA: &str = r#"
-- Latest insight per channel; rowid keeps first-import order
CREATE TABLE IF NOT EXISTS channel_insights (
    chan_point TEXT NOT NULL UNIQUE,
    monitored_secs INTEGER NOT NULL,
    uptime_secs INTEGER NOT NULL,
    volume_incoming_msat INTEGER NOT NULL DEFAULT 0,
    volume_outgoing_msat INTEGER NOT NULL DEFAULT 0,
    fees_earned_msat INTEGER NOT NULL DEFAULT 0,
    confirmations INTEGER NOT NULL DEFAULT 0,
    private INTEGER NOT NULL DEFAULT 0,
    updated_at REAL NOT NULL
);

-- Forwarding history
CREATE TABLE IF NOT EXISTS forwarding_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp INTEGER NOT NULL,
    incoming_channel TEXT NOT NULL,
    outgoing_channel TEXT NOT NULL,
    incoming_amount_msat INTEGER NOT NULL,
    outgoing_amount_msat INTEGER NOT NULL,
    fee_msat INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_forwarding_events_time
    ON forwarding_events(timestamp);
"#;
