use crate::db::Database;
use crate::insights::{ChanPoint, ChannelInsight, ChannelSnapshotSource};
use crate::revenue::{ForwardingEvent, ForwardingHistorySource, RevenueWindow};
use anyhow::Context;
use log::{debug, info};
use serde::Serialize;
use std::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

/// SQLite-backed snapshot and forwarding-history source.
pub struct SqliteStore {
    db: Mutex<Database>,
}

/// Summary printed by `status`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreStatus {
    pub channels: i64,
    pub private_channels: i64,
    pub forwarding_events: i64,
    pub first_event: Option<i64>,
    pub last_event: Option<i64>,
    pub total_fees_msat: i64,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }

    fn lock(&self) -> anyhow::Result<MutexGuard<'_, Database>> {
        self.db
            .lock()
            .map_err(|_| anyhow::anyhow!("database mutex poisoned"))
    }

    /// Insert or update insights by channel point.
    ///
    /// Updated channels keep their original position in the snapshot order.
    pub fn import_insights(&self, insights: &[ChannelInsight]) -> anyhow::Result<usize> {
        let mut db = self.lock()?;
        let tx = db.conn_mut().transaction()?;
        let now = chrono::Utc::now().timestamp() as f64;

        for ch in insights {
            tx.execute(
                "INSERT INTO channel_insights \
                 (chan_point, monitored_secs, uptime_secs, volume_incoming_msat, \
                  volume_outgoing_msat, fees_earned_msat, confirmations, private, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9) \
                 ON CONFLICT(chan_point) DO UPDATE SET \
                 monitored_secs = ?2, uptime_secs = ?3, volume_incoming_msat = ?4, \
                 volume_outgoing_msat = ?5, fees_earned_msat = ?6, confirmations = ?7, \
                 private = ?8, updated_at = ?9",
                rusqlite::params![
                    ch.chan_point.to_string(),
                    ch.monitored_seconds,
                    ch.uptime_seconds,
                    ch.volume_incoming_msat,
                    ch.volume_outgoing_msat,
                    ch.fees_earned_msat,
                    ch.confirmations,
                    ch.private,
                    now,
                ],
            )?;
        }

        tx.commit()?;
        info!("Imported {} channel insights", insights.len());
        Ok(insights.len())
    }

    pub fn import_events(&self, events: &[ForwardingEvent]) -> anyhow::Result<usize> {
        let mut db = self.lock()?;
        let tx = db.conn_mut().transaction()?;

        for ev in events {
            tx.execute(
                "INSERT INTO forwarding_events \
                 (timestamp, incoming_channel, outgoing_channel, incoming_amount_msat, \
                  outgoing_amount_msat, fee_msat) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    ev.timestamp,
                    ev.incoming_channel.to_string(),
                    ev.outgoing_channel.to_string(),
                    ev.incoming_amount_msat,
                    ev.outgoing_amount_msat,
                    ev.fee_msat,
                ],
            )?;
        }

        tx.commit()?;
        info!("Imported {} forwarding events", events.len());
        Ok(events.len())
    }

    pub fn load_insights(&self) -> anyhow::Result<Vec<ChannelInsight>> {
        let db = self.lock()?;
        let mut stmt = db.conn().prepare(
            "SELECT chan_point, monitored_secs, uptime_secs, volume_incoming_msat, \
             volume_outgoing_msat, fees_earned_msat, confirmations, private \
             FROM channel_insights ORDER BY rowid ASC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, i64>(5)?,
                    row.get::<_, i64>(6)?,
                    row.get::<_, bool>(7)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(cp, monitored, uptime, vin, vout, fees, confs, private)| -> anyhow::Result<ChannelInsight> {
                let chan_point: ChanPoint = cp
                    .parse()
                    .with_context(|| format!("stored channel point {:?}", cp))?;
                Ok(ChannelInsight {
                    chan_point,
                    monitored_seconds: unsigned(monitored, "monitored_secs")?,
                    uptime_seconds: unsigned(uptime, "uptime_secs")?,
                    volume_incoming_msat: unsigned(vin, "volume_incoming_msat")?,
                    volume_outgoing_msat: unsigned(vout, "volume_outgoing_msat")?,
                    fees_earned_msat: unsigned(fees, "fees_earned_msat")?,
                    confirmations: u32::try_from(confs)
                        .with_context(|| format!("confirmations out of range: {}", confs))?,
                    private,
                })
            })
            .collect()
    }

    pub fn load_events(&self, window: RevenueWindow) -> anyhow::Result<Vec<ForwardingEvent>> {
        let db = self.lock()?;
        let mut stmt = db.conn().prepare(
            "SELECT timestamp, incoming_channel, outgoing_channel, incoming_amount_msat, \
             outgoing_amount_msat, fee_msat FROM forwarding_events \
             WHERE timestamp >= ?1 AND timestamp < ?2 ORDER BY timestamp ASC, id ASC",
        )?;
        let rows = stmt
            .query_map(rusqlite::params![window.start(), window.end()], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, i64>(5)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let events = rows
            .into_iter()
            .map(|(timestamp, chan_in, chan_out, amt_in, amt_out, fee)| -> anyhow::Result<ForwardingEvent> {
                Ok(ForwardingEvent {
                    timestamp,
                    incoming_channel: chan_in
                        .parse()
                        .with_context(|| format!("stored channel point {:?}", chan_in))?,
                    outgoing_channel: chan_out
                        .parse()
                        .with_context(|| format!("stored channel point {:?}", chan_out))?,
                    incoming_amount_msat: unsigned(amt_in, "incoming_amount_msat")?,
                    outgoing_amount_msat: unsigned(amt_out, "outgoing_amount_msat")?,
                    fee_msat: unsigned(fee, "fee_msat")?,
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        debug!(
            "Loaded {} forwarding events in [{}, {})",
            events.len(),
            window.start(),
            window.end()
        );
        Ok(events)
    }

    pub fn status(&self) -> anyhow::Result<StoreStatus> {
        let db = self.lock()?;
        let conn = db.conn();

        let (channels, private_channels): (i64, i64) = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(private), 0) FROM channel_insights",
            [],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )?;
        let (forwarding_events, first_event, last_event, total_fees_msat): (i64, Option<i64>, Option<i64>, i64) = conn.query_row(
            "SELECT COUNT(*), MIN(timestamp), MAX(timestamp), COALESCE(SUM(fee_msat), 0) \
             FROM forwarding_events",
            [],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
        )?;

        Ok(StoreStatus {
            channels,
            private_channels,
            forwarding_events,
            first_event,
            last_event,
            total_fees_msat,
        })
    }
}

fn unsigned(value: i64, column: &str) -> anyhow::Result<u64> {
    u64::try_from(value).with_context(|| format!("negative {} in database: {}", column, value))
}

#[async_trait::async_trait]
impl ChannelSnapshotSource for SqliteStore {
    async fn fetch(&self, _cancel: &CancellationToken) -> anyhow::Result<Vec<ChannelInsight>> {
        self.load_insights().context("load channel insights")
    }
}

#[async_trait::async_trait]
impl ForwardingHistorySource for SqliteStore {
    async fn fetch(
        &self,
        _cancel: &CancellationToken,
        window: RevenueWindow,
    ) -> anyhow::Result<Vec<ForwardingEvent>> {
        self.load_events(window).context("load forwarding events")
    }
}
