pub mod attribute;

pub use attribute::attribute;

use crate::error::{Error, Result};
use crate::insights::ChanPoint;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;

/// A single forward through the node: in on one channel, out on another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForwardingEvent {
    /// Unix seconds.
    pub timestamp: i64,
    pub incoming_channel: ChanPoint,
    pub outgoing_channel: ChanPoint,
    pub incoming_amount_msat: u64,
    pub outgoing_amount_msat: u64,
    pub fee_msat: u64,
}

/// Half-open time range `[start, end)` in unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevenueWindow {
    start: i64,
    end: i64,
}

impl RevenueWindow {
    pub fn new(start: i64, end: i64) -> Result<Self> {
        if end < start {
            return Err(Error::invalid(format!(
                "end time {} is before start time {}",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> i64 {
        self.start
    }

    pub fn end(&self) -> i64 {
        self.end
    }

    pub fn contains(&self, timestamp: i64) -> bool {
        self.start <= timestamp && timestamp < self.end
    }
}

/// Revenue a target channel shared with one peer channel.
///
/// "Outgoing" fields cover forwards where the target was the outgoing leg,
/// "incoming" fields forwards where it was the incoming leg.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairReport {
    pub amount_outgoing_msat: u64,
    pub fees_outgoing_msat: u64,
    pub amount_incoming_msat: u64,
    pub fees_incoming_msat: u64,
}

impl PairReport {
    pub fn add_incoming(&mut self, amount_msat: u64, fee_msat: u64) {
        self.amount_incoming_msat = self.amount_incoming_msat.saturating_add(amount_msat);
        self.fees_incoming_msat = self.fees_incoming_msat.saturating_add(fee_msat);
    }

    pub fn add_outgoing(&mut self, amount_msat: u64, fee_msat: u64) {
        self.amount_outgoing_msat = self.amount_outgoing_msat.saturating_add(amount_msat);
        self.fees_outgoing_msat = self.fees_outgoing_msat.saturating_add(fee_msat);
    }

    pub fn total_fees_msat(&self) -> u64 {
        self.fees_incoming_msat.saturating_add(self.fees_outgoing_msat)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueReport {
    pub target_channel: ChanPoint,
    /// Keyed by peer channel; ordered for reproducible output.
    pub pair_reports: BTreeMap<ChanPoint, PairReport>,
}

/// Port supplying forwarding history.
#[async_trait::async_trait]
pub trait ForwardingHistorySource: Send + Sync {
    /// Events with a timestamp inside `window`. Extra events are tolerated
    /// and filtered out again during attribution.
    async fn fetch(
        &self,
        cancel: &CancellationToken,
        window: RevenueWindow,
    ) -> anyhow::Result<Vec<ForwardingEvent>>;
}

/// Wire-level revenue request; channel points are still unparsed strings.
#[derive(Debug, Clone, Default)]
pub struct RevenueRequest {
    /// Empty means every channel seen in the window.
    pub chan_points: Vec<String>,
    pub start_time: i64,
    pub end_time: i64,
}

/// Attribute forwarding revenue between each target channel and its peers.
pub async fn revenue_report(
    source: &(impl ForwardingHistorySource + ?Sized),
    cancel: &CancellationToken,
    req: &RevenueRequest,
) -> Result<Vec<RevenueReport>> {
    let targets = req
        .chan_points
        .iter()
        .map(|s| s.parse::<ChanPoint>())
        .collect::<Result<Vec<_>>>()?;
    let window = RevenueWindow::new(req.start_time, req.end_time)?;

    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }

    let events = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(Error::Cancelled),
        res = source.fetch(cancel, window) => res.map_err(Error::DataSourceUnavailable)?,
    };
    debug!(
        "Fetched {} forwarding events for [{}, {})",
        events.len(),
        window.start(),
        window.end()
    );

    let reports = attribute(&events, window, &targets);

    let fees_msat: u64 = reports
        .iter()
        .flat_map(|r| r.pair_reports.values())
        .map(PairReport::total_fees_msat)
        .fold(0, u64::saturating_add);
    info!(
        "Revenue report: {} target channels, {} events in window, {} msat fees attributed",
        reports.len(),
        events.iter().filter(|e| window.contains(e.timestamp)).count(),
        fees_msat
    );

    Ok(reports)
}

// ---------------------------------------------------------------------------
// Fixture source for tests
// ---------------------------------------------------------------------------
