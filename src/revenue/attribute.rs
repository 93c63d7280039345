//! Pairwise revenue attribution.
//!
//! Every forward in the window credits each target leg with its amount and
//! half the fee, keyed by the channel on the other leg:
//! - target was incoming: (target = incoming, peer = outgoing) += incoming amount
//! - target was outgoing: (target = outgoing, peer = incoming) += outgoing amount
//!
//! The odd millisatoshi of an odd fee goes to the outgoing leg, so the two
//! halves of an event always add up to its fee. Accumulation is plain
//! addition and does not depend on event order.

use crate::insights::ChanPoint;
use crate::revenue::{ForwardingEvent, PairReport, RevenueReport, RevenueWindow};
use std::collections::{BTreeMap, BTreeSet};

/// Split a forward's fee into (incoming share, outgoing share).
pub fn split_fee(fee_msat: u64) -> (u64, u64) {
    let incoming = fee_msat / 2;
    (incoming, fee_msat - incoming)
}

/// Build one report per target, sorted by target channel.
///
/// With no explicit targets, every channel seen on either leg of an in-window
/// event is a target. Explicit targets without traffic still get an (empty)
/// report.
pub fn attribute(
    events: &[ForwardingEvent],
    window: RevenueWindow,
    targets: &[ChanPoint],
) -> Vec<RevenueReport> {
    let in_window: Vec<&ForwardingEvent> = events
        .iter()
        .filter(|e| window.contains(e.timestamp))
        .collect();

    let targets: BTreeSet<ChanPoint> = if targets.is_empty() {
        in_window
            .iter()
            .flat_map(|e| [e.incoming_channel.clone(), e.outgoing_channel.clone()])
            .collect()
    } else {
        targets.iter().cloned().collect()
    };

    let mut pairs: BTreeMap<ChanPoint, BTreeMap<ChanPoint, PairReport>> = targets
        .iter()
        .map(|t| (t.clone(), BTreeMap::new()))
        .collect();

    for event in in_window {
        let (fee_in, fee_out) = split_fee(event.fee_msat);

        if let Some(peers) = pairs.get_mut(&event.incoming_channel) {
            peers
                .entry(event.outgoing_channel.clone())
                .or_default()
                .add_incoming(event.incoming_amount_msat, fee_in);
        }

        if let Some(peers) = pairs.get_mut(&event.outgoing_channel) {
            peers
                .entry(event.incoming_channel.clone())
                .or_default()
                .add_outgoing(event.outgoing_amount_msat, fee_out);
        }
    }

    pairs
        .into_iter()
        .map(|(target_channel, pair_reports)| RevenueReport {
            target_channel,
            pair_reports,
        })
        .collect()
}
