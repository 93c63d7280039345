pub mod chan_point;

pub use chan_point::ChanPoint;

use crate::error::{Error, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Observed health of a single channel at snapshot time.
///
/// Volumes and fees are in millisatoshis; durations in whole seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelInsight {
    pub chan_point: ChanPoint,
    /// How long the peer's connectivity has been watched.
    pub monitored_seconds: u64,
    /// Portion of the monitored time the peer was online.
    pub uptime_seconds: u64,
    pub volume_incoming_msat: u64,
    pub volume_outgoing_msat: u64,
    pub fees_earned_msat: u64,
    /// Confirmations of the funding transaction, i.e. channel age in blocks.
    pub confirmations: u32,
    pub private: bool,
}

/// Port supplying the current channel snapshot.
///
/// Implementations own their I/O and any retry policy. Errors are reported as
/// opaque failures and the whole request is aborted.
#[async_trait::async_trait]
pub trait ChannelSnapshotSource: Send + Sync {
    async fn fetch(&self, cancel: &CancellationToken) -> anyhow::Result<Vec<ChannelInsight>>;
}

/// Fetch the snapshot once, honouring cancellation before and during the call.
pub async fn fetch_snapshot(
    source: &(impl ChannelSnapshotSource + ?Sized),
    cancel: &CancellationToken,
) -> Result<Vec<ChannelInsight>> {
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }

    let channels = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(Error::Cancelled),
        res = source.fetch(cancel) => res.map_err(Error::DataSourceUnavailable)?,
    };

    debug!("Fetched channel snapshot: {} channels", channels.len());
    Ok(channels)
}

/// List the raw insight records for every channel in the snapshot.
pub async fn channel_insights(
    source: &(impl ChannelSnapshotSource + ?Sized),
    cancel: &CancellationToken,
) -> Result<Vec<ChannelInsight>> {
    fetch_snapshot(source, cancel).await
}

// ---------------------------------------------------------------------------
// Fixture source for tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns a preset snapshot (or a preset failure) and counts fetches.
    /// A stalled source never completes its fetch.
    pub struct MockSnapshotSource {
        pub channels: Vec<ChannelInsight>,
        pub fail_with: Option<String>,
        pub stall: bool,
        pub fetch_calls: AtomicUsize,
    }

    impl MockSnapshotSource {
        pub fn new(channels: Vec<ChannelInsight>) -> Self {
            Self {
                channels,
                fail_with: None,
                stall: false,
                fetch_calls: AtomicUsize::new(0),
            }
        }

        pub fn failing(msg: &str) -> Self {
            Self {
                channels: Vec::new(),
                fail_with: Some(msg.to_string()),
                stall: false,
                fetch_calls: AtomicUsize::new(0),
            }
        }

        pub fn stalled() -> Self {
            Self {
                stall: true,
                ..Self::new(Vec::new())
            }
        }

        pub fn calls(&self) -> usize {
            self.fetch_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl ChannelSnapshotSource for MockSnapshotSource {
        async fn fetch(&self, _cancel: &CancellationToken) -> anyhow::Result<Vec<ChannelInsight>> {
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            if self.stall {
                std::future::pending::<()>().await;
            }
            match &self.fail_with {
                Some(msg) => Err(anyhow::anyhow!("{}", msg)),
                None => Ok(self.channels.clone()),
            }
        }
    }

    /// Channel point with a deterministic txid derived from `n`.
    pub fn chan_point(n: u32) -> ChanPoint {
        format!("{:064x}:{}", n, n % 4).parse().unwrap()
    }

    pub fn make_insight(n: u32, monitored: u64, uptime: u64) -> ChannelInsight {
        ChannelInsight {
            chan_point: chan_point(n),
            monitored_seconds: monitored,
            uptime_seconds: uptime,
            volume_incoming_msat: 0,
            volume_outgoing_msat: 0,
            fees_earned_msat: 0,
            confirmations: 100,
            private: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::*;
    use super::*;

    #[tokio::test]
    async fn test_channel_insights_returns_snapshot() {
        let source = MockSnapshotSource::new(vec![make_insight(1, 10, 5), make_insight(2, 20, 20)]);
        let insights = channel_insights(&source, &CancellationToken::new()).await.unwrap();
        assert_eq!(insights.len(), 2);
        assert_eq!(insights[0].chan_point, chan_point(1));
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_data_source_error() {
        let source = MockSnapshotSource::failing("node offline");
        let err = channel_insights(&source, &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, Error::DataSourceUnavailable(_)));
        assert!(err.to_string().contains("node offline"));
    }

    #[tokio::test]
    async fn test_cancelled_before_fetch_skips_source() {
        let source = MockSnapshotSource::new(vec![make_insight(1, 10, 5)]);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = channel_insights(&source, &cancel).await.unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_cancel_aborts_fetch_in_flight() {
        let source = MockSnapshotSource::stalled();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let res = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            channel_insights(&source, &cancel),
        )
        .await
        .expect("request should end once cancelled");
        assert!(matches!(res, Err(Error::Cancelled)));
        assert_eq!(source.calls(), 1);
    }

    #[test]
    fn test_insight_json_field_names() {
        let insight = make_insight(7, 1000, 900);
        let json = serde_json::to_value(&insight).unwrap();
        assert_eq!(json["monitored_seconds"], 1000);
        assert_eq!(json["uptime_seconds"], 900);
        assert_eq!(json["chan_point"], chan_point(7).to_string());
        assert_eq!(json["private"], false);
    }
}
