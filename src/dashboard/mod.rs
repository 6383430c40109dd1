use crate::animate::PositionInterpolator;
use crate::channel::PushChannel;
use crate::config::FleetwatchConfig;
use crate::model::{EntitySummary, LiveSample, RenderFrame, SummaryStats};
use crate::reconcile::SubscriptionReconciler;
use crate::snapshot::SnapshotClient;
use crate::store::LiveStateStore;
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{info, warn};

/// Wires the poll timer, snapshot client, reconciler, push channel,
/// live-state store and interpolator together.
///
/// Everything runs in one `tokio::select!` loop, so snapshot-triggered
/// reconciliation is serialized by construction: a poll tick that fires
/// while the previous pass is still awaiting the fetch queues behind it,
/// and delayed ticks coalesce into a single pass against the latest
/// snapshot. Push handling interleaves with polling in the same task;
/// the store's membership check covers the one ordering gap (a push in
/// transit for a name pruned moments earlier).
pub struct DashboardController {
    config: FleetwatchConfig,
    snapshot_client: SnapshotClient,
    channel: PushChannel,
    reconciler: SubscriptionReconciler,
    store: Arc<LiveStateStore>,
    interpolator: PositionInterpolator,

    /// Latest snapshot rows, for the table/summary display
    summary_tx: broadcast::Sender<Vec<EntitySummary>>,
    /// Position-free summary rows, for the card grid
    stats_tx: broadcast::Sender<Vec<SummaryStats>>,
    /// Interpolated marker frames, for the map layer
    frame_tx: broadcast::Sender<Vec<RenderFrame>>,
}

impl DashboardController {
    pub fn new(config: FleetwatchConfig) -> Self {
        let snapshot_client = SnapshotClient::new(&config);
        let channel = PushChannel::new(config.api.websocket_url());
        let (summary_tx, _) = broadcast::channel(16);
        let (stats_tx, _) = broadcast::channel(16);
        let (frame_tx, _) = broadcast::channel(64);

        Self {
            config,
            snapshot_client,
            channel,
            reconciler: SubscriptionReconciler::new(),
            store: Arc::new(LiveStateStore::new()),
            interpolator: PositionInterpolator::new(),
            summary_tx,
            stats_tx,
            frame_tx,
        }
    }

    /// Shared handle to the live-state store
    pub fn store(&self) -> Arc<LiveStateStore> {
        Arc::clone(&self.store)
    }

    /// Subscribe to snapshot rows (one Vec per successful poll)
    pub fn summaries(&self) -> broadcast::Receiver<Vec<EntitySummary>> {
        self.summary_tx.subscribe()
    }

    /// Subscribe to position-free summary rows
    pub fn summary_stats(&self) -> broadcast::Receiver<Vec<SummaryStats>> {
        self.stats_tx.subscribe()
    }

    /// Subscribe to interpolated marker frames
    pub fn frames(&self) -> broadcast::Receiver<Vec<RenderFrame>> {
        self.frame_tx.subscribe()
    }

    /// Run until `shutdown` signals (or its sender drops).
    ///
    /// Opens the push channel, then drives the poll timer, inbound push
    /// events and the animation cadence. On return the channel is closed,
    /// timers are dropped and all transitions are cleared — nothing fires
    /// after teardown.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let mut events = self
            .channel
            .open()
            .await
            .context("failed to open push channel")?;
        let mut channel_live = true;

        let mut poll = interval(Duration::from_millis(self.config.poll.interval_ms));
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut animation = interval(Duration::from_millis(self.config.animation.frame_interval_ms));
        animation.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            poll_interval_ms = self.config.poll.interval_ms,
            frame_interval_ms = self.config.animation.frame_interval_ms,
            "Dashboard controller started"
        );

        loop {
            tokio::select! {
                _ = poll.tick() => {
                    self.poll_once().await;
                }

                event = events.recv(), if channel_live => {
                    match event {
                        Some(sample) => self.handle_push(sample),
                        None => {
                            // Transport gone; no automatic reconnect here.
                            // Polling keeps the summary display fresh.
                            warn!("Push channel disconnected, live updates suspended");
                            self.channel.close();
                            channel_live = false;
                        }
                    }
                }

                _ = animation.tick() => {
                    self.animation_tick(Instant::now());
                }

                _ = shutdown.changed() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        self.channel.close();
        self.interpolator.clear();
        info!("Dashboard controller stopped");
        Ok(())
    }

    /// One poll pass: fetch, then reconcile. Fetch errors keep the
    /// previous snapshot; the next tick retries unconditionally.
    async fn poll_once(&mut self) {
        match self.snapshot_client.fetch_top_metrics().await {
            Ok(summaries) => self.apply_snapshot(summaries),
            Err(e) => warn!(error = %e, "Snapshot fetch failed, keeping previous snapshot"),
        }

        match self.snapshot_client.fetch_summary_stats().await {
            Ok(stats) => {
                let _ = self.stats_tx.send(stats);
            }
            Err(e) => warn!(error = %e, "Summary stats fetch failed"),
        }
    }

    /// Reconcile subscriptions against one snapshot's name set.
    ///
    /// Order matters: channel calls and store pruning are issued first,
    /// commit last. A crash mid-pass leaves the committed set stale, so
    /// the next tick recomputes and re-issues the same delta.
    fn apply_snapshot(&mut self, summaries: Vec<EntitySummary>) {
        let target: HashSet<String> = summaries.iter().map(|s| s.name.clone()).collect();
        let delta = self.reconciler.reconcile(&target);

        if !delta.is_empty() {
            info!(
                subscribe = delta.to_subscribe.len(),
                unsubscribe = delta.to_unsubscribe.len(),
                "Reconciling push subscriptions"
            );
            self.channel.subscribe(&delta.to_subscribe);
            self.channel.unsubscribe(&delta.to_unsubscribe);
        }

        self.store.set_subscribed(target.clone());
        self.store.prune(&delta.to_unsubscribe);
        for name in &delta.to_unsubscribe {
            self.interpolator.cancel(name);
        }
        self.reconciler.commit(target);

        let _ = self.summary_tx.send(summaries);
    }

    /// Fuse one inbound push event into the store and schedule its
    /// marker transition.
    fn handle_push(&mut self, sample: LiveSample) {
        let name = sample.name.clone();
        let to = sample.position();
        let previous = self.store.get(&name);

        if !self.store.apply(sample) {
            // Unsubscribed (or never subscribed) — dropped by the store
            return;
        }

        // First sample renders in place; later samples glide from the
        // previously rendered position.
        let (from, duration) = match previous {
            Some(prev) => (
                prev.position(),
                Duration::from_millis(self.config.animation.transition_ms),
            ),
            None => (to, Duration::ZERO),
        };
        self.interpolator
            .begin_transition(&name, from, to, duration, Instant::now());
    }

    fn animation_tick(&mut self, now: Instant) {
        let frames = self.interpolator.tick(now);
        if !frames.is_empty() {
            let _ = self.frame_tx.send(frames);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(name: &str) -> EntitySummary {
        EntitySummary {
            name: name.to_string(),
            mean_measurement: 10.0,
            min_measurement: 1.0,
            max_measurement: 20.0,
            last_latitude: 38.3,
            last_longitude: -123.3,
            last_heading: 0.0,
            count: 5,
        }
    }

    fn sample(name: &str, latitude: f64, heading: f64) -> LiveSample {
        LiveSample {
            name: name.to_string(),
            latitude,
            longitude: -123.3,
            heading,
            measurement: 10.0,
            correlation_id: "v-1".to_string(),
            received_at: chrono::Utc::now(),
        }
    }

    fn names(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn controller() -> DashboardController {
        // Push channel stays Closed: control calls are no-ops, which is
        // exactly the degraded mode the reconciliation path tolerates.
        DashboardController::new(FleetwatchConfig::default())
    }

    #[test]
    fn snapshot_commits_observed_name_set() {
        let mut ctl = controller();

        ctl.apply_snapshot(vec![summary("a"), summary("b"), summary("c")]);
        assert_eq!(ctl.reconciler.committed(), &names(&["a", "b", "c"]));

        ctl.apply_snapshot(vec![summary("b"), summary("c"), summary("d")]);
        assert_eq!(ctl.reconciler.committed(), &names(&["b", "c", "d"]));
    }

    #[test]
    fn membership_change_prunes_store_and_drops_stale_push() {
        // Snapshot [A,B,C] → [B,C,D]; stale push for A arrives after the
        // prune and must not resurrect the entry.
        let mut ctl = controller();

        ctl.apply_snapshot(vec![summary("a"), summary("b"), summary("c")]);
        ctl.handle_push(sample("a", 38.0, 90.0));
        ctl.handle_push(sample("b", 38.0, 90.0));
        assert!(ctl.store.get("a").is_some());

        ctl.apply_snapshot(vec![summary("b"), summary("c"), summary("d")]);
        assert!(ctl.store.get("a").is_none());
        assert!(ctl.store.get("b").is_some());

        ctl.handle_push(sample("a", 39.0, 90.0));
        assert!(ctl.store.get("a").is_none());
    }

    #[test]
    fn unsubscribed_entity_loses_its_transition() {
        let mut ctl = controller();

        ctl.apply_snapshot(vec![summary("a"), summary("b")]);
        ctl.handle_push(sample("a", 38.0, 90.0));
        ctl.handle_push(sample("a", 39.0, 90.0));
        assert_eq!(ctl.interpolator.in_flight(), 1);

        ctl.apply_snapshot(vec![summary("b")]);
        assert_eq!(ctl.interpolator.in_flight(), 0);
    }

    #[test]
    fn push_for_never_subscribed_name_is_noop() {
        let mut ctl = controller();

        ctl.handle_push(sample("ghost", 38.0, 90.0));
        assert!(ctl.store.is_empty());
        assert_eq!(ctl.interpolator.in_flight(), 0);
    }

    #[test]
    fn first_push_renders_in_place() {
        let mut ctl = controller();
        ctl.apply_snapshot(vec![summary("a")]);

        ctl.handle_push(sample("a", 38.5, 180.0));
        let frames = ctl.interpolator.tick(Instant::now());

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].latitude, 38.5);
        assert_eq!(frames[0].heading, 180.0);
        // Zero-length transition terminated on its first frame
        assert_eq!(ctl.interpolator.in_flight(), 0);
    }

    #[test]
    fn second_push_starts_transition_from_previous_sample() {
        let mut ctl = controller();
        ctl.apply_snapshot(vec![summary("a")]);

        let start = Instant::now();
        ctl.handle_push(sample("a", 38.0, 350.0));
        ctl.interpolator.tick(start);
        ctl.handle_push(sample("a", 39.0, 10.0));

        // Right after the second push the marker is still at the first
        // sample's position.
        let frames = ctl.interpolator.tick(Instant::now());
        assert_eq!(frames.len(), 1);
        assert!((frames[0].latitude - 38.0).abs() < 1e-3);
        // Heading heads through 360/0, so it stays in the 350..=360 or
        // 0..=10 band for the whole transition.
        let h = frames[0].heading;
        assert!(h >= 350.0 || h <= 10.0, "heading took the long way: {h}");

        let frames = ctl
            .interpolator
            .tick(start + Duration::from_millis(ctl.config.animation.transition_ms) * 2);
        assert_eq!(frames[0].latitude, 39.0);
        assert_eq!(frames[0].heading, 10.0);
    }

    #[test]
    fn snapshot_rows_are_broadcast() {
        let mut ctl = controller();
        let mut rx = ctl.summaries();

        ctl.apply_snapshot(vec![summary("a")]);
        let rows = rx.try_recv().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "a");
    }
}
