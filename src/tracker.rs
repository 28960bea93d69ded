//! Tracker tying the store, engine, export and notifications together.

use crate::config::TrackerConfig;
use crate::engine::{diff_stats, reconcile_in};
use crate::error::Result;
use crate::events::{EventBus, EventHandle, TrackerEvent};
use crate::export::{export_snapshot, ExportOutcome, SheetAppender, TokenProvider};
use crate::snapshots::{FileSnapshotStore, SnapshotStore};
use crate::sort::{sort_products, SortDirection, SortKey};
use crate::types::{ObservationBatch, ProductRecord, Snapshot, Timestamp};
use chrono::{Local, TimeZone, Utc};
use parking_lot::Mutex;
use std::fmt::Display;
use tracing::{debug, info};

/// Serialized front door to a snapshot store.
///
/// Every mutating call holds one lock across its whole read-modify-write
/// cycle. Two refreshes never interleave.
pub struct Tracker<S: SnapshotStore> {
    store: S,
    config: TrackerConfig,
    events: EventBus,
    write_lock: Mutex<()>,
}

impl Tracker<FileSnapshotStore> {
    /// Open the file store named by `config`.
    pub fn open(config: TrackerConfig) -> Result<Self> {
        let store = FileSnapshotStore::open_or_create(&config.store)?;
        Ok(Self::new(store, config))
    }
}

impl<S: SnapshotStore> Tracker<S> {
    pub fn new(store: S, config: TrackerConfig) -> Self {
        Self {
            store,
            config,
            events: EventBus::new(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Subscribe to tracker events with the configured buffer size.
    pub fn subscribe(&self) -> EventHandle {
        self.events.subscribe(self.config.event_buffer)
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    // --- Snapshot Operations ---

    /// Reconcile `batch` against the stored snapshot and store the result.
    pub fn refresh(&self, batch: &ObservationBatch) -> Result<Snapshot> {
        self.refresh_in(batch, Utc::now(), &Local)
    }

    /// [`Tracker::refresh`] with an explicit clock and timezone.
    pub fn refresh_in<Tz: TimeZone>(
        &self,
        batch: &ObservationBatch,
        now: Timestamp,
        tz: &Tz,
    ) -> Result<Snapshot> {
        let _lock = self.write_lock.lock();

        let previous = self.store.get()?;
        let next = reconcile_in(previous.as_ref(), batch, now, tz);
        let stats = diff_stats(previous.as_ref(), &next);

        self.store.set(&next)?;

        info!(
            products = next.len(),
            new = stats.new,
            increased = stats.increased,
            decreased = stats.decreased,
            dropped = stats.dropped,
            "Reconciled scrape"
        );

        let changed: Vec<ProductRecord> = next.changed_products().cloned().collect();
        self.events.broadcast(TrackerEvent::Scraped {
            last_scraped: next.last_scraped,
            has_changes: !changed.is_empty(),
            changed,
        });

        Ok(next)
    }

    /// Currently stored snapshot.
    pub fn current(&self) -> Result<Option<Snapshot>> {
        self.store.get()
    }

    /// Stored products ordered for display. Empty when nothing is stored.
    pub fn sorted(&self, key: SortKey, direction: SortDirection) -> Result<Vec<ProductRecord>> {
        Ok(self
            .store
            .get()?
            .map(|s| sort_products(&s.products, key, direction))
            .unwrap_or_default())
    }

    /// Remove the stored snapshot.
    pub fn clear_all(&self) -> Result<()> {
        let _lock = self.write_lock.lock();

        self.store.clear()?;
        self.events.broadcast(TrackerEvent::Cleared);
        Ok(())
    }

    // --- Export ---

    /// Append changed products to the configured sheet.
    pub fn export(
        &self,
        tokens: &dyn TokenProvider,
        appender: &dyn SheetAppender,
    ) -> Result<ExportOutcome> {
        self.export_in(Utc::now(), &Local, tokens, appender)
    }

    /// [`Tracker::export`] with an explicit clock and timezone.
    pub fn export_in<Tz>(
        &self,
        now: Timestamp,
        tz: &Tz,
        tokens: &dyn TokenProvider,
        appender: &dyn SheetAppender,
    ) -> Result<ExportOutcome>
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        self.config.sheet.validate()?;

        let snapshot = match self.store.get()? {
            Some(s) => s,
            None => {
                debug!("No stored snapshot to export");
                return Ok(ExportOutcome::NothingToExport);
            }
        };

        let outcome = export_snapshot(&snapshot, now, tz, &self.config.sheet, tokens, appender)?;
        if let ExportOutcome::Exported { rows, .. } = &outcome {
            self.events.broadcast(TrackerEvent::Exported { rows: rows.len() });
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SheetTarget;
    use crate::error::TrackerError;
    use crate::events::DropReason;
    use crate::export::{AppendRequest, AppendResponse};
    use crate::snapshots::MemorySnapshotStore;
    use crate::types::{DashboardTotals, RawObservation};

    fn at(d: u32, h: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2024, 5, d, h, 0, 0).unwrap()
    }

    fn batch(items: &[(&str, u64)], now: Timestamp) -> ObservationBatch {
        ObservationBatch::new(
            items
                .iter()
                .map(|(n, s)| RawObservation::new(*n, *s, now))
                .collect(),
            DashboardTotals::new("0", "$0"),
            now,
        )
    }

    fn tracker() -> Tracker<MemorySnapshotStore> {
        let config = TrackerConfig {
            sheet: SheetTarget::new("sheet-1"),
            ..Default::default()
        };
        Tracker::new(MemorySnapshotStore::new(), config)
    }

    struct Token;

    impl TokenProvider for Token {
        fn token(&self) -> Result<String> {
            Ok("t".into())
        }
    }

    struct Accept;

    impl SheetAppender for Accept {
        fn append(
            &self,
            _token: &str,
            _target: &SheetTarget,
            request: &AppendRequest,
        ) -> Result<AppendResponse> {
            Ok(AppendResponse {
                updated_rows: request.row_count(),
            })
        }
    }

    #[test]
    fn test_subscribe_uses_configured_buffer() {
        let config = TrackerConfig {
            event_buffer: 1,
            ..Default::default()
        };
        let tracker = Tracker::new(MemorySnapshotStore::new(), config);
        let events = tracker.subscribe();

        tracker.refresh_in(&batch(&[("A", 1)], at(1, 9)), at(1, 9), &Utc).unwrap();
        tracker.refresh_in(&batch(&[("A", 2)], at(1, 10)), at(1, 10), &Utc).unwrap();

        let received = events.drain();
        assert_eq!(received.len(), 2);
        assert!(matches!(received[0], TrackerEvent::Scraped { .. }));
        assert_eq!(
            received[1],
            TrackerEvent::Dropped {
                reason: DropReason::BufferOverflow
            }
        );
        assert_eq!(tracker.events().subscriber_count(), 0);
    }

    #[test]
    fn test_refresh_persists_and_notifies() {
        let tracker = tracker();
        let events = tracker.subscribe();

        tracker.refresh_in(&batch(&[("A", 3)], at(1, 9)), at(1, 9), &Utc).unwrap();
        let second = tracker
            .refresh_in(&batch(&[("A", 3), ("B", 1)], at(1, 10)), at(1, 10), &Utc)
            .unwrap();

        assert_eq!(tracker.current().unwrap(), Some(second));

        let received = events.drain();
        assert_eq!(received.len(), 2);
        match &received[1] {
            TrackerEvent::Scraped {
                changed,
                has_changes,
                ..
            } => {
                assert!(*has_changes);
                assert_eq!(changed.len(), 1);
                assert_eq!(changed[0].name, "B");
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_sorted_without_snapshot_is_empty() {
        let tracker = tracker();
        assert!(tracker
            .sorted(SortKey::Name, SortDirection::Ascending)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_sorted_view() {
        let tracker = tracker();
        tracker
            .refresh_in(&batch(&[("b", 1), ("A", 9), ("c", 4)], at(1, 9)), at(1, 9), &Utc)
            .unwrap();

        let by_total = tracker
            .sorted(SortKey::TotalSales, SortDirection::Descending)
            .unwrap();
        let names: Vec<_> = by_total.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["A", "c", "b"]);
    }

    #[test]
    fn test_clear_all() {
        let tracker = tracker();
        let events = tracker.subscribe();
        tracker.refresh_in(&batch(&[("A", 3)], at(1, 9)), at(1, 9), &Utc).unwrap();

        tracker.clear_all().unwrap();
        assert!(tracker.current().unwrap().is_none());
        assert_eq!(events.drain().last(), Some(&TrackerEvent::Cleared));

        // After clearing, everything is new again.
        let next = tracker.refresh_in(&batch(&[("A", 5)], at(1, 11)), at(1, 11), &Utc).unwrap();
        assert_eq!(next.get("A").unwrap().todays_sales, 5);
    }

    #[test]
    fn test_export_without_snapshot() {
        let tracker = tracker();
        let outcome = tracker.export_in(at(1, 9), &Utc, &Token, &Accept).unwrap();
        assert_eq!(outcome, ExportOutcome::NothingToExport);
    }

    #[test]
    fn test_export_requires_sheet() {
        let tracker = Tracker::new(MemorySnapshotStore::new(), TrackerConfig::default());
        let err = tracker.export_in(at(1, 9), &Utc, &Token, &Accept).unwrap_err();
        assert!(matches!(err, TrackerError::Config(_)));
    }

    #[test]
    fn test_export_notifies() {
        let tracker = tracker();
        tracker.refresh_in(&batch(&[("A", 3), ("B", 0)], at(1, 9)), at(1, 9), &Utc).unwrap();
        let events = tracker.subscribe();

        let outcome = tracker.export_in(at(1, 9), &Utc, &Token, &Accept).unwrap();
        assert_eq!(outcome.exported_rows(), 1);
        assert_eq!(events.drain(), vec![TrackerEvent::Exported { rows: 1 }]);
    }
}
