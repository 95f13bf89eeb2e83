//! Contains the logic for converting browser transitions into time spent per site.
//! [ActivityTracker] is a synchronous state machine, all time values are passed in explicitly so
//! that it can be driven by a timer in the daemon and by plain values in tests.
//!
//! States are [TrackingState::Idle] and [TrackingState::Tracking]. Every transition flushes
//! the running session into [Totals] first.

pub mod event;
pub mod site;
pub mod totals;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use event::TransitionEvent;
use site::Site;
use totals::Totals;

/// Sessions shorter than this are treated as tab flicker and are not saved.
pub const DEFAULT_MIN_ELAPSED: Duration = Duration::seconds(5);

/// Receiver of save requests. The tracker never waits for saving to finish.
#[cfg_attr(test, mockall::automock)]
pub trait SaveSink {
    fn request_save(&mut self, totals: &Totals);
}

impl SaveSink for tokio::sync::watch::Sender<Totals> {
    fn request_save(&mut self, totals: &Totals) {
        self.send_replace(totals.clone());
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TrackerConfig {
    pub min_elapsed: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            min_elapsed: DEFAULT_MIN_ELAPSED,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TrackingState {
    #[default]
    Idle,
    Tracking {
        site: Site,
        session_start: DateTime<Utc>,
    },
}

impl TrackingState {
    pub fn active_site(&self) -> Option<&Site> {
        match self {
            TrackingState::Idle => None,
            TrackingState::Tracking { site, .. } => Some(site),
        }
    }

    pub fn is_tracking(&self) -> bool {
        matches!(self, TrackingState::Tracking { .. })
    }
}

/// What readers of tracking data get to see.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub sites: Totals,
    pub total: f64,
    pub current_site: Option<Site>,
    pub is_tracking: bool,
}

impl Snapshot {
    /// Snapshot of stored data when nothing is being tracked.
    pub fn from_totals(sites: Totals) -> Self {
        Self {
            total: sites.total(),
            sites,
            current_site: None,
            is_tracking: false,
        }
    }
}

pub struct ActivityTracker<S> {
    state: TrackingState,
    totals: Totals,
    sink: S,
    config: TrackerConfig,
}

impl<S: SaveSink> ActivityTracker<S> {
    pub fn new(totals: Totals, sink: S, config: TrackerConfig) -> Self {
        Self {
            state: TrackingState::Idle,
            totals,
            sink,
            config,
        }
    }

    pub fn state(&self) -> &TrackingState {
        &self.state
    }

    pub fn totals(&self) -> &Totals {
        &self.totals
    }

    pub fn handle_event(&mut self, event: TransitionEvent, now: DateTime<Utc>) {
        debug!("Handling {event:?}");
        match event {
            TransitionEvent::Activate(site)
            | TransitionEvent::UrlChange(site)
            | TransitionEvent::FocusGained(site) => self.switch_to(site, now),
            TransitionEvent::FocusLost => self.stop(now),
            TransitionEvent::Tick => {
                self.tick(now);
            }
        }
    }

    /// Makes `site` the active site. Switching to the site that is already active does nothing.
    pub fn switch_to(&mut self, site: Option<Site>, now: DateTime<Utc>) {
        if self.state.active_site() == site.as_ref() {
            return;
        }

        self.flush(now);
        self.state = match site {
            Some(site) => {
                info!("Started tracking {site}");
                TrackingState::Tracking {
                    site,
                    session_start: now,
                }
            }
            None => {
                info!("Stopped tracking");
                TrackingState::Idle
            }
        };
    }

    /// Moves time spent since the last checkpoint into totals. Returns false when nothing was
    /// accumulated, either because nothing is tracked or because too little time passed.
    pub fn tick(&mut self, now: DateTime<Utc>) -> bool {
        let TrackingState::Tracking {
            site,
            session_start,
        } = &mut self.state
        else {
            return false;
        };

        let elapsed = now - *session_start;
        if elapsed < self.config.min_elapsed {
            debug!("Skipping checkpoint for {site}, only {elapsed} passed");
            return false;
        }

        let minutes = elapsed.num_milliseconds() as f64 / 60_000.;
        self.totals.add(site, minutes);
        *session_start = now;
        debug!(
            "Saved {minutes:.2}min on {site} (total: {:.2}min)",
            self.totals.minutes(site)
        );
        self.sink.request_save(&self.totals);
        true
    }

    pub fn flush(&mut self, now: DateTime<Utc>) -> bool {
        self.tick(now)
    }

    pub fn stop(&mut self, now: DateTime<Utc>) {
        self.switch_to(None, now);
    }

    pub fn reset(&mut self) {
        info!("Resetting all tracked data");
        self.totals.clear();
        self.state = TrackingState::Idle;
        self.sink.request_save(&self.totals);
    }

    /// Replaces totals with externally provided data. The running session restarts at `now`, so
    /// time before the import isn't added on top of it.
    pub fn import(&mut self, totals: Totals, now: DateTime<Utc>) {
        info!("Importing totals for {} sites", totals.len());
        self.totals = totals;
        if let TrackingState::Tracking { session_start, .. } = &mut self.state {
            *session_start = now;
        }
        self.sink.request_save(&self.totals);
    }

    /// Flushes the running session and returns the current view of the data.
    pub fn snapshot(&mut self, now: DateTime<Utc>) -> Snapshot {
        self.flush(now);
        Snapshot {
            sites: self.totals.clone(),
            total: self.totals.total(),
            current_site: self.state.active_site().cloned(),
            is_tracking: self.state.is_tracking(),
        }
    }

    /// Stops tracking and gives back the sink, so the owner can close it.
    pub fn finish(mut self, now: DateTime<Utc>) -> (Totals, S) {
        self.stop(now);
        (self.totals, self.sink)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

    use super::{
        event::TransitionEvent, site::Site, totals::Totals, ActivityTracker, MockSaveSink,
        SaveSink, TrackerConfig, TrackingState,
    };

    const TEST_START_DATE: NaiveDateTime =
        NaiveDateTime::new(NaiveDate::from_ymd_opt(2025, 3, 15).unwrap(), NaiveTime::MIN);

    fn at_ms(ms: i64) -> DateTime<Utc> {
        Utc.from_utc_datetime(&TEST_START_DATE) + Duration::milliseconds(ms)
    }

    fn site(v: &str) -> Site {
        Site::from_host(v).unwrap()
    }

    /// Keeps every save request, so tests can check what would have been persisted.
    #[derive(Default)]
    struct RecordingSink {
        saves: Vec<Totals>,
    }

    impl SaveSink for RecordingSink {
        fn request_save(&mut self, totals: &Totals) {
            self.saves.push(totals.clone());
        }
    }

    fn tracker() -> ActivityTracker<RecordingSink> {
        ActivityTracker::new(
            Totals::new(),
            RecordingSink::default(),
            TrackerConfig::default(),
        )
    }

    #[test]
    fn accumulates_minutes_across_switches() {
        let mut tracker = tracker();
        tracker.switch_to(Some(site("example.com")), at_ms(0));
        assert!(tracker.tick(at_ms(300_000)));
        assert_eq!(tracker.totals().minutes("example.com"), 5.);

        tracker.switch_to(Some(site("other.com")), at_ms(300_000));
        assert!(tracker.tick(at_ms(420_000)));

        assert_eq!(tracker.totals().minutes("other.com"), 2.);
        assert_eq!(tracker.totals().minutes("example.com"), 5.);
    }

    #[test]
    fn short_ticks_are_ignored() {
        let mut sink = MockSaveSink::new();
        sink.expect_request_save().times(0);
        let mut tracker = ActivityTracker::new(Totals::new(), sink, TrackerConfig::default());

        tracker.switch_to(Some(site("example.com")), at_ms(0));
        assert!(!tracker.tick(at_ms(2_000)));

        assert!(tracker.totals().is_empty());
        assert_eq!(
            tracker.state(),
            &TrackingState::Tracking {
                site: site("example.com"),
                session_start: at_ms(0)
            }
        );
    }

    #[test]
    fn qualifying_tick_requests_single_save() {
        let mut sink = MockSaveSink::new();
        sink.expect_request_save()
            .withf(|totals| totals.minutes("example.com") == 0.5)
            .times(1)
            .return_const(());
        let mut tracker = ActivityTracker::new(Totals::new(), sink, TrackerConfig::default());

        tracker.switch_to(Some(site("example.com")), at_ms(0));
        tracker.tick(at_ms(30_000));
    }

    #[test]
    fn switching_to_same_site_is_idempotent() {
        let mut once = tracker();
        once.switch_to(Some(site("example.com")), at_ms(0));

        let mut twice = tracker();
        twice.switch_to(Some(site("example.com")), at_ms(0));
        twice.switch_to(Some(site("example.com")), at_ms(60_000));

        assert_eq!(once.state(), twice.state());
        assert_eq!(once.totals(), twice.totals());
        assert!(twice.sink.saves.is_empty());
    }

    #[test]
    fn switching_flushes_previous_session() {
        let mut tracker = tracker();
        tracker.switch_to(Some(site("example.com")), at_ms(0));
        tracker.switch_to(Some(site("other.com")), at_ms(90_000));

        let snapshot = tracker.snapshot(at_ms(90_000));
        assert_eq!(snapshot.sites.minutes("example.com"), 1.5);
        assert_eq!(snapshot.current_site, Some(site("other.com")));
        assert!(snapshot.is_tracking);
    }

    #[test]
    fn snapshot_includes_running_session() {
        let mut tracker = tracker();
        tracker.switch_to(Some(site("example.com")), at_ms(0));

        let snapshot = tracker.snapshot(at_ms(120_000));
        assert_eq!(snapshot.total, 2.);
        assert_eq!(snapshot.sites.minutes("example.com"), 2.);

        // The session was checkpointed, so the next snapshot doesn't count it twice.
        let snapshot = tracker.snapshot(at_ms(180_000));
        assert_eq!(snapshot.total, 3.);
    }

    #[test]
    fn sub_threshold_remainder_is_dropped_on_switch() {
        let mut tracker = tracker();
        tracker.switch_to(Some(site("example.com")), at_ms(0));
        tracker.switch_to(Some(site("other.com")), at_ms(3_000));
        tracker.stop(at_ms(63_000));

        assert_eq!(tracker.totals().get("example.com"), None);
        assert_eq!(tracker.totals().minutes("other.com"), 1.);
    }

    #[test]
    fn stop_and_unknown_sites_go_idle() {
        let mut tracker = tracker();
        tracker.switch_to(Some(site("example.com")), at_ms(0));
        tracker.switch_to(None, at_ms(60_000));

        assert_eq!(tracker.state(), &TrackingState::Idle);
        assert_eq!(tracker.totals().minutes("example.com"), 1.);

        // Idle time isn't attributed to anything.
        tracker.tick(at_ms(600_000));
        assert_eq!(tracker.totals().total(), 1.);
    }

    #[test]
    fn reset_clears_totals_and_stops_tracking() {
        let mut tracker = tracker();
        tracker.switch_to(Some(site("example.com")), at_ms(0));
        tracker.tick(at_ms(600_000));
        tracker.reset();

        let snapshot = tracker.snapshot(at_ms(700_000));
        assert_eq!(snapshot.total, 0.);
        assert!(!snapshot.is_tracking);
        assert_eq!(snapshot.current_site, None);
        assert_eq!(tracker.sink.saves.last(), Some(&Totals::new()));
    }

    #[test]
    fn clock_going_backwards_changes_nothing() {
        let mut tracker = tracker();
        tracker.switch_to(Some(site("example.com")), at_ms(60_000));
        assert!(!tracker.tick(at_ms(0)));
        assert!(tracker.totals().is_empty());
    }

    #[test]
    fn events_map_to_transitions() {
        let mut tracker = tracker();
        tracker.handle_event(TransitionEvent::Activate(Some(site("github.com"))), at_ms(0));
        tracker.handle_event(TransitionEvent::Tick, at_ms(60_000));
        tracker.handle_event(
            TransitionEvent::UrlChange(Some(site("youtube.com"))),
            at_ms(120_000),
        );
        tracker.handle_event(TransitionEvent::FocusLost, at_ms(180_000));
        assert_eq!(tracker.state(), &TrackingState::Idle);

        tracker.handle_event(
            TransitionEvent::FocusGained(Some(site("github.com"))),
            at_ms(600_000),
        );
        tracker.handle_event(TransitionEvent::Activate(None), at_ms(630_000));

        assert_eq!(tracker.totals().minutes("github.com"), 2.5);
        assert_eq!(tracker.totals().minutes("youtube.com"), 1.);
        assert_eq!(tracker.state(), &TrackingState::Idle);
    }

    #[test]
    fn import_replaces_totals_and_restarts_session() {
        let mut tracker = tracker();
        tracker.switch_to(Some(site("example.com")), at_ms(0));
        tracker.import(Totals::from_iter([(site("github.com"), 10.)]), at_ms(60_000));

        let snapshot = tracker.snapshot(at_ms(120_000));
        assert_eq!(snapshot.sites.minutes("github.com"), 10.);
        assert_eq!(snapshot.sites.minutes("example.com"), 1.);
        assert_eq!(snapshot.total, 11.);
    }

    #[test]
    fn totals_never_decrease_without_reset() {
        let sites = ["a.com", "b.com", "c.com"];
        let mut tracker = tracker();
        let mut previous = Totals::new();
        let mut now = 0i64;

        // Deterministic pseudo random walk over switches and ticks with uneven gaps.
        let mut seed = 17u64;
        for _ in 0..500 {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            now += (seed >> 33) as i64 % 20_000;
            match (seed >> 20) % 5 {
                0 => tracker.stop(at_ms(now)),
                1 | 2 => {
                    tracker.tick(at_ms(now));
                }
                _ => tracker.switch_to(
                    Some(site(sites[(seed >> 40) as usize % sites.len()])),
                    at_ms(now),
                ),
            }

            for (site, minutes) in previous.iter() {
                assert!(tracker.totals().minutes(site) >= minutes);
            }
            assert!(tracker.totals().iter().all(|(_, minutes)| minutes >= 0.));
            previous = tracker.totals().clone();
        }

        // Everything attributed fits into the time that passed.
        assert!(tracker.totals().total() <= now as f64 / 60_000. + 1e-9);
    }
}
