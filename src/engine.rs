//! Watch session: the poll / reconcile loop of one tracked page.
//!
//! A cycle is split at its only suspension point, the page fetch:
//! `begin_cycle` hands out a request, the caller performs the fetch however it
//! likes, and `complete_cycle` reconciles the result. Both halves check the
//! generation guard, so a cycle that was superseded while its fetch was in
//! flight produces no notification, no state write and no timer.

use std::collections::{BTreeSet, HashSet};
use std::time::{Duration, Instant};

use url::Url;

use crate::config::MAX_POLL_INTERVAL_SECS;
use crate::error::{Result, TagwatchError};
use crate::fetch::PageFetcher;
use crate::notify::{Notification, NotificationSink};
use crate::render::{Renderer, WatchLabel};
use crate::scheduler::{Scheduler, Timer};
use crate::scrape::{scrape_page, PageAdapter};
use crate::store::{path_key, BlobStore, StateStore, WatchPatch};
use crate::tag::Tag;

/// Shown when the page has no project heading
pub const UNKNOWN_PROJECT: &str = "Unknown project";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Polling,
    Scheduled,
}

/// A fetch the caller must perform for a cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleRequest {
    pub generation: u64,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Tags notified on this cycle, in list order
    pub notified: Vec<String>,
    /// A perfect score ended the watch
    pub stopped: bool,
    pub fetch_failed: bool,
    pub section_missing: bool,
    /// Next cycle armed
    pub rescheduled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Superseded or no longer watching; nothing happened
    Cancelled,
    Finished(CycleReport),
}

/// Which scraped tags are new this cycle
#[derive(Debug, PartialEq)]
pub struct Reconciliation<'a> {
    pub fresh: Vec<&'a Tag>,
    /// The last fresh tag is a perfect score
    pub perfect: bool,
}

/// Diff a scraped list against the seen set
///
/// Walks the list in order, keeping succeeded tags that were not seen yet.
/// Stops at the first perfect score, which ends the watch.
pub fn reconcile<'a>(seen: &BTreeSet<String>, tags: &'a [Tag]) -> Reconciliation<'a> {
    let mut fresh = Vec::new();
    let mut taken = HashSet::new();

    for tag in tags {
        if seen.contains(&tag.name) || !tag.status.is_success() || !taken.insert(&tag.name) {
            continue;
        }
        fresh.push(tag);
        if tag.is_perfect() {
            return Reconciliation { fresh, perfect: true };
        }
    }

    Reconciliation { fresh, perfect: false }
}

/// Names of the tags already in a terminal-success state
pub fn succeeded_names(tags: &[Tag]) -> BTreeSet<String> {
    tags.iter()
        .filter(|t| t.status.is_success())
        .map(|t| t.name.clone())
        .collect()
}

/// One tracked page and its timer chain
pub struct WatchSession<B: BlobStore> {
    url: Url,
    path: String,
    interval: Duration,
    store: StateStore<B>,
    scheduler: Scheduler,
    adapter: Box<dyn PageAdapter>,
    sink: Box<dyn NotificationSink>,
    renderer: Box<dyn Renderer>,
    phase: Phase,
    visible_html: Option<String>,
}

impl<B: BlobStore> WatchSession<B> {
    pub fn new(
        url: &str,
        interval: Duration,
        store: StateStore<B>,
        adapter: Box<dyn PageAdapter>,
        sink: Box<dyn NotificationSink>,
        renderer: Box<dyn Renderer>,
    ) -> Result<Self> {
        if interval.is_zero() {
            return Err(TagwatchError::ConfigError("poll interval must be positive".into()));
        }
        if interval > Duration::from_secs(MAX_POLL_INTERVAL_SECS) {
            return Err(TagwatchError::ConfigError(format!(
                "poll interval must be at most {}s",
                MAX_POLL_INTERVAL_SECS
            )));
        }
        let url = Url::parse(url)?;
        Ok(Self {
            path: path_key(&url),
            url,
            interval,
            store,
            scheduler: Scheduler::new(),
            adapter,
            sink,
            renderer,
            phase: Phase::Idle,
            visible_html: None,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn generation(&self) -> u64 {
        self.scheduler.generation()
    }

    pub fn store(&self) -> &StateStore<B> {
        &self.store
    }

    pub fn is_watching(&self) -> bool {
        self.store.get_state(&self.path).watching
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    /// Display a page the user is looking at; used for first-activation seeding
    pub fn show_page(&mut self, html: &str) {
        if let Some(page) = scrape_page(self.adapter.as_ref(), html, Some(&self.url)) {
            self.renderer.replace_tag_list(&page.tags);
        }
        self.visible_html = Some(html.to_string());
        let label = self.current_label();
        self.renderer.set_label(label);
    }

    /// Turn watching on and open a new generation
    ///
    /// On the first activation of a path (empty seen set), every tag already
    /// succeeded on the visible page is marked seen so it never notifies.
    pub fn activate(&mut self, visible_html: Option<&str>) -> Result<u64> {
        let state = self.store.get_state(&self.path);

        let mut patch = WatchPatch::watching(true);
        if state.seen.is_empty() {
            let seed = visible_html
                .and_then(|html| scrape_page(self.adapter.as_ref(), html, Some(&self.url)))
                .map(|page| succeeded_names(&page.tags))
                .unwrap_or_default();
            if !seed.is_empty() {
                tracing::info!(path = %self.path, count = seed.len(), "seeded already processed tags");
                patch.seen = Some(seed);
            }
        }
        self.store.set_state(&self.path, patch)?;

        let generation = self.scheduler.start_generation();
        self.phase = Phase::Polling;
        self.renderer.set_label(WatchLabel::Watching);
        tracing::info!(path = %self.path, generation, "watch started");
        Ok(generation)
    }

    /// Pick up a watch left on by a previous run, without reseeding
    pub fn resume(&mut self) -> Option<u64> {
        if !self.is_watching() {
            self.renderer.set_label(WatchLabel::Idle);
            return None;
        }
        let generation = self.scheduler.start_generation();
        self.phase = Phase::Polling;
        self.renderer.set_label(WatchLabel::Watching);
        tracing::info!(path = %self.path, generation, "watch resumed");
        Some(generation)
    }

    /// Turn watching off and cancel every pending timer
    pub fn deactivate(&mut self) -> Result<()> {
        self.store.set_state(&self.path, WatchPatch::watching(false))?;
        self.scheduler.cancel_all();
        self.phase = Phase::Idle;
        self.renderer.set_label(WatchLabel::Idle);
        tracing::info!(path = %self.path, "watch stopped");
        Ok(())
    }

    /// Flip the watch; returns the new generation when watching started
    pub fn toggle(&mut self) -> Result<Option<u64>> {
        if self.is_watching() {
            self.deactivate()?;
            Ok(None)
        } else {
            let visible = self.visible_html.clone();
            self.activate(visible.as_deref()).map(Some)
        }
    }

    fn guard(&self, generation: u64) -> bool {
        self.scheduler.is_current(generation) && self.is_watching()
    }

    /// First half of a cycle: returns the fetch to perform, or None when stale
    pub fn begin_cycle(&mut self, generation: u64) -> Option<CycleRequest> {
        if !self.guard(generation) {
            tracing::debug!(generation, "cycle cancelled before fetch");
            return None;
        }
        self.phase = Phase::Polling;
        self.renderer.set_label(WatchLabel::Watching);
        Some(CycleRequest { generation, url: self.url.to_string() })
    }

    /// Second half of a cycle: reconcile the fetched page and reschedule
    pub fn complete_cycle(
        &mut self,
        generation: u64,
        fetched: Result<String>,
        now: Instant,
    ) -> CycleOutcome {
        if !self.guard(generation) {
            tracing::debug!(generation, "stale fetch result discarded");
            return CycleOutcome::Cancelled;
        }

        let mut report = CycleReport::default();
        match fetched {
            Ok(html) => self.reconcile_page(&html, &mut report),
            Err(e) => {
                tracing::warn!(url = %self.url, error = %e, "fetch failed, retrying next cycle");
                report.fetch_failed = true;
            }
        }

        if self.guard(generation) && self.scheduler.schedule_poll(generation, self.interval, now) {
            self.phase = Phase::Scheduled;
            let label = self.current_label();
            self.renderer.set_label(label);
            report.rescheduled = true;
        } else {
            self.phase = Phase::Idle;
        }

        CycleOutcome::Finished(report)
    }

    fn reconcile_page(&mut self, html: &str, report: &mut CycleReport) {
        let Some(page) = scrape_page(self.adapter.as_ref(), html, Some(&self.url)) else {
            tracing::debug!(url = %self.url, "no tag section on fetched page");
            report.section_missing = true;
            return;
        };

        self.renderer.replace_tag_list(&page.tags);
        self.visible_html = Some(html.to_string());

        // re-read: the pre-fetch copy may be stale
        let mut seen = self.store.get_state(&self.path).seen;
        let plan = reconcile(&seen, &page.tags);
        let project = page.project.as_deref().unwrap_or(UNKNOWN_PROJECT);

        for tag in plan.fresh {
            let notification = Notification::for_tag(project, tag, self.url.as_str());
            if let Err(e) = self.sink.notify(&notification) {
                tracing::warn!(tag = %tag.name, error = %e, "notification not delivered");
            }
            tracing::info!(tag = %tag.name, percent = tag.percent_display(), "new result");
            report.notified.push(tag.name.clone());

            seen.insert(tag.name.clone());
            let mut patch = WatchPatch::seen(seen.clone());
            if tag.is_perfect() {
                patch.watching = Some(false);
            }
            if let Err(e) = self.store.set_state(&self.path, patch) {
                tracing::error!(error = %e, "could not persist watch state");
            }
        }

        if plan.perfect {
            self.scheduler.cancel_all();
            self.phase = Phase::Idle;
            self.renderer.set_label(WatchLabel::Idle);
            report.stopped = true;
            tracing::info!(path = %self.path, "perfect score, watch finished");
        }
    }

    /// Handle one due timer; a poll timer yields the next fetch
    pub fn on_timer(&mut self, timer: Timer) -> Option<CycleRequest> {
        match timer {
            Timer::Tick { generation, remaining } => {
                if self.guard(generation) {
                    self.renderer.set_label(WatchLabel::Countdown(remaining));
                }
                None
            }
            Timer::Poll { generation } => self.begin_cycle(generation),
        }
    }

    /// Fire every timer due at `now`
    pub fn poll_due(&mut self, now: Instant) -> Vec<CycleRequest> {
        self.scheduler
            .due(now)
            .into_iter()
            .filter_map(|timer| self.on_timer(timer))
            .collect()
    }

    /// Run a whole cycle with a blocking fetch
    pub fn run_cycle(
        &mut self,
        generation: u64,
        fetcher: &dyn PageFetcher,
        now: Instant,
    ) -> CycleOutcome {
        match self.begin_cycle(generation) {
            Some(request) => {
                let fetched = fetcher.fetch_html(&request.url);
                self.complete_cycle(generation, fetched, now)
            }
            None => CycleOutcome::Cancelled,
        }
    }

    fn current_label(&self) -> WatchLabel {
        match self.scheduler.remaining() {
            _ if !self.is_watching() => WatchLabel::Idle,
            Some(secs) => WatchLabel::Countdown(secs),
            None => WatchLabel::Watching,
        }
    }
}
