// Dashboard controller - Fetch cycles, statistics fallback and stale result handling
use crate::application::amper_api::{AmperApi, FetchError};
use crate::application::reading_fetcher::{ReadingFetcher, DEFAULT_PAGE_SIZE};
use crate::domain::product::Selection;
use crate::domain::reading::{PaginationMeta, Reading, ReadingPage};
use crate::domain::stats::{aggregate, Statistics, UserStats};
use crate::domain::time_range::TimeRange;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// What started a fetch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Mount,
    PullToRefresh,
    PageChange,
    SelectionChange,
    Retry,
    AutoRefresh,
}

impl Trigger {
    fn shows_spinner(&self) -> bool {
        matches!(
            self,
            Trigger::Mount | Trigger::PageChange | Trigger::SelectionChange | Trigger::Retry
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Readings were replaced.
    Completed { estimated_stats: bool },
    /// The page request failed; previous readings were kept.
    PageFailed(FetchError),
    /// A newer cycle started before this one finished; nothing was applied.
    Discarded,
    /// Another cycle was in flight (timer ticks only).
    Skipped,
}

/// A failed page fetch waiting for the user to retry or dismiss.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryAlert {
    pub page: u32,
    pub error: FetchError,
}

#[derive(Debug, Clone)]
pub struct DashboardState {
    pub selection: Selection,
    pub readings: Vec<Reading>,
    pub pagination: Option<PaginationMeta>,
    pub statistics: Option<Statistics>,
    pub current_page: u32,
    pub is_loading: bool,
    pub is_refreshing: bool,
    /// Inline banner, kept until the next cycle starts.
    pub error: Option<String>,
    pub retry_alert: Option<RetryAlert>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub generation: u64,
}

impl DashboardState {
    fn new(selection: Selection) -> Self {
        Self {
            selection,
            readings: Vec::new(),
            pagination: None,
            statistics: None,
            current_page: 1,
            is_loading: false,
            is_refreshing: false,
            error: None,
            retry_alert: None,
            last_synced_at: None,
            generation: 0,
        }
    }

    fn invalidate(&mut self) {
        self.readings.clear();
        self.pagination = None;
        self.statistics = None;
        self.current_page = 1;
    }
}

enum SelectionChange {
    TimeRange(TimeRange),
    Sensor(String),
}

struct CycleTicket {
    generation: u64,
    selection: Selection,
    page: u32,
}

/// Decrements the in-flight counter when a cycle ends, however it ends.
struct InFlightGuard<'a>(&'a AtomicUsize);

impl<'a> InFlightGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(counter)
    }

    fn enter_if_idle(counter: &'a AtomicUsize) -> Option<Self> {
        counter
            .compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(counter))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

pub struct DashboardController {
    fetcher: ReadingFetcher,
    page_size: u32,
    state: watch::Sender<DashboardState>,
    in_flight: AtomicUsize,
}

impl DashboardController {
    pub fn new(api: Arc<dyn AmperApi>, selection: Selection) -> Self {
        Self {
            fetcher: ReadingFetcher::new(api),
            page_size: DEFAULT_PAGE_SIZE,
            state: watch::Sender::new(DashboardState::new(selection)),
            in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn state(&self) -> DashboardState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DashboardState> {
        self.state.subscribe()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire) > 0
    }

    /// First load of a session, page 1 with the spinner.
    pub async fn load(&self) -> CycleOutcome {
        self.run_cycle(Trigger::Mount, Some(1), None).await
    }

    /// Pull-to-refresh of the current page.
    pub async fn refresh(&self) -> CycleOutcome {
        self.run_cycle(Trigger::PullToRefresh, None, None).await
    }

    pub async fn change_page(&self, page: u32) -> CycleOutcome {
        self.run_cycle(Trigger::PageChange, Some(page), None).await
    }

    pub async fn set_time_range(&self, time_range: TimeRange) -> CycleOutcome {
        self.run_cycle(
            Trigger::SelectionChange,
            Some(1),
            Some(SelectionChange::TimeRange(time_range)),
        )
        .await
    }

    pub async fn set_sensor(&self, sensor: impl Into<String>) -> CycleOutcome {
        self.run_cycle(
            Trigger::SelectionChange,
            Some(1),
            Some(SelectionChange::Sensor(sensor.into())),
        )
        .await
    }

    /// Re-run the cycle that raised the pending alert.
    pub async fn retry(&self) -> CycleOutcome {
        let page = {
            let state = self.state.borrow();
            state
                .retry_alert
                .as_ref()
                .map_or(state.current_page, |alert| alert.page)
        };
        self.run_cycle(Trigger::Retry, Some(page), None).await
    }

    /// Close the alert; stale readings and the error banner stay.
    pub fn dismiss_alert(&self) {
        self.state.send_if_modified(|state| state.retry_alert.take().is_some());
    }

    /// Timer tick. A no-op while any other cycle is in flight.
    pub async fn tick(&self) -> CycleOutcome {
        self.run_cycle(Trigger::AutoRefresh, None, None).await
    }

    async fn run_cycle(
        &self,
        trigger: Trigger,
        page: Option<u32>,
        change: Option<SelectionChange>,
    ) -> CycleOutcome {
        let _guard = if trigger == Trigger::AutoRefresh {
            match InFlightGuard::enter_if_idle(&self.in_flight) {
                Some(guard) => guard,
                None => {
                    tracing::debug!("Skipping auto refresh, a fetch is already in flight");
                    return CycleOutcome::Skipped;
                }
            }
        } else {
            InFlightGuard::enter(&self.in_flight)
        };

        let ticket = self.begin(trigger, page, change);
        tracing::debug!(
            "Fetch cycle {} ({:?}) for page {} of {} [{}]",
            ticket.generation,
            trigger,
            ticket.page,
            ticket.selection.username,
            ticket.selection.time_range
        );

        let (stats_result, page_result) = futures::join!(
            self.fetcher.fetch_stats(&ticket.selection),
            self.fetcher.fetch_page(&ticket.selection, ticket.page, self.page_size)
        );

        let statistics = reconcile_statistics(stats_result, &page_result);
        let outcome = match &page_result {
            Ok(_) => CycleOutcome::Completed {
                estimated_stats: statistics.as_ref().is_some_and(Statistics::is_estimated),
            },
            Err(e) => {
                tracing::error!("Failed to fetch readings page {}: {}", ticket.page, e);
                CycleOutcome::PageFailed(e.clone())
            }
        };

        let applied = self.state.send_if_modified(|state| {
            if state.generation != ticket.generation {
                return false;
            }

            state.is_loading = false;
            state.is_refreshing = false;
            if let Some(statistics) = statistics {
                state.statistics = Some(statistics);
            }

            match page_result {
                Ok(ReadingPage { readings, mut pagination }) => {
                    if !(1..=pagination.pages.max(1)).contains(&pagination.page) {
                        tracing::warn!(
                            "Server returned page {} of {}, keeping requested page {}",
                            pagination.page,
                            pagination.pages,
                            ticket.page
                        );
                        pagination.page = ticket.page;
                    }
                    state.readings = readings;
                    state.current_page = pagination.page;
                    state.pagination = Some(pagination);
                    state.last_synced_at = Some(Utc::now());
                }
                Err(error) => {
                    state.error = Some(error.to_string());
                    state.retry_alert = Some(RetryAlert { page: ticket.page, error });
                }
            }
            true
        });

        if applied {
            outcome
        } else {
            tracing::debug!("Discarding stale fetch cycle {}", ticket.generation);
            CycleOutcome::Discarded
        }
    }

    /// Claim a new generation and mark the state as loading.
    fn begin(&self, trigger: Trigger, page: Option<u32>, change: Option<SelectionChange>) -> CycleTicket {
        let mut ticket = CycleTicket {
            generation: 0,
            selection: self.state.borrow().selection.clone(),
            page: 1,
        };
        self.state.send_modify(|state| {
            if let Some(change) = change {
                match change {
                    SelectionChange::TimeRange(range) => state.selection.time_range = range,
                    SelectionChange::Sensor(sensor) => state.selection.sensor = sensor,
                }
                state.invalidate();
            }

            state.generation += 1;
            state.error = None;
            state.retry_alert = None;
            if trigger == Trigger::PullToRefresh {
                state.is_refreshing = true;
            } else if trigger.shows_spinner() {
                state.is_loading = true;
            }

            ticket = CycleTicket {
                generation: state.generation,
                selection: state.selection.clone(),
                page: page.unwrap_or(state.current_page),
            };
        });
        ticket
    }
}

/// Exact stats when the endpoint answered, otherwise an estimate from the page.
fn reconcile_statistics(
    stats_result: Result<UserStats, FetchError>,
    page_result: &Result<ReadingPage, FetchError>,
) -> Option<Statistics> {
    match (stats_result, page_result) {
        (Ok(stats), _) => Some(Statistics::Exact(stats)),
        (Err(_), Ok(page)) => {
            let total = i64::try_from(page.pagination.total).unwrap_or(i64::MAX);
            let statistics = aggregate(&page.readings, Some(total))
                .or_else(|e| {
                    tracing::warn!("Ignoring server total for the estimate: {}", e);
                    aggregate(&page.readings, None)
                        .map(|sample| Statistics::Estimated(sample.stats().clone()))
                })
                .ok()?;
            tracing::warn!(
                "Using estimated statistics from {} of {} readings",
                page.readings.len(),
                statistics.stats().total_readings
            );
            Some(statistics)
        }
        (Err(_), Err(_)) => None,
    }
}
