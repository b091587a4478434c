// In-memory AmperApi for service and controller tests
use crate::application::amper_api::{AmperApi, FetchError};
use crate::domain::product::{Product, Selection, UserSummary};
use crate::domain::reading::{PaginationMeta, Reading, ReadingPage};
use crate::domain::stats::{aggregate, UserStats};
use crate::domain::time_range::TimeRange;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Holds a readings call open until released.
#[derive(Default)]
pub struct Gate {
    entered: Notify,
    release: Notify,
}

impl Gate {
    pub async fn wait_entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.release.notify_one();
    }
}

struct Dataset {
    values: Vec<f64>,
    total: u64,
}

#[derive(Default)]
pub struct FakeApi {
    default_set: Mutex<Option<Dataset>>,
    per_range: Mutex<HashMap<TimeRange, Dataset>>,
    hold: Mutex<Option<(Option<TimeRange>, Arc<Gate>)>>,
    clamp_to: Mutex<Option<u32>>,
    last_request: Mutex<Option<(TimeRange, u32, u32)>>,
    products: Mutex<Vec<Product>>,
    users: Mutex<Vec<UserSummary>>,
    page_calls: AtomicUsize,
    stats_calls: AtomicUsize,
    fail_stats: AtomicBool,
    fail_pages: AtomicBool,
    unhealthy: AtomicBool,
}

impl FakeApi {
    pub fn with_values(values: &[f64], total: u64) -> Self {
        let api = Self::default();
        *api.default_set.lock().unwrap() = Some(Dataset { values: values.to_vec(), total });
        api
    }

    pub fn set_values_for(&self, range: TimeRange, values: &[f64], total: u64) {
        self.per_range
            .lock()
            .unwrap()
            .insert(range, Dataset { values: values.to_vec(), total });
    }

    /// Block the next readings call (optionally only one for `range`).
    pub fn hold_next_page(&self, range: Option<TimeRange>) -> Arc<Gate> {
        let gate = Arc::new(Gate::default());
        *self.hold.lock().unwrap() = Some((range, gate.clone()));
        gate
    }

    pub fn clamp_pages_to(&self, page: u32) {
        *self.clamp_to.lock().unwrap() = Some(page);
    }

    pub fn fail_stats(&self) {
        self.fail_stats.store(true, Ordering::SeqCst);
    }

    pub fn set_fail_pages(&self, fail: bool) {
        self.fail_pages.store(fail, Ordering::SeqCst);
    }

    pub fn set_unhealthy(&self) {
        self.unhealthy.store(true, Ordering::SeqCst);
    }

    pub fn set_products(&self, products: Vec<Product>) {
        *self.products.lock().unwrap() = products;
    }

    pub fn set_users(&self, users: Vec<UserSummary>) {
        *self.users.lock().unwrap() = users;
    }

    pub fn page_calls(&self) -> usize {
        self.page_calls.load(Ordering::SeqCst)
    }

    pub fn stats_calls(&self) -> usize {
        self.stats_calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<(TimeRange, u32, u32)> {
        *self.last_request.lock().unwrap()
    }

    fn dataset(&self, range: TimeRange) -> (Vec<f64>, u64) {
        if let Some(set) = self.per_range.lock().unwrap().get(&range) {
            return (set.values.clone(), set.total);
        }
        self.default_set
            .lock()
            .unwrap()
            .as_ref()
            .map(|set| (set.values.clone(), set.total))
            .unwrap_or_default()
    }

    fn take_gate(&self, range: TimeRange) -> Option<Arc<Gate>> {
        let mut hold = self.hold.lock().unwrap();
        match hold.as_ref() {
            Some((None, _)) => hold.take().map(|(_, gate)| gate),
            Some((Some(held), _)) if *held == range => hold.take().map(|(_, gate)| gate),
            _ => None,
        }
    }
}

fn server_error() -> FetchError {
    FetchError::Server { status: Some(500), message: "Internal Server Error".to_string() }
}

#[async_trait]
impl AmperApi for FakeApi {
    async fn health_check(&self) -> Result<(), FetchError> {
        if self.unhealthy.load(Ordering::SeqCst) {
            return Err(FetchError::Network("connection refused".to_string()));
        }
        Ok(())
    }

    async fn list_products(&self) -> Result<Vec<Product>, FetchError> {
        Ok(self.products.lock().unwrap().clone())
    }

    async fn list_product_users(&self, _product_id: &str) -> Result<Vec<UserSummary>, FetchError> {
        Ok(self.users.lock().unwrap().clone())
    }

    async fn list_sensor_users(
        &self,
        _product_id: &str,
        _sensor: &str,
    ) -> Result<Vec<UserSummary>, FetchError> {
        Ok(self.users.lock().unwrap().clone())
    }

    async fn get_readings(
        &self,
        selection: &Selection,
        page: u32,
        limit: u32,
    ) -> Result<ReadingPage, FetchError> {
        self.page_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some((selection.time_range, page, limit));

        if let Some(gate) = self.take_gate(selection.time_range) {
            gate.entered.notify_one();
            gate.release.notified().await;
        }

        if self.fail_pages.load(Ordering::SeqCst) {
            return Err(server_error());
        }

        let (values, total) = self.dataset(selection.time_range);
        let readings = values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                Reading::new(format!("{}-{i}", selection.time_range), &selection.username, *v)
            })
            .collect();
        let pages = total.div_ceil(u64::from(limit)) as u32;
        let page = self.clamp_to.lock().unwrap().unwrap_or(page);

        Ok(ReadingPage {
            readings,
            pagination: PaginationMeta { page, limit, total, pages },
        })
    }

    async fn get_stats(&self, selection: &Selection) -> Result<UserStats, FetchError> {
        self.stats_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_stats.load(Ordering::SeqCst) {
            return Err(server_error());
        }

        let (values, _) = self.dataset(selection.time_range);
        let readings: Vec<Reading> = values
            .iter()
            .map(|v| Reading::new("stat", &selection.username, *v))
            .collect();
        aggregate(&readings, None)
            .map(|stats| stats.stats().clone())
            .map_err(|e| FetchError::Parse(e.to_string()))
    }
}
