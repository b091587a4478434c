// Application layer - Use cases over the readings API
pub mod amper_api;
pub mod auto_refresh;
pub mod catalog_service;
pub mod dashboard_controller;
pub mod reading_fetcher;
pub mod sign_in_service;

#[cfg(test)]
pub(crate) mod test_support;
