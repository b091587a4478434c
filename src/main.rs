// Main entry point - Dependency injection and the headless dashboard session
use std::sync::Arc;

use amper_tracker::application::amper_api::AmperApi;
use amper_tracker::application::auto_refresh::AutoRefreshHandle;
use amper_tracker::application::catalog_service::ProductCatalogService;
use amper_tracker::application::dashboard_controller::DashboardController;
use amper_tracker::application::sign_in_service::SignInService;
use amper_tracker::domain::product::Selection;
use amper_tracker::infrastructure::config::load_app_config;
use amper_tracker::infrastructure::http_api::HttpAmperApi;
use amper_tracker::infrastructure::store::FileStore;
use amper_tracker::presentation::dashboard_view::render;
use anyhow::Context;
use chrono::Utc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = load_app_config()?;
    tracing::info!("Using backend {}", config.api.base_url);

    // Create API client and local store (infrastructure layer)
    let api: Arc<dyn AmperApi> =
        Arc::new(HttpAmperApi::new(config.api.base_url.clone(), config.api.timeout())?);
    let store = FileStore::new(config.storage.path.clone());

    // Create services (application layer)
    let sign_in = SignInService::new(api.clone(), store.clone());
    let catalog = ProductCatalogService::new(api.clone());

    let username = match config.session.username.as_deref() {
        Some(raw) => sign_in.sign_in(raw).await?,
        None => sign_in
            .restore()
            .await
            .context("No stored username; set session.username in config/app.toml")?,
    };

    let product = match config.session.product_id.as_deref() {
        Some(id) => catalog
            .find_product(id)
            .await?
            .with_context(|| format!("Unknown product {}", id))?,
        None => catalog
            .list_products()
            .await?
            .into_iter()
            .next()
            .context("Backend has no products")?,
    };
    let sensor = catalog
        .resolve_sensor(&product, config.session.sensor.as_deref())
        .with_context(|| format!("Product {} has no sensors", product.name))?
        .to_string();

    match catalog.list_users(&product.id, Some(&sensor)).await {
        Ok(users) => tracing::info!(
            "{} on {}: {} users with readings",
            product.name,
            sensor,
            users.len()
        ),
        Err(e) => tracing::warn!("Could not load users for {}: {}", product.name, e),
    }

    let selection = Selection::new(product.id.clone(), username, sensor, config.session.time_range);
    let controller = Arc::new(DashboardController::new(api, selection));

    // Print every published snapshot (presentation layer)
    let mut updates = controller.subscribe();
    let renderer_store = store.clone();
    let renderer = tokio::spawn(async move {
        let mut last_synced = None;
        while updates.changed().await.is_ok() {
            let state = updates.borrow_and_update().clone();
            for line in render(&state, Utc::now()) {
                tracing::info!("{}", line);
            }

            if state.last_synced_at.is_some() && state.last_synced_at != last_synced {
                last_synced = state.last_synced_at;
                if let Some(synced) = last_synced {
                    if let Err(e) = renderer_store.save_last_sync(&synced.to_rfc3339()).await {
                        tracing::warn!("Could not record last sync: {:#}", e);
                    }
                }
            }
        }
    });

    controller.load().await;

    let preferences = store.get_preferences().await;
    let auto_refresh = preferences
        .refresh_period()
        .map(|period| AutoRefreshHandle::spawn(controller.clone(), period));

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");

    if let Some(handle) = auto_refresh {
        handle.cancel();
    }
    renderer.abort();

    Ok(())
}
