// Catalog service - Products, their sensors and user rosters
use crate::application::amper_api::{AmperApi, FetchError};
use crate::domain::product::{Product, UserSummary};
use std::sync::Arc;

#[derive(Clone)]
pub struct ProductCatalogService {
    api: Arc<dyn AmperApi>,
}

impl ProductCatalogService {
    pub fn new(api: Arc<dyn AmperApi>) -> Self {
        Self { api }
    }

    pub async fn list_products(&self) -> Result<Vec<Product>, FetchError> {
        self.api.list_products().await
    }

    pub async fn find_product(&self, product_id: &str) -> Result<Option<Product>, FetchError> {
        let products = self.list_products().await?;
        Ok(products.into_iter().find(|p| p.id == product_id))
    }

    /// Users of a product, optionally only those with readings on `sensor`,
    /// sorted by username ignoring case.
    pub async fn list_users(
        &self,
        product_id: &str,
        sensor: Option<&str>,
    ) -> Result<Vec<UserSummary>, FetchError> {
        let mut users = match sensor {
            Some(sensor) => self.api.list_sensor_users(product_id, sensor).await?,
            None => self.api.list_product_users(product_id).await?,
        };
        users.sort_by_cached_key(|u| u.username.to_lowercase());
        Ok(users)
    }

    /// The preferred sensor when the product has it, otherwise its first one.
    pub fn resolve_sensor<'a>(&self, product: &'a Product, preferred: Option<&str>) -> Option<&'a str> {
        preferred
            .and_then(|wanted| product.sensors.iter().find(|s| s.as_str() == wanted))
            .or_else(|| product.sensors.first())
            .map(String::as_str)
    }
}
