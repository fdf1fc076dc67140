use serde::Deserialize;

use crate::error::Result;
use crate::models::Ingredient;

/// Successful lookup response: a nutrition breakdown for a food name.
#[derive(Debug, Clone, Deserialize)]
pub struct ResolvedFood {
    pub food: String,
    pub calories: u32,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    #[serde(default)]
    pub sources: Vec<String>,
}

/// Remote food-name lookup.
///
/// The CLI implements this with reqwest against the cal-track API; tests
/// use canned responses. Failures (network, parse, non-success response)
/// surface as `TrackerError::Resolution` and mark the entry as failed.
#[allow(async_fn_in_trait)]
pub trait FoodResolver {
    async fn resolve(&self, name: &str) -> Result<ResolvedFood>;
}
