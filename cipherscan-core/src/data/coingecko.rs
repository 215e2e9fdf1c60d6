//! CoinGecko markets endpoint as a universe metadata source.
//!
//! Pages through `/coins/markets?vs_currency=usd&order=market_cap_desc` (250
//! coins per page). A demo API key, when configured, goes in the
//! `x-cg-demo-api-key` header.

use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::circuit_breaker::CircuitBreaker;
use super::http::HttpClient;
use super::provider::{MarketMetadataSource, ProviderError};
use super::universe::UniverseEntry;

pub const DEFAULT_BASE_URL: &str = "https://api.coingecko.com/api/v3";

const PER_PAGE: usize = 250;

#[derive(Debug, Clone, Deserialize)]
pub struct MarketRow {
    pub symbol: String,
    pub market_cap: Option<f64>,
    pub total_volume: Option<f64>,
}

impl From<MarketRow> for UniverseEntry {
    fn from(row: MarketRow) -> Self {
        UniverseEntry::new(
            row.symbol.to_ascii_uppercase(),
            row.market_cap.unwrap_or(f64::NAN),
            row.total_volume.unwrap_or(f64::NAN),
        )
    }
}

pub struct CoinGeckoSource {
    http: HttpClient,
    base_url: String,
    api_key: Option<String>,
    pages: usize,
    page_delay: Duration,
}

impl CoinGeckoSource {
    pub fn new(circuit_breaker: Arc<CircuitBreaker>) -> Result<Self, ProviderError> {
        Ok(Self {
            http: HttpClient::new(circuit_breaker)?,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            pages: 6,
            page_delay: Duration::from_secs(2),
        })
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.is_empty());
        self
    }

    pub fn with_pages(mut self, pages: usize) -> Self {
        self.pages = pages.max(1);
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

impl MarketMetadataSource for CoinGeckoSource {
    fn name(&self) -> &str {
        "coingecko"
    }

    fn fetch_universe(&self) -> Result<Vec<UniverseEntry>, ProviderError> {
        let url = format!("{}/coins/markets", self.base_url);
        let headers: Vec<(&str, String)> = self
            .api_key
            .iter()
            .map(|k| ("x-cg-demo-api-key", k.clone()))
            .collect();
        let mut entries = Vec::new();

        for page in 1..=self.pages {
            if page > 1 {
                std::thread::sleep(self.page_delay);
            }
            let query = [
                ("vs_currency", "usd".to_string()),
                ("order", "market_cap_desc".to_string()),
                ("per_page", PER_PAGE.to_string()),
                ("page", page.to_string()),
                ("sparkline", "false".to_string()),
            ];
            let rows: Vec<MarketRow> =
                match self.http.get_json(&url, &query, &headers, &format!("markets page {page}")) {
                    Ok(rows) => rows,
                    // Keep what earlier pages returned.
                    Err(e) if !entries.is_empty() => {
                        warn!(page, error = %e, "stopping market pagination early");
                        break;
                    }
                    Err(e) => return Err(e),
                };
            let last_page = rows.len() < PER_PAGE;
            debug!(page, coins = rows.len(), "fetched market page");
            entries.extend(rows.into_iter().map(UniverseEntry::from));
            if last_page {
                break;
            }
        }

        Ok(entries)
    }
}
