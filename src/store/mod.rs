mod demo;
mod error;
mod rows;
mod session;

pub use demo::{demo_recommendations, RecommendationSet};
pub use error::{Result, StoreError};
pub use rows::{NewWatchlist, Profile, SavedAnalysis, Watchlist, WatchlistStock};
pub use session::Session;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::Config;
use crate::core::TechnicalAnalysis;
use crate::models::StockRecommendation;

const RECOMMENDATIONS: &str = "stock_recommendations";
const WATCHLISTS: &str = "watchlists";
const WATCHLIST_STOCKS: &str = "watchlist_stocks";
const PROFILES: &str = "profiles";
const SAVED_ANALYSIS: &str = "saved_analysis";

type Query = Vec<(&'static str, String)>;

/// Maps a non-success status to the matching error.
pub fn check_status(status: StatusCode, body: &str) -> Result<()> {
    if status.is_success() {
        return Ok(());
    }
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(StoreError::Unauthorized(status.as_u16()))
        }
        _ => Err(StoreError::Api {
            status: status.as_u16(),
            body: body.to_string(),
        }),
    }
}

pub fn decode_rows<T: DeserializeOwned>(table: &str, body: &str) -> Result<Vec<T>> {
    serde_json::from_str(body).map_err(|e| StoreError::Decode {
        table: table.to_string(),
        reason: e.to_string(),
    })
}

fn eq(value: &str) -> String {
    format!("eq.{}", value)
}

pub fn recommendation_query(symbol: Option<&str>) -> Query {
    let mut q = vec![("select", "*".to_string()), ("order", "created_at.desc".to_string())];
    if let Some(s) = symbol {
        q.push(("symbol", eq(&s.to_ascii_uppercase())));
    }
    q
}

/// PostgREST client for the managed store.
#[derive(Clone)]
pub struct StoreClient {
    client: Client,
    base_url: String,
    anon_key: String,
    access_token: Option<String>,
}

impl StoreClient {
    pub fn new(cfg: &Config) -> Result<Self> {
        if !cfg.has_store() {
            return Err(StoreError::NotConfigured);
        }
        Ok(Self {
            client: Client::new(),
            base_url: cfg.store_url.clone(),
            anon_key: cfg.store_anon_key.clone(),
            access_token: None,
        })
    }

    /// Sends the user's token instead of the anon key as bearer.
    pub fn with_session(mut self, session: &Session) -> Self {
        self.access_token = Some(session.access_token.clone());
        self
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        let bearer = self.access_token.as_deref().unwrap_or(&self.anon_key);
        req.header("apikey", &self.anon_key).bearer_auth(bearer)
    }

    async fn send(&self, req: RequestBuilder) -> Result<String> {
        let resp = self.authed(req).send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        check_status(status, &body)?;
        Ok(body)
    }

    async fn select<T: DeserializeOwned>(&self, table: &str, query: &Query) -> Result<Vec<T>> {
        debug!("Store select {} {:?}", table, query);
        let body = self
            .send(self.client.get(self.table_url(table)).query(query))
            .await?;
        decode_rows(table, &body)
    }

    async fn insert<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        table: &str,
        row: &B,
        on_conflict: Option<&str>,
    ) -> Result<T> {
        let mut req = self.client.post(self.table_url(table)).json(row);
        let prefer = match on_conflict {
            Some(cols) => {
                req = req.query(&[("on_conflict", cols)]);
                "return=representation,resolution=merge-duplicates"
            }
            None => "return=representation",
        };
        let body = self.send(req.header("Prefer", prefer)).await?;
        decode_rows::<T>(table, &body)?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Decode {
                table: table.to_string(),
                reason: "no row returned".to_string(),
            })
    }

    async fn delete(&self, table: &str, query: &Query) -> Result<()> {
        self.send(self.client.delete(self.table_url(table)).query(query))
            .await
            .map(|_| ())
    }

    pub async fn recommendations(&self, symbol: Option<&str>) -> Result<Vec<StockRecommendation>> {
        self.select(RECOMMENDATIONS, &recommendation_query(symbol)).await
    }

    pub async fn upsert_recommendation(&self, rec: &StockRecommendation) -> Result<StockRecommendation> {
        rec.validate().map_err(|reason| StoreError::Decode {
            table: RECOMMENDATIONS.to_string(),
            reason,
        })?;
        self.insert(RECOMMENDATIONS, rec, Some("symbol")).await
    }

    pub async fn watchlists(&self, owner: &str) -> Result<Vec<Watchlist>> {
        let q = vec![("select", "*".to_string()), ("user_id", eq(owner))];
        self.select(WATCHLISTS, &q).await
    }

    pub async fn create_watchlist(&self, owner: &str, name: &str) -> Result<Watchlist> {
        let row = NewWatchlist { user_id: owner, name };
        self.insert(WATCHLISTS, &row, None).await
    }

    pub async fn watchlist_stocks(&self, watchlist_id: &str) -> Result<Vec<WatchlistStock>> {
        let q = vec![
            ("select", "*".to_string()),
            ("watchlist_id", eq(watchlist_id)),
            ("order", "added_at.asc".to_string()),
        ];
        self.select(WATCHLIST_STOCKS, &q).await
    }

    pub async fn add_to_watchlist(&self, watchlist_id: &str, symbol: &str) -> Result<WatchlistStock> {
        let row = WatchlistStock {
            id: None,
            watchlist_id: watchlist_id.to_string(),
            symbol: symbol.to_ascii_uppercase(),
            added_at: None,
        };
        self.insert(WATCHLIST_STOCKS, &row, None).await
    }

    pub async fn remove_from_watchlist(&self, watchlist_id: &str, symbol: &str) -> Result<()> {
        let q = vec![
            ("watchlist_id", eq(watchlist_id)),
            ("symbol", eq(&symbol.to_ascii_uppercase())),
        ];
        self.delete(WATCHLIST_STOCKS, &q).await
    }

    pub async fn profile(&self, owner: &str) -> Result<Option<Profile>> {
        let q = vec![("select", "*".to_string()), ("id", eq(owner))];
        Ok(self.select(PROFILES, &q).await?.into_iter().next())
    }

    pub async fn save_analysis(
        &self,
        owner: &str,
        symbol: &str,
        analysis: &TechnicalAnalysis,
    ) -> Result<SavedAnalysis> {
        let row = SavedAnalysis {
            id: None,
            user_id: owner.to_string(),
            symbol: symbol.to_ascii_uppercase(),
            analysis: analysis.clone(),
            created_at: None,
        };
        self.insert(SAVED_ANALYSIS, &row, None).await
    }

    pub async fn saved_analyses(&self, owner: &str) -> Result<Vec<SavedAnalysis>> {
        let q = vec![
            ("select", "*".to_string()),
            ("user_id", eq(owner)),
            ("order", "created_at.desc".to_string()),
        ];
        self.select(SAVED_ANALYSIS, &q).await
    }
}

/// Stored recommendations, or the demo set when there are none to show.
pub async fn recommendations_or_demo(
    store: Option<&StoreClient>,
    symbol: Option<&str>,
) -> RecommendationSet {
    let Some(store) = store else {
        return RecommendationSet::demo(symbol, None);
    };
    match store.recommendations(symbol).await {
        Ok(rows) if rows.is_empty() => RecommendationSet::demo(symbol, None),
        Ok(rows) => RecommendationSet::stored(rows),
        Err(e) => {
            warn!("Recommendations unavailable, showing demo data: {}", e);
            RecommendationSet::demo(symbol, Some(e.to_string()))
        }
    }
}
