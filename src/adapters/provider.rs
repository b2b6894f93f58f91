//! Upstream period provider client
//!
//! The provider answers `GET {url}&expect={period}&_t={millis}` with
//! `{"data": {"curr_expect": ..., "matchList": [...]}}`. An empty `expect`
//! asks for the period currently on sale.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ProviderConfig;
use crate::error::{PoolcastError, Result};

/// Matches per period on the 14-match ticket
pub const MATCHES_PER_PERIOD: usize = 14;

/// Source of the "currently on sale" period token
#[async_trait]
pub trait PeriodSource: Send + Sync {
    /// Current period token, or `None` on any failure
    async fn fetch_current_period(&self) -> Option<String>;
}

/// Source returning a fixed token; used for manual overrides
#[derive(Debug, Clone, Default)]
pub struct FixedPeriodSource(pub Option<String>);

#[async_trait]
impl PeriodSource for FixedPeriodSource {
    async fn fetch_current_period(&self) -> Option<String> {
        self.0.clone()
    }
}

/// One match on a period's ticket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListedMatch {
    /// 1-based position on the ticket
    pub order: usize,
    pub match_id: String,
    pub league: String,
    pub home_team: String,
    pub home_rank: String,
    pub away_team: String,
    pub away_rank: String,
    pub kickoff: String,
}

/// Period token plus its match listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodListing {
    pub period: String,
    pub matches: Vec<ListedMatch>,
}

// ── Provider JSON deserialization structs ───────────────────────

#[derive(Debug, Default, Deserialize)]
struct ProviderResponse {
    #[serde(default)]
    data: Option<ProviderData>,
}

#[derive(Debug, Default, Deserialize)]
struct ProviderData {
    #[serde(default)]
    period: Option<Value>,
    #[serde(default)]
    curr_expect: Option<Value>,
    #[serde(default)]
    expect: Option<Value>,
    #[serde(rename = "matchList", default)]
    match_list: Vec<ProviderMatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ProviderMatch {
    #[serde(default)]
    fid: Option<Value>,
    #[serde(default)]
    simpleleague: Option<String>,
    #[serde(default)]
    homesxname: Option<String>,
    #[serde(default)]
    homestanding: Option<Value>,
    #[serde(default)]
    awaysxname: Option<String>,
    #[serde(default)]
    awaystanding: Option<Value>,
    #[serde(default)]
    matchtime: Option<String>,
}

fn value_token(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn current_period_from(resp: &ProviderResponse) -> Option<String> {
    value_token(resp.data.as_ref()?.curr_expect.as_ref())
}

fn listing_from(resp: ProviderResponse) -> Option<PeriodListing> {
    let data = resp.data?;
    let period = value_token(data.period.as_ref())
        .or_else(|| value_token(data.curr_expect.as_ref()))
        .or_else(|| value_token(data.expect.as_ref()))?;

    let matches = data
        .match_list
        .into_iter()
        .take(MATCHES_PER_PERIOD)
        .enumerate()
        .filter_map(|(idx, m)| {
            let home_team = m.homesxname.filter(|s| !s.is_empty())?;
            let away_team = m.awaysxname.filter(|s| !s.is_empty())?;
            Some(ListedMatch {
                order: idx + 1,
                match_id: value_token(m.fid.as_ref()).unwrap_or_default(),
                league: m.simpleleague.unwrap_or_default(),
                home_team,
                home_rank: value_token(m.homestanding.as_ref()).unwrap_or_default(),
                away_team,
                away_rank: value_token(m.awaystanding.as_ref()).unwrap_or_default(),
                kickoff: m.matchtime.unwrap_or_default(),
            })
        })
        .collect();

    Some(PeriodListing { period, matches })
}

fn request_url(base: &str, expect: &str, millis: i64) -> String {
    let sep = if base.contains('?') { '&' } else { '?' };
    format!("{base}{sep}expect={expect}&_t={millis}")
}

// ── Client ──────────────────────────────────────────────────────

/// HTTP client for the provider. TLS verification is configured per client.
pub struct HttpPeriodSource {
    http: reqwest::Client,
    base_url: String,
}

impl HttpPeriodSource {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json, text/javascript, */*; q=0.01"),
        );
        if let Some(referer) = config.referer.as_deref() {
            let value = reqwest::header::HeaderValue::from_str(referer)
                .map_err(|e| PoolcastError::Validation(format!("invalid referer: {e}")))?;
            headers.insert(reqwest::header::REFERER, value);
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;

        Ok(Self {
            http,
            base_url: config.url.clone(),
        })
    }

    async fn get(&self, expect: &str) -> Result<ProviderResponse> {
        let url = request_url(&self.base_url, expect, chrono::Utc::now().timestamp_millis());
        debug!(%url, "requesting provider");

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| PoolcastError::TransientFetch(format!("request failed: {e}")))?
            .error_for_status()
            .map_err(|e| PoolcastError::TransientFetch(format!("bad status: {e}")))?;

        resp.json::<ProviderResponse>()
            .await
            .map_err(|e| PoolcastError::TransientFetch(format!("decode failed: {e}")))
    }

    /// Period token and ticket listing for `period` (current period when `None`)
    pub async fn fetch_period_listing(&self, period: Option<&str>) -> Result<PeriodListing> {
        let expect = match period {
            Some(p) => p.to_string(),
            None => self.fetch_current_period().await.ok_or_else(|| {
                PoolcastError::TransientFetch("no period currently on sale".into())
            })?,
        };

        let resp = self.get(&expect).await?;
        let listing = listing_from(resp).ok_or_else(|| {
            PoolcastError::InvalidDocument(format!("provider returned no period for {expect}"))
        })?;
        debug!(period = %listing.period, matches = listing.matches.len(), "fetched listing");
        Ok(listing)
    }
}

#[async_trait]
impl PeriodSource for HttpPeriodSource {
    async fn fetch_current_period(&self) -> Option<String> {
        match self.get("").await {
            Ok(resp) => {
                let period = current_period_from(&resp);
                if period.is_none() {
                    warn!("provider response has no curr_expect");
                }
                period
            }
            Err(e) => {
                warn!(error = %e, "failed to fetch current period");
                None
            }
        }
    }
}
