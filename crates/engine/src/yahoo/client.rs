use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, REFERER};
use reqwest::{Client, StatusCode};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use url::Url;

use common::{
    Error, Fundamentals, FundamentalsProvider, MarketDataProvider, PriceSeries, Result,
};

use super::payload::{parse_chart, parse_summary};

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko)";
const REFERER_URL: &str = "https://finance.yahoo.com/";
const DEFAULT_COOKIE_URL: &str = "https://fc.yahoo.com";
const SUMMARY_MODULES: &str =
    "summaryDetail,defaultKeyStatistics,financialData,assetProfile,fundProfile";

/// REST client for Yahoo Finance. Serves both daily bars and fundamentals.
///
/// `quoteSummary` needs a session: a cookie from `cookie_url` kept in the
/// client's jar, plus a crumb token sent as a query parameter. The crumb is
/// fetched on first use and cached; a rejected crumb is refreshed once per
/// call.
///
/// One request per call otherwise and no retries; wrap in `Retrying` for
/// the fetch policy.
pub struct YahooClient {
    base_url: Url,
    cookie_url: Url,
    http: Client,
    crumb: Mutex<Option<String>>,
}

impl YahooClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("invalid Yahoo base URL '{base_url}': {e}")))?;
        let cookie_url = parse_cookie_url(DEFAULT_COOKIE_URL)?;

        let mut headers = HeaderMap::new();
        headers.insert(REFERER, HeaderValue::from_static(REFERER_URL));
        let http = Client::builder()
            .use_rustls_tls()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .cookie_store(true)
            .timeout(std::time::Duration::from_secs(20))
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        Ok(Self {
            base_url,
            cookie_url,
            http,
            crumb: Mutex::new(None),
        })
    }

    /// Where session cookies are collected before asking for a crumb.
    pub fn with_cookie_url(mut self, cookie_url: &str) -> Result<Self> {
        self.cookie_url = parse_cookie_url(cookie_url)?;
        Ok(self)
    }

    fn endpoint(&self, path: &str, ticker: &str, query: &[(&str, &str)]) -> Result<Url> {
        let mut url = self
            .base_url
            .join(&format!("{path}/{ticker}"))
            .map_err(|e| Error::Config(format!("bad endpoint for '{ticker}': {e}")))?;
        url.query_pairs_mut().extend_pairs(query);
        Ok(url)
    }

    async fn get(&self, url: Url) -> Result<(StatusCode, String)> {
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| Error::Http(e.to_string()))?;
        Ok((status, body))
    }

    /// The cached crumb, or a fresh one. The lock is held across the fetch
    /// so concurrent callers share one session.
    async fn crumb(&self) -> Result<String> {
        let mut cached = self.crumb.lock().await;
        if let Some(crumb) = cached.as_ref() {
            return Ok(crumb.clone());
        }
        let crumb = self.fetch_crumb().await?;
        debug!("Obtained Yahoo crumb");
        *cached = Some(crumb.clone());
        Ok(crumb)
    }

    /// Drop `stale` from the cache unless another caller already replaced it.
    async fn discard_crumb(&self, stale: &str) {
        let mut cached = self.crumb.lock().await;
        if cached.as_deref() == Some(stale) {
            *cached = None;
        }
    }

    async fn fetch_crumb(&self) -> Result<String> {
        // The cookie endpoint usually answers 404; only its Set-Cookie matters.
        self.http
            .get(self.cookie_url.clone())
            .send()
            .await
            .map_err(|e| Error::Http(format!("cookie request failed: {e}")))?;

        let url = self
            .base_url
            .join("v1/test/getcrumb")
            .map_err(|e| Error::Config(format!("bad crumb endpoint: {e}")))?;
        let (status, body) = self.get(url).await?;

        if status == StatusCode::TOO_MANY_REQUESTS
            || body.to_ascii_lowercase().contains("too many requests")
        {
            return Err(Error::Http("rate limited while fetching crumb".into()));
        }
        if !status.is_success() {
            return Err(Error::Unauthorized(format!("crumb request answered HTTP {status}")));
        }
        parse_crumb(&body)
            .ok_or_else(|| Error::Unauthorized("crumb endpoint returned no usable crumb".into()))
    }

    async fn summary(&self, ticker: &str, crumb: &str) -> Result<Fundamentals> {
        let url = self.endpoint(
            "v10/finance/quoteSummary",
            ticker,
            &[("modules", SUMMARY_MODULES), ("crumb", crumb)],
        )?;
        let (status, body) = self.get(url).await?;
        check_status(status, &body)?;
        parse_summary(ticker, &body)
    }
}

fn parse_cookie_url(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| Error::Config(format!("invalid Yahoo cookie URL '{raw}': {e}")))
}

/// A crumb is a short opaque token. HTML pages, blank bodies and anything
/// with whitespace inside are error pages, not crumbs.
fn parse_crumb(body: &str) -> Option<String> {
    let crumb = body.trim();
    let looks_like_html = crumb.contains("<html") || crumb.contains("<!DOCTYPE");
    if crumb.is_empty() || crumb.len() >= 100 || crumb.contains(char::is_whitespace) || looks_like_html
    {
        return None;
    }
    Some(crumb.to_string())
}

/// Yahoo answers unknown symbols with 404 and a JSON error body, which the
/// payload parser turns into `Error::NoData`. 401 means the session was
/// refused. Other non-2xx statuses are transport failures.
fn check_status(status: StatusCode, body: &str) -> Result<()> {
    if status.is_success() || status == StatusCode::NOT_FOUND {
        return Ok(());
    }
    let snippet: String = body.chars().take(200).collect();
    if status == StatusCode::UNAUTHORIZED {
        return Err(Error::Unauthorized(snippet));
    }
    Err(Error::Http(format!("HTTP {status}: {snippet}")))
}

#[async_trait]
impl MarketDataProvider for YahooClient {
    async fn daily_bars(&self, ticker: &str, period: &str) -> Result<PriceSeries> {
        let url = self.endpoint(
            "v8/finance/chart",
            ticker,
            &[("range", period), ("interval", "1d"), ("includePrePost", "false")],
        )?;
        debug!(ticker, period, "Fetching daily bars");

        let (status, body) = self.get(url).await?;
        check_status(status, &body)?;
        parse_chart(ticker, &body)
    }
}

#[async_trait]
impl FundamentalsProvider for YahooClient {
    async fn fundamentals(&self, ticker: &str) -> Result<Fundamentals> {
        debug!(ticker, "Fetching fundamentals");
        let crumb = self.crumb().await?;
        match self.summary(ticker, &crumb).await {
            Err(Error::Unauthorized(reason)) => {
                warn!(ticker, %reason, "Crumb rejected, refreshing session");
                self.discard_crumb(&crumb).await;
                let crumb = self.crumb().await?;
                self.summary(ticker, &crumb).await
            }
            other => other,
        }
    }
}
