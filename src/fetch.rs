use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::auth::BearerToken;
use crate::client::ApiClient;
use crate::config::FetchOptions;
use crate::error::FetchError;

/// Everything a completed pagination run produced.
#[derive(Debug, Clone)]
pub struct FetchOutcome<T> {
    pub records: Vec<T>,
    pub requests: u32,
    pub pages: u32,
    /// Server-suggested waits, in the order the 429s arrived.
    pub rate_limit_waits: Vec<Duration>,
}

impl<T> FetchOutcome<T> {
    fn new() -> Self {
        Self {
            records: Vec::new(),
            requests: 0,
            pages: 0,
            rate_limit_waits: Vec::new(),
        }
    }
}

/// Walks a page-numbered collection endpoint until it returns an empty page.
pub struct Paginator<'a> {
    client: &'a ApiClient,
    token: &'a BearerToken,
    options: &'a FetchOptions,
}

impl<'a> Paginator<'a> {
    pub fn new(client: &'a ApiClient, token: &'a BearerToken, options: &'a FetchOptions) -> Self {
        Self {
            client,
            token,
            options,
        }
    }

    /// Fetch every page of `path`, starting at page 1.
    ///
    /// The page number only advances after a non-empty 2xx page, so a 429
    /// retries the same page. Any other non-2xx status or transport failure
    /// aborts the walk.
    pub async fn fetch_all<T>(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> Result<FetchOutcome<T>, FetchError>
    where
        T: DeserializeOwned,
    {
        let url = self.client.url(path);
        let mut outcome = FetchOutcome::new();
        let mut page: u32 = 1;
        let mut throttled: u32 = 0;

        loop {
            debug!(%url, page, "requesting page");
            let response = self
                .client
                .http()
                .get(&url)
                .bearer_auth(self.token.as_str())
                .query(params)
                .query(&[("page[size]", self.options.page_size), ("page[number]", page)])
                .send()
                .await
                .map_err(FetchError::Transport)?;
            outcome.requests += 1;

            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                throttled += 1;
                if throttled > self.options.max_rate_limit_retries {
                    return Err(FetchError::RateLimitExhausted {
                        page,
                        attempts: throttled,
                    });
                }

                let suggested = retry_after(response.headers(), Utc::now())
                    .unwrap_or(self.options.default_retry_after);
                let wait = suggested.min(self.options.max_retry_wait);
                warn!(
                    page,
                    attempt = throttled,
                    wait_secs = wait.as_secs_f64(),
                    "rate limited, waiting before retrying the same page"
                );
                outcome.rate_limit_waits.push(suggested);
                tokio::time::sleep(wait).await;
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_else(|err| {
                    warn!(page, error = %err, "failed to read error response body");
                    String::new()
                });
                return Err(FetchError::Api { status, body });
            }

            throttled = 0;
            let body = response.bytes().await.map_err(FetchError::Transport)?;
            let batch: Vec<T> =
                serde_json::from_slice(&body).map_err(|source| FetchError::Decode { page, source })?;

            if batch.is_empty() {
                info!(page, total = outcome.records.len(), "reached empty page");
                break;
            }

            outcome.records.extend(batch);
            outcome.pages += 1;
            info!(page, total = outcome.records.len(), "fetched page");

            page += 1;
            if !self.options.page_delay.is_zero() {
                tokio::time::sleep(self.options.page_delay).await;
            }
        }

        Ok(outcome)
    }
}

fn retry_after(headers: &HeaderMap, now: DateTime<Utc>) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?;
    parse_retry_after(value, now)
}

/// Parse a `Retry-After` value given as delta-seconds or as an HTTP-date.
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();

    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }

    if let Ok(secs) = value.parse::<f64>() {
        return Duration::try_from_secs_f64(secs).ok();
    }

    let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    Some((at - now).to_std().unwrap_or(Duration::ZERO))
}
