use std::{
    collections::{BTreeSet, HashSet},
    sync::{Mutex, MutexGuard},
    time::Duration,
};

use async_trait::async_trait;
use reqwest::{
    StatusCode,
    header::{HeaderMap, HeaderName, HeaderValue},
};
use serde::{Deserialize, de::DeserializeOwned};
use tracing::{debug, error, trace, warn};

use super::{
    Gateway, GatewayError, Page, PriceStats,
    cache::TtlCache,
    encode::{self, Params},
    send_request,
};
use crate::catalog::{DrugRecord, Field, RecordId};
use crate::config::Config;
use crate::query::{QueryDescriptor, SortDirection, SortSpec};

const IDS_PER_REQUEST: usize = 200;
const STATS_CHUNK: usize = 1000;
const STATS_COLUMNS: &str = "id,ten_thuoc,don_gia,ma_tbmt";
const DISTINCT_CHUNK: usize = 1000;
const DISTINCT_MAX_REQUESTS: usize = 20;

/// Rows returned by one select, with the exact match count when requested.
#[derive(Debug)]
pub struct Selected<T> {
    pub rows: Vec<T>,
    pub total: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct BackendError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Option<String>,
}

/// Thin client for the hosted database's REST interface.
#[derive(Clone)]
pub struct RestClient {
    client: reqwest::Client,
    base_url: String,
    headers: HeaderMap,
}

impl RestClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| GatewayError::Transport(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            headers: auth_headers(api_key)?,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, GatewayError> {
        Self::new(
            &config.url,
            &config.api_key,
            Duration::from_millis(config.request_timeout_ms),
        )
    }

    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        params: &[(String, String)],
        count: bool,
    ) -> Result<Selected<T>, GatewayError> {
        let url = format!("{}/rest/v1/{}", self.base_url, table);
        trace!(table, query = %encode::redacted(params), count, "REST select");
        let mut request = self
            .client
            .get(url)
            .headers(self.headers.clone())
            .query(params);
        if count {
            request = request.header("Prefer", "count=exact");
        }
        let response = request.send().await?;
        let status = response.status();
        let total = response
            .headers()
            .get("content-range")
            .and_then(|value| value.to_str().ok())
            .and_then(parse_content_range);

        if status == StatusCode::RANGE_NOT_SATISFIABLE {
            // Offset past the last row.
            return Ok(Selected {
                rows: Vec::new(),
                total,
            });
        }
        if !status.is_success() {
            let text = response.text().await?;
            return Err(backend_error(status, &text));
        }
        let rows = response.json::<Vec<T>>().await?;
        Ok(Selected { rows, total })
    }
}

fn auth_headers(api_key: &str) -> Result<HeaderMap, GatewayError> {
    let invalid = |err: reqwest::header::InvalidHeaderValue| {
        GatewayError::Transport(format!("invalid API key header: {err}"))
    };
    let mut headers = HeaderMap::new();
    headers.insert(
        HeaderName::from_static("apikey"),
        HeaderValue::from_str(api_key).map_err(invalid)?,
    );
    headers.insert(
        HeaderName::from_static("authorization"),
        HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(invalid)?,
    );
    Ok(headers)
}

fn backend_error(status: StatusCode, body: &str) -> GatewayError {
    match serde_json::from_str::<BackendError>(body) {
        Ok(parsed) => GatewayError::Query {
            status: status.as_u16(),
            code: parsed.code,
            message: parsed
                .message
                .or(parsed.details)
                .unwrap_or_else(|| body.to_string()),
        },
        Err(_) => GatewayError::Query {
            status: status.as_u16(),
            code: None,
            message: body.trim().to_string(),
        },
    }
}

/// `0-19/201000` or `*/0`. An unknown total (`*`) yields `None`.
pub fn parse_content_range(value: &str) -> Option<u64> {
    let (_, total) = value.split_once('/')?;
    total.trim().parse().ok()
}

/// [`Gateway`] backed by the hosted catalog table.
pub struct RestGateway {
    client: RestClient,
    table: String,
    cache: Mutex<TtlCache<String, Page>>,
    stats_sample_cap: usize,
    stats_max_rows: usize,
}

impl RestGateway {
    pub fn new(client: RestClient, config: &Config) -> Self {
        Self {
            client,
            table: config.table.clone(),
            cache: Mutex::new(TtlCache::new(
                config.cache_capacity,
                Duration::from_secs(config.cache_ttl_secs),
            )),
            stats_sample_cap: config.stats_sample_cap,
            stats_max_rows: config.stats_max_rows,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, GatewayError> {
        Ok(Self::new(RestClient::from_config(config)?, config))
    }

    fn cache(&self) -> MutexGuard<'_, TtlCache<String, Page>> {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Reads one page. With `use_cache` unset the cached copy is skipped but
    /// still replaced by the new result.
    async fn read_page(
        &self,
        descriptor: &QueryDescriptor,
        use_cache: bool,
    ) -> Result<Page, GatewayError> {
        let params = encode::page_params(descriptor);
        let key = encode::canonical(&params);
        let cached = if use_cache { self.cache().get(&key) } else { None };
        if let Some(page) = cached {
            debug!(offset = descriptor.offset, limit = descriptor.limit, "Page served from cache");
            return Ok(page);
        }

        let (result, elapsed) = send_request("fetch_page", || {
            self.client.select::<DrugRecord>(&self.table, &params, true)
        })
        .await;
        match result {
            Ok(selected) => {
                let total_count = selected
                    .total
                    .unwrap_or(descriptor.offset + selected.rows.len() as u64);
                let page = Page {
                    rows: selected.rows,
                    total_count,
                };
                debug!(
                    rows = page.rows.len(),
                    total_count,
                    elapsed_ms = elapsed.as_millis(),
                    "Fetched page"
                );
                self.cache().insert(key, page.clone());
                Ok(page)
            }
            Err(err) => {
                error!(error = %err, descriptor = %descriptor.summary(), "Page fetch failed");
                Err(err)
            }
        }
    }

    async fn try_distinct_values(
        &self,
        field: Field,
        limit: usize,
    ) -> Result<Vec<String>, GatewayError> {
        let column = field.column();
        let mut values = Vec::new();
        let mut seen = HashSet::new();
        let mut after: Option<String> = None;

        for _ in 0..DISTINCT_MAX_REQUESTS {
            let mut params: Params = vec![
                ("select".to_string(), column.to_string()),
                (column.to_string(), "not.is.null".to_string()),
                (column.to_string(), "neq.".to_string()),
            ];
            if let Some(after) = &after {
                params.push((column.to_string(), format!("gt.{after}")));
            }
            params.push(("order".to_string(), format!("{column}.asc")));
            params.push(("limit".to_string(), DISTINCT_CHUNK.to_string()));

            let (result, _) = send_request("fetch_distinct_values", || {
                self.client
                    .select::<serde_json::Map<String, serde_json::Value>>(&self.table, &params, false)
            })
            .await;
            let rows = result?.rows;
            let fetched = rows.len();

            for row in rows {
                let raw = match row.get(column) {
                    Some(serde_json::Value::String(text)) => text.clone(),
                    Some(serde_json::Value::Number(number)) => number.to_string(),
                    _ => continue,
                };
                let trimmed = raw.trim();
                if !trimmed.is_empty() && seen.insert(trimmed.to_string()) {
                    values.push(trimmed.to_string());
                    if values.len() >= limit {
                        return Ok(values);
                    }
                }
                after = Some(raw);
            }
            if fetched < DISTINCT_CHUNK {
                break;
            }
        }
        Ok(values)
    }
}

#[async_trait]
impl Gateway for RestGateway {
    async fn fetch_page(&self, descriptor: &QueryDescriptor) -> Result<Page, GatewayError> {
        self.read_page(descriptor, true).await
    }

    async fn fetch_fresh_page(&self, descriptor: &QueryDescriptor) -> Result<Page, GatewayError> {
        self.read_page(descriptor, false).await
    }

    async fn fetch_distinct_values(&self, field: Field, limit: usize) -> Vec<String> {
        if limit == 0 {
            return Vec::new();
        }
        match self.try_distinct_values(field, limit).await {
            Ok(values) => values,
            Err(err) => {
                warn!(error = %err, field = %field, "Distinct value lookup failed");
                Vec::new()
            }
        }
    }

    async fn fetch_aggregate_stats(
        &self,
        descriptor: &QueryDescriptor,
    ) -> Result<PriceStats, GatewayError> {
        let cap = if descriptor.is_filtered() {
            self.stats_max_rows
        } else {
            self.stats_sample_cap
        };
        let filters = encode::filter_params(&descriptor.filters);
        let mut samples: Vec<DrugRecord> = Vec::new();
        let mut total: Option<u64> = None;

        loop {
            let limit = STATS_CHUNK.min(cap.saturating_sub(samples.len()));
            let first = total.is_none();
            // The first request also carries the exact count, even with an empty window.
            if limit == 0 && !first {
                break;
            }
            let mut params: Params = vec![("select".to_string(), STATS_COLUMNS.to_string())];
            params.extend(filters.iter().cloned());
            params.push(encode::order_param(SortSpec::default()));
            params.push(("offset".to_string(), samples.len().to_string()));
            params.push(("limit".to_string(), limit.to_string()));

            let (result, _) = send_request("fetch_aggregate_stats", || {
                self.client.select::<DrugRecord>(&self.table, &params, first)
            })
            .await;
            let selected = result.inspect_err(|err| {
                error!(error = %err, descriptor = %descriptor.summary(), "Stats fetch failed")
            })?;
            let fetched = selected.rows.len();
            if first {
                total = Some(selected.total.unwrap_or(fetched as u64));
            }
            samples.extend(selected.rows);
            if fetched < limit || limit == 0 {
                break;
            }
        }

        let total_count = total.unwrap_or(samples.len() as u64);
        let capped = (samples.len() as u64) < total_count;
        debug!(
            samples = samples.len(),
            total_count,
            capped,
            "Computed price statistics"
        );
        Ok(PriceStats::from_samples(&samples, total_count, capped))
    }

    async fn fetch_by_ids(
        &self,
        ids: &[RecordId],
        sort: SortSpec,
    ) -> Result<Vec<DrugRecord>, GatewayError> {
        let unique: Vec<RecordId> = ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
        let mut rows = Vec::with_capacity(unique.len());

        for chunk in unique.chunks(IDS_PER_REQUEST) {
            let list = chunk
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(",");
            let params: Params = vec![
                ("select".to_string(), "*".to_string()),
                ("id".to_string(), format!("in.({list})")),
            ];
            let (result, _) = send_request("fetch_by_ids", || {
                self.client.select::<DrugRecord>(&self.table, &params, false)
            })
            .await;
            let selected = result.inspect_err(|err| {
                error!(error = %err, ids = chunk.len(), "Fetch by ids failed")
            })?;
            rows.extend(selected.rows);
        }

        sort_records(&mut rows, sort);
        debug!(requested = ids.len(), found = rows.len(), "Fetched rows by id");
        Ok(rows)
    }

    async fn fetch_total_count(&self) -> Result<u64, GatewayError> {
        let params: Params = vec![
            ("select".to_string(), "id".to_string()),
            ("limit".to_string(), "0".to_string()),
        ];
        let (result, _) = send_request("fetch_total_count", || {
            self.client
                .select::<serde_json::Value>(&self.table, &params, true)
        })
        .await;
        let selected = result?;
        Ok(selected.total.unwrap_or_default())
    }
}

/// Sorts rows by `sort`, breaking ties by ascending id.
pub fn sort_records(rows: &mut [DrugRecord], sort: SortSpec) {
    rows.sort_by(|a, b| {
        let ordering = a.compare_by(b, sort.field);
        let ordering = match sort.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        };
        ordering.then_with(|| a.id.cmp(&b.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_range_totals() {
        assert_eq!(parse_content_range("0-19/201000"), Some(201_000));
        assert_eq!(parse_content_range("*/0"), Some(0));
        assert_eq!(parse_content_range("0-19/*"), None);
        assert_eq!(parse_content_range("garbage"), None);
    }

    #[test]
    fn backend_error_body_is_decoded() {
        let err = backend_error(
            StatusCode::BAD_REQUEST,
            r#"{"code":"PGRST100","details":"unexpected \"x\"","hint":null,"message":"failed to parse filter"}"#,
        );
        assert_eq!(
            err,
            GatewayError::Query {
                status: 400,
                code: Some("PGRST100".to_string()),
                message: "failed to parse filter".to_string(),
            }
        );
    }

    #[test]
    fn non_json_error_body_is_kept() {
        let err = backend_error(StatusCode::BAD_GATEWAY, "upstream down\n");
        assert_eq!(
            err,
            GatewayError::Query {
                status: 502,
                code: None,
                message: "upstream down".to_string(),
            }
        );
    }

    #[test]
    fn sort_records_orders_regardless_of_input_order() {
        let record = |id, price| DrugRecord {
            id,
            unit_price: price,
            ..Default::default()
        };
        let mut rows = vec![record(3, 5.0), record(1, 9.0), record(2, 5.0)];
        sort_records(&mut rows, SortSpec::default());
        assert_eq!(rows.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2, 3]);

        sort_records(
            &mut rows,
            SortSpec::new(Field::UnitPrice, SortDirection::Descending),
        );
        assert_eq!(rows.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2, 3]);

        sort_records(
            &mut rows,
            SortSpec::new(Field::UnitPrice, SortDirection::Ascending),
        );
        assert_eq!(rows.iter().map(|r| r.id).collect::<Vec<_>>(), vec![2, 3, 1]);
    }

    #[test]
    fn rejects_api_key_with_newline() {
        assert!(matches!(
            RestClient::new("https://db.example", "bad\nkey", Duration::from_secs(1)),
            Err(GatewayError::Transport(_))
        ));
    }
}
