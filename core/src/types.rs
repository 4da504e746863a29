//! Request and response DTOs for the submit and search endpoints.
//!
//! # Design
//! Optional request fields are `Option`s that are skipped when absent, so
//! "unset" never reaches the wire while `Some(String::new())` still does.
//! Response DTOs default every field: the service adds fields freely and
//! omits empty ones, and neither should fail a decode.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::codec::lenient_list;

/// Who may see a scan once it is published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Visibility {
    #[serde(rename = "on")]
    Public,
    #[default]
    #[serde(rename = "off")]
    Private,
}

/// Arguments of a scan submission. Only `url` is required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitRequest {
    url: String,
    #[serde(rename = "customagent", default, skip_serializing_if = "Option::is_none")]
    custom_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    referer: Option<String>,
    #[serde(rename = "public", default, skip_serializing_if = "Option::is_none")]
    visibility: Option<Visibility>,
}

impl SubmitRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            custom_agent: None,
            referer: None,
            visibility: None,
        }
    }

    /// User-Agent the sandbox browser presents.
    pub fn custom_agent(mut self, agent: impl Into<String>) -> Self {
        self.custom_agent = Some(agent.into());
        self
    }

    pub fn referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = Some(visibility);
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn custom_agent_value(&self) -> Option<&str> {
        self.custom_agent.as_deref()
    }

    pub fn referer_value(&self) -> Option<&str> {
        self.referer.as_deref()
    }

    /// Visibility the service applies: private unless asked otherwise.
    pub fn effective_visibility(&self) -> Visibility {
        self.visibility.unwrap_or_default()
    }
}

/// Acknowledgement returned by a successful submission.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmitResponse {
    /// Task identifier.
    pub uuid: String,
    /// API location of the report.
    pub api: String,
    pub url: String,
    pub visibility: String,
    pub message: String,
    /// Human-facing report page.
    pub result: String,
    pub options: Map<String, Value>,
}

/// Parameters of a search over earlier scans. Unset fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    pub query: Option<String>,
    pub size: Option<u64>,
    pub offset: Option<u64>,
    /// `field:order`, e.g. `date:desc`. The service defaults to `_score`.
    pub sort: Option<String>,
}

impl SearchQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Search expression, e.g. `domain:example.com` or `ip:1.2.3.4`.
    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    /// Query-string pairs for the set fields, in `q`, `size`, `offset`,
    /// `sort` order.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(query) = &self.query {
            pairs.push(("q".to_string(), query.clone()));
        }
        if let Some(size) = self.size {
            pairs.push(("size".to_string(), size.to_string()));
        }
        if let Some(offset) = self.offset {
            pairs.push(("offset".to_string(), offset.to_string()));
        }
        if let Some(sort) = &self.sort {
            pairs.push(("sort".to_string(), sort.clone()));
        }
        pairs
    }
}

/// One page of search hits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchResponse {
    /// Hits that decoded; a malformed hit is dropped, not fatal.
    #[serde(deserialize_with = "lenient_list")]
    pub results: Vec<SearchResult>,
    pub total: i64,
}

/// Summary of an earlier scan matching a search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchResult {
    #[serde(rename = "_id")]
    pub id: String,
    pub page: SearchPage,
    /// API location of the full report.
    pub result: String,
    pub stats: SearchStats,
    pub task: SearchTask,
    pub uniq_countries: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchPage {
    pub asn: String,
    pub asnname: String,
    pub city: String,
    pub country: String,
    pub domain: String,
    pub ip: String,
    pub ptr: String,
    pub server: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchStats {
    pub console_msgs: i64,
    pub data_length: i64,
    pub encoded_data_length: i64,
    pub requests: i64,
    #[serde(rename = "uniqIPs")]
    pub uniq_ips: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchTask {
    pub method: String,
    pub source: String,
    pub time: String,
    pub url: String,
    pub visibility: String,
}
