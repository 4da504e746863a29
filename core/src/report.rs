//! Scan report returned by the result endpoint.
//!
//! # Design
//! The report is large, evolves without notice, and most callers read a
//! handful of fields from it. `ScanResult` therefore keeps the document as a
//! JSON tree and decodes typed sections on demand. Every section decodes
//! independently: a malformed `stats` block yields `None` from
//! [`ScanResult::stats`] without affecting [`ScanResult::page`], and list
//! sections drop individual malformed entries rather than the whole list.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::codec::{from_tree, lenient_list, lenient_vec};

/// Full scan report, kept as a tolerant JSON tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScanResult(Value);

impl ScanResult {
    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    pub fn raw(&self) -> &Value {
        &self.0
    }

    pub fn into_raw(self) -> Value {
        self.0
    }

    /// JSON-pointer lookup, e.g. `"/page/url"`.
    pub fn pointer(&self, pointer: &str) -> Option<&Value> {
        self.0.pointer(pointer)
    }

    /// Decode the subtree at `pointer` into `T`.
    ///
    /// Returns `None` when the subtree is absent, `null` or does not fit `T`;
    /// the last case is logged so schema drift stays visible. `null` members
    /// inside the subtree decode as their field's default.
    pub fn section<T: DeserializeOwned>(&self, pointer: &str) -> Option<T> {
        let value = self.pointer(pointer).filter(|value| !value.is_null())?;
        match from_tree(value.clone()) {
            Ok(section) => Some(section),
            Err(err) => {
                tracing::warn!(section = pointer, error = %err, "undecodable report section");
                None
            }
        }
    }

    /// Status message the service puts in provisional and error bodies.
    pub fn message(&self) -> Option<&str> {
        self.pointer("/message").and_then(Value::as_str)
    }

    pub fn page(&self) -> Option<ScanPage> {
        self.section("/page")
    }

    pub fn task(&self) -> Option<ScanTask> {
        self.section("/task")
    }

    pub fn lists(&self) -> Option<ScanLists> {
        self.section("/lists")
    }

    pub fn stats(&self) -> Option<ScanStats> {
        self.section("/stats")
    }

    pub fn timing(&self) -> Option<PageTiming> {
        self.section("/data/timing")
    }

    pub fn cookies(&self) -> Vec<Cookie> {
        self.list("/data/cookies")
    }

    pub fn links(&self) -> Vec<Link> {
        self.list("/data/links")
    }

    pub fn globals(&self) -> Vec<Global> {
        self.list("/data/globals")
    }

    /// Network requests the sandbox browser made, flattened to one record
    /// per request.
    pub fn requests(&self) -> Vec<NetworkRequest> {
        self.list::<RawRequest>("/data/requests")
            .into_iter()
            .map(NetworkRequest::from)
            .collect()
    }

    /// Technologies fingerprinted on the page.
    pub fn technologies(&self) -> Vec<Technology> {
        self.list("/meta/processors/wappa/data")
    }

    /// Per-IP geolocation computed by the geoip processor.
    pub fn geoip(&self) -> Vec<IpGeo> {
        self.list("/meta/processors/geoip/data")
    }

    fn list<T: DeserializeOwned>(&self, pointer: &str) -> Vec<T> {
        self.pointer(pointer).map(lenient_vec).unwrap_or_default()
    }
}

/// The page the scan ended up on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanPage {
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

/// How the scan was requested.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScanTask {
    #[serde(rename = "domURL")]
    pub dom_url: String,
    pub method: String,
    pub options: TaskOptions,
    #[serde(rename = "reportURL")]
    pub report_url: String,
    #[serde(rename = "screenshotURL")]
    pub screenshot_url: String,
    pub source: String,
    pub time: String,
    pub url: String,
    pub user_agent: String,
    pub uuid: String,
    pub visibility: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskOptions {
    pub useragent: String,
}

/// Indicators collected during the scan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScanLists {
    pub asns: Vec<String>,
    #[serde(deserialize_with = "lenient_list")]
    pub certificates: Vec<Certificate>,
    pub countries: Vec<String>,
    pub domains: Vec<String>,
    pub hashes: Vec<Value>,
    pub ips: Vec<String>,
    pub link_domains: Vec<String>,
    pub servers: Vec<String>,
    pub urls: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Certificate {
    pub issuer: String,
    pub subject_name: String,
    pub valid_from: i64,
    pub valid_to: i64,
}

/// Aggregate statistics over every request of the scan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScanStats {
    #[serde(rename = "IPv6Percentage")]
    pub ipv6_percentage: i64,
    pub ad_blocked: i64,
    #[serde(deserialize_with = "lenient_list")]
    pub domain_stats: Vec<StatsDetail>,
    #[serde(deserialize_with = "lenient_list")]
    pub ip_stats: Vec<IpStat>,
    pub malicious: i64,
    #[serde(deserialize_with = "lenient_list")]
    pub protocol_stats: Vec<StatsDetail>,
    #[serde(deserialize_with = "lenient_list")]
    pub reg_domain_stats: Vec<StatsDetail>,
    #[serde(deserialize_with = "lenient_list")]
    pub resource_stats: Vec<StatsDetail>,
    pub secure_percentage: i64,
    pub secure_requests: i64,
    #[serde(deserialize_with = "lenient_list")]
    pub server_stats: Vec<StatsDetail>,
    #[serde(deserialize_with = "lenient_list")]
    pub tls_stats: Vec<StatsDetail>,
    pub total_links: i64,
    pub uniq_countries: i64,
}

/// One row of a per-domain, per-protocol, per-server ... breakdown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StatsDetail {
    pub compression: String,
    pub count: i64,
    pub countries: Vec<String>,
    pub domain: String,
    pub encoded_size: i64,
    pub index: i64,
    pub initiators: Vec<String>,
    pub ips: Vec<String>,
    pub latency: i64,
    pub percentage: Value,
    pub protocol: String,
    pub protocols: Value,
    pub redirects: i64,
    pub reg_domain: String,
    pub security_state: Value,
    pub server: String,
    pub size: i64,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(deserialize_with = "lenient_list")]
    pub sub_domains: Vec<SubDomain>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubDomain {
    pub domain: String,
    pub failed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IpStat {
    pub asn: AsnInfo,
    pub count: Value,
    pub countries: Vec<String>,
    pub domains: Vec<String>,
    pub encoded_size: i64,
    pub geoip: ScanGeo,
    pub index: i64,
    pub ip: String,
    pub ipv6: bool,
    pub rdns: ReverseDns,
    pub redirects: i64,
    pub requests: i64,
    pub size: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AsnInfo {
    pub asn: String,
    pub country: String,
    pub date: String,
    pub description: String,
    pub ip: String,
    pub name: String,
    pub registrar: String,
    pub route: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReverseDns {
    pub ip: String,
    pub ptr: String,
}

/// Geolocation of an IP address.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanGeo {
    pub city: String,
    pub country: String,
    pub country_name: String,
    /// Latitude and longitude.
    pub ll: Vec<f64>,
    pub metro: i64,
    pub range: Value,
    pub region: String,
    pub zip: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IpGeo {
    pub ip: String,
    pub geoip: ScanGeo,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PageTiming {
    pub begin_navigation: String,
    pub dom_content_event_fired: String,
    pub frame_navigated: String,
    pub frame_started_loading: String,
    pub frame_stopped_loading: String,
    pub load_event_fired: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Cookie {
    pub domain: String,
    pub expires: f64,
    pub http_only: bool,
    pub name: String,
    pub path: String,
    pub secure: bool,
    pub session: bool,
    pub size: i64,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Link {
    pub href: String,
    pub text: String,
}

/// Non-standard global variable found on the page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Global {
    pub prop: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Technology {
    pub app: String,
    #[serde(deserialize_with = "lenient_list")]
    pub categories: Vec<TechnologyCategory>,
    pub confidence_total: i64,
    pub icon: String,
    pub website: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TechnologyCategory {
    pub name: String,
    pub priority: Value,
}

/// Flattened view of one entry of `data.requests`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetworkRequest {
    pub request_id: String,
    pub url: String,
    pub method: String,
    pub resource_type: String,
    pub document_url: String,
    /// HTTP status of the response, 0 when the request failed.
    pub status: i64,
    pub mime_type: String,
    pub remote_ip: String,
    pub protocol: String,
    pub security_state: String,
    /// SHA-256 of the response body.
    pub hash: String,
    pub asn: String,
    pub country: String,
    pub data_length: i64,
    pub encoded_data_length: i64,
}

// Wire shape of `data.requests[*]`, only the parts `NetworkRequest` keeps.

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawRequest {
    request: RawRequestEnvelope,
    response: RawResponseEnvelope,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawRequestEnvelope {
    #[serde(rename = "documentURL")]
    document_url: String,
    request_id: String,
    #[serde(rename = "type")]
    kind: String,
    request: RawRequestLine,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawRequestLine {
    method: String,
    url: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawResponseEnvelope {
    asn: AsnInfo,
    data_length: i64,
    encoded_data_length: i64,
    geoip: ScanGeo,
    hash: String,
    response: RawResponseLine,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawResponseLine {
    mime_type: String,
    protocol: String,
    #[serde(rename = "remoteIPAddress")]
    remote_ip_address: String,
    security_state: String,
    status: i64,
}

impl From<RawRequest> for NetworkRequest {
    fn from(raw: RawRequest) -> Self {
        let RawRequest { request, response } = raw;
        Self {
            request_id: request.request_id,
            url: request.request.url,
            method: request.request.method,
            resource_type: request.kind,
            document_url: request.document_url,
            status: response.response.status,
            mime_type: response.response.mime_type,
            remote_ip: response.response.remote_ip_address,
            protocol: response.response.protocol,
            security_state: response.response.security_state,
            hash: response.hash,
            asn: response.asn.asn,
            country: response.geoip.country,
            data_length: response.data_length,
            encoded_data_length: response.encoded_data_length,
        }
    }
}

/// Trimmed report document shared by unit tests.
#[cfg(test)]
pub(crate) const SAMPLE_REPORT: &str = r#"{
    "data": {
        "requests": [
            {
                "request": {
                    "requestId": "1000.1",
                    "documentURL": "https://example.com/",
                    "type": "Document",
                    "request": {"method": "GET", "url": "https://example.com/"}
                },
                "response": {
                    "dataLength": 1256,
                    "encodedDataLength": 648,
                    "hash": "ea8fac7c65fb589b0d53560f5251f74f9e9b243478dcb6b3ea79b5e36449c8d9",
                    "asn": {"asn": "15133", "name": "EDGECAST"},
                    "geoip": {"country": "US", "ll": [37.751, -97.822]},
                    "response": {
                        "status": 200,
                        "mimeType": "text/html",
                        "protocol": "h2",
                        "remoteIPAddress": "[2606:2800:220:1:248:1893:25c8:1946]",
                        "securityState": "secure"
                    }
                }
            },
            {"request": "not an object"}
        ],
        "cookies": [
            {"name": "session", "value": "abc", "domain": "example.com", "httpOnly": true, "expires": -1},
            {"name": 7}
        ],
        "links": [{"href": "https://www.iana.org/domains/example", "text": "More information..."}],
        "globals": [{"prop": "onbeforetoggle", "type": "object"}],
        "timing": {"beginNavigation": "2024-01-01T00:00:00.000Z", "loadEventFired": "2024-01-01T00:00:01.000Z"}
    },
    "lists": {
        "ips": ["2606:2800:220:1:248:1893:25c8:1946"],
        "domains": ["example.com"],
        "certificates": [{"issuer": "DigiCert TLS RSA SHA256 2020 CA1", "subjectName": "www.example.org", "validFrom": 1673827200, "validTo": 1707868799}]
    },
    "meta": {
        "processors": {
            "wappa": {"data": [{"app": "Nginx", "categories": [{"name": "Web Servers", "priority": 8}], "confidenceTotal": 100}]},
            "geoip": {"data": [{"ip": "2606:2800:220:1:248:1893:25c8:1946", "geoip": {"country": "US", "country_name": "United States"}}]}
        }
    },
    "page": {"url": "https://example.com/", "domain": "example.com", "ip": "2606:2800:220:1:248:1893:25c8:1946", "country": "US", "server": "ECS (dcb/7F83)"},
    "stats": {
        "IPv6Percentage": 100,
        "secureRequests": 1,
        "uniqCountries": 1,
        "malicious": 0,
        "domainStats": [{"domain": "example.com", "count": 1, "size": 648}, {"count": "many"}]
    },
    "task": {"uuid": "68e5b3b2-bd2a-4d0c-8a1f-0b7c1e1f7d25", "url": "https://example.com", "visibility": "public", "reportURL": "https://urlscan.io/result/68e5b3b2-bd2a-4d0c-8a1f-0b7c1e1f7d25/", "options": {"useragent": "scanner/1.0"}},
    "verdicts": {"overall": {"score": 0, "malicious": false}}
}"#;
