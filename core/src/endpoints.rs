//! Stateless request builder and response parser for the scan service API.
//!
//! # Design
//! `Endpoints` holds only the base URL and the credential and carries no
//! mutable state between calls. Each operation is split into a `build_*`
//! method that produces an `HttpRequest` and a `parse_*` method that consumes
//! an `HttpResponse`. `UrlscanClient` executes the round-trip in between, so
//! everything here is deterministic and testable without I/O.

use crate::codec;
use crate::config::ApiKey;
use crate::error::{Result, UrlscanError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, API_KEY_HEADER};
use crate::report::ScanResult;
use crate::types::{SearchQuery, SearchResponse, SubmitRequest, SubmitResponse};

/// Interpretation of one poll of the result endpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// The report is complete.
    Ready(ScanResult),
    /// The service refused the task identifier; polling again cannot help.
    Rejected { status: u16, message: String },
    /// Anything else: the report is not available yet.
    NotReady { status: u16 },
}

/// Builds requests for, and interprets responses from, the scan service.
#[derive(Debug, Clone)]
pub struct Endpoints {
    base_url: String,
    api_key: ApiKey,
}

impl Endpoints {
    pub fn new(base_url: &str, api_key: ApiKey) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_submit(&self, input: &SubmitRequest) -> Result<HttpRequest> {
        let body = codec::encode(input)?;
        Ok(HttpRequest {
            method: HttpMethod::Post,
            url: format!("{}/scan/", self.base_url),
            query: Vec::new(),
            headers: vec![
                ("content-type".to_string(), "application/json".to_string()),
                self.auth_header(),
            ],
            body: Some(body),
        })
    }

    pub fn parse_submit(&self, response: HttpResponse) -> Result<SubmitResponse> {
        check_status(&response)?;
        let receipt: SubmitResponse = codec::decode(response.status, &response.body)?;
        if receipt.uuid.trim().is_empty() {
            return Err(UrlscanError::MissingField { field: "uuid" });
        }
        if receipt.api.trim().is_empty() {
            return Err(UrlscanError::MissingField { field: "api" });
        }
        Ok(receipt)
    }

    pub fn build_result(&self, uuid: &str) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: format!("{}/result/{uuid}/", self.base_url),
            query: Vec::new(),
            headers: vec![self.auth_header()],
            body: None,
        }
    }

    /// Classify a poll response.
    ///
    /// The body is decoded before the status is looked at: the service sends
    /// JSON for pending and rejected tasks too, and anything else signals an
    /// infrastructure problem rather than a task state.
    pub fn parse_result(&self, response: HttpResponse) -> Result<PollOutcome> {
        let document = ScanResult::from_value(codec::decode_tree(response.status, &response.body)?);
        match response.status {
            200 => Ok(PollOutcome::Ready(document)),
            400 => Ok(PollOutcome::Rejected {
                status: 400,
                message: document.message().unwrap_or("invalid task identifier").to_string(),
            }),
            404 => Ok(PollOutcome::NotReady { status: 404 }),
            status => {
                tracing::warn!(code = status, body = %response.body, "Unexpected status code");
                Ok(PollOutcome::NotReady { status })
            }
        }
    }

    pub fn build_search(&self, query: &SearchQuery) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: format!("{}/search/", self.base_url),
            query: query.to_query_pairs(),
            headers: vec![self.auth_header()],
            body: None,
        }
    }

    pub fn parse_search(&self, response: HttpResponse) -> Result<SearchResponse> {
        check_status(&response)?;
        codec::decode(response.status, &response.body)
    }

    fn auth_header(&self) -> (String, String) {
        (API_KEY_HEADER.to_string(), self.api_key.expose().to_string())
    }
}

/// Anything but 200 is a refusal for submit and search.
fn check_status(response: &HttpResponse) -> Result<()> {
    if response.status == 200 {
        return Ok(());
    }
    tracing::warn!(code = response.status, body = %response.body, "Unexpected status code");
    Err(UrlscanError::Rejected {
        status: response.status,
        message: rejection_message(&response.body),
    })
}

/// Prefer the service's `message` field, fall back to the raw body.
fn rejection_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Visibility;

    fn endpoints() -> Endpoints {
        Endpoints::new("https://urlscan.io/api/v1", ApiKey::new("test-key"))
    }

    #[test]
    fn build_submit_produces_correct_request() {
        let input = SubmitRequest::new("https://example.com").visibility(Visibility::Public);
        let req = endpoints().build_submit(&input).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "https://urlscan.io/api/v1/scan/");
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.header(API_KEY_HEADER), Some("test-key"));
        assert!(req.query.is_empty());
        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, serde_json::json!({"url": "https://example.com", "public": "on"}));
    }

    #[test]
    fn parse_submit_success() {
        let response = HttpResponse::new(
            200,
            r#"{"message":"Submission successful","uuid":"0e37e828-a9d9-45c0-ac50-1ca579b86c72",
                "result":"https://urlscan.io/result/0e37e828-a9d9-45c0-ac50-1ca579b86c72/",
                "api":"https://urlscan.io/api/v1/result/0e37e828-a9d9-45c0-ac50-1ca579b86c72/",
                "visibility":"public","options":{"useragent":"TestAgent"},"url":"https://example.com"}"#,
        );
        let receipt = endpoints().parse_submit(response).unwrap();
        assert_eq!(receipt.uuid, "0e37e828-a9d9-45c0-ac50-1ca579b86c72");
        assert!(receipt.api.ends_with("/result/0e37e828-a9d9-45c0-ac50-1ca579b86c72/"));
        assert_eq!(receipt.visibility, "public");
        assert_eq!(receipt.options["useragent"], "TestAgent");
    }

    #[test]
    fn parse_submit_wrong_status() {
        let response = HttpResponse::new(429, r#"{"message":"Rate limit exceeded","status":429}"#);
        let err = endpoints().parse_submit(response).unwrap_err();
        assert!(matches!(err, UrlscanError::Rejected { status: 429, ref message } if message == "Rate limit exceeded"));
        assert_eq!(err.status_code(), Some(429));
    }

    #[test]
    fn parse_submit_non_json_error_keeps_body() {
        let response = HttpResponse::new(502, "Bad Gateway");
        let err = endpoints().parse_submit(response).unwrap_err();
        assert!(matches!(err, UrlscanError::Rejected { status: 502, ref message } if message == "Bad Gateway"));
    }

    #[test]
    fn parse_submit_requires_identifier() {
        let response = HttpResponse::new(200, r#"{"api":"https://urlscan.io/api/v1/result/x/"}"#);
        let err = endpoints().parse_submit(response).unwrap_err();
        assert!(matches!(err, UrlscanError::MissingField { field: "uuid" }));

        let response = HttpResponse::new(200, r#"{"uuid":"x","api":""}"#);
        let err = endpoints().parse_submit(response).unwrap_err();
        assert!(matches!(err, UrlscanError::MissingField { field: "api" }));
    }

    #[test]
    fn parse_submit_bad_json() {
        let response = HttpResponse::new(200, "not json");
        let err = endpoints().parse_submit(response).unwrap_err();
        assert!(matches!(err, UrlscanError::Decode { status: 200, .. }));
    }

    #[test]
    fn build_result_produces_correct_request() {
        let req = endpoints().build_result("0e37e828-a9d9-45c0-ac50-1ca579b86c72");
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(
            req.url,
            "https://urlscan.io/api/v1/result/0e37e828-a9d9-45c0-ac50-1ca579b86c72/"
        );
        assert!(req.body.is_none());
    }

    #[test]
    fn parse_result_classifies_statuses() {
        let e = endpoints();
        let ready = e
            .parse_result(HttpResponse::new(200, r#"{"page":{"url":"https://example.com/"}}"#))
            .unwrap();
        match ready {
            PollOutcome::Ready(report) => assert_eq!(report.page().unwrap().url, "https://example.com/"),
            other => panic!("expected Ready, got {other:?}"),
        }

        let pending = e
            .parse_result(HttpResponse::new(404, r#"{"message":"Scan is not finished yet","status":404}"#))
            .unwrap();
        assert_eq!(pending, PollOutcome::NotReady { status: 404 });

        let unavailable = e
            .parse_result(HttpResponse::new(503, r#"{"message":"maintenance"}"#))
            .unwrap();
        assert_eq!(unavailable, PollOutcome::NotReady { status: 503 });

        let rejected = e
            .parse_result(HttpResponse::new(400, r#"{"message":"Invalid UUID","status":400}"#))
            .unwrap();
        assert_eq!(
            rejected,
            PollOutcome::Rejected { status: 400, message: "Invalid UUID".to_string() }
        );
    }

    #[test]
    fn parse_result_bad_json_is_fatal() {
        let err = endpoints()
            .parse_result(HttpResponse::new(404, "<html>Not Found</html>"))
            .unwrap_err();
        assert!(matches!(err, UrlscanError::Decode { status: 404, .. }));
    }

    #[test]
    fn build_search_encodes_only_set_fields() {
        let req = endpoints().build_search(&SearchQuery::new().query("domain:example.com"));
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "https://urlscan.io/api/v1/search/");
        assert_eq!(req.query, vec![("q".to_string(), "domain:example.com".to_string())]);
        assert_eq!(req.header(API_KEY_HEADER), Some("test-key"));

        let req = endpoints().build_search(&SearchQuery::new().size(1).offset(0));
        assert_eq!(
            req.query,
            vec![("size".to_string(), "1".to_string()), ("offset".to_string(), "0".to_string())]
        );
    }

    #[test]
    fn parse_search_success() {
        let response = HttpResponse::new(
            200,
            r#"{"results":[{"_id":"a1","page":{"url":"https://example.com"},"task":{"visibility":"public"}}],"total":1}"#,
        );
        let found = endpoints().parse_search(response).unwrap();
        assert_eq!(found.total, 1);
        assert_eq!(found.results[0].id, "a1");
        assert_eq!(found.results[0].task.visibility, "public");
    }

    #[test]
    fn parse_search_tolerates_nulls_in_hits() {
        let response = HttpResponse::new(
            200,
            r#"{"results":[{"_id":"a1","page":{"url":"https://a.example","server":null,"ptr":null}},{"_id":"b2","stats":null}],"total":2}"#,
        );
        let found = endpoints().parse_search(response).unwrap();
        assert_eq!(found.total, 2);
        assert_eq!(found.results.len(), 2);
        assert_eq!(found.results[0].page.url, "https://a.example");
        assert_eq!(found.results[0].page.server, "");
        assert_eq!(found.results[1].id, "b2");
        assert_eq!(found.results[1].stats.requests, 0);
    }

    #[test]
    fn parse_search_drops_malformed_hit() {
        let response = HttpResponse::new(
            200,
            r#"{"results":[{"_id":"a1"},{"_id":["not","a","string"]},"junk",{"_id":"c3"}],"total":null}"#,
        );
        let found = endpoints().parse_search(response).unwrap();
        let ids: Vec<&str> = found.results.iter().map(|hit| hit.id.as_str()).collect();
        assert_eq!(ids, ["a1", "c3"]);
        assert_eq!(found.total, 0);
    }

    #[test]
    fn parse_result_keeps_raw_nulls() {
        let response = HttpResponse::new(200, r#"{"page":{"domain":"a.example","ptr":null}}"#);
        let PollOutcome::Ready(report) = endpoints().parse_result(response).unwrap() else {
            panic!("expected Ready");
        };
        assert_eq!(report.pointer("/page/ptr"), Some(&serde_json::Value::Null));
        assert_eq!(report.page().unwrap().domain, "a.example");
    }

    #[test]
    fn parse_search_wrong_status() {
        let response = HttpResponse::new(400, r#"{"message":"Invalid query","status":400}"#);
        let err = endpoints().parse_search(response).unwrap_err();
        assert!(matches!(err, UrlscanError::Rejected { status: 400, .. }));
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let e = Endpoints::new("http://localhost:3000/api/v1/", ApiKey::new("k"));
        assert_eq!(e.build_result("abc").url, "http://localhost:3000/api/v1/result/abc/");
    }
}
