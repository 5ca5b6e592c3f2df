//! Page/limit validation and next-page links shared by every list endpoint.

use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, OriginalUri},
    http::{HeaderMap, header, request::Parts},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::AppError;

pub const DEFAULT_PAGE: &str = "1";
pub const DEFAULT_LIMIT: &str = "10";

/// A validated page request. Both fields are strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
}

impl Pagination {
    /// Rows to skip; `validate_pagination` guarantees this does not overflow.
    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }
}

/// Raw `?page=&limit=` query parameters.
///
/// Missing values take the defaults here, before validation, so every list
/// endpoint treats an absent parameter the same way.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl PageParams {
    pub fn resolve(&self) -> Result<Pagination, AppError> {
        validate_pagination(
            self.page.as_deref().unwrap_or(DEFAULT_PAGE),
            self.limit.as_deref().unwrap_or(DEFAULT_LIMIT),
        )
    }
}

/// Parses page and limit as base-10 integers and rejects non-positive values.
pub fn validate_pagination(page: &str, limit: &str) -> Result<Pagination, AppError> {
    let (page, limit) = match (page.trim().parse::<i64>(), limit.trim().parse::<i64>()) {
        (Ok(page), Ok(limit)) => (page, limit),
        _ => {
            return Err(AppError::BadRequest(
                "Page and limit must be numbers".to_string(),
            ));
        }
    };

    if page <= 0 || limit <= 0 {
        return Err(AppError::BadRequest(
            "Page and limit must be positive integers".to_string(),
        ));
    }

    if (page - 1).checked_mul(limit).is_none() {
        return Err(AppError::BadRequest("Page is out of range".to_string()));
    }

    Ok(Pagination { page, limit })
}

/// One page of rows together with the numbers needed to describe it.
#[derive(Debug)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub pagination: Pagination,
}

impl<T> Paged<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paged<U> {
        Paged {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            pagination: self.pagination,
        }
    }

    pub fn meta(&self, request: &RequestUrl) -> PageMeta {
        PageMeta::new(self.total, self.pagination, request)
    }
}

/// `ceil(total / limit)`.
pub fn total_pages(total: i64, limit: i64) -> i64 {
    if total <= 0 {
        0
    } else {
        (total - 1) / limit + 1
    }
}

/// The page after `page`, if there is one.
pub fn next_page(page: i64, total: i64, limit: i64) -> Option<i64> {
    (page < total_pages(total, limit)).then_some(page + 1)
}

/// The parts of the incoming request needed to rebuild its URL.
#[derive(Debug, Clone)]
pub struct RequestUrl {
    pub scheme: String,
    pub host: String,
    pub path: String,
    pub query: Option<String>,
}

impl RequestUrl {
    fn from_parts(parts: &Parts) -> Self {
        // Nested routers strip their prefix from `parts.uri`.
        let uri = parts
            .extensions
            .get::<OriginalUri>()
            .map(|original| original.0.clone())
            .unwrap_or_else(|| parts.uri.clone());

        Self {
            scheme: forwarded_proto(&parts.headers).unwrap_or_else(|| "http".to_string()),
            host: parts
                .headers
                .get(header::HOST)
                .and_then(|value| value.to_str().ok())
                .or_else(|| uri.authority().map(|a| a.as_str()))
                .unwrap_or("localhost")
                .to_string(),
            path: uri.path().to_string(),
            query: uri.query().map(str::to_string),
        }
    }
}

fn forwarded_proto(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-proto")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_ascii_lowercase())
        .filter(|value| value == "http" || value == "https")
}

impl<S> FromRequestParts<S> for RequestUrl
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(RequestUrl::from_parts(parts))
    }
}

/// Builds the URL of the next page, keeping every other query parameter.
///
/// `page` and `limit` are overwritten where they first appear (later
/// duplicates are dropped) or appended when absent.
pub fn next_page_url(next_page: Option<i64>, page_size: i64, request: &RequestUrl) -> Option<String> {
    let next_page = next_page?;

    let mut url = match Url::parse(&format!("{}://{}{}", request.scheme, request.host, request.path)) {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!("Cannot rebuild request URL for pagination: {}", e);
            return None;
        }
    };

    let existing: Vec<(String, String)> = request
        .query
        .as_deref()
        .map(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .into_owned()
                .collect()
        })
        .unwrap_or_default();

    let next_page = next_page.to_string();
    let page_size = page_size.to_string();
    let mut seen_page = false;
    let mut seen_limit = false;
    let mut pairs: Vec<(String, String)> = Vec::with_capacity(existing.len() + 2);

    for (key, value) in existing {
        match key.as_str() {
            "page" if seen_page => continue,
            "page" => {
                seen_page = true;
                pairs.push((key, next_page.clone()));
            }
            "limit" if seen_limit => continue,
            "limit" => {
                seen_limit = true;
                pairs.push((key, page_size.clone()));
            }
            _ => pairs.push((key, value)),
        }
    }
    if !seen_page {
        pairs.push(("page".to_string(), next_page));
    }
    if !seen_limit {
        pairs.push(("limit".to_string(), page_size));
    }

    url.query_pairs_mut().clear().extend_pairs(pairs);
    Some(url.to_string())
}

/// `{total, page, pageSize, nextPage}` header of every list response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    /// URL of the next page, or `null` on the last one.
    pub next_page: Option<String>,
}

impl PageMeta {
    pub fn new(total: i64, pagination: Pagination, request: &RequestUrl) -> Self {
        let next = next_page(pagination.page, total, pagination.limit);
        Self {
            total,
            page: pagination.page,
            page_size: pagination.limit,
            next_page: next_page_url(next, pagination.limit, request),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(query: Option<&str>) -> RequestUrl {
        RequestUrl {
            scheme: "http".to_string(),
            host: "blog.test:8080".to_string(),
            path: "/posts/search".to_string(),
            query: query.map(str::to_string),
        }
    }

    #[test]
    fn rejects_zero_and_accepts_positive() {
        assert!(matches!(
            validate_pagination("0", "10"),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            validate_pagination("1", "0"),
            Err(AppError::BadRequest(_))
        ));
        assert_eq!(
            validate_pagination("2", "5").unwrap(),
            Pagination { page: 2, limit: 5 }
        );
    }

    #[test]
    fn rejects_non_numeric() {
        match validate_pagination("abc", "10") {
            Err(AppError::BadRequest(msg)) => assert_eq!(msg, "Page and limit must be numbers"),
            other => panic!("unexpected: {:?}", other),
        }
        assert!(validate_pagination("1", "5x").is_err());
        assert!(validate_pagination("-3", "5").is_err());
    }

    #[test]
    fn rejects_overflowing_offset() {
        assert!(validate_pagination(&i64::MAX.to_string(), "2").is_err());
    }

    #[test]
    fn defaults_apply_before_validation() {
        let resolved = PageParams::default().resolve().unwrap();
        assert_eq!(resolved, Pagination { page: 1, limit: 10 });
        assert_eq!(resolved.offset(), 0);

        let params = PageParams {
            page: Some("3".into()),
            limit: None,
        };
        assert_eq!(params.resolve().unwrap().offset(), 20);
    }

    #[test]
    fn page_math() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
        assert_eq!(next_page(1, 11, 10), Some(2));
        assert_eq!(next_page(2, 11, 10), None);
        assert_eq!(next_page(1, 0, 10), None);
    }

    #[test]
    fn next_url_is_none_without_next_page() {
        assert_eq!(next_page_url(None, 10, &request(None)), None);
    }

    #[test]
    fn next_url_overwrites_paging_and_keeps_other_params() {
        let url = next_page_url(Some(3), 5, &request(Some("title=rust&page=2&limit=5&content=x")))
            .unwrap();
        assert_eq!(
            url,
            "http://blog.test:8080/posts/search?title=rust&page=3&limit=5&content=x"
        );
    }

    #[test]
    fn next_url_appends_missing_params() {
        let url = next_page_url(Some(2), 10, &request(Some("title=a+b"))).unwrap();
        assert_eq!(
            url,
            "http://blog.test:8080/posts/search?title=a+b&page=2&limit=10"
        );
    }

    fn parts(uri: &str, headers: &[(&str, &str)]) -> Parts {
        let mut builder = axum::http::Request::builder().uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn request_url_prefers_original_uri_and_forwarded_proto() {
        // What a nested router sees: prefix stripped, original kept aside.
        let mut parts = parts(
            "/search?title=rust",
            &[("host", "blog.test"), ("x-forwarded-proto", "HTTPS, http")],
        );
        parts
            .extensions
            .insert(OriginalUri("/posts/search?title=rust".parse().unwrap()));

        let url = RequestUrl::from_parts(&parts);
        assert_eq!(url.scheme, "https");
        assert_eq!(url.host, "blog.test");
        assert_eq!(url.path, "/posts/search");
        assert_eq!(url.query.as_deref(), Some("title=rust"));
        assert_eq!(
            next_page_url(Some(2), 10, &url).unwrap(),
            "https://blog.test/posts/search?title=rust&page=2&limit=10"
        );
    }

    #[test]
    fn request_url_falls_back_to_http_and_request_uri() {
        let parts = parts(
            "/posts",
            &[("host", "127.0.0.1:3000"), ("x-forwarded-proto", "gopher")],
        );

        let url = RequestUrl::from_parts(&parts);
        assert_eq!(url.scheme, "http");
        assert_eq!(url.host, "127.0.0.1:3000");
        assert_eq!(url.path, "/posts");
        assert_eq!(url.query, None);
    }
}
