//! Declarative call descriptions and the request model builder.
//!
//! # Design
//! A `CallDescription` says what the caller wants (route, body, query,
//! headers, content type, auth). `build` turns it into a ready-to-send
//! `HttpRequest` and never fails: odd input yields a best-effort request.
//!
//! Bodies are encoded per content type:
//! - JSON: `Content-Type: application/json`, body is JSON text.
//! - URL-encoded: `Content-Type: application/x-www-form-urlencoded`, body is
//!   the value's own fields encoded like a query string.
//! - Multipart: the value is flattened into `key[index]` / `key[child]`
//!   fields. The transport writes the multipart `Content-Type` itself.
//!
//! An absent query stays `None` in the built request; an explicitly empty
//! one becomes an empty `QueryParams`.

use tracing::warn;

use crate::body::Body;
use crate::http::{FormField, FormValue, Headers, HttpMethod, HttpRequest, QueryParams, RequestBody};

pub const CONTENT_TYPE: &str = "Content-Type";

/// Path appended to the base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Appended after a single `/`.
    Path(String),
    /// Joined with `/` and appended after a single `/`.
    Segments(Vec<String>),
}

impl From<&str> for Route {
    fn from(value: &str) -> Self {
        Route::Path(value.to_string())
    }
}

impl From<String> for Route {
    fn from(value: String) -> Self {
        Route::Path(value)
    }
}

impl From<Vec<String>> for Route {
    fn from(value: Vec<String>) -> Self {
        Route::Segments(value)
    }
}

impl From<Vec<&str>> for Route {
    fn from(value: Vec<&str>) -> Self {
        Route::Segments(value.into_iter().map(str::to_string).collect())
    }
}

/// Body encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ContentType {
    #[default]
    Json,
    MultipartForm,
    UrlEncoded,
}

impl ContentType {
    pub fn mime(self) -> &'static str {
        match self {
            ContentType::Json => "application/json",
            ContentType::MultipartForm => "multipart/form-data",
            ContentType::UrlEncoded => "application/x-www-form-urlencoded",
        }
    }
}

/// What the caller wants sent. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallDescription {
    pub route: Option<Route>,
    pub body: Option<Body>,
    pub query: Option<Vec<(String, Body)>>,
    pub headers: Option<Headers>,
    /// Attach the auth token. Defaults to `true`.
    pub auth: Option<bool>,
    /// Defaults to JSON when a body is present.
    pub content_type: Option<ContentType>,
}

impl CallDescription {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, route: impl Into<Route>) -> Self {
        self.route = Some(route.into());
        self
    }

    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Add one query entry, creating the query map if needed.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<Body>) -> Self {
        self.query
            .get_or_insert_with(Vec::new)
            .push((key.into(), value.into()));
        self
    }

    /// Present but empty query map.
    pub fn empty_query(mut self) -> Self {
        self.query.get_or_insert_with(Vec::new);
        self
    }

    pub fn headers(mut self, headers: Headers) -> Self {
        self.headers = Some(headers);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.get_or_insert_with(Headers::new).set(name, value);
        self
    }

    pub fn auth(mut self, auth: bool) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = Some(content_type);
        self
    }
}

/// Build a request for `description` against `base`.
pub fn build(
    method: HttpMethod,
    base: &str,
    description: CallDescription,
    max_depth: usize,
) -> HttpRequest {
    let url = build_url(base, description.route.as_ref());
    let query = description.query.map(|entries| to_params(&entries));
    let mut headers = description.headers;

    let body = description.body.map(|body| {
        let headers = headers.get_or_insert_with(Headers::new);
        match description.content_type.unwrap_or_default() {
            ContentType::Json => {
                headers.set(CONTENT_TYPE, ContentType::Json.mime());
                RequestBody::Json(body.to_json().to_string())
            }
            ContentType::UrlEncoded => {
                headers.set(CONTENT_TYPE, ContentType::UrlEncoded.mime());
                RequestBody::UrlEncoded(to_params(&own_fields(&body)).encode())
            }
            ContentType::MultipartForm => RequestBody::Multipart(form_fields(&body, max_depth)),
        }
    });

    HttpRequest {
        method,
        url,
        headers,
        query,
        body,
        auth: description.auth.unwrap_or(true),
    }
}

/// `base` with `route` appended after a single `/`.
pub fn build_url(base: &str, route: Option<&Route>) -> String {
    match route {
        Some(Route::Path(path)) => format!("{base}/{path}"),
        Some(Route::Segments(segments)) => format!("{base}/{}", segments.join("/")),
        None => base.to_string(),
    }
}

fn to_params(entries: &[(String, Body)]) -> QueryParams {
    let mut params = QueryParams::new();
    for (key, value) in entries {
        params.set(key.clone(), value.form_text());
    }
    params
}

/// Top-level entries of a map, or index-keyed items of a list.
fn own_fields(body: &Body) -> Vec<(String, Body)> {
    match body {
        Body::Map(entries) => entries.clone(),
        Body::List(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| (i.to_string(), item.clone()))
            .collect(),
        _ => Vec::new(),
    }
}

/// Flatten `body` into multipart fields.
pub fn form_fields(body: &Body, max_depth: usize) -> Vec<FormField> {
    let mut fields = Vec::new();
    for (key, value) in own_fields(body) {
        flatten(&mut fields, key, &value, 0, max_depth);
    }
    fields
}

fn flatten(fields: &mut Vec<FormField>, key: String, value: &Body, depth: usize, max_depth: usize) {
    match value {
        Body::List(_) | Body::Map(_) if depth >= max_depth => {
            warn!(field = %key, max_depth, "form nesting too deep; sending subtree as JSON");
            push_text(fields, key, value.to_json().to_string());
        }
        Body::List(items) => {
            for (i, item) in items.iter().enumerate() {
                flatten(fields, format!("{key}[{i}]"), item, depth + 1, max_depth);
            }
        }
        Body::Map(entries) => {
            for (child, item) in entries {
                flatten(fields, format!("{key}[{child}]"), item, depth + 1, max_depth);
            }
        }
        Body::File(file) => fields.push(FormField {
            name: key,
            value: FormValue::File(file.clone()),
        }),
        scalar => push_text(fields, key, scalar.form_text()),
    }
}

fn push_text(fields: &mut Vec<FormField>, name: String, text: String) {
    fields.push(FormField {
        name,
        value: FormValue::Text(text),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::FilePart;
    use serde_json::json;

    const BASE: &str = "http://localhost:3000/api/items";

    fn get(description: CallDescription) -> HttpRequest {
        build(HttpMethod::Get, BASE, description, 32)
    }

    fn text_fields(fields: &[FormField]) -> Vec<(&str, &str)> {
        fields
            .iter()
            .map(|f| match &f.value {
                FormValue::Text(t) => (f.name.as_str(), t.as_str()),
                FormValue::File(file) => (f.name.as_str(), file.file_name.as_str()),
            })
            .collect()
    }

    #[test]
    fn url_without_route_is_base() {
        let req = get(CallDescription::new());
        assert_eq!(req.url, BASE);
        assert_eq!(req.method, HttpMethod::Get);
        assert!(req.auth);
    }

    #[test]
    fn url_with_single_path() {
        let req = get(CallDescription::new().route("42"));
        assert_eq!(req.url, format!("{BASE}/42"));
    }

    #[test]
    fn url_with_segments() {
        let req = get(CallDescription::new().route(vec!["42", "tags", "7"]));
        assert_eq!(req.url, format!("{BASE}/42/tags/7"));
    }

    #[test]
    fn absent_query_allocates_nothing() {
        let req = get(CallDescription::new());
        assert!(req.query.is_none());
        assert!(req.headers.is_none());
        assert!(req.body.is_none());
    }

    #[test]
    fn empty_query_is_kept_distinct_from_absent() {
        let req = get(CallDescription::new().empty_query());
        assert_eq!(req.query, Some(QueryParams::new()));
    }

    #[test]
    fn query_entries_become_pairs() {
        let req = get(CallDescription::new().query("page", 2).query("q", "a b"));
        let query = req.query.unwrap();
        assert_eq!(query.get("page"), Some("2"));
        assert_eq!(query.encode(), "page=2&q=a+b");
    }

    #[test]
    fn headers_without_body_are_left_alone() {
        let req = get(CallDescription::new().header("X-Trace", "1"));
        let headers = req.headers.unwrap();
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get(CONTENT_TYPE), None);
    }

    #[test]
    fn json_is_the_default_encoding() {
        let req = build(
            HttpMethod::Post,
            BASE,
            CallDescription::new().body(json!({"title": "Buy milk", "done": false})),
            32,
        );
        assert_eq!(
            req.headers.as_ref().and_then(|h| h.get(CONTENT_TYPE)),
            Some("application/json")
        );
        let Some(RequestBody::Json(text)) = req.body else {
            panic!("expected JSON body");
        };
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value, json!({"title": "Buy milk", "done": false}));
    }

    #[test]
    fn json_content_type_overrides_a_supplied_one() {
        let req = build(
            HttpMethod::Post,
            BASE,
            CallDescription::new()
                .header("content-type", "text/plain")
                .header("Accept", "application/json")
                .body(json!({})),
            32,
        );
        let headers = req.headers.unwrap();
        assert_eq!(headers.len(), 2);
        assert_eq!(headers.get(CONTENT_TYPE), Some("application/json"));
    }

    #[test]
    fn url_encoded_body_decodes_to_own_fields() {
        let body = json!({"name": "ada lovelace", "age": 36, "admin": true, "note": "a&b=c"});
        let req = build(
            HttpMethod::Post,
            BASE,
            CallDescription::new()
                .body(body.clone())
                .content_type(ContentType::UrlEncoded),
            32,
        );
        assert_eq!(
            req.headers.as_ref().and_then(|h| h.get(CONTENT_TYPE)),
            Some("application/x-www-form-urlencoded")
        );
        let Some(RequestBody::UrlEncoded(text)) = req.body else {
            panic!("expected URL-encoded body");
        };
        let decoded = QueryParams::decode(&text);
        assert_eq!(decoded.len(), 4);
        assert_eq!(decoded.get("name"), Some("ada lovelace"));
        assert_eq!(decoded.get("age"), Some("36"));
        assert_eq!(decoded.get("admin"), Some("true"));
        assert_eq!(decoded.get("note"), Some("a&b=c"));
    }

    #[test]
    fn multipart_flattens_lists_and_maps() {
        let req = build(
            HttpMethod::Post,
            BASE,
            CallDescription::new()
                .body(json!({"a": [1, 2], "b": {"c": "x"}}))
                .content_type(ContentType::MultipartForm),
            32,
        );
        assert_eq!(req.headers, Some(Headers::new()));
        let Some(RequestBody::Multipart(fields)) = req.body else {
            panic!("expected multipart body");
        };
        assert_eq!(
            text_fields(&fields),
            vec![("a[0]", "1"), ("a[1]", "2"), ("b[c]", "x")]
        );
    }

    #[test]
    fn multipart_keeps_files_as_leaves() {
        let file = FilePart::new("cv.pdf", b"%PDF-1.7".to_vec()).with_content_type("application/pdf");
        let body = Body::map()
            .insert("name", "ada")
            .insert("docs", vec![Body::from(file.clone())]);
        let fields = form_fields(&body, 32);
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[1].name, "docs[0]");
        assert_eq!(fields[1].value, FormValue::File(file));
    }

    #[test]
    fn multipart_skips_empty_containers() {
        let fields = form_fields(&Body::from(json!({"a": [], "b": {}, "c": null})), 32);
        assert_eq!(text_fields(&fields), vec![("c", "null")]);
    }

    #[test]
    fn multipart_stops_at_the_depth_cap() {
        let body = Body::from(json!({"a": {"b": {"c": {"d": 1}}}}));
        let fields = form_fields(&body, 2);
        assert_eq!(text_fields(&fields), vec![("a[b][c]", r#"{"d":1}"#)]);
    }

    #[test]
    fn auth_flag_follows_description() {
        assert!(!get(CallDescription::new().auth(false)).auth);
        assert!(get(CallDescription::new().auth(true)).auth);
    }
}
