use axum::http::header::{CONTENT_TYPE, ETAG, IF_NONE_MATCH};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use lazy_static::lazy_static;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

const ICON: &[u8] = include_bytes!("../../assets/favicon.ico");

lazy_static! {
    static ref ICON_ETAG: String = {
        let mut hasher = DefaultHasher::new();
        ICON.hash(&mut hasher);
        format!("\"{:016x}\"", hasher.finish())
    };
}

#[allow(clippy::unused_async)]
pub(super) async fn serve(headers: HeaderMap) -> Response {
    let etag = ICON_ETAG.as_str();
    let fresh = headers
        .get(IF_NONE_MATCH)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| {
            value
                .split(',')
                .map(str::trim)
                .any(|tag| tag == "*" || tag.trim_start_matches("W/") == etag)
        });
    if fresh {
        return (StatusCode::NOT_MODIFIED, [(ETAG, etag)]).into_response();
    }
    ([(CONTENT_TYPE, "image/x-icon"), (ETAG, etag)], ICON).into_response()
}
