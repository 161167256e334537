use crate::api::server::AppState;
use crate::config::Users;
use axum::extract::State;
use axum::http::header::{AUTHORIZATION, WWW_AUTHENTICATE};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

const CHALLENGE: &str = r#"Basic realm="DDNS Server""#;

/// Require valid basic credentials when users are configured.
pub(super) async fn basic<B>(
    State(state): State<AppState>,
    request: Request<B>,
    next: Next<B>,
) -> Response {
    let Some(users) = &state.config.server.users else {
        return next.run(request).await;
    };
    if authorized(users, request.headers()) {
        return next.run(request).await;
    }
    tracing::debug!("rejected unauthenticated request for {}", request.uri());
    (StatusCode::UNAUTHORIZED, [(WWW_AUTHENTICATE, CHALLENGE)]).into_response()
}

fn authorized(users: &Users, headers: &HeaderMap) -> bool {
    credentials(headers).is_some_and(|(user, password)| users.authenticate(&user, &password))
}

fn credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = String::from_utf8(STANDARD.decode(encoded.trim()).ok()?).ok()?;
    let (user, password) = decoded.split_once(':')?;
    Some((user.to_string(), password.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn with_auth(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn decodes_basic_credentials() {
        // alice:se:cret
        let headers = with_auth("Basic YWxpY2U6c2U6Y3JldA==");
        assert_eq!(
            credentials(&headers),
            Some(("alice".to_string(), "se:cret".to_string()))
        );
        assert!(authorized(&Users::from([("alice", "se:cret")]), &headers));
        assert!(!authorized(&Users::from([("alice", "secret")]), &headers));
    }

    #[test]
    fn rejects_other_schemes_and_garbage() {
        assert_eq!(credentials(&with_auth("Bearer YWxpY2U6c2VjcmV0")), None);
        assert_eq!(credentials(&with_auth("Basic !!!")), None);
        assert_eq!(credentials(&HeaderMap::new()), None);
    }
}
