//! Request classification and credential extraction.
//!
//! # Responsibilities
//! - Decide from the path alone whether a request belongs to the smart git
//!   HTTP transfer protocol
//! - Read the credential from Basic Auth (git) or the Authorization header
//!   (everything else)
//!
//! # Design Decisions
//! - Classification is a pure path match; method and content type are ignored
//! - A missing or unrecognised credential is "no credential", never an error
//! - On git paths a bearer header is ignored: git clients only speak Basic Auth

use std::sync::OnceLock;

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use regex::Regex;

use crate::auth::credential::InboundCredential;

/// Path suffixes of the smart and dumb git HTTP protocols.
const GIT_REQUEST_PATTERN: &str = concat!(
    r"/(git-upload-pack|git-receive-pack|info/refs|HEAD",
    r"|objects/info/alternates|objects/info/http-alternates|objects/info/packs|objects/info/[^/]*",
    r"|objects/[0-9a-f]{2}/[0-9a-f]{38}",
    r"|objects/pack/pack-[0-9a-f]{40}\.pack|objects/pack/pack-[0-9a-f]{40}\.idx)$",
);

/// Header schemes accepted for bearer-style tokens, in priority order.
const TOKEN_SCHEMES: [&str; 2] = ["bearer", "token"];

fn git_request_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(GIT_REQUEST_PATTERN).expect("git request pattern is valid"))
}

/// How a request is authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestClass {
    /// Git transfer protocol; credential travels as Basic Auth.
    GitProtocol,
    /// Anything else; credential travels as a bearer-style header.
    Generic,
}

impl RequestClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestClass::GitProtocol => "git",
            RequestClass::Generic => "generic",
        }
    }
}

/// Classify a request by its path.
pub fn classify(path: &str) -> RequestClass {
    if git_request_regex().is_match(path) {
        RequestClass::GitProtocol
    } else {
        RequestClass::Generic
    }
}

/// Pull the client credential out of the request headers.
pub fn extract_credential(class: RequestClass, headers: &HeaderMap) -> Option<InboundCredential> {
    match class {
        RequestClass::GitProtocol => basic_auth(headers)
            .filter(|(_, password)| !password.is_empty())
            .map(|(username, password)| InboundCredential::basic(username, password)),
        RequestClass::Generic => TOKEN_SCHEMES
            .iter()
            .find_map(|scheme| token_with_scheme(headers, scheme))
            .map(InboundCredential::bearer),
    }
}

/// `Authorization: <scheme> <token>` with a case-insensitive scheme and
/// exactly two space-separated fields.
fn token_with_scheme(headers: &HeaderMap, scheme: &str) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let mut parts = value.split(' ');
    let (prefix, token) = (parts.next()?, parts.next()?);
    if parts.next().is_some() || !prefix.eq_ignore_ascii_case(scheme) || token.is_empty() {
        return None;
    }
    Some(token.to_string())
}

/// Decode `Authorization: Basic <base64(user:password)>`.
fn basic_auth(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(authorization: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(authorization).unwrap());
        headers
    }

    fn basic(user: &str, password: &str) -> HeaderMap {
        headers(&format!("Basic {}", STANDARD.encode(format!("{user}:{password}"))))
    }

    #[test]
    fn test_classify_git_paths() {
        let git = [
            "/org/repo.git/git-upload-pack",
            "/org/repo.git/git-receive-pack",
            "/org/repo.git/info/refs",
            "/org/repo.git/HEAD",
            "/org/repo.git/objects/info/alternates",
            "/org/repo.git/objects/info/http-alternates",
            "/org/repo.git/objects/info/packs",
            "/org/repo.git/objects/info/commit-graph",
            "/org/repo.git/objects/ab/0123456789abcdef0123456789abcdef012345",
            "/org/repo.git/objects/pack/pack-0123456789abcdef0123456789abcdef01234567.pack",
            "/org/repo.git/objects/pack/pack-0123456789abcdef0123456789abcdef01234567.idx",
        ];
        for path in git {
            assert_eq!(classify(path), RequestClass::GitProtocol, "{path}");
        }
    }

    #[test]
    fn test_classify_generic_paths() {
        let generic = [
            "/",
            "/api/v1/namespaces",
            "/repos/org/repo/info/refs/extra",
            "/org/repo.git/git-upload-pack/more",
            "/org/repo.git/objects/zz/0123456789abcdef0123456789abcdef012345",
            "/org/repo.git/objects/pack/pack-short.pack",
            "/user/HEADER",
        ];
        for path in generic {
            assert_eq!(classify(path), RequestClass::Generic, "{path}");
        }
    }

    #[test]
    fn test_bearer_and_token_schemes() {
        for value in ["Bearer abc", "bearer abc", "BEARER abc", "token abc", "Token abc"] {
            let credential = extract_credential(RequestClass::Generic, &headers(value)).unwrap();
            assert_eq!(credential.expose(), "abc", "{value}");
        }
    }

    #[test]
    fn test_malformed_header_is_no_credential() {
        for value in ["Bearer", "Bearer a b", "Basic abc", "abc", "Bearer ", "Bearer  abc"] {
            assert!(
                extract_credential(RequestClass::Generic, &headers(value)).is_none(),
                "{value}"
            );
        }
        assert!(extract_credential(RequestClass::Generic, &HeaderMap::new()).is_none());
    }

    #[test]
    fn test_git_uses_basic_auth_password() {
        let credential =
            extract_credential(RequestClass::GitProtocol, &basic("ignored", "jwt-here")).unwrap();
        assert_eq!(credential.expose(), "jwt-here");
        assert_eq!(credential.basic_username(), Some("ignored"));
    }

    #[test]
    fn test_git_ignores_bearer_header() {
        assert!(extract_credential(RequestClass::GitProtocol, &headers("Bearer abc")).is_none());
    }

    #[test]
    fn test_git_without_password() {
        assert!(extract_credential(RequestClass::GitProtocol, &basic("alice", "")).is_none());
        assert!(extract_credential(RequestClass::GitProtocol, &headers("Basic !!!")).is_none());
        assert!(extract_credential(RequestClass::GitProtocol, &HeaderMap::new()).is_none());
    }

    #[test]
    fn test_password_may_contain_colon() {
        let credential =
            extract_credential(RequestClass::GitProtocol, &basic("x", "a:b:c")).unwrap();
        assert_eq!(credential.expose(), "a:b:c");
    }
}
