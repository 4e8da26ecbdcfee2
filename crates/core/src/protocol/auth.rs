//! Basic and Digest authentication (RFC 2617, as used by RFC 2326 §12.5).
//!
//! Only the MD5, qop-less Digest variant is implemented: it is what IP
//! cameras send in practice.

use base64::prelude::{BASE64_STANDARD, Engine as _};
use md5::{Digest, Md5};

use super::request::Method;

/// Challenge scheme from the most recent `WWW-Authenticate` header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthScheme {
    #[default]
    None,
    Basic,
    Digest,
}

/// Cached authentication challenge, scoped to one session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthChallenge {
    pub scheme: AuthScheme,
    pub realm: String,
    pub nonce: String,
}

impl AuthChallenge {
    /// Fold a `WWW-Authenticate` header value into this challenge.
    ///
    /// Tokens are split on commas and spaces. `basic` / `digest` pick the
    /// scheme; `realm=` and `nonce=` update the cached values with quotes
    /// stripped. Later occurrences win. Fields the header does not mention
    /// keep their previous value.
    ///
    /// ```
    /// use rtsp_client::protocol::auth::{AuthChallenge, AuthScheme};
    ///
    /// let c = AuthChallenge::default()
    ///     .updated(r#"Digest realm="AXIS_ACCC8E", nonce="0000c3Y8", stale=FALSE"#);
    /// assert_eq!(c.scheme, AuthScheme::Digest);
    /// assert_eq!(c.realm, "AXIS_ACCC8E");
    /// assert_eq!(c.nonce, "0000c3Y8");
    /// ```
    pub fn updated(&self, header: &str) -> AuthChallenge {
        let mut next = self.clone();
        for item in header.split([',', ' ']) {
            if item.eq_ignore_ascii_case("basic") {
                next.scheme = AuthScheme::Basic;
            } else if item.eq_ignore_ascii_case("digest") {
                next.scheme = AuthScheme::Digest;
            } else if let Some((key, value)) = item.split_once('=') {
                let value = value.trim_matches([' ', '"']).to_string();
                match key.trim() {
                    "realm" => next.realm = value,
                    "nonce" => next.nonce = value,
                    _ => {}
                }
            }
        }
        next
    }

    /// Build an `Authorization` value for `method` against this challenge.
    pub fn authorization(
        &self,
        username: &str,
        password: &str,
        method: Method,
        uri: &str,
    ) -> Option<String> {
        build_authorization(
            self.scheme,
            username,
            password,
            &self.realm,
            &self.nonce,
            method,
            uri,
        )
    }
}

/// Compute an `Authorization` header value.
///
/// Returns `None` when the inputs cannot produce one: empty username,
/// password or realm, an empty nonce for Digest, or no scheme at all. The
/// caller then has nothing to send but an unauthenticated request.
pub fn build_authorization(
    scheme: AuthScheme,
    username: &str,
    password: &str,
    realm: &str,
    nonce: &str,
    method: Method,
    uri: &str,
) -> Option<String> {
    if username.is_empty() || password.is_empty() || realm.is_empty() {
        return None;
    }

    match scheme {
        AuthScheme::None => None,
        AuthScheme::Basic => {
            let credentials = BASE64_STANDARD.encode(format!("{username}:{password}"));
            Some(format!("Basic {credentials}"))
        }
        AuthScheme::Digest => {
            if nonce.is_empty() {
                return None;
            }
            let ha1 = md5_hex(&format!("{username}:{realm}:{password}"));
            let ha2 = md5_hex(&format!("{method}:{uri}"));
            let response = md5_hex(&format!("{ha1}:{nonce}:{ha2}"));
            Some(format!(
                "Digest username=\"{username}\", realm=\"{realm}\", nonce=\"{nonce}\", uri=\"{uri}\", response=\"{response}\""
            ))
        }
    }
}

fn md5_hex(input: &str) -> String {
    format!("{:x}", Md5::digest(input.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "rtsp://192.168.1.10/axis-media/media.amp";

    #[test]
    fn basic_decodes_to_credentials() {
        for (user, pass) in [("admin", "password"), ("u", "p:with:colons"), ("ünï", "çødé")] {
            let header =
                build_authorization(AuthScheme::Basic, user, pass, "cam", "", Method::Describe, URL)
                    .unwrap();
            let encoded = header.strip_prefix("Basic ").unwrap();
            let decoded = BASE64_STANDARD.decode(encoded).unwrap();
            assert_eq!(String::from_utf8(decoded).unwrap(), format!("{user}:{pass}"));
        }
    }

    #[test]
    fn digest_matches_independent_computation() {
        let header = build_authorization(
            AuthScheme::Digest,
            "admin",
            "secret",
            "AXIS_WS",
            "000057c3Y8",
            Method::Setup,
            URL,
        )
        .unwrap();

        let ha1 = format!("{:x}", Md5::digest(b"admin:AXIS_WS:secret"));
        let ha2 = format!("{:x}", Md5::digest(format!("SETUP:{URL}").as_bytes()));
        let response = format!("{:x}", Md5::digest(format!("{ha1}:000057c3Y8:{ha2}").as_bytes()));

        assert_eq!(
            header,
            format!(
                "Digest username=\"admin\", realm=\"AXIS_WS\", nonce=\"000057c3Y8\", uri=\"{URL}\", response=\"{response}\""
            )
        );
        assert_eq!(response.len(), 32);
        assert!(response.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn digest_rfc2617_style_vector() {
        // HA1/HA2 of "Mufasa:testrealm@host.com:Circle Of Life" and "GET:/dir/index.html".
        let header = build_authorization(
            AuthScheme::Digest,
            "Mufasa",
            "Circle Of Life",
            "testrealm@host.com",
            "dcd98b7102dd2f0e8b11d0f600bfb0c093",
            Method::Describe,
            "/dir/index.html",
        )
        .unwrap();
        let ha1 = "939e7578ed9e3c518a452acee763bce9";
        assert_eq!(md5_hex("Mufasa:testrealm@host.com:Circle Of Life"), ha1);
        assert!(header.contains("username=\"Mufasa\""));
    }

    #[test]
    fn missing_inputs_yield_no_header() {
        let digest = |user: &str, pass: &str, realm: &str, nonce: &str| {
            build_authorization(AuthScheme::Digest, user, pass, realm, nonce, Method::Play, URL)
        };
        assert!(digest("u", "p", "r", "").is_none());
        assert!(digest("", "p", "r", "n").is_none());
        assert!(digest("u", "", "r", "n").is_none());
        assert!(digest("u", "p", "", "n").is_none());
        assert!(
            build_authorization(AuthScheme::None, "u", "p", "r", "n", Method::Play, URL).is_none()
        );
        // Basic needs no nonce.
        assert!(
            build_authorization(AuthScheme::Basic, "u", "p", "r", "", Method::Play, URL).is_some()
        );
    }

    #[test]
    fn parse_basic_challenge() {
        let c = AuthChallenge::default().updated("Basic realm=\"AProxy\"");
        assert_eq!(c.scheme, AuthScheme::Basic);
        assert_eq!(c.realm, "AProxy");
        assert_eq!(c.nonce, "");
    }

    #[test]
    fn scheme_token_is_case_insensitive() {
        assert_eq!(
            AuthChallenge::default().updated("DIGEST realm=\"r\"").scheme,
            AuthScheme::Digest
        );
    }

    #[test]
    fn later_values_overwrite_earlier() {
        let c = AuthChallenge::default()
            .updated("Digest realm=\"one\", nonce=\"a\", realm=\"two\", nonce=\"b\"");
        assert_eq!(c.realm, "two");
        assert_eq!(c.nonce, "b");
    }

    #[test]
    fn new_challenge_supersedes_cached_one() {
        let first = AuthChallenge::default().updated("Digest realm=\"cam\", nonce=\"old\"");
        let second = first.updated("Digest nonce=\"new\"");
        assert_eq!(second.realm, "cam");
        assert_eq!(second.nonce, "new");
        assert_eq!(first.nonce, "old");
    }
}
