use std::sync::OnceLock;

use api_server::http::IdentityConfig;
use axum::routing::get;
use axum::{Json, Router};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use rand::thread_rng;
use rsa::RsaPrivateKey;
use rsa::pkcs8::EncodePrivateKey;
use rsa::traits::PublicKeyParts;
use serde_json::{Value, json};

const KEY_ID: &str = "stub-rsa-1";
const ISSUER: &str = "https://identity.example.test";
const AUDIENCE: &str = "transcript-api";
const TOKEN_TTL_MINUTES: i64 = 5;

/// Stand-in identity provider: serves a JWKS document over loopback HTTP and
/// mints RS256 bearer headers signed with the matching key.
pub struct IdentityProvider {
    jwks_url: String,
    server: tokio::task::JoinHandle<()>,
}

struct SigningKey {
    encoding: EncodingKey,
    jwks: Value,
}

impl IdentityProvider {
    pub async fn spawn() -> Self {
        let jwks = signing_key().jwks.clone();
        let app = Router::new().route(
            "/.well-known/jwks.json",
            get(move || {
                let jwks = jwks.clone();
                async move { Json(jwks) }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("jwks listener binds");
        let addr = listener.local_addr().expect("jwks listener has an address");
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("jwks server runs");
        });

        Self {
            jwks_url: format!("http://{addr}/.well-known/jwks.json"),
            server,
        }
    }

    /// Identity settings the router under test verifies against.
    pub fn config(&self) -> IdentityConfig {
        IdentityConfig {
            issuer: ISSUER.to_string(),
            audience: AUDIENCE.to_string(),
            jwks_url: self.jwks_url.clone(),
        }
    }

    pub fn bearer(&self, subject: &str) -> String {
        self.mint(subject, AUDIENCE, Duration::minutes(TOKEN_TTL_MINUTES))
    }

    pub fn expired_bearer(&self, subject: &str) -> String {
        self.mint(subject, AUDIENCE, Duration::minutes(-TOKEN_TTL_MINUTES))
    }

    pub fn bearer_for_audience(&self, subject: &str, audience: &str) -> String {
        self.mint(subject, audience, Duration::minutes(TOKEN_TTL_MINUTES))
    }

    fn mint(&self, subject: &str, audience: &str, ttl: Duration) -> String {
        let now = Utc::now();
        let claims = json!({
            "sub": subject,
            "iss": ISSUER,
            "aud": audience,
            "iat": (now - Duration::minutes(1)).timestamp(),
            "exp": (now + ttl).timestamp(),
        });

        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(KEY_ID.to_string());
        let token = encode(&header, &claims, &signing_key().encoding).expect("token encodes");

        format!("Bearer {token}")
    }
}

impl Drop for IdentityProvider {
    fn drop(&mut self) {
        self.server.abort();
    }
}

// One key pair per test binary; generating RSA keys per test is too slow.
fn signing_key() -> &'static SigningKey {
    static KEY: OnceLock<SigningKey> = OnceLock::new();
    KEY.get_or_init(|| {
        let private = RsaPrivateKey::new(&mut thread_rng(), 2048).expect("rsa keygen works");
        let public = private.to_public_key();

        let pem = private
            .to_pkcs8_pem(Default::default())
            .expect("rsa key encodes to pem");
        let encoding = EncodingKey::from_rsa_pem(pem.as_bytes()).expect("pem parses back");
        let jwks = json!({
            "keys": [{
                "kid": KEY_ID,
                "kty": "RSA",
                "alg": "RS256",
                "use": "sig",
                "n": URL_SAFE_NO_PAD.encode(public.n().to_bytes_be()),
                "e": URL_SAFE_NO_PAD.encode(public.e().to_bytes_be()),
            }]
        });

        SigningKey { encoding, jwks }
    })
}
