use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use serde::Deserialize;

const MAX_CLOCK_SKEW_SECONDS: i64 = 60;

#[derive(Debug, Clone)]
pub(super) struct VerifiedIdentity {
    pub(super) subject: String,
}

#[derive(Debug, Clone)]
pub(super) enum IdentityError {
    InvalidToken { message: &'static str },
    UpstreamUnavailable { message: &'static str },
}

#[derive(Debug, Deserialize)]
struct IdentityClaims {
    sub: String,
    iat: i64,
}

#[derive(Debug, Deserialize)]
struct JwksDocument {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: String,
    alg: Option<String>,
    kty: String,
    n: String,
    e: String,
    #[serde(default, rename = "use")]
    use_: Option<String>,
}

pub(super) async fn verify_identity_token(
    http_client: &reqwest::Client,
    jwks_url: &str,
    expected_issuer: &str,
    expected_audience: &str,
    identity_token: &str,
) -> Result<VerifiedIdentity, IdentityError> {
    if identity_token.trim().is_empty() {
        return Err(IdentityError::InvalidToken {
            message: "identity token is required",
        });
    }

    let header = decode_header(identity_token).map_err(|_| IdentityError::InvalidToken {
        message: "identity token is malformed",
    })?;

    if header.alg != Algorithm::RS256 {
        return Err(IdentityError::InvalidToken {
            message: "identity token algorithm is unsupported",
        });
    }

    let Some(key_id) = header.kid else {
        return Err(IdentityError::InvalidToken {
            message: "identity token key id is missing",
        });
    };

    let jwks: JwksDocument = http_client
        .get(jwks_url)
        .send()
        .await
        .map_err(|_| IdentityError::UpstreamUnavailable {
            message: "unable to reach the JWKS endpoint",
        })?
        .error_for_status()
        .map_err(|_| IdentityError::UpstreamUnavailable {
            message: "JWKS endpoint returned an error",
        })?
        .json()
        .await
        .map_err(|_| IdentityError::UpstreamUnavailable {
            message: "JWKS response was invalid",
        })?;

    verify_identity_token_with_jwks(
        identity_token,
        expected_issuer,
        expected_audience,
        &key_id,
        &jwks,
    )
}

fn verify_identity_token_with_jwks(
    identity_token: &str,
    expected_issuer: &str,
    expected_audience: &str,
    key_id: &str,
    jwks: &JwksDocument,
) -> Result<VerifiedIdentity, IdentityError> {
    let Some(jwk) = jwks.keys.iter().find(|key| {
        key.kid == key_id && key.kty == "RSA" && matches!(key.use_.as_deref(), None | Some("sig"))
    }) else {
        return Err(IdentityError::InvalidToken {
            message: "identity token key was not recognized",
        });
    };

    if jwk.alg.as_deref().unwrap_or("RS256") != "RS256" {
        return Err(IdentityError::InvalidToken {
            message: "identity token key algorithm is unsupported",
        });
    }

    let decoding_key = DecodingKey::from_rsa_components(&jwk.n, &jwk.e).map_err(|_| {
        IdentityError::InvalidToken {
            message: "identity token key was invalid",
        }
    })?;

    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_audience(&[expected_audience]);
    validation.set_issuer(&[expected_issuer]);
    validation.leeway = MAX_CLOCK_SKEW_SECONDS as u64;
    validation.required_spec_claims = ["exp", "iat", "iss", "aud", "sub"]
        .into_iter()
        .map(str::to_string)
        .collect();

    let token_data =
        decode::<IdentityClaims>(identity_token, &decoding_key, &validation).map_err(|err| {
            let message = match err.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => "identity token is expired",
                jsonwebtoken::errors::ErrorKind::InvalidAudience => {
                    "identity token audience does not match"
                }
                jsonwebtoken::errors::ErrorKind::InvalidIssuer => {
                    "identity token issuer is invalid"
                }
                _ => "identity token validation failed",
            };
            IdentityError::InvalidToken { message }
        })?;

    let now = Utc::now().timestamp();
    if token_data.claims.iat > now + MAX_CLOCK_SKEW_SECONDS {
        return Err(IdentityError::InvalidToken {
            message: "identity token issue time is invalid",
        });
    }

    let subject = token_data.claims.sub.trim();
    if subject.is_empty() {
        return Err(IdentityError::InvalidToken {
            message: "identity token subject is missing",
        });
    }

    Ok(VerifiedIdentity {
        subject: subject.to_string(),
    })
}
