use anyhow::{anyhow, Context};

use crate::{Error, Role, UserId};

/// Bearer credential handed out by `POST auth/login`.
///
/// It is JWT-shaped: the client only ever reads the claims, signature
/// verification is the server's job.
#[derive(Clone, Debug, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(transparent)]
pub struct AuthToken(pub String);

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Claims {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

impl AuthToken {
    pub fn claims(&self) -> anyhow::Result<Claims> {
        let mut parts = self.0.split('.');
        let payload = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(_header), Some(payload), Some(_signature), None) => payload,
            _ => return Err(anyhow!("auth token does not have three segments")),
        };
        let payload = base64::decode_config(payload.trim_end_matches('='), base64::URL_SAFE_NO_PAD)
            .context("decoding auth token payload")?;
        serde_json::from_slice(&payload).context("parsing auth token claims")
    }

    /// Build a token carrying `claims` with an empty signature
    pub fn unsigned(claims: &Claims) -> AuthToken {
        let header =
            base64::encode_config(r#"{"alg":"none","typ":"JWT"}"#, base64::URL_SAFE_NO_PAD);
        let payload = base64::encode_config(
            serde_json::to_vec(claims).expect("serializing claims"),
            base64::URL_SAFE_NO_PAD,
        );
        AuthToken(format!("{header}.{payload}."))
    }
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn validate(&self) -> Result<(), Error> {
        if self.email.trim().is_empty() {
            return Err(Error::MissingField(String::from("email")));
        }
        if self.password.is_empty() {
            return Err(Error::MissingField(String::from("password")));
        }
        crate::validate_string(&self.email)?;
        crate::validate_string(&self.password)?;
        Ok(())
    }
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct LoginResponse {
    pub token: AuthToken,
}
