use anyhow::{anyhow, Context};
use serde_json::json;

#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Unknown error: {0}")]
    Unknown(String),

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Permission denied")]
    PermissionDenied,

    #[error("Text must not be empty")]
    EmptyText,

    #[error("Null byte in string is not allowed {0:?}")]
    NullByteInString(String),

    #[error("Missing required field {0}")]
    MissingField(String),

    /// Input the server refused without saying which field is at fault
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found")]
    NotFound,
}

impl Error {
    pub fn status_code(&self) -> http::StatusCode {
        use http::StatusCode;
        match self {
            Error::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::NotAuthenticated => StatusCode::UNAUTHORIZED,
            Error::PermissionDenied => StatusCode::FORBIDDEN,
            Error::EmptyText => StatusCode::BAD_REQUEST,
            Error::NullByteInString(_) => StatusCode::BAD_REQUEST,
            Error::MissingField(_) => StatusCode::BAD_REQUEST,
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::NotFound => StatusCode::NOT_FOUND,
        }
    }

    pub fn contents(&self) -> Vec<u8> {
        serde_json::to_vec(&match self {
            Error::Unknown(msg) => json!({
                "message": msg,
                "type": "unknown",
            }),
            Error::NotAuthenticated => json!({
                "message": "authentication required",
                "type": "not-authenticated",
            }),
            Error::PermissionDenied => json!({
                "message": "permission denied",
                "type": "permission-denied",
            }),
            Error::EmptyText => json!({
                "message": "text must not be empty",
                "type": "empty-text",
            }),
            Error::NullByteInString(s) => json!({
                "message": "there was a null byte in argument string",
                "type": "null-byte",
                "string": s,
            }),
            Error::MissingField(f) => json!({
                "message": "a required field is missing",
                "type": "missing-field",
                "field": f,
            }),
            Error::InvalidInput(msg) => json!({
                "message": msg,
                "type": "invalid-input",
            }),
            Error::NotFound => json!({
                "message": "not found",
                "type": "not-found",
            }),
        })
        .expect("serializing error")
    }

    pub fn parse(body: &[u8]) -> anyhow::Result<Error> {
        let data: serde_json::Value =
            serde_json::from_slice(body).context("parsing error contents")?;
        Ok(
            match data
                .get("type")
                .and_then(|t| t.as_str())
                .ok_or_else(|| anyhow!("error type is not a string"))?
            {
                "unknown" => Error::Unknown(String::from(
                    data.get("message")
                        .and_then(|msg| msg.as_str())
                        .unwrap_or(""),
                )),
                "not-authenticated" => Error::NotAuthenticated,
                "permission-denied" => Error::PermissionDenied,
                "empty-text" => Error::EmptyText,
                "null-byte" => Error::NullByteInString(String::from(
                    data.get("string").and_then(|s| s.as_str()).ok_or_else(|| {
                        anyhow!("error is a null-byte-in-string without a string")
                    })?,
                )),
                "missing-field" => Error::MissingField(String::from(
                    data.get("field")
                        .and_then(|f| f.as_str())
                        .ok_or_else(|| anyhow!("error is a missing field without a field"))?,
                )),
                "invalid-input" => Error::InvalidInput(String::from(
                    data.get("message")
                        .and_then(|msg| msg.as_str())
                        .unwrap_or(""),
                )),
                "not-found" => Error::NotFound,
                _ => return Err(anyhow!("error contents has unknown type")),
            },
        )
    }

    /// Interpret a non-success response, falling back on the status code
    /// when the body is not one of our structured errors (eg. `{"error": "..."}`)
    pub fn from_response(status: http::StatusCode, body: &[u8]) -> Error {
        use http::StatusCode;
        if let Ok(err) = Error::parse(body) {
            return err;
        }
        let message = serde_json::from_slice::<serde_json::Value>(body)
            .ok()
            .and_then(|v| {
                v.get("error")
                    .or_else(|| v.get("message"))
                    .and_then(|m| m.as_str())
                    .map(String::from)
            })
            .unwrap_or_else(|| String::from_utf8_lossy(body).into_owned());
        match status {
            StatusCode::UNAUTHORIZED => Error::NotAuthenticated,
            StatusCode::FORBIDDEN => Error::PermissionDenied,
            StatusCode::NOT_FOUND => Error::NotFound,
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                Error::InvalidInput(message)
            }
            _ => Error::Unknown(format!("{status}: {message}")),
        }
    }

    /// Whether this error comes from the caller's input rather than from
    /// who the caller is or from the server
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::EmptyText
                | Error::NullByteInString(_)
                | Error::MissingField(_)
                | Error::InvalidInput(_)
        )
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, Error::NotAuthenticated | Error::PermissionDenied)
    }
}
