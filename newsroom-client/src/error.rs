use crate::api;

/// Everything the engine reports back to the view.
///
/// None of these ever leave local state half-updated: on any error the
/// thread or article stays at its last known-good value.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The input was rejected, either locally before any request was made
    /// or by the server
    #[error("Invalid input: {0}")]
    Validation(api::Error),

    /// The actor is not logged in, or not allowed to do this
    #[error("Not allowed: {0}")]
    Auth(api::Error),

    /// The action makes no sense in the current view state (the matching
    /// control should not have been shown)
    #[error("Action not available: {0}")]
    Unavailable(&'static str),

    /// Network failure or unexpected server answer
    #[error(transparent)]
    Fetch(#[from] anyhow::Error),
}

impl Error {
    pub fn not_authenticated() -> Error {
        Error::Auth(api::Error::NotAuthenticated)
    }

    /// The server-side error this was built from, if any
    pub fn api(&self) -> Option<&api::Error> {
        match self {
            Error::Validation(e) | Error::Auth(e) => Some(e),
            Error::Unavailable(_) => None,
            Error::Fetch(e) => e.downcast_ref(),
        }
    }
}

impl From<api::Error> for Error {
    fn from(e: api::Error) -> Error {
        if e.is_validation() {
            Error::Validation(e)
        } else if e.is_auth() {
            Error::Auth(e)
        } else {
            Error::Fetch(anyhow::Error::new(e))
        }
    }
}
