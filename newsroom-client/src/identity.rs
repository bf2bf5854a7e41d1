use std::path::PathBuf;

use anyhow::{anyhow, Context};
use parking_lot::Mutex;

use crate::{
    api::{Author, AuthToken, Claims, Role, UserId},
    Error,
};

/// Where the login token is persisted between sessions
pub trait CredentialStore {
    fn load(&self) -> anyhow::Result<Option<AuthToken>>;
    fn save(&self, token: &AuthToken) -> anyhow::Result<()>;
    fn clear(&self) -> anyhow::Result<()>;
}

/// Token passed through an environment variable. Read-only.
pub struct EnvCredential {
    var: String,
}

impl EnvCredential {
    pub fn new(var: impl Into<String>) -> EnvCredential {
        EnvCredential { var: var.into() }
    }
}

impl CredentialStore for EnvCredential {
    fn load(&self) -> anyhow::Result<Option<AuthToken>> {
        match std::env::var(&self.var) {
            Ok(tok) if !tok.trim().is_empty() => Ok(Some(AuthToken(tok.trim().to_string()))),
            Ok(_) | Err(std::env::VarError::NotPresent) => Ok(None),
            Err(e) => Err(e).with_context(|| format!("reading {} environment variable", self.var)),
        }
    }

    fn save(&self, _token: &AuthToken) -> anyhow::Result<()> {
        Err(anyhow!(
            "cannot persist a token into environment variable {}",
            self.var
        ))
    }

    fn clear(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Token kept in a plain file
pub struct FileCredential {
    path: PathBuf,
}

impl FileCredential {
    pub fn new(path: impl Into<PathBuf>) -> FileCredential {
        FileCredential { path: path.into() }
    }
}

impl CredentialStore for FileCredential {
    fn load(&self) -> anyhow::Result<Option<AuthToken>> {
        match std::fs::read_to_string(&self.path) {
            Ok(tok) if !tok.trim().is_empty() => Ok(Some(AuthToken(tok.trim().to_string()))),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("reading token file {:?}", self.path)),
        }
    }

    fn save(&self, token: &AuthToken) -> anyhow::Result<()> {
        std::fs::write(&self.path, &token.0)
            .with_context(|| format!("writing token file {:?}", self.path))
    }

    fn clear(&self) -> anyhow::Result<()> {
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
                Err(e).with_context(|| format!("removing token file {:?}", self.path))
            }
            _ => Ok(()),
        }
    }
}

#[derive(Default)]
pub struct MemoryCredential(Mutex<Option<AuthToken>>);

impl MemoryCredential {
    pub fn new(token: Option<AuthToken>) -> MemoryCredential {
        MemoryCredential(Mutex::new(token))
    }
}

impl CredentialStore for MemoryCredential {
    fn load(&self) -> anyhow::Result<Option<AuthToken>> {
        Ok(self.0.lock().clone())
    }

    fn save(&self, token: &AuthToken) -> anyhow::Result<()> {
        *self.0.lock() = Some(token.clone());
        Ok(())
    }

    fn clear(&self) -> anyhow::Result<()> {
        *self.0.lock() = None;
        Ok(())
    }
}

/// Who is using the client right now.
///
/// Built once per session and handed to whatever needs to know the actor.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Identity {
    session: Option<(AuthToken, Claims)>,
}

impl Identity {
    pub fn anonymous() -> Identity {
        Identity { session: None }
    }

    pub fn from_token(token: AuthToken) -> anyhow::Result<Identity> {
        let claims = token.claims()?;
        Ok(Identity {
            session: Some((token, claims)),
        })
    }

    /// Read the persisted credential. A token that cannot be decoded is
    /// dropped from the store and the visitor is treated as logged out.
    pub fn from_store(store: &dyn CredentialStore) -> Identity {
        let token = match store.load() {
            Ok(Some(token)) => token,
            Ok(None) => return Identity::anonymous(),
            Err(err) => {
                tracing::warn!(?err, "failed loading stored credential");
                return Identity::anonymous();
            }
        };
        match Identity::from_token(token) {
            Ok(identity) => identity,
            Err(err) => {
                tracing::warn!(?err, "stored credential is invalid, clearing it");
                if let Err(err) = store.clear() {
                    tracing::error!(?err, "failed clearing invalid credential");
                }
                Identity::anonymous()
            }
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.session.is_some()
    }

    pub fn claims(&self) -> Option<&Claims> {
        self.session.as_ref().map(|(_, c)| c)
    }

    pub fn token(&self) -> Option<&AuthToken> {
        self.session.as_ref().map(|(t, _)| t)
    }

    pub fn username(&self) -> Option<&str> {
        self.claims().map(|c| &c.username as &str)
    }

    pub fn email(&self) -> Option<&str> {
        self.claims().map(|c| &c.email as &str)
    }

    pub fn user_id(&self) -> Option<&UserId> {
        self.claims().map(|c| &c.id)
    }

    pub fn role(&self) -> Option<Role> {
        self.claims().map(|c| c.role)
    }

    pub fn is_admin(&self) -> bool {
        self.role() == Some(Role::Admin)
    }

    pub fn author(&self) -> Option<Author> {
        self.claims().map(|c| Author {
            id: c.id.clone(),
            username: c.username.clone(),
            role: c.role,
        })
    }

    /// The credential to attach to a mutating request, or the precondition
    /// failure to report if there is none
    pub fn bearer(&self) -> Result<&AuthToken, Error> {
        self.token().ok_or_else(Error::not_authenticated)
    }
}
