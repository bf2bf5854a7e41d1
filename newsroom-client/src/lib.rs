mod article;
pub use article::{ArticlePanel, ArticleView};

mod error;
pub use error::Error;

pub mod gate;
pub use gate::Controls;

mod gateway;
pub use gateway::{Confirm, Deletion, Gateway};

mod http;
pub use http::HttpGateway;

mod identity;
pub use identity::{CredentialStore, EnvCredential, FileCredential, Identity, MemoryCredential};

mod overlay;
pub use overlay::{EntityKey, Overlay, UiState};

mod store;
pub use store::CommentStore;

pub mod api {
    pub use newsroom_api::*;
}
