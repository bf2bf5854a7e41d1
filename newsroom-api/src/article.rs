use std::fmt;

use crate::{Error, Time, UserId};

#[derive(
    Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
#[serde(transparent)]
pub struct ArticleId(pub String);

impl fmt::Display for ArticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    #[serde(rename = "_id")]
    pub id: ArticleId,
    pub title: String,
    #[serde(rename = "content")]
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    /// Region the article is filed under
    pub state: String,
    /// Locality within `state`
    pub city: String,
    pub category: String,

    pub author: UserId,
    pub published_at: Time,

    /// Users who liked this article, in the order the server recorded them
    #[serde(default)]
    pub likes: Vec<UserId>,
    #[serde(default)]
    pub dislikes: Vec<UserId>,
}

/// Editable fields of an article, as sent on `PUT articles/{id}`
#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleUpdate {
    pub title: String,
    #[serde(rename = "content")]
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub state: String,
    pub city: String,
    pub category: String,
}

impl From<&Article> for ArticleUpdate {
    fn from(a: &Article) -> ArticleUpdate {
        ArticleUpdate {
            title: a.title.clone(),
            body: a.body.clone(),
            image_url: a.image_url.clone(),
            state: a.state.clone(),
            city: a.city.clone(),
            category: a.category.clone(),
        }
    }
}

impl ArticleUpdate {
    pub fn validate(&self) -> Result<(), Error> {
        for (name, value) in [
            ("title", &self.title),
            ("content", &self.body),
            ("state", &self.state),
            ("city", &self.city),
            ("category", &self.category),
        ] {
            if value.trim().is_empty() {
                return Err(Error::MissingField(String::from(name)));
            }
            crate::validate_string(value)?;
        }
        if let Some(url) = &self.image_url {
            crate::validate_string(url)?;
        }
        Ok(())
    }

    /// Overwrite the editable fields of `article` with this update
    pub fn apply_to(&self, article: &mut Article) {
        article.title = self.title.clone();
        article.body = self.body.clone();
        article.image_url = self.image_url.clone().filter(|u| !u.is_empty());
        article.state = self.state.clone();
        article.city = self.city.clone();
        article.category = self.category.clone();
    }
}
