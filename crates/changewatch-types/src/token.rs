//! Change feed resume tokens.

use bson::{doc, Bson};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque position marker handed out by a change feed.
///
/// The token data is never interpreted. It is only checked for presence and
/// handed back to the feed when a subscription resumes. A token with no data
/// means "start from the feed's current position".
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResumeToken {
    #[serde(rename = "_data", default, skip_serializing_if = "Option::is_none")]
    token_data: Option<Bson>,
}

impl ResumeToken {
    /// Wrap feed-native token data.
    pub fn new(token_data: impl Into<Bson>) -> Self {
        let token_data = match token_data.into() {
            Bson::Null => None,
            data => Some(data),
        };
        Self { token_data }
    }

    /// The empty token.
    pub fn empty() -> Self {
        Self::default()
    }

    /// True when there is no position to resume from.
    pub fn is_empty(&self) -> bool {
        self.token_data.is_none()
    }

    /// The raw token data, if any.
    pub fn token_data(&self) -> Option<&Bson> {
        self.token_data.as_ref()
    }

    /// The token in the `{ _data: ... }` shape change feeds expect back.
    pub fn to_bson(&self) -> Bson {
        match &self.token_data {
            Some(data) => Bson::Document(doc! { "_data": data.clone() }),
            None => Bson::Document(doc! {}),
        }
    }

    /// Stable string form used as a primary key by non-BSON stores.
    ///
    /// This is the canonical Extended JSON rendering of the token data, so two
    /// tokens produce the same key exactly when their data is equal.
    pub fn key(&self) -> String {
        match &self.token_data {
            Some(data) => data.clone().into_canonical_extjson().to_string(),
            None => String::new(),
        }
    }
}

impl From<Bson> for ResumeToken {
    fn from(data: Bson) -> Self {
        Self::new(data)
    }
}

impl fmt::Display for ResumeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.token_data {
            Some(Bson::String(s)) => f.write_str(s),
            Some(other) => write!(f, "{}", other),
            None => f.write_str("<none>"),
        }
    }
}

impl fmt::Debug for ResumeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResumeToken({})", self)
    }
}
