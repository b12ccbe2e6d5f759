use serde::{Deserialize, Serialize};

/// A name-completion candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub name: String,
    /// Optional tag such as "generic" or "brand".
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl Suggestion {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: None,
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }
}

/// Body returned by `GET /api/drug-suggest`.
#[derive(Debug, Clone, Deserialize)]
pub struct SuggestResponse {
    pub success: bool,
    #[serde(default)]
    pub suggestions: Vec<Suggestion>,
}
