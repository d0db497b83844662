use serde::{Deserialize, Serialize};

/// A translated text, used for survey translations and domain default texts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Translation {
    pub name: String,
    pub text: String,
}

impl Translation {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}
