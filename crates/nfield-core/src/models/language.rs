use serde::{Deserialize, Serialize};

/// A survey language. The `Default` language cannot be renamed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Language {
    pub id: i64,
    pub name: String,
}

/// Body of `POST v1/Surveys/{surveyId}/Languages`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NewLanguage {
    pub name: String,
}
