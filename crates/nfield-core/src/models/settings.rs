use serde::{Deserialize, Serialize};

/// One survey setting. Names are case sensitive and only one setting can
/// be changed per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SurveySetting {
    pub name: String,
    pub value: String,
}

impl SurveySetting {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}
