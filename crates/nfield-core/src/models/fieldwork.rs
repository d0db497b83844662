use serde::{Deserialize, Serialize};

/// Body of `PUT v1/Surveys/{surveyId}/Fieldwork/Stop`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StopFieldwork {
    pub terminate_running_interviews: bool,
}
