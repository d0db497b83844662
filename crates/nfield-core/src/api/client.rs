//! Endpoint wrappers for the Nfield REST API.
//!
//! Every wrapper gets its token from the shared `SessionManager`, signs
//! the request with `Authorization: Basic <token>` and hands back the raw
//! `ApiResponse` whatever its status. Use `ApiResponse::error_for_status`
//! to turn non-2xx answers into errors.

use reqwest::{header, Method};

use super::{ApiError, ApiRequest, ApiResponse};
use crate::auth::{RefreshErrorCallback, SessionManager, Token};
use crate::config::{Credentials, SessionConfig};
use crate::models::{Language, NewLanguage, StopFieldwork, SurveySetting, Translation};

// ============================================================================
// Paths
// ============================================================================

const API_VERSION: &str = "v1";
const SURVEYS: &str = "Surveys";
const DEFAULT_TEXTS: &str = "DefaultTexts";
const FIELDWORK: &str = "Fieldwork";
const LANGUAGES: &str = "Languages";
const TRANSLATIONS: &str = "Translations";
const SETTINGS: &str = "Settings";

/// `v1/Surveys/{surveyId}/...`
fn survey_path(survey_id: &str, rest: &[&str]) -> Vec<String> {
    let mut segments = vec![
        API_VERSION.to_string(),
        SURVEYS.to_string(),
        survey_id.to_string(),
    ];
    segments.extend(rest.iter().map(|s| s.to_string()));
    segments
}

/// `v1/Surveys/{surveyId}/Languages/{languageId}/Translations`
fn translations_path(survey_id: &str, language_id: i64) -> Vec<String> {
    survey_path(
        survey_id,
        &[LANGUAGES, &language_id.to_string(), TRANSLATIONS],
    )
}

/// Nfield API client.
/// Clone is cheap - clones share one session and its token.
#[derive(Clone)]
pub struct NfieldClient {
    session: SessionManager,
}

impl NfieldClient {
    /// Create a client with its own HTTP session
    pub fn new(config: SessionConfig) -> Result<Self, ApiError> {
        Ok(Self {
            session: SessionManager::new(config)?,
        })
    }

    /// Create a client over an existing session
    pub fn with_session(session: SessionManager) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Reconfigure the session in place; the cached token is kept
    pub async fn configure(&self, config: SessionConfig) -> Result<(), ApiError> {
        self.session.configure(config).await
    }

    /// Sign in if needed, optionally keeping the token warm in the background
    pub async fn connect(
        &self,
        persistent: bool,
        on_error: Option<RefreshErrorCallback>,
    ) -> Result<Token, ApiError> {
        self.session.connect(persistent, on_error).await
    }

    /// Stop the background token refresh
    pub fn stop_persistent(&self) {
        self.session.stop_persistent();
    }

    /// `POST v1/SignIn`. Does not change the session's token.
    pub async fn sign_in(&self, credentials: &Credentials) -> Result<ApiResponse, ApiError> {
        self.session.sign_in(credentials).await
    }

    async fn authorized(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let token = self.session.ensure_token().await?;
        let request = request.header(header::AUTHORIZATION.as_str(), token.authorization_header());
        self.session.send(request).await
    }

    // ===== Survey Fieldwork =====

    /// `GET v1/Surveys/{surveyId}/Fieldwork/Status`
    pub async fn fieldwork_status(&self, survey_id: &str) -> Result<ApiResponse, ApiError> {
        let request = ApiRequest::new(Method::GET, survey_path(survey_id, &[FIELDWORK, "Status"]));
        self.authorized(request).await
    }

    /// `PUT v1/Surveys/{surveyId}/Fieldwork/Start`
    pub async fn start_fieldwork(&self, survey_id: &str) -> Result<ApiResponse, ApiError> {
        let request = ApiRequest::new(Method::PUT, survey_path(survey_id, &[FIELDWORK, "Start"]));
        self.authorized(request).await
    }

    /// `PUT v1/Surveys/{surveyId}/Fieldwork/Stop`, pausing the survey.
    /// With `terminate` set, running interviews are ended as well.
    pub async fn stop_fieldwork(
        &self,
        survey_id: &str,
        terminate: bool,
    ) -> Result<ApiResponse, ApiError> {
        let body = StopFieldwork {
            terminate_running_interviews: terminate,
        };
        let request = ApiRequest::new(Method::PUT, survey_path(survey_id, &[FIELDWORK, "Stop"]))
            .json(&body)?;
        self.authorized(request).await
    }

    // ===== Default Texts =====

    /// `GET v1/DefaultTexts`
    pub async fn default_texts(&self) -> Result<ApiResponse, ApiError> {
        let request = ApiRequest::new(Method::GET, [API_VERSION, DEFAULT_TEXTS]);
        self.authorized(request).await
    }

    /// `GET v1/DefaultTexts/{translationKey}`
    pub async fn default_text(&self, translation_key: &str) -> Result<ApiResponse, ApiError> {
        let request = ApiRequest::new(Method::GET, [API_VERSION, DEFAULT_TEXTS, translation_key]);
        self.authorized(request).await
    }

    // ===== Survey Translations =====

    /// `GET v1/Surveys/{surveyId}/Languages/{languageId}/Translations`
    pub async fn translations(
        &self,
        survey_id: &str,
        language_id: i64,
    ) -> Result<ApiResponse, ApiError> {
        let request = ApiRequest::new(Method::GET, translations_path(survey_id, language_id));
        self.authorized(request).await
    }

    /// `GET v1/Surveys/{surveyId}/Languages/{languageId}/Translations/{translationKey}`
    pub async fn translation(
        &self,
        survey_id: &str,
        language_id: i64,
        translation_key: &str,
    ) -> Result<ApiResponse, ApiError> {
        let mut segments = translations_path(survey_id, language_id);
        segments.push(translation_key.to_string());
        self.authorized(ApiRequest::new(Method::GET, segments)).await
    }

    /// `POST v1/Surveys/{surveyId}/Languages/{languageId}/Translations`
    pub async fn add_translation(
        &self,
        survey_id: &str,
        language_id: i64,
        translation: &Translation,
    ) -> Result<ApiResponse, ApiError> {
        let request = ApiRequest::new(Method::POST, translations_path(survey_id, language_id))
            .json(translation)?;
        self.authorized(request).await
    }

    /// `PUT v1/Surveys/{surveyId}/Languages/{languageId}/Translations`
    pub async fn update_translation(
        &self,
        survey_id: &str,
        language_id: i64,
        translation: &Translation,
    ) -> Result<ApiResponse, ApiError> {
        let request = ApiRequest::new(Method::PUT, translations_path(survey_id, language_id))
            .json(translation)?;
        self.authorized(request).await
    }

    /// `DELETE v1/Surveys/{surveyId}/Languages/{languageId}/Translations/{translationKey}`
    pub async fn remove_translation(
        &self,
        survey_id: &str,
        language_id: i64,
        translation_key: &str,
    ) -> Result<ApiResponse, ApiError> {
        let mut segments = translations_path(survey_id, language_id);
        segments.push(translation_key.to_string());
        self.authorized(ApiRequest::new(Method::DELETE, segments)).await
    }

    // ===== Survey Languages =====

    /// `GET v1/Surveys/{surveyId}/Languages`
    pub async fn languages(&self, survey_id: &str) -> Result<ApiResponse, ApiError> {
        let request = ApiRequest::new(Method::GET, survey_path(survey_id, &[LANGUAGES]));
        self.authorized(request).await
    }

    /// `GET v1/Surveys/{surveyId}/Languages/{languageId}`
    pub async fn language(&self, survey_id: &str, language_id: i64) -> Result<ApiResponse, ApiError> {
        let segments = survey_path(survey_id, &[LANGUAGES, &language_id.to_string()]);
        self.authorized(ApiRequest::new(Method::GET, segments)).await
    }

    /// `POST v1/Surveys/{surveyId}/Languages`
    pub async fn add_language(&self, survey_id: &str, name: &str) -> Result<ApiResponse, ApiError> {
        let body = NewLanguage {
            name: name.to_string(),
        };
        let request = ApiRequest::new(Method::POST, survey_path(survey_id, &[LANGUAGES]))
            .json(&body)?;
        self.authorized(request).await
    }

    /// `PUT v1/Surveys/{surveyId}/Languages`, renaming `language.id`.
    /// The `Default` language cannot be renamed.
    pub async fn update_language(
        &self,
        survey_id: &str,
        language: &Language,
    ) -> Result<ApiResponse, ApiError> {
        let request = ApiRequest::new(Method::PUT, survey_path(survey_id, &[LANGUAGES]))
            .json(language)?;
        self.authorized(request).await
    }

    /// `DELETE v1/Surveys/{surveyId}/Languages/{languageId}`
    pub async fn remove_language(
        &self,
        survey_id: &str,
        language_id: i64,
    ) -> Result<ApiResponse, ApiError> {
        let segments = survey_path(survey_id, &[LANGUAGES, &language_id.to_string()]);
        self.authorized(ApiRequest::new(Method::DELETE, segments)).await
    }

    // ===== Survey Settings =====

    /// `GET v1/Surveys/{surveyId}/Settings`
    pub async fn survey_settings(&self, survey_id: &str) -> Result<ApiResponse, ApiError> {
        let request = ApiRequest::new(Method::GET, survey_path(survey_id, &[SETTINGS]));
        self.authorized(request).await
    }

    /// `POST v1/Surveys/{surveyId}/Settings`, one setting per call
    pub async fn update_survey_setting(
        &self,
        survey_id: &str,
        setting: &SurveySetting,
    ) -> Result<ApiResponse, ApiError> {
        let request = ApiRequest::new(Method::POST, survey_path(survey_id, &[SETTINGS]))
            .json(setting)?;
        self.authorized(request).await
    }
}
