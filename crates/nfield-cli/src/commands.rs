//! Command-line parsing and execution.

use anyhow::{bail, Context, Result};
use nfield_core::models::SurveySetting;
use nfield_core::{ApiError, ApiResponse, NfieldClient};

pub const USAGE: &str = "\
Usage: nfield <command> [args]

Commands:
  login                              Sign in and remember the account
  logout                             Forget the stored password
  status <survey>                    Show fieldwork status
  start <survey>                     Start fieldwork
  stop <survey> [--terminate]        Pause fieldwork, optionally ending interviews
  languages <survey> [language]      List survey languages or show one
  translations <survey> <language> [key]
                                     List translations or show one
  settings <survey> [name value]     Show settings or change one
  texts [key]                        List domain default texts or show one

Environment:
  NFIELD_SERVER, NFIELD_DOMAIN, NFIELD_USERNAME, NFIELD_PASSWORD
  NFIELD_LOG_DIR                     Also write logs to a daily file here
  RUST_LOG                           Log filter (default: warn)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login,
    Logout,
    Status { survey: String },
    Start { survey: String },
    Stop { survey: String, terminate: bool },
    Languages { survey: String, language: Option<i64> },
    Translations { survey: String, language: i64, key: Option<String> },
    Settings { survey: String, update: Option<(String, String)> },
    Texts { key: Option<String> },
    Help,
}

fn parse_language(value: &str) -> Result<i64> {
    value
        .parse()
        .with_context(|| format!("Invalid language id: {}", value))
}

impl Command {
    pub fn parse(args: &[String]) -> Result<Self> {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let command = match args.as_slice() {
            [] | ["help"] | ["--help"] | ["-h"] => Command::Help,
            ["login"] => Command::Login,
            ["logout"] => Command::Logout,
            ["status", survey] => Command::Status { survey: survey.to_string() },
            ["start", survey] => Command::Start { survey: survey.to_string() },
            ["stop", survey] => Command::Stop { survey: survey.to_string(), terminate: false },
            ["stop", survey, "--terminate"] | ["stop", "--terminate", survey] => Command::Stop {
                survey: survey.to_string(),
                terminate: true,
            },
            ["languages", survey] => Command::Languages { survey: survey.to_string(), language: None },
            ["languages", survey, language] => Command::Languages {
                survey: survey.to_string(),
                language: Some(parse_language(language)?),
            },
            ["translations", survey, language] => Command::Translations {
                survey: survey.to_string(),
                language: parse_language(language)?,
                key: None,
            },
            ["translations", survey, language, key] => Command::Translations {
                survey: survey.to_string(),
                language: parse_language(language)?,
                key: Some(key.to_string()),
            },
            ["settings", survey] => Command::Settings { survey: survey.to_string(), update: None },
            ["settings", survey, name, value] => Command::Settings {
                survey: survey.to_string(),
                update: Some((name.to_string(), value.to_string())),
            },
            ["texts"] => Command::Texts { key: None },
            ["texts", key] => Command::Texts { key: Some(key.to_string()) },
            _ => bail!("Unrecognized command: {}\n\n{}", args.join(" "), USAGE),
        };
        Ok(command)
    }
}

/// Run an API command and return its response
pub async fn execute(client: &NfieldClient, command: &Command) -> Result<Option<ApiResponse>> {
    let response = match command {
        Command::Status { survey } => client.fieldwork_status(survey).await?,
        Command::Start { survey } => client.start_fieldwork(survey).await?,
        Command::Stop { survey, terminate } => client.stop_fieldwork(survey, *terminate).await?,
        Command::Languages { survey, language: None } => client.languages(survey).await?,
        Command::Languages { survey, language: Some(id) } => client.language(survey, *id).await?,
        Command::Translations { survey, language, key: None } => {
            client.translations(survey, *language).await?
        }
        Command::Translations { survey, language, key: Some(key) } => {
            client.translation(survey, *language, key).await?
        }
        Command::Settings { survey, update: None } => client.survey_settings(survey).await?,
        Command::Settings { survey, update: Some((name, value)) } => {
            client
                .update_survey_setting(survey, &SurveySetting::new(name.as_str(), value.as_str()))
                .await?
        }
        Command::Texts { key: None } => client.default_texts().await?,
        Command::Texts { key: Some(key) } => client.default_text(key).await?,
        Command::Login | Command::Logout | Command::Help => return Ok(None),
    };
    Ok(Some(response))
}

/// Render a response as a status line followed by pretty JSON
pub fn render(response: &ApiResponse) -> String {
    if response.body.is_null() {
        return format!("HTTP {}", response.status);
    }
    let body = serde_json::to_string_pretty(&response.body).unwrap_or_else(|_| response.body_text());
    format!("HTTP {}\n{}", response.status, body)
}

/// Print the response, then fail with the classified error on a non-2xx status
pub fn report(response: ApiResponse) -> Result<(), ApiError> {
    println!("{}", render(&response));
    response.error_for_status()?;
    Ok(())
}
