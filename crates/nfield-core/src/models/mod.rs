//! Request and response bodies for the Nfield endpoints.
//!
//! Field names follow the service's PascalCase wire format. Responses
//! reach callers as raw JSON; these types are for decoding them with
//! `ApiResponse::json` and for building request bodies.

pub mod fieldwork;
pub mod language;
pub mod settings;
pub mod translation;

pub use fieldwork::StopFieldwork;
pub use language::{Language, NewLanguage};
pub use settings::SurveySetting;
pub use translation::Translation;
