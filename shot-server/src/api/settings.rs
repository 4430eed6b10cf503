//! Runtime settings routes
//!
//! Changes apply to shots processed afterwards; receipts already rendered
//! are left as they are.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use crate::core::{Language, ServerState};

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/settings", get(get_settings))
        .route("/api/settings/beaninfo", post(set_bean_info))
        .route("/api/language", get(get_language).post(set_language))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SettingsResponse {
    pub bean_info_enabled: bool,
    pub print_enabled: bool,
    pub max_users: usize,
}

async fn get_settings(State(state): State<ServerState>) -> Json<SettingsResponse> {
    Json(SettingsResponse {
        bean_info_enabled: state.settings.bean_info_enabled(),
        print_enabled: state.settings.print_enabled(),
        max_users: state.admission.max(),
    })
}

#[derive(Debug, Default, Deserialize)]
pub struct ToggleRequest {
    pub enabled: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BeanInfoResponse {
    pub success: bool,
    pub bean_info_enabled: bool,
    pub message: String,
}

fn bean_info_message(language: Language, enabled: bool) -> String {
    match language {
        Language::Zh => format!("豆子信息打印{}", if enabled { "已启用" } else { "已禁用" }),
        Language::En => format!(
            "Bean info printing {}",
            if enabled { "enabled" } else { "disabled" }
        ),
    }
}

/// Missing `enabled` leaves the switch unchanged and reports it
async fn set_bean_info(
    State(state): State<ServerState>,
    Json(request): Json<ToggleRequest>,
) -> Json<BeanInfoResponse> {
    if let Some(enabled) = request.enabled {
        state.settings.set_bean_info_enabled(enabled);
        tracing::info!(enabled, "Bean info switch changed");
    }

    let enabled = state.settings.bean_info_enabled();
    Json(BeanInfoResponse {
        success: true,
        bean_info_enabled: enabled,
        message: bean_info_message(state.settings.language(), enabled),
    })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LanguageResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    pub language: Language,
}

async fn get_language(State(state): State<ServerState>) -> Json<LanguageResponse> {
    Json(LanguageResponse {
        success: None,
        language: state.settings.language(),
    })
}

#[derive(Debug, Deserialize)]
pub struct LanguageRequest {
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_language() -> String {
    Language::default().as_str().to_string()
}

/// Unknown language codes are ignored; the current one is reported back
async fn set_language(
    State(state): State<ServerState>,
    Json(request): Json<LanguageRequest>,
) -> Json<LanguageResponse> {
    match request.language.parse::<Language>() {
        Ok(language) => {
            state.settings.set_language(language);
            tracing::info!(language = %language, "Receipt language changed");
        }
        Err(e) => tracing::debug!(error = %e, "Language change ignored"),
    }

    Json(LanguageResponse {
        success: Some(true),
        language: state.settings.language(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bean_info_message() {
        assert_eq!(bean_info_message(Language::Zh, true), "豆子信息打印已启用");
        assert_eq!(bean_info_message(Language::En, false), "Bean info printing disabled");
    }
}
