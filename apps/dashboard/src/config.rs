use std::fs;

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub api_base_url: String,
    pub page_limit: u32,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:4000/api/".into(),
            page_limit: 20,
            request_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Deserialize)]
struct FileSettings {
    api_base_url: Option<String>,
    page_limit: Option<u32>,
    request_timeout_secs: Option<u64>,
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("dashboard.toml") {
        apply_file_config(&mut settings, &raw);
    }
    apply_env_overrides(&mut settings);

    settings
}

fn apply_file_config(settings: &mut Settings, raw: &str) {
    let Ok(file_cfg) = toml::from_str::<FileSettings>(raw) else {
        return;
    };

    if let Some(v) = file_cfg.api_base_url {
        settings.api_base_url = v;
    }
    if let Some(v) = file_cfg.page_limit {
        settings.page_limit = v;
    }
    if let Some(v) = file_cfg.request_timeout_secs {
        settings.request_timeout_secs = v;
    }
}

fn apply_env_overrides(settings: &mut Settings) {
    if let Ok(v) = std::env::var("API_BASE_URL") {
        settings.api_base_url = v;
    }
    if let Ok(v) = std::env::var("APP__API_BASE_URL") {
        settings.api_base_url = v;
    }

    if let Ok(v) = std::env::var("APP__PAGE_LIMIT") {
        if let Ok(parsed) = v.parse::<u32>() {
            settings.page_limit = parsed;
        }
    }

    if let Ok(v) = std::env::var("APP__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout_secs = parsed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_config_overrides_only_named_keys() {
        let mut settings = Settings::default();
        apply_file_config(
            &mut settings,
            "api_base_url = \"https://news.example/api\"\npage_limit = 50\n",
        );

        assert_eq!(settings.api_base_url, "https://news.example/api");
        assert_eq!(settings.page_limit, 50);
        assert_eq!(
            settings.request_timeout_secs,
            Settings::default().request_timeout_secs
        );
    }

    #[test]
    fn unparseable_file_config_keeps_defaults() {
        let mut settings = Settings::default();
        apply_file_config(&mut settings, "page_limit = \"many\"");

        assert_eq!(settings, Settings::default());
    }
}
