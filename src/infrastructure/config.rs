// Configuration loading with explicit precedence:
// environment variable > optional config file > compiled default
use serde::Deserialize;

pub const DEFAULT_DEVICE_ID: &str = "pack-4s2p-reza-s2mini";
pub const DEFAULT_TIMEZONE: &str = "Asia/Jakarta";

/// Startup configuration, resolved once and injected into the pipeline.
///
/// `supabase_url` and `supabase_anon_key` have no compiled default; when
/// either is empty the dashboard starts with a warning and renders empty
/// instead of refusing to run.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub device_id: String,
    pub local_tz: String,
}

impl AppConfig {
    pub fn has_credentials(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_anon_key.is_empty()
    }

    /// Non-fatal startup warnings, shown in the dashboard header.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.supabase_url.is_empty() {
            warnings.push("SUPABASE_URL is not set; dashboard will stay empty".to_string());
        }
        if self.supabase_anon_key.is_empty() {
            warnings.push("SUPABASE_ANON_KEY is not set; dashboard will stay empty".to_string());
        }
        warnings
    }
}

/// Resolve configuration from the process environment (`SUPABASE_URL`,
/// `SUPABASE_ANON_KEY`, `DEVICE_ID`, `LOCAL_TZ`), an optional
/// `config/dashboard.toml`, and compiled defaults, in that precedence.
pub fn load_app_config() -> anyhow::Result<AppConfig> {
    resolve_config(config::Environment::default())
}

fn resolve_config(env: config::Environment) -> anyhow::Result<AppConfig> {
    let settings = config::Config::builder()
        .set_default("supabase_url", "")?
        .set_default("supabase_anon_key", "")?
        .set_default("device_id", DEFAULT_DEVICE_ID)?
        .set_default("local_tz", DEFAULT_TIMEZONE)?
        .add_source(config::File::with_name("config/dashboard").required(false))
        .add_source(env)
        .build()?;

    Ok(settings.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_with(vars: &[(&str, &str)]) -> config::Environment {
        let map: config::Map<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        config::Environment::default().source(Some(map))
    }

    #[test]
    fn test_compiled_defaults_apply_when_nothing_is_set() {
        let cfg = resolve_config(env_with(&[])).unwrap();
        assert_eq!(cfg.supabase_url, "");
        assert_eq!(cfg.supabase_anon_key, "");
        assert_eq!(cfg.device_id, DEFAULT_DEVICE_ID);
        assert_eq!(cfg.local_tz, DEFAULT_TIMEZONE);
        assert!(!cfg.has_credentials());
        assert_eq!(cfg.warnings().len(), 2);
    }

    #[test]
    fn test_environment_overrides_defaults() {
        let cfg = resolve_config(env_with(&[
            ("SUPABASE_URL", "https://example.supabase.co"),
            ("SUPABASE_ANON_KEY", "anon-key"),
            ("DEVICE_ID", "pack-test"),
            ("LOCAL_TZ", "Europe/Berlin"),
        ]))
        .unwrap();
        assert_eq!(cfg.supabase_url, "https://example.supabase.co");
        assert_eq!(cfg.device_id, "pack-test");
        assert_eq!(cfg.local_tz, "Europe/Berlin");
        assert!(cfg.has_credentials());
        assert!(cfg.warnings().is_empty());
    }

    #[test]
    fn test_missing_credential_warns_but_does_not_fail() {
        let cfg = resolve_config(env_with(&[(
            "SUPABASE_URL",
            "https://example.supabase.co",
        )]))
        .unwrap();
        assert!(!cfg.has_credentials());
        let warnings = cfg.warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("SUPABASE_ANON_KEY"));
    }
}
