use serde::{Deserialize, Serialize};

use std::{env, fs, path::Path, path::PathBuf, time::Duration};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub upload_dir: PathBuf,
    pub smtp: SmtpSettings,
    /// Upper bound on the repeat count, unbounded when unset
    pub max_repeat: Option<u32>,
    pub max_upload_bytes: Option<usize>,
    pub open_browser: bool,
    /// Application tried before the system default browser
    pub browser: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpSettings {
    pub relay: String,
    pub port: u16,
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

/// Sender mailbox and application password, read from `SENDER_EMAIL` and
/// `SENDER_PASSWORD`.
#[derive(Clone, Deserialize)]
pub struct SenderCredentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for SenderCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SenderCredentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            upload_dir: PathBuf::from("uploads"),
            smtp: SmtpSettings::default(),
            max_repeat: None,
            max_upload_bytes: None,
            open_browser: true,
            browser: None,
        }
    }
}

impl Default for SmtpSettings {
    fn default() -> Self {
        Self {
            relay: "smtp.gmail.com".to_string(),
            port: 587,
            timeout: Duration::from_secs(60),
        }
    }
}

fn read_config(path: &str) -> Result<Config, Box<dyn std::error::Error>> {
    let contents = fs::read_to_string(path)?;
    serde_yaml::from_str(&contents)
        .map_err(|e| format!("Failed to parse config file '{path}': {e}").into())
}

pub fn load_config() -> Result<Config, Box<dyn std::error::Error>> {
    // Retrieve env variable
    let config_path = env::var("MAIL_FORM_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());

    // Try env path
    if Path::new(&config_path).exists() {
        return read_config(&config_path);
    }

    // Fallback to config.yaml
    if Path::new("config.yaml").exists() {
        tracing::warn!(
            "Config file '{}' not found, falling back to 'config.yaml'",
            config_path
        );
        return read_config("config.yaml");
    }

    // Fallback to config.example.yaml
    if Path::new("config.example.yaml").exists() {
        tracing::warn!(
            "Config file '{}' and 'config.yaml' not found, falling back to 'config.example.yaml'",
            config_path
        );
        return read_config("config.example.yaml");
    }

    tracing::info!("No config file found, using built-in defaults");
    Ok(Config::default())
}

/// Reads the sender credentials from the environment.
///
/// Missing credentials are not fatal: the form still works, and every send
/// attempt fails with a configuration error until they are provided.
pub fn load_credentials() -> Option<SenderCredentials> {
    credentials_from_vars(env::vars())
}

/// Empty or whitespace-only values count as missing.
fn credentials_from_vars(
    vars: impl IntoIterator<Item = (String, String)>,
) -> Option<SenderCredentials> {
    let credentials = match envy::prefixed("SENDER_").from_iter::<_, SenderCredentials>(vars) {
        Ok(credentials) => credentials,
        Err(e) => {
            tracing::warn!("Sender credentials unavailable, sending is disabled: {e}");
            return None;
        }
    };

    if credentials.email.trim().is_empty() || credentials.password.trim().is_empty() {
        tracing::warn!(
            "Sender credentials unavailable, sending is disabled: SENDER_EMAIL or SENDER_PASSWORD is empty"
        );
        return None;
    }

    tracing::info!("Loaded sender credentials for {}", credentials.email);
    Some(credentials)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_keeps_defaults_for_missing_fields() {
        let cfg: Config = serde_yaml::from_str(
            "port: 8080\nsmtp:\n  relay: smtp.example.org\n  timeout: 15s\n",
        )
        .unwrap();

        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.host, "127.0.0.1");
        assert_eq!(cfg.upload_dir, PathBuf::from("uploads"));
        assert_eq!(cfg.smtp.relay, "smtp.example.org");
        assert_eq!(cfg.smtp.port, 587);
        assert_eq!(cfg.smtp.timeout, Duration::from_secs(15));
        assert!(cfg.max_repeat.is_none());
        assert!(cfg.open_browser);
    }

    #[test]
    fn empty_yaml_document_is_default_config() {
        let cfg: Config = serde_yaml::from_str("{}").unwrap();

        assert_eq!(cfg.port, 5000);
        assert_eq!(cfg.smtp.relay, "smtp.gmail.com");
        assert!(cfg.max_upload_bytes.is_none());
        assert!(cfg.browser.is_none());
    }

    #[test]
    fn debug_output_hides_password() {
        let credentials = SenderCredentials {
            email: "me@example.com".to_string(),
            password: "hunter2".to_string(),
        };

        let printed = format!("{credentials:?}");
        assert!(printed.contains("me@example.com"));
        assert!(!printed.contains("hunter2"));
    }

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn complete_credentials_are_loaded() {
        let credentials = credentials_from_vars(vars(&[
            ("SENDER_EMAIL", "me@example.com"),
            ("SENDER_PASSWORD", "app-password"),
            ("UNRELATED", "x"),
        ]))
        .unwrap();

        assert_eq!(credentials.email, "me@example.com");
        assert_eq!(credentials.password, "app-password");
    }

    #[test]
    fn missing_credentials_yield_none() {
        assert!(credentials_from_vars(vars(&[("SENDER_EMAIL", "me@example.com")])).is_none());
        assert!(credentials_from_vars(Vec::new()).is_none());
    }

    #[test]
    fn empty_or_blank_credentials_count_as_missing() {
        assert!(
            credentials_from_vars(vars(&[
                ("SENDER_EMAIL", "me@example.com"),
                ("SENDER_PASSWORD", ""),
            ]))
            .is_none()
        );
        assert!(
            credentials_from_vars(vars(&[
                ("SENDER_EMAIL", "   "),
                ("SENDER_PASSWORD", "app-password"),
            ]))
            .is_none()
        );
    }
}
