use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use dotenv::dotenv;
use jsonwebtoken::{DecodingKey, EncodingKey};
use std::{env, fmt, path::PathBuf, str::FromStr};
use zeroize::Zeroizing;

const PLACEHOLDER_USERNAME: &str = "your-username";
const PLACEHOLDER_EMAIL: &str = "your.email@domain.com";

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum AppEnvironment {
    Development,
    Production,
    Testing,
}

impl FromStr for AppEnvironment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" => Ok(AppEnvironment::Development),
            "production" => Ok(AppEnvironment::Production),
            "testing" => Ok(AppEnvironment::Testing),
            _ => Err(ConfigError::Message(format!("Invalid environment: {}", s))),
        }
    }
}

#[derive(Deserialize, Clone)]
#[serde(rename_all = "snake_case")]
pub struct AppConfig {
    #[serde(default = "default_env")]
    pub env: AppEnvironment,

    #[serde(default = "default_name")]
    pub name: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    #[serde(default)]
    pub database_url: String,

    #[serde(default)]
    pub redis_url: Option<String>,

    #[serde(default = "default_cors_origins")]
    pub cors_allowed_origins: Vec<String>,

    #[serde(default)]
    pub jwt_secret: String,

    #[serde(default = "default_jwt_expiration")]
    pub jwt_expiration_minutes: i64,

    #[serde(default)]
    pub refresh_token_secret: String,

    #[serde(default = "default_refresh_expiration")]
    pub refresh_token_exp_days: i64,

    /// Mount point of the staff API, without slashes.
    #[serde(default = "default_admin_url")]
    pub admin_url: String,

    #[serde(default)]
    pub trust_x_forwarded_for: bool,

    #[serde(default = "default_site_url")]
    pub site_url: String,

    #[serde(default = "default_security_contact")]
    pub security_contact: String,

    #[serde(default = "default_page_cache_ttl")]
    pub page_cache_ttl_secs: u64,

    #[serde(default)]
    pub profile: PersonalProfile,

    #[serde(default)]
    pub rate_limits: RateLimitSettings,

    #[serde(default)]
    pub media: MediaSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PersonalProfile {
    #[serde(default = "default_full_name")]
    pub full_name: String,
    #[serde(default = "default_email")]
    pub email: String,
    #[serde(default = "default_tagline")]
    pub tagline: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub location: String,
    #[serde(default = "default_username")]
    pub github_username: String,
    #[serde(default = "default_username")]
    pub tryhackme_username: String,
    #[serde(default = "default_username")]
    pub hackthebox_username: String,
    #[serde(default)]
    pub admin_username: Option<String>,
    #[serde(default)]
    pub admin_email: Option<String>,
}

impl Default for PersonalProfile {
    fn default() -> Self {
        PersonalProfile {
            full_name: default_full_name(),
            email: default_email(),
            tagline: default_tagline(),
            phone: String::new(),
            location: String::new(),
            github_username: default_username(),
            tryhackme_username: default_username(),
            hackthebox_username: default_username(),
            admin_username: None,
            admin_email: None,
        }
    }
}

impl PersonalProfile {
    pub fn github_url(&self) -> String {
        social_url(&self.github_username, |u| format!("https://github.com/{u}"))
    }

    pub fn tryhackme_url(&self) -> String {
        social_url(&self.tryhackme_username, |u| format!("https://tryhackme.com/p/{u}"))
    }

    pub fn hackthebox_url(&self) -> String {
        social_url(&self.hackthebox_username, |u| format!("https://app.hackthebox.com/profile/{u}"))
    }

    pub fn email_url(&self) -> String {
        if self.email.trim().is_empty() || self.email == PLACEHOLDER_EMAIL {
            "#".to_string()
        } else {
            format!("mailto:{}", self.email)
        }
    }

    pub fn admin_username(&self) -> &str {
        self.admin_username.as_deref().unwrap_or("admin")
    }

    pub fn admin_email(&self) -> &str {
        self.admin_email.as_deref().unwrap_or(&self.email)
    }
}

fn social_url(username: &str, build: impl Fn(&str) -> String) -> String {
    let username = username.trim();
    if username.is_empty() || username == PLACEHOLDER_USERNAME {
        "#".to_string()
    } else {
        build(username)
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct RateRule {
    pub max_requests: u64,
    pub window_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RateLimitSettings {
    #[serde(default = "default_contact_rule")]
    pub contact: RateRule,
    #[serde(default = "default_admin_rule")]
    pub admin: RateRule,
    #[serde(default = "default_general_rule")]
    pub general: RateRule,
    /// Failed logins tracked per IP and per username within this window.
    #[serde(default = "default_login_window")]
    pub login_failure_window_secs: u64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        RateLimitSettings {
            contact: default_contact_rule(),
            admin: default_admin_rule(),
            general: default_general_rule(),
            login_failure_window_secs: default_login_window(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum MediaBackend {
    Local,
    Cloudinary,
}

#[derive(Deserialize, Clone)]
pub struct MediaSettings {
    #[serde(default = "default_media_backend")]
    pub backend: MediaBackend,
    #[serde(default = "default_media_root")]
    pub media_root: PathBuf,
    #[serde(default = "default_media_url")]
    pub media_url: String,
    #[serde(default)]
    pub cloudinary_cloud_name: String,
    #[serde(default)]
    pub cloudinary_api_key: String,
    #[serde(default)]
    pub cloudinary_api_secret: String,
}

impl Default for MediaSettings {
    fn default() -> Self {
        MediaSettings {
            backend: default_media_backend(),
            media_root: default_media_root(),
            media_url: default_media_url(),
            cloudinary_cloud_name: String::new(),
            cloudinary_api_key: String::new(),
            cloudinary_api_secret: String::new(),
        }
    }
}

fn default_env() -> AppEnvironment {
    AppEnvironment::Development
}
fn default_name() -> String {
    "Portfolio-Site".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_worker_count() -> usize {
    num_cpus::get()
}
fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}
fn default_jwt_expiration() -> i64 {
    15
}
fn default_refresh_expiration() -> i64 {
    7
}
fn default_admin_url() -> String {
    "admin".to_string()
}
fn default_site_url() -> String {
    "http://localhost:8080".to_string()
}
fn default_security_contact() -> String {
    "security@localhost".to_string()
}
fn default_page_cache_ttl() -> u64 {
    60 * 15
}
fn default_full_name() -> String {
    "Your Name".to_string()
}
fn default_email() -> String {
    PLACEHOLDER_EMAIL.to_string()
}
fn default_tagline() -> String {
    "Your professional tagline".to_string()
}
fn default_username() -> String {
    PLACEHOLDER_USERNAME.to_string()
}
fn default_contact_rule() -> RateRule {
    RateRule { max_requests: 10, window_secs: 900 }
}
fn default_admin_rule() -> RateRule {
    RateRule { max_requests: 50, window_secs: 300 }
}
fn default_general_rule() -> RateRule {
    RateRule { max_requests: 200, window_secs: 300 }
}
fn default_login_window() -> u64 {
    900
}
fn default_media_backend() -> MediaBackend {
    MediaBackend::Local
}
fn default_media_root() -> PathBuf {
    PathBuf::from("media")
}
fn default_media_url() -> String {
    "/media/".to_string()
}

impl AppConfig {
    pub fn new() -> Result<Self, ConfigError> {
        dotenv().ok();

        let raw_env = env::var("APP_ENV").unwrap_or_else(|_| "development".into());
        let env_name = AppEnvironment::from_str(&raw_env)
            .map_err(|_| ConfigError::Message(format!("Invalid APP_ENV value: {}", raw_env)))?;

        let builder = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env_name.to_string().to_lowercase())).required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("cors_allowed_origins")
                    .ignore_empty(true),
            );

        let mut config: Self = builder.build()?.try_deserialize()?;

        config.env = env_name;

        config.database_url = fill_or_env(config.database_url, "APP_DATABASE_URL")?;
        config.jwt_secret = fill_or_env(config.jwt_secret, "APP_JWT_SECRET")?;
        config.refresh_token_secret = fill_or_env(config.refresh_token_secret, "APP_REFRESH_TOKEN_SECRET")?;

        if config.redis_url.is_none() {
            config.redis_url = env::var("APP_REDIS_URL").ok();
        }

        config.admin_url = normalize_admin_url(&config.admin_url);

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.database_url.trim().is_empty() {
            errors.push("DATABASE_URL cannot be empty");
        }
        if self.jwt_secret.len() < 32 {
            errors.push("JWT_SECRET must be at least 32 characters");
        }
        if self.refresh_token_secret.len() < 32 {
            errors.push("REFRESH_TOKEN_SECRET must be at least 32 characters");
        }
        if self.is_production() && self.cors_origins().iter().any(|o| o == "*") {
            errors.push("Wildcard CORS (*) is not allowed in production");
        }
        if self.admin_url.is_empty() {
            errors.push("ADMIN_URL cannot be empty");
        }
        if self.media.backend == MediaBackend::Cloudinary
            && (self.media.cloudinary_cloud_name.is_empty()
                || self.media.cloudinary_api_key.is_empty()
                || self.media.cloudinary_api_secret.is_empty())
        {
            errors.push("Cloudinary media backend requires cloud name, API key and API secret");
        }

        if self.is_production() && self.admin_url == default_admin_url() {
            tracing::warn!("Staff API is mounted at the default /admin path in production");
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Message(errors.join(", ")))
        }
    }

    pub fn is_production(&self) -> bool {
        self.env == AppEnvironment::Production
    }

    /// Development mode relaxes blocking and rate limiting for local work.
    pub fn is_development(&self) -> bool {
        self.env == AppEnvironment::Development
    }

    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_allowed_origins
            .iter()
            .flat_map(|origin| origin.split(','))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Path prefix of the staff API, e.g. `/admin`.
    pub fn admin_prefix(&self) -> String {
        format!("/{}", self.admin_url)
    }
}

fn fill_or_env(current: String, env_key: &str) -> Result<String, ConfigError> {
    if current.trim().is_empty() {
        env::var(env_key).map_err(|_| ConfigError::Message(format!("{env_key} must be set")))
    } else {
        Ok(current)
    }
}

pub fn normalize_admin_url(raw: &str) -> String {
    raw.trim().trim_matches('/').to_string()
}

impl fmt::Display for AppEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AppEnvironment::Development => "development",
            AppEnvironment::Production => "production",
            AppEnvironment::Testing => "testing",
        };
        write!(f, "{s}")
    }
}

trait Redact {
    fn redact(&self) -> &str;
}

impl Redact for str {
    fn redact(&self) -> &str {
        if self.is_empty() {
            "[MISSING]"
        } else if self.len() < 32 {
            "[TOO_SHORT]"
        } else {
            "[REDACTED]"
        }
    }
}

impl Redact for String {
    fn redact(&self) -> &str {
        self.as_str().redact()
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("name", &self.name)
            .field("port", &self.port)
            .field("host", &self.host)
            .field("worker_count", &self.worker_count)
            .field("database_url", &self.database_url.redact())
            .field("redis_url", &self.redis_url.as_ref().map(|_| "[REDACTED]"))
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .field("jwt_secret", &self.jwt_secret.redact())
            .field("jwt_expiration_minutes", &self.jwt_expiration_minutes)
            .field("refresh_token_secret", &self.refresh_token_secret.redact())
            .field("refresh_token_exp_days", &self.refresh_token_exp_days)
            .field("admin_url", &"[REDACTED]")
            .field("trust_x_forwarded_for", &self.trust_x_forwarded_for)
            .field("site_url", &self.site_url)
            .field("page_cache_ttl_secs", &self.page_cache_ttl_secs)
            .field("rate_limits", &self.rate_limits)
            .field("media", &self.media)
            .finish()
    }
}

impl fmt::Debug for MediaSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaSettings")
            .field("backend", &self.backend)
            .field("media_root", &self.media_root)
            .field("media_url", &self.media_url)
            .field("cloudinary_cloud_name", &self.cloudinary_cloud_name)
            .field("cloudinary_api_key", &self.cloudinary_api_key.redact())
            .field("cloudinary_api_secret", &self.cloudinary_api_secret.redact())
            .finish()
    }
}

#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub refresh_encoding: EncodingKey,
    pub refresh_decoding: DecodingKey,
}

impl From<&AppConfig> for JwtKeys {
    fn from(config: &AppConfig) -> Self {
        let jwt_secret = Zeroizing::new(config.jwt_secret.clone());
        let refresh_secret = Zeroizing::new(config.refresh_token_secret.clone());

        JwtKeys {
            encoding: EncodingKey::from_secret(jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(jwt_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(refresh_secret.as_bytes()),
        }
    }
}

impl fmt::Debug for JwtKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtKeys")
            .field("encoding", &"[REDACTED]")
            .field("decoding", &"[REDACTED]")
            .field("refresh_encoding", &"[REDACTED]")
            .field("refresh_decoding", &"[REDACTED]")
            .finish()
    }
}

/// Baseline configuration for tests and tooling that never touches the environment.
pub fn test_config() -> AppConfig {
    AppConfig {
        env: AppEnvironment::Testing,
        name: "Portfolio-Site-Test".to_string(),
        port: 0,
        host: default_host(),
        worker_count: 1,
        database_url: "postgres://localhost/portfolio_test".to_string(),
        redis_url: None,
        cors_allowed_origins: default_cors_origins(),
        jwt_secret: "test_jwt_secret_that_is_long_enough_for_hs512_1234567890".to_string(),
        jwt_expiration_minutes: 5,
        refresh_token_secret: "test_refresh_secret_that_is_long_enough_1234567890".to_string(),
        refresh_token_exp_days: 1,
        admin_url: default_admin_url(),
        trust_x_forwarded_for: true,
        site_url: default_site_url(),
        security_contact: default_security_contact(),
        page_cache_ttl_secs: default_page_cache_ttl(),
        profile: PersonalProfile::default(),
        rate_limits: RateLimitSettings::default(),
        media: MediaSettings::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_social_usernames_render_as_hash() {
        let profile = PersonalProfile::default();
        assert_eq!(profile.github_url(), "#");
        assert_eq!(profile.tryhackme_url(), "#");
        assert_eq!(profile.hackthebox_url(), "#");
        assert_eq!(profile.email_url(), "#");
    }

    #[test]
    fn configured_social_usernames_build_links() {
        let profile = PersonalProfile {
            github_username: "octo".into(),
            tryhackme_username: "thm-user".into(),
            hackthebox_username: "htb".into(),
            email: "me@example.com".into(),
            ..PersonalProfile::default()
        };
        assert_eq!(profile.github_url(), "https://github.com/octo");
        assert_eq!(profile.tryhackme_url(), "https://tryhackme.com/p/thm-user");
        assert_eq!(profile.hackthebox_url(), "https://app.hackthebox.com/profile/htb");
        assert_eq!(profile.email_url(), "mailto:me@example.com");
        assert_eq!(profile.admin_email(), "me@example.com");
        assert_eq!(profile.admin_username(), "admin");
    }

    #[test]
    fn validate_rejects_short_secrets_and_missing_cloudinary_credentials() {
        let mut config = test_config();
        config.jwt_secret = "short".into();
        config.media.backend = MediaBackend::Cloudinary;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("JWT_SECRET"));
        assert!(err.contains("Cloudinary"));
    }

    #[test]
    fn validate_rejects_wildcard_cors_in_production() {
        let mut config = test_config();
        config.env = AppEnvironment::Production;
        assert!(config.validate().is_err());

        config.cors_allowed_origins = vec!["https://example.com, https://www.example.com".into()];
        assert!(config.validate().is_ok());
        assert_eq!(config.cors_origins().len(), 2);
    }

    #[test]
    fn admin_url_is_normalized() {
        assert_eq!(normalize_admin_url("/secret-panel/"), "secret-panel");
        let mut config = test_config();
        config.admin_url = normalize_admin_url("staff/");
        assert_eq!(config.admin_prefix(), "/staff");
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let config = test_config();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains(&config.jwt_secret));
        assert!(rendered.contains("[REDACTED]"));
    }
}
