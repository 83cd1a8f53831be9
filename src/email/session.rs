//! Mail session configuration and derivation

use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::time::Duration;

use tracing::debug;

use crate::email::error::EmailError;

pub const MAIL_TRANSPORT_PROTOCOL: &str = "mail.transport.protocol";
pub const MAIL_HOST: &str = "mail.smtp.host";
pub const MAIL_PORT: &str = "mail.smtp.port";
pub const MAIL_SMTP_AUTH: &str = "mail.smtp.auth";
pub const MAIL_SMTP_FROM: &str = "mail.smtp.from";
pub const MAIL_SMTP_CONNECTIONTIMEOUT: &str = "mail.smtp.connectiontimeout";
pub const MAIL_SMTP_TIMEOUT: &str = "mail.smtp.timeout";
pub const MAIL_SMTP_STARTTLS_ENABLE: &str = "mail.smtp.starttls.enable";
pub const MAIL_SMTP_STARTTLS_REQUIRED: &str = "mail.smtp.starttls.required";
pub const MAIL_SMTP_SSL_ENABLE: &str = "mail.smtp.ssl.enable";
pub const MAIL_DEBUG: &str = "mail.debug";

/// Environment variables read by [`SessionConfig::from_env`]
pub const ENV_HOST: &str = "MAIL_SMTP_HOST";
pub const ENV_PORT: &str = "MAIL_SMTP_PORT";
pub const ENV_USER: &str = "MAIL_SMTP_USER";
pub const ENV_PASSWORD: &str = "MAIL_SMTP_PASSWORD";

/// Login used when the SMTP server requires authentication
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Everything a transport needs to reach an SMTP host
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub host_name: Option<String>,
    pub smtp_port: u16,
    pub ssl_smtp_port: u16,
    pub socket_connection_timeout: Duration,
    pub socket_timeout: Duration,
    pub credentials: Option<Credentials>,
    pub bounce_address: Option<String>,
    pub start_tls_enabled: bool,
    pub start_tls_required: bool,
    pub ssl_on_connect: bool,
    pub debug: bool,
}

impl SessionConfig {
    pub const DEFAULT_SMTP_PORT: u16 = 25;
    pub const DEFAULT_SSL_SMTP_PORT: u16 = 465;
    pub const DEFAULT_SOCKET_TIMEOUT: Duration = Duration::from_secs(60);

    /// Read host, port and credentials from `MAIL_SMTP_*` variables.
    ///
    /// Unset or unparsable values fall back to the defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        config.host_name = env::var(ENV_HOST).ok().filter(|host| !host.trim().is_empty());

        if let Some(port) = env::var(ENV_PORT).ok().and_then(|port| port.parse().ok()) {
            config.smtp_port = port;
        }

        if let (Ok(user), Ok(password)) = (env::var(ENV_USER), env::var(ENV_PASSWORD)) {
            config.credentials = Some(Credentials::new(user, password));
        }

        config
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host_name: None,
            smtp_port: Self::DEFAULT_SMTP_PORT,
            ssl_smtp_port: Self::DEFAULT_SSL_SMTP_PORT,
            socket_connection_timeout: Self::DEFAULT_SOCKET_TIMEOUT,
            socket_timeout: Self::DEFAULT_SOCKET_TIMEOUT,
            credentials: None,
            bounce_address: None,
            start_tls_enabled: false,
            start_tls_required: false,
            ssl_on_connect: false,
            debug: false,
        }
    }
}

/// A derived mail session: string properties plus optional credentials
#[derive(Debug, Clone, PartialEq)]
pub struct MailSession {
    properties: BTreeMap<String, String>,
    credentials: Option<Credentials>,
}

impl MailSession {
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn host(&self) -> Option<&str> {
        self.property(MAIL_HOST)
    }

    pub fn port(&self) -> Option<u16> {
        self.property(MAIL_PORT).and_then(|port| port.parse().ok())
    }
}

/// Produces sessions from configuration
pub trait SessionFactory {
    fn create(&self, config: &SessionConfig) -> Result<MailSession, EmailError>;
}

/// Default factory producing SMTP session properties
#[derive(Debug, Default, Clone, Copy)]
pub struct SmtpSessionFactory;

impl SessionFactory for SmtpSessionFactory {
    fn create(&self, config: &SessionConfig) -> Result<MailSession, EmailError> {
        let host = config
            .host_name
            .as_deref()
            .map(str::trim)
            .filter(|host| !host.is_empty())
            .ok_or(EmailError::MissingHostName)?;

        let mut properties = BTreeMap::new();
        let mut set = |key: &str, value: String| {
            properties.insert(key.to_owned(), value);
        };

        set(MAIL_TRANSPORT_PROTOCOL, "smtp".to_owned());
        set(MAIL_HOST, host.to_owned());
        set(MAIL_PORT, config.smtp_port.to_string());
        set(MAIL_DEBUG, config.debug.to_string());
        set(
            MAIL_SMTP_CONNECTIONTIMEOUT,
            config.socket_connection_timeout.as_millis().to_string(),
        );
        set(MAIL_SMTP_TIMEOUT, config.socket_timeout.as_millis().to_string());

        if config.start_tls_enabled || config.start_tls_required {
            set(MAIL_SMTP_STARTTLS_ENABLE, "true".to_owned());
        }
        if config.start_tls_required {
            set(MAIL_SMTP_STARTTLS_REQUIRED, "true".to_owned());
        }
        if config.ssl_on_connect {
            set(MAIL_SMTP_SSL_ENABLE, "true".to_owned());
            set(MAIL_PORT, config.ssl_smtp_port.to_string());
        }
        if config.credentials.is_some() {
            set(MAIL_SMTP_AUTH, "true".to_owned());
        }
        if let Some(bounce) = &config.bounce_address {
            set(MAIL_SMTP_FROM, bounce.clone());
        }

        debug!(host, port = config.smtp_port, "derived mail session");

        Ok(MailSession {
            properties,
            credentials: config.credentials.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(host: &str) -> SessionConfig {
        SessionConfig {
            host_name: Some(host.to_string()),
            ..SessionConfig::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.host_name, None);
        assert_eq!(config.smtp_port, 25);
        assert_eq!(config.ssl_smtp_port, 465);
        assert_eq!(config.socket_connection_timeout, Duration::from_secs(60));
        assert_eq!(config.socket_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_session_has_host_property() {
        let session = SmtpSessionFactory.create(&config("smtp.example.com")).unwrap();

        assert_eq!(session.property(MAIL_HOST), Some("smtp.example.com"));
        assert_eq!(session.host(), Some("smtp.example.com"));
        assert_eq!(session.port(), Some(25));
        assert_eq!(session.property(MAIL_TRANSPORT_PROTOCOL), Some("smtp"));
        assert_eq!(session.property(MAIL_SMTP_CONNECTIONTIMEOUT), Some("60000"));
        assert_eq!(session.property(MAIL_SMTP_AUTH), None);
    }

    #[test]
    fn test_missing_host_name() {
        let result = SmtpSessionFactory.create(&SessionConfig::default());
        assert!(matches!(result, Err(EmailError::MissingHostName)));

        let result = SmtpSessionFactory.create(&config("   "));
        assert!(matches!(result, Err(EmailError::MissingHostName)));
    }

    #[test]
    fn test_auth_and_bounce() {
        let mut config = config("smtp.example.com");
        config.credentials = Some(Credentials::new("user", "secret"));
        config.bounce_address = Some("bounce@example.com".to_string());

        let session = SmtpSessionFactory.create(&config).unwrap();
        assert_eq!(session.property(MAIL_SMTP_AUTH), Some("true"));
        assert_eq!(session.property(MAIL_SMTP_FROM), Some("bounce@example.com"));
        assert_eq!(session.credentials().map(|c| c.username.as_str()), Some("user"));
    }

    #[test]
    fn test_ssl_on_connect_uses_ssl_port() {
        let mut config = config("smtp.example.com");
        config.ssl_on_connect = true;

        let session = SmtpSessionFactory.create(&config).unwrap();
        assert_eq!(session.property(MAIL_SMTP_SSL_ENABLE), Some("true"));
        assert_eq!(session.port(), Some(465));
    }

    #[test]
    fn test_start_tls_required_implies_enabled() {
        let mut config = config("smtp.example.com");
        config.start_tls_required = true;

        let session = SmtpSessionFactory.create(&config).unwrap();
        assert_eq!(session.property(MAIL_SMTP_STARTTLS_ENABLE), Some("true"));
        assert_eq!(session.property(MAIL_SMTP_STARTTLS_REQUIRED), Some("true"));
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let debug = format!("{:?}", Credentials::new("user", "secret"));
        assert!(debug.contains("user"));
        assert!(!debug.contains("secret"));
    }

    #[test]
    fn test_from_env() {
        temp_env::with_vars(
            [
                (ENV_HOST, Some("smtp.env.test")),
                (ENV_PORT, Some("2525")),
                (ENV_USER, Some("alice")),
                (ENV_PASSWORD, Some("pw")),
            ],
            || {
                let config = SessionConfig::from_env();
                assert_eq!(config.host_name.as_deref(), Some("smtp.env.test"));
                assert_eq!(config.smtp_port, 2525);
                assert_eq!(config.credentials, Some(Credentials::new("alice", "pw")));
            },
        );
    }

    #[test]
    fn test_from_env_defaults_when_unset() {
        temp_env::with_vars_unset([ENV_HOST, ENV_PORT, ENV_USER, ENV_PASSWORD], || {
            let config = SessionConfig::from_env();
            assert_eq!(config, SessionConfig::default());
        });
    }
}
