//! Runtime configuration, resolved once from the environment at startup.

use std::{env, fmt, net::SocketAddr, path::PathBuf};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_MAIL_HOST: &str = "smtp.gmail.com";
const DEFAULT_MAIL_PORT: u16 = 465;
const DEFAULT_MAIL_FROM: &str = "no-reply@medicine-order.local";

/// SMTP relay settings. The password never appears in `Debug` output.
#[derive(Clone, Default)]
pub struct MailSettings {
    pub host: String,
    pub port: u16,
    pub starttls: bool,
    pub username: String,
    pub password: String,
    pub from: String,
}

impl MailSettings {
    pub fn from_env() -> Self {
        let username = env::var("MAIL_USERNAME").unwrap_or_default();
        let from = env::var("MAIL_FROM")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| (!username.is_empty()).then(|| username.clone()))
            .unwrap_or(DEFAULT_MAIL_FROM.to_string());

        Self {
            host: env::var("MAIL_HOST").unwrap_or(DEFAULT_MAIL_HOST.to_string()),
            port: env::var("MAIL_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_MAIL_PORT),
            starttls: env::var("MAIL_STARTTLS")
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            password: env::var("MAIL_PASSWORD").unwrap_or_default(),
            username,
            from,
        }
    }

    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

impl fmt::Debug for MailSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("starttls", &self.starttls)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("from", &self.from)
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct PortalConfig {
    pub bind_addr: SocketAddr,
    pub receipt_dir: Option<PathBuf>,
    pub mail: MailSettings,
}

impl PortalConfig {
    pub fn from_env() -> Result<Self, std::net::AddrParseError> {
        let bind_addr = env::var("PORTAL_BIND_ADDR")
            .unwrap_or(DEFAULT_BIND_ADDR.to_string())
            .parse()?;
        let receipt_dir = env::var("RECEIPT_DIR")
            .ok()
            .filter(|d| !d.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            bind_addr,
            receipt_dir,
            mail: MailSettings::from_env(),
        })
    }
}
