use chrono::{DateTime, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// GitHub App credentials, validated when constructed.
#[derive(Clone)]
pub struct AppCredentials {
    app_id: u64,
    installation_id: u64,
    private_key: EncodingKey,
}

impl std::fmt::Debug for AppCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppCredentials")
            .field("app_id", &self.app_id)
            .field("installation_id", &self.installation_id)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

#[derive(Serialize)]
struct AppClaims {
    iat: i64,
    exp: i64,
    iss: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstallationToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl AppCredentials {
    pub fn new(app_id: &str, private_key: &str, installation_id: &str) -> Result<Self> {
        let app_id = parse_id("GITHUB_APP_ID", app_id)?;
        let installation_id = parse_id("GITHUB_APP_INSTALLATION_ID", installation_id)?;

        let pem = normalize_private_key(private_key);
        if pem.is_empty() {
            return Err(Error::Config("GitHub App private key is empty".to_string()));
        }
        let private_key = EncodingKey::from_rsa_pem(pem.as_bytes())
            .map_err(|e| Error::Config(format!("Invalid GitHub App private key: {}", e)))?;

        Ok(Self {
            app_id,
            installation_id,
            private_key,
        })
    }

    pub fn app_id(&self) -> u64 {
        self.app_id
    }

    pub fn installation_id(&self) -> u64 {
        self.installation_id
    }

    /// Short-lived RS256 token identifying the app itself. Issued a minute
    /// in the past to tolerate clock drift; GitHub rejects lifetimes over
    /// ten minutes.
    pub fn app_jwt(&self) -> Result<String> {
        let now = Utc::now().timestamp();
        let claims = AppClaims {
            iat: now - 60,
            exp: now + 9 * 60,
            iss: self.app_id.to_string(),
        };
        Ok(encode(&Header::new(Algorithm::RS256), &claims, &self.private_key)?)
    }
}

fn parse_id(name: &str, value: &str) -> Result<u64> {
    match value.trim().parse::<u64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(Error::Config(format!(
            "{} must be a positive integer, got '{}'",
            name,
            value.trim()
        ))),
    }
}

/// Keys stored in env files usually carry literal `\n` sequences and
/// sometimes surrounding quotes.
pub fn normalize_private_key(raw: &str) -> String {
    raw.trim()
        .trim_matches('"')
        .replace("\\n", "\n")
        .trim()
        .to_string()
}
