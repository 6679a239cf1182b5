use super::jwt;
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Claims expected inside an admin access token
#[derive(Deserialize)]
pub struct AccessTokenClaims {
    /// Expires at
    #[serde(with = "time")]
    pub exp: DateTime<Utc>,
    /// Issued at
    #[serde(with = "time")]
    pub iat: DateTime<Utc>,
    /// Issuer (URL to the OIDC Provider)
    pub iss: String,
    /// Subject (User ID)
    pub sub: String,
}

impl jwt::VerifyClaims for AccessTokenClaims {
    fn exp(&self) -> DateTime<Utc> {
        self.exp
    }
}

mod time {
    use chrono::{DateTime, TimeZone, Utc};
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let seconds: i64 = Deserialize::deserialize(deserializer)?;

        Utc.timestamp_opt(seconds, 0).single().ok_or_else(|| {
            serde::de::Error::custom(format!(
                "Failed to convert {} seconds to DateTime<Utc>",
                seconds
            ))
        })
    }
}
