use base64::Engine;
use std::path::PathBuf;
use std::{env, fs};

use crate::error::SecurityError;
use crate::util;

const ACCESS_TOKEN_SECRET: &str = "access_token.secret";
const SECRET_LENGTH: usize = 64;

/// Secrets needed at runtime. Never serialized into the configuration file.
#[derive(Clone)]
pub struct Security {
    pub jwt_secret: Vec<u8>,
    pub stripe_secret_key: Option<String>,
}

impl std::fmt::Debug for Security {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Security")
            .field("jwt_secret", &"<redacted>")
            .field("stripe_secret_key", &self.stripe_secret_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[inline]
fn security_dir() -> PathBuf {
    PathBuf::from(env::var("SECURITY_DIR").unwrap_or("./security".to_string()))
}

impl Security {
    pub fn new(jwt_secret: impl Into<Vec<u8>>) -> Security {
        Security {
            jwt_secret: jwt_secret.into(),
            stripe_secret_key: None,
        }
    }

    pub fn load() -> Result<Security, SecurityError> {
        let stripe_secret_key = env::var("STRIPE_SECRET_KEY").ok();
        if stripe_secret_key.is_none() {
            tracing::warn!("STRIPE_SECRET_KEY not set; payment intents will be rejected.");
        }

        tracing::info!("Loading access token secret...");
        if let Ok(secret) = env::var("ACCESS_TOKEN_SECRET") {
            if secret.is_empty() {
                return Err(SecurityError::EmptySecret);
            }
            tracing::info!("Access token secret loaded from environment.");
            return Ok(Security {
                jwt_secret: secret.into_bytes(),
                stripe_secret_key,
            });
        }

        let dir = security_dir();
        let path = dir.join(ACCESS_TOKEN_SECRET);
        let jwt_secret = match fs::read_to_string(&path) {
            Ok(stored) => {
                let secret = util::base64_engine().decode(stored.trim())?;
                if secret.is_empty() {
                    return Err(SecurityError::EmptySecret);
                }
                tracing::info!("Access token secret found and loaded.");
                secret
            }
            Err(_) => Self::generate_secret(dir, path)?,
        };

        Ok(Security {
            jwt_secret,
            stripe_secret_key,
        })
    }

    #[cfg(feature = "generate-security")]
    fn generate_secret(dir: PathBuf, path: PathBuf) -> Result<Vec<u8>, SecurityError> {
        use rand::RngCore;

        tracing::info!(
            "Access token secret not found in '{}'. Generating a new one.",
            path.display()
        );
        fs::create_dir_all(dir)?;

        let mut secret = vec![0u8; SECRET_LENGTH];
        rand::thread_rng().fill_bytes(&mut secret);
        fs::write(&path, util::base64_engine().encode(&secret))?;

        Ok(secret)
    }

    #[cfg(not(feature = "generate-security"))]
    fn generate_secret(_dir: PathBuf, path: PathBuf) -> Result<Vec<u8>, SecurityError> {
        Err(SecurityError::MissingSecret(path))
    }
}
