use crate::data::store::StoreKind;
use crate::enrollment::Consistency;
use crate::error::ConfigurationError;
use crate::util;
use std::env;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

const DEFAULT_CLUSTER: &str = "artzone.efur78y.mongodb.net";

/// Connection string from an explicit URI, or from cluster credentials.
fn connection_uri(
    uri: Option<String>,
    user: Option<String>,
    pass: Option<String>,
    cluster: Option<String>,
) -> String {
    if let Some(uri) = uri {
        return uri;
    }

    match (user, pass) {
        (Some(user), Some(pass)) => {
            let cluster = cluster.unwrap_or(DEFAULT_CLUSTER.to_string());
            format!("mongodb+srv://{user}:{pass}@{cluster}/?retryWrites=true&w=majority")
        }
        _ => "mongodb://localhost:27017".to_string(),
    }
}

fn env_mongodb_uri() -> String {
    connection_uri(
        env::var("MONGODB_URI").ok(),
        env::var("DB_USER").ok(),
        env::var("DB_PASS").ok(),
        env::var("DB_CLUSTER").ok(),
    )
}

fn default_mongodb_db() -> String {
    env::var("MONGODB_DB_NAME").unwrap_or("artZone".to_string())
}

fn default_max_pool_size() -> u32 {
    10
}

fn env_port() -> u16 {
    env::var("PORT")
        .ok()
        .and_then(|it| it.parse().ok())
        .unwrap_or(5000)
}

fn default_stripe_api_base() -> String {
    env::var("STRIPE_API_BASE").unwrap_or("https://api.stripe.com".to_string())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(skip)]
    file_path: PathBuf,

    /// `memory` runs without a database; nothing outlives the process.
    #[serde(default)]
    pub store: StoreKind,
    /// Read from the environment on every start unless set here. Never
    /// written back, since it usually carries the database password.
    #[serde(default, skip_serializing)]
    mongodb_uri: Option<String>,
    #[serde(default = "default_mongodb_db")]
    pub mongodb_db: String,
    /// Upper bound of pooled MongoDB connections shared by all requests.
    #[serde(default = "default_max_pool_size")]
    pub max_pool_size: u32,

    /// `PORT` from the environment unless set here.
    #[serde(default, skip_serializing)]
    port: Option<u16>,

    #[serde(default)]
    pub payment_consistency: Consistency,

    #[serde(default = "default_stripe_api_base")]
    pub stripe_api_base: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            file_path: config_dir().join("settings.yml"),
            store: StoreKind::default(),
            mongodb_uri: None,
            mongodb_db: default_mongodb_db(),
            max_pool_size: default_max_pool_size(),
            port: None,
            payment_consistency: Consistency::default(),
            stripe_api_base: default_stripe_api_base(),
        }
    }
}

#[inline]
fn config_dir() -> PathBuf {
    PathBuf::from(env::var("CONFIG_DIR").unwrap_or("./config".to_string()))
}

impl Config {
    pub fn mongodb_uri(&self) -> String {
        self.mongodb_uri.clone().unwrap_or_else(env_mongodb_uri)
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or_else(env_port)
    }

    pub fn load() -> Result<Config, ConfigurationError> {
        let config_file = util::find_first_subpath(
            config_dir(),
            &["settings.yml", "settings.yaml"],
            Path::exists,
        )
        .ok_or_else(|| ConfigurationError::NotFound(config_dir()))?;

        let file = File::open(&config_file)?;
        let mut config: Config = serde_yaml::from_reader(BufReader::new(file))?;
        config.file_path = config_file;

        Ok(config)
    }

    pub fn save(&self) -> Result<(), ConfigurationError> {
        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(&self.file_path)?;
        let mut out = BufWriter::new(file);
        serde_yaml::to_writer(&mut out, self)?;
        out.flush()?;
        Ok(())
    }
}
