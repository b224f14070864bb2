use std::{env::var, sync::Arc};

use dotenv::dotenv;
use eyre::{bail, eyre, Context, Error};
use log::debug;

const DEFAULT_MONGO_DB: &str = "pet_booking";
const DEFAULT_SLOT_GRANULARITY_MIN: u32 = 30;
const MAX_SLOT_GRANULARITY_MIN: u32 = 24 * 60;

#[derive(Clone)]
pub struct Env(Arc<EnvInner>);

#[derive(Clone)]
pub struct EnvInner {
    mongo_url: String,
    mongo_db: String,
    slot_granularity_min: u32,
    rust_log: Option<String>,
}

impl Env {
    pub fn mongo_url(&self) -> &str {
        &self.0.mongo_url
    }

    pub fn mongo_db(&self) -> &str {
        &self.0.mongo_db
    }

    pub fn slot_granularity_min(&self) -> u32 {
        self.0.slot_granularity_min
    }

    pub fn rust_log(&self) -> Option<&str> {
        self.0.rust_log.as_deref()
    }

    /// Reads `.env` if there is one, then the process environment.
    pub fn load() -> Result<Env, Error> {
        if let Err(err) = dotenv() {
            debug!("No .env loaded: {}", err);
        }
        Env::from_lookup(|key| var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Env, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mongo_url = lookup("MONGO_URL").ok_or_else(|| eyre!("MONGO_URL is not set"))?;
        let mongo_db = lookup("MONGO_DB").unwrap_or_else(|| DEFAULT_MONGO_DB.to_owned());
        let slot_granularity_min = match lookup("SLOT_GRANULARITY_MIN") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .with_context(|| format!("SLOT_GRANULARITY_MIN is not a number: {:?}", raw))?,
            None => DEFAULT_SLOT_GRANULARITY_MIN,
        };
        if slot_granularity_min == 0 || slot_granularity_min > MAX_SLOT_GRANULARITY_MIN {
            bail!(
                "SLOT_GRANULARITY_MIN must be between 1 and {}, got {}",
                MAX_SLOT_GRANULARITY_MIN,
                slot_granularity_min
            );
        }

        Ok(Env(Arc::new(EnvInner {
            mongo_url,
            mongo_db,
            slot_granularity_min,
            rust_log: lookup("RUST_LOG"),
        })))
    }
}
