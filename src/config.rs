use crate::error::Error;
use crate::Result;
use std::env;
use std::str::FromStr;
use std::sync::OnceLock;

pub fn config() -> &'static Config {
    static INSTANCE: OnceLock<Config> = OnceLock::new();

    INSTANCE.get_or_init(|| {
        Config::load_from_env().unwrap_or_else(|err| {
            panic!("FATAL - WHILE LOADING Config -cause: {:?}", err);
        })
    })
}

#[allow(non_snake_case)]
pub struct Config {
    // -- WordPress
    pub WP_URL: String,
    // -- DB
    pub DB_URL: String,
    // -- Schedule for the session purge worker
    pub PURGE_SCHEDULE: String,
    // -- Sessions
    pub SESSION_DAYS: i64,
}

impl Config {
    fn load_from_env() -> Result<Config> {
        Ok(Config {
            WP_URL: get_env("WP_URL")?.trim_end_matches('/').to_owned(),
            DB_URL: get_env("DB_URL")?,
            PURGE_SCHEDULE: get_env("PURGE_SCHEDULE")?,
            SESSION_DAYS: get_env_as_parse_or("SESSION_DAYS", 7)?,
        })
    }
}

fn get_env(name: &'static str) -> Result<String> {
    env::var(name).map_err(|_| Error::ConfigMissingEnv(name))
}

fn get_env_as_parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(val) => val.parse::<T>().map_err(|_| Error::ConfigWrongFormat(name)),
        Err(_) => Ok(default),
    }
}
