use log::warn;
use std::path::PathBuf;
use std::str::FromStr;

/// How a new record reaches the workbook.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PersistMode {
    /// Rewrite the workbook with only the submitted record.
    #[default]
    Overwrite,
    /// Read the existing rows back and rewrite them together with the new one.
    Merge,
}

impl FromStr for PersistMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "overwrite" => Ok(PersistMode::Overwrite),
            "merge" => Ok(PersistMode::Merge),
            other => Err(format!("unknown persist mode {:?}", other)),
        }
    }
}

/// Connection parameters for the certificates database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
}

/// Application settings, read once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database: DatabaseSettings,
    /// Directory holding `certificate_records.xlsx`
    pub workbook_dir: PathBuf,
    /// Directory holding `{certificate_number}.jpg` photos
    pub photo_dir: PathBuf,
    pub bind_addr: String,
    pub persist_mode: PersistMode,
}

impl Config {
    /// Read settings from the environment, after loading `.env` if present.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup; unset keys take their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let text = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Self {
            database: DatabaseSettings {
                host: text("DB_HOST", "localhost"),
                port: parsed(&lookup, "DB_PORT", 3306),
                user: text("DB_USER", "root"),
                password: text("DB_PASSWORD", ""),
                name: text("DB_NAME", "certbook"),
            },
            workbook_dir: PathBuf::from(text("WORKBOOK_DIR", "data/workbooks")),
            photo_dir: PathBuf::from(text("PHOTO_DIR", "data/photos")),
            bind_addr: text("BIND_ADDR", "127.0.0.1:3000"),
            persist_mode: parsed(&lookup, "PERSIST_MODE", PersistMode::Overwrite),
        }
    }
}

fn parsed<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|e| {
            warn!("ignoring {}={:?}: {}", key, raw, e);
            default
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = config_from(&[]);

        assert_eq!(config.database.host, "localhost");
        assert_eq!(config.database.port, 3306);
        assert_eq!(config.database.user, "root");
        assert_eq!(config.database.password, "");
        assert_eq!(config.database.name, "certbook");
        assert_eq!(config.workbook_dir, PathBuf::from("data/workbooks"));
        assert_eq!(config.photo_dir, PathBuf::from("data/photos"));
        assert_eq!(config.bind_addr, "127.0.0.1:3000");
        assert_eq!(config.persist_mode, PersistMode::Overwrite);
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = config_from(&[
            ("DB_HOST", "db.internal"),
            ("DB_PORT", "3307"),
            ("DB_USER", "reader"),
            ("DB_PASSWORD", "s3cret"),
            ("DB_NAME", "quality"),
            ("PHOTO_DIR", "/srv/photos"),
            ("PERSIST_MODE", "Merge"),
        ]);

        assert_eq!(config.database.host, "db.internal");
        assert_eq!(config.database.port, 3307);
        assert_eq!(config.database.user, "reader");
        assert_eq!(config.database.password, "s3cret");
        assert_eq!(config.database.name, "quality");
        assert_eq!(config.photo_dir, PathBuf::from("/srv/photos"));
        assert_eq!(config.persist_mode, PersistMode::Merge);
    }

    #[test]
    fn unparseable_values_fall_back() {
        let config = config_from(&[("DB_PORT", "not-a-port"), ("PERSIST_MODE", "append")]);

        assert_eq!(config.database.port, 3306);
        assert_eq!(config.persist_mode, PersistMode::Overwrite);
    }
}
