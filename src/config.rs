use std::fmt;

/// Connection parameters for the Postgres store.
#[derive(Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            name: "spark_streaming_db".to_string(),
            user: "postgres".to_string(),
            password: String::new(),
        }
    }
}

// Never print the password.
impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("name", &self.name)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    Postgres,
    Sqlite { path: String },
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Postgres => "postgres",
            Backend::Sqlite { .. } => "sqlite",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub backend: Backend,
    pub bind_addr: String,
    pub out_dir: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves every option through `lookup`, falling back to the built-in
    /// default when a key is unset, empty or unparsable.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = DbConfig::default();

        let db = DbConfig {
            host: get("DATABASE_HOST").unwrap_or(defaults.host),
            port: get("DATABASE_PORT")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.port),
            name: get("DATABASE_NAME").unwrap_or(defaults.name),
            user: get("DATABASE_USER").unwrap_or(defaults.user),
            password: lookup("DATABASE_PASSWORD").unwrap_or(defaults.password),
        };

        let backend = match get("DATABASE_BACKEND").as_deref().map(str::trim) {
            Some("sqlite") => Backend::Sqlite {
                path: get("SQLITE_PATH").unwrap_or_else(|| "yelp.db".to_string()),
            },
            _ => Backend::Postgres,
        };

        Self {
            db,
            backend,
            bind_addr: get("DASHBOARD_ADDR").unwrap_or_else(|| "127.0.0.1:8501".to_string()),
            out_dir: get("OUT_DIR").unwrap_or_else(|| "out/dashboard".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let cfg = Config::from_lookup(lookup(&[]));
        assert_eq!(cfg.db, DbConfig::default());
        assert_eq!(cfg.db.host, "localhost");
        assert_eq!(cfg.db.port, 5432);
        assert_eq!(cfg.db.name, "spark_streaming_db");
        assert_eq!(cfg.backend, Backend::Postgres);
        assert_eq!(cfg.bind_addr, "127.0.0.1:8501");
    }

    #[test]
    fn test_env_overrides() {
        let cfg = Config::from_lookup(lookup(&[
            ("DATABASE_HOST", "db.internal"),
            ("DATABASE_PORT", "6543"),
            ("DATABASE_NAME", "yelp"),
            ("DATABASE_USER", "analyst"),
            ("DATABASE_PASSWORD", "s3cret"),
        ]));
        assert_eq!(cfg.db.host, "db.internal");
        assert_eq!(cfg.db.port, 6543);
        assert_eq!(cfg.db.name, "yelp");
        assert_eq!(cfg.db.user, "analyst");
        assert_eq!(cfg.db.password, "s3cret");
    }

    #[test]
    fn test_bad_port_falls_back() {
        let cfg = Config::from_lookup(lookup(&[("DATABASE_PORT", "fivefourthreetwo")]));
        assert_eq!(cfg.db.port, 5432);
    }

    #[test]
    fn test_sqlite_backend() {
        let cfg = Config::from_lookup(lookup(&[
            ("DATABASE_BACKEND", "sqlite"),
            ("SQLITE_PATH", "/tmp/snap.db"),
        ]));
        assert_eq!(cfg.backend, Backend::Sqlite { path: "/tmp/snap.db".into() });
    }

    #[test]
    fn test_debug_redacts_password() {
        let cfg = Config::from_lookup(lookup(&[("DATABASE_PASSWORD", "hunter2")]));
        let shown = format!("{:?}", cfg);
        assert!(!shown.contains("hunter2"));
        assert!(shown.contains("[REDACTED]"));
    }
}
