//! Connection and behavior configuration.

use crate::clause::FilterBinding;
use std::fmt;

/// Where and as whom to connect.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectOptions {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    /// Reported to the server as `application_name`.
    pub application_name: Option<String>,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            database: String::new(),
            user: String::new(),
            password: String::new(),
            application_name: None,
        }
    }
}

impl fmt::Debug for ConnectOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectOptions")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("application_name", &self.application_name)
            .finish()
    }
}

impl ConnectOptions {
    /// Options for `database` as `user`, on localhost:5432.
    pub fn new(
        database: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            database: database.into(),
            user: user.into(),
            password: password.into(),
            ..Self::default()
        }
    }

    /// Read the standard libpq variables (`PGHOST`, `PGPORT`, `PGDATABASE`,
    /// `PGUSER`, `PGPASSWORD`).
    ///
    /// Unset variables keep their defaults; an unparsable `PGPORT` is ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut options = Self::default();
        if let Some(host) = lookup("PGHOST") {
            options.host = host;
        }
        if let Some(port) = lookup("PGPORT") {
            match port.parse() {
                Ok(port) => options.port = port,
                Err(_) => tracing::warn!(target: "pgdal", port = %port, "ignoring invalid PGPORT"),
            }
        }
        if let Some(database) = lookup("PGDATABASE") {
            options.database = database;
        }
        if let Some(user) = lookup("PGUSER") {
            options.user = user;
        }
        if let Some(password) = lookup("PGPASSWORD") {
            options.password = password;
        }
        options
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    pub fn application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = Some(name.into());
        self
    }

    /// True when database, user and password are all non-empty.
    pub fn has_credentials(&self) -> bool {
        !self.database.is_empty() && !self.user.is_empty() && !self.password.is_empty()
    }

    /// Driver configuration for these options.
    pub fn to_pg_config(&self) -> tokio_postgres::Config {
        let mut config = tokio_postgres::Config::new();
        config
            .host(&self.host)
            .port(self.port)
            .dbname(&self.database)
            .user(&self.user)
            .password(&self.password);
        if let Some(name) = &self.application_name {
            config.application_name(name);
        }
        config
    }
}

impl From<&ConnectOptions> for tokio_postgres::Config {
    fn from(options: &ConnectOptions) -> Self {
        options.to_pg_config()
    }
}

/// Behavior of a [`Dal`](crate::Dal).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DalConfig {
    /// How comparator operands reach the statement.
    pub filter_binding: FilterBinding,
    /// Byte limit for SQL in log events; `None` logs it whole.
    pub max_logged_sql: Option<usize>,
}

impl Default for DalConfig {
    fn default() -> Self {
        Self {
            filter_binding: FilterBinding::default(),
            max_logged_sql: Some(200),
        }
    }
}

impl DalConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set how comparator operands are rendered.
    pub fn filter_binding(mut self, binding: FilterBinding) -> Self {
        self.filter_binding = binding;
        self
    }

    /// Limit logged SQL to `max` bytes.
    pub fn max_logged_sql(mut self, max: usize) -> Self {
        self.max_logged_sql = Some(max);
        self
    }

    /// Log SQL without truncation.
    pub fn log_full_sql(mut self) -> Self {
        self.max_logged_sql = None;
        self
    }
}
