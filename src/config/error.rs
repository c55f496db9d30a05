//! Configuration error types.

/// Configuration loading or validation error. Always fatal.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse YAML config {path}: {source}")]
    ParseYaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to parse JSON config {path}: {source}")]
    ParseJson {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to parse TOML config {path}: {source}")]
    ParseToml {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Unsupported config format for {0}: .{1}")]
    UnsupportedFormat(String, String),

    #[error("Registry module with empty name")]
    EmptyModuleName,

    #[error("Duplicate registry module: {0}")]
    DuplicateModule(String),

    #[error("Module name '{0}' is reserved for issues no module owns")]
    ReservedModule(String),

    #[error("Scope prefix must start with '/': {0}")]
    ScopePrefix(String),

    #[error("Internal route must be '[VERB] /path': {0}")]
    InternalRoute(String),

    #[error("client.wrapper must be a plain identifier: '{0}'")]
    Wrapper(String),

    #[error("layout.{0} must not be empty")]
    EmptyLayoutDir(&'static str),
}
