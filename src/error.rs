use std::net::IpAddr;

use camino::Utf8PathBuf;

/// Error types for the whereis library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The user's home directory could not be determined.
    #[error("could not determine the home directory (is $HOME set?)")]
    HomeDirUnavailable,

    /// The local MMDB database could not be opened.
    #[error("failed to open database {path}")]
    DatabaseOpen {
        path: Utf8PathBuf,
        #[source]
        source: maxminddb::MaxMindDbError,
    },

    /// IP address lookup failed in the local MMDB database.
    #[error("database lookup failed for {ip}")]
    LookupFailed {
        ip: IpAddr,
        #[source]
        source: maxminddb::MaxMindDbError,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client")]
    ClientBuild(#[source] reqwest::Error),

    /// The request to the Fastah API could not be completed.
    #[error("request to {url} failed")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// A successful API response did not match the expected data model.
    #[error("failed to parse Fastah API response for {ip} (HTTP {status}); has the data model changed?")]
    Decode {
        ip: IpAddr,
        status: u16,
        #[source]
        source: serde_json::Error,
    },

    /// No API key was found in the config file or environment.
    #[error("no Fastah API key configured; run `whereis init --fastah-api-key <KEY>` or set FASTAH_API_KEY")]
    MissingApiKey,

    /// The config file exists but could not be read.
    #[error("failed to read config file {path}")]
    ConfigRead {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not a YAML mapping.
    #[error("malformed config file {path}")]
    ConfigParse {
        path: Utf8PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The config values could not be serialized.
    #[error("failed to encode config for {path}")]
    ConfigEncode {
        path: Utf8PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The config file could not be written.
    #[error("failed to write config file {path}")]
    ConfigWrite {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading the input stream failed before end-of-stream.
    #[error("failed to read input")]
    Input(#[source] std::io::Error),
}

/// Convenience type alias for Results using the library error.
pub type Result<T> = std::result::Result<T, Error>;
