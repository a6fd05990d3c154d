//! Client for the Fastah "whereis" IP geolocation API.
//!
//! One blocking [`reqwest`] client is built per run and reused for every
//! lookup, so the TLS session and HTTP/2 connection are set up once per
//! batch rather than once per address.

use std::net::IpAddr;
use std::time::Duration;

use reqwest::blocking::{Client, ClientBuilder};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::trace;

use crate::error::{Error, Result};
use crate::location::LocationRecord;

/// Production endpoint; the textual IP is appended to it.
pub const DEFAULT_ENDPOINT: &str = "https://ep.api.getfastah.com/whereis/v1/json/";

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "Fastah-Key";

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of a remote lookup that reached the API and got an answer.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteOutcome {
    /// HTTP 200 with a well-formed location payload.
    Found(LocationRecord),
    /// Any other status.
    Rejected(ApiRejection),
}

/// A non-200 answer from the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRejection {
    pub status: u16,
    /// The `message` of the error body, or `None` if the body could not be parsed.
    pub message: Option<String>,
}

/// Trait for anything that can resolve an IP remotely.
pub trait RemoteLookup {
    /// Look up one address.
    ///
    /// Transport failures and undecodable success bodies are errors; an
    /// error status from the API is an `Ok(RemoteOutcome::Rejected)`.
    fn lookup(&self, ip: IpAddr) -> Result<RemoteOutcome>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocationResponse {
    location_data: LocationData,
}

// Every field is required by the API schema; a missing one fails decoding.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocationData {
    city_name: String,
    #[allow(dead_code)]
    continent_code: String,
    country_code: String,
    #[allow(dead_code)]
    country_name: String,
    lat: f64,
    lng: f64,
    tz: String,
}

impl From<LocationData> for LocationRecord {
    fn from(data: LocationData) -> Self {
        Self {
            country_code: data.country_code,
            city_name: data.city_name,
            latitude: data.lat,
            longitude: data.lng,
            timezone: data.tz,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProblemResponse {
    #[serde(default)]
    message: String,
}

/// HTTP client settings used by [`FastahClient::new`].
pub fn client_builder() -> ClientBuilder {
    Client::builder()
        .min_tls_version(reqwest::tls::Version::TLS_1_2)
        .connect_timeout(HANDSHAKE_TIMEOUT)
        .pool_idle_timeout(None)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
}

/// Blocking Fastah API client bound to one API key.
#[derive(Debug, Clone)]
pub struct FastahClient {
    http: Client,
    endpoint: String,
    api_key: String,
}

impl FastahClient {
    /// Build a client for `endpoint`.
    ///
    /// TLS 1.2 is the minimum accepted protocol version, new connections
    /// must finish connecting within five seconds, idle connections are
    /// kept for the life of the client and HTTP/2 is negotiated when the
    /// server offers it.
    pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>) -> Result<Self> {
        Self::with_builder(client_builder(), api_key, endpoint)
    }

    /// Build a client from a customised [`client_builder`].
    pub fn with_builder(
        builder: ClientBuilder,
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Result<Self> {
        let http = builder.build().map_err(Error::ClientBuild)?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        })
    }

    /// The request URL for `ip`.
    #[inline]
    pub fn url_for(&self, ip: IpAddr) -> String {
        format!("{}{}", self.endpoint, ip)
    }
}

impl RemoteLookup for FastahClient {
    fn lookup(&self, ip: IpAddr) -> Result<RemoteOutcome> {
        let url = self.url_for(ip);
        let transport = |source| Error::Transport {
            url: url.clone(),
            source,
        };

        let response = self
            .http
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .map_err(transport)?;

        let status = response.status();
        trace!(%ip, status = status.as_u16(), version = ?response.version(), "fastah response");

        // Read the whole body so the connection goes back to the pool.
        let body = response.bytes().map_err(transport)?;
        decode_response(ip, status, &body)
    }
}

fn decode_response(ip: IpAddr, status: StatusCode, body: &[u8]) -> Result<RemoteOutcome> {
    if status == StatusCode::OK {
        let parsed: LocationResponse =
            serde_json::from_slice(body).map_err(|source| Error::Decode {
                ip,
                status: status.as_u16(),
                source,
            })?;
        return Ok(RemoteOutcome::Found(parsed.location_data.into()));
    }

    let message = serde_json::from_slice::<ProblemResponse>(body)
        .ok()
        .map(|problem| problem.message);
    Ok(RemoteOutcome::Rejected(ApiRejection {
        status: status.as_u16(),
        message,
    }))
}
