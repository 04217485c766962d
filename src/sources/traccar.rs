//! Traccar server integration

use std::time::Duration;

use geo::geometry::Point;
use reqwest::blocking::Client;
use serde::Deserialize;
use time::format_description::well_known;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};
use tracing::{debug, info, warn};

use super::PositionsSource;
use crate::{Error, Position, Result};

/// Traccar reports speeds in knots
pub const KNOTS_TO_KMH: f64 = 1.852;

const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Device registered on the server
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Device {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "uniqueId", default)]
    pub unique_id: String,
    #[serde(default)]
    pub status: Option<String>,
}

impl Device {
    pub fn is_online(&self) -> bool {
        self.status.as_deref() == Some("online")
    }
}

/// Position as served by `/api/positions`
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiPosition {
    fix_time: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    altitude: Option<f64>,
    speed: Option<f64>,
    course: Option<f64>,
    accuracy: Option<f64>,
    address: Option<String>,
}

impl ApiPosition {
    fn into_position(self) -> Position {
        let coordinates = match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some(Point::new(lng, lat)),
            _ => None,
        };

        Position {
            coordinates,
            time: self.fix_time.as_deref().and_then(parse_fix_time),
            altitude: self.altitude,
            speed: self.speed.map(|knots| knots * KNOTS_TO_KMH),
            course: self.course,
            accuracy: self.accuracy,
            address: self.address.filter(|a| !a.trim().is_empty()),
        }
    }
}

/// Newer servers answer RFC3339, older ones omit the offset colon
fn parse_fix_time(raw: &str) -> Option<OffsetDateTime> {
    let compact_offset = format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond][offset_hour sign:mandatory][offset_minute]"
    );

    OffsetDateTime::parse(raw, &well_known::Rfc3339)
        .or_else(|_| OffsetDateTime::parse(raw, compact_offset))
        .ok()
}

/// Parse the JSON body of `/api/positions`.
///
/// Fixes with an unparsable time or without coordinates are kept, with
/// the missing parts left empty.
pub fn parse_positions(body: &str) -> Result<Vec<Position>> {
    let raw: Vec<ApiPosition> = serde_json::from_str(body)?;

    let positions: Vec<Position> = raw.into_iter().map(ApiPosition::into_position).collect();

    let untimed = positions.iter().filter(|p| p.time.is_none()).count();
    let unlocated = positions.iter().filter(|p| p.coordinates.is_none()).count();
    if untimed > 0 || unlocated > 0 {
        warn!(untimed, unlocated, "Incomplete positions received");
    }

    Ok(positions)
}

/// Lookup a device by id, unique id or name (case insensitive)
pub(crate) fn find_device(devices: Vec<Device>, key: &str) -> Result<Device> {
    let key = key.trim();

    devices
        .into_iter()
        .find(|d| {
            d.id.to_string() == key
                || d.unique_id == key
                || d.name.to_lowercase() == key.to_lowercase()
        })
        .ok_or_else(|| Error::DeviceNotFound(key.to_string()))
}

/// Format used by the API on the `from` and `to` parameters
fn api_time(time: OffsetDateTime) -> Result<String> {
    let format = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].000Z");

    Ok(time.to_offset(UtcOffset::UTC).format(format)?)
}

/// Traccar REST API client, authenticated with HTTP basic auth
pub struct TraccarClient {
    client: Client,
    server: String,
    email: String,
    password: String,
}

impl std::fmt::Debug for TraccarClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TraccarClient")
            .field("server", &self.server)
            .field("email", &self.email)
            .finish()
    }
}

impl TraccarClient {
    pub fn new(server: &str, email: &str, password: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .user_agent(concat!("traccar2gpx/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            server: server.trim().trim_end_matches('/').to_string(),
            email: email.to_string(),
            password: password.to_string(),
        })
    }

    fn get(&self, path: &str, query: &[(&str, String)]) -> Result<String> {
        let url = format!("{}{}", self.server, path);
        debug!(%url, "Requesting");

        let response = self
            .client
            .get(&url)
            .basic_auth(&self.email, Some(&self.password))
            .query(query)
            .send()?;

        let status = response.status();
        let body = response.text()?;

        if !status.is_success() {
            return Err(Error::Status {
                url,
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }

    /// Check the server and the credentials
    pub fn test_connection(&self) -> Result<()> {
        self.get("/api/session", &[])?;
        info!(server = %self.server, "Connected to Traccar server");

        Ok(())
    }

    pub fn devices(&self) -> Result<Vec<Device>> {
        let body = self.get("/api/devices", &[])?;

        Ok(serde_json::from_str(&body)?)
    }

    /// Device by id, unique id or name
    pub fn device(&self, key: &str) -> Result<Device> {
        find_device(self.devices()?, key)
    }

    pub fn positions(
        &self,
        device_id: i64,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> Result<Vec<Position>> {
        let query = [
            ("deviceId", device_id.to_string()),
            ("from", api_time(start)?),
            ("to", api_time(end)?),
        ];
        let body = self.get("/api/positions", &query)?;

        let positions = parse_positions(&body)?;
        info!(device_id, count = positions.len(), "Positions fetched");

        Ok(positions)
    }
}

/// Positions of one device from a Traccar server
pub struct TraccarSource {
    client: TraccarClient,
    device_id: i64,
}

impl TraccarSource {
    pub fn new(client: TraccarClient, device_id: i64) -> Self {
        Self { client, device_id }
    }
}

impl PositionsSource for TraccarSource {
    fn fetch(&mut self, start: OffsetDateTime, end: OffsetDateTime) -> Result<Vec<Position>> {
        self.client.positions(self.device_id, start, end)
    }
}
