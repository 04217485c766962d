//! Position definition

use geo::geometry::Point;
use time::format_description::well_known;
use time::OffsetDateTime;

use crate::Result;

/// A recorded device position.
///
/// Every field is optional because device feeds are full of gaps: a fix
/// without a parsable time or without coordinates is still a record, it
/// only can't take part in the comparisons that need the missing value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Position {
    /// Longitude on `x`, latitude on `y`, in degrees
    pub coordinates: Option<Point>,
    pub time: Option<OffsetDateTime>,
    /// Meters
    pub altitude: Option<f64>,
    /// km/h
    pub speed: Option<f64>,
    /// Degrees from north
    pub course: Option<f64>,
    /// Estimated error radius in meters
    pub accuracy: Option<f64>,
    pub address: Option<String>,
}

impl Position {
    pub fn basic(coordinates: Point, time: OffsetDateTime) -> Self {
        Self {
            coordinates: Some(coordinates),
            time: Some(time),
            ..Default::default()
        }
    }

    pub fn speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);

        self
    }

    pub fn accuracy(mut self, accuracy: f64) -> Self {
        self.accuracy = Some(accuracy);

        self
    }

    pub fn latitude(&self) -> Option<f64> {
        self.coordinates.map(|c| c.y())
    }

    pub fn longitude(&self) -> Option<f64> {
        self.coordinates.map(|c| c.x())
    }

    /// Fix time in RFC3339, the way every output format writes it
    pub fn rfc3339_time(&self) -> Result<Option<String>> {
        Ok(self
            .time
            .map(|t| t.format(&well_known::Rfc3339))
            .transpose()?)
    }
}
