//! Track generator API

use gpx::{Track, TrackSegment, Waypoint};

use crate::Position;

pub struct Tracker {
    /// Device name, used as the track name
    pub device: String,
}

impl Tracker {
    /// Start a new tracker instance
    pub fn new(device: String) -> Self {
        Self { device }
    }

    /// Build a single segment track, in the given order.
    ///
    /// Positions without coordinates can't be drawn and are left out.
    pub fn build(&self, positions: &[Position]) -> Track {
        let mut track = Track::new();
        track.name = Some(self.device.clone());

        let mut tseg = TrackSegment::new();

        for poi in positions {
            let coordinates = match poi.coordinates {
                Some(c) => c,
                None => continue,
            };

            let mut wp = Waypoint::new(coordinates);

            wp.time = poi.time.map(|t| t.into());
            wp.elevation = poi.altitude;
            // GPX speeds are in m/s
            wp.speed = poi.speed.map(|kmh| kmh / 3.6);

            tseg.points.push(wp);
        }

        track.segments.push(tseg);

        track
    }
}
