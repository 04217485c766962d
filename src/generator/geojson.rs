//! GeoJSON generator API

use serde_json::{json, Value};

use crate::{Position, Result};

pub struct GeoJsonGenerator {
    /// Device name
    pub name: String,
}

impl GeoJsonGenerator {
    pub fn new(name: String) -> Self {
        Self { name }
    }

    /// FeatureCollection with one Point feature per located position
    pub fn generate(&self, positions: &[Position]) -> Result<String> {
        let mut features = vec![];

        for poi in positions {
            let c = match poi.coordinates {
                Some(c) => c,
                None => continue,
            };

            let coordinates = match poi.altitude {
                Some(alt) => json!([c.x(), c.y(), alt]),
                None => json!([c.x(), c.y()]),
            };

            features.push(json!({
                "type": "Feature",
                "geometry": {
                    "type": "Point",
                    "coordinates": coordinates,
                },
                "properties": {
                    "deviceName": self.name,
                    "time": poi.rfc3339_time()?,
                    "speed": poi.speed,
                    "course": poi.course,
                    "accuracy": poi.accuracy,
                }
            }));
        }

        let collection = json!({
            "type": "FeatureCollection",
            "features": Value::Array(features),
        });

        Ok(serde_json::to_string_pretty(&collection)?)
    }
}
