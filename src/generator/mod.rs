//! Output documents API

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::{Error, Position, Result};

pub mod geojson;
pub mod gpx;
pub mod kml;
pub mod position;
pub mod table;
pub mod tracker;

#[cfg(test)]
mod tests;

use self::geojson::GeoJsonGenerator;
use self::gpx::GpxGenerator;
use self::kml::KmlGenerator;
use self::tracker::Tracker;

/// Supported output formats
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Gpx,
    Kml,
    Kmz,
    GeoJson,
    Csv,
}

impl Format {
    pub fn extension(&self) -> &'static str {
        match self {
            Format::Gpx => "gpx",
            Format::Kml => "kml",
            Format::Kmz => "kmz",
            Format::GeoJson => "geojson",
            Format::Csv => "csv",
        }
    }

    /// Format matching the file extension, if any
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .and_then(|e| e.parse().ok())
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.extension().to_uppercase())
    }
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "gpx" => Ok(Format::Gpx),
            "kml" => Ok(Format::Kml),
            "kmz" => Ok(Format::Kmz),
            "geojson" | "json" => Ok(Format::GeoJson),
            "csv" => Ok(Format::Csv),
            other => Err(Error::Config(format!(
                "Unknown output format `{}`, expected one of gpx, kml, kmz, geojson, csv",
                other
            ))),
        }
    }
}

/// Serialize the device positions in the format
pub fn encode(format: Format, device: &str, positions: &[Position]) -> Result<Vec<u8>> {
    match format {
        Format::Gpx => {
            let mut gpx = GpxGenerator::empty(format!("{} Track", device));
            gpx.tracks
                .push(Tracker::new(device.to_string()).build(positions));

            let mut out = vec![];
            gpx.write(&mut out)?;

            Ok(out)
        }
        Format::Kml => Ok(KmlGenerator::new(device.to_string())
            .generate(positions)?
            .into_bytes()),
        Format::Kmz => KmlGenerator::new(device.to_string()).compressed(positions),
        Format::GeoJson => Ok(GeoJsonGenerator::new(device.to_string())
            .generate(positions)?
            .into_bytes()),
        Format::Csv => table::generate(positions),
    }
}
