//! GPX generator API

use std::io::Write;

use gpx::{Gpx, GpxVersion, Metadata, Track};
use time::OffsetDateTime;

use crate::{Error, Result};

pub struct GpxGenerator {
    /// Document name
    pub name: String,
    pub tracks: Vec<Track>,
    /// Generation time, now when empty
    pub time: Option<OffsetDateTime>,
}

impl GpxGenerator {
    pub fn empty(name: String) -> Self {
        Self {
            name,
            tracks: vec![],
            time: None,
        }
    }

    pub fn generate(self) -> Gpx {
        let mut metadata = Metadata::default();
        metadata.name = Some(self.name);
        metadata.time = Some(self.time.unwrap_or_else(OffsetDateTime::now_utc).into());

        let mut gpx: Gpx = Default::default();
        gpx.version = GpxVersion::Gpx11;
        gpx.creator = Some("traccar2gpx".to_string());
        gpx.metadata = Some(metadata);
        gpx.tracks = self.tracks;

        gpx
    }

    pub fn write<W: Write>(self, writer: W) -> Result<()> {
        let doc = self.generate();

        gpx::write(&doc, writer).map_err(|e| Error::Encode {
            format: "GPX",
            reason: e.to_string(),
        })
    }
}
