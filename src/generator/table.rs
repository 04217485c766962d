//! CSV table generator API

use csv::Writer;

use crate::sources::CSV_HEADER;
use crate::{Position, Result};

fn field(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// One row per position, speeds in km/h. Nothing at all for no positions.
pub fn generate(positions: &[Position]) -> Result<Vec<u8>> {
    if positions.is_empty() {
        return Ok(vec![]);
    }

    let mut wtr = Writer::from_writer(vec![]);
    wtr.write_record(CSV_HEADER)?;

    for poi in positions {
        wtr.write_record([
            poi.rfc3339_time()?.unwrap_or_default(),
            field(poi.latitude()),
            field(poi.longitude()),
            field(poi.altitude),
            field(poi.speed),
            field(poi.course),
            field(poi.accuracy),
            poi.address.clone().unwrap_or_default(),
        ])?;
    }

    wtr.into_inner().map_err(|e| e.into_error().into())
}
