//! Positions sources API

use time::OffsetDateTime;

use crate::{Position, Result};

/// Position source
pub trait PositionsSource {
    /// Fetch the raw positions recorded during the period, oldest first
    fn fetch(&mut self, start: OffsetDateTime, end: OffsetDateTime) -> Result<Vec<Position>>;
}

mod csv_file;
mod traccar;

pub use csv_file::{CsvSource, CSV_HEADER};
pub use traccar::{parse_positions, Device, TraccarClient, TraccarSource, KNOTS_TO_KMH};
