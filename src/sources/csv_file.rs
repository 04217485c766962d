//! CSV file source integration, reading back the tables written by the CSV encoder

use std::io::Read;

use csv::{Reader, StringRecord};
use geo::geometry::Point;
use time::format_description::well_known;
use time::OffsetDateTime;
use tracing::{info, warn};

use super::PositionsSource;
use crate::{Error, Position, Result};

/// Columns of the position tables
pub const CSV_HEADER: [&str; 8] = [
    "time",
    "latitude",
    "longitude",
    "altitude",
    "speed",
    "course",
    "accuracy",
    "address",
];

/// CSV positions source
pub struct CsvSource<T>
where
    T: Read,
{
    rdr: Reader<T>,
}

impl<T> CsvSource<T>
where
    T: Read,
{
    pub fn new(rdr: Reader<T>) -> Self {
        Self { rdr }
    }
}

impl<T> PositionsSource for CsvSource<T>
where
    T: Read,
{
    /// Rows inside the period, plus the rows whose time can't be read
    fn fetch(&mut self, start: OffsetDateTime, end: OffsetDateTime) -> Result<Vec<Position>> {
        let mut pos = vec![];
        let mut skipped = 0;

        let mut header = self.rdr.headers()?.clone();
        let header_idx = parse_header(&mut header)?;

        for row in self.rdr.records() {
            let mut rec = row?;
            rec.trim();

            if rec.iter().all(|f| f.is_empty()) {
                continue;
            }

            let position = parse_row(&header_idx, &rec);

            match position.time {
                Some(time) if time < start || time > end => skipped += 1,
                _ => pos.push(position),
            }
        }

        info!(count = pos.len(), skipped, "Positions read from CSV");

        Ok(pos)
    }
}

/// Field to index map
#[derive(Debug)]
struct FieldsIndex {
    time: usize,
    latitude: usize,
    longitude: usize,
    altitude: Option<usize>,
    speed: Option<usize>,
    course: Option<usize>,
    accuracy: Option<usize>,
    address: Option<usize>,
}

fn parse_header(header: &mut StringRecord) -> Result<FieldsIndex> {
    header.trim();

    let find = |name: &str| header.iter().position(|h| h.to_lowercase() == name);
    let require = |name: &str| {
        find(name).ok_or_else(|| Error::Config(format!("CSV header `{}` not found", name)))
    };

    Ok(FieldsIndex {
        time: require("time")?,
        latitude: require("latitude")?,
        longitude: require("longitude")?,
        altitude: find("altitude"),
        speed: find("speed"),
        course: find("course"),
        accuracy: find("accuracy"),
        address: find("address"),
    })
}

fn parse_number(row: &StringRecord, idx: Option<usize>) -> Option<f64> {
    idx.and_then(|i| row.get(i))
        .filter(|d| !d.is_empty())
        .and_then(|d| d.parse::<f64>().ok())
}

/// Unreadable fields are left empty, the row is never dropped
fn parse_row(header: &FieldsIndex, row: &StringRecord) -> Position {
    let lat = parse_number(row, Some(header.latitude));
    let lng = parse_number(row, Some(header.longitude));

    let coordinates = match (lat, lng) {
        (Some(lat), Some(lng)) => Some(Point::new(lng, lat)),
        _ => {
            warn!(row = ?row, "Row without valid coordinates");
            None
        }
    };

    let time = match row.get(header.time) {
        Some(d) => OffsetDateTime::parse(d, &well_known::Rfc3339).ok(),
        None => None,
    };
    if time.is_none() {
        warn!(row = ?row, "Row without valid time");
    }

    let address = header
        .address
        .and_then(|i| row.get(i))
        .filter(|d| !d.is_empty())
        .map(|d| d.to_string());

    Position {
        coordinates,
        time,
        altitude: parse_number(row, header.altitude),
        speed: parse_number(row, header.speed),
        course: parse_number(row, header.course),
        accuracy: parse_number(row, header.accuracy),
        address,
    }
}

#[cfg(test)]
pub mod tests {
    use csv::ReaderBuilder;
    use geo::geometry::Point;
    use time::macros::datetime;

    use super::CsvSource;
    use crate::sources::PositionsSource;

    #[test]
    fn read_positions() -> Result<(), String> {
        let data = "time,latitude,longitude,altitude,speed,course,accuracy,address
2019-10-01T00:01:00Z,-26.31832,-48.8702222,200,0.2,90,5,\"Rua XV, Joinville\"
2019-10-01T00:02:00Z,-26.31832,-48.8802222,,,,,
";
        let rdr = ReaderBuilder::new().from_reader(data.as_bytes());

        let mut source = CsvSource::new(rdr);
        let positions = source
            .fetch(datetime!(2010-05-24 0:00 UTC), datetime!(2023-05-24 0:00 UTC))
            .map_err(|e| e.to_string())?;
        assert_eq!(2, positions.len());

        let p = &positions[0];
        assert_eq!(Some(Point::new(-48.8702222, -26.31832)), p.coordinates);
        assert_eq!(Some(datetime!(2019-10-01 0:01 UTC)), p.time);
        assert_eq!(Some(200.0), p.altitude);
        assert_eq!(Some(0.2), p.speed);
        assert_eq!(Some(90.0), p.course);
        assert_eq!(Some(5.0), p.accuracy);
        assert_eq!(Some("Rua XV, Joinville".to_string()), p.address);

        let p = &positions[1];
        assert_eq!(None, p.altitude);
        assert_eq!(None, p.speed);
        assert_eq!(None, p.accuracy);
        assert_eq!(None, p.address);

        Ok(())
    }

    #[test]
    fn period_filter() -> Result<(), String> {
        let data = "time,latitude,longitude
2019-10-01T00:01:00Z,-26.31832,-48.8702222
2019-10-02T00:02:00Z,-26.31832,-48.8802222
2019-10-03T00:03:00Z,-26.31832,-48.8902222
";
        let rdr = ReaderBuilder::new().from_reader(data.as_bytes());

        let mut source = CsvSource::new(rdr);
        let positions = source
            .fetch(datetime!(2019-10-01 0:00 UTC), datetime!(2019-10-01 2:00 UTC))
            .map_err(|e| e.to_string())?;
        assert_eq!(1, positions.len());

        Ok(())
    }

    #[test]
    fn broken_rows_are_kept() -> Result<(), String> {
        let data = "time,latitude,longitude
2019-10-01T00:01:00Z,-26.31832,-48.8702222
not a time,-26.31832,-48.8802222
2019-10-01T00:03:00Z,,
";
        let rdr = ReaderBuilder::new().from_reader(data.as_bytes());

        let mut source = CsvSource::new(rdr);
        let positions = source
            .fetch(datetime!(2019-10-01 0:00 UTC), datetime!(2019-10-01 2:00 UTC))
            .map_err(|e| e.to_string())?;
        assert_eq!(3, positions.len());
        assert_eq!(None, positions[1].time);
        assert!(positions[1].coordinates.is_some());
        assert_eq!(None, positions[2].coordinates);

        Ok(())
    }

    #[test]
    fn missing_header() {
        let data = "when,latitude,longitude\n2019-10-01T00:01:00Z,-26.31832,-48.8702222\n";
        let rdr = ReaderBuilder::new().from_reader(data.as_bytes());

        let mut source = CsvSource::new(rdr);
        let err = source
            .fetch(datetime!(2019-10-01 0:00 UTC), datetime!(2019-10-01 2:00 UTC))
            .unwrap_err();
        assert!(err.to_string().contains("`time`"));
    }
}
