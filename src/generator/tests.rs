use std::io::{Cursor, Read};

use csv::ReaderBuilder;
use geo::Point;
use time::macros::datetime;

use super::gpx::GpxGenerator;
use super::kml::KmlGenerator;
use super::position::Position;
use super::tracker::Tracker;
use super::{encode, Format};
use crate::sources::{CsvSource, PositionsSource};

fn joinville() -> Vec<Position> {
    let mut p1 = Position::basic(
        Point::new(-48.8702222, -26.31832),
        datetime!(2021-05-24 0:00 UTC),
    )
    .speed(36.0)
    .accuracy(4.0);
    p1.altitude = Some(12.0);
    p1.course = Some(87.5);
    p1.address = Some("Rua XV de Novembro, Joinville".to_string());

    let p2 = Position::basic(
        Point::new(-48.8619776, -26.3185919),
        datetime!(2021-05-24 0:05 UTC),
    );
    let p3 = Position::basic(
        Point::new(-48.8619871, -26.3185861),
        datetime!(2021-05-24 0:10 UTC),
    );

    vec![p1, p2, p3]
}

#[test]
fn simple_track() -> Result<(), String> {
    let positions = joinville();

    let track = Tracker::new("my dev 1".to_string()).build(&positions);
    assert_eq!(1, track.segments.len());
    assert_eq!(Some("my dev 1".to_string()), track.name);

    let segment = &track.segments[0];
    assert_eq!(3, segment.points.len());
    for (poi, wp) in positions.iter().zip(segment.points.iter()) {
        assert_eq!(poi.coordinates, Some(wp.point()));
        assert_eq!(poi.time.map(|t| t.into()), wp.time);
    }
    assert_eq!(Some(12.0), segment.points[0].elevation);
    let speed = segment.points[0].speed.ok_or("no speed")?;
    assert!((speed - 10.0).abs() < 1e-9, "36 km/h is 10 m/s, got {}", speed);

    Ok(())
}

#[test]
fn track_skips_unlocated() {
    let mut positions = joinville();
    positions[1].coordinates = None;

    let track = Tracker::new("my dev 1".to_string()).build(&positions);

    assert_eq!(2, track.segments[0].points.len());
}

#[test]
fn gpx_document() -> Result<(), String> {
    let mut gpx = GpxGenerator::empty("my dev 1 Track".to_string());
    gpx.time = Some(datetime!(2021-05-25 0:00 UTC));
    gpx.tracks
        .push(Tracker::new("my dev 1".to_string()).build(&joinville()));

    let mut out = vec![];
    gpx.write(&mut out).map_err(|e| e.to_string())?;

    let doc = String::from_utf8(out).map_err(|e| e.to_string())?;
    assert!(doc.contains("creator=\"traccar2gpx\""));
    assert!(doc.contains("<name>my dev 1 Track</name>"));
    assert!(doc.contains("<name>my dev 1</name>"));
    assert_eq!(1, doc.matches("<trkseg>").count());
    assert_eq!(3, doc.matches("<trkpt ").count());

    Ok(())
}

#[test]
fn kml_document() -> Result<(), String> {
    let kml = KmlGenerator::new("Truck <12> & co".to_string())
        .generate(&joinville())
        .map_err(|e| e.to_string())?;

    assert!(kml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
    assert!(kml.contains("<kml xmlns=\"http://www.opengis.net/kml/2.2\">"));
    assert!(kml.contains("<name>Truck &lt;12&gt; &amp; co Track</name>"));
    assert!(kml.contains("<name>Truck &lt;12&gt; &amp; co</name>"));
    assert!(!kml.contains("<12>"));
    assert!(kml.contains("<color>ff0000ff</color>"));
    assert!(kml.contains("-48.8702222,-26.31832,12\n"));
    assert!(kml.contains("-48.8619776,-26.3185919,0\n"));
    assert!(kml.contains("<name>Point 3</name>"));
    assert!(kml.contains("<when>2021-05-24T00:00:00Z</when>"));

    Ok(())
}

#[test]
fn kml_samples_point_marks() -> Result<(), String> {
    let positions: Vec<Position> = (0..100)
        .map(|i| {
            Position::basic(
                Point::new(0.0, i as f64 * 0.001),
                datetime!(2021-05-24 0:00 UTC) + time::Duration::minutes(i),
            )
        })
        .collect();

    let kml = KmlGenerator::new("dev".to_string())
        .generate(&positions)
        .map_err(|e| e.to_string())?;

    // every 5th position, out of 100
    assert_eq!(21, kml.matches("<Placemark>").count());
    assert!(kml.contains("<name>Point 96</name>"));
    assert!(!kml.contains("<name>Point 2</name>"));

    Ok(())
}

#[test]
fn kmz_archive() -> Result<(), String> {
    let generator = KmlGenerator::new("dev".to_string());
    let kml = generator
        .generate(&joinville())
        .map_err(|e| e.to_string())?;
    let kmz = generator
        .compressed(&joinville())
        .map_err(|e| e.to_string())?;

    let mut archive = zip::ZipArchive::new(Cursor::new(kmz)).map_err(|e| e.to_string())?;
    assert_eq!(1, archive.len());

    let mut doc = archive.by_name("doc.kml").map_err(|e| e.to_string())?;
    let mut content = String::new();
    doc.read_to_string(&mut content)
        .map_err(|e| e.to_string())?;
    assert_eq!(kml, content);

    Ok(())
}

#[test]
fn geojson_document() -> Result<(), String> {
    let out = encode(Format::GeoJson, "my dev 1", &joinville()).map_err(|e| e.to_string())?;

    let doc: serde_json::Value = serde_json::from_slice(&out).map_err(|e| e.to_string())?;
    assert_eq!("FeatureCollection", doc["type"]);

    let features = doc["features"].as_array().ok_or("no features")?;
    assert_eq!(3, features.len());
    assert_eq!(
        serde_json::json!([-48.8702222, -26.31832, 12.0]),
        features[0]["geometry"]["coordinates"]
    );
    assert_eq!(
        serde_json::json!([-48.8619776, -26.3185919]),
        features[1]["geometry"]["coordinates"]
    );
    assert_eq!("my dev 1", features[0]["properties"]["deviceName"]);
    assert_eq!("2021-05-24T00:00:00Z", features[0]["properties"]["time"]);
    assert_eq!(36.0, features[0]["properties"]["speed"]);
    assert!(features[1]["properties"]["accuracy"].is_null());

    Ok(())
}

#[test]
fn csv_table() -> Result<(), String> {
    let out = encode(Format::Csv, "my dev 1", &joinville()).map_err(|e| e.to_string())?;
    let text = String::from_utf8(out.clone()).map_err(|e| e.to_string())?;

    let mut lines = text.lines();
    assert_eq!(
        Some("time,latitude,longitude,altitude,speed,course,accuracy,address"),
        lines.next()
    );
    assert_eq!(
        Some("2021-05-24T00:00:00Z,-26.31832,-48.8702222,12,36,87.5,4,\"Rua XV de Novembro, Joinville\""),
        lines.next()
    );
    assert_eq!(
        Some("2021-05-24T00:05:00Z,-26.3185919,-48.8619776,,,,,"),
        lines.next()
    );

    // the table can be read back as a source
    let rdr = ReaderBuilder::new().from_reader(out.as_slice());
    let back = CsvSource::new(rdr)
        .fetch(datetime!(2021-05-24 0:00 UTC), datetime!(2021-05-25 0:00 UTC))
        .map_err(|e| e.to_string())?;
    assert_eq!(joinville(), back);

    Ok(())
}

#[test]
fn csv_empty() -> Result<(), String> {
    let out = encode(Format::Csv, "my dev 1", &[]).map_err(|e| e.to_string())?;
    assert!(out.is_empty());

    Ok(())
}

#[test]
fn format_names() {
    assert_eq!(Some(Format::Kmz), Format::from_path("out/truck_20210524.KMZ"));
    assert_eq!(Some(Format::GeoJson), Format::from_path("truck.json"));
    assert_eq!(None, Format::from_path("truck.txt"));
    assert_eq!(None, Format::from_path("truck"));
    assert!("shapefile".parse::<Format>().is_err());

    for format in [
        Format::Gpx,
        Format::Kml,
        Format::Kmz,
        Format::GeoJson,
        Format::Csv,
    ] {
        assert_eq!(Ok(format), format.extension().parse::<Format>().map_err(|e| e.to_string()));
    }
    assert_eq!("GEOJSON", Format::GeoJson.to_string());
}
