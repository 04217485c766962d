//! KML and KMZ generator API

use std::io::{Cursor, Write};

use quick_xml::events::{BytesDecl, BytesStart, BytesText, Event};
use quick_xml::Writer;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::{Error, Position, Result};

/// Point placemarks added along the track line
const MAX_POINT_MARKS: usize = 20;

type XmlWriter = Writer<Vec<u8>>;

/// `lon,lat,alt` tuple, the altitude defaults to the ground
fn tuple(poi: &Position) -> Option<String> {
    poi.coordinates
        .map(|c| format!("{},{},{}", c.x(), c.y(), poi.altitude.unwrap_or(0.0)))
}

/// `<tag>text</tag>`, the text escaped by the writer
fn text_element(w: &mut XmlWriter, tag: &str, text: &str) -> Result<()> {
    let el = BytesStart::new(tag);
    w.write_event(Event::Start(el.borrow()))?;
    w.write_event(Event::Text(BytesText::new(text)))?;
    w.write_event(Event::End(el.to_end()))?;

    Ok(())
}

fn start(w: &mut XmlWriter, tag: &str) -> Result<()> {
    w.write_event(Event::Start(BytesStart::new(tag)))?;

    Ok(())
}

fn end(w: &mut XmlWriter, tag: &str) -> Result<()> {
    w.write_event(Event::End(BytesStart::new(tag).to_end()))?;

    Ok(())
}

pub struct KmlGenerator {
    /// Device name
    pub name: String,
}

impl KmlGenerator {
    pub fn new(name: String) -> Self {
        Self { name }
    }

    /// KML 2.2 document with the track line and a sample of point marks
    pub fn generate(&self, positions: &[Position]) -> Result<String> {
        let located: Vec<&Position> = positions
            .iter()
            .filter(|p| p.coordinates.is_some())
            .collect();

        let mut w = Writer::new_with_indent(Vec::new(), b' ', 2);
        w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        let mut kml = BytesStart::new("kml");
        kml.push_attribute(("xmlns", "http://www.opengis.net/kml/2.2"));
        w.write_event(Event::Start(kml.borrow()))?;
        start(&mut w, "Document")?;
        text_element(&mut w, "name", &format!("{} Track", self.name))?;

        let mut style = BytesStart::new("Style");
        style.push_attribute(("id", "trackStyle"));
        w.write_event(Event::Start(style.borrow()))?;
        start(&mut w, "LineStyle")?;
        text_element(&mut w, "color", "ff0000ff")?;
        text_element(&mut w, "width", "3")?;
        end(&mut w, "LineStyle")?;
        w.write_event(Event::End(style.to_end()))?;

        start(&mut w, "Placemark")?;
        text_element(&mut w, "name", &self.name)?;
        text_element(&mut w, "styleUrl", "#trackStyle")?;
        start(&mut w, "LineString")?;
        text_element(&mut w, "tessellate", "1")?;
        text_element(&mut w, "altitudeMode", "clampToGround")?;
        let line: String = located
            .iter()
            .filter_map(|poi| tuple(poi))
            .map(|t| format!("\n{}", t))
            .collect();
        text_element(&mut w, "coordinates", &format!("{}\n", line))?;
        end(&mut w, "LineString")?;
        end(&mut w, "Placemark")?;

        let step = (located.len() / MAX_POINT_MARKS).max(1);
        for (i, poi) in located.iter().enumerate().step_by(step) {
            start(&mut w, "Placemark")?;
            text_element(&mut w, "name", &format!("Point {}", i + 1))?;
            if let Some(when) = poi.rfc3339_time()? {
                start(&mut w, "TimeStamp")?;
                text_element(&mut w, "when", &when)?;
                end(&mut w, "TimeStamp")?;
            }
            if let Some(t) = tuple(poi) {
                start(&mut w, "Point")?;
                text_element(&mut w, "coordinates", &t)?;
                end(&mut w, "Point")?;
            }
            end(&mut w, "Placemark")?;
        }

        end(&mut w, "Document")?;
        w.write_event(Event::End(kml.to_end()))?;

        String::from_utf8(w.into_inner()).map_err(|e| Error::Encode {
            format: "KML",
            reason: e.to_string(),
        })
    }

    /// KMZ archive: the KML document deflated as `doc.kml`
    pub fn compressed(&self, positions: &[Position]) -> Result<Vec<u8>> {
        let kml = self.generate(positions)?;

        let mut buf = Cursor::new(Vec::new());
        {
            let mut zip = ZipWriter::new(&mut buf);
            let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

            zip.start_file("doc.kml", options)?;
            zip.write_all(kml.as_bytes())?;
            zip.finish()?;
        }

        Ok(buf.into_inner())
    }
}
