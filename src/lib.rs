//! traccar2gpx - Traccar position history exporter with GPS noise filtering

mod error;
pub mod filters;
mod generator;
pub mod sources;
mod window;

pub use error::{Error, Result};
pub use filters::{FilterPipeline, PipelineReport, Stage, StageConfig, StageReport};
pub use generator::geojson::GeoJsonGenerator;
pub use generator::gpx::GpxGenerator;
pub use generator::kml::KmlGenerator;
pub use generator::position::Position;
pub use generator::tracker::Tracker;
pub use generator::{encode, Format};
pub use sources::PositionsSource;
pub use window::TimeWindow;
