//! traccar2gpx cli - Export and clean the position history of a Traccar device

use std::fs::{self, File};
use std::path::Path;
use std::time::Duration;

use argopt::{cmd_group, subcmd};
use csv::ReaderBuilder;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use time::{OffsetDateTime, PrimitiveDateTime};
use tracing::info;
use tracing_subscriber::EnvFilter;

use traccar2gpx::sources::{CsvSource, TraccarClient, TraccarSource};
use traccar2gpx::{
    encode, FilterPipeline, Format, PipelineReport, Position, PositionsSource, TimeWindow,
};

/// CLI of traccar2gpx - Export your Traccar positions, without the GPS noise
#[cmd_group(commands = [devices, export, clean])]
fn main() -> Result<(), String> {}

/// List the devices of the account
#[subcmd]
fn devices(
    /// Traccar server URL. Default: server.url of the config
    #[opt(long)]
    server: Option<String>,
    /// Account email
    #[opt(long)]
    email: Option<String>,
    /// Account password
    #[opt(long)]
    password: Option<String>,
    /// Server and filters configuration. Default: .traccar2gpx.yaml, ~/.traccar2gpx.yaml
    #[opt(long)]
    config: Option<String>,
) -> Result<(), String> {
    init_logging();

    let conf = load_configs(config)?;
    let client = connect(&conf.server, server, email, password)?;

    let devices = client.devices().map_err(|e| e.to_string())?;
    if devices.is_empty() {
        println!("No devices found!");
    }

    for (i, device) in devices.iter().enumerate() {
        let status = if device.is_online() { "Online" } else { "Offline" };
        println!(
            "{}. {} (ID: {}) - {}",
            i + 1,
            device.name,
            device.id,
            status
        );
    }

    Ok(())
}

/// Export the positions of a device, cleaned by the filters
#[subcmd]
fn export(
    /// Device id, unique id or name
    device: String,
    /// Start time, RFC3339 format
    #[opt(long)]
    start: Option<String>,
    /// End time, RFC3339 format
    #[opt(long)]
    end: Option<String>,
    /// Period ending now instead of start and end: 1h, 24h, 7d, 30d...
    #[opt(long)]
    last: Option<String>,
    /// Output format: gpx, kml, kmz, geojson or csv. Default: from the output extension, or gpx
    #[opt(long)]
    format: Option<String>,
    /// Destination path. Default: {device}_{start}_{end}.{format}
    #[opt(long)]
    output: Option<String>,
    /// Export the raw positions, without any filter
    #[opt(long)]
    no_filters: bool,
    /// Traccar server URL. Default: server.url of the config
    #[opt(long)]
    server: Option<String>,
    /// Account email
    #[opt(long)]
    email: Option<String>,
    /// Account password
    #[opt(long)]
    password: Option<String>,
    /// Server and filters configuration. Default: .traccar2gpx.yaml, ~/.traccar2gpx.yaml
    #[opt(long)]
    config: Option<String>,
) -> Result<(), String> {
    init_logging();

    let window = export_window(start, end, last, OffsetDateTime::now_utc())?;

    let conf = load_configs(config)?;
    let pipeline = if no_filters {
        FilterPipeline::passthrough()
    } else {
        conf.filters.clone()
    };
    pipeline.validate().map_err(|e| e.to_string())?;

    let client = connect(&conf.server, server, email, password)?;

    let dev = client.device(&device).map_err(|e| e.to_string())?;
    println!("Selected device: {} (ID: {})", dev.name, dev.id);

    let mut source = TraccarSource::new(client, dev.id);
    let pb = spinner("Retrieving position data...");
    let positions = source.fetch(window.start, window.end);
    pb.finish_and_clear();
    let positions = positions.map_err(|e| e.to_string())?;

    if positions.is_empty() {
        println!("No position data found for the selected time range.");
        return Ok(());
    }
    println!("Retrieved {} position records", positions.len());

    let (format, destination) = resolve_output(format, output, window.file_stem(&dev.name))?;

    write_positions(&dev.name, &positions, &pipeline, format, &destination)
}

/// Run the filters again over a CSV written by `export`
#[subcmd]
fn clean(
    /// CSV file source
    csv_path: String,
    /// Only the positions after this time, RFC3339 format
    #[opt(long)]
    start: Option<String>,
    /// Only the positions before this time, RFC3339 format
    #[opt(long)]
    end: Option<String>,
    /// Device name written in the output. Default: the CSV file name
    #[opt(long)]
    device: Option<String>,
    /// Output format: gpx, kml, kmz, geojson or csv. Default: from the output extension, or gpx
    #[opt(long)]
    format: Option<String>,
    /// Destination path. Default: {csv name}_clean.{format}
    #[opt(long)]
    output: Option<String>,
    /// Server and filters configuration. Default: .traccar2gpx.yaml, ~/.traccar2gpx.yaml
    #[opt(long)]
    config: Option<String>,
) -> Result<(), String> {
    init_logging();

    let (start, end) = match (start, end) {
        (Some(start), Some(end)) => {
            let window = TimeWindow::parse(&start, &end).map_err(|e| e.to_string())?;
            (window.start, window.end)
        }
        (None, None) => (
            PrimitiveDateTime::MIN.assume_utc(),
            PrimitiveDateTime::MAX.assume_utc(),
        ),
        _ => return Err("Provide both --start and --end, or none".to_string()),
    };

    let conf = load_configs(config)?;
    conf.filters.validate().map_err(|e| e.to_string())?;

    let csv = File::open(&csv_path)
        .map_err(|e| format!("Failed on open the CSV file: {}", e.to_string()))?;
    let rcsv = ReaderBuilder::new().flexible(true).from_reader(csv);

    let positions = CsvSource::new(rcsv)
        .fetch(start, end)
        .map_err(|e| e.to_string())?;

    let stem = Path::new(&csv_path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("positions")
        .to_string();
    let device = device.unwrap_or_else(|| stem.clone());

    let (format, destination) = resolve_output(format, output, Ok(format!("{}_clean", stem)))?;

    write_positions(&device, &positions, &conf.filters, format, &destination)
}

/// Export period from either `--start` and `--end` or `--last`
fn export_window(
    start: Option<String>,
    end: Option<String>,
    last: Option<String>,
    now: OffsetDateTime,
) -> Result<TimeWindow, String> {
    match (start, end, last) {
        (None, None, Some(last)) => TimeWindow::last(&last, now),
        (Some(start), Some(end), None) => TimeWindow::parse(&start, &end),
        (_, _, Some(_)) => {
            return Err("--last can't be combined with --start or --end".to_string())
        }
        _ => return Err("Provide both --start and --end, or --last".to_string()),
    }
    .map_err(|e| e.to_string())
}

/// Format and path of the output, from the explicit options or the defaults
fn resolve_output(
    format: Option<String>,
    output: Option<String>,
    default_stem: traccar2gpx::Result<String>,
) -> Result<(Format, String), String> {
    let format = match (format, &output) {
        (Some(f), _) => f.parse::<Format>().map_err(|e| e.to_string())?,
        (None, Some(path)) => Format::from_path(path).unwrap_or(Format::Gpx),
        (None, None) => Format::Gpx,
    };

    let destination = match output {
        Some(o) => o,
        None => format!(
            "{}.{}",
            default_stem.map_err(|e| e.to_string())?,
            format.extension()
        ),
    };

    Ok((format, destination))
}

/// Clean, encode and save the positions
fn write_positions(
    device: &str,
    positions: &[Position],
    pipeline: &FilterPipeline,
    format: Format,
    destination: &str,
) -> Result<(), String> {
    let pb = spinner("Cleaning positions...");
    let cleaned = pipeline.run(positions);
    pb.finish_and_clear();
    let (cleaned, report) = cleaned.map_err(|e| e.to_string())?;
    print_report(&report);

    let pb = spinner(&format!("Exporting data to {} format...", format));
    let content = encode(format, device, &cleaned);
    pb.finish_and_clear();
    let content = content.map_err(|e| e.to_string())?;

    fs::write(destination, content)
        .map_err(|e| format!("Failed on write the destination file: {}", e.to_string()))?;
    info!(destination, records = cleaned.len(), "Export saved");

    println!("File saved: {}", destination);
    println!("Records exported: {}", cleaned.len());

    Ok(())
}

fn print_report(report: &PipelineReport) {
    for stage in &report.stages {
        println!(
            "  {:<13} removed {:>6} of {:>6}",
            stage.stage, stage.removed, stage.input
        );
    }

    if !report.stages.is_empty() {
        println!(
            "Filters removed {} of {} positions",
            report.removed(),
            report.input
        );
    }
}

/// Spinner on stderr for the steps of unknown length
fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "✓"]),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Open and check the session, the options winning over the config
fn connect(
    conf: &ServerConfig,
    server: Option<String>,
    email: Option<String>,
    password: Option<String>,
) -> Result<TraccarClient, String> {
    let server = server.unwrap_or_else(|| conf.url.clone());
    let email = email
        .or_else(|| conf.email.clone())
        .ok_or("Email not provided, use --email or server.email on the config")?;
    let password = password
        .or_else(|| conf.password.clone())
        .ok_or("Password not provided, use --password or server.password on the config")?;

    println!("Connecting to Traccar server {}...", server);

    let client = TraccarClient::new(&server, &email, &password).map_err(|e| e.to_string())?;
    client
        .test_connection()
        .map_err(|e| format!("Failed to connect to Traccar server: {}", e))?;

    Ok(client)
}

/// Logs on stderr, `RUST_LOG` overrides the `info` default
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Load the current config: the first file found wins, none found means the
/// defaults. A file that can't be parsed is an error, never the defaults.
fn load_configs(provided: Option<String>) -> Result<Configs, String> {
    let mut options = vec![];

    if let Some(sprovided) = provided {
        options.push(sprovided);
    }

    options.push(".traccar2gpx.yaml".to_string());

    if let Some(home) = dirs::home_dir() {
        if let Some(shome) = home.to_str() {
            options.push(format!("{}/.traccar2gpx.yaml", shome));
        }
    }

    for fi in options {
        if let Ok(s) = fs::read_to_string(&fi) {
            let conf = serde_yaml::from_str::<Configs>(&s)
                .map_err(|e| format!("Invalid config {}: {}", fi, e))?;
            info!(path = %fi, "Config loaded");

            return Ok(conf);
        }
    }

    Ok(Configs::default())
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
struct Configs {
    pub server: ServerConfig,
    pub filters: FilterPipeline,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
struct ServerConfig {
    pub url: String,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: "https://demo.traccar.org".to_string(),
            email: None,
            password: None,
        }
    }
}

#[test]
fn parse_configs() -> Result<(), String> {
    let yaml = "\nserver:\n  email: me@example.com";

    let conf: Configs = serde_yaml::from_str(yaml).map_err(|e| e.to_string())?;

    assert_eq!(
        Configs {
            server: ServerConfig {
                url: "https://demo.traccar.org".to_string(),
                email: Some("me@example.com".to_string()),
                password: None,
            },
            filters: FilterPipeline::default(),
        },
        conf
    );

    let yaml = "
server:
  url: https://gps.example.com
  password: secret
filters:
  - stage: accuracy
    max_accuracy_m: 25
  - stage: ghost_jump
    enabled: false
";

    let conf: Configs = serde_yaml::from_str(yaml).map_err(|e| e.to_string())?;

    assert_eq!("https://gps.example.com", conf.server.url);
    assert_eq!(Some("secret".to_string()), conf.server.password);
    assert_eq!(2, conf.filters.stages.len());
    assert_eq!("accuracy", conf.filters.stages[0].stage.name());
    assert!(conf.filters.stages[0].enabled);
    assert!(!conf.filters.stages[1].enabled);

    Ok(())
}

#[test]
fn parse_filters_list() -> Result<(), String> {
    let yaml = "
server:
  url: https://gps.example.com
  email: me@example.com
filters:
  - stage: accuracy
    max_accuracy_m: 25
  - stage: stationary
    min_distance_m: 10
  - stage: ghost_jump
    enabled: false
";

    let conf: Configs = serde_yaml::from_str(yaml).map_err(|e| e.to_string())?;

    let names: Vec<&str> = conf.filters.stages.iter().map(|sc| sc.stage.name()).collect();
    assert_eq!(vec!["accuracy", "stationary", "ghost_jump"], names);
    assert_eq!(
        vec![true, true, false],
        conf.filters
            .stages
            .iter()
            .map(|sc| sc.enabled)
            .collect::<Vec<bool>>()
    );
    assert!(conf.filters.validate().is_ok());

    Ok(())
}

#[test]
fn invalid_config_file() -> Result<(), String> {
    let path = std::env::temp_dir().join(format!("traccar2gpx-{}.yaml", std::process::id()));
    fs::write(
        &path,
        "filters:\n  order: [accuracy, stationary]\n  accuracy:\n    max_accuracy_m: 25\n",
    )
    .map_err(|e| e.to_string())?;

    let loaded = load_configs(path.to_str().map(|s| s.to_string()));
    let _ = fs::remove_file(&path);

    let err = loaded.err().ok_or("a filters map must not fall back to the defaults")?;
    assert!(err.starts_with("Invalid config"), "{}", err);

    Ok(())
}

#[test]
fn export_periods() -> Result<(), String> {
    let now = time::macros::datetime!(2023-05-24 10:00 UTC);
    let start = Some("2023-05-20T00:00:00Z".to_string());
    let end = Some("2023-05-21T00:00:00Z".to_string());
    let last = Some("7d".to_string());

    let window = export_window(start.clone(), end.clone(), None, now)?;
    assert_eq!(time::macros::datetime!(2023-05-20 0:00 UTC), window.start);

    let window = export_window(None, None, last.clone(), now)?;
    assert_eq!(time::macros::datetime!(2023-05-17 10:00 UTC), window.start);

    assert!(export_window(start.clone(), end.clone(), last.clone(), now).is_err());
    assert!(export_window(start.clone(), None, last.clone(), now).is_err());
    assert!(export_window(None, end.clone(), last, now).is_err());
    assert!(export_window(start, None, None, now).is_err());
    assert!(export_window(None, None, None, now).is_err());

    Ok(())
}

#[test]
fn output_defaults() -> Result<(), String> {
    let (format, path) = resolve_output(None, None, Ok("truck_20230517_20230524".to_string()))?;
    assert_eq!(Format::Gpx, format);
    assert_eq!("truck_20230517_20230524.gpx", path);

    let (format, path) = resolve_output(None, Some("out.kmz".to_string()), Ok("x".to_string()))?;
    assert_eq!(Format::Kmz, format);
    assert_eq!("out.kmz", path);

    let (format, path) = resolve_output(Some("geojson".to_string()), None, Ok("x".to_string()))?;
    assert_eq!(Format::GeoJson, format);
    assert_eq!("x.geojson", path);

    assert!(resolve_output(Some("shp".to_string()), None, Ok("x".to_string())).is_err());

    Ok(())
}
