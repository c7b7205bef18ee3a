//! Wayline CLI - draw a route headlessly against an OSRM server

mod config;
mod surface;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wayline_core::{
    GeofenceTable, Position, ResponseOutcome, RouteSession, SessionConfig, ViewRequest, Waypoint,
};
use wayline_osrm::OsrmClient;

use crate::config::CliConfig;
use crate::surface::{LogSurface, RenderedMarker, SummaryHost};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// OSRM server URL (overrides WAYLINE_OSRM_URL)
    #[arg(long)]
    osrm_url: Option<String>,

    /// Geofence table JSON (overrides WAYLINE_GEOFENCES)
    #[arg(long)]
    geofences: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Route from start to end through optional via points
    Route {
        /// Start point as LAT,LON
        #[arg(long, value_parser = parse_position, allow_hyphen_values = true)]
        start: Position,
        /// End point as LAT,LON
        #[arg(long, value_parser = parse_position, allow_hyphen_values = true)]
        end: Position,
        /// Via point as LAT,LON (repeatable, in traversal order)
        #[arg(long = "via", value_parser = parse_position, allow_hyphen_values = true)]
        via: Vec<Position>,
    },
    /// Print the geofence area containing LAT,LON
    Lookup {
        #[arg(value_parser = parse_position, allow_hyphen_values = true)]
        position: Position,
    },
}

#[derive(Debug, Serialize)]
struct RouteSummary {
    waypoints: Vec<Waypoint>,
    markers: Vec<RenderedMarker>,
    #[serde(skip_serializing_if = "Option::is_none")]
    distance_m: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_s: Option<f64>,
    route_vertices: usize,
    areas: Vec<String>,
    view: Option<ViewRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("wayline=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let mut config = CliConfig::from_env();
    if let Some(url) = args.osrm_url {
        config.osrm_url = url;
    }
    if let Some(path) = args.geofences {
        config.geofences_path = path;
    }

    let geofences = GeofenceTable::from_path(&config.geofences_path).with_context(|| {
        format!(
            "loading geofence table from {}",
            config.geofences_path.display()
        )
    })?;

    match args.command {
        Command::Route { start, end, via } => {
            let summary = run_route(&config, geofences, start, end, via).await;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Lookup { position } => match geofences.lookup(position) {
            Some(area) => println!("{}", area.name),
            None => println!("no area contains {},{}", position.lat, position.lon),
        },
    }

    Ok(())
}

async fn run_route(
    config: &CliConfig,
    geofences: GeofenceTable,
    start: Position,
    end: Position,
    via: Vec<Position>,
) -> RouteSummary {
    let engine = match OsrmClient::new(&config.osrm_url, &config.osrm_profile, config.route_timeout) {
        Ok(client) => Some(client),
        Err(err) => {
            tracing::error!(error = %err, "Routing engine unavailable, continuing without routes");
            None
        }
    };

    let mut session = RouteSession::new(
        LogSurface::default(),
        SummaryHost::default(),
        Arc::new(geofences),
        SessionConfig::default(),
    );
    session.apply_external_start(Some(start));
    session.apply_external_via(via);
    session.apply_external_end(Some(end));

    let mut error = None;
    if let Some(engine) = &engine {
        tracing::info!(url = engine.base_url(), "Requesting route");
        if let Some(ResponseOutcome::Failed(err)) = session.dispatch(engine).await {
            error = Some(err.to_string());
        }
    } else {
        error = Some("routing engine unavailable".to_string());
    }

    let route = session.host().route.as_ref();
    RouteSummary {
        waypoints: session.store().ordered(),
        markers: session.surface().markers(),
        distance_m: route.map(|r| r.total_distance_m),
        duration_s: route.map(|r| r.total_duration_s),
        route_vertices: session.surface().route_vertices(),
        areas: session.host().areas.clone(),
        view: session.surface().view().cloned(),
        error,
    }
}

fn parse_position(value: &str) -> Result<Position, String> {
    let (lat, lon) = value
        .split_once(',')
        .ok_or_else(|| format!("expected LAT,LON, got '{value}'"))?;
    let lat: f64 = lat.trim().parse().map_err(|_| format!("invalid latitude '{lat}'"))?;
    let lon: f64 = lon.trim().parse().map_err(|_| format!("invalid longitude '{lon}'"))?;
    let position = Position::new(lat, lon);
    if !position.is_valid() {
        return Err(format!("coordinates out of range: {lat},{lon}"));
    }
    Ok(position)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_negative_coordinates() {
        assert_eq!(
            parse_position("18.0857,-15.9785"),
            Ok(Position::new(18.0857, -15.9785))
        );
        assert_eq!(
            parse_position(" 16.5 , -15.8 "),
            Ok(Position::new(16.5, -15.8))
        );
    }

    #[test]
    fn rejects_malformed_positions() {
        assert!(parse_position("18.0857").is_err());
        assert!(parse_position("abc,1").is_err());
        assert!(parse_position("91,0").is_err());
    }

    #[test]
    fn shipped_geofence_table_loads() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../config/geofences.json");
        let table = GeofenceTable::from_path(path).unwrap();
        let hit = table.lookup(Position::new(18.0857, -15.9785));
        assert_eq!(hit.map(|a| a.name.as_str()), Some("Nouakchott"));
        assert!(table.lookup(Position::new(18.35, -15.9785)).is_none());
    }

    #[test]
    fn cli_accepts_repeated_via_points() {
        let args = Args::try_parse_from([
            "wayline",
            "route",
            "--start",
            "18.0857,-15.9785",
            "--via",
            "17.55,-14.7",
            "--via",
            "17.0,-15.2",
            "--end",
            "16.5138,-15.805",
        ])
        .unwrap();
        match args.command {
            Command::Route { via, .. } => assert_eq!(via.len(), 2),
            other => panic!("unexpected command {other:?}"),
        }
    }
}
