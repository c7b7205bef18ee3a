//! OSRM `route/v1` HTTP client.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use wayline_core::{Position, RouteRequest, RouteResult, RoutingEngine, RoutingError};

pub const DEFAULT_BASE_URL: &str = "https://router.project-osrm.org";
pub const DEFAULT_PROFILE: &str = "driving";

/// HTTP client for an OSRM routing server.
#[derive(Debug, Clone)]
pub struct OsrmClient {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) profile: String,
}

#[derive(Debug, Deserialize)]
struct OsrmRouteResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    geometry: OsrmGeometry,
    distance: f64,
    duration: f64,
}

#[derive(Debug, Deserialize)]
struct OsrmGeometry {
    /// `[lon, lat]` pairs
    coordinates: Vec<[f64; 2]>,
}

impl OsrmClient {
    /// Create a new OSRM client.
    ///
    /// Fails only if the HTTP client cannot be built (TLS backend unavailable).
    pub fn new(
        base_url: impl Into<String>,
        profile: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RoutingError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| RoutingError::Transport(format!("failed to build HTTP client: {err}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            profile: profile.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Route URL for an ordered waypoint list.
    pub fn route_url(&self, positions: &[Position]) -> String {
        let coordinates = positions
            .iter()
            .map(|p| format!("{:.6},{:.6}", p.lon, p.lat))
            .collect::<Vec<_>>()
            .join(";");
        format!(
            "{}/route/v1/{}/{}?overview=full&geometries=geojson&steps=false",
            self.base_url, self.profile, coordinates
        )
    }
}

impl RoutingEngine for OsrmClient {
    fn route(
        &self,
        request: &RouteRequest,
    ) -> impl Future<Output = Result<RouteResult, RoutingError>> + Send {
        let waypoints = request.positions.len();
        let generation = request.generation;
        let url = self.route_url(&request.positions);
        let client = self.client.clone();

        async move {
            if waypoints < 2 {
                return Err(RoutingError::TooFewWaypoints(waypoints));
            }
            tracing::debug!(generation, waypoints, "Requesting OSRM route");

            let response = client
                .get(&url)
                .send()
                .await
                .map_err(|err| RoutingError::Transport(err.to_string()))?;
            let status = response.status();
            let body = response
                .text()
                .await
                .map_err(|err| RoutingError::Transport(err.to_string()))?;

            match serde_json::from_str::<OsrmRouteResponse>(&body) {
                Ok(parsed) => into_route_result(parsed),
                Err(_) if !status.is_success() => {
                    Err(RoutingError::Transport(format!("OSRM returned {status}")))
                }
                Err(err) => Err(RoutingError::InvalidResponse(err.to_string())),
            }
        }
    }
}

fn into_route_result(response: OsrmRouteResponse) -> Result<RouteResult, RoutingError> {
    match response.code.as_str() {
        "Ok" => {}
        "NoRoute" | "NoSegment" => return Err(RoutingError::NoRoute),
        other => {
            return Err(RoutingError::InvalidResponse(format!(
                "{other}: {}",
                response.message.unwrap_or_default()
            )))
        }
    }

    let route = response
        .routes
        .into_iter()
        .next()
        .ok_or(RoutingError::NoRoute)?;
    let geometry: Vec<Position> = route
        .geometry
        .coordinates
        .iter()
        .map(|[lon, lat]| Position::new(*lat, *lon))
        .collect();
    if geometry.len() < 2 {
        return Err(RoutingError::InvalidResponse(format!(
            "route geometry has {} vertices",
            geometry.len()
        )));
    }

    Ok(RouteResult {
        geometry,
        total_distance_m: route.distance,
        total_duration_s: route.duration,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> OsrmClient {
        OsrmClient::new("http://localhost:5000/", DEFAULT_PROFILE, Duration::from_secs(1)).unwrap()
    }

    fn parse(value: serde_json::Value) -> Result<RouteResult, RoutingError> {
        into_route_result(serde_json::from_value(value).unwrap())
    }

    #[test]
    fn route_url_lists_lon_lat_pairs_in_order() {
        let url = client().route_url(&[
            Position::new(18.0857, -15.9785),
            Position::new(16.5138, -15.805),
        ]);
        assert_eq!(
            url,
            "http://localhost:5000/route/v1/driving/-15.978500,18.085700;-15.805000,16.513800?overview=full&geometries=geojson&steps=false"
        );
    }

    #[test]
    fn parses_first_route() {
        let result = parse(json!({
            "code": "Ok",
            "routes": [{
                "geometry": {"type": "LineString", "coordinates": [[-15.9785, 18.0857], [-15.805, 16.5138]]},
                "distance": 204512.3,
                "duration": 9321.4
            }],
            "waypoints": []
        }))
        .unwrap();
        assert_eq!(result.geometry[0], Position::new(18.0857, -15.9785));
        assert_eq!(result.geometry.len(), 2);
        assert_eq!(result.total_distance_m, 204512.3);
        assert_eq!(result.total_duration_s, 9321.4);
    }

    #[test]
    fn no_route_code_maps_to_no_route() {
        let err = parse(json!({"code": "NoRoute", "message": "Impossible route between points"}));
        assert_eq!(err, Err(RoutingError::NoRoute));
    }

    #[test]
    fn unknown_code_is_invalid_response() {
        let err = parse(json!({"code": "InvalidQuery", "message": "Query string malformed"}));
        assert!(matches!(err, Err(RoutingError::InvalidResponse(msg)) if msg.contains("InvalidQuery")));
    }

    #[test]
    fn degenerate_geometry_is_rejected() {
        let err = parse(json!({
            "code": "Ok",
            "routes": [{"geometry": {"coordinates": [[0.0, 0.0]]}, "distance": 0.0, "duration": 0.0}]
        }));
        assert!(matches!(err, Err(RoutingError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn single_waypoint_request_is_refused_before_sending() {
        let request = RouteRequest {
            generation: 1,
            positions: vec![Position::new(0.0, 0.0)],
        };
        assert_eq!(
            client().route(&request).await,
            Err(RoutingError::TooFewWaypoints(1))
        );
    }
}
