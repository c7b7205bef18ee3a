//! Waypoint management and map synchronization for interactive route drawing.

pub mod geofence;
pub mod markers;
pub mod models;
pub mod routing;
pub mod selection;
pub mod session;
pub mod spatial;
pub mod store;
pub mod viewport;

pub use geofence::{GeofenceConfigError, GeofenceTable};
pub use markers::{
    DeleteWindow, DeleteWindowState, Marker, MarkerColor, MarkerId, MarkerKey,
    MarkerSynchronizer, DELETE_WINDOW,
};
pub use models::{
    GeofenceArea, Position, RouteRequest, RouteResult, SelectionMode, Waypoint, WaypointRole,
};
pub use routing::{
    via_insert_index, ResponseOutcome, RouteControl, RoutingAdapter, RoutingEngine, RoutingError,
};
pub use selection::{ClickAction, SelectionMachine};
pub use session::{MapSurface, RouteHost, RouteSession, SessionConfig};
pub use spatial::{haversine_distance, BoundingBox};
pub use store::{StoreError, StoreSnapshot, WaypointStore};
pub use viewport::{FitTrigger, ViewRequest, ViewportConfig, ViewportFitter};
