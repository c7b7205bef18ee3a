//! Viewport fitting over waypoints and route geometry.

use serde::{Deserialize, Serialize};

use crate::models::Position;
use crate::spatial::BoundingBox;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewportConfig {
    /// Padding around fitted bounds, in screen pixels
    pub padding_px: u32,
    /// Zoom cap for bounds fits so nearby points don't zoom in absurdly
    pub max_zoom: u8,
    /// Zoom used when centering on a single point
    pub single_point_zoom: u8,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            padding_px: 50,
            max_zoom: 15,
            single_point_zoom: 13,
        }
    }
}

/// View change requested from the map surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViewRequest {
    FitBounds {
        bounds: BoundingBox,
        padding_px: u32,
        max_zoom: u8,
    },
    Center {
        center: Position,
        zoom: u8,
    },
}

/// What caused a fit attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitTrigger {
    /// Start, end or via points changed
    PointsChanged,
    /// A new route geometry arrived
    RouteArrived,
}

/// Decides when and how to move the view.
///
/// The first successful fit and every fit for fresh route geometry always
/// recenter. Later point-only edits leave the user's pan/zoom alone.
#[derive(Debug, Clone, Default)]
pub struct ViewportFitter {
    config: ViewportConfig,
    has_fitted: bool,
}

impl ViewportFitter {
    pub fn new(config: ViewportConfig) -> Self {
        Self {
            config,
            has_fitted: false,
        }
    }

    pub fn has_fitted(&self) -> bool {
        self.has_fitted
    }

    /// View request for the given points, or `None` when the view should stay.
    pub fn fit(&mut self, points: &[Position], trigger: FitTrigger) -> Option<ViewRequest> {
        let forced = !self.has_fitted || trigger == FitTrigger::RouteArrived;
        if !forced {
            return None;
        }
        let request = self.compute(points)?;
        self.has_fitted = true;
        Some(request)
    }

    /// Bounds or center request for `points`, ignoring the forcing policy.
    pub fn compute(&self, points: &[Position]) -> Option<ViewRequest> {
        let finite: Vec<Position> = points
            .iter()
            .copied()
            .filter(|p| p.lat.is_finite() && p.lon.is_finite())
            .collect();
        match finite.as_slice() {
            [] => None,
            [single] => Some(ViewRequest::Center {
                center: *single,
                zoom: self.config.single_point_zoom,
            }),
            many => BoundingBox::from_points(many).map(|bounds| ViewRequest::FitBounds {
                bounds,
                padding_px: self.config.padding_px,
                max_zoom: self.config.max_zoom,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_points_fit_bounds_containing_both() {
        let mut fitter = ViewportFitter::default();
        let start = Position::new(0.0, 0.0);
        let end = Position::new(0.0, 2.0);
        match fitter.fit(&[start, end], FitTrigger::PointsChanged) {
            Some(ViewRequest::FitBounds {
                bounds, max_zoom, ..
            }) => {
                assert!(bounds.contains(start));
                assert!(bounds.contains(end));
                assert_eq!(max_zoom, ViewportConfig::default().max_zoom);
            }
            other => panic!("expected bounds fit, got {other:?}"),
        }
    }

    #[test]
    fn single_point_centers() {
        let mut fitter = ViewportFitter::default();
        let only = Position::new(18.0857, -15.9785);
        assert_eq!(
            fitter.fit(&[only], FitTrigger::PointsChanged),
            Some(ViewRequest::Center {
                center: only,
                zoom: 13
            })
        );
    }

    #[test]
    fn no_points_is_noop_and_does_not_consume_first_fit() {
        let mut fitter = ViewportFitter::default();
        assert_eq!(fitter.fit(&[], FitTrigger::PointsChanged), None);
        assert!(!fitter.has_fitted());
        assert!(fitter
            .fit(&[Position::new(1.0, 1.0)], FitTrigger::PointsChanged)
            .is_some());
    }

    #[test]
    fn point_edits_after_first_fit_keep_view() {
        let mut fitter = ViewportFitter::default();
        let a = Position::new(0.0, 0.0);
        let b = Position::new(1.0, 1.0);
        assert!(fitter.fit(&[a], FitTrigger::PointsChanged).is_some());
        assert_eq!(fitter.fit(&[a, b], FitTrigger::PointsChanged), None);
        assert!(fitter.fit(&[a, b], FitTrigger::RouteArrived).is_some());
    }

    #[test]
    fn non_finite_points_are_skipped() {
        let fitter = ViewportFitter::default();
        let request = fitter.compute(&[Position::new(f64::NAN, 0.0), Position::new(2.0, 2.0)]);
        assert!(matches!(request, Some(ViewRequest::Center { .. })));
    }
}
