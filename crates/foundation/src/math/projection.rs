//! Linear geographic → model-plane projection.
//!
//! The terrain model's horizontal footprint is treated as an axis-aligned
//! rectangle in lat/lng space. Longitude maps linearly onto X and latitude maps
//! linearly (inverted) onto Z. This ignores geodesic distortion entirely; it is
//! a known approximation that only holds for small reference areas.

use std::fmt;

use crate::bounds::ModelBounds;

/// Latitude/longitude in degrees.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_finite(self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }
}

/// Geographic rectangle that the terrain model's footprint represents.
///
/// Only the left/right longitudes (from `top_left` / `top_right`) and the
/// top/bottom latitudes (from `top_left` / `bottom_right`) take part in the
/// projection. The remaining corner coordinates are kept for the boundary
/// overlay drawn by map widgets.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ReferenceFrame {
    pub top_left: GeoPoint,
    pub top_right: GeoPoint,
    pub bottom_right: GeoPoint,
    pub bottom_left: GeoPoint,
}

impl ReferenceFrame {
    pub fn new(
        top_left: GeoPoint,
        top_right: GeoPoint,
        bottom_right: GeoPoint,
        bottom_left: GeoPoint,
    ) -> Self {
        Self {
            top_left,
            top_right,
            bottom_right,
            bottom_left,
        }
    }

    /// Axis-aligned frame from explicit extents.
    pub fn from_extent(lng_min: f64, lng_max: f64, lat_min: f64, lat_max: f64) -> Self {
        Self::new(
            GeoPoint::new(lat_max, lng_min),
            GeoPoint::new(lat_max, lng_max),
            GeoPoint::new(lat_min, lng_max),
            GeoPoint::new(lat_min, lng_min),
        )
    }

    pub fn lng_min(&self) -> f64 {
        self.top_left.lng
    }

    pub fn lng_max(&self) -> f64 {
        self.top_right.lng
    }

    pub fn lat_max(&self) -> f64 {
        self.top_left.lat
    }

    pub fn lat_min(&self) -> f64 {
        self.bottom_right.lat
    }

    /// Corner ring in TL, TR, BR, BL order.
    pub fn corners(&self) -> [GeoPoint; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
        ]
    }

    /// Whether `p` falls inside the axis-aligned rectangle used for projection.
    pub fn contains(&self, p: GeoPoint) -> bool {
        p.lng >= self.lng_min()
            && p.lng <= self.lng_max()
            && p.lat >= self.lat_min()
            && p.lat <= self.lat_max()
    }

    pub fn validate(&self) -> Result<(), ProjectionError> {
        check_extent(Axis::Longitude, self.lng_min(), self.lng_max())?;
        check_extent(Axis::Latitude, self.lat_min(), self.lat_max())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Axis {
    Longitude,
    Latitude,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Longitude => write!(f, "longitude"),
            Axis::Latitude => write!(f, "latitude"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ProjectionError {
    /// The reference frame has zero, negative or non-finite extent on `axis`.
    DegenerateFrame { axis: Axis, min: f64, max: f64 },
    /// The input coordinate is NaN or infinite.
    NonFiniteInput(GeoPoint),
}

impl fmt::Display for ProjectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectionError::DegenerateFrame { axis, min, max } => write!(
                f,
                "reference frame has no usable {axis} extent (min {min}, max {max})"
            ),
            ProjectionError::NonFiniteInput(p) => {
                write!(f, "non-finite coordinate (lat {}, lng {})", p.lat, p.lng)
            }
        }
    }
}

impl std::error::Error for ProjectionError {}

fn check_extent(axis: Axis, min: f64, max: f64) -> Result<(), ProjectionError> {
    let extent = max - min;
    if !extent.is_finite() || extent <= 0.0 {
        return Err(ProjectionError::DegenerateFrame { axis, min, max });
    }
    Ok(())
}

/// A position on the model's horizontal plane; `y` is resolved later.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PlanePoint {
    pub x: f64,
    pub z: f64,
}

impl PlanePoint {
    pub fn new(x: f64, z: f64) -> Self {
        Self { x, z }
    }
}

/// Maps geographic coordinates onto a model's X/Z extent.
///
/// No clamping is applied: coordinates outside the frame land outside the
/// bounds, and it is up to the terrain resolver to report the miss.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GeoProjector {
    frame: ReferenceFrame,
    bounds: ModelBounds,
}

impl GeoProjector {
    pub fn new(frame: ReferenceFrame, bounds: ModelBounds) -> Result<Self, ProjectionError> {
        frame.validate()?;
        Ok(Self { frame, bounds })
    }

    pub fn frame(&self) -> &ReferenceFrame {
        &self.frame
    }

    pub fn bounds(&self) -> &ModelBounds {
        &self.bounds
    }

    /// `(x_percent, z_percent)` of `p` inside the frame; 0..1 when inside.
    pub fn normalized(&self, p: GeoPoint) -> Result<(f64, f64), ProjectionError> {
        if !p.is_finite() {
            return Err(ProjectionError::NonFiniteInput(p));
        }
        let f = &self.frame;
        let x_percent = (p.lng - f.lng_min()) / (f.lng_max() - f.lng_min());
        // North is the model's near (min Z) edge.
        let z_percent = (f.lat_max() - p.lat) / (f.lat_max() - f.lat_min());
        Ok((x_percent, z_percent))
    }

    pub fn project(&self, p: GeoPoint) -> Result<PlanePoint, ProjectionError> {
        let (x_percent, z_percent) = self.normalized(p)?;
        let b = &self.bounds;
        Ok(PlanePoint::new(
            b.min_x + x_percent * (b.max_x - b.min_x),
            b.min_z + z_percent * (b.max_z - b.min_z),
        ))
    }
}

/// One-shot projection without keeping a [`GeoProjector`] around.
pub fn project_geo(
    p: GeoPoint,
    frame: &ReferenceFrame,
    bounds: &ModelBounds,
) -> Result<PlanePoint, ProjectionError> {
    GeoProjector::new(*frame, *bounds)?.project(p)
}
