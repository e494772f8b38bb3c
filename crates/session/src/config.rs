use std::time::Duration;

use foundation::math::{GeoPoint, ReferenceFrame};
use terrain::DEFAULT_RAY_MARGIN;
use tracing::warn;

/// What a 2D click does when the projected point misses the terrain mesh.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum MissPolicy {
    /// Select `(x, 0, z)` at the projected position and warn the operator.
    #[default]
    FlatFallback,
    /// Drop the click and warn the operator; they must pick again.
    Reject,
}

impl MissPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "flat" | "fallback" | "flat-fallback" => Some(MissPolicy::FlatFallback),
            "reject" => Some(MissPolicy::Reject),
            _ => None,
        }
    }
}

/// Reference frame of the admin tool's terrain model (Costa Rica).
pub fn default_reference_frame() -> ReferenceFrame {
    ReferenceFrame::new(
        GeoPoint::new(9.448904954935871, -84.01845893372125),
        GeoPoint::new(9.44050741576135, -81.92028806117499),
        GeoPoint::new(8.057571343207774, -81.92104254676394),
        GeoPoint::new(8.059536010587447, -84.01040199089617),
    )
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub reference_frame: ReferenceFrame,
    pub ray_margin: f64,
    pub miss_policy: MissPolicy,
    /// Deadline for each pin store call.
    pub store_timeout: Duration,
    pub mesh_load_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reference_frame: default_reference_frame(),
            ray_margin: DEFAULT_RAY_MARGIN,
            miss_policy: MissPolicy::default(),
            store_timeout: Duration::from_secs(10),
            mesh_load_timeout: Duration::from_secs(60),
        }
    }
}

impl SessionConfig {
    /// Reads `PIN_*` environment variables over the defaults.
    ///
    /// - `PIN_FRAME_EXTENT`: `lng_min,lng_max,lat_min,lat_max`
    /// - `PIN_RAY_MARGIN`: ray start height above the mesh top
    /// - `PIN_MISS_POLICY`: `flat` or `reject`
    /// - `PIN_STORE_TIMEOUT_MS`, `PIN_MESH_TIMEOUT_MS`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(raw) = lookup("PIN_FRAME_EXTENT") {
            match parse_extent(&raw) {
                Some([lng_min, lng_max, lat_min, lat_max]) => {
                    cfg.reference_frame =
                        ReferenceFrame::from_extent(lng_min, lng_max, lat_min, lat_max);
                }
                None => warn!("ignoring malformed PIN_FRAME_EXTENT: {raw}"),
            }
        }
        cfg.ray_margin = var_f64(&lookup, "PIN_RAY_MARGIN", cfg.ray_margin);
        if let Some(raw) = lookup("PIN_MISS_POLICY") {
            match MissPolicy::parse(&raw) {
                Some(policy) => cfg.miss_policy = policy,
                None => warn!("ignoring unknown PIN_MISS_POLICY: {raw}"),
            }
        }
        cfg.store_timeout = Duration::from_millis(var_u64(
            &lookup,
            "PIN_STORE_TIMEOUT_MS",
            cfg.store_timeout.as_millis() as u64,
        ));
        cfg.mesh_load_timeout = Duration::from_millis(var_u64(
            &lookup,
            "PIN_MESH_TIMEOUT_MS",
            cfg.mesh_load_timeout.as_millis() as u64,
        ));
        cfg
    }
}

fn parse_extent(raw: &str) -> Option<[f64; 4]> {
    let values: Vec<f64> = raw
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .ok()?;
    values.try_into().ok()
}

fn var_f64<F>(lookup: &F, key: &str, default: f64) -> f64
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(default)
}

fn var_u64<F>(lookup: &F, key: &str, default: u64) -> u64
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}
