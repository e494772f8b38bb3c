use std::fmt;

use foundation::bounds::ModelBounds;
use foundation::math::{GeoPoint, Vec3};

/// Monotonic token identifying one selection attempt.
///
/// Every click and every cancel takes a new generation; async work started
/// under an older generation may not touch the selection.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(pub u64);

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum CandidateOrigin {
    /// Picked directly on the rendered terrain.
    Direct,
    /// Picked on the 2D map; `on_terrain` is false for flat fallbacks.
    Map { geo: GeoPoint, on_terrain: bool },
}

/// A selected, not yet persisted, pin location.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub generation: Generation,
    pub point: Vec3,
    /// Label as typed; trimmed only when saved.
    pub label: String,
    pub origin: CandidateOrigin,
}

impl Candidate {
    pub(crate) fn new(generation: Generation, point: Vec3, origin: CandidateOrigin) -> Self {
        Self {
            generation,
            point,
            label: String::new(),
            origin,
        }
    }
}

/// Selection state machine: at most one candidate exists at a time.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Selection {
    #[default]
    Idle,
    /// A 2D click is being snapped onto the terrain.
    Resolving { generation: Generation, geo: GeoPoint },
    Selecting(Candidate),
    /// The candidate is being written to the store.
    Persisting(Candidate),
}

impl Selection {
    pub fn candidate(&self) -> Option<&Candidate> {
        match self {
            Selection::Selecting(c) | Selection::Persisting(c) => Some(c),
            Selection::Idle | Selection::Resolving { .. } => None,
        }
    }

    pub fn generation(&self) -> Option<Generation> {
        match self {
            Selection::Idle => None,
            Selection::Resolving { generation, .. } => Some(*generation),
            Selection::Selecting(c) | Selection::Persisting(c) => Some(c.generation),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Selection::Idle)
    }
}

/// Terrain availability as seen by the operator.
#[derive(Debug, Clone, PartialEq)]
pub enum MeshStatus {
    NotLoaded,
    Loading,
    Loaded {
        source: String,
        bounds: ModelBounds,
        triangles: usize,
    },
    Failed(String),
}

impl MeshStatus {
    pub fn is_loaded(&self) -> bool {
        matches!(self, MeshStatus::Loaded { .. })
    }
}

/// What a click turned into.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ClickOutcome {
    /// A candidate on the terrain surface.
    Resolved(Vec3),
    /// The position missed the terrain; `fallback` is the flat candidate when
    /// the miss policy allows one.
    OutOfBounds { fallback: Option<Vec3> },
}

impl ClickOutcome {
    pub fn point(&self) -> Option<Vec3> {
        match self {
            ClickOutcome::Resolved(p) => Some(*p),
            ClickOutcome::OutOfBounds { fallback } => *fallback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Candidate, CandidateOrigin, Generation, Selection};
    use foundation::math::Vec3;

    #[test]
    fn candidate_only_in_selecting_and_persisting() {
        let c = Candidate::new(Generation(3), Vec3::new(1.0, 2.0, 3.0), CandidateOrigin::Direct);
        assert!(Selection::Idle.candidate().is_none());
        assert_eq!(Selection::Selecting(c.clone()).candidate(), Some(&c));
        assert_eq!(Selection::Persisting(c.clone()).generation(), Some(Generation(3)));
        assert!(Selection::default().is_idle());
    }
}
