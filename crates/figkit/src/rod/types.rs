//! Waypoints, oriented point clouds, pipeline configuration and errors.

use std::fmt;

use nalgebra::Vector3;
use serde::Serialize;

/// Validation tolerance for waypoint spacing.
pub(crate) const MIN_SEGMENT_LEN: f64 = 1e-9;

/// Errors surfaced by the rod pipeline.
#[derive(Debug)]
pub enum RodError {
    /// Fewer than two waypoints, a non-finite coordinate, or repeated points.
    InvalidWaypoints { reason: String },
    /// Radius must be finite and positive.
    InvalidRadius { radius: f64 },
    /// A configuration value is out of range.
    InvalidConfig { reason: String },
    /// A stage produced no geometry (e.g. reconstruction found no crossing).
    EmptyStage { stage: &'static str },
}

impl RodError {
    pub(crate) fn waypoints(reason: impl Into<String>) -> Self {
        Self::InvalidWaypoints {
            reason: reason.into(),
        }
    }

    pub(crate) fn config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for RodError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidWaypoints { reason } => write!(f, "invalid waypoints: {reason}"),
            Self::InvalidRadius { radius } => {
                write!(f, "radius must be finite and > 0 (got {radius})")
            }
            Self::InvalidConfig { reason } => write!(f, "invalid rod config: {reason}"),
            Self::EmptyStage { stage } => write!(f, "stage `{stage}` produced no geometry"),
        }
    }
}

impl std::error::Error for RodError {}

/// Ordered medial path of the rod.
///
/// Invariants:
/// - at least two points, all finite;
/// - consecutive points are distinct (segments have positive length).
#[derive(Clone, Debug, PartialEq)]
pub struct Waypoints(Vec<Vector3<f64>>);

impl Waypoints {
    pub fn new(points: Vec<Vector3<f64>>) -> Result<Self, RodError> {
        if points.len() < 2 {
            return Err(RodError::waypoints("need at least two waypoints"));
        }
        if points.iter().any(|p| !p.iter().all(|c| c.is_finite())) {
            return Err(RodError::waypoints("coordinates must be finite"));
        }
        if let Some(k) = points
            .windows(2)
            .position(|w| (w[1] - w[0]).norm() <= MIN_SEGMENT_LEN)
        {
            return Err(RodError::waypoints(format!(
                "waypoints {k} and {} coincide",
                k + 1
            )));
        }
        Ok(Self(points))
    }

    /// The path used for the paper figure.
    pub fn paper() -> Self {
        let pts = [
            [0.0, 0.0, 0.0],
            [1.0, 0.7, 0.0],
            [2.0, 2.1, 0.0],
            [3.0, 2.6, 0.0],
            [4.0, 3.8, 0.0],
            [5.0, 4.7, 0.0],
        ];
        Self(pts.iter().map(|p| Vector3::new(p[0], p[1], p[2])).collect())
    }

    #[inline]
    pub fn points(&self) -> &[Vector3<f64>] {
        &self.0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consecutive `(start, end)` pairs.
    pub fn segments(&self) -> impl Iterator<Item = (Vector3<f64>, Vector3<f64>)> + '_ {
        self.0.windows(2).map(|w| (w[0], w[1]))
    }

    /// Euclidean distance from `p` to the polyline.
    pub fn distance_to_path(&self, p: &Vector3<f64>) -> f64 {
        self.segments()
            .map(|(a, b)| {
                let ab = b - a;
                let t = ((p - a).dot(&ab) / ab.norm_squared()).clamp(0.0, 1.0);
                (p - (a + ab * t)).norm()
            })
            .fold(f64::INFINITY, f64::min)
    }
}

/// Surface samples with outward unit normals.
#[derive(Clone, Debug, Default)]
pub struct PointCloud {
    pub points: Vec<Vector3<f64>>,
    pub normals: Vec<Vector3<f64>>,
}

impl PointCloud {
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn extend(&mut self, other: PointCloud) {
        self.points.extend(other.points);
        self.normals.extend(other.normals);
    }
}

/// Sampling of the sphere caps and cylinder shells.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct SamplingCfg {
    /// Angular resolution around each primitive's axis.
    pub theta_resolution: usize,
    /// Midpoint subdivisions applied to every primitive patch.
    pub subdivisions: usize,
}

impl Default for SamplingCfg {
    fn default() -> Self {
        Self {
            theta_resolution: 30,
            subdivisions: 2,
        }
    }
}

/// Narrow-band grid reconstruction.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct ReconstructCfg {
    /// Grid spacing; `None` derives it from the radius.
    pub spacing: Option<f64>,
    /// Half-width of the signed-distance band, in grid cells.
    pub band_cells: usize,
}

impl Default for ReconstructCfg {
    fn default() -> Self {
        Self {
            spacing: None,
            band_cells: 3,
        }
    }
}

/// Centroidal-Voronoi clustering remesh.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct RemeshCfg {
    /// Midpoint subdivisions before clustering.
    pub subdivisions: usize,
    /// Target cluster (= output vertex) count.
    pub clusters: usize,
    /// Maximum assign/update rounds.
    pub iso_try: usize,
}

impl Default for RemeshCfg {
    fn default() -> Self {
        Self {
            subdivisions: 0,
            clusters: 2000,
            iso_try: 20,
        }
    }
}

/// One displacement pass: Perlin field warped along normals, then smoothed.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct NoiseLayer {
    pub amplitude: f64,
    pub frequency: [f64; 3],
    pub phase: [f64; 3],
    /// Permutation seed of the gradient lattice.
    pub seed: u64,
    /// Midpoint subdivisions applied before sampling the field.
    pub subdivide_before: usize,
    pub smooth_iterations: usize,
    pub relaxation: f64,
}

impl NoiseLayer {
    /// Low-frequency undulation.
    pub fn coarse() -> Self {
        Self {
            amplitude: 0.01,
            frequency: [0.689, 0.562, 0.683],
            phase: [0.0; 3],
            seed: 0,
            subdivide_before: 0,
            smooth_iterations: 10,
            relaxation: 0.01,
        }
    }

    /// High-frequency roughness.
    pub fn fine() -> Self {
        Self {
            amplitude: 0.05,
            frequency: [16.0, 15.0, 14.0],
            phase: [0.0; 3],
            seed: 1,
            subdivide_before: 1,
            smooth_iterations: 2,
            relaxation: 0.01,
        }
    }
}

/// Full rod pipeline configuration. Defaults reproduce the paper figure.
#[derive(Clone, Debug, Serialize)]
pub struct RodCfg {
    pub radius: f64,
    pub sampling: SamplingCfg,
    pub reconstruct: ReconstructCfg,
    pub remesh: RemeshCfg,
    pub noise: Vec<NoiseLayer>,
}

impl Default for RodCfg {
    fn default() -> Self {
        Self {
            radius: 0.5,
            sampling: SamplingCfg::default(),
            reconstruct: ReconstructCfg::default(),
            remesh: RemeshCfg::default(),
            noise: vec![NoiseLayer::coarse(), NoiseLayer::fine()],
        }
    }
}

impl RodCfg {
    pub(crate) fn validate(&self) -> Result<(), RodError> {
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(RodError::InvalidRadius {
                radius: self.radius,
            });
        }
        if self.sampling.theta_resolution < 3 {
            return Err(RodError::config("theta_resolution must be >= 3"));
        }
        if let Some(h) = self.reconstruct.spacing {
            if !(h.is_finite() && h > 0.0) {
                return Err(RodError::config("grid spacing must be finite and > 0"));
            }
        }
        if self.reconstruct.band_cells == 0 {
            return Err(RodError::config("band_cells must be >= 1"));
        }
        if self.remesh.clusters < 4 {
            return Err(RodError::config("need at least 4 clusters"));
        }
        if self
            .noise
            .iter()
            .any(|l| !(l.amplitude.is_finite() && l.amplitude >= 0.0))
        {
            return Err(RodError::config("noise amplitude must be finite and >= 0"));
        }
        Ok(())
    }

    /// Grid spacing used by reconstruction.
    pub fn grid_spacing(&self) -> f64 {
        self.reconstruct.spacing.unwrap_or(self.radius * 0.06)
    }

    /// Largest outward displacement the noise layers can add.
    pub fn max_noise_displacement(&self) -> f64 {
        self.noise.iter().map(|l| l.amplitude).sum()
    }
}
