//! Oriented surface samples of the sphere/cylinder union along the path.
//!
//! Model
//! - One sphere per waypoint (poles along the incoming segment, outgoing for
//!   the first point) and one open shell per segment.
//! - Each patch drops the samples lying strictly inside a neighbouring solid,
//!   so what survives approximates the boundary of the union and joints carry
//!   no buried, inward-facing samples.

use super::primitives::{Cylinder, Solid, Sphere};
use super::types::{PointCloud, SamplingCfg, Waypoints};

/// Concatenated, trimmed samples of all caps and shells.
pub fn sample_tube(waypoints: &Waypoints, radius: f64, cfg: &SamplingCfg) -> PointCloud {
    let pts = waypoints.points();
    let n = pts.len();
    let margin = radius * 1e-6;

    let spheres: Vec<Sphere> = pts
        .iter()
        .map(|&center| Sphere { center, radius })
        .collect();
    let cylinders: Vec<Cylinder> = waypoints
        .segments()
        .map(|(start, end)| Cylinder { start, end, radius })
        .collect();

    let mut cloud = PointCloud::default();
    for (j, sphere) in spheres.iter().enumerate() {
        let dir = if j == 0 { pts[1] - pts[0] } else { pts[j] - pts[j - 1] };
        let mut occluders = Vec::with_capacity(4);
        if j >= 1 {
            occluders.push(Solid::Cylinder(cylinders[j - 1]));
            occluders.push(Solid::Sphere(spheres[j - 1]));
        }
        if j + 1 < n {
            occluders.push(Solid::Cylinder(cylinders[j]));
            occluders.push(Solid::Sphere(spheres[j + 1]));
        }
        let patch = sphere.patch(&dir, cfg.theta_resolution, cfg.subdivisions);
        cloud.extend(trim(patch, &occluders, margin));
    }
    for (i, cylinder) in cylinders.iter().enumerate() {
        let mut occluders = vec![
            Solid::Sphere(spheres[i]),
            Solid::Sphere(spheres[i + 1]),
        ];
        if i >= 1 {
            occluders.push(Solid::Cylinder(cylinders[i - 1]));
        }
        if i + 1 < cylinders.len() {
            occluders.push(Solid::Cylinder(cylinders[i + 1]));
        }
        let patch = cylinder.shell(cfg.theta_resolution, cfg.subdivisions);
        cloud.extend(trim(patch, &occluders, margin));
    }
    tracing::debug!(samples = cloud.len(), waypoints = n, "sampled tube");
    cloud
}

fn trim(patch: PointCloud, occluders: &[Solid], margin: f64) -> PointCloud {
    let mut out = PointCloud::default();
    for (p, n) in patch.points.into_iter().zip(patch.normals) {
        if !occluders.iter().any(|s| s.contains_strict(&p, margin)) {
            out.points.push(p);
            out.normals.push(n);
        }
    }
    out
}
