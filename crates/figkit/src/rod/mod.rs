//! Organic rod mesh: a noisy closed tube through a polyline.
//!
//! Pipeline
//! 1. `sampling`: sphere caps at waypoints, cylinder shells along segments,
//!    trimmed against their neighbours, merged into one oriented cloud.
//! 2. `reconstruct`: narrow-band signed distance + surface nets.
//! 3. `remesh`: centroidal Voronoi clustering to a uniform vertex budget.
//! 4. `noise`: one or more Perlin displacement layers, each smoothed.
//!
//! The stages are public so benches and tests can drive them one by one;
//! `build_rod` runs them in order.

mod noise;
mod primitives;
mod reconstruct;
mod remesh;
mod sampling;
mod types;

pub use noise::{apply_noise_layer, PerlinNoise};
pub use primitives::{Cylinder, Solid, Sphere};
pub use reconstruct::reconstruct_surface;
pub use remesh::cluster_remesh;
pub use sampling::sample_tube;
pub use types::{
    NoiseLayer, PointCloud, ReconstructCfg, RemeshCfg, RodCfg, RodError, SamplingCfg, Waypoints,
};

use crate::mesh::TriMesh;

/// Run the whole pipeline and return the finished, displaced mesh.
pub fn build_rod(waypoints: &Waypoints, cfg: &RodCfg) -> Result<TriMesh, RodError> {
    cfg.validate()?;
    let cloud = sample_tube(waypoints, cfg.radius, &cfg.sampling);
    if cloud.is_empty() {
        return Err(RodError::EmptyStage { stage: "sample" });
    }
    let surface = reconstruct_surface(&cloud, cfg.grid_spacing(), cfg.reconstruct.band_cells)?;
    let mut mesh = cluster_remesh(&surface, &cfg.remesh)?;
    for layer in &cfg.noise {
        apply_noise_layer(&mut mesh, layer);
    }
    tracing::info!(
        vertices = mesh.vertices.len(),
        faces = mesh.faces.len(),
        "rod built"
    );
    Ok(mesh)
}

#[cfg(test)]
mod tests;
