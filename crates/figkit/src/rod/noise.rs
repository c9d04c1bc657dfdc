//! Coherent gradient noise (improved Perlin) and the displacement passes
//! built on it.

use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::types::NoiseLayer;
use crate::mesh::TriMesh;

/// Scaled Perlin field `amplitude * noise(freq ⊙ x - phase)`, bounded by
/// `amplitude` in magnitude.
#[derive(Clone, Debug)]
pub struct PerlinNoise {
    pub amplitude: f64,
    pub frequency: Vector3<f64>,
    pub phase: Vector3<f64>,
    perm: [u8; 512],
}

impl PerlinNoise {
    pub fn new(amplitude: f64, frequency: [f64; 3], phase: [f64; 3], seed: u64) -> Self {
        let mut table: Vec<u8> = (0..=255).collect();
        table.shuffle(&mut StdRng::seed_from_u64(seed));
        let mut perm = [0u8; 512];
        for (i, slot) in perm.iter_mut().enumerate() {
            *slot = table[i & 255];
        }
        Self {
            amplitude,
            frequency: Vector3::from(frequency),
            phase: Vector3::from(phase),
            perm,
        }
    }

    pub fn from_layer(layer: &NoiseLayer) -> Self {
        Self::new(layer.amplitude, layer.frequency, layer.phase, layer.seed)
    }

    #[inline]
    pub fn evaluate(&self, p: &Vector3<f64>) -> f64 {
        let q = p.component_mul(&self.frequency) - self.phase;
        self.amplitude * self.raw(q.x, q.y, q.z).clamp(-1.0, 1.0)
    }

    fn raw(&self, x: f64, y: f64, z: f64) -> f64 {
        let (xf, yf, zf) = (x.floor(), y.floor(), z.floor());
        let xi = (xf as i64 & 255) as usize;
        let yi = (yf as i64 & 255) as usize;
        let zi = (zf as i64 & 255) as usize;
        let (x, y, z) = (x - xf, y - yf, z - zf);
        let (u, v, w) = (fade(x), fade(y), fade(z));
        let p = &self.perm;

        let a = p[xi] as usize + yi;
        let aa = p[a] as usize + zi;
        let ab = p[a + 1] as usize + zi;
        let b = p[xi + 1] as usize + yi;
        let ba = p[b] as usize + zi;
        let bb = p[b + 1] as usize + zi;

        lerp(
            w,
            lerp(
                v,
                lerp(u, grad(p[aa], x, y, z), grad(p[ba], x - 1.0, y, z)),
                lerp(u, grad(p[ab], x, y - 1.0, z), grad(p[bb], x - 1.0, y - 1.0, z)),
            ),
            lerp(
                v,
                lerp(
                    u,
                    grad(p[aa + 1], x, y, z - 1.0),
                    grad(p[ba + 1], x - 1.0, y, z - 1.0),
                ),
                lerp(
                    u,
                    grad(p[ab + 1], x, y - 1.0, z - 1.0),
                    grad(p[bb + 1], x - 1.0, y - 1.0, z - 1.0),
                ),
            ),
        )
    }
}

#[inline]
fn fade(t: f64) -> f64 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

#[inline]
fn lerp(t: f64, a: f64, b: f64) -> f64 {
    a + t * (b - a)
}

#[inline]
fn grad(hash: u8, x: f64, y: f64, z: f64) -> f64 {
    let h = hash & 15;
    let u = if h < 8 { x } else { y };
    let v = if h < 4 {
        y
    } else if h == 12 || h == 14 {
        x
    } else {
        z
    };
    (if h & 1 == 0 { u } else { -u }) + (if h & 2 == 0 { v } else { -v })
}

/// Subdivide (if asked), warp along normals by the layer's field, then
/// smooth. Returns the sampled scalars, one per vertex of the warped mesh.
pub fn apply_noise_layer(mesh: &mut TriMesh, layer: &NoiseLayer) -> Vec<f64> {
    if layer.subdivide_before > 0 {
        *mesh = mesh.subdivide_linear(layer.subdivide_before);
    }
    let field = PerlinNoise::from_layer(layer);
    let scalars: Vec<f64> = mesh.vertices.iter().map(|p| field.evaluate(p)).collect();
    mesh.warp_along_normals(&scalars);
    mesh.smooth_laplacian(layer.smooth_iterations, layer.relaxation);
    tracing::debug!(
        amplitude = layer.amplitude,
        vertices = mesh.vertices.len(),
        "applied noise layer"
    );
    scalars
}
