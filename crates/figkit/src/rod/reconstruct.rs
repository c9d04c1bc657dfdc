//! Watertight surface from an oriented point cloud.
//!
//! Model
//! - Regular grid padded around the cloud. Nodes within `band_cells` of a
//!   sample take the tangent-plane distance to their nearest sample
//!   (`(x - p) · n`), which is negative inside.
//! - Nodes outside the band get their side from a flood fill that starts at
//!   the grid boundary and cannot cross negative band nodes.
//! - Naive surface nets polygonise the zero crossing: one vertex per mixed
//!   cell (mean of edge crossings), one quad per sign-changing grid edge.

use std::collections::VecDeque;

use nalgebra::Vector3;

use super::types::{PointCloud, RodError};
use crate::mesh::{Aabb, TriMesh};

const CORNERS: [[usize; 3]; 8] = [
    [0, 0, 0],
    [1, 0, 0],
    [0, 1, 0],
    [1, 1, 0],
    [0, 0, 1],
    [1, 0, 1],
    [0, 1, 1],
    [1, 1, 1],
];

const CELL_EDGES: [[usize; 2]; 12] = [
    [0, 1],
    [2, 3],
    [4, 5],
    [6, 7],
    [0, 2],
    [1, 3],
    [4, 6],
    [5, 7],
    [0, 4],
    [1, 5],
    [2, 6],
    [3, 7],
];

/// Node lattice `origin + h * (i, j, k)`.
struct Grid {
    origin: Vector3<f64>,
    h: f64,
    dims: [usize; 3],
}

impl Grid {
    fn around(bounds: &Aabb, h: f64, pad_cells: usize) -> Self {
        let b = bounds.expanded(pad_cells as f64 * h);
        let ext = b.extent();
        let dims = [0, 1, 2].map(|k| (ext[k] / h).ceil() as usize + 1);
        Self {
            origin: b.min,
            h,
            dims,
        }
    }

    #[inline]
    fn len(&self) -> usize {
        self.dims.iter().product()
    }

    #[inline]
    fn node(&self, i: usize, j: usize, k: usize) -> usize {
        i + self.dims[0] * (j + self.dims[1] * k)
    }

    #[inline]
    fn cell(&self, i: usize, j: usize, k: usize) -> usize {
        i + (self.dims[0] - 1) * (j + (self.dims[1] - 1) * k)
    }

    #[inline]
    fn position(&self, i: usize, j: usize, k: usize) -> Vector3<f64> {
        self.origin + Vector3::new(i as f64, j as f64, k as f64) * self.h
    }

    #[inline]
    fn on_boundary(&self, i: usize, j: usize, k: usize) -> bool {
        i == 0
            || j == 0
            || k == 0
            || i + 1 == self.dims[0]
            || j + 1 == self.dims[1]
            || k + 1 == self.dims[2]
    }
}

/// Reconstruct a closed triangle mesh with grid spacing `h`.
pub fn reconstruct_surface(
    cloud: &PointCloud,
    h: f64,
    band_cells: usize,
) -> Result<TriMesh, RodError> {
    let bounds = Aabb::from_points(&cloud.points).ok_or(RodError::EmptyStage {
        stage: "reconstruct",
    })?;
    let grid = Grid::around(&bounds, h, band_cells + 2);
    let values = signed_field(cloud, &grid, band_cells);
    let mesh = surface_nets(&grid, &values).clean(h * 1e-6);
    if mesh.is_empty() {
        return Err(RodError::EmptyStage {
            stage: "reconstruct",
        });
    }
    tracing::debug!(
        nodes = grid.len(),
        vertices = mesh.vertices.len(),
        faces = mesh.faces.len(),
        "reconstructed surface"
    );
    Ok(mesh)
}

fn signed_field(cloud: &PointCloud, grid: &Grid, band_cells: usize) -> Vec<f64> {
    let n = grid.len();
    let band = band_cells as f64 * grid.h;
    let reach = band_cells as f64;
    let mut nearest = vec![f64::INFINITY; n];
    let mut sdf = vec![0.0; n];

    for (p, normal) in cloud.points.iter().zip(&cloud.normals) {
        let rel = (p - grid.origin) / grid.h;
        let lo = [0, 1, 2].map(|k| (rel[k] - reach).floor().max(0.0) as usize);
        let hi = [0, 1, 2].map(|k| ((rel[k] + reach).ceil() as usize).min(grid.dims[k] - 1));
        for k in lo[2]..=hi[2] {
            for j in lo[1]..=hi[1] {
                for i in lo[0]..=hi[0] {
                    let idx = grid.node(i, j, k);
                    let d = grid.position(i, j, k) - p;
                    let dist = d.norm();
                    if dist <= band && dist < nearest[idx] {
                        nearest[idx] = dist;
                        sdf[idx] = d.dot(normal);
                    }
                }
            }
        }
    }

    let blocked = |idx: usize| nearest[idx].is_finite() && sdf[idx] < 0.0;
    let mut outside = vec![false; n];
    let mut queue = VecDeque::new();
    for k in 0..grid.dims[2] {
        for j in 0..grid.dims[1] {
            for i in 0..grid.dims[0] {
                let idx = grid.node(i, j, k);
                if grid.on_boundary(i, j, k) && !blocked(idx) {
                    outside[idx] = true;
                    queue.push_back((i, j, k));
                }
            }
        }
    }
    while let Some((i, j, k)) = queue.pop_front() {
        let mut visit = |i: usize, j: usize, k: usize| {
            let idx = grid.node(i, j, k);
            if !outside[idx] && !blocked(idx) {
                outside[idx] = true;
                queue.push_back((i, j, k));
            }
        };
        if i > 0 {
            visit(i - 1, j, k);
        }
        if i + 1 < grid.dims[0] {
            visit(i + 1, j, k);
        }
        if j > 0 {
            visit(i, j - 1, k);
        }
        if j + 1 < grid.dims[1] {
            visit(i, j + 1, k);
        }
        if k > 0 {
            visit(i, j, k - 1);
        }
        if k + 1 < grid.dims[2] {
            visit(i, j, k + 1);
        }
    }

    let floor = grid.h * 1e-6;
    (0..n)
        .map(|idx| {
            let mag = if nearest[idx].is_finite() {
                sdf[idx].abs().max(floor)
            } else {
                band
            };
            if outside[idx] {
                mag
            } else {
                -mag
            }
        })
        .collect()
}

fn surface_nets(grid: &Grid, values: &[f64]) -> TriMesh {
    let [nx, ny, nz] = grid.dims;
    let mut cell_vertex = vec![usize::MAX; (nx - 1) * (ny - 1) * (nz - 1)];
    let mut vertices = Vec::new();

    for k in 0..nz - 1 {
        for j in 0..ny - 1 {
            for i in 0..nx - 1 {
                let vals = CORNERS.map(|c| values[grid.node(i + c[0], j + c[1], k + c[2])]);
                let inside = vals.iter().filter(|v| **v < 0.0).count();
                if inside == 0 || inside == 8 {
                    continue;
                }
                let mut acc = Vector3::zeros();
                let mut crossings = 0usize;
                for [a, b] in CELL_EDGES {
                    let (va, vb) = (vals[a], vals[b]);
                    if (va < 0.0) != (vb < 0.0) {
                        let t = va / (va - vb);
                        let pa = grid.position(i + CORNERS[a][0], j + CORNERS[a][1], k + CORNERS[a][2]);
                        let pb = grid.position(i + CORNERS[b][0], j + CORNERS[b][1], k + CORNERS[b][2]);
                        acc += pa + (pb - pa) * t;
                        crossings += 1;
                    }
                }
                cell_vertex[grid.cell(i, j, k)] = vertices.len();
                vertices.push(acc / crossings as f64);
            }
        }
    }

    let mut faces = Vec::new();
    let mut emit = |quad: [usize; 4], start_inside: bool| {
        if quad.iter().any(|&v| v == usize::MAX) {
            return;
        }
        let [c0, c1, c2, c3] = quad;
        if start_inside {
            faces.push([c0, c1, c2]);
            faces.push([c0, c2, c3]);
        } else {
            faces.push([c0, c2, c1]);
            faces.push([c0, c3, c2]);
        }
    };
    for k in 1..nz - 1 {
        for j in 1..ny - 1 {
            for i in 1..nx - 1 {
                let v0 = values[grid.node(i, j, k)];
                let start_inside = v0 < 0.0;
                // +x edge; cells around it in the (y, z) plane
                if (values[grid.node(i + 1, j, k)] < 0.0) != start_inside {
                    emit(
                        [
                            cell_vertex[grid.cell(i, j - 1, k - 1)],
                            cell_vertex[grid.cell(i, j, k - 1)],
                            cell_vertex[grid.cell(i, j, k)],
                            cell_vertex[grid.cell(i, j - 1, k)],
                        ],
                        start_inside,
                    );
                }
                // +y edge; (z, x) plane
                if (values[grid.node(i, j + 1, k)] < 0.0) != start_inside {
                    emit(
                        [
                            cell_vertex[grid.cell(i - 1, j, k - 1)],
                            cell_vertex[grid.cell(i - 1, j, k)],
                            cell_vertex[grid.cell(i, j, k)],
                            cell_vertex[grid.cell(i, j, k - 1)],
                        ],
                        start_inside,
                    );
                }
                // +z edge; (x, y) plane
                if (values[grid.node(i, j, k + 1)] < 0.0) != start_inside {
                    emit(
                        [
                            cell_vertex[grid.cell(i - 1, j - 1, k)],
                            cell_vertex[grid.cell(i, j - 1, k)],
                            cell_vertex[grid.cell(i, j, k)],
                            cell_vertex[grid.cell(i - 1, j, k)],
                        ],
                        start_inside,
                    );
                }
            }
        }
    }
    TriMesh::new(vertices, faces)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rod::primitives::Sphere;

    #[test]
    fn sphere_cloud_reconstructs_closed_outward_surface() {
        let s = Sphere {
            center: Vector3::new(0.2, -0.1, 0.3),
            radius: 0.5,
        };
        let cloud = s.patch(&Vector3::z(), 24, 2);
        let h = 0.05;
        let mesh = reconstruct_surface(&cloud, h, 3).unwrap();
        assert!(!mesh.is_empty());
        for p in &mesh.vertices {
            assert!(((p - s.center).norm() - 0.5).abs() < 2.0 * h);
        }
        // Closed and outward: every edge borders an even number of faces,
        // and normals face away from the centre.
        let mut edges = std::collections::HashMap::new();
        for f in &mesh.faces {
            for e in 0..3 {
                let (a, b) = (f[e], f[(e + 1) % 3]);
                *edges.entry((a.min(b), a.max(b))).or_insert(0usize) += 1;
            }
        }
        assert!(edges.values().all(|&c| c >= 2 && c % 2 == 0));
        for (p, n) in mesh.vertices.iter().zip(mesh.vertex_normals()) {
            assert!((p - s.center).dot(&n) > 0.0);
        }
    }

    #[test]
    fn empty_cloud_is_an_error() {
        let err = reconstruct_surface(&PointCloud::default(), 0.1, 3).unwrap_err();
        assert!(matches!(err, RodError::EmptyStage { .. }));
    }
}
