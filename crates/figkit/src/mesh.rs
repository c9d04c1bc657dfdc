//! Indexed triangle meshes and the small set of operations the figure
//! pipelines need: normals, adjacency, subdivision, cleaning, smoothing and
//! warping along normals.
//!
//! Invariants
//! - Faces index into `vertices`; orientation is counter-clockwise seen from
//!   outside, so face normals point outward for closed meshes.
//! - Operations never reorder surviving vertices unless documented (`clean`).

use std::collections::HashMap;

use nalgebra::Vector3;

pub type Vec3 = Vector3<f64>;

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Smallest box containing all points; `None` for an empty iterator.
    pub fn from_points<'a, I: IntoIterator<Item = &'a Vec3>>(points: I) -> Option<Self> {
        let mut it = points.into_iter();
        let first = *it.next()?;
        let (min, max) = it.fold((first, first), |(lo, hi), p| (lo.inf(p), hi.sup(p)));
        Some(Self { min, max })
    }

    #[inline]
    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }

    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Grow by `margin` on every side.
    #[inline]
    pub fn expanded(&self, margin: f64) -> Self {
        let m = Vec3::repeat(margin);
        Self {
            min: self.min - m,
            max: self.max + m,
        }
    }

    #[inline]
    pub fn contains(&self, p: &Vec3) -> bool {
        (0..3).all(|k| p[k] >= self.min[k] && p[k] <= self.max[k])
    }
}

#[derive(Clone, Debug, Default)]
pub struct TriMesh {
    pub vertices: Vec<Vec3>,
    pub faces: Vec<[usize; 3]>,
}

impl TriMesh {
    pub fn new(vertices: Vec<Vec3>, faces: Vec<[usize; 3]>) -> Self {
        Self { vertices, faces }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.faces.is_empty()
    }

    pub fn bounds(&self) -> Option<Aabb> {
        Aabb::from_points(&self.vertices)
    }

    /// Unnormalized face normal; its length is twice the face area.
    #[inline]
    pub fn face_normal(&self, face: [usize; 3]) -> Vec3 {
        let [a, b, c] = face.map(|i| self.vertices[i]);
        (b - a).cross(&(c - a))
    }

    pub fn face_area(&self, face: [usize; 3]) -> f64 {
        0.5 * self.face_normal(face).norm()
    }

    pub fn surface_area(&self) -> f64 {
        self.faces.iter().map(|&f| self.face_area(f)).sum()
    }

    /// Area-weighted vertex normals. Isolated vertices get a zero vector.
    pub fn vertex_normals(&self) -> Vec<Vec3> {
        let mut normals = vec![Vec3::zeros(); self.vertices.len()];
        for &face in &self.faces {
            let n = self.face_normal(face);
            for i in face {
                normals[i] += n;
            }
        }
        for n in &mut normals {
            let len = n.norm();
            if len > 0.0 {
                *n /= len;
            }
        }
        normals
    }

    /// One third of the incident face area per vertex (barycentric cell area).
    pub fn vertex_areas(&self) -> Vec<f64> {
        let mut areas = vec![0.0; self.vertices.len()];
        for &face in &self.faces {
            let a = self.face_area(face) / 3.0;
            for i in face {
                areas[i] += a;
            }
        }
        areas
    }

    /// Sorted, deduplicated one-ring neighbours per vertex.
    pub fn vertex_neighbors(&self) -> Vec<Vec<usize>> {
        let mut adj = vec![Vec::new(); self.vertices.len()];
        for &[a, b, c] in &self.faces {
            adj[a].extend([b, c]);
            adj[b].extend([a, c]);
            adj[c].extend([a, b]);
        }
        for ring in &mut adj {
            ring.sort_unstable();
            ring.dedup();
        }
        adj
    }

    /// Append another mesh, reindexing its faces.
    pub fn append(&mut self, other: &TriMesh) {
        let offset = self.vertices.len();
        self.vertices.extend_from_slice(&other.vertices);
        self.faces
            .extend(other.faces.iter().map(|f| f.map(|i| i + offset)));
    }

    /// Midpoint subdivision: every triangle becomes four, `levels` times.
    /// Shared edges share their midpoint, so closed meshes stay closed.
    pub fn subdivide_linear(&self, levels: usize) -> TriMesh {
        let mut mesh = self.clone();
        for _ in 0..levels {
            let mut vertices = mesh.vertices.clone();
            let mut faces = Vec::with_capacity(mesh.faces.len() * 4);
            let mut midpoints: HashMap<(usize, usize), usize> = HashMap::new();
            let mut midpoint = |a: usize, b: usize, vertices: &mut Vec<Vec3>| -> usize {
                let key = (a.min(b), a.max(b));
                *midpoints.entry(key).or_insert_with(|| {
                    let mid = (vertices[a] + vertices[b]) * 0.5;
                    vertices.push(mid);
                    vertices.len() - 1
                })
            };
            for &[a, b, c] in &mesh.faces {
                let ab = midpoint(a, b, &mut vertices);
                let bc = midpoint(b, c, &mut vertices);
                let ca = midpoint(c, a, &mut vertices);
                faces.push([a, ab, ca]);
                faces.push([ab, b, bc]);
                faces.push([ca, bc, c]);
                faces.push([ab, bc, ca]);
            }
            mesh = TriMesh { vertices, faces };
        }
        mesh
    }

    /// Merge vertices closer than `tol` (grid-snapped), drop faces that
    /// collapse, and drop unreferenced vertices. Surviving vertices keep their
    /// relative order.
    pub fn clean(&self, tol: f64) -> TriMesh {
        let tol = tol.max(f64::MIN_POSITIVE);
        let mut cell_to_rep: HashMap<(i64, i64, i64), usize> = HashMap::new();
        let remap: Vec<usize> = self
            .vertices
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let key = (
                    (p.x / tol).round() as i64,
                    (p.y / tol).round() as i64,
                    (p.z / tol).round() as i64,
                );
                *cell_to_rep.entry(key).or_insert(i)
            })
            .collect();

        let faces: Vec<[usize; 3]> = self
            .faces
            .iter()
            .map(|f| f.map(|i| remap[i]))
            .filter(|&[a, b, c]| a != b && b != c && c != a)
            .collect();

        let mut referenced = vec![false; self.vertices.len()];
        for f in &faces {
            for &i in f {
                referenced[i] = true;
            }
        }
        let mut used = vec![usize::MAX; self.vertices.len()];
        let mut vertices = Vec::new();
        for (i, _) in referenced.iter().enumerate().filter(|(_, r)| **r) {
            used[i] = vertices.len();
            vertices.push(self.vertices[i]);
        }
        let faces = faces.into_iter().map(|f| f.map(|i| used[i])).collect();
        TriMesh { vertices, faces }
    }

    /// Laplacian relaxation: each vertex moves `relaxation` of the way towards
    /// the mean of its one-ring, `iterations` times (Jacobi updates).
    pub fn smooth_laplacian(&mut self, iterations: usize, relaxation: f64) {
        if iterations == 0 || relaxation == 0.0 {
            return;
        }
        let adj = self.vertex_neighbors();
        for _ in 0..iterations {
            let next: Vec<Vec3> = self
                .vertices
                .iter()
                .zip(&adj)
                .map(|(p, ring)| {
                    if ring.is_empty() {
                        return *p;
                    }
                    let mean = ring.iter().map(|&j| self.vertices[j]).sum::<Vec3>()
                        / ring.len() as f64;
                    p + (mean - p) * relaxation
                })
                .collect();
            self.vertices = next;
        }
    }

    /// Displace every vertex along its normal by the matching scalar.
    pub fn warp_along_normals(&mut self, scalars: &[f64]) {
        debug_assert_eq!(scalars.len(), self.vertices.len());
        let normals = self.vertex_normals();
        for ((p, n), s) in self.vertices.iter_mut().zip(&normals).zip(scalars) {
            *p += n * *s;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn octahedron() -> TriMesh {
        let v = vec![
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(-1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, -1.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(0.0, 0.0, -1.0),
        ];
        let f = vec![
            [0, 2, 4],
            [2, 1, 4],
            [1, 3, 4],
            [3, 0, 4],
            [2, 0, 5],
            [1, 2, 5],
            [3, 1, 5],
            [0, 3, 5],
        ];
        TriMesh::new(v, f)
    }

    #[test]
    fn normals_point_outward() {
        let m = octahedron();
        for (p, n) in m.vertices.iter().zip(m.vertex_normals()) {
            assert!(p.dot(&n) > 0.9);
        }
    }

    #[test]
    fn subdivision_shares_midpoints() {
        let m = octahedron().subdivide_linear(2);
        // V - E + F = 2 survives subdivision of a closed genus-0 mesh.
        assert_eq!(m.faces.len(), 8 * 16);
        let e = m.faces.len() * 3 / 2;
        assert_eq!(m.vertices.len() as i64 - e as i64 + m.faces.len() as i64, 2);
        assert!((m.surface_area() - octahedron().surface_area()).abs() < 1e-9);
    }

    #[test]
    fn clean_merges_duplicates_and_drops_unused() {
        let mut m = octahedron();
        let mut dup = octahedron();
        dup.vertices.push(Vec3::new(9.0, 9.0, 9.0));
        m.append(&dup);
        let c = m.clean(1e-9);
        assert_eq!(c.vertices.len(), 6);
        assert_eq!(c.faces.len(), 16);
    }

    #[test]
    fn smoothing_shrinks_convex_shape() {
        let mut m = octahedron().subdivide_linear(1);
        let before = m.bounds().unwrap().extent().norm();
        m.smooth_laplacian(5, 0.5);
        let after = m.bounds().unwrap().extent().norm();
        assert!(after < before);
    }

    #[test]
    fn warp_moves_along_normals() {
        let mut m = octahedron();
        let s = vec![0.5; m.vertices.len()];
        m.warp_along_normals(&s);
        for p in &m.vertices {
            assert!((p.norm() - 1.5).abs() < 1e-12);
        }
    }
}
