//! Sphere and cylinder primitives: surface patches with outward normals and
//! strict inside tests used to trim overlapping samples.

use nalgebra::Vector3;

use super::types::PointCloud;
use crate::mesh::TriMesh;

/// Right-handed orthonormal frame `(u, v, w)` with `w` along `dir`.
pub(crate) fn frame(dir: &Vector3<f64>) -> (Vector3<f64>, Vector3<f64>, Vector3<f64>) {
    let w = dir.normalize();
    // Pick the world axis least aligned with w to seed the frame.
    let seed = if w.x.abs() <= w.y.abs() && w.x.abs() <= w.z.abs() {
        Vector3::x()
    } else if w.y.abs() <= w.z.abs() {
        Vector3::y()
    } else {
        Vector3::z()
    };
    let u = seed.cross(&w).normalize();
    let v = w.cross(&u);
    (u, v, w)
}

#[derive(Clone, Copy, Debug)]
pub struct Sphere {
    pub center: Vector3<f64>,
    pub radius: f64,
}

impl Sphere {
    /// Strictly inside, at least `margin` away from the surface.
    #[inline]
    pub fn contains_strict(&self, p: &Vector3<f64>, margin: f64) -> bool {
        (p - self.center).norm() < self.radius - margin
    }

    /// UV sphere with poles along `dir`, `theta_res` meridians and as many
    /// parallels; subdivided points are projected back onto the sphere.
    pub fn patch(&self, dir: &Vector3<f64>, theta_res: usize, subdivisions: usize) -> PointCloud {
        let (u, v, w) = frame(dir);
        let phi_res = theta_res.max(3);
        let mut vertices = vec![w, -w];
        for i in 1..phi_res - 1 {
            let phi = std::f64::consts::PI * i as f64 / (phi_res - 1) as f64;
            for j in 0..theta_res {
                let theta = 2.0 * std::f64::consts::PI * j as f64 / theta_res as f64;
                vertices.push(
                    u * (phi.sin() * theta.cos()) + v * (phi.sin() * theta.sin()) + w * phi.cos(),
                );
            }
        }
        let rings = phi_res - 2;
        let ring = |i: usize, j: usize| 2 + i * theta_res + (j % theta_res);
        let mut faces = Vec::new();
        for j in 0..theta_res {
            faces.push([0, ring(0, j), ring(0, j + 1)]);
            faces.push([1, ring(rings - 1, j + 1), ring(rings - 1, j)]);
        }
        for i in 0..rings - 1 {
            for j in 0..theta_res {
                faces.push([ring(i, j), ring(i + 1, j), ring(i + 1, j + 1)]);
                faces.push([ring(i, j), ring(i + 1, j + 1), ring(i, j + 1)]);
            }
        }
        let unit = TriMesh::new(vertices, faces).subdivide_linear(subdivisions);
        let normals: Vec<Vector3<f64>> = unit.vertices.iter().map(|p| p.normalize()).collect();
        let points = normals
            .iter()
            .map(|n| self.center + n * self.radius)
            .collect();
        PointCloud { points, normals }
    }
}

/// Closed (capped) cylinder between `start` and `end`.
#[derive(Clone, Copy, Debug)]
pub struct Cylinder {
    pub start: Vector3<f64>,
    pub end: Vector3<f64>,
    pub radius: f64,
}

impl Cylinder {
    #[inline]
    pub fn height(&self) -> f64 {
        (self.end - self.start).norm()
    }

    /// Strictly inside the capped cylinder, at least `margin` from every face.
    pub fn contains_strict(&self, p: &Vector3<f64>, margin: f64) -> bool {
        let axis = self.end - self.start;
        let len = axis.norm();
        let w = axis / len;
        let rel = p - self.start;
        let t = rel.dot(&w);
        if t <= margin || t >= len - margin {
            return false;
        }
        (rel - w * t).norm() < self.radius - margin
    }

    /// Open shell (no caps); ring spacing matches the angular spacing.
    pub fn shell(&self, theta_res: usize, subdivisions: usize) -> PointCloud {
        let axis = self.end - self.start;
        let height = axis.norm();
        let (u, v, w) = frame(&axis);
        let arc = 2.0 * std::f64::consts::PI * self.radius / theta_res as f64;
        let rings = ((height / arc).ceil() as usize).max(1) + 1;
        let mut vertices = Vec::with_capacity(rings * theta_res);
        for i in 0..rings {
            let t = height * i as f64 / (rings - 1) as f64;
            for j in 0..theta_res {
                let theta = 2.0 * std::f64::consts::PI * j as f64 / theta_res as f64;
                vertices.push(
                    (u * theta.cos() + v * theta.sin()) * self.radius + w * t,
                );
            }
        }
        let idx = |i: usize, j: usize| i * theta_res + (j % theta_res);
        let mut faces = Vec::with_capacity(2 * (rings - 1) * theta_res);
        for i in 0..rings - 1 {
            for j in 0..theta_res {
                faces.push([idx(i, j), idx(i, j + 1), idx(i + 1, j + 1)]);
                faces.push([idx(i, j), idx(i + 1, j + 1), idx(i + 1, j)]);
            }
        }
        let local = TriMesh::new(vertices, faces).subdivide_linear(subdivisions);
        let mut cloud = PointCloud::default();
        for p in &local.vertices {
            let t = p.dot(&w);
            let radial = p - w * t;
            let n = radial.normalize();
            cloud.points.push(self.start + w * t + n * self.radius);
            cloud.normals.push(n);
        }
        cloud
    }
}

/// Anything a sample can be trimmed against.
#[derive(Clone, Copy, Debug)]
pub enum Solid {
    Sphere(Sphere),
    Cylinder(Cylinder),
}

impl Solid {
    #[inline]
    pub fn contains_strict(&self, p: &Vector3<f64>, margin: f64) -> bool {
        match self {
            Solid::Sphere(s) => s.contains_strict(p, margin),
            Solid::Cylinder(c) => c.contains_strict(p, margin),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_is_orthonormal() {
        for d in [
            Vector3::new(1.0, 0.7, 0.0),
            Vector3::new(0.0, 0.0, -2.0),
            Vector3::new(0.3, -5.0, 0.1),
        ] {
            let (u, v, w) = frame(&d);
            assert!(u.dot(&v).abs() < 1e-12);
            assert!(u.dot(&w).abs() < 1e-12);
            assert!((u.cross(&v) - w).norm() < 1e-12);
            assert!((w - d.normalize()).norm() < 1e-12);
        }
    }

    #[test]
    fn sphere_patch_lies_on_sphere() {
        let s = Sphere {
            center: Vector3::new(1.0, 2.0, 3.0),
            radius: 0.5,
        };
        let cloud = s.patch(&Vector3::new(1.0, 1.0, 0.0), 12, 1);
        assert!(!cloud.is_empty());
        for (p, n) in cloud.points.iter().zip(&cloud.normals) {
            assert!(((p - s.center).norm() - 0.5).abs() < 1e-12);
            assert!((p - s.center - n * 0.5).norm() < 1e-12);
        }
    }

    #[test]
    fn shell_lies_on_cylinder_between_ends() {
        let c = Cylinder {
            start: Vector3::zeros(),
            end: Vector3::new(0.0, 2.0, 0.0),
            radius: 0.5,
        };
        let cloud = c.shell(16, 1);
        for p in &cloud.points {
            assert!((p.xz().norm() - 0.5).abs() < 1e-12);
            assert!(p.y >= -1e-12 && p.y <= 2.0 + 1e-12);
        }
    }

    #[test]
    fn strict_containment_excludes_boundary() {
        let c = Cylinder {
            start: Vector3::zeros(),
            end: Vector3::new(1.0, 0.0, 0.0),
            radius: 0.5,
        };
        assert!(c.contains_strict(&Vector3::new(0.5, 0.1, 0.1), 1e-9));
        assert!(!c.contains_strict(&Vector3::new(0.5, 0.5, 0.0), 1e-9));
        assert!(!c.contains_strict(&Vector3::new(0.0, 0.1, 0.0), 1e-9));
        assert!(!c.contains_strict(&Vector3::new(1.2, 0.0, 0.0), 1e-9));
        let s = Sphere {
            center: Vector3::zeros(),
            radius: 1.0,
        };
        assert!(s.contains_strict(&Vector3::new(0.5, 0.0, 0.0), 1e-9));
        assert!(!s.contains_strict(&Vector3::new(1.0, 0.0, 0.0), 1e-9));
    }
}
