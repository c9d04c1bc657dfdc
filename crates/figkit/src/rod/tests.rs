use super::*;
use nalgebra::Vector3;

fn coarse_cfg() -> RodCfg {
    RodCfg {
        radius: 0.5,
        sampling: SamplingCfg {
            theta_resolution: 16,
            subdivisions: 1,
        },
        reconstruct: ReconstructCfg {
            spacing: Some(0.08),
            band_cells: 3,
        },
        remesh: RemeshCfg {
            subdivisions: 0,
            clusters: 300,
            iso_try: 5,
        },
        noise: vec![NoiseLayer::coarse(), NoiseLayer::fine()],
    }
}

fn short_path() -> Waypoints {
    Waypoints::new(vec![
        Vector3::new(0.0, 0.0, 0.0),
        Vector3::new(1.0, 0.7, 0.0),
        Vector3::new(2.0, 2.1, 0.0),
    ])
    .unwrap()
}

#[test]
fn waypoints_validation() {
    assert!(Waypoints::new(vec![Vector3::zeros()]).is_err());
    assert!(Waypoints::new(vec![Vector3::zeros(), Vector3::zeros()]).is_err());
    assert!(Waypoints::new(vec![Vector3::zeros(), Vector3::new(f64::NAN, 0.0, 0.0)]).is_err());
    assert_eq!(Waypoints::paper().len(), 6);
}

#[test]
fn bad_radius_is_rejected() {
    let mut cfg = coarse_cfg();
    cfg.radius = 0.0;
    let err = build_rod(&short_path(), &cfg).unwrap_err();
    assert!(matches!(err, RodError::InvalidRadius { .. }));
    cfg.radius = f64::INFINITY;
    assert!(build_rod(&short_path(), &cfg).is_err());
}

#[test]
fn samples_lie_on_the_union_boundary() {
    let path = Waypoints::paper();
    let cloud = sample_tube(&path, 0.5, &SamplingCfg::default());
    assert!(!cloud.is_empty());
    assert_eq!(cloud.points.len(), cloud.normals.len());
    for p in &cloud.points {
        let d = path.distance_to_path(p);
        assert!((d - 0.5).abs() < 1e-5, "sample at distance {d}");
    }
}

#[test]
fn trimming_removes_buried_samples() {
    let path = short_path();
    let cfg = SamplingCfg {
        theta_resolution: 12,
        subdivisions: 0,
    };
    let trimmed = sample_tube(&path, 0.5, &cfg);
    let untrimmed: usize = path
        .points()
        .iter()
        .map(|&c| Sphere { center: c, radius: 0.5 }.patch(&Vector3::x(), 12, 0).len())
        .sum::<usize>()
        + path
            .segments()
            .map(|(start, end)| {
                Cylinder {
                    start,
                    end,
                    radius: 0.5,
                }
                .shell(12, 0)
                .len()
            })
            .sum::<usize>();
    assert!(trimmed.len() < untrimmed);
}

#[test]
fn rod_is_nonempty_and_hugs_the_path() {
    let cfg = coarse_cfg();
    let path = short_path();
    let rod = build_rod(&path, &cfg).unwrap();
    assert!(!rod.is_empty());
    let outer = cfg.radius + cfg.max_noise_displacement() + 2.0 * cfg.grid_spacing();
    for p in &rod.vertices {
        let d = path.distance_to_path(p);
        assert!(d <= outer, "vertex {p:?} at distance {d} > {outer}");
        assert!(d > 0.5 * cfg.radius, "vertex {p:?} collapsed to {d}");
    }
}

#[test]
fn rod_is_deterministic() {
    let cfg = coarse_cfg();
    let a = build_rod(&short_path(), &cfg).unwrap();
    let b = build_rod(&short_path(), &cfg).unwrap();
    assert_eq!(a.faces, b.faces);
    assert_eq!(a.vertices, b.vertices);
}
