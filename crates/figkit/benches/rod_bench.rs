//! Criterion benches for the rod pipeline stages and the renderer.
//!
//! - sampling: sphere caps + cylinder shells with trimming.
//! - reconstruct: narrow-band distance + surface nets.
//! - remesh: clustering at two budgets.
//! - noise: one displacement layer.
//! - render: top-down rasterisation of the finished rod.
//!
//! Stages run on the paper path with a coarser grid than the figure uses so
//! one iteration stays well under a second.

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use figkit::render::{render_mesh, RenderCfg};
use figkit::rod::{
    apply_noise_layer, build_rod, cluster_remesh, reconstruct_surface, sample_tube, NoiseLayer,
    ReconstructCfg, RemeshCfg, RodCfg, SamplingCfg, Waypoints,
};

fn bench_cfg() -> RodCfg {
    RodCfg {
        sampling: SamplingCfg {
            theta_resolution: 20,
            subdivisions: 1,
        },
        reconstruct: ReconstructCfg {
            spacing: Some(0.05),
            band_cells: 3,
        },
        ..RodCfg::default()
    }
}

fn bench_rod(c: &mut Criterion) {
    let mut group = c.benchmark_group("rod");
    group.sample_size(10);
    let path = Waypoints::paper();
    let cfg = bench_cfg();

    group.bench_function(BenchmarkId::new("sample_tube", "theta20"), |b| {
        b.iter(|| sample_tube(&path, cfg.radius, &cfg.sampling))
    });

    let cloud = sample_tube(&path, cfg.radius, &cfg.sampling);
    group.bench_function(BenchmarkId::new("reconstruct_surface", "h0.05"), |b| {
        b.iter(|| reconstruct_surface(&cloud, cfg.grid_spacing(), cfg.reconstruct.band_cells).unwrap())
    });

    let surface = reconstruct_surface(&cloud, cfg.grid_spacing(), cfg.reconstruct.band_cells).unwrap();
    for clusters in [500usize, 2000] {
        let remesh = RemeshCfg {
            clusters,
            iso_try: 5,
            ..RemeshCfg::default()
        };
        group.bench_function(BenchmarkId::new("cluster_remesh", clusters), |b| {
            b.iter(|| cluster_remesh(&surface, &remesh).unwrap())
        });
    }

    let remeshed = cluster_remesh(&surface, &RemeshCfg::default()).unwrap();
    group.bench_function(BenchmarkId::new("noise_layer", "coarse"), |b| {
        b.iter_batched(
            || remeshed.clone(),
            |mut mesh| apply_noise_layer(&mut mesh, &NoiseLayer::coarse()),
            BatchSize::LargeInput,
        )
    });

    let rod = build_rod(&path, &cfg).unwrap();
    let render = RenderCfg {
        width: 800,
        height: 600,
        ..RenderCfg::default()
    };
    group.bench_function(BenchmarkId::new("render_mesh", "800x600"), |b| {
        b.iter(|| render_mesh(&rod, &render).unwrap())
    });

    group.finish();
}

criterion_group!(benches, bench_rod);
criterion_main!(benches);
