use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use figkit::citations::{load_or_fetch, CitationSource, Crossref, FetchCfg, OpenCitations};
use figkit::plots::{self, Figure, PlotCfg, PlotFormat};
use figkit::render::{render_png, RenderCfg};
use figkit::rod::{build_rod, RodCfg, Waypoints};
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing_subscriber::fmt::SubscriberBuilder;

mod provenance;

use provenance::{write_sidecar, Payload};

#[derive(Parser)]
#[command(name = "cli")]
#[command(about = "Regenerate the paper's figures; without a subcommand, all of them")]
struct Cmd {
    /// Directory receiving figures and their provenance sidecars
    #[arg(long, global = true, default_value = "figures")]
    out_dir: PathBuf,

    #[command(subcommand)]
    action: Option<Action>,
}

#[derive(Subcommand)]
enum Action {
    /// Build the organic rod mesh and render it top-down to rod.png
    Rod {
        /// Seed of the per-vertex grayscale
        #[arg(long, default_value_t = 0)]
        seed: u64,
        #[arg(long, default_value_t = 1600)]
        width: u32,
        #[arg(long, default_value_t = 1200)]
        height: u32,
    },
    /// Illustrative studies scatter and over-time histogram
    Studies {
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
    /// Citation counts for the bibliography, fetched once and cached
    Citations {
        #[arg(long, default_value = "data/references.bib")]
        bib: PathBuf,
        #[arg(long, default_value = "data/citations.csv")]
        cache: PathBuf,
    },
    /// Every figure with default settings
    All,
    /// Print a small provenance JSON block
    Report,
}

const BIB_PATH: &str = "data/references.bib";
const CACHE_PATH: &str = "data/citations.csv";

fn main() -> Result<()> {
    SubscriberBuilder::default().with_target(false).init();
    let cmd = Cmd::parse();
    let out = cmd.out_dir;
    match cmd.action.unwrap_or(Action::All) {
        Action::Rod {
            seed,
            width,
            height,
        } => rod(&out, seed, width, height),
        Action::Studies { seed } => studies(&out, seed),
        Action::Citations { bib, cache } => citations(&out, &bib, &cache),
        Action::All => {
            let render = RenderCfg::default();
            rod(&out, render.seed, render.width, render.height)?;
            studies(&out, 0)?;
            citations(&out, Path::new(BIB_PATH), Path::new(CACHE_PATH))
        }
        Action::Report => report(),
    }
}

fn rod(out: &Path, seed: u64, width: u32, height: u32) -> Result<()> {
    let waypoints = Waypoints::paper();
    let rod_cfg = RodCfg::default();
    tracing::info!(waypoints = waypoints.len(), radius = rod_cfg.radius, "building rod");
    let rod = build_rod(&waypoints, &rod_cfg).context("building rod mesh")?;

    let render_cfg = RenderCfg {
        seed,
        width,
        height,
        ..RenderCfg::default()
    };
    let path = out.join("rod.png");
    render_png(&rod, &render_cfg, &path)
        .with_context(|| format!("rendering {}", path.display()))?;
    write_sidecar(
        &[&path],
        Payload::new(json!({
            "waypoints": waypoints.points().iter().map(|p| [p.x, p.y, p.z]).collect::<Vec<_>>(),
            "rod": rod_cfg,
            "render": render_cfg,
            "vertices": rod.vertices.len(),
            "faces": rod.faces.len(),
        })),
    )?;
    Ok(())
}

fn studies(out: &Path, seed: u64) -> Result<()> {
    let cfg = PlotCfg::default();
    for (name, figure) in [
        ("studies-scatterplots", plots::studies_scatter(seed)),
        ("studies-over-time", plots::studies_over_time(seed)),
    ] {
        emit(out, name, &figure, &cfg, json!({ "seed": seed, "plot": cfg }), None)?;
    }
    Ok(())
}

fn citations(out: &Path, bib: &Path, cache: &Path) -> Result<()> {
    let entries = figkit::bib::read_bibtex(bib)
        .with_context(|| format!("reading bibliography {}", bib.display()))?;
    let fetch = FetchCfg::default();
    let first = OpenCitations::new(&fetch)?;
    let second = Crossref::new(&fetch)?;
    let records = load_or_fetch(cache, &entries, &first, &second)
        .with_context(|| format!("collecting citation counts into {}", cache.display()))?;
    tracing::info!(entries = entries.len(), records = records.len(), "citation counts ready");

    let cfg = PlotCfg::default();
    let (a, b) = (first.name(), second.name());
    for (name, figure) in [
        ("citations-scatter", plots::citations_scatter(&records, a, b)),
        ("citations-over-time", plots::citations_over_time(&records, a, b)),
    ] {
        let params = json!({ "fetch": fetch, "plot": cfg, "records": records.len() });
        emit(out, name, &figure, &cfg, params, Some(&[bib, cache][..]))?;
    }
    Ok(())
}

fn emit(
    out: &Path,
    name: &str,
    figure: &Figure,
    cfg: &PlotCfg,
    params: serde_json::Value,
    inputs: Option<&[&Path]>,
) -> Result<()> {
    let stem = out.join(name);
    let written = plots::export(figure, &stem, cfg, &PlotFormat::ALL)
        .with_context(|| format!("exporting {}", stem.display()))?;
    let mut payload = Payload::new(params);
    for input in inputs.unwrap_or_default() {
        payload = payload.with_input(input);
    }
    write_sidecar(&written, payload)?;
    Ok(())
}

fn report() -> Result<()> {
    let obj = json!({
        "code_rev": provenance::current_git_rev(),
        "figkit_version": figkit::VERSION,
        "params": {
            "rod": RodCfg::default(),
            "render": RenderCfg::default(),
            "plot": PlotCfg::default(),
            "fetch": FetchCfg::default(),
        },
        "outputs": []
    });
    println!("{}", serde_json::to_string_pretty(&obj)?);
    Ok(())
}
