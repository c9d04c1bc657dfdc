//! Figure toolkit for the paper: one rendered 3D rod and a handful of
//! statistical plots.
//!
//! Layout
//! - `mesh`: triangle mesh container and the generic operations on it.
//! - `rod`: polyline → noisy closed tube (sampling, reconstruction,
//!   remeshing, displacement).
//! - `render`: top-down software rasteriser writing a PNG.
//! - `bib`: BibTeX reader.
//! - `citations`: citation-count sources and the CSV cache in front of them.
//! - `plots`: scatter / stacked histogram figures in PNG, SVG and PDF.
//!
//! API Policy
//! - Project-internal. There is no stable public API; everything here exists
//!   to regenerate a fixed set of figures.

pub mod bib;
pub mod citations;
pub mod mesh;
pub mod plots;
pub mod render;
pub mod rod;

/// Library version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use mesh::{Aabb, TriMesh, Vec3};

/// Common exports for the CLI and benches.
pub mod prelude {
    pub use crate::bib::{parse_bibtex, read_bibtex, BibEntry};
    pub use crate::citations::{
        load_or_fetch, CitationRecord, CitationSource, Crossref, FetchCfg, OpenCitations,
    };
    pub use crate::mesh::{Aabb, TriMesh, Vec3};
    pub use crate::plots::{PlotCfg, PlotFormat};
    pub use crate::render::{render_png, RenderCfg};
    pub use crate::rod::{build_rod, RodCfg, Waypoints};
}
