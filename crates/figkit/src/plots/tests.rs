use tempfile::tempdir;

use super::*;
use crate::citations::CitationRecord;

fn records() -> Vec<CitationRecord> {
    vec![
        CitationRecord { year: 1985, count1: Some(900), count2: Some(1100) },
        CitationRecord { year: 1987, count1: Some(4000), count2: None },
        CitationRecord { year: 2004, count1: Some(150), count2: Some(210) },
    ]
}

fn pdf_bytes(figure: &Figure) -> Vec<u8> {
    let dir = tempdir().unwrap();
    let stem = dir.path().join("fig");
    let written = export(figure, &stem, &PlotCfg::default(), &[PlotFormat::Pdf]).unwrap();
    assert_eq!(written, vec![dir.path().join("fig.pdf")]);
    std::fs::read(&written[0]).unwrap()
}

#[test]
fn synthetic_studies_follow_their_shapes() {
    let Figure::Scatter(s) = studies_scatter(0) else {
        panic!("expected scatter");
    };
    assert_eq!(s.points.len(), figures::STUDY_COUNT);
    assert!(s.points.iter().all(|&(x, y)| (0.0..=8.0).contains(&x) && (0.0..=1.0).contains(&y)));

    let Figure::Histogram(h) = studies_over_time(0) else {
        panic!("expected histogram");
    };
    assert_eq!(h.layers.len(), 1);
    assert!(h.layers[0].values.iter().all(|y| (1995.0..=2025.0).contains(y)));
}

#[test]
fn same_seed_same_pdf() {
    let a = pdf_bytes(&studies_scatter(7));
    let b = pdf_bytes(&studies_scatter(7));
    assert!(a.starts_with(b"%PDF"));
    assert_eq!(a, b);
    assert_ne!(a, pdf_bytes(&studies_scatter(8)));
}

#[test]
fn histogram_pdf_is_deterministic() {
    let a = pdf_bytes(&studies_over_time(3));
    assert_eq!(a, pdf_bytes(&studies_over_time(3)));
    let doc = lopdf::Document::load_mem(&a).unwrap();
    assert_eq!(doc.get_pages().len(), 1);
}

#[test]
fn citation_figures_skip_missing_counts() {
    let Figure::Scatter(s) = citations_scatter(&records(), "A", "B") else {
        panic!("expected scatter");
    };
    assert_eq!(s.points, vec![(900.0, 1100.0), (150.0, 210.0)]);

    let Figure::Histogram(h) = citations_over_time(&records(), "A", "B") else {
        panic!("expected histogram");
    };
    assert_eq!(h.layers[1].weights.as_deref(), Some(&[1100.0, 0.0, 210.0][..]));
    let bytes = pdf_bytes(&Figure::Histogram(h));
    assert!(bytes.starts_with(b"%PDF"));
}

#[test]
fn empty_inputs_draw_empty_axes() {
    let no_layers = Figure::Histogram(StackedHistogram {
        x_label: "x".into(),
        y_label: "y".into(),
        layers: vec![],
    });
    assert!(pdf_bytes(&no_layers).starts_with(b"%PDF"));
    assert!(pdf_bytes(&citations_over_time(&[], "A", "B")).starts_with(b"%PDF"));
    assert!(pdf_bytes(&citations_scatter(&[], "A", "B")).starts_with(b"%PDF"));

    let non_finite = Figure::Histogram(StackedHistogram {
        x_label: "x".into(),
        y_label: "y".into(),
        layers: vec![HistLayer {
            label: String::new(),
            values: vec![f64::NAN, f64::INFINITY],
            weights: None,
        }],
    });
    assert!(pdf_bytes(&non_finite).starts_with(b"%PDF"));
}

#[test]
fn every_format_is_written() {
    let dir = tempdir().unwrap();
    let stem = dir.path().join("over-time");
    let figure = studies_over_time(0);
    let written = export(&figure, &stem, &PlotCfg::default(), &PlotFormat::ALL).unwrap();
    let expected: Vec<_> = ["png", "pdf", "svg"]
        .iter()
        .map(|ext| dir.path().join(format!("over-time.{ext}")))
        .collect();
    assert_eq!(written, expected);
    for path in &written {
        assert!(std::fs::metadata(path).unwrap().len() > 0, "{path:?} is empty");
    }
    let png = std::fs::read(&written[0]).unwrap();
    assert!(png.starts_with(b"\x89PNG"));
    let svg = std::fs::read_to_string(&written[2]).unwrap();
    assert!(svg.contains("<svg"));

    let again = tempdir().unwrap();
    let rewritten = export(
        &figure,
        &again.path().join("over-time"),
        &PlotCfg::default(),
        &[PlotFormat::Svg],
    )
    .unwrap();
    assert_eq!(std::fs::read_to_string(&rewritten[0]).unwrap(), svg);
}

#[test]
fn dotted_stems_keep_their_name() {
    let dir = tempdir().unwrap();
    let written = export(
        &studies_scatter(0),
        &dir.path().join("fig.v2"),
        &PlotCfg::default(),
        &[PlotFormat::Pdf, PlotFormat::Svg],
    )
    .unwrap();
    assert_eq!(
        written,
        vec![dir.path().join("fig.v2.pdf"), dir.path().join("fig.v2.svg")]
    );
    assert!(written.iter().all(|p| p.is_file()));
}

#[test]
fn format_extensions() {
    let exts: Vec<_> = PlotFormat::ALL.iter().map(|f| f.extension()).collect();
    assert_eq!(exts, vec!["png", "pdf", "svg"]);
}
