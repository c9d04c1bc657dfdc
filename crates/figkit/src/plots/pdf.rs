//! `plotters` drawing backend that writes a single-page vector PDF.
//!
//! One backend pixel is one PDF point; the page is `size` points with the
//! origin flipped to the top-left corner. Text is set in the standard
//! Helvetica font, so no font files are needed and text extents are
//! estimated from the font size alone. Alpha is flattened by blending
//! against white.

use std::io;
use std::path::{Path, PathBuf};

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use plotters_backend::text_anchor::{HPos, VPos};
use plotters_backend::{
    BackendColor, BackendCoord, BackendStyle, BackendTextStyle, DrawingBackend, DrawingErrorKind,
    FontTransform,
};

/// Mean Helvetica advance width as a fraction of the font size.
const CHAR_WIDTH: f64 = 0.5;
/// Bézier control distance for a quarter circle.
const KAPPA: f64 = 0.552_284_75;

pub struct PdfBackend {
    path: PathBuf,
    size: (u32, u32),
    ops: Vec<Operation>,
}

impl PdfBackend {
    pub fn new<P: AsRef<Path>>(path: P, size: (u32, u32)) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            size,
            ops: Vec::new(),
        }
    }

    fn y(&self, y: f64) -> f64 {
        self.size.1 as f64 - y
    }

    fn push(&mut self, op: &str, operands: &[f64]) {
        self.ops.push(Operation::new(
            op,
            operands.iter().map(|&v| real(v)).collect(),
        ));
    }

    fn set_stroke<S: BackendStyle>(&mut self, style: &S) {
        let [r, g, b] = flatten(style.color());
        self.push("RG", &[r, g, b]);
        self.push("w", &[style.stroke_width().max(1) as f64]);
    }

    fn set_fill(&mut self, color: BackendColor) {
        let [r, g, b] = flatten(color);
        self.push("rg", &[r, g, b]);
    }

    fn move_to(&mut self, (x, y): BackendCoord) {
        let y = self.y(y as f64);
        self.push("m", &[x as f64, y]);
    }

    fn line_to(&mut self, (x, y): BackendCoord) {
        let y = self.y(y as f64);
        self.push("l", &[x as f64, y]);
    }

    /// Encode the page accumulated so far.
    pub fn to_bytes(&self) -> io::Result<Vec<u8>> {
        let (w, h) = self.size;
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let content = Content {
            operations: self.ops.clone(),
        };
        let encoded = content.encode().map_err(pdf_err)?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), Object::Integer(w as i64), Object::Integer(h as i64)],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.compress();
        let mut out = Vec::new();
        doc.save_to(&mut out).map_err(pdf_err)?;
        Ok(out)
    }
}

fn pdf_err<E: std::fmt::Display>(e: E) -> io::Error {
    io::Error::new(io::ErrorKind::Other, format!("pdf encoding: {e}"))
}

fn real(v: f64) -> Object {
    Object::Real(v as f32)
}

/// RGB in [0, 1] after compositing onto white.
fn flatten(c: BackendColor) -> [f64; 3] {
    let a = c.alpha.clamp(0.0, 1.0);
    let ch = |v: u8| (a * v as f64 + (1.0 - a) * 255.0) / 255.0;
    [ch(c.rgb.0), ch(c.rgb.1), ch(c.rgb.2)]
}

/// Helvetica only covers Latin-1; anything else becomes `?`.
fn latin1(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| if (c as u32) < 256 { c as u8 } else { b'?' })
        .collect()
}

impl DrawingBackend for PdfBackend {
    type ErrorType = io::Error;

    fn get_size(&self) -> (u32, u32) {
        self.size
    }

    fn ensure_prepared(&mut self) -> Result<(), DrawingErrorKind<io::Error>> {
        Ok(())
    }

    fn present(&mut self) -> Result<(), DrawingErrorKind<io::Error>> {
        let bytes = self.to_bytes().map_err(DrawingErrorKind::DrawingError)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(DrawingErrorKind::DrawingError)?;
            }
        }
        std::fs::write(&self.path, bytes).map_err(DrawingErrorKind::DrawingError)
    }

    fn draw_pixel(
        &mut self,
        (x, y): BackendCoord,
        color: BackendColor,
    ) -> Result<(), DrawingErrorKind<io::Error>> {
        if color.alpha <= 0.0 {
            return Ok(());
        }
        self.set_fill(color);
        let bottom = self.y(y as f64 + 1.0);
        self.push("re", &[x as f64, bottom, 1.0, 1.0]);
        self.push("f", &[]);
        Ok(())
    }

    fn draw_line<S: BackendStyle>(
        &mut self,
        from: BackendCoord,
        to: BackendCoord,
        style: &S,
    ) -> Result<(), DrawingErrorKind<io::Error>> {
        if style.color().alpha <= 0.0 {
            return Ok(());
        }
        self.set_stroke(style);
        self.move_to(from);
        self.line_to(to);
        self.push("S", &[]);
        Ok(())
    }

    fn draw_rect<S: BackendStyle>(
        &mut self,
        upper_left: BackendCoord,
        bottom_right: BackendCoord,
        style: &S,
        fill: bool,
    ) -> Result<(), DrawingErrorKind<io::Error>> {
        if style.color().alpha <= 0.0 {
            return Ok(());
        }
        let (x0, y0) = (upper_left.0 as f64, upper_left.1 as f64);
        let (x1, y1) = (bottom_right.0 as f64, bottom_right.1 as f64);
        let bottom = self.y(y1.max(y0));
        let rect = [x0.min(x1), bottom, (x1 - x0).abs(), (y1 - y0).abs()];
        if fill {
            self.set_fill(style.color());
            self.push("re", &rect);
            self.push("f", &[]);
        } else {
            self.set_stroke(style);
            self.push("re", &rect);
            self.push("S", &[]);
        }
        Ok(())
    }

    fn draw_path<S: BackendStyle, I: IntoIterator<Item = BackendCoord>>(
        &mut self,
        path: I,
        style: &S,
    ) -> Result<(), DrawingErrorKind<io::Error>> {
        if style.color().alpha <= 0.0 {
            return Ok(());
        }
        let mut points = path.into_iter();
        let Some(first) = points.next() else {
            return Ok(());
        };
        self.set_stroke(style);
        self.move_to(first);
        for p in points {
            self.line_to(p);
        }
        self.push("S", &[]);
        Ok(())
    }

    fn fill_polygon<S: BackendStyle, I: IntoIterator<Item = BackendCoord>>(
        &mut self,
        vert: I,
        style: &S,
    ) -> Result<(), DrawingErrorKind<io::Error>> {
        if style.color().alpha <= 0.0 {
            return Ok(());
        }
        let mut points = vert.into_iter();
        let Some(first) = points.next() else {
            return Ok(());
        };
        self.set_fill(style.color());
        self.move_to(first);
        for p in points {
            self.line_to(p);
        }
        self.push("h", &[]);
        self.push("f", &[]);
        Ok(())
    }

    fn draw_circle<S: BackendStyle>(
        &mut self,
        (cx, cy): BackendCoord,
        radius: u32,
        style: &S,
        fill: bool,
    ) -> Result<(), DrawingErrorKind<io::Error>> {
        if style.color().alpha <= 0.0 {
            return Ok(());
        }
        let (x, y, r) = (cx as f64, self.y(cy as f64), radius as f64);
        let k = KAPPA * r;
        if fill {
            self.set_fill(style.color());
        } else {
            self.set_stroke(style);
        }
        self.push("m", &[x + r, y]);
        self.push("c", &[x + r, y + k, x + k, y + r, x, y + r]);
        self.push("c", &[x - k, y + r, x - r, y + k, x - r, y]);
        self.push("c", &[x - r, y - k, x - k, y - r, x, y - r]);
        self.push("c", &[x + k, y - r, x + r, y - k, x + r, y]);
        self.push(if fill { "f" } else { "S" }, &[]);
        Ok(())
    }

    fn draw_text<TStyle: BackendTextStyle>(
        &mut self,
        text: &str,
        style: &TStyle,
        (x, y): BackendCoord,
    ) -> Result<(), DrawingErrorKind<io::Error>> {
        let color = style.color();
        if color.alpha <= 0.0 || text.is_empty() {
            return Ok(());
        }
        let size = style.size();
        let width = CHAR_WIDTH * size * text.chars().count() as f64;
        let anchor = style.anchor();
        let dx = match anchor.h_pos {
            HPos::Left => 0.0,
            HPos::Center => -width / 2.0,
            HPos::Right => -width,
        };
        // Screen space, y down: offset from the anchor to the baseline start.
        let dy = match anchor.v_pos {
            VPos::Top => 0.75 * size,
            VPos::Center => 0.35 * size,
            VPos::Bottom => 0.0,
        };
        let theta: f64 = match style.transform() {
            FontTransform::None => 0.0,
            FontTransform::Rotate90 => 90.0,
            FontTransform::Rotate180 => 180.0,
            FontTransform::Rotate270 => 270.0,
        };
        let (sin, cos) = theta.to_radians().sin_cos();
        let sx = x as f64 + dx * cos - dy * sin;
        let sy = y as f64 + dx * sin + dy * cos;
        let py = self.y(sy);

        self.set_fill(color);
        self.ops.push(Operation::new("BT", vec![]));
        self.ops.push(Operation::new(
            "Tf",
            vec![Object::Name(b"F1".to_vec()), real(size)],
        ));
        self.push("Tm", &[cos, -sin, sin, cos, sx, py]);
        self.ops.push(Operation::new(
            "Tj",
            vec![Object::string_literal(latin1(text))],
        ));
        self.ops.push(Operation::new("ET", vec![]));
        Ok(())
    }

    fn estimate_text_size<TStyle: BackendTextStyle>(
        &self,
        text: &str,
        style: &TStyle,
    ) -> Result<(u32, u32), DrawingErrorKind<io::Error>> {
        let size = style.size();
        let w = CHAR_WIDTH * size * text.chars().count() as f64;
        Ok((w.ceil() as u32, size.ceil() as u32))
    }
}
