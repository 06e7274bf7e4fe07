// Vector document model and SVG serialization

use std::fmt::Write;

use crate::geometry::Point;

/// One simplified outline in output units.
#[derive(Debug, Clone, PartialEq)]
pub struct ContourPolygon {
    pub points: Vec<Point>,
}

impl ContourPolygon {
    /// SVG path data: `M x y` followed by ` L x y` for every further point,
    /// coordinates at fixed 3-decimal precision.
    pub fn path_data(&self) -> String {
        let mut buf = String::new();
        for (i, p) in self.points.iter().enumerate() {
            let cmd = if i == 0 { "M" } else { " L" };
            // NOTE: `String` への `fmt::Write` は失敗しないため `.unwrap()` は安全。
            write!(buf, "{cmd}{} {}", fixed3(p.x), fixed3(p.y)).unwrap();
        }
        buf
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputUnit {
    Millimeter,
    Pixel,
}

impl OutputUnit {
    pub fn suffix(&self) -> &'static str {
        match self {
            OutputUnit::Millimeter => "mm",
            OutputUnit::Pixel => "px",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewBox {
    pub min_x: f64,
    pub min_y: f64,
    pub width: f64,
    pub height: f64,
}

/// Final, immutable vector tracing.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorDocument {
    paths: Vec<ContourPolygon>,
    view_box: ViewBox,
    unit: OutputUnit,
    stroke_width: f64,
}

impl VectorDocument {
    pub(crate) fn new(
        paths: Vec<ContourPolygon>,
        view_box: ViewBox,
        unit: OutputUnit,
        stroke_width: f64,
    ) -> Self {
        Self {
            paths,
            view_box,
            unit,
            stroke_width,
        }
    }

    pub fn paths(&self) -> &[ContourPolygon] {
        &self.paths
    }

    pub fn view_box(&self) -> ViewBox {
        self.view_box
    }

    pub fn unit(&self) -> OutputUnit {
        self.unit
    }

    /// `true` when coordinates are in millimetres.
    pub fn is_scaled(&self) -> bool {
        self.unit == OutputUnit::Millimeter
    }

    pub fn stroke_width(&self) -> f64 {
        self.stroke_width
    }

    /// Declared output width, e.g. `"210mm"` or `"640px"`.
    pub fn width_attr(&self) -> String {
        format!("{}{}", trimmed3(self.view_box.width), self.unit.suffix())
    }

    /// Declared output height, e.g. `"297mm"` or `"480px"`.
    pub fn height_attr(&self) -> String {
        format!("{}{}", trimmed3(self.view_box.height), self.unit.suffix())
    }

    pub fn view_box_attr(&self) -> String {
        let vb = &self.view_box;
        format!(
            "{} {} {} {}",
            trimmed3(vb.min_x),
            trimmed3(vb.min_y),
            trimmed3(vb.width),
            trimmed3(vb.height)
        )
    }

    /// Self-contained SVG markup: explicit unit-suffixed `width`/`height`,
    /// `viewBox`, one `<path>` per contour.
    pub fn to_svg(&self) -> String {
        let mut buf = String::new();
        buf.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        writeln!(
            buf,
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{}\" height=\"{}\" viewBox=\"{}\">",
            self.width_attr(),
            self.height_attr(),
            self.view_box_attr()
        )
        .unwrap();
        let stroke = trimmed3(self.stroke_width);
        for path in &self.paths {
            writeln!(
                buf,
                "  <path d=\"{}\" fill=\"none\" stroke=\"black\" stroke-width=\"{stroke}\"/>",
                path.path_data()
            )
            .unwrap();
        }
        buf.push_str("</svg>\n");
        buf
    }
}

/// Fixed 3-decimal formatting with `-0.000` normalized to `0.000`.
fn fixed3(v: f64) -> String {
    let s = format!("{v:.3}");
    if s == "-0.000" { "0.000".to_string() } else { s }
}

/// `v` を小数3桁でフォーマットし、末尾ゼロと小数点を除去する。
fn trimmed3(v: f64) -> String {
    let s = format!("{v:.3}");
    let trimmed = s.trim_end_matches('0').trim_end_matches('.');
    if trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}
