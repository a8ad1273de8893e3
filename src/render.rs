//! SVG overlay output for inspecting refinement results.
//!
//! Thin diagnostic hooks: the initial and the refined polygon are emitted as
//! two styled closed paths over any `io::Write`. File formats beyond that
//! live in the surrounding application.

use std::io::{self, Write};

use crate::curve::{Point, SegmentationCurve};

/// Writes the SVG preamble for an image-sized canvas.
pub fn write_svg_header<W: Write>(out: &mut W, width: usize, height: usize) -> io::Result<()> {
    writeln!(out, r#"<?xml version="1.0" standalone="no"?>"#)?;
    writeln!(
        out,
        r#"<svg width="{width}" height="{height}" viewBox="0 0 {width} {height}" xmlns="http://www.w3.org/2000/svg" version="1.1">"#
    )
}

/// Closes an SVG document started with [`write_svg_header`].
pub fn write_svg_footer<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, "</svg>")
}

/// Draws the initial polygon (red) and the refined polygon (green).
pub fn write_overlay<W: Write>(out: &mut W, curve: &SegmentationCurve) -> io::Result<()> {
    write_closed_path(out, curve.original_vertices(), "red")?;
    write_closed_path(out, curve.vertices(), "#48b300")
}

fn write_closed_path<W: Write>(out: &mut W, vertices: &[Point], stroke: &str) -> io::Result<()> {
    write!(
        out,
        "<path style=\"fill:none;stroke-width:0.55;stroke:{stroke};stroke-linecap:round;\
         opacity:0.75;stroke-linejoin:round;stroke-opacity:1;stroke-miterlimit:4;\
         stroke-dasharray:none;\" d=\""
    )?;
    for (i, p) in vertices.iter().enumerate() {
        let command = if i == 0 { "M" } else { "L" };
        write!(out, "{command} {},{} ", p.x, p.y)?;
    }
    writeln!(out, "Z\" />")
}

#[cfg(test)]
mod tests {
    use super::{write_overlay, write_svg_footer, write_svg_header};
    use crate::curve::{CurveParams, Point, SegmentationCurve};
    use crate::field::RowIntegralField;

    #[test]
    fn overlay_emits_two_closed_paths() {
        let field = RowIntegralField::from_data_term(&[0.0f32; 64], 8, 8)
            .unwrap()
            .into_shared();
        let curve = SegmentationCurve::new(
            field,
            vec![
                Point::new(1.0, 1.0),
                Point::new(5.0, 1.0),
                Point::new(3.0, 5.0),
            ],
            1.0,
            CurveParams::default(),
        )
        .unwrap();

        let mut out = Vec::new();
        write_svg_header(&mut out, 8, 8).unwrap();
        write_overlay(&mut out, &curve).unwrap();
        write_svg_footer(&mut out).unwrap();

        let svg = String::from_utf8(out).unwrap();
        assert_eq!(svg.matches("<path").count(), 2);
        assert_eq!(svg.matches("Z\" />").count(), 2);
        assert!(svg.contains("stroke:red"));
        assert!(svg.contains("stroke:#48b300"));
        assert!(svg.ends_with("</svg>\n"));
    }
}
