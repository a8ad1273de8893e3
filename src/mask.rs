//! Rasterization of a closed polygon into a labeled pixel mask.
//!
//! Even-odd scanline fill sampled at pixel centers; foreground pixels are
//! labeled 255. Saving the mask as a PNG is available behind the `image-io`
//! feature.

use crate::curve::Point;

/// Foreground label in a rasterized mask.
pub const FOREGROUND: u8 = 255;

/// Rasterizes a closed polygon into a `width * height` row-major mask.
///
/// A pixel is foreground when its center lies inside the polygon under the
/// even-odd rule; the traversal orientation does not matter. Degenerate
/// polygons (fewer than three vertices) yield an empty mask.
pub fn polygon_mask(vertices: &[Point], width: usize, height: usize) -> Vec<u8> {
    let mut mask = vec![0u8; width * height];
    if vertices.len() < 3 {
        return mask;
    }

    let mut crossings: Vec<f64> = Vec::new();
    for y in 0..height {
        let sample_y = y as f64 + 0.5;

        crossings.clear();
        for i in 0..vertices.len() {
            let a = vertices[i];
            let b = vertices[(i + 1) % vertices.len()];
            if (a.y > sample_y) != (b.y > sample_y) {
                crossings.push(a.x + (sample_y - a.y) * (b.x - a.x) / (b.y - a.y));
            }
        }
        crossings.sort_by(|p, q| p.partial_cmp(q).expect("crossings are finite"));

        let row = y * width;
        for span in crossings.chunks_exact(2) {
            // Pixel centers x + 0.5 in [span[0], span[1]).
            let lo = (span[0] - 0.5).ceil().max(0.0) as usize;
            let hi = (span[1] - 0.5).ceil().min(width as f64) as usize;
            for value in &mut mask[row + lo.min(width)..row + hi] {
                *value = FOREGROUND;
            }
        }
    }
    mask
}

/// Saves a rasterized polygon mask as a grayscale PNG.
#[cfg(feature = "image-io")]
pub fn save_mask_png<P: AsRef<std::path::Path>>(
    path: P,
    vertices: &[Point],
    width: usize,
    height: usize,
) -> crate::util::SegCurveResult<()> {
    use crate::util::SegCurveError;

    let mask = polygon_mask(vertices, width, height);
    let img = image::GrayImage::from_raw(width as u32, height as u32, mask).ok_or(
        SegCurveError::InvalidDimensions { width, height },
    )?;
    img.save(path).map_err(|err| SegCurveError::ImageIo {
        reason: err.to_string(),
    })
}
