//! PNG rendering of residual maps and mixture density views

use crate::analysis::ellipse::ComponentEllipse;
use crate::analysis::residual::{DiscModel, ResidualMap};
use crate::io::configuration::{DASH_LENGTH, ELLIPSE_SEGMENTS, MAP_PIXELS_PER_BIN};
use crate::io::error::{AnalysisError, Result, invalid_parameter};
use crate::spatial::histogram::Histogram2d;
use image::{Rgb, RgbImage};
use ndarray::Array2;
use std::path::Path;

const NAN_COLOR: Rgb<u8> = Rgb([128, 128, 128]);
const DISC_OUTLINE_COLOR: Rgb<u8> = Rgb([0, 0, 0]);

/// Image whose pixels cover a rectangular velocity window
///
/// Columns run along the first array axis (`v_R`), rows along the second
/// (`v_phi`) with larger values at the top.
struct Canvas {
    image: RgbImage,
    x_range: (f64, f64),
    y_range: (f64, f64),
}

impl Canvas {
    fn from_cells(
        cells: &Array2<f64>,
        x_edges: &[f64],
        y_edges: &[f64],
        color: impl Fn(f64) -> Rgb<u8>,
    ) -> Result<Self> {
        let (Some(&x0), Some(&x1), Some(&y0), Some(&y1)) =
            (x_edges.first(), x_edges.last(), y_edges.first(), y_edges.last())
        else {
            return Err(invalid_parameter("edges", &"[]", &"bin edges must not be empty"));
        };
        let (nx, ny) = cells.dim();
        if nx == 0 || ny == 0 {
            return Err(invalid_parameter(
                "cells",
                &format!("{nx}x{ny}"),
                &"nothing to render",
            ));
        }

        let width = nx as u32 * MAP_PIXELS_PER_BIN;
        let height = ny as u32 * MAP_PIXELS_PER_BIN;
        let image = RgbImage::from_fn(width, height, |px, py| {
            let i = (px / MAP_PIXELS_PER_BIN) as usize;
            let j = ny - 1 - (py / MAP_PIXELS_PER_BIN) as usize;
            cells.get([i, j]).copied().map_or(NAN_COLOR, &color)
        });

        Ok(Self {
            image,
            x_range: (x0, x1),
            y_range: (y0, y1),
        })
    }

    fn pixel(&self, point: [f64; 2]) -> Option<(u32, u32)> {
        let u = (point[0] - self.x_range.0) / (self.x_range.1 - self.x_range.0);
        let v = (self.y_range.1 - point[1]) / (self.y_range.1 - self.y_range.0);
        if !((0.0..1.0).contains(&u) && (0.0..1.0).contains(&v)) {
            return None;
        }
        Some((
            (u * f64::from(self.image.width())) as u32,
            (v * f64::from(self.image.height())) as u32,
        ))
    }

    // Points outside the window are clipped
    fn draw_outline(&mut self, ellipse: &ComponentEllipse, color: Rgb<u8>, dashed: bool) {
        for (i, point) in ellipse.outline(ELLIPSE_SEGMENTS).into_iter().enumerate() {
            if dashed && (i / DASH_LENGTH) % 2 == 1 {
                continue;
            }
            if let Some((x, y)) = self.pixel(point) {
                self.image.put_pixel(x, y, color);
            }
        }
    }

    fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| AnalysisError::FileSystem {
                path: parent.to_path_buf(),
                operation: "create directory",
                source: e,
            })?;
        }

        self.image
            .save(path)
            .map_err(|e| AnalysisError::ImageExport {
                path: path.to_path_buf(),
                source: e,
            })
    }
}

fn channel(value: f64) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Blue for −1, white for 0, red for +1; NaN maps to grey
fn diverging(value: f64) -> Rgb<u8> {
    if value.is_nan() {
        return NAN_COLOR;
    }
    let v = value.clamp(-1.0, 1.0);
    let fade = channel(1.0 - v.abs());
    if v < 0.0 {
        Rgb([fade, fade, 255])
    } else {
        Rgb([255, fade, fade])
    }
}

/// Render a residual map with the disc selection ellipse dashed on top
///
/// # Errors
///
/// Returns an error if the map is empty, the parent directory cannot be
/// created, or the image cannot be saved
pub fn export_residual_map(map: &ResidualMap, disc: &DiscModel, path: &Path) -> Result<()> {
    let mut canvas = Canvas::from_cells(&map.values, &map.x_edges, &map.y_edges, diverging)?;

    let (half_width, half_height) = disc.half_widths();
    let (cx, cy) = disc.center();
    let outline = ComponentEllipse {
        center: [cx, cy],
        width: 2.0 * half_width,
        height: 2.0 * half_height,
        angle_deg: 0.0,
        weight_percent: 100.0,
    };
    canvas.draw_outline(&outline, DISC_OUTLINE_COLOR, true);

    canvas.save(path)?;
    log::info!("Saved residual map to {}", path.display());
    Ok(())
}

/// Render a greyscale density (dark is dense) with one ellipse per component
///
/// # Errors
///
/// Returns an error if there are fewer colours than ellipses, the histogram
/// is empty, or the image cannot be saved
pub fn export_gmm_density(
    histogram: &Histogram2d,
    ellipses: &[ComponentEllipse],
    colors: &[[u8; 3]],
    path: &Path,
) -> Result<()> {
    if colors.len() < ellipses.len() {
        return Err(invalid_parameter(
            "colors",
            &colors.len(),
            &format!("need one colour per ellipse ({})", ellipses.len()),
        ));
    }

    let display = histogram.normalized_for_display();
    let mut canvas = Canvas::from_cells(&display, &histogram.x_edges, &histogram.y_edges, |v| {
        let shade = channel(1.0 - v);
        Rgb([shade, shade, shade])
    })?;

    for (ellipse, color) in ellipses.iter().zip(colors) {
        canvas.draw_outline(ellipse, Rgb(*color), false);
    }

    canvas.save(path)?;
    log::info!("Saved mixture density view to {}", path.display());
    Ok(())
}
