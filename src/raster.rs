use crate::render::{HEIGHT, WIDTH};
use crate::types::MapModel;
use anyhow::{anyhow, Context, Result};
use image::{Rgba, RgbaImage};
use rayon::prelude::*;
use std::path::Path;
use tracing::info;

const BORDER_COLOR: &str = "#333";

/// Largest image side accepted, in pixels.
pub const MAX_DIMENSION: u32 = 32_768;

/// Paint the choropleth into an image `scale` pixels per map unit. Each pixel
/// takes the fill of the county containing its centre; state borders are
/// stroked on top.
pub fn rasterize(model: &MapModel, scale: f64) -> Result<RgbaImage> {
    if !(scale.is_finite() && scale > 0.0) {
        return Err(anyhow!("PNG scale must be positive, got {}", scale));
    }
    let (width, height) = ((WIDTH * scale).round(), (HEIGHT * scale).round());
    if width > f64::from(MAX_DIMENSION) || height > f64::from(MAX_DIMENSION) {
        return Err(anyhow!(
            "PNG scale {} gives a {}x{} image, larger than {} pixels per side",
            scale,
            width,
            height,
            MAX_DIMENSION
        ));
    }
    if width < 1.0 || height < 1.0 {
        return Err(anyhow!("PNG scale {} gives an empty image", scale));
    }
    let (width, height) = (width as u32, height as u32);
    let len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(4))
        .ok_or_else(|| anyhow!("raster buffer for {}x{} overflows", width, height))?;

    let fills: Vec<Rgba<u8>> = model.counties.iter().map(|c| hex_to_rgba(c.fill)).collect();

    let mut buffer = vec![0u8; len];
    buffer
        .par_chunks_mut(width as usize * 4)
        .enumerate()
        .for_each(|(row, pixels)| {
            let y = (row as f64 + 0.5) / scale;
            for (col, pixel) in pixels.chunks_exact_mut(4).enumerate() {
                let x = (col as f64 + 0.5) / scale;
                if let Some(i) = model.index.locate(&model.counties, x, y) {
                    pixel.copy_from_slice(&fills[i].0);
                }
            }
        });

    let mut img = RgbaImage::from_raw(width, height, buffer)
        .ok_or_else(|| anyhow!("raster buffer does not match {}x{}", width, height))?;

    let border = hex_to_rgba(BORDER_COLOR);
    for line in &model.state_borders {
        for segment in line.lines() {
            draw_segment(
                &mut img,
                (segment.start.x * scale, segment.start.y * scale),
                (segment.end.x * scale, segment.end.y * scale),
                border,
            );
        }
    }

    Ok(img)
}

pub fn write_png(model: &MapModel, scale: f64, path: &Path) -> Result<()> {
    let img = rasterize(model, scale)?;
    img.save(path)
        .with_context(|| format!("Failed to save PNG: {:?}", path))?;
    info!(path = ?path, width = img.width(), height = img.height(), "wrote raster preview");
    Ok(())
}

// Step along the segment one pixel at a time.
fn draw_segment(img: &mut RgbaImage, from: (f64, f64), to: (f64, f64), color: Rgba<u8>) {
    let (dx, dy) = (to.0 - from.0, to.1 - from.1);
    let steps = dx.abs().max(dy.abs()).ceil().max(1.0) as u32;
    for s in 0..=steps {
        let t = s as f64 / steps as f64;
        let x = (from.0 + dx * t).floor();
        let y = (from.1 + dy * t).floor();
        if x >= 0.0 && y >= 0.0 && (x as u32) < img.width() && (y as u32) < img.height() {
            img.put_pixel(x as u32, y as u32, color);
        }
    }
}

/// `#rgb` or `#rrggbb`; malformed channels read as zero.
fn hex_to_rgba(hex: &str) -> Rgba<u8> {
    let hex = hex.trim_start_matches('#');
    let channel = |s: &str| u8::from_str_radix(s, 16).unwrap_or(0);
    if !hex.is_ascii() {
        return Rgba([0, 0, 0, 255]);
    }
    match hex.len() {
        3 => {
            let c: Vec<u8> = hex
                .chars()
                .map(|ch| channel(&ch.to_string()) * 17)
                .collect();
            Rgba([c[0], c[1], c[2], 255])
        }
        6 => Rgba([
            channel(&hex[0..2]),
            channel(&hex[2..4]),
            channel(&hex[4..6]),
            255,
        ]),
        _ => Rgba([0, 0, 0, 255]),
    }
}
