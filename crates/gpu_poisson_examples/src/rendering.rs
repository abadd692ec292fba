//! Tracing setup and PNG/point-file IO shared by the drivers.
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use glam::Vec2;
use gpu_poisson::prelude::*;
use image::{GrayImage, ImageBuffer, Rgba, RgbaImage};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Installs a `fmt` subscriber honouring `RUST_LOG`, defaulting to `info`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Directory for driver output, created on demand under the crate's `out/`.
pub fn output_dir(name: &str) -> anyhow::Result<PathBuf> {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("out").join(name);
    fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
    Ok(dir)
}

/// Decodes a PNG into an importance grid, reading `channel`.
///
/// Image row 0 becomes grid row 0.
pub fn load_png_importance(
    path: impl AsRef<Path>,
    channel: Channel,
) -> anyhow::Result<ImportanceGrid> {
    let path = path.as_ref();
    let img = image::open(path)
        .with_context(|| format!("loading {}", path.display()))?
        .to_rgba8();
    let (w, h) = img.dimensions();
    info!(path = %path.display(), width = w, height = h, ?channel, "loaded importance map");
    Ok(ImportanceGrid::from_rgba8(w, h, img.as_raw(), channel))
}

/// Encodes a one- or four-channel raster as PNG.
pub fn save_raster_png(raster: &Raster, path: impl AsRef<Path>) -> anyhow::Result<()> {
    let path = path.as_ref();
    match raster.channels {
        1 => GrayImage::from_raw(raster.width, raster.height, raster.pixels.clone())
            .context("raster size mismatch")?
            .save(path)?,
        4 => RgbaImage::from_raw(raster.width, raster.height, raster.pixels.clone())
            .context("raster size mismatch")?
            .save(path)?,
        n => bail!("unsupported channel count {n}"),
    }
    info!(path = %path.display(), "wrote raster");
    Ok(())
}

/// Plots `points` as black dots on white, scaled by `scale` pixels per cell.
pub fn render_points_png(
    points: &[Vec2],
    width: u32,
    height: u32,
    scale: u32,
    path: impl AsRef<Path>,
) -> anyhow::Result<()> {
    let path = path.as_ref();
    let scale = scale.max(1);
    let mut img: RgbaImage =
        ImageBuffer::from_pixel(width * scale, height * scale, Rgba([255, 255, 255, 255]));
    for p in points {
        let x = (p.x * scale as f32) as u32;
        let y = (p.y * scale as f32) as u32;
        if x < img.width() && y < img.height() {
            img.put_pixel(x, y, Rgba([0, 0, 0, 255]));
        }
    }
    img.save(path)?;
    info!(path = %path.display(), points = points.len(), "wrote point plot");
    Ok(())
}

/// Writes the raw little-endian point dump.
pub fn write_points_file(points: &[Vec2], path: impl AsRef<Path>) -> anyhow::Result<()> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    write_raw_points(BufWriter::new(file), points)?;
    info!(path = %path.display(), points = points.len(), "wrote raw points");
    Ok(())
}
