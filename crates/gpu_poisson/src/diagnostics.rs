//! Debug rasters of the coverage field and raw point export.
//!
//! A [`CoverageSnapshot`] is a host copy of the per-cell state read back from
//! the device. It renders into [`Raster`]s that callers can encode with any
//! image crate.
use std::io::Write;

use glam::Vec2;

use crate::error::Result;

/// Host copy of the coverage field and the last census.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageSnapshot {
    pub width: u32,
    pub height: u32,
    /// Last written dart priority per cell. Zero means untouched this pass.
    pub priorities: Vec<u32>,
    /// Pass index at which each cell was covered. Zero means uncovered.
    pub covered_at: Vec<u32>,
    /// Linear indices of the cells the last census found empty.
    pub empty_cells: Vec<u32>,
}

impl CoverageSnapshot {
    /// Number of cells covered by at least one accepted sample.
    pub fn covered_count(&self) -> usize {
        self.covered_at.iter().filter(|&&c| c != 0).count()
    }

    /// Whether the cell at `(x, y)` is covered.
    pub fn is_covered(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let idx = y as usize * self.width as usize + x as usize;
        self.covered_at.get(idx).is_some_and(|&c| c != 0)
    }

    /// Highest pass index that covered any cell.
    pub fn last_covering_pass(&self) -> u32 {
        self.covered_at.iter().copied().max().unwrap_or(0)
    }

    /// Grayscale raster of when each cell was covered.
    ///
    /// Early passes are dark and late passes bright; uncovered cells are black.
    pub fn coverage_depth(&self) -> Raster {
        let last = self.last_covering_pass().max(1) as f32;
        let pixels = self
            .covered_at
            .iter()
            .map(|&c| {
                if c == 0 {
                    0
                } else {
                    (32.0 + 223.0 * c as f32 / last).round() as u8
                }
            })
            .collect();
        Raster::new(self.width, self.height, 1, pixels)
    }

    /// Grayscale raster of the per-cell priorities from the last Throw.
    pub fn acceptance_priority(&self) -> Raster {
        let max = self.priorities.iter().copied().max().unwrap_or(0).max(1) as f32;
        let pixels = self
            .priorities
            .iter()
            .map(|&p| (255.0 * p as f32 / max).round() as u8)
            .collect();
        Raster::new(self.width, self.height, 1, pixels)
    }

    /// RGBA raster with empty cells in green on white.
    pub fn empty_cell_map(&self) -> Raster {
        let mut raster = Raster::filled(self.width, self.height, [255, 255, 255, 255]);
        for &cell in &self.empty_cells {
            let x = cell % self.width.max(1);
            let y = cell / self.width.max(1);
            raster.put_rgba(x, y, [0, 200, 0, 255]);
        }
        raster
    }
}

/// An 8-bit raster with one or four channels, row 0 first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub pixels: Vec<u8>,
}

impl Raster {
    pub fn new(width: u32, height: u32, channels: u8, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            channels,
            pixels,
        }
    }

    /// An RGBA raster filled with `rgba`.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let count = width as usize * height as usize;
        let mut pixels = Vec::with_capacity(count * 4);
        for _ in 0..count {
            pixels.extend_from_slice(&rgba);
        }
        Self::new(width, height, 4, pixels)
    }

    /// Writes one RGBA pixel; ignored for single-channel rasters or out of bounds.
    pub fn put_rgba(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if self.channels != 4 || x >= self.width || y >= self.height {
            return;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        if let Some(px) = self.pixels.get_mut(idx..idx + 4) {
            px.copy_from_slice(&rgba);
        }
    }

    /// Plots each point as a dot of `rgba` into an RGBA raster.
    pub fn plot_points(&mut self, points: &[Vec2], rgba: [u8; 4]) {
        for p in points {
            if p.x < 0.0 || p.y < 0.0 {
                continue;
            }
            self.put_rgba(p.x as u32, p.y as u32, rgba);
        }
    }
}

/// Writes `points` as consecutive little-endian `f32` pairs with no header.
pub fn write_raw_points<W: Write>(mut writer: W, points: &[Vec2]) -> Result<()> {
    let mut buf = Vec::with_capacity(points.len() * 8);
    for p in points {
        buf.extend_from_slice(&p.x.to_le_bytes());
        buf.extend_from_slice(&p.y.to_le_bytes());
    }
    writer.write_all(&buf)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> CoverageSnapshot {
        CoverageSnapshot {
            width: 3,
            height: 2,
            priorities: vec![0, 4, 8, 2, 0, 0],
            covered_at: vec![1, 1, 2, 0, 2, 0],
            empty_cells: vec![3, 5],
        }
    }

    #[test]
    fn covered_count_and_lookup() {
        let snap = snapshot();
        assert_eq!(snap.covered_count(), 4);
        assert!(snap.is_covered(2, 0));
        assert!(!snap.is_covered(0, 1));
        assert!(!snap.is_covered(9, 9));
        assert_eq!(snap.last_covering_pass(), 2);
    }

    #[test]
    fn coverage_depth_keeps_uncovered_black() {
        let raster = snapshot().coverage_depth();
        assert_eq!(raster.channels, 1);
        assert_eq!(raster.pixels[3], 0);
        assert_eq!(raster.pixels[2], 255);
        assert!(raster.pixels[0] > 0 && raster.pixels[0] < 255);
    }

    #[test]
    fn acceptance_priority_scales_to_max() {
        let raster = snapshot().acceptance_priority();
        assert_eq!(raster.pixels[2], 255);
        assert_eq!(raster.pixels[0], 0);
        assert_eq!(raster.pixels[1], 128);
    }

    #[test]
    fn empty_cell_map_marks_empty_cells_green() {
        let raster = snapshot().empty_cell_map();
        assert_eq!(raster.pixels.len(), 3 * 2 * 4);
        assert_eq!(&raster.pixels[0..4], &[255, 255, 255, 255]);
        assert_eq!(&raster.pixels[12..16], &[0, 200, 0, 255]);
        assert_eq!(&raster.pixels[20..24], &[0, 200, 0, 255]);
    }

    #[test]
    fn plot_points_skips_out_of_range() {
        let mut raster = Raster::filled(2, 2, [0, 0, 0, 255]);
        raster.plot_points(
            &[Vec2::new(1.5, 0.5), Vec2::new(-1.0, 0.0), Vec2::new(7.0, 1.0)],
            [255, 0, 0, 255],
        );
        assert_eq!(&raster.pixels[4..8], &[255, 0, 0, 255]);
        assert_eq!(&raster.pixels[0..4], &[0, 0, 0, 255]);
    }

    #[test]
    fn write_raw_points_emits_le_pairs() {
        let mut out = Vec::new();
        write_raw_points(&mut out, &[Vec2::new(1.0, 2.5)]).unwrap();
        assert_eq!(out.len(), 8);
        assert_eq!(&out[0..4], &1.0f32.to_le_bytes());
        assert_eq!(&out[4..8], &2.5f32.to_le_bytes());
    }
}
