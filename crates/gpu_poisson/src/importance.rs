//! Importance maps that bias sample density.
//!
//! This module defines how an external density field feeds the sampler:
//! - Define custom sources by implementing [`ImportanceMap`].
//! - Wrap decoded image pixels in an [`ImportanceGrid`], selecting a [`Channel`].
//! - Wrap closures with [`FnImportance`].
//!
//! Maps are sampled once per cell centre when they are attached to a sampler
//! ([`bake`]). A value `w` in `(0, 1]` scales the local radius to
//! `dart_radius / sqrt(w)`, so density grows linearly with `w`.
use glam::Vec2;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Image channel to read importance from.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    R,
    G,
    B,
    A,
    /// Rec. 709 luma of the RGB channels.
    Luma,
}

/// A density field sampled at normalized domain coordinates.
///
/// `uv` spans `[0, 1]` on both axes; `(0, 0)` is the corner of cell `(0, 0)`.
/// Implementors return values in `[0, 1]`; higher means denser.
pub trait ImportanceMap: Send + Sync {
    fn sample(&self, uv: Vec2) -> f32;
}

/// Dense importance values on a regular grid, sampled with nearest lookup.
#[derive(Clone, Debug, PartialEq)]
pub struct ImportanceGrid {
    pub width: u32,
    pub height: u32,
    pub values: Vec<f32>,
}

impl ImportanceGrid {
    /// Create a new [`ImportanceGrid`]. Missing values read as zero.
    pub fn new(width: u32, height: u32, values: Vec<f32>) -> Self {
        Self {
            width,
            height,
            values,
        }
    }

    /// A grid with the same value everywhere.
    pub fn uniform(width: u32, height: u32, value: f32) -> Self {
        Self::new(width, height, vec![value; width as usize * height as usize])
    }

    /// Build a grid from tightly packed RGBA8 pixels, row 0 first.
    ///
    /// Row 0 of the image maps to `v = 0`.
    pub fn from_rgba8(width: u32, height: u32, pixels: &[u8], channel: Channel) -> Self {
        let values = pixels
            .chunks_exact(4)
            .take(width as usize * height as usize)
            .map(|px| channel_value(px, channel))
            .collect();
        Self::new(width, height, values)
    }

    /// Sample the grid at normalized coordinates.
    pub fn sample_uv(&self, uv: Vec2) -> f32 {
        if self.width == 0 || self.height == 0 {
            return 0.0;
        }

        let u = uv.x.clamp(0.0, 1.0);
        let v = uv.y.clamp(0.0, 1.0);
        let x = ((u * self.width as f32) as u32).min(self.width - 1);
        let y = ((v * self.height as f32) as u32).min(self.height - 1);
        let idx = (y as usize) * (self.width as usize) + (x as usize);

        self.values.get(idx).copied().unwrap_or(0.0)
    }
}

impl ImportanceMap for ImportanceGrid {
    fn sample(&self, uv: Vec2) -> f32 {
        self.sample_uv(uv)
    }
}

/// An importance map backed by a closure.
pub struct FnImportance<F>
where
    F: Fn(Vec2) -> f32 + Send + Sync,
{
    f: F,
}

impl<F> FnImportance<F>
where
    F: Fn(Vec2) -> f32 + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> ImportanceMap for FnImportance<F>
where
    F: Fn(Vec2) -> f32 + Send + Sync,
{
    #[inline]
    fn sample(&self, uv: Vec2) -> f32 {
        (self.f)(uv)
    }
}

/// Evaluate `map` at every cell centre of a `width` x `height` grid.
///
/// Values are clamped to `[0, 1]`; non-finite samples become zero.
pub fn bake(map: &dyn ImportanceMap, width: u32, height: u32) -> Vec<f32> {
    let mut out = Vec::with_capacity(width as usize * height as usize);
    let size = Vec2::new(width as f32, height as f32);
    for y in 0..height {
        for x in 0..width {
            let uv = (Vec2::new(x as f32, y as f32) + Vec2::splat(0.5)) / size;
            let w = map.sample(uv);
            out.push(if w.is_finite() { w.clamp(0.0, 1.0) } else { 0.0 });
        }
    }
    out
}

/// Local exclusion radius for importance `w`.
pub fn local_radius(dart_radius: f32, w: f32, floor: f32) -> f32 {
    dart_radius / w.clamp(floor, 1.0).sqrt()
}

fn channel_value(px: &[u8], channel: Channel) -> f32 {
    let n = |v: u8| v as f32 / 255.0;
    match channel {
        Channel::R => n(px[0]),
        Channel::G => n(px[1]),
        Channel::B => n(px[2]),
        Channel::A => n(px[3]),
        Channel::Luma => 0.2126 * n(px[0]) + 0.7152 * n(px[1]) + 0.0722 * n(px[2]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_rgba8_selects_channel() {
        let pixels = [255, 0, 51, 102, 0, 255, 0, 255];
        let red = ImportanceGrid::from_rgba8(2, 1, &pixels, Channel::R);
        assert_eq!(red.values, vec![1.0, 0.0]);
        let blue = ImportanceGrid::from_rgba8(2, 1, &pixels, Channel::B);
        assert!((blue.values[0] - 0.2).abs() < 1e-6);
        let luma = ImportanceGrid::from_rgba8(2, 1, &pixels, Channel::Luma);
        assert!((luma.values[1] - 0.7152).abs() < 1e-4);
    }

    #[test]
    fn sample_uv_uses_nearest_cell_and_clamps() {
        let grid = ImportanceGrid::new(2, 2, vec![0.1, 0.2, 0.3, 0.4]);
        assert_eq!(grid.sample_uv(Vec2::new(0.25, 0.25)), 0.1);
        assert_eq!(grid.sample_uv(Vec2::new(0.75, 0.25)), 0.2);
        assert_eq!(grid.sample_uv(Vec2::new(0.25, 0.75)), 0.3);
        assert_eq!(grid.sample_uv(Vec2::new(1.0, 1.0)), 0.4);
        assert_eq!(grid.sample_uv(Vec2::new(-3.0, 9.0)), 0.3);
    }

    #[test]
    fn empty_grid_samples_zero() {
        let grid = ImportanceGrid::new(0, 0, Vec::new());
        assert_eq!(grid.sample(Vec2::new(0.5, 0.5)), 0.0);
    }

    #[test]
    fn bake_evaluates_cell_centres() {
        let map = FnImportance::new(|uv: Vec2| if uv.x < 0.5 { 1.0 } else { 0.25 });
        let baked = bake(&map, 4, 2);
        assert_eq!(baked, vec![1.0, 1.0, 0.25, 0.25, 1.0, 1.0, 0.25, 0.25]);
    }

    #[test]
    fn bake_clamps_and_scrubs_values() {
        let map = FnImportance::new(|uv: Vec2| match uv.x {
            x if x < 0.3 => 7.0,
            x if x < 0.6 => f32::NAN,
            _ => -1.0,
        });
        assert_eq!(bake(&map, 3, 1), vec![1.0, 0.0, 0.0]);
    }

    #[test]
    fn local_radius_grows_as_importance_falls() {
        assert_eq!(local_radius(2.0, 1.0, 0.0625), 2.0);
        assert_eq!(local_radius(2.0, 0.25, 0.0625), 4.0);
        assert_eq!(local_radius(2.0, 0.0, 0.0625), 8.0);
    }
}
