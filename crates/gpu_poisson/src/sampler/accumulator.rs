//! Result accumulation: copies committed samples out and drops exact duplicates.
use glam::Vec2;
use tracing::warn;

use super::PoissonDiskSampler;
use crate::error::Result;

/// Committed samples, deduplicated.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SampleSet {
    /// Distinct positions in grid units, sorted by bit pattern.
    pub points: Vec<Vec2>,
    /// Entries in the result buffer before deduplication.
    pub raw_count: usize,
}

impl SampleSet {
    /// Entries removed as exact duplicates.
    pub fn duplicates(&self) -> usize {
        self.raw_count - self.points.len()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Smallest distance between any two points, by brute force.
    pub fn min_distance(&self) -> Option<f32> {
        let mut best: Option<f32> = None;
        for (i, a) in self.points.iter().enumerate() {
            for b in &self.points[i + 1..] {
                let d = a.distance(*b);
                best = Some(best.map_or(d, |m| m.min(d)));
            }
        }
        best
    }
}

/// Removes bit-identical positions in place; the remaining order is by bit pattern.
pub fn dedup_exact(points: &mut Vec<Vec2>) {
    points.sort_unstable_by_key(|p| (p.x.to_bits(), p.y.to_bits()));
    points.dedup_by(|a, b| a.x.to_bits() == b.x.to_bits() && a.y.to_bits() == b.y.to_bits());
}

impl PoissonDiskSampler {
    /// Copies the committed samples to the host and removes exact duplicates.
    pub fn collect_samples(&self) -> Result<SampleSet> {
        let device = self.device()?;
        let raw = device
            .resources
            .read_results(&device.ctx, self.accepted_count())?;
        let raw_count = raw.len();
        let mut points: Vec<Vec2> = raw.into_iter().map(Vec2::from).collect();
        dedup_exact(&mut points);

        let set = SampleSet { points, raw_count };
        if set.duplicates() > 0 {
            warn!(
                duplicates = set.duplicates(),
                raw_count, "removed duplicate samples"
            );
        }
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_removes_bit_equal_pairs_only() {
        let mut points = vec![
            Vec2::new(1.5, 2.5),
            Vec2::new(0.5, 0.5),
            Vec2::new(1.5, 2.5),
            Vec2::new(1.5, 2.500001),
        ];
        dedup_exact(&mut points);
        assert_eq!(points.len(), 3);
    }

    #[test]
    fn dedup_is_idempotent() {
        let mut once = vec![
            Vec2::new(3.5, 1.5),
            Vec2::new(3.5, 1.5),
            Vec2::new(0.5, 9.5),
            Vec2::new(7.5, 7.5),
            Vec2::new(0.5, 9.5),
        ];
        dedup_exact(&mut once);
        let mut twice = once.clone();
        dedup_exact(&mut twice);
        assert_eq!(once, twice);
        assert_eq!(once.len(), 3);
    }

    #[test]
    fn negative_zero_is_distinct_from_zero() {
        let mut points = vec![Vec2::new(0.0, 1.0), Vec2::new(-0.0, 1.0)];
        dedup_exact(&mut points);
        assert_eq!(points.len(), 2);
    }

    #[test]
    fn sample_set_reports_duplicates_and_spacing() {
        let set = SampleSet {
            points: vec![Vec2::new(0.5, 0.5), Vec2::new(4.5, 0.5), Vec2::new(0.5, 3.5)],
            raw_count: 5,
        };
        assert_eq!(set.duplicates(), 2);
        assert_eq!(set.min_distance(), Some(3.0));
        assert_eq!(SampleSet::default().min_distance(), None);
    }
}
