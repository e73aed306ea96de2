//! Geometry and gain model for the sound garden.
//!
//! A placement sits at fixed cells; its stereo position comes from the
//! centroid of those cells and never changes while the cells stay the same.
//! Its loudness depends on how far the cursor is from the nearest cell, with
//! a linear falloff that reaches silence at the placement's radius.

use garden_core::{Cell, PlacementParams};
use std::f32::consts::FRAC_PI_2;

/// A position in continuous grid space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// Gain and pan to apply to one source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceMix {
    pub gain: f32,
    pub pan: f32,
}

impl SourceMix {
    pub const SILENT: SourceMix = SourceMix { gain: 0.0, pan: 0.0 };
}

/// Arithmetic mean of the cell coordinates. `cells` must not be empty.
pub fn centroid(cells: &[Cell]) -> Point {
    let count = cells.len().max(1) as f32;
    let (sum_x, sum_y) = cells.iter().fold((0.0f32, 0.0f32), |(sx, sy), cell| {
        (sx + cell.x as f32, sy + cell.y as f32)
    });
    Point {
        x: sum_x / count,
        y: sum_y / count,
    }
}

/// Maps `centroid.x` from `[0, grid_width - 1]` onto `[-1, 1]`.
pub fn pan_from_centroid(centroid: Point, grid_width: u32) -> f32 {
    if grid_width <= 1 {
        return 0.0;
    }
    let span = (grid_width - 1) as f32;
    let pan = (centroid.x / span) * 2.0 - 1.0;
    pan.clamp(-1.0, 1.0)
}

/// Euclidean distance from the cursor to the nearest cell.
///
/// An unset cursor is infinitely far away.
pub fn min_distance(cursor: Option<Cell>, cells: &[Cell]) -> f32 {
    let Some(cursor) = cursor else {
        return f32::INFINITY;
    };
    cells
        .iter()
        .map(|cell| {
            let dx = cell.x as f32 - cursor.x as f32;
            let dy = cell.y as f32 - cursor.y as f32;
            (dx * dx + dy * dy).sqrt()
        })
        .fold(f32::INFINITY, f32::min)
}

/// Linear falloff: full `base_volume` at distance 0, silent at `radius` and beyond.
pub fn gain_from_distance(distance: f32, radius: f32, base_volume: f32) -> f32 {
    let base_volume = base_volume.max(0.0);
    if !distance.is_finite() || distance < 0.0 {
        return 0.0;
    }
    if !(radius > 0.0) || !radius.is_finite() {
        // Degenerate radius: only the placement's own cells are audible.
        return if distance == 0.0 { base_volume } else { 0.0 };
    }
    if distance > radius {
        return 0.0;
    }
    (base_volume * (1.0 - distance / radius)).clamp(0.0, base_volume)
}

/// Gain and pan of a placement for the given cursor.
pub fn mix_for(
    cells: &[Cell],
    params: &PlacementParams,
    cursor: Option<Cell>,
    grid_width: u32,
) -> SourceMix {
    if cells.is_empty() {
        return SourceMix::SILENT;
    }
    let pan = pan_from_centroid(centroid(cells), grid_width);
    let gain = gain_from_distance(min_distance(cursor, cells), params.radius, params.volume);
    SourceMix { gain, pan }
}

/// Equal-power placement of a mono sample, returning `(left, right)`.
pub fn pan_mono(sample: f32, pan: f32) -> (f32, f32) {
    let x = (pan.clamp(-1.0, 1.0) + 1.0) * 0.5;
    let angle = x * FRAC_PI_2;
    (sample * angle.cos(), sample * angle.sin())
}

/// Equal-power balance of a stereo frame.
///
/// At centre the frame passes through untouched; panning left folds the
/// right channel into the left and vice versa.
pub fn pan_stereo(left: f32, right: f32, pan: f32) -> (f32, f32) {
    let pan = pan.clamp(-1.0, 1.0);
    if pan <= 0.0 {
        let angle = (pan + 1.0) * FRAC_PI_2;
        (left + right * angle.cos(), right * angle.sin())
    } else {
        let angle = pan * FRAC_PI_2;
        (left * angle.cos(), right + left * angle.sin())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(coords: &[(u32, u32)]) -> Vec<Cell> {
        coords.iter().map(|&(x, y)| Cell::new(x, y)).collect()
    }

    #[test]
    fn centroid_is_the_mean() {
        let c = centroid(&cells(&[(2, 0), (3, 0), (4, 0)]));
        assert_eq!(c, Point { x: 3.0, y: 0.0 });

        let c = centroid(&cells(&[(0, 0), (1, 1)]));
        assert_eq!(c, Point { x: 0.5, y: 0.5 });
    }

    #[test]
    fn pan_covers_full_range() {
        assert_eq!(pan_from_centroid(Point { x: 0.0, y: 0.0 }, 8), -1.0);
        assert_eq!(pan_from_centroid(Point { x: 7.0, y: 0.0 }, 8), 1.0);
        assert!((pan_from_centroid(Point { x: 3.5, y: 0.0 }, 8)).abs() < 1e-6);
    }

    #[test]
    fn pan_is_centred_on_narrow_grids() {
        assert_eq!(pan_from_centroid(Point { x: 0.0, y: 3.0 }, 1), 0.0);
        assert_eq!(pan_from_centroid(Point { x: 0.0, y: 3.0 }, 0), 0.0);
    }

    #[test]
    fn pan_is_bounded_and_monotonic() {
        for width in 2..12u32 {
            let mut previous = f32::NEG_INFINITY;
            for step in 0..=((width - 1) * 4) {
                let x = step as f32 / 4.0;
                let pan = pan_from_centroid(Point { x, y: 0.0 }, width);
                assert!((-1.0..=1.0).contains(&pan), "pan {pan} out of range");
                assert!(pan >= previous, "pan decreased at x={x}, width={width}");
                previous = pan;
            }
        }
    }

    #[test]
    fn pan_clamps_overshoot() {
        assert_eq!(pan_from_centroid(Point { x: 12.0, y: 0.0 }, 8), 1.0);
    }

    #[test]
    fn min_distance_picks_nearest_cell() {
        let region = cells(&[(0, 0), (5, 5)]);
        assert_eq!(min_distance(Some(Cell::new(5, 4)), &region), 1.0);
        assert_eq!(min_distance(Some(Cell::new(0, 0)), &region), 0.0);
        assert_eq!(min_distance(Some(Cell::new(3, 0)), &region), 3.0);
        assert!(min_distance(None, &region).is_infinite());
    }

    #[test]
    fn gain_is_full_at_zero_and_silent_at_radius() {
        for volume in [0.0, 0.25, 1.0, 1.5] {
            assert_eq!(gain_from_distance(0.0, 3.0, volume), volume);
            assert_eq!(gain_from_distance(3.0, 3.0, volume), 0.0);
            assert_eq!(gain_from_distance(3.5, 3.0, volume), 0.0);
            assert_eq!(gain_from_distance(f32::INFINITY, 3.0, volume), 0.0);
        }
    }

    #[test]
    fn gain_falls_off_linearly() {
        assert!((gain_from_distance(1.5, 3.0, 1.0) - 0.5).abs() < 1e-6);
        assert!((gain_from_distance(1.0, 4.0, 0.8) - 0.6).abs() < 1e-6);
    }

    #[test]
    fn gain_never_exceeds_volume() {
        for tenth in 0..50 {
            let distance = tenth as f32 / 10.0;
            let gain = gain_from_distance(distance, 3.0, 0.7);
            assert!((0.0..=0.7).contains(&gain));
        }
        assert_eq!(gain_from_distance(0.0, 3.0, -1.0), 0.0);
    }

    #[test]
    fn degenerate_radius_only_hears_own_cells() {
        assert_eq!(gain_from_distance(0.0, 0.0, 1.0), 1.0);
        assert_eq!(gain_from_distance(0.5, 0.0, 1.0), 0.0);
    }

    #[test]
    fn mix_combines_pan_and_gain() {
        let region = cells(&[(2, 0), (3, 0), (4, 0)]);
        let params = PlacementParams::default();
        let mix = mix_for(&region, &params, Some(Cell::new(3, 0)), 7);
        assert_eq!(mix.gain, 1.0);
        assert_eq!(mix.pan, 0.0);

        let silent = mix_for(&region, &params, None, 7);
        assert_eq!(silent.gain, 0.0);
        assert_eq!(silent.pan, 0.0);
    }

    #[test]
    fn mono_panning_is_equal_power() {
        let (l, r) = pan_mono(1.0, 0.0);
        assert!((l * l + r * r - 1.0).abs() < 1e-6);
        let (l, r) = pan_mono(1.0, -1.0);
        assert!((l - 1.0).abs() < 1e-6 && r.abs() < 1e-6);
        let (l, r) = pan_mono(1.0, 1.0);
        assert!(l.abs() < 1e-6 && (r - 1.0).abs() < 1e-6);
    }

    #[test]
    fn stereo_balance_passes_through_at_centre() {
        let (l, r) = pan_stereo(0.3, -0.2, 0.0);
        assert!((l - 0.3).abs() < 1e-6);
        assert!((r + 0.2).abs() < 1e-6);

        let (l, r) = pan_stereo(0.5, 0.5, 1.0);
        assert!(l.abs() < 1e-6);
        assert!((r - 1.0).abs() < 1e-6);
    }
}
