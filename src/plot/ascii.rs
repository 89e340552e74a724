//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Overlay plot elements:
//! - training points: `o`
//! - chosen candidate: `-` line
//!
//! Mapped plot elements: one digit per assignment slot (`1`..`9`, `*` beyond).

use crate::domain::{FunctionMatch, LabeledPoint, SeriesTable};
use crate::fit::fitter::common_domain;

/// Render one training column over its chosen candidate, on the shared domain.
pub fn render_overlay(
    training: &SeriesTable,
    candidates: &SeriesTable,
    m: &FunctionMatch,
    width: usize,
    height: usize,
) -> Option<String> {
    let (_, t_col) = training.column(&m.training)?;
    let (_, c_col) = candidates.column(&m.candidate)?;

    let pairs = common_domain(training, candidates);
    let points: Vec<(f64, f64)> = pairs.iter().map(|&(t, _)| (training.x()[t], t_col.values[t])).collect();
    let curve: Vec<(f64, f64)> = pairs.iter().map(|&(t, c)| (training.x()[t], c_col.values[c])).collect();

    let title = format!("{} (o) vs {} (-)", m.training, m.candidate);
    let marks: Vec<(f64, f64, char)> = points.iter().map(|&(x, y)| (x, y, 'o')).collect();
    Some(render_plot(&title, &marks, Some(curve.as_slice()), width, height))
}

/// Render the mapped test points, labelled by assignment slot.
pub fn render_mapped_points(points: &[LabeledPoint], matches: &[FunctionMatch], width: usize, height: usize) -> String {
    let marks: Vec<(f64, f64, char)> = points
        .iter()
        .map(|p| {
            let slot = matches.iter().position(|m| m.candidate == p.candidate);
            (p.x, p.y, slot_char(slot))
        })
        .collect();

    let legend: Vec<String> = matches
        .iter()
        .enumerate()
        .map(|(i, m)| format!("{}={}", slot_char(Some(i)), m.candidate))
        .collect();
    let title = format!("Mapped test points ({}) [{}]", points.len(), legend.join(" "));

    render_plot(&title, &marks, None, width, height)
}

fn slot_char(slot: Option<usize>) -> char {
    match slot {
        Some(i) if i < 9 => char::from(b'1' + i as u8),
        _ => '*',
    }
}

fn render_plot(
    title: &str,
    marks: &[(f64, f64, char)],
    curve_points: Option<&[(f64, f64)]>,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let all_xy = || {
        marks
            .iter()
            .map(|&(x, y, _)| (x, y))
            .chain(curve_points.unwrap_or(&[]).iter().copied())
    };
    let (x_min, x_max) = range(all_xy().map(|(x, _)| x)).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = range(all_xy().map(|(_, y)| y)).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Draw curve first (so points can overlay).
    if let Some(curve) = curve_points {
        draw_curve(&mut grid, curve, x_min, x_max, y_min, y_max);
    }

    for &(x, y, ch) in marks {
        let col = map_x(x, x_min, x_max, width);
        let row = map_y(y, y_min, y_max, height);
        grid[row][col] = ch;
    }

    let mut out = String::new();
    out.push_str(title);
    out.push('\n');
    out.push_str(&format!(
        "x=[{x_min:.3}, {x_max:.3}] | y=[{y_min:.3}, {y_max:.3}]\n"
    ));

    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }

    out
}

/// Min/max of finite values; a zero-width range is widened to unit width.
fn range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values.filter(|v| v.is_finite()) {
        min = min.min(v);
        max = max.max(v);
    }
    if !(min.is_finite() && max.is_finite()) {
        return None;
    }
    if max > min { Some((min, max)) } else { Some((min - 0.5, max + 0.5)) }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], x_min: f64, x_max: f64, y_min: f64, y_max: f64) {
    if curve.len() < 2 {
        return;
    }
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(x, y) in curve {
        let col = map_x(x, x_min, x_max, width);
        let row = map_y(y, y_min, y_max, height);
        if let Some((c0, r0)) = prev {
            draw_line(grid, c0, r0, col, row, '-');
        } else {
            grid[row][col] = '-';
        }
        prev = Some((col, row));
    }
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SeriesColumn;

    fn fm(training: &str, candidate: &str) -> FunctionMatch {
        FunctionMatch {
            training: training.to_string(),
            candidate: candidate.to_string(),
            candidate_index: 0,
            sse: 0.0,
            max_deviation: 0.0,
        }
    }

    #[test]
    fn overlay_golden_snapshot_small() {
        let training = SeriesTable::new(
            "train",
            vec![1.0, 10.0],
            vec![SeriesColumn::new("y1", vec![100.0, 110.0])],
        )
        .unwrap();
        let candidates = SeriesTable::new(
            "ideal",
            vec![1.0, 10.0],
            vec![SeriesColumn::new("y9", vec![100.0, 100.0])],
        )
        .unwrap();

        let txt = render_overlay(&training, &candidates, &fm("y1", "y9"), 10, 5).unwrap();
        let expected = concat!(
            "y1 (o) vs y9 (-)\n",
            "x=[1.000, 10.000] | y=[99.500, 110.500]\n",
            "         o\n",
            "          \n",
            "          \n",
            "          \n",
            "o---------\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn overlay_needs_both_columns() {
        let t = SeriesTable::new("train", vec![1.0], vec![SeriesColumn::new("y1", vec![1.0])]).unwrap();
        assert!(render_overlay(&t, &t, &fm("y1", "nope"), 10, 5).is_none());
    }

    #[test]
    fn mapped_points_use_slot_digits() {
        let matches = vec![fm("y1", "a"), fm("y2", "b")];
        let points = vec![
            LabeledPoint { x: 0.0, y: 0.0, residual: 0.0, candidate: "a".to_string() },
            LabeledPoint { x: 1.0, y: 1.0, residual: 0.0, candidate: "b".to_string() },
        ];
        let txt = render_mapped_points(&points, &matches, 10, 5);
        let lines: Vec<&str> = txt.lines().collect();
        assert_eq!(lines[0], "Mapped test points (2) [1=a 2=b]");
        assert_eq!(lines[2], "         2");
        assert_eq!(lines[6], "1         ");
    }
}
