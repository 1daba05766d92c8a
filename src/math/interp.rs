//! Monotone search-and-interpolate helpers.
//!
//! IV traces store two parallel arrays with a fixed direction each:
//! current is non-increasing and voltage is non-decreasing. Lookups binary-search
//! the key array for the bracketing pair and interpolate linearly between them.
//!
//! Queries outside the sampled range clamp to the nearest endpoint; nothing here
//! returns an error or panics on short inputs.

/// Sort direction of a key array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Interpolate `ys` at `x`, where `xs` is ordered in `dir`.
///
/// With fewer than two samples the single available value (or `0.0`) is returned.
pub fn interpolate(xs: &[f64], ys: &[f64], x: f64, dir: Direction) -> f64 {
    let n = xs.len().min(ys.len());
    match n {
        0 => return 0.0,
        1 => return ys[0],
        _ => {}
    }
    if x.is_nan() {
        return ys[0];
    }

    let xs = &xs[..n];
    let ys = &ys[..n];

    // Index of the first sample at or past `x` in sweep direction.
    let hi = match dir {
        Direction::Ascending => xs.partition_point(|&v| v < x),
        Direction::Descending => xs.partition_point(|&v| v > x),
    };
    if hi == 0 {
        return ys[0];
    }
    if hi >= n {
        return ys[n - 1];
    }

    let lo = hi - 1;
    let (x0, x1) = (xs[lo], xs[hi]);
    let (y0, y1) = (ys[lo], ys[hi]);
    let span = x1 - x0;
    if span.abs() <= f64::EPSILON * x0.abs().max(x1.abs()).max(1.0) {
        return y0;
    }

    let u = ((x - x0) / span).clamp(0.0, 1.0);
    y0 + u * (y1 - y0)
}

/// `n` evenly spaced values from `start` to `end` (both inclusive).
///
/// `n < 2` yields just `[start]` (or nothing for `n == 0`).
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n as f64 - 1.0);
            (0..n)
                .map(|i| if i == n - 1 { end } else { start + step * i as f64 })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascending_interpolates_between_brackets() {
        let xs = [0.0, 1.0, 2.0];
        let ys = [10.0, 20.0, 40.0];
        assert!((interpolate(&xs, &ys, 0.5, Direction::Ascending) - 15.0).abs() < 1e-12);
        assert!((interpolate(&xs, &ys, 1.5, Direction::Ascending) - 30.0).abs() < 1e-12);
        assert!((interpolate(&xs, &ys, 2.0, Direction::Ascending) - 40.0).abs() < 1e-12);
    }

    #[test]
    fn descending_interpolates_between_brackets() {
        let xs = [3.0, 2.0, 0.0];
        let ys = [0.0, 1.0, 2.0];
        assert!((interpolate(&xs, &ys, 2.5, Direction::Descending) - 0.5).abs() < 1e-12);
        assert!((interpolate(&xs, &ys, 1.0, Direction::Descending) - 1.5).abs() < 1e-12);
    }

    #[test]
    fn out_of_range_queries_clamp_to_endpoints() {
        let xs = [0.0, 1.0];
        let ys = [5.0, 7.0];
        assert_eq!(interpolate(&xs, &ys, -3.0, Direction::Ascending), 5.0);
        assert_eq!(interpolate(&xs, &ys, 9.0, Direction::Ascending), 7.0);

        let xs = [1.0, 0.0];
        assert_eq!(interpolate(&xs, &ys, 4.0, Direction::Descending), 5.0);
        assert_eq!(interpolate(&xs, &ys, -1.0, Direction::Descending), 7.0);
    }

    #[test]
    fn short_inputs_return_available_value() {
        assert_eq!(interpolate(&[], &[], 1.0, Direction::Ascending), 0.0);
        assert_eq!(interpolate(&[2.0], &[9.0], 100.0, Direction::Descending), 9.0);
    }

    #[test]
    fn flat_key_segment_does_not_divide_by_zero() {
        let xs = [0.0, 1.0, 1.0, 2.0];
        let ys = [0.0, 1.0, 3.0, 4.0];
        let y = interpolate(&xs, &ys, 1.0, Direction::Ascending);
        assert!(y.is_finite());
    }

    #[test]
    fn linspace_hits_both_endpoints() {
        let v = linspace(0.0, 0.7, 200);
        assert_eq!(v.len(), 200);
        assert_eq!(v[0], 0.0);
        assert_eq!(v[199], 0.7);
        assert!(v.windows(2).all(|w| w[1] >= w[0]));
    }
}
