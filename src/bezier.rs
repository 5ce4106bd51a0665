//! Single-span Bezier curves of arbitrary degree.
//!
//! The curve through `n` control points is evaluated directly in the
//! Bernstein basis at `steps * n` equally spaced parameters and the
//! samples are joined with exact lines.

use crate::basics::lrint;
use crate::color::Rgba8;
use crate::error::{Error, Result};
use crate::primitives::line;
use crate::surface::Surface;

/// Value of the Bernstein polynomial over `data` at parameter `t / nstep`.
///
/// `t < 0` clamps to the first value and `t >= nstep` to the last. The
/// binomial coefficient is built incrementally so no factorial overflows.
pub(crate) fn evaluate(data: &[f64], t: i32, nstep: i32) -> f64 {
    let last = data[data.len() - 1];
    if t < 0 {
        return data[0];
    }
    if t >= nstep {
        return last;
    }
    let mu = t as f64 / nstep as f64;
    let n = data.len() as i32 - 1;
    let mut muk = 1.0;
    let mut munk = (1.0 - mu).powi(n);
    if munk <= 0.0 {
        return last;
    }

    let mut result = 0.0;
    for (k, &value) in data.iter().enumerate() {
        let k = k as i32;
        let mut nn = n;
        let mut kn = k;
        let mut nkn = n - k;
        let mut blend = muk * munk;
        muk *= mu;
        munk /= 1.0 - mu;
        while nn >= 1 {
            blend *= nn as f64;
            nn -= 1;
            if kn > 1 {
                blend /= kn as f64;
                kn -= 1;
            }
            if nkn > 1 {
                blend /= nkn as f64;
                nkn -= 1;
            }
        }
        result += value * blend;
    }
    result
}

/// Draw the Bezier curve defined by `points` (at least 3) using
/// `steps * points.len()` segments (`steps >= 2`).
pub fn bezier(surf: &mut Surface, points: &[(i32, i32)], steps: i32, color: Rgba8) -> Result<()> {
    if points.len() < 3 {
        return Err(Error::invalid(format!("bezier needs 3 control points, got {}", points.len())));
    }
    if steps < 2 {
        return Err(Error::invalid(format!("bezier needs at least 2 steps, got {steps}")));
    }
    let xs: Vec<f64> = points.iter().map(|p| p.0 as f64).collect();
    let ys: Vec<f64> = points.iter().map(|p| p.1 as f64).collect();
    let nstep = i32::try_from(points.len())
        .ok()
        .and_then(|n| steps.checked_mul(n))
        .ok_or_else(|| Error::invalid(format!("{steps} steps over {} points overflows", points.len())))?;

    let mut x1 = lrint(xs[0]);
    let mut y1 = lrint(ys[0]);
    for t in 1..=nstep {
        let x2 = evaluate(&xs, t, nstep) as i32;
        let y2 = evaluate(&ys, t, nstep) as i32;
        line(surf, x1, y1, x2, y2, color)?;
        x1 = x2;
        y1 = y2;
    }
    Ok(())
}
