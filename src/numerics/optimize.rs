//! Derivative-free scalar minimisation.

use super::NumericsError;

const GOLDEN: f64 = 1.618_033_988_749_895;
const MAX_BRACKET_STEPS: usize = 200;
const MAX_SEARCH_STEPS: usize = 500;
const TOLERANCE: f64 = 1e-10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Minimum {
    pub x: f64,
    pub fun: f64,
    pub iterations: usize,
}

/// Find a local minimum of `f` starting from `x0`.
///
/// Expands a downhill bracket from `x0`, then narrows it with golden-section
/// search.
pub fn minimize_scalar<F>(f: F, x0: f64) -> Result<Minimum, NumericsError>
where
    F: Fn(f64) -> f64,
{
    if !x0.is_finite() {
        return Err(NumericsError::NonFinite("initial value"));
    }
    if !f(x0).is_finite() {
        return Err(NumericsError::NonFinite("objective at initial value"));
    }

    let (a, b, c) = bracket(&f, x0)?;
    let (mut lo, mut hi) = if a < c { (a, c) } else { (c, a) };

    let inv = 1.0 / GOLDEN;
    let mut x1 = hi - inv * (hi - lo);
    let mut x2 = lo + inv * (hi - lo);
    let mut f1 = f(x1);
    let mut f2 = f(x2);
    let mut iterations = 0;

    while (hi - lo).abs() > TOLERANCE * (1.0 + b.abs()) && iterations < MAX_SEARCH_STEPS {
        if f1 < f2 {
            hi = x2;
            x2 = x1;
            f2 = f1;
            x1 = hi - inv * (hi - lo);
            f1 = f(x1);
        } else {
            lo = x1;
            x1 = x2;
            f1 = f2;
            x2 = lo + inv * (hi - lo);
            f2 = f(x2);
        }
        iterations += 1;
    }

    let x = (lo + hi) / 2.0;
    let fun = f(x);
    if !x.is_finite() || !fun.is_finite() {
        return Err(NumericsError::NonFinite("minimum"));
    }

    Ok(Minimum { x, fun, iterations })
}

/// Points a, b, c with f(b) below both ends.
fn bracket<F>(f: &F, x0: f64) -> Result<(f64, f64, f64), NumericsError>
where
    F: Fn(f64) -> f64,
{
    let step = 0.01 * x0.abs().max(1.0);
    let (mut a, mut b) = (x0, x0 + step);
    let (mut fa, mut fb) = (f(a), f(b));

    if fb > fa {
        std::mem::swap(&mut a, &mut b);
        std::mem::swap(&mut fa, &mut fb);
    }

    let mut c = b + GOLDEN * (b - a);
    let mut fc = f(c);

    for _ in 0..MAX_BRACKET_STEPS {
        if !fc.is_finite() {
            break;
        }
        if fc >= fb {
            return Ok((a, b, c));
        }
        a = b;
        b = c;
        fb = fc;
        c = b + GOLDEN * (b - a);
        fc = f(c);
    }

    Err(NumericsError::NoMinimum(x0))
}
