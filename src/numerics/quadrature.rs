//! Adaptive Gauss-Kronrod (7, 15) quadrature.

use super::NumericsError;

const ABS_TOLERANCE: f64 = 1.49e-8;
const REL_TOLERANCE: f64 = 1.49e-8;
const MAX_SUBDIVISIONS: usize = 50;

/// Kronrod abscissae; odd indices are shared with the 7-point Gauss rule.
const XGK: [f64; 8] = [
    0.991_455_371_120_812_6,
    0.949_107_912_342_758_5,
    0.864_864_423_359_769_1,
    0.741_531_185_599_394_4,
    0.586_087_235_467_691_1,
    0.405_845_151_377_397_2,
    0.207_784_955_007_898_5,
    0.0,
];

const WGK: [f64; 8] = [
    0.022_935_322_010_529_22,
    0.063_092_092_629_978_55,
    0.104_790_010_322_250_2,
    0.140_653_259_715_525_9,
    0.169_004_726_639_267_9,
    0.190_350_578_064_785_4,
    0.204_432_940_075_298_9,
    0.209_482_141_084_727_8,
];

const WG: [f64; 4] = [
    0.129_484_966_168_869_7,
    0.279_705_391_489_276_7,
    0.381_830_050_505_118_9,
    0.417_959_183_673_469_4,
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quadrature {
    pub value: f64,
    /// Estimated absolute error
    pub error: f64,
    pub subdivisions: usize,
}

#[derive(Debug, Clone, Copy)]
struct Segment {
    lower: f64,
    upper: f64,
    value: f64,
    error: f64,
}

/// Integrate `f` over `[lower, upper]`. Reversed bounds negate the result.
pub fn integrate<F>(f: F, lower: f64, upper: f64) -> Result<Quadrature, NumericsError>
where
    F: Fn(f64) -> f64,
{
    if !lower.is_finite() {
        return Err(NumericsError::NonFinite("lower bound"));
    }
    if !upper.is_finite() {
        return Err(NumericsError::NonFinite("upper bound"));
    }
    if lower == upper {
        return Ok(Quadrature {
            value: 0.0,
            error: 0.0,
            subdivisions: 0,
        });
    }

    let mut segments = vec![gauss_kronrod(&f, lower, upper)];
    let mut subdivisions = 0;

    loop {
        let value: f64 = segments.iter().map(|s| s.value).sum();
        let error: f64 = segments.iter().map(|s| s.error).sum();

        if !value.is_finite() || !error.is_finite() {
            return Err(NumericsError::NonFinite("integral"));
        }

        let converged = error <= ABS_TOLERANCE.max(REL_TOLERANCE * value.abs());
        if converged || subdivisions >= MAX_SUBDIVISIONS {
            if !converged {
                tracing::warn!(
                    "Quadrature stopped after {} subdivisions with error {:e}",
                    subdivisions,
                    error
                );
            }
            return Ok(Quadrature {
                value,
                error,
                subdivisions,
            });
        }

        let worst = segments
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.error.total_cmp(&b.error))
            .map(|(i, _)| i)
            .unwrap_or(0);
        let segment = segments.swap_remove(worst);
        let mid = 0.5 * (segment.lower + segment.upper);
        segments.push(gauss_kronrod(&f, segment.lower, mid));
        segments.push(gauss_kronrod(&f, mid, segment.upper));
        subdivisions += 1;
    }
}

fn gauss_kronrod<F>(f: &F, lower: f64, upper: f64) -> Segment
where
    F: Fn(f64) -> f64,
{
    let center = 0.5 * (lower + upper);
    let half = 0.5 * (upper - lower);

    let fc = f(center);
    let mut gauss = fc * WG[3];
    let mut kronrod = fc * WGK[7];

    for (j, &x) in XGK.iter().take(7).enumerate() {
        let offset = half * x;
        let pair = f(center - offset) + f(center + offset);
        kronrod += WGK[j] * pair;
        if j % 2 == 1 {
            gauss += WG[j / 2] * pair;
        }
    }

    Segment {
        lower,
        upper,
        value: kronrod * half,
        error: ((kronrod - gauss) * half).abs(),
    }
}
