use std::f64::consts::PI;

use crate::{
    error::{ConvolutionError, Result},
    types::{Point, Value, Vector},
};

/// Relative tolerance on the discriminant below which a sample point is treated
/// as lying on the line through the segment.
const DEGENERACY_EPSILON: Value = 1e-12;

/// Parameters of the inverse-power segment kernel.
///
/// The potential of a segment `AB` at `P` is
///
/// ```text
/// |AB| * ∫₀¹ τ(t)^(i-1) / |P - (A + t·AB)|^i dt,     τ(t) = τ₀ + t·Δτ
/// ```
///
/// evaluated in coordinates divided by `sigma`, and optionally divided by the
/// kernel's normalisation factor so that the isolevel `1` sits near the bone radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Kernel {
    /// Distance exponent `i`. Default: `2`.
    pub exponent: u32,
    /// Length scale the coordinates are divided by. Default: `1.0`.
    pub sigma: Value,
    /// Divide the potential by the kernel's normalisation factor. Default: `true`.
    pub normalized: bool,
}

impl Default for Kernel {
    fn default() -> Self {
        Self {
            exponent: 2,
            sigma: 1.0,
            normalized: true,
        }
    }
}

impl Kernel {
    pub fn with_exponent(mut self, exponent: u32) -> Self {
        self.exponent = exponent;
        self
    }

    pub fn with_sigma(mut self, sigma: Value) -> Self {
        self.sigma = sigma;
        self
    }

    pub fn with_normalized(mut self, normalized: bool) -> Self {
        self.normalized = normalized;
        self
    }

    /// Checks that the kernel can be evaluated.
    pub fn validate(&self) -> Result<()> {
        if self.exponent == 0 {
            return Err(ConvolutionError::InvalidExponent(self.exponent));
        }
        if !(self.sigma.is_finite() && self.sigma > 0.0) {
            return Err(ConvolutionError::InvalidSigma);
        }
        Ok(())
    }

    /// Potential of the segment `a`–`b` (with per-endpoint radii) at `p`.
    pub fn potential(
        &self,
        a: Point,
        radius_a: Value,
        b: Point,
        radius_b: Value,
        p: Point,
    ) -> Value {
        let s = self.sigma;
        let value = evaluate(
            a / s,
            radius_a,
            b / s,
            radius_b,
            p / s,
            self.exponent,
        );

        if self.normalized {
            value / normalization_factor(self.exponent, s)
        } else {
            value
        }
    }
}

/// Normalisation factor of the inverse-power kernel of exponent `i`.
///
/// ```text
/// N(2) = π σ²
/// N(3) = 2 σ³
/// N(i) = σ² (i-3)/(i-2) N(i-2)
/// ```
///
/// Exponents below `2` are not normalised and return `1`.
pub fn normalization_factor(exponent: u32, sigma: Value) -> Value {
    match exponent {
        0 | 1 => 1.0,
        2 => PI * sigma * sigma,
        3 => 2.0 * sigma * sigma * sigma,
        i => {
            let i = i as Value;
            sigma * sigma * (i - 3.0) / (i - 2.0) * normalization_factor(exponent - 2, sigma)
        }
    }
}

/// Binomial coefficients `C(n, 0..=n)`.
pub fn binomial_coefficients(n: u32) -> Vec<Value> {
    let mut coeff = Vec::with_capacity(n as usize + 1);
    coeff.push(1.0);
    for k in 0..n {
        let next = coeff[k as usize] * (n - k) as Value / (k + 1) as Value;
        coeff.push(next);
    }
    coeff
}

/// Raw potential of the segment `a`–`b` at `p` for distance exponent `exponent`.
///
/// The radius is interpolated linearly along the segment and the blend
/// `(Δτ·t + τ₀)^(i-1)` is expanded binomially over [`SegmentFrame::reductions`].
/// The endpoints are ordered so the radius grows from `A` to `B`, which makes the
/// result independent of the segment's orientation.
///
/// Returns `+∞` when `p` lies on the segment itself, and `0` for a zero-length
/// segment or `exponent == 0`. Points on the segment's line but outside its span
/// get the finite value of the one-dimensional integral.
pub fn evaluate(
    a: Point,
    radius_a: Value,
    b: Point,
    radius_b: Value,
    p: Point,
    exponent: u32,
) -> Value {
    if exponent == 0 {
        return 0.0;
    }

    let (a, b, tau_0, delta_tau) = if radius_a > radius_b {
        (b, a, radius_b, radius_a - radius_b)
    } else {
        (a, b, radius_a, radius_b - radius_a)
    };

    let Some(frame) = SegmentFrame::new(a, b, p) else {
        return 0.0;
    };
    if frame.saturates() {
        return Value::INFINITY;
    }

    let n = exponent - 1;
    let j = frame.reductions(exponent);
    binomial_coefficients(n)
        .iter()
        .zip(&j)
        .enumerate()
        .map(|(k, (c, j_k))| {
            let k = k as i32;
            let weight = c * delta_tau.powi(k) * tau_0.powi(n as i32 - k);
            if weight == 0.0 { 0.0 } else { weight * j_k }
        })
        .sum()
}

/// Dot products and distances of a segment `AB` and a sample point `P`,
/// shared by every term of the `J(k, i)` reduction.
#[derive(Debug, Clone, Copy)]
pub struct SegmentFrame {
    /// `|AB|`
    ab_len: Value,
    /// `|AB|²`
    ab2: Value,
    /// `|AP|`
    ap_len: Value,
    /// `|AP|²`
    ap2: Value,
    /// `|BP|`
    bp_len: Value,
    /// `AB·AP`
    ab_ap: Value,
    /// `BA·BP`
    ba_bp: Value,
    /// `|AB|²|AP|² - (AB·AP)²`
    discriminant: Value,
}

impl SegmentFrame {
    /// Returns `None` for a zero-length segment.
    pub fn new(a: Point, b: Point, p: Point) -> Option<Self> {
        let ab: Vector = b - a;
        let ap: Vector = p - a;
        let ba: Vector = a - b;
        let bp: Vector = p - b;

        let ab2 = ab.norm_squared();
        if !(ab2 > 0.0) {
            return None;
        }

        let ap2 = ap.norm_squared();
        let ab_ap = ab.dot(&ap);

        Some(Self {
            ab_len: ab2.sqrt(),
            ab2,
            ap_len: ap2.sqrt(),
            ap2,
            bp_len: bp.norm(),
            ab_ap,
            ba_bp: ba.dot(&bp),
            discriminant: ab2 * ap2 - ab_ap * ab_ap,
        })
    }

    /// Parameter `s` of the projection of `P` onto the segment's line, `A + s·AB`.
    pub fn projection(&self) -> Value {
        self.ab_ap / self.ab2
    }

    /// `P` lies on the (infinite) line through `A` and `B`.
    pub fn is_collinear(&self) -> bool {
        self.discriminant <= DEGENERACY_EPSILON * self.ab2 * self.ap2
    }

    /// `P` lies on the segment itself, where every `J(k, i)` diverges.
    pub fn saturates(&self) -> bool {
        self.is_collinear() && (0.0..=1.0).contains(&self.projection())
    }

    /// `|AB| * ∫₀¹ t^k / |P - (A + t·AB)|^i dt`.
    ///
    /// Returns `NaN` outside the reduction family (`k >= i`).
    pub fn j(&self, k: u32, i: u32) -> Value {
        if k >= i {
            return Value::NAN;
        }
        self.reductions(i)[k as usize]
    }

    /// `J(k, i)` for every `k` in `0..i`.
    ///
    /// Off-line points use the closed-form reduction, filled row by row for
    /// every exponent up to `i`. Collinear points outside the span use the
    /// one-dimensional integral directly. Points on the segment give `+∞`.
    pub fn reductions(&self, i: u32) -> Vec<Value> {
        if self.saturates() {
            return vec![Value::INFINITY; i as usize];
        }
        if self.is_collinear() {
            return (0..i).map(|k| self.collinear_j(k, i)).collect();
        }

        let mut rows: Vec<Vec<Value>> = Vec::with_capacity(i as usize + 1);
        rows.push(Vec::new());
        for n in 1..=i {
            let row = self.reduction_row(n, &rows);
            rows.push(row);
        }
        rows.pop().unwrap_or_default()
    }

    /// Row `J(0..n, n)`, given the rows of every lower exponent.
    fn reduction_row(&self, n: u32, lower: &[Vec<Value>]) -> Vec<Value> {
        let fi = n as Value;
        let axial = self.projection();
        let bp_pow = self.bp_len.powi(2 - n as i32);
        let below = |k: u32| lower[n as usize - 2][k as usize];

        let mut row: Vec<Value> = Vec::with_capacity(n as usize);
        for k in 0..n {
            let fk = k as Value;
            let value = match (k, n) {
                (0, 1) => {
                    ((self.ab_len * self.bp_len + self.ba_bp)
                        / (self.ab_len * self.ap_len - self.ab_ap))
                        .ln()
                }
                (0, 2) => {
                    let root = self.discriminant.sqrt();
                    ((self.ba_bp / root).atan() + (self.ab_ap / root).atan()) * self.ab_len / root
                }
                (0, _) => {
                    self.ab_len / (fi - 2.0) / self.discriminant
                        * ((fi - 3.0) * self.ab_len * below(0)
                            + self.ba_bp / self.bp_len.powi(n as i32 - 2)
                            + self.ab_ap / self.ap_len.powi(n as i32 - 2))
                }
                (1, 2) => axial * row[0] + (self.bp_len / self.ap_len).ln() / self.ab_len,
                (1, _) => {
                    axial * row[0]
                        + (bp_pow - self.ap_len.powi(2 - n as i32)) / self.ab_len / (2.0 - fi)
                }
                (k, n) if k + 1 == n => {
                    axial * row[k as usize - 1]
                        + below(n - 3) / self.ab2
                        + bp_pow / (2.0 - fi) / self.ab_len
                }
                _ => {
                    (fi - 2.0 * fk) / (fi - fk - 1.0) * axial * row[k as usize - 1]
                        + (fk - 1.0) / (fi - fk - 1.0) * self.ap2 / self.ab2 * row[k as usize - 2]
                        - bp_pow / self.ab_len / (fi - fk - 1.0)
                }
            };
            row.push(value);
        }
        row
    }

    /// `J(k, i)` for a point on the line outside the span, where
    /// `|P - (A + t·AB)| = |AB|·|t - s|` and the integral is elementary.
    fn collinear_j(&self, k: u32, i: u32) -> Value {
        let s = self.projection();
        // t - s keeps one sign over [0, 1]; substitute u = sign·(t - s) > 0.
        let sign = if s < 0.0 { 1.0 } else { -1.0 };
        let (u0, u1) = (-sign * s, sign * (1.0 - s));

        let sum: Value = binomial_coefficients(k)
            .iter()
            .enumerate()
            .map(|(m, c)| {
                let p = m as i32 - i as i32;
                let integral = if p == -1 {
                    (u1 / u0).ln()
                } else {
                    (u1.powi(p + 1) - u0.powi(p + 1)) / (p + 1) as Value
                };
                c * s.powi(k as i32 - m as i32) * sign.powi(m as i32) * integral
            })
            .sum();

        self.ab_len.powi(1 - i as i32) * sign * sum
    }
}
