/// Level-1 vector kernels over f32 buffers
///
/// Each primitive has a contiguous form and a `_strided` form taking an
/// element count and positive increments. Accumulation always runs from the
/// first element to the last so results are reproducible bit for bit.
///
/// Buffer sizes are the caller's responsibility; out-of-range access panics.

/// Input clamp for `sigmoid`
pub const SIGMOID_CLAMP: f32 = 20.0;

/// Dot product: `sum(x[i] * y[i])`
#[inline]
pub fn dot(x: &[f32], y: &[f32]) -> f32 {
    debug_assert_eq!(x.len(), y.len());
    x.iter().zip(y).fold(0.0f32, |acc, (&a, &b)| acc + a * b)
}

/// Dot product over `n` elements with increments `incx`, `incy`
pub fn dot_strided(n: usize, x: &[f32], incx: usize, y: &[f32], incy: usize) -> f32 {
    let mut acc = 0.0f32;
    for i in 0..n {
        acc += x[i * incx] * y[i * incy];
    }
    acc
}

/// Scaled accumulate: `y += alpha * x`
#[inline]
pub fn axpy(alpha: f32, x: &[f32], y: &mut [f32]) {
    debug_assert_eq!(x.len(), y.len());
    for (yi, &xi) in y.iter_mut().zip(x) {
        *yi += alpha * xi;
    }
}

/// Scaled accumulate over `n` elements with increments
pub fn axpy_strided(n: usize, alpha: f32, x: &[f32], incx: usize, y: &mut [f32], incy: usize) {
    for i in 0..n {
        y[i * incy] += alpha * x[i * incx];
    }
}

/// Euclidean norm, scaled to avoid overflow and underflow
pub fn nrm2(x: &[f32]) -> f32 {
    nrm2_strided(x.len(), x, 1)
}

/// Euclidean norm over `n` elements with increment `incx`
pub fn nrm2_strided(n: usize, x: &[f32], incx: usize) -> f32 {
    let mut scale = 0.0f32;
    let mut ssq = 1.0f32;

    for i in 0..n {
        let v = x[i * incx];
        if v != 0.0 {
            let a = v.abs();
            if scale < a {
                let r = scale / a;
                ssq = 1.0 + ssq * r * r;
                scale = a;
            } else {
                let r = a / scale;
                ssq += r * r;
            }
        }
    }

    scale * ssq.sqrt()
}

/// In-place scale: `x *= alpha`
#[inline]
pub fn scal(alpha: f32, x: &mut [f32]) {
    for v in x.iter_mut() {
        *v *= alpha;
    }
}

/// In-place scale over `n` elements with increment `incx`
pub fn scal_strided(n: usize, alpha: f32, x: &mut [f32], incx: usize) {
    for i in 0..n {
        x[i * incx] *= alpha;
    }
}

/// Logistic function with input clamped to `[-20, 20]`
#[inline]
pub fn sigmoid(x: f32) -> f32 {
    let x = x.clamp(-SIGMOID_CLAMP, SIGMOID_CLAMP);
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dot() {
        assert_eq!(dot(&[1.0, 2.0, 3.0], &[4.0, -5.0, 6.0]), 12.0);
        assert_eq!(dot(&[], &[]), 0.0);
    }

    #[test]
    fn test_dot_strided_matches_gathered() {
        let x = [1.0, 9.0, 2.0, 9.0, 3.0];
        let y = [4.0, 5.0, 6.0];
        assert_eq!(dot_strided(3, &x, 2, &y, 1), dot(&[1.0, 2.0, 3.0], &y));
    }

    #[test]
    fn test_axpy() {
        let mut y = vec![1.0, 1.0, 1.0];
        axpy(0.5, &[2.0, 4.0, -2.0], &mut y);
        assert_eq!(y, vec![2.0, 3.0, 0.0]);
    }

    #[test]
    fn test_axpy_strided_skips_elements() {
        let mut y = vec![0.0; 6];
        axpy_strided(3, 2.0, &[1.0, 2.0, 3.0], 1, &mut y, 2);
        assert_eq!(y, vec![2.0, 0.0, 4.0, 0.0, 6.0, 0.0]);
    }

    #[test]
    fn test_nrm2() {
        assert_eq!(nrm2(&[3.0, 4.0]), 5.0);
        assert_eq!(nrm2(&[0.0, 0.0]), 0.0);
        // naive sum of squares would overflow
        let big = nrm2(&[3e30, 4e30]);
        assert!((big / 5e30 - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_nrm2_strided() {
        let x = [3.0, 100.0, 4.0, 100.0];
        assert_eq!(nrm2_strided(2, &x, 2), 5.0);
    }

    #[test]
    fn test_scal() {
        let mut x = vec![1.0, -2.0, 4.0];
        scal(0.5, &mut x);
        assert_eq!(x, vec![0.5, -1.0, 2.0]);

        let mut y = vec![1.0, 1.0, 1.0, 1.0];
        scal_strided(2, 3.0, &mut y, 3);
        assert_eq!(y, vec![3.0, 1.0, 1.0, 3.0]);
    }

    #[test]
    fn test_sigmoid_clamps() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert_eq!(sigmoid(1000.0), sigmoid(20.0));
        assert_eq!(sigmoid(-1000.0), sigmoid(-20.0));
        assert!(sigmoid(-20.0) > 0.0);
        assert!(sigmoid(3.0) > sigmoid(2.0));
    }
}
