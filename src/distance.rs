//! # L_p Distance Kernel
//!
//! Scalar distance computation between two d-dimensional vectors under an
//! arbitrary L_p norm with p in (0, 2]. The three norms with closed-form
//! collision probabilities get dedicated loops; everything else goes
//! through `powf`.
//!
//! Functions here are pure and allocation-free; callers guarantee equal
//! slice lengths (the data store enforces dimensionality at its boundary).

/// L_p distance between `a` and `b` for p in (0, 2].
pub fn lp_dist(p: f32, a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());

    if (p - 2.0).abs() < crate::config::FLOAT_ZERO {
        l2_dist(a, b)
    } else if (p - 1.0).abs() < crate::config::FLOAT_ZERO {
        l1_dist(a, b)
    } else if (p - 0.5).abs() < crate::config::FLOAT_ZERO {
        let mut sum = 0.0f32;
        for (x, y) in a.iter().zip(b.iter()) {
            sum += (x - y).abs().sqrt();
        }
        sum * sum
    } else {
        let mut sum = 0.0f32;
        for (x, y) in a.iter().zip(b.iter()) {
            sum += (x - y).abs().powf(p);
        }
        sum.powf(1.0 / p)
    }
}

pub fn l2_dist(a: &[f32], b: &[f32]) -> f32 {
    let mut sum = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        let diff = x - y;
        sum += diff * diff;
    }
    sum.sqrt()
}

pub fn l1_dist(a: &[f32], b: &[f32]) -> f32 {
    let mut sum = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        sum += (x - y).abs();
    }
    sum
}

/// Dot product, used to project points onto hash vectors.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let mut sum = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        sum += x * y;
    }
    sum
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn l2_matches_euclidean() {
        let a = [0.0, 3.0];
        let b = [4.0, 0.0];
        assert!((lp_dist(2.0, &a, &b) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn l1_is_sum_of_absolute_differences() {
        let a = [1.0, -2.0, 3.0];
        let b = [0.0, 2.0, 1.0];
        assert!((lp_dist(1.0, &a, &b) - 7.0).abs() < 1e-6);
    }

    #[test]
    fn l_half_is_squared_sum_of_square_roots() {
        let a = [4.0, 0.0];
        let b = [0.0, 9.0];
        // (sqrt(4) + sqrt(9))^2 = 25
        assert!((lp_dist(0.5, &a, &b) - 25.0).abs() < 1e-4);
    }

    #[test]
    fn general_p_agrees_with_closed_forms() {
        let a = [1.0, 2.0, -1.5, 0.25];
        let b = [-0.5, 1.0, 2.0, 0.0];
        // the general powf path evaluated at p just off the closed forms
        assert!((lp_dist(1.0000001, &a, &b) - l1_dist(&a, &b)).abs() < 1e-3);
        assert!((lp_dist(1.9999999, &a, &b) - l2_dist(&a, &b)).abs() < 1e-3);
    }

    #[test]
    fn distance_to_self_is_zero() {
        let a = [0.3, -0.7, 1.9];
        for p in [0.5, 1.0, 1.3, 2.0] {
            assert_eq!(lp_dist(p, &a, &a), 0.0);
        }
    }

    #[test]
    fn distance_is_symmetric() {
        let a = [1.0, 2.0, 3.0];
        let b = [-1.0, 0.5, 2.0];
        for p in [0.5, 1.0, 1.3, 2.0] {
            assert!((lp_dist(p, &a, &b) - lp_dist(p, &b, &a)).abs() < 1e-6);
        }
    }

    #[test]
    fn dot_product() {
        assert_eq!(dot(&[1.0, 2.0, 3.0], &[4.0, -5.0, 6.0]), 12.0);
    }
}
