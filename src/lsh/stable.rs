//! # General p-Stable Sampling
//!
//! Chambers-Mallows-Stuck generation of standard stable variates
//! S(alpha, beta) with scale 1 and location 0, for alpha in (0, 2] and
//! skewness beta in [-1, 1]. This is the sampler behind hash families for
//! norms without a closed-form distribution.
//!
//! The method transforms one uniform angle U in (-pi/2, pi/2) and one unit
//! exponential W:
//!
//! ```text
//! alpha != 1:
//!   B = atan(beta tan(pi alpha / 2)) / alpha
//!   S = (1 + beta^2 tan^2(pi alpha / 2))^(1 / 2 alpha)
//!   X = S * sin(alpha (U + B)) / cos(U)^(1/alpha)
//!         * (cos(U - alpha (U + B)) / W)^((1 - alpha)/alpha)
//!
//! alpha == 1:
//!   X = (2/pi) * ((pi/2 + beta U) tan U
//!         - beta ln((pi/2) W cos U / (pi/2 + beta U)))
//! ```

use rand::Rng;
use rand_distr::Exp1;

use crate::config::FLOAT_ZERO;

/// Draws one standard stable variate S(alpha, beta; 1, 0).
pub fn sample_stable<R: Rng>(alpha: f32, beta: f32, rng: &mut R) -> f32 {
    debug_assert!(alpha > 0.0 && alpha <= 2.0);
    debug_assert!((-1.0..=1.0).contains(&beta));

    let half_pi = std::f32::consts::FRAC_PI_2;

    // U strictly inside (-pi/2, pi/2) so cos(U) stays positive.
    let u = loop {
        let g: f32 = rng.gen();
        if g > 0.0 {
            break std::f32::consts::PI * (g - 0.5);
        }
    };
    let w: f32 = rng.sample(Exp1);

    if (alpha - 1.0).abs() < FLOAT_ZERO {
        let shifted = half_pi + beta * u;
        return (2.0 / std::f32::consts::PI)
            * (shifted * u.tan() - beta * ((half_pi * w * u.cos()) / shifted).ln());
    }

    let tan_term = beta * (half_pi * alpha).tan();
    let b = tan_term.atan() / alpha;
    let s = (1.0 + tan_term * tan_term).powf(1.0 / (2.0 * alpha));

    s * (alpha * (u + b)).sin() / u.cos().powf(1.0 / alpha)
        * ((u - alpha * (u + b)).cos() / w).powf((1.0 - alpha) / alpha)
}
