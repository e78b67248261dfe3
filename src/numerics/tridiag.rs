//! Direct solvers for the banded systems produced by the flux operator.

/// Solve a tridiagonal system with the Thomas algorithm.
///
/// - `lower[i]` is the entry (i+1, i)
/// - `main[i]` the entry (i, i)
/// - `upper[i]` the entry (i, i+1)
///
/// The implicit-step matrices of this crate are strictly diagonally dominant,
/// so no pivoting is needed.
pub fn solve(lower: &[f64], main: &[f64], upper: &[f64], rhs: &[f64]) -> Vec<f64> {
    let n = main.len();
    debug_assert!(n > 0);
    debug_assert_eq!(lower.len(), n - 1);
    debug_assert_eq!(upper.len(), n - 1);
    debug_assert_eq!(rhs.len(), n);

    let mut c_prime = vec![0.0; n];
    let mut d_prime = vec![0.0; n];

    // forward sweep
    c_prime[0] = if n > 1 { upper[0] / main[0] } else { 0.0 };
    d_prime[0] = rhs[0] / main[0];
    for i in 1..n {
        let den = main[i] - lower[i - 1] * c_prime[i - 1];
        debug_assert!(den.abs() > 0.0, "singular pivot at row {i}");
        if i < n - 1 {
            c_prime[i] = upper[i] / den;
        }
        d_prime[i] = (rhs[i] - lower[i - 1] * d_prime[i - 1]) / den;
    }

    // back substitution
    let mut x = vec![0.0; n];
    x[n - 1] = d_prime[n - 1];
    for i in (0..n - 1).rev() {
        x[i] = d_prime[i] - c_prime[i] * x[i + 1];
    }
    x
}

/// Solve a cyclic tridiagonal system (corner entries `top_right` at (0, n-1)
/// and `bottom_left` at (n-1, 0)) via the Sherman-Morrison correction.
///
/// Requires n >= 3; smaller ring systems collapse into the plain bands.
pub fn solve_cyclic(
    lower: &[f64],
    main: &[f64],
    upper: &[f64],
    top_right: f64,
    bottom_left: f64,
    rhs: &[f64],
) -> Vec<f64> {
    let n = main.len();
    debug_assert!(n >= 3);

    // A = T + u v^T with u = [gamma, 0.., bl], v = [1, 0.., tr/gamma]
    let gamma = -main[0];
    let mut modified = main.to_vec();
    modified[0] = main[0] - gamma;
    modified[n - 1] = main[n - 1] - top_right * bottom_left / gamma;

    let mut u = vec![0.0; n];
    u[0] = gamma;
    u[n - 1] = bottom_left;

    let y = solve(lower, &modified, upper, rhs);
    let z = solve(lower, &modified, upper, &u);

    let v_last = top_right / gamma;
    let factor = (y[0] + v_last * y[n - 1]) / (1.0 + z[0] + v_last * z[n - 1]);

    y.iter().zip(&z).map(|(yi, zi)| yi - factor * zi).collect()
}
