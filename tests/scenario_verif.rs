//! Scenario-level verification: partition equilibria, functional barriers,
//! symmetric and periodic far faces, and the universal invariants.

use approx::assert_relative_eq;
use fvmig_rs::models::medium::Medium;
use fvmig_rs::models::packaging::{Layer, Multilayer};
use fvmig_rs::numerics::{sqrt_spaced, IntegrationOptions, Tolerances};
use fvmig_rs::physics::operator::FarBoundary;
use fvmig_rs::scenario::simulate;

const DAY: f64 = 86_400.0;

fn two_layer_wall() -> Multilayer {
    Multilayer::new(vec![
        Layer::new(50e-6, 1e-15, 1.0, 0.0, 30).unwrap(),
        Layer::new(100e-6, 1e-13, 5.0, 200.0, 30).unwrap(),
    ])
    .unwrap()
}

fn tight(grid: Vec<f64>) -> IntegrationOptions {
    let mut options = IntegrationOptions::over(grid);
    options.tol = Tolerances {
        abs: 1e-10,
        rel: 1e-8,
    };
    options.mesh.min_cells_per_layer = 1;
    options
}

#[test]
fn two_layer_partition_equilibrium() {
    // Medium k_F = 2 against layers with k = 1 and k = 5: at steady state
    // the potential is uniform, so C_1 / 1 = C_2 / 5 = C_F / 2.
    let wall = two_layer_wall();
    let medium = Medium::new(0.6, 1e-3, 2.0, 0.0).unwrap();
    let result = simulate(&wall, &medium, &tight(sqrt_spaced(2e9, 300))).unwrap();

    // equilibrium from total-mass conservation
    let dilution = 0.09;
    let cf_eq = dilution * (2.0 / 3.0) * 200.0
        / (1.0 + dilution * (0.5 / 3.0 + 2.5 * 2.0 / 3.0));

    let cf_end = *result.cf().last().unwrap();
    assert_relative_eq!(cf_end, cf_eq, max_relative = 1e-3);

    let cells = result.c_wall_at(*result.times().last().unwrap());
    let phi = cf_end / 2.0;
    for (i, c) in cells.iter().enumerate() {
        let k = if i < 30 { 1.0 } else { 5.0 };
        assert_relative_eq!(*c, phi * k, max_relative = 2e-3);
    }
}

#[test]
fn invariants_along_the_transient() {
    let wall = two_layer_wall();
    let medium = Medium::new(0.6, 1e-3, 2.0, 0.0).unwrap();
    let result = simulate(&wall, &medium, &tight(sqrt_spaced(30.0 * DAY, 200))).unwrap();

    // mass conservation at every snapshot
    assert!(result.mass_balance_drift() < 1e-5);
    assert!(result.warnings().is_empty());

    // CF non-decreasing from a clean medium, never negative
    let cf = result.cf();
    assert!(cf[0].abs() < 1e-12);
    let c_scale = result.scales().concentration;
    for pair in cf.windows(2) {
        assert!(pair[1] >= pair[0] - 1e-9 * c_scale);
    }

    // non-negative concentrations everywhere
    let floor = -1e-7 * c_scale;
    for &t in &[result.times()[20], result.times()[100], *result.times().last().unwrap()] {
        assert!(result.c_wall_at(t).iter().all(|c| *c >= floor));
    }

    // Henry jump at the material interface: C-/k1 == C+/k2 on the
    // reconstructed profile
    let t_mid = result.times()[120];
    let profile = result.profile_at(t_mid).unwrap();
    let c = profile.c();
    let (left, right) = (c[3 * 30 - 1], c[3 * 30]);
    assert_relative_eq!(left / 1.0, right / 5.0, max_relative = 1e-9, epsilon = 1e-12);
}

#[test]
fn functional_barrier_cuts_migration_by_orders_of_magnitude() {
    let barrier = || Layer::new(20e-6, 1e-16, 1.0, 0.0, 16).unwrap();
    let core = Layer::new(500e-6, 1e-13, 1.0, 500.0, 48).unwrap();
    let medium = Medium::new(0.6, 1e-3, 1.0, 0.0).unwrap();
    let grid = sqrt_spaced(10.0 * DAY, 200);

    let shielded = Multilayer::new(vec![barrier(), core.clone(), barrier()]).unwrap();
    let bare = Multilayer::single(core);

    let cf_shielded = *simulate(&shielded, &medium, &tight(grid.clone()))
        .unwrap()
        .cf()
        .last()
        .unwrap();
    let cf_bare = *simulate(&bare, &medium, &tight(grid)).unwrap().cf().last().unwrap();

    println!("CF shielded {cf_shielded:.4e}, bare {cf_bare:.4e}");
    assert!(cf_shielded >= 0.0);
    assert!(
        cf_shielded * 100.0 < cf_bare,
        "barrier only gained {:.1}x",
        cf_bare / cf_shielded.max(1e-300)
    );
}

#[test]
fn symmetric_far_face_reports_half_of_the_doubled_problem() {
    // Two-sided mirrored stack: only half of the doubled inventory reaches
    // the contact-side medium, so CF is half the CF of the equivalent
    // doubled-thickness run with an impermeable far face.
    let half = Multilayer::new(vec![
        Layer::new(100e-6, 1e-13, 1.0, 0.0, 24).unwrap(),
        Layer::new(50e-6, 1e-13, 2.0, 400.0, 12).unwrap(),
    ])
    .unwrap();
    let medium = Medium::new(0.5, 1e-3, 1.0, 0.0).unwrap();
    let grid = sqrt_spaced(20.0 * DAY, 150);

    let mut sym_options = tight(grid.clone());
    sym_options.far_boundary = FarBoundary::Symmetric;
    let symmetric = simulate(&half, &medium, &sym_options).unwrap();

    let doubled = simulate(&half.mirrored(), &medium, &tight(grid)).unwrap();

    // the profile spans the full doubled domain
    assert_eq!(symmetric.n_cells(), 72);
    assert_eq!(symmetric.n_cells(), doubled.n_cells());
    for (a, b) in symmetric.cf().iter().zip(doubled.cf()) {
        assert_relative_eq!(2.0 * *a, *b, max_relative = 1e-9, epsilon = 1e-12);
    }
    for (a, b) in symmetric.flux().iter().zip(doubled.flux()) {
        assert_relative_eq!(2.0 * *a, *b, max_relative = 1e-9, epsilon = 1e-12);
    }
    assert!(symmetric.mass_balance_drift() < 1e-5);

    // the half-credit view survives a resume
    let resumed = symmetric.resume(sqrt_spaced(5.0 * DAY, 60)).unwrap();
    assert_relative_eq!(
        resumed.cf()[0],
        *symmetric.cf().last().unwrap(),
        max_relative = 1e-12,
        epsilon = 1e-15
    );
}

#[test]
fn periodic_wrapping_relaxes_to_a_uniform_state() {
    // uniform k: periodic wrapping mixes the stack to its mean concentration
    let wall = Multilayer::new(vec![
        Layer::new(100e-6, 1e-13, 1.0, 300.0, 12).unwrap(),
        Layer::new(100e-6, 1e-14, 1.0, 0.0, 12).unwrap(),
    ])
    .unwrap();
    let medium = Medium::new(1.0, 1e-3, 1.0, 7.0).unwrap();
    let mut options = tight(sqrt_spaced(3e9, 150));
    options.far_boundary = FarBoundary::Periodic;

    let result = simulate(&wall, &medium, &options).unwrap();

    // no exchange with the medium under wrapping
    assert!(result.cf().iter().all(|cf| (cf - 7.0).abs() < 1e-12));
    assert!(result.flux().iter().all(|f| f.abs() < 1e-300));
    assert!(result.mass_balance_drift() < 1e-5);

    let t_end = *result.times().last().unwrap();
    for c in result.c_wall_at(t_end) {
        assert_relative_eq!(c, 150.0, max_relative = 1e-2);
    }
}

#[test]
fn film_resistance_slows_the_transfer() {
    let wall = Multilayer::single(Layer::new(100e-6, 1e-14, 1.0, 1000.0, 64).unwrap());
    let open = Medium::new(1.0, 1e-3, 1.0, 0.0).unwrap();
    let filmed = open.clone().with_film(5e-10).unwrap();
    let grid = sqrt_spaced(5.0 * DAY, 150);

    let cf_open = *simulate(&wall, &open, &tight(grid.clone())).unwrap().cf().last().unwrap();
    let cf_filmed = *simulate(&wall, &filmed, &tight(grid)).unwrap().cf().last().unwrap();

    assert!(cf_filmed > 0.0);
    assert!(cf_filmed < cf_open, "film {cf_filmed:.4} vs open {cf_open:.4}");
}
