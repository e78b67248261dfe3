//! Chained contacts, resume/concatenation identities and the error surface.

use approx::assert_relative_eq;
use fvmig_rs::models::medium::Medium;
use fvmig_rs::models::packaging::{Layer, Multilayer};
use fvmig_rs::numerics::{sqrt_spaced, IntegrationOptions, Tolerances};
use fvmig_rs::scenario::{chain, resume_from_record, simulate, ContactStep};
use fvmig_rs::Error;

const DAY: f64 = 86_400.0;
const MONTH: f64 = 30.0 * DAY;

fn two_layer_wall() -> Multilayer {
    Multilayer::new(vec![
        Layer::new(50e-6, 1e-15, 1.0, 0.0, 24).unwrap(),
        Layer::new(100e-6, 1e-13, 5.0, 200.0, 24).unwrap(),
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

/// Discrete wall inventory per contact area [concentration * m].
fn wall_inventory(result: &fvmig_rs::processing::result::SimResult) -> f64 {
    result
        .restart()
        .cells
        .iter()
        .zip(result.mesh().cells())
        .map(|(c, cell)| c * cell.width)
        .sum()
}

#[test]
fn split_run_matches_the_one_shot_run() {
    let wall = two_layer_wall();
    let medium = Medium::new(0.6, 1e-3, 2.0, 0.0).unwrap();
    let (t1, t2) = (20.0 * DAY, 40.0 * DAY);

    let one_shot = simulate(&wall, &medium, &tight(sqrt_spaced(t1 + t2, 300))).unwrap();

    let first = simulate(&wall, &medium, &tight(sqrt_spaced(t1, 200))).unwrap();
    let second = first.resume(sqrt_spaced(t2, 200)).unwrap();
    let merged = first.concat(&second, false).unwrap();

    // strictly increasing merged time axis reaching t1 + t2
    assert!(merged.times().windows(2).all(|w| w[1] > w[0]));
    assert_relative_eq!(*merged.times().last().unwrap(), t1 + t2, max_relative = 1e-12);

    let cf_split = *merged.cf().last().unwrap();
    let cf_one_shot = one_shot.cf_at(t1 + t2);
    assert_relative_eq!(cf_split, cf_one_shot, max_relative = 1e-3);

    // CF continuous at the junction by construction
    let junction = first.cf().last().unwrap();
    assert_relative_eq!(second.cf()[0], *junction, max_relative = 1e-12, epsilon = 1e-15);
}

#[test]
fn savestate_record_restarts_identically() {
    let wall = two_layer_wall();
    let medium = Medium::new(0.6, 1e-3, 2.0, 0.0).unwrap();
    let first = simulate(&wall, &medium, &tight(sqrt_spaced(10.0 * DAY, 150))).unwrap();

    let record = first.savestate();
    assert_eq!(record.layers.len(), 2);
    assert_eq!(record.cells.len(), first.n_cells());
    assert!((record.cf - first.cf().last().unwrap()).abs() < 1e-12);

    let grid = sqrt_spaced(5.0 * DAY, 100);
    let via_record = resume_from_record(&record, grid.clone()).unwrap();
    let via_result = first.resume(grid).unwrap();
    for (a, b) in via_record.cf().iter().zip(via_result.cf()) {
        assert_relative_eq!(*a, *b, max_relative = 1e-12, epsilon = 1e-15);
    }
}

#[test]
fn chained_contacts_conserve_the_inventory() {
    // 4 months of contact, then a fresh medium for 6 months. The mass lost
    // by the wall must equal the sum of the per-run desorbed amounts.
    let wall = two_layer_wall();
    let medium = |cf0: f64| Medium::new(0.6, 1e-3, 2.0, cf0).unwrap();
    let steps = vec![
        ContactStep::new(medium(0.0), sqrt_spaced(4.0 * MONTH, 150)),
        ContactStep::new(medium(0.0), sqrt_spaced(6.0 * MONTH, 150)),
    ];

    let results = chain("storage-then-use", &wall, &steps, &tight(vec![1.0])).unwrap();
    assert_eq!(results.len(), 2);

    // wall profile continuous across the hand-off
    let handoff = results[1].c_wall_at(0.0);
    for (a, b) in handoff.iter().zip(&results[0].restart().cells) {
        assert_relative_eq!(*a, *b, max_relative = 1e-10, epsilon = 1e-12);
    }

    let area = 0.6;
    let volume = 1e-3;
    let initial_inventory = 100e-6 * 200.0; // [concentration * m] per area
    let final_inventory = wall_inventory(&results[1]);
    let desorbed: f64 = results
        .iter()
        .map(|r| r.cf().last().unwrap() * volume / area)
        .sum();

    assert_relative_eq!(
        initial_inventory,
        final_inventory + desorbed,
        max_relative = 1e-5
    );

    // each fresh medium starts clean again
    assert!(results[1].cf()[0].abs() < 1e-12);
    assert!(results[1].cf().last().unwrap() > &0.0);
}

#[test]
fn reoriented_chain_step_flips_the_profile() {
    let wall = two_layer_wall();
    let medium = Medium::new(0.6, 1e-3, 2.0, 0.0).unwrap();
    let steps = vec![
        ContactStep::new(medium.clone(), sqrt_spaced(2.0 * MONTH, 120)),
        ContactStep::new(medium, sqrt_spaced(2.0 * MONTH, 120)).reoriented(),
    ];

    let results = chain("flip", &wall, &steps, &tight(vec![1.0])).unwrap();

    // after reorientation the contact layer is the one that held the migrant
    let first_cells = &results[0].restart().cells;
    let second_start = results[1].c_wall_at(0.0);
    let n = first_cells.len();
    for i in 0..n {
        assert_relative_eq!(
            second_start[i],
            first_cells[n - 1 - i],
            max_relative = 1e-10,
            epsilon = 1e-12
        );
    }
    for result in &results {
        assert!(result.mass_balance_drift() < 1e-5);
    }
}

#[test]
fn incompatible_results_refuse_to_concatenate() {
    let medium = Medium::new(1.0, 1e-3, 1.0, 0.0).unwrap();
    let grid = sqrt_spaced(1.0 * DAY, 60);

    let coarse = Multilayer::single(Layer::new(100e-6, 1e-14, 1.0, 100.0, 12).unwrap());
    let fine = Multilayer::single(Layer::new(100e-6, 1e-14, 1.0, 100.0, 16).unwrap());

    let a = simulate(&coarse, &medium, &tight(grid.clone())).unwrap();
    let b = simulate(&fine, &medium, &tight(grid)).unwrap();

    match a.concat(&b, false) {
        Err(Error::IncompatibleComposition(_)) => {}
        Err(e) => panic!("expected IncompatibleComposition, got {e}"),
        Ok(_) => panic!("expected IncompatibleComposition, got a merged result"),
    }
}

#[test]
fn cf_discontinuity_requires_an_explicit_rebase() {
    let wall = Multilayer::single(Layer::new(100e-6, 1e-14, 1.0, 100.0, 16).unwrap());
    let grid = sqrt_spaced(1.0 * DAY, 60);
    let clean = Medium::new(1.0, 1e-3, 1.0, 0.0).unwrap();
    let loaded = Medium::new(1.0, 1e-3, 1.0, 50.0).unwrap();

    let a = simulate(&wall, &clean, &tight(grid.clone())).unwrap();
    let b = simulate(&wall, &loaded, &tight(grid)).unwrap();

    assert!(matches!(
        a.concat(&b, false),
        Err(Error::IncompatibleComposition(_))
    ));

    let rebased = a.concat(&b, true).unwrap();
    // the follow-up history is shifted by exactly the junction gap
    let n_a = a.cf().len();
    let shift = a.cf().last().unwrap() - b.cf()[0];
    assert_relative_eq!(
        rebased.cf()[n_a],
        b.cf()[1] + shift,
        max_relative = 1e-12,
        epsilon = 1e-12
    );
}

#[test]
fn step_budget_surfaces_as_cancelled_with_the_step_index() {
    let wall = two_layer_wall();
    let medium = Medium::new(0.6, 1e-3, 2.0, 0.0).unwrap();
    let mut options = tight(vec![1.0]);
    options.max_steps = Some(2);

    let steps = vec![ContactStep::new(medium, sqrt_spaced(1.0 * DAY, 30))];
    match chain("budget", &wall, &steps, &options) {
        Err(Error::Cancelled { chain_step, .. }) => assert_eq!(chain_step, Some(0)),
        Err(e) => panic!("expected Cancelled, got {e}"),
        Ok(_) => panic!("expected Cancelled, got results"),
    }
}
