//! Setoff during storage: a printed film wound on itself redistributes its
//! migrant under periodic wrapping, then contacts a fresh medium.

use std::fs;

use fvmig_rs::models::medium::Medium;
use fvmig_rs::models::packaging::{Layer, Multilayer};
use fvmig_rs::numerics::{sqrt_spaced, IntegrationOptions};
use fvmig_rs::physics::operator::FarBoundary;
use fvmig_rs::processing::export::{write_cf_history, write_profile};
use fvmig_rs::processing::summary::RunReport;
use fvmig_rs::scenario::{chain, ContactStep};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    fs::create_dir_all("output/setoff")?;

    let day = 86_400.0;
    // ink-bearing outer layer on a clean substrate
    let film = Multilayer::new(vec![
        Layer::new(300e-6, 1e-14, 1.0, 5000.0, 30)?,
        Layer::new(500e-6, 1e-13, 1.0, 0.0, 30)?,
    ])?;

    let mut options = IntegrationOptions::over(Vec::new());
    options.mesh.min_cells_per_layer = 1;

    // 100 days wound on itself, then 10 days of real contact on the
    // substrate side through an external film resistance
    let storage = Medium::new(1.0, 1e-3, 1.0, 0.0)?;
    let simulant = Medium::new(1.0, 1e-3, 1.0, 0.0)?.with_film(1e-7)?;
    let steps = vec![
        ContactStep::new(storage, sqrt_spaced(100.0 * day, 300))
            .with_far_boundary(FarBoundary::Periodic),
        ContactStep::new(simulant, sqrt_spaced(10.0 * day, 300)).reoriented(),
    ];

    let results = chain("setoff", &film, &steps, &options)?;
    for result in &results {
        println!("{}", RunReport::from_result(result));
    }

    write_profile(
        "output/setoff/storage_profile.csv",
        &results[0],
        100.0 * day,
    )?;
    write_cf_history("output/setoff/contact_cf.csv", &results[1])?;
    println!("results saved under output/setoff/");
    Ok(())
}
