//! Two-layer wall against an aqueous-like medium: run, report, export.

use std::fs;

use fvmig_rs::models::medium::Medium;
use fvmig_rs::models::packaging::{Layer, Multilayer};
use fvmig_rs::numerics::{sqrt_spaced, IntegrationOptions};
use fvmig_rs::processing::export::{write_cf_history, write_profile};
use fvmig_rs::processing::summary::RunReport;
use fvmig_rs::scenario::simulate_named;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    fs::create_dir_all("output/two_layer")?;

    let day = 86_400.0;
    let wall = Multilayer::new(vec![
        Layer::new(50e-6, 1e-15, 1.0, 0.0, 40)?,
        Layer::new(100e-6, 1e-13, 5.0, 200.0, 40)?,
    ])?;
    let medium = Medium::new(0.6, 1e-3, 2.0, 0.0)?;

    let mut options = IntegrationOptions::over(sqrt_spaced(30.0 * day, 400));
    options.mesh.min_cells_per_layer = 1;

    let result = simulate_named("two_layer", &wall, &medium, &options)?;
    println!("{}", RunReport::from_result(&result));

    write_cf_history("output/two_layer/cf.csv", &result)?;
    for days in [1.0, 10.0, 30.0] {
        write_profile(
            format!("output/two_layer/profile_{days:.0}d.csv"),
            &result,
            days * day,
        )?;
    }
    println!("histories saved under output/two_layer/");
    Ok(())
}
