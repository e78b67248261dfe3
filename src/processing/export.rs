//! CSV export of simulation results. Only demos and callers do file I/O;
//! the solver core never touches the filesystem.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::processing::result::SimResult;

/// Write equal-length columns as CSV with one header per column.
pub fn write_csv<P: AsRef<Path>>(path: P, headers: &[&str], columns: &[&[f64]]) -> io::Result<()> {
    if headers.len() != columns.len() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "{} headers for {} columns",
                headers.len(),
                columns.len()
            ),
        ));
    }
    let rows = columns.iter().map(|c| c.len()).max().unwrap_or(0);

    let mut file = File::create(path)?;
    writeln!(file, "{}", headers.join(","))?;
    for i in 0..rows {
        let row: Vec<String> = columns
            .iter()
            .map(|col| col.get(i).map_or(String::new(), |v| format!("{v:.9e}")))
            .collect();
        writeln!(file, "{}", row.join(","))?;
    }
    Ok(())
}

/// Export the medium history: time, CF, instantaneous and cumulative flux.
pub fn write_cf_history<P: AsRef<Path>>(path: P, result: &SimResult) -> io::Result<()> {
    write_csv(
        path,
        &["t_s", "cf", "flux", "cumulative_flux"],
        &[
            result.times(),
            result.cf(),
            result.flux(),
            result.cumulative_flux(),
        ],
    )
}

/// Export the reconstructed wall profile at time `t` [s].
pub fn write_profile<P: AsRef<Path>>(path: P, result: &SimResult, t: f64) -> io::Result<()> {
    let profile = result
        .profile_at(t)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;
    write_csv(path, &["x_m", "c"], &[profile.x(), profile.c()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn writes_padded_columns() {
        let path = std::env::temp_dir().join("fvmig_export_test.csv");
        let (a, b) = ([1.0, 2.0], [3.0]);
        write_csv(&path, &["a", "b"], &[&a[..], &b[..]]).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("a,b"));
        assert_eq!(content.lines().count(), 3);
        fs::remove_file(&path).ok();
    }

    #[test]
    fn rejects_header_mismatch() {
        let path = std::env::temp_dir().join("fvmig_export_mismatch.csv");
        let (a, b) = ([1.0], [2.0]);
        assert!(write_csv(&path, &["a"], &[&a[..], &b[..]]).is_err());
    }
}
