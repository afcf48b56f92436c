use bcbias_core::modules::DatasetStore;
use bcbias_core::storage::{GridDataset, JsonDatasetStore};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

const JAN: &str = "GEOSChem.BoundaryConditions.20160101_0000z.nc4";
const MAR: &str = "GEOSChem.BoundaryConditions.20160301_0000z.nc4";

fn bcbias(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_bcbias"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("bcbias should launch")
}

fn stdout_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn path_arg(path: &Path) -> &str {
    path.to_str().expect("temp paths should be UTF-8")
}

/// Lays out `run/step3/<bias>` and `gccache/` under a fresh temp dir.
fn setup_workspace(temp: &TempDir) -> (PathBuf, PathBuf) {
    let workdir = temp.path().join("run");
    let gccache = temp.path().join("gccache");
    fs::create_dir_all(workdir.join("step3")).expect("step3 should be created");
    fs::create_dir_all(&gccache).expect("gccache should be created");

    GridDataset::new()
        .with_dimension("time", 2)
        .with_dimension("lat", 2)
        .with_dimension("lon", 2)
        .with_variable(
            "Bias",
            &["time", "lat", "lon"],
            vec![1.0e9, 1.0e9, 1.0e9, 1.0e9, 2.0e9, 2.0e9, 2.0e9, 2.0e9],
        )
        .with_variable("time", &["time"], vec![20160101.0, 20160201.0])
        .write(&workdir.join("step3/Bias_4x5_dk_2_updated.nc"))
        .expect("bias fixture should be written");

    (workdir, gccache)
}

fn write_species(dir: &Path, name: &str, lat: usize, lon: usize) {
    GridDataset::new()
        .with_dimension("time", 1)
        .with_dimension("lev", 47)
        .with_dimension("lat", lat)
        .with_dimension("lon", lon)
        .with_variable(
            "SpeciesBC_CH4",
            &["time", "lev", "lat", "lon"],
            vec![10.0; 47 * lat * lon],
        )
        .write(&dir.join(name))
        .expect("species fixture should be written");
}

#[test]
fn run_corrects_matched_files_and_writes_report() {
    let temp = TempDir::new().expect("tempdir should be created");
    let (workdir, gccache) = setup_workspace(&temp);
    write_species(&gccache, JAN, 2, 2);
    write_species(&gccache, MAR, 2, 2);
    let report_path = temp.path().join("reports/run.json");

    let output = bcbias(&[
        "run",
        "--workdir",
        path_arg(&workdir),
        "--input-dir",
        path_arg(&gccache),
        "--format",
        "json",
        "--report",
        path_arg(&report_path),
    ]);

    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr_of(&output));
    let stdout = stdout_of(&output);
    assert!(stdout.contains("Correction status: PASS"));
    assert!(stdout.contains("Files: 2 total (1 written, 1 skipped, 0 failed)"));
    assert!(stdout.contains("JSON report:"));

    let corrected = workdir.join("smoothed-boundary-conditions").join(JAN);
    let field = JsonDatasetStore
        .read_species(&corrected, "SpeciesBC_CH4")
        .expect("corrected output should read");
    assert!(field.iter().all(|value| *value == 9.0));
    assert!(!workdir.join("smoothed-boundary-conditions").join(MAR).exists());

    let report: Value = serde_json::from_str(
        &fs::read_to_string(&report_path).expect("report should be written"),
    )
    .expect("report should parse");
    assert_eq!(report["passed"], Value::Bool(true));
    assert_eq!(report["written_count"], 1);
    assert_eq!(report["outcomes"][1]["state"], "Skipped");
}

#[test]
fn skip_is_logged_as_warning() {
    let temp = TempDir::new().expect("tempdir should be created");
    let (workdir, gccache) = setup_workspace(&temp);
    write_species(&gccache, MAR, 2, 2);

    let output = bcbias(&[
        "run",
        "--workdir",
        path_arg(&workdir),
        "--input-dir",
        path_arg(&gccache),
        "--format",
        "json",
    ]);

    assert_eq!(output.status.code(), Some(0));
    let stderr = stderr_of(&output);
    assert!(stderr.contains("WARN"), "stderr: {stderr}");
    assert!(stderr.contains("no bias entry for date key"));
}

#[test]
fn run_reads_settings_file_with_relative_paths() {
    let temp = TempDir::new().expect("tempdir should be created");
    let (workdir, gccache) = setup_workspace(&temp);
    write_species(&gccache, JAN, 2, 2);
    let config_path = temp.path().join("bcbias.json");
    fs::write(
        &config_path,
        r#"{
  "workdir": "run",
  "gccache": "gccache",
  "outputDir": "corrected",
  "format": "json",
  "executionMode": "parallel"
}
"#,
    )
    .expect("config should be written");

    let output = bcbias(&["run", "--config", path_arg(&config_path)]);

    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr_of(&output));
    assert!(workdir.join("corrected").join(JAN).is_file());
}

#[test]
fn file_failure_exits_with_one_and_keeps_going() {
    let temp = TempDir::new().expect("tempdir should be created");
    let (workdir, gccache) = setup_workspace(&temp);
    write_species(&gccache, JAN, 3, 2);
    write_species(&gccache, "GEOSChem.BoundaryConditions.20160201_0000z.nc4", 2, 2);

    let output = bcbias(&[
        "run",
        "--workdir",
        path_arg(&workdir),
        "--input-dir",
        path_arg(&gccache),
        "--format",
        "json",
        "--parallel",
    ]);

    assert_eq!(output.status.code(), Some(1));
    let stdout = stdout_of(&output);
    assert!(stdout.contains("Correction status: FAIL"));
    assert!(stdout.contains("[DATA.GRID_MISMATCH]"));
    let output_dir = workdir.join("smoothed-boundary-conditions");
    assert!(!output_dir.join(JAN).exists());
    assert!(
        output_dir
            .join("GEOSChem.BoundaryConditions.20160201_0000z.nc4")
            .is_file()
    );
}

#[test]
fn missing_bias_dataset_is_fatal() {
    let temp = TempDir::new().expect("tempdir should be created");
    let workdir = temp.path().join("empty");
    fs::create_dir_all(&workdir).expect("workdir should be created");

    let output = bcbias(&[
        "run",
        "--workdir",
        path_arg(&workdir),
        "--input-dir",
        path_arg(&workdir),
        "--format",
        "json",
    ]);

    assert_eq!(output.status.code(), Some(5));
    let stderr = stderr_of(&output);
    assert!(stderr.contains("ERROR: [IO.DATASET_READ]"), "stderr: {stderr}");
    assert!(stderr.contains("FATAL EXIT CODE: 5"));
}

#[test]
fn run_without_inputs_is_a_usage_error() {
    let temp = TempDir::new().expect("tempdir should be created");
    let output = bcbias(&["run", "--workdir", path_arg(temp.path())]);

    assert_eq!(output.status.code(), Some(2));
    assert!(stderr_of(&output).contains("ERROR: [INPUT.CLI_USAGE]"));
}

#[test]
fn unknown_format_is_a_usage_error() {
    let temp = TempDir::new().expect("tempdir should be created");
    let output = bcbias(&[
        "run",
        "--workdir",
        path_arg(temp.path()),
        "--input-dir",
        path_arg(temp.path()),
        "--format",
        "grib",
    ]);

    assert_eq!(output.status.code(), Some(2));
    assert!(stderr_of(&output).contains("grib"));
}

#[test]
fn bias_keys_lists_keys_and_grid() {
    let temp = TempDir::new().expect("tempdir should be created");
    let (workdir, _) = setup_workspace(&temp);

    let output = bcbias(&["bias-keys", "--workdir", path_arg(&workdir), "--format", "json"]);

    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr_of(&output));
    let stdout = stdout_of(&output);
    assert!(stdout.contains("Grid: 2x2"));
    assert!(stdout.contains("Date keys (2):"));
    assert!(stdout.contains("  20160101\n"));
    assert!(stdout.contains("  20160201\n"));
}

#[test]
fn date_key_prints_extracted_keys() {
    let output = bcbias(&["date-key", JAN, MAR]);

    assert_eq!(output.status.code(), Some(0));
    let stdout = stdout_of(&output);
    assert!(stdout.contains(&format!("{JAN}\t20160101")));
    assert!(stdout.contains(&format!("{MAR}\t20160301")));
}

#[test]
fn date_key_reports_unparsable_names() {
    let output = bcbias(&["date-key", JAN, "restart.nc4"]);

    assert_eq!(output.status.code(), Some(3));
    assert!(stdout_of(&output).contains("20160101"));
    assert!(stderr_of(&output).contains("ERROR: [PARSE.DATE_KEY]"));
}

#[test]
fn help_exits_successfully() {
    let output = bcbias(&["--help"]);
    assert_eq!(output.status.code(), Some(0));
    assert!(stdout_of(&output).contains("bias-keys"));
}

#[test]
fn workdir_flag_overrides_settings_file_locations() {
    let temp = TempDir::new().expect("tempdir should be created");
    let (_, gccache) = setup_workspace(&temp);
    write_species(&gccache, JAN, 2, 2);
    let other = temp.path().join("other");
    fs::create_dir_all(other.join("step3")).expect("other step3 should be created");
    fs::rename(
        temp.path().join("run/step3/Bias_4x5_dk_2_updated.nc"),
        other.join("step3/Bias_4x5_dk_2_updated.nc"),
    )
    .expect("bias should move under the other workdir");
    let config_path = temp.path().join("bcbias.json");
    fs::write(
        &config_path,
        r#"{ "workdir": "run", "gccache": "gccache", "format": "json" }"#,
    )
    .expect("config should be written");

    let output = bcbias(&[
        "run",
        "--config",
        path_arg(&config_path),
        "--workdir",
        path_arg(&other),
    ]);

    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr_of(&output));
    assert!(other.join("smoothed-boundary-conditions").join(JAN).is_file());
    assert!(!temp.path().join("run/smoothed-boundary-conditions").exists());
}

#[test]
fn shared_yaml_settings_file_is_accepted() {
    let temp = TempDir::new().expect("tempdir should be created");
    let (workdir, gccache) = setup_workspace(&temp);
    write_species(&gccache, JAN, 2, 2);
    let config_path = temp.path().join("config_write_BCs.yml");
    fs::write(
        &config_path,
        "workdir: run\ngccache: gccache\nstartdate: 20160101\nenddate: 20160201\nformat: json\n",
    )
    .expect("config should be written");

    let output = bcbias(&["run", "--config", path_arg(&config_path)]);

    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr_of(&output));
    assert!(workdir.join("smoothed-boundary-conditions").join(JAN).is_file());
}
