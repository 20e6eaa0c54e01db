// End-to-end tests for `mdmerge merge`, `run` and `validate`.
// Run with: cargo test -p mdmerge-cli --test cli_merge

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

const S4_COUNTRY: &str = "\
Country/Region Key,Name,Currency,Division
US,United States,USD,A
DE,Germany,EUR,
JP,Japan,JPY,C
";

const ECC_COUNTRY: &str = "\
Country/Region Key,Name,Division,Region
de,Deutschland,B,EU
US,USA,B,NA
FR,France,D,EU
";

fn mdmerge() -> Command {
    Command::new(env!("CARGO_BIN_EXE_mdmerge"))
}

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn country_sources(dir: &Path) -> (PathBuf, PathBuf) {
    (
        write(dir, "s4.csv", S4_COUNTRY),
        write(dir, "ecc.csv", ECC_COUNTRY),
    )
}

fn run(cmd: &mut Command) -> Output {
    let output = cmd.output().expect("spawn mdmerge");
    if !output.status.success() {
        eprintln!("stderr: {}", String::from_utf8_lossy(&output.stderr));
    }
    output
}

fn csv_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()))
        .lines()
        .map(String::from)
        .collect()
}

// -------------------------------------------------------------------------
// merge
// -------------------------------------------------------------------------

#[test]
fn merge_writes_csv_outputs() {
    let dir = TempDir::new().unwrap();
    let (s4, ecc) = country_sources(dir.path());
    let out = dir.path().join("out");

    let output = run(mdmerge()
        .args(["merge"])
        .arg(&s4)
        .arg(&ecc)
        .args(["--key", "Country/Region Key", "--format", "csv", "-o"])
        .arg(&out));
    assert_eq!(output.status.code(), Some(0));

    let table = csv_lines(&out.join("MDtable.csv"));
    assert_eq!(table[0], "MDGKey,Country/Region Key,Name,Currency,Division,Region");
    assert_eq!(table[1], "US,US,United States,USD,A,NA");
    assert_eq!(table[2], "DE,DE,Germany,EUR,,EU");
    assert_eq!(table[4], "FR,FR,France,,D,EU");
    assert_eq!(table.len(), 5);

    let mapping = csv_lines(&out.join("MDmapping.csv"));
    assert_eq!(mapping.len(), 7);
    assert!(mapping[0].starts_with("MDGKey,ERPSystem,ERPCountry/Region Key,"));
    assert!(mapping[4].starts_with("DE,ECC,de,Deutschland"));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("MDtable:    4 rows (2 overlapping, 1 S4 only, 1 ECC only)"));
    assert!(stderr.contains("MDmapping.csv"));
    assert!(output.stdout.is_empty());
}

#[test]
fn merge_default_format_is_xlsx() {
    let dir = TempDir::new().unwrap();
    let (s4, ecc) = country_sources(dir.path());

    let output = run(mdmerge()
        .current_dir(dir.path())
        .arg("merge")
        .arg(&s4)
        .arg(&ecc)
        .args(["-k", "Country/Region Key", "-q"]));
    assert_eq!(output.status.code(), Some(0));

    let bytes = std::fs::read(dir.path().join("MDtable.xlsx")).unwrap();
    assert_eq!(&bytes[..2], b"PK");
    assert!(dir.path().join("MDmapping.xlsx").exists());
    assert!(output.stderr.is_empty());
}

#[test]
fn merge_json_is_single_value_on_stdout() {
    let dir = TempDir::new().unwrap();
    let (s4, ecc) = country_sources(dir.path());

    let output = run(mdmerge()
        .arg("merge")
        .arg(&s4)
        .arg(&ecc)
        .args(["-k", "Country/Region Key", "--format", "csv", "--json", "-q", "-o"])
        .arg(dir.path()));
    assert_eq!(output.status.code(), Some(0));

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("stdout is JSON");
    assert_eq!(value["summary"]["mdtable_count"], 4);
    assert_eq!(value["summary"]["mdmapping_count"], 6);
    assert_eq!(value["summary"]["overlapping"], 2);
    assert_eq!(value["meta"]["key_transform"], "fold");
    assert_eq!(value["outputs"].as_array().unwrap().len(), 2);
    assert!(value.get("md_table").is_none());
}

#[test]
fn merge_with_rename_and_composite_key() {
    let dir = TempDir::new().unwrap();
    let s4 = write(dir.path(), "s4.csv", "Plant,Material,Qty\n1000,M-01,5\n2000,M-02,7\n");
    let ecc = write(dir.path(), "ecc.csv", "Werk,Material,Qty\n1000,M-01,9\n3000,M-03,1\n");

    let output = run(mdmerge()
        .arg("merge")
        .arg(&s4)
        .arg(&ecc)
        .args(["-k", "Plant", "-k", "Material", "--rename-ecc", "Werk=Plant"])
        .args(["--format", "csv", "-q", "-o"])
        .arg(dir.path()));
    assert_eq!(output.status.code(), Some(0));

    let table = csv_lines(&dir.path().join("MDtable.csv"));
    assert_eq!(table[0], "MDGKey,Plant,Material,Qty");
    assert_eq!(table[1], "1000-M\\-01,1000,M-01,5");
    assert_eq!(table.len(), 4);
}

#[test]
fn merge_missing_key_is_schema_error() {
    let dir = TempDir::new().unwrap();
    let (s4, ecc) = country_sources(dir.path());

    let output = run(mdmerge()
        .arg("merge")
        .arg(&s4)
        .arg(&ecc)
        .args(["-k", "Country", "-o"])
        .arg(dir.path()));
    assert_eq!(output.status.code(), Some(3));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error: key field 'Country' not found in S4 and ECC"));
    assert!(stderr.contains("hint:  available columns:"));
    assert!(!dir.path().join("MDtable.xlsx").exists());
}

#[test]
fn merge_empty_source_fails() {
    let dir = TempDir::new().unwrap();
    let s4 = write(dir.path(), "s4.csv", "Country/Region Key,Name\n");
    let ecc = write(dir.path(), "ecc.csv", ECC_COUNTRY);

    let output = run(mdmerge().arg("merge").arg(&s4).arg(&ecc).args(["-k", "Country/Region Key"]));
    assert_eq!(output.status.code(), Some(4));
    assert!(String::from_utf8_lossy(&output.stderr).contains("S4 table is empty"));
}

#[test]
fn merge_duplicates_with_error_policy() {
    let dir = TempDir::new().unwrap();
    let s4 = write(dir.path(), "s4.csv", "Key,Name\nUS,One\nus,Two\n");
    let ecc = write(dir.path(), "ecc.csv", "Key,Name\nDE,Three\n");

    let output = run(mdmerge()
        .arg("merge")
        .arg(&s4)
        .arg(&ecc)
        .args(["-k", "Key", "--on-duplicate", "error", "-o"])
        .arg(dir.path()));
    assert_eq!(output.status.code(), Some(5));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("S4 key \"US\" appears 2 times"));
    assert!(stderr.contains("--on-duplicate first"));
}

#[test]
fn merge_duplicates_keep_first_by_default() {
    let dir = TempDir::new().unwrap();
    let s4 = write(dir.path(), "s4.csv", "Key,Name\nUS,One\nus,Two\n");
    let ecc = write(dir.path(), "ecc.csv", "Key,Name\nDE,Three\n");

    let output = run(mdmerge()
        .arg("merge")
        .arg(&s4)
        .arg(&ecc)
        .args(["-k", "Key", "--format", "csv", "-o"])
        .arg(dir.path()));
    assert_eq!(output.status.code(), Some(0));

    let table = csv_lines(&dir.path().join("MDtable.csv"));
    assert_eq!(table[1], "US,US,One");
    assert!(String::from_utf8_lossy(&output.stderr).contains("S4 row 3: key \"US\" already used by row 2"));
}

#[test]
fn warnings_name_sheet_rows() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "s4.csv", "Export 2026\n\nKey,Name\nUS,One\n\n,Blank\nus,Two\n");
    write(dir.path(), "ecc.csv", "Key,Name\nDE,Three\n");

    let job = write(
        dir.path(),
        "job.toml",
        "key_fields = [\"Key\"]\n[s4]\nsource = \"s4.csv\"\nheader_row = 3\n[ecc]\nsource = \"ecc.csv\"\n[output]\nformat = \"csv\"\n",
    );
    let output = run(mdmerge().arg("run").arg(&job).arg("--json").arg("-q"));
    assert_eq!(output.status.code(), Some(0));

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let warnings = value["warnings"].as_array().unwrap();
    assert_eq!(warnings[0]["kind"], "blank_key");
    assert_eq!(warnings[0]["row"], 6);
    assert_eq!(warnings[1]["kind"], "duplicate_key");
    assert_eq!(warnings[1]["row"], 7);
    assert_eq!(warnings[1]["first_row"], 4);
}

#[test]
fn merge_zero_byte_source_is_empty_input() {
    let dir = TempDir::new().unwrap();
    let s4 = write(dir.path(), "s4.csv", S4_COUNTRY);
    let ecc = write(dir.path(), "ecc.csv", "");

    let output = run(mdmerge().arg("merge").arg(&s4).arg(&ecc).args(["-k", "Country/Region Key"]));
    assert_eq!(output.status.code(), Some(4));
    assert!(String::from_utf8_lossy(&output.stderr).contains("ECC table is empty"));
}

#[test]
fn merge_missing_file_is_load_error() {
    let dir = TempDir::new().unwrap();
    let (s4, _) = country_sources(dir.path());

    let output = run(mdmerge()
        .arg("merge")
        .arg(&s4)
        .arg(dir.path().join("nope.csv"))
        .args(["-k", "Country/Region Key"]));
    assert_eq!(output.status.code(), Some(6));
    assert!(String::from_utf8_lossy(&output.stderr).contains("error: ECC: cannot read"));
}

#[test]
fn merge_without_key_is_usage_error() {
    let output = run(mdmerge().args(["merge", "a.csv", "b.csv"]));
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn merge_bad_rename_is_usage_error() {
    let output = run(mdmerge().args(["merge", "a.csv", "b.csv", "-k", "K", "--rename-s4", "oops"]));
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("expected FROM=TO"));
}

#[test]
fn merge_fetches_url_source() {
    let server = httpmock::MockServer::start();
    server.mock(|when, then| {
        when.method(httpmock::Method::GET).path("/ecc");
        then.status(200)
            .header("content-type", "text/csv")
            .body(ECC_COUNTRY);
    });

    let dir = TempDir::new().unwrap();
    let s4 = write(dir.path(), "s4.csv", S4_COUNTRY);

    let output = run(mdmerge()
        .arg("merge")
        .arg(&s4)
        .arg(server.url("/ecc"))
        .args(["-k", "Country/Region Key", "--format", "csv", "-q", "-o"])
        .arg(dir.path()));
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(csv_lines(&dir.path().join("MDmapping.csv")).len(), 7);
}

#[test]
fn merge_html_url_points_at_sharing() {
    let server = httpmock::MockServer::start();
    server.mock(|when, then| {
        when.method(httpmock::Method::GET).path("/sheet");
        then.status(200)
            .header("content-type", "text/html; charset=utf-8")
            .body("<!DOCTYPE html><html><body>Sign in</body></html>");
    });

    let dir = TempDir::new().unwrap();
    let s4 = write(dir.path(), "s4.csv", S4_COUNTRY);

    let output = run(mdmerge()
        .arg("merge")
        .arg(&s4)
        .arg(server.url("/sheet"))
        .args(["-k", "Country/Region Key"]));
    assert_eq!(output.status.code(), Some(6));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("returned HTML"));
    assert!(stderr.contains("Anyone with the link can view"));
}

// -------------------------------------------------------------------------
// run / validate
// -------------------------------------------------------------------------

const JOB: &str = r#"
name = "Country master"
key_fields = ["Country/Region Key"]

[s4]
source = "s4.csv"

[ecc]
source = "ecc.csv"

[output]
dir = "out"
format = "csv"
"#;

#[test]
fn run_job_resolves_paths_against_job_dir() {
    let dir = TempDir::new().unwrap();
    country_sources(dir.path());
    let job = write(dir.path(), "country.merge.toml", JOB);

    let output = run(mdmerge().arg("run").arg(&job).args(["--json", "-q"]));
    assert_eq!(output.status.code(), Some(0));

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["summary"]["mdtable_count"], 4);
    assert!(dir.path().join("out/MDtable.csv").exists());
    assert!(dir.path().join("out/MDmapping.csv").exists());
}

#[test]
fn run_out_flag_overrides_job() {
    let dir = TempDir::new().unwrap();
    country_sources(dir.path());
    let job = write(dir.path(), "country.merge.toml", JOB);
    let elsewhere = dir.path().join("elsewhere");

    let output = run(mdmerge().arg("run").arg(&job).arg("-q").arg("-o").arg(&elsewhere));
    assert_eq!(output.status.code(), Some(0));
    assert!(elsewhere.join("MDtable.csv").exists());
    assert!(!dir.path().join("out").exists());
}

#[test]
fn run_invalid_job_is_config_error() {
    let dir = TempDir::new().unwrap();
    let job = write(dir.path(), "bad.toml", "key_fields = []\n[s4]\nsource = \"a\"\n[ecc]\nsource = \"b\"\n");

    let output = run(mdmerge().arg("run").arg(&job));
    assert_eq!(output.status.code(), Some(8));
    assert!(String::from_utf8_lossy(&output.stderr).contains("config validation error"));
}

#[test]
fn run_missing_job_is_config_error() {
    let dir = TempDir::new().unwrap();
    let output = run(mdmerge().arg("run").arg(dir.path().join("missing.toml")));
    assert_eq!(output.status.code(), Some(8));
    assert!(String::from_utf8_lossy(&output.stderr).contains("cannot read job file"));
}

#[test]
fn validate_prints_resolved_job() {
    let dir = TempDir::new().unwrap();
    let job = write(dir.path(), "country.merge.toml", JOB);

    let output = run(mdmerge().arg("validate").arg(&job));
    assert_eq!(output.status.code(), Some(0));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("ok: Country master\n"));
    assert!(stdout.contains("key fields:  Country/Region Key"));
    assert!(stdout.contains("key_transform=fold on_duplicate=first mdg_key=joined"));
    assert!(stdout.contains("(csv)"));
}
