//! Integration tests driving the sfxidx binary.
//!
//! Each test builds into its own temporary directory and checks the exit
//! status and diagnostics of `build`, `map` and `stats`.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::tempdir;

/// Get path to the sfxidx binary
fn sfxidx_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_sfxidx"))
}

fn fixture(name: &str) -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
        .to_string_lossy()
        .into_owned()
}

/// Run sfxidx with given args
fn run(args: &[&str]) -> (String, String, bool) {
    let output = Command::new(sfxidx_binary())
        .args(args)
        .output()
        .expect("Failed to run sfxidx");

    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.success(),
    )
}

fn exit_code(args: &[&str]) -> Option<i32> {
    Command::new(sfxidx_binary())
        .args(args)
        .output()
        .expect("Failed to run sfxidx")
        .status
        .code()
}

fn name_in(dir: &Path) -> String {
    dir.join("sfx").to_string_lossy().into_owned()
}

fn build_ok(args: &[&str]) {
    let (stdout, stderr, ok) = run(args);
    assert!(ok, "build failed: {}\nstdout: {}", stderr, stdout);
}

/// Table payloads without the header, which carries the build id
fn payload(index: &str, ext: &str) -> Vec<u8> {
    fs::read(format!("{}.{}", index, ext)).unwrap()[32..].to_vec()
}

#[test]
fn test_map_same_tables_then_missing_bck() {
    let dir = tempdir().unwrap();
    let name = name_in(dir.path());
    let input = fixture("two.fna");
    build_ok(&[
        "build", &input, "--indexname", &name, "--tis", "--suf", "--lcp", "--des", "--sds", "--ssp",
    ]);

    let tables = ["--tis", "--suf", "--lcp", "--des", "--sds", "--ssp"];
    let mut args = vec!["map", name.as_str()];
    args.extend(tables);
    assert_eq!(exit_code(&args), Some(0));

    args.push("--bck");
    let (_, stderr, ok) = run(&args);
    assert!(!ok);
    assert!(stderr.contains("no bck table"), "{}", stderr);
    assert_eq!(exit_code(&args), Some(1));
}

#[test]
fn test_map_with_trials_and_stream() {
    let dir = tempdir().unwrap();
    let name = name_in(dir.path());
    let input = fixture("two.fna");
    build_ok(&[
        "build", &input, "--indexname", &name, "--tis", "--suf", "--lcp", "--bwt", "--bck", "--pl", "2",
    ]);
    let (stdout, stderr, ok) = run(&[
        "map", &name, "--stream", "--tis", "--suf", "--lcp", "--bwt", "--bck", "--scantrials", "100",
        "--multicharcmptrials", "100",
    ]);
    assert!(ok, "{}", stderr);
    assert!(stdout.contains("scan trials: 100"));
    assert!(stdout.contains("bck: 16 buckets"));
}

#[test]
fn test_reverse_and_forward_builds() {
    for direction in ["fwd", "rev", "cpl", "rcl"] {
        let dir = tempdir().unwrap();
        let name = name_in(dir.path());
        let input = fixture("two.fna");
        build_ok(&["build", &input, "--indexname", &name, "--dir", direction, "--tis", "--suf", "--lcp"]);
        assert_eq!(exit_code(&["map", &name, "--tis", "--suf", "--lcp"]), Some(0), "{}", direction);
    }
}

#[test]
fn test_formats_yield_identical_collections() {
    let dir = tempdir().unwrap();
    let mut built = Vec::new();
    for file in ["two.fna", "two.fastq", "two.embl", "two.gbk"] {
        let name = dir.path().join(file).to_string_lossy().into_owned();
        build_ok(&["build", &fixture(file), "--indexname", &name, "--sat", "bit", "--tis", "--des", "--ssp"]);
        built.push((payload(&name, "tis"), payload(&name, "des"), payload(&name, "ssp")));
    }
    assert_eq!(built[0].1, b"first test sequence\nsecond record\n");
    assert!(built.windows(2).all(|w| w[0] == w[1]));
}

#[test]
fn test_default_index_name_and_stats() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("prot.fsa");
    fs::copy(fixture("prot.fsa"), &input).unwrap();
    let output = Command::new(sfxidx_binary())
        .args(["build", "prot.fsa", "--suf", "--bwt"])
        .current_dir(dir.path())
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(dir.path().join("prot.fsa.suf").exists());
    assert!(dir.path().join("prot.fsa.prj").exists());

    let name = dir.path().join("prot.fsa").to_string_lossy().into_owned();
    let (stdout, _, ok) = run(&["stats", &name]);
    assert!(ok);
    assert!(stdout.contains("Satellite:        bytecompress"), "{}", stdout);
    assert!(stdout.contains("Sequences:        3"));
}

#[test]
fn test_config_file_overridden_by_flags() {
    let dir = tempdir().unwrap();
    let name = name_in(dir.path());
    let config = dir.path().join("build.json");
    fs::write(&config, r#"{"sat": "uchar", "parts": 3, "tables": ["tis", "suf"]}"#).unwrap();
    build_ok(&[
        "build", &fixture("two.fna"), "--indexname", &name, "--config", &config.to_string_lossy(), "--sat", "ushort",
    ]);
    let project = fs::read_to_string(format!("{}.prj", name)).unwrap();
    assert!(project.contains("\"satellite\": \"ushort\""), "{}", project);
    assert!(project.contains("\"parts\": 3"));
    assert_eq!(exit_code(&["map", &name, "--tis", "--suf"]), Some(0));
}

#[test]
fn test_build_from_input_index() {
    let dir = tempdir().unwrap();
    let name = name_in(dir.path());
    build_ok(&["build", &fixture("reads.fna"), "--indexname", &name, "--tis", "--des"]);
    let copy = dir.path().join("copy").to_string_lossy().into_owned();
    build_ok(&["build", "--input-index", &name, "--indexname", &copy, "--tis", "--suf", "--sds", "--dc", "4"]);
    assert_eq!(payload(&name, "tis"), payload(&copy, "tis"));
    assert_eq!(exit_code(&["map", &copy, "--tis", "--suf", "--sds"]), Some(0));
}

#[test]
fn test_failed_build_keeps_prior_index() {
    let dir = tempdir().unwrap();
    let name = name_in(dir.path());
    let input = fixture("two.fna");
    build_ok(&["build", &input, "--indexname", &name, "--tis", "--suf"]);
    let before = fs::read(format!("{}.prj", name)).unwrap();

    let (_, _, ok) = run(&["build", &input, "--indexname", &name, "--sat", "eqlen", "--tis", "--suf"]);
    assert!(!ok);
    assert_eq!(fs::read(format!("{}.prj", name)).unwrap(), before);
    assert_eq!(exit_code(&["map", &name, "--tis", "--suf"]), Some(0));
    let leftovers = fs::read_dir(dir.path())
        .unwrap()
        .filter(|e| e.as_ref().unwrap().file_name().to_string_lossy().starts_with('.'))
        .count();
    assert_eq!(leftovers, 0);
}

#[test]
fn test_missing_tables_fail_per_table() {
    let dir = tempdir().unwrap();
    let name = name_in(dir.path());
    build_ok(&["build", &fixture("two.fna"), "--indexname", &name, "--tis", "--suf"]);
    for table in ["des", "ssp", "sds", "lcp", "bwt"] {
        let flag = format!("--{}", table);
        let (_, stderr, ok) = run(&["map", &name, "--tis", &flag]);
        assert!(!ok, "{}", table);
        assert!(stderr.contains(&format!("no {} table", table)), "{}: {}", table, stderr);
        assert_eq!(exit_code(&["map", &name, &flag]), Some(1));
    }
}

#[test]
fn test_difference_cover_partitions_match_single_part() {
    let dir = tempdir().unwrap();
    let input = fixture("two.fna");
    let mut built = Vec::new();
    for (label, extra) in [
        ("single", vec![]),
        ("dc", vec!["--dc", "64"]),
        ("dc_parts", vec!["--dc", "64", "--parts", "3"]),
        ("direct_parts", vec!["--parts", "4"]),
    ] {
        let name = dir.path().join(label).to_string_lossy().into_owned();
        let mut args = vec!["build", input.as_str(), "--indexname", name.as_str(), "--suf", "--lcp", "--bwt"];
        args.extend(extra);
        build_ok(&args);
        built.push((payload(&name, "suf"), payload(&name, "lcp"), payload(&name, "bwt")));
    }
    assert!(built.windows(2).all(|w| w[0] == w[1]));
}

#[test]
fn test_rebuild_reverse_from_input_index() {
    let dir = tempdir().unwrap();
    let name = name_in(dir.path());
    build_ok(&["build", &fixture("reads.fna"), "--indexname", &name, "--tis"]);
    let copy = dir.path().join("rev").to_string_lossy().into_owned();
    build_ok(&[
        "build", "--input-index", &name, "--indexname", &copy, "--dir", "rev", "--pl", "2", "--tis", "--suf",
        "--lcp", "--bwt", "--bck",
    ]);
    let project = fs::read_to_string(format!("{}.prj", copy)).unwrap();
    assert!(project.contains("\"direction\": \"rev\""), "{}", project);
    assert!(project.contains("\"prefix_length\": 2"), "{}", project);

    for mode in [None, Some("--stream")] {
        let mut args = vec!["map", copy.as_str(), "--tis", "--suf", "--lcp", "--bwt", "--bck"];
        args.extend(mode);
        let (stdout, stderr, ok) = run(&args);
        assert!(ok, "{:?}: {}", mode, stderr);
        assert!(stdout.contains("suf: 51 suffixes sorted (rev)"), "{}", stdout);
        assert!(stdout.contains("bck: 16 buckets of prefix length 2"), "{}", stdout);
    }
}

#[test]
fn test_stream_map_after_custom_bucket_bounds() {
    let dir = tempdir().unwrap();
    let input = fixture("two.fna");
    let name = name_in(dir.path());
    let default = dir.path().join("default").to_string_lossy().into_owned();
    let tables = ["--tis", "--suf", "--lcp", "--bwt", "--bck"];

    let mut args = vec!["build", input.as_str(), "--indexname", name.as_str(), "--algbds", "1", "2", "3"];
    args.extend(tables);
    build_ok(&args);
    let mut args = vec!["build", input.as_str(), "--indexname", default.as_str()];
    args.extend(tables);
    build_ok(&args);
    assert_eq!(payload(&name, "suf"), payload(&default, "suf"));

    let mut args = vec!["map", name.as_str(), "--stream", "--scantrials", "50"];
    args.extend(tables);
    assert_eq!(exit_code(&args), Some(0));
}

#[test]
fn test_long_run_with_deep_radix_bounds() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("homo.fna");
    fs::write(&input, format!(">run\n{}\n", "A".repeat(8000))).unwrap();
    let name = name_in(dir.path());
    build_ok(&[
        "build", &input.to_string_lossy(), "--indexname", &name, "--tis", "--suf", "--algbds", "2", "3", "1000000",
    ]);
    assert_eq!(exit_code(&["map", &name, "--tis", "--suf"]), Some(0));
    assert_eq!(exit_code(&["map", &name, "--stream", "--tis", "--suf"]), Some(0));
}

#[test]
fn test_data_violations_reported_together() {
    let dir = tempdir().unwrap();
    let name = name_in(dir.path());
    let (_, stderr, ok) = run(&[
        "build", &fixture("prot.fsa"), "--indexname", &name, "--sat", "bit", "--dir", "rcl", "--suf",
    ]);
    assert!(!ok);
    assert!(stderr.contains("not DNA"), "{}", stderr);
    assert!(stderr.contains("direction rcl requires a DNA alphabet"), "{}", stderr);
    assert!(!Path::new(&format!("{}.prj", name)).exists());
}

#[test]
fn test_configuration_failures() {
    let dna = fixture("two.fna");
    let protein = fixture("prot.fsa");
    let dir = tempdir().unwrap();
    let name = name_in(dir.path());

    let cases: Vec<(Vec<&str>, &str)> = vec![
        (vec!["build", &dna, "--indexname", "/nothing/sfx", "--suf"], "does not exist"),
        (vec!["build", &dna, "--indexname", &name, "--smap", "/nothing"], "/nothing"),
        (vec!["build", &protein, "--indexname", &name, "--dna", "--suf"], "illegal character"),
        (vec!["build", &protein, "--indexname", &name, "--protein", "--dir", "cpl"], "requires a DNA alphabet"),
        (vec!["build", "/nothing/x.fna", "--indexname", &name], "/nothing/x.fna"),
        (vec!["build", &dna, "--indexname", &name, "--pl", "10", "--suf"], "prefix length 10"),
        (vec!["build", &dna, "--indexname", &name, "--sat", "plain"], "unknown satellite plain"),
        (vec!["build", &dna, "--indexname", &name, "--sat", "bytecompress"], "bytecompress on DNA"),
        (vec!["build", &protein, "--indexname", &name, "--sat", "bit"], "not DNA"),
        (vec!["build", &dna, &protein], "--indexname"),
        (vec!["build", &dna, "--indexname", &name, "--maxdepth", "--parts", "2"], "--maxdepth"),
        (vec!["build", &dna, "--indexname", &name, "--dc", "48"], "power of two"),
    ];
    for (args, needle) in cases {
        let (_, stderr, ok) = run(&args);
        assert!(!ok, "{:?} succeeded", args);
        assert!(stderr.contains(needle), "{:?}: {}", args, stderr);
        assert_eq!(exit_code(&args), Some(1));
    }
    assert!(!Path::new(&format!("{}.prj", name)).exists());
}
