use asmtree_core::synth::{self, AssemblyBuilder};
use tempfile::tempdir;

/// A readable PE with corrupt CLR metadata gets exactly one stderr line and
/// does not disturb the exit code.
#[test]
fn broken_metadata_gets_one_stderr_line() {
    let temp = tempdir().unwrap();
    std::fs::write(temp.path().join("Broken.dll"), synth::corrupt_metadata_stub()).unwrap();

    let assert = assert_cmd::cargo::cargo_bin_cmd!("asmtree")
        .env_remove("RUST_LOG")
        .arg(temp.path())
        .assert()
        .success();
    let output = assert.get_output();
    assert!(output.stdout.is_empty(), "broken files contribute no trees");
    assert_eq!(
        String::from_utf8(output.stderr.clone()).unwrap(),
        "Broken.dll: metadata signature mismatch\n"
    );
}

/// Files that are not PE images at all are skipped without a word.
#[test]
fn garbage_files_stay_silent() {
    let temp = tempdir().unwrap();
    std::fs::write(temp.path().join("junk.dll"), b"just some text").unwrap();
    std::fs::write(temp.path().join("native.dll"), synth::native_stub()).unwrap();

    let assert = assert_cmd::cargo::cargo_bin_cmd!("asmtree")
        .env_remove("RUST_LOG")
        .arg(temp.path())
        .assert()
        .success();
    let output = assert.get_output();
    assert!(output.stdout.is_empty());
    assert!(output.stderr.is_empty());
}

/// Every unreadable assembly reports once, in scan order, while healthy
/// neighbours still produce their tree.
#[test]
fn broken_files_report_once_each() {
    let temp = tempdir().unwrap();
    std::fs::write(temp.path().join("Bad1.dll"), synth::corrupt_metadata_stub()).unwrap();
    std::fs::write(temp.path().join("Bad2.dll"), synth::corrupt_metadata_stub()).unwrap();
    AssemblyBuilder::new("Lib")
        .company("IQVIA Solutions")
        .write_to(&temp.path().join("Lib.dll"))
        .unwrap();
    AssemblyBuilder::new("App")
        .company("IQVIA Solutions")
        .assembly_ref("Lib")
        .type_ref(0, "Lib.Types", "Widget")
        .field_of(0)
        .write_to(&temp.path().join("App.exe"))
        .unwrap();

    let assert = assert_cmd::cargo::cargo_bin_cmd!("asmtree")
        .env_remove("RUST_LOG")
        .arg(temp.path())
        .assert()
        .success();
    let output = assert.get_output();
    assert_eq!(
        String::from_utf8(output.stderr.clone()).unwrap(),
        "Bad1.dll: metadata signature mismatch\nBad2.dll: metadata signature mismatch\n"
    );
    assert_eq!(String::from_utf8(output.stdout.clone()).unwrap(), "App\n└── Lib\n");
}

#[test]
fn missing_paths_do_not_fail_the_run() {
    let assert = assert_cmd::cargo::cargo_bin_cmd!("asmtree")
        .env_remove("RUST_LOG")
        .arg("no/such/dir")
        .assert()
        .success();
    let output = assert.get_output();
    assert!(output.stdout.is_empty());
    assert!(output.stderr.is_empty(), "missing inputs are skipped quietly");
}

/// An unresolvable reference inside an otherwise healthy assembly is not a
/// load failure; the root still prints, as a lone node.
#[test]
fn unresolved_references_do_not_reach_stderr() {
    let temp = tempdir().unwrap();
    AssemblyBuilder::new("App")
        .company("IQVIA Solutions")
        .assembly_ref("Ghost")
        .type_ref(0, "G", "Gone")
        .field_of(0)
        .write_to(&temp.path().join("App.exe"))
        .unwrap();

    let assert = assert_cmd::cargo::cargo_bin_cmd!("asmtree")
        .env_remove("RUST_LOG")
        .arg(temp.path())
        .assert()
        .success();
    let output = assert.get_output();
    assert!(output.stderr.is_empty());
    assert!(output.stdout.is_empty(), "an edgeless assembly never enters the graph");
}
