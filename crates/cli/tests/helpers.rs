use std::fs;
use std::path::Path;

use asmtree::{discover_inputs, short_file_name};
use tempfile::tempdir;

fn args(paths: &[&Path]) -> Vec<String> {
    paths.iter().map(|p| p.to_string_lossy().into_owned()).collect()
}

#[test]
fn explicit_files_are_taken_as_given() {
    let tmp = tempdir().expect("tempdir");
    let odd = tmp.path().join("notes.txt");
    fs::write(&odd, b"not an assembly").expect("write file");

    assert_eq!(discover_inputs(&args(&[&odd])), vec![odd]);
}

#[test]
fn directories_keep_only_assembly_extensions() {
    let tmp = tempdir().expect("tempdir");
    fs::write(tmp.path().join("a.dll"), b"x").expect("write a.dll");
    fs::write(tmp.path().join("b.EXE"), b"x").expect("write b.EXE");
    fs::write(tmp.path().join("notes.txt"), b"x").expect("write notes.txt");

    let found = discover_inputs(&args(&[tmp.path()]));
    assert_eq!(found, vec![tmp.path().join("a.dll"), tmp.path().join("b.EXE")]);
}

#[test]
fn directory_walks_recurse() {
    let tmp = tempdir().expect("tempdir");
    let sub = tmp.path().join("plugins").join("extra");
    fs::create_dir_all(&sub).expect("create subdirs");
    fs::write(tmp.path().join("top.dll"), b"x").expect("write top.dll");
    fs::write(sub.join("deep.dll"), b"x").expect("write deep.dll");

    let found = discover_inputs(&args(&[tmp.path()]));
    assert_eq!(found, vec![sub.join("deep.dll"), tmp.path().join("top.dll")]);
}

#[test]
fn repeated_and_overlapping_arguments_collapse() {
    let tmp = tempdir().expect("tempdir");
    let lib = tmp.path().join("Lib.dll");
    fs::write(&lib, b"x").expect("write Lib.dll");

    let found = discover_inputs(&args(&[&lib, tmp.path(), &lib]));
    assert_eq!(found, vec![lib]);
}

#[test]
fn missing_paths_drop_out() {
    assert!(discover_inputs(&["no/such/file.dll".to_string()]).is_empty());
}

#[test]
fn results_come_back_sorted_ignoring_case() {
    let tmp = tempdir().expect("tempdir");
    for name in ["c.dll", "A.dll", "b.dll"] {
        fs::write(tmp.path().join(name), b"x").expect("write fixture");
    }

    let found = discover_inputs(&args(&[tmp.path()]));
    assert_eq!(
        found,
        vec![tmp.path().join("A.dll"), tmp.path().join("b.dll"), tmp.path().join("c.dll")]
    );
}

#[test]
fn short_file_name_takes_the_final_component() {
    assert_eq!(short_file_name(Path::new("/scan/dir/App.dll")), "App.dll");
    assert_eq!(short_file_name(Path::new("App.dll")), "App.dll");
}

#[test]
fn short_file_name_falls_back_to_the_full_path() {
    assert_eq!(short_file_name(Path::new("..")), "..");
    assert_eq!(short_file_name(Path::new("/")), "/");
}
