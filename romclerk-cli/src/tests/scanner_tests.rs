use super::*;
use std::fs;

#[test]
fn test_scan_filters_by_extension() {
    let root = tempfile::tempdir().unwrap();
    fs::write(root.path().join("game.nes"), b"x").unwrap();
    fs::write(root.path().join("disk.fds"), b"x").unwrap();
    fs::write(root.path().join("chunked.unf"), b"x").unwrap();
    fs::write(root.path().join("chunked2.unif"), b"x").unwrap();
    fs::write(root.path().join("readme.txt"), b"x").unwrap();
    fs::write(root.path().join("noextension"), b"x").unwrap();

    let found = scan_rom_files(root.path()).unwrap();
    let names: Vec<String> = found
        .iter()
        .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();

    assert_eq!(names, ["chunked.unf", "chunked2.unif", "disk.fds", "game.nes"]);
}

#[test]
fn test_scan_recurses_depth_first() {
    let root = tempfile::tempdir().unwrap();
    fs::create_dir_all(root.path().join("a/deep")).unwrap();
    fs::create_dir_all(root.path().join("b")).unwrap();
    fs::write(root.path().join("a/deep/inner.nes"), b"x").unwrap();
    fs::write(root.path().join("a/first.nes"), b"x").unwrap();
    fs::write(root.path().join("b/second.fds"), b"x").unwrap();
    fs::write(root.path().join("top.nes"), b"x").unwrap();

    let found = scan_rom_files(root.path()).unwrap();
    let relative: Vec<String> = found
        .iter()
        .map(|path| {
            path.strip_prefix(root.path())
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect();

    assert_eq!(
        relative,
        ["a/deep/inner.nes", "a/first.nes", "b/second.fds", "top.nes"]
    );
}

#[test]
fn test_scan_case_insensitive_extensions() {
    let root = tempfile::tempdir().unwrap();
    fs::write(root.path().join("SHOUTING.NES"), b"x").unwrap();

    let found = scan_rom_files(root.path()).unwrap();
    assert_eq!(found.len(), 1);
}

#[test]
fn test_scan_missing_directory_errors() {
    let root = tempfile::tempdir().unwrap();
    let missing = root.path().join("nope");
    assert!(scan_rom_files(&missing).is_err());
}
