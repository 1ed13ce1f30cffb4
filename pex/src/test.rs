use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use super::*;

/// A scratch file that cleans up after itself.
struct TempFile(PathBuf);

impl TempFile {
    fn new(name: &str, contents: &str) -> TempFile {
        let path = env::temp_dir().join(format!("pex-test-{}-{}", process_id(), name));
        fs::write(&path, contents).unwrap();
        TempFile(path)
    }

    fn empty(name: &str) -> TempFile {
        let path = env::temp_dir().join(format!("pex-test-{}-{}", process_id(), name));
        TempFile(path)
    }

    fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.0);
    }
}

fn process_id() -> u32 {
    std::process::id()
}

#[test]
fn compile_then_run_round_trips_through_text() {
    let source = TempFile::new("count.p", "for (i = 0, i < 3, i++):\n    print(i)\n");
    let assembly = TempFile::empty("count.asm");

    compile_file(source.path(), assembly.path()).unwrap();
    let listing = fs::read_to_string(assembly.path()).unwrap();
    assert!(listing.lines().last() == Some("HALT"));

    let output = run_file(assembly.path()).unwrap();
    assert_eq!(output, ["0", "1", "2"]);
}

#[test]
fn compile_errors_map_to_exit_code_one() {
    let source = TempFile::new("bad.p", "print(q)\n");
    let assembly = TempFile::empty("bad.asm");

    let err = compile_file(source.path(), assembly.path()).unwrap_err();
    assert!(matches!(err, Error::Compile(_)));
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn missing_files_map_to_exit_code_one() {
    let err = run_file(Path::new("does-not-exist.asm")).unwrap_err();
    assert!(matches!(err, Error::Io(..)));
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn runtime_failures_map_to_exit_code_two() {
    let assembly = TempFile::new("div.asm", "DIV r0 #1 #0\nHALT\n");
    let err = run_file(assembly.path()).unwrap_err();
    assert!(matches!(err, Error::Runtime(_)));
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn debug_dumps_state_between_steps() {
    let assembly = TempFile::new("dbg.asm", "MOV r0 #5\nPRT r0\nHALT\n");
    let mut out = Vec::new();
    debug_file(assembly.path(), &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    // one dump per instruction, including the halt
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("pc=0"));
    assert!(lines[0].contains("r0=0"));
    assert!(lines[0].contains("status=----"));
    assert!(lines[1].contains("r0=5"));
    assert!(lines[2].contains("output=[5]"));
}
