//! Integration tests for the j3d tool
//!
//! Each test writes inputs into a temp dir and runs the built binary.

use std::path::Path;
use std::process::{Command, Output};
use tempfile::tempdir;

const ROOT_WITH_LEAF: &str = "\
JOINT 0
OPEN
JOINT 1
CLOSE
TERMINATE
";

fn j3d(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_j3d"))
        .args(args)
        .output()
        .expect("Failed to run j3d")
}

fn arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

fn assemble(dir: &Path, name: &str, listing: &str, extra: &[&str]) -> std::path::PathBuf {
    let src = dir.join(format!("{name}.txt"));
    let out = dir.join(format!("{name}.bin"));
    std::fs::write(&src, listing).expect("Failed to write listing");

    let mut args = vec!["assemble", arg(&src), "-o", arg(&out)];
    args.extend_from_slice(extra);
    let output = j3d(&args);
    assert!(
        output.status.success(),
        "assemble failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    out
}

#[test]
fn test_assemble_and_disasm() {
    let dir = tempdir().expect("Failed to create temp dir");
    let bin = assemble(dir.path(), "leaf", ROOT_WITH_LEAF, &[]);

    let bytes = std::fs::read(&bin).expect("Failed to read output");
    assert_eq!(
        bytes,
        vec![
            0x00, 0x10, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x10, 0x00, 0x01, 0x00, 0x02,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ]
    );

    let output = j3d(&["disasm", arg(&bin)]);
    assert!(output.status.success());
    let listing = String::from_utf8_lossy(&output.stdout);
    assert!(listing.contains("0x0008    JOINT 1"), "listing was:\n{listing}");
    assert!(listing.ends_with("0x0010  TERMINATE\n"));
}

#[test]
fn test_verify_accepts_canonical_and_rejects_other_streams() {
    let dir = tempdir().expect("Failed to create temp dir");

    let canonical = assemble(dir.path(), "canonical", ROOT_WITH_LEAF, &[]);
    let output = j3d(&["verify", arg(&canonical)]);
    assert!(
        output.status.success(),
        "verify failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    // Decodes to the same tree, but keeps the empty scope the encoder drops
    let padded = assemble(
        dir.path(),
        "padded",
        "JOINT 0\nOPEN\nJOINT 1\nOPEN\nCLOSE\nCLOSE\nTERMINATE\n",
        &[],
    );
    let output = j3d(&["verify", arg(&padded)]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("differs"));
}

#[test]
fn test_json_encode_decode() {
    let dir = tempdir().expect("Failed to create temp dir");
    let json = dir.path().join("model.json");
    let bin = dir.path().join("model.bin");
    let back = dir.path().join("back.json");

    std::fs::write(
        &json,
        r#"{
  "joints": [
    { "id": 0, "children": [1, 2] },
    { "id": 1, "parent": 0, "displays": [{ "material": 0, "shape": 1 }] },
    { "id": 2, "parent": 0 }
  ]
}"#,
    )
    .expect("Failed to write json");

    let output = j3d(&["encode", arg(&json), "-o", arg(&bin)]);
    assert!(
        output.status.success(),
        "encode failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(j3d(&["verify", arg(&bin)]).status.success());

    let output = j3d(&["decode", arg(&bin), "-o", arg(&back)]);
    assert!(output.status.success());

    let text = std::fs::read_to_string(&back).expect("Failed to read json");
    let value: serde_json::Value = serde_json::from_str(&text).expect("Invalid json");
    let joints = value["joints"].as_array().expect("joints array");
    assert_eq!(joints.len(), 3);
    assert_eq!(joints[0]["children"], serde_json::json!([1, 2]));
    assert_eq!(joints[1]["displays"][0]["shape"], 1);
    assert_eq!(joints[2]["parent"], 0);
}

#[test]
fn test_encode_rejects_invalid_hierarchy() {
    let dir = tempdir().expect("Failed to create temp dir");
    let json = dir.path().join("orphan.json");
    std::fs::write(&json, r#"{ "joints": [{ "id": 0 }, { "id": 1 }] }"#)
        .expect("Failed to write json");

    let output = j3d(&["encode", arg(&json)]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("not reachable"));
    assert!(!dir.path().join("orphan.bin").exists());
}

#[test]
fn test_config_offset_and_endian() {
    let dir = tempdir().expect("Failed to create temp dir");
    let bin = assemble(dir.path(), "le", ROOT_WITH_LEAF, &["--endian", "little"]);

    // Embed the stream after an 8-byte header
    let mut container = vec![0xEE; 8];
    container.extend(std::fs::read(&bin).expect("Failed to read output"));
    let model = dir.path().join("model.bdl");
    std::fs::write(&model, &container).expect("Failed to write container");

    let config = dir.path().join("j3d.toml");
    std::fs::write(&config, "endian = \"little\"\noffset = 8\n").expect("Failed to write config");

    let output = j3d(&["tree", arg(&model), "--config", arg(&config)]);
    assert!(
        output.status.success(),
        "tree failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert_eq!(String::from_utf8_lossy(&output.stdout), "joint 0\n  joint 1\n");

    // Flags override the config file
    let output = j3d(&[
        "tree",
        arg(&model),
        "--config",
        arg(&config),
        "--endian",
        "big",
    ]);
    assert!(!output.status.success());
}

#[test]
fn test_lenient_flag() {
    let dir = tempdir().expect("Failed to create temp dir");
    let bin = assemble(
        dir.path(),
        "unclosed",
        "JOINT 0\nOPEN\nJOINT 1\nTERMINATE\n",
        &[],
    );

    let output = j3d(&["decode", arg(&bin)]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("still open"));

    let output = j3d(&["decode", arg(&bin), "--lenient"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("\"joints\""));
}

#[test]
fn test_malformed_opcode() {
    let dir = tempdir().expect("Failed to create temp dir");
    let bin = dir.path().join("bad.bin");
    std::fs::write(&bin, [0x7F, 0xFF, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00])
        .expect("Failed to write input");

    // The listing shows the record, decoding rejects it
    let output = j3d(&["disasm", arg(&bin)]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("0x0000  ? 0x7fff 0"));

    let output = j3d(&["tree", arg(&bin)]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("malformed opcode 0x7fff"));
}
