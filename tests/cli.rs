use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_cpu6502_gen"))
        .args(args)
        .output()
        .unwrap()
}

fn temp_file(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("cpu6502_gen_{}_{name}", std::process::id()));
    fs::write(&path, contents).unwrap();
    path
}

#[test]
pub fn test_unknown_mode_fails_without_output() {
    let row = format!("0- LDA zzz{}", " ---".repeat(15));
    let path = temp_file("zzz.txt", &row);
    for command in ["table", "generate"] {
        let output = run(&[command, "--table", path.to_str().unwrap()]);
        assert!(!output.status.success(), "{command}");
        assert!(output.stdout.is_empty(), "{command}");
    }
    fs::remove_file(path).unwrap();
}

#[test]
pub fn test_table_byte() {
    let output = run(&["table", "--byte", "0x69"]);
    assert!(output.status.success());
    assert_eq!(String::from_utf8(output.stdout).unwrap(), "69 : ADC #\n");

    let output = run(&["table", "--byte", "128"]);
    assert_eq!(
        String::from_utf8(output.stdout).unwrap(),
        "80 : BRA rel (65C02 only)\n"
    );

    let output = run(&["table", "--byte", "0x02"]);
    assert!(!output.status.success());
}

#[test]
pub fn test_generate_then_verify() {
    let output = run(&["generate", "--dialect", "rust"]);
    assert!(output.status.success());
    let path = temp_file("dispatch.rs", &String::from_utf8(output.stdout).unwrap());

    let output = run(&["verify", "--strict", path.to_str().unwrap()]);
    assert!(output.status.success());
    let summary = String::from_utf8(output.stdout).unwrap();
    assert!(summary.starts_with("178 cases, "), "{summary}");
    assert!(summary.ends_with(" matched, 0 unknown\n"), "{summary}");
    fs::remove_file(path).unwrap();
}

#[test]
pub fn test_verify_strict() {
    let path = temp_file("unknown.cpp", "case 0x02: { // KIL weird\n    break;\n}\n");
    let output = run(&["verify", path.to_str().unwrap()]);
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8(output.stdout).unwrap(),
        "line 1: unknown addressing mode: case 0x02: { // KIL weird\n1 cases, 0 matched, 1 unknown\n"
    );
    let output = run(&["verify", "--strict", path.to_str().unwrap()]);
    assert!(!output.status.success());
    fs::remove_file(path).unwrap();
}

#[test]
pub fn test_verify_builtin_table() {
    let path = temp_file(
        "builtin.cpp",
        "case 0x7D: {\n    uint16_t address = absolute_indexed_X(page_crossed);\n    break;\n}\n",
    );
    let output = run(&["verify", "--builtin", path.to_str().unwrap()]);
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8(output.stdout).unwrap(),
        "1 cases, 1 matched, 0 unknown\n"
    );

    fs::write(&path, "case 0x7D: {\n    uint16_t address = absolute();\n}\n").unwrap();
    let output = run(&["verify", "--builtin", path.to_str().unwrap()]);
    assert!(!output.status.success());
    fs::remove_file(path).unwrap();
}

#[test]
pub fn test_table_mnemonic() {
    let output = run(&["table", "--mnemonic", "jmp"]);
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8(output.stdout).unwrap(),
        "4C : JMP abs\n6C : JMP ind\n7C : JMP (abs,X) (65C02 only)\n"
    );
}
