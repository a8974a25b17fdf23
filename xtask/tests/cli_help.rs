use std::process::Command;

fn xtask_bin() -> &'static str {
    env!("CARGO_BIN_EXE_xtask")
}

#[test]
fn xtask_help_lists_expected_commands() {
    let output = Command::new(xtask_bin())
        .arg("--help")
        .output()
        .expect("xtask should run");
    assert!(output.status.success(), "xtask --help should succeed");

    let stdout = String::from_utf8_lossy(&output.stdout);
    for needle in ["validate-change", "check-change", "new-change"] {
        assert!(
            stdout.contains(needle),
            "xtask --help should list {needle}, got:\n{stdout}"
        );
    }
}

#[test]
fn validate_change_requires_base_and_head() {
    let output = Command::new(xtask_bin())
        .args(["validate-change", "--base", "HEAD~1"])
        .output()
        .expect("xtask should run");
    assert!(!output.status.success(), "missing --head must fail");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--head"), "stderr should name --head, got:\n{stderr}");
}
