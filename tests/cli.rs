use assert_cmd::Command;

#[test]
fn runs_a_file_then_accepts_direct_mode_input_before_quitting() {
    let mut cmd = Command::cargo_bin("msbasic").unwrap();
    let assert = cmd
        .arg("tests/fixtures/hello.bas")
        .write_stdin("PRINT 1+1\nQUIT\n")
        .assert()
        .success();
    let output = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    assert!(output.contains("HELLO"));
    assert!(output.contains(" 1 \n"));
    assert!(output.contains(" 2 \n"));
    assert!(output.contains("READY."));
}

#[test]
fn missing_file_exits_with_failure() {
    let mut cmd = Command::cargo_bin("msbasic").unwrap();
    cmd.arg("tests/fixtures/does_not_exist.bas").assert().failure();
}
