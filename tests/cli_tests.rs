use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn help_lists_the_supervisor_flags() {
    Command::cargo_bin("dsw")
        .expect("dsw binary")
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("--web-cmd")
                .and(predicate::str::contains("--bot-cmd"))
                .and(predicate::str::contains("--interval"))
                .and(predicate::str::contains("--delay")),
        );
}

#[test]
fn version_flag_reports_the_package() {
    Command::cargo_bin("dsw")
        .expect("dsw binary")
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("dsw"));
}

#[test]
fn unknown_flag_is_rejected() {
    Command::cargo_bin("dsw")
        .expect("dsw binary")
        .arg("--definitely-not-a-flag")
        .assert()
        .failure();
}

#[test]
#[cfg(unix)]
fn exits_nonzero_when_no_child_can_be_spawned() {
    Command::cargo_bin("dsw")
        .expect("dsw binary")
        .args([
            "--web-cmd",
            "dsw-no-such-web-binary",
            "--bot-cmd",
            "dsw-no-such-bot-binary",
            "--delay",
            "0",
        ])
        .timeout(std::time::Duration::from_secs(30))
        .assert()
        .failure()
        .stderr(predicate::str::contains("no supervised process"));
}
