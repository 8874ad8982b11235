#![cfg(unix)]

use dsw::launcher::{CommandSpec, Launcher, Liveness, ProcessHandle, ProcessLauncher};
use dsw::logmux::LogSink;
use dsw::platform;
use dsw::supervisor::{ServiceKind, StartupPlan, Supervisor};
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Mutex;
use tokio::time::sleep;

fn make_service(root: &TempDir, name: &str, body: &str) -> PathBuf {
    let path = root.path().join(name);
    let script = format!("#!/bin/sh\n{body}\n");
    std::fs::write(&path, script).expect("write service script");

    let mut perms = std::fs::metadata(&path).expect("script metadata").permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).expect("chmod service script");

    path
}

fn spec_for(path: &PathBuf) -> CommandSpec {
    CommandSpec::from_argv(&[path.to_string_lossy().into_owned()]).expect("non-empty command")
}

fn capture_sink() -> (Arc<Mutex<Vec<u8>>>, LogSink) {
    let captured: Arc<Mutex<Vec<u8>>> = Arc::new(Mutex::new(Vec::new()));
    let sink: LogSink = captured.clone();
    (captured, sink)
}

async fn wait_for_exit(handle: &mut impl ProcessHandle) -> Option<i32> {
    for _ in 0..250 {
        match handle.poll_exit().expect("probe") {
            Liveness::Exited(code) => return code,
            Liveness::Running => sleep(Duration::from_millis(20)).await,
        }
    }
    panic!("child did not exit in time");
}

#[tokio::test]
async fn probe_tracks_a_real_child_lifecycle() {
    let root = TempDir::new().expect("temp dir");
    let script = make_service(&root, "long-runner", "sleep 30");
    let (_captured, sink) = capture_sink();

    let launcher = ProcessLauncher::new(sink);
    let mut handle = launcher
        .start("web", &spec_for(&script))
        .await
        .expect("spawn long-runner");

    assert_eq!(handle.poll_exit().expect("probe"), Liveness::Running);

    let pid = handle.pid().expect("pid of live child");
    assert!(platform::process_alive(pid));

    platform::terminate_process(pid);
    wait_for_exit(&mut handle).await;
}

#[tokio::test]
async fn spawn_failure_is_a_typed_error() {
    let (_captured, sink) = capture_sink();
    let launcher = ProcessLauncher::new(sink);

    let missing =
        CommandSpec::from_argv(&["dsw-no-such-binary-anywhere".to_string()]).expect("spec");
    let err = launcher.start("web", &missing).await.unwrap_err();
    assert!(err.to_string().contains("not found"));
}

#[tokio::test]
async fn child_lines_arrive_tagged() {
    let root = TempDir::new().expect("temp dir");
    let script = make_service(
        &root,
        "chatty",
        "echo hello from web\necho 'second line' >&2",
    );
    let (captured, sink) = capture_sink();

    let launcher = ProcessLauncher::new(sink);
    let mut handle = launcher
        .start("web", &spec_for(&script))
        .await
        .expect("spawn chatty");
    wait_for_exit(&mut handle).await;

    // Forwarders drain the pipes after the exit is observed
    for _ in 0..250 {
        let merged = String::from_utf8(captured.lock().await.clone()).expect("utf8 log");
        if merged.contains("[web] hello from web\n") && merged.contains("[web] second line\n") {
            return;
        }
        sleep(Duration::from_millis(20)).await;
    }
    panic!("tagged output never arrived");
}

#[tokio::test]
async fn two_real_children_never_splice_lines() {
    let root = TempDir::new().expect("temp dir");
    let loud_a = make_service(
        &root,
        "loud-a",
        "i=0\nwhile [ $i -lt 100 ]; do echo \"alpha payload $i\"; i=$((i+1)); done",
    );
    let loud_b = make_service(
        &root,
        "loud-b",
        "i=0\nwhile [ $i -lt 100 ]; do echo \"beta payload $i\"; i=$((i+1)); done",
    );
    let (captured, sink) = capture_sink();

    let launcher = ProcessLauncher::new(sink);
    let mut handle_a = launcher.start("a", &spec_for(&loud_a)).await.expect("spawn a");
    let mut handle_b = launcher.start("b", &spec_for(&loud_b)).await.expect("spawn b");
    wait_for_exit(&mut handle_a).await;
    wait_for_exit(&mut handle_b).await;

    let mut seen = 0;
    for _ in 0..250 {
        let merged = String::from_utf8(captured.lock().await.clone()).expect("utf8 log");
        seen = merged.lines().count();
        if seen == 200 {
            for line in merged.lines() {
                let payload = line
                    .strip_prefix("[a] alpha payload ")
                    .or_else(|| line.strip_prefix("[b] beta payload "))
                    .unwrap_or_else(|| panic!("spliced or mis-tagged line: {line:?}"));
                payload.parse::<u32>().expect("payload intact");
            }
            return;
        }
        sleep(Duration::from_millis(20)).await;
    }
    panic!("expected 200 merged lines, saw {seen}");
}

#[tokio::test]
async fn exited_service_is_restarted_on_the_next_tick() {
    let root = TempDir::new().expect("temp dir");
    let flaky = make_service(&root, "flaky-web", "exit 7");
    let steady = make_service(&root, "steady-bot", "sleep 30");
    let (_captured, sink) = capture_sink();

    let plan = StartupPlan::staggered(spec_for(&flaky), spec_for(&steady), Duration::ZERO);
    let launcher = ProcessLauncher::new(sink);
    let mut supervisor = Supervisor::start(launcher, plan, Duration::from_secs(1))
        .await
        .expect("startup plan");

    // Let the flaky child exit, then run one monitor pass
    sleep(Duration::from_millis(300)).await;
    let results = supervisor.tick().await;

    let web = results
        .iter()
        .find(|result| result.kind == ServiceKind::Web)
        .expect("web result");
    assert!(!web.alive);
    assert_eq!(web.exit_code, Some(7));
    assert_eq!(supervisor.restart_count(ServiceKind::Web), 1);
    assert_eq!(supervisor.restart_count(ServiceKind::Bot), 0);
}
