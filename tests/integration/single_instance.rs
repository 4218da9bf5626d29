//! Single-instance guard through the updater.

use crate::common::Harness;
use bundle_updater::updater::{InstanceRegistry, Updater, process_executable};
use std::sync::Arc;
use tempfile::TempDir;

fn updater_with_registry(h: &Harness, registry: &InstanceRegistry, guard: bool) -> Updater {
    Updater::builder(h.config().with_single_instance_guard(guard))
        .installed_bundle(h.bundle.installed().clone())
        .process_control(h.process.clone())
        .instance_registry(registry.clone())
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_guard_registers_current_process() {
    let h = Harness::new().await;
    let temp = TempDir::new().unwrap();
    let registry = InstanceRegistry::new(temp.path().join("instances"));
    let updater = updater_with_registry(&h, &registry, true);

    let guard = updater.enforce_single_instance().unwrap().unwrap();
    let live = registry.live_instances().unwrap();
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].pid, std::process::id());
    assert!(h.process.killed().is_empty());

    drop(guard);
    assert!(registry.live_instances().unwrap().is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn test_guard_terminates_older_instance() {
    let h = Harness::new().await;
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("instances");
    std::fs::create_dir_all(&dir).unwrap();

    let mut older = std::process::Command::new("sleep").arg("30").spawn().unwrap();
    let exe = process_executable(older.id()).unwrap();
    std::fs::write(
        dir.join(older.id().to_string()),
        format!("{}\n1\n{}\n", older.id(), exe.display()),
    )
    .unwrap();

    let registry = InstanceRegistry::new(&dir);
    let updater = updater_with_registry(&h, &registry, true);
    let _guard = updater.enforce_single_instance().unwrap().unwrap();

    assert_eq!(h.process.killed(), vec![older.id()]);
    let live = registry.live_instances().unwrap();
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].pid, std::process::id());

    older.kill().unwrap();
    let _ = older.wait();
}

#[cfg(unix)]
#[tokio::test]
async fn test_guard_spares_process_that_reused_a_stale_pid() {
    let h = Harness::new().await;
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("instances");
    std::fs::create_dir_all(&dir).unwrap();

    let mut unrelated = std::process::Command::new("sleep").arg("30").spawn().unwrap();
    std::fs::write(
        dir.join(unrelated.id().to_string()),
        format!("{}\n1\n{}\n", unrelated.id(), h.bundle.installed().executable().display()),
    )
    .unwrap();

    let registry = InstanceRegistry::new(&dir);
    let updater = updater_with_registry(&h, &registry, true);
    let _guard = updater.enforce_single_instance().unwrap().unwrap();

    assert!(h.process.killed().is_empty());
    assert!(unrelated.try_wait().unwrap().is_none());
    assert!(!dir.join(unrelated.id().to_string()).exists());

    unrelated.kill().unwrap();
    let _ = unrelated.wait();
}

#[tokio::test]
async fn test_disabled_guard_does_nothing() {
    let h = Harness::new().await;
    let temp = TempDir::new().unwrap();
    let registry = InstanceRegistry::new(temp.path().join("instances"));
    let updater = updater_with_registry(&h, &registry, false);

    assert!(updater.enforce_single_instance().unwrap().is_none());
    assert!(!registry.dir().exists());
}

#[tokio::test]
async fn test_scheduler_starts_and_stops() {
    let h = Harness::new().await;
    let updater = Arc::new(
        Updater::builder(h.config().with_check_interval(std::time::Duration::from_secs(60)))
            .installed_bundle(h.bundle.installed().clone())
            .process_control(h.process.clone())
            .build()
            .unwrap(),
    );

    let scheduler = updater.spawn_scheduler().unwrap();
    assert_eq!(scheduler.interval().as_secs(), 60);
    assert!(scheduler.is_running());
    scheduler.stop();
    assert_eq!(h.bundle.executable_contents(), b"v1");
}
