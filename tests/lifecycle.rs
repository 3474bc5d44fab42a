//! End-to-end lifecycle tests driving the runtime through lock, init,
//! configure, serve, and teardown with fake collaborators recording the
//! order of every call.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use botvisor::{
    ApiHandler, ApiServer, ApiSurfaceConfig, AuthManager, CollabError, Config, Console,
    ConsoleConfig, CoreError, ExecContext, Lifecycle, MasterConfig, Profile, Robot, Runtime,
    ServerConfig,
};

/// Shared call-order recorder.
#[derive(Default)]
struct Calls(Mutex<Vec<String>>);

impl Calls {
    fn push(&self, entry: &str) {
        self.0
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(entry.to_string());
    }

    fn snapshot(&self) -> Vec<String> {
        self.0.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

struct FakeAuth {
    calls: Arc<Calls>,
    fail: bool,
}

#[async_trait]
impl AuthManager for FakeAuth {
    async fn configure(&self, _dir: &Path) -> Result<(), CollabError> {
        if self.fail {
            return Err(CollabError::Config {
                reason: "auth boom".to_string(),
            });
        }
        self.calls.push("auth.configure");
        Ok(())
    }

    async fn stop(&self) -> Result<(), CollabError> {
        self.calls.push("auth.stop");
        Ok(())
    }
}

struct NullSurface;

#[async_trait]
impl ApiHandler for NullSurface {
    async fn handle(&self, path: &str) -> Result<String, CollabError> {
        Ok(path.to_string())
    }
}

struct FakeRobot {
    calls: Arc<Calls>,
    fail_start: bool,
}

#[async_trait]
impl Robot for FakeRobot {
    async fn configure(
        &self,
        master: &MasterConfig,
        _api: &ApiSurfaceConfig,
    ) -> Result<(), CollabError> {
        self.calls.push(&format!("robot.configure:{}", master.name));
        Ok(())
    }

    async fn start(&self) -> Result<(), CollabError> {
        if self.fail_start {
            return Err(CollabError::Start {
                reason: "robot jammed".to_string(),
            });
        }
        self.calls.push("robot.start");
        Ok(())
    }

    async fn stop(&self) -> Result<(), CollabError> {
        self.calls.push("robot.stop");
        Ok(())
    }

    fn surface(&self) -> Arc<dyn ApiHandler> {
        Arc::new(NullSurface)
    }
}

struct FakeApi {
    calls: Arc<Calls>,
}

#[async_trait]
impl ApiServer for FakeApi {
    async fn configure(&self, _cfg: &ServerConfig) -> Result<(), CollabError> {
        self.calls.push("api.configure");
        Ok(())
    }

    fn mount(&self, path: &str, _handler: Arc<dyn ApiHandler>) {
        self.calls.push(&format!("api.mount:{path}"));
    }

    async fn start(&self) -> Result<(), CollabError> {
        self.calls.push("api.start");
        Ok(())
    }

    async fn stop(&self) -> Result<(), CollabError> {
        self.calls.push("api.stop");
        Ok(())
    }
}

struct FakeConsole {
    calls: Arc<Calls>,
}

#[async_trait]
impl Console for FakeConsole {
    async fn configure(&self, _cfg: &ConsoleConfig) -> Result<(), CollabError> {
        self.calls.push("console.configure");
        Ok(())
    }

    async fn stop(&self) -> Result<(), CollabError> {
        self.calls.push("console.stop");
        Ok(())
    }
}

/// Console whose teardown parks long enough for another lifecycle call to
/// race it.
struct SlowConsole {
    calls: Arc<Calls>,
}

#[async_trait]
impl Console for SlowConsole {
    async fn configure(&self, _cfg: &ConsoleConfig) -> Result<(), CollabError> {
        self.calls.push("console.configure");
        Ok(())
    }

    async fn stop(&self) -> Result<(), CollabError> {
        tokio::time::sleep(Duration::from_millis(100)).await;
        self.calls.push("console.stop");
        Ok(())
    }
}

struct Fixture {
    rt: Runtime,
    calls: Arc<Calls>,
    _tmp: tempfile::TempDir,
}

fn fixture() -> Fixture {
    fixture_with(false, false)
}

fn fixture_with(auth_fails: bool, robot_start_fails: bool) -> Fixture {
    let calls = Arc::new(Calls::default());
    let console = Arc::new(FakeConsole {
        calls: Arc::clone(&calls),
    });
    build_fixture(calls, auth_fails, robot_start_fails, console)
}

fn slow_teardown_fixture() -> Fixture {
    let calls = Arc::new(Calls::default());
    let console = Arc::new(SlowConsole {
        calls: Arc::clone(&calls),
    });
    build_fixture(calls, false, false, console)
}

fn build_fixture(
    calls: Arc<Calls>,
    auth_fails: bool,
    robot_start_fails: bool,
    console: Arc<dyn Console>,
) -> Fixture {
    let tmp = tempfile::tempdir().expect("tempdir");
    let mut profile = Profile::new("test");
    profile.config_dir = tmp.path().join("user");
    profile.config_sys_dir = tmp.path().join("sys");
    profile.config_dist_dir = tmp.path().join("dist");

    let mut config = Config::new();
    config.set("master", "name", serde_json::Value::String("botA".into()));
    config.set("api", "enable", serde_json::Value::Bool(true));

    let rt = Runtime::builder()
        .with_profile(profile)
        .with_config(config)
        .with_lock_timeout(Duration::from_millis(50))
        .with_auth(Arc::new(FakeAuth {
            calls: Arc::clone(&calls),
            fail: auth_fails,
        }))
        .with_robot(Arc::new(FakeRobot {
            calls: Arc::clone(&calls),
            fail_start: robot_start_fails,
        }))
        .with_api(Arc::new(FakeApi {
            calls: Arc::clone(&calls),
        }))
        .with_console(console)
        .build();

    Fixture {
        rt,
        calls,
        _tmp: tmp,
    }
}

async fn running_fixture() -> Fixture {
    let f = fixture();
    let guard = f.rt.lock().await.expect("lock");
    f.rt.init().expect("init");
    f.rt.configure(&guard).await.expect("configure");
    drop(guard);
    f
}

// ---- lock & context propagation ----

#[tokio::test]
async fn test_lock_contention_single_winner() {
    let f = fixture();
    let guard = f.rt.lock().await.expect("winner");

    let err = f.rt.lock().await.expect_err("loser");
    assert_eq!(err.as_label(), "core_lock_timeout");

    // release, then the lock is available again
    drop(guard);
    f.rt.lock().await.expect("after release");
}

#[tokio::test]
async fn test_lock_attaches_token_to_active_context() {
    let f = fixture();
    let guard = f.rt.lock().await.expect("lock");
    assert_eq!(f.rt.context().token(), Some(guard.token()));
    assert_eq!(f.rt.lock_owner(), Some(guard.token()));
}

#[tokio::test]
async fn test_guard_drop_unlocks() {
    let f = fixture();
    let guard = f.rt.lock().await.expect("lock");
    assert!(f.rt.is_locked());
    drop(guard);
    assert!(!f.rt.is_locked());
}

#[tokio::test]
async fn test_reconcile_attaches_owner_token_for_observation() {
    let f = fixture();
    let guard = f.rt.lock().await.expect("lock");

    let ctx = ExecContext::new();
    assert!(ctx.token().is_none());
    let reconciled = f.rt.reconcile(ctx).await.expect("reconcile");
    assert_eq!(reconciled.token(), Some(guard.token()));
}

#[tokio::test]
async fn test_reconcile_is_idempotent() {
    let f = fixture();
    let _guard = f.rt.lock().await.expect("lock");

    let once = f.rt.reconcile(ExecContext::new()).await.expect("first");
    let twice = f.rt.reconcile(once.clone()).await.expect("second");
    assert_eq!(once.token(), twice.token());
    assert_eq!(once.is_done(), twice.is_done());
}

#[tokio::test]
async fn test_reconcile_adopts_incoming_ownership() {
    let f = fixture();
    // produce a token, then release the underlying lock
    let token = {
        let guard = f.rt.lock().await.expect("lock");
        guard.token()
    };
    assert!(!f.rt.is_locked());

    let ctx = ExecContext::new().with_token(token);
    let reconciled = f.rt.reconcile(ctx).await.expect("adopt");
    assert_eq!(reconciled.token(), Some(token));
    assert_eq!(f.rt.lock_owner(), Some(token));

    // the adopted guard is retrievable and releases ownership on drop
    let adopted = f.rt.take_adopted().expect("adopted guard");
    assert_eq!(adopted.token(), token);
    drop(adopted);
    assert!(!f.rt.is_locked());
}

#[tokio::test]
async fn test_reconcile_adopts_cancellation() {
    let f = fixture();
    let ctx = ExecContext::new();
    f.rt.reconcile(ctx.clone()).await.expect("reconcile");
    ctx.cancel();
    assert!(f.rt.context().is_done());
}

// ---- configure preconditions ----

#[tokio::test]
async fn test_configure_requires_current_owner_token() {
    let f = fixture();
    let stale = f.rt.lock().await.expect("first");

    // a token-carrying context supersedes the stale guard for validation
    let replacement = {
        let g = fixture().rt.lock().await.expect("other");
        g.token()
    };
    let foreign_ctx = ExecContext::new().with_token(replacement);
    let _ = f.rt.reconcile(foreign_ctx).await;

    let err = f.rt.configure(&stale).await.expect_err("stale guard");
    assert_eq!(err.as_label(), "core_not_locked");
    assert_eq!(f.rt.state(), Lifecycle::Init);
    assert!(f.rt.auth().is_none(), "registry must stay untouched");
}

#[tokio::test]
async fn test_configure_rejects_foreign_guard() {
    let f = fixture();
    let other = fixture();
    let foreign = other.rt.lock().await.expect("foreign lock");

    let err = f.rt.configure(&foreign).await.expect_err("foreign");
    assert_eq!(err.as_label(), "core_foreign_token");
    assert_eq!(f.rt.state(), Lifecycle::Init);
}

#[tokio::test]
async fn test_configure_fails_fast_on_cancelled_context() {
    let f = fixture();
    let guard = f.rt.lock().await.expect("lock");
    f.rt.context().cancel();

    let err = f.rt.configure(&guard).await.expect_err("cancelled");
    assert_eq!(err.as_label(), "core_canceled");
    assert_eq!(f.rt.state(), Lifecycle::Init);
    assert!(f.calls.snapshot().is_empty());
}

// ---- lifecycle sentinels ----

#[tokio::test]
async fn test_init_state_rejects_serving_operations() {
    let f = fixture();
    for (label, err) in [
        ("start", f.rt.start().await.expect_err("start")),
        ("run", f.rt.run().await.expect_err("run")),
        ("stop", f.rt.stop().await.expect_err("stop")),
        ("halt", f.rt.halt().await.expect_err("halt")),
    ] {
        match err {
            CoreError::InvalidOp { state, .. } => assert_eq!(state, Lifecycle::Init, "{label}"),
            other => panic!("{label}: unexpected {other:?}"),
        }
    }
    assert_eq!(f.rt.state(), Lifecycle::Init);
    assert!(f.calls.snapshot().is_empty(), "no side effects");
}

#[tokio::test]
async fn test_init_is_idempotent() {
    let f = fixture();
    f.rt.init().expect("first");
    assert!(f.rt.auth().is_some());
    let auth = f.rt.auth().expect("auth");

    f.rt.init().expect("second");
    // same handle, not replaced
    assert!(Arc::ptr_eq(&auth, &f.rt.auth().expect("auth again")));
}

// ---- scenario A: happy path ----

#[tokio::test]
async fn test_scenario_a_configure_promotes_to_running() {
    let f = fixture();
    let guard = f.rt.lock().await.expect("lock");
    f.rt.init().expect("init");
    f.rt.configure(&guard).await.expect("configure");

    assert_eq!(f.rt.state(), Lifecycle::Running);
    assert_eq!(
        f.calls.snapshot(),
        vec![
            "auth.configure",
            "robot.configure:botA",
            "api.configure",
            "api.mount:/",
            "console.configure",
        ]
    );
    let flags = f.rt.flags().expect("flags snapshot");
    assert_eq!(flags.name, "botA");
    assert!(flags.api_enable);
    assert_eq!(
        f.rt.config()
            .expect("config snapshot")
            .get_str("master", "name")
            .as_deref(),
        Some("botA")
    );
}

#[tokio::test]
async fn test_configure_on_running_is_an_error() {
    let f = fixture();
    let guard = f.rt.lock().await.expect("lock");
    f.rt.configure(&guard).await.expect("first configure");

    let err = f.rt.configure(&guard).await.expect_err("second configure");
    match err {
        CoreError::InvalidOp { state, .. } => assert_eq!(state, Lifecycle::Running),
        other => panic!("unexpected: {other:?}"),
    }
    assert_eq!(f.rt.state(), Lifecycle::Running);
}

// ---- scenario B: first collaborator failure aborts ----

#[tokio::test]
async fn test_scenario_b_auth_failure_blocks_promotion() {
    let f = fixture_with(true, false);
    let guard = f.rt.lock().await.expect("lock");
    f.rt.init().expect("init");

    let err = f.rt.configure(&guard).await.expect_err("auth fails");
    match err {
        CoreError::Configure { name, source } => {
            assert_eq!(name, "auth");
            assert!(source.to_string().contains("auth boom"));
        }
        other => panic!("unexpected: {other:?}"),
    }
    assert_eq!(f.rt.state(), Lifecycle::Init);
    // robot, api, console were never attempted
    assert!(f.calls.snapshot().is_empty());
    assert!(f.rt.config().is_none(), "no snapshot on failure");
}

// ---- serving ----

#[tokio::test]
async fn test_start_orders_robot_before_api() {
    let f = running_fixture().await;
    f.rt.start().await.expect("start");
    let calls = f.calls.snapshot();
    assert_eq!(&calls[calls.len() - 2..], &["robot.start", "api.start"]);
}

#[tokio::test]
async fn test_start_failure_keeps_running_state() {
    let f = fixture_with(false, true);
    let guard = f.rt.lock().await.expect("lock");
    f.rt.configure(&guard).await.expect("configure");

    let err = f.rt.start().await.expect_err("robot jammed");
    assert_eq!(err.as_label(), "core_collaborator");
    assert_eq!(f.rt.state(), Lifecycle::Running);

    // explicit stop still works
    f.rt.stop().await.expect("stop");
    assert_eq!(f.rt.state(), Lifecycle::Stopped);
}

#[tokio::test]
async fn test_run_stops_gracefully_on_cancellation() {
    let f = running_fixture().await;
    let ctx = f.rt.context();

    let rt = Arc::new(f.rt);
    let runner = {
        let rt = Arc::clone(&rt);
        tokio::spawn(async move { rt.run().await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    ctx.cancel();
    runner.await.expect("join").expect("run");

    assert_eq!(rt.state(), Lifecycle::Stopped);
    let calls = f.calls.snapshot();
    assert_eq!(
        &calls[calls.len() - 4..],
        &["console.stop", "api.stop", "robot.stop", "auth.stop"]
    );
}

// ---- scenario C: stop ----

#[tokio::test]
async fn test_scenario_c_stop_then_start_is_rejected() {
    let f = running_fixture().await;
    f.rt.stop().await.expect("stop");
    assert_eq!(f.rt.state(), Lifecycle::Stopped);

    let err = f.rt.start().await.expect_err("start after stop");
    match err {
        CoreError::InvalidOp { state, .. } => assert_eq!(state, Lifecycle::Stopped),
        other => panic!("unexpected: {other:?}"),
    }
    // a second stop is a no-op
    f.rt.stop().await.expect("stop again");
}

#[tokio::test]
async fn test_stop_teardown_is_inverse_of_configure() {
    let f = running_fixture().await;
    f.rt.stop().await.expect("stop");
    let calls = f.calls.snapshot();
    assert_eq!(
        &calls[calls.len() - 4..],
        &["console.stop", "api.stop", "robot.stop", "auth.stop"]
    );
}

// ---- scenario D: halt ----

#[tokio::test]
async fn test_scenario_d_halt_from_running() {
    let f = running_fixture().await;
    f.rt.halt().await.expect("halt");
    assert_eq!(f.rt.state(), Lifecycle::Halted);

    assert!(f.rt.start().await.is_err());
    assert!(f.rt.stop().await.is_err());
    assert!(f.rt.init().is_err());
    // a second halt is a no-op
    f.rt.halt().await.expect("halt again");
    assert_eq!(f.rt.state(), Lifecycle::Halted);
}

#[tokio::test]
async fn test_scenario_d_halt_from_stopped() {
    let f = running_fixture().await;
    f.rt.stop().await.expect("stop");
    f.rt.halt().await.expect("halt");
    assert_eq!(f.rt.state(), Lifecycle::Halted);
}

#[tokio::test]
async fn test_halt_commits_before_teardown_blocks_concurrent_stop() {
    let f = slow_teardown_fixture();
    let guard = f.rt.lock().await.expect("lock");
    f.rt.configure(&guard).await.expect("configure");
    drop(guard);

    let rt = Arc::new(f.rt);
    let halter = {
        let rt = Arc::clone(&rt);
        tokio::spawn(async move { rt.halt().await })
    };
    // let the halt commit and park in the slow console teardown
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(rt.state(), Lifecycle::Halted);

    let err = rt.stop().await.expect_err("stop during halt teardown");
    match err {
        CoreError::InvalidOp { state, .. } => assert_eq!(state, Lifecycle::Halted),
        other => panic!("unexpected: {other:?}"),
    }

    halter.await.expect("join").expect("halt");
    assert_eq!(rt.state(), Lifecycle::Halted);
    // halt's teardown ran exactly once
    let stops = f
        .calls
        .snapshot()
        .iter()
        .filter(|c| c.as_str() == "console.stop")
        .count();
    assert_eq!(stops, 1);
}

#[tokio::test]
async fn test_halt_cancels_active_context() {
    let f = running_fixture().await;
    let ctx = f.rt.context();
    f.rt.halt().await.expect("halt");
    assert!(ctx.is_done());
}
