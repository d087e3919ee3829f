//! End-to-end tests: bundle → loader → registry → resolution host.

use std::fs::File;
use std::path::Path;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant, SystemTime};

use stowage_core::test_support::ScriptRuntime;
use stowage_core::{
    install_resolution_hook, CacheOutcome, ContentDigest, DirBundle, EmbeddedLoader, LoadRoute,
    Registry, ResolutionHost, StaticBundle, StowageError,
};

static APP: StaticBundle = StaticBundle::new(
    "ConsoleApp",
    &[
        (
            "ConsoleApp.Newtonsoft.Json.dll",
            b"MODULE Newtonsoft.Json, Version=13.0.0.0, Culture=neutral" as &[u8],
        ),
        ("ConsoleApp.sqlite3.so", b"NATIVE SQLite, Version=3.45" as &[u8]),
        ("ConsoleApp.sqlite3-v2.so", b"NATIVE SQLite, Version=3.46" as &[u8]),
        (
            "ConsoleApp.Fake.Json.dll",
            b"MODULE Newtonsoft.Json, Version=13.0.0.0, Culture=neutral\nfork" as &[u8],
        ),
    ],
);

fn leaked_host() -> &'static ResolutionHost {
    Box::leak(Box::new(ResolutionHost::new()))
}

fn loader_in(
    cache: &Path,
    host: &'static ResolutionHost,
    runtime: Arc<ScriptRuntime>,
) -> EmbeddedLoader {
    EmbeddedLoader::builder(runtime)
        .registry(Arc::new(Registry::new()))
        .host(host)
        .cache_dir(cache)
        .bundle(Arc::new(APP))
        .build()
}

fn backdate(path: &Path) -> SystemTime {
    let past = SystemTime::UNIX_EPOCH + Duration::from_secs(86_400 * 365);
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(past)
        .unwrap();
    past
}

#[test]
fn loaded_module_resolves_to_same_handle() {
    let dir = tempfile::tempdir().unwrap();
    let host = leaked_host();
    let loader = loader_in(dir.path(), host, Arc::new(ScriptRuntime::new()));

    let report = loader
        .load("ConsoleApp.Newtonsoft.Json.dll", "Newtonsoft.Json.dll", None)
        .unwrap();

    let resolved = host
        .resolve("Newtonsoft.Json, Version=13.0.0.0, Culture=neutral")
        .expect("registered module should resolve");
    assert!(Arc::ptr_eq(&resolved, &report.handle));
    // The file name is not the identity.
    assert!(host.resolve("Newtonsoft.Json.dll").is_none());
}

#[test]
fn native_payload_lands_in_cache_dir() {
    let dir = tempfile::tempdir().unwrap();
    let host = leaked_host();
    let loader = loader_in(dir.path(), host, Arc::new(ScriptRuntime::new()));

    let report = loader.load("ConsoleApp.sqlite3.so", "sqlite3.so", None).unwrap();

    assert!(matches!(report.route, LoadRoute::Disk(_)));
    let cached = dir.path().join("sqlite3.so");
    assert!(cached.is_file());
    assert_eq!(std::fs::read(&cached).unwrap(), b"NATIVE SQLite, Version=3.45");
    assert!(host.resolve("SQLite, Version=3.45").is_some());
}

#[test]
fn identical_payload_reuses_cached_file() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = Arc::new(ScriptRuntime::new());

    // Two loaders over one cache directory behave like two runs of the app.
    let first = loader_in(dir.path(), leaked_host(), runtime.clone());
    let report = first.load("ConsoleApp.sqlite3.so", "sqlite3.so", None).unwrap();
    let LoadRoute::Disk(entry) = report.route else {
        panic!("expected disk route");
    };
    assert_eq!(entry.outcome, CacheOutcome::Written);
    let marker = backdate(&entry.path);

    let second = loader_in(dir.path(), leaked_host(), runtime.clone());
    let report = second.load("ConsoleApp.sqlite3.so", "sqlite3.so", None).unwrap();
    let LoadRoute::Disk(entry) = report.route else {
        panic!("expected disk route");
    };
    assert_eq!(entry.outcome, CacheOutcome::Hit);
    assert_eq!(std::fs::metadata(&entry.path).unwrap().modified().unwrap(), marker);
    assert_eq!(runtime.disk_loads(), 2);
}

#[test]
fn stale_cached_file_is_overwritten() {
    let dir = tempfile::tempdir().unwrap();
    let cached = dir.path().join("sqlite3.so");
    std::fs::write(&cached, b"NATIVE SQLite, Version=3.45").unwrap();

    let loader = loader_in(dir.path(), leaked_host(), Arc::new(ScriptRuntime::new()));
    let report = loader.load("ConsoleApp.sqlite3-v2.so", "sqlite3.so", None).unwrap();

    let LoadRoute::Disk(entry) = report.route else {
        panic!("expected disk route");
    };
    assert_eq!(entry.outcome, CacheOutcome::Written);
    assert_eq!(std::fs::read(&cached).unwrap(), b"NATIVE SQLite, Version=3.46");
    assert_eq!(entry.digest, ContentDigest::compute(b"NATIVE SQLite, Version=3.46"));
    assert_eq!(report.identity.as_str(), "SQLite, Version=3.46");
}

#[test]
fn distinct_payloads_with_same_identity_conflict() {
    let dir = tempfile::tempdir().unwrap();
    let loader = loader_in(dir.path(), leaked_host(), Arc::new(ScriptRuntime::new()));

    loader
        .load("ConsoleApp.Newtonsoft.Json.dll", "Newtonsoft.Json.dll", None)
        .unwrap();
    let err = loader
        .load("ConsoleApp.Fake.Json.dll", "Fake.Json.dll", None)
        .unwrap_err();

    assert!(matches!(
        err,
        StowageError::DuplicateIdentity { ref identity }
            if identity == "Newtonsoft.Json, Version=13.0.0.0, Culture=neutral"
    ));
}

#[test]
fn empty_registry_hook_never_touches_storage() {
    let dir = tempfile::tempdir().unwrap();
    let cache = dir.path().join("never-created");
    let host = leaked_host();
    let _loader = loader_in(&cache, host, Arc::new(ScriptRuntime::new()));

    for name in ["System.Runtime", "Newtonsoft.Json, Version=13.0.0.0", ""] {
        assert!(host.resolve(name).is_none());
    }
    assert!(!cache.exists());
}

#[test]
fn missing_resource_leaves_state_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let loader = loader_in(dir.path(), leaked_host(), Arc::new(ScriptRuntime::new()));

    let err = loader.load("Nonexistent.Resource.dll", "x.dll", None).unwrap_err();

    assert!(matches!(err, StowageError::ResourceNotFound { .. }));
    assert!(loader.registry().is_empty());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn directory_bundle_as_context() {
    let cache = tempfile::tempdir().unwrap();
    let payloads = tempfile::tempdir().unwrap();
    std::fs::write(
        payloads.path().join("Lib.Zerobased.Core.dll"),
        b"MODULE Zerobased.Core, Version=1.0.0.0",
    )
    .unwrap();

    let host = leaked_host();
    let loader = loader_in(cache.path(), host, Arc::new(ScriptRuntime::new()));
    let bundle = DirBundle::new(payloads.path());
    loader
        .load("Lib.Zerobased.Core.dll", "Zerobased.Core.dll", Some(&bundle))
        .unwrap();

    assert!(host.resolve("Zerobased.Core, Version=1.0.0.0").is_some());
}

#[test]
fn resolution_runs_concurrently_with_loads() {
    let dir = tempfile::tempdir().unwrap();
    let host = leaked_host();
    let loader = Arc::new(loader_in(dir.path(), host, Arc::new(ScriptRuntime::new())));
    let start = Arc::new(Barrier::new(5));

    // Each resolver keeps asking until the module shows up, collecting every
    // handle it was given along the way.
    let resolvers: Vec<_> = (0..4)
        .map(|_| {
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                let deadline = Instant::now() + Duration::from_secs(10);
                let mut seen = Vec::new();
                while seen.is_empty() && Instant::now() < deadline {
                    match host.resolve("SQLite, Version=3.45") {
                        Some(handle) => seen.push(handle),
                        None => thread::yield_now(),
                    }
                    assert!(host.resolve("Unknown, Version=0.0").is_none());
                }
                for _ in 0..100 {
                    seen.extend(host.resolve("SQLite, Version=3.45"));
                }
                seen
            })
        })
        .collect();

    let worker = {
        let loader = Arc::clone(&loader);
        let start = Arc::clone(&start);
        thread::spawn(move || {
            start.wait();
            loader
                .load("ConsoleApp.Newtonsoft.Json.dll", "Newtonsoft.Json.dll", None)
                .unwrap();
            loader.load("ConsoleApp.sqlite3.so", "sqlite3.so", None).unwrap()
        })
    };

    let report = worker.join().unwrap();
    for r in resolvers {
        let seen = r.join().unwrap();
        assert_eq!(seen.len(), 101, "resolver never observed the loaded module");
        assert!(seen.iter().all(|h| Arc::ptr_eq(h, &report.handle)));
    }
    assert!(Arc::ptr_eq(
        &host.resolve("SQLite, Version=3.45").unwrap(),
        &report.handle
    ));
}

#[test]
fn builder_defaults_use_process_wide_state() {
    static GLOBAL: StaticBundle = StaticBundle::new(
        "Global",
        &[("Global.Unique.dll", b"MODULE Global.Unique, Version=9.9.9" as &[u8])],
    );

    let dir = tempfile::tempdir().unwrap();
    let loader = EmbeddedLoader::builder(Arc::new(ScriptRuntime::new()))
        .cache_dir(dir.path())
        .bundle(Arc::new(GLOBAL))
        .build();
    assert!(Arc::ptr_eq(loader.registry(), Registry::global()));

    // The builder already subscribed the global registry.
    assert!(!install_resolution_hook(ResolutionHost::global(), Registry::global()));

    loader.load("Global.Unique.dll", "Global.Unique.dll", None).unwrap();
    assert!(ResolutionHost::global()
        .resolve("Global.Unique, Version=9.9.9")
        .is_some());
}
