use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::mpsc;

use super::CompilerActor;
use crate::actor::messages::{CompilerMsg, RuntimeMsg};
use crate::bridge::MemoryBridge;
use crate::cache::BuildCache;
use crate::collab::NoInstaller;
use crate::compiler::{InitialBuild, Pipeline};
use crate::config::HotviewConfig;
use crate::core::BuildMode;

struct Setup {
    _dir: TempDir,
    config: Arc<HotviewConfig>,
    compiler_tx: mpsc::Sender<CompilerMsg>,
    runtime_rx: mpsc::Receiver<RuntimeMsg>,
}

fn spawn_actor(initial: &[&str]) -> Setup {
    let dir = TempDir::new().unwrap();
    let config = Arc::new(HotviewConfig::for_root(dir.path()));
    std::fs::create_dir_all(&config.build.app).unwrap();

    let cache = Arc::new(BuildCache::new(&config.root));
    let gate = InitialBuild::new(initial.iter().map(|k| format!("app/{k}")), Duration::ZERO);
    let pipeline = Arc::new(Pipeline::new(
        Arc::clone(&config),
        cache,
        Arc::new(MemoryBridge::new()),
        Arc::new(NoInstaller),
        gate,
        BuildMode::Watch,
    ));

    let (compiler_tx, compiler_rx) = mpsc::channel(8);
    let (runtime_tx, runtime_rx) = mpsc::channel(8);
    tokio::spawn(CompilerActor::new(compiler_rx, runtime_tx, pipeline).run());

    Setup {
        _dir: dir,
        config,
        compiler_tx,
        runtime_rx,
    }
}

async fn next(rx: &mut mpsc::Receiver<RuntimeMsg>) -> RuntimeMsg {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("runtime message")
        .expect("channel open")
}

#[tokio::test]
async fn test_initial_load_then_live_builds() {
    let mut setup = spawn_actor(&[]);
    let app = setup.config.build.app.clone();
    std::fs::write(app.join("a.view"), "view Main {\n  render <p>a</p>\n}\n").unwrap();

    // Not live yet: the build writes the artifact but sends nothing
    setup
        .compiler_tx
        .send(CompilerMsg::Build(vec![app.join("a.view")]))
        .await
        .unwrap();
    setup.compiler_tx.send(CompilerMsg::InitialLoad).await.unwrap();

    match next(&mut setup.runtime_rx).await {
        RuntimeMsg::Load { file, defs } => {
            assert_eq!(file, "app/a.view");
            assert_eq!(defs.len(), 1);
            assert_eq!(defs[0].name, "Main");
        }
        other => panic!("expected load, got {:?}", other),
    }
    assert!(matches!(next(&mut setup.runtime_rx).await, RuntimeMsg::Render));

    std::fs::write(app.join("b.view"), "view Side {\n  render x\n}\n").unwrap();
    setup
        .compiler_tx
        .send(CompilerMsg::Build(vec![app.join("b.view")]))
        .await
        .unwrap();
    match next(&mut setup.runtime_rx).await {
        RuntimeMsg::Load { file, defs } => {
            assert_eq!(file, "app/b.view");
            assert_eq!(defs[0].name, "Side");
        }
        other => panic!("expected load, got {:?}", other),
    }
}

#[tokio::test]
async fn test_failed_build_sends_nothing() {
    let mut setup = spawn_actor(&[]);
    let app = setup.config.build.app.clone();
    setup.compiler_tx.send(CompilerMsg::InitialLoad).await.unwrap();
    assert!(matches!(next(&mut setup.runtime_rx).await, RuntimeMsg::Render));

    std::fs::write(app.join("bad.view"), "view Broken {\n  render <p>\n").unwrap();
    std::fs::write(app.join("ok.view"), "view Ok {\n  render ok\n}\n").unwrap();
    setup
        .compiler_tx
        .send(CompilerMsg::Build(vec![app.join("bad.view"), app.join("ok.view")]))
        .await
        .unwrap();

    match next(&mut setup.runtime_rx).await {
        RuntimeMsg::Load { file, .. } => assert_eq!(file, "app/ok.view"),
        other => panic!("expected load, got {:?}", other),
    }
}

#[tokio::test]
async fn test_remove_sends_delete() {
    let mut setup = spawn_actor(&[]);
    let app = setup.config.build.app.clone();
    let source = app.join("gone.view");
    std::fs::write(&source, "view Gone {\n  render x\n}\n").unwrap();

    setup.compiler_tx.send(CompilerMsg::Build(vec![source.clone()])).await.unwrap();
    setup.compiler_tx.send(CompilerMsg::InitialLoad).await.unwrap();
    assert!(matches!(next(&mut setup.runtime_rx).await, RuntimeMsg::Load { .. }));
    assert!(matches!(next(&mut setup.runtime_rx).await, RuntimeMsg::Render));

    std::fs::remove_file(&source).unwrap();
    setup.compiler_tx.send(CompilerMsg::Remove(vec![source])).await.unwrap();
    match next(&mut setup.runtime_rx).await {
        RuntimeMsg::Delete { file } => assert_eq!(file, "app/gone.view"),
        other => panic!("expected delete, got {:?}", other),
    }
    assert!(!setup.config.build.out.join("gone.js").exists());
}
