use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use arcana_assets::{
    chained_loader, processor_fn, Asset, AssetData, AssetPipeline, AssetRoots, AssetsConfig,
    ConfigError, DependenciesStage, LoadError, LoadStage, Loader, LoaderContext, LoaderRegistry,
    MemoryLoader, PipelineError, SharedLoader, UrlLoader,
};
use futures::future::BoxFuture;
use serde_json::json;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
};
use url::Url;

/// Loader that records every request.
struct Recording {
    name: &'static str,
    serves: &'static [&'static str],
    log: Arc<Mutex<Vec<String>>>,
}

impl Loader for Recording {
    fn load<'a>(
        &'a self,
        path: &'a str,
        content_type: Option<&'a str>,
    ) -> BoxFuture<'a, Result<AssetData, LoadError>> {
        Box::pin(async move {
            self.log
                .lock()
                .unwrap()
                .push(format!("{}:{}", self.name, path));

            if self.serves.iter().any(|served| *served == path) {
                Ok(AssetData {
                    bytes: format!("{} {}", self.name, path).into_bytes().into(),
                    content_type: content_type.map(str::to_owned),
                    source: self.name.to_owned(),
                })
            } else {
                Err(LoadError::Unavailable {
                    path: path.to_owned(),
                    reason: format!("not in {}", self.name),
                })
            }
        })
    }
}

fn recording(
    name: &'static str,
    serves: &'static [&'static str],
    log: &Arc<Mutex<Vec<String>>>,
) -> SharedLoader {
    Arc::new(Recording {
        name,
        serves,
        log: log.clone(),
    })
}

fn visited(tag: &'static str) -> impl arcana_assets::AssetProcessor {
    processor_fn(move |mut asset: Asset| async move {
        let mut visits = asset
            .remove("visits")
            .and_then(|v| v.as_array().cloned())
            .unwrap_or_default();
        visits.push(tag.into());
        asset.insert("visits", visits);
        Ok::<_, PipelineError>(asset)
    })
}

#[tokio::test]
async fn chain_attempts_loaders_last_to_first() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let chain = chained_loader([
        recording("L0", &["a.png"], &log),
        recording("L1", &[], &log),
        recording("L2", &[], &log),
    ])
    .unwrap();

    let data = chain.load("a.png", None).await.unwrap();
    assert_eq!(&*data.bytes, b"L0 a.png");
    assert_eq!(*log.lock().unwrap(), ["L2:a.png", "L1:a.png", "L0:a.png"]);
}

#[tokio::test]
async fn single_failing_loader_propagates_error() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let chain = chained_loader([recording("L0", &[], &log)]).unwrap();

    let err = chain.load("a.png", None).await.unwrap_err();
    match &err {
        LoadError::Unavailable { path, reason } => {
            assert_eq!(path, "a.png");
            assert_eq!(reason, "not in L0");
        }
        err => panic!("unexpected error {err:?}"),
    }
}

#[test]
fn empty_chain_rejected() {
    assert!(matches!(
        chained_loader(Vec::<SharedLoader>::new()),
        Err(ConfigError::EmptyChain)
    ));
}

#[tokio::test]
async fn roots_dispatch_by_first_segment() {
    let mut registry = LoaderRegistry::new();
    let log = Arc::new(Mutex::new(Vec::new()));

    let log_a = log.clone();
    registry
        .register("LoaderA", move |_: toml::Table, _: &LoaderContext| {
            Ok(Recording {
                name: "A",
                serves: &["sub/path.png"],
                log: log_a.clone(),
            })
        })
        .unwrap();

    let log_b = log.clone();
    registry
        .register("LoaderB", move |_: toml::Table, _: &LoaderContext| {
            Ok(Recording {
                name: "B",
                serves: &["sub/path.png"],
                log: log_b.clone(),
            })
        })
        .unwrap();

    let config = AssetsConfig::from_toml(
        r#"
        [[roots]]
        name = "a"
        loaders = [{ type = "LoaderA" }]

        [[roots]]
        name = "b"
        loaders = [{ type = "LoaderB" }]
        "#,
    )
    .unwrap();

    let cx = LoaderContext::new(Url::parse("file:///srv/app/").unwrap());
    let roots = AssetRoots::from_config(&config, &registry, &cx).unwrap();

    let data = roots.load("b/sub/path.png", None).await.unwrap();
    assert_eq!(&*data.bytes, b"B sub/path.png");
    assert_eq!(*log.lock().unwrap(), ["B:sub/path.png"]);

    let err = roots.load("c/x", None).await.unwrap_err();
    assert!(matches!(err, LoadError::Config(ConfigError::UnknownRoot { .. })));

    let err = roots.load("noslash", None).await.unwrap_err();
    assert!(matches!(err, LoadError::Config(ConfigError::MissingRoot { .. })));

    assert_eq!(log.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn dependencies_pass_through_full_pipeline() {
    let pipeline = AssetPipeline::builder()
        .with_processor(visited("before"))
        .with_stage(DependenciesStage)
        .with_processor(visited("after"))
        .build();

    let asset = pipeline
        .process_value(json!({
            "dependencies": {
                "tex": { "dependencies": {} },
                "mesh": { "dependencies": {} },
            }
        }))
        .await
        .unwrap();

    for key in ["tex", "mesh"] {
        let dependency = asset.dependency(key).unwrap();
        assert_eq!(dependency.get("visits"), Some(&json!(["before", "after"])));
    }
    assert_eq!(asset.get("visits"), Some(&json!(["before", "after"])));
}

#[tokio::test]
async fn sibling_dependencies_resolve_concurrently() {
    let barrier = Arc::new(tokio::sync::Barrier::new(2));

    let pipeline = AssetPipeline::builder()
        .with_stage(DependenciesStage)
        .with_processor(processor_fn(move |asset: Asset| {
            let barrier = barrier.clone();
            async move {
                // Only sibling dependencies wait, the parent has no `wait` field.
                if asset.get("wait").is_some() {
                    barrier.wait().await;
                }
                Ok::<_, PipelineError>(asset)
            }
        }))
        .build();

    let resolve = pipeline.process_value(json!({
        "dependencies": {
            "tex": { "wait": true },
            "mesh": { "wait": true },
        }
    }));

    let asset = tokio::time::timeout(Duration::from_secs(5), resolve)
        .await
        .expect("siblings must not be resolved one after another")
        .unwrap();
    assert_eq!(asset.dependencies().count(), 2);
}

#[tokio::test]
async fn malformed_dependencies_rejected() {
    let pipeline = AssetPipeline::builder()
        .with_stage(DependenciesStage)
        .build();

    for dependencies in [json!([1, 2, 3]), json!("x")] {
        let err = pipeline
            .process_value(json!({ "dependencies": dependencies }))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::MalformedDependencies));
        assert!(err.is_config());
    }

    let err = pipeline
        .process_value(json!({ "dependencies": { "ok": {}, "bad": 1 } }))
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::MalformedDependency { key } if key == "bad"));

    // Malformed nested dependency fails the whole parent.
    let err = pipeline
        .process_value(json!({ "dependencies": { "mat": { "dependencies": [] } } }))
        .await
        .unwrap_err();
    assert!(matches!(&err, PipelineError::Dependency { key, .. } if key == "mat"));
    assert!(matches!(err.root_cause(), PipelineError::MalformedDependencies));
}

#[tokio::test]
async fn null_dependency_is_not_loaded() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let pipeline = AssetPipeline::builder()
        .with_stage(LoadStage::shared(recording("L", &["tex.png"], &log)))
        .with_stage(DependenciesStage)
        .build();

    let asset = pipeline
        .process_value(json!({
            "dependencies": {
                "tex": { "path": "tex.png" },
                "normal": null,
            }
        }))
        .await
        .unwrap();

    assert!(asset.dependency("normal").is_none());
    assert_eq!(
        &*asset.dependency("tex").unwrap().data().unwrap().bytes,
        b"L tex.png"
    );
    assert_eq!(*log.lock().unwrap(), ["L:tex.png"]);
}

#[tokio::test]
async fn stages_feed_each_other_in_order() {
    let pipeline = AssetPipeline::builder()
        .with_processor(visited("A"))
        .with_processor(visited("B"))
        .build();

    let asset = pipeline.process(Asset::new()).await.unwrap();
    assert_eq!(asset.get("visits"), Some(&json!(["A", "B"])));
}

#[tokio::test]
async fn failed_dependency_fails_parent() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let pipeline = AssetPipeline::builder()
        .with_stage(LoadStage::shared(recording("L", &["tex.png"], &log)))
        .with_stage(DependenciesStage)
        .build();

    let err = pipeline
        .process_value(json!({
            "dependencies": {
                "tex": { "path": "tex.png" },
                "mesh": { "path": "mesh.obj" },
            }
        }))
        .await
        .unwrap_err();

    assert!(matches!(&err, PipelineError::Dependency { key, .. } if key == "mesh"));
    assert!(matches!(
        err.root_cause(),
        PipelineError::Load(LoadError::Unavailable { .. })
    ));
    assert!(!err.is_config());
}

#[tokio::test]
async fn file_roots_with_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let primary = dir.path().join("primary");
    let fallback = dir.path().join("fallback");
    std::fs::create_dir_all(primary.join("tex")).unwrap();
    std::fs::create_dir_all(fallback.join("tex")).unwrap();
    std::fs::write(primary.join("tex").join("a.png"), b"primary a").unwrap();
    std::fs::write(fallback.join("tex").join("a.png"), b"fallback a").unwrap();
    std::fs::write(fallback.join("tex").join("b.png"), b"fallback b").unwrap();
    std::fs::write(dir.path().join("model.json"), b"{}").unwrap();

    let config = AssetsConfig::from_toml(&format!(
        r#"
        [[roots]]
        name = "data"
        loaders = [
            {{ type = "RelativeURLLoader", rel_path = "fallback/" }},
            {{ type = "URLLoader", root_url = "{}", disable_cache = true }},
        ]
        "#,
        Url::from_directory_path(&primary).unwrap()
    ))
    .unwrap();

    let cx = LoaderContext::new(Url::from_directory_path(dir.path()).unwrap());
    let roots = AssetRoots::from_config(&config, &LoaderRegistry::with_builtin(), &cx).unwrap();

    let pipeline = AssetPipeline::builder()
        .with_stage(LoadStage::new(roots))
        .with_stage(DependenciesStage)
        .build();

    let asset = pipeline
        .process_value(json!({
            "path": "data/../model.json",
            "dependencies": {
                "a": { "path": "data/tex/a.png", "mimeType": "image/png" },
                "b": { "path": "data/tex/b.png" },
            }
        }))
        .await
        .unwrap();

    // Roots are not sandboxes.
    assert_eq!(&*asset.data().unwrap().bytes, b"{}");

    let a = asset.dependency("a").unwrap().data().unwrap();
    assert_eq!(&*a.bytes, b"primary a");
    assert_eq!(a.content_type.as_deref(), Some("image/png"));

    let b = asset.dependency("b").unwrap().data().unwrap();
    assert_eq!(&*b.bytes, b"fallback b");
}

/// Local HTTP server that serves `files` and answers 404 otherwise.
async fn serve_http(files: &'static [(&'static str, &'static str)]) -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let (mut stream, _) = listener.accept().await.unwrap();

            let mut head = Vec::new();
            let mut buf = [0; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                head.extend_from_slice(&buf[..n]);
            }

            let head = String::from_utf8(head).unwrap();
            let target = head.split(' ').nth(1).unwrap_or_default();
            let path = target.split('?').next().unwrap_or_default();

            let (status, body) = match files.iter().find(|(served, _)| *served == path) {
                Some((_, body)) => ("200 OK", *body),
                None => ("404 Not Found", ""),
            };

            let response = format!(
                "HTTP/1.1 {status}\r\n\
                 Content-Length: {}\r\n\
                 Connection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
        }
    });

    Url::parse(&format!("http://{addr}/data/")).unwrap()
}

#[tokio::test]
async fn http_root_falls_back_on_missing_asset() {
    let root_url = serve_http(&[("/data/tex/remote.png", "remote")]).await;
    let client = reqwest::Client::builder().no_proxy().build().unwrap();

    let chain = chained_loader([
        Arc::new(MemoryLoader::new().with("tex/local.png", &b"local"[..])) as SharedLoader,
        Arc::new(UrlLoader::new(root_url, true).with_http_client(client)),
    ])
    .unwrap();

    let data = chain.load("tex/remote.png", None).await.unwrap();
    assert_eq!(&*data.bytes, b"remote");
    assert!(data.source.starts_with("http://"));

    let data = chain.load("tex/local.png", None).await.unwrap();
    assert_eq!(&*data.bytes, b"local");

    let err = chain.load("tex/none.png", None).await.unwrap_err();
    assert!(matches!(err, LoadError::Unavailable { .. }));
}
