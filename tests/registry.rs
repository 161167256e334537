use ddns_srv::config::Config;
use ddns_srv::provider::registry::ProviderRegistry;
use ddns_srv::provider::RecordProvider;
use ddns_srv::{Context, Dispatcher, FileProvider};
use std::io::Write;

#[tokio::test]
async fn configured_providers_serve_updates() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("records.json");
    let mut conf_file = tempfile::NamedTempFile::new_in(dir.path()).unwrap();
    write!(
        conf_file,
        r#"{{
            "server": {{"concurrency": 2}},
            "plugins": [
                {{"module": "memory", "name": "lab", "records": {{"x.com": []}}}},
                {{"plugin": "file", "name": "disk", "path": {state:?}, "zones": ["y.com"]}}
            ]
        }}"#,
        state = state.display().to_string()
    )
    .unwrap();

    let config = Config::try_from_file(conf_file.path()).unwrap();
    let providers = ProviderRegistry::with_builtin()
        .build(&config.providers)
        .await
        .unwrap();
    let dispatcher = Dispatcher::new(providers, config.server.concurrency);

    let ctx = Context::background();
    let batch = dispatcher
        .update(
            &ctx,
            vec!["home.x.com".into(), "nas.y.com".into(), "home.example".into()],
            "2001:db8::7".parse().unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(batch.to_string(), "good 2001:db8::7\ngood 2001:db8::7\nnohost");

    // The file provider persisted its update.
    let reloaded = FileProvider::try_from_file(&state).await.unwrap();
    let records = reloaded.get_records(&ctx, "y.com").await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].data, "2001:db8::7");

    let snapshot: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&state).unwrap()).unwrap();
    assert_eq!(snapshot["y.com"][0]["name"], "nas");
    assert_eq!(snapshot["y.com"][0]["type"], "AAAA");
    assert_eq!(snapshot["y.com"][0]["ttl"], 300);
}
