use refill_engine::PageFixture;
use refill_engine::agent::UserInput;
use refill_engine::browser::Browser;
use refill_engine::config::RefillConfig;
use refill_engine::profiles::{PROFILES_KEY, RECORDINGS_KEY};
use refill_engine::store::{FileStore, KeyValueStore};
use std::sync::Arc;

const LOGIN: &str = r#"
url: https://example.com/login
title: Login
body:
  - tag: form
    children:
      - tag: input
        attrs: { id: user, name: user }
"#;

#[tokio::test]
async fn profiles_outlive_the_browser_but_recording_state_does_not() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = RefillConfig::default();
    config.storage.data_dir = dir.path().to_path_buf();
    let path = config.storage.durable_path();
    let page = PageFixture::from_yaml_str(LOGIN).unwrap();

    {
        let store = Arc::new(FileStore::open(&path).await.unwrap());
        let browser = Browser::launch(&config, store);
        let tab = browser.open_tab(page.clone()).await;
        browser.popup().start("Login").await.unwrap();
        browser
            .input(
                tab,
                UserInput::Type {
                    selector: "#user".into(),
                    text: "ada".into(),
                },
                Some(0),
            )
            .await
            .unwrap();
    }

    let store = Arc::new(FileStore::open(&path).await.unwrap());
    assert!(store.get(PROFILES_KEY).await.unwrap().is_some());
    assert!(store.get(RECORDINGS_KEY).await.unwrap().is_some());

    let browser = Browser::launch(&config, store);
    assert_eq!(
        browser.popup().profiles().await.unwrap(),
        vec!["Login".to_string()]
    );
    let tab = browser.open_tab(page).await;
    assert!(!browser.recording_state(tab).await.unwrap().recording);

    assert!(browser.popup().apply("Login").await.unwrap().is_ok());
    let snapshot = browser.inspect(tab).await.unwrap();
    assert_eq!(snapshot.fields[0].value, "ada");
}

#[tokio::test]
async fn export_then_import_creates_a_copy() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileStore::open(dir.path().join("durable.json")).await.unwrap());
    let browser = Browser::launch(&RefillConfig::default(), store);
    let tab = browser
        .open_tab(PageFixture::from_yaml_str(LOGIN).unwrap())
        .await;
    browser.popup().start("Login").await.unwrap();
    browser
        .input(
            tab,
            UserInput::Type {
                selector: "#user".into(),
                text: "grace".into(),
            },
            Some(0),
        )
        .await
        .unwrap();

    let json = browser.profiles().export("Login").await.unwrap();
    let copy = browser.profiles().import("Login", &json).await.unwrap();
    assert_eq!(copy, "Login (2)");
    assert_eq!(
        browser.profiles().entries(&copy).await.unwrap(),
        browser.profiles().entries("Login").await.unwrap()
    );
    assert!(browser.profiles().import("Broken", "{not json").await.is_err());
}
