use refill_common::protocol::{ApplyReply, Reply};
use refill_common::{EntryKind, TabId};
use refill_engine::PageFixture;
use refill_engine::agent::UserInput;
use refill_engine::browser::Browser;
use refill_engine::config::RefillConfig;
use refill_engine::registry::RECORDING_TABS_KEY;
use refill_engine::store::{KeyValueStore, MemoryStore};
use refill_page::recorder::{INDICATOR_TAG, STOP_BUTTON_ATTR};
use std::sync::Arc;

const SIGNUP: &str = r#"
url: https://example.com/signup
title: Sign up
body:
  - tag: form
    attrs: { id: signup }
    children:
      - tag: input
        attrs: { id: email, name: email }
      - tag: input
        attrs: { id: password, name: password, type: password }
      - tag: input
        attrs: { id: remember, name: remember, type: checkbox }
      - tag: button
        attrs: { type: submit }
        text: Create account
"#;

fn signup() -> PageFixture {
    PageFixture::from_yaml_str(SIGNUP).unwrap()
}

fn launch() -> Browser {
    launch_with(RefillConfig::default())
}

fn launch_with(config: RefillConfig) -> Browser {
    Browser::launch(&config, Arc::new(MemoryStore::new()))
}

fn type_text(selector: &str, text: &str) -> UserInput {
    UserInput::Type {
        selector: selector.into(),
        text: text.into(),
    }
}

fn started_name(reply: &Reply) -> String {
    match reply {
        Reply::Ack(ack) if ack.ok => ack.profile_name.clone().unwrap(),
        other => panic!("start failed: {:?}", other),
    }
}

async fn field_value(browser: &Browser, tab: TabId, selector: &str) -> (String, bool) {
    let snapshot = browser.inspect(tab).await.unwrap();
    let field = snapshot
        .fields
        .iter()
        .find(|f| f.selector == selector || f.name.as_deref() == Some(selector))
        .unwrap_or_else(|| panic!("no field {} in {:?}", selector, snapshot.fields));
    (field.value.clone(), field.checked)
}

#[tokio::test]
async fn records_signup_and_replays_after_reload() {
    let browser = launch();
    let popup = browser.popup();
    let tab = browser.open_tab(signup()).await;

    let name = started_name(&popup.start("Signup").await.unwrap());
    assert_eq!(name, "Signup");

    let report = browser.input(tab, type_text("#email", "a"), Some(0)).await.unwrap();
    assert_eq!(report.captured, 1);
    // Within the throttle window: value changes but nothing is captured.
    let report = browser.input(tab, type_text("#email", "ab"), Some(100)).await.unwrap();
    assert_eq!(report.captured, 0);
    browser.input(tab, type_text("#email", "abc"), Some(700)).await.unwrap();
    browser.input(tab, type_text("#password", "hunter2"), Some(800)).await.unwrap();
    let report = browser
        .input(
            tab,
            UserInput::SetChecked {
                selector: "#remember".into(),
                checked: true,
            },
            Some(900),
        )
        .await
        .unwrap();
    assert_eq!(report.captured, 1);
    assert!(popup.stop().await.unwrap().is_ok());

    let entries = browser.profiles().entries("Signup").await.unwrap();
    assert_eq!(entries.len(), 4);
    assert_eq!(entries[1].value.as_deref(), Some("abc"));
    assert_eq!(entries[3].kind, EntryKind::InputChange);
    assert_eq!(entries[3].checked, Some(true));

    browser.reload(tab).await.unwrap();
    assert_eq!(field_value(&browser, tab, "email").await.0, "");

    let reply = popup.apply("Signup").await.unwrap();
    assert_eq!(
        reply,
        Reply::Apply(ApplyReply {
            success: true,
            applied: 3,
            total: 3
        })
    );
    assert_eq!(field_value(&browser, tab, "email").await.0, "abc");
    assert_eq!(field_value(&browser, tab, "password").await.0, "hunter2");
    assert!(field_value(&browser, tab, "remember").await.1);

    // Stopped tabs stay stopped across reloads.
    assert!(!browser.recording_state(tab).await.unwrap().recording);
}

#[tokio::test]
async fn start_reserves_unique_profile_names() {
    let browser = launch();
    let popup = browser.popup();
    browser.open_tab(signup()).await;
    assert_eq!(started_name(&popup.start("  Checkout ").await.unwrap()), "Checkout");

    browser.open_tab(signup()).await;
    assert_eq!(started_name(&popup.start("Checkout").await.unwrap()), "Checkout (2)");

    assert_eq!(
        popup.profiles().await.unwrap(),
        vec!["Checkout".to_string(), "Checkout (2)".to_string()]
    );

    let blank = popup.start("   ").await.unwrap();
    assert!(!blank.is_ok());
}

#[tokio::test]
async fn starting_an_already_recording_tab_keeps_its_profile() {
    let browser = launch();
    let popup = browser.popup();
    let tab = browser.open_tab(signup()).await;
    assert_eq!(started_name(&popup.start("signup").await.unwrap()), "signup");
    assert_eq!(started_name(&popup.start("signup").await.unwrap()), "signup");
    assert_eq!(started_name(&popup.start("other").await.unwrap()), "signup");
    assert_eq!(popup.profiles().await.unwrap(), vec!["signup".to_string()]);

    browser.input(tab, type_text("#email", "a"), Some(0)).await.unwrap();
    browser.reload(tab).await.unwrap();
    browser.input(tab, type_text("#email", "ab"), Some(0)).await.unwrap();

    let state = browser.recording_state(tab).await.unwrap();
    assert_eq!(state.profile_name.as_deref(), Some("signup"));
    let snapshot = browser.inspect(tab).await.unwrap();
    assert_eq!(snapshot.recording.as_deref(), Some("signup"));
    assert_eq!(browser.profiles().entries("signup").await.unwrap().len(), 2);
    assert_eq!(popup.profiles().await.unwrap(), vec!["signup".to_string()]);
}

#[tokio::test]
async fn recording_survives_navigation_and_reload() {
    let browser = launch();
    let popup = browser.popup();
    let tab = browser.open_tab(signup()).await;
    popup.start("Multi").await.unwrap();

    browser.input(tab, type_text("#email", "first"), Some(0)).await.unwrap();
    browser.reload(tab).await.unwrap();

    let snapshot = browser.inspect(tab).await.unwrap();
    assert_eq!(snapshot.recording.as_deref(), Some("Multi"));
    let report = browser.input(tab, type_text("#email", "second"), Some(0)).await.unwrap();
    assert_eq!(report.captured, 1);

    browser.navigate(tab, signup()).await.unwrap();
    let state = browser.recording_state(tab).await.unwrap();
    assert!(state.recording);
    assert_eq!(state.profile_name.as_deref(), Some("Multi"));

    let entries = browser.profiles().entries("Multi").await.unwrap();
    assert_eq!(entries.len(), 2);
}

#[tokio::test]
async fn agent_is_injected_on_first_message_when_not_loaded() {
    let mut config = RefillConfig::default();
    config.agent.inject_on_load = false;
    let browser = launch_with(config);
    let popup = browser.popup();
    let tab = browser.open_tab(signup()).await;
    assert!(!browser.inspect(tab).await.unwrap().injected);

    assert!(popup.start("Late").await.unwrap().is_ok());

    let snapshot = browser.inspect(tab).await.unwrap();
    assert!(snapshot.injected);
    assert_eq!(snapshot.recording.as_deref(), Some("Late"));

    // The next page load starts without an agent again; re-arming injects it.
    browser.reload(tab).await.unwrap();
    let snapshot = browser.inspect(tab).await.unwrap();
    assert!(snapshot.injected);
    assert_eq!(snapshot.recording.as_deref(), Some("Late"));
}

#[tokio::test]
async fn indicator_stop_button_ends_recording() {
    let browser = launch();
    let popup = browser.popup();
    let tab = browser.open_tab(signup()).await;
    popup.start("Stoppable").await.unwrap();

    let stop = format!("{}>button[{}]", INDICATOR_TAG, STOP_BUTTON_ATTR);
    let report = browser
        .input(tab, UserInput::Click { selector: stop }, None)
        .await
        .unwrap();
    assert!(report.stop_requested);
    assert_eq!(report.captured, 0);

    assert!(!browser.recording_state(tab).await.unwrap().recording);
    assert!(browser.inspect(tab).await.unwrap().recording.is_none());
    let registry = browser.ephemeral().get(RECORDING_TABS_KEY).await.unwrap();
    assert_eq!(registry, Some(serde_json::json!({})));

    browser.reload(tab).await.unwrap();
    assert!(browser.inspect(tab).await.unwrap().recording.is_none());
}

#[tokio::test]
async fn closing_a_tab_keeps_its_registry_entry() {
    let browser = launch();
    let popup = browser.popup();
    let tab = browser.open_tab(signup()).await;
    popup.start("Orphan").await.unwrap();

    browser.close_tab(tab).await.unwrap();
    assert!(browser.active_tab().await.is_none());

    let registry = browser.ephemeral().get(RECORDING_TABS_KEY).await.unwrap();
    assert_eq!(
        registry,
        Some(serde_json::json!({ tab.to_string(): { "profileName": "Orphan" } }))
    );
    assert!(popup.stop().await.is_ok_and(|reply| !reply.is_ok()));
}

#[tokio::test]
async fn deleting_a_profile_stops_tabs_recording_into_it() {
    let browser = launch();
    let popup = browser.popup();
    let tab = browser.open_tab(signup()).await;
    popup.start("Doomed").await.unwrap();
    browser.input(tab, type_text("#email", "x"), Some(0)).await.unwrap();

    assert_eq!(popup.delete("Doomed", |_| false).await.unwrap(), None);
    assert_eq!(popup.profiles().await.unwrap(), vec!["Doomed".to_string()]);

    let reply = popup.delete("Doomed", |_| true).await.unwrap().unwrap();
    assert!(reply.is_ok());
    assert!(popup.profiles().await.unwrap().is_empty());
    assert!(!browser.recording_state(tab).await.unwrap().recording);

    let report = browser.input(tab, type_text("#email", "y"), Some(900)).await.unwrap();
    assert_eq!(report.captured, 0);
    assert!(!popup.delete("Doomed", |_| true).await.unwrap().unwrap().is_ok());
}

#[tokio::test]
async fn applying_an_unknown_profile_fails_without_touching_the_page() {
    let browser = launch();
    let popup = browser.popup();
    let tab = browser.open_tab(signup()).await;

    let reply = popup.apply("Nope").await.unwrap();
    assert!(!reply.is_ok());
    assert_eq!(field_value(&browser, tab, "email").await.0, "");
}

#[tokio::test]
async fn popup_without_active_tab_is_rejected() {
    let browser = launch();
    let popup = browser.popup();
    assert!(!popup.start("Nowhere").await.unwrap().is_ok());
    assert!(!popup.apply("Nowhere").await.unwrap().is_ok());
    assert!(popup.profiles().await.unwrap().is_empty());
}
