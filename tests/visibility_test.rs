use cadaster::api::ApiClient;
use cadaster::config::Config;
use cadaster::roles::Role;
use cadaster::stores::settings::SettingsStore;
use cadaster::stores::visibility::{VisibilityStore, ATTRIBUTE_RULES_KEY, EDIT_PERMISSIONS_KEY};
use mockito::Matcher;
use serde_json::json;

fn store_for(server: &mockito::Server) -> VisibilityStore {
    let config = Config {
        api_base_url: server.url(),
        ..Config::default()
    };
    VisibilityStore::new(SettingsStore::new(ApiClient::new(config)))
}

fn settings_body(rules_blob: &str) -> String {
    // Timestamps as the backend emits them: str(datetime), space separator.
    json!([
        {
            "id": 1,
            "setting_key": ATTRIBUTE_RULES_KEY,
            "setting_value": rules_blob,
            "description": "Per-attribute role visibility rules",
            "created_at": "2026-01-01 12:00:00.123456",
            "updated_at": "2026-01-02 08:15:00"
        }
    ])
    .to_string()
}

#[tokio::test]
async fn test_loaded_rules_drive_attribute_visibility() {
    let blob = json!([
        {
            "attributePath": "price",
            "label": "Price",
            "visibleForRoles": ["admin", "user3"]
        }
    ])
    .to_string();

    let mut server = mockito::Server::new_async().await;
    let _get = server
        .mock("GET", "/map-settings")
        .with_header("content-type", "application/json")
        .with_body(settings_body(&blob))
        .create_async()
        .await;

    let mut store = store_for(&server);
    store.load().await.unwrap();

    assert!(store.is_visible("price", Role::Admin));
    assert!(store.is_visible("price", Role::User3));
    assert!(!store.is_visible("price", Role::User2));

    // No rule authored for this attribute: hidden for every role.
    for role in Role::ALL {
        assert!(!store.is_visible("cadastral_number", role));
    }
}

#[tokio::test]
async fn test_malformed_rule_blob_recovers_empty() {
    let mut server = mockito::Server::new_async().await;
    let _get = server
        .mock("GET", "/map-settings")
        .with_header("content-type", "application/json")
        .with_body(settings_body("{definitely not an array"))
        .create_async()
        .await;

    let mut store = store_for(&server);
    store.load().await.unwrap();

    assert!(store.rules().is_empty());
    assert!(!store.is_visible("price", Role::Admin));
}

#[tokio::test]
async fn test_save_attribute_rules_upserts_blob() {
    let mut server = mockito::Server::new_async().await;
    let _get = server
        .mock("GET", "/map-settings")
        .with_header("content-type", "application/json")
        .with_body("[]")
        .create_async()
        .await;

    let post = server
        .mock("POST", "/map-settings")
        .match_body(Matcher::PartialJson(json!({
            "settingKey": ATTRIBUTE_RULES_KEY,
        })))
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": 10,
                "setting_key": ATTRIBUTE_RULES_KEY,
                "setting_value": "[]",
                "description": null
            })
            .to_string(),
        )
        .create_async()
        .await;

    let mut store = store_for(&server);
    store.load().await.unwrap();
    store.toggle_attribute("price", "Price", Role::Admin);
    store.save_attribute_rules().await.unwrap();

    post.assert_async().await;
}

#[tokio::test]
async fn test_failed_save_keeps_edits_for_retry() {
    let mut server = mockito::Server::new_async().await;
    let _get = server
        .mock("GET", "/map-settings")
        .with_header("content-type", "application/json")
        .with_body("[]")
        .create_async()
        .await;
    let _post = server
        .mock("POST", "/map-settings")
        .with_status(502)
        .create_async()
        .await;

    let mut store = store_for(&server);
    store.load().await.unwrap();
    store.toggle_attribute("price", "Price", Role::Admin);

    assert!(store.save_attribute_rules().await.is_err());

    // The unsaved edit survives for a manual retry.
    assert!(store.is_visible("price", Role::Admin));
}

#[tokio::test]
async fn test_edit_permissions_round_trip() {
    let mut server = mockito::Server::new_async().await;
    let _get = server
        .mock("GET", "/map-settings")
        .with_header("content-type", "application/json")
        .with_body(
            json!([
                {
                    "id": 2,
                    "setting_key": EDIT_PERMISSIONS_KEY,
                    "setting_value": json!({"allowedRoles": ["admin", "user4"]}).to_string(),
                    "description": null
                }
            ])
            .to_string(),
        )
        .create_async()
        .await;

    let post = server
        .mock("POST", "/map-settings")
        .match_body(Matcher::PartialJson(json!({
            "settingKey": EDIT_PERMISSIONS_KEY,
            "settingValue": json!({"allowedRoles": ["admin"]}).to_string(),
        })))
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": 2,
                "setting_key": EDIT_PERMISSIONS_KEY,
                "setting_value": "{}",
                "description": null
            })
            .to_string(),
        )
        .create_async()
        .await;

    let mut store = store_for(&server);
    store.load().await.unwrap();

    assert!(store.can_edit(Role::Admin));
    assert!(store.can_edit(Role::User4));
    assert!(!store.can_edit(Role::User1));

    store.toggle_edit_role(Role::User4);
    store.save_edit_permissions().await.unwrap();
    post.assert_async().await;
}
