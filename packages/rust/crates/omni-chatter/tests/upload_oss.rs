#![allow(missing_docs)]

mod support;

use std::sync::Arc;

use anyhow::Result;
use axum::{
    Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::put,
};
use omni_chatter::{ObjectStorageConfig, OssUploader, Uploader};
use tokio::sync::Mutex;

use support::spawn_test_server;

#[derive(Clone, Debug)]
struct StoredObject {
    key: String,
    authorization: String,
    content_type: String,
    body: String,
}

#[derive(Clone, Default)]
struct StorageState {
    objects: Arc<Mutex<Vec<StoredObject>>>,
    reject: Arc<Mutex<bool>>,
}

async fn put_object(
    Path(key): Path<String>,
    State(state): State<StorageState>,
    headers: HeaderMap,
    body: String,
) -> StatusCode {
    if *state.reject.lock().await {
        return StatusCode::FORBIDDEN;
    }
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string()
    };
    state.objects.lock().await.push(StoredObject {
        key,
        authorization: header("authorization"),
        content_type: header("content-type"),
        body,
    });
    StatusCode::OK
}

fn storage_config() -> ObjectStorageConfig {
    ObjectStorageConfig {
        endpoint: "oss-cn-hangzhou.aliyuncs.com".to_string(),
        bucket: "chat-logs".to_string(),
        region: "cn-hangzhou".to_string(),
        access_key_id: "AKID".to_string(),
        access_key_secret: "secret".to_string(),
        key_prefix: "history".to_string(),
    }
}

async fn spawn_storage() -> Result<Option<(OssUploader, StorageState, tokio::task::JoinHandle<()>)>> {
    let state = StorageState::default();
    let app = Router::new()
        .route("/{*key}", put(put_object))
        .with_state(state.clone());
    let Some((base, handle)) = spawn_test_server(app).await? else {
        return Ok(None);
    };
    let uploader = OssUploader::new(&storage_config())?.with_base_url(base);
    Ok(Some((uploader, state, handle)))
}

#[tokio::test]
async fn upload_puts_signed_json_object_under_prefix() -> Result<()> {
    let Some((uploader, state, handle)) = spawn_storage().await? else {
        return Ok(());
    };

    let object_key = uploader.upload(r#"[{"text":"hi"}]"#.to_string()).await?;

    assert!(object_key.starts_with("history/"));
    assert!(object_key.ends_with(".json"));
    let objects = state.objects.lock().await;
    assert_eq!(objects.len(), 1);
    assert_eq!(objects[0].key, object_key);
    assert_eq!(objects[0].body, r#"[{"text":"hi"}]"#);
    assert_eq!(objects[0].content_type, "application/json");
    assert!(
        objects[0]
            .authorization
            .starts_with("OSS4-HMAC-SHA256 Credential=AKID/")
    );
    assert!(objects[0].authorization.contains("/cn-hangzhou/oss/aliyun_v4_request"));
    drop(objects);

    handle.abort();
    Ok(())
}

#[tokio::test]
async fn rejected_upload_is_an_error() -> Result<()> {
    let Some((uploader, state, handle)) = spawn_storage().await? else {
        return Ok(());
    };
    *state.reject.lock().await = true;

    let error = uploader
        .upload("[]".to_string())
        .await
        .err()
        .ok_or_else(|| anyhow::anyhow!("upload should fail"))?;
    assert!(format!("{error:#}").contains("403"));

    handle.abort();
    Ok(())
}
