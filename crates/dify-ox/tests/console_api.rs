use dify_ox::{
    ChatPayload, Dify, DifyRequestError, ErrorKind, EventKind,
    app::{AppListQuery, AppMode},
    conversation::{ConversationListQuery, SortBy},
    dataset::{CreateDatasetRequest, DataSource, DatasetListQuery},
    files::{FileUploadRequest, UploadSource},
    tag::{TagBindingRequest, TagType},
};
use futures_util::StreamExt;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ADMIN_KEY: &str = "console-token";

#[tokio::test]
async fn list_apps_sends_paging_query() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/console/api/apps"))
        .and(query_param("page", "2"))
        .and(query_param("limit", "20"))
        .and(query_param("mode", "advanced-chat"))
        .and(header("Authorization", format!("Bearer {ADMIN_KEY}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "page": 2,
            "limit": 20,
            "total": 21,
            "has_more": false,
            "data": [{
                "id": "app-1",
                "name": "Support bot",
                "mode": "advanced-chat",
                "icon_type": "emoji",
                "icon": "🤖",
                "tags": [{"id": "tag-1", "name": "prod", "type": "app", "binding_count": "3"}]
            }]
        })))
        .mount(&mock_server)
        .await;

    let dify = Dify::new(mock_server.uri(), ADMIN_KEY);
    let query = AppListQuery::builder()
        .page(2)
        .limit(20)
        .mode(AppMode::AdvancedChat)
        .build();
    let page = dify.list_apps(&query).await.unwrap();

    assert_eq!(page.total, Some(21));
    assert!(!page.has_more());
    assert_eq!(page.data[0].mode, Some(AppMode::AdvancedChat));
    assert_eq!(page.data[0].tags[0].binding_count, 3);
}

#[tokio::test]
async fn api_keys_are_unwrapped() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/console/api/apps/app-1/api-keys"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": "key-1", "type": "app", "token": "app-abc", "last_used_at": null, "created_at": 1}]
        })))
        .mount(&mock_server)
        .await;

    let dify = Dify::new(mock_server.uri(), ADMIN_KEY);
    let keys = dify.get_api_keys("app-1").await.unwrap();

    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0].token, "app-abc");
    assert_eq!(keys[0].key_type, "app");
}

#[tokio::test]
async fn delete_with_no_content_succeeds() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/console/api/apps/app-1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dify = Dify::new(mock_server.uri(), ADMIN_KEY);
    assert!(dify.delete_app("app-1").await.unwrap().is_success());
}

#[tokio::test]
async fn tags_are_created_and_bound() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/console/api/tags"))
        .and(body_json(json!({"name": "prod", "type": "knowledge"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "tag-1", "name": "prod", "type": "knowledge", "binding_count": 0
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/console/api/tag-bindings/create"))
        .and(body_json(json!({"tag_ids": ["tag-1"], "target_id": "ds-1", "type": "knowledge"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dify = Dify::new(mock_server.uri(), ADMIN_KEY);
    let tag = dify.create_tag("prod", TagType::Knowledge).await.unwrap();
    assert_eq!(tag.tag_type, TagType::Knowledge);

    let binding = TagBindingRequest::new([tag.id], "ds-1", TagType::Knowledge);
    assert!(dify.bind_tags(&binding).await.unwrap().is_success());
}

#[tokio::test]
async fn conversations_use_the_app_key() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/conversations"))
        .and(query_param("user", "user-1"))
        .and(query_param("sort_by", "-created_at"))
        .and(header("Authorization", "Bearer app-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "limit": 20,
            "has_more": false,
            "data": [{"id": "c1", "name": "Greetings", "inputs": {}, "status": "normal", "created_at": 1}]
        })))
        .mount(&mock_server)
        .await;

    let dify = Dify::new(mock_server.uri(), ADMIN_KEY);
    let query = ConversationListQuery::builder()
        .user("user-1")
        .sort_by(SortBy::CreatedAtDesc)
        .build();
    let list = dify.list_conversations("app-key", &query).await.unwrap();

    assert_eq!(list.data[0].name, "Greetings");
    assert!(matches!(
        dify.list_conversations("", &query).await,
        Err(DifyRequestError::AuthenticationMissing)
    ));
}

#[tokio::test]
async fn upload_sends_multipart_with_source() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/console/api/files/upload"))
        .and(query_param("source", "datasets"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "file-1",
            "name": "handbook.md",
            "size": 11,
            "extension": "md",
            "mime_type": "text/markdown",
            "created_by": "user-1",
            "created_at": 1
        })))
        .mount(&mock_server)
        .await;

    let dify = Dify::new(mock_server.uri(), ADMIN_KEY);
    let request = FileUploadRequest::from_bytes("handbook.md", b"# Handbook\n".to_vec());
    let uploaded = dify
        .upload_file(request, UploadSource::Datasets)
        .await
        .unwrap();

    assert_eq!(uploaded.id, "file-1");
    assert_eq!(uploaded.size, 11);
}

#[tokio::test]
async fn rejected_stream_surfaces_api_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat-messages"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "code": "unauthorized",
            "message": "Access token is invalid",
            "status": 401
        })))
        .mount(&mock_server)
        .await;

    let dify = Dify::new(mock_server.uri(), ADMIN_KEY);
    let payload = ChatPayload::builder().query("Hi").user("user-1").build();
    let mut events = dify.chat("bad-key", &payload).unwrap();

    let err = events.next().await.unwrap().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Auth);
    assert!(matches!(
        err,
        DifyRequestError::Api { status: 401, ref code, .. } if code == "unauthorized"
    ));
    assert!(events.next().await.is_none());
}

#[tokio::test]
async fn event_stream_body_is_decoded() {
    let mock_server = MockServer::start().await;

    let body = concat!(
        "data: {\"event\":\"agent_thought\",\"id\":\"th1\",\"task_id\":\"t1\",\"message_id\":\"m1\",\"conversation_id\":\"c1\",\"position\":1,\"thought\":\"look it up\",\"tool\":\"search\",\"tool_input\":\"{}\",\"created_at\":1}\n\n",
        "data: {\"event\":\"agent_message\",\"task_id\":\"t1\",\"message_id\":\"m1\",\"conversation_id\":\"c1\",\"answer\":\"Found it\",\"created_at\":1}\n\n",
        "event: ping\n\n",
        "data: {\"event\":\"message_end\",\"task_id\":\"t1\",\"message_id\":\"m1\",\"conversation_id\":\"c1\",\"metadata\":{}}\n\n",
    );

    Mock::given(method("POST"))
        .and(path("/v1/chat-messages"))
        .and(header("Authorization", "Bearer app-key"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "text/event-stream"))
        .mount(&mock_server)
        .await;

    let dify = Dify::new(mock_server.uri(), ADMIN_KEY);
    let payload = ChatPayload::builder().query("Where is it?").user("user-1").build();
    let kinds: Vec<_> = dify
        .chat("app-key", &payload)
        .unwrap()
        .map(|event| event.unwrap().kind())
        .collect()
        .await;

    assert_eq!(
        kinds,
        vec![EventKind::AgentThought, EventKind::AgentMessage, EventKind::MessageEnd]
    );
}

#[tokio::test]
async fn list_datasets_joins_tag_ids() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/console/api/datasets"))
        .and(query_param("page", "1"))
        .and(query_param("limit", "30"))
        .and(query_param("include_all", "true"))
        .and(query_param("tag_ids", "tag-1,tag-2"))
        .and(header("Authorization", format!("Bearer {ADMIN_KEY}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "page": 1,
            "limit": 30,
            "total": 1,
            "has_more": false,
            "data": [{
                "id": "ds-1",
                "name": "Handbook",
                "permission": "only_me",
                "indexing_technique": "high_quality",
                "document_count": 2,
                "created_at": 1
            }]
        })))
        .mount(&mock_server)
        .await;

    let dify = Dify::new(mock_server.uri(), ADMIN_KEY);
    let query = DatasetListQuery::builder()
        .include_all(true)
        .tag_ids(vec!["tag-1".to_string(), "tag-2".to_string()])
        .build();
    let page = dify.list_datasets(&query).await.unwrap();

    assert_eq!(page.total, Some(1));
    assert_eq!(page.data[0].id, "ds-1");
    assert_eq!(page.data[0].document_count, Some(2));
}

#[tokio::test]
async fn create_dataset_posts_to_init() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/console/api/datasets/init"))
        .and(body_json(json!({
            "data_source": {
                "type": "upload_file",
                "info_list": {
                    "data_source_type": "upload_file",
                    "file_info_list": {"file_ids": ["file-1"]}
                }
            },
            "indexing_technique": "high_quality",
            "doc_form": "text_model",
            "doc_language": "English"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "dataset": {"id": "ds-1", "name": "handbook.md...", "indexing_technique": "high_quality"},
            "documents": [{"id": "doc-1", "name": "handbook.md", "position": 1, "indexing_status": "waiting", "enabled": true}],
            "batch": "20250101000000123456"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dify = Dify::new(mock_server.uri(), ADMIN_KEY);
    let request = CreateDatasetRequest::builder()
        .data_source(DataSource::uploaded_files(["file-1"]))
        .build();
    let created = dify.create_dataset(&request).await.unwrap();

    assert_eq!(created.dataset.id, "ds-1");
    assert_eq!(created.documents[0].indexing_status.as_deref(), Some("waiting"));
    assert_eq!(created.batch.as_deref(), Some("20250101000000123456"));
}

#[tokio::test]
async fn delete_dataset_accepts_empty_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/console/api/datasets/ds-1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dify = Dify::new(mock_server.uri(), ADMIN_KEY);
    assert!(dify.delete_dataset("ds-1").await.unwrap().is_success());
    assert!(matches!(
        dify.delete_dataset(" ").await,
        Err(DifyRequestError::Caller(_))
    ));
}
