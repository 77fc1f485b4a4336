use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::Method,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use tourdesk_shared::models::{
    Notification, NotificationPage, NotificationPreferences, RemoteConversation, RemoteMessage,
};
use tourdesk_shared::protocol::{
    ApiResponse, ConversationsQuery, CreateConversationRequest, CreateNotificationRequest,
    EditMessageRequest, MarkReadRequest, MessagesQuery, NotificationQuery, ParticipantRequest,
    PushSubscription, SendMessageRequest, ServerInfo, TemplateNotificationRequest,
};
use tourdesk_shared::types::{ConversationId, MessageId, NotificationId, UserId};

use crate::chat::ChatRepo;
use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::notifications::NotificationRepo;

#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<RwLock<ChatRepo>>,
    pub notifications: Arc<RwLock<NotificationRepo>>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(config: ServerConfig, chat: ChatRepo, notifications: NotificationRepo) -> Self {
        Self {
            chat: Arc::new(RwLock::new(chat)),
            notifications: Arc::new(RwLock::new(notifications)),
            config: Arc::new(config),
        }
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ServerError>;

fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::ok(data)))
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    let api = Router::new()
        // Chat
        .route(
            "/chat/conversations",
            get(list_conversations).post(create_conversation),
        )
        .route(
            "/chat/conversations/:id/messages",
            get(list_messages).post(send_message),
        )
        .route("/chat/conversations/:id/read", post(mark_conversation_read))
        .route("/chat/conversations/:id/participants", post(add_participant))
        .route(
            "/chat/conversations/:id/participants/:user_id",
            delete(remove_participant),
        )
        .route("/chat/messages/:id", put(edit_message).delete(delete_message))
        // Notifications
        .route("/notifications", post(create_notification))
        .route(
            "/notifications/user/:user_id",
            get(list_notifications).delete(clear_notifications),
        )
        .route("/notifications/user/:user_id/read-all", put(mark_all_notifications_read))
        .route("/notifications/:id", delete(delete_notification))
        .route("/notifications/:id/read", put(mark_notification_read))
        .route(
            "/notifications/preferences/:user_id",
            get(get_preferences).put(update_preferences),
        )
        .route("/notifications/templates/:id", post(create_from_template))
        .route("/notifications/push/subscribe", post(push_subscribe))
        .route("/notifications/push/unsubscribe", post(push_unsubscribe));

    Router::new()
        .route("/health", get(health_check))
        .route("/info", get(server_info))
        .nest("/api", api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn server_info(State(state): State<AppState>) -> Json<ServerInfo> {
    Json(ServerInfo {
        name: state.config.instance_name.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ─── Chat ───

async fn list_conversations(
    State(state): State<AppState>,
    Query(query): Query<ConversationsQuery>,
) -> ApiResult<Vec<RemoteConversation>> {
    ok(state.chat.read().await.conversations_for(&query.user_id))
}

async fn create_conversation(
    State(state): State<AppState>,
    Json(req): Json<CreateConversationRequest>,
) -> ApiResult<RemoteConversation> {
    ok(state.chat.write().await.create_or_get(req)?)
}

async fn list_messages(
    State(state): State<AppState>,
    Path(id): Path<ConversationId>,
    Query(query): Query<MessagesQuery>,
) -> ApiResult<Vec<RemoteMessage>> {
    ok(state.chat.read().await.messages(&id, query.page, query.limit)?)
}

async fn send_message(
    State(state): State<AppState>,
    Path(id): Path<ConversationId>,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<RemoteMessage> {
    if req.content.trim().is_empty() {
        return Err(ServerError::BadRequest("content must not be empty".into()));
    }
    ok(state.chat.write().await.send(&id, req)?)
}

async fn mark_conversation_read(
    State(state): State<AppState>,
    Path(id): Path<ConversationId>,
    Json(req): Json<MarkReadRequest>,
) -> ApiResult<serde_json::Value> {
    let marked = state
        .chat
        .write()
        .await
        .mark_read(&id, &req.user_id, req.message_id.as_ref())?;
    ok(json!({ "marked": marked }))
}

async fn edit_message(
    State(state): State<AppState>,
    Path(id): Path<MessageId>,
    Json(req): Json<EditMessageRequest>,
) -> ApiResult<RemoteMessage> {
    ok(state.chat.write().await.edit(&id, req.content)?)
}

async fn delete_message(
    State(state): State<AppState>,
    Path(id): Path<MessageId>,
) -> ApiResult<serde_json::Value> {
    state.chat.write().await.delete(&id)?;
    ok(json!({ "deleted": true }))
}

async fn add_participant(
    State(state): State<AppState>,
    Path(id): Path<ConversationId>,
    Json(req): Json<ParticipantRequest>,
) -> ApiResult<RemoteConversation> {
    ok(state.chat.write().await.add_participant(&id, req.user_id)?)
}

async fn remove_participant(
    State(state): State<AppState>,
    Path((id, user_id)): Path<(ConversationId, UserId)>,
) -> ApiResult<RemoteConversation> {
    ok(state.chat.write().await.remove_participant(&id, &user_id)?)
}

// ─── Notifications ───

async fn list_notifications(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Query(query): Query<NotificationQuery>,
) -> ApiResult<NotificationPage> {
    let page_size = state.config.page_size(query.page_size);
    let page = query.page.unwrap_or(1);
    ok(state
        .notifications
        .read()
        .await
        .list(&user_id, &query.filters(), page, page_size))
}

async fn create_notification(
    State(state): State<AppState>,
    Json(req): Json<CreateNotificationRequest>,
) -> ApiResult<Notification> {
    if req.draft.title.trim().is_empty() {
        return Err(ServerError::BadRequest("title must not be empty".into()));
    }
    ok(state.notifications.write().await.create(req.user_id, req.draft))
}

async fn create_from_template(
    State(state): State<AppState>,
    Path(template_id): Path<String>,
    Json(req): Json<TemplateNotificationRequest>,
) -> ApiResult<Notification> {
    ok(state
        .notifications
        .write()
        .await
        .create_from_template(&template_id, req.user_id, &req.params)?)
}

async fn mark_notification_read(
    State(state): State<AppState>,
    Path(id): Path<NotificationId>,
) -> ApiResult<Notification> {
    ok(state.notifications.write().await.mark_read(&id)?)
}

async fn mark_all_notifications_read(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> ApiResult<serde_json::Value> {
    let updated = state.notifications.write().await.mark_all_read(&user_id);
    ok(json!({ "updated": updated }))
}

async fn delete_notification(
    State(state): State<AppState>,
    Path(id): Path<NotificationId>,
) -> ApiResult<serde_json::Value> {
    state.notifications.write().await.delete(&id)?;
    ok(json!({ "deleted": true }))
}

async fn clear_notifications(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> ApiResult<serde_json::Value> {
    let removed = state.notifications.write().await.clear_all(&user_id);
    info!(user = %user_id, removed, "Notifications cleared");
    ok(json!({ "removed": removed }))
}

async fn get_preferences(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> ApiResult<NotificationPreferences> {
    ok(state.notifications.read().await.preferences(&user_id))
}

async fn update_preferences(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Json(prefs): Json<NotificationPreferences>,
) -> ApiResult<NotificationPreferences> {
    ok(state
        .notifications
        .write()
        .await
        .update_preferences(&user_id, prefs))
}

async fn push_subscribe(
    State(state): State<AppState>,
    Json(sub): Json<PushSubscription>,
) -> ApiResult<serde_json::Value> {
    let user_id = sub.user_id.clone();
    let mut repo = state.notifications.write().await;
    let created = repo.subscribe(sub);
    ok(json!({
        "subscribed": true,
        "created": created,
        "subscriptions": repo.subscription_count(&user_id),
    }))
}

async fn push_unsubscribe(
    State(state): State<AppState>,
    Json(sub): Json<PushSubscription>,
) -> ApiResult<serde_json::Value> {
    let removed = state.notifications.write().await.unsubscribe(&sub);
    ok(json!({ "unsubscribed": removed }))
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
