//! Album JSON API.
//!
//! Every mutating endpoint answers `{success, message}` with an HTTP status
//! matching the outcome. Ids arrive either as JSON numbers or as strings.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::{Json, Router, routing::get, routing::post};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_sessions::Session;

use crate::favorites::{AlbumFavorites, FavoriteStore, GuestFavorites};
use crate::middleware::ClientIp;
use crate::models::{Album, ArtifactDetail, GUEST_ALBUM_ID};
use crate::session;
use crate::state::AppState;

use super::helpers::DATABASE_UNAVAILABLE;

/// Create the album API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/albums", get(list_albums))
        .route("/api/album/create", post(create_album))
        .route("/api/artifact/add_to_album", post(add_to_album))
        .route("/api/album/delete", post(delete_album))
        .route("/api/album/rename", post(rename_album))
        .route("/api/album/remove_artifact", post(remove_artifact))
}

/// Body of every album API answer.
#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album_id: Option<i64>,
}

type ApiReply = (StatusCode, Json<ApiResponse>);

fn succeed(message: &str) -> ApiReply {
    (
        StatusCode::OK,
        Json(ApiResponse {
            success: true,
            message: message.to_string(),
            album_id: None,
        }),
    )
}

fn fail(status: StatusCode, message: &str) -> ApiReply {
    (
        status,
        Json(ApiResponse {
            success: false,
            message: message.to_string(),
            album_id: None,
        }),
    )
}

fn login_required() -> ApiReply {
    fail(StatusCode::UNAUTHORIZED, "请先登录")
}

fn datastore_down() -> ApiReply {
    fail(StatusCode::SERVICE_UNAVAILABLE, DATABASE_UNAVAILABLE)
}

/// An id field as it arrived in a request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IdField {
    /// Absent, null, empty, zero or false.
    Missing,
    Invalid,
    Id(i64),
}

impl IdField {
    fn parse(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) | Some(Value::Bool(false)) => IdField::Missing,
            Some(Value::Number(n)) => match n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)) {
                Some(0) => IdField::Missing,
                Some(id) => IdField::Id(id),
                None => IdField::Invalid,
            },
            Some(Value::String(s)) => match s.trim() {
                "" => IdField::Missing,
                trimmed => match trimmed.parse::<i64>() {
                    Ok(0) => IdField::Missing,
                    Ok(id) => IdField::Id(id),
                    Err(_) => IdField::Invalid,
                },
            },
            Some(_) => IdField::Invalid,
        }
    }
}

/// Request body with loosely typed fields.
#[derive(Debug, Default, Deserialize)]
struct AlbumRequest {
    #[serde(default)]
    album_id: Option<Value>,
    #[serde(default)]
    artifact_id: Option<Value>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    album_name: Option<String>,
    #[serde(default)]
    is_public: Option<bool>,
}

impl AlbumRequest {
    fn album_id(&self) -> IdField {
        IdField::parse(self.album_id.as_ref())
    }

    fn artifact_id(&self) -> IdField {
        IdField::parse(self.artifact_id.as_ref())
    }

    fn trimmed_name(&self) -> &str {
        self.name.as_deref().map(str::trim).unwrap_or_default()
    }

    fn new_album_name(&self) -> &str {
        self.album_name.as_deref().map(str::trim).unwrap_or_default()
    }

    /// Whether `album_id` names the guest's session album.
    fn targets_guest_album(&self) -> bool {
        matches!(&self.album_id, Some(Value::String(s)) if s == GUEST_ALBUM_ID)
    }
}

fn body_or_reply(body: Result<Json<AlbumRequest>, JsonRejection>) -> Result<AlbumRequest, ApiReply> {
    body.map(|Json(request)| request).map_err(|rejection| {
        tracing::debug!(error = %rejection, "rejected album API body");
        fail(StatusCode::BAD_REQUEST, "请求数据无效")
    })
}

#[derive(Debug, Serialize)]
struct AlbumChoice {
    album_id: i64,
    name: String,
}

#[derive(Debug, Serialize)]
struct AlbumList {
    albums: Vec<AlbumChoice>,
}

/// Albums the current user can add to. Guests get an empty list.
///
/// GET /api/albums
async fn list_albums(State(state): State<AppState>, session: Session) -> Json<AlbumList> {
    let mut albums = Vec::new();
    if let Some(user_id) = session::current_user_id(&session).await
        && let Some(mut conn) = state.acquire().await
    {
        match Album::list_for_user(&mut conn, state.schema(), user_id).await {
            Ok(list) => {
                albums = list
                    .into_iter()
                    .map(|album| AlbumChoice {
                        album_id: album.album_id,
                        name: album.name,
                    })
                    .collect();
            }
            Err(e) => tracing::error!(error = %e, user_id, "failed to list albums"),
        }
    }
    Json(AlbumList { albums })
}

/// Create a named album.
///
/// POST /api/album/create `{name, is_public?}`
async fn create_album(
    State(state): State<AppState>,
    session: Session,
    Extension(ClientIp(ip)): Extension<ClientIp>,
    body: Result<Json<AlbumRequest>, JsonRejection>,
) -> ApiReply {
    let Some(user_id) = session::current_user_id(&session).await else {
        return login_required();
    };
    let request = match body_or_reply(body) {
        Ok(request) => request,
        Err(reply) => return reply,
    };
    let name = request.trimmed_name();
    if name.is_empty() {
        return fail(StatusCode::BAD_REQUEST, "图集名称不能为空");
    }

    let Some(mut conn) = state.acquire().await else {
        return datastore_down();
    };
    match Album::create(&mut conn, user_id, name, request.is_public.unwrap_or(true)).await {
        Ok(album_id) => {
            state
                .audit()
                .record(
                    "album_create",
                    "album",
                    &album_id.to_string(),
                    Some(user_id),
                    &ip,
                    serde_json::json!({ "name": name }),
                )
                .await;
            let (status, Json(mut response)) = succeed("图集创建成功");
            response.album_id = Some(album_id);
            (status, Json(response))
        }
        Err(e) => {
            tracing::error!(error = %e, user_id, "failed to create album");
            fail(StatusCode::INTERNAL_SERVER_ERROR, "创建图集失败")
        }
    }
}

/// Favorite an artifact.
///
/// Guests add to their session favorites. Members add to a newly named
/// album, an explicit album, or their default album.
///
/// POST /api/artifact/add_to_album `{artifact_id, album_id?, album_name?}`
async fn add_to_album(
    State(state): State<AppState>,
    session: Session,
    Extension(ClientIp(ip)): Extension<ClientIp>,
    body: Result<Json<AlbumRequest>, JsonRejection>,
) -> ApiReply {
    let request = match body_or_reply(body) {
        Ok(request) => request,
        Err(reply) => return reply,
    };
    let artifact_id = match request.artifact_id() {
        IdField::Id(id) => id,
        IdField::Invalid => return fail(StatusCode::BAD_REQUEST, "文物ID格式错误"),
        IdField::Missing => return fail(StatusCode::BAD_REQUEST, "文物ID不能为空"),
    };

    let mut conn = state.acquire().await;
    if let Some(conn) = conn.as_mut() {
        match ArtifactDetail::exists(conn, &state.queries(), artifact_id).await {
            Ok(false) => return fail(StatusCode::NOT_FOUND, "文物不存在"),
            Ok(true) => {}
            Err(e) => tracing::warn!(error = %e, artifact_id, "artifact existence check failed"),
        }
    }

    let Some(user_id) = session::current_user_id(&session).await else {
        return match GuestFavorites::new(&session).add_favorite(artifact_id).await {
            Ok(true) => {
                state
                    .audit()
                    .record(
                        "favorite_add",
                        "artifact",
                        &artifact_id.to_string(),
                        None,
                        &ip,
                        serde_json::json!({ "album": GUEST_ALBUM_ID }),
                    )
                    .await;
                succeed("已添加到默认收藏夹")
            }
            Ok(false) => succeed("该文物已在收藏夹中"),
            Err(e) => {
                tracing::error!(error = %e, "failed to store guest favorite");
                fail(StatusCode::INTERNAL_SERVER_ERROR, "添加失败")
            }
        };
    };

    let Some(mut conn) = conn else {
        return datastore_down();
    };

    let new_name = request.new_album_name();
    let album_id = if !new_name.is_empty() {
        match Album::create(&mut conn, user_id, new_name, true).await {
            Ok(album_id) => {
                state
                    .audit()
                    .record(
                        "album_create",
                        "album",
                        &album_id.to_string(),
                        Some(user_id),
                        &ip,
                        serde_json::json!({ "name": new_name }),
                    )
                    .await;
                album_id
            }
            Err(e) => {
                tracing::error!(error = %e, user_id, "failed to create album");
                return fail(StatusCode::INTERNAL_SERVER_ERROR, "创建图集失败");
            }
        }
    } else if let IdField::Id(album_id) = request.album_id() {
        album_id
    } else {
        match Album::default_for_user(&mut conn, user_id).await {
            Ok(album_id) => album_id,
            Err(e) => {
                tracing::error!(error = %e, user_id, "failed to get default album");
                return fail(StatusCode::INTERNAL_SERVER_ERROR, "获取默认图集失败");
            }
        }
    };

    match Album::find_owned(&mut conn, state.schema(), user_id, album_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return fail(StatusCode::FORBIDDEN, "无权访问该图集"),
        Err(e) => {
            tracing::error!(error = %e, album_id, "failed to check album ownership");
            return fail(StatusCode::INTERNAL_SERVER_ERROR, "添加失败");
        }
    }

    match AlbumFavorites::new(&mut conn, album_id).add_favorite(artifact_id).await {
        Ok(added) => {
            if added {
                state
                    .audit()
                    .record(
                        "favorite_add",
                        "artifact",
                        &artifact_id.to_string(),
                        Some(user_id),
                        &ip,
                        serde_json::json!({ "album_id": album_id }),
                    )
                    .await;
            }
            succeed("已添加到图集")
        }
        Err(e) => {
            tracing::error!(error = %e, album_id, artifact_id, "failed to add artifact to album");
            fail(StatusCode::INTERNAL_SERVER_ERROR, "添加失败，请检查数据库连接")
        }
    }
}

/// Look up an album the user owns, or produce the reply for a miss.
async fn owned_album(
    state: &AppState,
    conn: &mut sqlx::MySqlConnection,
    user_id: i64,
    album_id: i64,
    denied: &str,
) -> Result<Album, ApiReply> {
    match Album::find_owned(conn, state.schema(), user_id, album_id).await {
        Ok(Some(album)) => Ok(album),
        Ok(None) => Err(fail(StatusCode::FORBIDDEN, denied)),
        Err(e) => {
            tracing::error!(error = %e, album_id, "failed to check album ownership");
            Err(fail(StatusCode::INTERNAL_SERVER_ERROR, "数据库查询错误"))
        }
    }
}

/// Delete an album. The default album cannot be deleted.
///
/// POST /api/album/delete `{album_id}`
async fn delete_album(
    State(state): State<AppState>,
    session: Session,
    Extension(ClientIp(ip)): Extension<ClientIp>,
    body: Result<Json<AlbumRequest>, JsonRejection>,
) -> ApiReply {
    let Some(user_id) = session::current_user_id(&session).await else {
        return login_required();
    };
    let request = match body_or_reply(body) {
        Ok(request) => request,
        Err(reply) => return reply,
    };
    let album_id = match request.album_id() {
        IdField::Id(id) => id,
        IdField::Missing => return fail(StatusCode::BAD_REQUEST, "图集ID不能为空"),
        IdField::Invalid => return fail(StatusCode::BAD_REQUEST, "图集ID格式错误"),
    };

    let Some(mut conn) = state.acquire().await else {
        return datastore_down();
    };
    let album = match owned_album(&state, &mut conn, user_id, album_id, "图集不存在或无权限").await {
        Ok(album) => album,
        Err(reply) => return reply,
    };
    if album.is_default() {
        return fail(StatusCode::BAD_REQUEST, "不能删除默认收藏夹");
    }

    match Album::delete(&mut conn, user_id, album_id).await {
        Ok(_) => {
            state
                .audit()
                .record(
                    "album_delete",
                    "album",
                    &album_id.to_string(),
                    Some(user_id),
                    &ip,
                    serde_json::json!({ "name": album.name }),
                )
                .await;
            succeed("图集已删除")
        }
        Err(e) => {
            tracing::error!(error = %e, album_id, "failed to delete album");
            fail(StatusCode::INTERNAL_SERVER_ERROR, "删除失败")
        }
    }
}

/// Rename an album.
///
/// POST /api/album/rename `{album_id, name}`
async fn rename_album(
    State(state): State<AppState>,
    session: Session,
    Extension(ClientIp(ip)): Extension<ClientIp>,
    body: Result<Json<AlbumRequest>, JsonRejection>,
) -> ApiReply {
    let Some(user_id) = session::current_user_id(&session).await else {
        return login_required();
    };
    let request = match body_or_reply(body) {
        Ok(request) => request,
        Err(reply) => return reply,
    };
    let album_id = request.album_id();
    if album_id == IdField::Missing {
        return fail(StatusCode::BAD_REQUEST, "图集ID不能为空");
    }
    let name = request.trimmed_name();
    if name.is_empty() {
        return fail(StatusCode::BAD_REQUEST, "图集名称不能为空");
    }
    let IdField::Id(album_id) = album_id else {
        return fail(StatusCode::BAD_REQUEST, "图集ID格式错误");
    };

    let Some(mut conn) = state.acquire().await else {
        return datastore_down();
    };
    let album = match owned_album(&state, &mut conn, user_id, album_id, "图集不存在或无权限").await {
        Ok(album) => album,
        Err(reply) => return reply,
    };

    match Album::rename(&mut conn, user_id, album_id, name).await {
        Ok(_) => {
            state
                .audit()
                .record(
                    "album_rename",
                    "album",
                    &album_id.to_string(),
                    Some(user_id),
                    &ip,
                    serde_json::json!({ "from": album.name, "to": name }),
                )
                .await;
            succeed("图集已重命名")
        }
        Err(e) => {
            tracing::error!(error = %e, album_id, "failed to rename album");
            fail(StatusCode::INTERNAL_SERVER_ERROR, "重命名失败")
        }
    }
}

/// Remove an artifact from an album, or from the guest's favorites.
///
/// POST /api/album/remove_artifact `{album_id, artifact_id}`
async fn remove_artifact(
    State(state): State<AppState>,
    session: Session,
    Extension(ClientIp(ip)): Extension<ClientIp>,
    body: Result<Json<AlbumRequest>, JsonRejection>,
) -> ApiReply {
    let request = match body_or_reply(body) {
        Ok(request) => request,
        Err(reply) => return reply,
    };

    let Some(user_id) = session::current_user_id(&session).await else {
        if !request.targets_guest_album() {
            return login_required();
        }
        let artifact_id = match request.artifact_id() {
            IdField::Id(id) => id,
            IdField::Missing => return fail(StatusCode::BAD_REQUEST, "图集ID和文物ID不能为空"),
            IdField::Invalid => return fail(StatusCode::BAD_REQUEST, "ID格式错误"),
        };
        return match GuestFavorites::new(&session).remove_favorite(artifact_id).await {
            Ok(true) => {
                state
                    .audit()
                    .record(
                        "favorite_remove",
                        "artifact",
                        &artifact_id.to_string(),
                        None,
                        &ip,
                        serde_json::json!({ "album": GUEST_ALBUM_ID }),
                    )
                    .await;
                succeed("已从图集中移除")
            }
            Ok(false) => fail(StatusCode::NOT_FOUND, "该文物不在图集中"),
            Err(e) => {
                tracing::error!(error = %e, "failed to update guest favorites");
                fail(StatusCode::INTERNAL_SERVER_ERROR, "删除失败")
            }
        };
    };

    let (album_id, artifact_id) = match (request.album_id(), request.artifact_id()) {
        (IdField::Missing, _) | (_, IdField::Missing) => {
            return fail(StatusCode::BAD_REQUEST, "图集ID和文物ID不能为空");
        }
        (IdField::Id(album_id), IdField::Id(artifact_id)) => (album_id, artifact_id),
        _ => return fail(StatusCode::BAD_REQUEST, "ID格式错误"),
    };

    let Some(mut conn) = state.acquire().await else {
        return datastore_down();
    };
    if let Err(reply) = owned_album(&state, &mut conn, user_id, album_id, "无权访问该图集").await {
        return reply;
    }

    match AlbumFavorites::new(&mut conn, album_id).remove_favorite(artifact_id).await {
        Ok(true) => {
            state
                .audit()
                .record(
                    "favorite_remove",
                    "artifact",
                    &artifact_id.to_string(),
                    Some(user_id),
                    &ip,
                    serde_json::json!({ "album_id": album_id }),
                )
                .await;
            succeed("已从图集中移除")
        }
        Ok(false) => fail(StatusCode::NOT_FOUND, "该文物不在图集中"),
        Err(e) => {
            tracing::error!(error = %e, album_id, artifact_id, "failed to remove artifact");
            fail(StatusCode::INTERNAL_SERVER_ERROR, "删除失败")
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn ids_accept_numbers_and_numeric_strings() {
        assert_eq!(IdField::parse(Some(&json!(12))), IdField::Id(12));
        assert_eq!(IdField::parse(Some(&json!(" 7 "))), IdField::Id(7));
        assert_eq!(IdField::parse(Some(&json!(3.0))), IdField::Id(3));
    }

    #[test]
    fn falsy_ids_are_missing() {
        assert_eq!(IdField::parse(None), IdField::Missing);
        assert_eq!(IdField::parse(Some(&Value::Null)), IdField::Missing);
        assert_eq!(IdField::parse(Some(&json!(""))), IdField::Missing);
        assert_eq!(IdField::parse(Some(&json!(0))), IdField::Missing);
        assert_eq!(IdField::parse(Some(&json!(false))), IdField::Missing);
    }

    #[test]
    fn garbage_ids_are_invalid() {
        assert_eq!(IdField::parse(Some(&json!("abc"))), IdField::Invalid);
        assert_eq!(IdField::parse(Some(&json!([1]))), IdField::Invalid);
        assert_eq!(IdField::parse(Some(&json!(true))), IdField::Invalid);
    }

    #[test]
    fn guest_album_is_recognized_by_its_string_id() {
        let request: AlbumRequest =
            serde_json::from_value(json!({ "album_id": "guest_default", "artifact_id": 4 }))
                .unwrap();
        assert!(request.targets_guest_album());
        assert_eq!(request.artifact_id(), IdField::Id(4));
        assert_eq!(request.album_id(), IdField::Invalid);
    }

    #[test]
    fn names_are_trimmed() {
        let request: AlbumRequest =
            serde_json::from_value(json!({ "name": "  青铜器  ", "album_name": null })).unwrap();
        assert_eq!(request.trimmed_name(), "青铜器");
        assert_eq!(request.new_album_name(), "");
    }

    #[test]
    fn response_omits_album_id_unless_set() {
        let (status, Json(body)) = fail(StatusCode::FORBIDDEN, "无权访问该图集");
        assert_eq!(status, StatusCode::FORBIDDEN);
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value, json!({ "success": false, "message": "无权访问该图集" }));
    }
}
