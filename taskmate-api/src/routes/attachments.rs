/// Task attachment endpoints (bearer)
///
/// - `POST /tasks/:id/file` - multipart upload, form field `file` (201)
/// - `GET /tasks/:id/file/:file_id` - download as `application/octet-stream`

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::users::MessageResponse,
};
use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Extension,
};
use taskmate_shared::auth::middleware::AuthContext;
use uuid::Uuid;

const FILE_FIELD: &str = "file";

pub async fn upload_file(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let mut upload = None;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::BadRequest("file name is required".to_string()))?;
        let data = field.bytes().await?;

        upload = Some((file_name, data));
        break;
    }

    let (file_name, data) =
        upload.ok_or_else(|| ApiError::BadRequest("missing multipart field: file".to_string()))?;

    let attachment = state
        .tasks()
        .attach(auth.user_id, task_id, file_name, data.to_vec())
        .await?;

    Ok((
        StatusCode::CREATED,
        MessageResponse::new(format!(
            "successfully attached file: {} (file_id: {})",
            attachment.file_name, attachment.id
        )),
    ))
}

pub async fn download_file(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((task_id, file_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<impl IntoResponse> {
    let attachment = state.tasks().download(auth.user_id, task_id, file_id).await?;

    let disposition = content_disposition(&attachment.file_name);

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        attachment.file_data,
    ))
}

/// `attachment; filename="..."` with characters that would break the header dropped
fn content_disposition(file_name: &str) -> String {
    let safe: String = file_name
        .chars()
        .filter(|c| !c.is_control() && *c != '"' && *c != '\\')
        .collect();

    format!("attachment; filename=\"{}\"", safe)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition_strips_quotes() {
        assert_eq!(
            content_disposition("report.pdf"),
            "attachment; filename=\"report.pdf\""
        );
        assert_eq!(
            content_disposition("a\"b\r\n.txt"),
            "attachment; filename=\"ab.txt\""
        );
    }
}
