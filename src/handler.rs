use axum::{
    Router,
    extract::{DefaultBodyLimit, Multipart, State},
    http::{HeaderMap, StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use axum_macros::debug_handler;
use tower_http::trace::TraceLayer;

use std::sync::Arc;

use crate::{
    dto::{SendEmailResponse, SubmissionForm, UploadedFile},
    error::{ErrorKind, SubmitError, ValidationError},
    page::{self, Flash},
    service::EmailService,
    upload::UploadStore,
};

pub struct AppState {
    pub service: EmailService,
    pub uploads: UploadStore,
    pub max_repeat: Option<u32>,
}

pub fn router(state: Arc<AppState>, max_upload_bytes: Option<usize>) -> Router {
    let body_limit = max_upload_bytes.map_or_else(DefaultBodyLimit::disable, DefaultBodyLimit::max);

    Router::new()
        .route("/", get(show_form).post(submit_form))
        .route("/health", get(health_check))
        .with_state(state)
        .layer(body_limit)
        .layer(TraceLayer::new_for_http())
}

#[debug_handler]
pub async fn show_form(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let flash = Flash::from_headers(&headers);
    let page = Html(page::render_form(flash.as_ref(), state.max_repeat).into_string());

    if flash.is_some() {
        ([(header::SET_COOKIE, page::clear_flash_cookie())], page).into_response()
    } else {
        page.into_response()
    }
}

#[debug_handler]
pub async fn submit_form(State(state): State<Arc<AppState>>, multipart: Multipart) -> Response {
    let flash = match process_submission(&state, multipart).await {
        Ok(response) => Flash::success(response.message),
        Err(e) => {
            if e.kind() == ErrorKind::Validation {
                tracing::info!("Rejected form submission: {e}");
            } else {
                tracing::error!("Failed to send email: {e}");
            }
            Flash::error(e.user_message())
        }
    };

    let redirect = Redirect::to("/");
    match flash.to_cookie() {
        Some(cookie) => ([(header::SET_COOKIE, cookie)], redirect).into_response(),
        None => {
            tracing::warn!("Could not encode flash message, redirecting without it");
            redirect.into_response()
        }
    }
}

#[debug_handler]
pub async fn health_check() -> Response {
    (StatusCode::OK, "Hello from repeat-mailer!").into_response()
}

async fn process_submission(
    state: &AppState,
    multipart: Multipart,
) -> Result<SendEmailResponse, SubmitError> {
    let form = read_form(multipart).await?;
    let mut request = form.validate(state.max_repeat)?;

    if let Some(file) = &form.attachment {
        request.attachment = Some(state.uploads.save(file).await?);
    }

    Ok(state.service.send_email(&request).await?)
}

async fn read_form(mut multipart: Multipart) -> Result<SubmissionForm, ValidationError> {
    let mut form = SubmissionForm::default();

    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        match name.as_str() {
            "attachment" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                // browsers send an empty part when no file was picked
                if !file_name.is_empty() {
                    form.attachment = Some(UploadedFile {
                        file_name,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            "recipient" => form.recipient = Some(field.text().await?),
            "subject" => form.subject = Some(field.text().await?),
            "body" => form.body = Some(field.text().await?),
            "repeat" => form.repeat = Some(field.text().await?),
            other => tracing::debug!("Ignoring unexpected form field '{other}'"),
        }
    }

    Ok(form)
}
