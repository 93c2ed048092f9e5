use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderValue, Request, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tower::ServiceBuilder;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::{DefaultOnResponse, MakeSpan, TraceLayer};
use tracing::{Level, Span};

use crate::application::pipeline::ThumbnailResponse;
use crate::application::state::AppState;
use crate::domain::thumbnails::PLACEHOLDER_CONTENT_TYPE;

/// One week.
const THUMBNAIL_CACHE_CONTROL: &str = "public, max-age=604800";
/// Placeholders stand in for transient failures and must not be cached.
const PLACEHOLDER_CACHE_CONTROL: &str = "no-store";

pub fn app_router(state: AppState) -> axum::Router {
    axum::Router::new()
        .route("/", get(serve_thumbnail))
        .route("/{*path}", get(serve_thumbnail))
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(ThumbMakeSpan)
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                .layer(SetResponseHeaderLayer::overriding(
                    header::X_CONTENT_TYPE_OPTIONS,
                    HeaderValue::from_static("nosniff"),
                )),
        )
        .with_state(state)
}

#[derive(Clone)]
struct ThumbMakeSpan;

impl<B> MakeSpan<B> for ThumbMakeSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        tracing::info_span!(
            "request",
            method = %request.method(),
            uri = %request.uri(),
            version = ?request.version(),
        )
    }
}

/// Serve a thumbnail for any path, falling back to a placeholder image.
/// Always responds with 200.
async fn serve_thumbnail(State(state): State<AppState>, uri: Uri) -> Response {
    match state.pipeline.handle(uri.path()).await {
        ThumbnailResponse::Generated(thumbnail) => image_response(
            Bytes::from(thumbnail.data),
            thumbnail.content_type,
            THUMBNAIL_CACHE_CONTROL,
        ),
        ThumbnailResponse::Placeholder(kind) => image_response(
            state.placeholders.resolve(kind),
            PLACEHOLDER_CONTENT_TYPE,
            PLACEHOLDER_CACHE_CONTROL,
        ),
    }
}

fn image_response(body: Bytes, content_type: &'static str, cache_control: &'static str) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, cache_control),
        ],
        body,
    )
        .into_response()
}
