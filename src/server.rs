use crate::{
    error::{CaricatureError, Result},
    models::GeneratedImage,
    orchestrator::GenerationOrchestrator,
};
use actix_multipart::Multipart;
use actix_web::{
    http::StatusCode, middleware, web, App, HttpResponse, HttpServer, ResponseError,
};
use futures::StreamExt;
use serde::Serialize;
use serde_json::json;

/// Multipart field carrying the uploaded photo.
pub const IMAGE_FIELD: &str = "image";

pub struct AppState {
    pub orchestrator: GenerationOrchestrator,
    pub max_upload_bytes: usize,
}

#[derive(Serialize)]
struct CaricaturesResponse {
    images: Vec<GeneratedImage>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl ResponseError for CaricatureError {
    fn status_code(&self) -> StatusCode {
        match self {
            CaricatureError::NoImageProvided | CaricatureError::RequestError(_) => {
                StatusCode::BAD_REQUEST
            }
            CaricatureError::ImageTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            CaricatureError::AllStylesFailed { .. } => StatusCode::BAD_GATEWAY,
            CaricatureError::ProviderUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            CaricatureError::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let error = match self {
            CaricatureError::InternalError(_) | CaricatureError::SerializationError(_) => {
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(ErrorResponse { error })
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .service(
            web::scope("/api")
                .route("/caricatures", web::post().to(create_caricatures))
                .route("/styles", web::get().to(list_styles)),
        );
}

pub async fn run(state: AppState, port: u16) -> std::io::Result<()> {
    let data = web::Data::new(state);
    log::info!("🌐 Listening on 0.0.0.0:{}", port);

    HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .wrap(middleware::Logger::default())
            .configure(configure)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}

async fn health(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "provider": state.orchestrator.provider_name(),
        "styles": state.orchestrator.catalog().len(),
    }))
}

async fn list_styles(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.orchestrator.catalog().list_styles())
}

async fn create_caricatures(
    state: web::Data<AppState>,
    mut payload: Multipart,
) -> std::result::Result<HttpResponse, CaricatureError> {
    let (bytes, media_type) = read_image_field(&mut payload, state.max_upload_bytes)
        .await?
        .ok_or(CaricatureError::NoImageProvided)?;

    let batch = state
        .orchestrator
        .generate_styled_images(&bytes, media_type.as_deref())
        .await
        .map_err(|e| {
            log::error!("Caricature batch failed: {}", e);
            e
        })?;

    if batch.is_partial() {
        log::info!(
            "Batch {} returned {} images, {} styles dropped",
            batch.batch_id,
            batch.images.len(),
            batch.failed
        );
    }

    Ok(HttpResponse::Ok().json(CaricaturesResponse {
        images: batch.images,
    }))
}

/// Reads the `image` field, skipping any other field, up to `limit` bytes.
async fn read_image_field(
    payload: &mut Multipart,
    limit: usize,
) -> Result<Option<(Vec<u8>, Option<String>)>> {
    while let Some(field) = payload.next().await {
        let mut field = field.map_err(|e| {
            CaricatureError::RequestError(format!("Invalid multipart body: {}", e))
        })?;

        if field.name() != IMAGE_FIELD {
            while let Some(chunk) = field.next().await {
                chunk.map_err(|e| CaricatureError::RequestError(e.to_string()))?;
            }
            continue;
        }

        let media_type = field
            .content_type()
            .map(|mime| mime.essence_str().to_string());
        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| CaricatureError::RequestError(e.to_string()))?;
            if bytes.len() + chunk.len() > limit {
                return Err(CaricatureError::ImageTooLarge { limit });
            }
            bytes.extend_from_slice(&chunk);
        }
        return Ok(Some((bytes, media_type)));
    }

    Ok(None)
}
