//! HTTP front end for the geotagging pipeline.
//!
//! Thin collaborator around [`crate::pipeline::geotag_image`]: it owns
//! transport (JSON/base64 or raw binary), bearer-token auth, coordinate
//! range validation, the payload size ceiling, and the mapping from core
//! failure kinds to HTTP status codes. No geotagging logic lives here.

use std::sync::Arc;

use base64::Engine as _;
use serde::Deserialize;
use tide::{Request, Response, StatusCode};

use crate::config::Config;
use crate::error::GeotagError;
use crate::pipeline;

/// Shared server state: the startup-injected configuration.
#[derive(Clone)]
pub struct State {
    pub config: Arc<Config>,
}

pub fn mount(app: &mut tide::Server<State>) {
    app.at("/healthz").get(healthz);
    app.at("/v1/geotag").post(geotag_json);
    app.at("/v1/geotag/binary").post(geotag_binary);
}

/// JSON request body for `POST /v1/geotag`.
#[derive(Debug, Deserialize)]
struct GeotagPayload {
    /// Raw base64 or a full data URI of the input image.
    image_base64: String,
    latitude: f64,
    longitude: f64,
    annotation: Option<String>,
}

/// Query parameters for `POST /v1/geotag/binary`.
#[derive(Debug, Deserialize)]
struct GeotagQuery {
    latitude: f64,
    longitude: f64,
    annotation: Option<String>,
}

async fn healthz(_req: Request<State>) -> tide::Result<Response> {
    Ok(Response::builder(StatusCode::Ok)
        .body(tide::convert::json!({ "status": "ok" }))
        .build())
}

async fn geotag_json(mut req: Request<State>) -> tide::Result<Response> {
    if let Some(denied) = check_auth(&req) {
        return Ok(denied);
    }

    if let Some(denied) = req.len().and_then(|declared| enforce_payload_limit(&req, declared)) {
        return Ok(denied);
    }

    let payload: GeotagPayload = match req.body_json().await {
        Ok(payload) => payload,
        Err(e) => return Ok(reason(StatusCode::BadRequest, format!("invalid request body: {e}"))),
    };

    if let Some(denied) = validate_range(payload.latitude, payload.longitude) {
        return Ok(denied);
    }

    let image_bytes = match base64::engine::general_purpose::STANDARD
        .decode(strip_data_uri(&payload.image_base64).trim())
    {
        Ok(bytes) => bytes,
        Err(e) => return Ok(reason(StatusCode::BadRequest, format!("invalid base64 image: {e}"))),
    };

    if let Some(denied) = enforce_payload_limit(&req, image_bytes.len()) {
        return Ok(denied);
    }

    match pipeline::geotag_image(
        &image_bytes,
        payload.latitude,
        payload.longitude,
        payload.annotation.as_deref(),
    ) {
        Ok(out) => {
            let b64 = base64::engine::general_purpose::STANDARD.encode(&out);
            Ok(Response::builder(StatusCode::Ok)
                .body(tide::convert::json!({
                    "image_base64": format!("data:image/jpeg;base64,{b64}"),
                }))
                .build())
        }
        Err(err) => Ok(error_response(err)),
    }
}

async fn geotag_binary(mut req: Request<State>) -> tide::Result<Response> {
    if let Some(denied) = check_auth(&req) {
        return Ok(denied);
    }

    if let Some(denied) = req.len().and_then(|declared| enforce_payload_limit(&req, declared)) {
        return Ok(denied);
    }

    let query: GeotagQuery = match req.query() {
        Ok(query) => query,
        Err(e) => return Ok(reason(StatusCode::BadRequest, format!("invalid query: {e}"))),
    };

    if let Some(denied) = validate_range(query.latitude, query.longitude) {
        return Ok(denied);
    }

    let image_bytes = req.body_bytes().await?;
    if let Some(denied) = enforce_payload_limit(&req, image_bytes.len()) {
        return Ok(denied);
    }

    match pipeline::geotag_image(
        &image_bytes,
        query.latitude,
        query.longitude,
        query.annotation.as_deref(),
    ) {
        Ok(out) => Ok(Response::builder(StatusCode::Ok)
            .content_type(tide::http::mime::JPEG)
            .header(
                "Content-Disposition",
                "attachment; filename=\"geotagged.jpg\"",
            )
            .body(out)
            .build()),
        Err(err) => Ok(error_response(err)),
    }
}

/// Check the bearer token against the configured API key.
///
/// Open access when no key is configured. Missing header → 401, anything
/// other than the exact `Bearer <key>` → 403.
fn check_auth(req: &Request<State>) -> Option<Response> {
    let expected = req.state().config.auth.api_key.as_deref()?;

    let header = match req.header("Authorization") {
        Some(values) => values.last().as_str(),
        None => return Some(Response::builder(StatusCode::Unauthorized).build()),
    };

    let parts: Vec<_> = header.splitn(2, ' ').collect();
    if parts.len() == 2 && parts[0] == "Bearer" && parts[1] == expected {
        None
    } else {
        Some(Response::builder(StatusCode::Forbidden).build())
    }
}

fn validate_range(latitude: f64, longitude: f64) -> Option<Response> {
    if !(-90.0..=90.0).contains(&latitude) {
        return Some(reason(
            StatusCode::BadRequest,
            format!("latitude {latitude} outside [-90, 90]"),
        ));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Some(reason(
            StatusCode::BadRequest,
            format!("longitude {longitude} outside [-180, 180]"),
        ));
    }
    None
}

/// Reject payloads above the configured ceiling.
///
/// Handlers call this twice: on the declared Content-Length before buffering
/// the body (so an oversized upload never occupies a full-size buffer), and
/// again on the actual bytes after the read, which covers chunked bodies
/// that carry no length up front.
fn enforce_payload_limit(req: &Request<State>, size: usize) -> Option<Response> {
    let limit = req.state().config.limits.max_payload_bytes;
    if size > limit {
        log::warn!("rejecting {size}-byte payload (limit {limit})");
        return Some(error_response(GeotagError::PayloadTooLarge { size, limit }));
    }
    None
}

/// Strip a `data:<mime>;base64,` prefix if present; everything before the
/// last comma is discarded.
fn strip_data_uri(input: &str) -> &str {
    input.rsplit(',').next().unwrap_or(input)
}

fn status_for(err: &GeotagError) -> StatusCode {
    match err {
        GeotagError::UnreadableImage(_) => StatusCode::UnprocessableEntity,
        GeotagError::OversizedAnnotation { .. } => StatusCode::PayloadTooLarge,
        GeotagError::PayloadTooLarge { .. } => StatusCode::PayloadTooLarge,
        GeotagError::EncodeFailure(_) => StatusCode::InternalServerError,
    }
}

fn error_response(err: GeotagError) -> Response {
    let status = status_for(&err);
    if status.is_server_error() {
        log::error!("geotag failed: {err}");
    } else {
        log::debug!("rejecting request: {err}");
    }
    reason(status, err.to_string())
}

fn reason(status: StatusCode, message: impl AsRef<str>) -> Response {
    Response::builder(status)
        .body(tide::convert::json!({ "reason": message.as_ref() }))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::io::Cursor;
    use tide::http::{Method, Url};

    fn test_app(config: Config) -> tide::Server<State> {
        let state = State {
            config: Arc::new(config),
        };
        let mut app = tide::with_state(state);
        mount(&mut app);
        app
    }

    fn png_base64() -> String {
        let img = RgbImage::from_pixel(8, 8, Rgb([1, 2, 3]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        base64::engine::general_purpose::STANDARD.encode(out.into_inner())
    }

    fn geotag_request(body: serde_json::Value) -> tide::http::Request {
        let mut req = tide::http::Request::new(
            Method::Post,
            Url::parse("http://localhost/v1/geotag").unwrap(),
        );
        req.set_body(tide::http::Body::from_json(&body).unwrap());
        req
    }

    // ── helpers ──────────────────────────────────────────────────────

    #[test]
    fn data_uri_prefix_is_stripped() {
        assert_eq!(strip_data_uri("data:image/png;base64,AAAA"), "AAAA");
        assert_eq!(strip_data_uri("AAAA"), "AAAA");
    }

    #[test]
    fn status_mapping() {
        assert_eq!(
            status_for(&GeotagError::UnreadableImage("x".into())),
            StatusCode::UnprocessableEntity
        );
        assert_eq!(
            status_for(&GeotagError::OversizedAnnotation { size: 1, limit: 0 }),
            StatusCode::PayloadTooLarge
        );
        assert_eq!(
            status_for(&GeotagError::EncodeFailure("x".into())),
            StatusCode::InternalServerError
        );
    }

    // ── endpoints ────────────────────────────────────────────────────

    #[async_std::test]
    async fn healthz_reports_ok() {
        let app = test_app(Config::default());
        let req = tide::http::Request::new(
            Method::Get,
            Url::parse("http://localhost/healthz").unwrap(),
        );
        let mut res: tide::http::Response = app.respond(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::Ok);
        let body: serde_json::Value = res.body_json().await.unwrap();
        assert_eq!(body["status"], "ok");
    }

    #[async_std::test]
    async fn geotag_json_happy_path() {
        let app = test_app(Config::default());
        let req = geotag_request(serde_json::json!({
            "image_base64": format!("data:image/png;base64,{}", png_base64()),
            "latitude": 37.4219999,
            "longitude": -122.0840575,
        }));

        let mut res: tide::http::Response = app.respond(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::Ok);

        let body: serde_json::Value = res.body_json().await.unwrap();
        let data_uri = body["image_base64"].as_str().unwrap();
        assert!(data_uri.starts_with("data:image/jpeg;base64,"));

        let jpeg = base64::engine::general_purpose::STANDARD
            .decode(strip_data_uri(data_uri))
            .unwrap();
        assert!(image::load_from_memory(&jpeg).is_ok());
    }

    #[async_std::test]
    async fn out_of_range_latitude_is_bad_request() {
        let app = test_app(Config::default());
        let req = geotag_request(serde_json::json!({
            "image_base64": png_base64(),
            "latitude": 91.0,
            "longitude": 0.0,
        }));
        let res: tide::http::Response = app.respond(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BadRequest);
    }

    #[async_std::test]
    async fn invalid_base64_is_bad_request() {
        let app = test_app(Config::default());
        let req = geotag_request(serde_json::json!({
            "image_base64": "!!! not base64 !!!",
            "latitude": 0.0,
            "longitude": 0.0,
        }));
        let res: tide::http::Response = app.respond(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BadRequest);
    }

    #[async_std::test]
    async fn unreadable_image_is_unprocessable() {
        let app = test_app(Config::default());
        let req = geotag_request(serde_json::json!({
            "image_base64": base64::engine::general_purpose::STANDARD.encode(b"not an image"),
            "latitude": 0.0,
            "longitude": 0.0,
        }));
        let res: tide::http::Response = app.respond(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UnprocessableEntity);
    }

    #[async_std::test]
    async fn oversized_payload_is_rejected_before_decoding() {
        let mut config = Config::default();
        config.limits.max_payload_bytes = 16;
        let app = test_app(config);

        let req = geotag_request(serde_json::json!({
            "image_base64": png_base64(),
            "latitude": 0.0,
            "longitude": 0.0,
        }));
        let res: tide::http::Response = app.respond(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::PayloadTooLarge);
    }

    #[async_std::test]
    async fn declared_length_is_rejected_before_buffering() {
        // The body's declared length alone must trigger the 413; the bytes
        // themselves never feed the pipeline.
        let mut config = Config::default();
        config.limits.max_payload_bytes = 16;
        let app = test_app(config);

        let mut req = tide::http::Request::new(
            Method::Post,
            Url::parse("http://localhost/v1/geotag/binary?latitude=0&longitude=0").unwrap(),
        );
        req.set_body(vec![0u8; 4096]);
        assert_eq!(req.len(), Some(4096));

        let res: tide::http::Response = app.respond(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::PayloadTooLarge);
    }

    #[async_std::test]
    async fn oversized_annotation_is_rejected() {
        let app = test_app(Config::default());
        let req = geotag_request(serde_json::json!({
            "image_base64": png_base64(),
            "latitude": 1.0,
            "longitude": 2.0,
            "annotation": "x".repeat(70_000),
        }));
        let res: tide::http::Response = app.respond(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::PayloadTooLarge);
    }

    // ── auth ─────────────────────────────────────────────────────────

    fn keyed_config() -> Config {
        let mut config = Config::default();
        config.auth.api_key = Some("s3cret".to_string());
        config
    }

    #[async_std::test]
    async fn missing_auth_header_is_unauthorized() {
        let app = test_app(keyed_config());
        let req = geotag_request(serde_json::json!({
            "image_base64": png_base64(),
            "latitude": 0.0,
            "longitude": 0.0,
        }));
        let res: tide::http::Response = app.respond(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::Unauthorized);
    }

    #[async_std::test]
    async fn wrong_key_is_forbidden() {
        let app = test_app(keyed_config());
        let mut req = geotag_request(serde_json::json!({
            "image_base64": png_base64(),
            "latitude": 0.0,
            "longitude": 0.0,
        }));
        req.insert_header("Authorization", "Bearer wrong");
        let res: tide::http::Response = app.respond(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::Forbidden);
    }

    #[async_std::test]
    async fn correct_key_is_accepted() {
        let app = test_app(keyed_config());
        let mut req = geotag_request(serde_json::json!({
            "image_base64": png_base64(),
            "latitude": 0.0,
            "longitude": 0.0,
        }));
        req.insert_header("Authorization", "Bearer s3cret");
        let res: tide::http::Response = app.respond(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::Ok);
    }

    // ── binary endpoint ──────────────────────────────────────────────

    #[async_std::test]
    async fn binary_endpoint_returns_jpeg_attachment() {
        let app = test_app(Config::default());

        let img = RgbImage::from_pixel(8, 8, Rgb([9, 9, 9]));
        let mut png = Cursor::new(Vec::new());
        img.write_to(&mut png, image::ImageFormat::Png).unwrap();

        let mut req = tide::http::Request::new(
            Method::Post,
            Url::parse("http://localhost/v1/geotag/binary?latitude=51.5&longitude=-0.12").unwrap(),
        );
        req.set_body(png.into_inner());

        let mut res: tide::http::Response = app.respond(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::Ok);
        assert_eq!(
            res.header("Content-Disposition").unwrap().last().as_str(),
            "attachment; filename=\"geotagged.jpg\""
        );
        let body = res.body_bytes().await.unwrap();
        assert!(image::load_from_memory(&body).is_ok());
    }

    #[async_std::test]
    async fn binary_endpoint_requires_coordinates() {
        let app = test_app(Config::default());
        let req = tide::http::Request::new(
            Method::Post,
            Url::parse("http://localhost/v1/geotag/binary").unwrap(),
        );
        let res: tide::http::Response = app.respond(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BadRequest);
    }
}
