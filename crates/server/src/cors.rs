//! CORS headers on every response, and a blanket answer to `OPTIONS`.

use axum::{
    Router,
    extract::Request,
    middleware::{self, Next},
    response::{IntoResponse, Response},
};
use config::CorsConfig;
use http::{
    HeaderValue, Method, StatusCode,
    header::{ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN},
};
use tower_http::set_header::SetResponseHeaderLayer;

/// Wraps the whole app: `OPTIONS` is answered before routing, and the configured headers
/// are set on every response, errors and preflights included.
pub(crate) fn apply(app: Router, config: &CorsConfig) -> anyhow::Result<Router> {
    let methods = config
        .allow_methods
        .iter()
        .map(|method| method.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    let origin = HeaderValue::from_str(&config.allow_origin)?;
    let methods = HeaderValue::from_str(&methods)?;
    let headers = HeaderValue::from_str(&config.allow_headers.join(", "))?;

    let app = app
        .layer(middleware::from_fn(preflight))
        .layer(SetResponseHeaderLayer::overriding(ACCESS_CONTROL_ALLOW_ORIGIN, origin))
        .layer(SetResponseHeaderLayer::overriding(ACCESS_CONTROL_ALLOW_METHODS, methods))
        .layer(SetResponseHeaderLayer::overriding(ACCESS_CONTROL_ALLOW_HEADERS, headers));

    Ok(app)
}

/// Any `OPTIONS` request gets an empty 200, whatever the path and whatever the request headers.
async fn preflight(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        log::debug!("Answering OPTIONS {}", request.uri().path());
        return StatusCode::OK.into_response();
    }

    next.run(request).await
}
