//! Per-request id (§6: "Responses always carry request_id"). Mints a
//! [`RequestId`] for every incoming request before any other middleware
//! runs, and stores it as a request extension so every handler's success
//! path can stamp it onto its result body — not just `ApiError`'s failure
//! path, which mints its own when none is present.

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;

use orbicheck_core::RequestId;

pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = RequestId::new();
    request.extensions_mut().insert(request_id);
    next.run(request).await
}
