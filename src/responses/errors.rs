use crate::errors::ServerError;
use astra::{Body, Response, ResponseBuilder};
use serde_json::json;

pub type ResultResp = Result<Response, ServerError>;

/// Convert a ServerError into a JSON error response
pub fn error_to_response(err: ServerError) -> Response {
    let status = err.status();
    let body = json!({
        "error_code": err.code(),
        "message": err.to_string(),
    });

    match ResponseBuilder::new()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
    {
        Ok(resp) => resp,
        Err(_) => {
            let mut resp = Response::new(Body::from("Internal Server Error"));
            if let Ok(code) = 500u16.try_into() {
                *resp.status_mut() = code;
            }
            resp
        }
    }
}
