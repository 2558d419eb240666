pub mod body;
pub mod cookies;
pub mod tracing;

pub use body::{JSON_BODY_LIMIT, JsonBody, json_body_middleware};
pub use cookies::{Cookies, cookie_middleware};
pub use self::tracing::{REQUEST_ID_HEADER, make_request_span, request_id_middleware};
