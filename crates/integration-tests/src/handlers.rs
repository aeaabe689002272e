//! Route handlers mirroring the storefront backend's REST endpoints.
//!
//! Status codes and error bodies follow the production backend so the
//! client sees the same payloads it would in the field.

use axum::extract::{Path, Request, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::state::{CartLine, Shared};

const SESSION_COOKIE: &str = "sessionid";

type Reply = (StatusCode, Json<Value>);

/// Backend session key, issued through the `sessionid` cookie.
#[derive(Debug, Clone)]
pub struct SessionKey(pub String);

// =============================================================================
// Middleware
// =============================================================================

/// Issue session cookies, record hits and apply injected faults and delays.
///
/// The delay runs after the handler has produced its response, so a delayed
/// request reflects the state at the time it was handled.
pub async fn session_layer(
    State(state): State<Shared>,
    mut request: Request,
    next: Next,
) -> Response {
    let endpoint = endpoint_key(request.uri().path());

    let existing = request
        .headers()
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(session_from_cookie_header);
    let is_new = existing.is_none();
    let key = existing.unwrap_or_else(|| Uuid::new_v4().simple().to_string());
    request.extensions_mut().insert(SessionKey(key.clone()));

    let (fault, delay) = {
        let mut state = state.lock();
        (state.faults.remove(&endpoint), state.delays.remove(&endpoint))
    };

    let mut response = match fault {
        Some(fault) => {
            tracing::debug!(endpoint = %endpoint, status = %fault.status, "Injected fault");
            (fault.status, Json(fault.body)).into_response()
        }
        None => next.run(request).await,
    };

    *state.lock().hits.entry(endpoint).or_default() += 1;

    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    if is_new
        && let Ok(cookie) =
            HeaderValue::from_str(&format!("{SESSION_COOKIE}={key}; Path=/; HttpOnly"))
    {
        response.headers_mut().append(header::SET_COOKIE, cookie);
    }

    response
}

// =============================================================================
// Authentication
// =============================================================================

pub async fn login(State(state): State<Shared>, Json(body): Json<Value>) -> Reply {
    let (Some(email), Some(password)) = (text(&body, "email"), text(&body, "password")) else {
        return error(StatusCode::BAD_REQUEST, "Email and password are required");
    };

    let state = state.lock();
    let user = state
        .users
        .iter()
        .find(|u| u.email.eq_ignore_ascii_case(email) && u.password == password);

    match user {
        Some(user) => (StatusCode::OK, Json(user.record("Login successful"))),
        None => error(StatusCode::UNAUTHORIZED, "Invalid credentials"),
    }
}

pub async fn signup(State(state): State<Shared>, Json(body): Json<Value>) -> Reply {
    let (Some(user_name), Some(email), Some(password)) = (
        text(&body, "user_name"),
        text(&body, "email"),
        text(&body, "password"),
    ) else {
        return error(
            StatusCode::BAD_REQUEST,
            "Name, password, and email are required",
        );
    };

    let mut state = state.lock();
    if state.users.iter().any(|u| u.email.eq_ignore_ascii_case(email)) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "email": ["Email already exists"] })),
        );
    }
    if state.users.iter().any(|u| u.username == user_name) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "user_name": ["Username already exists"] })),
        );
    }

    let user = state.add_user(user_name, email, password, false);
    (
        StatusCode::CREATED,
        Json(user.record("User created successfully")),
    )
}

// =============================================================================
// Cart
// =============================================================================

pub async fn cart(State(state): State<Shared>, Extension(session): Extension<SessionKey>) -> Reply {
    (StatusCode::OK, Json(state.lock().cart_json(&session.0)))
}

pub async fn add_item(
    State(state): State<Shared>,
    Extension(session): Extension<SessionKey>,
    Json(body): Json<Value>,
) -> Reply {
    let Some(product_id) = number(&body, "product_id") else {
        return error(StatusCode::BAD_REQUEST, "product_id is required");
    };
    let size_id = number(&body, "size_id");
    let quantity = number(&body, "quantity").unwrap_or(1);

    let mut state = state.lock();
    if state.product(product_id).is_none() {
        return error(StatusCode::NOT_FOUND, "Product not found");
    }

    if let Some(size_id) = size_id {
        match state.size(size_id) {
            Some(size) if size.product_id == product_id => {
                if size.stock < quantity {
                    return error(
                        StatusCode::BAD_REQUEST,
                        "Insufficient stock for selected size",
                    );
                }
            }
            _ => return error(StatusCode::NOT_FOUND, "Size not found"),
        }
    } else if state.available(product_id, None) < quantity {
        return error(StatusCode::BAD_REQUEST, "Insufficient stock");
    }

    let merged = match state
        .cart_mut(&session.0)
        .iter_mut()
        .find(|line| line.product_id == product_id && line.size_id == size_id)
    {
        Some(line) => {
            line.quantity += quantity;
            true
        }
        None => false,
    };

    if !merged {
        let id = state.next_line_id();
        state.cart_mut(&session.0).push(CartLine {
            id,
            product_id,
            size_id,
            quantity,
        });
    }

    (StatusCode::OK, Json(state.cart_json(&session.0)))
}

pub async fn update_item(
    State(state): State<Shared>,
    Extension(session): Extension<SessionKey>,
    Json(body): Json<Value>,
) -> Reply {
    let (Some(item_id), Some(raw_quantity)) = (number(&body, "item_id"), body.get("quantity"))
    else {
        return error(StatusCode::BAD_REQUEST, "item_id and quantity are required");
    };
    let Some(quantity) = as_number(raw_quantity) else {
        return error(StatusCode::BAD_REQUEST, "Invalid quantity");
    };
    if quantity < 1 {
        return error(StatusCode::BAD_REQUEST, "Quantity must be at least 1");
    }

    let mut state = state.lock();
    let Some((product_id, size_id)) = state
        .carts
        .get(&session.0)
        .and_then(|lines| lines.iter().find(|line| line.id == item_id))
        .map(|line| (line.product_id, line.size_id))
    else {
        return error(StatusCode::NOT_FOUND, "Cart item not found");
    };

    if state.available(product_id, size_id) < quantity {
        return error(StatusCode::BAD_REQUEST, "Insufficient stock");
    }

    if let Some(line) = state
        .cart_mut(&session.0)
        .iter_mut()
        .find(|line| line.id == item_id)
    {
        line.quantity = quantity;
    }

    (StatusCode::OK, Json(state.cart_json(&session.0)))
}

pub async fn remove_item(
    State(state): State<Shared>,
    Extension(session): Extension<SessionKey>,
    Json(body): Json<Value>,
) -> Reply {
    let Some(item_id) = number(&body, "item_id") else {
        return error(StatusCode::BAD_REQUEST, "item_id is required");
    };

    let mut state = state.lock();
    let lines = state.cart_mut(&session.0);
    let before = lines.len();
    lines.retain(|line| line.id != item_id);
    if lines.len() == before {
        return error(StatusCode::NOT_FOUND, "Cart item not found");
    }

    (StatusCode::OK, Json(state.cart_json(&session.0)))
}

pub async fn clear(State(state): State<Shared>, Extension(session): Extension<SessionKey>) -> Reply {
    let mut state = state.lock();
    state.cart_mut(&session.0).clear();
    (StatusCode::OK, Json(state.cart_json(&session.0)))
}

// =============================================================================
// Orders
// =============================================================================

const REQUIRED_ORDER_FIELDS: [&str; 7] = [
    "full_name",
    "email",
    "phone",
    "address",
    "city",
    "postal_code",
    "country",
];

pub async fn create_order(
    State(state): State<Shared>,
    Extension(session): Extension<SessionKey>,
    Json(body): Json<Value>,
) -> Reply {
    let mut state = state.lock();
    if state.carts.get(&session.0).is_none_or(Vec::is_empty) {
        return error(StatusCode::BAD_REQUEST, "Cart is empty");
    }

    let missing: serde_json::Map<String, Value> = REQUIRED_ORDER_FIELDS
        .iter()
        .filter(|field| text(&body, field).is_none())
        .map(|field| ((*field).to_string(), json!(["This field is required."])))
        .collect();
    if !missing.is_empty() {
        return (StatusCode::BAD_REQUEST, Json(Value::Object(missing)));
    }

    let shipping_cost = body
        .get("shipping_cost")
        .and_then(as_decimal)
        .unwrap_or_else(|| Decimal::new(1000, 2));

    let order = state.place_order(&session.0, &body, shipping_cost);
    (StatusCode::CREATED, Json(order))
}

pub async fn track_order(State(state): State<Shared>, Path(order_number): Path<String>) -> Reply {
    match state.lock().order(&order_number) {
        Some(order) => (StatusCode::OK, Json(order.clone())),
        None => error(StatusCode::NOT_FOUND, "Order not found"),
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn error(status: StatusCode, message: &str) -> Reply {
    (status, Json(json!({ "error": message })))
}

/// Path relative to the API root, e.g. `/cart/add_item/`.
fn endpoint_key(path: &str) -> String {
    path.strip_prefix("/api").unwrap_or(path).to_string()
}

fn session_from_cookie_header(header: &str) -> Option<String> {
    header.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE && !value.is_empty()).then(|| value.to_string())
    })
}

/// Non-blank string field.
fn text<'a>(body: &'a Value, key: &str) -> Option<&'a str> {
    body.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Integer field given as a JSON number or a numeric string.
fn number(body: &Value, key: &str) -> Option<i64> {
    body.get(key).and_then(as_number)
}

fn as_number(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.to_string().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie_is_found_among_others() {
        assert_eq!(
            session_from_cookie_header("csrftoken=x; sessionid=abc123"),
            Some("abc123".to_string())
        );
        assert_eq!(session_from_cookie_header("csrftoken=x"), None);
        assert_eq!(session_from_cookie_header("sessionid="), None);
    }

    #[test]
    fn test_endpoint_key_strips_api_root() {
        assert_eq!(endpoint_key("/api/cart/add_item/"), "/cart/add_item/");
        assert_eq!(endpoint_key("/health"), "/health");
    }

    #[test]
    fn test_number_accepts_numeric_strings() {
        let body = json!({ "a": 3, "b": " 7 ", "c": "x", "d": null });
        assert_eq!(number(&body, "a"), Some(3));
        assert_eq!(number(&body, "b"), Some(7));
        assert_eq!(number(&body, "c"), None);
        assert_eq!(number(&body, "d"), None);
        assert_eq!(number(&body, "missing"), None);
    }
}
