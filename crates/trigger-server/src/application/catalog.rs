//! Demo use-case catalog served by the `trigger-server` binary.
//!
//! These implementations stand in for a real application core.  They match the
//! use cases declared in `demos/orders-service.toml`:
//!
//! | Name              | Behaviour                                                   |
//! |-------------------|-------------------------------------------------------------|
//! | `get_order`       | order 42 is `shipped`; any other id is `not-found`          |
//! | `create_item`     | echoes `name` and `quantity` with a fresh id                |
//! | `join_room`       | acknowledges `room` (and `user` when given)                 |
//! | `whoami`          | reads the `user` header; `unauthorized` without it          |
//! | `generate_report` | simulated work under a fixed budget; `timeout` past it      |
//! | `echo`            | returns its input unchanged (passthrough binding)           |

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use trigger_core::{use_case_fn, Failure, Outcome, ResolvedInput, UseCase, UseCaseCatalog};
use uuid::Uuid;

/// Work budget for `generate_report`.
pub const REPORT_BUDGET: Duration = Duration::from_millis(200);

/// Builds the catalog.
pub fn demo_catalog() -> UseCaseCatalog {
    UseCaseCatalog::new()
        .with("get_order", Arc::new(GetOrder))
        .with("create_item", use_case_fn(create_item))
        .with("join_room", use_case_fn(join_room))
        .with("whoami", use_case_fn(whoami))
        .with("generate_report", use_case_fn(generate_report))
        .with("echo", use_case_fn(echo))
}

// ── get_order ─────────────────────────────────────────────────────────────────

/// Looks an order up by id.
pub struct GetOrder;

#[async_trait]
impl UseCase for GetOrder {
    async fn invoke(&self, input: ResolvedInput) -> Outcome {
        match input.get_i64("id") {
            Some(42) => Outcome::success(json!({"id": 42, "status": "shipped"})),
            Some(id) => Failure::not_found(format!("order {id} does not exist")).into(),
            None => Failure::validation("order id is required").into(),
        }
    }
}

// ── create_item ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct NewItem {
    name: String,
    #[serde(default = "default_quantity")]
    quantity: i64,
}

fn default_quantity() -> i64 {
    1
}

async fn create_item(input: ResolvedInput) -> Outcome {
    let item: NewItem = match input.deserialize_into() {
        Ok(item) => item,
        Err(e) => return Failure::validation(format!("invalid item: {e}")).into(),
    };
    if item.quantity < 1 {
        return Failure::validation("quantity must be at least 1")
            .with_details(json!({"quantity": "must be at least 1"}))
            .into();
    }
    Outcome::success(json!({
        "id": Uuid::new_v4(),
        "name": item.name,
        "quantity": item.quantity,
    }))
}

// ── join_room ─────────────────────────────────────────────────────────────────

async fn join_room(input: ResolvedInput) -> Outcome {
    let Some(room) = input.get_str("room") else {
        return Failure::validation("room is required").into();
    };
    let mut joined = json!({ "room": room });
    if let Some(user) = input.get_str("user") {
        joined["user"] = json!(user);
    }
    Outcome::success(joined)
}

// ── whoami ────────────────────────────────────────────────────────────────────

async fn whoami(input: ResolvedInput) -> Outcome {
    match input.get_str("user") {
        Some(user) if !user.trim().is_empty() => Outcome::success(json!({ "user": user })),
        _ => Failure::unauthorized("no user identity on the request").into(),
    }
}

// ── generate_report ───────────────────────────────────────────────────────────

async fn generate_report(input: ResolvedInput) -> Outcome {
    let work_ms = input.get_i64("work_ms").unwrap_or(0).max(0) as u64;
    let work = tokio::time::sleep(Duration::from_millis(work_ms));

    match tokio::time::timeout(REPORT_BUDGET, work).await {
        Ok(()) => Outcome::success(json!({ "report": "ready", "work_ms": work_ms })),
        Err(_) => Failure::timeout(format!(
            "report exceeded its {} ms budget",
            REPORT_BUDGET.as_millis()
        ))
        .into(),
    }
}

// ── echo ──────────────────────────────────────────────────────────────────────

async fn echo(input: ResolvedInput) -> Outcome {
    Outcome::success(input.into_value())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
