use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A listing as the exchange oracle serves it, created `minutes` after
/// 2024-05-01T00:00:00Z.
pub fn listing_json(escrow_address: &str, chain_id: u64, minutes: u32) -> Value {
    let created_at = format!("2024-05-01T{:02}:{:02}:00Z", minutes / 60, minutes % 60);
    json!({
        "escrow_address": escrow_address,
        "chain_id": chain_id,
        "job_type": "fortune",
        "status": "active",
        "job_description": format!("Job {escrow_address}"),
        "reward_amount": "10",
        "reward_token": "HMT",
        "created_at": created_at,
        "updated_at": created_at,
    })
}

pub fn page_json(results: Vec<Value>, total_pages: u32) -> Value {
    json!({ "results": results, "total_pages": total_pages })
}

/// Serve `body` for `GET {prefix}/job?page={page}`.
pub async fn mount_page(server: &MockServer, prefix: &str, page: u32, body: Value) {
    Mock::given(method("GET"))
        .and(path(format!("{prefix}/job")))
        .and(query_param("page", page.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

pub async fn mount_signin(server: &MockServer, token: &str) {
    Mock::given(method("POST"))
        .and(path("/auth/m2m/signin"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": token })))
        .mount(server)
        .await;
}
