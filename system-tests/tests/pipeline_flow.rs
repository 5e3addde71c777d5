// system-tests/tests/pipeline_flow.rs
// ============================================================================
// Module: Pipeline Flow System Tests
// Description: End-to-end scenarios against an in-process ingress server.
// Purpose: Exercise the full SPEC/PLAN/DECISION/EXECUTION pipeline, advisory
//          attachment, retry determinism, drift detection, and deprecation
//          headers over real HTTP against a tempfile-backed sqlite store.
// Dependencies: reqwest, rmos-config, rmos-ingress, serde_json, tokio
// ============================================================================

//! End-to-end scenarios against an in-process ingress server.

#![allow(clippy::unwrap_used, reason = "Test-only panics are acceptable.")]
#![allow(clippy::expect_used, reason = "Test-only panics are acceptable.")]

use std::net::SocketAddr;

use rmos_config::RmosConfig;
use serde_json::Value;
use serde_json::json;

/// Spins up the ingress server on an ephemeral loopback port using a fresh
/// tempfile-backed sqlite store, with the given extra TOML appended to the
/// configuration body. Returns the base URL and a guard that must be kept
/// alive for the server's lifetime.
async fn spawn_server(extra_toml: &str) -> (String, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("rmos.sqlite");
    let config_toml = format!(
        "[server]\nbind_addr = \"127.0.0.1:0\"\n\n[run_state_store]\npath = {:?}\n\n{extra_toml}",
        db_path.to_string_lossy()
    );
    let config_path = dir.path().join("rmos.toml");
    std::fs::write(&config_path, config_toml).expect("write config");

    let config = RmosConfig::load(Some(config_path.as_path())).expect("valid config");
    let state = rmos_ingress::AppState::build(&config).expect("build state");
    let router = rmos_ingress::build_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind ephemeral port");
    let addr: SocketAddr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router.into_make_service()).await.expect("serve");
    });

    (format!("http://{addr}"), dir)
}

fn machining_context(tool_id: &str) -> Value {
    json!({
        "material_id": "MAT_HARDWOOD_MAPLE",
        "tool_id": tool_id,
        "machine_profile_id": "SAW_LAB_01",
        "project_id": null,
        "operation_kind": "slice",
        "cutting_parameters": {
            "rpm": 3600.0,
            "feed_mm_min": 1200.0,
            "doc_mm": 3.0,
            "woc_mm": 6.0
        },
        "feature_flags": {}
    })
}

fn spec_body(thickness_mm: f64) -> Value {
    json!({
        "session_id": "s1",
        "batch_label": "b1",
        "items": [{
            "part_id": "p1",
            "material_family": "hardwood",
            "thickness_mm": thickness_mm,
            "width_mm": 100.0,
            "length_mm": 500.0
        }],
        "op_type": "slice",
        "blade_id": "BLADE_10IN_60T",
        "machine_profile": "SAW_LAB_01"
    })
}

/// Scenario 1: happy path through SPEC -> PLAN -> APPROVE -> EXECUTE.
#[tokio::test]
async fn happy_path_produces_an_ok_execution() {
    let (base, _dir) = spawn_server("").await;
    let client = reqwest::Client::new();

    let spec: Value =
        client.post(format!("{base}/api/saw/batch/spec")).json(&spec_body(19.0)).send().await.unwrap().json().await.unwrap();
    let spec_id = spec["artifact_id"].as_str().expect("spec artifact_id").to_string();

    let plan: Value = client
        .post(format!("{base}/api/saw/batch/plan"))
        .json(&json!({"spec_id": spec_id, "context": machining_context("BLADE_10IN_60T")}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let plan_id = plan["artifact_id"].as_str().expect("plan artifact_id").to_string();
    let bucket = plan["verdict"]["bucket"].as_str().expect("verdict bucket");
    assert!(bucket == "GREEN" || bucket == "YELLOW", "happy path must not be RED, got {bucket}");

    let decision: Value = client
        .post(format!("{base}/api/saw/batch/approve"))
        .json(&json!({"plan_id": plan_id, "spec_id": spec_id, "approved_by": "operator_1", "reason": "looks good"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let decision_id = decision["artifact_id"].as_str().expect("decision artifact_id").to_string();

    let execution_response = client
        .post(format!("{base}/api/saw/batch/execute"))
        .json(&json!({"decision_id": decision_id, "context": machining_context("BLADE_10IN_60T")}))
        .send()
        .await
        .unwrap();
    assert_eq!(execution_response.status(), reqwest::StatusCode::OK);
    let execution: Value = execution_response.json().await.unwrap();
    assert!(execution["artifact_id"].is_string());
    assert!(execution["attachment_sha256"].as_array().is_some_and(|sha| !sha.is_empty()));
}

/// Scenario 2: a zero-thickness part forces a RED verdict, and approval is
/// rejected with `FeasibilityBlocked`.
#[tokio::test]
async fn blocked_plan_cannot_be_approved() {
    let (base, _dir) = spawn_server("").await;
    let client = reqwest::Client::new();

    let spec: Value =
        client.post(format!("{base}/api/saw/batch/spec")).json(&spec_body(0.0)).send().await.unwrap().json().await.unwrap();
    let spec_id = spec["artifact_id"].as_str().expect("spec artifact_id").to_string();

    let plan: Value = client
        .post(format!("{base}/api/saw/batch/plan"))
        .json(&json!({"spec_id": spec_id, "context": machining_context("BLADE_10IN_60T")}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let plan_id = plan["artifact_id"].as_str().expect("plan artifact_id").to_string();
    assert_eq!(plan["verdict"]["bucket"].as_str(), Some("RED"));

    let approve_response = client
        .post(format!("{base}/api/saw/batch/approve"))
        .json(&json!({"plan_id": plan_id, "spec_id": spec_id, "approved_by": "operator_1", "reason": "override"}))
        .send()
        .await
        .unwrap();
    assert_eq!(approve_response.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: Value = approve_response.json().await.unwrap();
    assert_eq!(body["error"]["code"].as_str(), Some("FEASIBILITY_BLOCKED"));
}

/// Scenario 3: changing the tool between PLAN and EXECUTE is detected as
/// drift and no EXECUTION is created.
#[tokio::test]
async fn context_drift_between_plan_and_execute_is_rejected() {
    let (base, _dir) = spawn_server("").await;
    let client = reqwest::Client::new();

    let spec: Value =
        client.post(format!("{base}/api/saw/batch/spec")).json(&spec_body(19.0)).send().await.unwrap().json().await.unwrap();
    let spec_id = spec["artifact_id"].as_str().expect("spec artifact_id").to_string();

    let plan: Value = client
        .post(format!("{base}/api/saw/batch/plan"))
        .json(&json!({"spec_id": spec_id, "context": machining_context("BLADE_10IN_60T")}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let plan_id = plan["artifact_id"].as_str().expect("plan artifact_id").to_string();

    let decision: Value = client
        .post(format!("{base}/api/saw/batch/approve"))
        .json(&json!({"plan_id": plan_id, "spec_id": spec_id, "approved_by": "operator_1", "reason": "ok"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let decision_id = decision["artifact_id"].as_str().expect("decision artifact_id").to_string();

    let execute_response = client
        .post(format!("{base}/api/saw/batch/execute"))
        .json(&json!({"decision_id": decision_id, "context": machining_context("BLADE_10IN_80T")}))
        .send()
        .await
        .unwrap();
    assert_eq!(execute_response.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: Value = execute_response.json().await.unwrap();
    assert_eq!(body["error"]["code"].as_str(), Some("DRIFT_DETECTED"));
}

/// Scenario 4: an advisory attachment is non-authoritative — it appears in
/// the Run's attachment list but never touches the SPEC/PLAN/DECISION chain.
#[tokio::test]
async fn advisory_attach_does_not_perturb_the_pipeline() {
    let (base, _dir) = spawn_server("").await;
    let client = reqwest::Client::new();

    let spec: Value =
        client.post(format!("{base}/api/saw/batch/spec")).json(&spec_body(19.0)).send().await.unwrap().json().await.unwrap();
    let spec_id = spec["artifact_id"].as_str().expect("spec artifact_id").to_string();

    let attach: Value = client
        .post(format!("{base}/api/rmos/runs/{spec_id}/suggest-and-attach"))
        .json(&json!({
            "producer_id": "ai-sandbox-1",
            "content_ref": {
                "uri": "inline:aGVsbG8td29ybGQ=",
                "sha256": "afa27b44d43b02a9fea41d13cedc2e4016cfcf87c5dbf990e593669aa8ce286d",
                "mime": "text/plain"
            },
            "kind": "advisory_payload",
            "filename": null
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(attach["sha256"].is_string());

    let advisories: Value =
        client.get(format!("{base}/api/rmos/runs/{spec_id}/advisories")).send().await.unwrap().json().await.unwrap();
    assert_eq!(advisories.as_array().expect("advisories array").len(), 1);

    let plan: Value = client
        .post(format!("{base}/api/saw/batch/plan"))
        .json(&json!({"spec_id": spec_id, "context": machining_context("BLADE_10IN_60T")}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let bucket = plan["verdict"]["bucket"].as_str().expect("verdict bucket");
    assert!(bucket == "GREEN" || bucket == "YELLOW");
}

/// Scenario 5: retrying an execution yields a new artifact identifier with
/// an identical primary output digest.
#[tokio::test]
async fn retry_execution_is_deterministic_but_a_new_artifact() {
    let (base, _dir) = spawn_server("").await;
    let client = reqwest::Client::new();

    let spec: Value =
        client.post(format!("{base}/api/saw/batch/spec")).json(&spec_body(19.0)).send().await.unwrap().json().await.unwrap();
    let spec_id = spec["artifact_id"].as_str().expect("spec artifact_id").to_string();

    let plan: Value = client
        .post(format!("{base}/api/saw/batch/plan"))
        .json(&json!({"spec_id": spec_id, "context": machining_context("BLADE_10IN_60T")}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let plan_id = plan["artifact_id"].as_str().expect("plan artifact_id").to_string();

    let decision: Value = client
        .post(format!("{base}/api/saw/batch/approve"))
        .json(&json!({"plan_id": plan_id, "spec_id": spec_id, "approved_by": "operator_1", "reason": "ok"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let decision_id = decision["artifact_id"].as_str().expect("decision artifact_id").to_string();

    let first: Value = client
        .post(format!("{base}/api/saw/batch/execute"))
        .json(&json!({"decision_id": decision_id, "context": machining_context("BLADE_10IN_60T")}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let first_id = first["artifact_id"].as_str().expect("execution id").to_string();
    let first_sha: Vec<String> =
        serde_json::from_value(first["attachment_sha256"].clone()).expect("attachment sha256 list");

    let retried: Value = client
        .post(format!("{base}/api/saw/batch/retry-execution"))
        .json(&json!({"execution_id": first_id, "context": machining_context("BLADE_10IN_60T")}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let retried_id = retried["artifact_id"].as_str().expect("retried execution id").to_string();
    let retried_sha: Vec<String> =
        serde_json::from_value(retried["attachment_sha256"].clone()).expect("attachment sha256 list");

    assert_ne!(first_id, retried_id);
    assert_eq!(first_sha, retried_sha);
}

/// Scenario 6: a request matching a configured deprecation prefix carries
/// all four deprecation headers.
#[tokio::test]
async fn deprecated_prefix_carries_all_four_headers() {
    let extra = r#"
[[governance.deprecations]]
prefix = "/api/art-studio"
lane_key = "legacy_art_studio_lane"
successor_prefix = "/api/art"
sunset_date = "2026-12-31"
"#;
    let (base, _dir) = spawn_server(extra).await;
    let client = reqwest::Client::new();

    let response = client.get(format!("{base}/api/art-studio/rosette/preview")).send().await.unwrap();
    let headers = response.headers();
    assert_eq!(headers.get("Deprecation").map(|value| value.to_str().unwrap()), Some("true"));
    assert_eq!(headers.get("Sunset").map(|value| value.to_str().unwrap()), Some("2026-12-31"));
    assert_eq!(
        headers.get("X-Deprecated-Lane").map(|value| value.to_str().unwrap()),
        Some("legacy_art_studio_lane")
    );
    assert_eq!(
        headers.get("Link").map(|value| value.to_str().unwrap()),
        Some(r#"</api/art>; rel="successor-version""#)
    );

    let unrelated = client.get(format!("{base}/api/health")).send().await.unwrap();
    assert!(unrelated.headers().get("Deprecation").is_none());
}

/// The health endpoint reports a schema version and a non-zero engine
/// count, and the routing-truth endpoint enumerates every declared route.
#[tokio::test]
async fn health_and_routing_truth_are_self_consistent() {
    let (base, _dir) = spawn_server("").await;
    let client = reqwest::Client::new();

    let health: Value = client.get(format!("{base}/api/health")).send().await.unwrap().json().await.unwrap();
    assert_eq!(health["status"].as_str(), Some("ok"));
    assert!(health["engines_registered"].as_u64().expect("engine count") > 0);

    let truth: Value = client.get(format!("{base}/api/_meta/routing-truth")).send().await.unwrap().json().await.unwrap();
    let count = truth["count"].as_u64().expect("route count");
    assert!(count > 0);
    assert_eq!(truth["routes"].as_array().expect("routes array").len(), count as usize);
}
