use std::sync::{Arc, Mutex};

use actix_web::{http::StatusCode, test, web::Data, App};
use async_trait::async_trait;
use binwatch_backend::{
    api::{self, AppState},
    assistant::{Assistant, AssistantError, LanguageModel, Prompt},
    config::Config,
    db::Db,
};
use common::{
    reading::BinSummary,
    req::{ApiResponse, BinRow, GraphEntry},
};
use serde_json::{json, Value};

/// Answers from the prompt it is given and keeps every prompt for inspection.
#[derive(Clone, Default)]
struct ScriptedModel {
    prompts: Arc<Mutex<Vec<Prompt>>>,
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(&self, prompt: &Prompt) -> Result<String, AssistantError> {
        self.prompts.lock().unwrap().push(prompt.clone());
        let emptied = prompt.system.contains(r#""level":0"#)
            && prompt.system.contains("fill level of 0 means the bin was just emptied");
        Ok(if emptied {
            "Yes, the bin is empty: its latest fill level is 0%.".to_owned()
        } else {
            "No, the bin still holds waste.".to_owned()
        })
    }
}

struct Unreachable;

#[async_trait]
impl LanguageModel for Unreachable {
    async fn generate(&self, _prompt: &Prompt) -> Result<String, AssistantError> {
        Err(AssistantError::Network("connection refused".to_owned()))
    }
}

fn state(model: Box<dyn LanguageModel>) -> Data<AppState> {
    state_with(model, &[])
}

fn state_with(model: Box<dyn LanguageModel>, vars: &[(&str, &str)]) -> Data<AppState> {
    let config = Config::from_lookup(|key| match key {
        "DATABASE_URL" => Some(":memory:".to_owned()),
        _ => vars.iter().find(|(k, _)| *k == key).map(|(_, v)| v.to_string()),
    })
    .unwrap();
    let db = Db::connect(&config.database_url).unwrap();
    let assistant = Assistant::new(model, config.bin_height_cm);
    Data::new(AppState::new(db, assistant, &config))
}

fn register(bin_id: &str, name: &str) -> Value {
    json!({ "binId": bin_id, "name": name, "address": "Main Kitchen", "binHeight": 200 })
}

fn upload(bin_id: &str, fill_cm: f64) -> Value {
    json!({ "data": {
        "binId": bin_id,
        "fillLevel": fill_cm,
        "temperature": 22.4,
        "humidity": 45,
        "gasProduction": 15,
        "batteryCharge": 80
    }})
}

#[actix_web::test]
async fn fill_level_follows_latest_upload_and_assistant_sees_it() {
    let model = ScriptedModel::default();
    let state = state(Box::new(model.clone()));
    let app = test::init_service(App::new().app_data(state.clone()).configure(api::configure)).await;

    let req = test::TestRequest::post()
        .uri("/api/bins")
        .set_json(register("bin-1", "Kitchen Area"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    // half full
    let req = test::TestRequest::post()
        .uri("/api/upload")
        .set_json(upload("bin-1", 100.0))
        .to_request();
    let resp: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp["success"], true);

    let req = test::TestRequest::get().uri("/api/bindetails").to_request();
    let resp: ApiResponse<Vec<BinRow>> = test::call_and_read_body_json(&app, req).await;
    let rows = resp.into_result().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(BinSummary::from_row(&rows[0]).fill_level_pct, 50);

    // emptied
    let req = test::TestRequest::post()
        .uri("/api/upload")
        .set_json(upload("bin-1", 0.0))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get().uri("/api/bindetails").to_request();
    let resp: ApiResponse<Vec<BinRow>> = test::call_and_read_body_json(&app, req).await;
    let rows = resp.into_result().unwrap();
    let summary = BinSummary::from_row(&rows[0]);
    assert_eq!(summary.fill_level_pct, 0);
    assert_eq!(summary.name, "Kitchen Area");

    let req = test::TestRequest::get().uri("/api/graph?binId=bin-1").to_request();
    let resp: ApiResponse<Vec<GraphEntry>> = test::call_and_read_body_json(&app, req).await;
    let series = resp.into_result().unwrap();
    let levels: Vec<_> = series.iter().map(|e| e.level).collect();
    assert_eq!(levels, vec![50, 0]);
    assert_eq!(series[0].temperature, 22);

    let question = "is the bin empty?";
    let req = test::TestRequest::post()
        .uri("/api/chat")
        .set_json(json!({
            "message": question,
            "data": series,
            "history": [{ "role": "user", "text": question }]
        }))
        .to_request();
    let resp: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp["success"], true);
    let reply = resp["data"]["reply"].as_str().unwrap();
    assert!(reply.starts_with("Yes"));
    assert!(reply.contains('0'));

    let prompts = model.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].history.is_empty());
    assert_eq!(prompts[0].message, question);
}

#[actix_web::test]
async fn chat_drops_the_pending_question_from_history() {
    let model = ScriptedModel::default();
    let app =
        test::init_service(App::new().app_data(state(Box::new(model.clone()))).configure(api::configure)).await;

    let req = test::TestRequest::post()
        .uri("/api/chat")
        .set_json(json!({
            "message": "when will it be full?",
            "data": [],
            "history": [
                { "role": "user", "text": "how full is it?" },
                { "role": "assistant", "text": "About half." },
                { "role": "user", "text": "when will it be full?" }
            ]
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let prompts = model.prompts.lock().unwrap();
    let texts: Vec<_> = prompts[0].history.iter().map(|t| t.text.as_str()).collect();
    assert_eq!(texts, ["how full is it?", "About half."]);
}

#[actix_web::test]
async fn upload_for_unknown_bin_is_rejected() {
    let app = test::init_service(
        App::new()
            .app_data(state(Box::new(ScriptedModel::default())))
            .configure(api::configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/upload")
        .set_json(upload("ghost", 10.0))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "unknown bin `ghost`");
}

#[actix_web::test]
async fn malformed_upload_gets_an_envelope() {
    let app = test::init_service(
        App::new()
            .app_data(state(Box::new(ScriptedModel::default())))
            .configure(api::configure),
    )
    .await;

    // fillLevel missing
    let req = test::TestRequest::post()
        .uri("/api/upload")
        .set_json(json!({ "data": { "binId": "bin-1", "temperature": 20 } }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Invalid request");
    assert!(body["error"].as_str().unwrap().contains("fillLevel"));
}

#[actix_web::test]
async fn history_of_unknown_bin_is_no_data() {
    let app = test::init_service(
        App::new()
            .app_data(state(Box::new(ScriptedModel::default())))
            .configure(api::configure),
    )
    .await;

    let req = test::TestRequest::get().uri("/api/graph?binId=nowhere").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "No data found");
}

#[actix_web::test]
async fn history_can_be_windowed() {
    let app = test::init_service(
        App::new()
            .app_data(state(Box::new(ScriptedModel::default())))
            .configure(api::configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/bins")
        .set_json(register("bin-1", "Cafeteria"))
        .to_request();
    test::call_service(&app, req).await;

    let row = |time: &str, fill: f64| {
        json!({ "time": time, "fillLevel": fill, "temperature": 20, "humidity": 40,
                "gasProduction": 5, "batteryCharge": 90 })
    };
    let req = test::TestRequest::post()
        .uri("/api/upload/bulk")
        .set_json(json!({ "binId": "bin-1", "rows": [
            row("2024-03-01T09:00:00Z", 20.0),
            row("2024-03-02T09:00:00Z", 60.0),
            row("2024-03-02T18:00:00Z", 0.0),
            row("2024-03-09T09:00:00Z", 40.0),
            row("2024-04-01T09:00:00Z", 80.0),
        ]}))
        .to_request();
    let resp: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp["data"], 5);

    let levels = |uri: &'static str| {
        let req = test::TestRequest::get().uri(uri).to_request();
        let app = &app;
        async move {
            let resp: ApiResponse<Vec<GraphEntry>> = test::call_and_read_body_json(app, req).await;
            resp.into_result().unwrap().iter().map(|e| e.level).collect::<Vec<_>>()
        }
    };

    assert_eq!(levels("/api/graph?binId=bin-1&view=day&anchor=2024-03-02").await, vec![30, 0]);
    assert_eq!(levels("/api/graph?binId=bin-1&view=week&anchor=2024-03-01").await, vec![10, 30, 0]);
    assert_eq!(levels("/api/graph?binId=bin-1&view=Week&anchor=2024-03-01").await, vec![10, 30, 0]);
    assert_eq!(levels("/api/graph?binId=bin-1&view=month&anchor=2024-03-20").await, vec![10, 30, 0, 20]);
    assert!(levels("/api/graph?binId=bin-1&view=day").await.is_empty());
    assert_eq!(levels("/api/graph?binId=bin-1").await.len(), 5);

    let req = test::TestRequest::get()
        .uri("/api/graph?binId=bin-1&view=hour&anchor=2024-03-02")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn directory_follows_canonical_order() {
    let app = test::init_service(
        App::new()
            .app_data(state(Box::new(ScriptedModel::default())))
            .configure(api::configure),
    )
    .await;

    for (id, name) in [("b1", "Roof Terrace"), ("b2", "Storage Room"), ("b3", "Kitchen Area")] {
        let req = test::TestRequest::post()
            .uri("/api/bins")
            .set_json(register(id, name))
            .to_request();
        test::call_service(&app, req).await;

        let req = test::TestRequest::post()
            .uri("/api/upload")
            .set_json(upload(id, 50.0))
            .to_request();
        test::call_service(&app, req).await;
    }

    let req = test::TestRequest::get().uri("/api/bindetails").to_request();
    let resp: ApiResponse<Vec<BinRow>> = test::call_and_read_body_json(&app, req).await;
    let names: Vec<_> = resp.into_result().unwrap().into_iter().map(|r| r.binname).collect();
    assert_eq!(names, ["Kitchen Area", "Storage Room", "Roof Terrace"]);
}

#[actix_web::test]
async fn bins_can_be_listed_and_need_positive_height() {
    let app = test::init_service(
        App::new()
            .app_data(state(Box::new(ScriptedModel::default())))
            .configure(api::configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/bins")
        .set_json(json!({ "binId": "b1", "name": "Cafeteria" }))
        .to_request();
    let resp: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp["data"]["binHeight"], 200.0);

    let req = test::TestRequest::post()
        .uri("/api/bins")
        .set_json(json!({ "binId": "b2", "name": "Roof", "binHeight": -1 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::get().uri("/api/bins").to_request();
    let resp: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp["data"].as_array().unwrap().len(), 1);
}

#[actix_web::test]
async fn unreachable_model_is_reported() {
    let app =
        test::init_service(App::new().app_data(state(Box::new(Unreachable))).configure(api::configure)).await;

    let req = test::TestRequest::post()
        .uri("/api/chat")
        .set_json(json!({ "message": "hello", "data": [], "history": [] }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert!(body.get("data").is_none());
}

#[actix_web::test]
async fn unclamped_percentages_agree_between_directory_and_history() {
    let state = state_with(Box::new(ScriptedModel::default()), &[("FILL_LEVEL_CLAMP", "false")]);
    let app = test::init_service(App::new().app_data(state).configure(api::configure)).await;

    let req = test::TestRequest::post()
        .uri("/api/bins")
        .set_json(register("bin-1", "Storage Room"))
        .to_request();
    test::call_service(&app, req).await;

    // overfilled, 260 cm of waste in a 200 cm bin
    let req = test::TestRequest::post()
        .uri("/api/upload")
        .set_json(upload("bin-1", 260.0))
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::get().uri("/api/bindetails").to_request();
    let resp: ApiResponse<Vec<BinRow>> = test::call_and_read_body_json(&app, req).await;
    let rows = resp.into_result().unwrap();
    assert_eq!(BinSummary::from_row(&rows[0]).fill_level_pct, 130);

    let req = test::TestRequest::get().uri("/api/graph?binId=bin-1").to_request();
    let resp: ApiResponse<Vec<GraphEntry>> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp.into_result().unwrap()[0].level, 130);
}

#[actix_web::test]
async fn assistant_is_told_the_height_of_the_bin_asked_about() {
    let model = ScriptedModel::default();
    let app =
        test::init_service(App::new().app_data(state(Box::new(model.clone()))).configure(api::configure)).await;

    let req = test::TestRequest::post()
        .uri("/api/bins")
        .set_json(json!({ "binId": "bin-7", "name": "Office Area", "address": "Floor 2", "binHeight": 120 }))
        .to_request();
    test::call_service(&app, req).await;

    for body in [
        json!({ "message": "how tall is it?", "binId": "bin-7" }),
        json!({ "message": "how tall is it?" }),
    ] {
        let req = test::TestRequest::post().uri("/api/chat").set_json(body).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let prompts = model.prompts.lock().unwrap();
    assert!(prompts[0].system.contains("This bin is 120 cm high"));
    // without a bin id the configured default applies
    assert!(prompts[1].system.contains("This bin is 200 cm high"));
}
