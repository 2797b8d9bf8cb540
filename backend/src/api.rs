use std::sync::{Mutex, MutexGuard};

use actix_cors::Cors;
use actix_web::{
    get,
    http::header,
    middleware::Logger,
    post,
    web::{self, Data},
    App, HttpResponse, HttpServer, Responder,
};
use chrono::{NaiveDate, Utc};
use common::{
    fill::ClampPolicy,
    order::OrderPolicy,
    req::{ApiResponse, BinInfo, BulkUpload, ChatReply, ChatRequest, GraphEntry, RegisterBin, SensorUpload},
    window::{self, ViewMode, ViewWindow},
};
use log::info;

use crate::{
    assistant::Assistant,
    config::Config,
    db::{Db, NewBin, NewSensorData},
    error::ApiError,
};

/// Shared by all workers.
pub struct AppState {
    db: Mutex<Db>,
    assistant: Assistant,
    fill_policy: ClampPolicy,
    order: OrderPolicy,
    default_bin_height: f64,
}

impl AppState {
    pub fn new(db: Db, assistant: Assistant, config: &Config) -> Self {
        Self {
            db: Mutex::new(db),
            assistant,
            fill_policy: config.fill_policy,
            order: config.order.clone(),
            default_bin_height: config.bin_height_cm,
        }
    }

    fn db(&self) -> Result<MutexGuard<'_, Db>, ApiError> {
        self.db.lock().map_err(|_| ApiError::Poisoned)
    }
}

#[get("/")]
async fn hello() -> impl Responder {
    HttpResponse::Ok().body("binwatch backend")
}

#[get("/api/bindetails")]
async fn api_bin_details(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let mut rows = state.db()?.latest_readings(state.fill_policy)?;
    state.order.sort_by_name(&mut rows, |row| row.binname.as_str());
    Ok(HttpResponse::Ok().json(ApiResponse::ok("Success", rows)))
}

#[derive(serde::Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GraphQuery {
    bin_id: String,
    // parsed with ViewMode::from_str, which ignores case
    view: Option<String>,
    anchor: Option<NaiveDate>,
}

#[get("/api/graph")]
async fn api_graph(
    query: web::Query<GraphQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let mode = query.view.as_deref().map(str::parse::<ViewMode>).transpose()?;
    let history = state.db()?.history(&query.bin_id)?;
    if history.is_empty() {
        return Err(ApiError::NoData);
    }

    let entries: Vec<GraphEntry> = history
        .iter()
        .map(|reading| reading.graph_entry(state.fill_policy))
        .collect();

    let entries = match mode {
        Some(mode) => {
            let view = ViewWindow {
                mode,
                anchor: query.anchor,
            };
            window::filter(&entries, &view, &Utc)
        }
        None => entries,
    };

    Ok(HttpResponse::Ok().json(ApiResponse::ok("Success", entries)))
}

#[post("/api/upload")]
async fn api_upload(
    body: web::Json<SensorUpload>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let reading = body.into_inner().data;
    reading.validate()?;

    let stored = {
        let mut db = state.db()?;
        if db.bin(&reading.bin_id)?.is_none() {
            return Err(ApiError::UnknownBin(reading.bin_id));
        }
        db.insert_reading(&NewSensorData::from_upload(&reading, Utc::now()))?
    };
    info!("reading {} stored for bin {}", stored.id, stored.bin_id);

    Ok(HttpResponse::Ok().json(ApiResponse::ok("Success", stored)))
}

#[post("/api/upload/bulk")]
async fn api_upload_bulk(
    body: web::Json<BulkUpload>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let upload = body.into_inner();
    upload.validate()?;

    let rows: Vec<_> = upload
        .rows
        .iter()
        .map(|row| NewSensorData::from_history(&upload.bin_id, row))
        .collect();

    let inserted = {
        let mut db = state.db()?;
        if db.bin(&upload.bin_id)?.is_none() {
            return Err(ApiError::UnknownBin(upload.bin_id));
        }
        db.insert_readings(&rows)?
    };
    info!("imported {inserted} reading(s) for bin {}", upload.bin_id);

    Ok(HttpResponse::Ok().json(ApiResponse::ok("Success", inserted)))
}

#[get("/api/bins")]
async fn api_bins(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let bins: Vec<BinInfo> = state.db()?.bins()?.into_iter().map(BinInfo::from).collect();
    Ok(HttpResponse::Ok().json(ApiResponse::ok("Success", bins)))
}

#[post("/api/bins")]
async fn api_register_bin(
    body: web::Json<RegisterBin>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let bin = body.into_inner();
    bin.validate()?;

    let new = NewBin {
        bin_id: bin.bin_id,
        name: bin.name,
        address: bin.address,
        bin_height: bin.bin_height.unwrap_or(state.default_bin_height),
    };
    state.db()?.upsert_bin(&new)?;
    info!("registered bin {} ({})", new.bin_id, new.name);

    Ok(HttpResponse::Ok().json(ApiResponse::ok(
        "Success",
        BinInfo {
            bin_id: new.bin_id,
            name: new.name,
            address: new.address,
            bin_height: new.bin_height,
        },
    )))
}

#[post("/api/chat")]
async fn api_chat(
    body: web::Json<ChatRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let req = body.into_inner();
    // the lock is released before the model call
    let bin_height = match &req.bin_id {
        Some(id) => state.db()?.bin(id)?.map(|bin| bin.bin_height),
        None => None,
    };
    let reply = state.assistant.ask(req, bin_height).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok("Success", ChatReply { reply })))
}

/// Routes plus extractor settings. Shared by the server and the tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .limit(4 * 1024 * 1024)
            .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into()),
    )
    .service(hello)
    .service(api_bin_details)
    .service(api_graph)
    .service(api_upload)
    .service(api_upload_bulk)
    .service(api_bins)
    .service(api_register_bin)
    .service(api_chat);
}

pub async fn new_http_server(state: Data<AppState>, config: &Config) -> std::io::Result<()> {
    let origin = config.frontend_origin.clone();
    info!("listening on {}:{}", config.bind_addr, config.port);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(configure)
            .wrap(
                Cors::default()
                    .allowed_origin(&origin) // frontend
                    .allowed_methods(vec!["GET", "POST"])
                    .allowed_headers(vec![header::AUTHORIZATION, header::ACCEPT])
                    .allowed_header(header::CONTENT_TYPE)
                    .supports_credentials()
                    .max_age(3600),
            )
            .wrap(Logger::default())
    })
    .bind((config.bind_addr.as_str(), config.port))?
    .run()
    .await
}
