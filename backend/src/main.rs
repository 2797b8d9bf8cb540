use actix_web::web::Data;
use anyhow::Result;
use binwatch_backend::{
    api::{self, AppState},
    assistant::Assistant,
    config::Config,
    db::Db,
};
use log::info;

#[actix_web::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env()?;
    let db = Db::connect(&config.database_url)?;
    info!("using database {}", config.database_url);

    let assistant = Assistant::from_config(&config)?;
    let state = Data::new(AppState::new(db, assistant, &config));

    api::new_http_server(state, &config).await?;
    Ok(())
}
