// thin wrappers around the backend api, see common::req for the payloads
use anyhow::{anyhow, Result};
use common::req::{ApiResponse, BinRow, ChatReply, ChatRequest, ChatTurn, GraphEntry};
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;

fn api_url(endpoint: &str) -> String {
    let host_url = host_url();
    format!("{host_url}/{endpoint}")
}

fn host_url() -> String {
    let location = web_sys::window().map(|w| w.location());
    let protocol = location
        .as_ref()
        .and_then(|l| l.protocol().ok())
        .unwrap_or_else(|| "http:".to_owned());
    let hostname = location
        .as_ref()
        .and_then(|l| l.hostname().ok())
        .unwrap_or_else(|| "127.0.0.1".to_owned());
    format!("{protocol}//{hostname}:8081")
}

/// Unwraps the response envelope. Failures keep the backend's error text.
async fn envelope<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let envelope = resp
        .json::<ApiResponse<T>>()
        .await
        .map_err(|e| anyhow!("unexpected response from backend: {e}"))?;
    Ok(envelope.into_result()?)
}

pub async fn bin_directory() -> Result<Vec<BinRow>> {
    let client = reqwest::Client::new();

    let resp = client
        .get(api_url("api/bindetails"))
        .header(ACCEPT, "application/json")
        .send()
        .await?;
    envelope(resp).await
}

pub async fn bin_history(bin_id: &str) -> Result<Vec<GraphEntry>> {
    let client = reqwest::Client::new();

    let resp = client
        .get(api_url("api/graph"))
        .query(&[("binId", bin_id)])
        .header(ACCEPT, "application/json")
        .send()
        .await?;
    envelope(resp).await
}

/// `history` ends with the question being asked; the backend strips it.
pub async fn ask_assistant(
    bin_id: String,
    message: String,
    data: Vec<GraphEntry>,
    history: Vec<ChatTurn>,
) -> Result<String> {
    let client = reqwest::Client::new();

    let resp = client
        .post(api_url("api/chat"))
        .header(ACCEPT, "application/json")
        .json(&ChatRequest {
            message,
            bin_id: Some(bin_id),
            data,
            history,
        })
        .send()
        .await?;
    let reply: ChatReply = envelope(resp).await?;
    Ok(reply.reply)
}
