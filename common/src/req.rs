// wire contract between backend and frontend, keep both sides on this module
use chrono::{DateTime, Utc};

use crate::error::{finite, ValidationError};

/// Envelope around every JSON response of the backend.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct ApiResponse<T> {
    pub message: String,
    // no `default` here, serde would then require T: Default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            data: Some(data),
            success: true,
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data: None,
            success: false,
            error: Some(error.into()),
        }
    }

    /// Splits the envelope into the payload or the reported failure.
    pub fn into_result(self) -> Result<T, ApiFailure> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            (true, None) => Err(ApiFailure {
                message: self.message,
                error: "response carried no data".to_owned(),
            }),
            (false, _) => Err(ApiFailure {
                message: self.message,
                error: self.error.unwrap_or_else(|| "unknown error".to_owned()),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}: {error}")]
pub struct ApiFailure {
    pub message: String,
    pub error: String,
}

/// One row of the bin directory: a registered bin joined with its latest reading.
/// Field names follow the storage columns.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct BinRow {
    pub bin: String, // bin id
    pub binname: String,
    pub address: String,
    pub fillcm: f64,      // cm
    pub binheight: f64,   // cm
    pub fillpct: i32,     // percent, under the server's clamp policy
    pub temperature: f64, // °C
    pub humidity: f64,    // percent
    pub gasppm: f64,      // ppm
    pub battery: f64,     // percent
    pub updatetime: DateTime<Utc>,
}

/// One point of a bin's history, as drawn by the timeline chart.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEntry {
    pub time: DateTime<Utc>,
    pub level: i32, // percent
    pub temperature: i32,
    pub humidity: i32,
    pub gas_production: i32,
    pub battery_charge: i32,
}

/// A single reading pushed by a sensor. The server assigns the timestamp.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorReading {
    pub bin_id: String,
    pub fill_level: f64, // cm of waste measured by the depth sensor
    pub temperature: f64,
    pub humidity: f64,
    pub gas_production: f64,
    pub battery_charge: f64,
}

impl SensorReading {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.bin_id.trim().is_empty() {
            return Err(ValidationError::Missing("binId"));
        }
        finite("fillLevel", self.fill_level)?;
        finite("temperature", self.temperature)?;
        finite("humidity", self.humidity)?;
        finite("gasProduction", self.gas_production)?;
        finite("batteryCharge", self.battery_charge)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct SensorUpload {
    pub data: SensorReading,
}

/// A reading recorded elsewhere and imported later, with its own timestamp.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalReading {
    pub time: DateTime<Utc>,
    pub fill_level: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub gas_production: f64,
    pub battery_charge: f64,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkUpload {
    pub bin_id: String,
    pub rows: Vec<HistoricalReading>,
}

impl BulkUpload {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.bin_id.trim().is_empty() {
            return Err(ValidationError::Missing("binId"));
        }
        for row in &self.rows {
            finite("fillLevel", row.fill_level)?;
            finite("temperature", row.temperature)?;
            finite("humidity", row.humidity)?;
            finite("gasProduction", row.gas_production)?;
            finite("batteryCharge", row.battery_charge)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredReading {
    pub id: i32,
    pub bin_id: String,
    pub time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BinInfo {
    pub bin_id: String,
    pub name: String,
    pub address: String,
    pub bin_height: f64, // cm
}

/// Registers a bin or updates its name, address or height.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterBin {
    pub bin_id: String,
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub bin_height: Option<f64>,
}

impl RegisterBin {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.bin_id.trim().is_empty() {
            return Err(ValidationError::Missing("binId"));
        }
        if self.name.trim().is_empty() {
            return Err(ValidationError::Missing("name"));
        }
        if let Some(height) = self.bin_height {
            if finite("binHeight", height)? <= 0.0 {
                return Err(ValidationError::NotPositive {
                    field: "binHeight",
                    value: height,
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub text: String,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            text: text.into(),
        }
    }
}

/// Question about one bin. `history` may end with the question itself.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct ChatRequest {
    pub message: String,
    /// Bin the question is about, its stored height goes into the prompt.
    #[serde(default, rename = "binId", skip_serializing_if = "Option::is_none")]
    pub bin_id: Option<String>,
    #[serde(default)]
    pub data: Vec<GraphEntry>,
    #[serde(default)]
    pub history: Vec<ChatTurn>,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct ChatReply {
    pub reply: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_envelope_has_no_data() {
        let resp = ApiResponse::<Vec<BinRow>>::failed("Failed to fetch bin data", "db is gone");
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "message": "Failed to fetch bin data",
                "success": false,
                "error": "db is gone"
            })
        );

        let err = resp.into_result().unwrap_err();
        assert_eq!(err.error, "db is gone");
    }

    #[test]
    fn graph_entry_field_names() {
        let raw = r#"{
            "time": "2024-03-01T10:00:00Z",
            "level": 0,
            "temperature": 21,
            "humidity": 40,
            "gasProduction": 12,
            "batteryCharge": 88
        }"#;
        let entry: GraphEntry = serde_json::from_str(raw).unwrap();
        assert_eq!(entry.level, 0);
        assert_eq!(entry.gas_production, 12);
        assert_eq!(entry.battery_charge, 88);
    }

    #[test]
    fn chat_request_defaults() {
        let req: ChatRequest = serde_json::from_str(r#"{"message": "is it full?"}"#).unwrap();
        assert_eq!(req.bin_id, None);
        assert!(req.data.is_empty());
        assert!(req.history.is_empty());

        let turn: ChatTurn = serde_json::from_str(r#"{"role": "assistant", "text": "no"}"#).unwrap();
        assert_eq!(turn, ChatTurn::assistant("no"));
    }

    #[test]
    fn register_bin_rejects_flat_bins() {
        let bin = RegisterBin {
            bin_id: "b1".to_owned(),
            name: "Cafeteria".to_owned(),
            address: String::new(),
            bin_height: Some(0.0),
        };
        assert_eq!(
            bin.validate(),
            Err(ValidationError::NotPositive {
                field: "binHeight",
                value: 0.0
            })
        );
    }

    #[test]
    fn sensor_reading_needs_bin_id() {
        let raw = r#"{"data": {"binId": " ", "fillLevel": 0, "temperature": 20,
            "humidity": 30, "gasProduction": 4, "batteryCharge": 99}}"#;
        let upload: SensorUpload = serde_json::from_str(raw).unwrap();
        assert_eq!(upload.data.validate(), Err(ValidationError::Missing("binId")));
    }

    #[test]
    fn chat_reply_envelope() {
        let resp: ApiResponse<ChatReply> = serde_json::from_str(
            r#"{"message": "Success", "success": true, "data": {"reply": "Emptied this morning."}}"#,
        )
        .unwrap();
        assert_eq!(resp.into_result().unwrap().reply, "Emptied this morning.");

        let resp: ApiResponse<ChatReply> =
            serde_json::from_str(r#"{"message": "Error", "success": false, "error": "rate limited"}"#).unwrap();
        assert_eq!(resp.into_result().unwrap_err().error, "rate limited");
    }

    #[test]
    fn success_without_data_is_a_failure() {
        let resp: ApiResponse<ChatReply> =
            serde_json::from_str(r#"{"message": "Successfull", "success": true}"#).unwrap();
        assert!(resp.into_result().is_err());
    }
}
