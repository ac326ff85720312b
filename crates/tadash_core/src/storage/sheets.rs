//! Remote spreadsheet backend (Google Sheets values API v4).
//!
//! # Responsibility
//! - Map the sheet contract onto `values.get`, `values.update`,
//!   `values.clear` and the spreadsheet metadata endpoint.
//!
//! # Invariants
//! - Values are written with `valueInputOption=RAW`; typing stays local.
//! - Requests carry a bearer token obtained outside this crate.
//! - Missing tabs are created with a `batchUpdate` `addSheet` request before
//!   the first write.
//! - `write_table` is a single `values.update`: the new rows are padded with
//!   blanks to the previous extent, so shrinking tables leave no stale cells
//!   and a rejected write leaves the old content intact.

use super::{SheetRows, StorageBackend, StorageError, StorageResult};
use log::debug;
use reqwest::blocking::{Client, Response};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

pub const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com";
const REQUEST_TIMEOUT_SECS: u64 = 30;
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Connection settings for one remote spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetsSettings {
    pub spreadsheet_id: String,
    pub access_token: String,
    pub base_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValueRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    major_dimension: Option<String>,
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Serialize)]
struct BatchUpdate {
    requests: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Debug, Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

pub struct SheetsBackend {
    client: Client,
    settings: SheetsSettings,
}

impl SheetsBackend {
    pub fn new(settings: SheetsSettings) -> StorageResult<Self> {
        if settings.access_token.trim().is_empty() {
            return Err(StorageError::MissingCredentials(
                "spreadsheet access token is empty".to_string(),
            ));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client, settings })
    }

    fn spreadsheet_url(&self, tail: &[&str]) -> StorageResult<Url> {
        let mut url = Url::parse(self.settings.base_url.trim_end_matches('/')).map_err(|err| {
            StorageError::InvalidPayload(format!("invalid spreadsheet base url: {err}"))
        })?;
        url.path_segments_mut()
            .map_err(|()| {
                StorageError::InvalidPayload("spreadsheet base url cannot be a base".to_string())
            })?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", self.settings.spreadsheet_id.as_str()])
            .extend(tail);
        Ok(url)
    }

    fn batch_update_url(&self) -> StorageResult<Url> {
        let mut url = self.spreadsheet_url(&[])?;
        let target = format!("{}:batchUpdate", self.settings.spreadsheet_id);
        url.path_segments_mut()
            .map_err(|()| {
                StorageError::InvalidPayload("spreadsheet base url cannot be a base".to_string())
            })?
            .pop()
            .push(&target);
        Ok(url)
    }

    fn has_sheet(&self, name: &str) -> StorageResult<bool> {
        Ok(self.table_names()?.iter().any(|title| title == name))
    }

    fn add_sheet(&self, name: &str) -> StorageResult<()> {
        let body = BatchUpdate {
            requests: vec![serde_json::json!({
                "addSheet": { "properties": { "title": name } }
            })],
        };
        let request = self.client.post(self.batch_update_url()?).json(&body);
        self.send("add_sheet", name, request)?;
        Ok(())
    }

    fn fetch_values(&self, name: &str) -> StorageResult<SheetRows> {
        let url = self.spreadsheet_url(&["values", &quote_sheet(name)])?;
        let request = self
            .client
            .get(url)
            .query(&[("valueRenderOption", "FORMATTED_VALUE")]);
        let range: ValueRange = self.send("read", name, request)?.json()?;
        Ok(range
            .values
            .into_iter()
            .map(|row| row.into_iter().map(json_cell_to_string).collect())
            .collect())
    }

    fn send(
        &self,
        operation: &'static str,
        sheet: &str,
        request: reqwest::blocking::RequestBuilder,
    ) -> StorageResult<Response> {
        let started_at = Instant::now();
        let response = request.bearer_auth(&self.settings.access_token).send()?;
        let status = response.status();
        debug!(
            "event=sheets_request module=storage op={operation} sheet={sheet} status_code={} duration_ms={}",
            status.as_u16(),
            started_at.elapsed().as_millis()
        );
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().unwrap_or_default();
        Err(StorageError::Remote {
            status: status.as_u16(),
            message: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
        })
    }
}

impl StorageBackend for SheetsBackend {
    fn backend_id(&self) -> &'static str {
        "sheets"
    }

    fn read_table(&self, name: &str) -> StorageResult<SheetRows> {
        if !self.has_sheet(name)? {
            return Ok(Vec::new());
        }
        self.fetch_values(name)
    }

    fn write_table(&self, name: &str, rows: &SheetRows) -> StorageResult<()> {
        let previous = if self.has_sheet(name)? {
            self.fetch_values(name)?
        } else {
            self.add_sheet(name)?;
            Vec::new()
        };

        let values = padded_to_extent(rows, &previous);
        if values.is_empty() {
            return Ok(());
        }

        let range = quote_sheet(name);
        let body = ValueRange {
            range: Some(range.clone()),
            major_dimension: Some("ROWS".to_string()),
            values: values
                .into_iter()
                .map(|row| row.into_iter().map(serde_json::Value::String).collect())
                .collect(),
        };
        let url = self.spreadsheet_url(&["values", &range])?;
        let request = self
            .client
            .put(url)
            .query(&[("valueInputOption", "RAW")])
            .json(&body);
        self.send("write", name, request)?;
        Ok(())
    }

    fn clear_table(&self, name: &str) -> StorageResult<()> {
        if !self.has_sheet(name)? {
            return self.add_sheet(name);
        }
        let url = self.spreadsheet_url(&["values", &format!("{}:clear", quote_sheet(name))])?;
        let request = self.client.post(url).json(&serde_json::json!({}));
        self.send("clear", name, request)?;
        Ok(())
    }

    fn table_names(&self) -> StorageResult<Vec<String>> {
        let url = self.spreadsheet_url(&[])?;
        let request = self
            .client
            .get(url)
            .query(&[("fields", "sheets.properties.title")]);
        let meta: SpreadsheetMeta = self.send("list", "*", request)?.json()?;
        Ok(meta
            .sheets
            .into_iter()
            .map(|sheet| sheet.properties.title)
            .collect())
    }
}

/// `rows` padded with blank cells to cover every cell of `previous`.
fn padded_to_extent(rows: &SheetRows, previous: &SheetRows) -> SheetRows {
    let width = rows
        .iter()
        .chain(previous.iter())
        .map(Vec::len)
        .max()
        .unwrap_or(0);
    let height = rows.len().max(previous.len());
    (0..height)
        .map(|index| {
            let mut row = rows.get(index).cloned().unwrap_or_default();
            row.resize(width, String::new());
            row
        })
        .collect()
}

/// A1 range covering a whole sheet; quotes are doubled inside the name.
fn quote_sheet(name: &str) -> String {
    format!("'{}'", name.replace('\'', "''"))
}

fn json_cell_to_string(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(text) => text,
        other => other.to_string(),
    }
}
