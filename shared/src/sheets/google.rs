use super::{Row, StoreError, TabularStore};
use crate::config::SheetsConfig;
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, RequestBuilder, Response};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::{pkcs1v15::SigningKey, signature::SignatureEncoding, signature::Signer, RsaPrivateKey};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::Sha256;
use std::future::Future;
use tokio::sync::RwLock;

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const NEW_SHEET_ROWS: usize = 1000;
// Refresh this long before Google says the token expires.
const TOKEN_SLACK_SECONDS: i64 = 60;

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

#[derive(Deserialize)]
struct SpreadsheetMetadata {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
}

/// Google Sheets backed store. Each table is one sheet (tab) of the
/// configured spreadsheet.
pub struct GoogleSheetsStore {
    client: Client,
    spreadsheet_id: String,
    client_email: String,
    private_key: String,
    access_token: RwLock<Option<CachedToken>>,
}

impl GoogleSheetsStore {
    pub fn new(config: &SheetsConfig) -> Self {
        Self {
            client: Client::new(),
            spreadsheet_id: config.spreadsheet_id.clone(),
            client_email: config.client_email.clone(),
            private_key: config.private_key.clone(),
            access_token: RwLock::new(None),
        }
    }

    /// Service-account OAuth: exchange a signed assertion for an access token.
    async fn token(&self) -> Result<String, StoreError> {
        {
            let cached = self.access_token.read().await;
            if let Some(token) = cached.as_ref() {
                if token.expires_at > Utc::now() {
                    return Ok(token.value.clone());
                }
            }
        }

        let now = Utc::now();
        let assertion = build_assertion(&self.client_email, &self.private_key, now)?;
        let response = self
            .client
            .post(TOKEN_URL)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Token exchange failed ({}): {}", status, body);
            return Err(StoreError::Auth(format!("token exchange returned {}", status)));
        }
        let token: TokenResponse = response.json().await?;

        let mut cached = self.access_token.write().await;
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at: now + Duration::seconds(token.expires_in - TOKEN_SLACK_SECONDS),
        });
        Ok(token.access_token)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, StoreError> {
        let token = self.token().await?;
        let response = request.bearer_auth(token).send().await?;
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(StoreError::Request(format!("{}: {}", status, body)))
    }

    fn values_url(&self, range: &str) -> String {
        format!("{}/{}/values/{}", SHEETS_API, self.spreadsheet_id, range)
    }

    async fn sheets(&self) -> Result<Vec<SheetProperties>, StoreError> {
        let url = format!("{}/{}", SHEETS_API, self.spreadsheet_id);
        let response = self
            .send(self.client.get(url).query(&[("fields", "sheets.properties(sheetId,title)")]))
            .await?;
        let metadata: SpreadsheetMetadata = response.json().await?;
        Ok(metadata.sheets.into_iter().map(|s| s.properties).collect())
    }

    /// Numeric sheet id for a tab title; needed by dimension/sheet deletes.
    async fn sheet_id(&self, table: &str) -> Result<i64, StoreError> {
        self.sheets()
            .await?
            .into_iter()
            .find(|s| s.title == table)
            .map(|s| s.sheet_id)
            .ok_or_else(|| StoreError::MissingTable(table.to_string()))
    }

    /// Runs the requests and returns the raw reply (`{"replies": [...]}`).
    async fn batch_update(&self, requests: serde_json::Value) -> Result<serde_json::Value, StoreError> {
        let url = format!("{}/{}:batchUpdate", SHEETS_API, self.spreadsheet_id);
        let response = self
            .send(self.client.post(url).json(&json!({ "requests": requests })))
            .await?;
        Ok(response.json().await?)
    }

    async fn delete_sheet(&self, sheet_id: i64) -> Result<(), StoreError> {
        self.batch_update(json!([{ "deleteSheet": { "sheetId": sheet_id } }]))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl TabularStore for GoogleSheetsStore {
    async fn table_exists(&self, table: &str) -> Result<bool, StoreError> {
        Ok(self.sheets().await?.iter().any(|s| s.title == table))
    }

    async fn create_table(&self, table: &str, header: &[String]) -> Result<(), StoreError> {
        tracing::info!("Creating sheet {}", table);
        let reply = self
            .batch_update(json!([{
                "addSheet": {
                    "properties": {
                        "title": table,
                        "gridProperties": {
                            "rowCount": NEW_SHEET_ROWS,
                            "columnCount": header.len().max(1),
                        }
                    }
                }
            }]))
            .await?;

        // The new sheet is removed again when its header cannot be written.
        let seeded = self.write_row(table, 0, header.to_vec()).await;
        match added_sheet_id(&reply) {
            Some(sheet_id) => rollback_on_error(seeded, self.delete_sheet(sheet_id), table).await,
            None => rollback_on_error(seeded, self.drop_table(table), table).await,
        }
    }

    async fn drop_table(&self, table: &str) -> Result<(), StoreError> {
        let sheet_id = self.sheet_id(table).await?;
        tracing::info!("Deleting sheet {} ({})", table, sheet_id);
        self.delete_sheet(sheet_id).await
    }

    async fn read_rows(&self, table: &str) -> Result<Vec<Row>, StoreError> {
        let response = self
            .send(self.client.get(self.values_url(&quote_sheet(table))))
            .await?;
        let range: ValueRange = response.json().await?;
        Ok(range.values)
    }

    async fn append_row(&self, table: &str, row: Row) -> Result<(), StoreError> {
        let url = format!("{}:append", self.values_url(&a1_row(table, 0)));
        self.send(
            self.client
                .post(url)
                .query(&[("valueInputOption", "RAW"), ("insertDataOption", "INSERT_ROWS")])
                .json(&json!({ "values": [row] })),
        )
        .await?;
        Ok(())
    }

    async fn write_row(&self, table: &str, index: usize, row: Row) -> Result<(), StoreError> {
        let range = a1_row(table, index);
        self.send(
            self.client
                .put(self.values_url(&range))
                .query(&[("valueInputOption", "RAW")])
                .json(&json!({ "range": range, "majorDimension": "ROWS", "values": [row] })),
        )
        .await?;
        Ok(())
    }

    async fn delete_row(&self, table: &str, index: usize) -> Result<(), StoreError> {
        let sheet_id = self.sheet_id(table).await?;
        // deleteDimension takes 0-based, end-exclusive indices.
        self.batch_update(json!([{
            "deleteDimension": {
                "range": {
                    "sheetId": sheet_id,
                    "dimension": "ROWS",
                    "startIndex": index,
                    "endIndex": index + 1,
                }
            }
        }]))
        .await?;
        Ok(())
    }
}

/// Sheet id of the tab created by an `addSheet` request.
fn added_sheet_id(reply: &serde_json::Value) -> Option<i64> {
    reply
        .pointer("/replies/0/addSheet/properties/sheetId")
        .and_then(serde_json::Value::as_i64)
}

/// Runs `rollback` when `result` failed; the original error is returned either way.
async fn rollback_on_error<T, F>(result: Result<T, StoreError>, rollback: F, table: &str) -> Result<T, StoreError>
where
    F: Future<Output = Result<(), StoreError>>,
{
    if let Err(e) = &result {
        tracing::error!("Seeding sheet {} failed, removing it: {}", table, e);
        if let Err(cleanup) = rollback.await {
            tracing::warn!("Could not remove half-created sheet {}: {}", table, cleanup);
        }
    }
    result
}

fn quote_sheet(table: &str) -> String {
    format!("'{}'", table.replace('\'', "''"))
}

/// A1 range covering the whole row at 0-based `index` (A1 rows are 1-based).
fn a1_row(table: &str, index: usize) -> String {
    let row = index + 1;
    format!("{}!{}:{}", quote_sheet(table), row, row)
}

/// RS256-signed JWT assertion for the service-account grant.
fn build_assertion(client_email: &str, private_key_pem: &str, now: DateTime<Utc>) -> Result<String, StoreError> {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
    let claims = AssertionClaims {
        iss: client_email,
        scope: SHEETS_SCOPE,
        aud: TOKEN_URL,
        iat: now.timestamp(),
        exp: (now + Duration::hours(1)).timestamp(),
    };
    let claims_json =
        serde_json::to_vec(&claims).map_err(|e| StoreError::Auth(format!("claims encoding failed: {}", e)))?;
    let signing_input = format!("{}.{}", header, URL_SAFE_NO_PAD.encode(claims_json));

    let signature = sign_rs256(signing_input.as_bytes(), private_key_pem)?;
    Ok(format!("{}.{}", signing_input, URL_SAFE_NO_PAD.encode(signature)))
}

fn sign_rs256(message: &[u8], private_key_pem: &str) -> Result<Vec<u8>, StoreError> {
    // Google issues PKCS#8 keys; accept PKCS#1 as well.
    let private_key = match RsaPrivateKey::from_pkcs8_pem(private_key_pem) {
        Ok(k) => k,
        Err(_) => RsaPrivateKey::from_pkcs1_pem(private_key_pem)
            .map_err(|e| StoreError::Auth(format!("invalid service account key: {}", e)))?,
    };
    let signing_key = SigningKey::<Sha256>::new(private_key);
    Ok(signing_key.sign(message).to_vec())
}
