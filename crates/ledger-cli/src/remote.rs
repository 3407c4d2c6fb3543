//! Thin HTTP client for a running `ledger-node`.

use anyhow::{bail, Context, Result};
use ledger_core::{LedgerDocument, LedgerStore};
use ledger_storage::JsonFileStore;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use tracing::debug;

#[derive(Serialize)]
struct TxIn<'a> {
    sender: &'a str,
    recipient: &'a str,
    data: &'a str,
}

#[derive(Serialize)]
struct CorruptIn<'a> {
    index: usize,
    data: &'a str,
}

#[derive(Serialize)]
struct DifficultyIn {
    index: usize,
    difficulty: u32,
}

pub struct NodeClient {
    base: String,
    http: Client,
}

impl NodeClient {
    pub fn new(base: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    async fn get(&self, path: &str) -> Result<Value> {
        let url = format!("{}{path}", self.base);
        debug!(%url, "GET");
        let res = self.http.get(&url).send().await?;
        Self::decode(res).await
    }

    async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<Value> {
        let url = format!("{}{path}", self.base);
        debug!(%url, "POST");
        let res = self.http.post(&url).json(body).send().await?;
        Self::decode(res).await
    }

    async fn decode(res: reqwest::Response) -> Result<Value> {
        let status = res.status();
        let body: Value = res.json().await.context("decoding node response")?;
        if !status.is_success() {
            let message = body["error"].as_str().unwrap_or("unknown error");
            bail!("node returned {status}: {message}");
        }
        Ok(body)
    }

    pub async fn head(&self) -> Result<Value> {
        self.get("/chain/head").await
    }

    pub async fn add(&self, sender: &str, recipient: &str, data: &str) -> Result<Value> {
        self.post("/tx", &TxIn { sender, recipient, data }).await
    }

    pub async fn validate(&self) -> Result<Value> {
        self.get("/chain/validate").await
    }

    pub async fn corrupt(&self, index: usize, data: &str) -> Result<Value> {
        self.post("/chain/corrupt", &CorruptIn { index, data }).await
    }

    pub async fn repair(&self) -> Result<Value> {
        self.post("/chain/repair", &Value::Null).await
    }

    pub async fn change_difficulty(&self, index: usize, difficulty: u32) -> Result<Value> {
        self.post("/chain/difficulty", &DifficultyIn { index, difficulty })
            .await
    }

    pub async fn senders(&self) -> Result<Value> {
        self.get("/index/senders").await
    }

    pub async fn receivers(&self) -> Result<Value> {
        self.get("/index/receivers").await
    }

    /// Fetches the node's ledger and, if `output` is given, writes it as a
    /// ledger file.
    pub async fn export(&self, output: Option<PathBuf>) -> Result<Value> {
        let value = self.get("/chain").await?;
        if let Some(path) = output {
            let document = LedgerDocument::from_json_value(value.clone())?;
            JsonFileStore::new(&path).save(&document)?;
        }
        Ok(value)
    }
}
