//! JSON-RPC 2.0 ledger client over HTTP.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use ledgerdb_core::{
    AccountInfo, Address, CompiledInstruction, InnerInstructions, Signature, SignatureInfo,
    TransactionBody,
};

use crate::error::{LedgerError, Result};
use crate::traits::Ledger;

/// A ledger reached through a JSON-RPC endpoint.
#[derive(Debug)]
pub struct HttpLedger {
    endpoint: String,
    client: Client,
    next_id: AtomicU64,
}

impl HttpLedger {
    /// Create a client for `endpoint` with a per-request timeout.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            endpoint: endpoint.into(),
            client,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let resp = self.client.post(&self.endpoint).json(&request).send().await?;
        if !resp.status().is_success() {
            return Err(LedgerError::Transport(format!(
                "{method} failed: HTTP {}",
                resp.status()
            )));
        }

        let envelope: RpcEnvelope = resp.json().await?;
        if let Some(err) = envelope.error {
            return Err(LedgerError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        serde_json::from_value(envelope.result)
            .map_err(|e| LedgerError::InvalidResponse(format!("{method}: {e}")))
    }
}

#[async_trait]
impl Ledger for HttpLedger {
    async fn get_account_info(&self, address: &Address) -> Result<Option<AccountInfo>> {
        let resp: WireContext<Option<WireAccount>> = self
            .call(
                "getAccountInfo",
                json!([address.to_base58(), {"encoding": "base64"}]),
            )
            .await?;
        resp.value.map(WireAccount::into_account).transpose()
    }

    async fn get_signatures_for_address(
        &self,
        address: &Address,
        limit: usize,
        before: Option<&Signature>,
    ) -> Result<Vec<SignatureInfo>> {
        let mut opts = json!({ "limit": limit });
        if let Some(cursor) = before {
            opts["before"] = Value::String(cursor.to_base58());
        }
        let entries: Vec<WireSignature> = self
            .call("getSignaturesForAddress", json!([address.to_base58(), opts]))
            .await?;
        entries.into_iter().map(WireSignature::into_info).collect()
    }

    async fn get_transaction(&self, signature: &Signature) -> Result<Option<TransactionBody>> {
        let raw: Option<Value> = self
            .call(
                "getTransaction",
                json!([
                    signature.to_base58(),
                    {"encoding": "json", "maxSupportedTransactionVersion": 0}
                ]),
            )
            .await?;

        let Some(raw) = raw else {
            return Ok(None);
        };

        match parse_transaction(*signature, raw) {
            Ok(body) => Ok(Some(body)),
            Err(e) => {
                tracing::warn!(%signature, error = %e, "malformed transaction body, skipping");
                Ok(None)
            }
        }
    }
}

/// Decode a `getTransaction` result in `json` encoding.
pub fn parse_transaction(signature: Signature, raw: Value) -> Result<TransactionBody> {
    let wire: WireTransaction =
        serde_json::from_value(raw).map_err(|e| LedgerError::InvalidResponse(e.to_string()))?;

    let mut account_keys = wire
        .transaction
        .message
        .account_keys
        .iter()
        .map(|k| Address::from_base58(k))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let meta = wire.meta.unwrap_or_default();
    if let Some(loaded) = meta.loaded_addresses {
        for key in loaded.writable.iter().chain(loaded.readonly.iter()) {
            account_keys.push(Address::from_base58(key)?);
        }
    }

    let instructions = wire
        .transaction
        .message
        .instructions
        .into_iter()
        .map(WireInstruction::into_compiled)
        .collect::<Result<Vec<_>>>()?;

    let inner_instructions = meta
        .inner_instructions
        .unwrap_or_default()
        .into_iter()
        .map(|group| {
            Ok(InnerInstructions {
                index: group.index,
                instructions: group
                    .instructions
                    .into_iter()
                    .map(WireInstruction::into_compiled)
                    .collect::<Result<Vec<_>>>()?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(TransactionBody {
        signature,
        slot: wire.slot,
        block_time: wire.block_time,
        account_keys,
        instructions,
        inner_instructions,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct RpcEnvelope {
    #[serde(default)]
    result: Value,
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct WireContext<T> {
    value: T,
}

#[derive(Deserialize)]
struct WireAccount {
    data: (String, String),
    owner: String,
    lamports: u64,
}

impl WireAccount {
    fn into_account(self) -> Result<AccountInfo> {
        let (payload, encoding) = self.data;
        if encoding != "base64" {
            return Err(LedgerError::InvalidResponse(format!(
                "unexpected account encoding {encoding}"
            )));
        }
        let data = base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| LedgerError::InvalidResponse(e.to_string()))?;
        Ok(AccountInfo {
            data,
            owner: Address::from_base58(&self.owner)?,
            lamports: self.lamports,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireSignature {
    signature: String,
    slot: u64,
    #[serde(default)]
    err: Option<Value>,
    #[serde(default)]
    block_time: Option<i64>,
}

impl WireSignature {
    fn into_info(self) -> Result<SignatureInfo> {
        Ok(SignatureInfo {
            signature: Signature::from_base58(&self.signature)?,
            slot: self.slot,
            block_time: self.block_time,
            failed: self.err.is_some_and(|e| !e.is_null()),
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireTransaction {
    slot: u64,
    #[serde(default)]
    block_time: Option<i64>,
    transaction: WireTx,
    #[serde(default)]
    meta: Option<WireMeta>,
}

#[derive(Deserialize)]
struct WireTx {
    message: WireMessage,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireMessage {
    account_keys: Vec<String>,
    instructions: Vec<WireInstruction>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireInstruction {
    program_id_index: u8,
    #[serde(default)]
    accounts: Vec<u8>,
    data: String,
}

impl WireInstruction {
    fn into_compiled(self) -> Result<CompiledInstruction> {
        let data = bs58::decode(&self.data)
            .into_vec()
            .map_err(|e| LedgerError::InvalidResponse(format!("instruction data: {e}")))?;
        Ok(CompiledInstruction {
            program_id_index: self.program_id_index,
            accounts: self.accounts,
            data,
        })
    }
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct WireMeta {
    #[serde(default)]
    inner_instructions: Option<Vec<WireInner>>,
    #[serde(default)]
    loaded_addresses: Option<WireLoaded>,
}

#[derive(Deserialize)]
struct WireInner {
    index: u8,
    instructions: Vec<WireInstruction>,
}

#[derive(Deserialize)]
struct WireLoaded {
    #[serde(default)]
    writable: Vec<String>,
    #[serde(default)]
    readonly: Vec<String>,
}
