//! JSON-RPC 2.0 transport over blocking HTTP.
//!
//! Each [`HubCall`] becomes one request object,
//! `{"jsonrpc": "2.0", "id": n, "method": ..., "params": {...}}`; a
//! multicall is sent as a JSON-RPC batch array and the responses are matched
//! back to the calls by id, since servers may answer a batch in any order.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use log::{debug, trace};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use super::{CallOutcome, Fault, HubCall, HubSession};
use crate::error::{Error, Result};

/// Upper bound for a single HTTP exchange; task waits poll and stay short.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    #[serde(flatten)]
    call: &'a HubCall,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

impl RpcResponse {
    fn into_outcome(self) -> CallOutcome {
        match self.error {
            Some(error) => Err(Fault::new(error.code, error.message)),
            None => Ok(self.result),
        }
    }
}

/// A session against a hub's JSON-RPC endpoint.
#[derive(Debug)]
pub struct HttpSession {
    url: Url,
    client: Client,
    next_id: AtomicU64,
}

impl HttpSession {
    pub fn connect(url: Url) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("replicate-tasks/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        Ok(Self {
            url,
            client,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    fn transport(&self, message: impl ToString) -> Error {
        Error::Transport {
            url: self.url.to_string(),
            message: message.to_string(),
        }
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn post<B: Serialize, R: for<'de> Deserialize<'de>>(&self, body: &B) -> Result<R> {
        let response = self
            .client
            .post(self.url.clone())
            .json(body)
            .send()
            .map_err(|e| self.transport(e))?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Err(self.transport(format!("HTTP {}: {}", status, text)));
        }
        response.json().map_err(|e| self.transport(e))
    }
}

/// Puts batch responses back into request order.
fn match_responses(ids: &[u64], responses: Vec<RpcResponse>) -> Result<Vec<CallOutcome>> {
    let mut by_id: HashMap<u64, RpcResponse> = responses
        .into_iter()
        .filter_map(|response| response.id.map(|id| (id, response)))
        .collect();
    ids.iter()
        .map(|id| {
            by_id
                .remove(id)
                .map(RpcResponse::into_outcome)
                .ok_or_else(|| Error::Decode {
                    method: "multiCall".to_string(),
                    message: format!("no response for request {}", id),
                })
        })
        .collect()
}

impl HubSession for HttpSession {
    fn call(&self, call: &HubCall) -> Result<Value> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id(),
            call,
        };
        trace!("-> {} #{}", call.method(), request.id);
        let response: RpcResponse = self.post(&request)?;
        response
            .into_outcome()
            .map_err(|fault| fault.into_error(call.method()))
    }

    fn multicall(&self, calls: &[HubCall]) -> Result<Vec<CallOutcome>> {
        let requests: Vec<RpcRequest<'_>> = calls
            .iter()
            .map(|call| RpcRequest {
                jsonrpc: "2.0",
                id: self.next_id(),
                call,
            })
            .collect();
        let ids: Vec<u64> = requests.iter().map(|r| r.id).collect();
        debug!("-> batch of {} calls", requests.len());
        let responses: Vec<RpcResponse> = self.post(&requests)?;
        match_responses(&ids, responses)
    }

    fn subsession(&self) -> Result<Box<dyn HubSession>> {
        Ok(Box::new(HttpSession::connect(self.url.clone())?))
    }
}
