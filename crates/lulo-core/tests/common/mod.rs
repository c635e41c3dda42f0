//! Shared mocks for the lulo-core integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chain_sol::{
    AddressTableLookup, CompiledInstruction, Keypair, MessageHeader, MessageVersion, SolMessage,
    SolTransaction,
};
use lulo_api::{AccountSummary, ApiError, DepositRequest, LendingApi, TransactionMeta, WithdrawRequest};
use lulo_core::EncodedEnvelope;
use sol_rpc::{Ledger, RpcError};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Blockhash baked into generated envelopes; always replaced before signing.
pub const STALE_BLOCKHASH: [u8; 32] = [0xEE; 32];

pub fn test_keypair() -> Keypair {
    Keypair::from_bytes(&[7u8; 32]).unwrap()
}

// ─── HTTP mock ──────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    /// Path plus query string.
    pub target: String,
    headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

/// One-connection-at-a-time HTTP server answering with canned
/// `(status, body)` pairs in order. Every request is recorded.
pub struct MockServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockServer {
    pub async fn start(responses: Vec<(u16, String)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);
        let mut responses: VecDeque<(u16, String)> = responses.into();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let Some(request) = read_request(&mut socket).await else {
                    continue;
                };
                recorded.lock().unwrap().push(request);

                let (status, body) = responses
                    .pop_front()
                    .unwrap_or((500, r#"{"error":"no canned response left"}"#.to_string()));
                let response = format!(
                    "HTTP/1.1 {status} Mock\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        Self { addr, requests }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

async fn read_request(socket: &mut TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split(' ');
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();

    let content_length: usize = headers
        .iter()
        .find(|(k, _)| k == "content-length")
        .and_then(|(_, v)| v.parse().ok())
        .unwrap_or(0);
    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let end = buf.len().min(header_end + content_length);

    Some(RecordedRequest {
        method,
        target,
        headers,
        body: String::from_utf8_lossy(&buf[header_end..end]).to_string(),
    })
}

// ─── Ledger mock ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerCall {
    Blockhash,
    Send(Vec<u8>),
}

/// Records every call. The n-th blockhash fetch (1-based) returns `[n; 32]`.
#[derive(Default)]
pub struct MockLedger {
    calls: Mutex<Vec<LedgerCall>>,
    fail_send_at: Option<usize>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the `index`-th submission (0-based) like a failed preflight.
    pub fn failing_send_at(index: usize) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_send_at: Some(index),
        }
    }

    pub fn calls(&self) -> Vec<LedgerCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn blockhash_fetches(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| **c == LedgerCall::Blockhash)
            .count()
    }

    pub fn sent(&self) -> Vec<SolTransaction> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                LedgerCall::Send(wire) => Some(SolTransaction::deserialize(&wire).unwrap()),
                LedgerCall::Blockhash => None,
            })
            .collect()
    }
}

#[async_trait]
impl Ledger for MockLedger {
    async fn latest_blockhash(&self) -> Result<[u8; 32], RpcError> {
        let mut calls = self.calls.lock().unwrap();
        calls.push(LedgerCall::Blockhash);
        let n = calls.iter().filter(|c| **c == LedgerCall::Blockhash).count();
        Ok([n as u8; 32])
    }

    async fn send_transaction(&self, wire: &[u8]) -> Result<String, RpcError> {
        let mut calls = self.calls.lock().unwrap();
        let index = calls
            .iter()
            .filter(|c| matches!(c, LedgerCall::Send(_)))
            .count();
        calls.push(LedgerCall::Send(wire.to_vec()));
        if self.fail_send_at == Some(index) {
            return Err(RpcError::Rpc {
                code: -32002,
                message: "Transaction simulation failed: insufficient funds".into(),
            });
        }
        Ok(format!("sig-{index}"))
    }
}

// ─── Lending API mock ───────────────────────────────────────────────

/// Answers generate calls with fixed metas and counts every call.
pub struct MockApi {
    metas: Vec<TransactionMeta>,
    calls: Mutex<usize>,
    pub deposits: Mutex<Vec<DepositRequest>>,
    pub withdrawals: Mutex<Vec<WithdrawRequest>>,
}

impl MockApi {
    pub fn new(metas: Vec<TransactionMeta>) -> Self {
        Self {
            metas,
            calls: Mutex::new(0),
            deposits: Mutex::new(Vec::new()),
            withdrawals: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl LendingApi for MockApi {
    async fn generate_deposit(
        &self,
        request: &DepositRequest,
    ) -> Result<Vec<TransactionMeta>, ApiError> {
        *self.calls.lock().unwrap() += 1;
        self.deposits.lock().unwrap().push(request.clone());
        Ok(self.metas.clone())
    }

    async fn generate_withdraw(
        &self,
        request: &WithdrawRequest,
    ) -> Result<Vec<TransactionMeta>, ApiError> {
        *self.calls.lock().unwrap() += 1;
        self.withdrawals.lock().unwrap().push(request.clone());
        Ok(self.metas.clone())
    }

    async fn account(&self) -> Result<AccountSummary, ApiError> {
        *self.calls.lock().unwrap() += 1;
        Err(ApiError::Status {
            status: 404,
            body: "not mocked".into(),
        })
    }
}

// ─── Envelope fixtures ──────────────────────────────────────────────

/// An unsigned v0 transaction paid by `payer`, optionally co-signed by a
/// protocol-side `cosigner`, with one lookup table.
pub fn unsigned_v0(payer: &[u8; 32], cosigner: Option<[u8; 32]>, tag: u8) -> SolTransaction {
    let mut account_keys = vec![*payer];
    account_keys.extend(cosigner);
    let signers = account_keys.len() as u8;
    account_keys.extend([[tag; 32], [0x44; 32]]);
    let program_index = account_keys.len() as u8 - 1;

    SolTransaction::new_unsigned(SolMessage {
        version: MessageVersion::V0,
        header: MessageHeader {
            num_required_signatures: signers,
            num_readonly_signed: 0,
            num_readonly_unsigned: 1,
        },
        account_keys,
        recent_blockhash: STALE_BLOCKHASH,
        instructions: vec![CompiledInstruction {
            program_id_index: program_index,
            account_indices: vec![0, 1, program_index + 1],
            data: vec![tag, 0x01, 0x02, 0x03],
        }],
        address_table_lookups: vec![AddressTableLookup {
            account_key: [0x55; 32],
            writable_indexes: vec![3],
            readonly_indexes: vec![],
        }],
    })
}

pub fn envelope(protocol: &str, tx: &SolTransaction) -> EncodedEnvelope {
    EncodedEnvelope {
        protocol: protocol.to_string(),
        transaction: tx.to_base64().unwrap(),
    }
}

pub fn meta(protocol: &str, tx: &SolTransaction) -> TransactionMeta {
    TransactionMeta {
        transaction: tx.to_base64().unwrap(),
        protocol: protocol.to_string(),
        total: None,
    }
}
