//! Build, sign and submit transactions with the local keypair.
//!
//! Two paths lead to the ledger:
//! - instructions compiled locally into a legacy message
//!   ([`TransactionAssembler::create_sign_and_send`]);
//! - base64 envelopes generated elsewhere, adopted, re-stamped with a fresh
//!   blockhash and co-signed ([`TransactionAssembler::submit_encoded_batch`]).

use chain_sol::{bytes_to_address, compile_message, Keypair, SolInstruction, SolTransaction};
use lulo_api::TransactionMeta;
use sol_rpc::Ledger;

use crate::config::BlockhashRefresh;
use crate::error::{LuloError, Result};

/// An externally generated, unsigned transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedEnvelope {
    /// Lending protocol the transaction targets.
    pub protocol: String,
    /// Standard base64 wire bytes.
    pub transaction: String,
}

impl From<TransactionMeta> for EncodedEnvelope {
    fn from(meta: TransactionMeta) -> Self {
        Self {
            protocol: meta.protocol,
            transaction: meta.transaction,
        }
    }
}

pub struct TransactionAssembler<'a, L: Ledger + ?Sized> {
    keypair: &'a Keypair,
    ledger: &'a L,
    refresh: BlockhashRefresh,
}

impl<'a, L: Ledger + ?Sized> TransactionAssembler<'a, L> {
    pub fn new(keypair: &'a Keypair, ledger: &'a L) -> Self {
        Self {
            keypair,
            ledger,
            refresh: BlockhashRefresh::default(),
        }
    }

    pub fn with_blockhash_refresh(mut self, refresh: BlockhashRefresh) -> Self {
        self.refresh = refresh;
        self
    }

    /// Fee payer and sole local signer.
    pub fn payer(&self) -> [u8; 32] {
        self.keypair.pubkey()
    }

    pub fn payer_address(&self) -> String {
        self.keypair.address()
    }

    /// Compile `instructions` against a fresh blockhash, local key paying fees.
    pub async fn create_transaction(
        &self,
        instructions: &[SolInstruction],
    ) -> Result<SolTransaction> {
        let blockhash = self.fresh_blockhash().await?;
        let message = compile_message(instructions, &self.payer(), &blockhash)?;
        Ok(SolTransaction::new_unsigned(message))
    }

    /// Fill the local key's signature slot.
    pub fn sign(&self, tx: &mut SolTransaction) -> Result<()> {
        let slot = tx.sign_partial(self.keypair)?;
        tracing::debug!(slot, signer = %self.payer_address(), "Signed transaction");
        Ok(())
    }

    /// Submit a transaction as-is. Returns the node's signature string.
    pub async fn send(&self, tx: &SolTransaction) -> Result<String> {
        let wire = tx.serialize()?;
        Ok(self.ledger.send_transaction(&wire).await?)
    }

    pub async fn create_sign_and_send(&self, instructions: &[SolInstruction]) -> Result<String> {
        let mut tx = self.create_transaction(instructions).await?;
        self.sign(&mut tx)?;
        let signature = self.send(&tx).await?;
        tracing::info!(signature = %signature, "Transaction sent");
        Ok(signature)
    }

    /// Adopt, co-sign and submit each envelope in order.
    ///
    /// Every envelope is decoded before the first blockhash fetch, so a
    /// malformed batch submits nothing. After that the first failure stops
    /// the batch; transactions already submitted stay submitted. Returns the
    /// node signatures of the submitted transactions.
    pub async fn submit_encoded_batch(&self, envelopes: &[EncodedEnvelope]) -> Result<Vec<String>> {
        let mut transactions = Vec::with_capacity(envelopes.len());
        for (index, envelope) in envelopes.iter().enumerate() {
            let tx = SolTransaction::from_base64(&envelope.transaction).map_err(|e| {
                LuloError::from(e).context(format!(
                    "failed to decode transaction {index} ({})",
                    envelope.protocol
                ))
            })?;
            transactions.push(tx);
        }

        if transactions.is_empty() {
            tracing::warn!("No transactions to submit");
            return Ok(Vec::new());
        }

        let mut batch_blockhash = None;
        if self.refresh == BlockhashRefresh::Batch {
            batch_blockhash = Some(self.fresh_blockhash().await?);
        }

        let mut signatures = Vec::with_capacity(transactions.len());
        for (index, (envelope, mut tx)) in envelopes.iter().zip(transactions).enumerate() {
            tracing::info!(index, protocol = %envelope.protocol, "Processing transaction");

            let blockhash = match batch_blockhash {
                Some(hash) => hash,
                None => self.fresh_blockhash().await?,
            };
            tx.set_recent_blockhash(blockhash);
            log_message_shape(&tx);

            self.sign(&mut tx).map_err(|e| {
                e.context(format!(
                    "failed to sign transaction {index} ({})",
                    envelope.protocol
                ))
            })?;
            for (slot, signature) in tx.signatures.iter().enumerate() {
                if *signature != chain_sol::EMPTY_SIGNATURE {
                    tracing::trace!(
                        slot,
                        signature = %chain_sol::signature_to_string(signature),
                        "Signature present"
                    );
                }
            }

            let signature = match self.send(&tx).await {
                Ok(signature) => signature,
                Err(e) => {
                    tracing::error!(
                        index,
                        protocol = %envelope.protocol,
                        required_signatures = tx.message.header.num_required_signatures,
                        present_signatures = tx.present_signatures(),
                        error = %e,
                        "Failed to send transaction"
                    );
                    return Err(e.context(format!(
                        "failed to send transaction {index} ({})",
                        envelope.protocol
                    )));
                }
            };

            tracing::info!(
                index,
                protocol = %envelope.protocol,
                signature = %signature,
                "Transaction sent successfully"
            );
            signatures.push(signature);
        }

        Ok(signatures)
    }

    async fn fresh_blockhash(&self) -> Result<[u8; 32]> {
        let blockhash = self
            .ledger
            .latest_blockhash()
            .await
            .map_err(|e| LuloError::from(e).context("failed to get recent blockhash"))?;
        tracing::debug!(blockhash = %bytes_to_address(&blockhash), "Using recent blockhash");
        Ok(blockhash)
    }
}

fn log_message_shape(tx: &SolTransaction) {
    let message = &tx.message;
    tracing::debug!(
        version = ?message.version,
        num_required_signatures = message.header.num_required_signatures,
        num_readonly_signed = message.header.num_readonly_signed,
        num_readonly_unsigned = message.header.num_readonly_unsigned,
        account_keys = message.account_keys.len(),
        address_table_lookups = message.address_table_lookups.len(),
        "Transaction details"
    );
    for (slot, key) in message.signer_keys().iter().enumerate() {
        tracing::debug!(slot, signer = %bytes_to_address(key), "Required signer");
    }
}
