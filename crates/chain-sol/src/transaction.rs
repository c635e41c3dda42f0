//! Solana transaction wire format, parsing and partial signing.
//!
//! Transactions are built, parsed and signed by hand; there is no `solana-sdk`
//! dependency. The wire layout:
//!
//! ```text
//! Transaction:
//!   num_signatures          compact-u16
//!   signatures              64 bytes * num_signatures
//!   message:
//!     [version prefix]      u8, only for versioned messages (0x80 | version)
//!     num_required_sigs     u8
//!     num_readonly_signed   u8
//!     num_readonly_unsigned u8
//!     num_accounts          compact-u16
//!     account_keys          32 bytes * num_accounts
//!     recent_blockhash      32 bytes
//!     num_instructions      compact-u16
//!     instructions[]        (see below)
//!     [lookups]             v0 only: compact-u16 count, then lookups[]
//!
//! Instruction:
//!   program_id_index        u8
//!   num_accounts            compact-u16
//!   account_indices         u8 * num_accounts
//!   data_len                compact-u16
//!   data                    u8 * data_len
//!
//! Address table lookup (v0):
//!   account_key             32 bytes
//!   num_writable            compact-u16
//!   writable_indexes        u8 * num_writable
//!   num_readonly            compact-u16
//!   readonly_indexes        u8 * num_readonly
//! ```
//!
//! Envelopes handed out by third-party APIs travel as standard base64 of the
//! full transaction bytes; see [`SolTransaction::from_base64`].

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;

use crate::error::SolError;
use crate::keypair::Keypair;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// The Solana System Program public key: 32 zero bytes.
pub const SYSTEM_PROGRAM_ID: [u8; 32] = [0u8; 32];

/// System Program `Transfer` instruction index (little-endian u32).
const SYSTEM_TRANSFER_IX_INDEX: u32 = 2;

/// High bit of the first message byte marks a versioned message.
const VERSION_PREFIX_MASK: u8 = 0x80;

/// An all-zero signature slot means "not yet signed".
pub const EMPTY_SIGNATURE: [u8; 64] = [0u8; 64];

// ---------------------------------------------------------------------------
// Compact-u16 encoding
// ---------------------------------------------------------------------------

/// Encode a `u16` value in Solana's compact-u16 format.
///
/// - Values 0..0x7f       -> 1 byte
/// - Values 0x80..0x3fff  -> 2 bytes
/// - Values 0x4000..      -> 3 bytes
pub fn encode_compact_u16(value: u16) -> Vec<u8> {
    let mut val = value as u32;
    let mut out = Vec::with_capacity(3);

    loop {
        let mut byte = (val & 0x7f) as u8;
        val >>= 7;
        if val > 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if val == 0 {
            break;
        }
    }

    out
}

/// Decode a compact-u16 value from the front of a byte slice.
///
/// Returns `(value, bytes_consumed)`.
pub fn decode_compact_u16(data: &[u8]) -> Result<(u16, usize), SolError> {
    let mut value: u32 = 0;

    for (i, byte) in data.iter().take(3).enumerate() {
        value |= ((byte & 0x7f) as u32) << (7 * i);
        if byte & 0x80 == 0 {
            if value > u16::MAX as u32 {
                return Err(SolError::SerializationError(
                    "compact-u16 value overflow".into(),
                ));
            }
            return Ok((value as u16, i + 1));
        }
        if i == 2 {
            return Err(SolError::SerializationError(
                "compact-u16 longer than 3 bytes".into(),
            ));
        }
    }

    Err(SolError::SerializationError(
        "unexpected end of data while decoding compact-u16".into(),
    ))
}

fn push_compact_len(buf: &mut Vec<u8>, len: usize, what: &str) -> Result<(), SolError> {
    let len = u16::try_from(len)
        .map_err(|_| SolError::SerializationError(format!("too many {what}: {len}")))?;
    buf.extend_from_slice(&encode_compact_u16(len));
    Ok(())
}

// ---------------------------------------------------------------------------
// Data structures
// ---------------------------------------------------------------------------

/// A single account reference in a Solana instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolAccountMeta {
    pub pubkey: [u8; 32],
    pub is_signer: bool,
    pub is_writable: bool,
}

/// A Solana instruction before it is compiled into a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolInstruction {
    pub program_id: [u8; 32],
    pub accounts: Vec<SolAccountMeta>,
    pub data: Vec<u8>,
}

/// A compiled instruction where account references are replaced by u8 indices
/// into the message's account list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledInstruction {
    /// Index of the program to invoke.
    pub program_id_index: u8,
    /// Indices of each account the instruction reads/writes.
    pub account_indices: Vec<u8>,
    /// Opaque instruction data.
    pub data: Vec<u8>,
}

/// Message format. Legacy messages have no prefix byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageVersion {
    Legacy,
    V0,
}

/// The three header counts that partition `account_keys`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    /// Number of required signatures (first N accounts are signers).
    pub num_required_signatures: u8,
    /// How many of the signing accounts are read-only.
    pub num_readonly_signed: u8,
    /// How many of the non-signing accounts are read-only.
    pub num_readonly_unsigned: u8,
}

/// A v0 reference into an on-chain address lookup table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressTableLookup {
    pub account_key: [u8; 32],
    pub writable_indexes: Vec<u8>,
    pub readonly_indexes: Vec<u8>,
}

/// The signed portion of a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolMessage {
    pub version: MessageVersion,
    pub header: MessageHeader,
    /// Static account keys in canonical order:
    ///   1. writable signers
    ///   2. read-only signers
    ///   3. writable non-signers
    ///   4. read-only non-signers
    pub account_keys: Vec<[u8; 32]>,
    pub recent_blockhash: [u8; 32],
    pub instructions: Vec<CompiledInstruction>,
    /// Always empty for legacy messages.
    pub address_table_lookups: Vec<AddressTableLookup>,
}

/// A complete transaction: signature slots plus message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolTransaction {
    pub signatures: Vec<[u8; 64]>,
    pub message: SolMessage,
}

// ---------------------------------------------------------------------------
// Message building
// ---------------------------------------------------------------------------

/// Build a native SOL transfer instruction.
pub fn transfer_instruction(from: &[u8; 32], to: &[u8; 32], lamports: u64) -> SolInstruction {
    // u32 LE instruction index (2 = Transfer) + u64 LE lamports.
    let mut data = Vec::with_capacity(12);
    data.extend_from_slice(&SYSTEM_TRANSFER_IX_INDEX.to_le_bytes());
    data.extend_from_slice(&lamports.to_le_bytes());

    SolInstruction {
        program_id: SYSTEM_PROGRAM_ID,
        accounts: vec![
            SolAccountMeta {
                pubkey: *from,
                is_signer: true,
                is_writable: true,
            },
            SolAccountMeta {
                pubkey: *to,
                is_signer: false,
                is_writable: true,
            },
        ],
        data,
    }
}

/// Compile instructions into a legacy message with a single fee payer.
///
/// The fee payer is always a writable signer at index 0.
pub fn compile_message(
    instructions: &[SolInstruction],
    fee_payer: &[u8; 32],
    recent_blockhash: &[u8; 32],
) -> Result<SolMessage, SolError> {
    if instructions.is_empty() {
        return Err(SolError::TransactionBuildError(
            "at least one instruction is required".into(),
        ));
    }

    struct AccountEntry {
        pubkey: [u8; 32],
        is_signer: bool,
        is_writable: bool,
    }

    // Instruction account lists are tiny, a linear scan is fine.
    let mut entries: Vec<AccountEntry> = Vec::new();
    let mut upsert = |pubkey: [u8; 32], signer: bool, writable: bool| {
        if let Some(entry) = entries.iter_mut().find(|e| e.pubkey == pubkey) {
            entry.is_signer |= signer;
            entry.is_writable |= writable;
        } else {
            entries.push(AccountEntry {
                pubkey,
                is_signer: signer,
                is_writable: writable,
            });
        }
    };

    upsert(*fee_payer, true, true);
    for ix in instructions {
        for meta in &ix.accounts {
            upsert(meta.pubkey, meta.is_signer, meta.is_writable);
        }
        upsert(ix.program_id, false, false);
    }

    // Stable sort keeps insertion order inside a category, so the fee payer
    // stays first among writable signers.
    entries.sort_by_key(|e| match (e.is_signer, e.is_writable) {
        (true, true) => 0u8,
        (true, false) => 1,
        (false, true) => 2,
        (false, false) => 3,
    });

    if entries.len() > u8::MAX as usize + 1 {
        return Err(SolError::TransactionBuildError(format!(
            "too many accounts: {}",
            entries.len()
        )));
    }

    let count = |pred: fn(&AccountEntry) -> bool| entries.iter().filter(|e| pred(e)).count() as u8;
    let header = MessageHeader {
        num_required_signatures: count(|e| e.is_signer),
        num_readonly_signed: count(|e| e.is_signer && !e.is_writable),
        num_readonly_unsigned: count(|e| !e.is_signer && !e.is_writable),
    };

    let account_keys: Vec<[u8; 32]> = entries.iter().map(|e| e.pubkey).collect();
    let index_of = |key: &[u8; 32]| -> Result<u8, SolError> {
        account_keys
            .iter()
            .position(|k| k == key)
            .map(|i| i as u8)
            .ok_or_else(|| SolError::TransactionBuildError("account not in account keys".into()))
    };

    let mut compiled = Vec::with_capacity(instructions.len());
    for ix in instructions {
        compiled.push(CompiledInstruction {
            program_id_index: index_of(&ix.program_id)?,
            account_indices: ix
                .accounts
                .iter()
                .map(|meta| index_of(&meta.pubkey))
                .collect::<Result<_, _>>()?,
            data: ix.data.clone(),
        });
    }

    Ok(SolMessage {
        version: MessageVersion::Legacy,
        header,
        account_keys,
        recent_blockhash: *recent_blockhash,
        instructions: compiled,
        address_table_lookups: Vec::new(),
    })
}

// ---------------------------------------------------------------------------
// Serialization
// ---------------------------------------------------------------------------

impl SolMessage {
    /// Serialize the message: the exact bytes that get signed.
    pub fn serialize(&self) -> Result<Vec<u8>, SolError> {
        let mut buf = Vec::with_capacity(256);

        if self.version == MessageVersion::V0 {
            buf.push(VERSION_PREFIX_MASK);
        }

        buf.push(self.header.num_required_signatures);
        buf.push(self.header.num_readonly_signed);
        buf.push(self.header.num_readonly_unsigned);

        push_compact_len(&mut buf, self.account_keys.len(), "account keys")?;
        for key in &self.account_keys {
            buf.extend_from_slice(key);
        }

        buf.extend_from_slice(&self.recent_blockhash);

        push_compact_len(&mut buf, self.instructions.len(), "instructions")?;
        for ix in &self.instructions {
            buf.push(ix.program_id_index);
            push_compact_len(&mut buf, ix.account_indices.len(), "instruction accounts")?;
            buf.extend_from_slice(&ix.account_indices);
            push_compact_len(&mut buf, ix.data.len(), "instruction data bytes")?;
            buf.extend_from_slice(&ix.data);
        }

        if self.version == MessageVersion::V0 {
            push_compact_len(&mut buf, self.address_table_lookups.len(), "lookups")?;
            for lookup in &self.address_table_lookups {
                buf.extend_from_slice(&lookup.account_key);
                push_compact_len(&mut buf, lookup.writable_indexes.len(), "lookup indexes")?;
                buf.extend_from_slice(&lookup.writable_indexes);
                push_compact_len(&mut buf, lookup.readonly_indexes.len(), "lookup indexes")?;
                buf.extend_from_slice(&lookup.readonly_indexes);
            }
        }

        Ok(buf)
    }

    /// The accounts whose signatures this message requires, in slot order.
    pub fn signer_keys(&self) -> &[[u8; 32]] {
        let n = (self.header.num_required_signatures as usize).min(self.account_keys.len());
        &self.account_keys[..n]
    }
}

/// Bounds-checked cursor over wire bytes.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, len: usize, what: &str) -> Result<&'a [u8], SolError> {
        let end = self.pos.checked_add(len).filter(|end| *end <= self.data.len());
        let end = end.ok_or_else(|| {
            SolError::SerializationError(format!("transaction truncated while reading {what}"))
        })?;
        let out = &self.data[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    fn u8(&mut self, what: &str) -> Result<u8, SolError> {
        Ok(self.take(1, what)?[0])
    }

    fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    fn compact_len(&mut self) -> Result<usize, SolError> {
        let (value, consumed) = decode_compact_u16(&self.data[self.pos..])?;
        self.pos += consumed;
        Ok(value as usize)
    }

    fn array<const N: usize>(&mut self, what: &str) -> Result<[u8; N], SolError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N, what)?);
        Ok(out)
    }

    fn bytes(&mut self, what: &str) -> Result<Vec<u8>, SolError> {
        let len = self.compact_len()?;
        Ok(self.take(len, what)?.to_vec())
    }

    fn is_empty(&self) -> bool {
        self.pos == self.data.len()
    }
}

fn read_message(reader: &mut Reader<'_>) -> Result<SolMessage, SolError> {
    let version = match reader.peek() {
        Some(prefix) if prefix & VERSION_PREFIX_MASK != 0 => {
            reader.u8("version prefix")?;
            match prefix & !VERSION_PREFIX_MASK {
                0 => MessageVersion::V0,
                other => {
                    return Err(SolError::SerializationError(format!(
                        "unsupported message version {other}"
                    )))
                }
            }
        }
        _ => MessageVersion::Legacy,
    };

    let header = MessageHeader {
        num_required_signatures: reader.u8("message header")?,
        num_readonly_signed: reader.u8("message header")?,
        num_readonly_unsigned: reader.u8("message header")?,
    };

    let num_accounts = reader.compact_len()?;
    let mut account_keys = Vec::with_capacity(num_accounts);
    for _ in 0..num_accounts {
        account_keys.push(reader.array::<32>("account keys")?);
    }

    if header.num_required_signatures as usize > account_keys.len() {
        return Err(SolError::SerializationError(format!(
            "{} required signatures but only {} account keys",
            header.num_required_signatures,
            account_keys.len()
        )));
    }

    let recent_blockhash = reader.array::<32>("recent blockhash")?;

    let num_instructions = reader.compact_len()?;
    let mut instructions = Vec::with_capacity(num_instructions);
    for _ in 0..num_instructions {
        instructions.push(CompiledInstruction {
            program_id_index: reader.u8("program id index")?,
            account_indices: reader.bytes("instruction accounts")?,
            data: reader.bytes("instruction data")?,
        });
    }

    let mut address_table_lookups = Vec::new();
    if version == MessageVersion::V0 {
        let num_lookups = reader.compact_len()?;
        for _ in 0..num_lookups {
            address_table_lookups.push(AddressTableLookup {
                account_key: reader.array::<32>("lookup table key")?,
                writable_indexes: reader.bytes("lookup writable indexes")?,
                readonly_indexes: reader.bytes("lookup readonly indexes")?,
            });
        }
    }

    Ok(SolMessage {
        version,
        header,
        account_keys,
        recent_blockhash,
        instructions,
        address_table_lookups,
    })
}

impl SolTransaction {
    /// Wrap a message with one empty signature slot per required signer.
    pub fn new_unsigned(message: SolMessage) -> Self {
        let slots = message.header.num_required_signatures as usize;
        Self {
            signatures: vec![EMPTY_SIGNATURE; slots],
            message,
        }
    }

    /// Parse full transaction wire bytes (legacy or v0).
    pub fn deserialize(bytes: &[u8]) -> Result<Self, SolError> {
        let mut reader = Reader::new(bytes);

        let num_signatures = reader.compact_len()?;
        let mut signatures = Vec::with_capacity(num_signatures);
        for _ in 0..num_signatures {
            signatures.push(reader.array::<64>("signatures")?);
        }

        let message = read_message(&mut reader)?;

        if !reader.is_empty() {
            return Err(SolError::SerializationError(format!(
                "{} trailing bytes after message",
                bytes.len() - reader.pos
            )));
        }

        Ok(Self { signatures, message })
    }

    /// Serialize into the wire format accepted by `sendTransaction`.
    pub fn serialize(&self) -> Result<Vec<u8>, SolError> {
        let message = self.message.serialize()?;
        let mut wire = Vec::with_capacity(3 + 64 * self.signatures.len() + message.len());
        push_compact_len(&mut wire, self.signatures.len(), "signatures")?;
        for signature in &self.signatures {
            wire.extend_from_slice(signature);
        }
        wire.extend_from_slice(&message);
        Ok(wire)
    }

    /// Decode a standard-base64 envelope and parse it.
    pub fn from_base64(encoded: &str) -> Result<Self, SolError> {
        let bytes = B64
            .decode(encoded.trim())
            .map_err(|e| SolError::InvalidEncoding(e.to_string()))?;
        Self::deserialize(&bytes)
    }

    /// Serialize and encode as standard base64.
    pub fn to_base64(&self) -> Result<String, SolError> {
        Ok(B64.encode(self.serialize()?))
    }

    /// Replace the recent blockhash.
    ///
    /// Every existing signature covers the old message, so all slots are
    /// cleared.
    pub fn set_recent_blockhash(&mut self, blockhash: [u8; 32]) {
        if self.message.recent_blockhash != blockhash {
            self.message.recent_blockhash = blockhash;
            self.signatures.iter_mut().for_each(|s| *s = EMPTY_SIGNATURE);
        }
    }

    /// Fill the signature slot belonging to `keypair`, leaving every other
    /// slot untouched. Returns the slot index.
    pub fn sign_partial(&mut self, keypair: &Keypair) -> Result<usize, SolError> {
        let pubkey = keypair.pubkey();
        let slot = self
            .message
            .signer_keys()
            .iter()
            .position(|k| *k == pubkey)
            .ok_or_else(|| {
                SolError::SigningError(format!(
                    "wallet {} is not a required signer of this transaction",
                    keypair.address()
                ))
            })?;

        let message = self.message.serialize()?;
        let required = self.message.header.num_required_signatures as usize;
        if self.signatures.len() != required {
            self.signatures.resize(required, EMPTY_SIGNATURE);
        }
        self.signatures[slot] = keypair.sign_message(&message);
        Ok(slot)
    }

    /// Number of non-empty signature slots.
    pub fn present_signatures(&self) -> usize {
        self.signatures
            .iter()
            .filter(|s| **s != EMPTY_SIGNATURE)
            .count()
    }

    /// Whether every required slot carries a signature.
    pub fn is_fully_signed(&self) -> bool {
        self.signatures.len() == self.message.header.num_required_signatures as usize
            && self.present_signatures() == self.signatures.len()
    }
}
