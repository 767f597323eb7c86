//! Transaction building from intents
//!
//! Build Algorand asset transactions from high-level intent descriptions.
//! Construction is pure; suggested params are supplied by the caller.

pub mod types;

use crate::address::decode_address;
use crate::amount::{atomic_to_u64, convert_to_atomic_unit, StandardAmount, MAX_DECIMALS};
use crate::error::WasmAlgoError;
use crate::transaction::{TransactionHeader, TransactionKind, UnsignedTransaction};
use crate::types::{AssetParams, SuggestedParams};
use tracing::debug;
use types::{BuildContext, TransactionIntent};

/// Maximum note size in bytes
pub const MAX_NOTE_LENGTH: usize = 1024;

/// Maximum distance between first and last valid rounds
pub const MAX_TXN_LIFE: u64 = 1000;

/// Build a transaction from an intent
///
/// # Arguments
/// * `intent` - High-level description of the transaction
/// * `context` - Sender, network, note and suggested params
pub fn build_transaction(
    intent: TransactionIntent,
    context: BuildContext,
) -> Result<UnsignedTransaction, WasmAlgoError> {
    let sender = parse_address(&context.sender, "sender")?;
    let kind = build_kind(&intent, &sender)?;
    let header = build_header(sender, &context)?;

    let mut tx = UnsignedTransaction { header, kind };
    tx.header.fee = compute_fee(&tx, &context.suggested_params)?;

    debug!(
        tx_type = %tx.tx_type(),
        network = %context.network.name,
        fee = tx.header.fee,
        "Built transaction"
    );

    Ok(tx)
}

/// Build the type-specific fields for an intent
fn build_kind(
    intent: &TransactionIntent,
    sender: &[u8; 32],
) -> Result<TransactionKind, WasmAlgoError> {
    match intent {
        TransactionIntent::AssetConfig {
            asset_id,
            manager,
            reserve,
            freeze,
            clawback,
        } => Ok(TransactionKind::AssetConfig {
            asset_id: require_asset_id(*asset_id)?,
            params: AssetParams {
                manager: Some(address_or_sender(manager, sender, "manager")?),
                reserve: Some(address_or_sender(reserve, sender, "reserve")?),
                freeze: Some(address_or_sender(freeze, sender, "freeze")?),
                clawback: Some(address_or_sender(clawback, sender, "clawback")?),
                ..Default::default()
            },
        }),
        TransactionIntent::AssetCreate {
            total,
            decimals,
            default_frozen,
            unit_name,
            asset_name,
            url,
        } => {
            if *decimals > MAX_DECIMALS {
                return Err(WasmAlgoError::Validation(format!(
                    "decimals must be at most {}, got {}",
                    MAX_DECIMALS, decimals
                )));
            }
            Ok(TransactionKind::AssetCreate {
                params: AssetParams {
                    total: *total,
                    decimals: *decimals,
                    default_frozen: *default_frozen,
                    unit_name: unit_name.clone(),
                    asset_name: asset_name.clone(),
                    url: url.clone(),
                    metadata_hash: None,
                    manager: Some(*sender),
                    reserve: Some(*sender),
                    freeze: Some(*sender),
                    clawback: Some(*sender),
                },
            })
        }
        TransactionIntent::AssetDestroy { asset_id } => Ok(TransactionKind::AssetDestroy {
            asset_id: require_asset_id(*asset_id)?,
        }),
        TransactionIntent::AssetFreeze {
            asset_id,
            freeze_target,
        } => build_freeze(*asset_id, freeze_target, sender, true),
        TransactionIntent::AssetUnfreeze {
            asset_id,
            freeze_target,
        } => build_freeze(*asset_id, freeze_target, sender, false),
        TransactionIntent::AssetTransfer {
            asset_id,
            amount,
            decimals,
            to,
        } => {
            let asset_id = require_asset_id(*asset_id)?;
            let standard: StandardAmount = amount
                .parse()
                .map_err(|e: WasmAlgoError| WasmAlgoError::Validation(e.to_string()))?;
            let atomic = convert_to_atomic_unit(&standard, *decimals)
                .and_then(|a| atomic_to_u64(&a))
                .map_err(|e| WasmAlgoError::Validation(e.to_string()))?;

            Ok(TransactionKind::AssetTransfer {
                asset_id,
                amount: atomic,
                receiver: address_or_sender(to, sender, "to")?,
                close_to: None,
            })
        }
    }
}

fn build_freeze(
    asset_id: Option<u64>,
    freeze_target: &Option<String>,
    sender: &[u8; 32],
    freezing: bool,
) -> Result<TransactionKind, WasmAlgoError> {
    Ok(TransactionKind::AssetFreeze {
        asset_id: require_asset_id(asset_id)?,
        freeze_target: address_or_sender(freeze_target, sender, "freezeTarget")?,
        freezing,
    })
}

fn build_header(
    sender: [u8; 32],
    context: &BuildContext,
) -> Result<TransactionHeader, WasmAlgoError> {
    let params = &context.suggested_params;
    if params.last_valid < params.first_valid {
        return Err(WasmAlgoError::Validation(format!(
            "lastValid {} is before firstValid {}",
            params.last_valid, params.first_valid
        )));
    }
    if params.last_valid - params.first_valid > MAX_TXN_LIFE {
        return Err(WasmAlgoError::Validation(format!(
            "validity window exceeds {} rounds",
            MAX_TXN_LIFE
        )));
    }

    let note = context
        .note
        .as_ref()
        .filter(|n| !n.is_empty())
        .map(|n| n.as_bytes().to_vec());
    if let Some(note) = &note {
        if note.len() > MAX_NOTE_LENGTH {
            return Err(WasmAlgoError::Validation(format!(
                "note is {} bytes, maximum is {}",
                note.len(),
                MAX_NOTE_LENGTH
            )));
        }
    }

    let genesis_hash = context
        .network
        .genesis_hash_bytes()
        .map_err(|e| WasmAlgoError::Validation(e.to_string()))?;

    Ok(TransactionHeader {
        sender,
        fee: params.fee,
        first_valid: params.first_valid,
        last_valid: params.last_valid,
        genesis_id: context.network.genesis_id.clone(),
        genesis_hash,
        note,
        group: None,
        lease: None,
        rekey_to: None,
    })
}

/// Flat fee, or fee-per-byte times the signed size, floored at the minimum fee
fn compute_fee(tx: &UnsignedTransaction, params: &SuggestedParams) -> Result<u64, WasmAlgoError> {
    if params.flat_fee {
        return Ok(params.fee);
    }
    let size = tx.estimate_size()? as u64;
    let fee = params
        .fee
        .checked_mul(size)
        .ok_or_else(|| WasmAlgoError::Validation("fee overflows uint64".to_string()))?;
    Ok(fee.max(params.min_fee))
}

fn require_asset_id(asset_id: Option<u64>) -> Result<u64, WasmAlgoError> {
    match asset_id {
        Some(id) if id > 0 => Ok(id),
        Some(_) => Err(WasmAlgoError::Validation(
            "assetId must be greater than zero".to_string(),
        )),
        None => Err(WasmAlgoError::Validation("assetId is required".to_string())),
    }
}

fn parse_address(address: &str, field: &str) -> Result<[u8; 32], WasmAlgoError> {
    decode_address(address).map_err(|e| WasmAlgoError::Validation(format!("{}: {}", field, e)))
}

fn address_or_sender(
    address: &Option<String>,
    sender: &[u8; 32],
    field: &str,
) -> Result<[u8; 32], WasmAlgoError> {
    match address {
        Some(a) if !a.is_empty() => parse_address(a, field),
        _ => Ok(*sender),
    }
}
