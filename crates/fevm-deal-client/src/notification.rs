//! Deal status notifications sent by the market actor.
//!
//! Encoded as a text-keyed map:
//! `{"pieceCid": bytes, "dealId": uint | null, "status": uint, "provider": bytes | null}`.
//! Deal ids may arrive in bignum form as long as they fit 64 bits.

use crate::error::{DealClientError, Result};
use crate::types::{DealStatus, PieceCid, ProviderAddress};
use fevm_cbor::{DecodeOptions, Value};

const KEY_PIECE_CID: &str = "pieceCid";
const KEY_DEAL_ID: &str = "dealId";
const KEY_STATUS: &str = "status";
const KEY_PROVIDER: &str = "provider";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DealNotification {
    pub piece_cid: PieceCid,
    pub deal_id: Option<u64>,
    pub status: DealStatus,
    pub provider: Option<ProviderAddress>,
}

impl DealNotification {
    pub fn to_value(&self) -> Value {
        Value::map([
            (KEY_PIECE_CID, Value::Bytes(self.piece_cid.as_bytes().to_vec())),
            (KEY_DEAL_ID, Value::from(self.deal_id)),
            (KEY_STATUS, Value::from(self.status.code())),
            (
                KEY_PROVIDER,
                self.provider
                    .as_ref()
                    .map(|p| Value::Bytes(p.as_bytes().to_vec()))
                    .unwrap_or(Value::Null),
            ),
        ])
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        value.as_map()?;

        let piece_cid = PieceCid::new(required(value, KEY_PIECE_CID)?.as_bytes()?.to_vec())?;

        let deal_id = match value.get(KEY_DEAL_ID) {
            Some(v) if !v.is_absent() => Some(v.as_u64().map_err(|_| {
                DealClientError::InvalidEncoding(format!(
                    "deal id must be a 64-bit unsigned integer, got {}",
                    v.type_name()
                ))
            })?),
            _ => None,
        };

        let code = required(value, KEY_STATUS)?.as_u64()?;
        let status = DealStatus::from_code(code).ok_or_else(|| {
            DealClientError::InvalidEncoding(format!("unknown deal status code {code}"))
        })?;

        let provider = match value.get(KEY_PROVIDER) {
            Some(v) if !v.is_absent() => Some(ProviderAddress::new(v.as_bytes()?.to_vec())),
            _ => None,
        };

        Ok(Self {
            piece_cid,
            deal_id,
            status,
            provider,
        })
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(fevm_cbor::encode(&self.to_value())?)
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        Self::decode_with(data, DecodeOptions::default())
    }

    pub fn decode_with(data: &[u8], options: DecodeOptions) -> Result<Self> {
        Self::from_value(&fevm_cbor::decode_with(data, options)?)
    }
}

fn required<'a>(value: &'a Value, key: &str) -> Result<&'a Value> {
    value
        .get(key)
        .ok_or_else(|| DealClientError::InvalidEncoding(format!("missing field {key:?}")))
}
