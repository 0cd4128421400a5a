//! Wire schema for deal proposals
//!
//! A proposal travels as an 11-element CBOR array in field order:
//!
//! ```text
//! [piece_cid, piece_size, verified_deal, label, start_epoch, end_epoch,
//!  storage_price_per_epoch, provider_collateral, client_collateral,
//!  extra_params_version, [location_ref, car_size, skip_ipni_announce,
//!  remove_unsealed_copy]]
//! ```
//!
//! Token amounts use the bignum form once they exceed 64 bits. Only
//! `extra_params_version == 1` is understood, in both directions.

use crate::error::{DealClientError, Result};
use crate::types::{DealProposal, ExtraParamsV1, PieceCid, ProposalId};
use fevm_cbor::{DecodeOptions, Value};
use fevm_economics::TokenAmount;

pub const EXTRA_PARAMS_VERSION_V1: u64 = 1;

const PROPOSAL_FIELDS: usize = 11;
const EXTRA_PARAMS_FIELDS: usize = 4;

impl ExtraParamsV1 {
    pub fn to_value(&self) -> Value {
        Value::Array(vec![
            Value::from(self.location_ref.as_str()),
            Value::from(self.car_size),
            Value::Bool(self.skip_ipni_announce),
            Value::Bool(self.remove_unsealed_copy),
        ])
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        let fields = fixed_array(value, EXTRA_PARAMS_FIELDS, "extra params")?;
        Ok(Self {
            location_ref: fields[0].as_str()?.to_string(),
            car_size: fields[1].as_u64()?,
            skip_ipni_announce: fields[2].as_bool()?,
            remove_unsealed_copy: fields[3].as_bool()?,
        })
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(fevm_cbor::encode(&self.to_value())?)
    }
}

impl DealProposal {
    pub fn to_value(&self) -> Result<Value> {
        check_version(self.extra_params_version)?;

        Ok(Value::Array(vec![
            Value::Bytes(self.piece_cid.as_bytes().to_vec()),
            Value::from(self.piece_size),
            Value::Bool(self.verified_deal),
            Value::from(self.label.as_str()),
            Value::from(self.start_epoch),
            Value::from(self.end_epoch),
            amount_value(&self.storage_price_per_epoch),
            amount_value(&self.provider_collateral),
            amount_value(&self.client_collateral),
            Value::from(self.extra_params_version),
            self.extra_params.to_value(),
        ]))
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        let fields = fixed_array(value, PROPOSAL_FIELDS, "proposal")?;

        let extra_params_version = fields[9].as_u64()?;
        check_version(extra_params_version).map_err(|e| match e {
            DealClientError::InvalidProposal(reason) => DealClientError::InvalidEncoding(reason),
            other => other,
        })?;

        Ok(Self {
            piece_cid: PieceCid::new(fields[0].as_bytes()?.to_vec())?,
            piece_size: fields[1].as_u64()?,
            verified_deal: fields[2].as_bool()?,
            label: fields[3].as_str()?.to_string(),
            start_epoch: fields[4].as_i64()?,
            end_epoch: fields[5].as_i64()?,
            storage_price_per_epoch: amount_from_value(&fields[6])?,
            provider_collateral: amount_from_value(&fields[7])?,
            client_collateral: amount_from_value(&fields[8])?,
            extra_params_version,
            extra_params: ExtraParamsV1::from_value(&fields[10])?,
        })
    }

    /// Canonical encoding; identical terms always give identical bytes.
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(fevm_cbor::encode(&self.to_value()?)?)
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        Self::decode_with(data, DecodeOptions::default())
    }

    pub fn decode_with(data: &[u8], options: DecodeOptions) -> Result<Self> {
        Self::from_value(&fevm_cbor::decode_with(data, options)?)
    }

    pub fn proposal_id(&self) -> Result<ProposalId> {
        Ok(ProposalId::from_encoding(&self.encode()?))
    }
}

fn check_version(version: u64) -> Result<()> {
    if version != EXTRA_PARAMS_VERSION_V1 {
        return Err(DealClientError::InvalidProposal(format!(
            "unsupported extra params version {version}"
        )));
    }
    Ok(())
}

fn fixed_array<'a>(value: &'a Value, len: usize, what: &str) -> Result<&'a [Value]> {
    let fields = value.as_array()?;
    if fields.len() != len {
        return Err(DealClientError::InvalidEncoding(format!(
            "{what} must have {len} fields, got {}",
            fields.len()
        )));
    }
    Ok(fields)
}

fn amount_value(amount: &TokenAmount) -> Value {
    Value::from_biguint(amount.as_biguint().clone())
}

fn amount_from_value(value: &Value) -> Result<TokenAmount> {
    TokenAmount::try_from_biguint(value.as_biguint()?)
        .map_err(|e| DealClientError::InvalidEncoding(e.to_string()))
}
