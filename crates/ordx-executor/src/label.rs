//! Compact venue label codec.
//!
//! Format: `s4:{sid8}:{gid12}:{leg_idx}:{ih16}`, hard bound 64 chars.
//! The label is the only recovery breadcrumb the venue echoes back, so it
//! carries fixed-width fragments of the strategy id, group id and intent
//! hash. Fragments are shortened by stripping `-` and truncating; the
//! composed label itself is never truncated. If it does not fit, the
//! intent is rejected before anything is recorded or sent.

use ordx_core::RejectReason;

use crate::error::{ExecutorError, ExecutorResult};

pub const LABEL_PREFIX: &str = "s4";
pub const LABEL_MAX_LEN: usize = 64;
const SID_FRAG_LEN: usize = 8;
const GID_FRAG_LEN: usize = 12;

/// Decoded label fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelParts {
    pub sid8: String,
    pub gid12: String,
    pub leg_idx: u32,
    pub ih16: String,
}

/// Fixed-width fragment of an id: `-` stripped, then truncated.
#[must_use]
pub fn id_fragment(id: &str, max_len: usize) -> String {
    id.chars().filter(|c| *c != '-').take(max_len).collect()
}

/// Encode a label from full ids and the intent hash.
pub fn encode_label(
    strategy_id: &str,
    group_id: &str,
    leg_idx: u32,
    intent_hash: u64,
) -> Result<String, RejectReason> {
    encode_label_fragments(
        &id_fragment(strategy_id, SID_FRAG_LEN),
        &id_fragment(group_id, GID_FRAG_LEN),
        leg_idx,
        &format!("{intent_hash:016x}"),
    )
}

/// Compose a label from pre-shortened fragments. Rejects rather than
/// truncates when the result exceeds the venue bound.
pub fn encode_label_fragments(
    sid_frag: &str,
    gid_frag: &str,
    leg_idx: u32,
    hash_frag: &str,
) -> Result<String, RejectReason> {
    let label = format!("{LABEL_PREFIX}:{sid_frag}:{gid_frag}:{leg_idx}:{hash_frag}");
    if label.len() > LABEL_MAX_LEN {
        return Err(RejectReason::LabelTooLong);
    }
    Ok(label)
}

/// Decode a label observed on a venue order.
pub fn decode_label(label: &str) -> ExecutorResult<LabelParts> {
    let mut parts = label.split(':');
    let prefix = parts
        .next()
        .ok_or_else(|| ExecutorError::LabelDecode("empty label".to_string()))?;
    if prefix != LABEL_PREFIX {
        return Err(ExecutorError::LabelDecode(format!(
            "unexpected prefix: {prefix}"
        )));
    }
    let sid8 = parts
        .next()
        .ok_or_else(|| ExecutorError::LabelDecode("missing strategy fragment".to_string()))?;
    let gid12 = parts
        .next()
        .ok_or_else(|| ExecutorError::LabelDecode("missing group fragment".to_string()))?;
    let leg_idx: u32 = parts
        .next()
        .ok_or_else(|| ExecutorError::LabelDecode("missing leg index".to_string()))?
        .parse()
        .map_err(|_| ExecutorError::LabelDecode("invalid leg index".to_string()))?;
    let ih16 = parts
        .next()
        .ok_or_else(|| ExecutorError::LabelDecode("missing hash fragment".to_string()))?;
    if parts.next().is_some() {
        return Err(ExecutorError::LabelDecode("too many segments".to_string()));
    }

    Ok(LabelParts {
        sid8: sid8.to_string(),
        gid12: gid12.to_string(),
        leg_idx,
        ih16: ih16.to_string(),
    })
}
