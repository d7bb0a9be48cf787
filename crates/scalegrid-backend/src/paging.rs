//! Opaque continuation tokens.
//!
//! A token is the hex encoding of the last name returned; the next page
//! starts strictly after it in store order.

use scalegrid_core::{Fault, FaultResult};
use scalegrid_state::{ListQuery, StoredPage};

use crate::backend::Page;

pub fn encode_token(last_name: &str) -> String {
    hex::encode(last_name)
}

pub fn decode_token(token: &str) -> FaultResult<String> {
    hex::decode(token)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .ok_or_else(|| Fault::invalid(format!("NextToken '{token}' is not valid")))
}

/// Build a store query from the API-level listing arguments.
pub fn list_query(
    names: &[String],
    max: Option<u32>,
    start_token: Option<&str>,
) -> FaultResult<ListQuery> {
    if max == Some(0) {
        return Err(Fault::invalid("MaxRecords must be at least 1"));
    }
    Ok(ListQuery {
        names: (!names.is_empty()).then(|| names.iter().cloned().collect()),
        start_after: start_token.map(decode_token).transpose()?,
        limit: max.map(|m| m as usize),
    })
}

/// Attach a continuation token when the store reports more records.
pub fn into_page<T>(stored: StoredPage<T>, name_of: impl Fn(&T) -> &str) -> Page<T> {
    let next_token = if stored.more {
        stored.items.last().map(|item| encode_token(name_of(item)))
    } else {
        None
    };
    Page {
        items: stored.items,
        next_token,
    }
}
