//! Built-in native contracts
//!
//! - [`TextFilter`]: the baseline content-filtering middleware. Rejects any
//!   call whose argument keys or values contain a registered word.
//! - [`Crud`]: a plain key/value contract, handy as a governance
//!   invocation target.

use crate::contract::native::{CallContext, NativeContract, INITIALIZE_METHOD, VERSION_METHOD};
use crate::contract::vm::VmError;
use crate::core::ContractResponse;
use std::collections::BTreeMap;

/// Name the text filter is deployed and registered under
pub const TEXT_FILTER: &str = "text_filter";

/// Method every middleware contract exposes
pub const MIDDLEWARE_METHOD: &str = "middleware";

const WORD_PREFIX: &[u8] = b"textfilter_";

/// Sensitive-word filter
#[derive(Debug, Default, Clone, Copy)]
pub struct TextFilter;

impl TextFilter {
    fn words(ctx: &mut CallContext<'_>) -> Result<Vec<String>, VmError> {
        Ok(ctx
            .scan_prefix(WORD_PREFIX)?
            .into_iter()
            .map(|(_, value)| String::from_utf8_lossy(&value).into_owned())
            .collect())
    }

    fn middleware(ctx: &mut CallContext<'_>) -> Result<ContractResponse, VmError> {
        let words = match Self::words(ctx) {
            Ok(words) => words,
            // Word list unreadable: admit the call
            Err(VmError::Storage(_)) => return Ok(ContractResponse::ok(Vec::<u8>::new())),
            Err(err) => return Err(err),
        };

        for (key, value) in ctx.args() {
            let value = String::from_utf8_lossy(value);
            if let Some(word) = words
                .iter()
                .find(|word| key.contains(word.as_str()) || value.contains(word.as_str()))
            {
                return Ok(ContractResponse::error(format!(
                    "text_filter is not pass, the param contain: {}",
                    word
                )));
            }
        }
        Ok(ContractResponse::ok(Vec::<u8>::new()))
    }

    fn put(ctx: &mut CallContext<'_>) -> Result<ContractResponse, VmError> {
        let text = match ctx.arg("text") {
            Some(text) if !text.is_empty() => text.to_vec(),
            _ => return Ok(ContractResponse::error("missing text")),
        };

        let mut key = WORD_PREFIX.to_vec();
        key.extend_from_slice(&text);
        if ctx.get_object(&key)?.is_some() {
            return Ok(ContractResponse::error("the text already exists"));
        }
        ctx.put_object(&key, &text)?;
        Ok(ContractResponse::ok(Vec::<u8>::new()))
    }

    fn get(ctx: &mut CallContext<'_>) -> Result<ContractResponse, VmError> {
        let words = Self::words(ctx)?;
        let body = serde_json::to_vec(&words).map_err(|e| VmError::Storage(e.to_string()))?;
        Ok(ContractResponse::ok(body))
    }
}

impl NativeContract for TextFilter {
    fn call(&self, method: &str, ctx: &mut CallContext<'_>) -> Result<ContractResponse, VmError> {
        match method {
            INITIALIZE_METHOD => Ok(ContractResponse::ok(Vec::<u8>::new())),
            VERSION_METHOD => Ok(ContractResponse::ok("1.0")),
            MIDDLEWARE_METHOD => Self::middleware(ctx),
            "put" => Self::put(ctx),
            "get" => Self::get(ctx),
            other => Err(ctx.method_not_found(other)),
        }
    }
}

/// Key/value contract
#[derive(Debug, Default, Clone, Copy)]
pub struct Crud;

impl Crud {
    fn required<'c>(ctx: &'c CallContext<'_>, name: &str) -> Option<&'c [u8]> {
        ctx.arg(name)
    }

    fn put(ctx: &mut CallContext<'_>) -> Result<ContractResponse, VmError> {
        let Some(key) = Self::required(ctx, "key").map(<[u8]>::to_vec) else {
            return Ok(ContractResponse::error("missing key"));
        };
        let Some(value) = Self::required(ctx, "value").map(<[u8]>::to_vec) else {
            return Ok(ContractResponse::error("missing value"));
        };
        ctx.put_object(&key, &value)?;
        Ok(ContractResponse::ok("success"))
    }

    fn get(ctx: &mut CallContext<'_>) -> Result<ContractResponse, VmError> {
        let Some(key) = Self::required(ctx, "key").map(<[u8]>::to_vec) else {
            return Ok(ContractResponse::error("missing key"));
        };
        match ctx.get_object(&key)? {
            Some(value) => Ok(ContractResponse::ok(value)),
            None => Ok(ContractResponse::error("Key not found")),
        }
    }

    fn get_by_prefix(ctx: &mut CallContext<'_>) -> Result<ContractResponse, VmError> {
        let Some(prefix) = Self::required(ctx, "key").map(<[u8]>::to_vec) else {
            return Ok(ContractResponse::error("missing key"));
        };
        let entries = ctx.scan_prefix(&prefix)?;
        if entries.is_empty() {
            return Ok(ContractResponse::error("Key not found"));
        }

        let values: BTreeMap<String, String> = entries
            .into_iter()
            .map(|(k, v)| {
                (
                    String::from_utf8_lossy(&k).into_owned(),
                    String::from_utf8_lossy(&v).into_owned(),
                )
            })
            .collect();
        let body = serde_json::to_vec(&values).map_err(|e| VmError::Storage(e.to_string()))?;
        Ok(ContractResponse::ok(body))
    }
}

impl NativeContract for Crud {
    fn call(&self, method: &str, ctx: &mut CallContext<'_>) -> Result<ContractResponse, VmError> {
        match method {
            INITIALIZE_METHOD => Ok(ContractResponse::ok("initialize success")),
            VERSION_METHOD => Ok(ContractResponse::ok("1.0")),
            "put" => Self::put(ctx),
            "get" => Self::get(ctx),
            "get_by_prefix" => Self::get_by_prefix(ctx),
            other => Err(ctx.method_not_found(other)),
        }
    }
}
