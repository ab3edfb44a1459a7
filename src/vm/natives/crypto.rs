//! `Crypto.*` natives. Digests are returned as lowercase hex.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256};

use crate::vm::value::Value;

use super::{string_arg, Arity, NativeRegistry};

pub fn register(registry: &mut NativeRegistry) {
    registry.register("Crypto.sha256", Arity::Exact(1), |_, args| {
        Ok(Value::String(digest::<Sha256>(string_arg(args, 0)?)))
    });

    registry.register("Crypto.sha1", Arity::Exact(1), |_, args| {
        Ok(Value::String(digest::<Sha1>(string_arg(args, 0)?)))
    });

    registry.register("Crypto.md5", Arity::Exact(1), |_, args| {
        Ok(Value::String(digest::<Md5>(string_arg(args, 0)?)))
    });

    // Crypto.hmac_sha256(message, key)
    registry.register("Crypto.hmac_sha256", Arity::Exact(2), |_, args| {
        hmac_sha256(string_arg(args, 0)?, string_arg(args, 1)?).map(Value::String)
    });

    registry.register("Crypto.base64_encode", Arity::Exact(1), |_, args| {
        Ok(Value::String(BASE64.encode(string_arg(args, 0)?)))
    });

    registry.register("Crypto.base64_decode", Arity::Exact(1), |_, args| {
        let bytes = BASE64
            .decode(string_arg(args, 0)?)
            .map_err(|e| format!("invalid base64: {}", e))?;
        String::from_utf8(bytes)
            .map(Value::String)
            .map_err(|_| "decoded data is not valid UTF-8".to_string())
    });
}

/// Lowercase hex encoding.
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn digest<D: Digest>(data: &str) -> String {
    let mut hasher = D::new();
    hasher.update(data.as_bytes());
    bytes_to_hex(&hasher.finalize())
}

fn hmac_sha256(message: &str, key: &str) -> Result<String, String> {
    type HmacSha256 = Hmac<Sha256>;
    let mut mac =
        HmacSha256::new_from_slice(key.as_bytes()).map_err(|e| format!("HMAC error: {}", e))?;
    mac.update(message.as_bytes());
    Ok(bytes_to_hex(&mac.finalize().into_bytes()))
}
