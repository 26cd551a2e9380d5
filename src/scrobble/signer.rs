use md5::{Digest, Md5};
use std::collections::BTreeMap;

/// Parameters the service leaves out of the signed string.
const UNSIGNED_PARAMS: [&str; 2] = ["format", "callback"];

/// Build the `api_sig` value for a request.
///
/// Keys are concatenated with their values in lexicographic key order, the
/// shared secret is appended, and the MD5 of the UTF-8 bytes is returned as
/// lowercase hex.
pub fn sign_params(params: &BTreeMap<String, String>, shared_secret: &str) -> String {
    let mut payload = String::new();
    for (key, value) in params {
        if UNSIGNED_PARAMS.contains(&key.as_str()) {
            continue;
        }
        payload.push_str(key);
        payload.push_str(value);
    }
    payload.push_str(shared_secret);

    let mut hasher = Md5::new();
    hasher.update(payload.as_bytes());
    format!("{:x}", hasher.finalize())
}
