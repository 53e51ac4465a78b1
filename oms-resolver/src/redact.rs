//! Credential redaction for driver error messages.

use regex_lite::Regex;
use std::sync::LazyLock;

/// `password=...`, `token: ...` and similar pairs.
static KEY_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b(password|passwd|pwd|token|secret|api[_-]?key|access[_-]?key)(\s*[=:]\s*)[^\s;&'",]+"#)
        .unwrap()
});

/// `scheme://user:pass@`
static URL_USERINFO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b([a-z][a-z0-9+.\-]*://)[^/\s@]+@").unwrap());

/// Masks credentials in `message`: `password=...` style pairs and the
/// user-info part of URLs.
pub fn redact_credentials(message: &str) -> String {
    let out = URL_USERINFO.replace_all(message, "${1}***@");
    KEY_VALUE.replace_all(&out, "${1}${2}***").into_owned()
}
