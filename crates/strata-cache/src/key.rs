//! Cache keys for operation invocations.
//!
//! A key is a blake3 digest of the service, the operation and the ordered
//! argument values. Arguments are reduced to their raw JSON form first, so
//! two instances holding equal values key together regardless of where they
//! were produced. Each segment is hashed with its length in front, so no
//! choice of names can make two different requests share a key.

use std::fmt;
use strata_core::InvocationRequest;

/// Digest identifying a logically unique invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey(blake3::Hash);

impl CacheKey {
    /// Key for a request.
    pub fn for_request(request: &InvocationRequest) -> Self {
        let mut hasher = blake3::Hasher::new();
        let mut segment = |bytes: &[u8]| {
            hasher.update(&(bytes.len() as u64).to_le_bytes());
            hasher.update(bytes);
        };
        segment(request.service.as_str().as_bytes());
        segment(request.operation.name.as_bytes());
        for arg in &request.parameters {
            segment(arg.parameter.type_name.as_str().as_bytes());
            segment(arg.value.to_raw().to_string().as_bytes());
        }
        Self(hasher.finalize())
    }

    /// Readable form of a request for logs:
    /// `service:operation:param=value:param=value`.
    ///
    /// Not injective; the key itself never depends on it.
    pub fn describe(request: &InvocationRequest) -> String {
        let mut out = format!("{}:{}", request.service, request.operation.name);
        for arg in &request.parameters {
            out.push(':');
            out.push_str(arg.parameter.type_name.as_str());
            out.push('=');
            out.push_str(&arg.value.to_raw().to_string());
        }
        out
    }

    /// Hex form of the digest.
    pub fn to_hex(&self) -> String {
        self.0.to_hex().to_string()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_hex())
    }
}
