use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

/// Content digest algorithm recorded in the manifest. Sha1 is the historical
/// default; manifests that predate the `algorithm` field mean sha1.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DigestKind {
    #[default]
    Sha1,
    Blake3,
}

/// True iff every byte is zero. An empty buffer counts as zero.
pub fn is_zero(bytes: &[u8]) -> bool {
    bytes.iter().all(|&b| b == 0)
}

/// Lowercase hex digest of `bytes` under `kind`. The result is used as the
/// blob store key, so it must be a pure function of the input.
pub fn digest_hex(kind: DigestKind, bytes: &[u8]) -> String {
    match kind {
        DigestKind::Sha1 => {
            let mut h = Sha1::new();
            h.update(bytes);
            hex(&h.finalize())
        }
        DigestKind::Blake3 => blake3::hash(bytes).to_hex().to_string(),
    }
}

fn hex(bytes: &[u8]) -> String {
    const LUT: &[u8; 16] = b"0123456789abcdef";
    let mut s = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        s.push(LUT[(b >> 4) as usize] as char);
        s.push(LUT[(b & 0xF) as usize] as char);
    }
    s
}
