//! Short, DNS-friendly names derived from arbitrary identifiers.

/// Lowercase letters without `l`, plus `-`.
const ALPHABET: &[u8; 26] = b"abcdefghijkmnopqrstuvwxyz-";

/// Number of digest bytes that feed the token.
const DIGEST_PREFIX: usize = 10;

/// Encode `id` as a base-26 token of its MD5 digest prefix.
///
/// The token is stable for a given input. An empty identifier yields an
/// empty token.
pub fn encode_name(id: &str) -> String {
    if id.is_empty() {
        return String::new();
    }

    let digest = md5::compute(id.as_bytes());
    base26_encode(&digest.0[..DIGEST_PREFIX])
}

/// Big-endian bytes to base-26, least significant digit first.
fn base26_encode(input: &[u8]) -> String {
    debug_assert!(input.len() <= 16);

    let mut x = input
        .iter()
        .fold(0u128, |acc, &b| (acc << 8) | u128::from(b));
    let base = ALPHABET.len() as u128;

    let mut out = String::new();
    while x != 0 {
        out.push(ALPHABET[(x % base) as usize] as char);
        x /= base;
    }
    out
}
