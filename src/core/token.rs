use rand::Rng;

const ALPHABETIC: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const ALPHANUMERIC: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Length of correlation tokens minted for outbound calls. 16 characters of
/// the 36-symbol alphabet make client-side collisions a non-concern.
pub const CORRELATION_TOKEN_LEN: usize = 16;

/// Generate a random identifier of `len` characters.
///
/// The first character is always alphabetic so the result is usable wherever
/// a plain identifier is expected.
pub fn mint_token(len: usize) -> String {
    debug_assert!(len > 0, "token length must be positive");

    let mut rng = rand::thread_rng();
    let mut out = String::with_capacity(len);
    out.push(ALPHABETIC[rng.gen_range(0..ALPHABETIC.len())] as char);
    for _ in 1..len {
        out.push(ALPHANUMERIC[rng.gen_range(0..ALPHANUMERIC.len())] as char);
    }
    out
}

/// Mint a fresh correlation token for one outbound call.
pub fn correlation_token() -> String {
    mint_token(CORRELATION_TOKEN_LEN)
}
