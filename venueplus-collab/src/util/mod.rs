mod id;

pub use id::*;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::{rngs::OsRng, Rng, RngCore};

const UID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Length of an actor uid.
pub const UID_LENGTH: usize = 15;
/// Length of a tenant access key.
pub const ACCESS_KEY_LENGTH: usize = 24;

/// A bearer token: 32 random bytes, base64 encoded.
pub fn new_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);

    BASE64.encode(bytes)
}

/// An uppercase alphanumeric identifier of the given length.
pub fn new_uid(length: usize) -> String {
    let mut rng = OsRng;

    std::iter::repeat(())
        .map(|_| UID_ALPHABET[rng.gen_range(0..UID_ALPHABET.len())] as char)
        .take(length)
        .collect()
}

/// Brings a twitch link or bare channel name into the `https://twitch.tv/<channel>` form.
/// Blank input stays untouched.
pub fn normalize_twitch_link(link: &str) -> String {
    let mut link = link.trim().to_string();

    if link.is_empty() {
        return link;
    }

    if starts_with_ignore_case(&link, "http://") {
        link = format!("https://{}", &link["http://".len()..]);
    }

    let lower = link.to_lowercase();

    if lower.starts_with("https://www.twitch.tv/") {
        link = format!("https://twitch.tv/{}", &link["https://www.twitch.tv/".len()..]);
    } else if lower.starts_with("www.twitch.tv/") {
        link = format!("https://twitch.tv/{}", &link["www.twitch.tv/".len()..]);
    } else if lower.starts_with("twitch.tv/") {
        link = format!("https://{}", link);
    } else if !lower.contains("twitch.tv") {
        let channel = link
            .trim_start_matches('@')
            .trim_matches('/')
            .to_lowercase();

        if !channel.is_empty() {
            link = format!("https://twitch.tv/{}", channel);
        }
    }

    if let Some(stripped) = link.strip_suffix('/') {
        link = stripped.to_string();
    }

    link
}

fn starts_with_ignore_case(value: &str, prefix: &str) -> bool {
    value
        .get(..prefix.len())
        .map(|head| head.eq_ignore_ascii_case(prefix))
        .unwrap_or(false)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_uid_shape() {
        let uid = new_uid(UID_LENGTH);

        assert_eq!(uid.len(), UID_LENGTH);
        assert!(uid
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_token_is_base64_of_32_bytes() {
        let token = new_token();
        let decoded = BASE64.decode(&token).unwrap();

        assert_eq!(decoded.len(), 32);
        assert_ne!(token, new_token());
    }

    #[test]
    fn test_twitch_normalization() {
        assert_eq!(
            normalize_twitch_link("http://www.twitch.tv/SomeDj/"),
            "https://twitch.tv/SomeDj"
        );
        assert_eq!(
            normalize_twitch_link("  www.twitch.tv/somedj "),
            "https://twitch.tv/somedj"
        );
        assert_eq!(
            normalize_twitch_link("twitch.tv/somedj"),
            "https://twitch.tv/somedj"
        );
        assert_eq!(normalize_twitch_link("@SomeDj"), "https://twitch.tv/somedj");
        assert_eq!(normalize_twitch_link("/SomeDj/"), "https://twitch.tv/somedj");
        assert_eq!(
            normalize_twitch_link("https://twitch.tv/somedj"),
            "https://twitch.tv/somedj"
        );
        assert_eq!(normalize_twitch_link("   "), "");
    }
}
