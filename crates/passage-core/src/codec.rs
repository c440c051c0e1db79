//! base64url codec for WebAuthn binary fields.
//!
//! Challenges, user handles and credential ids cross the wire as unpadded
//! base64url text and cross the platform boundary as raw bytes.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};

use crate::error::{Error, InvalidInputError};

const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Decode base64url text into bytes.
///
/// Padded input and the standard `+`/`/` alphabet are accepted too, since
/// servers are not always strict about which flavour they emit.
pub fn decode(text: &str) -> Result<Vec<u8>, Error> {
    let normalized: String = text
        .trim()
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();

    URL_SAFE_LENIENT.decode(normalized.as_bytes()).map_err(|e| {
        InvalidInputError::Base64 {
            reason: e.to_string(),
        }
        .into()
    })
}

/// Encode bytes as unpadded base64url text.
pub fn encode(bytes: &[u8]) -> String {
    URL_SAFE_LENIENT.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_length_up_to_256() {
        for len in 0..=256usize {
            let bytes: Vec<u8> = (0..len).map(|i| (i * 37 + len) as u8).collect();
            let text = encode(&bytes);
            assert_eq!(decode(&text).unwrap(), bytes, "length {len}");
        }
    }

    #[test]
    fn encode_is_url_safe_and_unpadded() {
        for len in 0..=64usize {
            let bytes: Vec<u8> = (0..len).map(|i| 0xff - i as u8).collect();
            let text = encode(&bytes);
            assert!(!text.contains('+'), "{text}");
            assert!(!text.contains('/'), "{text}");
            assert!(!text.contains('='), "{text}");
        }
    }

    #[test]
    fn decode_accepts_standard_alphabet_and_padding() {
        let bytes = vec![0xfb, 0xff, 0xbf];
        assert_eq!(decode("-_-_").unwrap(), bytes);
        assert_eq!(decode("+/+/").unwrap(), bytes);
        assert_eq!(decode("QQ==").unwrap(), b"A");
        assert_eq!(decode("QQ").unwrap(), b"A");
    }

    #[test]
    fn decode_short_challenge() {
        assert_eq!(decode("AAA").unwrap(), vec![0, 0]);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode("not base64!").is_err());
        assert!(decode("A").is_err());
    }
}
