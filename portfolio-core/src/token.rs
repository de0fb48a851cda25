//! Self-certifying unsubscribe capability tokens.
//!
//! A token binds an email address to the moment it was issued with an
//! HMAC-SHA256 signature. Nothing is stored server-side: a token stays valid
//! until it ages out or the signing secret changes.

use crate::clock::Clock;
use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use url::Url;

type HmacSha256 = Hmac<Sha256>;

/// 30 days.
pub const DEFAULT_MAX_AGE_MS: i64 = 30 * 24 * 60 * 60 * 1000;

const LIST_UNSUBSCRIBE_PATH: &str = "api/list-unsubscribe";

/// A freshly minted token. Only [`TokenCodec::issue`] can construct one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsubscribeToken {
    email: String,
    issued_at: i64,
    signature: String,
}

impl UnsubscribeToken {
    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn issued_at(&self) -> i64 {
        self.issued_at
    }

    /// The opaque string handed out in links.
    pub fn encode(&self) -> String {
        BASE64_STANDARD.encode(format!(
            "{}:{}:{}",
            self.email, self.issued_at, self.signature
        ))
    }
}

impl Display for UnsubscribeToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Identity recovered from a token that passed verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedSubject {
    pub email: String,
    pub issued_at: i64,
}

pub struct TokenCodec {
    keyed: HmacSha256,
    clock: Arc<dyn Clock>,
    max_age_ms: i64,
}

impl TokenCodec {
    pub fn new(secret: &[u8], clock: Arc<dyn Clock>) -> Self {
        Self {
            keyed: HmacSha256::new_from_slice(secret).expect("HMAC-SHA256 accepts keys of any size"),
            clock,
            max_age_ms: DEFAULT_MAX_AGE_MS,
        }
    }

    pub fn with_max_age(mut self, max_age_ms: i64) -> Self {
        self.max_age_ms = max_age_ms;
        self
    }

    pub fn max_age_ms(&self) -> i64 {
        self.max_age_ms
    }

    fn mac(&self, email: &str, issued_at: &str) -> HmacSha256 {
        let mut mac = self.keyed.clone();
        mac.update(email.as_bytes());
        mac.update(b":");
        mac.update(issued_at.as_bytes());
        mac
    }

    pub fn issue(&self, email: &str) -> UnsubscribeToken {
        let issued_at = self.clock.now_millis();
        let signature = self
            .mac(email, &issued_at.to_string())
            .finalize()
            .into_bytes();

        UnsubscribeToken {
            email: email.to_owned(),
            issued_at,
            signature: hex::encode(signature),
        }
    }

    /// Returns the subject of a valid token, `None` for anything else.
    ///
    /// Malformed input, a bad signature and an expired token are
    /// indistinguishable to the caller.
    pub fn verify(&self, token: &str) -> Option<VerifiedSubject> {
        let decoded = BASE64_STANDARD.decode(token.trim()).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;

        let mut fields = decoded.split(':');
        let (Some(email), Some(issued_at_raw), Some(signature), None) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            return None;
        };

        // Only the canonical lowercase form is accepted, so that every
        // character of the segment is significant.
        if !signature
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
        {
            return None;
        }
        let signature = hex::decode(signature).ok()?;

        self.mac(email, issued_at_raw)
            .verify_slice(&signature)
            .ok()?;

        let issued_at: i64 = issued_at_raw.parse().ok()?;
        let age = self.clock.now_millis().saturating_sub(issued_at);
        if age > self.max_age_ms {
            return None;
        }

        Some(VerifiedSubject {
            email: email.to_owned(),
            issued_at,
        })
    }
}

/// One-click unsubscribe URL under `public_url`.
pub fn create_unsubscribe_url(
    public_url: &Url,
    token: &UnsubscribeToken,
) -> Result<Url, url::ParseError> {
    let mut url = public_url.join(LIST_UNSUBSCRIBE_PATH)?;
    url.query_pairs_mut().append_pair("token", &token.encode());
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    const T0: i64 = 1_700_000_000_000;

    fn codec() -> (TokenCodec, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(T0));
        (TokenCodec::new(b"test-secret", clock.clone()), clock)
    }

    fn reencode_with_signature(token: &str, f: impl Fn(&str) -> String) -> String {
        let decoded = String::from_utf8(BASE64_STANDARD.decode(token).unwrap()).unwrap();
        let fields: Vec<&str> = decoded.split(':').collect();
        BASE64_STANDARD.encode(format!("{}:{}:{}", fields[0], fields[1], f(fields[2])))
    }

    #[test]
    fn verify_returns_issued_subject() {
        let (codec, _) = codec();
        let token = codec.issue("a@x.com");

        assert_eq!(token.email(), "a@x.com");
        assert_eq!(token.issued_at(), T0);
        assert_eq!(
            codec.verify(&token.encode()),
            Some(VerifiedSubject {
                email: "a@x.com".to_string(),
                issued_at: T0,
            })
        );
    }

    #[test]
    fn encoded_form_is_base64_of_colon_joined_fields() {
        let (codec, _) = codec();
        let token = codec.issue("a@x.com").encode();

        let decoded = String::from_utf8(BASE64_STANDARD.decode(&token).unwrap()).unwrap();
        let fields: Vec<&str> = decoded.split(':').collect();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0], "a@x.com");
        assert_eq!(fields[1], T0.to_string());
        assert_eq!(fields[2].len(), 64);
    }

    #[test]
    fn token_is_valid_until_max_age_inclusive() {
        let (codec, clock) = codec();
        let token = codec.issue("a@x.com").encode();

        clock.set(T0 + DEFAULT_MAX_AGE_MS);
        assert!(codec.verify(&token).is_some());

        clock.set(T0 + DEFAULT_MAX_AGE_MS + 1);
        assert!(codec.verify(&token).is_none());
    }

    #[test]
    fn custom_max_age_is_honoured() {
        let clock = Arc::new(ManualClock::new(T0));
        let codec = TokenCodec::new(b"test-secret", clock.clone()).with_max_age(1_000);
        let token = codec.issue("a@x.com").encode();

        clock.advance(1_001);
        assert!(codec.verify(&token).is_none());
    }

    #[test]
    fn any_signature_character_change_is_rejected() {
        let (codec, _) = codec();
        let token = codec.issue("a@x.com").encode();

        for position in 0..64 {
            let tampered = reencode_with_signature(&token, |signature| {
                let mut chars: Vec<char> = signature.chars().collect();
                chars[position] = if chars[position] == '0' { '1' } else { '0' };
                chars.into_iter().collect()
            });
            assert!(codec.verify(&tampered).is_none(), "position {position}");
        }
    }

    #[test]
    fn uppercase_signature_is_rejected() {
        let (codec, _) = codec();
        let token = codec.issue("a@x.com").encode();

        let tampered = reencode_with_signature(&token, |signature| signature.to_uppercase());
        assert!(codec.verify(&tampered).is_none());
    }

    #[test]
    fn swapping_the_email_is_rejected() {
        let (codec, _) = codec();
        let token = codec.issue("a@x.com").encode();

        let decoded = String::from_utf8(BASE64_STANDARD.decode(&token).unwrap()).unwrap();
        let forged = BASE64_STANDARD.encode(decoded.replacen("a@x.com", "b@x.com", 1));
        assert!(codec.verify(&forged).is_none());
    }

    #[test]
    fn other_secret_is_rejected() {
        let (codec, clock) = codec();
        let other = TokenCodec::new(b"rotated-secret", clock);

        let token = codec.issue("a@x.com").encode();
        assert!(other.verify(&token).is_none());
    }

    #[test]
    fn malformed_input_is_invalid() {
        let (codec, _) = codec();

        assert!(codec.verify("garbage").is_none());
        assert!(codec.verify("").is_none());
        assert!(codec.verify("!!!not-base64!!!").is_none());
        assert!(codec.verify(&BASE64_STANDARD.encode("only:two")).is_none());
        assert!(codec.verify(&BASE64_STANDARD.encode("a:b:c:d")).is_none());
        assert!(codec.verify(&BASE64_STANDARD.encode([0xff, 0xfe, 0x3a])).is_none());
    }

    #[test]
    fn email_with_colon_does_not_round_trip() {
        let (codec, _) = codec();
        let token = codec.issue("weird:addr@x.com").encode();
        assert!(codec.verify(&token).is_none());
    }

    #[test]
    fn unsubscribe_url_carries_encoded_token() {
        let (codec, _) = codec();
        let token = codec.issue("a+b@x.com");
        let public_url = Url::parse("https://example.com/").unwrap();

        let url = create_unsubscribe_url(&public_url, &token).unwrap();
        assert_eq!(url.path(), "/api/list-unsubscribe");

        let (key, value) = url.query_pairs().next().unwrap();
        assert_eq!(key, "token");
        assert_eq!(codec.verify(&value).unwrap().email, "a+b@x.com");
    }
}
