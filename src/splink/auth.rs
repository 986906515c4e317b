use crate::prelude::*;

use md5::{Digest, Md5};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::splink::session::Session;
use crate::splink::{
    ADDR_CHALLENGE, ADDR_CHALLENGE_SUCCESS, ADDR_COMPORT, COMPORT_UNAUTHENTICATED,
};

const CHALLENGE_WORDS: u8 = 4; // 8-byte challenge
const PASSWORD_PAD: usize = 32;

/// Performs the challenge-response handshake and returns the comport the
/// device assigned. If the comport register already holds a valid value the
/// handshake is skipped entirely.
///
/// Authentication failure is fatal; the device offers no retry.
pub async fn authenticate<S>(session: &mut Session<S>, password: &str) -> Result<u16, Error>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let mut com_port = session.read_u16(ADDR_COMPORT).await?;

    if com_port == COMPORT_UNAUTHENTICATED {
        info!("unauthenticated, performing challenge-response handshake");

        let challenge = session.read(ADDR_CHALLENGE, CHALLENGE_WORDS).await?;
        let digest = challenge_digest(&challenge, password);
        session.write(ADDR_CHALLENGE, &digest).await?;

        let success = session.read_u16(ADDR_CHALLENGE_SUCCESS).await?;
        if success != 1 {
            return Err(Error::AuthRejected(success));
        }

        com_port = session.read_u16(ADDR_COMPORT).await?;
    }

    Ok(com_port)
}

/// MD5 over the challenge bytes followed by the password right-padded with
/// spaces to 32 bytes, reinterpreted as 8 big-endian words. MD5 is what the
/// firmware demands; the digest must match it bit-for-bit.
pub fn challenge_digest(challenge: &[u8], password: &str) -> [u16; 8] {
    let mut buf = Vec::with_capacity(challenge.len() + PASSWORD_PAD);
    buf.extend_from_slice(challenge);

    let mut padded = password.as_bytes().to_vec();
    if padded.len() < PASSWORD_PAD {
        padded.resize(PASSWORD_PAD, b' ');
    }
    buf.extend_from_slice(&padded);

    let digest = Md5::digest(&buf);

    let mut words = [0u16; 8];
    for (word, pair) in words.iter_mut().zip(digest.chunks_exact(2)) {
        *word = u16::from_be_bytes([pair[0], pair[1]]);
    }
    words
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_deterministic() {
        let challenge = [1u8, 2, 3, 4, 5, 6, 7, 8];
        let a = challenge_digest(&challenge, "test");
        let b = challenge_digest(&challenge, "test");
        assert_eq!(a, b);
    }

    #[test]
    fn digest_depends_on_password_and_challenge() {
        let challenge = [1u8, 2, 3, 4, 5, 6, 7, 8];
        assert_ne!(
            challenge_digest(&challenge, "test"),
            challenge_digest(&challenge, "other")
        );
        assert_ne!(
            challenge_digest(&challenge, "test"),
            challenge_digest(&[8u8, 7, 6, 5, 4, 3, 2, 1], "test")
        );
    }

    #[test]
    fn digest_words_are_big_endian() {
        let challenge = [0u8; 8];
        let mut buf = challenge.to_vec();
        let mut padded = b"test".to_vec();
        padded.resize(PASSWORD_PAD, b' ');
        buf.extend_from_slice(&padded);

        let raw = Md5::digest(&buf);
        let words = challenge_digest(&challenge, "test");
        assert_eq!(words[0], u16::from_be_bytes([raw[0], raw[1]]));
        assert_eq!(words[7], u16::from_be_bytes([raw[14], raw[15]]));
    }

    #[test]
    fn long_password_is_not_truncated() {
        let challenge = [1u8; 8];
        let long = "x".repeat(40);
        // 40 > pad width; the digest input simply carries all of it
        assert_ne!(
            challenge_digest(&challenge, &long),
            challenge_digest(&challenge, &"x".repeat(32))
        );
    }
}
