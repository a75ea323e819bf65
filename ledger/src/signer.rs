//! Transaction signing and verification: RSASSA-PSS over SHA-256.

use std::fmt;

use rand::rngs::OsRng;
use rsa::pss::{Signature as PssSignature, SigningKey, VerifyingKey};
use rsa::signature::{RandomizedSigner, SignatureEncoding, Verifier};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;

use crate::hashing::format_amount;
use crate::types::Transaction;
use crate::user_directory::UserDirectory;

#[derive(Debug)]
pub enum SignerError {
    Rsa(rsa::Error),
    Signature(rsa::signature::Error),
    InvalidHex,
}

impl fmt::Display for SignerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignerError::Rsa(e) => write!(f, "rsa error: {e}"),
            SignerError::Signature(e) => write!(f, "signature error: {e}"),
            SignerError::InvalidHex => write!(f, "signature is not valid hex"),
        }
    }
}

impl std::error::Error for SignerError {}

/// Canonical message digested and signed for a transfer: the ASCII
/// concatenation of sender, recipient, and amount, with the amount
/// rendered through the same routine the Hasher uses.
fn canonical_message(sender: &str, recipient: &str, amount: f64) -> Vec<u8> {
    format!("{sender}{recipient}{}", format_amount(amount)).into_bytes()
}

/// Signs a transfer, returning the hex-encoded PSS signature.
pub fn sign(private_key: &RsaPrivateKey, sender: &str, recipient: &str, amount: f64) -> Result<String, SignerError> {
    let message = canonical_message(sender, recipient, amount);
    let signing_key = SigningKey::<Sha256>::new(private_key.clone());
    let mut rng = OsRng;
    let signature = signing_key.sign_with_rng(&mut rng, &message);
    Ok(hex::encode(signature.to_bytes()))
}

/// Verifies `transaction`'s signature against its sender's registered
/// public key. Mining-reward transactions always verify; any
/// cryptographic or lookup failure yields `false`.
pub fn verify(transaction: &Transaction, user_dir: &dyn UserDirectory) -> bool {
    if transaction.is_reward() {
        return true;
    }
    verify_checked(transaction, user_dir).unwrap_or(false)
}

fn verify_checked(transaction: &Transaction, user_dir: &dyn UserDirectory) -> Result<bool, SignerError> {
    let Some(pem) = user_dir.public_key_of(&transaction.sender) else {
        return Ok(false);
    };
    let public_key = crate::keystore::public_key_from_pem(&pem).map_err(|_| SignerError::InvalidHex)?;
    let sig_bytes = hex::decode(&transaction.signature).map_err(|_| SignerError::InvalidHex)?;
    let signature = PssSignature::try_from(sig_bytes.as_slice()).map_err(SignerError::Signature)?;
    let verifying_key: VerifyingKey<Sha256> = VerifyingKey::new(public_key);
    let message = canonical_message(&transaction.sender, &transaction.recipient, transaction.amount);
    Ok(verifying_key.verify(&message, &signature).is_ok())
}

/// Convenience used by callers that already hold an [`RsaPublicKey`]
/// rather than going through a [`UserDirectory`] lookup (e.g. tests).
pub fn verify_with_public_key(transaction: &Transaction, public_key: &RsaPublicKey) -> bool {
    if transaction.is_reward() {
        return true;
    }
    let Ok(sig_bytes) = hex::decode(&transaction.signature) else {
        return false;
    };
    let Ok(signature) = PssSignature::try_from(sig_bytes.as_slice()) else {
        return false;
    };
    let verifying_key: VerifyingKey<Sha256> = VerifyingKey::new(public_key.clone());
    let message = canonical_message(&transaction.sender, &transaction.recipient, transaction.amount);
    verifying_key.verify(&message, &signature).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user_directory::tests::MemoryUserDirectory;
    use rsa::pkcs8::EncodePublicKey;

    fn keypair() -> (RsaPrivateKey, RsaPublicKey) {
        let mut rng = OsRng;
        let private_key = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let public_key = RsaPublicKey::from(&private_key);
        (private_key, public_key)
    }

    #[test]
    fn sign_then_verify_with_public_key_succeeds() {
        let (private_key, public_key) = keypair();
        let sig = sign(&private_key, "alice@x", "bob@x", 3.0).unwrap();
        let tx = Transaction::new(1, "alice@x", "bob@x", 3.0, sig);
        assert!(verify_with_public_key(&tx, &public_key));
    }

    #[test]
    fn tampering_with_amount_after_signing_fails_verification() {
        let (private_key, public_key) = keypair();
        let sig = sign(&private_key, "alice@x", "bob@x", 3.0).unwrap();
        let tampered = Transaction::new(1, "alice@x", "bob@x", 300.0, sig);
        assert!(!verify_with_public_key(&tampered, &public_key));
    }

    #[test]
    fn garbage_signature_is_rejected_not_panicking() {
        let tx = Transaction::new(1, "alice@x", "bob@x", 1.0, "deadbeef");
        let dir = MemoryUserDirectory::new();
        dir.register("alice@x", "http://127.0.0.1:5001", "not even a pem");
        assert!(!verify(&tx, &dir));
    }

    #[test]
    fn reward_transaction_always_verifies() {
        let tx = Transaction::reward(1, "alice@x", 10.0);
        let dir = MemoryUserDirectory::new();
        assert!(verify(&tx, &dir));
    }

    #[test]
    fn verify_through_user_directory_finds_registered_key() {
        let (private_key, public_key) = keypair();
        let pem = public_key.to_public_key_pem(rsa::pkcs8::LineEnding::LF).unwrap();
        let dir = MemoryUserDirectory::new();
        dir.register("alice@x", "http://127.0.0.1:5001", &pem);

        let sig = sign(&private_key, "alice@x", "bob@x", 3.0).unwrap();
        let tx = Transaction::new(1, "alice@x", "bob@x", 3.0, sig);
        assert!(verify(&tx, &dir));
    }

    #[test]
    fn unregistered_sender_fails_verification() {
        let (private_key, _public_key) = keypair();
        let sig = sign(&private_key, "ghost@x", "bob@x", 3.0).unwrap();
        let tx = Transaction::new(1, "ghost@x", "bob@x", 3.0, sig);
        let dir = MemoryUserDirectory::new();
        assert!(!verify(&tx, &dir));
    }
}
