//! Curve primitives on secp256k1.
//!
//! Scalars are fixed-width 256-bit integers reduced mod the group order n
//! ([`k256::Scalar`]). Points leave this module only as 33-byte SEC1
//! compressed encodings ([`CompressedPoint`]).
//!
//! Key objects are built the way a standards-based crypto library expects
//! them: raw key bytes are wrapped into DER (`ECPrivateKey` from RFC 5915,
//! `SubjectPublicKeyInfo` from RFC 5280) and then loaded through the regular
//! SEC1/SPKI decoders.

use crate::{Result, SrpError};
use k256::ecdsa::signature::{Signer, Verifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use k256::elliptic_curve::ops::Reduce;
use k256::elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};
use k256::elliptic_curve::Field;
use k256::pkcs8::DecodePublicKey;
use k256::{AffinePoint, EncodedPoint, FieldBytes, ProjectivePoint, SecretKey, U256};
use rand::{CryptoRng, RngCore};
use sec1::der::asn1::{BitStringRef, ObjectIdentifier};
use sec1::der::Encode;
use sec1::{EcParameters, EcPrivateKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use spki::{AlgorithmIdentifierRef, SubjectPublicKeyInfoRef};
use std::fmt;

pub use k256::Scalar;

/// Length of a SEC1 compressed point.
pub const COMPRESSED_POINT_LEN: usize = 33;

/// Length of a fixed-width `r || s` ECDSA signature.
pub const SIGNATURE_LEN: usize = 64;

/// id-ecPublicKey.
const OID_EC_PUBLIC_KEY: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");

/// secp256k1 named curve.
const OID_SECP256K1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.10");

/// SEC1 tags of a compressed point (even and odd y).
const TAG_COMPRESSED_EVEN: u8 = 0x02;
const TAG_COMPRESSED_ODD: u8 = 0x03;

// ---------------------------------------------------------------------------
// Scalars
// ---------------------------------------------------------------------------

/// Reduce a 256-bit big-endian integer modulo n.
pub fn mod_n(bytes: &[u8; 32]) -> Scalar {
    <Scalar as Reduce<U256>>::reduce_bytes(FieldBytes::from_slice(bytes))
}

/// Embed a small nonnegative integer as a scalar.
pub fn scalar_from_u64(value: u64) -> Scalar {
    Scalar::from(value)
}

/// Uniform scalar in `[0, n-1]`.
pub fn random_scalar<R: RngCore + CryptoRng>(rng: &mut R) -> Scalar {
    Scalar::random(&mut *rng)
}

/// Uniform scalar in `[1, n-1]`.
pub fn random_scalar_nonzero<R: RngCore + CryptoRng>(rng: &mut R) -> Scalar {
    loop {
        let candidate = random_scalar(rng);
        if !is_zero(&candidate) {
            return candidate;
        }
    }
}

/// True if the scalar is 0 mod n.
pub fn is_zero(scalar: &Scalar) -> bool {
    bool::from(scalar.is_zero())
}

/// SHA-256 digest.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let digest = Sha256::digest(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

/// Derive a fixed multiplier from a domain tag: `mod_n(sha256(tag))`.
///
/// The range proof uses `hash_to_scalar("H")` as its blinding multiplier
/// `h`, so `H = h·G` has a publicly known discrete log. It is a fixed
/// domain-separated constant, not an independent second generator.
pub fn hash_to_scalar(domain: &str) -> Scalar {
    mod_n(&sha256(domain.as_bytes()))
}

/// Compute `scalar·G` as a compressed point.
///
/// Fails with [`SrpError::ZeroScalar`] for a zero scalar, which would
/// otherwise yield the identity point.
pub fn scalar_mul_g(scalar: &Scalar) -> Result<CompressedPoint> {
    if is_zero(scalar) {
        return Err(SrpError::ZeroScalar);
    }
    let point = AffinePoint::from(ProjectivePoint::GENERATOR * scalar);
    CompressedPoint::from_affine(&point)
}

// ---------------------------------------------------------------------------
// Points
// ---------------------------------------------------------------------------

/// A non-identity curve point in 33-byte compressed form.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompressedPoint([u8; COMPRESSED_POINT_LEN]);

impl CompressedPoint {
    /// Parse and validate a compressed point.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; COMPRESSED_POINT_LEN] = bytes.try_into().map_err(|_| {
            SrpError::InvalidPoint(format!(
                "expected {} bytes, got {}",
                COMPRESSED_POINT_LEN,
                bytes.len()
            ))
        })?;
        if arr[0] != TAG_COMPRESSED_EVEN && arr[0] != TAG_COMPRESSED_ODD {
            return Err(SrpError::InvalidPoint(format!(
                "tag {:#04x} is not a compressed encoding",
                arr[0]
            )));
        }
        let point = Self(arr);
        point.to_affine()?;
        Ok(point)
    }

    /// Parse a hex-encoded compressed point.
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s.trim()).map_err(|e| SrpError::InvalidPoint(e.to_string()))?;
        Self::from_slice(&bytes)
    }

    fn from_affine(point: &AffinePoint) -> Result<Self> {
        let encoded = point.to_encoded_point(true);
        let arr: [u8; COMPRESSED_POINT_LEN] = encoded
            .as_bytes()
            .try_into()
            .map_err(|_| SrpError::InvalidPoint("identity point has no compressed form".into()))?;
        Ok(Self(arr))
    }

    /// Raw encoding.
    pub fn as_bytes(&self) -> &[u8; COMPRESSED_POINT_LEN] {
        &self.0
    }

    /// Lowercase hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub(crate) fn to_affine(&self) -> Result<AffinePoint> {
        let encoded = EncodedPoint::from_bytes(self.0)
            .map_err(|e| SrpError::InvalidPoint(e.to_string()))?;
        Option::<AffinePoint>::from(AffinePoint::from_encoded_point(&encoded))
            .ok_or_else(|| SrpError::InvalidPoint("not a point on secp256k1".into()))
    }

    pub(crate) fn to_projective(&self) -> Result<ProjectivePoint> {
        self.to_affine().map(ProjectivePoint::from)
    }

    fn to_uncompressed(&self) -> Result<EncodedPoint> {
        Ok(self.to_affine()?.to_encoded_point(false))
    }
}

impl fmt::Debug for CompressedPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CompressedPoint({})", self.to_hex())
    }
}

impl Serialize for CompressedPoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for CompressedPoint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// DER key structures
// ---------------------------------------------------------------------------

/// Build the RFC 5915 `ECPrivateKey` DER for a raw secp256k1 private scalar.
///
/// ```text
/// ECPrivateKey ::= SEQUENCE {
///   version        INTEGER { ecPrivkeyVer1(1) },
///   privateKey     OCTET STRING,
///   parameters [0] ECParameters {{ NamedCurve }},
///   publicKey  [1] BIT STRING }
/// ```
pub fn ec_private_key_der(private_key: &[u8; 32]) -> Result<Vec<u8>> {
    let secret = SecretKey::from_bytes(FieldBytes::from_slice(private_key))
        .map_err(|e| SrpError::invalid_key("private", e))?;
    let public = secret.public_key().to_encoded_point(false);

    EcPrivateKey {
        private_key: private_key.as_slice(),
        parameters: Some(EcParameters::NamedCurve(OID_SECP256K1)),
        public_key: Some(public.as_bytes()),
    }
    .to_der()
    .map_err(|e| SrpError::invalid_key("private", e))
}

/// Build the RFC 5280 `SubjectPublicKeyInfo` DER for a compressed point.
///
/// ```text
/// SubjectPublicKeyInfo ::= SEQUENCE {
///   algorithm        SEQUENCE { id-ecPublicKey, secp256k1 },
///   subjectPublicKey BIT STRING }
/// ```
pub fn ec_public_key_der(public_key: &CompressedPoint) -> Result<Vec<u8>> {
    let uncompressed = public_key.to_uncompressed()?;
    let subject_public_key = BitStringRef::from_bytes(uncompressed.as_bytes())
        .map_err(|e| SrpError::invalid_key("public", e))?;
    SubjectPublicKeyInfoRef {
        algorithm: AlgorithmIdentifierRef {
            oid: OID_EC_PUBLIC_KEY,
            parameters: Some((&OID_SECP256K1).into()),
        },
        subject_public_key,
    }
    .to_der()
    .map_err(|e| SrpError::invalid_key("public", e))
}

// ---------------------------------------------------------------------------
// Keys and signatures
// ---------------------------------------------------------------------------

/// ECDSA signing key loaded from raw scalar bytes.
#[derive(Clone)]
pub struct PrivateKey {
    signing_key: SigningKey,
}

impl PrivateKey {
    /// Load a private key from its 32-byte big-endian scalar.
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self> {
        let der = ec_private_key_der(bytes)?;
        let secret = SecretKey::from_sec1_der(&der).map_err(|e| SrpError::invalid_key("private", e))?;
        let signing_key = SigningKey::from_bytes(&secret.to_bytes())
            .map_err(|e| SrpError::invalid_key("private", e))?;
        Ok(Self { signing_key })
    }

    /// Load a private key from 64 hex characters.
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s.trim()).map_err(|e| SrpError::invalid_key("private", e))?;
        let arr: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            SrpError::invalid_key("private", format!("expected 32 bytes, got {}", bytes.len()))
        })?;
        Self::from_bytes(&arr)
    }

    /// The matching public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            verifying_key: *self.signing_key.verifying_key(),
        }
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("public_key", &self.public_key().to_compressed())
            .finish_non_exhaustive()
    }
}

/// ECDSA verification key.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PublicKey {
    verifying_key: VerifyingKey,
}

impl PublicKey {
    /// Load a public key from its compressed point.
    pub fn from_compressed(point: &CompressedPoint) -> Result<Self> {
        let der = ec_public_key_der(point)?;
        let public =
            k256::PublicKey::from_public_key_der(&der).map_err(|e| SrpError::invalid_key("public", e))?;
        Ok(Self {
            verifying_key: VerifyingKey::from(public),
        })
    }

    /// Load a public key from 66 hex characters.
    pub fn from_hex(s: &str) -> Result<Self> {
        let point = CompressedPoint::from_hex(s).map_err(|e| SrpError::invalid_key("public", e))?;
        Self::from_compressed(&point)
    }

    /// Compressed encoding of this key.
    pub fn to_compressed(&self) -> CompressedPoint {
        let encoded = self.verifying_key.as_affine().to_encoded_point(true);
        let mut arr = [0u8; COMPRESSED_POINT_LEN];
        arr.copy_from_slice(encoded.as_bytes());
        CompressedPoint(arr)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_compressed().to_hex())
    }
}

/// Sign `SHA-256(msg)` and return the fixed-width `r || s` encoding.
pub fn sign(key: &PrivateKey, msg: &[u8]) -> [u8; SIGNATURE_LEN] {
    let signature: Signature = key.signing_key.sign(msg);
    let mut out = [0u8; SIGNATURE_LEN];
    out.copy_from_slice(&signature.to_bytes());
    out
}

/// Verify a fixed-width `r || s` signature over `SHA-256(msg)`.
///
/// Malformed signatures verify as false. High-S signatures are normalized
/// first so peers that do not enforce low-S still interoperate.
pub fn verify(key: &PublicKey, msg: &[u8], sig: &[u8]) -> bool {
    if sig.len() != SIGNATURE_LEN {
        return false;
    }
    let Ok(signature) = Signature::from_slice(sig) else {
        return false;
    };
    let signature = signature.normalize_s().unwrap_or(signature);
    key.verifying_key.verify(msg, &signature).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    const PRIV: [u8; 32] = [0x11; 32];

    fn n_minus(k: u8) -> [u8; 32] {
        let mut n = hex::decode("fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364141")
            .unwrap();
        n[31] -= k;
        n.try_into().unwrap()
    }

    #[test]
    fn test_mod_n_reduces_order_to_zero() {
        assert!(is_zero(&mod_n(&n_minus(0))));
        assert_eq!(mod_n(&n_minus(1)), -Scalar::ONE);

        let mut small = [0u8; 32];
        small[31] = 7;
        assert_eq!(mod_n(&small), scalar_from_u64(7));
    }

    #[test]
    fn test_random_scalar_nonzero() {
        for _ in 0..64 {
            assert!(!is_zero(&random_scalar_nonzero(&mut OsRng)));
        }
    }

    #[test]
    fn test_hash_to_scalar_is_deterministic() {
        let h1 = hash_to_scalar("H");
        let h2 = hash_to_scalar("H");
        assert_eq!(h1, h2);
        assert!(!is_zero(&h1));
        assert_ne!(h1, hash_to_scalar("G"));
    }

    #[test]
    fn test_scalar_mul_g() {
        let one = scalar_mul_g(&Scalar::ONE).unwrap();
        assert_eq!(
            one.to_hex(),
            "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798"
        );
        assert_eq!(scalar_mul_g(&Scalar::ZERO), Err(SrpError::ZeroScalar));
    }

    #[test]
    fn test_compressed_point_rejects_garbage() {
        assert!(CompressedPoint::from_slice(&[0x02; 32]).is_err());
        assert!(CompressedPoint::from_slice(&[0x05; 33]).is_err());
        let g = scalar_mul_g(&Scalar::ONE).unwrap();
        assert_eq!(CompressedPoint::from_slice(g.as_bytes()).unwrap(), g);
    }

    #[test]
    fn test_compressed_point_requires_compressed_tag() {
        let two_g = scalar_mul_g(&scalar_from_u64(2)).unwrap();
        for tag in [0x00, 0x04, 0x05, 0x06, 0x07] {
            let mut bytes = *two_g.as_bytes();
            bytes[0] = tag;
            assert!(
                matches!(
                    CompressedPoint::from_slice(&bytes),
                    Err(SrpError::InvalidPoint(_))
                ),
                "tag {:#04x} accepted",
                tag
            );
        }
        let compact = format!("05{}", &two_g.to_hex()[2..]);
        assert!(CompressedPoint::from_hex(&compact).is_err());
        assert!(PublicKey::from_hex(&compact).is_err());
        assert!(serde_json::from_str::<CompressedPoint>(&format!("\"{}\"", compact)).is_err());
    }

    #[test]
    fn test_private_key_der_layout() {
        let der = ec_private_key_der(&PRIV).unwrap();
        assert_eq!(der.len(), 118);
        assert_eq!(&der[..7], &[0x30, 0x74, 0x02, 0x01, 0x01, 0x04, 0x20]);
        assert_eq!(&der[7..39], &PRIV);
        assert_eq!(
            &der[39..48],
            &[0xa0, 0x07, 0x06, 0x05, 0x2b, 0x81, 0x04, 0x00, 0x0a]
        );
        assert_eq!(&der[48..53], &[0xa1, 0x44, 0x03, 0x42, 0x00]);
        assert_eq!(der[53], 0x04);
    }

    #[test]
    fn test_public_key_der_layout() {
        let key = PrivateKey::from_bytes(&PRIV).unwrap();
        let der = ec_public_key_der(&key.public_key().to_compressed()).unwrap();
        let prefix =
            hex::decode("3056301006072a8648ce3d020106052b8104000a034200").unwrap();
        assert_eq!(der.len(), 88);
        assert_eq!(&der[..prefix.len()], prefix.as_slice());
        assert_eq!(der[prefix.len()], 0x04);
    }

    #[test]
    fn test_key_round_trip_through_der() {
        let key = PrivateKey::from_bytes(&PRIV).unwrap();
        let compressed = key.public_key().to_compressed();
        let loaded = PublicKey::from_compressed(&compressed).unwrap();
        assert_eq!(loaded, key.public_key());
        assert_eq!(PublicKey::from_hex(&compressed.to_hex()).unwrap(), loaded);
    }

    #[test]
    fn test_invalid_private_keys() {
        assert!(PrivateKey::from_bytes(&[0u8; 32]).is_err());
        assert!(PrivateKey::from_bytes(&n_minus(0)).is_err());
        assert!(PrivateKey::from_hex("abcd").is_err());
        assert!(PrivateKey::from_hex("zz").is_err());
    }

    #[test]
    fn test_sign_verify_round_trip() {
        let key = PrivateKey::from_bytes(&PRIV).unwrap();
        let msg = b"serial-0001";
        let sig = sign(&key, msg);
        assert!(verify(&key.public_key(), msg, &sig));
        assert!(!verify(&key.public_key(), b"serial-0002", &sig));
        assert!(!verify(&key.public_key(), msg, &sig[..63]));
    }

    #[test]
    fn test_verify_rejects_every_single_bit_flip() {
        let key = PrivateKey::from_bytes(&PRIV).unwrap();
        let public = key.public_key();
        let msg = b"serial-0001|nonce".to_vec();
        let sig = sign(&key, &msg);

        for bit in 0..SIGNATURE_LEN * 8 {
            let mut flipped = sig;
            flipped[bit / 8] ^= 1 << (bit % 8);
            assert!(!verify(&public, &msg, &flipped), "signature bit {} flipped", bit);
        }
        for bit in 0..msg.len() * 8 {
            let mut flipped = msg.clone();
            flipped[bit / 8] ^= 1 << (bit % 8);
            assert!(!verify(&public, &flipped, &sig), "message bit {} flipped", bit);
        }
    }

    #[test]
    fn test_verify_rejects_other_key() {
        let key = PrivateKey::from_bytes(&PRIV).unwrap();
        let other = PrivateKey::from_bytes(&[0x22; 32]).unwrap();
        let sig = sign(&key, b"nonce");
        assert!(!verify(&other.public_key(), b"nonce", &sig));
    }

    #[test]
    fn test_private_key_debug_is_redacted() {
        let key = PrivateKey::from_bytes(&PRIV).unwrap();
        let printed = format!("{:?}", key);
        assert!(!printed.contains(&hex::encode(PRIV)));
    }
}
