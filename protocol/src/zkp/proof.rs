//! # Proof Container
//!
//! A [`ThresholdProof`] is the artifact handed back to the client after a
//! successful prove call. It is inert: it carries the Groth16 proof and the
//! fingerprint of the key pair that produced it, nothing else.
//!
//! ## Wire format
//!
//! ```text
//! offset  len  field
//! 0       1    format version (PROOF_FORMAT_VERSION)
//! 1       32   key id (BLAKE3 of the compressed verifying key)
//! 33      128  compressed Groth16 proof (A: G1, B: G2, C: G1)
//! ```
//!
//! The encoding depends on nothing process-local, so a proof produced by
//! one node verifies identically on another node holding the same key pair.
//! In JSON the proof is the lowercase hex string of the bytes above.

use std::fmt;

use ark_bn254::Bn254;
use ark_groth16::Proof;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::config::{GROTH16_PROOF_LENGTH, KEY_ID_LENGTH, PROOF_FORMAT_VERSION, PROOF_LENGTH};
use crate::error::{ProtocolError, ProtocolResult};

use super::keys::KeyId;

/// A serialized Groth16 threshold proof bound to a key pair.
#[derive(Clone, PartialEq, Eq)]
pub struct ThresholdProof {
    key_id: KeyId,
    /// Compressed Groth16 proof, validated on construction.
    groth16: Vec<u8>,
}

impl ThresholdProof {
    /// Wrap a freshly generated arkworks proof.
    pub(crate) fn new(key_id: KeyId, proof: &Proof<Bn254>) -> ProtocolResult<Self> {
        let mut groth16 = Vec::with_capacity(GROTH16_PROOF_LENGTH);
        proof
            .serialize_compressed(&mut groth16)
            .map_err(|e| ProtocolError::ProverFault(format!("proof serialization failed: {}", e)))?;
        Ok(Self { key_id, groth16 })
    }

    /// Fingerprint of the key pair this proof was produced with.
    pub fn key_id(&self) -> KeyId {
        self.key_id
    }

    /// Encode to the wire format.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(PROOF_LENGTH);
        out.push(PROOF_FORMAT_VERSION);
        out.extend_from_slice(self.key_id.as_bytes());
        out.extend_from_slice(&self.groth16);
        out
    }

    /// Decode from the wire format.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::MalformedProof`] on wrong length, unknown version, or
    /// bytes that are not valid curve points.
    pub fn from_bytes(data: &[u8]) -> ProtocolResult<Self> {
        if data.len() != PROOF_LENGTH {
            return Err(ProtocolError::MalformedProof(format!(
                "expected {} bytes, got {}",
                PROOF_LENGTH,
                data.len()
            )));
        }
        if data[0] != PROOF_FORMAT_VERSION {
            return Err(ProtocolError::MalformedProof(format!(
                "unsupported proof format version {}",
                data[0]
            )));
        }

        let mut key_id = [0u8; KEY_ID_LENGTH];
        key_id.copy_from_slice(&data[1..1 + KEY_ID_LENGTH]);
        let groth16 = data[1 + KEY_ID_LENGTH..].to_vec();

        // Reject garbage up front rather than at verification time.
        Proof::<Bn254>::deserialize_compressed(&groth16[..])
            .map_err(|e| ProtocolError::MalformedProof(format!("invalid Groth16 proof: {}", e)))?;

        Ok(Self {
            key_id: KeyId::from_bytes(key_id),
            groth16,
        })
    }

    /// Lowercase hex of [`ThresholdProof::to_bytes`].
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Decode from hex. An optional `0x` prefix is accepted.
    pub fn from_hex(s: &str) -> ProtocolResult<Self> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes =
            hex::decode(s).map_err(|e| ProtocolError::MalformedProof(format!("invalid hex: {}", e)))?;
        Self::from_bytes(&bytes)
    }

    /// Deserialize into the arkworks proof (used by the verifier).
    pub(crate) fn to_ark_proof(&self) -> ProtocolResult<Proof<Bn254>> {
        Proof::<Bn254>::deserialize_compressed(&self.groth16[..])
            .map_err(|e| ProtocolError::MalformedProof(format!("proof deserialization failed: {}", e)))
    }

    /// Size of the encoded proof in bytes.
    pub fn size(&self) -> usize {
        1 + KEY_ID_LENGTH + self.groth16.len()
    }
}

impl fmt::Debug for ThresholdProof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThresholdProof")
            .field("key_id", &self.key_id)
            .field("size", &self.size())
            .finish()
    }
}

impl Serialize for ThresholdProof {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ThresholdProof {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ThresholdProof::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zkp::keys::KeyPair;
    use crate::zkp::prover::ThresholdProver;
    use crate::zkp::relation::ThresholdRelation;
    use ark_std::rand::{rngs::StdRng, SeedableRng};

    fn sample_proof() -> ThresholdProof {
        let relation = ThresholdRelation::new().unwrap();
        let keys = KeyPair::generate(&relation, &mut StdRng::seed_from_u64(42)).unwrap();
        ThresholdProver::new(&relation, &keys)
            .prove(500, 100)
            .expect("proof generation")
    }

    #[test]
    fn encoded_length_is_fixed() {
        let proof = sample_proof();
        assert_eq!(proof.to_bytes().len(), PROOF_LENGTH);
        assert_eq!(proof.size(), PROOF_LENGTH);
    }

    #[test]
    fn bytes_round_trip() {
        let proof = sample_proof();
        let restored = ThresholdProof::from_bytes(&proof.to_bytes()).unwrap();
        assert_eq!(proof, restored);
    }

    #[test]
    fn json_round_trip() {
        let proof = sample_proof();
        let json = serde_json::to_string(&proof).unwrap();
        assert!(json.starts_with('"'), "proof serializes as a hex string");
        let restored: ThresholdProof = serde_json::from_str(&json).unwrap();
        assert_eq!(proof, restored);
    }

    #[test]
    fn hex_accepts_prefix() {
        let proof = sample_proof();
        let prefixed = format!("0x{}", proof.to_hex());
        assert_eq!(ThresholdProof::from_hex(&prefixed).unwrap(), proof);
    }

    #[test]
    fn truncated_bytes_rejected() {
        let bytes = sample_proof().to_bytes();
        assert!(matches!(
            ThresholdProof::from_bytes(&bytes[..bytes.len() - 1]),
            Err(ProtocolError::MalformedProof(_))
        ));
    }

    #[test]
    fn unknown_version_rejected() {
        let mut bytes = sample_proof().to_bytes();
        bytes[0] = PROOF_FORMAT_VERSION + 1;
        assert!(matches!(
            ThresholdProof::from_bytes(&bytes),
            Err(ProtocolError::MalformedProof(_))
        ));
    }

    #[test]
    fn garbage_points_rejected() {
        let mut bytes = vec![PROOF_FORMAT_VERSION];
        bytes.extend_from_slice(&[0u8; KEY_ID_LENGTH]);
        bytes.extend_from_slice(&[0xffu8; GROTH16_PROOF_LENGTH]);
        assert!(matches!(
            ThresholdProof::from_bytes(&bytes),
            Err(ProtocolError::MalformedProof(_))
        ));
    }

    #[test]
    fn invalid_hex_rejected() {
        assert!(matches!(
            ThresholdProof::from_hex("not hex"),
            Err(ProtocolError::MalformedProof(_))
        ));
    }
}
