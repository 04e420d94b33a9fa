//! Strict decode/encode and surgical field patching.
//!
//! The scenario decodes hex produced by the node, alters specific fields, and
//! re-encodes bytes the node must accept back. The round-trip invariant is
//! therefore load-bearing: `encode(decode(h)) == h` for every accepted `h`.
//!
//! The node's wire format is the pre-witness layout: version, inputs,
//! outputs, locktime, with no marker byte. That matters for the unfunded
//! draft, whose input vector is empty — a whole-transaction consensus decode
//! would read the `00` input count as a witness marker and misparse the
//! stream, so the fields are decoded and encoded individually here. Compact
//! sizes are still rejected when non-minimal, so every accepted stream is
//! canonical and re-encoding reproduces it exactly.

use bitcoin::absolute::LockTime;
use bitcoin::consensus::encode as consensus;
use bitcoin::consensus::{Decodable, Encodable};
use bitcoin::transaction::Version;
use bitcoin::{ScriptBuf, Transaction, TxIn, TxOut};

use crate::error::{CodecError, Result};

/// Decode a hex-encoded raw transaction in the pre-witness layout.
///
/// Fails with [`CodecError::Malformed`] if the stream is truncated relative
/// to its own length prefixes or if bytes remain after all declared fields
/// have been consumed. A partial structure is never returned. An empty input
/// vector is a valid unfunded draft, never a witness marker.
pub fn decode(hex_bytes: &str) -> Result<Transaction> {
    let bytes = hex::decode(hex_bytes)?;
    let mut rd = bytes.as_slice();

    let version = Version::consensus_decode(&mut rd)?;
    let input = Vec::<TxIn>::consensus_decode(&mut rd)?;
    let output = Vec::<TxOut>::consensus_decode(&mut rd)?;
    let lock_time = LockTime::consensus_decode(&mut rd)?;

    if !rd.is_empty() {
        return Err(CodecError::Malformed(consensus::Error::ParseFailed(
            "data not consumed entirely when explicitly deserializing",
        )));
    }

    Ok(Transaction {
        version,
        lock_time,
        input,
        output,
    })
}

/// Encode a transaction back to hex in the pre-witness layout.
/// Total inverse of [`decode`].
pub fn encode(tx: &Transaction) -> String {
    let mut buf = Vec::new();
    encode_fields(tx, &mut buf).expect("consensus encoding to Vec<u8> is infallible");
    hex::encode(buf)
}

fn encode_fields(tx: &Transaction, buf: &mut Vec<u8>) -> std::result::Result<(), bitcoin::io::Error> {
    tx.version.consensus_encode(buf)?;
    tx.input.consensus_encode(buf)?;
    tx.output.consensus_encode(buf)?;
    tx.lock_time.consensus_encode(buf)?;
    Ok(())
}

/// Replace exactly one output's spending condition, leaving its amount and
/// every other input and output untouched.
pub fn patch_output_script(tx: &mut Transaction, index: usize, script: ScriptBuf) -> Result<()> {
    let outputs = tx.output.len();
    let out = tx
        .output
        .get_mut(index)
        .ok_or(CodecError::OutputIndex { index, outputs })?;
    out.script_pubkey = script;
    Ok(())
}

/// Overwrite the leading version field only.
pub fn set_version(tx: &mut Transaction, version: i32) {
    tx.version = Version(version);
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::hashes::Hash;
    use bitcoin::{Amount, OutPoint, PubkeyHash, Sequence, Txid, Witness};

    fn p2pkh_script(fill: u8) -> ScriptBuf {
        ScriptBuf::new_p2pkh(&PubkeyHash::from_byte_array([fill; 20]))
    }

    fn sample_tx() -> Transaction {
        Transaction {
            version: Version::ONE,
            lock_time: LockTime::ZERO,
            input: vec![TxIn {
                previous_output: OutPoint {
                    txid: Txid::from_byte_array([0x11; 32]),
                    vout: 1,
                },
                script_sig: ScriptBuf::new(),
                sequence: Sequence::MAX,
                witness: Witness::new(),
            }],
            output: vec![
                TxOut {
                    value: Amount::from_sat(500_000_000),
                    script_pubkey: p2pkh_script(0xaa),
                },
                TxOut {
                    value: Amount::from_sat(123_456),
                    script_pubkey: p2pkh_script(0xbb),
                },
            ],
        }
    }

    /// The byte-exact shape the node emits for an unfunded one-output draft:
    /// version, `00` input count, one output, locktime.
    fn zero_input_draft_hex() -> String {
        let script = p2pkh_script(0xaa);
        let mut bytes = vec![0x02, 0x00, 0x00, 0x00];
        bytes.push(0x00); // no inputs
        bytes.push(0x01); // one output
        bytes.extend(500_000_000u64.to_le_bytes());
        bytes.push(script.len() as u8);
        bytes.extend(script.as_bytes());
        bytes.extend([0x00; 4]); // locktime
        hex::encode(bytes)
    }

    #[test]
    fn round_trip_is_exact() {
        let hex_tx = encode(&sample_tx());
        let decoded = decode(&hex_tx).unwrap();
        assert_eq!(encode(&decoded), hex_tx);
    }

    #[test]
    fn zero_input_draft_round_trips_in_legacy_layout() {
        let hex_tx = zero_input_draft_hex();

        let tx = decode(&hex_tx).unwrap();
        assert_eq!(tx.version.0, 2);
        assert!(tx.input.is_empty());
        assert_eq!(tx.output.len(), 1);
        assert_eq!(tx.output[0].value, Amount::from_sat(500_000_000));
        assert_eq!(tx.output[0].script_pubkey, p2pkh_script(0xaa));

        // The empty input vector must come back out as a plain `00` count,
        // not as a witness marker/flag pair.
        let re_encoded = encode(&tx);
        assert_eq!(re_encoded, hex_tx);
        assert_eq!(&re_encoded[8..10], "00");
    }

    #[test]
    fn truncated_mid_output_is_malformed() {
        let hex_tx = encode(&sample_tx());
        // Chop into the final output's script bytes.
        let truncated = &hex_tx[..hex_tx.len() - 20];
        assert!(matches!(
            decode(truncated),
            Err(CodecError::Malformed(_))
        ));
    }

    #[test]
    fn truncated_zero_input_draft_is_malformed() {
        let hex_tx = zero_input_draft_hex();
        let truncated = &hex_tx[..hex_tx.len() - 12];
        assert!(matches!(
            decode(truncated),
            Err(CodecError::Malformed(_))
        ));
    }

    #[test]
    fn trailing_bytes_are_malformed() {
        let mut hex_tx = encode(&sample_tx());
        hex_tx.push_str("00");
        assert!(matches!(decode(&hex_tx), Err(CodecError::Malformed(_))));
    }

    #[test]
    fn invalid_hex_is_rejected() {
        assert!(matches!(decode("01zz"), Err(CodecError::Hex(_))));
    }

    #[test]
    fn patch_changes_only_targeted_script() {
        let mut tx = sample_tx();
        let before = sample_tx();
        let replacement = ScriptBuf::from_bytes(vec![0x51, 0x54, 0xbb]);

        patch_output_script(&mut tx, 0, replacement.clone()).unwrap();

        assert_eq!(tx.output[0].script_pubkey, replacement);
        assert_eq!(tx.output[0].value, before.output[0].value);
        assert_eq!(tx.output[1], before.output[1]);
        assert_eq!(tx.input, before.input);
        assert_eq!(tx.version, before.version);
        assert_eq!(tx.lock_time, before.lock_time);
    }

    #[test]
    fn patch_out_of_range_errors() {
        let mut tx = sample_tx();
        let err = patch_output_script(&mut tx, 2, ScriptBuf::new()).unwrap_err();
        assert!(matches!(
            err,
            CodecError::OutputIndex {
                index: 2,
                outputs: 2
            }
        ));
    }

    #[test]
    fn set_version_touches_version_only() {
        let mut tx = sample_tx();
        let before_hex = encode(&tx);
        set_version(&mut tx, 2);
        let after_hex = encode(&tx);

        assert_eq!(tx.version.0, 2);
        // Version is the first four little-endian bytes; the rest must match.
        assert_eq!(&after_hex[..8], "02000000");
        assert_eq!(&after_hex[8..], &before_hex[8..]);
    }
}
