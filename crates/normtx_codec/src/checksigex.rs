//! CHECKSIGEX spending-condition construction.
//!
//! The upgrade takes a standard pay-to-pubkey-hash script and rewrites its
//! tail: the final `OP_CHECKSIG` is trimmed off and replaced by a small-int
//! mode parameter plus the extended verification opcode. Mode 4 selects
//! single-signature, non-strict verify, normalized-hash behaviour in the
//! target node.

use bitcoin::opcodes::all::OP_CHECKSIG;
use bitcoin::{Script, ScriptBuf};

use crate::error::{CodecError, Result};

/// Extended verification opcode understood by the normalized-txid node.
/// First unassigned byte after the NOP range in its script table.
pub const OP_CHECKSIGEX: u8 = 0xbb;

/// CHECKSIGEX mode 4: single signature, no verify semantics, normalize.
pub const SIGMODE_SINGLE_NORMALIZED: u8 = 4;

/// OP_PUSHNUM_4, the script encoding of the mode parameter.
const OP_PUSHNUM_4: u8 = 0x54;

/// Rewrite a pay-to-pubkey-hash script into its CHECKSIGEX equivalent.
///
/// Trims the trailing `OP_CHECKSIG` and appends `OP_PUSHNUM_4 OP_CHECKSIGEX`.
/// Everything before the final opcode is preserved byte-for-byte, so the
/// hash-comparison prefix of the condition is unchanged.
pub fn upgrade_to_checksigex(script: &Script) -> Result<ScriptBuf> {
    let bytes = script.as_bytes();
    match bytes.last() {
        Some(&op) if op == OP_CHECKSIG.to_u8() => {}
        _ => {
            return Err(CodecError::UnexpectedScript(format!(
                "expected a script ending in OP_CHECKSIG, got {}",
                hex::encode(bytes),
            )))
        }
    }

    let mut upgraded = bytes[..bytes.len() - 1].to_vec();
    upgraded.push(OP_PUSHNUM_4);
    upgraded.push(OP_CHECKSIGEX);
    Ok(ScriptBuf::from_bytes(upgraded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::hashes::Hash;
    use bitcoin::PubkeyHash;

    fn p2pkh_script() -> ScriptBuf {
        ScriptBuf::new_p2pkh(&PubkeyHash::from_byte_array([0xab; 20]))
    }

    #[test]
    fn upgrade_preserves_prefix_and_appends_mode() {
        let original = p2pkh_script();
        let upgraded = upgrade_to_checksigex(&original).unwrap();

        let orig = original.as_bytes();
        let up = upgraded.as_bytes();

        // One byte trimmed, two appended.
        assert_eq!(up.len(), orig.len() + 1);
        assert_eq!(&up[..orig.len() - 1], &orig[..orig.len() - 1]);
        assert_eq!(up[up.len() - 2], OP_PUSHNUM_4);
        assert_eq!(up[up.len() - 1], OP_CHECKSIGEX);
    }

    #[test]
    fn upgrade_rejects_non_checksig_tail() {
        // P2WPKH: OP_0 <20 bytes>, no trailing OP_CHECKSIG.
        let mut bytes = vec![0x00, 0x14];
        bytes.extend([0xab; 20]);
        let script = ScriptBuf::from_bytes(bytes);

        assert!(matches!(
            upgrade_to_checksigex(&script),
            Err(CodecError::UnexpectedScript(_))
        ));
    }

    #[test]
    fn upgrade_rejects_empty_script() {
        assert!(upgrade_to_checksigex(Script::new()).is_err());
    }

    #[test]
    fn mode_parameter_is_pushnum_encoding_of_four() {
        assert_eq!(OP_PUSHNUM_4, 0x50 + SIGMODE_SINGLE_NORMALIZED);
    }
}
