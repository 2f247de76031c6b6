//! Script qualification.
//!
//! Resolves the chain output script → redeem script → witness script down to
//! the script that actually locks the coins, checking each hash commitment
//! along the way and choosing the signature hashing version.

use crate::classify::{OutputData, OutputSolution, ScriptType};
use crate::interpreter::{ScriptFlags, SigVersion};
use crate::{Script, ScriptError};

/// Extra scripts and policy needed to sign an input.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SignData {
    redeem_script: Option<Script>,
    witness_script: Option<Script>,
    signature_policy: Option<ScriptFlags>,
}

impl SignData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Supply the redeem script for a P2SH output.
    pub fn with_redeem_script(mut self, script: Script) -> Self {
        self.redeem_script = Some(script);
        self
    }

    /// Supply the witness script for a P2WSH program.
    pub fn with_witness_script(mut self, script: Script) -> Self {
        self.witness_script = Some(script);
        self
    }

    /// Override the flags used to verify signatures.
    pub fn with_signature_policy(mut self, flags: ScriptFlags) -> Self {
        self.signature_policy = Some(flags);
        self
    }

    pub fn redeem_script(&self) -> Option<&Script> {
        self.redeem_script.as_ref()
    }

    pub fn witness_script(&self) -> Option<&Script> {
        self.witness_script.as_ref()
    }

    pub fn signature_policy(&self) -> Option<ScriptFlags> {
        self.signature_policy
    }
}

/// The final scriptSig and witness for an input.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SigValues {
    pub script_sig: Script,
    pub witness: Vec<Vec<u8>>,
}

/// An output script together with every script needed to reach the one
/// that is executed with signatures.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FullyQualifiedScript {
    spk: OutputData,
    redeem: Option<OutputData>,
    witness: Option<OutputData>,
    sign_script: OutputData,
    sig_version: SigVersion,
}

impl FullyQualifiedScript {
    /// Qualify an output script with its optional redeem and witness scripts.
    ///
    /// # Errors
    /// `MissingScript` if P2SH or P2WSH lacks its script,
    /// `ScriptHashMismatch` if a script does not hash to the committed value,
    /// `SuperfluousScript` if a script was given that nothing commits to.
    pub fn new(
        spk: OutputData,
        redeem: Option<OutputData>,
        witness: Option<OutputData>,
    ) -> Result<Self, ScriptError> {
        let mut sign_script = spk.clone();
        let mut sig_version = SigVersion::Base;

        if let OutputSolution::PayToScriptHash(hash) = spk.solution() {
            let rs = redeem
                .as_ref()
                .ok_or(ScriptError::MissingScript("redeem script"))?;
            if rs.script().script_hash() != *hash {
                return Err(ScriptError::ScriptHashMismatch("redeem script"));
            }
            sign_script = rs.clone();
        } else if redeem.is_some() {
            return Err(ScriptError::SuperfluousScript("redeem script"));
        }

        match sign_script.solution().clone() {
            OutputSolution::WitnessKeyHash(hash) => {
                sign_script = OutputData::decode(&Script::p2pkh(&hash));
                sig_version = SigVersion::WitnessV0;
                if witness.is_some() {
                    return Err(ScriptError::SuperfluousScript("witness script"));
                }
            }
            OutputSolution::WitnessScriptHash(hash) => {
                let ws = witness
                    .as_ref()
                    .ok_or(ScriptError::MissingScript("witness script"))?;
                if ws.script().witness_script_hash() != hash {
                    return Err(ScriptError::ScriptHashMismatch("witness script"));
                }
                sign_script = ws.clone();
                sig_version = SigVersion::WitnessV0;
            }
            _ => {
                if witness.is_some() {
                    return Err(ScriptError::SuperfluousScript("witness script"));
                }
            }
        }

        Ok(FullyQualifiedScript {
            spk,
            redeem,
            witness,
            sign_script,
            sig_version,
        })
    }

    /// Qualify an output script from the data already present on an input.
    ///
    /// The redeem script is the last scriptSig push and the witness script
    /// the last witness item. Either falls back to `sign_data` when the input
    /// is empty, and must agree with it when both are present. A script in
    /// `sign_data` that the output never reaches is `SuperfluousScript`.
    pub fn from_tx_data(
        script_pubkey: &Script,
        script_sig: &Script,
        witness: &[Vec<u8>],
        sign_data: &SignData,
    ) -> Result<Self, ScriptError> {
        let spk = OutputData::decode(script_pubkey);
        let sig_items = push_only_items(script_sig)?;

        let mut redeem = None;
        let mut solution = spk.solution().clone();
        if spk.script_type() == ScriptType::PayToScriptHash {
            let rs = find_script(
                sig_items.last(),
                sign_data.redeem_script(),
                "redeem script",
            )?;
            let rs_data = OutputData::decode(&rs);
            solution = rs_data.solution().clone();
            redeem = Some(rs_data);
        } else if sign_data.redeem_script().is_some() {
            return Err(ScriptError::SuperfluousScript("redeem script"));
        }

        let mut ws = None;
        if solution.script_type() == ScriptType::WitnessScriptHash {
            let script = find_script(witness.last(), sign_data.witness_script(), "witness script")?;
            ws = Some(OutputData::decode(&script));
        } else if sign_data.witness_script().is_some() {
            return Err(ScriptError::SuperfluousScript("witness script"));
        }

        Self::new(spk, redeem, ws)
    }

    pub fn script_pubkey(&self) -> &OutputData {
        &self.spk
    }

    pub fn redeem_script(&self) -> Option<&OutputData> {
        self.redeem.as_ref()
    }

    pub fn witness_script(&self) -> Option<&OutputData> {
        self.witness.as_ref()
    }

    /// The script evaluated with the signatures.
    pub fn sign_script(&self) -> &OutputData {
        &self.sign_script
    }

    pub fn sig_version(&self) -> SigVersion {
        self.sig_version
    }

    pub fn is_p2sh(&self) -> bool {
        self.redeem.is_some()
    }

    pub fn is_p2wsh(&self) -> bool {
        self.witness.is_some()
    }

    /// The type of the script at the level that carries the witness, if any.
    fn inner_type(&self) -> ScriptType {
        self.redeem
            .as_ref()
            .unwrap_or(&self.spk)
            .script_type()
    }

    /// Recover the stack the sign script runs against, without the trailing
    /// redeem or witness script.
    pub fn extract_stack(
        &self,
        script_sig: &Script,
        witness: &[Vec<u8>],
    ) -> Result<Vec<Vec<u8>>, ScriptError> {
        let mut items = push_only_items(script_sig)?;

        if let Some(rs) = &self.redeem {
            if items.last().map(Vec::as_slice) == Some(rs.script().to_bytes()) {
                items.pop();
            }
        }

        match self.inner_type() {
            ScriptType::WitnessKeyHash => items = witness.to_vec(),
            ScriptType::WitnessScriptHash => {
                items = witness.to_vec();
                if let Some(ws) = &self.witness {
                    if items.last().map(Vec::as_slice) == Some(ws.script().to_bytes()) {
                        items.pop();
                    }
                }
            }
            _ => {}
        }

        Ok(items)
    }

    /// Place `stack` into a scriptSig and witness, appending the redeem and
    /// witness scripts where the output requires them.
    pub fn encode_stack(&self, stack: Vec<Vec<u8>>) -> SigValues {
        let mut sig_items = Vec::new();
        let mut witness = Vec::new();

        match self.inner_type() {
            ScriptType::WitnessKeyHash => witness = stack,
            ScriptType::WitnessScriptHash => {
                witness = stack;
                if let Some(ws) = &self.witness {
                    witness.push(ws.script().to_bytes().to_vec());
                }
            }
            _ => sig_items = stack,
        }

        if let Some(rs) = &self.redeem {
            sig_items.push(rs.script().to_bytes().to_vec());
        }

        SigValues {
            script_sig: Script::push_all(&sig_items),
            witness,
        }
    }
}

fn push_only_items(script_sig: &Script) -> Result<Vec<Vec<u8>>, ScriptError> {
    if !script_sig.is_push_only() {
        return Err(ScriptError::Qualification(
            "signature script must be push only".to_string(),
        ));
    }
    script_sig.push_data_items()
}

fn find_script(
    found: Option<&Vec<u8>>,
    supplied: Option<&Script>,
    what: &'static str,
) -> Result<Script, ScriptError> {
    match (found, supplied) {
        (Some(bytes), Some(script)) => {
            if bytes.as_slice() != script.to_bytes() {
                return Err(ScriptError::Qualification(format!(
                    "extracted {} does not match sign data",
                    what
                )));
            }
            Ok(script.clone())
        }
        (Some(bytes), None) => Ok(Script::from_bytes(bytes)),
        (None, Some(script)) => Ok(script.clone()),
        (None, None) => Err(ScriptError::MissingScript(what)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use btc_primitives::ec::PrivateKey;

    fn key_script() -> Script {
        let key = PrivateKey::from_hex(
            "421c76d77563afa1914846b010bd164f395bd34c2102e5e99e0cb9cf173c1d87",
        )
        .unwrap();
        Script::p2pk(&key.pub_key())
    }

    fn data(script: &Script) -> OutputData {
        OutputData::decode(script)
    }

    #[test]
    fn test_plain_output() {
        let spk = key_script();
        let fqs = FullyQualifiedScript::new(data(&spk), None, None).unwrap();
        assert_eq!(fqs.sign_script().script(), &spk);
        assert_eq!(fqs.sig_version(), SigVersion::Base);
        assert!(!fqs.is_p2sh());

        let err = FullyQualifiedScript::new(data(&spk), Some(data(&spk)), None).unwrap_err();
        assert!(matches!(err, ScriptError::SuperfluousScript(_)));
        let err = FullyQualifiedScript::new(data(&spk), None, Some(data(&spk))).unwrap_err();
        assert!(matches!(err, ScriptError::SuperfluousScript(_)));
    }

    #[test]
    fn test_p2sh() {
        let rs = key_script();
        let spk = Script::p2sh(&rs.script_hash());

        let fqs = FullyQualifiedScript::new(data(&spk), Some(data(&rs)), None).unwrap();
        assert_eq!(fqs.sign_script().script(), &rs);
        assert!(fqs.is_p2sh());

        let err = FullyQualifiedScript::new(data(&spk), None, None).unwrap_err();
        assert!(matches!(err, ScriptError::MissingScript(_)));

        let other = Script::from_bytes(&[crate::opcodes::OP_1]);
        let err = FullyQualifiedScript::new(data(&spk), Some(data(&other)), None).unwrap_err();
        assert!(matches!(err, ScriptError::ScriptHashMismatch(_)));
    }

    #[test]
    fn test_witness_key_hash() {
        let hash = [0x5a; 20];
        let spk = Script::p2wpkh(&hash);
        let fqs = FullyQualifiedScript::new(data(&spk), None, None).unwrap();
        assert_eq!(fqs.sig_version(), SigVersion::WitnessV0);
        assert_eq!(fqs.sign_script().script(), &Script::p2pkh(&hash));

        // Nested in P2SH
        let spk = Script::p2sh(&Script::p2wpkh(&hash).script_hash());
        let fqs =
            FullyQualifiedScript::new(data(&spk), Some(data(&Script::p2wpkh(&hash))), None).unwrap();
        assert_eq!(fqs.sign_script().script(), &Script::p2pkh(&hash));
        assert_eq!(fqs.sig_version(), SigVersion::WitnessV0);
    }

    #[test]
    fn test_witness_script_hash() {
        let ws = key_script();
        let spk = Script::p2wsh(&ws.witness_script_hash());
        let fqs = FullyQualifiedScript::new(data(&spk), None, Some(data(&ws))).unwrap();
        assert_eq!(fqs.sign_script().script(), &ws);
        assert!(fqs.is_p2wsh());

        let err = FullyQualifiedScript::new(data(&spk), None, None).unwrap_err();
        assert!(matches!(err, ScriptError::MissingScript(_)));

        let other = Script::from_bytes(&[crate::opcodes::OP_1]);
        let err = FullyQualifiedScript::new(data(&spk), None, Some(data(&other))).unwrap_err();
        assert!(matches!(err, ScriptError::ScriptHashMismatch(_)));
    }

    #[test]
    fn test_encode_and_extract_p2sh_p2wsh() {
        let ws = key_script();
        let rs = Script::p2wsh(&ws.witness_script_hash());
        let spk = Script::p2sh(&rs.script_hash());
        let fqs = FullyQualifiedScript::new(data(&spk), Some(data(&rs)), Some(data(&ws))).unwrap();

        let sig = vec![0x30, 0x01, 0x01];
        let values = fqs.encode_stack(vec![sig.clone()]);
        assert_eq!(values.script_sig, Script::push_all(&[rs.to_bytes().to_vec()]));
        assert_eq!(values.witness, vec![sig.clone(), ws.to_bytes().to_vec()]);

        let stack = fqs.extract_stack(&values.script_sig, &values.witness).unwrap();
        assert_eq!(stack, vec![sig]);
    }

    #[test]
    fn test_encode_and_extract_p2sh() {
        let rs = key_script();
        let spk = Script::p2sh(&rs.script_hash());
        let fqs = FullyQualifiedScript::new(data(&spk), Some(data(&rs)), None).unwrap();

        let values = fqs.encode_stack(vec![vec![0x30, 0x02]]);
        assert!(values.witness.is_empty());
        let stack = fqs.extract_stack(&values.script_sig, &[]).unwrap();
        assert_eq!(stack, vec![vec![0x30, 0x02]]);
    }

    #[test]
    fn test_from_tx_data() {
        let ws = key_script();
        let spk = Script::p2wsh(&ws.witness_script_hash());

        // Recovered from the witness
        let witness = vec![vec![0x30], ws.to_bytes().to_vec()];
        let fqs =
            FullyQualifiedScript::from_tx_data(&spk, &Script::new(), &witness, &SignData::new())
                .unwrap();
        assert_eq!(fqs.sign_script().script(), &ws);

        // Supplied through sign data
        let sign_data = SignData::new().with_witness_script(ws.clone());
        let fqs = FullyQualifiedScript::from_tx_data(&spk, &Script::new(), &[], &sign_data).unwrap();
        assert_eq!(fqs.sign_script().script(), &ws);

        // Neither
        let err = FullyQualifiedScript::from_tx_data(&spk, &Script::new(), &[], &SignData::new())
            .unwrap_err();
        assert!(matches!(err, ScriptError::MissingScript(_)));

        // Disagreement
        let other = SignData::new().with_witness_script(Script::from_bytes(&[crate::opcodes::OP_1]));
        let err = FullyQualifiedScript::from_tx_data(&spk, &Script::new(), &witness, &other)
            .unwrap_err();
        assert!(matches!(err, ScriptError::Qualification(_)));

        let err = FullyQualifiedScript::from_tx_data(
            &spk,
            &Script::from_bytes(&[crate::opcodes::OP_DUP]),
            &witness,
            &SignData::new(),
        )
        .unwrap_err();
        assert!(matches!(err, ScriptError::Qualification(_)));
    }

    #[test]
    fn test_from_tx_data_rejects_unused_sign_data() {
        let spk = Script::p2pkh(&[0x11; 20]);
        let extra = Script::from_bytes(&[crate::opcodes::OP_1]);

        let cases = [
            (SignData::new().with_redeem_script(extra.clone()), "redeem script"),
            (SignData::new().with_witness_script(extra.clone()), "witness script"),
        ];
        for (sign_data, what) in cases {
            let err = FullyQualifiedScript::from_tx_data(&spk, &Script::new(), &[], &sign_data)
                .unwrap_err();
            assert!(matches!(err, ScriptError::SuperfluousScript(w) if w == what));
        }

        // P2SH wrapping P2WPKH never reaches a witness script
        let rs = Script::p2wpkh(&[0x11; 20]);
        let spk = Script::p2sh(&rs.script_hash());
        let sign_data = SignData::new()
            .with_redeem_script(rs)
            .with_witness_script(extra);
        let err =
            FullyQualifiedScript::from_tx_data(&spk, &Script::new(), &[], &sign_data).unwrap_err();
        assert!(matches!(err, ScriptError::SuperfluousScript("witness script")));
    }

    #[test]
    fn test_sign_data_builder() {
        let sd = SignData::new()
            .with_redeem_script(key_script())
            .with_signature_policy(ScriptFlags::P2SH);
        assert_eq!(sd.redeem_script(), Some(&key_script()));
        assert!(sd.witness_script().is_none());
        assert_eq!(sd.signature_policy(), Some(ScriptFlags::P2SH));
    }
}
