//! Script verification flags (bitmask).

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

/// Script verification flags controlling interpreter behavior.
#[derive(Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct ScriptFlags(pub u32);

impl ScriptFlags {
    pub const NONE: ScriptFlags = ScriptFlags(0);
    /// Evaluate P2SH subscripts (BIP16).
    pub const P2SH: ScriptFlags = ScriptFlags(1 << 0);
    /// Require defined hash types and valid public key encodings.
    pub const STRICTENC: ScriptFlags = ScriptFlags(1 << 1);
    /// Require strict DER signatures (BIP66).
    pub const DERSIG: ScriptFlags = ScriptFlags(1 << 2);
    /// Require S in the lower half of the curve order (BIP62 rule 5).
    pub const LOW_S: ScriptFlags = ScriptFlags(1 << 3);
    /// Require the extra OP_CHECKMULTISIG stack item to be empty (BIP147).
    pub const NULLDUMMY: ScriptFlags = ScriptFlags(1 << 4);
    /// Require scriptSig to be push-only.
    pub const SIGPUSHONLY: ScriptFlags = ScriptFlags(1 << 5);
    /// Require minimal push and number encodings.
    pub const MINIMALDATA: ScriptFlags = ScriptFlags(1 << 6);
    /// Fail on the OP_NOPs reserved for soft forks.
    pub const DISCOURAGE_UPGRADABLE_NOPS: ScriptFlags = ScriptFlags(1 << 7);
    /// Require exactly one stack element after evaluation.
    pub const CLEANSTACK: ScriptFlags = ScriptFlags(1 << 8);
    /// Enable OP_CHECKLOCKTIMEVERIFY (BIP65).
    pub const CHECKLOCKTIMEVERIFY: ScriptFlags = ScriptFlags(1 << 9);
    /// Enable OP_CHECKSEQUENCEVERIFY (BIP112).
    pub const CHECKSEQUENCEVERIFY: ScriptFlags = ScriptFlags(1 << 10);
    /// Verify witness programs (BIP141).
    pub const WITNESS: ScriptFlags = ScriptFlags(1 << 11);
    /// Fail on witness versions reserved for soft forks.
    pub const DISCOURAGE_UPGRADABLE_WITNESS_PROGRAM: ScriptFlags = ScriptFlags(1 << 12);
    /// Require the OP_IF/OP_NOTIF argument in witness scripts to be empty or 0x01.
    pub const MINIMALIF: ScriptFlags = ScriptFlags(1 << 13);
    /// Require failed signature checks to use an empty signature.
    pub const NULLFAIL: ScriptFlags = ScriptFlags(1 << 14);
    /// Require compressed public keys in witness v0 scripts.
    pub const WITNESS_PUBKEYTYPE: ScriptFlags = ScriptFlags(1 << 15);

    /// Flags every block has been validated with since segwit activation.
    pub const MANDATORY: ScriptFlags = ScriptFlags(
        Self::P2SH.0
            | Self::DERSIG.0
            | Self::NULLDUMMY.0
            | Self::CHECKLOCKTIMEVERIFY.0
            | Self::CHECKSEQUENCEVERIFY.0
            | Self::WITNESS.0,
    );

    /// Relay policy: mandatory flags plus the malleability and upgrade rules.
    pub const STANDARD: ScriptFlags = ScriptFlags(
        Self::MANDATORY.0
            | Self::STRICTENC.0
            | Self::MINIMALDATA.0
            | Self::DISCOURAGE_UPGRADABLE_NOPS.0
            | Self::CLEANSTACK.0
            | Self::MINIMALIF.0
            | Self::NULLFAIL.0
            | Self::LOW_S.0
            | Self::DISCOURAGE_UPGRADABLE_WITNESS_PROGRAM.0
            | Self::WITNESS_PUBKEYTYPE.0,
    );

    const NAMES: [(ScriptFlags, &'static str); 16] = [
        (Self::P2SH, "P2SH"),
        (Self::STRICTENC, "STRICTENC"),
        (Self::DERSIG, "DERSIG"),
        (Self::LOW_S, "LOW_S"),
        (Self::NULLDUMMY, "NULLDUMMY"),
        (Self::SIGPUSHONLY, "SIGPUSHONLY"),
        (Self::MINIMALDATA, "MINIMALDATA"),
        (Self::DISCOURAGE_UPGRADABLE_NOPS, "DISCOURAGE_UPGRADABLE_NOPS"),
        (Self::CLEANSTACK, "CLEANSTACK"),
        (Self::CHECKLOCKTIMEVERIFY, "CHECKLOCKTIMEVERIFY"),
        (Self::CHECKSEQUENCEVERIFY, "CHECKSEQUENCEVERIFY"),
        (Self::WITNESS, "WITNESS"),
        (
            Self::DISCOURAGE_UPGRADABLE_WITNESS_PROGRAM,
            "DISCOURAGE_UPGRADABLE_WITNESS_PROGRAM",
        ),
        (Self::MINIMALIF, "MINIMALIF"),
        (Self::NULLFAIL, "NULLFAIL"),
        (Self::WITNESS_PUBKEYTYPE, "WITNESS_PUBKEYTYPE"),
    ];

    pub fn has_flag(self, flag: ScriptFlags) -> bool {
        self.0 & flag.0 == flag.0
    }

    pub fn has_any(self, flags: &[ScriptFlags]) -> bool {
        flags.iter().any(|f| self.has_flag(*f))
    }

    pub fn add_flag(&mut self, flag: ScriptFlags) {
        self.0 |= flag.0;
    }

    /// Parse a comma separated list of flag names, e.g. `"P2SH,WITNESS"`.
    ///
    /// An empty string or `"NONE"` yields no flags.
    pub fn from_names(names: &str) -> Option<ScriptFlags> {
        let mut flags = ScriptFlags::NONE;
        for name in names.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            if name == "NONE" {
                continue;
            }
            let (flag, _) = Self::NAMES.iter().find(|(_, n)| *n == name)?;
            flags |= *flag;
        }
        Some(flags)
    }
}

impl fmt::Debug for ScriptFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = Self::NAMES
            .iter()
            .filter(|(flag, _)| self.has_flag(*flag))
            .map(|(_, n)| *n)
            .collect();
        write!(f, "ScriptFlags({})", names.join("|"))
    }
}

impl BitOr for ScriptFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        ScriptFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for ScriptFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for ScriptFlags {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        ScriptFlags(self.0 & rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_names() {
        let flags = ScriptFlags::from_names("P2SH, WITNESS").unwrap();
        assert!(flags.has_flag(ScriptFlags::P2SH));
        assert!(flags.has_flag(ScriptFlags::WITNESS));
        assert!(!flags.has_flag(ScriptFlags::DERSIG));
        assert_eq!(ScriptFlags::from_names("").unwrap(), ScriptFlags::NONE);
        assert_eq!(ScriptFlags::from_names("NONE").unwrap(), ScriptFlags::NONE);
        assert!(ScriptFlags::from_names("P2SH,BOGUS").is_none());
    }

    #[test]
    fn test_standard_contains_mandatory() {
        assert!(ScriptFlags::STANDARD.has_flag(ScriptFlags::MANDATORY));
        assert_eq!(
            format!("{:?}", ScriptFlags::P2SH | ScriptFlags::LOW_S),
            "ScriptFlags(P2SH|LOW_S)"
        );
    }
}
