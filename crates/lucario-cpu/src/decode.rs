//! Instruction decoding: splitting a word into opcode, addressing mode,
//! and operand, and naming the 34 opcodes.

use lucario_core::{Error, Word};

/// How an instruction's operand digit group is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressingMode {
    Direct,
    Immediate,
    Indexed,
}

impl TryFrom<i64> for AddressingMode {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Direct),
            1 => Ok(Self::Immediate),
            2 => Ok(Self::Indexed),
            _ => Err(Error::InvalidInstruction("addressing mode out of range")),
        }
    }
}

/// The 34-opcode ISA.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Sum,
    Res,
    Mult,
    Divi,
    Load,
    Str,
    LoadRx,
    StrRx,
    Comp,
    JmpE,
    JmpNe,
    JmpLt,
    JmpLgt,
    Svc,
    Retrn,
    Hab,
    Dhab,
    Tti,
    Chmod,
    LoadRb,
    StrRb,
    LoadRl,
    StrRl,
    LoadSp,
    StrSp,
    Psh,
    Pop,
    J,
    SdmaP,
    SdmaC,
    SdmaS,
    SdmaIo,
    SdmaM,
    SdmaOn,
}

impl TryFrom<i64> for Opcode {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::Sum,
            1 => Self::Res,
            2 => Self::Mult,
            3 => Self::Divi,
            4 => Self::Load,
            5 => Self::Str,
            6 => Self::LoadRx,
            7 => Self::StrRx,
            8 => Self::Comp,
            9 => Self::JmpE,
            10 => Self::JmpNe,
            11 => Self::JmpLt,
            12 => Self::JmpLgt,
            13 => Self::Svc,
            14 => Self::Retrn,
            15 => Self::Hab,
            16 => Self::Dhab,
            17 => Self::Tti,
            18 => Self::Chmod,
            19 => Self::LoadRb,
            20 => Self::StrRb,
            21 => Self::LoadRl,
            22 => Self::StrRl,
            23 => Self::LoadSp,
            24 => Self::StrSp,
            25 => Self::Psh,
            26 => Self::Pop,
            27 => Self::J,
            28 => Self::SdmaP,
            29 => Self::SdmaC,
            30 => Self::SdmaS,
            31 => Self::SdmaIo,
            32 => Self::SdmaM,
            33 => Self::SdmaOn,
            _ => return Err(Error::InvalidInstruction("opcode out of range")),
        })
    }
}

/// A decoded instruction word, before the opcode/mode fields are validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedWord {
    pub opcode: i64,
    pub mode: i64,
    pub operand: i64,
}

/// Split an instruction word `OOMVVVVV` into its three fields. Never fails:
/// validation of the opcode/mode ranges happens when a unit actually needs
/// them, not at decode time.
#[must_use]
pub const fn decode(word: Word) -> DecodedWord {
    DecodedWord {
        opcode: word / 1_000_000,
        mode: (word / 100_000) % 10,
        operand: word % 100_000,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_splits_fields() {
        let d = decode(0410_0007);
        assert_eq!(d.opcode, 4);
        assert_eq!(d.mode, 1);
        assert_eq!(d.operand, 7);
    }

    #[test]
    fn decode_round_trips_with_compose() {
        for opcode in 0..34_i64 {
            for mode in 0..3_i64 {
                for operand in [0, 1, 99_999] {
                    let word = opcode * 1_000_000 + mode * 100_000 + operand;
                    let d = decode(word);
                    assert_eq!((d.opcode, d.mode, d.operand), (opcode, mode, operand));
                }
            }
        }
    }

    #[test]
    fn opcode_range_is_34_values() {
        assert!(Opcode::try_from(33).is_ok());
        assert!(Opcode::try_from(34).is_err());
    }

    #[test]
    fn addressing_mode_rejects_out_of_range() {
        assert!(AddressingMode::try_from(3).is_err());
    }
}
