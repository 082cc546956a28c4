//! Raw SPIR-V instructions and literal string encoding

use crate::{Error, Result};
use spirv::Op;

/// A single SPIR-V instruction kept as its raw operand words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// Opcode, kept raw so vendor opcodes survive a round trip
    pub opcode: u16,
    /// Operand words following the leading word
    pub operands: Vec<u32>,
    /// Word offset of the leading word in the binary it was parsed from
    pub offset: usize,
}

impl Instruction {
    /// Creates an instruction that was not parsed from a binary.
    pub fn new(op: Op, operands: Vec<u32>) -> Self {
        Instruction {
            opcode: op as u16,
            operands,
            offset: 0,
        }
    }

    /// Returns the decoded opcode, or `None` for opcodes unknown to the
    /// grammar in use.
    pub fn op(&self) -> Option<Op> {
        Op::from_u32(u32::from(self.opcode))
    }

    /// Returns the operand at `index`, if present.
    #[inline]
    pub fn operand(&self, index: usize) -> Option<u32> {
        self.operands.get(index).copied()
    }

    /// Returns the operands from `start` on, empty if there are none.
    pub fn tail(&self, start: usize) -> Vec<u32> {
        self.operands.get(start..).unwrap_or_default().to_vec()
    }

    /// Returns the operand at `index` or a parse error naming the opcode.
    pub(crate) fn require(&self, index: usize) -> Result<u32> {
        self.operand(index).ok_or_else(|| {
            Error::Parse(format!(
                "instruction {:?} at word {} is missing operand {}",
                self.op(),
                self.offset,
                index
            ))
        })
    }

    /// Decodes a literal string starting at operand `index`.
    ///
    /// Returns the string and the index of the first operand after it.
    pub(crate) fn string_at(&self, index: usize) -> Result<(String, usize)> {
        let words = self.operands.get(index..).unwrap_or(&[]);
        let (string, used) = decode_string(words).map_err(|err| match err {
            Error::Parse(reason) => Error::Parse(format!("{reason} at word {}", self.offset)),
            other => other,
        })?;
        Ok((string, index + used))
    }

    /// Total number of words, including the leading word.
    pub fn word_count(&self) -> usize {
        self.operands.len() + 1
    }

    /// Appends the encoded instruction to `out`.
    pub fn encode_into(&self, out: &mut Vec<u32>) {
        out.push(((self.word_count() as u32) << 16) | u32::from(self.opcode));
        out.extend_from_slice(&self.operands);
    }

    /// Returns the result id for instructions that appear in the global
    /// section of a module.
    pub(crate) fn global_result_id(&self) -> Option<u32> {
        use Op::*;
        match self.op()? {
            ExtInstImport | String | DecorationGroup | TypeVoid | TypeBool | TypeInt | TypeFloat
            | TypeVector | TypeMatrix | TypeImage | TypeSampler | TypeSampledImage | TypeArray
            | TypeRuntimeArray | TypeStruct | TypeOpaque | TypePointer | TypeFunction
            | TypeEvent | TypeDeviceEvent | TypeReserveId | TypeQueue | TypePipe
            | TypeAccelerationStructureKHR | TypeRayQueryKHR => self.operand(0),
            ConstantTrue | ConstantFalse | Constant | ConstantComposite | ConstantSampler
            | ConstantNull | SpecConstantTrue | SpecConstantFalse | SpecConstant
            | SpecConstantComposite | SpecConstantOp | Variable | Undef | Function => {
                self.operand(1)
            }
            _ => None,
        }
    }
}

/// Encodes `string` as a NUL-terminated, zero-padded literal.
pub fn encode_string(string: &str) -> Vec<u32> {
    let bytes = string.as_bytes();
    let mut words = Vec::with_capacity(bytes.len() / 4 + 1);
    let mut word = 0u32;
    for (i, &b) in bytes.iter().enumerate() {
        word |= u32::from(b) << ((i % 4) * 8);
        if i % 4 == 3 {
            words.push(word);
            word = 0;
        }
    }
    // The terminator always lands in the last word, alone if the length is a multiple of 4
    words.push(word);
    words
}

/// Decodes a literal string from the start of `words`.
///
/// Returns the string and the number of words it occupied.
pub fn decode_string(words: &[u32]) -> Result<(String, usize)> {
    let mut bytes = Vec::new();
    for (used, word) in words.iter().enumerate() {
        for byte in word.to_le_bytes() {
            if byte == 0 {
                let string = String::from_utf8(bytes)
                    .map_err(|_| Error::Parse("literal string is not valid UTF-8".into()))?;
                return Ok((string, used + 1));
            }
            bytes.push(byte);
        }
    }
    Err(Error::Parse("unterminated literal string".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_padding() {
        assert_eq!(encode_string(""), vec![0]);
        assert_eq!(encode_string("abc").len(), 1);
        assert_eq!(encode_string("abcd").len(), 2);
        assert_eq!(encode_string("main"), vec![0x6e69_616d, 0]);
    }

    #[test]
    fn test_decode_reports_words_used() {
        let mut words = encode_string("GLSL.std.450");
        words.push(0xdead_beef);
        let (string, used) = decode_string(&words).unwrap();
        assert_eq!(string, "GLSL.std.450");
        assert_eq!(used, 4);
    }

    #[test]
    fn test_unterminated_string() {
        let words = [u32::from_le_bytes(*b"abcd")];
        assert!(matches!(decode_string(&words), Err(Error::Parse(_))));
    }

    #[test]
    fn test_encode_leading_word() {
        let inst = Instruction::new(Op::Capability, vec![1]);
        let mut out = Vec::new();
        inst.encode_into(&mut out);
        assert_eq!(out, vec![(2 << 16) | 17, 1]);
    }
}
