//! Codeword stream interpretation: Text, Byte and Numeric compaction plus
//! ECI character-set switching.
//!
//! The stream starts at index 1 (index 0 is the Symbol Length Descriptor)
//! and is a sequence of compaction segments introduced by latch codewords.
//! Data codewords are `< 900`; a stream that opens with one is implicitly
//! in Text compaction.

use encoding_rs::Encoding;

use crate::{DecodeError, DecoderResult};

const TEXT_COMPACTION_MODE_LATCH: i32 = 900;
const BYTE_COMPACTION_MODE_LATCH: i32 = 901;
const NUMERIC_COMPACTION_MODE_LATCH: i32 = 902;
const MODE_SHIFT_TO_BYTE: i32 = 913;
const BYTE_COMPACTION_MODE_LATCH_6: i32 = 924;
const ECI_USER_DEFINED: i32 = 925;
const ECI_GENERAL_PURPOSE: i32 = 926;
const ECI_CHARSET: i32 = 927;
const BEGIN_MACRO_PDF417_OPTIONAL_FIELD: i32 = 923;
const BEGIN_MACRO_PDF417_CONTROL_BLOCK: i32 = 928;
const MACRO_PDF417_TERMINATOR: i32 = 922;

/// Numeric compaction works on groups of at most 15 codewords.
const MAX_NUMERIC_CODEWORDS: usize = 15;

/// Characters of the Mixed submode for values 10..=24.
const MIXED_CHARS: &[u8; 15] = b"&\r\t,:#-.$/+%*=^";

/// Characters of the Punctuation submode for values 0..=28.
const PUNCT_CHARS: &[u8; 29] = b";<>@[\\]_`~!\r\t,:\n-.$/\"|*()?{}'";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Submode {
    Alpha,
    Lower,
    Mixed,
    Punctuation,
}

/// Decode the corrected codeword stream into text and bytes.
///
/// `character_set` overrides the initial byte-compaction charset (an
/// `encoding_rs` label); the default interpretation is Latin-1. Macro
/// PDF417 control codewords are structural metadata for multi-symbol
/// reassembly, which this decoder does not perform; they fail the stream.
pub fn decode(
    codewords: &[i32],
    ec_level: i32,
    character_set: Option<&str>,
) -> Result<DecoderResult, DecodeError> {
    let mut out = Output::new(character_set)?;
    let limit = codewords[0] as usize;
    let mut code_index = 1usize;
    while code_index < limit {
        let code = codewords[code_index];
        code_index += 1;
        match code {
            TEXT_COMPACTION_MODE_LATCH => {
                code_index = text_compaction(codewords, code_index, &mut out);
            }
            BYTE_COMPACTION_MODE_LATCH | BYTE_COMPACTION_MODE_LATCH_6 => {
                code_index = byte_compaction(code, codewords, code_index, &mut out);
            }
            NUMERIC_COMPACTION_MODE_LATCH => {
                code_index = numeric_compaction(codewords, code_index, &mut out)?;
            }
            MODE_SHIFT_TO_BYTE => {
                if code_index < limit {
                    out.push_byte_segment(&[codewords[code_index] as u8]);
                    code_index += 1;
                }
            }
            ECI_CHARSET => {
                if code_index >= limit {
                    return Err(DecodeError::FormatError);
                }
                out.set_eci(codewords[code_index])?;
                code_index += 1;
            }
            ECI_GENERAL_PURPOSE => code_index += 2,
            ECI_USER_DEFINED => code_index += 1,
            BEGIN_MACRO_PDF417_CONTROL_BLOCK
            | BEGIN_MACRO_PDF417_OPTIONAL_FIELD
            | MACRO_PDF417_TERMINATOR => return Err(DecodeError::FormatError),
            _ if code < TEXT_COMPACTION_MODE_LATCH => {
                // data codeword without a latch: implicit Text compaction
                code_index = text_compaction(codewords, code_index - 1, &mut out);
            }
            _ => return Err(DecodeError::FormatError),
        }
    }
    if out.is_empty() {
        return Err(DecodeError::FormatError);
    }
    Ok(out.into_result(ec_level))
}

/// Text compaction: two base-30 values per codeword, interpreted through
/// the Alpha/Lower/Mixed/Punctuation submode automaton.
fn text_compaction(codewords: &[i32], mut code_index: usize, out: &mut Output) -> usize {
    let limit = codewords[0] as usize;
    let mut submode = Submode::Alpha;
    let mut shift: Option<Submode> = None;
    while code_index < limit {
        let code = codewords[code_index];
        code_index += 1;
        if code < TEXT_COMPACTION_MODE_LATCH {
            decode_text_value(code / 30, &mut submode, &mut shift, out);
            decode_text_value(code % 30, &mut submode, &mut shift, out);
        } else if code == TEXT_COMPACTION_MODE_LATCH {
            // also produced by padding codewords; resets the submode
            submode = Submode::Alpha;
            shift = None;
        } else if code == MODE_SHIFT_TO_BYTE {
            if code_index < limit {
                out.push_byte_segment(&[codewords[code_index] as u8]);
                code_index += 1;
            }
        } else {
            // any other latch returns control to the outer dispatch
            return code_index - 1;
        }
    }
    code_index
}

fn decode_text_value(
    value: i32,
    submode: &mut Submode,
    shift: &mut Option<Submode>,
    out: &mut Output,
) {
    let active = shift.take().unwrap_or(*submode);
    match active {
        Submode::Alpha => match value {
            0..=25 => out.push_text_byte(b'A' + value as u8),
            26 => out.push_text_byte(b' '),
            27 => *submode = Submode::Lower,
            28 => *submode = Submode::Mixed,
            _ => *shift = Some(Submode::Punctuation),
        },
        Submode::Lower => match value {
            0..=25 => out.push_text_byte(b'a' + value as u8),
            26 => out.push_text_byte(b' '),
            27 => *shift = Some(Submode::Alpha),
            28 => *submode = Submode::Mixed,
            _ => *shift = Some(Submode::Punctuation),
        },
        Submode::Mixed => match value {
            0..=9 => out.push_text_byte(b'0' + value as u8),
            10..=24 => out.push_text_byte(MIXED_CHARS[value as usize - 10]),
            25 => *submode = Submode::Punctuation,
            26 => out.push_text_byte(b' '),
            27 => *submode = Submode::Lower,
            28 => *submode = Submode::Alpha,
            _ => *shift = Some(Submode::Punctuation),
        },
        Submode::Punctuation => match value {
            0..=28 => out.push_text_byte(PUNCT_CHARS[value as usize]),
            _ => *submode = Submode::Alpha,
        },
    }
}

/// Byte compaction: groups of 5 codewords hold 6 bytes base 900. With the
/// 901 latch the trailing partial group is one byte per codeword; with the
/// 924 latch the byte count is a multiple of 6 and every group is full.
fn byte_compaction(mode: i32, codewords: &[i32], mut code_index: usize, out: &mut Output) -> usize {
    let limit = codewords[0] as usize;
    let mut decoded_bytes: Vec<u8> = Vec::new();
    let mut value: u64 = 0;
    let mut count = 0usize;
    let mut end = false;

    if mode == BYTE_COMPACTION_MODE_LATCH {
        if code_index >= limit {
            return code_index;
        }
        let mut group = [0i32; 5];
        let mut next_code = codewords[code_index];
        code_index += 1;
        while code_index < limit && !end {
            group[count] = next_code;
            count += 1;
            value = 900 * value + next_code as u64;
            next_code = codewords[code_index];
            code_index += 1;
            if is_mode_latch(next_code) {
                code_index -= 1;
                end = true;
            } else if count % 5 == 0 {
                for j in 0..6 {
                    decoded_bytes.push((value >> (8 * (5 - j))) as u8);
                }
                value = 0;
                count = 0;
            }
        }
        // the final codeword of the stream still belongs to this segment
        if code_index == limit && next_code < TEXT_COMPACTION_MODE_LATCH {
            group[count] = next_code;
            count += 1;
        }
        // a trailing partial group is stored one byte per codeword
        for &code in group.iter().take(count) {
            decoded_bytes.push(code as u8);
        }
    } else {
        while code_index < limit && !end {
            let code = codewords[code_index];
            code_index += 1;
            if code < TEXT_COMPACTION_MODE_LATCH {
                count += 1;
                value = 900 * value + code as u64;
            } else if is_mode_latch(code) {
                code_index -= 1;
                end = true;
            }
            if count % 5 == 0 && count > 0 {
                for j in 0..6 {
                    decoded_bytes.push((value >> (8 * (5 - j))) as u8);
                }
                value = 0;
                count = 0;
            }
        }
    }

    out.push_byte_segment(&decoded_bytes);
    code_index
}

fn is_mode_latch(code: i32) -> bool {
    matches!(
        code,
        TEXT_COMPACTION_MODE_LATCH
            | BYTE_COMPACTION_MODE_LATCH
            | BYTE_COMPACTION_MODE_LATCH_6
            | NUMERIC_COMPACTION_MODE_LATCH
            | MODE_SHIFT_TO_BYTE
            | ECI_CHARSET
            | BEGIN_MACRO_PDF417_CONTROL_BLOCK
            | BEGIN_MACRO_PDF417_OPTIONAL_FIELD
            | MACRO_PDF417_TERMINATOR
    )
}

/// Numeric compaction: each group of up to 15 codewords is one base-900
/// integer whose decimal expansion, leading `1` stripped, is the digit run.
fn numeric_compaction(
    codewords: &[i32],
    mut code_index: usize,
    out: &mut Output,
) -> Result<usize, DecodeError> {
    let limit = codewords[0] as usize;
    let mut group: Vec<i32> = Vec::with_capacity(MAX_NUMERIC_CODEWORDS);
    let mut end = false;
    while code_index < limit && !end {
        let code = codewords[code_index];
        code_index += 1;
        if code_index == limit {
            end = true;
        }
        if code < TEXT_COMPACTION_MODE_LATCH {
            group.push(code);
        } else if is_mode_latch(code) {
            code_index -= 1;
            end = true;
        }
        if (group.len() % MAX_NUMERIC_CODEWORDS == 0
            || code == NUMERIC_COMPACTION_MODE_LATCH
            || end)
            && !group.is_empty()
        {
            let digits = decode_base900_to_base10(&group)?;
            for digit in digits.bytes() {
                out.push_text_byte(digit);
            }
            group.clear();
        }
    }
    Ok(code_index)
}

fn decode_base900_to_base10(group: &[i32]) -> Result<String, DecodeError> {
    type Big = bnum::BUintD32<6>;
    let nine_hundred = Big::from(900u32);
    let mut value = Big::ZERO;
    for &code in group {
        value = value * nine_hundred + Big::from(code as u32);
    }
    let digits = value.to_string();
    let Some(stripped) = digits.strip_prefix('1') else {
        return Err(DecodeError::FormatError);
    };
    Ok(stripped.to_owned())
}

/// Accumulates the decoded payload: readable text plus the raw byte stream,
/// with byte segments converted through the active ECI character set.
struct Output {
    text: String,
    bytes: Vec<u8>,
    /// `None` means Latin-1 (the symbology default).
    encoding: Option<&'static Encoding>,
}

impl Output {
    fn new(character_set: Option<&str>) -> Result<Self, DecodeError> {
        let encoding = match character_set {
            None => None,
            Some(label) => Some(
                Encoding::for_label(label.as_bytes()).ok_or(DecodeError::FormatError)?,
            ),
        };
        Ok(Self {
            text: String::new(),
            bytes: Vec::new(),
            encoding,
        })
    }

    fn push_text_byte(&mut self, byte: u8) {
        self.text.push(char::from(byte));
        self.bytes.push(byte);
    }

    fn push_byte_segment(&mut self, segment: &[u8]) {
        match self.encoding {
            None => self.text.extend(segment.iter().map(|&b| char::from(b))),
            Some(encoding) => {
                let (decoded, _, _) = encoding.decode(segment);
                self.text.push_str(&decoded);
            }
        }
        self.bytes.extend_from_slice(segment);
    }

    fn set_eci(&mut self, value: i32) -> Result<(), DecodeError> {
        if !(0..=899).contains(&value) {
            return Err(DecodeError::FormatError);
        }
        self.encoding = charset_for_eci(value);
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.text.is_empty() && self.bytes.is_empty()
    }

    fn into_result(self, ec_level: i32) -> DecoderResult {
        DecoderResult {
            text: self.text,
            bytes: self.bytes,
            errors_corrected: 0,
            erasures: 0,
            ec_level: ec_level as u8,
        }
    }
}

/// Character set for an ECI assignment number. Latin-1 family entries that
/// `encoding_rs` does not carry fall back to Latin-1 (`None`).
fn charset_for_eci(value: i32) -> Option<&'static Encoding> {
    use encoding_rs::*;
    match value {
        4 => Some(ISO_8859_2),
        5 => Some(ISO_8859_3),
        6 => Some(ISO_8859_4),
        7 => Some(ISO_8859_5),
        8 => Some(ISO_8859_6),
        9 => Some(ISO_8859_7),
        10 => Some(ISO_8859_8),
        12 => Some(ISO_8859_10),
        15 => Some(ISO_8859_13),
        16 => Some(ISO_8859_14),
        17 => Some(ISO_8859_15),
        18 => Some(ISO_8859_16),
        20 => Some(SHIFT_JIS),
        21 => Some(WINDOWS_1250),
        22 => Some(WINDOWS_1251),
        23 => Some(WINDOWS_1252),
        24 => Some(WINDOWS_1256),
        25 => Some(UTF_16BE),
        26 => Some(UTF_8),
        28 => Some(BIG5),
        29 => Some(GB18030),
        30 => Some(EUC_KR),
        _ => None,
    }
}
