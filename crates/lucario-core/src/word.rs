use crate::psw::ConditionCode;
use crate::{MAX_MAGNITUDE, MAX_WORD_VALUE, SIGN_BIT};

/// Whether `w` is a legal on-the-wire word: an integer in
/// `[0, MAX_WORD_VALUE]`.
#[must_use]
pub const fn is_valid_word(w: i64) -> bool {
    w >= 0 && w <= MAX_WORD_VALUE
}

/// Decode a sign-magnitude word into a signed integer.
///
/// Words at or above `SIGN_BIT` are negative; the magnitude is the
/// remainder. `SIGN_BIT` itself (redundant "−0") decodes to `0`.
#[must_use]
pub const fn word_to_int(w: i64) -> i64 {
    if w >= SIGN_BIT { -(w % SIGN_BIT) } else { w }
}

/// Encode a signed integer as a sign-magnitude word, reporting the
/// resulting condition code.
///
/// If `|n|` exceeds `MAX_MAGNITUDE` the magnitude wraps modulo
/// `MAX_MAGNITUDE + 1` and the condition code is `Overflow`; callers that
/// need the pre-wrap value for an `OVERFLOW` interrupt's auxiliary data
/// must capture `n` themselves before calling this. Redundant "−0" is
/// never produced: a magnitude of zero always encodes as plain `0`.
#[must_use]
pub fn int_to_word(n: i64) -> (i64, ConditionCode) {
    let magnitude = n.unsigned_abs() as i64;
    if magnitude > MAX_MAGNITUDE {
        let reduced = magnitude % (MAX_MAGNITUDE + 1);
        (encode(n.is_negative(), reduced), ConditionCode::Overflow)
    } else {
        let cc = match n.cmp(&0) {
            std::cmp::Ordering::Less => ConditionCode::Neg,
            std::cmp::Ordering::Equal => ConditionCode::Zero,
            std::cmp::Ordering::Greater => ConditionCode::Pos,
        };
        (encode(n.is_negative(), magnitude), cc)
    }
}

fn encode(negative: bool, magnitude: i64) -> i64 {
    if negative && magnitude != 0 {
        SIGN_BIT + magnitude
    } else {
        magnitude
    }
}
