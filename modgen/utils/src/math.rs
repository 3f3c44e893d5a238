//! Bit-width arithmetic used when coercing integers into hardware types.

/// Number of bits needed to represent `n` as an unsigned number. Zero needs
/// zero bits.
pub fn unsigned_bits(n: u128) -> u64 {
    (128 - n.leading_zeros()) as u64
}

/// Number of bits needed to represent `n` in two's complement, including the
/// sign bit.
pub fn signed_bits(n: i128) -> u64 {
    if n >= 0 {
        unsigned_bits(n as u128) + 1
    } else {
        // !n is non-negative and has the same magnitude bits as n.
        unsigned_bits(!n as u128) + 1
    }
}
