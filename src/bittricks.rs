/*!
bit packing.

Per-stage usage is stored as one 2-bit field per shader stage in a single `u32`, field `n`
occupying bits `2n..2n+2`.
*/

pub const FIELD_BITS: u32 = 2;
const FIELD_MASK: u32 = 0b11;

/// `value` placed in 2-bit field `field`.  Bits of `value` above the low two are discarded.
pub fn pack_2bit(field: u32, value: u8) -> u32 {
    debug_assert!(field < 32 / FIELD_BITS);
    ((value as u32) & FIELD_MASK) << (field * FIELD_BITS)
}

pub fn unpack_2bit(packed: u32, field: u32) -> u8 {
    debug_assert!(field < 32 / FIELD_BITS);
    ((packed >> (field * FIELD_BITS)) & FIELD_MASK) as u8
}
