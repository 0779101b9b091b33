//! Stateless arithmetic/logic primitives.
//!
//! Every operation takes two 16-bit operands and writes the flags it
//! defines into the caller's [`Flags`]; the caller decides where the
//! result goes.

use crate::cpu::registers::Flags;

/// Modular 16-bit addition. CF is set on unsigned overflow.
pub fn add(a: u16, b: u16, flags: &mut Flags) -> u16 {
    let wide = u32::from(a) + u32::from(b);
    let result = wide as u16;

    flags.cf = wide > 0xFFFF;
    flags.zf = result == 0;

    result
}

/// Modular 16-bit subtraction. CF is set on borrow (a < b unsigned).
pub fn sub(a: u16, b: u16, flags: &mut Flags) -> u16 {
    let result = a.wrapping_sub(b);

    flags.cf = a < b;
    flags.zf = result == 0;

    result
}

/// Bitwise AND. CF is always cleared.
pub fn and(a: u16, b: u16, flags: &mut Flags) -> u16 {
    let result = a & b;

    flags.cf = false;
    flags.zf = result == 0;

    result
}

/// Bitwise OR. CF is always cleared.
pub fn or(a: u16, b: u16, flags: &mut Flags) -> u16 {
    let result = a | b;

    flags.cf = false;
    flags.zf = result == 0;

    result
}

/// Bitwise XOR. CF is always cleared.
pub fn xor(a: u16, b: u16, flags: &mut Flags) -> u16 {
    let result = a ^ b;

    flags.cf = false;
    flags.zf = result == 0;

    result
}

/// Compare: the flag contract of [`sub`] without a result.
pub fn cmp(a: u16, b: u16, flags: &mut Flags) {
    flags.zf = a == b;
    flags.cf = a < b;
}

/// Pass-through move. Leaves CF untouched; the caller sets ZF from the
/// moved value.
#[inline]
pub fn mov(b: u16) -> u16 {
    b
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn add_matches_modular_sum(a: u16, b: u16) {
            let mut flags = Flags::default();
            let result = add(a, b, &mut flags);

            prop_assert_eq!(result, a.wrapping_add(b));
            prop_assert_eq!(flags.cf, u32::from(a) + u32::from(b) > 0xFFFF);
            prop_assert_eq!(flags.zf, result == 0);
        }

        #[test]
        fn sub_matches_modular_difference(a: u16, b: u16) {
            let mut flags = Flags::default();
            let result = sub(a, b, &mut flags);

            prop_assert_eq!(result, a.wrapping_sub(b));
            prop_assert_eq!(flags.cf, a < b);
            prop_assert_eq!(flags.zf, result == 0);
        }

        #[test]
        fn cmp_sets_the_sub_flags(a: u16, b: u16) {
            let mut sub_flags = Flags::default();
            sub(a, b, &mut sub_flags);

            let mut cmp_flags = Flags::default();
            cmp(a, b, &mut cmp_flags);

            prop_assert_eq!(cmp_flags, sub_flags);
        }

        #[test]
        fn bitwise_ops_clear_carry(a: u16, b: u16) {
            let ops: [fn(u16, u16, &mut Flags) -> u16; 3] = [and, or, xor];
            for op in ops {
                let mut flags = Flags { zf: false, cf: true };
                let result = op(a, b, &mut flags);

                prop_assert!(!flags.cf);
                prop_assert_eq!(flags.zf, result == 0);
            }
        }
    }

    #[test]
    fn add_wraps_and_carries() {
        let mut flags = Flags::default();
        let result = add(0xFFFF, 1, &mut flags);

        assert_eq!(result, 0);
        assert!(flags.cf);
        assert!(flags.zf);
    }

    #[test]
    fn sub_borrows_on_underflow() {
        let mut flags = Flags::default();
        let result = sub(0, 1, &mut flags);

        assert_eq!(result, 0xFFFF);
        assert!(flags.cf);
        assert!(!flags.zf);
    }

    #[test]
    fn mov_is_a_pass_through() {
        assert_eq!(mov(0xABCD), 0xABCD);
    }
}
