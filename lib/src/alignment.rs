/// Align `value` down to the nearest multiple of `alignment` (a power of two).
/// If `alignment` is zero, the input is returned unchanged.
#[inline(always)]
pub const fn align_down(value: usize, alignment: usize) -> usize {
    if alignment == 0 {
        return value;
    }
    value & !(alignment - 1)
}

/// Align `value` up to the nearest multiple of `alignment` (a power of two).
/// Saturates instead of wrapping near `usize::MAX`.
#[inline(always)]
pub const fn align_up(value: usize, alignment: usize) -> usize {
    if alignment == 0 {
        return value;
    }
    let adjusted = value.saturating_add(alignment - 1);
    adjusted & !(alignment - 1)
}

#[inline(always)]
pub const fn is_aligned(value: usize, alignment: usize) -> bool {
    alignment == 0 || value & (alignment - 1) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_to_granule() {
        assert_eq!(align_up(1, 8), 8);
        assert_eq!(align_up(8, 8), 8);
        assert_eq!(align_up(100, 8), 104);
        assert_eq!(align_down(0x1007, 0x10), 0x1000);
        assert_eq!(align_up(usize::MAX, 8), usize::MAX & !7);
        assert!(is_aligned(0x40, 8));
        assert!(!is_aligned(0x44, 8));
    }
}
