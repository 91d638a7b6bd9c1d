//! Masked byte-pattern comparison shared by the signature detectors.

/// Check whether `(data[pos + i] & mask[i]) == pattern[i]` for every byte of the pattern.
///
/// A pattern that would run past the end of `data` never matches. Comparison stops
/// at the first mismatching byte. `pattern` and `mask` must have the same length.
#[inline]
pub fn matches_masked(data: &[u8], pos: usize, pattern: &[u8], mask: &[u8]) -> bool {
    debug_assert_eq!(pattern.len(), mask.len());

    let window = match data.get(pos..).and_then(|rest| rest.get(..pattern.len())) {
        Some(window) => window,
        None => return false,
    };

    window
        .iter()
        .zip(pattern.iter().zip(mask))
        .all(|(&byte, (&expected, &bits))| byte & bits == expected)
}

/// Fixed-length signature with per-byte "don't care" bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaskedPattern<const N: usize> {
    bytes: [u8; N],
    mask: [u8; N],
}

impl<const N: usize> MaskedPattern<N> {
    /// Build a pattern; template bits outside the mask are cleared so that a
    /// wildcard byte can be written as anything in the template.
    pub const fn new(bytes: [u8; N], mask: [u8; N]) -> Self {
        let mut normalized = bytes;
        let mut i = 0;
        while i < N {
            normalized[i] &= mask[i];
            i += 1;
        }
        Self {
            bytes: normalized,
            mask,
        }
    }

    /// Pattern with every bit significant
    pub const fn exact(bytes: [u8; N]) -> Self {
        Self::new(bytes, [0xFF; N])
    }

    pub const fn len(&self) -> usize {
        N
    }

    pub const fn is_empty(&self) -> bool {
        N == 0
    }

    pub fn bytes(&self) -> &[u8; N] {
        &self.bytes
    }

    pub fn mask(&self) -> &[u8; N] {
        &self.mask
    }

    #[inline]
    pub fn matches_at(&self, data: &[u8], pos: usize) -> bool {
        matches_masked(data, pos, &self.bytes, &self.mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_WILDCARDS: MaskedPattern<4> =
        MaskedPattern::new([0xAB, 0x99, 0x99, 0xCD], [0xFF, 0x00, 0x00, 0xFF]);

    #[test]
    fn test_wildcards_ignored() {
        assert!(TWO_WILDCARDS.matches_at(&[0xAB, 0x00, 0x00, 0xCD], 0));
        assert!(TWO_WILDCARDS.matches_at(&[0xAB, 0x12, 0xFE, 0xCD], 0));
        assert!(!TWO_WILDCARDS.matches_at(&[0xAB, 0x12, 0xFE, 0xCE], 0));
        // template bits under a zero mask are cleared
        assert_eq!(TWO_WILDCARDS.bytes()[1], 0);
    }

    #[test]
    fn test_partial_bit_mask() {
        // high nibble only
        let nibble = MaskedPattern::new([0xD0], [0xF0]);
        assert!(nibble.matches_at(&[0xD7], 0));
        assert!(!nibble.matches_at(&[0xE7], 0));
    }

    #[test]
    fn test_match_at_offset() {
        let data = [0x00, 0x00, 0xAB, 0x01, 0x02, 0xCD];
        assert!(!TWO_WILDCARDS.matches_at(&data, 0));
        assert!(TWO_WILDCARDS.matches_at(&data, 2));
    }

    #[test]
    fn test_pattern_past_end_never_matches() {
        let data = [0x00, 0xAB, 0x01, 0x02];
        assert!(!TWO_WILDCARDS.matches_at(&data, 1));
        assert!(!TWO_WILDCARDS.matches_at(&data, 4));
        assert!(!TWO_WILDCARDS.matches_at(&data, usize::MAX));
        assert!(!TWO_WILDCARDS.matches_at(&[], 0));
    }

    #[test]
    fn test_equivalent_to_masked_definition() {
        let pattern = MaskedPattern::exact([0x10, 0x20]);
        let data = [0x10, 0x20, 0x10, 0x10, 0x20, 0x30, 0x10];
        for pos in 0..=data.len() {
            let expected = pos + 2 <= data.len() && data[pos] == 0x10 && data[pos + 1] == 0x20;
            assert_eq!(pattern.matches_at(&data, pos), expected, "pos {}", pos);
        }
    }
}
