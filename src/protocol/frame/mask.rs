/// Unmask a frame payload in place. Applying the same mask twice restores the input.
#[inline]
pub fn apply_mask(buf: &mut [u8], mask: [u8; 4]) {
    apply_mask_fast32(buf, mask)
}

/// A safe unoptimized mask application.
#[inline]
fn apply_mask_fallback(buf: &mut [u8], mask: [u8; 4]) {
    for (i, byte) in buf.iter_mut().enumerate() {
        *byte ^= mask[i & 3];
    }
}

/// Faster version of `apply_mask()` which operates on 4-byte blocks.
#[inline]
fn apply_mask_fast32(buf: &mut [u8], mask: [u8; 4]) {
    let mask_u32 = u32::from_ne_bytes(mask);

    // SAFETY: every bit pattern is a valid u32.
    let (prefix, words, suffix) = unsafe { buf.align_to_mut::<u32>() };
    apply_mask_fallback(prefix, mask);
    let head = prefix.len() & 3;
    let mask_u32 = if head > 0 {
        if cfg!(target_endian = "big") {
            mask_u32.rotate_left(8 * head as u32)
        } else {
            mask_u32.rotate_right(8 * head as u32)
        }
    } else {
        mask_u32
    };
    for word in words.iter_mut() {
        *word ^= mask_u32;
    }
    apply_mask_fallback(suffix, mask_u32.to_ne_bytes());
}

/// Whether the key leaves the payload untouched.
#[inline]
pub(crate) fn is_noop(mask: [u8; 4]) -> bool {
    u32::from_ne_bytes(mask) == 0
}

#[cfg(test)]
mod tests {
    use super::{apply_mask, apply_mask_fallback, apply_mask_fast32, is_noop};

    #[test]
    fn test_apply_mask() {
        let mask = [0x6d, 0xb6, 0xb2, 0x80];
        let unmasked = [
            0xf3, 0x00, 0x01, 0x02, 0x03, 0x80, 0x81, 0x82, 0xff, 0xfe, 0x00, 0x17, 0x74, 0xf9,
            0x12, 0x03,
        ];

        // Check masking with proper alignment.
        {
            let mut masked = unmasked;
            apply_mask_fallback(&mut masked, mask);

            let mut masked_fast = unmasked;
            apply_mask_fast32(&mut masked_fast, mask);

            assert_eq!(masked, masked_fast);
        }

        // Check masking without alignment.
        {
            let mut masked = unmasked;
            apply_mask_fallback(&mut masked[1..], mask);

            let mut masked_fast = unmasked;
            apply_mask_fast32(&mut masked_fast[1..], mask);

            assert_eq!(masked, masked_fast);
        }
    }

    #[test]
    fn zero_mask_is_identity() {
        let original = b"The quick brown fox".to_vec();
        let mut data = original.clone();
        apply_mask(&mut data, [0; 4]);
        assert_eq!(data, original);
        assert!(is_noop([0; 4]));
        assert!(!is_noop([0, 0, 0, 1]));
    }

    #[test]
    fn masking_twice_restores() {
        let original: Vec<u8> = (0..=255u8).cycle().take(1031).collect();
        for offset in 0..4 {
            let mut data = original.clone();
            apply_mask(&mut data[offset..], [0x37, 0xfa, 0x21, 0x3d]);
            assert_ne!(data[offset..], original[offset..]);
            apply_mask(&mut data[offset..], [0x37, 0xfa, 0x21, 0x3d]);
            assert_eq!(data, original);
        }
    }

    #[test]
    fn masks_hello() {
        // RFC 6455 section 5.7, a masked "Hello".
        let mut data = [0x7f, 0x9f, 0x4d, 0x51, 0x58];
        apply_mask(&mut data, [0x37, 0xfa, 0x21, 0x3d]);
        assert_eq!(&data, b"Hello");
    }
}
