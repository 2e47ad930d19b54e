use alloy_primitives::{hex, keccak256, Bytes, Selector};

/// Selector of `queueTransaction(address,uint256,string,bytes,uint256)`.
pub const TIMELOCK_QUEUE_SELECTOR: Selector = Selector::new(hex!("3a66f901"));

/// Selector of `executeTransaction(address,uint256,string,bytes,uint256)`.
pub const TIMELOCK_EXECUTE_SELECTOR: Selector = Selector::new(hex!("0825f38f"));

/// Derives the 4-byte function selector from a canonical signature.
pub fn selector(signature: &str) -> Selector {
    Selector::from_slice(&keccak256(signature.as_bytes())[..4])
}

/// Replaces the selector at the head of `data`, returning `None` when the
/// calldata does not start with `from`.
///
/// The substitution is deliberately restricted to the 4-byte head: the same
/// byte sequence may legitimately occur inside argument data, and must never
/// be touched there.
pub fn substitute_selector(data: &[u8], from: Selector, to: Selector) -> Option<Bytes> {
    if data.len() < 4 || data[..4] != from[..] {
        return None;
    }
    let mut out = Vec::with_capacity(data.len());
    out.extend_from_slice(to.as_slice());
    out.extend_from_slice(&data[4..]);
    Some(out.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timelock_selectors_match_signatures() {
        assert_eq!(
            selector("queueTransaction(address,uint256,string,bytes,uint256)"),
            TIMELOCK_QUEUE_SELECTOR
        );
        assert_eq!(
            selector("executeTransaction(address,uint256,string,bytes,uint256)"),
            TIMELOCK_EXECUTE_SELECTOR
        );
    }

    #[test]
    fn substitutes_head_selector_only() {
        // queue selector recurs inside the argument data and must survive
        let mut data = TIMELOCK_QUEUE_SELECTOR.to_vec();
        data.extend_from_slice(TIMELOCK_QUEUE_SELECTOR.as_slice());
        let out =
            substitute_selector(&data, TIMELOCK_QUEUE_SELECTOR, TIMELOCK_EXECUTE_SELECTOR)
                .unwrap();
        assert_eq!(&out[..4], TIMELOCK_EXECUTE_SELECTOR.as_slice());
        assert_eq!(&out[4..], TIMELOCK_QUEUE_SELECTOR.as_slice());
    }

    #[test]
    fn substitution_is_a_no_op_detector_when_applied_twice() {
        let mut data = TIMELOCK_QUEUE_SELECTOR.to_vec();
        data.extend_from_slice(&[0xaa; 32]);
        let once =
            substitute_selector(&data, TIMELOCK_QUEUE_SELECTOR, TIMELOCK_EXECUTE_SELECTOR)
                .unwrap();
        assert!(
            substitute_selector(&once, TIMELOCK_QUEUE_SELECTOR, TIMELOCK_EXECUTE_SELECTOR)
                .is_none()
        );
    }

    #[test]
    fn leaves_foreign_calldata_alone() {
        assert!(substitute_selector(
            &[0x01, 0x02, 0x03, 0x04, 0x05],
            TIMELOCK_QUEUE_SELECTOR,
            TIMELOCK_EXECUTE_SELECTOR
        )
        .is_none());
        assert!(substitute_selector(
            &[0x3a, 0x66],
            TIMELOCK_QUEUE_SELECTOR,
            TIMELOCK_EXECUTE_SELECTOR
        )
        .is_none());
    }
}
