use std::cmp;

fn bits_helper(n: u64, i: u64) -> u64 {
    if n == 0 {
        i
    } else {
        bits_helper(n / 2, i + 1)
    }
}

/// Number of bits needed to represent `n` distinct values.
pub fn bits_needed_for(n: u64) -> u64 {
    cmp::max(bits_helper(n.saturating_sub(1), 0), 1)
}

/// Width of a state register that must hold ids up to `max_id`: the
/// smallest `b` with `2^b >= max_id`, and at least 1.
pub fn state_bits(max_id: u64) -> u64 {
    let mut bits = 0;
    while (1u128 << bits) < max_id as u128 {
        bits += 1;
    }
    cmp::max(bits, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits() {
        assert_eq!(bits_needed_for(0), 1);
        assert_eq!(bits_needed_for(1), 1);
        assert_eq!(bits_needed_for(2), 1);
        assert_eq!(bits_needed_for(3), 2);
        assert_eq!(bits_needed_for(1024), 10);
        assert_eq!(bits_needed_for(1025), 11);
    }

    #[test]
    fn state_register_width() {
        assert_eq!(state_bits(0), 1);
        assert_eq!(state_bits(2), 1);
        assert_eq!(state_bits(3), 2);
        assert_eq!(state_bits(8), 3);
        assert_eq!(state_bits(9), 4);
    }
}
