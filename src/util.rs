use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

pub fn format_bytes(bytes: usize) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];

    let mut value = bytes as f64;
    let mut unit = 0usize;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} {}", bytes, UNITS[unit])
    } else {
        format!("{value:.2} {}", UNITS[unit])
    }
}

pub fn short_name(id: &str) -> &str {
    id.rsplit_once('/').map(|(_, rest)| rest).unwrap_or(id)
}

/// Splitmix-style scramble; maps any seed to a pair in [0, 1).
pub fn hash_unit_pair(seed: u64) -> (f32, f32) {
    let mut x = seed.wrapping_add(0x9e37_79b9_7f4a_7c15);
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    x ^= x >> 31;

    let a = ((x & 0xffff_ffff) as f64 / (u32::MAX as f64 + 1.0)) as f32;
    let b = (((x >> 32) & 0xffff_ffff) as f64 / (u32::MAX as f64 + 1.0)) as f32;
    (a, b)
}

pub fn stable_pair(id: &str) -> (f32, f32) {
    let mut hasher = DefaultHasher::new();
    id.hash(&mut hasher);
    hash_unit_pair(hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_bytes_picks_unit() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.00 KiB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.00 MiB");
    }

    #[test]
    fn stable_pair_is_deterministic_and_unit_range() {
        let (a1, b1) = stable_pair("node/alpha");
        let (a2, b2) = stable_pair("node/alpha");
        assert_eq!((a1, b1), (a2, b2));
        assert!((0.0..1.0).contains(&a1));
        assert!((0.0..1.0).contains(&b1));

        let other = stable_pair("node/beta");
        assert_ne!((a1, b1), other);
    }
}
