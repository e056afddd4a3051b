use std::time::{Duration, SystemTime, UNIX_EPOCH};

// Get current wall-clock timestamp in milliseconds
pub fn get_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis()
        .min(u64::MAX as u128) as u64
}

// Floor a non-negative float into an integer counter, treating NaN as zero
pub fn floor_u32(value: f32) -> u32 {
    if value.is_finite() && value > 0.0 {
        value.floor().min(u32::MAX as f32) as u32
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_is_monotonic_enough() {
        let t1 = get_timestamp();
        std::thread::sleep(Duration::from_millis(2));
        assert!(get_timestamp() > t1);
    }

    #[test]
    fn test_floor_u32() {
        assert_eq!(floor_u32(3.9), 3);
        assert_eq!(floor_u32(-2.0), 0);
        assert_eq!(floor_u32(f32::NAN), 0);
        assert_eq!(floor_u32(f32::INFINITY), 0);
    }
}
