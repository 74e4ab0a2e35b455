/// 获取当前 UTC 时间戳（毫秒）
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Generate a Snowflake-style i64 for catalog entities and audit rows.
///
/// Layout (53 bits, safe as a JSON number in browser dashboards):
///   - 41 bits: milliseconds since 2024-01-01 UTC
///   - 12 bits: random
pub fn snowflake_id() -> i64 {
    use rand::Rng;
    const EPOCH_MS: i64 = 1_704_067_200_000;
    let ts = (now_millis() - EPOCH_MS) & 0x1FF_FFFF_FFFF;
    let rand_bits: i64 = rand::thread_rng().gen_range(0..0x1000);
    (ts << 12) | rand_bits
}

/// Case-insensitive, whitespace-trimmed form used for duplicate-name checks
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}
