//! 毫秒与 LRC 时间戳之间的相互转换。

/// 将毫秒格式化为 LRC 时间戳正文 `mm:ss.fff`（不含方括号）。
///
/// 全程整数运算，只截断不四舍五入。分钟数超过 99 时按实际位数输出。
///
/// # Arguments
/// * `ms` - 需要格式化的总毫秒数。
pub fn ms_to_timestamp(ms: u64) -> String {
    let minutes = ms / 60_000;
    let seconds = (ms % 60_000) / 1000;
    let milliseconds = ms % 1000;
    format!("{minutes:02}:{seconds:02}.{milliseconds:03}")
}

/// 将毫秒格式化为带方括号的 LRC 时间标签 `[mm:ss.fff]`。
pub fn format_lrc_time_ms(ms: u64) -> String {
    format!("[{}]", ms_to_timestamp(ms))
}

/// 解析 `mm:ss`、`mm:ss.cc` 或 `mm:ss.fff` 形式的时间戳。
///
/// 小数部分按位数解释：一位是十分之一秒，两位是厘秒，三位是毫秒，更多的位会被截断。
/// 任何无法解析的输入都返回 `None`。
pub fn try_timestamp_to_ms(text: &str) -> Option<u64> {
    let (minute_part, second_part) = text.trim().split_once(':')?;
    let minutes: u64 = parse_digits(minute_part)?;

    let (whole_seconds, fraction) = match second_part.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (second_part, ""),
    };
    let seconds: u64 = parse_digits(whole_seconds)?;

    let fraction_ms = if fraction.is_empty() {
        0
    } else {
        if !fraction.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        // 补齐或截断到三位，避免浮点误差
        let mut digits: String = fraction.chars().take(3).collect();
        while digits.len() < 3 {
            digits.push('0');
        }
        digits.parse::<u64>().ok()?
    };

    minutes
        .checked_mul(60_000)?
        .checked_add(seconds.checked_mul(1000)?)?
        .checked_add(fraction_ms)
}

/// 解析时间戳，失败时返回 `0`。
///
/// 注意：空字符串同样返回 `0`，调用方需要自行区分“没有时间戳”和真正的零点。
pub fn timestamp_to_ms(text: &str) -> u64 {
    try_timestamp_to_ms(text).unwrap_or(0)
}

fn parse_digits(part: &str) -> Option<u64> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}
