/// `1:15.100` for lap times, `--` when missing
pub fn lap_time(ms: Option<u32>) -> String {
    match ms {
        Some(ms) => {
            let minutes = ms / 60_000;
            let rest = ms % 60_000;
            format!("{}:{:02}.{:03}", minutes, rest / 1000, rest % 1000)
        }
        None => "--".to_string(),
    }
}

/// `+0.500` / `-1.250`
pub fn signed_ms(ms: Option<i64>) -> String {
    match ms {
        Some(ms) => {
            let sign = if ms < 0 { '-' } else { '+' };
            let abs = ms.unsigned_abs();
            format!("{}{}.{:03}", sign, abs / 1000, abs % 1000)
        }
        None => "--".to_string(),
    }
}

pub fn mean_delta(ms: Option<f64>) -> String {
    signed_ms(ms.map(|v| v.round() as i64))
}
