use chrono::{DateTime, Duration, Utc};

use crate::error::{Error, Result};

#[cfg(not(test))]
/// 現在のUTC時間を取得する。
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

#[cfg(test)]
pub use mock_clock::now;

/// 現在時刻から指定された分だけ遡った時刻を返す。
///
/// # Arguments
///
/// * `offset_minutes` - 遡る分数。`None`の場合は現在時刻
pub fn backdated(offset_minutes: Option<i64>) -> Result<DateTime<Utc>> {
    let now = now();
    match offset_minutes {
        Some(minutes) => Duration::try_minutes(minutes)
            .and_then(|offset| now.checked_sub_signed(offset))
            .ok_or(Error::InvalidOffset { minutes }),
        None => Ok(now),
    }
}
