use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Asia/Seoul. KST has been a fixed +09:00 offset since 1988, so a fixed
/// offset is exact and avoids carrying a timezone database.
pub fn kst() -> FixedOffset {
    FixedOffset::east_opt(9 * 3600).expect("+09:00 is a valid offset")
}

/// Parses a naive local datetime as Asia/Seoul wall-clock time.
///
/// Accepted shapes, matching what the admission clients actually send:
/// `YYYY-MM-DDTHH:MM:SS`, `YYYY-MM-DD HH:MM:SS`, both with an optional
/// fractional-seconds suffix.
pub fn parse_local_datetime(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    const FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

    let mut last_err = None;
    for format in FORMATS {
        match NaiveDateTime::parse_from_str(s, format) {
            Ok(naive) => {
                let local = kst()
                    .from_local_datetime(&naive)
                    .single()
                    .expect("fixed offsets map local datetimes uniquely");
                return Ok(local.with_timezone(&Utc));
            }
            Err(e) => last_err = Some(e),
        }
    }
    Err(last_err.expect("format list is non-empty"))
}
