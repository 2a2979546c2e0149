use chrono::{
    DateTime, Datelike, Duration, FixedOffset, LocalResult, NaiveDate, NaiveDateTime, NaiveTime,
    TimeZone, Utc, Weekday,
};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::textnorm::clean_text;

/// All instants produced by this module carry this timezone. Bangkok has no
/// DST, so the offset is a constant +07:00.
pub const BANGKOK: Tz = chrono_tz::Asia::Bangkok;

static BANGKOK_OFFSET: Lazy<FixedOffset> =
    Lazy::new(|| FixedOffset::east_opt(7 * 3600).expect("valid Bangkok offset"));

// "4–6 Jan" / "4-6 Jan" / "4-6 ม.ค."
static DAY_RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})\s*[–—-]\s*(\d{1,2})\s+([A-Za-z]{3,9}\b|[\p{Thai}\.]+)")
        .expect("valid day-range regex")
});

// "15 มกราคม 2569" (Buddhist Era year optional)
static THAI_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2})\s+([\p{Thai}\.]+)(?:\s+(\d{4}))?$").expect("valid thai date regex")
});

// "Jan 4–6"
static MONTH_RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b([A-Za-z]{3,9})\.?\s+(\d{1,2})\s*[–—-]\s*(\d{1,2})\b")
        .expect("valid month-range regex")
});

static END_OF_MONTH_PHRASES: &[&str] = &[
    "end of month",
    "end of the month",
    "until end of month",
    "till end of month",
    "до конца месяца",
    "конца месяца",
    "สิ้นเดือน",
];

static EVERY_FRIDAY_PHRASES: &[&str] = &[
    "every friday",
    "fridays",
    "каждую пятницу",
    "по пятницам",
    "ทุกวันศุกร์",
    "ทุกศุกร์",
];

pub fn now_bangkok() -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&*BANGKOK_OFFSET)
}

fn local_datetime(naive: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
    match BANGKOK.from_local_datetime(&naive) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => {
            Some(dt.with_timezone(&*BANGKOK_OFFSET))
        }
        LocalResult::None => None,
    }
}

pub fn start_of_day(date: NaiveDate) -> Option<DateTime<FixedOffset>> {
    local_datetime(date.and_time(NaiveTime::MIN))
}

pub fn end_of_day(date: NaiveDate) -> Option<DateTime<FixedOffset>> {
    let last_second = NaiveTime::from_hms_opt(23, 59, 59)?;
    local_datetime(date.and_time(last_second))
}

fn last_day_of_month(today: NaiveDate) -> Option<NaiveDate> {
    let (year, month) = if today.month() == 12 {
        (today.year() + 1, 1)
    } else {
        (today.year(), today.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1).map(|first| first - Duration::days(1))
}

fn month_from_name(name: &str) -> Option<u32> {
    const MONTHS: [(&str, u32); 12] = [
        ("jan", 1),
        ("feb", 2),
        ("mar", 3),
        ("apr", 4),
        ("may", 5),
        ("jun", 6),
        ("jul", 7),
        ("aug", 8),
        ("sep", 9),
        ("oct", 10),
        ("nov", 11),
        ("dec", 12),
    ];
    const THAI_MONTHS: [(&str, u32); 12] = [
        ("มกราคม", 1),
        ("กุมภาพันธ์", 2),
        ("มีนาคม", 3),
        ("เมษายน", 4),
        ("พฤษภาคม", 5),
        ("มิถุนายน", 6),
        ("กรกฎาคม", 7),
        ("สิงหาคม", 8),
        ("กันยายน", 9),
        ("ตุลาคม", 10),
        ("พฤศจิกายน", 11),
        ("ธันวาคม", 12),
    ];
    // Stored without the trailing dot; "ม.ค." and "ม.ค" both resolve.
    const THAI_MONTH_ABBREV: [(&str, u32); 12] = [
        ("ม.ค", 1),
        ("ก.พ", 2),
        ("มี.ค", 3),
        ("เม.ย", 4),
        ("พ.ค", 5),
        ("มิ.ย", 6),
        ("ก.ค", 7),
        ("ส.ค", 8),
        ("ก.ย", 9),
        ("ต.ค", 10),
        ("พ.ย", 11),
        ("ธ.ค", 12),
    ];

    let lowered = name.to_lowercase();
    if let Some(number) = MONTHS
        .iter()
        .find(|(prefix, _)| lowered.starts_with(prefix))
        .map(|(_, number)| *number)
    {
        return Some(number);
    }
    if let Some(number) = THAI_MONTHS
        .iter()
        .find(|(full, _)| lowered.starts_with(full))
        .map(|(_, number)| *number)
    {
        return Some(number);
    }
    let trimmed = lowered.trim_end_matches('.');
    THAI_MONTH_ABBREV
        .iter()
        .find(|(abbrev, _)| trimmed == *abbrev)
        .map(|(_, number)| *number)
}

/// Parses a single date expression into a Bangkok-local instant.
///
/// Relative words ("today", "tomorrow", Thai equivalents) resolve against
/// `base`, which defaults to the current Bangkok time. Returns `None` for
/// anything unparseable; ambiguity is never an error here.
pub fn parse_date(
    text: &str,
    base: Option<DateTime<FixedOffset>>,
) -> Option<DateTime<FixedOffset>> {
    let cleaned = clean_text(text);
    if cleaned.is_empty() {
        return None;
    }
    let anchor = base.unwrap_or_else(now_bangkok);
    let lowered = cleaned.to_lowercase();

    match lowered.as_str() {
        "today" | "tonight" | "วันนี้" | "คืนนี้" => {
            return start_of_day(anchor.date_naive());
        }
        "tomorrow" | "พรุ่งนี้" => {
            return start_of_day(anchor.date_naive() + Duration::days(1));
        }
        "yesterday" | "เมื่อวาน" => {
            return start_of_day(anchor.date_naive() - Duration::days(1));
        }
        _ => {}
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(&cleaned) {
        return Some(dt.with_timezone(&*BANGKOK_OFFSET));
    }

    const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"];
    for fmt in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&cleaned, fmt) {
            return local_datetime(naive);
        }
    }

    const DATE_FORMATS: [&str; 7] = [
        "%Y-%m-%d",
        "%d/%m/%Y",
        "%d/%m/%y",
        "%B %d, %Y",
        "%b %d, %Y",
        "%d %B %Y",
        "%d %b %Y",
    ];
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(&cleaned, fmt) {
            return start_of_day(date);
        }
    }

    if let Some(date) = parse_thai_date(&cleaned, anchor.year()) {
        return start_of_day(date);
    }

    // Yearless dates resolve against the anchor's year.
    const YEARLESS_FORMATS: [&str; 4] = ["%d %B", "%d %b", "%B %d", "%b %d"];
    let with_year = format!("{} {}", cleaned, anchor.year());
    for fmt in YEARLESS_FORMATS {
        let fmt_with_year = format!("{fmt} %Y");
        if let Ok(date) = NaiveDate::parse_from_str(&with_year, &fmt_with_year) {
            return start_of_day(date);
        }
    }

    // Month-only expressions default to the first of the month.
    let with_day = format!("1 {cleaned}");
    for fmt in ["%d %B %Y", "%d %b %Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(&with_day, fmt) {
            return start_of_day(date);
        }
    }

    None
}

/// Parses free text into a `(start, end)` pair of Bangkok instants.
///
/// Handles day ranges within one month ("4–6 Jan", "Jan 4–6"), end-of-month
/// and every-Friday phrases (English, Russian, Thai), then falls back to a
/// single date applied to both ends. No match yields `(None, None)`.
pub fn parse_range(text: &str) -> (Option<DateTime<FixedOffset>>, Option<DateTime<FixedOffset>>) {
    let cleaned = clean_text(text);
    if cleaned.is_empty() {
        return (None, None);
    }
    let lowered = cleaned.to_lowercase();
    let today = now_bangkok().date_naive();

    if let Some(caps) = DAY_RANGE_RE.captures(&cleaned) {
        if let Some(range) = day_range(&caps[1], &caps[2], &caps[3], today.year()) {
            return range;
        }
    }
    if let Some(caps) = MONTH_RANGE_RE.captures(&cleaned) {
        if let Some(range) = day_range(&caps[2], &caps[3], &caps[1], today.year()) {
            return range;
        }
    }

    if END_OF_MONTH_PHRASES.iter().any(|p| lowered.contains(p)) {
        let start = start_of_day(today);
        let end = last_day_of_month(today).and_then(end_of_day);
        return (start, end);
    }

    if EVERY_FRIDAY_PHRASES.iter().any(|p| lowered.contains(p)) {
        let days_ahead = (Weekday::Fri.num_days_from_monday() + 7
            - today.weekday().num_days_from_monday())
            % 7;
        let friday = today + Duration::days(i64::from(days_ahead));
        return (start_of_day(friday), end_of_day(friday));
    }

    if let Some(start) = parse_date(&cleaned, None) {
        let day_start = start_of_day(start.date_naive());
        return (day_start, day_start);
    }

    (None, None)
}

// "15 มกราคม" / "15 ม.ค. 2569"; Buddhist Era years convert to CE.
fn parse_thai_date(cleaned: &str, anchor_year: i32) -> Option<NaiveDate> {
    let caps = THAI_DATE_RE.captures(cleaned)?;
    let month = month_from_name(&caps[2])?;
    let day: u32 = caps[1].parse().ok()?;
    let year = caps
        .get(3)
        .and_then(|y| y.as_str().parse::<i32>().ok())
        .map(|y| if y > 2300 { y - 543 } else { y })
        .unwrap_or(anchor_year);
    NaiveDate::from_ymd_opt(year, month, day)
}

fn day_range(
    day_from: &str,
    day_to: &str,
    month_name: &str,
    year: i32,
) -> Option<(Option<DateTime<FixedOffset>>, Option<DateTime<FixedOffset>>)> {
    let month = month_from_name(month_name)?;
    let d1: u32 = day_from.parse().ok()?;
    let d2: u32 = day_to.parse().ok()?;
    let start = NaiveDate::from_ymd_opt(year, month, d1)?;
    let end = NaiveDate::from_ymd_opt(year, month, d2)?;
    Some((start_of_day(start), start_of_day(end)))
}

/// Resolves raw start/end fields, falling back to free-text range parsing,
/// then copies a lone endpoint to the missing side.
pub fn normalize_start_end(
    raw_start: Option<&str>,
    raw_end: Option<&str>,
    time_str: Option<&str>,
) -> (Option<DateTime<FixedOffset>>, Option<DateTime<FixedOffset>>) {
    let mut start = raw_start.and_then(|text| parse_date(text, None));
    let mut end = raw_end.and_then(|text| parse_date(text, None));

    if start.is_none() && end.is_none() {
        if let Some(text) = time_str {
            let (range_start, range_end) = parse_range(text);
            start = range_start;
            end = range_end;
        }
    }

    match (start, end) {
        (Some(s), None) => (Some(s), Some(s)),
        (None, Some(e)) => (Some(e), Some(e)),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_day_range_before_month() {
        let (start, end) = parse_range("4–6 Jan");
        let start = start.expect("start");
        let end = end.expect("end");
        assert_eq!(start.day(), 4);
        assert_eq!(end.day(), 6);
        assert_eq!(start.month(), 1);
        assert_eq!(end.month(), 1);
        assert_eq!(start.year(), now_bangkok().year());
    }

    #[test]
    fn parses_day_range_after_month() {
        let (start, end) = parse_range("Jan 4-6");
        assert_eq!(start.expect("start").day(), 4);
        assert_eq!(end.expect("end").day(), 6);
        assert_eq!(start.expect("start").month(), 1);
    }

    #[test]
    fn parses_thai_dates() {
        let full = parse_date("15 มกราคม 2026", None).expect("thai full month");
        assert_eq!((full.day(), full.month(), full.year()), (15, 1, 2026));

        // Buddhist Era year
        let buddhist = parse_date("15 มกราคม 2569", None).expect("thai BE year");
        assert_eq!(buddhist.year(), 2026);

        let yearless = parse_date("3 ธ.ค.", None).expect("thai abbrev");
        assert_eq!(yearless.day(), 3);
        assert_eq!(yearless.month(), 12);
        assert_eq!(yearless.year(), now_bangkok().year());
    }

    #[test]
    fn parses_thai_day_range() {
        let (start, end) = parse_range("4-6 ม.ค.");
        assert_eq!(start.expect("start").day(), 4);
        assert_eq!(end.expect("end").day(), 6);
        assert_eq!(start.expect("start").month(), 1);
    }

    #[test]
    fn parses_end_of_month() {
        let (start, end) = parse_range("until end of month");
        let today = now_bangkok().date_naive();
        let start = start.expect("start");
        let end = end.expect("end");
        assert_eq!(start.date_naive(), today);
        assert_eq!(end.month(), today.month());
        assert_eq!(end.time(), NaiveTime::from_hms_opt(23, 59, 59).expect("time"));
        assert_eq!((end.date_naive() + Duration::days(1)).day(), 1);
    }

    #[test]
    fn parses_every_friday() {
        for phrase in ["Every Friday", "ทุกวันศุกร์"] {
            let (start, end) = parse_range(phrase);
            let start = start.expect("start");
            let end = end.expect("end");
            assert_eq!(start.weekday(), Weekday::Fri);
            assert_eq!(start.date_naive(), end.date_naive());
            assert!(start.date_naive() >= now_bangkok().date_naive());
            assert!(start.date_naive() < now_bangkok().date_naive() + Duration::days(8));
        }
    }

    #[test]
    fn falls_back_to_single_date() {
        let (start, end) = parse_range("2026-01-15");
        assert_eq!(start, end);
        assert_eq!(start.expect("start").day(), 15);
    }

    #[test]
    fn unparseable_text_yields_nothing() {
        assert_eq!(parse_range("see website for details"), (None, None));
    }

    #[test]
    fn parse_date_resolves_relative_words() {
        let base = parse_date("2026-03-10", None);
        let tomorrow = parse_date("tomorrow", base).expect("tomorrow");
        assert_eq!(tomorrow.date_naive().to_string(), "2026-03-11");
        let today = parse_date("วันนี้", base).expect("today");
        assert_eq!(today.date_naive().to_string(), "2026-03-10");
    }

    #[test]
    fn parse_date_defaults_month_only_to_first_day() {
        let dt = parse_date("March 2026", None).expect("month only");
        assert_eq!(dt.day(), 1);
        assert_eq!(dt.month(), 3);
    }

    #[test]
    fn instants_carry_bangkok_offset() {
        let dt = parse_date("2026-05-01", None).expect("date");
        assert_eq!(dt.offset().local_minus_utc(), 7 * 3600);
    }

    #[test]
    fn single_endpoint_is_copied() {
        let (start, end) = normalize_start_end(Some("2026-02-01"), None, None);
        assert_eq!(start, end);
        assert!(start.is_some());

        let (start, end) = normalize_start_end(None, Some("2026-02-02"), None);
        assert_eq!(start, end);
    }

    #[test]
    fn time_str_fallback_feeds_parse_range() {
        let (start, end) = normalize_start_end(None, None, Some("4-6 Jan"));
        assert_eq!(start.expect("start").day(), 4);
        assert_eq!(end.expect("end").day(), 6);
    }
}
