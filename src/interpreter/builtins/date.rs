//! `Date`. Times are UTC milliseconds; the configured GMT offset only
//! applies when parsing strings without a zone and in `toLocaleString`.

use super::*;

const MS_PER_DAY: f64 = 86_400_000.0;
const MS_PER_MINUTE: f64 = 60_000.0;

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];
const WEEKDAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

fn day(t: f64) -> f64 {
    (t / MS_PER_DAY).floor()
}

fn time_within_day(t: f64) -> f64 {
    t.rem_euclid(MS_PER_DAY)
}

fn days_in_year(y: f64) -> f64 {
    if y.rem_euclid(4.0) != 0.0 {
        365.0
    } else if y.rem_euclid(100.0) != 0.0 {
        366.0
    } else if y.rem_euclid(400.0) != 0.0 {
        365.0
    } else {
        366.0
    }
}

fn day_from_year(y: f64) -> f64 {
    365.0 * (y - 1970.0) + ((y - 1969.0) / 4.0).floor() - ((y - 1901.0) / 100.0).floor()
        + ((y - 1601.0) / 400.0).floor()
}

fn time_from_year(y: f64) -> f64 {
    day_from_year(y) * MS_PER_DAY
}

fn year_from_time(t: f64) -> f64 {
    let mut y = (t / (MS_PER_DAY * 365.2425)).floor() + 1970.0;
    while time_from_year(y) > t {
        y -= 1.0;
    }
    while time_from_year(y + 1.0) <= t {
        y += 1.0;
    }
    y
}

fn in_leap_year(t: f64) -> f64 {
    if days_in_year(year_from_time(t)) == 366.0 {
        1.0
    } else {
        0.0
    }
}

/// First day of each month within a common year.
const MONTH_STARTS: [f64; 12] = [
    0.0, 31.0, 59.0, 90.0, 120.0, 151.0, 181.0, 212.0, 243.0, 273.0, 304.0, 334.0,
];

fn month_start(month: usize, leap: f64) -> f64 {
    MONTH_STARTS[month] + if month >= 2 { leap } else { 0.0 }
}

fn month_from_time(t: f64) -> f64 {
    let d = day(t) - day_from_year(year_from_time(t));
    let leap = in_leap_year(t);
    (1..12).take_while(|&m| d >= month_start(m, leap)).count() as f64
}

fn date_from_time(t: f64) -> f64 {
    let d = day(t) - day_from_year(year_from_time(t));
    let m = month_from_time(t) as usize;
    d - month_start(m, in_leap_year(t)) + 1.0
}

fn week_day(t: f64) -> f64 {
    (day(t) + 4.0).rem_euclid(7.0)
}

fn hour_from_time(t: f64) -> f64 {
    (time_within_day(t) / 3_600_000.0).floor()
}

fn min_from_time(t: f64) -> f64 {
    (time_within_day(t) / MS_PER_MINUTE).floor().rem_euclid(60.0)
}

fn sec_from_time(t: f64) -> f64 {
    (time_within_day(t) / 1000.0).floor().rem_euclid(60.0)
}

fn ms_from_time(t: f64) -> f64 {
    time_within_day(t).rem_euclid(1000.0)
}

fn make_time(hour: f64, min: f64, sec: f64, ms: f64) -> f64 {
    if ![hour, min, sec, ms].iter().all(|x| x.is_finite()) {
        return f64::NAN;
    }
    hour.trunc() * 3_600_000.0 + min.trunc() * MS_PER_MINUTE + sec.trunc() * 1000.0 + ms.trunc()
}

fn make_day(year: f64, month: f64, date: f64) -> f64 {
    if ![year, month, date].iter().all(|x| x.is_finite()) {
        return f64::NAN;
    }
    let month = month.trunc();
    let y = year.trunc() + (month / 12.0).floor();
    let m = month.rem_euclid(12.0) as usize;
    let leap = if days_in_year(y) == 366.0 { 1.0 } else { 0.0 };
    day_from_year(y) + month_start(m, leap) + date.trunc() - 1.0
}

fn make_date(day: f64, time: f64) -> f64 {
    if !day.is_finite() || !time.is_finite() {
        return f64::NAN;
    }
    day * MS_PER_DAY + time
}

fn time_clip(t: f64) -> f64 {
    if !t.is_finite() || t.abs() > 8.64e15 {
        return f64::NAN;
    }
    t.trunc() + 0.0
}

/// Year, month, date, hours, minutes, seconds and milliseconds of `t`.
fn components(t: f64) -> [f64; 7] {
    [
        year_from_time(t),
        month_from_time(t),
        date_from_time(t),
        hour_from_time(t),
        min_from_time(t),
        sec_from_time(t),
        ms_from_time(t),
    ]
}

fn from_components(c: &[f64; 7]) -> f64 {
    time_clip(make_date(
        make_day(c[0], c[1], c[2]),
        make_time(c[3], c[4], c[5], c[6]),
    ))
}

/// Short years as the dialect reads them in date strings: below 70 is
/// 20xx, anything else below 1970 is offset from 1900.
fn infer_century(year: f64) -> f64 {
    if year < 70.0 {
        year + 2000.0
    } else if year < 1970.0 {
        year + 1900.0
    } else {
        year
    }
}

fn now_ms() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64
}

/// Permissive date scanner. Month names are matched on their first three
/// letters; `h:m[:s]` is a time; the first bare number is the day and the
/// second the year. A `GMT`/`UTC` marker, optionally followed by `+hhmm`,
/// makes the time absolute; otherwise `local_offset` minutes are removed.
pub(crate) fn parse_date(text: &str, local_offset: i32) -> f64 {
    scan_date(text, local_offset).map_or(f64::NAN, time_clip)
}

fn scan_date(text: &str, local_offset: i32) -> Option<f64> {
    let mut month = None;
    let mut day_of_month = None;
    let mut year = None;
    let mut time = [0.0; 3];
    let mut zone: Option<f64> = None;

    let tokens = text
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty());
    for token in tokens {
        let upper = token.to_ascii_uppercase();
        if let Some(rest) = upper.strip_prefix("GMT").or_else(|| upper.strip_prefix("UTC")) {
            zone = Some(if rest.is_empty() { 0.0 } else { parse_zone(rest)? });
            continue;
        }
        if zone.is_some() && (token.starts_with('+') || token.starts_with('-')) {
            zone = Some(parse_zone(token)?);
            continue;
        }
        if token.contains(':') {
            for (slot, part) in time.iter_mut().zip(token.split(':')) {
                *slot = part.parse::<f64>().ok()?;
            }
            continue;
        }
        if let Ok(n) = token.parse::<f64>() {
            if day_of_month.is_none() {
                day_of_month = Some(n);
            } else if year.is_none() {
                year = Some(infer_century(n));
            }
            continue;
        }
        if let Some(prefix) = token.get(..3)
            && let Some(m) = MONTHS.iter().position(|name| name.eq_ignore_ascii_case(prefix))
        {
            month = Some(m as f64);
        }
    }

    let t = make_date(
        make_day(year?, month?, day_of_month?),
        make_time(time[0], time[1], time[2], 0.0),
    );
    let offset = zone.unwrap_or(f64::from(local_offset));
    Some(t - offset * MS_PER_MINUTE)
}

/// `+hhmm` or `-hhmm` into minutes east of GMT.
fn parse_zone(text: &str) -> Option<f64> {
    let (sign, digits) = match text.as_bytes().first()? {
        b'+' => (1.0, &text[1..]),
        b'-' => (-1.0, &text[1..]),
        _ => return None,
    };
    let n: f64 = digits.parse().ok()?;
    Some(sign * ((n / 100.0).trunc() * 60.0 + n % 100.0))
}

/// `Mon Jan 01 2024 00:00:00`.
fn format_plain(t: f64) -> String {
    let [y, mo, d, h, mi, s, _] = components(t);
    format!(
        "{} {} {:02} {} {:02}:{:02}:{:02}",
        WEEKDAYS[week_day(t) as usize],
        MONTHS[mo as usize],
        d,
        y,
        h,
        mi,
        s
    )
}

fn format_gmt(t: f64) -> String {
    let [y, mo, d, h, mi, s, _] = components(t);
    format!(
        "{}, {:02} {} {} {:02}:{:02}:{:02} GMT",
        WEEKDAYS[week_day(t) as usize],
        d,
        MONTHS[mo as usize],
        y,
        h,
        mi,
        s
    )
}

impl Interpreter {
    pub(crate) fn setup_date(&mut self) {
        let proto = self.builtins.date_proto;
        let ctor = self.define_constructor("Date", &["year", "month", "date"], date_ctor, proto);
        self.define_method(ctor, "parse", &["string"], date_parse);
        self.define_method(ctor, "UTC", &["year", "month", "date"], date_utc);

        let getters: [(&str, fn(f64) -> f64); 8] = [
            ("FullYear", year_from_time),
            ("Month", month_from_time),
            ("Date", date_from_time),
            ("Day", week_day),
            ("Hours", hour_from_time),
            ("Minutes", min_from_time),
            ("Seconds", sec_from_time),
            ("Milliseconds", ms_from_time),
        ];
        for (suffix, getter) in getters {
            for name in [format!("get{suffix}"), format!("getUTC{suffix}")] {
                let func = self.make_native(
                    &name,
                    &[],
                    Rc::new(move |interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]| {
                        let t = try_result!(this_time(interp, this));
                        let value = if t.is_nan() { f64::NAN } else { getter(t) };
                        Completion::Normal(JsValue::number(value))
                    }),
                );
                self.define_hidden(proto, &name, JsValue::object(func));
            }
        }

        // (name, first component set, most components taken)
        let setters: [(&str, usize, usize); 7] = [
            ("FullYear", 0, 3),
            ("Month", 1, 2),
            ("Date", 2, 1),
            ("Hours", 3, 4),
            ("Minutes", 4, 3),
            ("Seconds", 5, 2),
            ("Milliseconds", 6, 1),
        ];
        for (suffix, first, count) in setters {
            for name in [format!("set{suffix}"), format!("setUTC{suffix}")] {
                let func = self.make_native(
                    &name,
                    &[],
                    Rc::new(move |interp: &mut Interpreter, this: &JsValue, args: &[JsValue]| {
                        set_components(interp, this, args, first, count)
                    }),
                );
                self.define_hidden(proto, &name, JsValue::object(func));
            }
        }

        let methods: [(&str, &[&str], Builtin); 10] = [
            ("getTime", &[], date_value_of),
            ("valueOf", &[], date_value_of),
            ("getYear", &[], date_get_year),
            ("getTimezoneOffset", &[], date_get_timezone_offset),
            ("setTime", &["time"], date_set_time),
            ("setYear", &["year"], date_set_year),
            ("toString", &[], date_to_string),
            ("toGMTString", &[], date_to_gmt_string),
            ("toUTCString", &[], date_to_gmt_string),
            ("toLocaleString", &[], date_to_locale_string),
        ];
        for (name, params, f) in methods {
            self.define_method(proto, name, params, f);
        }
    }
}

fn this_time(interp: &mut Interpreter, this: &JsValue) -> Result<f64, Completion> {
    match interp.internal_of(this) {
        Some(Internal::Date(t)) => Ok(t.value()),
        _ => Err(interp.type_error("Date.prototype method called on incompatible object")),
    }
}

fn store_time(interp: &mut Interpreter, this: &JsValue, t: f64) -> Completion {
    if let Some(id) = this.as_object() {
        interp.set_internal(id, Internal::Date(JsNumber::new(t)));
    }
    Completion::Normal(JsValue::number(t))
}

fn numbers(interp: &mut Interpreter, args: &[JsValue]) -> Result<Vec<f64>, Completion> {
    args.iter()
        .map(|a| interp.to_number(a).map(JsNumber::value))
        .collect()
}

/// Time from the numeric `(year, month[, date, h, m, s, ms])` form. Years
/// 0 to 99 mean 1900 to 1999.
fn time_from_args(interp: &mut Interpreter, args: &[JsValue]) -> Result<f64, Completion> {
    let given = numbers(interp, args)?;
    let mut c = [f64::NAN, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0];
    for (slot, value) in c.iter_mut().zip(given) {
        *slot = value;
    }
    if (0.0..=99.0).contains(&c[0].trunc()) {
        c[0] = c[0].trunc() + 1900.0;
    }
    Ok(from_components(&c))
}

fn date_ctor(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Completion {
    if !interp.is_constructing() {
        return Completion::Normal(JsValue::from(format!("{} GMT", format_plain(now_ms()))));
    }
    let t = match args {
        [] => now_ms(),
        [value] => match try_result!(interp.to_primitive(value)) {
            JsValue::String(s) => parse_date(&s, interp.config.gmt_offset_minutes),
            other => time_clip(try_result!(interp.to_number(&other)).value()),
        },
        _ => try_result!(time_from_args(interp, args)),
    };
    try_completion!(store_time(interp, this, t));
    Completion::Normal(this.clone())
}

fn date_parse(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> Completion {
    let s = try_result!(interp.to_string(&arg(args, 0)));
    let t = parse_date(&s, interp.config.gmt_offset_minutes);
    Completion::Normal(JsValue::number(t))
}

fn date_utc(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> Completion {
    let t = try_result!(time_from_args(interp, args));
    Completion::Normal(JsValue::number(t))
}

fn date_value_of(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> Completion {
    Completion::Normal(JsValue::number(try_result!(this_time(interp, this))))
}

/// Years are reported relative to 1900, so 2024 reads as 124.
fn date_get_year(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> Completion {
    let t = try_result!(this_time(interp, this));
    let year = if t.is_nan() { f64::NAN } else { year_from_time(t) - 1900.0 };
    Completion::Normal(JsValue::number(year))
}

fn date_get_timezone_offset(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> Completion {
    let t = try_result!(this_time(interp, this));
    let offset = if t.is_nan() {
        f64::NAN
    } else {
        -f64::from(interp.config.gmt_offset_minutes)
    };
    Completion::Normal(JsValue::number(offset))
}

fn date_set_time(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Completion {
    try_result!(this_time(interp, this));
    let t = try_result!(interp.to_number(&arg(args, 0)));
    store_time(interp, this, time_clip(t.value()))
}

fn date_set_year(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Completion {
    let t = try_result!(this_time(interp, this));
    let mut year = try_result!(interp.to_number(&arg(args, 0))).value().trunc();
    if (0.0..=99.0).contains(&year) {
        year += 1900.0;
    }
    let mut c = components(if t.is_nan() { 0.0 } else { t });
    c[0] = year;
    store_time(interp, this, from_components(&c))
}

/// Replaces up to `count` components starting at `first` with the
/// arguments given.
fn set_components(
    interp: &mut Interpreter,
    this: &JsValue,
    args: &[JsValue],
    first: usize,
    count: usize,
) -> Completion {
    let t = try_result!(this_time(interp, this));
    let given = try_result!(numbers(interp, &args[..args.len().min(count)]));
    if given.is_empty() {
        return store_time(interp, this, f64::NAN);
    }
    let base = match (t.is_nan(), first) {
        (true, 0) => 0.0,
        (true, _) => return store_time(interp, this, f64::NAN),
        (false, _) => t,
    };
    let mut c = components(base);
    for (i, value) in given.into_iter().enumerate() {
        c[first + i] = value;
    }
    store_time(interp, this, from_components(&c))
}

fn date_to_string(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> Completion {
    let t = try_result!(this_time(interp, this));
    if t.is_nan() {
        return Completion::Normal(JsValue::string("Invalid Date"));
    }
    Completion::Normal(JsValue::from(format!("{} GMT", format_plain(t))))
}

fn date_to_gmt_string(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> Completion {
    let t = try_result!(this_time(interp, this));
    if t.is_nan() {
        return Completion::Normal(JsValue::string("Invalid Date"));
    }
    Completion::Normal(JsValue::from(format_gmt(t)))
}

fn date_to_locale_string(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> Completion {
    let t = try_result!(this_time(interp, this));
    if t.is_nan() {
        return Completion::Normal(JsValue::string("Invalid Date"));
    }
    let local = t + f64::from(interp.config.gmt_offset_minutes) * MS_PER_MINUTE;
    Completion::Normal(JsValue::from(format_plain(local)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(c: [f64; 7]) -> f64 {
        from_components(&c)
    }

    #[test]
    fn calendar_math() {
        let t = utc([2024.0, 1.0, 29.0, 13.0, 45.0, 30.0, 250.0]);
        assert_eq!(
            components(t),
            [2024.0, 1.0, 29.0, 13.0, 45.0, 30.0, 250.0]
        );
        assert_eq!(week_day(t), 4.0);
        assert_eq!(utc([1970.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0]), 0.0);
        let before_epoch = utc([1969.0, 11.0, 31.0, 23.0, 0.0, 0.0, 0.0]);
        assert_eq!(before_epoch, -3_600_000.0);
        assert_eq!(components(before_epoch)[0], 1969.0);
        assert_eq!(year_from_time(utc([1900.0, 2.0, 1.0, 0.0, 0.0, 0.0, 0.0])), 1900.0);
    }

    #[test]
    fn month_overflow_carries_into_year() {
        let t = utc([2023.0, 13.0, 1.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(components(t)[..3], [2024.0, 1.0, 1.0]);
    }

    #[test]
    fn parses_gmt_strings() {
        let t = utc([2024.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(format_gmt(t), "Mon, 01 Jan 2024 00:00:00 GMT");
        assert_eq!(parse_date(&format_gmt(t), 120), t);
        assert_eq!(parse_date("Mon Jan 01 2024 00:00:00 GMT", 0), t);
        assert_eq!(parse_date("1 jan 2024 01:00:00 GMT+0100", 0), t);
    }

    #[test]
    fn local_strings_use_the_offset() {
        let t = utc([2024.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(parse_date("Jan 1 2024 01:00:00", 60), t);
        assert!(parse_date("no date here", 0).is_nan());
    }

    #[test]
    fn two_digit_years() {
        let t = parse_date("Jan 1 99 GMT", 0);
        assert_eq!(year_from_time(t), 1999.0);
        let t = parse_date("Jan 1 05 GMT", 0);
        assert_eq!(year_from_time(t), 2005.0);
        let t = parse_date("Jan 1 124 00:00:00 GMT", 0);
        assert_eq!(year_from_time(t), 2024.0);
        let t = parse_date("Jan 1 1969 GMT", 0);
        assert_eq!(year_from_time(t), 3869.0);
        let t = parse_date("Jan 1 1970 GMT", 0);
        assert_eq!(year_from_time(t), 1970.0);
    }
}
