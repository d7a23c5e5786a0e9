use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// `/status 4`; empty input clears the filter.
pub fn parse_status(arg: &str) -> Result<Option<i64>, String> {
    let arg = arg.trim();
    if arg.is_empty() {
        return Ok(None);
    }
    match arg.parse::<i64>() {
        Ok(code) if (1..=5).contains(&code) => Ok(Some(code)),
        _ => Err(format!("Ukjent status «{arg}». Bruk 1–5.")),
    }
}

/// `/date 01.05.2025 31.05.2025`. Either side may be `-`; `to` covers the
/// whole day. Empty input clears both bounds.
pub fn parse_date_range(arg: &str) -> Result<(Option<NaiveDateTime>, Option<NaiveDateTime>), String> {
    let mut parts = arg.split_whitespace();
    let from = parts.next().map(parse_day).transpose()?.flatten();
    let to = parts.next().map(parse_day).transpose()?.flatten();
    if parts.next().is_some() {
        return Err("Bruk: /date fra [til]".to_string());
    }

    let from = from.map(|d| d.and_time(NaiveTime::MIN));
    let to = to.and_then(|d| d.and_hms_opt(23, 59, 59));
    if let (Some(f), Some(t)) = (from, to) {
        if f > t {
            return Err("Fra-dato er etter til-dato.".to_string());
        }
    }
    Ok((from, to))
}

fn parse_day(value: &str) -> Result<Option<NaiveDate>, String> {
    if value == "-" {
        return Ok(None);
    }
    ["%d.%m.%Y", "%Y-%m-%d"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .map(Some)
        .ok_or_else(|| format!("Ugyldig dato «{value}». Bruk dd.mm.åååå."))
}

/// `/login <bruker> <passord>`. Everything after the first gap is the
/// password, spaces included.
pub fn parse_login(arg: &str) -> Result<(String, String), String> {
    let usage = || "Bruk: /login <bruker> <passord>".to_string();
    let (username, password) = arg.trim().split_once(char::is_whitespace).ok_or_else(usage)?;
    let password = password.trim_start();
    if username.is_empty() || password.is_empty() {
        return Err(usage());
    }
    Ok((username.to_owned(), password.to_owned()))
}

pub fn parse_page(arg: &str) -> Result<usize, String> {
    arg.trim()
        .parse::<usize>()
        .ok()
        .filter(|p| *p > 0)
        .ok_or_else(|| "Bruk: /page <nummer>".to_string())
}
