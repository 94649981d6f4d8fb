fn group_thousands(int_part: &str) -> String {
    let mut with_commas = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_commas.push(',');
        }
        with_commas.push(c);
    }
    with_commas.chars().rev().collect()
}

/// Format a float as a dollar amount with thousands separators: $1,234.56
pub fn money(val: f64) -> String {
    let cents = format!("{:.2}", val.abs());
    let (int_part, dec_part) = cents.split_once('.').unwrap_or((cents.as_str(), "00"));
    let with_commas = group_thousands(int_part);
    // -0.001 rounds to $0.00, which should not print a sign
    if val < 0.0 && cents != "0.00" {
        format!("-${with_commas}.{dec_part}")
    } else {
        format!("${with_commas}.{dec_part}")
    }
}

pub fn count(val: i64) -> String {
    let grouped = group_thousands(&val.unsigned_abs().to_string());
    if val < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

/// Ratio as a percentage with one decimal: 0.125 -> 12.5%
pub fn percent(ratio: f64) -> String {
    format!("{:.1}%", ratio * 100.0)
}
