/// Renders an amount in minor units as `CUR 1234.56`.
pub fn format_minor(amount_minor: i32, currency: &str) -> String {
    let sign = if amount_minor < 0 { "-" } else { "" };
    let abs = i64::from(amount_minor).abs();
    format!("{currency} {sign}{}.{:02}", abs / 100, abs % 100)
}
