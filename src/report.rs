use chrono::SecondsFormat;
use teloxide::utils::html;

use crate::speedtest::SpeedtestResult;

const SIZE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Convert a byte count to a human-readable size.
///
/// Base-1024 scaling, rounded to 2 decimal places with trailing zeros
/// trimmed (`1.0 KB`, `1.25 MB`). Values past the TB range stay in TB.
pub fn readable_size(bytes: f64) -> String {
    if bytes <= 0.0 {
        return "0B".to_string();
    }

    let exponent = bytes.log(1024.0).floor().clamp(0.0, (SIZE_UNITS.len() - 1) as f64) as usize;
    let scaled = bytes / 1024f64.powi(exponent as i32);
    let rounded = (scaled * 100.0).round() / 100.0;

    format!("{} {}", trim_decimal(rounded), SIZE_UNITS[exponent])
}

/// Render with at most 2 and at least 1 decimal digit: 1.00 -> "1.0",
/// 1.50 -> "1.5", 1.25 -> "1.25".
fn trim_decimal(value: f64) -> String {
    let mut s = format!("{value:.2}");
    while s.ends_with('0') {
        s.pop();
    }
    if s.ends_with('.') {
        s.push('0');
    }
    s
}

/// Build the HTML photo caption for a finished measurement.
///
/// Upload/download arrive in bits per second and are shown as bytes per
/// second. All backend-supplied strings are HTML-escaped.
pub fn build_report(result: &SpeedtestResult) -> String {
    let upload = readable_size(result.upload / 8.0);
    let download = readable_size(result.download / 8.0);
    let ping = result.ping;
    let time = result.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true);
    let sent = readable_size(result.bytes_sent as f64);
    let received = readable_size(result.bytes_received as f64);

    let server_name = html::escape(&result.server.name);
    let server_country = html::escape(&result.server.country);
    let server_cc = html::escape(&result.server.cc);
    let server_sponsor = html::escape(&result.server.sponsor);
    let server_latency = result.server.latency;
    let server_lat = html::escape(&result.server.lat);
    let server_lon = html::escape(&result.server.lon);

    let client_ip = html::escape(&result.client.ip);
    let client_lat = html::escape(&result.client.lat);
    let client_lon = html::escape(&result.client.lon);
    let client_country = html::escape(&result.client.country);
    let client_isp = html::escape(&result.client.isp);
    let client_isprating = html::escape(&result.client.isprating);

    format!(
        "➲ <b><i>SPEEDTEST INFO</i></b>\n\
         ┠ <b>Upload:</b> <code>{upload}/s</code>\n\
         ┠ <b>Download:</b> <code>{download}/s</code>\n\
         ┠ <b>Ping:</b> <code>{ping} ms</code>\n\
         ┠ <b>Time:</b> <code>{time}</code>\n\
         ┠ <b>Data Sent:</b> <code>{sent}</code>\n\
         ┖ <b>Data Received:</b> <code>{received}</code>\n\
         \n\
         ➲ <b><i>SPEEDTEST SERVER</i></b>\n\
         ┠ <b>Name:</b> <code>{server_name}</code>\n\
         ┠ <b>Country:</b> <code>{server_country}, {server_cc}</code>\n\
         ┠ <b>Sponsor:</b> <code>{server_sponsor}</code>\n\
         ┠ <b>Latency:</b> <code>{server_latency}</code>\n\
         ┠ <b>Latitude:</b> <code>{server_lat}</code>\n\
         ┖ <b>Longitude:</b> <code>{server_lon}</code>\n\
         \n\
         ➲ <b><i>CLIENT DETAILS</i></b>\n\
         ┠ <b>IP Address:</b> <code>{client_ip}</code>\n\
         ┠ <b>Latitude:</b> <code>{client_lat}</code>\n\
         ┠ <b>Longitude:</b> <code>{client_lon}</code>\n\
         ┠ <b>Country:</b> <code>{client_country}</code>\n\
         ┠ <b>ISP:</b> <code>{client_isp}</code>\n\
         ┖ <b>ISP Rating:</b> <code>{client_isprating}</code>"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speedtest::{ClientInfo, ServerInfo, SpeedtestResult};
    use chrono::{TimeZone, Utc};

    fn sample_result() -> SpeedtestResult {
        SpeedtestResult {
            download: 93_951_840.0,
            upload: 16_777_216.0,
            ping: 23.419,
            timestamp: Utc.with_ymd_and_hms(2026, 8, 6, 9, 14, 53).unwrap(),
            bytes_sent: 21_234_688,
            bytes_received: 118_394_880,
            server: ServerInfo {
                name: "Frankfurt".to_string(),
                country: "Germany".to_string(),
                cc: "DE".to_string(),
                sponsor: "M&M Networks".to_string(),
                latency: 22.87,
                lat: "50.1109".to_string(),
                lon: "8.6821".to_string(),
            },
            client: ClientInfo {
                ip: "203.0.113.7".to_string(),
                lat: "52.5200".to_string(),
                lon: "13.4050".to_string(),
                country: "DE".to_string(),
                isp: "Deutsche Telekom".to_string(),
                isprating: "3.7".to_string(),
            },
            share: "https://www.speedtest.net/result/123456789.png".to_string(),
        }
    }

    #[test]
    fn zero_bytes() {
        assert_eq!(readable_size(0.0), "0B");
    }

    #[test]
    fn exact_unit_boundaries() {
        assert_eq!(readable_size(1024.0), "1.0 KB");
        assert_eq!(readable_size(1_048_576.0), "1.0 MB");
        assert_eq!(readable_size(1024f64.powi(3)), "1.0 GB");
        assert_eq!(readable_size(1024f64.powi(4)), "1.0 TB");
    }

    #[test]
    fn sub_kilobyte_stays_in_bytes() {
        assert_eq!(readable_size(512.0), "512.0 B");
        assert_eq!(readable_size(0.5), "0.5 B");
    }

    #[test]
    fn fractional_sizes() {
        assert_eq!(readable_size(1_280_000.0), "1.22 MB");
        assert_eq!(readable_size(1536.0), "1.5 KB");
    }

    #[test]
    fn clamps_to_terabytes() {
        let huge = 1024f64.powi(5) * 3.0;
        assert_eq!(readable_size(huge), "3072.0 TB");
    }

    #[test]
    fn scaling_is_invertible_within_rounding() {
        for &bytes in &[
            1.0,
            999.0,
            1024.0,
            53_687.0,
            1_048_576.0,
            987_654_321.0,
            5_000_000_000_000.0,
        ] {
            let rendered = readable_size(bytes);
            let (number, unit) = rendered.split_once(' ').unwrap();
            let index = SIZE_UNITS.iter().position(|&u| u == unit).unwrap();
            let factor = 1024f64.powi(index as i32);
            let back = number.parse::<f64>().unwrap() * factor;
            // 2-decimal rounding puts us within half a hundredth of a unit.
            assert!(
                (back - bytes).abs() <= 0.005 * factor + f64::EPSILON,
                "{rendered} round-trips to {back}, expected ~{bytes}"
            );
        }
    }

    #[test]
    fn report_contains_every_field_exactly_once() {
        let result = sample_result();
        let report = build_report(&result);

        let expected = [
            // upload/download are bits per second, shown as bytes per second
            format!("<code>{}/s</code>", readable_size(result.upload / 8.0)),
            format!("<code>{}/s</code>", readable_size(result.download / 8.0)),
            "<code>23.419 ms</code>".to_string(),
            "<code>2026-08-06T09:14:53Z</code>".to_string(),
            format!("<code>{}</code>", readable_size(result.bytes_sent as f64)),
            format!("<code>{}</code>", readable_size(result.bytes_received as f64)),
            "<code>Frankfurt</code>".to_string(),
            "<code>Germany, DE</code>".to_string(),
            "<code>M&amp;M Networks</code>".to_string(),
            "<code>22.87</code>".to_string(),
            "<code>50.1109</code>".to_string(),
            "<code>8.6821</code>".to_string(),
            "<code>203.0.113.7</code>".to_string(),
            "<code>52.5200</code>".to_string(),
            "<code>13.4050</code>".to_string(),
            "<code>DE</code>".to_string(),
            "<code>Deutsche Telekom</code>".to_string(),
            "<code>3.7</code>".to_string(),
        ];

        for needle in &expected {
            assert_eq!(
                report.matches(needle.as_str()).count(),
                1,
                "expected exactly one occurrence of {needle} in:\n{report}"
            );
        }
    }

    #[test]
    fn report_escapes_backend_strings() {
        let mut result = sample_result();
        result.server.sponsor = "<script>alert(1)</script>".to_string();
        let report = build_report(&result);
        assert!(!report.contains("<script>"));
        assert!(report.contains("&lt;script&gt;"));
    }
}
