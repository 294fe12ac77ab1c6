//! Satoshi formatting for sweep summaries

/// Satoshis per Bitcoin
pub const SATS_PER_BTC: u64 = 100_000_000;

/// Satoshis as a BTC string (e.g., "0.00100000"), exact for any amount
pub fn sats_to_btc_string(sats: u64) -> String {
    format!("{}.{:08}", sats / SATS_PER_BTC, sats % SATS_PER_BTC)
}

/// e.g., 100000 -> "100,000 sats (0.00100000 BTC)"
pub fn sats_to_display(sats: u64) -> String {
    format!(
        "{} sats ({} BTC)",
        format_with_commas(sats),
        sats_to_btc_string(sats)
    )
}

/// Format number with thousands separators
pub fn format_with_commas(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);

    for (i, c) in s.chars().enumerate() {
        if i > 0 && (s.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sats_to_btc() {
        assert_eq!(sats_to_btc_string(0), "0.00000000");
        assert_eq!(sats_to_btc_string(1), "0.00000001");
        assert_eq!(sats_to_btc_string(100_000_000), "1.00000000");
        assert_eq!(sats_to_btc_string(123_456_789), "1.23456789");
        assert_eq!(sats_to_btc_string(u64::MAX), "184467440737.09551615");
    }

    #[test]
    fn test_display_format() {
        assert_eq!(sats_to_display(842), "842 sats (0.00000842 BTC)");
        let display = sats_to_display(1_000_000);
        assert!(display.contains("1,000,000"));
        assert!(display.contains("0.01000000 BTC"));
    }

    #[test]
    fn test_commas() {
        assert_eq!(format_with_commas(0), "0");
        assert_eq!(format_with_commas(999), "999");
        assert_eq!(format_with_commas(1_000), "1,000");
        assert_eq!(format_with_commas(12_345_678), "12,345,678");
    }
}
