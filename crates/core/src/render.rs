//! Per-platform notification text.
//!
//! Content is written once against a small set of inline styles. Each style
//! has one arm per platform.

use std::fmt::Write as _;

use crate::destinations::Platform;
use crate::events::{
    Burn, Delegation, DelegationKind, LiquidityDeposit, NotificationContent, Swap, VolumeSummary,
};

/// Render `content` for `platform`, linking transactions under `explorer_url`.
#[must_use]
pub fn render(platform: Platform, content: &NotificationContent, explorer_url: &str) -> String {
    let w = Writer {
        platform,
        explorer_url: explorer_url.trim_end_matches('/'),
    };
    match content {
        NotificationContent::Swap(swap) => w.swap(swap),
        NotificationContent::Burn(burn) => w.burn(burn),
        NotificationContent::Liquidity(deposit) => w.liquidity(deposit),
        NotificationContent::Delegation(delegation) => w.delegation(delegation),
        NotificationContent::VolumeSummary(summary) => w.volume(summary),
    }
}

struct Writer<'a> {
    platform: Platform,
    explorer_url: &'a str,
}

impl Writer<'_> {
    fn text(&self, s: &str) -> String {
        match self.platform {
            Platform::Telegram => escape_html(s),
            Platform::Discord | Platform::Twitter => s.to_string(),
        }
    }

    fn title(&self, emoji: &str, s: &str) -> String {
        match self.platform {
            Platform::Discord => format!("{emoji} **{s}**"),
            Platform::Telegram => format!("{emoji} <b>{}</b>", escape_html(s)),
            Platform::Twitter => format!("{emoji} {s}"),
        }
    }

    fn address(&self, s: &str) -> String {
        let short = shorten(s);
        match self.platform {
            Platform::Discord => format!("`{short}`"),
            Platform::Telegram => format!("<code>{}</code>", escape_html(&short)),
            Platform::Twitter => short,
        }
    }

    fn tx_link(&self, tx_hash: &str) -> String {
        let url = format!("{}/tx/{tx_hash}", self.explorer_url);
        match self.platform {
            Platform::Discord => format!("[View transaction](<{url}>)"),
            Platform::Telegram => format!("<a href=\"{}\">View transaction</a>", escape_html(&url)),
            Platform::Twitter => url,
        }
    }

    fn swap(&self, swap: &Swap) -> String {
        let mut out = self.title("🔄", "New swap");
        let _ = write!(
            out,
            "\n{} {} → {} {} ({})",
            format_amount(swap.amount_in),
            self.text(&swap.token_in),
            format_amount(swap.amount_out),
            self.text(&swap.token_out),
            format_usd(swap.usd_value),
        );
        let _ = write!(out, "\nTrader: {}", self.address(&swap.trader));
        let _ = write!(out, "\n{}", self.tx_link(&swap.tx_hash));
        out
    }

    fn burn(&self, burn: &Burn) -> String {
        let mut out = self.title("🔥", "New burn");
        let _ = write!(
            out,
            "\n{} {} burned ({})",
            format_amount(burn.amount),
            self.text(&burn.token),
            format_usd(burn.usd_value),
        );
        let _ = write!(out, "\nBy: {}", self.address(&burn.burner));
        let _ = write!(out, "\n{}", self.tx_link(&burn.tx_hash));
        out
    }

    fn liquidity(&self, deposit: &LiquidityDeposit) -> String {
        let mut out = self.title("💧", "New liquidity");
        let _ = write!(
            out,
            "\n{} {} + {} {} ({})",
            format_amount(deposit.amount_a),
            self.text(&deposit.token_a),
            format_amount(deposit.amount_b),
            self.text(&deposit.token_b),
            format_usd(deposit.usd_value),
        );
        let _ = write!(out, "\nPool: {}", self.address(&deposit.pool));
        let _ = write!(out, "\nProvider: {}", self.address(&deposit.provider));
        let _ = write!(out, "\n{}", self.tx_link(&deposit.tx_hash));
        out
    }

    fn delegation(&self, delegation: &Delegation) -> String {
        let (title, verb) = match delegation.kind {
            DelegationKind::Delegate => ("New delegation", "delegated to"),
            DelegationKind::Undelegate => ("Undelegation", "withdrawn from"),
        };
        let mut out = self.title("🥩", title);
        let _ = write!(
            out,
            "\n{} {verb} {}",
            format_amount(delegation.amount),
            self.address(&delegation.validator),
        );
        let _ = write!(out, "\nDelegator: {}", self.address(&delegation.delegator));
        let _ = write!(out, "\n{}", self.tx_link(&delegation.tx_hash));
        out
    }

    fn volume(&self, summary: &VolumeSummary) -> String {
        let mut out = self.title("📊", "Volume summary");
        let _ = write!(
            out,
            "\n{} – {} UTC",
            summary.period_start.format("%Y-%m-%d %H:%M"),
            summary.period_end.format("%Y-%m-%d %H:%M"),
        );
        let _ = write!(out, "\nVolume: {}", format_usd(summary.volume_usd));
        let _ = write!(out, "\nSwaps: {}", group_digits(&summary.swap_count.to_string()));
        let _ = write!(
            out,
            "\nTraders: {}",
            group_digits(&summary.unique_traders.to_string())
        );
        let _ = write!(out, "\nBurned: {}", format_usd(summary.burned_usd));
        out
    }
}

/// `$1,234.50`
#[must_use]
pub fn format_usd(value: f64) -> String {
    let fixed = format_fixed(value, 2);
    match fixed.strip_prefix('-') {
        Some(abs) => format!("-${abs}"),
        None => format!("${fixed}"),
    }
}

/// Token amount with separators and up to four decimals, trailing zeros dropped.
#[must_use]
pub fn format_amount(value: f64) -> String {
    let fixed = format_fixed(value, 4);
    if fixed.contains('.') {
        fixed.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        fixed
    }
}

fn format_fixed(value: f64, decimals: usize) -> String {
    let raw = format!("{:.*}", decimals, value.abs());
    let (int, frac) = raw.split_once('.').unwrap_or((raw.as_str(), ""));
    let sign = if value < 0.0 && raw.chars().any(|c| c.is_ascii_digit() && c != '0') {
        "-"
    } else {
        ""
    };
    if frac.is_empty() {
        format!("{sign}{}", group_digits(int))
    } else {
        format!("{sign}{}.{frac}", group_digits(int))
    }
}

fn group_digits(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn shorten(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 14 {
        return address.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}…{tail}")
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::cursor::Cursor;

    const EXPLORER: &str = "https://explorer.example/";

    fn burn() -> Burn {
        Burn {
            id: Cursor(11),
            timestamp: Utc.with_ymd_and_hms(2026, 10, 14, 9, 0, 0).unwrap(),
            tx_hash: "0xabc".into(),
            burner: "0x1111222233334444555566667777888899990000".into(),
            token: "<GLD>".into(),
            amount: 1_500_000.0,
            usd_value: 4.21,
        }
    }

    #[test]
    fn test_format_usd() {
        assert_eq!(format_usd(4.21), "$4.21");
        assert_eq!(format_usd(1_234_567.891), "$1,234,567.89");
        assert_eq!(format_usd(0.0), "$0.00");
        assert_eq!(format_usd(-12.5), "-$12.50");
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(1_500_000.0), "1,500,000");
        assert_eq!(format_amount(0.5), "0.5");
        assert_eq!(format_amount(999.25), "999.25");
        assert_eq!(format_amount(1000.0), "1,000");
    }

    #[test]
    fn test_group_digits() {
        assert_eq!(group_digits("1"), "1");
        assert_eq!(group_digits("123"), "123");
        assert_eq!(group_digits("1234"), "1,234");
        assert_eq!(group_digits("123456789"), "123,456,789");
    }

    #[test]
    fn test_shorten_long_addresses_only() {
        assert_eq!(shorten("0xabc"), "0xabc");
        assert_eq!(
            shorten("0x1111222233334444555566667777888899990000"),
            "0x1111…0000"
        );
    }

    #[test]
    fn test_discord_uses_markdown() {
        let text = render(
            Platform::Discord,
            &NotificationContent::Burn(burn()),
            EXPLORER,
        );
        assert!(text.starts_with("🔥 **New burn**"));
        assert!(text.contains("1,500,000 <GLD> burned ($4.21)"));
        assert!(text.contains("`0x1111…0000`"));
        assert!(text.contains("(<https://explorer.example/tx/0xabc>)"));
    }

    #[test]
    fn test_telegram_escapes_html() {
        let text = render(
            Platform::Telegram,
            &NotificationContent::Burn(burn()),
            EXPLORER,
        );
        assert!(text.starts_with("🔥 <b>New burn</b>"));
        assert!(text.contains("&lt;GLD&gt;"));
        assert!(!text.contains("<GLD>"));
        assert!(text.contains("<a href=\"https://explorer.example/tx/0xabc\">"));
    }

    #[test]
    fn test_twitter_is_plain() {
        let text = render(
            Platform::Twitter,
            &NotificationContent::Burn(burn()),
            EXPLORER,
        );
        assert!(!text.contains("**"));
        assert!(!text.contains('`'));
        assert!(text.ends_with("https://explorer.example/tx/0xabc"));
    }

    #[test]
    fn test_volume_summary() {
        let summary = VolumeSummary {
            period_start: Utc.with_ymd_and_hms(2026, 10, 13, 0, 0, 0).unwrap(),
            period_end: Utc.with_ymd_and_hms(2026, 10, 14, 0, 0, 0).unwrap(),
            volume_usd: 98_765.4,
            swap_count: 1234,
            unique_traders: 56,
            burned_usd: 12.0,
        };
        let text = render(
            Platform::Discord,
            &NotificationContent::VolumeSummary(summary),
            EXPLORER,
        );
        assert!(text.contains("2026-10-13 00:00 – 2026-10-14 00:00 UTC"));
        assert!(text.contains("Volume: $98,765.40"));
        assert!(text.contains("Swaps: 1,234"));
        assert!(text.contains("Burned: $12.00"));
    }
}
