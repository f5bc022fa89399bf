use anyhow::{bail, Context, Result};
use regex::Regex;
use std::sync::OnceLock;

fn units_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:(\d+)w)?(?:(\d+)d)?(?:(\d+)h)?(?:(\d+)m)?(?:(\d+)s)?$").unwrap()
    })
}

/// Parse a duration into whole seconds.
///
/// Accepted forms: plain seconds (`"3600"`), unit strings (`"1w"`, `"1d2h30m2s"`, with
/// optional spaces), and clock strings (`"30:02"`, `"26:30:02"`, `"1:02:30:02"` as
/// `d:h:m:s`).
pub fn parse_time_delta(input: &str) -> Result<i64> {
    let s: String = input.chars().filter(|c| !c.is_whitespace()).collect::<String>().to_lowercase();
    if s.is_empty() {
        bail!("empty time delta");
    }
    if let Ok(secs) = s.parse::<i64>() {
        if secs < 0 {
            bail!("time delta must not be negative: '{input}'");
        }
        return Ok(secs);
    }
    if s.contains(':') {
        let parts = s.split(':').map(|p| p.parse::<i64>()).collect::<Result<Vec<_>, _>>();
        let weights: &[i64] = match parts.as_ref().map(Vec::len) {
            Ok(2) => &[60, 1],
            Ok(3) => &[3600, 60, 1],
            Ok(4) => &[86_400, 3600, 60, 1],
            _ => bail!("unrecognised clock-style time delta '{input}'"),
        };
        let parts = parts.unwrap_or_default();
        if parts.iter().any(|p| *p < 0) {
            bail!("time delta must not be negative: '{input}'");
        }
        let mut total = 0i64;
        for (p, w) in parts.iter().zip(weights) {
            total = p
                .checked_mul(*w)
                .and_then(|v| total.checked_add(v))
                .with_context(|| format!("time delta too large: '{input}'"))?;
        }
        return Ok(total);
    }
    match units_re().captures(&s) {
        Some(caps) => {
            let weights = [604_800i64, 86_400, 3600, 60, 1];
            let mut total = 0i64;
            for (i, w) in weights.iter().enumerate() {
                if let Some(m) = caps.get(i + 1) {
                    let v: i64 = m.as_str().parse()?;
                    total = v
                        .checked_mul(*w)
                        .and_then(|v| total.checked_add(v))
                        .with_context(|| format!("time delta too large: '{input}'"))?;
                }
            }
            Ok(total)
        }
        None => bail!("unrecognised time delta '{input}' (try 3600, 1h, 1d2h30m2s or 26:30:02)"),
    }
}
