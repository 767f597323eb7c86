//! Display formatting for currency amounts

use crate::amount::StandardAmount;

/// Suffixes for abbreviated amounts, indexed by power of one thousand
const ABBREVIATIONS: [&str; 5] = ["", "k", "m", "b", "t"];

/// Significant digits shown for abbreviated amounts
const ABBREVIATED_LENGTH: usize = 6;

/// Formats an amount for display.
///
/// - values of one million and above are abbreviated (`12.3457m`)
/// - values from one up to 999,999.99 keep two decimals with thousands separators
/// - values below one keep six decimals
///
/// Trailing fractional zeros are always trimmed.
pub fn format_currency_unit(input: &StandardAmount) -> String {
    let one = StandardAmount::from(1);

    if *input >= one {
        if input.round_half_up(2) >= StandardAmount::from(1_000_000) {
            return abbreviate(input);
        }
        return thousands_separated(&input.round_half_up(2));
    }

    input.round_half_up(6).to_string()
}

fn abbreviate(input: &StandardAmount) -> String {
    let mut power = ABBREVIATIONS.len() - 1;
    while power > 0 && *input < StandardAmount::from(1000u64.pow(power as u32)) {
        power -= 1;
    }

    loop {
        let scaled = input.shift_left(3 * power as u32);
        let integer_digits = scaled.trunc().to_string().len();
        let mantissa = ABBREVIATED_LENGTH.saturating_sub(integer_digits) as u32;
        let rounded = scaled.round_half_up(mantissa);

        // Rounding can carry into the next unit, e.g. 999999.9999m
        if power < ABBREVIATIONS.len() - 1 && rounded >= StandardAmount::from(1000) {
            power += 1;
            continue;
        }
        return format!("{}{}", rounded, ABBREVIATIONS[power]);
    }
}

fn thousands_separated(input: &StandardAmount) -> String {
    let text = input.to_string();
    let (integer, fraction) = match text.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (text.as_str(), None),
    };

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (i, c) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    match fraction {
        Some(f) => format!("{}.{}", grouped, f),
        None => grouped,
    }
}
