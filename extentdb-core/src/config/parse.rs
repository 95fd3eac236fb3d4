//! Strict parsing of option values
//!
//! Nothing here defaults on bad input: text that is not a number and a number
//! that does not fit are reported as different errors.

use super::FlushTimer;
use crate::limits::{MAX_GC_HIGH_RATIO, MIN_GC_LOW_RATIO};
use crate::ConfigError;
use std::num::IntErrorKind;

/// Literal accepted by `--flush-timer` to turn the timer off
pub const FLUSH_TIMER_DISABLE: &str = "disable";

/// Parse a decimal integer, telling "not a number" apart from "too big"
pub fn parse_number(option: &'static str, value: &str) -> Result<i128, ConfigError> {
    value.parse::<i128>().map_err(|e| match e.kind() {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => ConfigError::OutOfRange {
            option,
            value: value.to_string(),
            min: i128::MIN,
            max: i128::MAX,
        },
        _ => ConfigError::NotANumber {
            option,
            value: value.to_string(),
        },
    })
}

/// Parse an integer that must lie in `[min, max]`
pub fn parse_in_range(
    option: &'static str,
    value: &str,
    min: i128,
    max: i128,
) -> Result<i128, ConfigError> {
    let n = parse_number(option, value)?;
    if n < min || n > max {
        return Err(ConfigError::OutOfRange {
            option,
            value: value.to_string(),
            min,
            max,
        });
    }
    Ok(n)
}

/// Parse `"low-high"`. The whole token must be consumed.
pub fn parse_gc_range(value: &str) -> Result<(f32, f32), ConfigError> {
    // The separator is the first '-' that leaves two valid floats; a leading
    // sign or an exponent sign never splits.
    let parsed = value
        .char_indices()
        .filter(|&(i, c)| c == '-' && i > 0)
        .find_map(|(i, _)| {
            let low = value[..i].parse::<f32>().ok()?;
            let high = value[i + 1..].parse::<f32>().ok()?;
            Some((low, high))
        });

    let (low, high) = parsed.ok_or_else(|| ConfigError::MalformedGcRange {
        value: value.to_string(),
    })?;

    check_gc_range(low, high)?;
    Ok((low, high))
}

/// `MIN_GC_LOW_RATIO <= low < high <= MAX_GC_HIGH_RATIO`
pub fn check_gc_range(low: f32, high: f32) -> Result<(), ConfigError> {
    if !(MIN_GC_LOW_RATIO <= low && low < high && high <= MAX_GC_HIGH_RATIO) {
        return Err(ConfigError::GcRangeOutOfBounds {
            low,
            high,
            min: MIN_GC_LOW_RATIO,
            max: MAX_GC_HIGH_RATIO,
        });
    }
    Ok(())
}

/// Parse `--flush-timer`: milliseconds or `disable`
pub fn parse_flush_timer(value: &str) -> Result<FlushTimer, ConfigError> {
    if value == FLUSH_TIMER_DISABLE {
        return Ok(FlushTimer::Never);
    }

    let ms = parse_number("flush-timer", value)?;
    if ms < 0 {
        return Err(ConfigError::NegativeFlushTimer {
            value: ms.try_into().unwrap_or(i64::MIN),
        });
    }
    let ms = u32::try_from(ms).map_err(|_| ConfigError::OutOfRange {
        option: "flush-timer",
        value: value.to_string(),
        min: 0,
        max: u32::MAX as i128,
    })?;
    Ok(FlushTimer::Millis(ms))
}

/// Parse `--wait-for-flush`: `y` or `n`
pub fn parse_yes_no(value: &str) -> Result<bool, ConfigError> {
    match value {
        "y" => Ok(true),
        "n" => Ok(false),
        _ => Err(ConfigError::InvalidWaitForFlush {
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_number_vs_overflow() {
        assert_eq!(parse_number("cores", "12"), Ok(12));
        assert_eq!(parse_number("cores", "-3"), Ok(-3));
        assert!(matches!(
            parse_number("cores", "twelve"),
            Err(ConfigError::NotANumber { option: "cores", .. })
        ));
        assert!(matches!(
            parse_number("cores", "12abc"),
            Err(ConfigError::NotANumber { .. })
        ));
        assert!(matches!(
            parse_number("cores", ""),
            Err(ConfigError::NotANumber { .. })
        ));
        let huge = "9".repeat(60);
        assert!(matches!(
            parse_number("cores", &huge),
            Err(ConfigError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_in_range() {
        assert_eq!(parse_in_range("port", "8080", 0, 65535), Ok(8080));
        let err = parse_in_range("port", "70000", 0, 65535).unwrap_err();
        assert_eq!(
            err.to_string(),
            "--port value 70000 is out of range [0, 65535]"
        );
    }

    #[test]
    fn test_gc_range() {
        assert_eq!(parse_gc_range("0.5-0.75"), Ok((0.5, 0.75)));
        assert_eq!(parse_gc_range("1e-2-0.5"), Ok((0.01, 0.5)));
        assert!(matches!(
            parse_gc_range("0.1-0.2extra"),
            Err(ConfigError::MalformedGcRange { .. })
        ));
        assert!(matches!(
            parse_gc_range("0.5"),
            Err(ConfigError::MalformedGcRange { .. })
        ));
        assert!(matches!(
            parse_gc_range("0.7-0.6"),
            Err(ConfigError::GcRangeOutOfBounds { .. })
        ));
        assert!(matches!(
            parse_gc_range("0.5-0.5"),
            Err(ConfigError::GcRangeOutOfBounds { .. })
        ));
        assert!(matches!(
            parse_gc_range("0-0.5"),
            Err(ConfigError::GcRangeOutOfBounds { .. })
        ));
        assert!(matches!(
            parse_gc_range("0.5-1"),
            Err(ConfigError::GcRangeOutOfBounds { .. })
        ));
        assert!(matches!(
            parse_gc_range("-0.5-0.7"),
            Err(ConfigError::GcRangeOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_flush_timer() {
        assert_eq!(parse_flush_timer("disable"), Ok(FlushTimer::Never));
        assert_eq!(parse_flush_timer("2000"), Ok(FlushTimer::Millis(2000)));
        assert_eq!(parse_flush_timer("0"), Ok(FlushTimer::Millis(0)));
        assert_eq!(
            parse_flush_timer("-5"),
            Err(ConfigError::NegativeFlushTimer { value: -5 })
        );
        assert!(matches!(
            parse_flush_timer("soon"),
            Err(ConfigError::NotANumber { .. })
        ));
        assert!(matches!(
            parse_flush_timer("Disable"),
            Err(ConfigError::NotANumber { .. })
        ));
    }

    #[test]
    fn test_yes_no() {
        assert_eq!(parse_yes_no("y"), Ok(true));
        assert_eq!(parse_yes_no("n"), Ok(false));
        assert!(parse_yes_no("yes").is_err());
        assert!(parse_yes_no("").is_err());
    }

    proptest! {
        #[test]
        fn test_gc_range_exact(low in MIN_GC_LOW_RATIO..MAX_GC_HIGH_RATIO, high in MIN_GC_LOW_RATIO..=MAX_GC_HIGH_RATIO) {
            let token = format!("{}-{}", low, high);
            let result = parse_gc_range(&token);
            if low < high {
                prop_assert_eq!(result, Ok((low, high)));
            } else {
                prop_assert!(result.is_err());
            }
        }

        #[test]
        fn test_gc_range_trailing_garbage(low in 0.01f32..0.5, high in 0.5f32..0.99, junk in "[a-z%]{1,5}") {
            let token = format!("{}-{}{}", low, high, junk);
            prop_assert!(parse_gc_range(&token).is_err());
        }
    }
}
