//! Button label formatting

/// Label shown when a button has no timer bound to it
pub const NOT_SET_LABEL: &str = "Timer\nNot Set";

/// Label shown when the bound timer no longer exists
pub const NOT_FOUND_LABEL: &str = "Timer\nNot Found";

/// Remaining time of a running countdown: `H:MM:SS` from one hour up, else `MM:SS`
pub fn format_remaining(remaining_ms: u64) -> String {
    let total_seconds = remaining_ms / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

/// Two-line button label
pub fn label(name: &str, time: &str) -> String {
    format!("{}\n{}", name, time)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_countdowns_omit_hours() {
        assert_eq!(format_remaining(0), "00:00");
        assert_eq!(format_remaining(59_999), "00:59");
        assert_eq!(format_remaining(5 * 60 * 1000), "05:00");
        assert_eq!(format_remaining(3_599_000), "59:59");
    }

    #[test]
    fn long_countdowns_show_single_digit_hours() {
        assert_eq!(format_remaining(3_600_000), "1:00:00");
        assert_eq!(format_remaining(2 * 3_600_000 + 61_000), "2:01:01");
    }
}
