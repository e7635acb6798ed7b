//! Syslog severity (0..7) to internal [`crate::message::Priority`] (0..5) mapping.

/// Maps a syslog severity code (0-7, guaranteed by both RFC parsers) to the
/// internal priority ladder. `Trace` (0) is reserved for internal use and is
/// never produced here.
pub fn syslog_to_priority(severity: u8) -> u8 {
    match severity {
        0 | 1 | 2 => 5, // Emerg/Alert/Crit -> Fatal
        3 => 4,         // Error
        4 => 3,         // Warning
        5 | 6 => 2,     // Notice/Info
        7 => 1,         // Debug
        _ => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_the_severity_table_exactly() {
        assert_eq!(syslog_to_priority(0), 5);
        assert_eq!(syslog_to_priority(1), 5);
        assert_eq!(syslog_to_priority(2), 5);
        assert_eq!(syslog_to_priority(3), 4);
        assert_eq!(syslog_to_priority(4), 3);
        assert_eq!(syslog_to_priority(5), 2);
        assert_eq!(syslog_to_priority(6), 2);
        assert_eq!(syslog_to_priority(7), 1);
    }
}
