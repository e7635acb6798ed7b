//! RFC3164 ("BSD syslog") parsing.
//!
//! Lenient by design, matching real-world senders: the `TAG[PID]:` suffix
//! commonly omits the trailing colon, and the PID field is not always
//! numeric, so both are accepted loosely.

use std::sync::OnceLock;

use regex::Regex;

use super::ParsedFields;

fn pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?x)
            ^<(?P<pri>\d{1,3})>
            (?P<ts>[A-Za-z]{3}\s+\d{1,2}\s\d{2}:\d{2}:\d{2})\s
            (?P<host>\S+)\s
            (?P<tag>[^:\[\s]+)
            (?:\[(?P<pid>[^\]]*)\])?
            :?\s?
            (?P<msg>.*)$
            ",
        )
        .expect("static RFC3164 pattern is valid")
    })
}

pub fn parse(input: &str) -> Option<ParsedFields> {
    let caps = pattern().captures(input)?;
    let pri: u16 = caps.name("pri")?.as_str().parse().ok()?;
    let severity = (pri % 8) as u8;

    Some(ParsedFields {
        hostname: caps.name("host")?.as_str().to_string(),
        tag: caps.name("tag")?.as_str().to_string(),
        severity,
        content: caps.name("msg")?.as_str().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_rfc3164_with_colon() {
        let got = parse("<34>Oct 11 22:14:15 mymachine su: 'su root' failed").unwrap();
        assert_eq!(got.hostname, "mymachine");
        assert_eq!(got.tag, "su");
        assert_eq!(got.severity, 2);
        assert_eq!(got.content, "'su root' failed");
    }

    #[test]
    fn parses_colon_less_tag_with_non_numeric_pid() {
        let got = parse("<83>Mar 11 14:13:12 web2 apache[error] ello, your app is broke").unwrap();
        assert_eq!(got.hostname, "web2");
        assert_eq!(got.tag, "apache");
        assert_eq!(got.severity, 3);
        assert_eq!(got.content, "ello, your app is broke");
    }

    #[test]
    fn non_syslog_input_does_not_match() {
        assert!(parse("this would have the tag \"syslog-raw\"").is_none());
    }
}
