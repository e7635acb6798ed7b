//! RFC5424 ("structured data") syslog parsing.

use std::sync::OnceLock;

use regex::Regex;

use super::ParsedFields;

fn pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?x)
            ^<(?P<pri>\d{1,3})>
            (?P<version>\d+)\s
            (?P<ts>\S+)\s
            (?P<host>\S+)\s
            (?P<app>\S+)\s
            (?P<procid>\S+)\s
            (?P<msgid>\S+)\s
            (?P<sd>-|\[.*\])
            (?:\s(?P<msg>.*))?$
            ",
        )
        .expect("static RFC5424 pattern is valid")
    })
}

pub fn parse(input: &str) -> Option<ParsedFields> {
    let caps = pattern().captures(input)?;
    let pri: u16 = caps.name("pri")?.as_str().parse().ok()?;
    let severity = (pri % 8) as u8;

    let app = caps.name("app")?.as_str();
    let tag = if app == "-" { String::new() } else { app.to_string() };

    Some(ParsedFields {
        hostname: caps.name("host")?.as_str().to_string(),
        tag,
        severity,
        content: caps.name("msg").map(|m| m.as_str().to_string()).unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_rfc5424() {
        let got = parse(
            "<34>1 2003-10-11T22:14:15.003Z mymachine.example.com su - ID47 - 'su root' failed for lonvick",
        )
        .unwrap();
        assert_eq!(got.hostname, "mymachine.example.com");
        assert_eq!(got.tag, "su");
        assert_eq!(got.severity, 2);
        assert_eq!(got.content, "'su root' failed for lonvick");
    }

    #[test]
    fn dash_app_name_yields_empty_tag() {
        let got = parse("<13>1 2003-10-11T22:14:15Z host - - - - hello").unwrap();
        assert_eq!(got.tag, "");
    }

    #[test]
    fn rfc3164_input_does_not_match_rfc5424() {
        assert!(parse("<34>Oct 11 22:14:15 mymachine su: 'su root' failed").is_none());
    }
}
