//! ACL rule-file parser.
//!
//! One rule per line: `ACTION TYPE [VALUE] [HIJACK-TARGET]`, for example
//!
//! ```text
//! # comments and blank lines are skipped
//! direct domain-suffix internal.corp
//! block country cn
//! hijack ip 8.8.8.8 127.0.0.1
//! proxy all
//! ```
//!
//! Condition types: `domain`, `domain-suffix`, `cidr`, `ip`, `country`, `all`.
//! `all` takes no value, so a hijack target follows it directly
//! (`hijack all 127.0.0.1`). Keywords are case-insensitive; fields beyond the
//! ones a rule uses are an error.

use std::net::IpAddr;

use ipnet::IpNet;

use crate::error::RulesError;
use crate::rule::{Action, Condition, Rule};

/// Parse a whole ACL file.
///
/// Errors carry the 1-based line number of the offending rule.
pub fn parse_acl(content: &str) -> Result<Vec<Rule>, RulesError> {
    let mut rules = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let rule = parse_rule(line).map_err(|e| RulesError::Line {
            line: idx + 1,
            source: Box::new(e),
        })?;
        rules.push(rule);
    }

    Ok(rules)
}

/// Parse a single rule line (e.g. "proxy domain-suffix google.com").
pub fn parse_rule(line: &str) -> Result<Rule, RulesError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 2 {
        return Err(RulesError::Parse(format!(
            "expecting at least 2 fields, got {}",
            fields.len()
        )));
    }

    let cond_type = fields[1];
    let (value, rest) = if cond_type.eq_ignore_ascii_case("all") {
        ("", &fields[2..])
    } else {
        (
            fields.get(2).copied().unwrap_or(""),
            fields.get(3..).unwrap_or_default(),
        )
    };
    let condition = parse_condition(cond_type, value)?;

    let (action, extra) = match fields[0].to_ascii_lowercase().as_str() {
        "direct" => (Action::Direct, rest),
        "proxy" => (Action::Proxy, rest),
        "block" => (Action::Block, rest),
        "hijack" => {
            let (target, extra) = rest.split_first().ok_or_else(|| {
                RulesError::MissingHijackTarget(format!("{cond_type} {value}").trim_end().to_string())
            })?;
            (Action::Hijack((*target).to_string()), extra)
        }
        _ => return Err(RulesError::InvalidAction(fields[0].to_string())),
    };

    if !extra.is_empty() {
        return Err(RulesError::Parse(format!(
            "unexpected trailing fields: {}",
            extra.join(" ")
        )));
    }

    Ok(Rule::new(action, condition))
}

fn parse_condition(cond_type: &str, value: &str) -> Result<Condition, RulesError> {
    match cond_type.to_ascii_lowercase().as_str() {
        "domain" => {
            if value.is_empty() {
                return Err(RulesError::Parse("empty domain".into()));
            }
            Ok(Condition::Domain(value.to_ascii_lowercase()))
        }
        "domain-suffix" => {
            let suffix = value.strip_prefix('.').unwrap_or(value);
            if suffix.is_empty() {
                return Err(RulesError::Parse("empty domain suffix".into()));
            }
            Ok(Condition::DomainSuffix(suffix.to_ascii_lowercase()))
        }
        "cidr" => {
            let net: IpNet = value
                .parse()
                .map_err(|e| RulesError::InvalidCidr(format!("{value}: {e}")))?;
            Ok(Condition::Cidr(net.trunc()))
        }
        "ip" => {
            let ip: IpAddr = value
                .parse()
                .map_err(|_| RulesError::InvalidIp(value.to_string()))?;
            let ip = ip.to_canonical();
            let prefix = if ip.is_ipv4() { 32 } else { 128 };
            let net = IpNet::new(ip, prefix)
                .map_err(|e| RulesError::InvalidIp(format!("{value}: {e}")))?;
            Ok(Condition::Cidr(net))
        }
        "country" => {
            if value.is_empty() {
                return Err(RulesError::Parse("empty country".into()));
            }
            Ok(Condition::Country(value.to_ascii_uppercase()))
        }
        "all" => Ok(Condition::All),
        _ => Err(RulesError::InvalidCondition(cond_type.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_all_condition_types() {
        let content = r#"
# ACL example
direct domain Internal.Example.com
proxy domain-suffix google.com
block cidr 192.168.1.1/24
hijack ip 8.8.8.8 127.0.0.1
block country cn
proxy all
"#;
        let rules = parse_acl(content).unwrap();
        assert_eq!(rules.len(), 6);
        assert_eq!(
            rules[0].condition(),
            &Condition::Domain("internal.example.com".into())
        );
        assert_eq!(rules[0].action(), &Action::Direct);
        assert_eq!(
            rules[1].condition(),
            &Condition::DomainSuffix("google.com".into())
        );
        assert_eq!(
            rules[2].condition(),
            &Condition::Cidr("192.168.1.0/24".parse().unwrap())
        );
        assert_eq!(rules[3].action(), &Action::Hijack("127.0.0.1".into()));
        assert_eq!(
            rules[3].condition(),
            &Condition::Cidr("8.8.8.8/32".parse().unwrap())
        );
        assert_eq!(rules[4].condition(), &Condition::Country("CN".into()));
        assert_eq!(rules[5].condition(), &Condition::All);
    }

    #[test]
    fn parse_ipv6_ip_is_host_route() {
        let rule = parse_rule("direct ip 2001:db8::1").unwrap();
        assert_eq!(
            rule.condition(),
            &Condition::Cidr("2001:db8::1/128".parse().unwrap())
        );
    }

    #[test]
    fn keywords_case_insensitive() {
        let rule = parse_rule("BLOCK Domain-Suffix Ads.Example").unwrap();
        assert_eq!(rule.action(), &Action::Block);
        assert_eq!(rule.condition(), &Condition::DomainSuffix("ads.example".into()));
    }

    #[test]
    fn suffix_leading_dot_stripped() {
        let rule = parse_rule("proxy domain-suffix .apple.com").unwrap();
        assert_eq!(rule.condition(), &Condition::DomainSuffix("apple.com".into()));
    }

    #[test]
    fn comments_and_blank_lines_skipped() {
        let content = "\n   # comment\n\nproxy all\n  \n";
        assert_eq!(parse_acl(content).unwrap().len(), 1);
    }

    #[test]
    fn too_few_fields() {
        assert!(matches!(parse_rule("proxy"), Err(RulesError::Parse(_))));
    }

    #[test]
    fn unknown_action() {
        assert!(matches!(
            parse_rule("allow domain example.com"),
            Err(RulesError::InvalidAction(a)) if a == "allow"
        ));
    }

    #[test]
    fn unknown_condition() {
        assert!(matches!(
            parse_rule("block domain-keyword ads"),
            Err(RulesError::InvalidCondition(_))
        ));
    }

    #[test]
    fn empty_values_rejected() {
        parse_rule("block domain").unwrap_err();
        parse_rule("block domain-suffix").unwrap_err();
        parse_rule("block country").unwrap_err();
    }

    #[test]
    fn invalid_cidr_and_ip() {
        assert!(matches!(
            parse_rule("block cidr 10.0.0.0/33"),
            Err(RulesError::InvalidCidr(_))
        ));
        assert!(matches!(
            parse_rule("block ip not-an-ip"),
            Err(RulesError::InvalidIp(_))
        ));
    }

    #[test]
    fn hijack_requires_target() {
        assert!(matches!(
            parse_rule("hijack domain example.com"),
            Err(RulesError::MissingHijackTarget(_))
        ));
    }

    #[test]
    fn hijack_all_takes_target_in_third_field() {
        let rule = parse_rule("hijack all 10.0.0.53").unwrap();
        assert_eq!(rule.action(), &Action::Hijack("10.0.0.53".into()));
        assert_eq!(rule.condition(), &Condition::All);
        assert!(matches!(
            parse_rule("hijack all"),
            Err(RulesError::MissingHijackTarget(_))
        ));
    }

    #[test]
    fn trailing_fields_rejected() {
        for line in [
            "block domain ads.example 127.0.0.1",
            "block domain ads.example 127.0.0.1 junk",
            "hijack domain dns.example 127.0.0.1 junk",
            "proxy all extra",
            "hijack all 127.0.0.1 junk",
            "direct cidr 10.0.0.0/8 10.0.0.1",
        ] {
            match parse_rule(line) {
                Err(RulesError::Parse(msg)) => assert!(
                    msg.contains("unexpected trailing fields"),
                    "{line}: {msg}"
                ),
                other => panic!("{line}: expected parse error, got {other:?}"),
            }
        }
        let err = parse_rule("block domain ads.example 127.0.0.1 junk").unwrap_err();
        assert!(err.to_string().contains("127.0.0.1 junk"));
    }

    #[test]
    fn error_reports_line_number() {
        let content = "proxy all\n# fine\nblock cidr nope\n";
        match parse_acl(content) {
            Err(RulesError::Line { line, source }) => {
                assert_eq!(line, 3);
                assert!(matches!(*source, RulesError::InvalidCidr(_)));
            }
            other => panic!("expected line error, got {other:?}"),
        }
    }
}
