//! Request inspection rules for the blocking and logging middlewares.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

use crate::entities::security_event::{SecurityEventType, Severity};

pub const SCANNER_AGENTS: [&str; 14] = [
    "sqlmap", "nikto", "nessus", "burp", "dirbuster", "gobuster", "dirb", "w3af",
    "metasploit", "masscan", "nmap", "zap", "acunetix", "qualys",
];

pub const BLOCKED_EXTENSIONS: [&str; 5] = [".php", ".asp", ".jsp", ".cgi", ".pl"];

const SQL_INJECTION_SOURCES: [&str; 6] = [
    r"union\s+select",
    r"drop\s+table",
    r"insert\s+into",
    r"delete\s+from",
    r"update\s+.*set",
    r"\bor\s+1=1\b",
];

const SUSPICIOUS_SOURCES: [&str; 6] = [
    r"\.\./",
    r"<script",
    r"union\s+select",
    r"exec\(",
    r"eval\(",
    r"base64_decode",
];

struct NamedPattern {
    source: &'static str,
    regex: Regex,
}

fn compile(sources: &[&'static str]) -> Vec<NamedPattern> {
    sources
        .iter()
        .filter_map(|source| {
            RegexBuilder::new(source)
                .case_insensitive(true)
                .build()
                .map(|regex| NamedPattern { source, regex })
                .map_err(|e| tracing::error!("Invalid security pattern {}: {}", source, e))
                .ok()
        })
        .collect()
}

static SQL_INJECTION: Lazy<Vec<NamedPattern>> = Lazy::new(|| compile(&SQL_INJECTION_SOURCES));
static SUSPICIOUS: Lazy<Vec<NamedPattern>> = Lazy::new(|| compile(&SUSPICIOUS_SOURCES));

/// Outcome of inspecting one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestVerdict {
    Block {
        event_type: SecurityEventType,
        severity: Severity,
        reason: String,
        message: &'static str,
    },
    Allow,
}

/// Raw and percent-decoded forms of the path and query, so encoded payloads match too.
fn candidates(full_path: &str) -> Vec<String> {
    let raw = full_path.to_string();
    let decoded = urlencoding::decode(&full_path.replace('+', " "))
        .map(|d| d.into_owned())
        .unwrap_or_else(|_| raw.clone());
    if decoded == raw { vec![raw] } else { vec![raw, decoded] }
}

pub fn detect_scanner(user_agent: &str) -> Option<&'static str> {
    let agent = user_agent.to_lowercase();
    SCANNER_AGENTS.iter().copied().find(|needle| agent.contains(needle))
}

pub fn blocked_extension(path: &str) -> Option<&'static str> {
    let path = path.to_lowercase();
    BLOCKED_EXTENSIONS.iter().copied().find(|ext| path.ends_with(ext))
}

pub fn sql_injection(full_path: &str) -> Option<&'static str> {
    first_match(&SQL_INJECTION, full_path)
}

/// Patterns that are logged but not blocked.
pub fn suspicious_pattern(full_path: &str) -> Option<&'static str> {
    first_match(&SUSPICIOUS, full_path)
}

fn first_match(patterns: &[NamedPattern], full_path: &str) -> Option<&'static str> {
    let candidates = candidates(full_path);
    patterns
        .iter()
        .find(|p| candidates.iter().any(|c| p.regex.is_match(c)))
        .map(|p| p.source)
}

/// Blocking rules in priority order: scanner agents, then script extensions,
/// then SQL injection in the path or query.
pub fn inspect_request(user_agent: &str, path: &str, full_path: &str) -> RequestVerdict {
    if let Some(agent) = detect_scanner(user_agent) {
        return RequestVerdict::Block {
            event_type: SecurityEventType::SecurityScan,
            severity: Severity::High,
            reason: format!("Malicious user agent detected: {agent}"),
            message: "Access denied - Malicious user agent detected",
        };
    }
    if blocked_extension(path).is_some() {
        return RequestVerdict::Block {
            event_type: SecurityEventType::SuspiciousRequest,
            severity: Severity::Medium,
            reason: format!("Request for suspicious file: {}", path.to_lowercase()),
            message: "Access denied - Suspicious file request",
        };
    }
    if let Some(pattern) = sql_injection(full_path) {
        return RequestVerdict::Block {
            event_type: SecurityEventType::SuspiciousRequest,
            severity: Severity::High,
            reason: format!("SQL injection attempt detected: {pattern}"),
            message: "Access denied - SQL injection attempt detected",
        };
    }
    RequestVerdict::Allow
}

const CONTACT_SPAM_SOURCES: [&str; 6] = [
    r"<script",
    r"union\s+select",
    r"viagra",
    r"casino",
    r"lottery",
    r"winner",
];

static CONTACT_SPAM: Lazy<Vec<NamedPattern>> = Lazy::new(|| compile(&CONTACT_SPAM_SOURCES));
static LINK: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"https?://([^\s/:?#]*)").ok());

pub const EXTERNAL_LINK_PATTERN: &str = "external link";

/// First spam or attack marker in contact-form text; links to hosts other than localhost count.
pub fn suspicious_contact_pattern(text: &str) -> Option<&'static str> {
    let text = text.to_lowercase();
    if let Some(pattern) = CONTACT_SPAM.iter().find(|p| p.regex.is_match(&text)) {
        return Some(pattern.source);
    }
    let link = LINK.as_ref()?;
    link.captures_iter(&text)
        .any(|c| c.get(1).is_some_and(|host| !host.as_str().starts_with("localhost")))
        .then_some(EXTERNAL_LINK_PATTERN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scanner_agents_are_blocked_case_insensitively() {
        match inspect_request("Mozilla/5.0 (compatible; Nikto/2.1.6)", "/", "/") {
            RequestVerdict::Block { event_type, severity, .. } => {
                assert_eq!(event_type, SecurityEventType::SecurityScan);
                assert_eq!(severity, Severity::High);
            }
            RequestVerdict::Allow => panic!("nikto should be blocked"),
        }
        assert_eq!(inspect_request("Mozilla/5.0 Firefox/128.0", "/blog", "/blog"), RequestVerdict::Allow);
    }

    #[test]
    fn script_extensions_are_blocked() {
        assert_eq!(blocked_extension("/wp-login.PHP"), Some(".php"));
        assert_eq!(blocked_extension("/cgi-bin/test.cgi"), Some(".cgi"));
        assert_eq!(blocked_extension("/blog/php-tips"), None);
    }

    #[test]
    fn sql_injection_is_found_in_encoded_queries() {
        assert_eq!(sql_injection("/blog?q=1%20UNION%20SELECT%20password"), Some(r"union\s+select"));
        assert_eq!(sql_injection("/blog?q=x'+or+1=1--"), Some(r"\bor\s+1=1\b"));
        assert_eq!(sql_injection("/blog?q=selection+of+unions"), None);
    }

    #[test]
    fn logging_patterns_cover_traversal_and_scripts() {
        assert_eq!(suspicious_pattern("/media/../../etc/passwd"), Some(r"\.\./"));
        assert_eq!(suspicious_pattern("/blog?q=%3Cscript%3Ealert(1)"), Some("<script"));
        assert_eq!(suspicious_pattern("/portfolio"), None);
    }

    #[test]
    fn contact_text_flags_spam_and_external_links() {
        assert_eq!(suspicious_contact_pattern("You are a WINNER"), Some("winner"));
        assert_eq!(suspicious_contact_pattern("see https://spam.example/offer"), Some(EXTERNAL_LINK_PATTERN));
        assert_eq!(suspicious_contact_pattern("local build at http://localhost:8080"), None);
        assert_eq!(suspicious_contact_pattern("Hi, I'd like to discuss a pentest."), None);
    }
}
