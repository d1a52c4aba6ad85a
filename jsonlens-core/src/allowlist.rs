//! Upstream host allow-list.
//!
//! The allow-list is the only admission control before outbound network I/O:
//! a target URL is permitted iff its host equals a configured entry or sits
//! under one as a dot-boundary suffix. Raw string-suffix comparison is
//! deliberately avoided — `notjira.example.com` must not match the entry
//! `jira.example.com`, while `sub.jira.example.com` must.

use url::Url;

/// Separator between entries in the configuration string.
pub const ENTRY_DELIMITER: char = '|';

/// Set of permitted upstream host suffixes.
///
/// Built once at startup and read-only thereafter. Matching is
/// case-insensitive and ignores ports on both sides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostAllowlist {
    entries: Vec<String>,
}

impl HostAllowlist {
    /// Build an allow-list from explicit entries.
    ///
    /// Entries are trimmed, lowercased, stripped of any `:port` suffix, and
    /// empty entries are dropped.
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entries = entries
            .into_iter()
            .map(|e| normalize_entry(e.as_ref()))
            .filter(|e| !e.is_empty())
            .collect();
        Self { entries }
    }

    /// Build an allow-list from a `|`-delimited configuration string.
    #[must_use]
    pub fn from_delimited(raw: &str) -> Self {
        Self::new(raw.split(ENTRY_DELIMITER))
    }

    /// Number of configured entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no entries are configured. An empty allow-list permits
    /// nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether an arbitrary URL string names a permitted upstream.
    ///
    /// Pure predicate: malformed input and URLs without a host are not
    /// allowed; no error escapes.
    #[must_use]
    pub fn is_allowed(&self, url: &str) -> bool {
        match Url::parse(url) {
            Ok(parsed) => self.permits(&parsed),
            Err(_) => false,
        }
    }

    /// Whether an already-parsed URL names a permitted upstream.
    #[must_use]
    pub fn permits(&self, url: &Url) -> bool {
        match url.host_str() {
            Some(host) => self.permits_host(host),
            None => false,
        }
    }

    /// Whether a bare hostname is permitted.
    ///
    /// A host matches an entry when it equals the entry or ends with
    /// `"." + entry`.
    #[must_use]
    pub fn permits_host(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        self.entries.iter().any(|entry| {
            host.strip_suffix(entry.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.ends_with('.'))
        })
    }
}

/// Lowercase an entry and strip whitespace and any trailing `:port`.
fn normalize_entry(entry: &str) -> String {
    let entry = entry.trim().to_ascii_lowercase();
    if let Some((host, port)) = entry.rsplit_once(':') {
        if !host.is_empty()
            && !host.contains(':')
            && !port.is_empty()
            && port.chars().all(|c| c.is_ascii_digit())
        {
            return host.to_string();
        }
    }
    entry
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jira_only() -> HostAllowlist {
        HostAllowlist::from_delimited("jira.mycompany.com")
    }

    #[test]
    fn test_exact_host_match_is_allowed() {
        assert!(jira_only().is_allowed("https://jira.mycompany.com/rest/api/attachment/12"));
    }

    #[test]
    fn test_subdomain_of_entry_is_allowed() {
        assert!(jira_only().is_allowed("https://sub.jira.mycompany.com/export.json"));
    }

    #[test]
    fn test_trailing_string_match_without_dot_boundary_is_rejected() {
        // The classic allow-list pitfall: a raw suffix comparison would
        // accept this host.
        assert!(!jira_only().is_allowed("https://notjira.mycompany.com/export.json"));
        assert!(!jira_only().is_allowed("https://evil-jira.mycompany.com.attacker.net/x"));
    }

    #[test]
    fn test_unrelated_host_is_rejected() {
        assert!(!jira_only().is_allowed("http://evil.example/x"));
    }

    #[test]
    fn test_empty_allowlist_rejects_everything() {
        let empty = HostAllowlist::from_delimited("");
        assert!(empty.is_empty());
        assert!(!empty.is_allowed("https://jira.mycompany.com/x"));
        assert!(!empty.is_allowed("https://example.com/"));
    }

    #[test]
    fn test_malformed_url_is_rejected_without_panic() {
        let list = jira_only();
        assert!(!list.is_allowed("not a url"));
        assert!(!list.is_allowed(""));
        assert!(!list.is_allowed("http://"));
        assert!(!list.is_allowed("jira.mycompany.com/missing-scheme"));
    }

    #[test]
    fn test_url_without_host_is_rejected() {
        let list = jira_only();
        assert!(!list.is_allowed("data:text/plain,hello"));
        assert!(!list.is_allowed("mailto:ops@mycompany.com"));
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let list = HostAllowlist::from_delimited("JIRA.MyCompany.COM");
        assert!(list.is_allowed("https://jira.mycompany.com/x"));
        assert!(list.permits_host("Sub.Jira.MyCompany.Com"));
    }

    #[test]
    fn test_url_port_is_ignored() {
        assert!(jira_only().is_allowed("https://jira.mycompany.com:8443/rest/api"));
    }

    #[test]
    fn test_entry_port_is_stripped() {
        let list = HostAllowlist::from_delimited("jira.mycompany.com:8443");
        assert!(list.is_allowed("https://jira.mycompany.com/x"));
    }

    #[test]
    fn test_delimited_list_with_blank_segments() {
        let list = HostAllowlist::from_delimited("|jira.mycompany.com| |confluence.mycompany.com|");
        assert_eq!(list.len(), 2);
        assert!(list.is_allowed("https://jira.mycompany.com/a"));
        assert!(list.is_allowed("https://confluence.mycompany.com/b"));
        assert!(!list.is_allowed("https://wiki.mycompany.com/c"));
    }

    #[test]
    fn test_ip_literal_entry_matches_exactly() {
        let list = HostAllowlist::from_delimited("127.0.0.1");
        assert!(list.is_allowed("http://127.0.0.1:8080/doc.json"));
        assert!(!list.is_allowed("http://127.0.0.2/doc.json"));
    }
}
