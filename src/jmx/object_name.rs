//! MBean object names and name patterns
//!
//! An object name is a domain followed by an ordered list of `key=value`
//! properties, e.g. `Catalina:type=Manager,context=/app,host=localhost`.
//! Values may be quoted (`name="jdbc/TestDB"`), in which case they can
//! contain the otherwise reserved characters `,=:`.
//!
//! Patterns use the same syntax with three extensions:
//! - `*` and `?` in the domain,
//! - `*` and `?` in property values (`name=*`),
//! - a trailing `*` in the property list meaning "any further properties".

use std::fmt;
use std::hash::{Hash, Hasher};

use regex::Regex;

use crate::error::JmxError;

const RESERVED_KEY_CHARS: &[char] = &[':', ',', '=', '*', '?', '"'];

/// Parsed MBean ObjectName
///
/// Properties keep their declaration order. Values are stored as written,
/// quotes included; equality ignores property order.
#[derive(Debug, Clone)]
pub struct ObjectName {
    domain: String,
    properties: Vec<(String, String)>,
}

impl ObjectName {
    /// Parse an ObjectName string
    ///
    /// Wildcards are rejected; use [`ObjectNamePattern::parse`] for patterns.
    pub fn parse(s: &str) -> Result<Self, JmxError> {
        let (domain, list) = split_domain(s)?;
        if domain.contains(['*', '?']) {
            return Err(malformed(s, "wildcard in domain of a non-pattern name"));
        }

        let mut properties = Vec::new();
        for raw in split_properties(s, list)? {
            if raw == "*" {
                return Err(malformed(s, "property list wildcard in a non-pattern name"));
            }
            let (key, value) = split_property(s, raw)?;
            if is_pattern_value(value) {
                return Err(malformed(s, "wildcard in property value of a non-pattern name"));
            }
            push_unique(s, &mut properties, key, value)?;
        }

        if properties.is_empty() {
            return Err(malformed(s, "empty property list"));
        }

        Ok(Self {
            domain: domain.to_string(),
            properties,
        })
    }

    /// Domain part (before the colon)
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Properties in declaration order, values as written
    pub fn properties(&self) -> &[(String, String)] {
        &self.properties
    }

    /// Raw value of a key property (quotes preserved)
    pub fn key_property(&self, key: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Whether the name carries the given key property
    pub fn has_key(&self, key: &str) -> bool {
        self.key_property(key).is_some()
    }

    /// Canonical form: properties sorted by key
    pub fn canonical_name(&self) -> String {
        let mut props: Vec<&(String, String)> = self.properties.iter().collect();
        props.sort_by(|a, b| a.0.cmp(&b.0));
        let list: Vec<String> = props.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        format!("{}:{}", self.domain, list.join(","))
    }

    fn sorted_properties(&self) -> Vec<&(String, String)> {
        let mut props: Vec<&(String, String)> = self.properties.iter().collect();
        props.sort_by(|a, b| a.0.cmp(&b.0));
        props
    }
}

impl PartialEq for ObjectName {
    fn eq(&self, other: &Self) -> bool {
        self.domain == other.domain && self.sorted_properties() == other.sorted_properties()
    }
}

impl Eq for ObjectName {}

impl Hash for ObjectName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.domain.hash(state);
        for (k, v) in self.sorted_properties() {
            k.hash(state);
            v.hash(state);
        }
    }
}

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.domain)?;
        for (i, (k, v)) in self.properties.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}={}", k, v)?;
        }
        Ok(())
    }
}

impl std::str::FromStr for ObjectName {
    type Err = JmxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Compiled ObjectName pattern
#[derive(Debug, Clone)]
pub struct ObjectNamePattern {
    source: String,
    domain: Regex,
    properties: Vec<(String, ValueMatcher)>,
    property_list_pattern: bool,
}

#[derive(Debug, Clone)]
enum ValueMatcher {
    Exact(String),
    Glob(Regex),
}

impl ValueMatcher {
    fn matches(&self, value: &str) -> bool {
        match self {
            ValueMatcher::Exact(expected) => expected == value,
            ValueMatcher::Glob(re) => re.is_match(value),
        }
    }
}

impl ObjectNamePattern {
    /// Parse and compile a pattern string
    ///
    /// # Example
    /// ```
    /// use rtomcat_exporter::jmx::{ObjectName, ObjectNamePattern};
    ///
    /// let pattern = ObjectNamePattern::parse("Catalina:type=ThreadPool,name=*").unwrap();
    /// let name = ObjectName::parse("Catalina:type=ThreadPool,name=\"http-nio-8080\"").unwrap();
    /// assert!(pattern.matches(&name));
    /// ```
    pub fn parse(s: &str) -> Result<Self, JmxError> {
        let (domain, list) = split_domain(s)?;

        let mut properties: Vec<(String, String)> = Vec::new();
        let mut property_list_pattern = false;
        for raw in split_properties(s, list)? {
            if raw == "*" {
                if property_list_pattern {
                    return Err(malformed(s, "repeated property list wildcard"));
                }
                property_list_pattern = true;
                continue;
            }
            let (key, value) = split_property(s, raw)?;
            push_unique(s, &mut properties, key, value)?;
        }

        if properties.is_empty() && !property_list_pattern {
            return Err(malformed(s, "empty property list"));
        }

        let domain = glob_to_regex(s, domain)?;
        let properties = properties
            .into_iter()
            .map(|(key, value)| {
                let matcher = if is_pattern_value(&value) {
                    ValueMatcher::Glob(glob_to_regex(s, &value)?)
                } else {
                    ValueMatcher::Exact(value)
                };
                Ok((key, matcher))
            })
            .collect::<Result<Vec<_>, JmxError>>()?;

        Ok(Self {
            source: s.to_string(),
            domain,
            properties,
            property_list_pattern,
        })
    }

    /// The pattern as written
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether a trailing `*` allows additional properties
    pub fn is_property_list_pattern(&self) -> bool {
        self.property_list_pattern
    }

    /// Test an ObjectName against this pattern
    pub fn matches(&self, name: &ObjectName) -> bool {
        if !self.domain.is_match(name.domain()) {
            return false;
        }

        let all_present = self.properties.iter().all(|(key, matcher)| {
            name.key_property(key)
                .map(|value| matcher.matches(value))
                .unwrap_or(false)
        });
        if !all_present {
            return false;
        }

        self.property_list_pattern || name.properties().len() == self.properties.len()
    }
}

impl fmt::Display for ObjectNamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn malformed(name: &str, reason: &str) -> JmxError {
    JmxError::MalformedObjectName {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

fn split_domain(s: &str) -> Result<(&str, &str), JmxError> {
    let (domain, list) = s
        .split_once(':')
        .ok_or_else(|| malformed(s, "missing ':' after domain"))?;
    if domain.contains(['=', ',', '"', '\n']) {
        return Err(malformed(s, "illegal character in domain"));
    }
    Ok((domain, list))
}

/// Split the property list at commas that are not inside quoted values
fn split_properties<'a>(s: &str, list: &'a str) -> Result<Vec<&'a str>, JmxError> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in list.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                parts.push(&list[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }

    if in_quotes {
        return Err(malformed(s, "unterminated quoted value"));
    }
    parts.push(&list[start..]);

    if parts.iter().any(|p| p.is_empty()) {
        if parts.len() == 1 {
            return Ok(vec![]);
        }
        return Err(malformed(s, "empty property"));
    }
    Ok(parts)
}

fn split_property<'a>(s: &str, raw: &'a str) -> Result<(&'a str, &'a str), JmxError> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| malformed(s, "property without '='"))?;
    if key.is_empty() {
        return Err(malformed(s, "empty key"));
    }
    if key.contains(RESERVED_KEY_CHARS) {
        return Err(malformed(s, "illegal character in key"));
    }
    if value.is_empty() {
        return Err(malformed(s, "empty value"));
    }
    if value.starts_with('"') {
        if !is_quoted(value) {
            return Err(malformed(s, "badly quoted value"));
        }
    } else if value.contains([',', '=', ':', '"', '\n']) {
        return Err(malformed(s, "illegal character in unquoted value"));
    }
    Ok((key, value))
}

/// Whether the first unescaped closing quote is the last character
fn is_quoted(value: &str) -> bool {
    let mut chars = value.char_indices().skip(1);
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '"' => return i == value.len() - 1,
            _ => {}
        }
    }
    false
}

fn push_unique(
    s: &str,
    properties: &mut Vec<(String, String)>,
    key: &str,
    value: &str,
) -> Result<(), JmxError> {
    if properties.iter().any(|(k, _)| k == key) {
        return Err(malformed(s, "duplicate key"));
    }
    properties.push((key.to_string(), value.to_string()));
    Ok(())
}

/// Whether a value contains an unescaped `*` or `?`
fn is_pattern_value(value: &str) -> bool {
    let mut escaped = false;
    for c in value.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '*' | '?' => return true,
            _ => {}
        }
    }
    false
}

fn glob_to_regex(s: &str, glob: &str) -> Result<Regex, JmxError> {
    let mut re = String::with_capacity(glob.len() + 8);
    re.push('^');
    let mut escaped = false;
    for c in glob.chars() {
        if escaped {
            re.push_str(&regex::escape(&format!("\\{}", c)));
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            _ => re.push_str(&regex::escape(&c.to_string())),
        }
    }
    re.push('$');
    Regex::new(&re).map_err(|e| malformed(s, &e.to_string()))
}
