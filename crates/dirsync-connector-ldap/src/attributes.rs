//! Attribute sets for directory entries.
//!
//! Attribute names are case-insensitive in LDAP, and servers do not always
//! echo back the casing that was requested, so names are stored lowercased.

use std::collections::HashMap;

use ldap3::SearchEntry;

/// Attribute name under which the entry DN is stored.
pub const DN_ATTRIBUTE: &str = "dn";

/// A value for an attribute, which may be single or multi-valued.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// A single string value.
    String(String),
    /// Binary data.
    Binary(Vec<u8>),
    /// Multiple values.
    Array(Vec<AttributeValue>),
}

impl AttributeValue {
    /// Get as a string if this is a single string value.
    pub fn as_string(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// First string value, for single and multi-valued attributes.
    pub fn first_string(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            AttributeValue::Array(arr) => arr.iter().find_map(AttributeValue::as_string),
            AttributeValue::Binary(_) => None,
        }
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::String(s)
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::String(s.to_string())
    }
}

impl From<Vec<u8>> for AttributeValue {
    fn from(b: Vec<u8>) -> Self {
        AttributeValue::Binary(b)
    }
}

/// The attributes of one directory entry.
#[derive(Debug, Clone, Default)]
pub struct AttributeSet {
    attributes: HashMap<String, AttributeValue>,
}

impl AttributeSet {
    /// Create a new empty attribute set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an attribute value.
    pub fn set(&mut self, name: impl AsRef<str>, value: impl Into<AttributeValue>) {
        self.attributes
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
    }

    /// Set an attribute using builder pattern.
    pub fn with(mut self, name: impl AsRef<str>, value: impl Into<AttributeValue>) -> Self {
        self.set(name, value);
        self
    }

    /// Get an attribute value.
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(&name.to_ascii_lowercase())
    }

    /// First string value of an attribute, ignoring blank values.
    pub fn get_string(&self, name: &str) -> Option<&str> {
        self.get(name)
            .and_then(AttributeValue::first_string)
            .filter(|s| !s.trim().is_empty())
    }

    /// Check if an attribute exists.
    pub fn has(&self, name: &str) -> bool {
        self.attributes.contains_key(&name.to_ascii_lowercase())
    }

    /// Get the number of attributes.
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

impl From<SearchEntry> for AttributeSet {
    fn from(entry: SearchEntry) -> Self {
        let mut attrs = AttributeSet::new();
        attrs.set(DN_ATTRIBUTE, entry.dn);

        for (name, values) in entry.attrs {
            if values.len() == 1 {
                if let Some(value) = values.into_iter().next() {
                    attrs.set(name, value);
                }
            } else if !values.is_empty() {
                attrs.set(
                    name,
                    AttributeValue::Array(values.into_iter().map(AttributeValue::String).collect()),
                );
            }
        }

        // objectGUID and friends arrive here when they are not valid UTF-8.
        for (name, values) in entry.bin_attrs {
            if let Some(first_value) = values.into_iter().next() {
                attrs.set(name, AttributeValue::Binary(first_value));
            }
        }

        attrs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_case_insensitive() {
        let attrs = AttributeSet::new().with("sAMAccountName", "eng");
        assert_eq!(attrs.get_string("samaccountname"), Some("eng"));
        assert_eq!(attrs.get_string("SAMACCOUNTNAME"), Some("eng"));
        assert!(attrs.has("SamAccountName"));
    }

    #[test]
    fn test_blank_strings_are_absent() {
        let attrs = AttributeSet::new().with("description", "   ");
        assert_eq!(attrs.get_string("description"), None);
        assert!(attrs.has("description"));
    }

    #[test]
    fn test_first_string_of_multi_valued() {
        let attrs = AttributeSet::new().with(
            "cn",
            AttributeValue::Array(vec!["Engineering".into(), "Eng".into()]),
        );
        assert_eq!(attrs.get_string("cn"), Some("Engineering"));
    }

    #[test]
    fn test_from_search_entry() {
        let mut entry_attrs = HashMap::new();
        entry_attrs.insert("cn".to_string(), vec!["Engineering".to_string()]);
        entry_attrs.insert(
            "member".to_string(),
            vec!["CN=A".to_string(), "CN=B".to_string()],
        );
        let mut bin_attrs = HashMap::new();
        bin_attrs.insert("objectGUID".to_string(), vec![vec![1u8, 2, 3]]);

        let entry = SearchEntry {
            dn: "CN=Engineering,OU=Groups".to_string(),
            attrs: entry_attrs,
            bin_attrs,
        };

        let attrs = AttributeSet::from(entry);
        assert_eq!(attrs.get_string("dn"), Some("CN=Engineering,OU=Groups"));
        assert_eq!(attrs.get_string("cn"), Some("Engineering"));
        assert!(matches!(attrs.get("member"), Some(AttributeValue::Array(v)) if v.len() == 2));
        assert_eq!(
            attrs.get("objectguid"),
            Some(&AttributeValue::Binary(vec![1, 2, 3]))
        );
    }
}
