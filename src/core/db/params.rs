/// Named bind parameters for `:name` placeholders.
use crate::core::db::value::DbValue;
use std::fmt;

/// Ordered `name -> value` bindings for one statement.
///
/// Names are stored without their placeholder prefix, so `:id`, `@id` and
/// `$id` in the SQL all bind the entry named `id`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamedParams {
    entries: Vec<(String, DbValue)>,
}

impl NamedParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a binding, replacing an earlier one with the same name
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<DbValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<DbValue>) {
        let name = name.into();
        let name = strip_prefix(&name).to_string();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Looks up a binding by name; a leading `:`, `@` or `$` is ignored
    pub fn get(&self, name: &str) -> Option<&DbValue> {
        let name = strip_prefix(name);
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DbValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<DbValue>> FromIterator<(K, V)> for NamedParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = NamedParams::new();
        for (name, value) in iter {
            params.insert(name, value);
        }
        params
    }
}

impl fmt::Display for NamedParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .entries
            .iter()
            .map(|(n, v)| format!("{}={}", n, v.repr()))
            .collect();
        write!(f, "{{{}}}", rendered.join(", "))
    }
}

fn strip_prefix(name: &str) -> &str {
    name.strip_prefix(|c: char| c == ':' || c == '@' || c == '$')
        .unwrap_or(name)
}
