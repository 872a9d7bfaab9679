use std::collections::BTreeSet;

/// Keywords a shader variant is specialised with, e.g. `SHADING`.
///
/// Ordered so equal sets hash and compare the same regardless of insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct KeywordSet(BTreeSet<String>);

impl KeywordSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, keyword: &str) -> Self {
        self.insert(keyword);
        self
    }

    pub fn insert(&mut self, keyword: &str) {
        self.0.insert(keyword.to_string());
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.0.contains(keyword)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<'a> FromIterator<&'a str> for KeywordSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        Self(iter.into_iter().map(str::to_string).collect())
    }
}

impl std::fmt::Display for KeywordSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            return write!(f, "<none>");
        }
        let joined: Vec<&str> = self.iter().collect();
        write!(f, "{}", joined.join(","))
    }
}

/// One open `#ifdef`/`#ifndef` block
struct Branch {
    /// Whether the enclosing block is emitting
    parent_active: bool,
    /// Whether the current arm's condition holds
    condition: bool,
}

impl Branch {
    fn active(&self) -> bool {
        self.parent_active && self.condition
    }
}

/// Resolve conditional directives against a keyword set.
///
/// Handles `#define NAME`, `#ifdef NAME`, `#ifndef NAME`, `#else` and
/// `#endif`, nested to any depth. Directive lines are dropped from the output;
/// inactive lines are replaced by empty lines so diagnostics keep their line
/// numbers. An unterminated block simply runs to the end of the source.
pub fn preprocess(source: &str, keywords: &KeywordSet) -> String {
    let mut defined = keywords.clone();
    let mut stack: Vec<Branch> = Vec::new();
    let mut output = String::with_capacity(source.len());

    for line in source.lines() {
        let active = stack.last().map_or(true, Branch::active);
        let trimmed = line.trim();

        if let Some(name) = directive(trimmed, "#ifdef") {
            stack.push(Branch {
                parent_active: active,
                condition: defined.contains(name),
            });
        } else if let Some(name) = directive(trimmed, "#ifndef") {
            stack.push(Branch {
                parent_active: active,
                condition: !defined.contains(name),
            });
        } else if trimmed.starts_with("#else") {
            if let Some(branch) = stack.last_mut() {
                branch.condition = !branch.condition;
            }
        } else if trimmed.starts_with("#endif") {
            stack.pop();
        } else if let Some(name) = directive(trimmed, "#define") {
            if active {
                defined.insert(name);
            }
        } else if active {
            output.push_str(line);
        }
        output.push('\n');
    }

    output
}

fn directive<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(keyword)?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    rest.split_whitespace().next()
}
