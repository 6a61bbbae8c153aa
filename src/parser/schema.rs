//! Field layout of a configuration hierarchy.
//!
//! A [`Schema`] is the default template the parser fills in: it names the
//! keywords recognized at one level and what each one holds. Anything not in
//! the schema is ignored by the parser.

use super::cut_prefix;

/// How the entries of a repeated block are told apart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// First token, e.g. a group name or an interface
    Name,
    /// First token as an integer, e.g. `redundancy-group 1`
    Index,
    /// First `n` tokens, e.g. `family inet unicast`
    Composite(usize),
}

/// What a keyword holds
#[derive(Debug, Clone)]
pub enum FieldKind {
    /// Free text, quotes stripped
    Text,
    /// Signed integer
    Integer,
    /// `true` / `false`
    Boolean,
    /// Presence only
    Flag,
    /// Repeatable value, one per line
    List,
    /// Nested container whose presence alone is meaningful
    Block(Schema),
    /// Keyed collection of nested records
    Repeated {
        /// Key extraction
        key: KeyKind,
        /// Layout of each entry
        schema: Schema,
    },
}

/// One recognized keyword
#[derive(Debug, Clone)]
pub struct FieldSpec {
    keyword: String,
    key: String,
    kind: FieldKind,
}

impl FieldSpec {
    /// Keyword as it appears in configuration, possibly several tokens
    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    /// Record key: the keyword with `-` and spaces mapped to `_`
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Field kind
    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }
}

/// Map a keyword to its record key
pub fn field_key(keyword: &str) -> String {
    keyword
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .replace('-', "_")
}

/// Ordered set of keywords recognized at one level
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: Vec<FieldSpec>,
}

impl Schema {
    /// Empty schema; a block with an empty schema records presence only
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field
    pub fn field(mut self, keyword: &str, kind: FieldKind) -> Self {
        let keyword = keyword.split_whitespace().collect::<Vec<_>>().join(" ");
        self.fields.push(FieldSpec {
            key: field_key(&keyword),
            keyword,
            kind,
        });
        self
    }

    /// Add a text field
    pub fn text(self, keyword: &str) -> Self {
        self.field(keyword, FieldKind::Text)
    }

    /// Add an integer field
    pub fn integer(self, keyword: &str) -> Self {
        self.field(keyword, FieldKind::Integer)
    }

    /// Add a boolean field
    pub fn boolean(self, keyword: &str) -> Self {
        self.field(keyword, FieldKind::Boolean)
    }

    /// Add a presence flag
    pub fn flag(self, keyword: &str) -> Self {
        self.field(keyword, FieldKind::Flag)
    }

    /// Add a list field
    pub fn list(self, keyword: &str) -> Self {
        self.field(keyword, FieldKind::List)
    }

    /// Add a nested block
    pub fn block(self, keyword: &str, schema: Schema) -> Self {
        self.field(keyword, FieldKind::Block(schema))
    }

    /// Add a keyed collection
    pub fn repeated(self, keyword: &str, key: KeyKind, schema: Schema) -> Self {
        self.field(keyword, FieldKind::Repeated { key, schema })
    }

    /// Fields in declaration order
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Field by record key
    pub fn get(&self, key: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|spec| spec.key == key)
    }

    /// Longest keyword matching the start of `rest` on a token boundary.
    ///
    /// Returns the field and the remainder after the keyword.
    pub fn lookup<'a>(&self, rest: &'a str) -> Option<(&FieldSpec, &'a str)> {
        self.fields
            .iter()
            .filter_map(|spec| match cut_prefix(rest, &spec.keyword) {
                (true, remainder) => Some((spec, remainder)),
                (false, _) => None,
            })
            .max_by_key(|(spec, _)| spec.keyword.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_key() {
        assert_eq!(field_key("host-name"), "host_name");
        assert_eq!(field_key("services  ssh"), "services_ssh");
        assert_eq!(field_key("chassis cluster"), "chassis_cluster");
    }

    #[test]
    fn test_lookup_prefers_longest() {
        let schema = Schema::new()
            .block("login", Schema::new().text("class"))
            .text("login message");

        let (spec, rest) = schema.lookup("login message \"hello\"").unwrap();
        assert_eq!(spec.key(), "login_message");
        assert_eq!(rest, "\"hello\"");

        let (spec, rest) = schema.lookup("login class admin").unwrap();
        assert_eq!(spec.key(), "login");
        assert_eq!(rest, "class admin");
    }

    #[test]
    fn test_lookup_respects_token_boundaries() {
        let schema = Schema::new().flag("no-redirects");
        assert!(schema.lookup("no-redirects-ipv6").is_none());
        assert!(schema.lookup("no-redirects").is_some());
    }
}
