//! Oracle identifier quoting.
//!
//! This module provides [`Ident`] which represents a dotted SQL identifier
//! (schema/table/column). Every segment is rendered inside double quotes with
//! embedded `"` doubled, so the case written by the caller is preserved.
//!
//! Quoting is idempotent: a segment that is already correctly quoted is kept
//! as-is instead of being escaped a second time.
//!
//! # Example
//! ```ignore
//! use oraorm::ident::quote;
//!
//! assert_eq!(quote("users.name"), r#""users"."name""#);
//! assert_eq!(quote(r#""users"."name""#), r#""users"."name""#);
//! ```

use crate::error::{OrmError, OrmResult};

/// A part of a SQL identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentPart {
    /// A plain name as written by the caller (no surrounding quotes).
    Name(String),
    /// The `*` wildcard, never quoted.
    Star,
}

/// A SQL identifier (column, table, or schema name).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub parts: Vec<IdentPart>,
}

impl Ident {
    /// Create a single-segment identifier from a raw name.
    ///
    /// The name is taken literally: dots and quotes are part of the name.
    pub fn name(name: &str) -> OrmResult<Self> {
        if name.is_empty() {
            return Err(OrmError::validation("Identifier cannot be empty"));
        }
        if name.contains('\0') {
            return Err(OrmError::validation(
                "Identifier cannot contain NUL character",
            ));
        }
        Ok(Self {
            parts: vec![IdentPart::Name(name.to_string())],
        })
    }

    /// Parse an identifier string, supporting dotted and quoted forms.
    ///
    /// - Dotted: `schema.table.column`
    /// - Quoted: `"CamelCase"."UserTable"`
    /// - Mixed: `hr."UserTable".id`
    pub fn parse(s: &str) -> OrmResult<Self> {
        if s.is_empty() {
            return Err(OrmError::validation("Identifier cannot be empty"));
        }
        if s.contains('\0') {
            return Err(OrmError::validation(
                "Identifier cannot contain NUL character",
            ));
        }

        let mut parts = Vec::new();
        let mut chars = s.chars().peekable();

        while chars.peek().is_some() {
            if !parts.is_empty() {
                match chars.next() {
                    Some('.') => {
                        if chars.peek().is_none() {
                            return Err(OrmError::validation("Trailing '.' in identifier"));
                        }
                    }
                    Some(c) => {
                        return Err(OrmError::validation(format!(
                            "Expected '.' between identifier parts, got '{c}'"
                        )));
                    }
                    None => break,
                }
            }

            if chars.peek() == Some(&'"') {
                chars.next();
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('"') => {
                            if chars.peek() == Some(&'"') {
                                chars.next();
                                name.push('"');
                            } else {
                                break;
                            }
                        }
                        Some(c) => name.push(c),
                        None => return Err(OrmError::validation("Unclosed quoted identifier")),
                    }
                }
                if name.is_empty() {
                    return Err(OrmError::validation("Empty quoted identifier"));
                }
                parts.push(IdentPart::Name(name));
                continue;
            }

            let mut name = String::new();
            while let Some(&c) = chars.peek() {
                if c == '.' {
                    break;
                }
                if c == '"' {
                    return Err(OrmError::validation(format!(
                        "Unexpected '\"' inside unquoted identifier segment '{name}'"
                    )));
                }
                name.push(c);
                chars.next();
            }
            if name.is_empty() {
                return Err(OrmError::validation("Empty identifier segment"));
            }
            if name == "*" {
                parts.push(IdentPart::Star);
            } else {
                parts.push(IdentPart::Name(name));
            }
        }

        if parts.is_empty() {
            return Err(OrmError::validation("Empty identifier"));
        }

        Ok(Self { parts })
    }

    /// The last segment's name (the column name of `table.column`).
    pub fn last_name(&self) -> Option<&str> {
        match self.parts.last() {
            Some(IdentPart::Name(n)) => Some(n),
            _ => None,
        }
    }

    /// Render the identifier as SQL.
    pub fn to_sql(&self) -> String {
        let mut cap = self.parts.len().saturating_sub(1);
        for part in &self.parts {
            match part {
                IdentPart::Name(s) => cap += s.len() + 2,
                IdentPart::Star => cap += 1,
            }
        }
        let mut out = String::with_capacity(cap);
        self.write_sql(&mut out);
        out
    }

    pub(crate) fn write_sql(&self, out: &mut String) {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                out.push('.');
            }
            match part {
                IdentPart::Name(s) => write_quoted(out, s),
                IdentPart::Star => out.push('*'),
            }
        }
    }
}

fn write_quoted(out: &mut String, name: &str) {
    out.push('"');
    for ch in name.chars() {
        if ch == '"' {
            out.push('"');
            out.push('"');
        } else {
            out.push(ch);
        }
    }
    out.push('"');
}

/// Quote a possibly dotted identifier.
///
/// Never fails: input that does not parse as a dotted identifier is quoted
/// as one literal segment.
pub fn quote(name: &str) -> String {
    match Ident::parse(name) {
        Ok(ident) => ident.to_sql(),
        Err(_) => {
            let mut out = String::with_capacity(name.len() + 2);
            write_quoted(&mut out, name);
            out
        }
    }
}

/// Append a quoted identifier to `out`.
pub(crate) fn quote_to(out: &mut String, name: &str) {
    match Ident::parse(name) {
        Ok(ident) => ident.write_sql(out),
        Err(_) => write_quoted(out, name),
    }
}

/// Strip one level of quoting from a single segment name.
pub(crate) fn unquote(name: &str) -> &str {
    name.strip_prefix('"')
        .and_then(|n| n.strip_suffix('"'))
        .unwrap_or(name)
}

/// Compare identifiers the way Oracle resolves column names in DML.
pub(crate) fn same_name(a: &str, b: &str) -> bool {
    unquote(a).eq_ignore_ascii_case(unquote(b))
}

/// Convert an input into an [`Ident`].
pub trait IntoIdent {
    fn into_ident(self) -> OrmResult<Ident>;
}

impl IntoIdent for Ident {
    fn into_ident(self) -> OrmResult<Ident> {
        Ok(self)
    }
}

impl IntoIdent for &Ident {
    fn into_ident(self) -> OrmResult<Ident> {
        Ok(self.clone())
    }
}

impl IntoIdent for &str {
    fn into_ident(self) -> OrmResult<Ident> {
        Ident::parse(self)
    }
}

impl IntoIdent for String {
    fn into_ident(self) -> OrmResult<Ident> {
        Ident::parse(&self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ident_simple() {
        assert_eq!(quote("users"), r#""users""#);
    }

    #[test]
    fn ident_dotted() {
        assert_eq!(quote("hr.users"), r#""hr"."users""#);
    }

    #[test]
    fn ident_three_parts() {
        assert_eq!(quote("schema.table.column"), r#""schema"."table"."column""#);
    }

    #[test]
    fn ident_keeps_case() {
        assert_eq!(quote("UserTable"), r#""UserTable""#);
    }

    #[test]
    fn ident_idempotent() {
        let once = quote("hr.users");
        assert_eq!(quote(&once), once);

        let escaped = quote(r#""has""quote""#);
        assert_eq!(escaped, r#""has""quote""#);
        assert_eq!(quote(&escaped), escaped);
    }

    #[test]
    fn ident_quoted_segment_with_dot_stays_whole() {
        assert_eq!(quote(r#""a.b""#), r#""a.b""#);
    }

    #[test]
    fn ident_mixed_quoted_unquoted() {
        assert_eq!(quote(r#"hr."UserTable".id"#), r#""hr"."UserTable"."id""#);
    }

    #[test]
    fn ident_star_unquoted() {
        assert_eq!(quote("users.*"), r#""users".*"#);
    }

    #[test]
    fn ident_unparseable_falls_back_to_literal() {
        assert_eq!(quote(r#"ab"c"#), r#""ab""c""#);
        assert_eq!(quote("a..b"), r#""a..b""#);
    }

    #[test]
    fn ident_parse_rejects_unclosed_quote() {
        assert!(Ident::parse(r#""unclosed"#).is_err());
        assert!(Ident::parse("").is_err());
        assert!(Ident::parse("schema.").is_err());
    }

    #[test]
    fn ident_name_is_literal() {
        let ident = Ident::name("a.b").unwrap();
        assert_eq!(ident.to_sql(), r#""a.b""#);
    }

    #[test]
    fn same_name_ignores_quotes_and_case() {
        assert!(same_name(r#""ID""#, "id"));
        assert!(!same_name("id", "name"));
    }
}
