//! WHERE predicate trees.
//!
//! [`Expr`] is a closed set of condition kinds. Each kind has exactly one
//! rendering in [`Expr::build`], which writes Oracle SQL and binds values into
//! a [`StatementBuilder`] so placeholder numbering follows the live statement.

use crate::statement::StatementBuilder;
use crate::value::Value;

/// Oracle rejects IN lists longer than this.
const MAX_IN_LIST: usize = 1000;

/// Predicate node.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// `column = value` (`IS NULL` for a null value)
    Eq { column: String, value: Value },

    /// `column <> value` (`IS NOT NULL` for a null value)
    Neq { column: String, value: Value },

    /// `column IN (values...)`; an empty list matches nothing.
    In { column: String, values: Vec<Value> },

    /// SQL template with `?` placeholders, one per var.
    Expr { sql: String, vars: Vec<Value> },

    /// All conditions must be true.
    And(Vec<Expr>),

    /// At least one condition must be true.
    Or(Vec<Expr>),

    /// Negate the inner expression.
    Not(Box<Expr>),

    /// A nested WHERE group (a parenthesized conjunction).
    Where(Vec<Expr>),
}

impl Expr {
    /// Create an equality condition: column = value
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Expr::Eq {
            column: column.into(),
            value: value.into(),
        }
    }

    /// Create an inequality condition: column <> value
    pub fn neq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Expr::Neq {
            column: column.into(),
            value: value.into(),
        }
    }

    /// Create an IS NULL condition.
    pub fn is_null(column: impl Into<String>) -> Self {
        Expr::Eq {
            column: column.into(),
            value: Value::Null,
        }
    }

    /// Create an IS NOT NULL condition.
    pub fn is_not_null(column: impl Into<String>) -> Self {
        Expr::Neq {
            column: column.into(),
            value: Value::Null,
        }
    }

    /// Create an IN condition: column IN (values...)
    pub fn in_list<T: Into<Value>>(
        column: impl Into<String>,
        values: impl IntoIterator<Item = T>,
    ) -> Self {
        Expr::In {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Create a NOT IN condition.
    pub fn not_in<T: Into<Value>>(
        column: impl Into<String>,
        values: impl IntoIterator<Item = T>,
    ) -> Self {
        Expr::not(Expr::in_list(column, values))
    }

    /// Create a template expression with `?` placeholders.
    pub fn template(sql: impl Into<String>, vars: Vec<Value>) -> Self {
        Expr::Expr {
            sql: sql.into(),
            vars,
        }
    }

    /// Create a raw SQL fragment without parameters.
    pub fn raw(sql: impl Into<String>) -> Self {
        Expr::template(sql, Vec::new())
    }

    /// Create a greater-than condition.
    pub fn gt(column: &str, value: impl Into<Value>) -> Self {
        Self::compare(column, ">", value.into())
    }

    /// Create a greater-than-or-equal condition.
    pub fn gte(column: &str, value: impl Into<Value>) -> Self {
        Self::compare(column, ">=", value.into())
    }

    /// Create a less-than condition.
    pub fn lt(column: &str, value: impl Into<Value>) -> Self {
        Self::compare(column, "<", value.into())
    }

    /// Create a less-than-or-equal condition.
    pub fn lte(column: &str, value: impl Into<Value>) -> Self {
        Self::compare(column, "<=", value.into())
    }

    /// Create a LIKE condition.
    pub fn like(column: &str, pattern: impl Into<Value>) -> Self {
        Self::compare(column, "LIKE", pattern.into())
    }

    fn compare(column: &str, op: &str, value: Value) -> Self {
        Expr::Expr {
            sql: format!("{} {op} ?", crate::ident::quote(column)),
            vars: vec![value],
        }
    }

    /// Create an AND expression.
    pub fn and(exprs: Vec<Expr>) -> Self {
        Expr::And(exprs)
    }

    /// Create an OR expression.
    pub fn or(exprs: Vec<Expr>) -> Self {
        Expr::Or(exprs)
    }

    /// Create a NOT expression.
    pub fn not(expr: Expr) -> Self {
        Expr::Not(Box::new(expr))
    }

    /// Check if this expression contains no conditions.
    pub fn is_empty(&self) -> bool {
        match self {
            Expr::And(exprs) | Expr::Or(exprs) | Expr::Where(exprs) => {
                exprs.iter().all(Expr::is_empty)
            }
            Expr::Not(inner) => inner.is_empty(),
            Expr::Expr { sql, .. } => sql.trim().is_empty(),
            _ => false,
        }
    }

    /// Render this expression into `b`.
    pub fn build(&self, b: &mut StatementBuilder<'_>) {
        match self {
            Expr::Eq { column, value } => match value {
                Value::Null => {
                    b.push_ident(column).push(" IS NULL");
                }
                Value::Array(items) => build_in(b, column, items),
                _ => {
                    b.push_ident(column).push(" = ");
                    b.push_value(value);
                }
            },
            Expr::Neq { column, value } => match value {
                Value::Null => {
                    b.push_ident(column).push(" IS NOT NULL");
                }
                _ => {
                    b.push_ident(column).push(" <> ");
                    b.push_value(value);
                }
            },
            Expr::In { column, values } => build_in(b, column, values),
            Expr::Expr { sql, vars } => build_template(b, sql, vars),
            Expr::And(exprs) => build_joined(b, exprs, " AND "),
            Expr::Where(exprs) => build_joined(b, exprs, " AND "),
            Expr::Or(exprs) => build_joined(b, exprs, " OR "),
            Expr::Not(inner) => {
                if inner.is_empty() {
                    return;
                }
                b.push("NOT (");
                inner.build(b);
                b.push_char(')');
            }
        }
    }
}

fn needs_parens(expr: &Expr, separator: &str) -> bool {
    match expr {
        Expr::Or(exprs) => separator != " OR " && exprs.iter().filter(|e| !e.is_empty()).count() > 1,
        Expr::And(exprs) | Expr::Where(exprs) => {
            separator != " AND " && exprs.iter().filter(|e| !e.is_empty()).count() > 1
        }
        Expr::Expr { sql, .. } => {
            let upper = sql.to_ascii_uppercase();
            upper.contains(" OR ") || upper.contains(" AND ")
        }
        _ => false,
    }
}

/// Render `exprs` joined by AND, skipping empty groups.
pub(crate) fn build_conjunction(b: &mut StatementBuilder<'_>, exprs: &[Expr]) {
    build_joined(b, exprs, " AND ");
}

fn build_joined(b: &mut StatementBuilder<'_>, exprs: &[Expr], separator: &str) {
    let mut first = true;
    for expr in exprs.iter().filter(|e| !e.is_empty()) {
        if !first {
            b.push(separator);
        }
        first = false;
        if needs_parens(expr, separator) {
            b.push_char('(');
            expr.build(b);
            b.push_char(')');
        } else {
            expr.build(b);
        }
    }
}

fn build_in(b: &mut StatementBuilder<'_>, column: &str, values: &[Value]) {
    match values {
        [] => {
            b.push("1=0");
        }
        [single] => Expr::eq(column, single.clone()).build(b),
        _ => {
            let chunks: Vec<&[Value]> = values.chunks(MAX_IN_LIST).collect();
            if chunks.len() > 1 {
                b.push_char('(');
            }
            for (i, chunk) in chunks.iter().enumerate() {
                if i > 0 {
                    b.push(" OR ");
                }
                b.push_ident(column).push(" IN (");
                for (j, v) in chunk.iter().enumerate() {
                    if j > 0 {
                        b.push(",");
                    }
                    b.push_value(v);
                }
                b.push_char(')');
            }
            if chunks.len() > 1 {
                b.push_char(')');
            }
        }
    }
}

fn build_template(b: &mut StatementBuilder<'_>, sql: &str, vars: &[Value]) {
    let mut vars = vars.iter();
    let mut in_literal = false;
    let mut literal = String::new();
    for ch in sql.chars() {
        if ch == '\'' {
            in_literal = !in_literal;
        }
        if ch == '?' && !in_literal {
            if let Some(var) = vars.next() {
                b.push(&literal);
                literal.clear();
                match var {
                    Value::Array(items) => {
                        b.push_char('(');
                        for (i, item) in items.iter().enumerate() {
                            if i > 0 {
                                b.push(",");
                            }
                            b.push_value(item);
                        }
                        b.push_char(')');
                    }
                    _ => {
                        b.push_value(var);
                    }
                }
                continue;
            }
        }
        literal.push(ch);
    }
    b.push(&literal);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(expr: &Expr) -> (String, usize) {
        let mut b = StatementBuilder::new("users", None);
        expr.build(&mut b);
        let stmt = b.build();
        let n = stmt.binds.len();
        (stmt.sql, n)
    }

    #[test]
    fn eq_and_null() {
        assert_eq!(render(&Expr::eq("id", 1i64)), (r#""id" = :1"#.into(), 1));
        assert_eq!(
            render(&Expr::is_null("deleted_at")),
            (r#""deleted_at" IS NULL"#.into(), 0)
        );
        assert_eq!(
            render(&Expr::is_not_null("deleted_at")),
            (r#""deleted_at" IS NOT NULL"#.into(), 0)
        );
        assert_eq!(render(&Expr::neq("name", "x")), (r#""name" <> :1"#.into(), 1));
    }

    #[test]
    fn in_lists() {
        assert_eq!(render(&Expr::in_list("id", Vec::<i64>::new())), ("1=0".into(), 0));
        assert_eq!(render(&Expr::in_list("id", [7i64])), (r#""id" = :1"#.into(), 1));
        assert_eq!(
            render(&Expr::in_list("id", [1i64, 2, 3])),
            (r#""id" IN (:1,:2,:3)"#.into(), 3)
        );
        assert_eq!(
            render(&Expr::not_in("id", [1i64, 2])),
            (r#"NOT ("id" IN (:1,:2))"#.into(), 2)
        );
    }

    #[test]
    fn long_in_list_is_split() {
        let (sql, n) = render(&Expr::in_list("id", 0..1500i64));
        assert_eq!(n, 1500);
        assert!(sql.starts_with(r#"("id" IN (:1,"#));
        assert!(sql.contains(r#") OR "id" IN (:1001,"#));
        assert!(sql.ends_with(":1500))"));
    }

    #[test]
    fn template_expands_vars() {
        let expr = Expr::template(
            "age > ? AND tag IN ? AND note <> '?'",
            vec![Value::I32(18), Value::array(["a", "b"])],
        );
        assert_eq!(
            render(&expr),
            ("age > :1 AND tag IN (:2,:3) AND note <> '?'".into(), 3)
        );
    }

    #[test]
    fn nested_groups() {
        let expr = Expr::and(vec![
            Expr::eq("status", "active"),
            Expr::or(vec![
                Expr::eq("role", "admin"),
                Expr::and(vec![Expr::eq("role", "user"), Expr::gt("reputation", 100i32)]),
            ]),
        ]);
        let (sql, n) = render(&expr);
        assert_eq!(
            sql,
            r#""status" = :1 AND ("role" = :2 OR ("role" = :3 AND "reputation" > :4))"#
        );
        assert_eq!(n, 4);
    }

    #[test]
    fn empty_groups_render_nothing() {
        let expr = Expr::and(vec![Expr::or(vec![]), Expr::eq("id", 1i64)]);
        assert_eq!(render(&expr), (r#""id" = :1"#.into(), 1));
        assert!(Expr::Where(vec![]).is_empty());
        assert!(Expr::not(Expr::and(vec![])).is_empty());
    }
}
