//! Guard against UPDATE/DELETE statements that would touch every row.
//!
//! A WHERE tree is accepted when it holds at least one condition other than a
//! soft-delete marker (`deleted_at IS NULL` and friends). Compound groups count
//! as conditions, as does an empty IN list, which explicitly matches nothing.

use crate::config::EngineConfig;
use crate::error::{OrmError, OrmResult};
use crate::expr::Expr;
use crate::ident::same_name;
use crate::value::Value;
use regex::Regex;

/// Classifies predicate trees for one soft-delete column.
#[derive(Debug)]
pub struct WhereGuard {
    column: String,
    soft_delete_sql: Option<Regex>,
}

impl WhereGuard {
    pub fn new(soft_delete_column: &str) -> Self {
        let name = regex::escape(crate::ident::unquote(soft_delete_column));
        let pattern = format!(
            r#"(?i)^\s*(?:"?[A-Za-z0-9_$#]+"?\.)?"?{name}"?\s+IS\s+(?:NOT\s+)?NULL\s*$"#
        );
        Self {
            column: soft_delete_column.to_string(),
            soft_delete_sql: Regex::new(&pattern).ok(),
        }
    }

    fn is_soft_delete_column(&self, column: &str) -> bool {
        let last = column.rsplit('.').next().unwrap_or(column);
        same_name(last, &self.column)
    }

    /// Whether the tree restricts the affected rows.
    pub fn is_meaningful(&self, expr: &Expr) -> bool {
        match expr {
            Expr::Eq { column, value } | Expr::Neq { column, value } => {
                !(value.is_null() && self.is_soft_delete_column(column))
            }
            Expr::In { column, values } => {
                !(values.iter().all(Value::is_null)
                    && !values.is_empty()
                    && self.is_soft_delete_column(column))
            }
            Expr::Expr { sql, .. } => {
                if sql.trim().is_empty() {
                    return false;
                }
                match &self.soft_delete_sql {
                    Some(re) => !re.is_match(sql),
                    None => true,
                }
            }
            Expr::And(_) | Expr::Or(_) | Expr::Not(_) => !expr.is_empty(),
            Expr::Where(exprs) => exprs.iter().any(|e| self.is_meaningful(e)),
        }
    }

    /// Fail unless `conditions` contain a meaningful condition.
    pub fn check(&self, kind: &str, table: &str, conditions: &[Expr]) -> OrmResult<()> {
        if conditions.iter().any(|e| self.is_meaningful(e)) {
            return Ok(());
        }
        Err(OrmError::MissingWhere(format!(
            "{kind} on {table} has no condition besides the soft-delete marker; \
             enable allow_global_update to affect every row"
        )))
    }
}

/// Apply the WHERE safety gate for `kind` against `config`.
pub fn check_where(
    config: &EngineConfig,
    kind: &str,
    table: &str,
    conditions: &[Expr],
) -> OrmResult<()> {
    if config.allow_global_update {
        return Ok(());
    }
    WhereGuard::new(&config.soft_delete_column).check(kind, table, conditions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate(conditions: &[Expr]) -> OrmResult<()> {
        check_where(&EngineConfig::default(), "DELETE", "users", conditions)
    }

    #[test]
    fn empty_where_rejected() {
        let err = gate(&[]).unwrap_err();
        assert!(err.is_missing_where());
    }

    #[test]
    fn override_allows_empty_where() {
        let config = EngineConfig::new().allow_global_update(true);
        assert!(check_where(&config, "UPDATE", "users", &[]).is_ok());
    }

    #[test]
    fn soft_delete_only_rejected() {
        assert!(gate(&[Expr::is_null("deleted_at")]).is_err());
        assert!(gate(&[Expr::is_not_null(r#""users"."DELETED_AT""#)]).is_err());
        assert!(gate(&[Expr::raw(r#""users"."deleted_at" IS NULL"#)]).is_err());
        assert!(gate(&[Expr::Where(vec![Expr::is_null("deleted_at")])]).is_err());
    }

    #[test]
    fn real_condition_accepted() {
        assert!(gate(&[Expr::eq("id", 1i64)]).is_ok());
        assert!(gate(&[Expr::is_null("deleted_at"), Expr::eq("id", 1i64)]).is_ok());
        assert!(gate(&[Expr::raw("status = 'x'")]).is_ok());
    }

    #[test]
    fn compound_and_empty_in_accepted() {
        assert!(gate(&[Expr::or(vec![Expr::eq("a", 1i64), Expr::eq("b", 2i64)])]).is_ok());
        assert!(gate(&[Expr::in_list("id", Vec::<i64>::new())]).is_ok());
        assert!(gate(&[Expr::and(vec![])]).is_err());
    }

    #[test]
    fn custom_soft_delete_column() {
        let config = EngineConfig::new().with_soft_delete_column("removed_on");
        assert!(check_where(&config, "DELETE", "t", &[Expr::is_null("removed_on")]).is_err());
        assert!(check_where(&config, "DELETE", "t", &[Expr::is_null("deleted_at")]).is_ok());
    }
}
