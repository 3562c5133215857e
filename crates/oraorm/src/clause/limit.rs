use crate::statement::StatementBuilder;

/// Row window: `OFFSET n ROWS FETCH NEXT m ROWS ONLY`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Limit {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl Limit {
    pub fn new(limit: u64) -> Self {
        Self {
            limit: Some(limit),
            offset: None,
        }
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    fn is_empty(&self) -> bool {
        self.limit.is_none() && self.offset.unwrap_or(0) == 0
    }
}

fn rows_word(n: u64) -> &'static str {
    if n == 1 { "ROW" } else { "ROWS" }
}

pub(super) fn build(limit: &Limit, b: &mut StatementBuilder<'_>) {
    if limit.is_empty() {
        return;
    }

    // Row windows are only stable over a deterministic order.
    if !b.has_order_by() {
        b.push("ORDER BY ");
        let keys: Vec<String> = b
            .schema()
            .map(|s| s.primary_keys().map(|f| f.db_name.clone()).collect())
            .unwrap_or_default();
        if keys.is_empty() {
            b.push("(SELECT NULL FROM DUAL)");
        } else {
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    b.push(", ");
                }
                b.push_ident(key);
            }
        }
        b.mark_order_by();
        b.push_char(' ');
    }

    let mut wrote_offset = false;
    if let Some(offset) = limit.offset.filter(|n| *n > 0) {
        b.push(&format!("OFFSET {offset} {}", rows_word(offset)));
        wrote_offset = true;
    }
    if let Some(count) = limit.limit {
        if wrote_offset {
            b.push_char(' ');
        }
        b.push(&format!("FETCH NEXT {count} {} ONLY", rows_word(count)));
    }
}
