// Query builder — adapter query types rendered as SQL text.
//
// Output uses positional $N placeholders, bound in order through sqlx's
// `query()`. Identifiers are double-quoted, which SQLite and Postgres
// accept natively; MySQL needs ANSI_QUOTES mode.

use pitchdesk_core::db::adapter::{Connector, FindManyQuery, Operator, SortDirection, WhereClause};

/// A piece of SQL plus the bind values its placeholders consume.
#[derive(Debug, Clone, Default)]
pub struct SqlFragment {
    /// SQL text with `$N` placeholders.
    pub sql: String,
    /// Bind values, one per placeholder, in order.
    pub binds: Vec<serde_json::Value>,
}

impl SqlFragment {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Claim the next `$N` placeholder, recording its bind value. `offset`
    /// shifts the numbering past binds that precede this fragment.
    fn placeholder(&mut self, offset: usize, value: serde_json::Value) -> String {
        self.binds.push(value);
        format!("${}", offset + self.binds.len())
    }
}

/// SQL symbol for the binary comparison operators, `None` for the rest.
fn comparison_symbol(op: &Operator) -> Option<&'static str> {
    Some(match op {
        Operator::Eq => "=",
        Operator::Ne => "!=",
        Operator::Lt => "<",
        Operator::Lte => "<=",
        Operator::Gt => ">",
        Operator::Gte => ">=",
        _ => return None,
    })
}

/// LIKE pattern for the string-matching operators.
fn like_pattern(op: &Operator, value: &serde_json::Value) -> String {
    let raw = value.as_str().unwrap_or_default();
    match op {
        Operator::StartsWith => format!("{raw}%"),
        Operator::EndsWith => format!("%{raw}"),
        _ => format!("%{raw}%"),
    }
}

/// Build a WHERE clause from a slice of `WhereClause`.
///
/// Returns a fragment starting with " WHERE ..." and its bind values, or an
/// empty fragment for an empty slice. `bind_offset` shifts the placeholder
/// numbering when the fragment follows earlier binds (UPDATE ... SET).
pub fn build_where(clauses: &[WhereClause], bind_offset: usize) -> SqlFragment {
    if clauses.is_empty() {
        return SqlFragment::empty();
    }

    let mut frag = SqlFragment::empty();
    frag.sql.push_str(" WHERE ");

    for (i, clause) in clauses.iter().enumerate() {
        if i > 0 {
            // The connector rides on the clause before the junction.
            let joint = match clauses[i - 1].connector {
                Some(Connector::Or) => " OR ",
                _ => " AND ",
            };
            frag.sql.push_str(joint);
        }

        let field = quote_identifier(&clause.field);

        if matches!(clause.operator, Operator::Eq | Operator::Ne) && clause.value.is_null() {
            // NULL never matches `=`/`!=`; emit the IS form instead.
            let form = if clause.operator == Operator::Eq {
                "IS NULL"
            } else {
                "IS NOT NULL"
            };
            frag.sql.push_str(&format!("{field} {form}"));
        } else if let Some(symbol) = comparison_symbol(&clause.operator) {
            let p = frag.placeholder(bind_offset, clause.value.clone());
            frag.sql.push_str(&format!("{field} {symbol} {p}"));
        } else if clause.operator == Operator::In {
            match clause.value.as_array() {
                Some(candidates) => {
                    let spots: Vec<String> = candidates
                        .iter()
                        .map(|v| frag.placeholder(bind_offset, v.clone()))
                        .collect();
                    frag.sql.push_str(&format!("{field} IN ({})", spots.join(", ")));
                }
                None => {
                    // Scalar IN degrades to equality.
                    let p = frag.placeholder(bind_offset, clause.value.clone());
                    frag.sql.push_str(&format!("{field} = {p}"));
                }
            }
        } else {
            let pattern = like_pattern(&clause.operator, &clause.value);
            let p = frag.placeholder(bind_offset, serde_json::Value::String(pattern));
            frag.sql.push_str(&format!("{field} LIKE {p}"));
        }
    }

    frag
}

/// ORDER BY clause for a query, empty when no sort is requested.
pub fn build_order_by(query: &FindManyQuery) -> String {
    query.sort_by.as_ref().map_or_else(String::new, |sort| {
        let dir = match sort.direction {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        };
        format!(" ORDER BY {} {}", quote_identifier(&sort.field), dir)
    })
}

/// LIMIT and OFFSET clauses for a query.
pub fn build_limit_offset(query: &FindManyQuery) -> String {
    match (query.limit, query.offset) {
        (Some(limit), Some(offset)) => format!(" LIMIT {limit} OFFSET {offset}"),
        (Some(limit), None) => format!(" LIMIT {limit}"),
        // SQLite requires LIMIT before OFFSET; -1 means no limit.
        (None, Some(offset)) => format!(" LIMIT -1 OFFSET {offset}"),
        (None, None) => String::new(),
    }
}

/// Build an INSERT statement for a JSON object.
pub fn build_insert(table: &str, data: &serde_json::Value) -> SqlFragment {
    let obj = match data.as_object() {
        Some(o) => o,
        None => return SqlFragment::empty(),
    };

    let mut frag = SqlFragment::empty();
    let mut columns = Vec::with_capacity(obj.len());
    let mut spots = Vec::with_capacity(obj.len());
    for (key, value) in obj {
        columns.push(quote_identifier(key));
        spots.push(frag.placeholder(0, value.clone()));
    }

    frag.sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_identifier(table),
        columns.join(", "),
        spots.join(", ")
    );
    frag
}

/// Build the SET portion of an UPDATE from a JSON object.
pub fn build_update_set(data: &serde_json::Value, bind_offset: usize) -> SqlFragment {
    let obj = match data.as_object() {
        Some(o) => o,
        None => return SqlFragment::empty(),
    };

    let mut frag = SqlFragment::empty();
    let assignments: Vec<String> = obj
        .iter()
        .map(|(key, value)| {
            let p = frag.placeholder(bind_offset, value.clone());
            format!("{} = {}", quote_identifier(key), p)
        })
        .collect();

    frag.sql = assignments.join(", ");
    frag
}

/// Double-quote a table or column name. Embedded double quotes are
/// stripped, so a hostile name cannot break out of the quoting.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', ""))
}
