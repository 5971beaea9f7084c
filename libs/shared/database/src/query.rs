use std::fmt::Display;

/// Renders PostgREST horizontal filters, ordering and paging into a query
/// string. Values are URL encoded; column names and operators are not.
#[derive(Debug, Default, Clone)]
pub struct QueryBuilder {
    parts: Vec<String>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn filter(mut self, column: &str, op: &str, value: impl Display) -> Self {
        let encoded = urlencoding::encode(&value.to_string()).into_owned();
        self.parts.push(format!("{}={}.{}", column, op, encoded));
        self
    }

    pub fn eq(self, column: &str, value: impl Display) -> Self {
        self.filter(column, "eq", value)
    }

    pub fn neq(self, column: &str, value: impl Display) -> Self {
        self.filter(column, "neq", value)
    }

    pub fn gt(self, column: &str, value: impl Display) -> Self {
        self.filter(column, "gt", value)
    }

    pub fn gte(self, column: &str, value: impl Display) -> Self {
        self.filter(column, "gte", value)
    }

    pub fn lt(self, column: &str, value: impl Display) -> Self {
        self.filter(column, "lt", value)
    }

    pub fn lte(self, column: &str, value: impl Display) -> Self {
        self.filter(column, "lte", value)
    }

    /// Case-insensitive substring match.
    pub fn ilike(self, column: &str, needle: &str) -> Self {
        self.filter(column, "ilike", contains_pattern(needle))
    }

    /// Case-insensitive equality.
    pub fn ilike_exact(self, column: &str, value: &str) -> Self {
        self.filter(column, "ilike", escape_like(value))
    }

    pub fn is_null(mut self, column: &str) -> Self {
        self.parts.push(format!("{}=is.null", column));
        self
    }

    pub fn in_list<V: Display>(mut self, column: &str, values: &[V]) -> Self {
        let joined = values
            .iter()
            .map(|v| urlencoding::encode(&quote(&v.to_string())).into_owned())
            .collect::<Vec<_>>()
            .join(",");
        self.parts.push(format!("{}=in.({})", column, joined));
        self
    }

    /// `or=(a.op.v,b.op.v)`; build the members with [`condition`].
    pub fn or(mut self, conditions: &[String]) -> Self {
        if !conditions.is_empty() {
            self.parts.push(format!("or=({})", conditions.join(",")));
        }
        self
    }

    pub fn select(mut self, columns: &str) -> Self {
        self.parts.push(format!("select={}", columns));
        self
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        let direction = if ascending { "asc" } else { "desc" };
        self.parts.push(format!("order={}.{}", column, direction));
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.parts.push(format!("limit={}", limit));
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.parts.push(format!("offset={}", offset));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn build(&self) -> String {
        if self.parts.is_empty() {
            String::new()
        } else {
            format!("?{}", self.parts.join("&"))
        }
    }

    pub fn to_path(&self, table: &str) -> String {
        format!("/rest/v1/{}{}", table, self.build())
    }
}

/// A single member of an `or=(...)` group.
pub fn condition(column: &str, op: &str, value: impl Display) -> String {
    let encoded = urlencoding::encode(&quote(&value.to_string())).into_owned();
    format!("{}.{}.{}", column, op, encoded)
}

/// PostgREST splits `or` and `in` lists on reserved characters unless the
/// member is double quoted.
fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Make user text literal inside a LIKE pattern. PostgREST rewrites every
/// `*` to `%`, so a literal star can only be matched as `_`.
pub fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' | '%' | '_' => {
                escaped.push('\\');
                escaped.push(c);
            }
            '*' => escaped.push('_'),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// `*needle*` with the needle taken literally.
pub fn contains_pattern(needle: &str) -> String {
    format!("*{}*", escape_like(needle))
}
