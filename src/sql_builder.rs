//! Parameterized SELECT construction for ledger tables.
//!
//! Filter values always go through DuckDB's parameter binding (`?`
//! placeholders), never through string interpolation. Column names are
//! double-quoted so camelCase columns keep their case.
//!
//! # Example
//!
//! ```rust
//! use venture_ledger::SqlBuilder;
//! let (sql, params) = SqlBuilder::new("investments")
//!     .where_eq("investorId", "inv-1")
//!     .order_by(&["timestamp ASC"])
//!     .limit(10)
//!     .build();
//! assert!(sql.contains("\"investorId\" = ?"));
//! assert_eq!(params, vec!["inv-1"]);
//! ```

/// Builds parameterized SQL queries. Methods return `&mut Self` for chaining.
#[derive(Debug, Clone)]
pub struct SqlBuilder {
    select_cols: Vec<String>,
    is_distinct: bool,
    from_table: String,
    where_clauses: Vec<String>,
    params: Vec<String>,
    order_by_cols: Vec<String>,
    limit_val: Option<usize>,
    offset_val: Option<usize>,
}

fn quote(column: &str) -> String {
    if column == "*" {
        return column.to_string();
    }
    format!("\"{}\"", column.replace('"', ""))
}

impl SqlBuilder {
    /// Create a builder targeting the given table.
    pub fn new(table: &str) -> Self {
        Self {
            select_cols: vec!["*".to_string()],
            is_distinct: false,
            from_table: table.to_string(),
            where_clauses: Vec::new(),
            params: Vec::new(),
            order_by_cols: Vec::new(),
            limit_val: None,
            offset_val: None,
        }
    }

    /// Set the columns to select (replaces the default `*`).
    pub fn select(&mut self, cols: &[&str]) -> &mut Self {
        self.select_cols = cols.iter().map(|c| quote(c)).collect();
        self
    }

    pub fn distinct(&mut self) -> &mut Self {
        self.is_distinct = true;
        self
    }

    /// Add a raw WHERE condition with `?` placeholders for each param.
    pub fn where_clause(&mut self, condition: &str, params: &[&str]) -> &mut Self {
        self.where_clauses.push(condition.to_string());
        self.params.extend(params.iter().map(|p| p.to_string()));
        self
    }

    /// Add an equality condition: `"{column}" = ?`.
    pub fn where_eq(&mut self, column: &str, value: &str) -> &mut Self {
        self.where_clauses.push(format!("{} = ?", quote(column)));
        self.params.push(value.to_string());
        self
    }

    /// Add an IN condition. An empty list matches nothing.
    pub fn where_in(&mut self, column: &str, values: &[&str]) -> &mut Self {
        if values.is_empty() {
            self.where_clauses.push("FALSE".to_string());
            return self;
        }
        let placeholders: Vec<&str> = values.iter().map(|_| "?").collect();
        self.where_clauses
            .push(format!("{} IN ({})", quote(column), placeholders.join(", ")));
        self.params.extend(values.iter().map(|v| v.to_string()));
        self
    }

    /// Add ORDER BY clauses as `"column DIRECTION"` (e.g. `"createdAt DESC"`).
    pub fn order_by(&mut self, clauses: &[&str]) -> &mut Self {
        for clause in clauses {
            let mut parts = clause.split_whitespace();
            if let Some(col) = parts.next() {
                let rest: Vec<&str> = parts.collect();
                if rest.is_empty() {
                    self.order_by_cols.push(quote(col));
                } else {
                    self.order_by_cols
                        .push(format!("{} {}", quote(col), rest.join(" ")));
                }
            }
        }
        self
    }

    pub fn limit(&mut self, n: usize) -> &mut Self {
        self.limit_val = Some(n);
        self
    }

    pub fn offset(&mut self, n: usize) -> &mut Self {
        self.offset_val = Some(n);
        self
    }

    /// Build the final SQL string and parameter list.
    pub fn build(&self) -> (String, Vec<String>) {
        let distinct = if self.is_distinct { "DISTINCT " } else { "" };
        let mut parts = vec![
            format!("SELECT {}{}", distinct, self.select_cols.join(", ")),
            format!("FROM {}", self.from_table),
        ];

        if !self.where_clauses.is_empty() {
            parts.push(format!("WHERE {}", self.where_clauses.join(" AND ")));
        }

        if !self.order_by_cols.is_empty() {
            parts.push(format!("ORDER BY {}", self.order_by_cols.join(", ")));
        }

        if let Some(n) = self.limit_val {
            parts.push(format!("LIMIT {}", n));
        }

        if let Some(n) = self.offset_val {
            parts.push(format!("OFFSET {}", n));
        }

        (parts.join("\n"), self.params.clone())
    }
}
