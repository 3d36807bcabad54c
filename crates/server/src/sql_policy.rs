//! Policy for caller-supplied SQL.
//!
//! The custom query endpoint forwards text to Athena verbatim, so what it
//! accepts is an explicit deployment choice rather than a default.
//!
//! The read-only check walks the parsed query: CTE bodies, set operations,
//! derived tables and joins must all be plain queries, and `SELECT ... INTO`
//! is refused. Parsing uses sqlparser's generic dialect, which does not know
//! every Athena/Trino extension; a valid Athena SELECT using such syntax
//! (for example `TABLESAMPLE BERNOULLI (10)`) is refused as unparsable under
//! `read-only` and needs the `unrestricted` policy.

use std::fmt;
use std::str::FromStr;

use sqlparser::ast::{Query, Select, SetExpr, Statement, TableFactor, TableWithJoins};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

/// What the custom query endpoint is allowed to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CustomQueryPolicy {
    /// Endpoint rejects every request.
    Disabled,
    /// A single statement that parses as a query (SELECT / WITH / VALUES).
    #[default]
    ReadOnly,
    /// Anything goes, including DDL.
    Unrestricted,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PolicyViolation {
    #[error("Custom queries are disabled on this server")]
    Disabled,

    #[error("Only read-only queries are allowed; got {0}")]
    NotReadOnly(String),

    #[error("Only a single statement is allowed; got {0}")]
    MultipleStatements(usize),

    #[error("Could not parse SQL: {0}")]
    Unparsable(String),
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown custom query policy '{0}' (expected disabled, read-only or unrestricted)")]
pub struct UnknownPolicy(String);

impl FromStr for CustomQueryPolicy {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "disabled" | "off" | "none" => Ok(Self::Disabled),
            "read-only" | "readonly" => Ok(Self::ReadOnly),
            "unrestricted" | "all" => Ok(Self::Unrestricted),
            _ => Err(UnknownPolicy(s.to_string())),
        }
    }
}

impl fmt::Display for CustomQueryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => write!(f, "disabled"),
            Self::ReadOnly => write!(f, "read-only"),
            Self::Unrestricted => write!(f, "unrestricted"),
        }
    }
}

impl CustomQueryPolicy {
    /// Decide whether `sql` may be forwarded.
    pub fn check(&self, sql: &str) -> Result<(), PolicyViolation> {
        match self {
            Self::Disabled => Err(PolicyViolation::Disabled),
            Self::Unrestricted => Ok(()),
            Self::ReadOnly => check_read_only(sql),
        }
    }
}

fn check_read_only(sql: &str) -> Result<(), PolicyViolation> {
    let statements = Parser::parse_sql(&GenericDialect {}, sql)
        .map_err(|e| PolicyViolation::Unparsable(e.to_string()))?;

    match statements.as_slice() {
        [Statement::Query(query)] => check_query(query),
        [other] => Err(PolicyViolation::NotReadOnly(statement_keyword(other))),
        [] => Err(PolicyViolation::Unparsable("no statement found".into())),
        many => Err(PolicyViolation::MultipleStatements(many.len())),
    }
}

fn check_query(query: &Query) -> Result<(), PolicyViolation> {
    if let Some(with) = &query.with {
        for cte in &with.cte_tables {
            check_query(&cte.query)?;
        }
    }
    check_set_expr(&query.body)
}

fn check_set_expr(body: &SetExpr) -> Result<(), PolicyViolation> {
    match body {
        SetExpr::Select(select) => check_select(select),
        SetExpr::Query(query) => check_query(query),
        SetExpr::SetOperation { left, right, .. } => {
            check_set_expr(left)?;
            check_set_expr(right)
        }
        SetExpr::Values(_) | SetExpr::Table(_) => Ok(()),
        // INSERT / UPDATE / DELETE / MERGE used as a query body.
        SetExpr::Insert(statement) | SetExpr::Update(statement) => {
            Err(PolicyViolation::NotReadOnly(statement_keyword(statement)))
        }
        other => Err(PolicyViolation::NotReadOnly(statement_keyword_of(other))),
    }
}

fn check_select(select: &Select) -> Result<(), PolicyViolation> {
    if select.into.is_some() {
        return Err(PolicyViolation::NotReadOnly("SELECT INTO".into()));
    }
    select.from.iter().try_for_each(check_table_with_joins)
}

fn check_table_with_joins(twj: &TableWithJoins) -> Result<(), PolicyViolation> {
    check_table_factor(&twj.relation)?;
    twj.joins
        .iter()
        .try_for_each(|join| check_table_factor(&join.relation))
}

fn check_table_factor(factor: &TableFactor) -> Result<(), PolicyViolation> {
    match factor {
        TableFactor::Derived { subquery, .. } => check_query(subquery),
        TableFactor::NestedJoin {
            table_with_joins, ..
        } => check_table_with_joins(table_with_joins),
        _ => Ok(()),
    }
}

fn statement_keyword_of(body: &SetExpr) -> String {
    body.to_string()
        .split_whitespace()
        .next()
        .unwrap_or("statement")
        .to_uppercase()
}

/// Leading keyword of a statement, e.g. `DROP`.
fn statement_keyword(statement: &Statement) -> String {
    statement
        .to_string()
        .split_whitespace()
        .next()
        .unwrap_or("statement")
        .to_uppercase()
}
