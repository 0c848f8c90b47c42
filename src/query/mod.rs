//! Filtered query compilation.
//!
//! User-supplied `(field, operator, value)` triples are validated against a
//! fixed whitelist and compiled into a [`CompiledQuery`]: typed predicates
//! plus a sort order. At most one field may carry an inequality operator,
//! and when one does the results are ordered by that field first. The
//! compiled query renders itself into SQL through [`sqlx::QueryBuilder`].

use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite};

use crate::errors::AppError;

/// Comparison operators accepted in filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equal,
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
    NotEqual,
}

impl Operator {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "EQ" => Some(Operator::Equal),
            "GT" => Some(Operator::Greater),
            "GTEQ" => Some(Operator::GreaterOrEqual),
            "LT" => Some(Operator::Less),
            "LTEQ" => Some(Operator::LessOrEqual),
            "NE" => Some(Operator::NotEqual),
            _ => None,
        }
    }

    /// Everything but equality restricts a range of the index.
    pub fn is_inequality(&self) -> bool {
        !matches!(self, Operator::Equal)
    }

    fn sql(&self) -> &'static str {
        match self {
            Operator::Equal => "=",
            Operator::Greater => ">",
            Operator::GreaterOrEqual => ">=",
            Operator::Less => "<",
            Operator::LessOrEqual => "<=",
            Operator::NotEqual => "!=",
        }
    }
}

/// How a field is laid out in its table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    /// A plain column.
    Scalar(&'static str),
    /// A JSON array column; a predicate matches when any element matches.
    List(&'static str),
}

/// Type the raw filter value must be coerced to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Text,
    Integer,
}

/// A field that filters may reference.
pub trait QueryField: Copy + Eq + std::fmt::Debug {
    fn from_token(token: &str) -> Option<Self>;
    fn column(self) -> Column;
    fn value_kind(self) -> ValueKind;
}

/// Filterable event fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventField {
    City,
    Topic,
    Month,
    MaxAttendees,
}

impl QueryField for EventField {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "CITY" => Some(EventField::City),
            "TOPIC" => Some(EventField::Topic),
            "MONTH" => Some(EventField::Month),
            "MAX_ATTENDEES" => Some(EventField::MaxAttendees),
            _ => None,
        }
    }

    fn column(self) -> Column {
        match self {
            EventField::City => Column::Scalar("city"),
            EventField::Topic => Column::List("topics"),
            EventField::Month => Column::Scalar("month"),
            EventField::MaxAttendees => Column::Scalar("max_attendees"),
        }
    }

    fn value_kind(self) -> ValueKind {
        match self {
            EventField::City | EventField::Topic => ValueKind::Text,
            EventField::Month | EventField::MaxAttendees => ValueKind::Integer,
        }
    }
}

/// Filterable session fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionField {
    TypeOfSession,
    Speaker,
    StartTime,
}

impl QueryField for SessionField {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "TYPE" => Some(SessionField::TypeOfSession),
            "SPEAKER" => Some(SessionField::Speaker),
            "START_TIME" => Some(SessionField::StartTime),
            _ => None,
        }
    }

    fn column(self) -> Column {
        match self {
            SessionField::TypeOfSession => Column::List("typeof_session"),
            SessionField::Speaker => Column::List("speakers"),
            // Stored as zero-padded HH:MM, so text order is time order.
            SessionField::StartTime => Column::Scalar("start_time"),
        }
    }

    fn value_kind(self) -> ValueKind {
        ValueKind::Text
    }
}

/// One filter as submitted by a caller.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RawFilter {
    pub field: String,
    pub operator: String,
    pub value: String,
}

impl RawFilter {
    pub fn new(field: &str, operator: &str, value: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            operator: operator.to_string(),
            value: value.into(),
        }
    }
}

/// A filter value after coercion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    Text(String),
    Integer(i64),
}

/// A validated predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate<F> {
    pub field: F,
    pub operator: Operator,
    pub value: FilterValue,
}

impl<F: QueryField> Predicate<F> {
    /// Build a predicate from a raw value, coercing numeric fields.
    pub fn new(field: F, operator: Operator, raw: &str) -> Result<Self, AppError> {
        let value = match field.value_kind() {
            ValueKind::Text => FilterValue::Text(raw.to_string()),
            ValueKind::Integer => FilterValue::Integer(parse_integer(field, raw)?),
        };
        Ok(Self {
            field,
            operator,
            value,
        })
    }
}

fn parse_integer<F: QueryField>(field: F, raw: &str) -> Result<i64, AppError> {
    raw.trim().parse().map_err(|_| {
        AppError::BadRequest(format!(
            "Filter value for {:?} must be an integer: {}",
            field, raw
        ))
    })
}

/// Sort keys of a compiled query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey<F> {
    Field(F),
    Name,
}

/// A validated, executable query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledQuery<F> {
    predicates: Vec<Predicate<F>>,
    inequality_field: Option<F>,
    order: Vec<SortKey<F>>,
}

impl<F: QueryField> CompiledQuery<F> {
    /// Validate and compile raw filters.
    pub fn compile(filters: &[RawFilter]) -> Result<Self, AppError> {
        let predicates = filters
            .iter()
            .map(|f| {
                let field = F::from_token(&f.field);
                let operator = Operator::from_token(&f.operator);
                match (field, operator) {
                    (Some(field), Some(operator)) => Predicate::new(field, operator, &f.value),
                    _ => Err(AppError::BadRequest(
                        "Filter contains invalid field or operator.".to_string(),
                    )),
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::from_predicates(predicates)
    }

    /// Compile already-typed predicates, enforcing the single inequality field rule.
    pub fn from_predicates(predicates: Vec<Predicate<F>>) -> Result<Self, AppError> {
        let mut inequality_field: Option<F> = None;
        for predicate in predicates.iter().filter(|p| p.operator.is_inequality()) {
            match inequality_field {
                Some(field) if field != predicate.field => {
                    return Err(AppError::BadRequest(
                        "Inequality filter is allowed on only one field.".to_string(),
                    ));
                }
                _ => inequality_field = Some(predicate.field),
            }
        }

        let mut order = Vec::with_capacity(2);
        if let Some(field) = inequality_field {
            order.push(SortKey::Field(field));
        }
        order.push(SortKey::Name);

        Ok(Self {
            predicates,
            inequality_field,
            order,
        })
    }

    /// An unrestricted query ordered by name.
    pub fn unrestricted() -> Self {
        Self {
            predicates: Vec::new(),
            inequality_field: None,
            order: vec![SortKey::Name],
        }
    }

    pub fn predicates(&self) -> &[Predicate<F>] {
        &self.predicates
    }

    pub fn inequality_field(&self) -> Option<F> {
        self.inequality_field
    }

    pub fn order(&self) -> &[SortKey<F>] {
        &self.order
    }

    /// Append `WHERE` and `ORDER BY` clauses to a `SELECT ... FROM <table>` builder.
    ///
    /// `scope` restricts the scan to rows whose `column = value`, e.g. the
    /// sessions of one event.
    pub fn push_sql(&self, builder: &mut QueryBuilder<'_, Sqlite>, scope: Option<(&str, String)>) {
        let mut first = true;
        let mut next_clause = |builder: &mut QueryBuilder<'_, Sqlite>| {
            builder.push(if first { " WHERE " } else { " AND " });
            first = false;
        };

        if let Some((column, value)) = scope {
            next_clause(builder);
            builder.push(column).push(" = ").push_bind(value);
        }

        for predicate in &self.predicates {
            next_clause(builder);
            match predicate.field.column() {
                Column::Scalar(column) => {
                    builder.push(column);
                    builder.push(" ").push(predicate.operator.sql()).push(" ");
                }
                Column::List(column) => {
                    builder
                        .push("EXISTS (SELECT 1 FROM json_each(")
                        .push(column)
                        .push(") WHERE json_each.value ")
                        .push(predicate.operator.sql())
                        .push(" ");
                }
            }
            match &predicate.value {
                FilterValue::Text(text) => builder.push_bind(text.clone()),
                FilterValue::Integer(number) => builder.push_bind(*number),
            };
            if matches!(predicate.field.column(), Column::List(_)) {
                builder.push(")");
            }
        }

        builder.push(" ORDER BY ");
        for (i, key) in self.order.iter().enumerate() {
            if i > 0 {
                builder.push(", ");
            }
            match key {
                SortKey::Field(field) => match field.column() {
                    Column::Scalar(column) => builder.push(column),
                    Column::List(column) => builder
                        .push("(SELECT MIN(value) FROM json_each(")
                        .push(column)
                        .push("))"),
                },
                SortKey::Name => builder.push("name"),
            };
        }
    }
}

/// Compile event filters.
pub fn compile_event_query(filters: &[RawFilter]) -> Result<CompiledQuery<EventField>, AppError> {
    CompiledQuery::compile(filters)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sql_of<F: QueryField>(query: &CompiledQuery<F>, scope: Option<(&str, String)>) -> String {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM t");
        query.push_sql(&mut builder, scope);
        builder.sql().to_string()
    }

    #[test]
    fn test_empty_filters_order_by_name() {
        let query = compile_event_query(&[]).unwrap();
        assert!(query.predicates().is_empty());
        assert_eq!(query.order(), &[SortKey::Name]);
        assert_eq!(query, CompiledQuery::unrestricted());
    }

    #[test]
    fn test_inequality_field_sorts_first() {
        let query = compile_event_query(&[RawFilter::new("MAX_ATTENDEES", "GT", "10")]).unwrap();
        assert_eq!(
            query.order(),
            &[SortKey::Field(EventField::MaxAttendees), SortKey::Name]
        );
        assert_eq!(query.predicates()[0].value, FilterValue::Integer(10));
    }

    #[test]
    fn test_two_inequality_fields_rejected() {
        let ops = ["GT", "GTEQ", "LT", "LTEQ", "NE"];
        for first in ops {
            for second in ops {
                let err = compile_event_query(&[
                    RawFilter::new("MONTH", first, "6"),
                    RawFilter::new("MAX_ATTENDEES", second, "10"),
                ])
                .unwrap_err();
                assert_eq!(err.error_code(), "BAD_REQUEST");
            }
        }
    }

    #[test]
    fn test_inequalities_on_same_field_allowed() {
        let query = compile_event_query(&[
            RawFilter::new("MONTH", "GT", "3"),
            RawFilter::new("MONTH", "LTEQ", "9"),
            RawFilter::new("CITY", "EQ", "London"),
        ])
        .unwrap();
        assert_eq!(query.inequality_field(), Some(EventField::Month));
        assert_eq!(query.predicates().len(), 3);
    }

    #[test]
    fn test_repeated_equality_is_kept() {
        let query = compile_event_query(&[
            RawFilter::new("TOPIC", "EQ", "Rust"),
            RawFilter::new("TOPIC", "EQ", "Web"),
        ])
        .unwrap();
        assert_eq!(query.predicates().len(), 2);
        assert_eq!(query.inequality_field(), None);
    }

    #[test]
    fn test_unknown_tokens_rejected() {
        assert!(compile_event_query(&[RawFilter::new("COUNTRY", "EQ", "UK")]).is_err());
        assert!(compile_event_query(&[RawFilter::new("CITY", "LIKE", "Lon%")]).is_err());
    }

    #[test]
    fn test_numeric_coercion_failure() {
        let err = compile_event_query(&[RawFilter::new("MONTH", "EQ", "June")]).unwrap_err();
        assert_eq!(err.error_code(), "BAD_REQUEST");
    }

    #[test]
    fn test_sql_rendering() {
        let query = compile_event_query(&[
            RawFilter::new("CITY", "EQ", "London"),
            RawFilter::new("TOPIC", "NE", "Medical"),
        ])
        .unwrap();
        assert_eq!(
            sql_of(&query, None),
            "SELECT * FROM t WHERE city = ? AND EXISTS (SELECT 1 FROM json_each(topics) \
             WHERE json_each.value != ?) ORDER BY (SELECT MIN(value) FROM json_each(topics)), name"
        );
    }

    #[test]
    fn test_session_query_with_scope() {
        let predicate =
            Predicate::new(SessionField::StartTime, Operator::LessOrEqual, "19:00").unwrap();
        let query = CompiledQuery::from_predicates(vec![predicate]).unwrap();
        assert_eq!(
            sql_of(&query, Some(("event_id", "event-1".to_string()))),
            "SELECT * FROM t WHERE event_id = ? AND start_time <= ? ORDER BY start_time, name"
        );
    }

    #[test]
    fn test_session_type_and_time_inequalities_conflict() {
        let result = CompiledQuery::from_predicates(vec![
            Predicate::new(SessionField::TypeOfSession, Operator::NotEqual, "Workshop").unwrap(),
            Predicate::new(SessionField::StartTime, Operator::Less, "19:00").unwrap(),
        ]);
        assert!(result.is_err());
    }
}
