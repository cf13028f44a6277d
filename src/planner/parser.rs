use sqlparser::{
    ast::{
        BinaryOperator, Expr, FunctionArg, FunctionArgExpr, FunctionArguments, Select, SelectItem,
        SetExpr, Statement, TableFactor, UnaryOperator, Value as SqlValue,
    },
    dialect::SQLiteDialect,
    parser::Parser,
};

use crate::{
    planner::{
        error::PlannerError,
        logical_plan::{Command, FilterPlan, Projection, SelectPlan},
    },
    types::value::Value,
};

pub struct SqlParser;

impl SqlParser {
    pub fn new() -> Self {
        Self
    }

    /// Parses a dot command or a single SELECT statement.
    pub fn parse_command(&self, input: &str) -> Result<Command, PlannerError> {
        let input = input.trim();
        if input.starts_with('.') {
            return self.parse_dot_command(input);
        }
        self.parse_sql(input)
    }

    fn parse_dot_command(&self, input: &str) -> Result<Command, PlannerError> {
        let name = input.split_whitespace().next().unwrap_or(input);
        match name.to_ascii_lowercase().as_str() {
            ".dbinfo" => Ok(Command::DbInfo),
            ".tables" => Ok(Command::Tables),
            ".schema" => Ok(Command::Schema),
            _ => Err(PlannerError::UnsupportedStatement(input.to_string())),
        }
    }

    pub fn parse_sql(&self, sql: &str) -> Result<Command, PlannerError> {
        let dialect = SQLiteDialect {};
        let statements = Parser::parse_sql(&dialect, sql)?;

        if statements.len() != 1 {
            return Err(PlannerError::InvalidQuery(
                "Expected exactly one statement".to_string(),
            ));
        }

        self.to_plan(&statements[0])
    }

    fn to_plan(&self, statement: &Statement) -> Result<Command, PlannerError> {
        match statement {
            Statement::Query(query) => match query.body.as_ref() {
                SetExpr::Select(select) => self.select_plan(select).map(Command::Select),
                other => Err(PlannerError::UnsupportedStatement(other.to_string())),
            },
            _ => Err(PlannerError::UnsupportedStatement(statement.to_string())),
        }
    }

    fn select_plan(&self, select: &Select) -> Result<SelectPlan, PlannerError> {
        let table_name = match select.from.as_slice() {
            [] => return Err(PlannerError::InvalidQuery("missing FROM clause".to_string())),
            [table] if table.joins.is_empty() => match &table.relation {
                TableFactor::Table { name, .. } => name
                    .0
                    .last()
                    .map(|ident| ident.value.clone())
                    .ok_or_else(|| PlannerError::InvalidQuery("empty table name".to_string()))?,
                other => return Err(PlannerError::UnsupportedExpression(other.to_string())),
            },
            _ => {
                return Err(PlannerError::UnsupportedStatement(
                    "joins and multiple tables".to_string(),
                ));
            }
        };

        let projection = self.projection(&select.projection)?;
        let filter = select.selection.as_ref().map(|expr| self.filter(expr)).transpose()?;

        Ok(SelectPlan {
            table_name,
            projection,
            filter,
        })
    }

    fn projection(&self, items: &[SelectItem]) -> Result<Projection, PlannerError> {
        if let [SelectItem::Wildcard(_)] = items {
            return Ok(Projection::All);
        }
        if let [SelectItem::UnnamedExpr(expr) | SelectItem::ExprWithAlias { expr, .. }] = items {
            if is_count_star(expr) {
                return Ok(Projection::CountStar);
            }
        }

        items
            .iter()
            .map(|item| match item {
                SelectItem::UnnamedExpr(expr) | SelectItem::ExprWithAlias { expr, .. } => {
                    column_name(expr)
                        .ok_or_else(|| PlannerError::UnsupportedExpression(expr.to_string()))
                }
                other => Err(PlannerError::UnsupportedExpression(other.to_string())),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Projection::Columns)
    }

    fn filter(&self, expr: &Expr) -> Result<FilterPlan, PlannerError> {
        match expr {
            Expr::Nested(inner) => self.filter(inner),
            Expr::BinaryOp {
                left,
                op: BinaryOperator::Eq,
                right,
            } => {
                if let Some(column_name) = column_name(left) {
                    return Ok(FilterPlan {
                        column_name,
                        value: literal(right)?,
                    });
                }
                if let Some(column_name) = column_name(right) {
                    return Ok(FilterPlan {
                        column_name,
                        value: literal(left)?,
                    });
                }
                Err(PlannerError::InvalidQuery(format!(
                    "expected `column = value`, found {expr}"
                )))
            }
            _ => Err(PlannerError::UnsupportedExpression(format!(
                "only `column = value` filters are supported, found {expr}"
            ))),
        }
    }
}

impl Default for SqlParser {
    fn default() -> Self {
        Self::new()
    }
}

fn is_count_star(expr: &Expr) -> bool {
    let Expr::Function(function) = expr else {
        return false;
    };
    if !function.name.to_string().eq_ignore_ascii_case("count") {
        return false;
    }
    match &function.args {
        FunctionArguments::List(list) => matches!(
            list.args.as_slice(),
            [FunctionArg::Unnamed(FunctionArgExpr::Wildcard)]
        ),
        _ => false,
    }
}

fn column_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Identifier(ident) => Some(ident.value.clone()),
        Expr::CompoundIdentifier(parts) => parts.last().map(|ident| ident.value.clone()),
        Expr::Nested(inner) => column_name(inner),
        _ => None,
    }
}

fn literal(expr: &Expr) -> Result<Value, PlannerError> {
    match expr {
        Expr::Value(value) => match value {
            SqlValue::Null => Ok(Value::Null),
            SqlValue::Number(text, _) => Ok(parse_number(text)?),
            SqlValue::SingleQuotedString(text) | SqlValue::DoubleQuotedString(text) => {
                Ok(Value::Text(text.clone()))
            }
            SqlValue::Boolean(b) => Ok(Value::Integer(i64::from(*b))),
            other => Err(PlannerError::UnsupportedExpression(other.to_string())),
        },
        Expr::UnaryOp {
            op: UnaryOperator::Minus,
            expr: inner,
        } => match literal(inner)? {
            Value::Integer(i) => Ok(Value::Integer(-i)),
            Value::Real(r) => Ok(Value::Real(-r)),
            other => Err(PlannerError::UnsupportedExpression(format!("-{other}"))),
        },
        Expr::UnaryOp {
            op: UnaryOperator::Plus,
            expr: inner,
        } => literal(inner),
        Expr::Nested(inner) => literal(inner),
        // SQLite reads a double-quoted name that is not a column as a string.
        Expr::Identifier(ident) if ident.quote_style == Some('"') => {
            Ok(Value::Text(ident.value.clone()))
        }
        _ => Err(PlannerError::UnsupportedExpression(expr.to_string())),
    }
}

fn parse_number(text: &str) -> Result<Value, PlannerError> {
    if let Ok(i) = text.parse::<i64>() {
        return Ok(Value::Integer(i));
    }
    text.parse::<f64>()
        .map(Value::Real)
        .map_err(|_| PlannerError::InvalidQuery(format!("invalid number literal {text}")))
}
