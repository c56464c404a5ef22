use osprey_catalog::ColumnExpr;
use osprey_common::datum::Datum;
use osprey_common::error::{CatalogError, PlanError};
use osprey_common::types::DataType;
use osprey_common::OspreyResult;
use std::collections::HashMap;

use crate::column_ref::{ColumnRefFactory, ColumnRefId};

/// Scalar expression of the plan IR. Projection stages map column-reference
/// handles to these.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarExpr {
    ColumnRef(ColumnRefId),
    /// A constant carrying its own type. A typed null is
    /// `Constant { value: Datum::Null, data_type: <column type> }`.
    Constant { value: Datum, data_type: DataType },
    Cast { target: DataType, child: Box<ScalarExpr> },
    Call {
        name: String,
        args: Vec<ScalarExpr>,
        return_type: DataType,
    },
}

impl ScalarExpr {
    pub fn typed_null(data_type: DataType) -> Self {
        ScalarExpr::Constant {
            value: Datum::Null,
            data_type,
        }
    }

    pub fn constant(value: Datum) -> Self {
        let data_type = value.data_type();
        ScalarExpr::Constant { value, data_type }
    }

    pub fn cast(target: DataType, child: ScalarExpr) -> Self {
        ScalarExpr::Cast {
            target,
            child: Box::new(child),
        }
    }

    pub fn data_type(&self, factory: &ColumnRefFactory) -> DataType {
        match self {
            ScalarExpr::ColumnRef(id) => factory.data_type(*id).clone(),
            ScalarExpr::Constant { data_type, .. } => data_type.clone(),
            ScalarExpr::Cast { target, .. } => target.clone(),
            ScalarExpr::Call { return_type, .. } => return_type.clone(),
        }
    }

    pub fn nullable(&self, factory: &ColumnRefFactory) -> bool {
        match self {
            ScalarExpr::ColumnRef(id) => factory.get(*id).nullable,
            ScalarExpr::Constant { value, .. } => value.is_null(),
            ScalarExpr::Cast { child, .. } => child.nullable(factory),
            // Builtin defaults (now, uuid) never return null, but generated
            // expressions may; stay conservative.
            ScalarExpr::Call { .. } => true,
        }
    }
}

/// Fold constant sub-expressions: a cast whose child folded to a constant
/// becomes a constant of the target type when the conversion is statically
/// known. Unfoldable casts are left for the executor.
pub fn fold_constants(expr: ScalarExpr) -> ScalarExpr {
    match expr {
        ScalarExpr::Cast { target, child } => {
            let child = fold_constants(*child);
            if let ScalarExpr::Constant { value, .. } = &child {
                if let Some(folded) = cast_datum(value, &target) {
                    return ScalarExpr::Constant {
                        value: folded,
                        data_type: target,
                    };
                }
            }
            ScalarExpr::Cast {
                target,
                child: Box::new(child),
            }
        }
        ScalarExpr::Call {
            name,
            args,
            return_type,
        } => ScalarExpr::Call {
            name,
            args: args.into_iter().map(fold_constants).collect(),
            return_type,
        },
        other => other,
    }
}

/// Statically evaluate `CAST(value AS target)` where the result is exact.
fn cast_datum(value: &Datum, target: &DataType) -> Option<Datum> {
    if value.data_type() == *target {
        return Some(value.clone());
    }
    match (value, target) {
        // Casting NULL yields a typed null.
        (Datum::Null, _) => Some(Datum::Null),
        (Datum::Int32(v), DataType::Int64) => Some(Datum::Int64(*v as i64)),
        (Datum::Int32(v), DataType::Float64) => Some(Datum::Float64(*v as f64)),
        (Datum::Int64(v), DataType::Float64) => Some(Datum::Float64(*v as f64)),
        (Datum::Boolean(b), DataType::Varchar) => {
            Some(Datum::Text(if *b { "true" } else { "false" }.into()))
        }
        (Datum::Int32(v), DataType::Varchar) => Some(Datum::Text(v.to_string())),
        (Datum::Int64(v), DataType::Varchar) => Some(Datum::Text(v.to_string())),
        (Datum::Float64(v), DataType::Varchar) => Some(Datum::Text(v.to_string())),
        (Datum::Text(s), DataType::Int32) => s.trim().parse().ok().map(Datum::Int32),
        (Datum::Text(s), DataType::Int64) => s.trim().parse().ok().map(Datum::Int64),
        (Datum::Text(s), DataType::Float64) => s.trim().parse().ok().map(Datum::Float64),
        (Datum::Text(s), DataType::Boolean) => match s.trim().to_lowercase().as_str() {
            "true" | "t" | "1" => Some(Datum::Boolean(true)),
            "false" | "f" | "0" => Some(Datum::Boolean(false)),
            _ => None,
        },
        _ => None,
    }
}

/// Default functions the planner can translate. Anything else in an
/// expression-backed default is rejected as unsupported.
pub fn is_valid_default_function(expr: &ColumnExpr) -> bool {
    match expr {
        ColumnExpr::Call { name, .. } => matches!(
            name.as_str(),
            "now" | "current_timestamp" | "current_date" | "uuid"
        ),
        _ => false,
    }
}

/// Translate an expression-backed column default. Defaults may not read
/// sibling columns, so any embedded column reference makes the default
/// unsupported.
pub fn translate_default(column_name: &str, expr: &ColumnExpr) -> OspreyResult<ScalarExpr> {
    match expr {
        ColumnExpr::Literal(value) => Ok(ScalarExpr::constant(value.clone())),
        ColumnExpr::Call {
            name,
            args,
            return_type,
        } => {
            let args = args
                .iter()
                .map(|a| translate_default(column_name, a))
                .collect::<OspreyResult<Vec<_>>>()?;
            Ok(ScalarExpr::Call {
                name: name.clone(),
                args,
                return_type: return_type.clone(),
            })
        }
        ColumnExpr::ColumnRef(_) => Err(PlanError::UnsupportedDefault {
            column: column_name.to_string(),
            expr: expr.display_text(),
        }
        .into()),
    }
}

/// Translate a catalog expression against a name → handle scope built from
/// the already-resolved output columns. Used for generated and MV
/// maintenance column definitions.
pub fn translate_with_scope(
    expr: &ColumnExpr,
    scope: &HashMap<String, ColumnRefId>,
) -> OspreyResult<ScalarExpr> {
    match expr {
        ColumnExpr::ColumnRef(name) => scope
            .get(name)
            .map(|id| ScalarExpr::ColumnRef(*id))
            .ok_or_else(|| CatalogError::UnknownColumn(name.clone()).into()),
        ColumnExpr::Literal(value) => Ok(ScalarExpr::constant(value.clone())),
        ColumnExpr::Call {
            name,
            args,
            return_type,
        } => {
            let args = args
                .iter()
                .map(|a| translate_with_scope(a, scope))
                .collect::<OspreyResult<Vec<_>>>()?;
            Ok(ScalarExpr::Call {
                name: name.clone(),
                args,
                return_type: return_type.clone(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_cast_of_null_is_typed_null() {
        let folded = fold_constants(ScalarExpr::cast(
            DataType::Int64,
            ScalarExpr::constant(Datum::Null),
        ));
        assert_eq!(
            folded,
            ScalarExpr::Constant { value: Datum::Null, data_type: DataType::Int64 }
        );
    }

    #[test]
    fn test_fold_widening_cast() {
        let folded = fold_constants(ScalarExpr::cast(
            DataType::Int64,
            ScalarExpr::constant(Datum::Int32(5)),
        ));
        assert_eq!(
            folded,
            ScalarExpr::Constant { value: Datum::Int64(5), data_type: DataType::Int64 }
        );
    }

    #[test]
    fn test_fold_string_parse() {
        let folded = fold_constants(ScalarExpr::cast(
            DataType::Int64,
            ScalarExpr::constant(Datum::Text("42".into())),
        ));
        assert_eq!(
            folded,
            ScalarExpr::Constant { value: Datum::Int64(42), data_type: DataType::Int64 }
        );
    }

    #[test]
    fn test_unfoldable_cast_is_kept() {
        let expr = ScalarExpr::cast(
            DataType::Date,
            ScalarExpr::constant(Datum::Text("2024-01-01".into())),
        );
        let folded = fold_constants(expr.clone());
        assert_eq!(folded, expr);
    }

    #[test]
    fn test_default_with_column_ref_is_unsupported() {
        let expr = ColumnExpr::Call {
            name: "lower".into(),
            args: vec![ColumnExpr::ColumnRef("a".into())],
            return_type: DataType::Varchar,
        };
        let err = translate_default("c", &expr).unwrap_err();
        assert!(err.to_string().contains("unsupported default"));
    }

    #[test]
    fn test_translate_with_scope_resolves_handles() {
        let mut scope = HashMap::new();
        scope.insert("a".to_string(), ColumnRefId(3));
        let expr = ColumnExpr::Call {
            name: "abs".into(),
            args: vec![ColumnExpr::ColumnRef("a".into())],
            return_type: DataType::Int64,
        };
        let translated = translate_with_scope(&expr, &scope).unwrap();
        match translated {
            ScalarExpr::Call { args, .. } => {
                assert_eq!(args, vec![ScalarExpr::ColumnRef(ColumnRefId(3))]);
            }
            other => panic!("expected Call, got {:?}", other),
        }
    }
}
