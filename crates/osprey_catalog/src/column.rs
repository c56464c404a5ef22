use serde::{Deserialize, Serialize};

use osprey_common::datum::Datum;
use osprey_common::types::{ColumnId, DataType};

/// Name prefix of schema-change shadow columns. A shadow column is a
/// transient copy of an origin column created while an ALTER is in flight;
/// the origin's un-prefixed name identifies it.
pub const SHADOW_COLUMN_PREFIX: &str = "__osprey_shadow_";

/// Name prefix of synchronized-materialized-view maintenance columns.
pub const MV_COLUMN_PREFIX: &str = "__osprey_mv_";

/// An analyzed, typed expression stored in the catalog: the defining
/// expression of a generated or materialized-view column, or an
/// expression-backed column default. Column references are by sibling
/// column name; the planner resolves them against its own output columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnExpr {
    /// Reference to a sibling column by (lowercase) name.
    ColumnRef(String),
    Literal(Datum),
    /// Builtin function call with an analyzer-resolved return type.
    Call {
        name: String,
        args: Vec<ColumnExpr>,
        return_type: DataType,
    },
}

impl ColumnExpr {
    /// Collect the (lowercase) names of all sibling columns this
    /// expression reads, in first-occurrence order.
    pub fn referenced_columns(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_refs(&mut out);
        out
    }

    fn collect_refs(&self, out: &mut Vec<String>) {
        match self {
            ColumnExpr::ColumnRef(name) => {
                if !out.iter().any(|n| n == name) {
                    out.push(name.clone());
                }
            }
            ColumnExpr::Literal(_) => {}
            ColumnExpr::Call { args, .. } => {
                for arg in args {
                    arg.collect_refs(out);
                }
            }
        }
    }

    /// Render for error messages.
    pub fn display_text(&self) -> String {
        match self {
            ColumnExpr::ColumnRef(name) => name.clone(),
            ColumnExpr::Literal(d) => d.to_string(),
            ColumnExpr::Call { name, args, .. } => {
                let inner: Vec<String> = args.iter().map(|a| a.display_text()).collect();
                format!("{}({})", name, inner.join(", "))
            }
        }
    }
}

/// Default-value kind of a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum ColumnDefault {
    /// No declared default; an omitted value becomes NULL.
    #[default]
    Null,
    /// Constant default.
    Const(Datum),
    /// Expression-backed default (e.g. `now()`).
    Expr(ColumnExpr),
}

/// Column definition as seen by the planner. A read-only view over catalog
/// state, valid for one planning attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub id: ColumnId,
    /// Lowercase column name. Shadow and MV maintenance columns carry
    /// their reserved prefix here.
    pub name: String,
    pub data_type: DataType,
    pub is_key: bool,
    pub is_auto_increment: bool,
    pub allow_null: bool,
    pub default: ColumnDefault,
    /// Defining expression of a generated column. Presence makes the
    /// column generated.
    pub generated_expr: Option<ColumnExpr>,
    /// Defining expression of an MV maintenance column, when the owning
    /// materialized view recorded one.
    pub define_expr: Option<ColumnExpr>,
}

impl Column {
    /// A plain nullable non-key column. Tests and catalog builders flip
    /// the flags they need.
    pub fn new(id: u32, name: &str, data_type: DataType) -> Self {
        Self {
            id: ColumnId(id),
            name: name.to_lowercase(),
            data_type,
            is_key: false,
            is_auto_increment: false,
            allow_null: true,
            default: ColumnDefault::Null,
            generated_expr: None,
            define_expr: None,
        }
    }

    pub fn is_generated(&self) -> bool {
        self.generated_expr.is_some()
    }

    pub fn is_shadow(&self) -> bool {
        self.name.starts_with(SHADOW_COLUMN_PREFIX)
    }

    pub fn is_mv_column(&self) -> bool {
        self.name.starts_with(MV_COLUMN_PREFIX)
    }

    /// Origin column name of a shadow column (the name without the shadow
    /// prefix), or None for regular columns.
    pub fn shadow_origin_name(&self) -> Option<&str> {
        self.name.strip_prefix(SHADOW_COLUMN_PREFIX)
    }

    /// Whether this column carries any declared default (constant or
    /// expression). NULL-default columns return false: they are filled
    /// with a typed null, not a default value.
    pub fn has_declared_default(&self) -> bool {
        !matches!(self.default, ColumnDefault::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shadow_prefix_detection() {
        let c = Column::new(1, "__osprey_shadow_price", DataType::Int64);
        assert!(c.is_shadow());
        assert_eq!(c.shadow_origin_name(), Some("price"));

        let plain = Column::new(2, "price", DataType::Int32);
        assert!(!plain.is_shadow());
        assert_eq!(plain.shadow_origin_name(), None);
    }

    #[test]
    fn test_referenced_columns_dedup_in_order() {
        let expr = ColumnExpr::Call {
            name: "concat".into(),
            args: vec![
                ColumnExpr::ColumnRef("a".into()),
                ColumnExpr::ColumnRef("b".into()),
                ColumnExpr::ColumnRef("a".into()),
            ],
            return_type: DataType::Varchar,
        };
        assert_eq!(expr.referenced_columns(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_generated_flag_from_expr() {
        let mut c = Column::new(3, "g", DataType::Int64);
        assert!(!c.is_generated());
        c.generated_expr = Some(ColumnExpr::ColumnRef("a".into()));
        assert!(c.is_generated());
    }
}
