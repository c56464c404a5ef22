//! The column derivation pipeline: six projection-building stages run in a
//! fixed order, each consuming and extending an ordered output-column list
//! and layering a new logical projection over the previous stage.
//!
//! Stages operate positionally over the resolved base/full schema. A
//! column whose full-schema index is beyond the current output-column
//! length has not been resolved yet and is synthesized fresh; it is never
//! looked up.

use std::collections::{HashMap, HashSet};

use osprey_catalog::{Column, ColumnDefault, TargetTable};
use osprey_common::error::PlanError;
use osprey_common::types::DataType;
use osprey_common::{OspreyError, OspreyResult};

use crate::column_ref::{ColumnRefFactory, ColumnRefId};
use crate::plan::LogicalPlan;
use crate::resolver::ResolvedSchema;
use crate::scalar::{
    fold_constants, is_valid_default_function, translate_default, translate_with_scope, ScalarExpr,
};
use crate::stmt::{Field, InsertStatement, QueryRelation, SelectRelation, ValueCell};

/// Output of one pipeline stage: the new logical root plus the
/// output-column list as of that stage.
#[derive(Debug, Clone)]
pub struct DerivedStage {
    pub plan: LogicalPlan,
    pub output_columns: Vec<ColumnRefId>,
}

/// Whether the base-schema column at `column_idx` is excluded from the
/// source relation because a static partition clause fills it.
/// Lake tables name their partition source columns; file-sink tables put
/// partition columns last in the schema.
pub(crate) fn is_partition_prefilled(stmt: &InsertStatement, column_idx: usize) -> bool {
    if !stmt.is_static_key_partition_insert() {
        return false;
    }
    match &stmt.target_table {
        TargetTable::Lake(table) => table.partition_fields.iter().any(|f| {
            table.schema.iter().position(|c| c.name == f.column) == Some(column_idx)
        }),
        TargetTable::FileSink(table) => {
            column_idx >= table.schema.len().saturating_sub(table.partition_columns.len())
        }
        _ => false,
    }
}

/// Synthesize the value of an untargeted column from its declared default.
fn default_value_expr(column: &Column) -> OspreyResult<ScalarExpr> {
    match &column.default {
        ColumnDefault::Null => Ok(ScalarExpr::typed_null(column.data_type.clone())),
        ColumnDefault::Const(value) => Ok(ScalarExpr::constant(value.clone())),
        ColumnDefault::Expr(expr) => {
            if is_valid_default_function(expr) {
                translate_default(&column.name, expr)
            } else {
                Err(PlanError::UnsupportedDefault {
                    column: column.name.clone(),
                    expr: expr.display_text(),
                }
                .into())
            }
        }
    }
}

// ── Stage 1: literal cast (values-only sources) ──────────────────────────────

/// Rewrite the VALUES rows of the statement: substitute `DEFAULT`
/// keywords, reject NULL literals against auto-increment columns, and cast
/// every cell to its target column type. Returns the rewritten fields and
/// rows; the statement itself is not mutated.
pub fn cast_literals_to_target_types(
    stmt: &InsertStatement,
    schema: &ResolvedSchema,
) -> OspreyResult<(Vec<Field>, Vec<Vec<ScalarExpr>>)> {
    let values = match &stmt.source {
        QueryRelation::Values(v) => v,
        _ => {
            return Err(OspreyError::Internal(
                "literal cast stage requires a VALUES source".into(),
            ))
        }
    };

    let mut fields = values.fields.clone();
    let mut rows: Vec<Vec<ScalarExpr>> = values
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|cell| match cell {
                    ValueCell::Literal(d) => ScalarExpr::constant(d.clone()),
                    ValueCell::DefaultKeyword => ScalarExpr::typed_null(DataType::Null),
                })
                .collect()
        })
        .collect();

    for (column_idx, target_column) in schema.base.iter().enumerate() {
        if is_partition_prefilled(stmt, column_idx) {
            continue;
        }
        if target_column.is_generated() {
            continue;
        }
        let cell_idx = match &stmt.target_column_names {
            None => column_idx,
            Some(_) => match stmt.target_index_of(&target_column.name) {
                Some(idx) => idx,
                None => continue,
            },
        };

        for (row, source_row) in rows.iter_mut().zip(&values.rows) {
            match &source_row[cell_idx] {
                ValueCell::Literal(d) if target_column.is_auto_increment && d.is_null() => {
                    return Err(PlanError::NullInAutoIncrement {
                        column: target_column.name.clone(),
                    }
                    .into());
                }
                ValueCell::DefaultKeyword => {
                    row[cell_idx] = if target_column.is_auto_increment {
                        // The sink allocates the value; a typed null marks
                        // the cell.
                        ScalarExpr::typed_null(DataType::Null)
                    } else {
                        default_value_expr(target_column)?
                    };
                }
                ValueCell::Literal(_) => {}
            }
            row[cell_idx] = fold_constants(ScalarExpr::cast(
                target_column.data_type.clone(),
                row[cell_idx].clone(),
            ));
        }
        fields[cell_idx].data_type = target_column.data_type.clone();
    }

    Ok((fields, rows))
}

// ── Relation transform ───────────────────────────────────────────────────────

/// Build the leaf logical plan for a rewritten VALUES relation.
pub fn build_values_plan(
    fields: &[Field],
    rows: Vec<Vec<ScalarExpr>>,
    factory: &mut ColumnRefFactory,
) -> (LogicalPlan, Vec<ColumnRefId>) {
    let output: Vec<ColumnRefId> = fields
        .iter()
        .map(|f| factory.create(&f.name, f.data_type.clone(), true))
        .collect();
    (
        LogicalPlan::Values {
            output: output.clone(),
            rows,
        },
        output,
    )
}

/// Build the leaf logical plan for an analyzed select relation.
pub fn build_source_scan(
    select: &SelectRelation,
    factory: &mut ColumnRefFactory,
) -> (LogicalPlan, Vec<ColumnRefId>) {
    let output: Vec<ColumnRefId> = select
        .fields
        .iter()
        .map(|f| factory.create(&f.name, f.data_type.clone(), true))
        .collect();
    (LogicalPlan::SourceScan { output: output.clone() }, output)
}

// ── Stage 2: default fill ────────────────────────────────────────────────────

/// For every base-schema column not explicitly targeted, synthesize its
/// value (typed null, constant default, or translated default expression).
/// Targeted columns pass their source column through unchanged. Builds the
/// initial output-column list.
pub fn fill_default_values(
    source_plan: LogicalPlan,
    source_output: &[ColumnRefId],
    factory: &mut ColumnRefFactory,
    stmt: &InsertStatement,
    schema: &ResolvedSchema,
) -> OspreyResult<DerivedStage> {
    let mut mappings = Vec::new();
    let mut output_columns = Vec::new();

    for (column_idx, target_column) in schema.base.iter().enumerate() {
        if is_partition_prefilled(stmt, column_idx) {
            continue;
        }
        if target_column.is_generated() {
            continue;
        }
        let source_idx = match &stmt.target_column_names {
            None => Some(column_idx),
            Some(_) => stmt.target_index_of(&target_column.name),
        };
        match source_idx {
            Some(idx) => {
                let source = *source_output.get(idx).ok_or_else(|| {
                    OspreyError::Internal(format!(
                        "source relation has no column at position {} for {}",
                        idx, target_column.name
                    ))
                })?;
                output_columns.push(source);
                mappings.push((source, ScalarExpr::ColumnRef(source)));
            }
            None => {
                let expr = if target_column.is_auto_increment
                    || !target_column.has_declared_default()
                {
                    ScalarExpr::typed_null(target_column.data_type.clone())
                } else {
                    default_value_expr(target_column)?
                };
                let data_type = expr.data_type(factory);
                let nullable = expr.nullable(factory);
                let column = factory.create(&target_column.name, data_type, nullable);
                output_columns.push(column);
                mappings.push((column, expr));
            }
        }
    }

    Ok(DerivedStage {
        plan: source_plan.project(mappings),
        output_columns,
    })
}

// ── Stage 3: static partition constant fill ──────────────────────────────────

/// Inject the literal values of the statement's static partition clause
/// for every declared partition column, extending the current projection.
pub fn fill_static_partition_columns(
    stage: DerivedStage,
    factory: &mut ColumnRefFactory,
    stmt: &InsertStatement,
) -> OspreyResult<DerivedStage> {
    let clause = stmt.static_partition.as_ref().ok_or_else(|| {
        OspreyError::Internal("static partition fill without a partition clause".into())
    })?;
    let partition_names = stmt.target_table.partition_column_names();

    // Extend the prior stage's projection in place of layering an extra
    // passthrough node.
    let (input, mut mappings) = match stage.plan {
        LogicalPlan::Project { input, mappings } => (*input, mappings),
        other => {
            let identity = stage
                .output_columns
                .iter()
                .map(|c| (*c, ScalarExpr::ColumnRef(*c)))
                .collect();
            (other, identity)
        }
    };
    let mut output_columns = stage.output_columns;

    for column in stmt.target_table.full_schema() {
        if !partition_names.contains(&column.name.as_str()) {
            continue;
        }
        let index = clause
            .column_names
            .iter()
            .position(|n| n == &column.name)
            .ok_or_else(|| {
                OspreyError::Internal(format!(
                    "partition column {} missing from static partition clause",
                    column.name
                ))
            })?;
        let value = clause.values[index].clone();
        let data_type = if value.is_null() {
            DataType::Null
        } else {
            column.data_type.clone()
        };
        let nullable = value.is_null();
        let column_ref = factory.create(&column.name, data_type.clone(), nullable);
        output_columns.push(column_ref);
        mappings.push((column_ref, ScalarExpr::Constant { value, data_type }));
    }

    Ok(DerivedStage {
        plan: LogicalPlan::Project {
            input: Box::new(input),
            mappings,
        },
        output_columns,
    })
}

// ── Stage 4: generated column fill ───────────────────────────────────────────

/// Re-resolve every generated column's defining expression against the
/// already-resolved output columns (matched by name) and append it as a
/// new output column. Base-schema columns pass through unchanged.
pub fn fill_generated_columns(
    stage: DerivedStage,
    factory: &mut ColumnRefFactory,
    schema: &ResolvedSchema,
) -> OspreyResult<DerivedStage> {
    let base_names: HashSet<&str> = schema.base.iter().map(|c| c.name.as_str()).collect();
    let mut mappings = Vec::new();
    let mut output_columns = stage.output_columns;

    for (column_idx, target_column) in schema.full.iter().enumerate() {
        if let Some(defining) = &target_column.generated_expr {
            let scope = resolve_scope(defining.referenced_columns(), schema, &output_columns)?;
            let scalar = translate_with_scope(defining, &scope)?;
            let data_type = scalar.data_type(factory);
            let nullable = scalar.nullable(factory);
            let column_ref = factory.create(&target_column.name, data_type, nullable);
            output_columns.push(column_ref);
            mappings.push((column_ref, scalar));
        } else if base_names.contains(target_column.name.as_str()) {
            let column_ref = *output_columns.get(column_idx).ok_or_else(|| {
                OspreyError::Internal(format!(
                    "base column {} unresolved before generated-column fill",
                    target_column.name
                ))
            })?;
            mappings.push((column_ref, ScalarExpr::ColumnRef(column_ref)));
        }
    }

    Ok(DerivedStage {
        plan: stage.plan.project(mappings),
        output_columns,
    })
}

/// Name → handle index over the already-resolved prefix of the output
/// column list. Rebuilt fresh per stage; never stored in a `Column`.
fn resolve_scope(
    names: Vec<String>,
    schema: &ResolvedSchema,
    output_columns: &[ColumnRefId],
) -> OspreyResult<HashMap<String, ColumnRefId>> {
    let mut scope = HashMap::new();
    for name in names {
        let position = schema
            .full
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| osprey_common::error::CatalogError::UnknownColumn(name.clone()))?;
        let handle = *output_columns.get(position).ok_or_else(|| {
            OspreyError::Internal(format!("column {} referenced before resolution", name))
        })?;
        scope.insert(name, handle);
    }
    Ok(scope)
}

// ── Stage 5: shadow column fill ──────────────────────────────────────────────

/// Resolve schema-change shadow columns (cast from the origin column), MV
/// maintenance columns (translated defining expression), and newly added
/// schema-change columns (default rules, expression defaults rejected).
pub fn fill_shadow_columns(
    stage: DerivedStage,
    factory: &mut ColumnRefFactory,
    stmt: &InsertStatement,
    schema: &ResolvedSchema,
) -> OspreyResult<DerivedStage> {
    let base_names: HashSet<&str> = schema.base.iter().map(|c| c.name.as_str()).collect();
    let mut mappings = Vec::new();
    let mut output_columns = stage.output_columns;

    for (column_idx, target_column) in schema.full.iter().enumerate() {
        if target_column.is_shadow() && !target_column.is_generated() {
            let origin_name = match target_column.shadow_origin_name() {
                Some(name) => name,
                None => continue,
            };
            let origin_pos = schema
                .full
                .iter()
                .position(|c| c.name == origin_name)
                .ok_or_else(|| {
                    OspreyError::Internal(format!(
                        "origin column {} of shadow column {} not in output schema",
                        origin_name, target_column.name
                    ))
                })?;
            let origin = *output_columns.get(origin_pos).ok_or_else(|| {
                OspreyError::Internal(format!(
                    "origin column {} unresolved before shadow fill",
                    origin_name
                ))
            })?;
            let column_ref = factory.create(
                &target_column.name,
                target_column.data_type.clone(),
                target_column.allow_null,
            );
            output_columns.push(column_ref);
            mappings.push((
                column_ref,
                ScalarExpr::cast(
                    target_column.data_type.clone(),
                    ScalarExpr::ColumnRef(origin),
                ),
            ));
            continue;
        }

        if target_column.is_mv_column() && !base_names.contains(target_column.name.as_str()) {
            let defining = match &target_column.define_expr {
                Some(expr) => expr,
                None => {
                    let index = match &stmt.target_table {
                        TargetTable::Internal(table) => table
                            .index_containing_column(&target_column.name)
                            .map(|ix| ix.name.clone())
                            .unwrap_or_default(),
                        _ => String::new(),
                    };
                    return Err(PlanError::MissingShadowDefinition {
                        column: target_column.name.clone(),
                        index,
                        table: stmt.target_table.name().to_string(),
                    }
                    .into());
                }
            };
            let scope = resolve_scope(defining.referenced_columns(), schema, &output_columns)?;
            let scalar = translate_with_scope(defining, &scope)?;
            let data_type = scalar.data_type(factory);
            let nullable = scalar.nullable(factory);
            let column_ref = factory.create(&target_column.name, data_type, nullable);
            output_columns.push(column_ref);
            mappings.push((column_ref, scalar));
            continue;
        }

        if column_idx >= output_columns.len() {
            // Newly added schema-change column with no prior resolution.
            let column_ref = factory.create(
                &target_column.name,
                target_column.data_type.clone(),
                target_column.allow_null,
            );
            let expr = match &target_column.default {
                ColumnDefault::Null => {
                    ScalarExpr::typed_null(target_column.data_type.clone())
                }
                ColumnDefault::Const(value) => ScalarExpr::constant(value.clone()),
                ColumnDefault::Expr(expr) => {
                    return Err(PlanError::UnsupportedDefault {
                        column: target_column.name.clone(),
                        expr: expr.display_text(),
                    }
                    .into());
                }
            };
            output_columns.push(column_ref);
            mappings.push((column_ref, expr));
        } else {
            let column_ref = output_columns[column_idx];
            mappings.push((column_ref, ScalarExpr::ColumnRef(column_ref)));
        }
    }

    Ok(DerivedStage {
        plan: stage.plan.project(mappings),
        output_columns,
    })
}

// ── Stage 6: output type coercion ────────────────────────────────────────────

/// Wrap every output column whose type does not exactly match its declared
/// column type in an explicit cast, folding constants. Already-matching
/// columns pass through, so running this stage twice is a no-op.
pub fn cast_output_to_declared_types(
    stage: DerivedStage,
    factory: &mut ColumnRefFactory,
    schema: &ResolvedSchema,
) -> OspreyResult<DerivedStage> {
    let mut output_columns = stage.output_columns;
    if output_columns.len() != schema.full.len() {
        return Err(OspreyError::Internal(format!(
            "output columns ({}) must match full schema ({}) before coercion",
            output_columns.len(),
            schema.full.len()
        )));
    }

    let mut mappings = Vec::new();
    for (column_idx, target_column) in schema.full.iter().enumerate() {
        let current = output_columns[column_idx];
        if factory.data_type(current).matches(&target_column.data_type) {
            mappings.push((current, ScalarExpr::ColumnRef(current)));
        } else {
            let replacement = factory.create(
                &target_column.name,
                target_column.data_type.clone(),
                target_column.allow_null,
            );
            let cast = fold_constants(ScalarExpr::cast(
                target_column.data_type.clone(),
                ScalarExpr::ColumnRef(current),
            ));
            mappings.push((replacement, cast));
            output_columns[column_idx] = replacement;
        }
    }

    Ok(DerivedStage {
        plan: stage.plan.project(mappings),
        output_columns,
    })
}
