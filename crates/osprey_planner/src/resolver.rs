use std::collections::HashSet;

use osprey_catalog::Column;
use osprey_common::error::PlanError;
use osprey_common::OspreyResult;

use crate::stmt::InsertStatement;

/// The ordered base/full column lists the rest of the pipeline honors.
/// Every later stage indexes these by position.
#[derive(Debug, Clone)]
pub struct ResolvedSchema {
    /// Physically stored columns the statement writes.
    pub base: Vec<Column>,
    /// `base` plus accepted generated / shadow / MV maintenance columns,
    /// preserving full-schema order.
    pub full: Vec<Column>,
}

/// How a generated column's source columns relate to the set of columns
/// resolvable at its position in the schema scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GenColumnDependency {
    /// The defining expression reads no columns.
    NoDependency,
    AllDependOnTarget,
    NoneDependOnTarget,
    PartialDependOnTarget,
}

pub(crate) fn dependency_class(
    column: &Column,
    legal: &HashSet<String>,
) -> GenColumnDependency {
    let refs = match &column.generated_expr {
        Some(expr) => expr.referenced_columns(),
        None => Vec::new(),
    };
    if refs.is_empty() {
        return GenColumnDependency::NoDependency;
    }
    let mut all_depend = true;
    let mut none_depend = true;
    for name in &refs {
        if legal.contains(name) {
            none_depend = false;
        } else {
            all_depend = false;
        }
    }
    if all_depend {
        GenColumnDependency::AllDependOnTarget
    } else if none_depend {
        GenColumnDependency::NoneDependOnTarget
    } else {
        GenColumnDependency::PartialDependOnTarget
    }
}

/// Derive the output base/full schema for the statement.
///
/// Full-row mode passes the table's own schemas through. Partial-update
/// mode scans the full schema in order and keeps only the columns the
/// statement can satisfy: targeted and key columns, columns the pipeline
/// can fill (auto-increment, declared defaults), generated columns whose
/// sources are all resolvable, and shadow columns of targeted origins.
pub fn resolve_output_schema(stmt: &InsertStatement) -> OspreyResult<ResolvedSchema> {
    let table = &stmt.target_table;
    if !stmt.partial_update {
        return Ok(ResolvedSchema {
            base: table.base_schema().to_vec(),
            full: table.full_schema().to_vec(),
        });
    }

    let base_names: HashSet<&str> = table.base_schema().iter().map(|c| c.name.as_str()).collect();

    let mut base = Vec::new();
    let mut full = Vec::new();
    // Grows monotonically as columns are accepted; generated columns are
    // classified against the set as of their position in the scan.
    let mut legal: HashSet<String> = HashSet::new();

    for column in table.full_schema() {
        if stmt.targets_column(&column.name) || column.is_key {
            if base_names.contains(column.name.as_str()) {
                base.push(column.clone());
            }
            full.push(column.clone());
            legal.insert(column.name.clone());
            continue;
        }
        if column.is_auto_increment || column.has_declared_default() {
            if base_names.contains(column.name.as_str()) {
                base.push(column.clone());
            }
            full.push(column.clone());
            legal.insert(column.name.clone());
            continue;
        }
        if column.is_generated() {
            match dependency_class(column, &legal) {
                // Reserved for future support; nothing to fill yet.
                GenColumnDependency::NoDependency => continue,
                GenColumnDependency::AllDependOnTarget => {
                    if base_names.contains(column.name.as_str()) {
                        base.push(column.clone());
                    }
                    full.push(column.clone());
                    legal.insert(column.name.clone());
                    continue;
                }
                // A generated column may not be partially satisfied.
                GenColumnDependency::NoneDependOnTarget
                | GenColumnDependency::PartialDependOnTarget => {
                    return Err(PlanError::SchemaDependency {
                        column: column.name.clone(),
                    }
                    .into());
                }
            }
        }
        if let Some(origin) = column.shadow_origin_name() {
            if stmt.targets_column(origin) {
                if base_names.contains(column.name.as_str()) {
                    base.push(column.clone());
                }
                full.push(column.clone());
            }
            continue;
        }
        // Untargeted, no way to fill it in a partial update: excluded.
    }

    Ok(ResolvedSchema { base, full })
}
