use std::sync::Arc;

use tracing::debug;

use osprey_catalog::{ColumnDict, DictionaryManager, PlannerMetaLock};
use osprey_common::config::GlobalConfig;
use osprey_common::session::SessionVariables;
use osprey_common::{OspreyError, OspreyResult};

use crate::column_ref::ColumnRefFactory;
use crate::derive::{
    build_source_scan, build_values_plan, cast_literals_to_target_types,
    cast_output_to_declared_types, fill_default_values, fill_generated_columns,
    fill_shadow_columns, fill_static_partition_columns, DerivedStage,
};
use crate::optimizer::Optimizer;
use crate::plan::{ExecPlan, RowLayout, SlotDescriptor};
use crate::properties::required_properties;
use crate::resolver::resolve_output_schema;
use crate::retry::OptimisticRetryController;
use crate::sink::{
    apply_connector_sink_spill, assemble_sink, can_table_sink_use_pipeline, sink_pipeline_dop,
};
use crate::stmt::{InsertStatement, QueryRelation};

/// Builds the executable plan for one INSERT statement.
///
/// Construction is synchronous and single-threaded; catalog views inside
/// the statement are valid for one planning attempt. With
/// [`with_optimistic_lock`](Self::with_optimistic_lock) the expensive
/// optimization phase runs with the metadata lock released and the result
/// is validated against a version ticket (see the retry controller).
pub struct InsertPlanner<'a> {
    config: &'a GlobalConfig,
    dicts: &'a DictionaryManager,
    meta_lock: Option<&'a PlannerMetaLock>,
}

impl<'a> InsertPlanner<'a> {
    pub fn new(config: &'a GlobalConfig, dicts: &'a DictionaryManager) -> Self {
        Self {
            config,
            dicts,
            meta_lock: None,
        }
    }

    pub fn with_optimistic_lock(
        config: &'a GlobalConfig,
        dicts: &'a DictionaryManager,
        meta_lock: &'a PlannerMetaLock,
    ) -> Self {
        Self {
            config,
            dicts,
            meta_lock: Some(meta_lock),
        }
    }

    pub fn plan(
        &self,
        stmt: &InsertStatement,
        session: &SessionVariables,
        optimizer: &dyn Optimizer,
    ) -> OspreyResult<ExecPlan> {
        let schema = resolve_output_schema(stmt)?;
        debug!(
            table = stmt.target_table.name(),
            base_columns = schema.base.len(),
            full_columns = schema.full.len(),
            "resolved output schema"
        );

        let mut factory = ColumnRefFactory::new();

        // 1. Literal cast (values sources), then transform the relation.
        let (source_plan, source_output) = match &stmt.source {
            QueryRelation::Values(_) => {
                let (fields, rows) = cast_literals_to_target_types(stmt, &schema)?;
                build_values_plan(&fields, rows, &mut factory)
            }
            QueryRelation::Select(select) => build_source_scan(select, &mut factory),
        };

        // 2-6. Column derivation pipeline.
        let stage = fill_default_values(source_plan, &source_output, &mut factory, stmt, &schema)?;
        let stage = if stmt.is_static_key_partition_insert() {
            fill_static_partition_columns(stage, &mut factory, stmt)?
        } else {
            stage
        };
        let stage = fill_generated_columns(stage, &mut factory, &schema)?;
        let stage = fill_shadow_columns(stage, &mut factory, stmt, &schema)?;
        let DerivedStage {
            plan: logical_plan,
            output_columns,
        } = cast_output_to_declared_types(stage, &mut factory, &schema)?;

        if output_columns.len() != schema.full.len() {
            return Err(OspreyError::Internal(format!(
                "derivation pipeline produced {} output columns for {} schema columns",
                output_columns.len(),
                schema.full.len()
            )));
        }

        // The session object stays untouched: all planning-time toggles
        // land on this clone.
        let mut session = session.clone();
        let can_use_pipeline =
            session.enable_pipeline_engine && can_table_sink_use_pipeline(&stmt.target_table);
        if session.enable_pipeline_engine && !can_use_pipeline {
            session.enable_pipeline_engine = false;
        }
        // Table sinks assign scan ranges per driver sequence, which local
        // shuffle agg cannot use.
        session.enable_local_shuffle_agg = false;

        let decision =
            required_properties(stmt, &schema, &output_columns, &session, self.config)?;
        debug!(
            shuffle_active = decision.shuffle_active,
            force_replicated_storage = decision.force_replicated_storage,
            "computed required sink properties"
        );

        let root = match self.meta_lock {
            Some(lock) => {
                let controller =
                    OptimisticRetryController::new(lock, self.config.max_plan_retry_count);
                controller.run(
                    || Ok(stmt.referenced_tables()),
                    || {
                        optimizer.optimize(
                            logical_plan.clone(),
                            &decision.requirement,
                            &output_columns,
                        )
                    },
                )?
            }
            None => optimizer.optimize(logical_plan, &decision.requirement, &output_columns)?,
        };

        // Row layout: one materialized slot per full-schema column, plus
        // dictionary bindings for dictionary-encoded string columns.
        let table_id = stmt.target_table.id();
        let mut slots = Vec::with_capacity(schema.full.len());
        let mut global_dicts: Vec<(usize, Arc<ColumnDict>)> = Vec::new();
        for (slot, column) in schema.full.iter().enumerate() {
            slots.push(SlotDescriptor {
                slot,
                column_name: column.name.clone(),
                data_type: column.data_type.clone(),
                nullable: column.allow_null,
                materialized: true,
            });
            if column.data_type.is_string() && self.dicts.has_global_dict(table_id, column.id) {
                if let Some(dict) = self.dicts.get_global_dict(table_id, column.id) {
                    global_dicts.push((slot, dict));
                }
            }
        }

        let sink = assemble_sink(stmt, &decision, &mut session)?;
        apply_connector_sink_spill(&sink, &mut session);
        let pipeline_dop = (can_use_pipeline && sink.supports_pipeline())
            .then(|| sink_pipeline_dop(decision.shuffle_active, &session));

        Ok(ExecPlan {
            root,
            output_columns,
            row_layout: RowLayout { slots },
            sink,
            global_dicts,
            pipeline_dop,
            session_variables: session,
        })
    }
}
