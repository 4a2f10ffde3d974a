//! # Stream Processor
//!
//! Drives each change record of a batch through the dispatch pipeline:
//!
//! ```text
//! decode keys + images
//!   → legacy postprocessor (first matching prefix rule, at most one)
//!   → item-add handlers          (Created)
//!   → attribute-change handlers  (Created, Modified)
//!   → item-delete handlers       (Removed)
//! ```
//!
//! Records are handled sequentially in batch order. Every handler call goes
//! through [`StreamProcessor::invoke_isolated`], so a failing handler is logged
//! and recorded in the [`BatchSummary`] but never stops its siblings or later
//! records. Decode failures are not isolated: they abort the batch, leaving
//! earlier records already dispatched.

use crate::config::ProcessorConfig;
use crate::differ::changed_attributes;
use crate::error::Result;
use crate::events::{StreamBatch, StreamRecord};
use crate::logging::{log_batch_summary, log_handler_error, log_record_operation};
use crate::models::{ChangeRecord, EventKind, KeyPath};
use crate::orchestration::types::{
    BatchSummary, DispatchPhase, DispatchPlan, HandlerFailure, RecordOutcome,
};
use crate::postprocessor::{Postprocessor, PostprocessorRouter};
use crate::registry::DispatchTable;
use crate::state_machine::{RecordEvent, RecordStateMachine};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{error, info, info_span};

/// Dispatches decoded change records to the registered handlers
#[derive(Debug, Clone)]
pub struct StreamProcessor {
    dispatch_table: Arc<DispatchTable>,
    router: Arc<PostprocessorRouter>,
    config: ProcessorConfig,
}

/// Per-record invocation bookkeeping
struct Invocations<'a> {
    record: &'a ChangeRecord,
    count: usize,
    failures: Vec<HandlerFailure>,
}

impl StreamProcessor {
    pub fn new(dispatch_table: Arc<DispatchTable>, router: Arc<PostprocessorRouter>) -> Self {
        Self {
            dispatch_table,
            router,
            config: ProcessorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ProcessorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    pub fn dispatch_table(&self) -> &DispatchTable {
        &self.dispatch_table
    }

    pub fn router(&self) -> &PostprocessorRouter {
        &self.router
    }

    /// Process an upstream JSON payload of the form `{"Records": [...]}`.
    pub fn process_event_json(&self, payload: &str) -> Result<BatchSummary> {
        let batch = StreamBatch::from_json(payload)?;
        self.process_batch(&batch)
    }

    /// Decode and dispatch every record of a wire batch, in order.
    pub fn process_batch(&self, batch: &StreamBatch) -> Result<BatchSummary> {
        self.run_batch(batch.len(), batch.records.iter().map(StreamRecord::decode))
    }

    /// Dispatch already decoded records, in order.
    pub fn process_records(&self, records: &[ChangeRecord]) -> Result<BatchSummary> {
        self.run_batch(records.len(), records.iter().cloned().map(Ok))
    }

    fn run_batch<I>(&self, size: usize, records: I) -> Result<BatchSummary>
    where
        I: IntoIterator<Item = Result<ChangeRecord>>,
    {
        let mut summary = BatchSummary::start();
        let span = info_span!("stream_batch", batch_id = %summary.batch_id, records = size);
        let _entered = span.enter();

        for (index, record) in records.into_iter().enumerate() {
            match record.and_then(|record| self.process_record(&record)) {
                Ok(outcome) => summary.absorb(outcome),
                Err(e) => {
                    error!(
                        batch_id = %summary.batch_id,
                        record_index = index,
                        dispatched = summary.record_count,
                        error = %e,
                        "Failed to decode change record, aborting batch"
                    );
                    return Err(e);
                }
            }
        }

        let summary = summary.finish();
        log_batch_summary(&summary);
        Ok(summary)
    }

    /// Dispatch a single decoded record through every pipeline step.
    pub fn process_record(&self, record: &ChangeRecord) -> Result<RecordOutcome> {
        let mut machine = RecordStateMachine::new(record.event_kind);
        let key_path = record.key_path()?;
        machine.transition(RecordEvent::Decode)?;

        info!(
            event_kind = %record.event_kind,
            key_path = %key_path,
            event_id = record.event_id.as_deref(),
            sequence_number = record.sequence_number.as_deref(),
            changed = ?changed_attributes(&record.old_image, &record.new_image),
            "📋 RECORD_OPERATION: Dispatching change record"
        );

        let mut invocations = Invocations {
            record,
            count: 0,
            failures: Vec::new(),
        };

        let postprocessor = self.select_postprocessor(record);
        if let Some(postprocessor) = postprocessor {
            self.invoke_isolated(
                &mut invocations,
                DispatchPhase::Postprocess,
                postprocessor.name(),
                || {
                    postprocessor.run(
                        &record.partition_key,
                        &record.sort_key,
                        &record.old_image,
                        &record.new_image,
                    )
                },
            );
        }
        machine.transition(RecordEvent::Postprocess)?;

        let KeyPath {
            type_prefix,
            item_id,
            sub_prefix,
        } = &key_path;

        match record.event_kind {
            EventKind::Created => {
                for handler in self.dispatch_table.search_item_add(type_prefix, sub_prefix) {
                    self.invoke_isolated(
                        &mut invocations,
                        DispatchPhase::ItemAdd,
                        handler.name(),
                        || handler.handle(item_id, &record.new_image),
                    );
                }
                machine.transition(RecordEvent::DispatchItemAdd)?;
                self.dispatch_attribute_changes(&mut invocations, &key_path);
                machine.transition(RecordEvent::DispatchAttributeChanges)?;
            }
            EventKind::Modified => {
                self.dispatch_attribute_changes(&mut invocations, &key_path);
                machine.transition(RecordEvent::DispatchAttributeChanges)?;
            }
            EventKind::Removed => {
                for handler in self.dispatch_table.search_item_delete(type_prefix, sub_prefix) {
                    self.invoke_isolated(
                        &mut invocations,
                        DispatchPhase::ItemDelete,
                        handler.name(),
                        || handler.handle(item_id, &record.old_image),
                    );
                }
                machine.transition(RecordEvent::DispatchItemDelete)?;
            }
        }

        let final_state = machine.transition(RecordEvent::Finish)?;

        Ok(RecordOutcome {
            key_path,
            final_state,
            postprocessor: postprocessor.map(|p| p.name().to_string()),
            invocations: invocations.count,
            failures: invocations.failures,
        })
    }

    /// Handlers the record would reach, without invoking any of them.
    pub fn plan(&self, record: &ChangeRecord) -> Result<DispatchPlan> {
        let key_path = record.key_path()?;
        let (type_prefix, sub_prefix) = (&key_path.type_prefix, &key_path.sub_prefix);

        let mut plan = DispatchPlan {
            postprocessor: self
                .select_postprocessor(record)
                .map(|p| p.name().to_string()),
            ..Default::default()
        };

        match record.event_kind {
            EventKind::Created => {
                plan.item_add = self
                    .dispatch_table
                    .search_item_add(type_prefix, sub_prefix)
                    .into_iter()
                    .map(|h| h.name().to_string())
                    .collect();
            }
            EventKind::Removed => {
                plan.item_delete = self
                    .dispatch_table
                    .search_item_delete(type_prefix, sub_prefix)
                    .into_iter()
                    .map(|h| h.name().to_string())
                    .collect();
            }
            EventKind::Modified => {}
        }

        if record.event_kind.carries_new_image() {
            plan.attribute_change = self
                .dispatch_table
                .search_attribute_changes(
                    type_prefix,
                    sub_prefix,
                    &record.old_image,
                    &record.new_image,
                )
                .into_iter()
                .map(|h| h.name().to_string())
                .collect();
        }

        Ok(plan)
    }

    fn select_postprocessor(&self, record: &ChangeRecord) -> Option<&Arc<dyn Postprocessor>> {
        if !self.config.legacy_postprocessors {
            return None;
        }
        self.router.select(&record.partition_key, &record.sort_key)
    }

    fn dispatch_attribute_changes(&self, invocations: &mut Invocations<'_>, key_path: &KeyPath) {
        let record = invocations.record;
        let handlers = self.dispatch_table.search_attribute_changes(
            &key_path.type_prefix,
            &key_path.sub_prefix,
            &record.old_image,
            &record.new_image,
        );
        for handler in handlers {
            self.invoke_isolated(
                invocations,
                DispatchPhase::AttributeChange,
                handler.name(),
                || handler.handle(&key_path.item_id, &record.old_image, &record.new_image),
            );
        }
    }

    /// Invoke one handler, converting an error or a panic into a logged
    /// [`HandlerFailure`]. Nothing a handler does can fail the batch.
    fn invoke_isolated<F>(
        &self,
        invocations: &mut Invocations<'_>,
        phase: DispatchPhase,
        handler: &str,
        invoke: F,
    ) where
        F: FnOnce() -> anyhow::Result<()>,
    {
        let record = invocations.record;
        invocations.count += 1;
        log_record_operation(
            phase.operation(),
            record.event_kind.wire_name(),
            &record.partition_key,
            &record.sort_key,
            Some(handler),
            "started",
        );

        let result = panic::catch_unwind(AssertUnwindSafe(invoke)).unwrap_or_else(|payload| {
            Err(anyhow::anyhow!(
                "handler panicked: {}",
                panic_message(payload.as_ref())
            ))
        });

        if let Err(error) = result {
            log_handler_error(
                phase,
                handler,
                record.event_kind.wire_name(),
                &record.partition_key,
                &record.sort_key,
                &error,
            );
            invocations.failures.push(HandlerFailure {
                partition_key: record.partition_key.clone(),
                sort_key: record.sort_key.clone(),
                event_kind: record.event_kind,
                phase,
                handler: handler.to_string(),
                error: format!("{error:#}"),
            });
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
