// Copyright The Observix Authors
// SPDX-License-Identifier: Apache-2.0

//! Assignment reconciliation.
//!
//! Each poll response is diffed against the running pipelines into three
//! sets. Removals are applied first, then mutations (stop-then-start),
//! then additions: stopping before starting keeps ports free for the
//! replacement instance.

use observix_model::PipelineId;
use observix_model::catalog::{AssignedPipeline, AssignmentView};
use std::collections::HashMap;

/// What one reconciliation tick has to do.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct Plan {
    /// Running but no longer wanted (absent, or present-but-disabled).
    pub removals: Vec<PipelineId>,
    /// Running at a different version: stop-then-start.
    pub mutations: Vec<AssignedPipeline>,
    /// Wanted, enabled, and not running.
    pub additions: Vec<AssignedPipeline>,
}

impl Plan {
    /// Whether there is nothing to apply.
    pub(crate) fn is_empty(&self) -> bool {
        self.removals.is_empty() && self.mutations.is_empty() && self.additions.is_empty()
    }
}

/// Diffs the assignment view against the currently running versions.
pub(crate) fn plan(view: &AssignmentView, running: &HashMap<PipelineId, i64>) -> Plan {
    let mut plan = Plan::default();

    for (pipeline_id, version) in running {
        match view.pipelines.iter().find(|p| &p.pipeline_id == pipeline_id) {
            None => plan.removals.push(pipeline_id.clone()),
            Some(assigned) if !assigned.enabled => plan.removals.push(pipeline_id.clone()),
            Some(assigned) if assigned.version != *version => {
                plan.mutations.push(assigned.clone());
            }
            Some(_) => {}
        }
    }

    for assigned in &view.pipelines {
        if assigned.enabled && !running.contains_key(&assigned.pipeline_id) {
            plan.additions.push(assigned.clone());
        }
    }

    plan.removals.sort();
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use observix_model::spec::{
        DestinationSpec, PipelineSpec, ProcessorSpec, SourceSpec,
    };

    fn assigned(id: &str, version: i64, enabled: bool) -> AssignedPipeline {
        AssignedPipeline {
            pipeline_id: id.to_owned(),
            version,
            enabled,
            spec: PipelineSpec {
                source: SourceSpec::SyslogUdp {
                    host: "127.0.0.1".into(),
                    port: 15514,
                },
                processor: ProcessorSpec::Raw,
                destination: DestinationSpec::Console,
                batch_max_events: 1,
                batch_max_seconds: 1.0,
                max_queue_size: 16,
            },
        }
    }

    fn view(pipelines: Vec<AssignedPipeline>) -> AssignmentView {
        AssignmentView {
            revision: "rev".into(),
            pipelines,
        }
    }

    #[test]
    fn additions_are_enabled_and_not_running() {
        let p = plan(
            &view(vec![assigned("a", 1, true), assigned("b", 1, false)]),
            &HashMap::new(),
        );
        assert_eq!(p.additions.len(), 1);
        assert_eq!(p.additions[0].pipeline_id, "a");
        assert!(p.removals.is_empty());
        assert!(p.mutations.is_empty());
    }

    #[test]
    fn removals_cover_absent_and_disabled() {
        let running = HashMap::from([("gone".to_owned(), 1), ("off".to_owned(), 1)]);
        let p = plan(&view(vec![assigned("off", 1, false)]), &running);
        assert_eq!(p.removals, vec!["gone".to_owned(), "off".to_owned()]);
        assert!(p.additions.is_empty());
    }

    #[test]
    fn version_changes_are_mutations() {
        let running = HashMap::from([("a".to_owned(), 1)]);
        let p = plan(&view(vec![assigned("a", 2, true)]), &running);
        assert!(p.removals.is_empty());
        assert!(p.additions.is_empty());
        assert_eq!(p.mutations.len(), 1);
        assert_eq!(p.mutations[0].version, 2);
    }

    #[test]
    fn matching_state_is_a_no_op() {
        let running = HashMap::from([("a".to_owned(), 1)]);
        let p = plan(&view(vec![assigned("a", 1, true)]), &running);
        assert!(p.is_empty());
    }
}
