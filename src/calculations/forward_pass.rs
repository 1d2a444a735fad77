use crate::graph::TaskDag;
use crate::task::Task;
use std::collections::HashMap;

/// Earliest start/finish in minutes from the project start, ignoring
/// resources and buckets.
pub struct ForwardPass<'a> {
    tasks: &'a [Task],
    dag: &'a TaskDag,
}

impl<'a> ForwardPass<'a> {
    pub fn new(tasks: &'a [Task], dag: &'a TaskDag) -> Self {
        Self { tasks, dag }
    }

    /// Returns `(earliest_start, earliest_finish)` keyed by task position, or
    /// `None` when the graph has a cycle.
    pub fn execute(&self) -> Option<HashMap<usize, (i64, i64)>> {
        let order = self.dag.topological_order()?;
        let mut results: HashMap<usize, (i64, i64)> = HashMap::with_capacity(order.len());

        for node_ix in order {
            let position = self.dag.position(node_ix);
            let es = self
                .dag
                .predecessors(node_ix)
                .filter_map(|pred| results.get(&self.dag.position(pred)))
                .map(|&(_, ef)| ef)
                .max()
                .unwrap_or(0);
            let ef = es.saturating_add(self.tasks[position].duration_minutes);
            results.insert(position, (es, ef));
        }
        Some(results)
    }
}
