use crate::graph::TaskDag;
use crate::task::Task;
use std::collections::HashMap;

pub struct BackwardPass<'a> {
    tasks: &'a [Task],
    dag: &'a TaskDag,
}

impl<'a> BackwardPass<'a> {
    pub fn new(tasks: &'a [Task], dag: &'a TaskDag) -> Self {
        Self { tasks, dag }
    }

    /// Latest `(start, finish)` per task position that still lets the project
    /// end at `project_end`. `None` when the graph has a cycle.
    pub fn execute(&self, project_end: i64) -> Option<HashMap<usize, (i64, i64)>> {
        // Reverse topological order
        let mut order = self.dag.topological_order()?;
        order.reverse();

        let mut results: HashMap<usize, (i64, i64)> = HashMap::with_capacity(order.len());
        for node_ix in order {
            let position = self.dag.position(node_ix);
            // Sinks finish at the project end
            let lf = self
                .dag
                .successors(node_ix)
                .filter_map(|succ| results.get(&self.dag.position(succ)))
                .map(|&(ls, _)| ls)
                .min()
                .unwrap_or(project_end);
            let ls = lf.saturating_sub(self.tasks[position].duration_minutes);
            results.insert(position, (ls, lf));
        }
        Some(results)
    }
}
