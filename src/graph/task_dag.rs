use crate::task::{Task, TaskId};
use chrono::NaiveDateTime;
use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

/// Dependency graph over a task slice. Node weights are positions in that
/// slice, edges run from a dependency to its dependent.
pub struct TaskDag {
    pub graph: DiGraph<usize, ()>,
    pub id_to_index: HashMap<TaskId, NodeIndex>,
}

type OrderKey = (u8, bool, Option<NaiveDateTime>, usize);

impl TaskDag {
    /// Builds the graph. Dependencies naming unknown tasks are skipped; run
    /// validation first when they must be reported.
    pub fn build(tasks: &[Task]) -> Self {
        let mut graph: DiGraph<usize, ()> = DiGraph::with_capacity(tasks.len(), tasks.len());
        let mut id_to_index: HashMap<TaskId, NodeIndex> = HashMap::with_capacity(tasks.len());

        // Add nodes first
        for (position, task) in tasks.iter().enumerate() {
            let node_ix = graph.add_node(position);
            id_to_index.entry(task.id.clone()).or_insert(node_ix);
        }

        // Add edges: dependency -> task
        for task in tasks {
            let Some(&v) = id_to_index.get(&task.id) else {
                continue;
            };
            for dep in &task.dependencies {
                if let Some(&u) = id_to_index.get(dep) {
                    graph.update_edge(u, v, ());
                }
            }
        }

        Self { graph, id_to_index }
    }

    pub fn node(&self, task_id: &str) -> Option<NodeIndex> {
        self.id_to_index.get(task_id).copied()
    }

    pub fn position(&self, node: NodeIndex) -> usize {
        self.graph[node]
    }

    pub fn predecessors(&self, node: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.neighbors_directed(node, Direction::Incoming)
    }

    pub fn successors(&self, node: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.neighbors_directed(node, Direction::Outgoing)
    }

    /// Depth-first search tracking the in-progress path. Returns the task ids
    /// forming the first cycle found, closed with the starting id.
    pub fn find_cycle(&self, tasks: &[Task]) -> Option<Vec<TaskId>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unvisited,
            InProgress,
            Done,
        }

        let mut marks = vec![Mark::Unvisited; self.graph.node_count()];
        for root in self.graph.node_indices() {
            if marks[root.index()] != Mark::Unvisited {
                continue;
            }
            // (node, successors still to explore)
            let mut stack: Vec<(NodeIndex, Vec<NodeIndex>)> = Vec::new();
            marks[root.index()] = Mark::InProgress;
            stack.push((root, self.sorted_successors(root)));

            loop {
                let Some((node, pending)) = stack.last_mut() else {
                    break;
                };
                let node = *node;
                let next = pending.pop();
                match next {
                    Some(next) => match marks[next.index()] {
                        Mark::Unvisited => {
                            marks[next.index()] = Mark::InProgress;
                            let successors = self.sorted_successors(next);
                            stack.push((next, successors));
                        }
                        Mark::InProgress => {
                            let start = stack
                                .iter()
                                .position(|(n, _)| *n == next)
                                .unwrap_or_default();
                            let mut cycle: Vec<TaskId> = stack[start..]
                                .iter()
                                .map(|(n, _)| tasks[self.graph[*n]].id.clone())
                                .collect();
                            cycle.push(tasks[self.graph[next]].id.clone());
                            return Some(cycle);
                        }
                        Mark::Done => {}
                    },
                    None => {
                        marks[node.index()] = Mark::Done;
                        stack.pop();
                    }
                }
            }
        }
        None
    }

    // Reverse insertion order so popping visits successors in input order.
    fn sorted_successors(&self, node: NodeIndex) -> Vec<NodeIndex> {
        let mut successors: Vec<NodeIndex> = self.successors(node).collect();
        successors.sort_by_key(|n| Reverse(self.graph[*n]));
        successors
    }

    /// Plain topological order of node indices, `None` on a cycle.
    pub fn topological_order(&self) -> Option<Vec<NodeIndex>> {
        toposort(&self.graph, None).ok()
    }

    /// Kahn's algorithm where every ready task competes on priority rank,
    /// then deadline (tasks without one last), then input position.
    /// Returns task positions; tasks caught in a cycle are left out.
    pub fn priority_order(&self, tasks: &[Task]) -> Vec<usize> {
        let key = |position: usize| -> OrderKey {
            let task = &tasks[position];
            (
                task.priority.rank(),
                task.deadline.is_none(),
                task.deadline,
                position,
            )
        };

        let mut in_degree: Vec<usize> = self
            .graph
            .node_indices()
            .map(|n| self.predecessors(n).count())
            .collect();
        let mut ready: BinaryHeap<Reverse<(OrderKey, NodeIndex)>> = self
            .graph
            .node_indices()
            .filter(|n| in_degree[n.index()] == 0)
            .map(|n| Reverse((key(self.graph[n]), n)))
            .collect();

        let mut order = Vec::with_capacity(tasks.len());
        while let Some(Reverse((_, node))) = ready.pop() {
            order.push(self.graph[node]);
            for succ in self.successors(node) {
                let degree = &mut in_degree[succ.index()];
                *degree -= 1;
                if *degree == 0 {
                    ready.push(Reverse((key(self.graph[succ]), succ)));
                }
            }
        }
        order
    }
}
