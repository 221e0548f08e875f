//! Field dependency graph
//!
//! Edge `A → B` means field A's visibility conditions or calculated formula
//! read field B. Cycles are grouped by strongly connected component so a
//! loop between several fields is reported once, not once per edge.

use std::collections::{HashMap, HashSet, VecDeque};

use forms_schema::{Form, FormDraft};

#[derive(Clone, Debug, Default)]
pub struct DependencyGraph {
    nodes: Vec<String>,
    index: HashMap<String, usize>,
    edges: Vec<Vec<usize>>,
    dangling: Vec<(String, String)>,
}

/// Fields that depend on each other in a loop
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CycleGroup {
    /// Participants in form order
    pub fields: Vec<String>,
    /// One concrete loop, starting and ending at the first participant
    pub path: Vec<String>,
}

impl CycleGroup {
    pub fn describe(&self) -> String {
        self.path.join(" → ")
    }
}

impl DependencyGraph {
    /// Build from `(field_id, referenced_ids)` pairs in form order.
    ///
    /// Repeated IDs share one node. References to IDs that are not part of
    /// the graph are kept aside as dangling.
    pub fn new<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, Vec<String>)>,
    {
        let entries: Vec<(String, Vec<String>)> = entries.into_iter().collect();
        let mut graph = DependencyGraph::default();

        for (id, _) in &entries {
            if !graph.index.contains_key(id) {
                graph.index.insert(id.clone(), graph.nodes.len());
                graph.nodes.push(id.clone());
                graph.edges.push(Vec::new());
            }
        }

        for (id, refs) in entries {
            let from = graph.index[&id];
            for target in refs {
                match graph.index.get(&target) {
                    Some(&to) => {
                        if !graph.edges[from].contains(&to) {
                            graph.edges[from].push(to);
                        }
                    }
                    None => graph.dangling.push((id.clone(), target)),
                }
            }
        }
        graph
    }

    pub fn from_draft(draft: &FormDraft) -> Self {
        Self::new(draft.fields().filter_map(|f| {
            let id = forms_schema::draft::non_blank(&f.id)?;
            Some((id.to_string(), f.references()))
        }))
    }

    pub fn from_form(form: &Form) -> Self {
        Self::new(form.fields().map(|f| (f.id.clone(), f.references())))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Known dependencies of a field
    pub fn dependencies(&self, id: &str) -> Vec<&str> {
        self.index
            .get(id)
            .map(|&i| self.edges[i].iter().map(|&d| self.nodes[d].as_str()).collect())
            .unwrap_or_default()
    }

    /// `(field, missing_reference)` pairs
    pub fn dangling(&self) -> &[(String, String)] {
        &self.dangling
    }

    /// Every dependency loop, one group per strongly connected component
    pub fn find_cycles(&self) -> Vec<CycleGroup> {
        let mut tarjan = Tarjan::new(self);
        for v in 0..self.nodes.len() {
            if tarjan.indices[v].is_none() {
                tarjan.strong_connect(v);
            }
        }

        let mut groups: Vec<Vec<usize>> = tarjan
            .components
            .into_iter()
            .filter(|c| c.len() > 1 || self.edges[c[0]].contains(&c[0]))
            .map(|mut c| {
                c.sort_unstable();
                c
            })
            .collect();
        groups.sort_by_key(|c| c[0]);

        groups
            .into_iter()
            .map(|members| {
                let path = self.loop_through(&members);
                CycleGroup {
                    fields: members.iter().map(|&i| self.nodes[i].clone()).collect(),
                    path: path.iter().map(|&i| self.nodes[i].clone()).collect(),
                }
            })
            .collect()
    }

    /// Order in which fields can be computed, dependencies first.
    ///
    /// Returns `(ordered, blocked)`; blocked fields sit on or behind a cycle.
    pub fn evaluation_order(&self) -> (Vec<String>, Vec<String>) {
        let mut done = vec![false; self.nodes.len()];
        let mut ordered = Vec::with_capacity(self.nodes.len());

        loop {
            let mut progressed = false;
            for v in 0..self.nodes.len() {
                if !done[v] && self.edges[v].iter().all(|&d| done[d]) {
                    done[v] = true;
                    ordered.push(self.nodes[v].clone());
                    progressed = true;
                }
            }
            if !progressed {
                break;
            }
        }

        let blocked = (0..self.nodes.len())
            .filter(|&v| !done[v])
            .map(|v| self.nodes[v].clone())
            .collect();
        (ordered, blocked)
    }

    /// Shortest loop from the first member back to itself inside the group
    fn loop_through(&self, members: &[usize]) -> Vec<usize> {
        let start = members[0];
        let inside: HashSet<usize> = members.iter().copied().collect();
        let mut parent: HashMap<usize, usize> = HashMap::new();
        let mut queue = VecDeque::from([start]);

        while let Some(v) = queue.pop_front() {
            for &w in &self.edges[v] {
                if !inside.contains(&w) {
                    continue;
                }
                if w == start {
                    let mut path = vec![start];
                    let mut cur = v;
                    while cur != start {
                        path.push(cur);
                        cur = parent[&cur];
                    }
                    path.push(start);
                    path[1..].reverse();
                    return path;
                }
                if !parent.contains_key(&w) {
                    parent.insert(w, v);
                    queue.push_back(w);
                }
            }
        }
        vec![start, start]
    }
}

struct Tarjan<'g> {
    graph: &'g DependencyGraph,
    next_index: usize,
    indices: Vec<Option<usize>>,
    lowlink: Vec<usize>,
    stack: Vec<usize>,
    on_stack: Vec<bool>,
    components: Vec<Vec<usize>>,
}

impl<'g> Tarjan<'g> {
    fn new(graph: &'g DependencyGraph) -> Self {
        let n = graph.nodes.len();
        Self {
            graph,
            next_index: 0,
            indices: vec![None; n],
            lowlink: vec![0; n],
            stack: Vec::new(),
            on_stack: vec![false; n],
            components: Vec::new(),
        }
    }

    fn strong_connect(&mut self, v: usize) {
        self.indices[v] = Some(self.next_index);
        self.lowlink[v] = self.next_index;
        self.next_index += 1;
        self.stack.push(v);
        self.on_stack[v] = true;

        let graph = self.graph;
        for &w in &graph.edges[v] {
            match self.indices[w] {
                None => {
                    self.strong_connect(w);
                    self.lowlink[v] = self.lowlink[v].min(self.lowlink[w]);
                }
                Some(w_index) if self.on_stack[w] => {
                    self.lowlink[v] = self.lowlink[v].min(w_index);
                }
                Some(_) => {}
            }
        }

        if Some(self.lowlink[v]) == self.indices[v] {
            let mut component = Vec::new();
            while let Some(w) = self.stack.pop() {
                self.on_stack[w] = false;
                component.push(w);
                if w == v {
                    break;
                }
            }
            self.components.push(component);
        }
    }
}
