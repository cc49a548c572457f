//! Per-declaration memo of inference results
//!
//! Results for package files live for the whole session. Results for
//! project files are dropped whenever the project is marked dirty.

use super::InferenceResult;
use crate::syntax::NodeRef;
use std::collections::HashMap;
use std::rc::Rc;

/// Hit and miss counters, mostly for tests and `--verbose` output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
}

/// Inference results keyed by the declaration or annotation node
#[derive(Debug, Default)]
pub struct TypeCache {
    package: HashMap<NodeRef, Rc<InferenceResult>>,
    project: HashMap<NodeRef, Rc<InferenceResult>>,
    /// Value declaration to the nested annotations evaluated for it
    tracked_annotations: HashMap<NodeRef, Vec<NodeRef>>,
    stats: CacheStats,
}

impl TypeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, node: NodeRef, project: bool) -> Option<Rc<InferenceResult>> {
        let partition = if project { &self.project } else { &self.package };
        match partition.get(&node) {
            Some(result) => {
                self.stats.hits += 1;
                Some(Rc::clone(result))
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    pub fn insert(&mut self, node: NodeRef, project: bool, result: Rc<InferenceResult>) {
        tracing::trace!(?node, project, "caching inference result");
        let partition = if project { &mut self.project } else { &mut self.package };
        partition.insert(node, result);
    }

    /// Remember that `annotation` was evaluated while inferring
    /// `declaration`
    pub fn track_annotation(&mut self, declaration: NodeRef, annotation: NodeRef) {
        let tracked = self.tracked_annotations.entry(declaration).or_default();
        if !tracked.contains(&annotation) {
            tracked.push(annotation);
        }
    }

    pub fn invalidate_value_declaration(&mut self, declaration: NodeRef) {
        tracing::debug!(?declaration, "invalidating value declaration");
        self.remove(declaration);
        for annotation in self.tracked_annotations.remove(&declaration).unwrap_or_default() {
            self.remove(annotation);
        }
    }

    pub fn invalidate_type_declaration(&mut self, declaration: NodeRef) {
        tracing::debug!(?declaration, "invalidating type declaration");
        self.remove(declaration);
    }

    fn remove(&mut self, node: NodeRef) {
        self.project.remove(&node);
        self.package.remove(&node);
    }

    pub fn clear_project(&mut self) {
        self.project.clear();
        self.tracked_annotations.clear();
    }

    pub fn clear(&mut self) {
        self.clear_project();
        self.package.clear();
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.package.len() + self.project.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{FileId, NodeId};

    fn node(file: u32, id: u32) -> NodeRef {
        NodeRef::new(FileId(file), NodeId(id))
    }

    #[test]
    fn test_partitions_and_dirty() {
        let mut cache = TypeCache::new();
        cache.insert(node(0, 1), false, Rc::new(InferenceResult::unknown()));
        cache.insert(node(1, 1), true, Rc::new(InferenceResult::unknown()));
        cache.clear_project();
        assert!(cache.get(node(0, 1), false).is_some());
        assert!(cache.get(node(1, 1), true).is_none());
        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1 });
    }

    #[test]
    fn test_value_invalidation_drops_tracked_annotations() {
        let mut cache = TypeCache::new();
        let declaration = node(1, 10);
        let annotation = node(1, 20);
        let sibling = node(1, 30);
        for n in [declaration, annotation, sibling] {
            cache.insert(n, true, Rc::new(InferenceResult::unknown()));
        }
        cache.track_annotation(declaration, annotation);
        cache.invalidate_value_declaration(declaration);
        assert!(cache.get(declaration, true).is_none());
        assert!(cache.get(annotation, true).is_none());
        assert!(cache.get(sibling, true).is_some());
    }
}
