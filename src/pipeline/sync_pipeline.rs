//! The synchronous event-flow pipeline: a mutable graph of nodes and links,
//! executed one generation at a time via `flush`/`drain`.
//!
//! Node and link registries are each guarded by a `parking_lot::Mutex`;
//! structural changes (`add_node`, `remove_link`, ...) acquire, read, mutate
//! and release in one critical section, which gives callers the same
//! consistent-snapshot guarantee a compare-and-set loop would, without the
//! complexity of a lock-free structure at this crate's scale.

use std::collections::VecDeque;

use parking_lot::Mutex;
use smol_str::SmolStr;

use crate::collection::FnvIndexMap;
use crate::error::XchangeError;

use super::node::{BoxNode, Port};

pub type NodeId = SmolStr;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Link {
    from_id: NodeId,
    from_port: Port,
    to_port: Port,
    to_id: NodeId,
}

pub struct SyncPipeline<E> {
    nodes: Mutex<FnvIndexMap<NodeId, BoxNode<E>>>,
    links: Mutex<Vec<Link>>,
    pending: Mutex<VecDeque<(NodeId, Port, E)>>,
}

impl<E> Default for SyncPipeline<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> SyncPipeline<E> {
    pub fn new() -> Self {
        Self {
            nodes: Mutex::new(FnvIndexMap::default()),
            links: Mutex::new(Vec::new()),
            pending: Mutex::new(VecDeque::new()),
        }
    }

    pub fn add_node(&self, id: impl Into<NodeId>, node: BoxNode<E>) -> Result<(), XchangeError> {
        let id = id.into();
        let mut nodes = self.nodes.lock();
        if nodes.contains_key(&id) {
            return Err(XchangeError::InvalidParams(format!("duplicate node id {id}")));
        }
        nodes.insert(id, node);
        Ok(())
    }

    /// Removes the node, every link touching it, and any pending output it
    /// had already produced.
    pub fn remove_node(&self, id: &str) {
        self.nodes.lock().shift_remove(id);
        self.links
            .lock()
            .retain(|link| link.from_id != id && link.to_id != id);
        self.pending.lock().retain(|(from_id, _, _)| from_id != id);
    }

    pub fn add_link(
        &self,
        from_id: impl Into<NodeId>,
        from_port: impl Into<Port>,
        to_port: impl Into<Port>,
        to_id: impl Into<NodeId>,
    ) -> Result<(), XchangeError> {
        let link = Link {
            from_id: from_id.into(),
            from_port: from_port.into(),
            to_port: to_port.into(),
            to_id: to_id.into(),
        };
        let nodes = self.nodes.lock();
        if !nodes.contains_key(&link.from_id) || !nodes.contains_key(&link.to_id) {
            return Err(XchangeError::InvalidParams(
                "link endpoint does not exist".to_string(),
            ));
        }
        drop(nodes);
        let mut links = self.links.lock();
        if links.contains(&link) {
            return Err(XchangeError::InvalidParams("duplicate link".to_string()));
        }
        links.push(link);
        Ok(())
    }

    pub fn remove_link(
        &self,
        from_id: &str,
        from_port: &str,
        to_port: &str,
        to_id: &str,
    ) {
        self.links.lock().retain(|link| {
            !(link.from_id == from_id
                && link.from_port == from_port
                && link.to_port == to_port
                && link.to_id == to_id)
        });
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.lock().keys().cloned().collect()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Invokes `id`'s node on `input` with `event`, buffering whatever
    /// (port, event) pairs it produces. If the node has been concurrently
    /// removed, the outputs are silently dropped.
    pub fn ingest(&self, id: &str, input: &Port, event: E) {
        let outputs = {
            let mut nodes = self.nodes.lock();
            match nodes.get_mut(id) {
                Some(node) => node.process(input, event),
                None => return,
            }
        };
        let mut pending = self.pending.lock();
        for (port, event) in outputs {
            pending.push_back((NodeId::from(id), port, event));
        }
    }

    /// Drains the pending buffer once, dispatching each buffered event to
    /// every link whose source matched at drain time. Events produced during
    /// this pass are left pending for a subsequent `flush`.
    pub fn flush(&self)
    where
        E: Clone,
    {
        let drained: Vec<(NodeId, Port, E)> = {
            let mut pending = self.pending.lock();
            pending.drain(..).collect()
        };
        let links = self.links.lock().clone();
        for (from_id, from_port, event) in drained {
            for link in &links {
                if link.from_id == from_id && link.from_port == from_port {
                    self.ingest(&link.to_id, &link.to_port, event.clone());
                }
            }
        }
    }

    /// Repeatedly flushes until the pending buffer is empty.
    pub fn drain(&self)
    where
        E: Clone,
    {
        while self.pending_len() > 0 {
            self.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::node::Echo;

    #[test]
    fn flush_delivers_one_generation_per_call() {
        let pipeline: SyncPipeline<i32> = SyncPipeline::new();
        pipeline
            .add_node("a", Box::new(Echo { output: "out".into() }))
            .unwrap();
        pipeline
            .add_node("b", Box::new(Echo { output: "out".into() }))
            .unwrap();
        pipeline.add_link("a", "out", "in", "b").unwrap();

        pipeline.ingest("a", &"in".into(), 7);
        assert_eq!(pipeline.pending_len(), 1);

        pipeline.flush();
        // b received the event and queued its own echo
        assert_eq!(pipeline.pending_len(), 1);

        pipeline.flush();
        assert_eq!(pipeline.pending_len(), 0);
    }

    #[test]
    fn drain_loops_flush_until_empty() {
        let pipeline: SyncPipeline<i32> = SyncPipeline::new();
        pipeline
            .add_node("a", Box::new(Echo { output: "out".into() }))
            .unwrap();
        pipeline
            .add_node("b", Box::new(Echo { output: "out".into() }))
            .unwrap();
        pipeline.add_link("a", "out", "in", "b").unwrap();

        pipeline.ingest("a", &"in".into(), 1);
        pipeline.drain();
        assert_eq!(pipeline.pending_len(), 0);
    }

    #[test]
    fn remove_node_drops_its_links_and_pending_output() {
        let pipeline: SyncPipeline<i32> = SyncPipeline::new();
        pipeline
            .add_node("a", Box::new(Echo { output: "out".into() }))
            .unwrap();
        pipeline
            .add_node("b", Box::new(Echo { output: "out".into() }))
            .unwrap();
        pipeline.add_link("a", "out", "in", "b").unwrap();
        pipeline.ingest("a", &"in".into(), 1);

        pipeline.remove_node("a");
        assert_eq!(pipeline.pending_len(), 0);
        assert!(pipeline.add_link("a", "out", "in", "b").is_err());
    }

    #[test]
    fn duplicate_node_id_is_rejected() {
        let pipeline: SyncPipeline<i32> = SyncPipeline::new();
        pipeline
            .add_node("a", Box::new(Echo { output: "out".into() }))
            .unwrap();
        assert!(pipeline
            .add_node("a", Box::new(Echo { output: "out".into() }))
            .is_err());
    }
}
