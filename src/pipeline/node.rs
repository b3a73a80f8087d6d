//! The `Node` contract shared by the synchronous and asynchronous pipelines.

use smol_str::SmolStr;

/// A named input or output port on a node.
pub type Port = SmolStr;

/// A synchronous, pure processing step: one input event in, zero or more
/// (port, event) pairs out. Implementors should avoid blocking; the
/// synchronous pipeline runs entirely on the calling thread.
pub trait Node<E>: Send + Sync {
    fn process(&mut self, input: &Port, event: E) -> Vec<(Port, E)>;
}

/// A boxed node, for storing heterogeneous implementations in one registry.
pub type BoxNode<E> = Box<dyn Node<E> + Send + Sync>;

/// An identity node: used in tests and as the default pass-through stage.
pub struct Echo {
    pub output: Port,
}

impl<E> Node<E> for Echo {
    fn process(&mut self, _input: &Port, event: E) -> Vec<(Port, E)> {
        vec![(self.output.clone(), event)]
    }
}
