//! The asynchronous event-flow pipeline: the same node/link surface as
//! [`super::sync_pipeline::SyncPipeline`], implemented over bounded `tokio`
//! channels instead of a flush-driven buffer.
//!
//! Each node is wired lazily, on the first structural change that touches
//! it (an `add_link` or `ingest`), guarded by a [`std::sync::OnceLock`] so
//! the channels and the driver task are created exactly once. A node's
//! outputs fan out through a [`Multiplexer`]: every `add_link` attaches the
//! target's input sender as a tap; `remove_link` detaches it.

use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use smol_str::SmolStr;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::collection::FnvIndexMap;
use crate::error::XchangeError;
use crate::shutdown::AsyncShutdown;

use super::node::{BoxNode, Port};

pub type NodeId = SmolStr;

/// How a node's driver task schedules work across its input ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessShape {
    /// One task selects fairly across every input channel; per-task output
    /// ordering is preserved, cross-port ordering is not guaranteed.
    Alts,
    /// One task per input channel; per-input FIFO is preserved, cross-input
    /// ordering is not.
    ParallelPerInput,
}

/// Per-output-port fan-out: every attached tap receives a clone of each
/// event produced on that port.
struct Multiplexer<E> {
    taps: FnvIndexMap<Port, Vec<mpsc::Sender<E>>>,
}

impl<E> Default for Multiplexer<E> {
    fn default() -> Self {
        Self {
            taps: FnvIndexMap::default(),
        }
    }
}

impl<E> Multiplexer<E> {
    fn attach(&mut self, port: Port, tap: mpsc::Sender<E>) {
        self.taps.entry(port).or_default().push(tap);
    }

    fn detach(&mut self, port: &Port, tap: &mpsc::Sender<E>) {
        if let Some(taps) = self.taps.get_mut(port) {
            taps.retain(|existing| !existing.same_channel(tap));
        }
    }

    /// Clones out the current taps for `port`, so callers can `.await` the
    /// sends without holding this (sync) lock across an await point.
    fn taps_for(&self, port: &Port) -> Vec<mpsc::Sender<E>> {
        self.taps.get(port).cloned().unwrap_or_default()
    }
}

async fn dispatch<E: Clone>(multiplexer: &Mutex<Multiplexer<E>>, port: &Port, event: E) {
    let taps = multiplexer.lock().taps_for(port);
    for tap in taps {
        let _ = tap.send(event.clone()).await;
    }
}

struct Running<E> {
    inputs: FnvIndexMap<Port, mpsc::Sender<E>>,
    multiplexer: Arc<Mutex<Multiplexer<E>>>,
    driver: JoinHandle<()>,
}

/// A node registered with the pipeline, wired up on first use.
pub struct NodeEntry<E> {
    shape: ProcessShape,
    node: Arc<Mutex<BoxNode<E>>>,
    capacity: usize,
    running: OnceLock<Running<E>>,
    input_ports: Vec<Port>,
}

impl<E> NodeEntry<E>
where
    E: Send + 'static,
{
    pub fn new(node: BoxNode<E>, input_ports: Vec<Port>, shape: ProcessShape, capacity: usize) -> Self {
        Self {
            shape,
            node: Arc::new(Mutex::new(node)),
            capacity,
            running: OnceLock::new(),
            input_ports,
        }
    }

    fn ensure_started(&self) -> &Running<E> {
        self.running.get_or_init(|| {
            let multiplexer = Arc::new(Mutex::new(Multiplexer::default()));
            let mut inputs = FnvIndexMap::default();
            let mut receivers = Vec::new();
            for port in &self.input_ports {
                let (tx, rx) = mpsc::channel(self.capacity);
                inputs.insert(port.clone(), tx);
                receivers.push((port.clone(), rx));
            }

            let driver = match self.shape {
                ProcessShape::Alts => {
                    let node = self.node.clone();
                    let multiplexer = multiplexer.clone();
                    tokio::spawn(alts_loop(node, receivers, multiplexer))
                }
                ProcessShape::ParallelPerInput => {
                    let node = self.node.clone();
                    let multiplexer = multiplexer.clone();
                    tokio::spawn(parallel_loop(node, receivers, multiplexer))
                }
            };

            Running {
                inputs,
                multiplexer,
                driver,
            }
        })
    }
}

async fn alts_loop<E: Clone + Send + 'static>(
    node: Arc<Mutex<BoxNode<E>>>,
    mut receivers: Vec<(Port, mpsc::Receiver<E>)>,
    multiplexer: Arc<Mutex<Multiplexer<E>>>,
) {
    loop {
        if receivers.is_empty() {
            return;
        }
        let mut got = None;
        for (index, (_, rx)) in receivers.iter_mut().enumerate() {
            if let Ok(event) = rx.try_recv() {
                got = Some((index, event));
                break;
            }
        }
        let (index, event) = match got {
            Some(found) => found,
            None => {
                // nothing ready right now; await the first receiver to make
                // progress instead of busy-spinning.
                let mut closed = Vec::new();
                let mut found = None;
                for (index, (_, rx)) in receivers.iter_mut().enumerate() {
                    match rx.recv().await {
                        Some(event) => {
                            found = Some((index, event));
                            break;
                        }
                        None => closed.push(index),
                    }
                }
                for index in closed.into_iter().rev() {
                    receivers.remove(index);
                }
                match found {
                    Some(found) => found,
                    None => continue,
                }
            }
        };
        let port = receivers[index].0.clone();
        let outputs = node.lock().process(&port, event);
        for (out_port, out_event) in outputs {
            dispatch(&multiplexer, &out_port, out_event).await;
        }
    }
}

async fn parallel_loop<E: Clone + Send + 'static>(
    node: Arc<Mutex<BoxNode<E>>>,
    receivers: Vec<(Port, mpsc::Receiver<E>)>,
    multiplexer: Arc<Mutex<Multiplexer<E>>>,
) {
    let mut tasks = Vec::new();
    for (port, mut rx) in receivers {
        let node = node.clone();
        let multiplexer = multiplexer.clone();
        tasks.push(tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let outputs = node.lock().process(&port, event);
                for (out_port, out_event) in outputs {
                    dispatch(&multiplexer, &out_port, out_event).await;
                }
            }
        }));
    }
    for task in tasks {
        let _ = task.await;
    }
}

pub struct AsyncPipeline<E: Send + 'static> {
    nodes: Mutex<FnvIndexMap<NodeId, Arc<NodeEntry<E>>>>,
}

impl<E: Send + 'static> Default for AsyncPipeline<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> AsyncPipeline<E>
where
    E: Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self {
            nodes: Mutex::new(FnvIndexMap::default()),
        }
    }

    pub fn add_node(&self, id: impl Into<NodeId>, entry: NodeEntry<E>) -> Result<(), XchangeError> {
        let id = id.into();
        let mut nodes = self.nodes.lock();
        if nodes.contains_key(&id) {
            return Err(XchangeError::InvalidParams(format!("duplicate node id {id}")));
        }
        nodes.insert(id, Arc::new(entry));
        Ok(())
    }

    /// Shuts the node's driver down (by closing its inputs) after detaching
    /// it from every link, then removes it.
    pub fn remove_node(&self, id: &str) {
        self.nodes.lock().shift_remove(id);
    }

    /// Attaches `to_id`'s input channel for `to_port` as a tap on
    /// `from_id`'s output multiplexer for `from_port`, starting either node
    /// on first use.
    pub fn add_link(
        &self,
        from_id: &str,
        from_port: impl Into<Port>,
        to_port: impl Into<Port>,
        to_id: &str,
    ) -> Result<(), XchangeError> {
        let nodes = self.nodes.lock();
        let from = nodes
            .get(from_id)
            .ok_or_else(|| XchangeError::InvalidParams(format!("unknown node {from_id}")))?
            .clone();
        let to = nodes
            .get(to_id)
            .ok_or_else(|| XchangeError::InvalidParams(format!("unknown node {to_id}")))?
            .clone();
        drop(nodes);

        let from_port = from_port.into();
        let to_port = to_port.into();
        let to_running = to.ensure_started();
        let tap = to_running
            .inputs
            .get(&to_port)
            .ok_or_else(|| XchangeError::InvalidParams(format!("unknown input port {to_port}")))?
            .clone();
        let from_running = from.ensure_started();
        from_running.multiplexer.lock().attach(from_port, tap);
        Ok(())
    }

    /// Sends `event` directly into `id`'s `input` channel, suspending if the
    /// channel is at capacity.
    pub async fn ingest(&self, id: &str, input: &Port, event: E) -> Result<(), XchangeError> {
        let entry = self
            .nodes
            .lock()
            .get(id)
            .ok_or_else(|| XchangeError::NotFound(format!("unknown node {id}")))?
            .clone();
        let running = entry.ensure_started();
        let tx = running
            .inputs
            .get(input)
            .ok_or_else(|| XchangeError::InvalidParams(format!("unknown input port {input}")))?
            .clone();
        tx.send(event).await.map_err(XchangeError::from)
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.lock().keys().cloned().collect()
    }
}

impl<E> AsyncShutdown for AsyncPipeline<E>
where
    E: Clone + Send + 'static,
{
    type Result = ();

    /// Closing every node's input channels drains in-flight work, then
    /// each driver task exits once its receivers report closed.
    async fn shutdown(&mut self) {
        let nodes: Vec<_> = self.nodes.lock().drain(..).collect();
        for (_, entry) in nodes {
            match Arc::try_unwrap(entry) {
                Ok(entry) => {
                    // Dropping `running` (and with it its stored input
                    // senders) closes every channel the driver reads from,
                    // so its loop exits and the task below completes.
                    if let Some(running) = entry.running.into_inner() {
                        let _ = running.driver.await;
                    }
                }
                Err(entry) => {
                    // Another clone is still live (e.g. a concurrent
                    // add_link); best-effort abort its driver instead.
                    if let Some(running) = entry.running.get() {
                        running.driver.abort();
                    }
                }
            }
        }
    }
}
