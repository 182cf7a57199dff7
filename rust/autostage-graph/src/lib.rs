//! autostage graph
//!
//! Element kinds, shapes, concrete tensors, the staged graph with its op
//! constructors, in-memory deferred sequence sources, and a reference engine
//! that executes staged graphs.

pub mod dataset;
pub mod dtype;
pub mod graph;
pub mod session;
pub mod shape;
pub mod tensor;

pub use dataset::Dataset;
pub use dtype::DType;
pub use graph::{Graph, GraphError, HostCallback, NodeId, Symbolic, TensorArray};
pub use session::{ExecError, Feeds, Session};
pub use shape::{Shape, ShapeError, StaticShape};
pub use tensor::{Tensor, TensorData};
