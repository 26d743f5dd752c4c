mod load;
mod model;
mod synth;

pub use load::load_graph;
pub use model::{EdgeKind, GraphData, GraphEdge, GraphNode};
pub use synth::generate_graph;
