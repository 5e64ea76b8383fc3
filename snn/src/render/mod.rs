//! Graphviz rendering of the connectivity graph and image rasters of spike logs.

use super::Graph;

pub mod raster;

pub use raster::{RasterWindow, raster_image, select_events, to_raster_png};

use graphviz_rust::{
    cmd::{CommandArg, Format},
    dot_structures::{
        Attribute, Edge, EdgeTy, Graph as DotGraph, GraphAttributes, Id, Node, NodeId, Stmt,
        Vertex,
    },
    exec,
    printer::{DotPrinter, PrinterContext},
};

fn attr(key: &str, value: impl Into<String>) -> Attribute {
    Attribute(Id::Plain(key.into()), Id::Plain(value.into()))
}

fn node_id(neuron: usize) -> NodeId {
    NodeId(Id::Plain(format!("n{}", neuron)), None)
}

fn build(graph: &Graph) -> DotGraph {
    let mut g = DotGraph::DiGraph {
        id: Id::Plain("network".to_string()),
        strict: false,
        stmts: Vec::new(),
    };

    g.add_stmt(Stmt::GAttribute(GraphAttributes::Graph(vec![
        attr("layout", "neato"),
        attr("overlap", "false"),
        attr("splines", "line"),
        attr("mode", "sgd"),
    ])));

    for i in 0..graph.neuron_count() {
        let id = node_id(i as usize);
        g.add_stmt(Stmt::Node(Node::new(id.clone(), vec![attr("shape", "point")])));

        for (target, weight) in graph.out_edges(i) {
            g.add_stmt(Stmt::Edge(Edge {
                ty: EdgeTy::Pair(Vertex::N(id.clone()), Vertex::N(node_id(target as usize))),
                attributes: vec![attr("label", format!("{:.3}", weight))],
            }));
        }
    }

    g
}

/// Graphviz DOT text of `graph`: one point node per neuron, one labelled edge
/// per synapse. An unfinalized graph renders without edges.
pub fn to_dot(graph: &Graph) -> String {
    build(graph).print(&mut PrinterContext::default())
}

/// Render `graph` with Graphviz' **neato** engine and return a PNG in-memory.
/// Requires a `dot`/Graphviz installation.
pub fn to_neato_png(graph: &Graph) -> std::io::Result<Vec<u8>> {
    let mut ctx = PrinterContext::default();
    exec(build(graph), &mut ctx, vec![CommandArg::Format(Format::Png)])
}
