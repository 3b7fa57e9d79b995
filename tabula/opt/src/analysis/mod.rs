//! Analyses over tables: control flow, delays and register dependencies.
mod bb_set;
mod data_path;
mod delay_info;
mod state_graph;

pub use bb_set::{BB, BBSet};
pub use data_path::{BBDataPath, DataPathSet, PathEdge, PathEdgeType, PathNode};
pub use delay_info::DelayInfo;
pub use state_graph::StateGraph;
