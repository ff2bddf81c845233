#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod connection;
pub mod convert;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod negotiator;
pub mod reconcile;
pub mod render;
pub mod session;
pub mod text_metrics;
pub mod theme;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, load_config, parse_config};
pub use connection::{ConnectionTypeRegistry, ConnectionTypeStyle, Routing};
pub use convert::{PositionedGraph, to_positioned, to_simplified};
pub use ir::{ConnectionType, Direction, Edge, Node, OrgGraph, Position};
pub use layout::{LayoutCache, LayoutFingerprint, LayoutPass, LayoutSolver};
pub use negotiator::{PendingConnection, PendingGesture};
pub use reconcile::{CascadeMode, Effect, Mutation, Outcome, ReconcileError, Rejection};
pub use session::{CanvasView, GraphSession, InteractionEvent, Reaction, Selection};
