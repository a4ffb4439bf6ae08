//! The dynamic syntax tree shared by both front-ends.
//!
//! Statements are [`Node`]s: a closed [`NodeKind`] plus ordered children,
//! the source line and the file the node came from. SassScript lives in
//! [`Expr`] trees hanging off the nodes that carry expressions. Text that
//! may contain `#{}` (selectors, property names, directive parameters) is an
//! [`Interpolation`].

mod expr;
mod node;

pub use expr::{
    BinaryOp, CallArgs, Expr, ExprKind, InterpPart, Interpolation, Param, UnaryOp,
};
pub use node::{ImportTarget, Node, NodeKind};
