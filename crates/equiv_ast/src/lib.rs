//! Expression trees for the equivalence engine.
//!
//! Every tree lives in a [`Context`] arena. The arena hash-conses its nodes,
//! which makes structural equality an [`ExprId`] comparison and gives each
//! node a memoized content hash.

pub mod display;
pub mod expression;
pub mod ordering;
pub mod span;
pub mod symbol;
pub mod traversal;

pub use display::DisplayExpr;
pub use expression::{BinaryOp, Context, Delimiter, Expr, ExprId, NodeKind, UnaryOp};
pub use ordering::{compare_expr, term_order};
pub use span::Span;
pub use symbol::{SymbolId, SymbolTable};
pub use traversal::{build_product, build_sum, collect_symbols, flatten_add, flatten_mul};
