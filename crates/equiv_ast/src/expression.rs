//! Expression nodes and the hash-consing arena that owns them.

use crate::span::Span;
use crate::symbol::{SymbolId, SymbolTable};
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Zero};
use rustc_hash::{FxHashMap, FxHasher};
use std::hash::{Hash, Hasher};

/// Handle to a node stored in a [`Context`].
///
/// Because the arena hash-conses, two ids from the same context are equal
/// exactly when the trees they name are structurally equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(usize);

impl ExprId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Plus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    /// Juxtaposition as written (`2x`, `ab`). Distinct from `Mul` until the
    /// canonicalizer makes it explicit.
    ImplicitMul,
    Div,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Delimiter {
    Paren,
    Bracket,
    Brace,
}

impl Delimiter {
    pub fn open(self) -> &'static str {
        match self {
            Delimiter::Paren => "(",
            Delimiter::Bracket => "[",
            Delimiter::Brace => "{",
        }
    }

    pub fn close(self) -> &'static str {
        match self {
            Delimiter::Paren => ")",
            Delimiter::Bracket => "]",
            Delimiter::Brace => "}",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    Number(BigRational),
    Symbol(SymbolId),
    Unary(UnaryOp, ExprId),
    Binary(BinaryOp, ExprId, ExprId),
    Pow(ExprId, ExprId),
    Frac(ExprId, ExprId),
    /// Radicand and optional index (`\sqrt[3]{x}`).
    Sqrt(ExprId, Option<ExprId>),
    Function(SymbolId, Vec<ExprId>),
    Grouped(Delimiter, ExprId, Delimiter),
}

/// Coarse node classification used to index rules by the nodes they target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    Number,
    Symbol,
    Neg,
    Plus,
    Add,
    Sub,
    Mul,
    ImplicitMul,
    Div,
    Pow,
    Frac,
    Sqrt,
    Function,
    Grouped,
}

impl NodeKind {
    pub const ALL: [NodeKind; 14] = [
        NodeKind::Number,
        NodeKind::Symbol,
        NodeKind::Neg,
        NodeKind::Plus,
        NodeKind::Add,
        NodeKind::Sub,
        NodeKind::Mul,
        NodeKind::ImplicitMul,
        NodeKind::Div,
        NodeKind::Pow,
        NodeKind::Frac,
        NodeKind::Sqrt,
        NodeKind::Function,
        NodeKind::Grouped,
    ];
}

impl Expr {
    pub fn kind(&self) -> NodeKind {
        match self {
            Expr::Number(_) => NodeKind::Number,
            Expr::Symbol(_) => NodeKind::Symbol,
            Expr::Unary(UnaryOp::Neg, _) => NodeKind::Neg,
            Expr::Unary(UnaryOp::Plus, _) => NodeKind::Plus,
            Expr::Binary(BinaryOp::Add, _, _) => NodeKind::Add,
            Expr::Binary(BinaryOp::Sub, _, _) => NodeKind::Sub,
            Expr::Binary(BinaryOp::Mul, _, _) => NodeKind::Mul,
            Expr::Binary(BinaryOp::ImplicitMul, _, _) => NodeKind::ImplicitMul,
            Expr::Binary(BinaryOp::Div, _, _) => NodeKind::Div,
            Expr::Pow(_, _) => NodeKind::Pow,
            Expr::Frac(_, _) => NodeKind::Frac,
            Expr::Sqrt(_, _) => NodeKind::Sqrt,
            Expr::Function(_, _) => NodeKind::Function,
            Expr::Grouped(_, _, _) => NodeKind::Grouped,
        }
    }

    /// Children in traversal order.
    pub fn children(&self) -> Vec<ExprId> {
        match self {
            Expr::Number(_) | Expr::Symbol(_) => Vec::new(),
            Expr::Unary(_, e) | Expr::Grouped(_, e, _) => vec![*e],
            Expr::Binary(_, l, r) | Expr::Pow(l, r) | Expr::Frac(l, r) => vec![*l, *r],
            Expr::Sqrt(radicand, index) => match index {
                Some(index) => vec![*radicand, *index],
                None => vec![*radicand],
            },
            Expr::Function(_, args) => args.clone(),
        }
    }

    /// Same node with its children replaced, in the order [`children`](Self::children) returns them.
    ///
    /// Returns `None` when `children` has the wrong arity.
    pub fn with_children(&self, children: &[ExprId]) -> Option<Expr> {
        let rebuilt = match (self, children) {
            (Expr::Number(_) | Expr::Symbol(_), []) => self.clone(),
            (Expr::Unary(op, _), [e]) => Expr::Unary(*op, *e),
            (Expr::Grouped(open, _, close), [e]) => Expr::Grouped(*open, *e, *close),
            (Expr::Binary(op, _, _), [l, r]) => Expr::Binary(*op, *l, *r),
            (Expr::Pow(_, _), [b, e]) => Expr::Pow(*b, *e),
            (Expr::Frac(_, _), [n, d]) => Expr::Frac(*n, *d),
            (Expr::Sqrt(_, None), [r]) => Expr::Sqrt(*r, None),
            (Expr::Sqrt(_, Some(_)), [r, i]) => Expr::Sqrt(*r, Some(*i)),
            (Expr::Function(name, args), new_args) if args.len() == new_args.len() => {
                Expr::Function(*name, new_args.to_vec())
            }
            _ => return None,
        };
        Some(rebuilt)
    }
}

/// Arena owning every node of the trees built during one check.
///
/// Nodes are immutable and hash-consed: [`Context::add`] returns the id of an
/// existing structurally equal node when there is one. Every node also carries
/// a content hash computed once at insertion from its tag, its resolved names
/// and its children's hashes, so the hash does not depend on insertion order.
#[derive(Debug, Clone, Default)]
pub struct Context {
    nodes: Vec<Expr>,
    hashes: Vec<u64>,
    interned: FxHashMap<Expr, ExprId>,
    spans: FxHashMap<ExprId, Span>,
    symbols: SymbolTable,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, expr: Expr) -> ExprId {
        if let Some(&id) = self.interned.get(&expr) {
            return id;
        }
        let id = ExprId(self.nodes.len());
        let hash = self.content_hash(&expr);
        self.nodes.push(expr.clone());
        self.hashes.push(hash);
        self.interned.insert(expr, id);
        id
    }

    /// # Panics
    /// Panics if `id` does not belong to this context.
    #[inline]
    pub fn get(&self, id: ExprId) -> &Expr {
        &self.nodes[id.0]
    }

    #[inline]
    pub fn hash_of(&self, id: ExprId) -> u64 {
        self.hashes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn intern_symbol(&mut self, name: &str) -> SymbolId {
        self.symbols.intern(name)
    }

    #[inline]
    pub fn sym_name(&self, id: SymbolId) -> &str {
        self.symbols.resolve(id)
    }

    /// Record where `id` came from. The first recorded span wins, since a
    /// hash-consed node may be produced by several source locations.
    pub fn set_span(&mut self, id: ExprId, span: Span) {
        self.spans.entry(id).or_insert(span);
    }

    pub fn span(&self, id: ExprId) -> Option<Span> {
        self.spans.get(&id).copied()
    }

    // ---- constructors ----------------------------------------------------

    pub fn num(&mut self, n: i64) -> ExprId {
        self.add(Expr::Number(BigRational::from_integer(BigInt::from(n))))
    }

    pub fn rational(&mut self, value: BigRational) -> ExprId {
        self.add(Expr::Number(value))
    }

    pub fn var(&mut self, name: &str) -> ExprId {
        let sym = self.symbols.intern(name);
        self.add(Expr::Symbol(sym))
    }

    pub fn call(&mut self, name: &str, args: Vec<ExprId>) -> ExprId {
        let sym = self.symbols.intern(name);
        self.add(Expr::Function(sym, args))
    }

    pub fn neg(&mut self, e: ExprId) -> ExprId {
        self.add(Expr::Unary(UnaryOp::Neg, e))
    }

    pub fn binary(&mut self, op: BinaryOp, l: ExprId, r: ExprId) -> ExprId {
        self.add(Expr::Binary(op, l, r))
    }

    pub fn sum(&mut self, l: ExprId, r: ExprId) -> ExprId {
        self.binary(BinaryOp::Add, l, r)
    }

    pub fn product(&mut self, l: ExprId, r: ExprId) -> ExprId {
        self.binary(BinaryOp::Mul, l, r)
    }

    pub fn pow(&mut self, base: ExprId, exp: ExprId) -> ExprId {
        self.add(Expr::Pow(base, exp))
    }

    pub fn frac(&mut self, num: ExprId, den: ExprId) -> ExprId {
        self.add(Expr::Frac(num, den))
    }

    pub fn sqrt(&mut self, radicand: ExprId) -> ExprId {
        self.add(Expr::Sqrt(radicand, None))
    }

    // ---- queries ---------------------------------------------------------

    pub fn as_number(&self, id: ExprId) -> Option<&BigRational> {
        match self.get(id) {
            Expr::Number(n) => Some(n),
            _ => None,
        }
    }

    pub fn is_zero(&self, id: ExprId) -> bool {
        self.as_number(id).is_some_and(|n| n.is_zero())
    }

    pub fn is_one(&self, id: ExprId) -> bool {
        self.as_number(id).is_some_and(|n| n.is_one())
    }

    /// Name of a `Symbol` node.
    pub fn symbol_name(&self, id: ExprId) -> Option<&str> {
        match self.get(id) {
            Expr::Symbol(s) => Some(self.sym_name(*s)),
            _ => None,
        }
    }

    /// Name and arguments of a `Function` node.
    pub fn function(&self, id: ExprId) -> Option<(&str, &[ExprId])> {
        match self.get(id) {
            Expr::Function(name, args) => Some((self.sym_name(*name), args.as_slice())),
            _ => None,
        }
    }

    /// Single-argument call of the named function, returning the argument.
    pub fn unary_call(&self, id: ExprId, name: &str) -> Option<ExprId> {
        match self.function(id) {
            Some((n, [arg])) if n == name => Some(*arg),
            _ => None,
        }
    }

    fn content_hash(&self, expr: &Expr) -> u64 {
        let mut h = FxHasher::default();
        std::mem::discriminant(&expr.kind()).hash(&mut h);
        match expr {
            Expr::Number(n) => {
                n.numer().to_signed_bytes_le().hash(&mut h);
                n.denom().to_signed_bytes_le().hash(&mut h);
            }
            Expr::Symbol(s) => self.symbols.resolve(*s).hash(&mut h),
            Expr::Function(name, args) => {
                self.symbols.resolve(*name).hash(&mut h);
                for arg in args {
                    self.hashes[arg.0].hash(&mut h);
                }
            }
            Expr::Grouped(open, body, close) => {
                open.hash(&mut h);
                close.hash(&mut h);
                self.hashes[body.0].hash(&mut h);
            }
            other => {
                for child in other.children() {
                    self.hashes[child.0].hash(&mut h);
                }
                if let Expr::Sqrt(_, None) = other {
                    0xff_u8.hash(&mut h);
                }
            }
        }
        h.finish()
    }
}
