//! Built-in symbolic backend: quotients of sparse polynomials over atoms.
//!
//! Symbols and opaque sub-terms (function calls, roots, symbolic powers)
//! become polynomial variables. Arguments of opaque sub-terms are normalized
//! before the atom is interned, so `sin(x+1)` and `sin(1+x)` share an atom.
//! Trigonometric functions are rewritten through `sin`/`cos`, and atoms with
//! a known power (`sqrt(r)^2 = r`, `cos(u)^2 = 1 - sin(u)^2`) are reduced.

use super::polynomial::{AtomIdx, Monomial, PolyBudget, Polynomial};
use super::SymbolicBackend;
use crate::error::FallbackError;
use crate::rules::algebra::exact_root;
use crate::rules::helpers::{build_term, has_negative_coefficient};
use crate::rules::trigonometry::{special_angle_value, TrigValue};
use equiv_ast::{build_sum, compare_expr, flatten_add, BinaryOp, Context, Expr, ExprId, UnaryOp};
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};
use rustc_hash::FxHashMap;
use std::cmp::Ordering;
use tracing::debug;

const MAX_NESTING_DEPTH: usize = 200;
/// Rounds of power reduction per normalization.
const MAX_REDUCTION_ROUNDS: usize = 8;

/// `num / den` with `den` never zero.
#[derive(Debug, Clone, PartialEq)]
struct RatFn {
    num: Polynomial,
    den: Polynomial,
}

impl RatFn {
    fn from_poly(num: Polynomial) -> Self {
        Self {
            num,
            den: Polynomial::one(),
        }
    }

    fn constant(c: BigRational) -> Self {
        Self::from_poly(Polynomial::constant(c))
    }

    fn zero() -> Self {
        Self::from_poly(Polynomial::zero())
    }

    fn one() -> Self {
        Self::from_poly(Polynomial::one())
    }

    fn is_zero(&self) -> bool {
        self.num.is_zero()
    }

    fn constant_value(&self) -> Option<BigRational> {
        let num = self.num.constant_value()?;
        let den = self.den.constant_value()?;
        (!den.is_zero()).then(|| num / den)
    }
}

struct Atom {
    expr: ExprId,
    /// `atom^k = value`
    power_rule: Option<(u32, RatFn)>,
}

/// Rational-function normalizer used as the default symbolic fallback.
#[derive(Debug, Clone, Default)]
pub struct RationalBackend {
    budget: PolyBudget,
}

impl RationalBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_budget(budget: PolyBudget) -> Self {
        Self { budget }
    }

    pub fn budget(&self) -> PolyBudget {
        self.budget
    }
}

impl SymbolicBackend for RationalBackend {
    fn name(&self) -> &str {
        "rational"
    }

    fn simplify(&self, ctx: &mut Context, expr: ExprId) -> Result<ExprId, FallbackError> {
        let mut converter = Converter {
            ctx,
            budget: self.budget,
            atoms: Vec::new(),
            atom_index: FxHashMap::default(),
            memo: FxHashMap::default(),
        };
        let value = converter.convert(expr, 0)?;
        let out = converter.to_expr(&value);
        debug!(
            target: "fallback",
            atoms = converter.atoms.len(),
            numerator_terms = value.num.num_terms(),
            denominator_terms = value.den.num_terms(),
            "rational_normal_form"
        );
        Ok(out)
    }
}

fn common_monomial(a: &Monomial, b: &Monomial) -> Monomial {
    a.iter()
        .filter_map(|&(atom, exp)| {
            b.iter()
                .find(|(other, _)| *other == atom)
                .map(|&(_, e)| (atom, exp.min(e)))
        })
        .collect()
}

struct Converter<'a> {
    ctx: &'a mut Context,
    budget: PolyBudget,
    atoms: Vec<Atom>,
    atom_index: FxHashMap<ExprId, AtomIdx>,
    memo: FxHashMap<ExprId, RatFn>,
}

impl Converter<'_> {
    // ---- atoms -----------------------------------------------------------

    fn atom(&mut self, expr: ExprId, power_rule: Option<(u32, RatFn)>) -> RatFn {
        let idx = match self.atom_index.get(&expr) {
            Some(idx) => *idx,
            None => {
                let idx = self.atoms.len() as AtomIdx;
                self.atoms.push(Atom { expr, power_rule });
                self.atom_index.insert(expr, idx);
                idx
            }
        };
        RatFn::from_poly(Polynomial::atom(idx))
    }

    fn power_rule(&self, atom: AtomIdx) -> Option<&(u32, RatFn)> {
        self.atoms
            .get(atom as usize)
            .and_then(|a| a.power_rule.as_ref())
    }

    fn reducible(&self, p: &Polynomial) -> bool {
        p.terms().any(|(mono, _)| {
            mono.iter()
                .any(|&(atom, exp)| self.power_rule(atom).is_some_and(|(k, _)| exp >= *k))
        })
    }

    /// Substitute every `atom^e` with `e >= k` for an atom with rule `atom^k = v`.
    fn reduce_powers(&self, p: &Polynomial) -> Result<RatFn, FallbackError> {
        let mut total = RatFn::zero();
        for (mono, coeff) in p.terms() {
            let mut term = RatFn::constant(coeff.clone());
            for &(atom, exp) in mono {
                let plain = |e: u32| {
                    RatFn::from_poly(Polynomial::monomial(
                        BigRational::one(),
                        Monomial::from_slice(&[(atom, e)]),
                    ))
                };
                let factor = match self.power_rule(atom) {
                    Some((k, value)) if exp >= *k => {
                        let reduced = self.pow_raw(value, exp / k)?;
                        if exp % k == 0 {
                            reduced
                        } else {
                            self.mul_raw(&reduced, &plain(exp % k))?
                        }
                    }
                    _ => plain(exp),
                };
                term = self.mul_raw(&term, &factor)?;
            }
            total = self.add_raw(&total, &term)?;
        }
        Ok(total)
    }

    // ---- arithmetic ------------------------------------------------------

    fn add_raw(&self, a: &RatFn, b: &RatFn) -> Result<RatFn, FallbackError> {
        if a.den == b.den {
            return Ok(RatFn {
                num: a.num.add(&b.num, &self.budget)?,
                den: a.den.clone(),
            });
        }
        let left = a.num.mul(&b.den, &self.budget)?;
        let right = b.num.mul(&a.den, &self.budget)?;
        Ok(RatFn {
            num: left.add(&right, &self.budget)?,
            den: a.den.mul(&b.den, &self.budget)?,
        })
    }

    fn mul_raw(&self, a: &RatFn, b: &RatFn) -> Result<RatFn, FallbackError> {
        Ok(RatFn {
            num: a.num.mul(&b.num, &self.budget)?,
            den: a.den.mul(&b.den, &self.budget)?,
        })
    }

    fn pow_raw(&self, a: &RatFn, exp: u32) -> Result<RatFn, FallbackError> {
        Ok(RatFn {
            num: a.num.pow(exp, &self.budget)?,
            den: a.den.pow(exp, &self.budget)?,
        })
    }

    fn normalize(&self, mut f: RatFn) -> Result<RatFn, FallbackError> {
        for _ in 0..MAX_REDUCTION_ROUNDS {
            if !self.reducible(&f.num) && !self.reducible(&f.den) {
                break;
            }
            let num = self.reduce_powers(&f.num)?;
            let den = self.reduce_powers(&f.den)?;
            f = RatFn {
                num: num.num.mul(&den.den, &self.budget)?,
                den: num.den.mul(&den.num, &self.budget)?,
            };
        }

        if f.den.is_zero() {
            return Err(FallbackError::DivisionByZero);
        }
        if f.num.is_zero() {
            return Ok(RatFn::zero());
        }
        if let Some(c) = f.den.constant_value() {
            return Ok(RatFn::from_poly(f.num.scale(&c.recip())));
        }

        let common = common_monomial(&f.num.monomial_content(), &f.den.monomial_content());
        if !common.is_empty() {
            if let (Some(num), Some(den)) =
                (f.num.div_monomial(&common), f.den.div_monomial(&common))
            {
                f = RatFn { num, den };
                if let Some(c) = f.den.constant_value() {
                    return Ok(RatFn::from_poly(f.num.scale(&c.recip())));
                }
            }
        }

        if let Some(q) = f.num.div_exact(&f.den, &self.budget) {
            return Ok(RatFn::from_poly(q));
        }
        Ok(f)
    }

    fn add(&self, a: &RatFn, b: &RatFn) -> Result<RatFn, FallbackError> {
        self.normalize(self.add_raw(a, b)?)
    }

    fn neg(&self, a: &RatFn) -> RatFn {
        RatFn {
            num: a.num.neg(),
            den: a.den.clone(),
        }
    }

    fn sub(&self, a: &RatFn, b: &RatFn) -> Result<RatFn, FallbackError> {
        self.add(a, &self.neg(b))
    }

    fn mul(&self, a: &RatFn, b: &RatFn) -> Result<RatFn, FallbackError> {
        self.normalize(self.mul_raw(a, b)?)
    }

    fn recip(&self, a: &RatFn) -> Result<RatFn, FallbackError> {
        if a.num.is_zero() {
            return Err(FallbackError::DivisionByZero);
        }
        Ok(RatFn {
            num: a.den.clone(),
            den: a.num.clone(),
        })
    }

    fn div(&self, a: &RatFn, b: &RatFn) -> Result<RatFn, FallbackError> {
        let inverse = self.recip(b)?;
        self.mul(a, &inverse)
    }

    fn pow_int(&self, a: &RatFn, k: i64) -> Result<RatFn, FallbackError> {
        self.budget.check_exponent(k.unsigned_abs())?;
        let exp = u32::try_from(k.unsigned_abs())
            .map_err(|_| FallbackError::BudgetExceeded(format!("exponent {}", k)))?;
        let base = if k < 0 { self.recip(a)? } else { a.clone() };
        self.normalize(self.pow_raw(&base, exp)?)
    }

    // ---- conversion ------------------------------------------------------

    fn convert(&mut self, expr: ExprId, depth: usize) -> Result<RatFn, FallbackError> {
        if depth > MAX_NESTING_DEPTH {
            return Err(FallbackError::BudgetExceeded(format!(
                "nesting deeper than {}",
                MAX_NESTING_DEPTH
            )));
        }
        if let Some(done) = self.memo.get(&expr) {
            return Ok(done.clone());
        }

        let d = depth + 1;
        let value = match self.ctx.get(expr).clone() {
            Expr::Number(n) => RatFn::constant(n),
            Expr::Symbol(_) => self.atom(expr, None),
            Expr::Unary(UnaryOp::Neg, e) => {
                let v = self.convert(e, d)?;
                self.neg(&v)
            }
            Expr::Unary(UnaryOp::Plus, e) | Expr::Grouped(_, e, _) => self.convert(e, d)?,
            Expr::Binary(op, l, r) => {
                let a = self.convert(l, d)?;
                let b = self.convert(r, d)?;
                match op {
                    BinaryOp::Add => self.add(&a, &b)?,
                    BinaryOp::Sub => self.sub(&a, &b)?,
                    BinaryOp::Mul | BinaryOp::ImplicitMul => self.mul(&a, &b)?,
                    BinaryOp::Div => self.div(&a, &b)?,
                }
            }
            Expr::Frac(n, den) => {
                let a = self.convert(n, d)?;
                let b = self.convert(den, d)?;
                self.div(&a, &b)?
            }
            Expr::Pow(base, exp) => self.power(base, exp, d)?,
            Expr::Sqrt(radicand, index) => self.root(radicand, index, d)?,
            Expr::Function(name, args) => {
                let name = self.ctx.sym_name(name).to_string();
                self.function(&name, &args, d)?
            }
        };

        self.memo.insert(expr, value.clone());
        Ok(value)
    }

    fn power(&mut self, base: ExprId, exp: ExprId, d: usize) -> Result<RatFn, FallbackError> {
        let exponent = self.convert(exp, d)?;
        let base = self.convert(base, d)?;
        let Some(c) = exponent.constant_value() else {
            let base_expr = self.to_expr(&base);
            let exp_expr = self.to_expr(&exponent);
            let key = self.ctx.pow(base_expr, exp_expr);
            return Ok(self.atom(key, None));
        };
        let too_large = || FallbackError::BudgetExceeded(format!("exponent {}", c));
        if c.is_integer() {
            let k = c.numer().to_i64().ok_or_else(too_large)?;
            return self.pow_int(&base, k);
        }
        // b^(p/q) is the q-th root of b raised to p.
        let q = c
            .denom()
            .to_u32()
            .filter(|q| *q <= self.budget.max_exponent)
            .ok_or_else(too_large)?;
        let p = c.numer().to_i64().ok_or_else(too_large)?;
        let root = self.nth_root(&base, q)?;
        self.pow_int(&root, p)
    }

    fn root(
        &mut self,
        radicand: ExprId,
        index: Option<ExprId>,
        d: usize,
    ) -> Result<RatFn, FallbackError> {
        let value = self.convert(radicand, d)?;
        let k = match index {
            None => 2,
            Some(index) => {
                let index_value = self.convert(index, d)?;
                let k = index_value
                    .constant_value()
                    .filter(|c| c.is_integer() && c.is_positive())
                    .and_then(|c| c.numer().to_u32())
                    .filter(|k| *k <= self.budget.max_exponent);
                match k {
                    Some(k) => k,
                    None => {
                        let r = self.to_expr(&value);
                        let i = self.to_expr(&index_value);
                        let key = self.ctx.add(Expr::Sqrt(r, Some(i)));
                        return Ok(self.atom(key, None));
                    }
                }
            }
        };
        if k == 1 {
            return Ok(value);
        }
        self.nth_root(&value, k)
    }

    fn nth_root(&mut self, value: &RatFn, k: u32) -> Result<RatFn, FallbackError> {
        if let Some(c) = value.constant_value() {
            if let Some(r) = exact_root(&c, k) {
                return Ok(RatFn::constant(r));
            }
        }
        let radicand = self.to_expr(value);
        let key = if k == 2 {
            self.ctx.sqrt(radicand)
        } else {
            let index = self.ctx.num(i64::from(k));
            self.ctx.add(Expr::Sqrt(radicand, Some(index)))
        };
        Ok(self.atom(key, Some((k, value.clone()))))
    }

    fn function(&mut self, name: &str, args: &[ExprId], d: usize) -> Result<RatFn, FallbackError> {
        if args.is_empty() {
            return Err(FallbackError::Unsupported(format!("{}() without arguments", name)));
        }
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.convert(*arg, d)?);
        }
        match (name, values.as_slice()) {
            ("sin", [u]) => self.sin(u),
            ("cos", [u]) => self.cos(u),
            ("tan", [u]) => {
                let s = self.sin(u)?;
                let c = self.cos(u)?;
                self.div(&s, &c)
            }
            ("cot", [u]) => {
                let s = self.sin(u)?;
                let c = self.cos(u)?;
                self.div(&c, &s)
            }
            ("sec", [u]) => {
                let c = self.cos(u)?;
                self.div(&RatFn::one(), &c)
            }
            ("csc", [u]) => {
                let s = self.sin(u)?;
                self.div(&RatFn::one(), &s)
            }
            _ => {
                let arg_exprs: Vec<ExprId> = values.iter().map(|v| self.to_expr(v)).collect();
                let key = self.ctx.call(name, arg_exprs);
                Ok(self.atom(key, None))
            }
        }
    }

    fn trig_value(&mut self, value: TrigValue) -> Result<RatFn, FallbackError> {
        match value {
            TrigValue::Rational(r) => Ok(RatFn::constant(r)),
            TrigValue::Surd { coeff, radicand } => {
                let radicand = RatFn::constant(BigRational::from_integer(radicand.into()));
                let root = self.nth_root(&radicand, 2)?;
                self.mul(&RatFn::constant(coeff), &root)
            }
        }
    }

    /// Whether the normalized form of an argument starts with a minus sign.
    fn leads_negative(&self, arg: ExprId) -> bool {
        let numerator = match self.ctx.get(arg) {
            Expr::Frac(n, _) => *n,
            _ => arg,
        };
        flatten_add(self.ctx, numerator)
            .first()
            .is_some_and(|t| has_negative_coefficient(self.ctx, *t))
    }

    fn sin(&mut self, u: &RatFn) -> Result<RatFn, FallbackError> {
        if u.is_zero() {
            return Ok(RatFn::zero());
        }
        let arg = self.to_expr(u);
        if let Some(value) = special_angle_value(self.ctx, "sin", arg) {
            return self.trig_value(value);
        }
        if self.leads_negative(arg) {
            let flipped = self.neg(u);
            let s = self.sin(&flipped)?;
            return Ok(self.neg(&s));
        }
        let key = self.ctx.call("sin", vec![arg]);
        Ok(self.atom(key, None))
    }

    fn cos(&mut self, u: &RatFn) -> Result<RatFn, FallbackError> {
        if u.is_zero() {
            return Ok(RatFn::one());
        }
        let arg = self.to_expr(u);
        if let Some(value) = special_angle_value(self.ctx, "cos", arg) {
            return self.trig_value(value);
        }
        if self.leads_negative(arg) {
            let flipped = self.neg(u);
            return self.cos(&flipped);
        }
        let s = self.sin(u)?;
        let s2 = self.mul(&s, &s)?;
        let rule = self.sub(&RatFn::one(), &s2)?;
        let key = self.ctx.call("cos", vec![arg]);
        Ok(self.atom(key, Some((2, rule))))
    }

    // ---- output ----------------------------------------------------------

    /// Terms of `p` as `(factors, coefficient)`, factors ordered structurally,
    /// terms by total degree (highest first) then structurally.
    fn ordered_terms(&self, p: &Polynomial) -> Vec<(Vec<(ExprId, u32)>, BigRational)> {
        let ctx: &Context = self.ctx;
        let cmp_factor = |a: &(ExprId, u32), b: &(ExprId, u32)| {
            compare_expr(ctx, a.0, b.0).then_with(|| b.1.cmp(&a.1))
        };
        let mut terms: Vec<(Vec<(ExprId, u32)>, BigRational)> = p
            .terms()
            .map(|(mono, coeff)| {
                let mut factors: Vec<(ExprId, u32)> = mono
                    .iter()
                    .filter_map(|&(atom, exp)| self.atoms.get(atom as usize).map(|a| (a.expr, exp)))
                    .collect();
                factors.sort_by(|a, b| cmp_factor(a, b));
                (factors, coeff.clone())
            })
            .collect();
        terms.sort_by(|(a, _), (b, _)| {
            let degree = |f: &[(ExprId, u32)]| f.iter().map(|(_, e)| *e).sum::<u32>();
            degree(b).cmp(&degree(a)).then_with(|| {
                a.iter()
                    .zip(b.iter())
                    .map(|(x, y)| cmp_factor(x, y))
                    .find(|o| *o != Ordering::Equal)
                    .unwrap_or_else(|| a.len().cmp(&b.len()))
            })
        });
        terms
    }

    fn poly_expr(&mut self, p: &Polynomial) -> ExprId {
        let terms = self.ordered_terms(p);
        let mut out = Vec::with_capacity(terms.len());
        for (factors, coeff) in terms {
            let mut parts = Vec::with_capacity(factors.len());
            for (atom, exp) in factors {
                if exp == 1 {
                    parts.push(atom);
                } else {
                    let e = self.ctx.num(i64::from(exp));
                    parts.push(self.ctx.pow(atom, e));
                }
            }
            out.push(build_term(self.ctx, coeff, &parts));
        }
        build_sum(self.ctx, &out)
    }

    /// Deterministic expression for `f`: the denominator is scaled so its
    /// first term has coefficient 1.
    fn to_expr(&mut self, f: &RatFn) -> ExprId {
        if f.den.is_one() {
            return self.poly_expr(&f.num);
        }
        let lead = self
            .ordered_terms(&f.den)
            .into_iter()
            .next()
            .map(|(_, c)| c)
            .filter(|c| !c.is_zero())
            .unwrap_or_else(BigRational::one);
        let scale = lead.recip();
        let num = self.poly_expr(&f.num.scale(&scale));
        let den = f.den.scale(&scale);
        if den.is_one() {
            return num;
        }
        let den = self.poly_expr(&den);
        self.ctx.frac(num, den)
    }
}
