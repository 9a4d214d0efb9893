//! Sparse multivariate polynomials over Q.
//!
//! Variables are atom indices handed out by the backend. A monomial is the
//! list of `(atom, exponent)` pairs with non-zero exponents, sorted by atom.

use crate::error::FallbackError;
use num_rational::BigRational;
use num_traits::{One, Zero};
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

pub type AtomIdx = u32;
pub type Monomial = SmallVec<[(AtomIdx, u32); 4]>;

/// Limits to avoid explosion during arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolyBudget {
    pub max_terms: usize,
    pub max_exponent: u32,
}

impl Default for PolyBudget {
    fn default() -> Self {
        Self {
            max_terms: 256,
            max_exponent: 32,
        }
    }
}

impl PolyBudget {
    fn check_terms(&self, terms: usize) -> Result<(), FallbackError> {
        if terms > self.max_terms {
            return Err(FallbackError::BudgetExceeded(format!(
                "{} terms (limit {})",
                terms, self.max_terms
            )));
        }
        Ok(())
    }

    pub fn check_exponent(&self, exp: u64) -> Result<(), FallbackError> {
        if exp > u64::from(self.max_exponent) {
            return Err(FallbackError::BudgetExceeded(format!(
                "exponent {} (limit {})",
                exp, self.max_exponent
            )));
        }
        Ok(())
    }
}

/// Sum of `coefficient * monomial` with no zero coefficients.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Polynomial {
    terms: BTreeMap<Monomial, BigRational>,
}

fn mono_mul(a: &Monomial, b: &Monomial) -> Monomial {
    let mut out = Monomial::new();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            Ordering::Less => {
                out.push(a[i]);
                i += 1;
            }
            Ordering::Greater => {
                out.push(b[j]);
                j += 1;
            }
            Ordering::Equal => {
                out.push((a[i].0, a[i].1 + b[j].1));
                i += 1;
                j += 1;
            }
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
    out
}

/// `a / b` when every exponent of `b` is covered by `a`.
fn mono_div(a: &Monomial, b: &Monomial) -> Option<Monomial> {
    let mut out = Monomial::new();
    let mut j = 0;
    for &(atom, exp) in a {
        if j < b.len() && b[j].0 < atom {
            return None;
        }
        if j < b.len() && b[j].0 == atom {
            match exp.cmp(&b[j].1) {
                Ordering::Less => return None,
                Ordering::Equal => {}
                Ordering::Greater => out.push((atom, exp - b[j].1)),
            }
            j += 1;
        } else {
            out.push((atom, exp));
        }
    }
    (j == b.len()).then_some(out)
}

/// Lexicographic order on dense exponent vectors: the first atom where the
/// exponents differ decides, larger exponent is greater.
fn lex_cmp(a: &Monomial, b: &Monomial) -> Ordering {
    let (mut i, mut j) = (0, 0);
    loop {
        match (a.get(i), b.get(j)) {
            (None, None) => return Ordering::Equal,
            (Some(_), None) => return Ordering::Greater,
            (None, Some(_)) => return Ordering::Less,
            (Some(&(xa, ea)), Some(&(xb, eb))) => match xa.cmp(&xb) {
                Ordering::Less => return Ordering::Greater,
                Ordering::Greater => return Ordering::Less,
                Ordering::Equal => match ea.cmp(&eb) {
                    Ordering::Equal => {
                        i += 1;
                        j += 1;
                    }
                    other => return other,
                },
            },
        }
    }
}

impl Polynomial {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn one() -> Self {
        Self::constant(BigRational::one())
    }

    pub fn constant(c: BigRational) -> Self {
        let mut terms = BTreeMap::new();
        if !c.is_zero() {
            terms.insert(Monomial::new(), c);
        }
        Self { terms }
    }

    pub fn atom(idx: AtomIdx) -> Self {
        Self::monomial(BigRational::one(), Monomial::from_slice(&[(idx, 1)]))
    }

    pub fn monomial(coeff: BigRational, mono: Monomial) -> Self {
        let mut terms = BTreeMap::new();
        if !coeff.is_zero() {
            terms.insert(mono, coeff);
        }
        Self { terms }
    }

    pub fn is_zero(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn is_one(&self) -> bool {
        self.constant_value().is_some_and(|c| c.is_one())
    }

    pub fn num_terms(&self) -> usize {
        self.terms.len()
    }

    /// Value of a constant polynomial (zero included).
    pub fn constant_value(&self) -> Option<BigRational> {
        match self.terms.len() {
            0 => Some(BigRational::zero()),
            1 => self.terms.get(&Monomial::new()).cloned(),
            _ => None,
        }
    }

    pub fn terms(&self) -> impl Iterator<Item = (&Monomial, &BigRational)> {
        self.terms.iter()
    }

    fn add_term(&mut self, mono: Monomial, coeff: BigRational) {
        if coeff.is_zero() {
            return;
        }
        match self.terms.entry(mono) {
            Entry::Vacant(slot) => {
                slot.insert(coeff);
            }
            Entry::Occupied(mut slot) => {
                *slot.get_mut() += coeff;
                if slot.get().is_zero() {
                    slot.remove();
                }
            }
        }
    }

    pub fn add(&self, other: &Self, budget: &PolyBudget) -> Result<Self, FallbackError> {
        let mut out = self.clone();
        for (mono, coeff) in &other.terms {
            out.add_term(mono.clone(), coeff.clone());
        }
        budget.check_terms(out.num_terms())?;
        Ok(out)
    }

    pub fn neg(&self) -> Self {
        self.scale(&-BigRational::one())
    }

    pub fn sub(&self, other: &Self, budget: &PolyBudget) -> Result<Self, FallbackError> {
        self.add(&other.neg(), budget)
    }

    pub fn scale(&self, k: &BigRational) -> Self {
        if k.is_zero() {
            return Self::zero();
        }
        Self {
            terms: self
                .terms
                .iter()
                .map(|(m, c)| (m.clone(), c * k))
                .collect(),
        }
    }

    pub fn mul(&self, other: &Self, budget: &PolyBudget) -> Result<Self, FallbackError> {
        let mut out = Self::zero();
        for (ma, ca) in &self.terms {
            for (mb, cb) in &other.terms {
                let mono = mono_mul(ma, mb);
                for &(_, exp) in &mono {
                    budget.check_exponent(u64::from(exp))?;
                }
                out.add_term(mono, ca * cb);
            }
        }
        budget.check_terms(out.num_terms())?;
        Ok(out)
    }

    pub fn pow(&self, exp: u32, budget: &PolyBudget) -> Result<Self, FallbackError> {
        budget.check_exponent(u64::from(exp))?;
        let mut result = Self::one();
        let mut base = self.clone();
        let mut e = exp;
        while e > 0 {
            if e & 1 == 1 {
                result = result.mul(&base, budget)?;
            }
            e >>= 1;
            if e > 0 {
                base = base.mul(&base, budget)?;
            }
        }
        Ok(result)
    }

    /// Largest monomial dividing every term.
    pub fn monomial_content(&self) -> Monomial {
        let mut iter = self.terms.keys();
        let Some(first) = iter.next() else {
            return Monomial::new();
        };
        let mut gcd = first.clone();
        for mono in iter {
            gcd = gcd
                .iter()
                .filter_map(|&(atom, exp)| {
                    mono.iter()
                        .find(|(a, _)| *a == atom)
                        .map(|&(_, e)| (atom, exp.min(e)))
                })
                .collect();
            if gcd.is_empty() {
                break;
            }
        }
        gcd
    }

    pub fn div_monomial(&self, mono: &Monomial) -> Option<Self> {
        let mut terms = BTreeMap::new();
        for (m, c) in &self.terms {
            terms.insert(mono_div(m, mono)?, c.clone());
        }
        Some(Self { terms })
    }

    fn leading_term(&self) -> Option<(&Monomial, &BigRational)> {
        self.terms.iter().max_by(|a, b| lex_cmp(a.0, b.0))
    }

    /// Quotient when `divisor` divides `self` exactly.
    pub fn div_exact(&self, divisor: &Self, budget: &PolyBudget) -> Option<Self> {
        let (lead_mono, lead_coeff) = divisor.leading_term()?;
        let (lead_mono, lead_coeff) = (lead_mono.clone(), lead_coeff.clone());
        let mut quotient = Self::zero();
        let mut remainder = self.clone();
        let mut steps = 0;
        while let Some((mono, coeff)) = remainder.leading_term() {
            steps += 1;
            if steps > budget.max_terms * 4 {
                return None;
            }
            let q_mono = mono_div(mono, &lead_mono)?;
            let q_coeff = coeff / &lead_coeff;
            let step = Self::monomial(q_coeff, q_mono);
            remainder = remainder.sub(&step.mul(divisor, budget).ok()?, budget).ok()?;
            quotient = quotient.add(&step, budget).ok()?;
        }
        Some(quotient)
    }

    pub fn total_degree(mono: &Monomial) -> u32 {
        mono.iter().map(|(_, e)| *e).sum()
    }

    pub fn atoms(&self) -> impl Iterator<Item = AtomIdx> + '_ {
        self.terms.keys().flat_map(|m| m.iter().map(|(a, _)| *a))
    }
}
