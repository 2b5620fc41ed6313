#![forbid(unsafe_code)]

//! SSA-versioned program variables and the mapping from program types to
//! solver sorts.

use chc_ast::TypeName;
use chc_smt::{Sort, Term};

/// A program variable whose versions are `<name>_<index>`. New versions
/// always take the next unused index, even after the current one was moved
/// back with [`SymbolicVariable::set_index`].
#[derive(Clone, Debug)]
pub struct SymbolicVariable {
    unique_name: String,
    ty: TypeName,
    sort: Sort,
    index: u32,
    next_free: u32,
}

impl SymbolicVariable {
    pub fn new(unique_name: impl Into<String>, ty: TypeName) -> Self {
        let sort = sort_of(&ty);
        Self {
            unique_name: unique_name.into(),
            ty,
            sort,
            index: 0,
            next_free: 1,
        }
    }

    pub fn ty(&self) -> &TypeName {
        &self.ty
    }

    pub fn sort(&self) -> &Sort {
        &self.sort
    }

    pub fn current_value(&self) -> Term {
        self.value_at_index(self.index)
    }

    pub fn value_at_index(&self, index: u32) -> Term {
        Term::var(format!("{}_{}", self.unique_name, index), self.sort.clone())
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn set_index(&mut self, index: u32) {
        self.index = index;
    }

    pub fn increase_index(&mut self) -> Term {
        self.index = self.next_free;
        self.next_free += 1;
        self.current_value()
    }

    pub fn reset_index(&mut self) {
        self.index = 0;
        self.next_free = 1;
    }
}

pub fn sort_of(ty: &TypeName) -> Sort {
    match ty {
        TypeName::Bool => Sort::Bool,
        TypeName::Uint { .. } | TypeName::Int { .. } | TypeName::Address | TypeName::FixedBytes { .. } => Sort::Int,
        TypeName::Mapping { key, value } => Sort::array(sort_of(key), sort_of(value)),
        TypeName::Array { base, .. } => Sort::array(Sort::Int, sort_of(base)),
        TypeName::String | TypeName::Bytes => Sort::array(Sort::Int, Sort::Int),
    }
}

pub fn zero_value(sort: &Sort) -> Term {
    match sort {
        Sort::Bool => Term::bool(false),
        Sort::Int => Term::int(0),
        Sort::Array(_, value) => Term::const_array(sort.clone(), zero_value(value)),
    }
}

/// Range constraint satisfied by any value of `ty`; `true` for types without one.
pub fn type_constraints(ty: &TypeName, value: &Term) -> Term {
    let (lo, hi) = match ty {
        TypeName::Uint { bits } => (Term::int(0), pow2_minus_one(u32::from(*bits))),
        TypeName::Address => (Term::int(0), pow2_minus_one(160)),
        TypeName::FixedBytes { size } => (Term::int(0), pow2_minus_one(8 * u32::from(*size))),
        TypeName::Int { bits } => {
            let half = u32::from(*bits).saturating_sub(1);
            (Term::neg(pow2(half)), pow2_minus_one(half))
        }
        _ => return Term::tt(),
    };
    Term::and([Term::le(lo, value.clone()), Term::le(value.clone(), hi)])
}

fn pow2(n: u32) -> Term {
    if n < 126 {
        Term::int(1i128 << n)
    } else {
        Term::Numeral(pow2_decimal(n))
    }
}

fn pow2_minus_one(n: u32) -> Term {
    if n < 126 {
        Term::int((1i128 << n) - 1)
    } else {
        let mut digits = pow2_decimal(n).into_bytes();
        // 2^n for n >= 1 never ends in 0.
        if let Some(last) = digits.last_mut() {
            *last -= 1;
        }
        Term::Numeral(String::from_utf8_lossy(&digits).into_owned())
    }
}

/// Decimal text of `2^n`.
pub fn pow2_decimal(n: u32) -> String {
    // Little-endian decimal digits.
    let mut digits = vec![1u8];
    for _ in 0..n {
        let mut carry = 0u8;
        for d in digits.iter_mut() {
            let v = *d * 2 + carry;
            *d = v % 10;
            carry = v / 10;
        }
        if carry > 0 {
            digits.push(carry);
        }
    }
    digits.iter().rev().map(|d| char::from(b'0' + d)).collect()
}
