#![forbid(unsafe_code)]

use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Sort {
    Bool,
    Int,
    Array(Box<Sort>, Box<Sort>),
}

impl Sort {
    pub fn array(key: Sort, value: Sort) -> Self {
        Sort::Array(Box::new(key), Box::new(value))
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sort::Bool => f.write_str("Bool"),
            Sort::Int => f.write_str("Int"),
            Sort::Array(k, v) => write!(f, "(Array {k} {v})"),
        }
    }
}

/// Uninterpreted relation: an ordered argument signature with a Bool codomain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Relation {
    pub name: String,
    pub domain: Vec<Sort>,
}

impl Relation {
    pub fn new(name: impl Into<String>, domain: Vec<Sort>) -> Self {
        Self {
            name: name.into(),
            domain,
        }
    }

    pub fn arity(&self) -> usize {
        self.domain.len()
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(declare-fun {} (", self.name)?;
        for (i, s) in self.domain.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{s}")?;
        }
        f.write_str(") Bool)")
    }
}
