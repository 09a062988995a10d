use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::base::{self, BaseGroup};
use crate::cleaning::strip_white_space;
use crate::error::DcecError;
use crate::parser::Discovered;

/// Sort of a term whose sort is not known yet. Compatible with every sort.
pub const WILDCARD: &str = "?";

/// Prefix of internally generated binder names.
pub const QUANTIFIER_PREFIX: &str = "QUANT";

const MAX_SORT_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signature {
    pub ret: String,
    pub params: Vec<String>,
}

impl Signature {
    pub fn new(ret: impl Into<String>, params: Vec<String>) -> Self {
        Self {
            ret: ret.into(),
            params,
        }
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}) -> {}", self.params.join(", "), self.ret)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Namespace {
    sorts: BTreeMap<String, Vec<String>>,
    functions: BTreeMap<String, Vec<Signature>>,
    atomics: BTreeMap<String, String>,
    quantifiers: BTreeMap<String, String>,
    next_quantifier: usize,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }

    /// A namespace preloaded with every base vocabulary group.
    pub fn with_base() -> Result<Self, DcecError> {
        let mut ns = Self::new();
        base::load_groups(&mut ns, &BaseGroup::ALL)?;
        Ok(ns)
    }

    pub fn register_sort(&mut self, name: &str, parents: &[&str]) -> Result<(), DcecError> {
        for parent in parents {
            if !self.sorts.contains_key(*parent) {
                return Err(DcecError::UndeclaredParent {
                    sort: name.to_string(),
                    parent: parent.to_string(),
                });
            }
        }
        if self.sorts.contains_key(name) {
            return Ok(());
        }
        self.sorts.insert(
            name.to_string(),
            parents.iter().map(|p| p.to_string()).collect(),
        );
        Ok(())
    }

    pub fn register_atomic(&mut self, name: &str, sort: &str) -> Result<(), DcecError> {
        match self.atomics.get(name) {
            Some(existing) if existing != sort => Err(DcecError::AtomicConflict {
                name: name.to_string(),
                existing: existing.clone(),
                requested: sort.to_string(),
            }),
            Some(_) => Ok(()),
            None => {
                self.atomics.insert(name.to_string(), sort.to_string());
                Ok(())
            }
        }
    }

    pub fn register_function(&mut self, name: &str, ret: &str, params: &[&str]) {
        let sig = Signature::new(ret, params.iter().map(|p| p.to_string()).collect());
        self.add_signature(name, sig);
    }

    fn add_signature(&mut self, name: &str, sig: Signature) {
        let overloads = self.functions.entry(name.to_string()).or_default();
        if !overloads.contains(&sig) {
            overloads.push(sig);
        }
    }

    /// Whether `sort` can stand where `ancestor` is expected, and how many
    /// parent hops separate them along the shortest chain.
    ///
    /// The wildcard sort is compatible with everything at distance 0.
    pub fn is_compatible(&self, sort: &str, ancestor: &str) -> (bool, usize) {
        let mut path = Vec::new();
        self.compatible_at(sort, ancestor, 0, &mut path)
    }

    fn compatible_at(
        &self,
        sort: &str,
        ancestor: &str,
        level: usize,
        path: &mut Vec<String>,
    ) -> (bool, usize) {
        if sort == WILDCARD || sort == ancestor {
            return (true, level);
        }
        let Some(parents) = self.sorts.get(sort) else {
            return (false, level);
        };
        if parents.iter().any(|p| p == ancestor) {
            return (true, level + 1);
        }
        if level >= MAX_SORT_DEPTH || path.iter().any(|seen| seen == sort) {
            return (false, level);
        }

        path.push(sort.to_string());
        let best = parents
            .iter()
            .filter_map(|parent| {
                let (ok, distance) = self.compatible_at(parent, ancestor, level + 1, path);
                ok.then_some(distance)
            })
            .min();
        path.pop();

        match best {
            Some(distance) => (true, distance),
            None => (false, level),
        }
    }

    pub fn distance(&self, sort: &str, ancestor: &str) -> Option<usize> {
        match self.is_compatible(sort, ancestor) {
            (true, distance) => Some(distance),
            (false, _) => None,
        }
    }

    /// Compatible in either direction; used when two inferred sorts meet.
    pub fn related(&self, a: &str, b: &str) -> bool {
        self.is_compatible(a, b).0 || self.is_compatible(b, a).0
    }

    pub fn has_sort(&self, name: &str) -> bool {
        self.sorts.contains_key(name)
    }

    pub fn sort_parents(&self, name: &str) -> Option<&[String]> {
        self.sorts.get(name).map(Vec::as_slice)
    }

    pub fn sorts(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.sorts.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn overloads(&self, name: &str) -> &[Signature] {
        self.functions.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn functions(&self) -> impl Iterator<Item = (&str, &[Signature])> {
        self.functions.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn atomic_sort(&self, name: &str) -> Option<&str> {
        self.atomics.get(name).map(String::as_str)
    }

    pub fn atomics(&self) -> impl Iterator<Item = (&str, &str)> {
        self.atomics.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn surface_name(&self, internal: &str) -> Option<&str> {
        self.quantifiers.get(internal).map(String::as_str)
    }

    pub fn quantifier_names(&self) -> &BTreeMap<String, String> {
        &self.quantifiers
    }

    pub fn next_quantifier_index(&self) -> usize {
        self.next_quantifier
    }

    /// Whether an internal binder name is already taken by this namespace.
    pub fn name_in_use(&self, name: &str) -> bool {
        self.atomics.contains_key(name) || self.quantifiers.contains_key(name)
    }

    /// Reads one prototype line.
    ///
    /// - `typedef Name Parent...` declares a sort,
    /// - `Sort name` declares an atomic,
    /// - `ReturnSort name ParamSort...` declares a function signature.
    pub fn declare(&mut self, text: &str) -> Result<(), DcecError> {
        let flattened = text.replace(['(', ')'], " ");
        let cleaned = strip_white_space(&flattened);
        let words: Vec<&str> = cleaned.split(',').filter(|w| !w.is_empty()).collect();
        let invalid = |reason: &str| DcecError::InvalidPrototype {
            text: text.trim().to_string(),
            reason: reason.to_string(),
        };

        match words.as_slice() {
            [] => Err(invalid("empty prototype")),
            [keyword, rest @ ..] if keyword.eq_ignore_ascii_case("typedef") => match rest {
                [] => Err(invalid("typedef needs a sort name")),
                [name, parents @ ..] => self.register_sort(name, parents),
            },
            [a, b] => match (self.has_sort(a), self.has_sort(b)) {
                (true, false) => self.register_atomic(b, a),
                (false, true) => self.register_atomic(a, b),
                (true, true) => Err(invalid("both words are sorts")),
                (false, false) => Err(invalid("no declared sort given")),
            },
            [ret, name, params @ ..] => {
                if !self.has_sort(ret) {
                    return Err(invalid(&format!("return sort {ret} is not declared")));
                }
                if self.has_sort(name) {
                    return Err(invalid(&format!("{name} is a sort, not a function name")));
                }
                if let Some(unknown) = params.iter().find(|p| !self.has_sort(p)) {
                    return Err(invalid(&format!("parameter sort {unknown} is not declared")));
                }
                self.register_function(name, ret, params);
                Ok(())
            }
            [_] => Err(invalid("a single word declares nothing")),
        }
    }

    /// Merges the declarations discovered while parsing one statement.
    ///
    /// Everything is validated before anything is written, so a rejected
    /// statement leaves the namespace untouched.
    pub fn absorb(&mut self, discovered: &Discovered) -> Result<(), DcecError> {
        for (name, candidates) in &discovered.atomics {
            let Some(first) = candidates.first() else {
                continue;
            };
            if let Some(other) = candidates.iter().skip(1).find(|c| !self.related(first, c)) {
                return Err(DcecError::AtomicConflict {
                    name: name.clone(),
                    existing: first.clone(),
                    requested: other.clone(),
                });
            }
            if let Some(existing) = self.atomics.get(name) {
                if !self.related(existing, first) {
                    return Err(DcecError::AtomicConflict {
                        name: name.clone(),
                        existing: existing.clone(),
                        requested: first.clone(),
                    });
                }
            }
        }
        for (name, overloads) in &discovered.functions {
            if overloads.iter().any(|sig| sig.ret == WILDCARD) {
                return Err(DcecError::UnresolvedInlineReturnType(name.clone()));
            }
        }

        for (name, overloads) in &discovered.functions {
            for sig in overloads {
                self.add_signature(name, sig.clone());
            }
        }
        for (name, candidates) in &discovered.atomics {
            if self.functions.contains_key(name) || self.sorts.contains_key(name) {
                continue;
            }
            if let Some(first) = candidates.first() {
                self.atomics
                    .entry(name.clone())
                    .or_insert_with(|| first.clone());
            }
        }
        for (internal, surface) in discovered.quantifiers.internal_to_surface() {
            self.quantifiers.insert(internal.clone(), surface.clone());
        }
        self.next_quantifier = self.next_quantifier.max(discovered.next_quantifier);
        Ok(())
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, parents) in &self.sorts {
            if parents.is_empty() {
                writeln!(f, "sort {name}")?;
            } else {
                writeln!(f, "sort {name} < {}", parents.join(", "))?;
            }
        }
        for (name, overloads) in &self.functions {
            for sig in overloads {
                writeln!(f, "function {name} {sig}")?;
            }
        }
        for (name, sort) in &self.atomics {
            writeln!(f, "atomic {name}: {sort}")?;
        }
        for (internal, surface) in &self.quantifiers {
            writeln!(f, "binder {internal} = {surface}")?;
        }
        Ok(())
    }
}
