use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::cleaning;
use crate::config::ParseOptions;
use crate::diagnostics::Diagnostic;
use crate::error::DcecError;
use crate::namespace::{Namespace, QUANTIFIER_PREFIX, Signature, WILDCARD};
use crate::prenex::{self, Bindings, Quantifier};
use crate::token::{Arg, Token};

const SYNONYMS: &[(&str, &str)] = &[
    ("ifAndOnlyIf", "iff"),
    ("if", "implies"),
    ("Time", "Moment"),
    ("forall", "forAll"),
    ("Forall", "forAll"),
    ("ForAll", "forAll"),
    ("Exists", "exists"),
];

/// Functions whose `Fluent` parameters also accept these nested terms.
const FLUENT_FUNCTIONS: &[&str] = &[
    "action",
    "initially",
    "holds",
    "happens",
    "clipped",
    "initiates",
    "terminates",
    "prior",
    "interval",
    "self",
    "payoff",
];

struct OperatorClass {
    keywords: &'static [&'static str],
    sort: &'static str,
}

/// Folded strictly left to right, one class after another.
const OPERATOR_CLASSES: [OperatorClass; 3] = [
    OperatorClass {
        keywords: &["not", "and", "or", "xor", "implies", "iff", "tautology"],
        sort: "Boolean",
    },
    OperatorClass {
        keywords: &["negate", "exponent", "multiply", "divide", "add", "sub"],
        sort: "Numeric",
    },
    OperatorClass {
        keywords: &["union", "intersection"],
        sort: "Set",
    },
];

const UNARY_OPERATORS: [&str; 2] = ["not", "negate"];

/// Declarations inferred while parsing one statement. Nothing here reaches
/// a [`Namespace`] until it is passed to [`Namespace::absorb`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Discovered {
    /// Candidate sorts per atomic; the first entry is authoritative.
    pub atomics: BTreeMap<String, Vec<String>>,
    pub functions: BTreeMap<String, Vec<Signature>>,
    pub quantifiers: Bindings,
    pub next_quantifier: usize,
}

impl Discovered {
    pub fn is_empty(&self) -> bool {
        self.atomics.is_empty() && self.functions.is_empty() && self.quantifiers.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Parsed {
    Empty,
    Leaf(String),
    Node(Token),
}

impl Parsed {
    pub fn is_empty(&self) -> bool {
        matches!(self, Parsed::Empty)
    }

    pub fn as_arg(&self) -> Option<Arg> {
        match self {
            Parsed::Empty => None,
            Parsed::Leaf(name) => Some(Arg::Leaf(name.clone())),
            Parsed::Node(token) => Some(Arg::Node(token.clone())),
        }
    }
}

impl From<Arg> for Parsed {
    fn from(arg: Arg) -> Self {
        match arg {
            Arg::Leaf(name) => Parsed::Leaf(name),
            Arg::Node(token) => Parsed::Node(token),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseOutcome {
    pub tree: Parsed,
    /// Quantifiers in prenex order, outermost first.
    pub quantifiers: Vec<Quantifier>,
    pub discovered: Discovered,
    pub warnings: Vec<Diagnostic>,
}

pub fn parse_statement(text: &str, ns: &Namespace) -> Result<ParseOutcome, DcecError> {
    parse_statement_with(text, ns, &ParseOptions::default())
}

pub fn parse_statement_with(
    text: &str,
    ns: &Namespace,
    options: &ParseOptions,
) -> Result<ParseOutcome, DcecError> {
    let mut resolver = Resolver::new(ns, options);
    let Some(normalized) = cleaning::normalize(text, &options.comment_markers)? else {
        return Ok(resolver.finish(Parsed::Empty));
    };

    let body = resolver.parse_level(&normalized, 0)?.into_arg();
    resolver.check_depth(body.depth() + resolver.quantifiers.len())?;
    let tree = prenex::reassemble(body, &resolver.quantifiers);

    for (name, overloads) in &resolver.discovered.functions {
        if overloads.iter().any(|sig| sig.ret == WILDCARD) {
            return Err(DcecError::UnresolvedInlineReturnType(name.clone()));
        }
    }
    Ok(resolver.finish(Parsed::from(tree)))
}

#[derive(Debug, Clone)]
enum Item {
    Word(String),
    Group(usize),
}

/// A resolved argument at one level.
#[derive(Debug, Clone)]
enum Term {
    Word(String),
    Node {
        token: Token,
        sort: String,
        params: Vec<String>,
    },
}

impl Term {
    fn node(token: Token, sort: &str, params: Vec<String>) -> Self {
        Term::Node {
            token,
            sort: sort.to_string(),
            params,
        }
    }

    fn as_word(&self) -> Option<&str> {
        match self {
            Term::Word(w) => Some(w),
            Term::Node { .. } => None,
        }
    }

    fn is_word_in(&self, words: &[&str]) -> bool {
        self.as_word().is_some_and(|w| words.contains(&w))
    }

    fn into_arg(self) -> Arg {
        match self {
            Term::Word(w) => Arg::Leaf(w),
            Term::Node { token, .. } => Arg::Node(token),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Word(w) => f.write_str(w),
            Term::Node { token, .. } => f.write_str(token.s_expression()),
        }
    }
}

struct Resolver<'a> {
    ns: &'a Namespace,
    options: &'a ParseOptions,
    discovered: Discovered,
    quantifiers: Vec<Quantifier>,
    warnings: Vec<Diagnostic>,
    next_quantifier: usize,
}

impl<'a> Resolver<'a> {
    fn new(ns: &'a Namespace, options: &'a ParseOptions) -> Self {
        Self {
            ns,
            options,
            discovered: Discovered::default(),
            quantifiers: Vec::new(),
            warnings: Vec::new(),
            next_quantifier: ns.next_quantifier_index(),
        }
    }

    fn finish(mut self, tree: Parsed) -> ParseOutcome {
        self.discovered.next_quantifier = self.next_quantifier;
        ParseOutcome {
            tree,
            quantifiers: self.quantifiers,
            discovered: self.discovered,
            warnings: self.warnings,
        }
    }

    fn warn(&mut self, code: &'static str, message: String) {
        tracing::warn!(code, "{message}");
        self.warnings.push(Diagnostic::warning(code, message));
    }

    fn check_depth(&self, depth: usize) -> Result<(), DcecError> {
        if depth > self.options.max_depth {
            return Err(DcecError::RecursionLimit(self.options.max_depth));
        }
        Ok(())
    }

    /// Builds a node; every node goes through here so that no tree deeper
    /// than `max_depth` is ever assembled.
    fn node(&self, token: Token, sort: &str, params: Vec<String>) -> Result<Term, DcecError> {
        self.check_depth(token.depth())?;
        Ok(Term::node(token, sort, params))
    }

    fn is_function(&self, name: &str) -> bool {
        self.ns.has_function(name) || self.discovered.functions.contains_key(name)
    }

    fn atomic_sort(&self, name: &str) -> Option<String> {
        self.ns
            .atomic_sort(name)
            .map(str::to_string)
            .or_else(|| {
                self.discovered
                    .atomics
                    .get(name)
                    .and_then(|sorts| sorts.first().cloned())
            })
            .filter(|sort| sort != WILDCARD)
    }

    fn sort_of(&self, term: &Term) -> Option<String> {
        match term {
            Term::Word(w) => self.atomic_sort(w),
            Term::Node { sort, .. } if sort != WILDCARD => Some(sort.clone()),
            Term::Node { .. } => None,
        }
    }

    fn is_a(&self, sort: &str, ancestor: &str) -> bool {
        self.ns.is_compatible(sort, ancestor).0
    }

    fn tag(&mut self, term: &Term, sort: &str) {
        if let Term::Word(w) = term {
            self.discovered
                .atomics
                .entry(w.clone())
                .or_default()
                .push(sort.to_string());
        }
    }

    fn fresh_binder(&mut self) -> String {
        loop {
            let name = format!("{QUANTIFIER_PREFIX}{}", self.next_quantifier);
            self.next_quantifier += 1;
            if !self.ns.name_in_use(&name) && !self.discovered.atomics.contains_key(&name) {
                return name;
            }
        }
    }

    fn parse_level(&mut self, text: &str, depth: usize) -> Result<Term, DcecError> {
        self.check_depth(depth)?;
        let inner = text
            .strip_prefix('(')
            .and_then(|t| t.strip_suffix(')'))
            .unwrap_or(text)
            .trim_matches(',');
        if inner.is_empty() {
            return Err(DcecError::MalformedExpression(
                "empty sub-expression `()`".to_string(),
            ));
        }

        let (items, groups) = split_level(inner);
        let items = self.replace_synonyms(items);
        let items = self.extract_quantifiers(items, &groups, depth)?;

        let mut terms = Vec::with_capacity(items.len());
        for item in items {
            match item {
                Item::Word(w) => terms.push(Term::Word(w)),
                Item::Group(g) => terms.push(self.parse_level(groups[g], depth + 1)?),
            }
        }

        self.assign_sorts(&mut terms)?;
        self.disambiguate(&mut terms)?;
        self.check_prenex(&terms);
        for class in &OPERATOR_CLASSES {
            self.fold_class(&mut terms, class)?;
        }
        self.resolve(terms, depth)
    }

    fn replace_synonyms(&mut self, items: Vec<Item>) -> Vec<Item> {
        items
            .into_iter()
            .map(|item| match item {
                Item::Word(w) => match SYNONYMS.iter().find(|(from, _)| *from == w) {
                    Some((from, to)) => {
                        self.warn(
                            "W-SYNONYM",
                            format!("replaced the common misspelling {from} with {to}"),
                        );
                        Item::Word(to.to_string())
                    }
                    None => Item::Word(w),
                },
                group => group,
            })
            .collect()
    }

    fn extract_quantifiers(
        &mut self,
        items: Vec<Item>,
        groups: &[&str],
        depth: usize,
    ) -> Result<Vec<Item>, DcecError> {
        let mut out = Vec::with_capacity(items.len());
        let mut last_keyword = None;
        let mut i = 0usize;

        while i < items.len() {
            let keyword = match &items[i] {
                Item::Word(w) if prenex::is_quantifier(w) => w.clone(),
                Item::Word(w) => {
                    let word = self.discovered.quantifiers.internal(w).unwrap_or(w.as_str());
                    out.push(Item::Word(word.to_string()));
                    i += 1;
                    continue;
                }
                Item::Group(g) => {
                    out.push(Item::Group(*g));
                    i += 1;
                    continue;
                }
            };
            i += 1;

            let variables: Vec<String> = match items.get(i) {
                None => {
                    return Err(DcecError::MalformedQuantifier {
                        keyword,
                        reason: "no bound variable follows it".to_string(),
                    });
                }
                Some(Item::Group(g)) => {
                    let list = groups[*g].trim_start_matches('(').trim_end_matches(')');
                    if list.contains(['(', ')']) {
                        return Err(DcecError::MalformedQuantifier {
                            keyword,
                            reason: format!("bound variables must be plain names, got {}", groups[*g]),
                        });
                    }
                    i += 1;
                    list.split(',')
                        .filter(|w| !w.is_empty())
                        .map(str::to_string)
                        .collect()
                }
                Some(Item::Word(first)) if first.starts_with('[') => {
                    let mut names = Vec::new();
                    loop {
                        let Some(Item::Word(w)) = items.get(i) else {
                            return Err(DcecError::MalformedQuantifier {
                                keyword,
                                reason: "unclosed `[` in the variable list".to_string(),
                            });
                        };
                        i += 1;
                        let closed = w.ends_with(']');
                        let name = w.trim_start_matches('[').trim_end_matches(']');
                        if !name.is_empty() {
                            names.push(name.to_string());
                        }
                        if closed {
                            break;
                        }
                    }
                    names
                }
                Some(Item::Word(first)) if self.ns.has_sort(first) => match items.get(i + 1) {
                    Some(Item::Word(var)) => {
                        i += 2;
                        vec![first.clone(), var.clone()]
                    }
                    _ => {
                        return Err(DcecError::MalformedQuantifier {
                            keyword,
                            reason: format!("sort {first} is not followed by a variable"),
                        });
                    }
                },
                Some(Item::Word(var)) => {
                    i += 1;
                    vec![var.clone()]
                }
            };

            self.bind_variables(&keyword, &variables, depth)?;
            last_keyword = Some(keyword);
        }

        if let Some(keyword) = last_keyword {
            if out.is_empty() {
                return Err(DcecError::MalformedQuantifier {
                    keyword,
                    reason: "the quantifier has no body".to_string(),
                });
            }
        }
        Ok(out)
    }

    /// Binds each variable of a list such as `Agent x y` to a fresh name;
    /// a sort applies to the variable right after it. Each quantifier wraps
    /// the whole statement, so it counts as one more level of nesting.
    fn bind_variables(
        &mut self,
        keyword: &str,
        words: &[String],
        depth: usize,
    ) -> Result<(), DcecError> {
        let mut pending_sort: Option<&str> = None;
        let mut bound = 0usize;
        for word in words {
            if self.ns.has_sort(word) {
                pending_sort = Some(word.as_str());
                continue;
            }
            let internal = self.fresh_binder();
            if let Some(sort) = pending_sort.take() {
                self.discovered
                    .atomics
                    .insert(internal.clone(), vec![sort.to_string()]);
            }
            tracing::debug!(keyword, variable = %word, binder = %internal, "bound quantified variable");
            self.discovered.quantifiers.bind(word, &internal);
            self.quantifiers.push(Quantifier::new(keyword, internal));
            self.check_depth(self.quantifiers.len() + depth)?;
            bound += 1;
        }
        if let Some(sort) = pending_sort {
            return Err(DcecError::MalformedQuantifier {
                keyword: keyword.to_string(),
                reason: format!("sort {sort} is not followed by a variable"),
            });
        }
        if bound == 0 {
            return Err(DcecError::MalformedQuantifier {
                keyword: keyword.to_string(),
                reason: "no bound variable follows it".to_string(),
            });
        }
        Ok(())
    }

    /// Applies inline annotations such as `Agent john` and removes the
    /// sort words from the level.
    fn assign_sorts(&mut self, terms: &mut Vec<Term>) -> Result<(), DcecError> {
        for i in 0..terms.len() {
            let Some(sort) = terms[i].as_word().filter(|w| self.ns.has_sort(w)) else {
                continue;
            };
            let sort = sort.to_string();
            let next = terms
                .get(i + 1)
                .map(|t| t.as_word().map(str::to_string));
            match next {
                None => {
                    return Err(DcecError::InvalidSortAnnotation {
                        sort,
                        reason: "nothing follows it".to_string(),
                    });
                }
                Some(Some(next)) if self.ns.has_sort(&next) || self.ns.has_function(&next) => {
                    return Err(DcecError::InvalidSortAnnotation {
                        sort,
                        reason: format!("{next} is a sort or a declared function"),
                    });
                }
                Some(Some(next)) => {
                    self.discovered.atomics.insert(next, vec![sort]);
                }
                Some(None) => self.annotate_node(&mut terms[i + 1], &sort)?,
            }
        }
        terms.retain(|t| !t.as_word().is_some_and(|w| self.ns.has_sort(w)));
        Ok(())
    }

    fn annotate_node(&mut self, term: &mut Term, annotation: &str) -> Result<(), DcecError> {
        let Term::Node { token, sort, params } = term else {
            return Ok(());
        };
        if sort.as_str() != WILDCARD {
            if self.is_a(sort, annotation) {
                return Ok(());
            }
            return Err(DcecError::InvalidSortAnnotation {
                sort: annotation.to_string(),
                reason: format!("{} returns {sort}", token.name()),
            });
        }
        if let Some(sig) = self
            .discovered
            .functions
            .get_mut(token.name())
            .and_then(|sigs| {
                sigs.iter_mut()
                    .find(|sig| sig.ret == WILDCARD && sig.params == *params)
            })
        {
            sig.ret = annotation.to_string();
            tracing::debug!(function = token.name(), ret = annotation, "inline return sort given");
        }
        *sort = annotation.to_string();
        Ok(())
    }

    fn disambiguate(&mut self, terms: &mut [Term]) -> Result<(), DcecError> {
        if terms.len() == 1 {
            return Ok(());
        }
        for i in 0..terms.len() {
            let Some(symbol) = terms[i].as_word().map(str::to_string) else {
                continue;
            };
            let left = if i > 0 { self.sort_of(&terms[i - 1]) } else { None };
            let right = terms.get(i + 1).and_then(|t| self.sort_of(t));
            let ambiguous = |reason: String| DcecError::AmbiguousOperator {
                symbol: symbol.clone(),
                reason,
            };

            match symbol.as_str() {
                "*" => {
                    if i == 0 {
                        terms[i] = Term::Word("multiply".to_string());
                        continue;
                    }
                    match left {
                        Some(sort) if self.is_a(&sort, "Agent") => {
                            terms.swap(i - 1, i);
                            terms[i - 1] = Term::Word("self".to_string());
                        }
                        Some(sort) if self.is_a(&sort, "Numeric") => {
                            terms[i] = Term::Word("multiply".to_string());
                        }
                        Some(sort) => {
                            return Err(ambiguous(format!(
                                "operands of sort {sort} fit neither self nor multiply"
                            )));
                        }
                        None => {
                            return Err(ambiguous(
                                "it reads as self or multiply; give the left operand a sort"
                                    .to_string(),
                            ));
                        }
                    }
                }
                "-" => {
                    let resolved = if i == 0 {
                        "negate"
                    } else {
                        match (left, right) {
                            (Some(l), _) if !self.is_a(&l, "Numeric") => "negate",
                            (Some(_), Some(r)) if self.is_a(&r, "Numeric") => "sub",
                            (Some(_), Some(r)) => {
                                return Err(ambiguous(format!("it does not take {r} operands")));
                            }
                            (None, _)
                                if terms[i - 1].as_word().is_some_and(|w| self.is_function(w)) =>
                            {
                                "negate"
                            }
                            _ => {
                                return Err(ambiguous(
                                    "it reads as sub or negate; give the operands a sort"
                                        .to_string(),
                                ));
                            }
                        }
                    };
                    terms[i] = Term::Word(resolved.to_string());
                }
                "&" | "|" => {
                    let (boolean, set) = if symbol == "&" {
                        ("and", "union")
                    } else {
                        ("or", "intersection")
                    };
                    let resolved = match right {
                        Some(r) if self.is_a(&r, "Boolean") => boolean,
                        Some(r) if self.is_a(&r, "Set") => set,
                        Some(r) => {
                            return Err(ambiguous(format!("it does not take {r} operands")));
                        }
                        None => {
                            return Err(ambiguous(format!(
                                "it reads as {boolean} or {set}; give the right operand a sort"
                            )));
                        }
                    };
                    terms[i] = Term::Word(resolved.to_string());
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn check_prenex(&mut self, terms: &[Term]) {
        let stray = terms
            .iter()
            .filter_map(Term::as_word)
            .find(|w| self.discovered.quantifiers.is_bound_surface(w))
            .map(str::to_string);
        if let Some(word) = stray {
            self.warn(
                "W-PRENEX",
                format!(
                    "{word} is used outside the scope of its quantifier; write the statement in prenex form with unique variable names"
                ),
            );
        }
    }

    fn fold_class(&mut self, terms: &mut Vec<Term>, class: &OperatorClass) -> Result<(), DcecError> {
        if terms.len() < 3 || !terms[terms.len() - 2].is_word_in(class.keywords) {
            return Ok(());
        }
        if class.keywords.contains(&"not") {
            let ambiguous_not = terms.iter().enumerate().any(|(i, t)| {
                t.as_word() == Some("not")
                    && i + 2 < terms.len()
                    && !terms[i + 1].is_word_in(class.keywords)
            });
            if ambiguous_not {
                self.warn(
                    "W-NOT",
                    "ambiguous not: operators are read left to right; use prefix notation or parentheses"
                        .to_string(),
                );
            }
        }

        for keyword in class.keywords {
            let unary = UNARY_OPERATORS.contains(keyword);
            loop {
                let found = terms.iter().enumerate().position(|(i, t)| {
                    t.as_word() == Some(*keyword)
                        && !(unary
                            && terms
                                .get(i + 1)
                                .is_some_and(|next| next.is_word_in(class.keywords)))
                });
                let Some(idx) = found else {
                    break;
                };

                if unary {
                    let Some(operand) = terms.get(idx + 1).cloned() else {
                        return Err(DcecError::MalformedExpression(format!(
                            "{keyword} has no operand"
                        )));
                    };
                    self.tag(&operand, class.sort);
                    let token = Token::new(*keyword, vec![operand.into_arg()]);
                    terms.remove(idx + 1);
                    terms[idx] = self.node(token, class.sort, vec![class.sort.to_string()])?;
                    continue;
                }

                if idx == 0 {
                    break;
                }
                let Some(right) = terms.get(idx + 1).cloned() else {
                    return Err(DcecError::MalformedExpression(format!(
                        "{keyword} has no right operand"
                    )));
                };
                let left = terms[idx - 1].clone();
                self.tag(&left, class.sort);
                self.tag(&right, class.sort);
                let token = Token::new(*keyword, vec![left.into_arg(), right.into_arg()]);
                let params = vec![class.sort.to_string(), class.sort.to_string()];
                terms.remove(idx + 1);
                terms.remove(idx);
                terms[idx - 1] = self.node(token, class.sort, params)?;
            }
        }
        Ok(())
    }

    fn resolve(&mut self, mut terms: Vec<Term>, depth: usize) -> Result<Term, DcecError> {
        let mut applied = false;
        loop {
            if terms.len() <= 1 {
                return terms.pop().ok_or_else(|| {
                    DcecError::MalformedExpression("nothing left to resolve".to_string())
                });
            }

            let primary = terms
                .iter()
                .position(|t| t.as_word().is_some_and(|w| self.is_function(w)));
            if let Some(p) = primary {
                let name = terms.remove(p).to_string();
                let (term, leftovers) = self.assign_args(&name, terms, depth)?;
                terms = std::iter::once(term).chain(leftovers).collect();
                applied = true;
                continue;
            }

            let args = terms.split_off(1);
            return match terms.pop() {
                Some(Term::Word(name)) => self.define_inline(name, args),
                Some(Term::Node { token, .. }) if applied => {
                    let rest: Vec<String> = args.iter().map(Term::to_string).collect();
                    Err(DcecError::MalformedExpression(format!(
                        "arguments {} are left over after {}",
                        rest.join(", "),
                        token.s_expression()
                    )))
                }
                Some(Term::Node { token, .. }) => Err(DcecError::InvalidFunctionName(
                    token.s_expression().to_string(),
                )),
                None => Err(DcecError::MalformedExpression(
                    "nothing left to resolve".to_string(),
                )),
            };
        }
    }

    /// Defines a function that no prototype declares from its use.
    fn define_inline(&mut self, name: String, args: Vec<Term>) -> Result<Term, DcecError> {
        let mut params = Vec::with_capacity(args.len());
        for arg in &args {
            match self.sort_of(arg) {
                Some(sort) => params.push(sort),
                None => {
                    return Err(DcecError::UntypedArgument {
                        function: name,
                        arg: arg.to_string(),
                    });
                }
            }
        }

        let annotated = self
            .discovered
            .atomics
            .remove(&name)
            .and_then(|sorts| sorts.into_iter().next());
        let ret = match annotated {
            Some(sort) => {
                self.warn(
                    "W-INLINE",
                    format!(
                        "assuming inline function {name} returns {sort}; place the return sort outside the call or declare a prototype"
                    ),
                );
                sort
            }
            None => WILDCARD.to_string(),
        };

        let sig = Signature::new(ret.clone(), params.clone());
        tracing::debug!(function = %name, signature = %sig, "defined inline function");
        let overloads = self.discovered.functions.entry(name.clone()).or_default();
        if !overloads.contains(&sig) {
            overloads.push(sig);
        }
        let token = Token::new(name, args.into_iter().map(Term::into_arg).collect());
        self.node(token, &ret, params)
    }

    /// Picks the overload of `name` that fits the leading `args` and builds
    /// its node. Returns the node and the arguments it did not consume.
    fn assign_args(
        &mut self,
        name: &str,
        mut args: Vec<Term>,
        depth: usize,
    ) -> Result<(Term, Vec<Term>), DcecError> {
        self.check_depth(depth)?;
        let mut overloads: Vec<Signature> = self.ns.overloads(name).to_vec();
        for sig in self.discovered.functions.get(name).into_iter().flatten() {
            if !overloads.contains(sig) {
                overloads.push(sig.clone());
            }
        }
        let max_arity = overloads.iter().map(Signature::arity).max().unwrap_or(0);

        let mut given = Vec::new();
        let mut exempt = Vec::new();
        let mut i = 0usize;
        while i < args.len() && i < max_arity {
            let nested = args[i]
                .as_word()
                .filter(|w| self.atomic_sort(w).is_none() && self.is_function(w))
                .map(str::to_string);
            match nested {
                Some(inner) => {
                    if FLUENT_FUNCTIONS.contains(&inner.as_str()) {
                        exempt.push(given.len());
                    }
                    let tail = args.split_off(i + 1);
                    args.truncate(i);
                    let (term, leftovers) = self.assign_args(&inner, tail, depth + 1)?;
                    given.push(self.sort_of(&term).unwrap_or_else(|| WILDCARD.to_string()));
                    args.push(term);
                    args.extend(leftovers);
                }
                None => {
                    if let Term::Node { token, .. } = &args[i] {
                        if FLUENT_FUNCTIONS.contains(&token.name()) {
                            exempt.push(given.len());
                        }
                    }
                    given.push(
                        self.sort_of(&args[i])
                            .unwrap_or_else(|| WILDCARD.to_string()),
                    );
                }
            }
            i += 1;
        }

        let chosen = self.select_overload(name, &overloads, &given, &exempt)?;
        for (pos, param) in chosen.params.iter().enumerate() {
            self.tag(&args[pos], param);
        }
        tracing::debug!(function = name, signature = %chosen, "resolved overload");

        let leftovers = args.split_off(chosen.arity());
        let token = Token::new(name, args.into_iter().map(Term::into_arg).collect());
        Ok((self.node(token, &chosen.ret, chosen.params)?, leftovers))
    }

    /// Most matched positions wins, then the smallest summed sort distance.
    fn select_overload(
        &self,
        name: &str,
        overloads: &[Signature],
        given: &[String],
        exempt: &[usize],
    ) -> Result<Signature, DcecError> {
        let mut fitting: Vec<(&Signature, usize, usize)> = Vec::new();
        'candidates: for sig in overloads {
            if sig.arity() > given.len() {
                continue;
            }
            let mut matched = 0usize;
            let mut distance = 0usize;
            for (pos, (actual, expected)) in given.iter().zip(&sig.params).enumerate() {
                match self.ns.distance(actual, expected) {
                    Some(d) => {
                        matched += 1;
                        distance += d;
                    }
                    None if expected == "Fluent" && exempt.contains(&pos) => {}
                    None => continue 'candidates,
                }
            }
            fitting.push((sig, matched, distance));
        }

        let Some(best_matched) = fitting.iter().map(|(_, m, _)| *m).max() else {
            return Err(DcecError::NoMatchingOverload {
                name: name.to_string(),
                given: given.to_vec(),
                expected: overloads.iter().map(Signature::to_string).collect(),
            });
        };
        fitting.retain(|(_, m, _)| *m == best_matched);
        let best_distance = fitting.iter().map(|(_, _, d)| *d).min().unwrap_or(0);
        fitting.retain(|(_, _, d)| *d == best_distance);

        match fitting.as_slice() {
            [(sig, _, _)] => Ok((*sig).clone()),
            tied => Err(DcecError::AmbiguousOverload {
                name: name.to_string(),
                given: given.to_vec(),
                candidates: tied.iter().map(|(sig, _, _)| sig.to_string()).collect(),
            }),
        }
    }
}

/// Splits one level into its words and the text of its nested groups.
fn split_level(inner: &str) -> (Vec<Item>, Vec<&str>) {
    let mut items = Vec::new();
    let mut groups = Vec::new();
    let mut word_start = 0usize;
    let mut group_start = 0usize;
    let mut depth = 0usize;

    let flush = |items: &mut Vec<Item>, from: usize, to: usize| {
        let word = &inner[from..to];
        if !word.is_empty() {
            items.push(Item::Word(word.to_string()));
        }
    };

    for (i, ch) in inner.char_indices() {
        match ch {
            '(' => {
                if depth == 0 {
                    flush(&mut items, word_start, i);
                    group_start = i;
                }
                depth += 1;
            }
            ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    items.push(Item::Group(groups.len()));
                    groups.push(&inner[group_start..=i]);
                    word_start = i + 1;
                }
            }
            ',' if depth == 0 => {
                flush(&mut items, word_start, i);
                word_start = i + 1;
            }
            _ => {}
        }
    }
    if depth == 0 {
        flush(&mut items, word_start, inner.len());
    }
    (items, groups)
}
