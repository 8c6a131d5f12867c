//! Text macros
//!
//! `DEFINE name(p1, p2) body` stores a macro whose body refers to its
//! parameters as `$p1`, `$p2`. An invocation `$name(arg1, arg2)` anywhere in
//! a directive is replaced by the body with each `$pI` substituted by the
//! literal text of `argI`. Substitution is purely textual.
//!
//! Parameters must appear with their `$` in the body: `DEFINE f(x, y) x+y`
//! is rejected with [`DirectiveError::UnusedParameter`], write `$x+$y`.
//!
//! Expansion repeats until no invocation remains. Arguments are expanded
//! before substitution, and the macros currently being expanded are kept on
//! a stack so a macro that expands into itself is reported instead of
//! looping forever.

use super::error::{DirectiveError, DirectiveResult};
use super::header::{identifier, parse_macro_definition};
use std::collections::HashMap;

/// A named, parameterized text macro
#[derive(Debug, Clone, PartialEq)]
pub struct Macro {
    pub name: String,
    pub params: Vec<String>,
    pub body: String,
}

impl Macro {
    /// Create a macro, checking that every parameter occurs in the body
    pub fn new(name: &str, params: Vec<String>, body: &str) -> DirectiveResult<Self> {
        let referenced = parameter_refs(body);
        if let Some(unused) = params.iter().find(|p| !referenced.contains(&p.as_str())) {
            return Err(DirectiveError::UnusedParameter {
                name: name.to_string(),
                parameter: unused.clone(),
            });
        }

        Ok(Self {
            name: name.to_string(),
            params,
            body: body.to_string(),
        })
    }

    /// Replace every `$param` in the body with the matching argument
    fn substitute(&self, args: &[String]) -> String {
        let mut out = String::with_capacity(self.body.len());
        let mut rest = self.body.as_str();

        while let Some(pos) = rest.find('$') {
            out.push_str(&rest[..pos]);
            let after = &rest[pos + 1..];

            match identifier(after) {
                Ok((remaining, name)) => {
                    match self.params.iter().position(|p| p == name) {
                        Some(idx) => out.push_str(&args[idx]),
                        None => {
                            out.push('$');
                            out.push_str(name);
                        }
                    }
                    rest = remaining;
                }
                Err(_) => {
                    out.push('$');
                    rest = after;
                }
            }
        }

        out.push_str(rest);
        out
    }
}

/// All `$identifier` references in a text
fn parameter_refs(text: &str) -> Vec<&str> {
    let mut refs = Vec::new();
    let mut rest = text;
    while let Some(pos) = rest.find('$') {
        rest = &rest[pos + 1..];
        if let Ok((remaining, name)) = identifier(rest) {
            refs.push(name);
            rest = remaining;
        }
    }
    refs
}

/// A located `$name(args...)` invocation
#[derive(Debug, PartialEq)]
struct Invocation<'a> {
    start: usize,
    end: usize,
    name: &'a str,
    args: Vec<&'a str>,
}

/// Find the first invocation in `text`
///
/// `$name` without a directly following `(` is plain text. Arguments are split
/// on commas outside parentheses and quotes.
fn find_invocation(text: &str) -> DirectiveResult<Option<Invocation<'_>>> {
    let mut offset = 0;

    while let Some(pos) = text[offset..].find('$') {
        let start = offset + pos;
        let after = &text[start + 1..];

        let Ok((remaining, name)) = identifier(after) else {
            offset = start + 1;
            continue;
        };
        if !remaining.starts_with('(') {
            offset = start + 1 + name.len();
            continue;
        }

        let open = text.len() - remaining.len();
        let (args, close) = split_arguments(text, open)
            .ok_or_else(|| DirectiveError::UnterminatedInvocation(name.to_string()))?;

        return Ok(Some(Invocation {
            start,
            end: close + 1,
            name,
            args,
        }));
    }

    Ok(None)
}

/// Split the argument list opening at `open`; returns the args and the index of `)`
fn split_arguments(text: &str, open: usize) -> Option<(Vec<&str>, usize)> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut arg_start = open + 1;
    let mut args = Vec::new();

    for (idx, c) in text[open..].char_indices().map(|(i, c)| (i + open, c)) {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '\'' | '"' => quote = Some(c),
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    let last = text[arg_start..idx].trim();
                    if !(args.is_empty() && last.is_empty()) {
                        args.push(last);
                    }
                    return Some((args, idx));
                }
            }
            ',' if depth == 1 => {
                args.push(text[arg_start..idx].trim());
                arg_start = idx + 1;
            }
            _ => {}
        }
    }

    None
}

/// The set of defined macros
#[derive(Debug, Clone, Default)]
pub struct MacroTable {
    macros: HashMap<String, Macro>,
}

impl MacroTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a macro from the body of a `DEFINE` block
    pub fn define_from_block(&mut self, body: &str) -> DirectiveResult<&Macro> {
        let header = parse_macro_definition(body)?;
        let params = header.params.iter().map(|p| p.to_string()).collect();
        let definition = Macro::new(header.name, params, header.body)?;
        Ok(self.define(definition))
    }

    /// Add a macro, replacing any earlier definition of the same name
    pub fn define(&mut self, definition: Macro) -> &Macro {
        let name = definition.name.clone();
        if self.macros.contains_key(&name) {
            tracing::warn!(name = %name, "Redefining macro");
        }
        tracing::debug!(name = %name, arity = definition.params.len(), "Defined macro");

        self.macros.insert(name.clone(), definition);
        &self.macros[&name]
    }

    /// Remove a macro; fails if it is not defined
    pub fn undefine(&mut self, name: &str) -> DirectiveResult<Macro> {
        self.macros
            .remove(name)
            .ok_or_else(|| DirectiveError::UndefinedMacro(name.to_string()))
    }

    pub fn get(&self, name: &str) -> Option<&Macro> {
        self.macros.get(name)
    }

    pub fn len(&self) -> usize {
        self.macros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }

    /// Expand every macro invocation in `text`
    pub fn expand(&self, text: &str) -> DirectiveResult<String> {
        let mut active = Vec::new();
        self.expand_with(text, &mut active)
    }

    fn expand_with<'a>(&'a self, text: &str, active: &mut Vec<&'a str>) -> DirectiveResult<String> {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(invocation) = find_invocation(rest)? {
            out.push_str(&rest[..invocation.start]);

            let definition = self
                .macros
                .get(invocation.name)
                .ok_or_else(|| DirectiveError::UndefinedMacro(invocation.name.to_string()))?;

            if invocation.args.len() != definition.params.len() {
                return Err(DirectiveError::MacroArity {
                    name: definition.name.clone(),
                    expected: definition.params.len(),
                    found: invocation.args.len(),
                });
            }

            if active.contains(&definition.name.as_str()) {
                let mut chain: Vec<&str> = active.clone();
                chain.push(&definition.name);
                return Err(DirectiveError::RecursiveMacro {
                    name: definition.name.clone(),
                    chain: chain.join(" -> "),
                });
            }

            let args = invocation
                .args
                .iter()
                .map(|arg| self.expand_with(arg, active))
                .collect::<DirectiveResult<Vec<_>>>()?;

            active.push(&definition.name);
            let expanded = self.expand_with(&definition.substitute(&args), active)?;
            active.pop();

            out.push_str(&expanded);
            rest = &rest[invocation.end..];
        }

        out.push_str(rest);
        Ok(out)
    }
}
