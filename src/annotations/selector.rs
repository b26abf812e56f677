//! Textual member selectors.
//!
//! A selector names one member of a type, optionally narrowing to one of its parameters or its
//! return value:
//!
//! | Selector | Selects |
//! |---|---|
//! | `Name` | The single declared member called `Name` |
//! | `Method(T1, T2)` | The method overload with exactly these parameter types |
//! | `.ctor(T)` | The constructor overload with exactly these parameter types |
//! | `Method(T)[1]` | Parameter 1 of that overload |
//! | `Method(T)[return]` | The return value of that overload |
//!
//! Type names are matched against the full name or the simple name of each declared parameter
//! type. Resolution is declared-only and must produce exactly one element; anything else is an
//! [`Error::Resolution`].

use std::{fmt, str::FromStr};

use crate::{
    metadata::introspection::{MemberRef, MethodRc, TypeInfo},
    Error, Result,
};

/// A narrowing of a method selector to one of its slots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorSlot {
    /// The parameter at a zero-based position
    Parameter(usize),
    /// The return value
    ReturnValue,
}

/// A parsed member selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    text: String,
    name: String,
    parameters: Option<Vec<String>>,
    slot: Option<SelectorSlot>,
}

/// The element a [`Selector`] resolved to
#[derive(Debug, Clone)]
pub enum Selection {
    /// A field, property, event, method, constructor or nested type
    Member(MemberRef),
    /// The return value of a method
    ReturnValue(MethodRc),
    /// A parameter of a method, by zero-based position
    Parameter(MethodRc, usize),
}

impl Selector {
    /// Parse a selector
    ///
    /// ## Arguments
    /// * 'text' - The selector text
    ///
    /// # Errors
    /// Returns [`Error::Resolution`] for malformed selectors.
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        let fail = |message: &str| Error::Resolution {
            selector: text.to_string(),
            message: message.to_string(),
        };

        let (name, rest) = match trimmed.find(|c: char| c == '(' || c == '[') {
            Some(index) => trimmed.split_at(index),
            None => (trimmed, ""),
        };
        let name = name.trim();
        if name.is_empty() {
            return Err(fail("missing member name"));
        }
        if name.chars().any(char::is_whitespace) {
            return Err(fail("member name contains whitespace"));
        }

        let (parameters, rest) = if let Some(list) = rest.strip_prefix('(') {
            let close = closing_paren(list).ok_or_else(|| fail("unbalanced parentheses"))?;
            let (inner, tail) = list.split_at(close);
            (Some(split_type_list(inner)), tail[1..].trim())
        } else {
            (None, rest.trim())
        };

        if parameters
            .as_ref()
            .is_some_and(|list| list.iter().any(String::is_empty))
        {
            return Err(fail("empty parameter type name"));
        }

        let slot = if rest.is_empty() {
            None
        } else {
            let inner = rest
                .strip_prefix('[')
                .and_then(|r| r.strip_suffix(']'))
                .map(str::trim)
                .ok_or_else(|| fail("unexpected trailing text"))?;
            if parameters.is_none() {
                return Err(fail("a slot requires a parameter list"));
            }

            if inner == "return" {
                Some(SelectorSlot::ReturnValue)
            } else {
                let position = inner
                    .parse::<usize>()
                    .map_err(|_| fail("slot must be a parameter position or 'return'"))?;
                Some(SelectorSlot::Parameter(position))
            }
        };

        Ok(Selector {
            text: text.to_string(),
            name: name.to_string(),
            parameters,
            slot,
        })
    }

    /// The selected member name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The parameter type names, `None` when the selector has no parameter list
    #[must_use]
    pub fn parameters(&self) -> Option<&[String]> {
        self.parameters.as_deref()
    }

    /// The selected slot
    #[must_use]
    pub fn slot(&self) -> Option<SelectorSlot> {
        self.slot
    }

    fn fail(&self, message: impl Into<String>) -> Error {
        Error::Resolution {
            selector: self.text.clone(),
            message: message.into(),
        }
    }

    /// Resolve against the members `ty` declares
    ///
    /// ## Arguments
    /// * 'ty' - The declaring type
    ///
    /// # Errors
    /// Returns [`Error::Resolution`] when no member or more than one member matches, or the
    /// selected parameter position does not exist.
    pub fn resolve(&self, ty: &dyn TypeInfo) -> Result<Selection> {
        let Some(parameters) = &self.parameters else {
            let mut matches: Vec<MemberRef> = ty
                .members()
                .into_iter()
                .filter(|member| member.name() == self.name)
                .collect();

            return match matches.len() {
                0 => Err(self.fail(format!("'{}' declares no such member", ty.full_name()))),
                1 => Ok(Selection::Member(matches.remove(0))),
                n => Err(self.fail(format!(
                    "'{}' declares {} members with this name",
                    ty.full_name(),
                    n
                ))),
            };
        };

        let candidates = if self.name == ".ctor" {
            ty.constructors()
        } else {
            ty.methods_named(&self.name)
        };

        let mut matches: Vec<MethodRc> = candidates
            .into_iter()
            .filter(|method| signature_matches(method, parameters))
            .collect();

        let method = match matches.len() {
            0 => {
                return Err(self.fail(format!(
                    "'{}' declares no overload with these parameter types",
                    ty.full_name()
                )))
            }
            1 => matches.remove(0),
            n => {
                return Err(self.fail(format!(
                    "{} overloads on '{}' match these parameter types",
                    n,
                    ty.full_name()
                )))
            }
        };

        match self.slot {
            None => Ok(Selection::Member(MemberRef::Method(method))),
            Some(SelectorSlot::ReturnValue) => Ok(Selection::ReturnValue(method)),
            Some(SelectorSlot::Parameter(position)) if position < parameters.len() => {
                Ok(Selection::Parameter(method, position))
            }
            Some(SelectorSlot::Parameter(position)) => Err(self.fail(format!(
                "parameter position {position} is out of range"
            ))),
        }
    }
}

impl FromStr for Selector {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Selector::parse(s)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(parameters) = &self.parameters {
            write!(f, "({})", parameters.join(", "))?;
        }
        match self.slot {
            Some(SelectorSlot::Parameter(position)) => write!(f, "[{position}]"),
            Some(SelectorSlot::ReturnValue) => write!(f, "[return]"),
            None => Ok(()),
        }
    }
}

fn signature_matches(method: &MethodRc, names: &[String]) -> bool {
    let parameters = method.parameters();
    parameters.len() == names.len()
        && parameters.iter().zip(names).all(|(param, name)| {
            param
                .parameter_type()
                .is_some_and(|ty| ty.full_name() == *name || ty.name() == name.as_str())
        })
}

/// Byte offset of the `)` closing an already opened parenthesis
fn closing_paren(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (index, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' if depth == 0 => return Some(index),
            ')' => depth -= 1,
            _ => {}
        }
    }
    None
}

/// Split a comma separated type list, ignoring commas nested in `<>` or `[]`
fn split_type_list(text: &str) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (index, c) in text.char_indices() {
        match c {
            '<' | '[' => depth += 1,
            '>' | ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(text[start..index].trim().to_string());
                start = index + 1;
            }
            _ => {}
        }
    }
    parts.push(text[start..].trim().to_string());
    parts
}
