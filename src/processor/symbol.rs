//! The binding table: named values the host hands to the interpreter.
//!
//! The interpreter only ever reads from it. Function values may still touch
//! host state when called.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// One positional argument as the host function sees it.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Number(f64),
    String(String),
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Number(n) => write!(f, "{n}"),
            Arg::String(s) => f.write_str(s),
        }
    }
}

/// What a host function hands back.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Text(String),
    Number(f64),
    /// Show the already-rendered result at this index (keeps its ranges).
    Selector(usize),
}

pub type HostFn = dyn Fn(&[Arg], &[String]) -> Result<Outcome, String> + Send + Sync;

/// `(identity, arg codes, result codes) -> code`
pub type CodeFn = dyn Fn(&str, &[String], &[String]) -> String + Send + Sync;

/// Optional metadata attached to a function binding.
#[derive(Clone, Default)]
pub struct FunctionInfo {
    /// Upper bound on positional arguments.
    pub arg_count: Option<usize>,
    /// Upper bound on `|` results.
    pub result_count: Option<usize>,
    /// Custom code serializer.
    pub to_code: Option<Arc<CodeFn>>,
}

#[derive(Clone)]
pub struct Function {
    call: Arc<HostFn>,
    pub info: FunctionInfo,
}

impl Function {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[Arg], &[String]) -> Result<Outcome, String> + Send + Sync + 'static,
    {
        Self {
            call: Arc::new(f),
            info: FunctionInfo::default(),
        }
    }

    pub fn with_arg_count(mut self, n: usize) -> Self {
        self.info.arg_count = Some(n);
        self
    }

    pub fn with_result_count(mut self, n: usize) -> Self {
        self.info.result_count = Some(n);
        self
    }

    pub fn with_code<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &[String], &[String]) -> String + Send + Sync + 'static,
    {
        self.info.to_code = Some(Arc::new(f));
        self
    }

    pub fn call(&self, args: &[Arg], results: &[String]) -> Result<Outcome, String> {
        (self.call)(args, results)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("arg_count", &self.info.arg_count)
            .field("result_count", &self.info.result_count)
            .field("to_code", &self.info.to_code.is_some())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub enum Symbol {
    Number(f64),
    String(String),
    Boolean(bool),
    Function(Function),
    Object(BTreeMap<String, Symbol>),
}

impl Symbol {
    pub fn object<I, K>(children: I) -> Self
    where
        I: IntoIterator<Item = (K, Symbol)>,
        K: Into<String>,
    {
        Symbol::Object(children.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Symbol::Number(_) => "number",
            Symbol::String(_) => "string",
            Symbol::Boolean(_) => "boolean",
            Symbol::Function(_) => "function",
            Symbol::Object(_) => "object",
        }
    }

    pub fn child(&self, name: &str) -> Option<&Symbol> {
        match self {
            Symbol::Object(children) => children.get(name),
            _ => None,
        }
    }
}

impl From<f64> for Symbol {
    fn from(v: f64) -> Self {
        Symbol::Number(v)
    }
}

impl From<i32> for Symbol {
    fn from(v: i32) -> Self {
        Symbol::Number(v.into())
    }
}

impl From<bool> for Symbol {
    fn from(v: bool) -> Self {
        Symbol::Boolean(v)
    }
}

impl From<&str> for Symbol {
    fn from(v: &str) -> Self {
        Symbol::String(v.to_string())
    }
}

impl From<String> for Symbol {
    fn from(v: String) -> Self {
        Symbol::String(v)
    }
}

impl From<Function> for Symbol {
    fn from(v: Function) -> Self {
        Symbol::Function(v)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("\"{segment}\" does not exist")]
    Missing { segment: String },

    #[error("\"{segment}\" does not exist in \"{scope}\"")]
    MissingIn { segment: String, scope: String },

    #[error("\"{scope}\" has no children")]
    NoChildren { scope: String },

    #[error("empty path")]
    EmptyPath,
}

/// Name-indexed root of the binding tree.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    root: BTreeMap<String, Symbol>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, symbol: impl Into<Symbol>) -> &mut Self {
        self.root.insert(name.into(), symbol.into());
        self
    }

    /// Builder form of `insert`.
    pub fn with(mut self, name: impl Into<String>, symbol: impl Into<Symbol>) -> Self {
        self.insert(name, symbol);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.root.get(name)
    }

    pub fn len(&self) -> usize {
        self.root.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Walk `path` one segment at a time.
    pub fn lookup<S: AsRef<str>>(&self, path: &[S]) -> Result<&Symbol, LookupError> {
        let (first, rest) = path.split_first().ok_or(LookupError::EmptyPath)?;
        let first = first.as_ref();
        let mut cur = self.get(first).ok_or_else(|| LookupError::Missing {
            segment: first.to_string(),
        })?;

        let mut scope = first.to_string();
        for seg in rest {
            cur = child_of(cur, &scope, seg.as_ref())?;
            scope.push('.');
            scope.push_str(seg.as_ref());
        }
        Ok(cur)
    }
}

/// One step of a lookup; `scope` is the dotted name of `parent`.
pub fn child_of<'b>(parent: &'b Symbol, scope: &str, segment: &str) -> Result<&'b Symbol, LookupError> {
    match parent {
        Symbol::Object(_) => parent.child(segment).ok_or_else(|| LookupError::MissingIn {
            segment: segment.to_string(),
            scope: scope.to_string(),
        }),
        _ => Err(LookupError::NoChildren {
            scope: scope.to_string(),
        }),
    }
}

impl FromIterator<(String, Symbol)> for Bindings {
    fn from_iter<T: IntoIterator<Item = (String, Symbol)>>(iter: T) -> Self {
        Self {
            root: iter.into_iter().collect(),
        }
    }
}
