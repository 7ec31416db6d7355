//! Tree evaluation against a binding table.
//!
//! The walk is a two-phase stack machine rather than recursion, so deeply
//! nested results cannot exhaust the native stack. A compound node is
//! visited twice: the first visit schedules its children and remembers how
//! many values were already on the value stack; the second visit takes the
//! children's values back off and pushes one combined value.

use super::ast::{Node, NodeKind};
use super::code::{self, ConditionBuilder};
use super::symbol::{Arg, Bindings, Function, LookupError, Outcome, Symbol, child_of};
use crate::model::{Diagnostic, TextRange};

#[derive(Debug, Clone, PartialEq)]
pub struct Interpretation {
    pub result: String,
    pub ranges: Vec<TextRange>,
    pub code: Option<String>,
    pub errors: Vec<Diagnostic>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    #[error("\"{0}\" cannot be displayed")]
    CannotDisplay(String),

    #[error("\"{0}\" needs at least 1 result")]
    NeedsResult(String),

    #[error("\"{0}\" can have up to 2 results")]
    TooManyBranches(String),

    #[error("\"{0}\" needs at least 1 argument")]
    NeedsArgument(String),

    #[error("\"{0}\" can only be compared against 1 argument")]
    CompareOne(String),

    #[error("\"{0}\" does not take arguments")]
    NoArguments(String),

    #[error("\"{0}\" range thresholds must be numbers")]
    Thresholds(String),

    #[error("\"{name}\" expected at most {max} arguments, but found {found}")]
    TooManyArgs {
        name: String,
        max: usize,
        found: usize,
    },

    #[error("\"{name}\" expected at most {max} results, but found {found}")]
    TooManyResults {
        name: String,
        max: usize,
        found: usize,
    },

    #[error("\"{name}\" selector {index} is out of range of results")]
    SelectorOutOfRange { name: String, index: usize },

    #[error("\"{name}\" failed: {message}")]
    Failed { name: String, message: String },

    #[error(transparent)]
    Lookup(#[from] LookupError),
}

/// Evaluate `root` with code output enabled.
pub fn interpret(root: &Node, bindings: &Bindings) -> Interpretation {
    Interpreter::new(bindings).interpret(root)
}

pub struct Interpreter<'b> {
    bindings: &'b Bindings,
    emit_code: bool,
}

impl<'b> Interpreter<'b> {
    pub fn new(bindings: &'b Bindings) -> Self {
        Self {
            bindings,
            emit_code: true,
        }
    }

    /// Skip building the code string (and never call host serializers).
    pub fn without_code(mut self) -> Self {
        self.emit_code = false;
        self
    }

    pub fn interpret(&self, root: &Node) -> Interpretation {
        let mut machine = Machine {
            bindings: self.bindings,
            emit_code: self.emit_code,
            values: Vec::new(),
            errors: Vec::new(),
        };

        let mut work = vec![Frame {
            node: root,
            mark: None,
        }];
        while let Some(frame) = work.pop() {
            match frame.mark {
                None if is_compound(&frame.node.kind) => {
                    work.push(Frame {
                        node: frame.node,
                        mark: Some(machine.values.len()),
                    });
                    for child in frame.node.children().into_iter().rev() {
                        work.push(Frame {
                            node: child,
                            mark: None,
                        });
                    }
                }
                None => {
                    let product = machine.leaf(frame.node);
                    machine.values.push(product);
                }
                Some(mark) => {
                    let items = machine.values.split_off(mark);
                    let product = machine.combine(frame.node, items);
                    machine.values.push(product);
                }
            }
        }

        let product = machine
            .values
            .pop()
            .unwrap_or_else(|| Product::empty(root.range));
        let mut ranges = product.ranges.clone();
        if ranges.is_empty() {
            ranges.push(root.range);
        }

        Interpretation {
            result: product.text(),
            ranges,
            code: self.emit_code.then_some(product.code),
            errors: machine.errors,
        }
    }
}

struct Frame<'n> {
    node: &'n Node,
    /// Value stack height at discovery; `None` until children are scheduled.
    mark: Option<usize>,
}

/// Retrieve and Exists resolve their whole path in one step.
fn is_compound(kind: &NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::Concat(_)
            | NodeKind::Args(_)
            | NodeKind::Results(_)
            | NodeKind::Access { .. }
            | NodeKind::Eval { .. }
    )
}

#[derive(Debug, Clone)]
enum Datum<'b> {
    Text(String),
    Number(f64),
    Bool(bool),
    Symbol(&'b Symbol),
    Missing,
    List(Vec<Product<'b>>),
}

/// One entry of the value stack: a value, the source ranges that produced
/// its visible text, and its code form.
#[derive(Debug, Clone)]
struct Product<'b> {
    value: Datum<'b>,
    ranges: Vec<TextRange>,
    code: String,
}

impl<'b> Product<'b> {
    fn new(value: Datum<'b>, range: TextRange, code: String) -> Self {
        Self {
            value,
            ranges: vec![range],
            code,
        }
    }

    /// Inert placeholder for anything that failed.
    fn empty(range: TextRange) -> Self {
        Self::new(Datum::Text(String::new()), range, String::new())
    }

    fn text(&self) -> String {
        match &self.value {
            Datum::Text(s) => s.clone(),
            Datum::Number(n) => code::number(*n),
            Datum::Bool(b) => b.to_string(),
            Datum::Symbol(Symbol::String(s)) => s.clone(),
            Datum::Symbol(Symbol::Number(n)) => code::number(*n),
            Datum::Symbol(Symbol::Boolean(b)) => b.to_string(),
            Datum::Symbol(_) | Datum::Missing | Datum::List(_) => String::new(),
        }
    }

    /// Argument text as written: number leaves carry their source spelling
    /// as their code.
    fn literal(&self) -> String {
        match self.value {
            Datum::Number(_) => self.code.clone(),
            _ => self.text(),
        }
    }

    fn into_list(self) -> Vec<Product<'b>> {
        match self.value {
            Datum::List(items) => items,
            _ => Vec::new(),
        }
    }
}

struct Machine<'b> {
    bindings: &'b Bindings,
    emit_code: bool,
    values: Vec<Product<'b>>,
    errors: Vec<Diagnostic>,
}

impl<'b> Machine<'b> {
    fn report(&mut self, range: TextRange, err: impl ToString) {
        self.errors.push(Diagnostic::new(range, err.to_string()));
    }

    fn leaf(&mut self, node: &Node) -> Product<'b> {
        let bindings = self.bindings;
        match &node.kind {
            NodeKind::String(s) => Product::new(Datum::Text(s.clone()), node.range, code::quote(s)),
            NodeKind::Number { value, literal } => {
                Product::new(Datum::Number(*value), node.range, literal.clone())
            }
            NodeKind::Identity(name) => Product::new(Datum::Text(name.clone()), node.range, name.clone()),
            NodeKind::Retrieve(segments) => {
                let path = segment_names(segments);
                let value = match bindings.lookup(path.as_slice()) {
                    Ok(symbol) => Datum::Symbol(symbol),
                    Err(err) => {
                        self.report(node.range, err);
                        Datum::Missing
                    }
                };
                Product::new(value, node.range, path.join("."))
            }
            NodeKind::Exists(segments) => {
                let path = segment_names(segments);
                let found = bindings.lookup(path.as_slice()).is_ok();
                Product::new(Datum::Bool(found), node.range, format!("{} != null", path.join(".")))
            }
            NodeKind::Error(_) => Product {
                value: Datum::Text(String::new()),
                ranges: Vec::new(),
                code: String::new(),
            },
            // compound kinds only reach here without children
            _ => Product::empty(node.range),
        }
    }

    fn combine(&mut self, node: &Node, mut items: Vec<Product<'b>>) -> Product<'b> {
        match &node.kind {
            NodeKind::Concat(_) => {
                let text = items.iter().map(Product::text).collect();
                let ranges = items.iter().flat_map(|p| p.ranges.iter().copied()).collect();
                let codes: Vec<&str> = items
                    .iter()
                    .map(|p| p.code.as_str())
                    .filter(|c| !c.is_empty())
                    .collect();
                Product {
                    value: Datum::Text(text),
                    ranges,
                    code: codes.join(" + "),
                }
            }
            NodeKind::Args(_) | NodeKind::Results(_) => {
                // failed blocks have no code; keep the list well formed
                for item in &mut items {
                    if item.code.is_empty() {
                        item.code = code::quote("");
                    }
                }
                let code = code::list(&items.iter().map(|p| p.code.clone()).collect::<Vec<_>>());
                Product {
                    value: Datum::List(items),
                    ranges: Vec::new(),
                    code,
                }
            }
            NodeKind::Access { right, .. } => {
                let (Some(right_value), Some(left)) = (items.pop(), items.pop()) else {
                    return Product::empty(node.range);
                };
                let name = right_value.text();
                let code = format!("{}.{}", left.code, name);
                let value = match left.value {
                    Datum::Symbol(parent) => match child_of(parent, &left.code, &name) {
                        Ok(symbol) => Datum::Symbol(symbol),
                        Err(err) => {
                            self.report(right.range, err);
                            Datum::Missing
                        }
                    },
                    // already reported further left
                    _ => Datum::Missing,
                };
                Product::new(value, node.range, code)
            }
            NodeKind::Eval { identity, .. } => {
                let (Some(results), Some(args), Some(ident)) = (items.pop(), items.pop(), items.pop())
                else {
                    return Product::empty(node.range);
                };
                if matches!(ident.value, Datum::Missing) {
                    return Product::empty(node.range);
                }

                let name = identity.path_name().unwrap_or_else(|| ident.code.clone());
                let block = Block {
                    name,
                    range: node.range,
                    identity: ident,
                    args: args.into_list(),
                    results: results.into_list(),
                };
                match self.eval(block) {
                    Ok(product) => product,
                    Err(err) => {
                        self.report(node.range, err);
                        Product::empty(node.range)
                    }
                }
            }
            _ => Product::empty(node.range),
        }
    }

    fn eval(&self, mut block: Block<'b>) -> Result<Product<'b>, EvalError> {
        let value = std::mem::replace(&mut block.identity.value, Datum::Missing);
        match value {
            Datum::Bool(b) => self.conditional(b, block),
            Datum::Text(s) => self.string(&s, block),
            Datum::Number(n) => self.number(n, block),
            Datum::Symbol(symbol) => match symbol {
                Symbol::Boolean(b) => self.conditional(*b, block),
                Symbol::String(s) => self.string(s, block),
                Symbol::Number(n) => self.number(*n, block),
                Symbol::Function(f) => self.call(f, block),
                Symbol::Object(_) => Err(EvalError::CannotDisplay(block.name)),
            },
            Datum::Missing | Datum::List(_) => Err(EvalError::CannotDisplay(block.name)),
        }
    }

    /// `[flag|yes|no]`, also used by `[path?|yes|no]`.
    fn conditional(&self, flag: bool, block: Block<'b>) -> Result<Product<'b>, EvalError> {
        if !block.args.is_empty() {
            return Err(EvalError::NoArguments(block.name));
        }
        check_branches(&block)?;

        let code = self.when_code(|| {
            let mut builder = ConditionBuilder::new().when(&block.identity.code, &block.results[0].code);
            if let Some(other) = block.results.get(1) {
                builder = builder.otherwise(&other.code);
            }
            builder.build()
        });
        Ok(block.pick(if flag { 0 } else { 1 }, code))
    }

    /// Plain display, or `[s value|equal|other]`.
    fn string(&self, value: &str, block: Block<'b>) -> Result<Product<'b>, EvalError> {
        if block.args.is_empty() && block.results.is_empty() {
            let code = block.identity.code.clone();
            return Ok(Product::new(Datum::Text(value.to_string()), block.range, code));
        }
        if block.args.is_empty() {
            return Err(EvalError::NeedsArgument(block.name));
        }
        if block.args.len() > 1 {
            return Err(EvalError::CompareOne(block.name));
        }
        check_branches(&block)?;

        let expected = block.args[0].literal();
        let code = self.when_code(|| {
            let mut builder = ConditionBuilder::new().when(
                format!("{} == {}", block.identity.code, code::quote(&expected)),
                &block.results[0].code,
            );
            if let Some(other) = block.results.get(1) {
                builder = builder.otherwise(&other.code);
            }
            builder.build()
        });
        let index = if expected == value { 0 } else { 1 };
        Ok(block.pick(index, code))
    }

    /// Plain display, or `[n t0 t1 ..|r0|r1|..]` where `ri` is shown while
    /// `ti <= n`, and an extra trailing result covers `n < t0`.
    fn number(&self, value: f64, block: Block<'b>) -> Result<Product<'b>, EvalError> {
        if block.args.is_empty() && block.results.is_empty() {
            let code = block.identity.code.clone();
            return Ok(Product::new(Datum::Number(value), block.range, code));
        }
        if block.args.is_empty() {
            return Err(EvalError::NeedsArgument(block.name));
        }
        if block.results.is_empty() {
            return Err(EvalError::NeedsResult(block.name));
        }
        let max = block.args.len() + 1;
        if block.results.len() > max {
            return Err(EvalError::TooManyResults {
                name: block.name,
                max,
                found: block.results.len(),
            });
        }
        let thresholds = block
            .args
            .iter()
            .map(|a| match a.value {
                Datum::Number(n) => Some(n),
                _ => None,
            })
            .collect::<Option<Vec<f64>>>()
            .ok_or_else(|| EvalError::Thresholds(block.name.clone()))?;

        let fallback = (block.results.len() == max).then(|| block.results.len() - 1);
        let index = thresholds
            .iter()
            .rposition(|t| *t <= value)
            .or(fallback)
            .unwrap_or(usize::MAX);

        let code = self.when_code(|| {
            let mut builder = ConditionBuilder::new();
            for (i, threshold) in thresholds.iter().enumerate().rev() {
                if let Some(result) = block.results.get(i) {
                    builder = builder.when(
                        format!("{} >= {}", block.identity.code, code::number(*threshold)),
                        &result.code,
                    );
                }
            }
            if let Some(i) = fallback {
                builder = builder.otherwise(&block.results[i].code);
            }
            builder.build()
        });
        Ok(block.pick(index, code))
    }

    fn call(&self, function: &Function, block: Block<'b>) -> Result<Product<'b>, EvalError> {
        if let Some(max) = function.info.arg_count {
            if block.args.len() > max {
                return Err(EvalError::TooManyArgs {
                    name: block.name,
                    max,
                    found: block.args.len(),
                });
            }
        }
        if let Some(max) = function.info.result_count {
            if block.results.len() > max {
                return Err(EvalError::TooManyResults {
                    name: block.name,
                    max,
                    found: block.results.len(),
                });
            }
        }

        let args: Vec<Arg> = block
            .args
            .iter()
            .map(|a| match a.value {
                Datum::Number(n) => Arg::Number(n),
                _ => Arg::String(a.text()),
            })
            .collect();
        let results: Vec<String> = block.results.iter().map(Product::text).collect();

        let code = self.when_code(|| {
            let arg_codes: Vec<String> = block.args.iter().map(|a| a.code.clone()).collect();
            let result_codes: Vec<String> = block.results.iter().map(|r| r.code.clone()).collect();
            match &function.info.to_code {
                Some(to_code) => to_code(&block.identity.code, &arg_codes, &result_codes),
                None => call_code(&block.identity.code, &arg_codes, &result_codes),
            }
        });

        let outcome = function
            .call(&args, &results)
            .map_err(|message| EvalError::Failed {
                name: block.name.clone(),
                message,
            })?;

        match outcome {
            Outcome::Text(text) => Ok(Product::new(Datum::Text(text), block.range, code)),
            Outcome::Number(n) => Ok(Product::new(Datum::Number(n), block.range, code)),
            Outcome::Selector(index) if index < block.results.len() => Ok(block.pick(index, code)),
            Outcome::Selector(index) => Err(EvalError::SelectorOutOfRange {
                name: block.name,
                index,
            }),
        }
    }

    fn when_code(&self, build: impl FnOnce() -> String) -> String {
        if self.emit_code { build() } else { String::new() }
    }
}

/// An Eval with its parts already evaluated.
struct Block<'b> {
    name: String,
    range: TextRange,
    identity: Product<'b>,
    args: Vec<Product<'b>>,
    results: Vec<Product<'b>>,
}

impl<'b> Block<'b> {
    /// Surface result `index` with its own ranges; an absent result shows
    /// as empty text over the whole block.
    fn pick(mut self, index: usize, code: String) -> Product<'b> {
        if index < self.results.len() {
            let chosen = self.results.swap_remove(index);
            Product {
                value: Datum::Text(chosen.text()),
                ranges: chosen.ranges,
                code,
            }
        } else {
            Product::new(Datum::Text(String::new()), self.range, code)
        }
    }
}

fn check_branches(block: &Block<'_>) -> Result<(), EvalError> {
    match block.results.len() {
        0 => Err(EvalError::NeedsResult(block.name.clone())),
        1 | 2 => Ok(()),
        _ => Err(EvalError::TooManyBranches(block.name.clone())),
    }
}

/// `f()`, `f(a, b)`, `f(r0, r1)` or `f([a, b], [r0, r1])`.
fn call_code(identity: &str, args: &[String], results: &[String]) -> String {
    match (args.is_empty(), results.is_empty()) {
        (true, true) => format!("{identity}()"),
        (false, true) => format!("{identity}({})", code::list(args)),
        (true, false) => format!("{identity}({})", code::list(results)),
        (false, false) => format!("{identity}([{}], [{}])", code::list(args), code::list(results)),
    }
}

fn segment_names(segments: &[Node]) -> Vec<&str> {
    segments
        .iter()
        .filter_map(|s| match &s.kind {
            NodeKind::Identity(name) => Some(name.as_str()),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::lexer::lex;
    use crate::processor::symbol::Function;
    use crate::processor::template_parser::parse;

    fn run(src: &str, bindings: &Bindings) -> Interpretation {
        let parsed = parse(&lex(src), src);
        assert!(parsed.errors.is_empty(), "parse errors in {src:?}: {:?}", parsed.errors);
        interpret(&parsed.root, bindings)
    }

    fn r(sl: usize, sc: usize, el: usize, ec: usize) -> TextRange {
        TextRange::from_coords((sl, sc), (el, ec))
    }

    fn game() -> Bindings {
        Bindings::new()
            .with("name", "Test")
            .with("str", 100)
            .with("color", "red")
            .with("flag", true)
            .with("gold", 50)
            .with("v", "1.0")
            .with("w", "01")
            .with(
                "pc",
                Symbol::object([("name", Symbol::from("Thomas")), ("str", Symbol::from(100))]),
            )
            .with("isRed", Function::new(|_, _| Ok(Outcome::Text("red".into()))))
            .with("pick", Function::new(|_, _| Ok(Outcome::Selector(1))))
            .with(
                "add",
                Function::new(|args, _| {
                    let mut sum = 0.0;
                    for arg in args {
                        match arg {
                            Arg::Number(n) => sum += n,
                            Arg::String(s) => return Err(format!("{s} is not a number")),
                        }
                    }
                    Ok(Outcome::Number(sum))
                }),
            )
    }

    #[test]
    fn test_results_and_code() {
        let b = game();
        let test_cases = vec![
            ("", "", "\"\""),
            ("string", "string", "\"string\""),
            ("[name]", "Test", "name"),
            ("[str]", "100", "str"),
            ("[pc.name]", "Thomas", "pc.name"),
            ("[isRed]", "red", "isRed()"),
            ("[add 1 2]", "3", "add(1, 2)"),
            ("[pick|a|b]", "b", "pick(\"a\", \"b\")"),
            ("[pick 0|a|b]", "b", "pick([0], [\"a\", \"b\"])"),
            ("[flag|yes|no]", "yes", "(flag ? \"yes\" : \"no\")"),
            ("[flag|yes]", "yes", "(flag ? \"yes\" : \"\")"),
            ("[color red|same|other]", "same", "(color == \"red\" ? \"same\" : \"other\")"),
            ("[color blue|same|other]", "other", "(color == \"blue\" ? \"same\" : \"other\")"),
            ("[v 1.0|same|other]", "same", "(v == \"1.0\" ? \"same\" : \"other\")"),
            ("[w 01|same|other]", "same", "(w == \"01\" ? \"same\" : \"other\")"),
            ("[v 1|same|other]", "other", "(v == \"1\" ? \"same\" : \"other\")"),
            ("[pc.pet?|pet|none]", "none", "(pc.pet != null ? \"pet\" : \"none\")"),
            ("[pc.name?|named]", "named", "(pc.name != null ? \"named\" : \"\")"),
            (
                "Hi [flag|[name]|x] there",
                "Hi Test there",
                "\"Hi \" + (flag ? name : \"x\") + \" there\"",
            ),
            ("\\[a]", "[a]", "\"[a]\""),
        ];

        for (src, result, code) in test_cases {
            let out = run(src, &b);
            assert!(out.errors.is_empty(), "errors in {src:?}: {:?}", out.errors);
            assert_eq!(out.result, result, "result of {src:?}");
            assert_eq!(out.code.as_deref(), Some(code), "code of {src:?}");
        }
    }

    #[test]
    fn test_ranges_follow_visible_text() {
        let b = game();
        let test_cases = vec![
            ("", vec![r(0, 0, 0, 0)]),
            ("string", vec![r(0, 0, 0, 6)]),
            ("[name]", vec![r(0, 1, 0, 5)]),
            ("[flag|red|blue]", vec![r(0, 6, 0, 9)]),
            ("[pick|red|blue]", vec![r(0, 10, 0, 14)]),
            ("[isRed|red|blue]", vec![r(0, 1, 0, 15)]),
            (
                "Hi! My name is [pc.name]. How are you?",
                vec![r(0, 0, 0, 15), r(0, 16, 0, 23), r(0, 24, 0, 38)],
            ),
        ];

        for (src, expected) in test_cases {
            assert_eq!(run(src, &b).ranges, expected, "ranges of {src:?}");
        }
    }

    #[test]
    fn test_boolean_selects_alternative() {
        let on = Bindings::new().with("color", true);
        let off = Bindings::new().with("color", false);

        let out = run("[color|red|blue]", &on);
        assert_eq!((out.result.as_str(), out.ranges), ("red", vec![r(0, 7, 0, 10)]));
        assert_eq!(out.code.as_deref(), Some("(color ? \"red\" : \"blue\")"));

        let out = run("[color|red|blue]", &off);
        assert_eq!((out.result.as_str(), out.ranges), ("blue", vec![r(0, 11, 0, 15)]));

        // missing false branch renders nothing over the whole block
        let out = run("[color|red]", &off);
        assert_eq!((out.result.as_str(), out.ranges), ("", vec![r(0, 1, 0, 10)]));

        let out = run("[color|]", &on);
        assert_eq!(out.result, "");
        assert!(out.errors.is_empty());
    }

    #[test]
    fn test_number_ranges() {
        let src = "[gold 10 100|ok|rich|poor]";
        let test_cases = vec![(5, "poor"), (10, "ok"), (50, "ok"), (100, "rich"), (150, "rich")];

        for (gold, expected) in test_cases {
            let b = Bindings::new().with("gold", gold);
            let out = run(src, &b);
            assert!(out.errors.is_empty());
            assert_eq!(out.result, expected, "gold = {gold}");
            assert_eq!(
                out.code.as_deref(),
                Some("(gold >= 100 ? \"rich\" : (gold >= 10 ? \"ok\" : \"poor\"))")
            );
        }

        // no fall-through: below the first threshold shows nothing
        let b = Bindings::new().with("gold", 5);
        let out = run("[gold 10|ok]", &b);
        assert_eq!(out.result, "");
        assert_eq!(out.ranges, vec![r(0, 1, 0, 11)]);
        assert_eq!(out.code.as_deref(), Some("(gold >= 10 ? \"ok\" : \"\")"));
    }

    #[test]
    fn test_errors_are_collected() {
        let b = game();
        let test_cases = vec![
            ("[missing]", "\"missing\" does not exist", r(0, 1, 0, 8)),
            ("[pc.age]", "\"age\" does not exist in \"pc\"", r(0, 1, 0, 7)),
            ("[name.first]", "\"name\" has no children", r(0, 1, 0, 11)),
            ("[pc]", "\"pc\" cannot be displayed", r(0, 1, 0, 3)),
            ("[flag]", "\"flag\" needs at least 1 result", r(0, 1, 0, 5)),
            ("[flag|a|b|c]", "\"flag\" can have up to 2 results", r(0, 1, 0, 11)),
            ("[flag 1|a]", "\"flag\" does not take arguments", r(0, 1, 0, 9)),
            ("[color|a|b]", "\"color\" needs at least 1 argument", r(0, 1, 0, 10)),
            ("[color a b|x]", "\"color\" can only be compared against 1 argument", r(0, 1, 0, 12)),
            ("[gold 10]", "\"gold\" needs at least 1 result", r(0, 1, 0, 8)),
            ("[gold ten|x]", "\"gold\" range thresholds must be numbers", r(0, 1, 0, 11)),
            ("[gold 10|a|b|c]", "\"gold\" expected at most 2 results, but found 3", r(0, 1, 0, 14)),
            ("[add 1 x]", "\"add\" failed: x is not a number", r(0, 1, 0, 8)),
            ("[pick|a]", "\"pick\" selector 1 is out of range of results", r(0, 1, 0, 7)),
        ];

        for (src, message, range) in test_cases {
            let out = run(src, &b);
            assert_eq!(out.result, "", "result of {src:?}");
            assert_eq!(out.errors, vec![Diagnostic::new(range, message)], "errors of {src:?}");
            assert_eq!(out.ranges, vec![range], "ranges of {src:?}");
        }
    }

    #[test]
    fn test_failed_block_keeps_the_rest() {
        let b = game();
        let out = run("a [missing] b [name]", &b);
        assert_eq!(out.result, "a  b Test");
        assert_eq!(out.errors.len(), 1);
        assert_eq!(out.code.as_deref(), Some("\"a \" + \" b \" + name"));

        // a failed block inside a branch or call still yields valid code
        let test_cases = vec![
            ("[flag|[missing]|b]", "", "(flag ? \"\" : \"b\")"),
            ("[pick|[missing]|b]", "b", "pick(\"\", \"b\")"),
            ("[isRed 1|[pc]]", "red", "isRed([1], [\"\"])"),
        ];
        for (src, result, code) in test_cases {
            let out = run(src, &b);
            assert_eq!(out.errors.len(), 1, "errors of {src:?}");
            assert_eq!(out.result, result, "result of {src:?}");
            assert_eq!(out.code.as_deref(), Some(code), "code of {src:?}");
        }
    }

    #[test]
    fn test_object_renders_empty_code() {
        let b = game();
        let out = run("[pc]", &b);
        assert_eq!(out.code.as_deref(), Some(""));
    }

    #[test]
    fn test_function_limits_and_custom_code() {
        let b = Bindings::new()
            .with(
                "one",
                Function::new(|_, _| Ok(Outcome::Text("1".into())))
                    .with_arg_count(1)
                    .with_result_count(0),
            )
            .with(
                "an",
                Function::new(|_, _| Ok(Outcome::Text("an".into())))
                    .with_code(|id, _, _| format!("{id}.article()")),
            );

        let out = run("[one a b]", &b);
        assert_eq!(
            out.errors[0].message,
            "\"one\" expected at most 1 arguments, but found 2"
        );
        let out = run("[one|x]", &b);
        assert_eq!(
            out.errors[0].message,
            "\"one\" expected at most 0 results, but found 1"
        );

        let out = run("[an] apple", &b);
        assert_eq!(out.result, "an apple");
        assert_eq!(out.code.as_deref(), Some("an.article() + \" apple\""));
    }

    #[test]
    fn test_host_sees_rendered_results() {
        let b = Bindings::new().with("name", "Tom").with(
            "join",
            Function::new(|args, results| {
                let args: Vec<String> = args.iter().map(Arg::to_string).collect();
                Ok(Outcome::Text(format!("{}:{}", args.join(","), results.join(","))))
            }),
        );
        let out = run("[join 1.5 x|a [name]|b]", &b);
        assert_eq!(out.result, "1.5,x:a Tom,b");
    }

    #[test]
    fn test_access_chain() {
        let b = Bindings::new().with(
            "a",
            Symbol::object([("b", Symbol::object([("c", Symbol::from("deep"))]))]),
        );
        let id = |name: &str, col: usize| {
            Node::identity(TextRange::from_coords((0, col), (0, col + 1)), name)
        };
        let chain = Node::access(Node::access(Node::retrieve(vec![id("a", 1)]), id("b", 3)), id("c", 5));
        let end = TextRange::at(chain.range.end);
        let tree = Node::eval(
            chain.range,
            chain,
            Node::new(end, NodeKind::Args(vec![])),
            Node::new(end, NodeKind::Results(vec![])),
        );

        let out = interpret(&tree, &b);
        assert_eq!(out.result, "deep");
        assert_eq!(out.code.as_deref(), Some("a.b.c"));

        let missing = Node::access(Node::retrieve(vec![id("a", 1)]), id("x", 3));
        let tree = Node::eval(
            missing.range,
            missing,
            Node::new(end, NodeKind::Args(vec![])),
            Node::new(end, NodeKind::Results(vec![])),
        );
        let out = interpret(&tree, &b);
        assert_eq!(out.errors.len(), 1);
        assert_eq!(out.errors[0].message, "\"x\" does not exist in \"a\"");
        assert_eq!(out.errors[0].range, TextRange::from_coords((0, 3), (0, 4)));
    }

    #[test]
    fn test_without_code() {
        let b = game();
        let parsed = parse(&lex("[name]"), "[name]");
        let out = Interpreter::new(&b).without_code().interpret(&parsed.root);
        assert_eq!(out.result, "Test");
        assert_eq!(out.code, None);
    }

    #[test]
    fn test_deep_nesting_is_not_recursive() {
        const DEPTH: usize = 1_000;
        let range = TextRange::default();
        let mut tree = Node::string(range, "x");
        for _ in 0..DEPTH {
            tree = Node::new(range, NodeKind::Concat(vec![Node::string(range, "a"), tree]));
        }

        let b = Bindings::new();
        let out = std::thread::scope(|s| {
            std::thread::Builder::new()
                .stack_size(256 * 1024)
                .spawn_scoped(s, || Interpreter::new(&b).without_code().interpret(&tree))
                .map(|handle| handle.join())
        });
        let out = out.expect("spawn").expect("interpreter thread panicked");
        assert_eq!(out.result.len(), DEPTH + 1);
        assert!(out.result.ends_with("ax"));
    }
}
