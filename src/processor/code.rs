//! Helpers for the expression ("code") form the interpreter can emit next to
//! the rendered text.

/// Double-quoted literal with `\`, newline and both quote kinds escaped.
pub fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Number literal as written in code and rendered text (`100`, `1.5`).
/// Very large or small magnitudes switch to exponent form (`1e21`,
/// `1e-7`); non-finite values print as `Infinity`, `-Infinity`, `NaN`.
pub fn number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let magnitude = n.abs();
    if magnitude >= 1e21 || (magnitude != 0.0 && magnitude < 1e-6) {
        format!("{n:e}")
    } else {
        format!("{n}")
    }
}

/// Comma separated list.
pub fn list(items: &[String]) -> String {
    items.join(", ")
}

/// Builds a chained ternary: `(c0 ? r0 : (c1 ? r1 : else))`.
#[derive(Debug, Default)]
pub struct ConditionBuilder {
    branches: Vec<(String, String)>,
    otherwise: Option<String>,
}

impl ConditionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn when(mut self, condition: impl Into<String>, result: impl Into<String>) -> Self {
        self.branches.push((condition.into(), result.into()));
        self
    }

    pub fn otherwise(mut self, result: impl Into<String>) -> Self {
        self.otherwise = Some(result.into());
        self
    }

    pub fn build(self) -> String {
        let mut out = String::new();
        for (condition, result) in &self.branches {
            out.push_str(&format!("({condition} ? {result} : "));
        }
        out.push_str(self.otherwise.as_deref().unwrap_or("\"\""));
        out.push_str(&")".repeat(self.branches.len()));
        out
    }
}
