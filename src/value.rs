//! Declaration value helpers and `value()` / formatter evaluation

use crate::diagnostics::{Diagnostics, SourceLocation};
use crate::meta::{Resolution, StylableMeta, StylableSymbol};
use crate::resolver::StylableResolver;
use crate::script::{ScriptReturn, ScriptValue};
use std::collections::HashMap;
use std::rc::Rc;

/// Split on `separator` outside strings and parentheses; parts are trimmed
pub fn split_top_level(text: &str, separator: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for c in text.chars() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
                current.push(c);
            }
            None => match c {
                '"' | '\'' => {
                    quote = Some(c);
                    current.push(c);
                }
                '(' => {
                    depth += 1;
                    current.push(c);
                }
                ')' => {
                    depth = depth.saturating_sub(1);
                    current.push(c);
                }
                c if c == separator && depth == 0 => {
                    parts.push(current.trim().to_string());
                    current.clear();
                }
                _ => current.push(c),
            },
        }
    }
    if !current.trim().is_empty() || !parts.is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

pub fn is_quoted(text: &str) -> bool {
    let text = text.trim();
    text.len() >= 2
        && ((text.starts_with('"') && text.ends_with('"')) || (text.starts_with('\'') && text.ends_with('\'')))
}

pub fn unquote(text: &str) -> String {
    let text = text.trim();
    if is_quoted(text) {
        text[1..text.len() - 1].to_string()
    } else {
        text.to_string()
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

/// Replace whole identifier words outside strings and function arguments
pub fn map_words(text: &str, map: &dyn Fn(&str) -> Option<String>) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '"' || c == '\'' || c == '(' {
            let end = skip_group(&chars, i);
            out.extend(&chars[i..end]);
            i = end;
        } else if is_word_char(c) {
            let start = i;
            while i < chars.len() && is_word_char(chars[i]) {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            if i < chars.len() && chars[i] == '(' {
                out.push_str(&word);
                continue;
            }
            match map(&word) {
                Some(replacement) => out.push_str(&replacement),
                None => out.push_str(&word),
            }
        } else {
            out.push(c);
            i += 1;
        }
    }
    out
}

/// Index just past the string or parenthesized group starting at `start`
fn skip_group(chars: &[char], start: usize) -> usize {
    let open = chars[start];
    let mut i = start + 1;
    if open == '"' || open == '\'' {
        while i < chars.len() {
            if chars[i] == '\\' {
                i += 2;
                continue;
            }
            if chars[i] == open {
                return i + 1;
            }
            i += 1;
        }
        return chars.len();
    }

    let mut depth = 1usize;
    while i < chars.len() {
        match chars[i] {
            '"' | '\'' => {
                i = skip_group(chars, i);
                continue;
            }
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return i + 1;
                }
            }
            _ => {}
        }
        i += 1;
    }
    chars.len()
}

/// Evaluates `value()` references and formatter calls in declaration values.
///
/// `path` carries `"<file>: <name>"` tokens for the vars currently being
/// evaluated; a repeated token is a cyclic definition.
pub struct ValueEvaluator<'a> {
    resolver: &'a StylableResolver,
    /// Leave unknown `value()` references literal without reporting them
    partial: bool,
}

impl<'a> ValueEvaluator<'a> {
    pub fn new(resolver: &'a StylableResolver, partial: bool) -> Self {
        Self { resolver, partial }
    }

    pub fn eval(
        &self,
        meta: &Rc<StylableMeta>,
        text: &str,
        overrides: &HashMap<String, String>,
        path: &mut Vec<String>,
        location: &SourceLocation,
        diagnostics: &mut Diagnostics,
    ) -> String {
        if !text.contains('(') {
            return text.to_string();
        }

        let chars: Vec<char> = text.chars().collect();
        let mut out = String::new();
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            if c == '"' || c == '\'' {
                let end = skip_group(&chars, i);
                out.extend(&chars[i..end]);
                i = end;
            } else if is_word_char(c) {
                let start = i;
                while i < chars.len() && is_word_char(chars[i]) {
                    i += 1;
                }
                let name: String = chars[start..i].iter().collect();
                if i >= chars.len() || chars[i] != '(' {
                    out.push_str(&name);
                    continue;
                }
                let end = skip_group(&chars, i);
                let close = if end > i + 1 && chars[end - 1] == ')' { end - 1 } else { end };
                let args: String = chars[i + 1..close].iter().collect();
                let call: String = chars[start..end].iter().collect();
                i = end;

                let evaluated = match name.as_str() {
                    "value" => self.eval_var(meta, args.trim(), overrides, path, location, diagnostics),
                    "url" => call,
                    _ => match self.formatter(meta, &name) {
                        Some(function) => {
                            let args_text = self.eval(meta, &args, overrides, path, location, diagnostics);
                            let args: Vec<String> = split_top_level(&args_text, ',').iter().map(|a| unquote(a)).collect();
                            match function(&args) {
                                Ok(ScriptReturn::Text(result)) => result,
                                Ok(ScriptReturn::Object(_)) => {
                                    diagnostics.error(
                                        location.clone(),
                                        format!("formatter \"{}\" must return a string", name),
                                        Some(name.as_str()),
                                    );
                                    call
                                }
                                Err(message) => {
                                    diagnostics.error(
                                        location.clone(),
                                        format!("failed to execute formatter \"{}\": {}", name, message),
                                        Some(name.as_str()),
                                    );
                                    call
                                }
                            }
                        }
                        None => format!("{}({})", name, self.eval(meta, &args, overrides, path, location, diagnostics)),
                    },
                };
                out.push_str(&evaluated);
            } else {
                out.push(c);
                i += 1;
            }
        }
        out
    }

    fn formatter(&self, meta: &Rc<StylableMeta>, name: &str) -> Option<crate::script::ScriptFunction> {
        let symbol = meta.mapped_symbols.get(name)?;
        if !matches!(symbol, StylableSymbol::Import(_)) {
            return None;
        }
        match self.resolver.deep_resolve(meta, symbol) {
            Some(Resolution::Script(script)) => match script.value {
                ScriptValue::Function(function) => Some(function),
                ScriptValue::Text(_) => None,
            },
            _ => None,
        }
    }

    fn eval_var(
        &self,
        meta: &Rc<StylableMeta>,
        name: &str,
        overrides: &HashMap<String, String>,
        path: &mut Vec<String>,
        location: &SourceLocation,
        diagnostics: &mut Diagnostics,
    ) -> String {
        let literal = format!("value({})", name);
        if let Some(value) = overrides.get(name) {
            return value.clone();
        }

        let token = format!("{}: {}", meta.source_name(), name);
        if path.contains(&token) {
            let mut chain = path.clone();
            chain.push(token);
            diagnostics.error(
                location.clone(),
                format!("cyclic value definition detected: \"{}\"", chain.join(" --> ")),
                Some(name),
            );
            return literal;
        }

        if let Some(var) = meta.vars.get(name) {
            path.push(token);
            let value = self.eval(meta, &var.value, &HashMap::new(), path, location, diagnostics);
            path.pop();
            return value;
        }

        match meta.mapped_symbols.get(name) {
            Some(symbol @ StylableSymbol::Import(_)) => match self.resolver.deep_resolve(meta, symbol) {
                Some(Resolution::Css(css)) => match &css.symbol {
                    StylableSymbol::Var(var) => {
                        path.push(token);
                        let value = self.eval(&css.meta, &var.value, &HashMap::new(), path, location, diagnostics);
                        path.pop();
                        value
                    }
                    other => {
                        diagnostics.error(
                            location.clone(),
                            format!("\"{}\" is a {} and cannot be used as a var", name, other.kind_name()),
                            Some(name),
                        );
                        literal
                    }
                },
                Some(Resolution::Script(script)) => match script.value {
                    ScriptValue::Text(text) => text,
                    ScriptValue::Function(_) => {
                        diagnostics.error(
                            location.clone(),
                            format!("\"{}\" is a function and cannot be used as a var", name),
                            Some(name),
                        );
                        literal
                    }
                },
                None => {
                    diagnostics.warn(location.clone(), format!("cannot resolve imported var \"{}\"", name), Some(name));
                    literal
                }
            },
            Some(other) => {
                diagnostics.error(
                    location.clone(),
                    format!("\"{}\" is a {} and cannot be used as a var", name, other.kind_name()),
                    Some(name),
                );
                literal
            }
            None => {
                if !self.partial {
                    diagnostics.warn(location.clone(), format!("unknown var \"{}\"", name), Some(name));
                }
                literal
            }
        }
    }
}

/// Whether `text` references `value(<name>)` for any of `names`
pub fn references_any(text: &str, names: &[&String]) -> bool {
    names.iter().any(|name| text.contains(&format!("value({})", name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_top_level() {
        assert_eq!(
            split_top_level("a, b(c, d), \"e,f\"", ','),
            vec!["a".to_string(), "b(c, d)".to_string(), "\"e,f\"".to_string()]
        );
        assert!(split_top_level("  ", ',').is_empty());
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("\"./a.st.css\""), "./a.st.css");
        assert_eq!(unquote("'x'"), "x");
        assert_eq!(unquote("plain"), "plain");
        assert!(!is_quoted("\""));
    }

    #[test]
    fn test_map_words_skips_functions_and_strings() {
        let renamed = map_words("slide 1s ease, \"slide\" cubic-bezier(slide)", &|word: &str| {
            (word == "slide").then(|| "ns--slide".to_string())
        });
        assert_eq!(renamed, "ns--slide 1s ease, \"slide\" cubic-bezier(slide)");
    }
}
