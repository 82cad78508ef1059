use regex::Regex;
use std::sync::LazyLock;

use debugcon_abstract::{AbsKind, Abstraction};

use crate::render::inline;

static DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"%[sdifc%]").unwrap());

/// Result of applying printf-style substitution to the first argument
#[derive(Debug, Clone, PartialEq)]
pub struct Substituted {
    pub text: String,
    /// How many of the trailing args were consumed by directives
    pub consumed: usize,
}

/// Whether substitution applies: the first argument is a string containing
/// at least one directive, and more arguments follow.
pub fn applies(args: &[Abstraction]) -> bool {
    if args.len() < 2 {
        return false;
    }
    match &args[0].kind {
        AbsKind::Str(value) => DIRECTIVE.is_match(value),
        _ => false,
    }
}

/// Apply `%s` / `%d` / `%i` / `%f` / `%c` to `template`, drawing from
/// `rest` in order. `%%` is a literal percent. `%c` is the styling
/// directive: it consumes its argument but contributes no text here (the
/// markup sink renders the style; plain renderers drop it). Directives
/// beyond the supplied arguments are left verbatim.
pub fn substitute(template: &str, rest: &[Abstraction]) -> Substituted {
    let mut out = String::with_capacity(template.len());
    let mut consumed = 0;
    let mut last = 0;

    for m in DIRECTIVE.find_iter(template) {
        out.push_str(&template[last..m.start()]);
        last = m.end();

        let directive = m.as_str();
        if directive == "%%" {
            out.push('%');
            continue;
        }
        let Some(arg) = rest.get(consumed) else {
            out.push_str(directive);
            continue;
        };
        consumed += 1;
        match directive {
            "%s" => out.push_str(&inline(arg)),
            "%d" | "%i" => out.push_str(&as_int_text(arg)),
            "%f" => out.push_str(&as_float_text(arg)),
            "%c" => {}
            _ => out.push_str(directive),
        }
    }
    out.push_str(&template[last..]);

    Substituted {
        text: out,
        consumed,
    }
}

fn as_int_text(abs: &Abstraction) -> String {
    match &abs.kind {
        AbsKind::Int(i) => i.to_string(),
        AbsKind::Float(f) if f.is_finite() => (*f as i64).to_string(),
        AbsKind::Str(value) => value
            .parse::<f64>()
            .map(|f| (f as i64).to_string())
            .unwrap_or_else(|_| "NaN".to_string()),
        _ => "NaN".to_string(),
    }
}

fn as_float_text(abs: &Abstraction) -> String {
    match &abs.kind {
        AbsKind::Int(i) => (*i as f64).to_string(),
        AbsKind::Float(f) if f.is_finite() => f.to_string(),
        AbsKind::Str(value) => value
            .parse::<f64>()
            .map(|f| f.to_string())
            .unwrap_or_else(|_| "NaN".to_string()),
        _ => "NaN".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(text: &str) -> Abstraction {
        Abstraction::string(text)
    }

    #[test]
    fn substitutes_in_order() {
        let result = substitute(
            "user %s logged in %d times",
            &[s("alice"), Abstraction::of(AbsKind::Int(3))],
        );
        assert_eq!(result.text, "user alice logged in 3 times");
        assert_eq!(result.consumed, 2);
    }

    #[test]
    fn integer_directive_truncates_float() {
        let result = substitute("%i", &[Abstraction::of(AbsKind::Float(3.9))]);
        assert_eq!(result.text, "3");
    }

    #[test]
    fn percent_escape_consumes_nothing() {
        let result = substitute("100%% done: %s", &[s("ok")]);
        assert_eq!(result.text, "100% done: ok");
        assert_eq!(result.consumed, 1);
    }

    #[test]
    fn style_directive_consumes_silently() {
        let result = substitute("%cstyled%c plain", &[s("color: red"), s("")]);
        assert_eq!(result.text, "styled plain");
        assert_eq!(result.consumed, 2);
    }

    #[test]
    fn missing_args_leave_directive_verbatim() {
        let result = substitute("%s and %s", &[s("one")]);
        assert_eq!(result.text, "one and %s");
        assert_eq!(result.consumed, 1);
    }

    #[test]
    fn applies_requires_directive_and_extra_args() {
        assert!(applies(&[s("%s"), s("x")]));
        assert!(!applies(&[s("%s")]));
        assert!(!applies(&[s("no directives"), s("x")]));
        assert!(!applies(&[Abstraction::of(AbsKind::Int(1)), s("x")]));
    }
}
