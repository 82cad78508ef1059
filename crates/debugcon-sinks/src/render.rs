use debugcon_abstract::{AbsKind, Abstraction};

/// One-line plain rendering of an abstraction, shared by the text sink,
/// substitution, and the tabular layout.
///
/// Composite values collapse to a count; the placeholder forms for
/// recursion and excluded objects are the only rendering those states ever
/// get, on any sink.
pub fn inline(abs: &Abstraction) -> String {
    if abs.is_recursion {
        return "*RECURSION*".to_string();
    }
    if abs.is_excluded {
        if let AbsKind::Object(obj) = &abs.kind {
            return format!("*EXCLUDED* {}", obj.class_name);
        }
        return "*EXCLUDED*".to_string();
    }
    let text = match &abs.kind {
        AbsKind::Null => "null".to_string(),
        AbsKind::Undefined => "undefined".to_string(),
        AbsKind::Bool(b) => b.to_string(),
        AbsKind::Int(i) => i.to_string(),
        AbsKind::Float(f) => {
            if f.is_nan() {
                "NaN".to_string()
            } else if f.is_infinite() {
                if *f > 0.0 { "INF" } else { "-INF" }.to_string()
            } else {
                f.to_string()
            }
        }
        AbsKind::Str(value) => value.clone(),
        AbsKind::Array(items) => format!("array({})", items.len()),
        AbsKind::Map(entries) => format!("array({})", entries.len()),
        AbsKind::Object(obj) => obj.class_name.clone(),
        AbsKind::Callable(name) => format!("callable: {}", name),
        AbsKind::Resource(desc) => format!("Resource: {}", desc),
        AbsKind::Recursion => "*RECURSION*".to_string(),
        AbsKind::Custom(label) => label.clone(),
    };
    match &abs.date_hint {
        Some(hint) => format!("{} ({})", text, hint),
        None => text,
    }
}

/// Multi-line plain rendering: composites expand one level per line with
/// two-space inner indentation. Used by the text sink for non-scalar args.
pub fn expanded(abs: &Abstraction, indent: usize) -> String {
    let pad = "  ".repeat(indent);
    if abs.is_recursion || abs.is_excluded {
        return format!("{}{}", pad, inline(abs));
    }
    match &abs.kind {
        AbsKind::Array(items) => {
            let mut out = format!("{}array(", pad);
            for item in items {
                out.push('\n');
                out.push_str(&expanded(item, indent + 1));
            }
            out.push('\n');
            out.push_str(&pad);
            out.push(')');
            out
        }
        AbsKind::Map(entries) => {
            let mut out = format!("{}array(", pad);
            for (key, item) in entries {
                out.push('\n');
                out.push_str(&format!("{}  [{}] => {}", pad, key, inline(item)));
            }
            out.push('\n');
            out.push_str(&pad);
            out.push(')');
            out
        }
        AbsKind::Object(obj) => {
            let mut out = format!("{}{} {{", pad, obj.class_name);
            for prop in &obj.properties {
                out.push('\n');
                out.push_str(&format!(
                    "{}  ({}) {} = {}",
                    pad,
                    visibility_name(prop.visibility),
                    prop.name,
                    inline(&prop.value)
                ));
            }
            out.push('\n');
            out.push_str(&pad);
            out.push('}');
            out
        }
        _ => format!("{}{}", pad, inline(abs)),
    }
}

pub fn visibility_name(visibility: debugcon_types::Visibility) -> &'static str {
    use debugcon_types::Visibility;
    match visibility {
        Visibility::Public => "public",
        Visibility::Protected => "protected",
        Visibility::Private => "private",
        Visibility::Magic => "magic",
        Visibility::Debug => "debug",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_placeholders() {
        assert_eq!(inline(&Abstraction::recursion()), "*RECURSION*");
        assert_eq!(inline(&Abstraction::excluded("Big")), "*EXCLUDED* Big");
        assert_eq!(inline(&Abstraction::of(AbsKind::Null)), "null");
    }

    #[test]
    fn inline_date_hint_is_appended() {
        let mut abs = Abstraction::of(AbsKind::Int(1_700_000_000));
        abs.type_more = Some("timestamp".to_string());
        abs.date_hint = Some("2023-11-14 22:13:20".to_string());
        assert_eq!(inline(&abs), "1700000000 (2023-11-14 22:13:20)");

        let mut text = Abstraction::string("1700000000");
        text.date_hint = Some("2023-11-14 22:13:20".to_string());
        assert_eq!(inline(&text), "1700000000 (2023-11-14 22:13:20)");
    }

    #[test]
    fn expanded_array_nests() {
        let abs = Abstraction::of(AbsKind::Array(vec![
            Abstraction::of(AbsKind::Int(1)),
            Abstraction::of(AbsKind::Array(vec![Abstraction::of(AbsKind::Int(2))])),
        ]));
        let text = expanded(&abs, 0);
        assert!(text.starts_with("array("));
        assert!(text.contains("\n  1"));
        assert!(text.contains("\n  array("));
    }
}
