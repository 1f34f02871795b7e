/// Render a heuristic message in the given style. Never empty for a
/// non-empty action and target.
pub fn format(action: &str, scope: &str, target: &str, style_id: &str) -> String {
    let scope_prefix = if scope.is_empty() {
        String::new()
    } else {
        format!("{scope}: ")
    };

    match style_id {
        "conventional" => {
            let kind = conventional_type(action);
            if scope.is_empty() {
                format!("{kind}: {action} {target}")
            } else {
                format!("{kind}({scope}): {action} {target}")
            }
        }
        "emoji" => format!("{} {scope_prefix}{action} {target}", action_emoji(action)),
        "corporate" => format!(
            "{scope_prefix}{} {target} to enhance system functionality",
            capitalize(action)
        ),
        "casual" => format!("{scope_prefix}{} {target}", past_tense(action)),
        "genz" => format!(
            "{scope_prefix}{} {target} and it hits different \u{1F525}",
            past_tense(action)
        ),
        _ => format!("{scope_prefix}{action} {target}"),
    }
}

pub fn conventional_type(action: &str) -> &'static str {
    match action {
        "add" => "feat",
        "remove" => "refactor",
        "test" => "test",
        "document" => "docs",
        "style" => "style",
        "configure" | "update dependencies" => "chore",
        _ => "feat",
    }
}

pub fn action_emoji(action: &str) -> &'static str {
    match action {
        "add" => "\u{2728}",
        "remove" => "\u{1F5D1}\u{FE0F}",
        "test" => "\u{1F9EA}",
        "document" => "\u{1F4DD}",
        "style" => "\u{1F484}",
        "configure" => "\u{2699}\u{FE0F}",
        "update dependencies" => "\u{2B06}\u{FE0F}",
        "refactor" => "\u{267B}\u{FE0F}",
        _ => "\u{1F527}",
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Past tense of the leading verb: `add` -> `added`, `configure` -> `configured`.
fn past_tense(action: &str) -> String {
    let (verb, rest) = match action.split_once(' ') {
        Some((verb, rest)) => (verb, Some(rest)),
        None => (action, None),
    };
    let verb = if verb.ends_with('e') {
        format!("{verb}d")
    } else {
        format!("{verb}ed")
    };
    match rest {
        Some(rest) => format!("{verb} {rest}"),
        None => verb,
    }
}
