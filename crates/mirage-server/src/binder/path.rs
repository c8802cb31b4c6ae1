//! Route template conversion.
//!
//! Templates carry `{name}` placeholders where `name` is a word (`[A-Za-z0-9_]+`).
//! The router pattern keeps those placeholders (matchit's parameter syntax) and
//! escapes every other brace; the display form uses Express-style `:name`.

#[derive(Debug, Clone, PartialEq)]
enum Token<'a> {
    Literal(&'a str),
    Param(&'a str),
}

fn tokenize(template: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut literal_start = 0;
    let mut cursor = 0;

    while let Some(offset) = template[cursor..].find('{') {
        let open = cursor + offset;
        let Some(close_offset) = template[open..].find('}') else {
            break;
        };
        let close = open + close_offset;
        let name = &template[open + 1..close];

        if !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            if literal_start < open {
                tokens.push(Token::Literal(&template[literal_start..open]));
            }
            tokens.push(Token::Param(name));
            literal_start = close + 1;
            cursor = close + 1;
        } else {
            cursor = open + 1;
        }
    }

    if literal_start < template.len() {
        tokens.push(Token::Literal(&template[literal_start..]));
    }
    tokens
}

/// Router pattern for a template: placeholders kept, literal braces escaped.
pub fn to_route_pattern(template: &str) -> String {
    tokenize(template)
        .into_iter()
        .map(|token| match token {
            Token::Literal(text) => text.replace('{', "{{").replace('}', "}}"),
            Token::Param(name) => format!("{{{name}}}"),
        })
        .collect()
}

/// Human-readable form used in the activity log (`/pets/:id`).
pub fn display_path(template: &str) -> String {
    tokenize(template)
        .into_iter()
        .map(|token| match token {
            Token::Literal(text) => text.to_string(),
            Token::Param(name) => format!(":{name}"),
        })
        .collect()
}

/// Placeholder names in order of appearance.
pub fn param_names(template: &str) -> Vec<&str> {
    tokenize(template)
        .into_iter()
        .filter_map(|token| match token {
            Token::Param(name) => Some(name),
            Token::Literal(_) => None,
        })
        .collect()
}
