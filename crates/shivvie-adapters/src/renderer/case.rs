//! Identifier case conversion used by the renderer helpers.

/// `MyApp` / `my-app` -> `my_app`
pub fn to_snake_case(s: &str) -> String {
    split_words(s).join("_")
}

/// `MyApp` / `my_app` -> `my-app`
pub fn to_kebab_case(s: &str) -> String {
    split_words(s).join("-")
}

/// `my-app` / `HTTPRequest` -> `MyApp` / `HttpRequest`
pub fn to_pascal_case(s: &str) -> String {
    split_words(s).iter().map(|w| capitalize(w)).collect()
}

/// `my-app` -> `myApp`
pub fn to_camel_case(s: &str) -> String {
    split_words(s)
        .iter()
        .enumerate()
        .map(|(i, w)| if i == 0 { w.clone() } else { capitalize(w) })
        .collect()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => {
            let mut out = String::new();
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
            out
        }
        None => String::new(),
    }
}

/// Split on `_`, `-`, whitespace, lower->upper transitions and acronym
/// boundaries (`HTTPServer` -> `http`, `server`). Words come back lowercase.
fn split_words(input: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '_' || c == '-' || c.is_whitespace() {
            if !current.is_empty() {
                words.push(current.to_lowercase());
                current.clear();
            }
            continue;
        }

        if let Some(&next) = chars.peek() {
            let lower_to_upper = c.is_lowercase() && next.is_uppercase();
            let acronym_end = c.is_uppercase()
                && next.is_uppercase()
                && chars.clone().nth(1).is_some_and(char::is_lowercase);
            if lower_to_upper || acronym_end {
                current.push(c);
                words.push(current.to_lowercase());
                current.clear();
                continue;
            }
        }

        current.push(c);
    }

    if !current.is_empty() {
        words.push(current.to_lowercase());
    }
    words
}
