/// Quotes a label, type or property name for Cypher when it is not a plain
/// identifier. Backticks inside the name are doubled.
pub fn quote_ident(name: &str) -> String {
    if is_plain_ident(name) {
        name.to_string()
    } else {
        format!("`{}`", name.replace('`', "``"))
    }
}

fn is_plain_ident(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// `:A:B` label suffix for a node pattern, empty for no labels.
pub fn label_string<S: AsRef<str>>(labels: &[S]) -> String {
    labels
        .iter()
        .map(|l| format!(":{}", quote_ident(l.as_ref())))
        .collect()
}

/// `:A:B` label column of the CSV layout. Labels containing `:` or a
/// backtick are backtick-quoted so the column splits back unambiguously.
pub fn csv_label_field<S: AsRef<str>>(labels: &[S]) -> String {
    labels
        .iter()
        .map(|l| {
            let l = l.as_ref();
            if l.contains([':', '`']) {
                format!(":`{}`", l.replace('`', "``"))
            } else {
                format!(":{l}")
            }
        })
        .collect()
}

/// Inverse of [`csv_label_field`]. Empty segments are skipped.
pub fn parse_label_field(raw: &str) -> Result<Vec<String>, String> {
    let mut labels = Vec::new();
    let mut chars = raw.chars().peekable();
    loop {
        while chars.next_if_eq(&':').is_some() {}
        let Some(first) = chars.next() else {
            break;
        };
        let mut label = String::new();
        if first == '`' {
            loop {
                match chars.next() {
                    Some('`') if chars.next_if_eq(&'`').is_some() => label.push('`'),
                    Some('`') => break,
                    Some(c) => label.push(c),
                    None => return Err(format!("unterminated quoted label in '{raw}'")),
                }
            }
        } else {
            label.push(first);
            while let Some(c) = chars.next_if(|&c| c != ':') {
                label.push(c);
            }
        }
        labels.push(label);
    }
    Ok(labels)
}

/// Parses a comma separated id list as accepted on the command line.
pub fn parse_id_list(input: &str) -> Result<Vec<u64>, String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<u64>().map_err(|e| format!("invalid id '{s}': {e}")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("Person"), "Person");
        assert_eq!(quote_ident("_private1"), "_private1");
        assert_eq!(quote_ident("UNIQUE IMPORT LABEL"), "`UNIQUE IMPORT LABEL`");
        assert_eq!(quote_ident("1abc"), "`1abc`");
        assert_eq!(quote_ident("we`ird"), "`we``ird`");
        assert_eq!(quote_ident(""), "``");
    }

    #[test]
    fn test_label_string() {
        assert_eq!(label_string(&["Person", "Big Dog"]), ":Person:`Big Dog`");
        assert_eq!(label_string::<&str>(&[]), "");
    }

    #[test]
    fn test_csv_label_field_quotes_colons() {
        assert_eq!(csv_label_field(&["Person", "Big Dog"]), ":Person:Big Dog");
        assert_eq!(csv_label_field(&["ns:Thing", "a`b"]), ":`ns:Thing`:`a``b`");
        assert_eq!(
            parse_label_field(":`ns:Thing`:`a``b`:Person").unwrap(),
            vec!["ns:Thing", "a`b", "Person"]
        );
        assert_eq!(parse_label_field(":A::B").unwrap(), vec!["A", "B"]);
        assert_eq!(parse_label_field("").unwrap(), Vec::<String>::new());
        assert!(parse_label_field(":`open").is_err());
    }

    #[test]
    fn test_parse_id_list() {
        assert_eq!(parse_id_list("1, 2,3").unwrap(), vec![1, 2, 3]);
        assert_eq!(parse_id_list("").unwrap(), Vec::<u64>::new());
        assert!(parse_id_list("1,x").is_err());
    }
}
