//! Splitting of the comma separated tables kept in the stores: the credential table and the
//! image manifests.
//!
//! A field may be wrapped in double quotes to hold commas, with `""` standing for a quote inside
//! it. Records never span lines.

/// Splits one line into its fields. A trailing `\r` is dropped.
pub fn split_record(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut chars = line.trim_end_matches('\r').chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                chars.next();
                field.push('"');
            }
            '"' if quoted => quoted = false,
            '"' if field.is_empty() => quoted = true,
            ',' if !quoted => fields.push(std::mem::take(&mut field)),
            c => field.push(c),
        }
    }
    fields.push(field);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn plain_fields() {
        assert_eq!(split_record("a,b,,c\r"), vec!["a", "b", "", "c"]);
        assert_eq!(split_record(""), vec![""]);
    }

    #[test]
    fn quoted_fields_keep_commas_and_quotes() {
        assert_eq!(split_record(r#"alice,"s3,cr""et",Y"#), vec!["alice", "s3,cr\"et", "Y"]);
        assert_eq!(split_record(r#"a"b,c"#), vec!["a\"b", "c"]);
    }
}
