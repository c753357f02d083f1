//! Section tokenizer and argument splitting
//!
//! Turns preprocessed lines into `[section]` groups of `key = value` records.

use std::ops::Range;

/// One `key = value` line inside a section.
#[derive(Debug, Clone, PartialEq)]
pub struct Record<'a> {
    /// Key as written (trimmed)
    pub key: &'a str,
    /// Value (trimmed)
    pub value: &'a str,
    /// 1-based line number
    pub line: usize,
}

impl Record<'_> {
    /// Lowercase key used for dispatch.
    pub fn key_lower(&self) -> String {
        self.key.to_lowercase()
    }
}

/// A `[name]` header and the records of its body.
#[derive(Debug, Clone)]
pub struct Section<'a> {
    /// Section name as written (trimmed, without brackets)
    pub name: &'a str,
    /// 1-based line number of the header
    pub line: usize,
    /// 0-based line indices covered by the header and body
    pub span: Range<usize>,
    /// Records in file order
    pub records: Vec<Record<'a>>,
}

impl Section<'_> {
    /// Lowercase name used for dispatch.
    pub fn name_lower(&self) -> String {
        self.name.to_lowercase()
    }
}

/// Output of [`tokenize`].
#[derive(Debug, Clone, Default)]
pub struct Tokenized<'a> {
    /// Non-blank lines before the first header, with their 1-based line numbers
    pub preamble: Vec<(usize, &'a str)>,
    /// Sections in file order
    pub sections: Vec<Section<'a>>,
}

/// Group preprocessed lines into sections.
///
/// Body lines without `=` are dropped; they never disturb the records around them.
pub fn tokenize<S: AsRef<str>>(lines: &[S]) -> Tokenized<'_> {
    let mut out = Tokenized::default();

    for (i, line) in lines.iter().enumerate() {
        let line = line.as_ref();
        if line.is_empty() {
            continue;
        }

        if let Some(name) = parse_section_header(line) {
            if let Some(last) = out.sections.last_mut() {
                last.span.end = i;
            }
            out.sections.push(Section {
                name,
                line: i + 1,
                span: i..lines.len(),
                records: Vec::new(),
            });
            continue;
        }

        match out.sections.last_mut() {
            Some(section) => {
                if let Some((key, value)) = parse_key_value(line) {
                    section.records.push(Record {
                        key,
                        value,
                        line: i + 1,
                    });
                }
            }
            None => out.preamble.push((i + 1, line)),
        }
    }

    out
}

/// Recognise a `[name]` header line, returning the trimmed name.
pub fn parse_section_header(line: &str) -> Option<&str> {
    let inner = line.trim().strip_prefix('[')?.strip_suffix(']')?;
    if inner.contains(']') {
        return None;
    }
    Some(inner.trim())
}

/// Parse a key = value line
pub fn parse_key_value(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once('=')?;
    Some((key.trim(), value.trim()))
}

/// Split a compound value into fields.
///
/// `,` and `:` separate fields, `;` ends the value. Separated fields lose
/// leading whitespace, the final field loses trailing whitespace.
pub fn split_arguments(value: &str) -> Vec<String> {
    if value.is_empty() {
        return vec![String::new()];
    }

    let mut args = Vec::new();
    let mut start = 0;
    let mut terminated = false;

    for (i, ch) in value.char_indices() {
        match ch {
            ',' | ':' => {
                args.push(value[start..i].trim_start().to_string());
                start = i + ch.len_utf8();
            }
            ';' => {
                args.push(value[start..i].trim_end().to_string());
                terminated = true;
                break;
            }
            _ => {}
        }
    }

    if !terminated && start < value.len() {
        args.push(value[start..].trim().to_string());
    }
    args
}

/// Split a two-part value (`x, y`) at its first comma.
pub fn split_pair(value: &str) -> Option<(&str, &str)> {
    let (a, b) = value.split_once(',')?;
    Some((a.trim_end(), b.trim_start()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(parse_key_value("key = value"), Some(("key", "value")));
        assert_eq!(parse_key_value("Center=0,512"), Some(("Center", "0,512")));
        assert_eq!(parse_key_value("a = b = c"), Some(("a", "b = c")));
        assert_eq!(parse_key_value("no equals"), None);
    }

    #[test]
    fn test_parse_section_header() {
        assert_eq!(parse_section_header("[Needle]"), Some("Needle"));
        assert_eq!(parse_section_header("[ This ]"), Some("This"));
        assert_eq!(parse_section_header("[a]b]"), None);
        assert_eq!(parse_section_header("Needle]"), None);
    }

    #[test]
    fn test_split_arguments() {
        assert_eq!(split_arguments("10,20;ignored"), vec!["10", "20"]);
        assert_eq!(split_arguments(""), vec![""]);
        assert_eq!(split_arguments("a:b:c"), vec!["a", "b", "c"]);
        assert_eq!(split_arguments("bc, 255, 0 ,0"), vec!["bc", "255", "0 ", "0"]);
        assert_eq!(split_arguments("kpa"), vec!["kpa"]);
    }

    #[test]
    fn test_tokenize_groups_records() {
        let lines = vec![
            "[This]",
            "Resolution = 1024",
            "this line has no equals sign",
            "Left = 0",
            "",
            "[Needle]",
            "Subject = kmph",
        ];
        let tokens = tokenize(&lines);
        assert!(tokens.preamble.is_empty());
        assert_eq!(tokens.sections.len(), 2);

        let this = &tokens.sections[0];
        assert_eq!(this.name, "This");
        assert_eq!(this.line, 1);
        assert_eq!(this.span, 0..5);
        let keys: Vec<_> = this.records.iter().map(|r| (r.key, r.line)).collect();
        assert_eq!(keys, vec![("Resolution", 2), ("Left", 4)]);

        let needle = &tokens.sections[1];
        assert_eq!(needle.name_lower(), "needle");
        assert_eq!(needle.span, 5..7);
        assert_eq!(needle.records[0].value, "kmph");
    }

    #[test]
    fn test_tokenize_preamble() {
        let lines = vec!["Version 1.0", "", "[Panel]", "Background = panel.bmp"];
        let tokens = tokenize(&lines);
        assert_eq!(tokens.preamble, vec![(1, "Version 1.0")]);
        assert_eq!(tokens.sections.len(), 1);
    }
}
