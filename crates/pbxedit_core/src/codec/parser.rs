//! Recursive-descent parser for manifest text.

use crate::codec::{DocumentParser, ParseError};
use crate::model::document::{Document, Record, Section};
use crate::model::value::{Dict, ObjectId, ObjectRef, Value};

/// Default [`DocumentParser`] for the manifest dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct PbxParser;

impl DocumentParser for PbxParser {
    fn parse(&self, text: &str) -> Result<Document, ParseError> {
        let mut cursor = Cursor::new(text);
        let document = cursor.parse_root()?;
        cursor.skip_trivia()?;
        if let Some(ch) = cursor.peek() {
            return Err(cursor.error(format!("unexpected `{ch}` after document")));
        }
        Ok(document)
    }
}

struct Cursor<'a> {
    text: &'a str,
    pos: usize,
    line: usize,
    column: usize,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text: text.strip_prefix('\u{feff}').unwrap_or(text),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn starts_with(&self, pattern: &str) -> bool {
        self.text[self.pos..].starts_with(pattern)
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            line: self.line,
            column: self.column,
            message: message.into(),
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), ParseError> {
        self.skip_trivia()?;
        match self.peek() {
            Some(ch) if ch == expected => {
                self.bump();
                Ok(())
            }
            Some(ch) => Err(self.error(format!("expected `{expected}`, found `{ch}`"))),
            None => Err(self.error(format!("expected `{expected}`, found end of input"))),
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(ch) if ch.is_whitespace()) {
            self.bump();
        }
    }

    fn skip_trivia(&mut self) -> Result<(), ParseError> {
        loop {
            self.skip_whitespace();
            if self.starts_with("/*") {
                self.block_comment()?;
            } else if self.starts_with("//") {
                self.line_comment();
            } else {
                return Ok(());
            }
        }
    }

    fn block_comment(&mut self) -> Result<String, ParseError> {
        let opened_at = self.error("unterminated comment");
        self.bump();
        self.bump();
        let start = self.pos;
        loop {
            if self.starts_with("*/") {
                let body = self.text[start..self.pos].trim().to_string();
                self.bump();
                self.bump();
                return Ok(body);
            }
            if self.bump().is_none() {
                return Err(opened_at);
            }
        }
    }

    fn line_comment(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == '\n' {
                break;
            }
            self.bump();
        }
    }

    /// Block comment directly after a value or key, if any.
    fn trailing_comment(&mut self) -> Result<Option<String>, ParseError> {
        self.skip_whitespace();
        if self.starts_with("/*") {
            self.block_comment().map(Some)
        } else {
            Ok(None)
        }
    }

    /// Returns `true` when the next significant char closes the container.
    fn at_close(&mut self, close: char, what: &str) -> Result<bool, ParseError> {
        self.skip_trivia()?;
        match self.peek() {
            Some(ch) if ch == close => {
                self.bump();
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(self.error(format!("unterminated {what}"))),
        }
    }

    fn parse_root(&mut self) -> Result<Document, ParseError> {
        self.expect('{')?;
        let mut document = Document::default();
        while !self.at_close('}', "dictionary")? {
            let (key, _) = self.parse_key()?;
            self.expect('=')?;
            if key == "objects" {
                self.parse_objects(&mut document)?;
            } else {
                let value = self.parse_value()?;
                document.properties.insert(key, value);
            }
            self.expect(';')?;
        }
        Ok(document)
    }

    fn parse_objects(&mut self, document: &mut Document) -> Result<(), ParseError> {
        self.expect('{')?;
        while !self.at_close('}', "objects dictionary")? {
            let key_position = self.error("");
            let (id, comment) = self.parse_key()?;
            self.expect('=')?;
            self.skip_trivia()?;
            if self.peek() != Some('{') {
                return Err(self.error(format!("object `{id}` must be a dictionary")));
            }
            let fields = self.parse_dict()?;
            self.expect(';')?;

            let Some(isa) = fields.get_str("isa").map(str::to_string) else {
                return Err(ParseError {
                    message: format!("object `{id}` has no isa"),
                    ..key_position
                });
            };
            let record = Record {
                id: ObjectId::new(id),
                comment,
                fields,
            };
            match document.section_by_isa_mut(&isa) {
                Some(section) => section.insert(record),
                None => {
                    let mut section = Section::new(isa);
                    section.insert(record);
                    document.push_section(section);
                }
            }
        }
        Ok(())
    }

    fn parse_key(&mut self) -> Result<(String, Option<String>), ParseError> {
        self.skip_trivia()?;
        let key = self.parse_string()?;
        let comment = self.trailing_comment()?;
        Ok((key, comment))
    }

    fn parse_value(&mut self) -> Result<Value, ParseError> {
        self.skip_trivia()?;
        match self.peek() {
            Some('{') => self.parse_dict().map(Value::Dict),
            Some('(') => self.parse_array().map(Value::Array),
            Some(_) => {
                let text = self.parse_string()?;
                match self.trailing_comment()? {
                    Some(comment) => Ok(Value::Ref(ObjectRef::new(text, comment))),
                    None => Ok(Value::String(text)),
                }
            }
            None => Err(self.error("expected value, found end of input")),
        }
    }

    fn parse_dict(&mut self) -> Result<Dict, ParseError> {
        self.expect('{')?;
        let mut dict = Dict::new();
        while !self.at_close('}', "dictionary")? {
            let (key, _) = self.parse_key()?;
            self.expect('=')?;
            let value = self.parse_value()?;
            self.expect(';')?;
            dict.insert(key, value);
        }
        Ok(dict)
    }

    fn parse_array(&mut self) -> Result<Vec<Value>, ParseError> {
        self.expect('(')?;
        let mut items = Vec::new();
        while !self.at_close(')', "array")? {
            items.push(self.parse_value()?);
            self.skip_trivia()?;
            match self.peek() {
                Some(',') => {
                    self.bump();
                }
                Some(')') => {}
                Some(ch) => return Err(self.error(format!("expected `,` or `)`, found `{ch}`"))),
                None => return Err(self.error("unterminated array")),
            }
        }
        Ok(items)
    }

    fn parse_string(&mut self) -> Result<String, ParseError> {
        match self.peek() {
            Some('"') => self.parse_quoted(),
            Some(ch) if is_bare_char(ch) => Ok(self.parse_bare()),
            Some(ch) => Err(self.error(format!("unexpected `{ch}`"))),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn parse_bare(&mut self) -> String {
        let start = self.pos;
        while matches!(self.peek(), Some(ch) if is_bare_char(ch)) {
            if self.starts_with("/*") || self.starts_with("//") {
                break;
            }
            self.bump();
        }
        self.text[start..self.pos].to_string()
    }

    fn parse_quoted(&mut self) -> Result<String, ParseError> {
        let opened_at = self.error("unterminated string");
        self.bump();
        let mut value = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(value),
                Some('\\') => match self.bump() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some('r') => value.push('\r'),
                    Some('U') => value.push(self.parse_unicode_escape()?),
                    Some(other) => value.push(other),
                    None => return Err(opened_at),
                },
                Some(ch) => value.push(ch),
                None => return Err(opened_at),
            }
        }
    }

    fn parse_unicode_escape(&mut self) -> Result<char, ParseError> {
        let start = self.pos;
        for _ in 0..4 {
            match self.peek() {
                Some(ch) if ch.is_ascii_hexdigit() => {
                    self.bump();
                }
                _ => return Err(self.error("invalid \\U escape")),
            }
        }
        u32::from_str_radix(&self.text[start..self.pos], 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| self.error("invalid \\U escape"))
    }
}

fn is_bare_char(ch: char) -> bool {
    !ch.is_whitespace() && !matches!(ch, '{' | '}' | '(' | ')' | '=' | ';' | ',' | '"')
}

#[cfg(test)]
mod tests {
    use super::PbxParser;
    use crate::codec::DocumentParser;
    use crate::model::document::SectionKind;
    use crate::model::value::Value;

    const MINIMAL: &str = r#"// !$*UTF8*$!
{
	archiveVersion = 1;
	classes = {
	};
	objectVersion = 46;
	objects = {

/* Begin PBXGroup section */
		AAAAAAAAAAAAAAAAAAAAAAA1 = {
			isa = PBXGroup;
			children = (
				AAAAAAAAAAAAAAAAAAAAAAA2 /* main.m */,
			);
			sourceTree = "<group>";
		};
/* End PBXGroup section */
	};
	rootObject = AAAAAAAAAAAAAAAAAAAAAAA0 /* Project object */;
}
"#;

    #[test]
    fn parses_sections_and_references() {
        let document = PbxParser.parse(MINIMAL).unwrap();
        assert_eq!(document.root_object(), Some("AAAAAAAAAAAAAAAAAAAAAAA0"));
        assert_eq!(document.properties.get_str("objectVersion"), Some("46"));

        let group = document
            .record(SectionKind::Group, "AAAAAAAAAAAAAAAAAAAAAAA1")
            .unwrap();
        assert_eq!(group.comment, None);
        assert_eq!(group.get_str("sourceTree"), Some("<group>"));
        let children = group.fields.get_array("children").unwrap();
        assert_eq!(children[0].comment(), Some("main.m"));
    }

    #[test]
    fn quoted_strings_unescape() {
        let text = r#"{ a = "say \"hi\"\n"; b = "\U00e9"; }"#;
        let document = PbxParser.parse(text).unwrap();
        assert_eq!(document.properties.get_str("a"), Some("say \"hi\"\n"));
        assert_eq!(document.properties.get_str("b"), Some("é"));
    }

    #[test]
    fn trailing_comma_and_inline_comments_are_accepted() {
        let text = "{ list = (a, b /* second */, ); /* note */ c = d; }";
        let document = PbxParser.parse(text).unwrap();
        let list = document.properties.get_array("list").unwrap();
        assert_eq!(list.len(), 2);
        assert!(matches!(list[1], Value::Ref(_)));
        assert_eq!(document.properties.get_str("c"), Some("d"));
    }

    #[test]
    fn bare_token_stops_at_adjacent_comment() {
        let text = "{ list = (a, b/* second */); c = d// note\n; }";
        let document = PbxParser.parse(text).unwrap();
        let list = document.properties.get_array("list").unwrap();
        assert_eq!(list[1].as_str(), Some("b"));
        assert_eq!(list[1].comment(), Some("second"));
        assert_eq!(document.properties.get_str("c"), Some("d"));
    }

    #[test]
    fn missing_semicolon_reports_position() {
        let text = "{\n  a = b\n  c = d;\n}";
        let err = PbxParser.parse(text).unwrap_err();
        assert_eq!(err.line, 3);
        assert_eq!(err.column, 3);
        assert!(err.message.contains("expected `;`"));
    }

    #[test]
    fn object_without_isa_is_rejected() {
        let text = "{ objects = { X = { name = y; }; }; }";
        let err = PbxParser.parse(text).unwrap_err();
        assert!(err.message.contains("has no isa"));
    }

    #[test]
    fn unterminated_string_points_at_opening_quote() {
        let err = PbxParser.parse("{ a = \"abc; }").unwrap_err();
        assert_eq!((err.line, err.column), (1, 7));
    }
}
