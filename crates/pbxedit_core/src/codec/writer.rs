//! Serializer producing manifest text in the host tool's layout.

use crate::codec::{DocumentWriter, WriteOptions};
use crate::model::document::{Document, Record, Section};
use crate::model::value::{Dict, ObjectRef, Value};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::Write as _;

const HEADER: &str = "// !$*UTF8*$!";

static BARE_STRING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_$/:.]+$").expect("valid bare string regex"));

/// Sections whose records are written on a single line.
const INLINE_SECTIONS: [&str; 2] = ["PBXBuildFile", "PBXFileReference"];

/// Default [`DocumentWriter`] for the manifest dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct PbxWriter;

impl DocumentWriter for PbxWriter {
    fn write(&self, document: &Document, options: &WriteOptions) -> String {
        let mut out = String::new();
        out.push_str(HEADER);
        out.push_str("\n{\n");

        let mut objects_written = false;
        for (key, value) in document.properties.iter() {
            if key == "rootObject" && !objects_written {
                write_objects(&mut out, document, options);
                objects_written = true;
            }
            if skip_entry(value, options) {
                continue;
            }
            out.push('\t');
            out.push_str(&format_string(key));
            out.push_str(" = ");
            write_value(&mut out, value, 1, false, options);
            out.push_str(";\n");
        }
        if !objects_written {
            write_objects(&mut out, document, options);
        }

        out.push_str("}\n");
        out
    }
}

fn write_objects(out: &mut String, document: &Document, options: &WriteOptions) {
    out.push_str("\tobjects = {\n");
    for section in document.sections() {
        if section.is_empty() {
            continue;
        }
        write_section(out, section, options);
    }
    out.push_str("\t};\n");
}

fn write_section(out: &mut String, section: &Section, options: &WriteOptions) {
    let inline = INLINE_SECTIONS.contains(&section.isa());
    let _ = write!(out, "\n/* Begin {} section */\n", section.isa());
    for record in section.iter() {
        write_record(out, record, inline, options);
    }
    let _ = writeln!(out, "/* End {} section */", section.isa());
}

fn write_record(out: &mut String, record: &Record, inline: bool, options: &WriteOptions) {
    out.push_str("\t\t");
    out.push_str(&format_string(record.id.as_str()));
    if let Some(comment) = &record.comment {
        let _ = write!(out, " /* {comment} */");
    }
    out.push_str(" = ");
    write_dict(out, &record.fields, 2, inline, options);
    out.push_str(";\n");
}

fn write_value(out: &mut String, value: &Value, indent: usize, inline: bool, options: &WriteOptions) {
    match value {
        Value::String(text) => out.push_str(&format_string(text)),
        Value::Ref(reference) => write_reference(out, reference),
        Value::Array(items) => write_array(out, items, indent, inline, options),
        Value::Dict(dict) => write_dict(out, dict, indent, inline, options),
    }
}

fn write_reference(out: &mut String, reference: &ObjectRef) {
    out.push_str(&format_string(reference.id.as_str()));
    let _ = write!(out, " /* {} */", reference.comment);
}

fn write_dict(out: &mut String, dict: &Dict, indent: usize, inline: bool, options: &WriteOptions) {
    if inline {
        out.push('{');
        for (key, value) in dict.iter() {
            if skip_entry(value, options) {
                continue;
            }
            out.push_str(&format_string(key));
            out.push_str(" = ");
            write_value(out, value, indent, true, options);
            out.push_str("; ");
        }
        out.push('}');
        return;
    }

    out.push_str("{\n");
    for (key, value) in dict.iter() {
        if skip_entry(value, options) {
            continue;
        }
        push_indent(out, indent + 1);
        out.push_str(&format_string(key));
        out.push_str(" = ");
        write_value(out, value, indent + 1, false, options);
        out.push_str(";\n");
    }
    push_indent(out, indent);
    out.push('}');
}

fn write_array(out: &mut String, items: &[Value], indent: usize, inline: bool, options: &WriteOptions) {
    if inline {
        out.push('(');
        for item in items {
            write_value(out, item, indent, true, options);
            out.push_str(", ");
        }
        out.push(')');
        return;
    }

    out.push_str("(\n");
    for item in items {
        push_indent(out, indent + 1);
        write_value(out, item, indent + 1, false, options);
        out.push_str(",\n");
    }
    push_indent(out, indent);
    out.push(')');
}

fn skip_entry(value: &Value, options: &WriteOptions) -> bool {
    options.omit_empty_values && matches!(value, Value::String(text) if text.is_empty())
}

fn push_indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push('\t');
    }
}

/// Renders a string bare when it is safe to, quoted and escaped otherwise.
pub(crate) fn format_string(text: &str) -> String {
    // a bare `//` would read back as a line comment
    if BARE_STRING.is_match(text) && !text.contains("//") {
        return text.to_string();
    }
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for ch in text.chars() {
        match ch {
            '\\' => quoted.push_str("\\\\"),
            '"' => quoted.push_str("\\\""),
            '\n' => quoted.push_str("\\n"),
            '\t' => quoted.push_str("\\t"),
            '\r' => quoted.push_str("\\r"),
            other => quoted.push(other),
        }
    }
    quoted.push('"');
    quoted
}

#[cfg(test)]
mod tests {
    use super::{format_string, PbxWriter};
    use crate::codec::{DocumentWriter, WriteOptions};
    use crate::model::document::{Document, Record, SectionKind};
    use crate::model::value::{Dict, ObjectId, ObjectRef};

    #[test]
    fn quoting_follows_safe_character_rule() {
        assert_eq!(format_string("main.m"), "main.m");
        assert_eq!(format_string("$(SRCROOT)/x"), "\"$(SRCROOT)/x\"");
        assert_eq!(format_string("<group>"), "\"<group>\"");
        assert_eq!(format_string(""), "\"\"");
        assert_eq!(format_string("a \"b\"\n"), "\"a \\\"b\\\"\\n\"");
        assert_eq!(format_string("//server/share"), "\"//server/share\"");
        assert_eq!(format_string("a/b//c"), "\"a/b//c\"");
        assert_eq!(format_string("a/b/c"), "a/b/c");
    }

    #[test]
    fn build_files_are_written_inline() {
        let mut document = Document::new(
            Dict::new()
                .with("archiveVersion", "1")
                .with("rootObject", ObjectRef::new("AAAAAAAAAAAAAAAAAAAAAAA0", "Project object")),
        );
        document.insert_record(
            SectionKind::BuildFile,
            Record::new(
                ObjectId::from("AAAAAAAAAAAAAAAAAAAAAAA1"),
                "main.m in Sources",
                Dict::new()
                    .with("isa", "PBXBuildFile")
                    .with("fileRef", ObjectRef::new("AAAAAAAAAAAAAAAAAAAAAAA2", "main.m")),
            ),
        );

        let text = PbxWriter.write(&document, &WriteOptions::default());
        assert!(text.starts_with("// !$*UTF8*$!\n{\n\tarchiveVersion = 1;\n\tobjects = {\n"));
        assert!(text.contains(
            "\t\tAAAAAAAAAAAAAAAAAAAAAAA1 /* main.m in Sources */ = {isa = PBXBuildFile; fileRef = AAAAAAAAAAAAAAAAAAAAAAA2 /* main.m */; };\n"
        ));
        assert!(text.ends_with("\trootObject = AAAAAAAAAAAAAAAAAAAAAAA0 /* Project object */;\n}\n"));
    }

    #[test]
    fn omit_empty_values_drops_empty_strings() {
        let document = Document::new(Dict::new().with("a", "").with("b", "x"));
        let text = PbxWriter.write(
            &document,
            &WriteOptions {
                omit_empty_values: true,
            },
        );
        assert!(!text.contains("\ta = "));
        assert!(text.contains("\tb = x;"));
    }
}
