//! Single-line indented code blocks, written as `<command>`.
//!
//! The line is parsed again as inline Markdown so authors can mark
//! placeholders: `*name*` becomes `<replaceable>` and `**name**` becomes
//! `<system>`. Any other span is flattened to its literal text.

use super::{TopicWriter, WriteError};
use crate::markup::{self, Inline, plain_text};

impl TopicWriter<'_> {
    pub(super) fn command(&mut self, line: &str) -> Result<(), WriteError> {
        let inlines = markup::parse_inlines(line, &self.config.markdown);
        self.xml.start("para")?;
        self.xml.start("command")?;
        self.command_inlines(&inlines)?;
        self.xml.end()?;
        self.xml.end()?;
        Ok(())
    }

    fn command_inlines(&mut self, inlines: &[Inline]) -> Result<(), WriteError> {
        for inline in inlines {
            match inline {
                Inline::Emphasis { children, .. } => self.command_span("replaceable", children)?,
                Inline::Strong(children) => self.command_span("system", children)?,
                Inline::Text(text) => self.xml.text(text)?,
                other => self.xml.text(&plain_text(std::slice::from_ref(other)))?,
            }
        }
        Ok(())
    }

    fn command_span(&mut self, name: &str, children: &[Inline]) -> Result<(), WriteError> {
        self.xml.start(name)?;
        self.command_inlines(children)?;
        self.xml.end()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::test_helpers::render_general;

    #[test]
    fn single_line_indented_code_is_a_command() {
        let out = render_general("    dotnet build *project*\n");
        assert!(out.contains(
            "<para><command>dotnet build <replaceable>project</replaceable></command></para>"
        ));
    }

    #[test]
    fn strong_becomes_system() {
        let out = render_general("    **sudo** make install\n");
        assert!(out.contains("<command><system>sudo</system> make install</command>"));
    }

    #[test]
    fn other_spans_are_flattened() {
        let out = render_general("    run `tool` now\n");
        assert!(out.contains("<command>run tool now</command>"));
    }
}
