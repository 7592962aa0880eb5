//! Streaming XML emitter over quick-xml.
//!
//! Adds the two things the topic writer relies on and quick-xml's writer
//! leaves to the caller:
//!
//! - a start tag stays pending until something is written into it, so
//!   attributes can follow `start`, and an element closed right away is
//!   written as an empty element
//! - indentation that stops inside mixed content. Once an element holds
//!   text, nothing below it is reindented, which keeps `<code>` and inline
//!   runs byte-exact
//!
//! Balancing is the caller's job; [`XmlEmitter::finish`] only checks that
//! every element was closed.

use quick_xml::Writer;
use quick_xml::escape::partial_escape;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::io;

const INDENT: &str = "  ";

struct Frame {
    name: String,
    has_elements: bool,
    mixed: bool,
}

pub struct XmlEmitter {
    writer: Writer<Vec<u8>>,
    indent: bool,
    stack: Vec<Frame>,
    pending: Option<BytesStart<'static>>,
    started: bool,
}

impl XmlEmitter {
    pub fn new(indent: bool) -> Self {
        Self {
            writer: Writer::new(Vec::new()),
            indent,
            stack: Vec::new(),
            pending: None,
            started: false,
        }
    }

    /// Number of open elements.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn declaration(&mut self) -> io::Result<()> {
        self.writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
        self.started = true;
        Ok(())
    }

    /// Write a comment. `--` is not allowed inside comments and is split.
    pub fn comment(&mut self, text: &str) -> io::Result<()> {
        self.flush_pending()?;
        self.mark_child();
        self.newline()?;
        let text = text.replace("--", "- -");
        self.writer
            .write_event(Event::Comment(BytesText::from_escaped(text)))?;
        self.started = true;
        Ok(())
    }

    pub fn start(&mut self, name: &str) -> io::Result<()> {
        self.flush_pending()?;
        self.mark_child();
        self.newline()?;
        self.pending = Some(BytesStart::new(name.to_string()));
        self.stack.push(Frame {
            name: name.to_string(),
            has_elements: false,
            mixed: false,
        });
        self.started = true;
        Ok(())
    }

    /// Add an attribute to the element just started.
    pub fn attribute(&mut self, name: &str, value: &str) -> io::Result<()> {
        match self.pending.as_mut() {
            Some(start) => {
                start.push_attribute((name, value));
                Ok(())
            }
            None => Err(io::Error::other(format!(
                "attribute {name} written after element content"
            ))),
        }
    }

    pub fn end(&mut self) -> io::Result<()> {
        let frame = self
            .stack
            .pop()
            .ok_or_else(|| io::Error::other("end of element with no open element"))?;
        if let Some(start) = self.pending.take() {
            return self.writer.write_event(Event::Empty(start));
        }
        if frame.has_elements && !frame.mixed && !self.in_mixed() {
            self.newline()?;
        }
        self.writer
            .write_event(Event::End(BytesEnd::new(frame.name)))
    }

    /// Write text, escaping markup characters.
    pub fn text(&mut self, text: &str) -> io::Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        self.flush_pending()?;
        self.mark_mixed();
        self.writer
            .write_event(Event::Text(BytesText::from_escaped(partial_escape(text))))
    }

    /// Write text verbatim.
    pub fn raw(&mut self, text: &str) -> io::Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        self.flush_pending()?;
        self.mark_mixed();
        self.writer
            .write_event(Event::Text(BytesText::from_escaped(text)))
    }

    /// Return the document bytes. Fails if an element is still open.
    pub fn finish(mut self) -> io::Result<Vec<u8>> {
        if let Some(frame) = self.stack.last() {
            return Err(io::Error::other(format!(
                "element {} left open",
                frame.name
            )));
        }
        self.flush_pending()?;
        let mut bytes = self.writer.into_inner();
        if self.indent {
            bytes.push(b'\n');
        }
        Ok(bytes)
    }

    fn flush_pending(&mut self) -> io::Result<()> {
        match self.pending.take() {
            Some(start) => self.writer.write_event(Event::Start(start)),
            None => Ok(()),
        }
    }

    fn in_mixed(&self) -> bool {
        self.stack.iter().any(|f| f.mixed)
    }

    fn mark_child(&mut self) {
        if let Some(parent) = self.stack.last_mut() {
            parent.has_elements = true;
        }
    }

    fn mark_mixed(&mut self) {
        if let Some(frame) = self.stack.last_mut() {
            frame.mixed = true;
        }
    }

    fn newline(&mut self) -> io::Result<()> {
        if !self.indent || !self.started || self.in_mixed() {
            return Ok(());
        }
        let mut ws = String::from("\n");
        for _ in 0..self.stack.len() {
            ws.push_str(INDENT);
        }
        self.writer
            .write_event(Event::Text(BytesText::from_escaped(ws)))
    }
}
