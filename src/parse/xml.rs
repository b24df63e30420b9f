// src/parse/xml.rs
//! Descendant lookup over a whole document (`.//name`), in document order.

use quick_xml::errors::IllFormedError;
use quick_xml::events::Event;
use quick_xml::Reader;

/// A matched element: its own text and the text of its direct children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub text: String,
    pub children: Vec<(String, String)>,
}

impl Element {
    /// Text of the first direct child called `name`.
    pub fn child(&self, name: &str) -> Option<&str> {
        self.children
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t.as_str())
    }
}

struct Open {
    depth: usize,
    slot: usize,
    child: Option<(String, String)>,
    element: Element,
}

/// Every element whose local name is `name`, at any depth, ordered by where it
/// starts. The document is read to the end first, so a document that is not
/// well formed yields an error even when a match came before the damage.
pub fn descendants(xml: &str, name: &str) -> Result<Vec<Element>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().expand_empty_elements = true;

    let mut path: Vec<String> = Vec::new();
    let mut found: Vec<Option<Element>> = Vec::new();
    let mut open: Vec<Open> = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let tag = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                path.push(tag.clone());
                let depth = path.len();
                for o in open.iter_mut().filter(|o| o.depth + 1 == depth) {
                    o.child = Some((tag.clone(), String::new()));
                }
                if tag == name {
                    found.push(None);
                    open.push(Open {
                        depth,
                        slot: found.len() - 1,
                        child: None,
                        element: Element::default(),
                    });
                }
            }
            Event::End(_) => {
                let depth = path.len();
                for o in open.iter_mut().filter(|o| o.depth + 1 == depth) {
                    if let Some(child) = o.child.take() {
                        o.element.children.push(child);
                    }
                }
                if open.last().is_some_and(|o| o.depth == depth) {
                    if let Some(done) = open.pop() {
                        found[done.slot] = Some(done.element);
                    }
                }
                path.pop();
            }
            Event::Text(t) => append_text(&mut open, path.len(), &t.unescape()?),
            Event::CData(c) => {
                append_text(&mut open, path.len(), &String::from_utf8_lossy(&c.into_inner()))
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(unclosed) = path.pop() {
        return Err(quick_xml::Error::IllFormed(IllFormedError::MissingEndTag(
            unclosed,
        )));
    }
    Ok(found.into_iter().flatten().collect())
}

fn append_text(open: &mut [Open], depth: usize, text: &str) {
    for o in open.iter_mut() {
        if o.depth == depth {
            o.element.text.push_str(text);
        } else if o.depth + 1 == depth {
            if let Some((_, t)) = o.child.as_mut() {
                t.push_str(text);
            }
        }
    }
}
