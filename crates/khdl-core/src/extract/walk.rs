//! Iterative depth-first walk over element nodes.

use scraper::ElementRef;

/// Stack-based pre-order walk of `root` and every element beneath it.
///
/// Children are pushed last-to-first so pops come out in document order;
/// text, comment and other non-element nodes are never yielded.
pub fn elements(root: ElementRef<'_>) -> Elements<'_> {
    Elements { stack: vec![root] }
}

pub struct Elements<'a> {
    stack: Vec<ElementRef<'a>>,
}

impl<'a> Iterator for Elements<'a> {
    type Item = ElementRef<'a>;

    fn next(&mut self) -> Option<ElementRef<'a>> {
        let el = self.stack.pop()?;
        let mut child = el.last_child();
        while let Some(node) = child {
            if let Some(child_el) = ElementRef::wrap(node) {
                self.stack.push(child_el);
            }
            child = node.prev_sibling();
        }
        Some(el)
    }
}
