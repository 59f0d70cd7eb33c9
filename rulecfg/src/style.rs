//! Stylesheet injection contract.

use std::{cell::RefCell, rc::Rc};

/// Appends global stylesheet text to the page.
pub trait StyleInjector {
    /// Add a new sheet containing `css` and return a handle to its live text.
    fn append(&self, css: &str) -> StyleHandle;
}

/// Live handle to one injected sheet. Mutating it changes the applied styles.
#[derive(Debug, Clone, Default)]
pub struct StyleHandle(Rc<RefCell<String>>);

impl StyleHandle {
    pub fn new(css: &str) -> Self {
        StyleHandle(Rc::new(RefCell::new(css.to_string())))
    }

    /// Append more text to the sheet.
    pub fn push_str(&self, css: &str) {
        self.0.borrow_mut().push_str(css);
    }

    pub fn text(&self) -> String {
        self.0.borrow().clone()
    }
}

/// Default injector that keeps every sheet in memory.
#[derive(Debug, Default)]
pub struct PageStyles {
    sheets: RefCell<Vec<StyleHandle>>,
}

impl PageStyles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sheets appended so far.
    pub fn sheet_count(&self) -> usize {
        self.sheets.borrow().len()
    }

    /// Concatenated text of all sheets, in insertion order.
    pub fn css(&self) -> String {
        self.sheets.borrow().iter().map(StyleHandle::text).collect()
    }
}

impl StyleInjector for PageStyles {
    fn append(&self, css: &str) -> StyleHandle {
        let handle = StyleHandle::new(css);
        self.sheets.borrow_mut().push(handle.clone());
        handle
    }
}
