use std::{cell::RefCell, rc::Rc};

use arbor::{
    Component, ComponentRef, Dispatch, Style, derive_component, handler, subcomponent,
};
use serde::Serialize;
use serde_json::Value;

/// One page of text.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Page {
    /// Heading.
    pub title: String,
    /// Paragraph text.
    pub body: String,
}

impl Page {
    /// Construct a page.
    pub fn new(title: &str, body: &str) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }
}

impl Dispatch for Page {}

impl Component for Page {
    fn ui(&self) -> String {
        r##"<col padding="8" gap="4">
            <text color="#224488" font-size="20">{{.Title}}</text>
            <p height="96">{{.Body}}</p>
        </col>"##
            .into()
    }

    fn fields(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}

/// Two pages and the buttons that switch between them.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Pager {
    /// Index of the visible page.
    pub current_page: usize,
    /// Number of page switches so far.
    pub flips: usize,
    /// The first page.
    #[serde(skip)]
    page1: Rc<RefCell<Page>>,
    /// The second page.
    #[serde(skip)]
    page2: Rc<RefCell<Page>>,
}

#[derive_component]
impl Pager {
    /// Construct a pager over two pages.
    pub fn new(first: Page, second: Page) -> Self {
        Self {
            current_page: 0,
            flips: 0,
            page1: Rc::new(RefCell::new(first)),
            page2: Rc::new(RefCell::new(second)),
        }
    }

    /// Show the next page.
    #[handler]
    pub fn next(&mut self) {
        if self.current_page == 0 {
            self.current_page = 1;
            self.flips += 1;
        }
    }

    /// Show the previous page.
    #[handler]
    pub fn prev(&mut self) {
        if self.current_page == 1 {
            self.current_page = 0;
            self.flips += 1;
        }
    }

    #[subcomponent]
    fn page1(&self) -> Rc<RefCell<Page>> {
        self.page1.clone()
    }

    #[subcomponent]
    fn page2(&self) -> Rc<RefCell<Page>> {
        self.page2.clone()
    }

    /// A button with the pager's look.
    #[subcomponent]
    fn nav(&self) -> Style {
        Style::alias("button")
            .with("background", "#335577")
            .with("hover", "#446688")
            .with("active", "#223344")
            .with("color", "#ffffff")
    }
}

impl Component for Pager {
    fn ui(&self) -> String {
        r#"<col>
            <row justify="space-between" padding="4">
                <Nav id="prev" onClick="Prev" disabled="{{eq .CurrentPage 0}}">prev</Nav>
                <text>page {{if eq .CurrentPage 0}}1{{else}}2{{end}} of 2</text>
                <Nav id="next" onClick="Next" disabled="{{eq .CurrentPage 1}}">next</Nav>
            </row>
            <Page1 display="{{eq .CurrentPage 0}}"/>
            <Page2 display="{{eq .CurrentPage 1}}"/>
        </col>"#
            .into()
    }

    fn fields(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}

/// The demo pager with its default content.
pub fn create_app() -> ComponentRef {
    ComponentRef::new(Pager::new(
        Page::new(
            "Arbor",
            "Each frame the whole tree is rebuilt from markup, then reconciled \
             against the previous frame so hover and focus survive.",
        ),
        Page::new(
            "Subcomponents",
            "Uppercase tags resolve through capabilities registered on the \
             owning component. A page is just another component.",
        ),
    ))
}
