//! Frame loop behavior, driven through the test harness.

#[cfg(test)]
mod tests {
    use std::{
        cell::RefCell,
        io,
        rc::Rc,
        sync::{Arc, Mutex},
    };

    use arbor::{
        Component, Config, Dispatch, Error, Event, InputSnapshot, Interaction, Key, RebuildPolicy,
        Walk,
        derive_component,
        draw::Canvas,
        geom::{Expanse, Rect},
        handler, subcomponent,
        testing::Harness,
    };
    use image::Rgba;
    use pretty_assertions::assert_eq;
    use serde::Serialize;
    use serde_json::Value;

    /// A page that renders a single line of text.
    struct Page(&'static str);

    impl Dispatch for Page {}

    impl Component for Page {
        fn ui(&self) -> String {
            format!("<col><text>{}</text></col>", self.0)
        }
    }

    #[derive(Serialize)]
    #[serde(rename_all = "PascalCase")]
    struct Pager {
        current_page: usize,
        #[serde(skip)]
        page1: Rc<RefCell<Page>>,
        #[serde(skip)]
        page2: Rc<RefCell<Page>>,
    }

    impl Pager {
        fn new() -> Rc<RefCell<Self>> {
            Rc::new(RefCell::new(Self {
                current_page: 0,
                page1: Rc::new(RefCell::new(Page("first"))),
                page2: Rc::new(RefCell::new(Page("second"))),
            }))
        }
    }

    #[derive_component]
    impl Pager {
        #[handler]
        fn next(&mut self) {
            self.current_page = (self.current_page + 1).min(1);
        }

        #[handler]
        fn prev(&mut self) {
            self.current_page = self.current_page.saturating_sub(1);
        }

        #[subcomponent]
        fn page1(&self) -> Rc<RefCell<Page>> {
            self.page1.clone()
        }

        #[subcomponent]
        fn page2(&self) -> Rc<RefCell<Page>> {
            self.page2.clone()
        }
    }

    impl Component for Pager {
        fn ui(&self) -> String {
            r#"<col>
                <row>
                    <button id="prev" onClick="Prev">prev</button>
                    <button id="next" onClick="Next">next</button>
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

    /// Is every node in the subtree declared as `tag` displayed?
    fn displayed(h: &Harness, tag: &str) -> bool {
        let t = h.tree();
        let id = t.find_source(tag).unwrap();
        t.preorder_from(id, &mut |_, n| {
            Ok(if n.is_displayed() {
                Walk::Continue
            } else {
                Walk::Handle(())
            })
        })
        .unwrap()
        .is_continue()
    }

    #[test]
    fn pager_flips_pages() {
        let pager = Pager::new();
        let mut h = Harness::new(pager.clone().into()).unwrap();
        assert_eq!(
            h.dump().unwrap(),
            [
                "col [Pager]",
                "    row [Pager]",
                "        button [Pager] \"prev\"",
                "        button [Pager] \"next\"",
                "    col <Page1> [Page]",
                "        text [Page] \"first\"",
                "    col <Page2> [Page] (hidden)",
                "        text [Page] (hidden) \"second\"",
                "",
            ]
            .join("\n")
        );
        assert!(displayed(&h, "Page1"));
        assert!(!h.tree()[h.tree().find_source("Page2").unwrap()].is_displayed());

        let next = h.tree().find_id("next").unwrap();
        assert_eq!(h.click_node(next).unwrap(), 1);
        assert_eq!(pager.borrow().current_page, 1);
        assert!(!h.tree()[h.tree().find_source("Page1").unwrap()].is_displayed());
        assert!(displayed(&h, "Page2"));

        // Hidden pages take no space and can't be hit.
        let p1 = h.tree().find_source("Page1").unwrap();
        assert!(h.tree()[p1].geometry().inner.is_zero());

        let prev = h.tree().find_id("prev").unwrap();
        h.click_node(prev).unwrap();
        assert_eq!(pager.borrow().current_page, 0);
        assert!(displayed(&h, "Page1"));
    }

    #[derive(Default)]
    struct Clicker {
        clicks: usize,
        at: Vec<(i32, i32)>,
        ticks: usize,
        broken: bool,
    }

    #[derive_component]
    impl Clicker {
        #[handler]
        fn hit(&mut self, e: &Event) {
            self.clicks += 1;
            self.at.push((e.x, e.y));
        }

        #[handler]
        fn tick(&mut self) {
            self.ticks += 1;
        }

        #[handler]
        fn break_markup(&mut self) {
            self.broken = true;
        }

        #[handler]
        fn paint(&mut self, c: &mut Canvas) {
            for p in c.pixels_mut() {
                *p = Rgba([255, 0, 0, 255]);
            }
        }
    }

    impl Component for Clicker {
        fn ui(&self) -> String {
            if self.broken {
                return "<col><button>".into();
            }
            r#"<col align="start" padding="10" onUpdate="Tick">
                <button width="100" height="40" onClick="Hit">hit</button>
                <button id="break" onClick="BreakMarkup">break</button>
                <canvas width="20" height="10" onDraw="Paint"/>
            </col>"#
                .into()
        }
    }

    #[test]
    fn click_fires_once_with_local_coordinates() {
        let c = Rc::new(RefCell::new(Clicker::default()));
        let mut h = Harness::new(c.clone().into()).unwrap();
        let button = h.tree().find_tag("button").unwrap();
        assert_eq!(h.tree()[button].geometry().inner, Rect::new(10, 10, 100, 40));

        h.click(30, 25).unwrap();
        assert_eq!(c.borrow().clicks, 1);
        assert_eq!(c.borrow().at, vec![(20, 15)]);

        // Pressing outside and releasing over the button is not a click.
        h.hover(200, 200).unwrap();
        h.driver
            .frame(&InputSnapshot::new().at(200, 200).button(true))
            .unwrap();
        h.hover(30, 25).unwrap();
        assert_eq!(c.borrow().clicks, 1);
    }

    #[test]
    fn update_fires_every_frame() {
        let c = Rc::new(RefCell::new(Clicker::default()));
        let mut h = Harness::new(c.clone().into()).unwrap();
        for _ in 0..3 {
            h.frame().unwrap();
        }
        assert_eq!(c.borrow().ticks, 3);
    }

    #[test]
    fn failed_build_keeps_tree() {
        let c = Rc::new(RefCell::new(Clicker::default()));
        let mut h = Harness::new(c.clone().into()).unwrap();
        let before = h.tree().shape();

        let id = h.tree().find_id("break").unwrap();
        let err = h.click_node(id).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
        assert!(c.borrow().broken);
        assert_eq!(h.tree().shape(), before);

        // Frames keep failing until the component recovers.
        assert!(h.frame().is_err());
        c.borrow_mut().broken = false;
        assert!(h.frame().unwrap().rebuilt);
    }

    #[test]
    fn canvas_draw() {
        let c = Rc::new(RefCell::new(Clicker::default()));
        let mut h = Harness::new(c.into()).unwrap();
        let id = h.tree().find_tag("canvas").unwrap();
        let r = h.tree()[id].geometry().content;
        assert_eq!((r.w, r.h), (20, 10));
        let img = h.driver.snapshot().unwrap();
        let (x, y) = (r.tl.x as u32 + 5, r.tl.y as u32 + 5);
        assert_eq!(img.get_pixel(x, y).0, [255, 0, 0, 255]);
        assert_eq!(img.get_pixel(315, 235).0, [255, 255, 255, 255]);
    }

    #[test]
    fn on_change_policy() {
        let mut h = Harness::builder(Pager::new().into())
            .config(Config {
                rebuild: RebuildPolicy::OnChange,
                ..Config::default()
            })
            .build()
            .unwrap();
        assert!(!h.frame().unwrap().rebuilt);
        let next = h.tree().find_id("next").unwrap();
        let p = h.center(next).unwrap();
        assert!(h.hover(p.x, p.y).unwrap().rebuilt);
        assert!(!h.hover(p.x, p.y).unwrap().rebuilt);
        assert!(!h.frame().unwrap().rebuilt);
    }

    #[test]
    fn debug_toggle() {
        let mut h = Harness::new(Pager::new().into()).unwrap();
        assert!(!h.driver.debug());
        assert!(h.tree().iter().all(|(_, n)| !n.debug()));
        h.toggle_debug().unwrap();
        assert!(h.driver.debug());
        assert!(h.tree().iter().all(|(_, n)| n.debug()));
        h.frame().unwrap();
        assert!(h.driver.debug());
        h.toggle_debug().unwrap();
        assert!(h.tree().iter().all(|(_, n)| !n.debug()));

        // The key alone does nothing.
        h.key('d').unwrap();
        assert!(!h.driver.debug());
    }

    #[test]
    fn resize() {
        let mut h = Harness::builder(Pager::new().into())
            .size(200, 100)
            .build()
            .unwrap();
        let root = h.tree().root();
        assert_eq!(h.tree()[root].geometry().inner, Rect::new(0, 0, 200, 100));
        h.driver.resize(Expanse::new(120, 80)).unwrap();
        let root = h.tree().root();
        assert_eq!(h.tree()[root].geometry().inner, Rect::new(0, 0, 120, 80));
        assert_eq!(h.driver.viewport(), Expanse::new(120, 80));
    }

    /// Collects formatted log output.
    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn slow_builds_are_logged() {
        let mut h = Harness::builder(Pager::new().into())
            .config(Config {
                build_budget_ms: 0,
                ..Config::default()
            })
            .build()
            .unwrap();
        let capture = Capture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            h.frame().unwrap();
        });
        let out = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
        assert!(out.contains("build exceeded time budget"), "{out}");
        assert!(out.contains("WARN"));
    }

    #[derive(Default, Serialize)]
    #[serde(rename_all = "PascalCase")]
    struct Form {
        name: String,
        notes: String,
    }

    #[derive_component]
    impl Form {
        #[handler]
        fn set_name(&mut self, e: &Event) {
            self.name = e.value.clone();
        }
    }

    impl Component for Form {
        fn ui(&self) -> String {
            r#"<col align="start">
                <input value="{{.Name}}" onChange="SetName"/>
                <textarea>{{.Notes}}</textarea>
                <p width="60" height="38">aaa bbb ccc ddd eee fff</p>
            </col>"#
                .into()
        }

        fn fields(&self) -> serde_json::Result<Value> {
            serde_json::to_value(self)
        }
    }

    #[test]
    fn typing_into_inputs() {
        let f = Rc::new(RefCell::new(Form::default()));
        let mut h = Harness::new(f.clone().into()).unwrap();
        let input = h.tree().find_tag("input").unwrap();
        assert_eq!(h.tree()[input].editable().unwrap().cursor, 0);

        // Typing without focus does nothing.
        assert_eq!(h.type_text("x").unwrap(), 0);
        assert_eq!(f.borrow().name, "");

        h.click_tag("input").unwrap();
        let input = h.tree().find_tag("input").unwrap();
        assert!(h.tree()[input].editable().unwrap().focused);

        assert_eq!(h.type_text("abc").unwrap(), 1);
        assert_eq!(f.borrow().name, "abc");
        let input = h.tree().find_tag("input").unwrap();
        assert_eq!(h.tree()[input].value(), "abc");
        assert_eq!(h.tree()[input].editable().unwrap().cursor, 3);

        h.key(Key::Left).unwrap();
        h.key(Key::Backspace).unwrap();
        assert_eq!(f.borrow().name, "ac");
        let input = h.tree().find_tag("input").unwrap();
        assert_eq!(h.tree()[input].editable().unwrap().cursor, 1);

        // Clicking elsewhere drops focus.
        h.click(300, 200).unwrap();
        let input = h.tree().find_tag("input").unwrap();
        assert!(!h.tree()[input].editable().unwrap().focused);
        assert_eq!(h.type_text("zzz").unwrap(), 0);
        assert_eq!(f.borrow().name, "ac");
    }

    #[test]
    fn wheel_scrolls_paragraph() {
        let f = Rc::new(RefCell::new(Form::default()));
        let mut h = Harness::new(f.into()).unwrap();
        let p = h.tree().find_tag("p").unwrap();
        let s = h.tree()[p].scrollable().unwrap();
        assert_eq!((s.lines, s.visible, s.line), (6, 2, 0));

        let c = h.center(p).unwrap();
        h.hover(c.x, c.y).unwrap();
        h.wheel(3).unwrap();
        let p = h.tree().find_tag("p").unwrap();
        assert_eq!(h.tree()[p].scrollable().unwrap().line, 3);
        h.wheel(10).unwrap();
        let p = h.tree().find_tag("p").unwrap();
        assert_eq!(h.tree()[p].scrollable().unwrap().line, 4);

        // The wheel does nothing away from the paragraph.
        h.hover(300, 5).unwrap();
        h.wheel(-4).unwrap();
        let p = h.tree().find_tag("p").unwrap();
        assert_eq!(h.tree()[p].scrollable().unwrap().line, 4);
    }

    #[derive(Default, Serialize)]
    #[serde(rename_all = "PascalCase")]
    struct Toggled {
        show: bool,
        a: String,
        b: String,
        peeks: usize,
    }

    #[derive_component]
    impl Toggled {
        #[handler]
        fn set_a(&mut self, e: &Event) {
            self.a = e.value.clone();
        }

        #[handler]
        fn set_b(&mut self, e: &Event) {
            self.b = e.value.clone();
        }

        #[handler]
        fn peek(&mut self) {
            self.peeks += 1;
        }
    }

    impl Component for Toggled {
        fn ui(&self) -> String {
            r#"<col align="start">
                <button id="tip" display="{{.Show}}" onHover="Peek">tip</button>
                <input id="a" display="{{.Show}}" value="{{.A}}" onChange="SetA"/>
                <input id="b" value="{{.B}}" onChange="SetB"/>
            </col>"#
                .into()
        }

        fn fields(&self) -> serde_json::Result<Value> {
            serde_json::to_value(self)
        }
    }

    fn toggled() -> (Rc<RefCell<Toggled>>, Harness) {
        let t = Rc::new(RefCell::new(Toggled {
            show: true,
            ..Toggled::default()
        }));
        let h = Harness::new(t.clone().into()).unwrap();
        (t, h)
    }

    fn focused(h: &Harness, id: &str) -> bool {
        let n = h.tree().find_id(id).unwrap();
        h.tree()[n].editable().unwrap().focused
    }

    #[test]
    fn hidden_input_loses_focus() {
        let (t, mut h) = toggled();
        h.click_node(h.tree().find_id("a").unwrap()).unwrap();
        assert!(focused(&h, "a"));

        t.borrow_mut().show = false;
        h.frame().unwrap();
        h.click_node(h.tree().find_id("b").unwrap()).unwrap();
        assert!(focused(&h, "b"));
        assert!(!focused(&h, "a"));

        t.borrow_mut().show = true;
        h.frame().unwrap();
        assert!(!focused(&h, "a"));
        assert!(focused(&h, "b"));

        assert_eq!(h.type_text("z").unwrap(), 1);
        assert_eq!(t.borrow().a, "");
        assert_eq!(t.borrow().b, "z");
    }

    #[test]
    fn hidden_node_returns_idle() {
        let (t, mut h) = toggled();
        let tip = h.tree().find_id("tip").unwrap();
        let c = h.center(tip).unwrap();
        h.hover(c.x, c.y).unwrap();
        assert_eq!(t.borrow().peeks, 1);

        t.borrow_mut().show = false;
        h.frame().unwrap();
        t.borrow_mut().show = true;
        h.frame().unwrap();
        let tip = h.tree().find_id("tip").unwrap();
        assert_eq!(h.tree()[tip].interaction(), Interaction::Idle);

        // Shown again under a resting pointer, it hovers afresh.
        h.frame().unwrap();
        assert_eq!(t.borrow().peeks, 2);
    }
}
