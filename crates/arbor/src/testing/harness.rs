use crate::{
    component::ComponentRef,
    config::Config,
    driver::{Driver, FrameReport},
    dump::dump_plain,
    error::{Error, Result},
    event::{InputSnapshot, Key},
    geom::Point,
    node::NodeId,
    tree::Tree,
};

/// A harness that holds a [`Driver`] with the deterministic monospace
/// typesetter and the input state between frames. Tests drive the UI with
/// scripted pointer and keyboard input, then inspect the published tree.
pub struct Harness {
    /// The driver under test.
    pub driver: Driver,
    /// Held input state, carried between frames.
    input: InputSnapshot,
}

/// Builder for creating a test harness with a fluent API.
pub struct HarnessBuilder {
    /// Root component under test.
    root: ComponentRef,
    /// Driver configuration.
    config: Config,
}

impl HarnessBuilder {
    /// Set the size of the viewport.
    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.config.width = width;
        self.config.height = height;
        self
    }

    /// Replace the driver configuration.
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Build the harness.
    pub fn build(self) -> Result<Harness> {
        Ok(Harness::from_driver(Driver::new(self.root, self.config)?))
    }
}

impl Harness {
    /// Create a harness builder. The default viewport is 320x240.
    pub fn builder(root: ComponentRef) -> HarnessBuilder {
        HarnessBuilder {
            root,
            config: Config {
                width: 320,
                height: 240,
                ..Config::default()
            },
        }
    }

    /// Create a harness with default settings.
    pub fn new(root: ComponentRef) -> Result<Self> {
        Self::builder(root).build()
    }

    /// Wrap an existing driver, for instance one with a font typesetter.
    pub fn from_driver(driver: Driver) -> Self {
        Self {
            driver,
            input: InputSnapshot::default(),
        }
    }

    /// The published tree.
    pub fn tree(&self) -> &Tree {
        self.driver.tree()
    }

    /// Run a frame with the current input. Typed text and wheel movement
    /// are consumed.
    pub fn frame(&mut self) -> Result<FrameReport> {
        let report = self.driver.frame(&self.input);
        self.input = self.input.carry();
        report
    }

    /// Move the pointer and run a frame.
    pub fn hover(&mut self, x: i32, y: i32) -> Result<FrameReport> {
        self.input.pointer = Some(Point::new(x, y));
        self.frame()
    }

    /// Move the pointer away from the viewport and run a frame.
    pub fn leave(&mut self) -> Result<FrameReport> {
        self.input.pointer = None;
        self.frame()
    }

    /// Move to a point, press and release the button, one frame each.
    /// Returns the number of handlers invoked across the three frames.
    pub fn click(&mut self, x: i32, y: i32) -> Result<usize> {
        let mut events = self.hover(x, y)?.events;
        self.input.button = true;
        events += self.frame()?.events;
        self.input.button = false;
        events += self.frame()?.events;
        Ok(events)
    }

    /// Click the center of a node's border box.
    pub fn click_node(&mut self, id: NodeId) -> Result<usize> {
        let p = self.center(id)?;
        self.click(p.x, p.y)
    }

    /// Click the first node, in pre-order, declared with `tag`.
    pub fn click_tag(&mut self, tag: &str) -> Result<usize> {
        let id = self
            .tree()
            .find_source(tag)
            .ok_or_else(|| Error::Internal(format!("no node declared as {tag}")))?;
        self.click_node(id)
    }

    /// The center of a node's border box.
    pub fn center(&self, id: NodeId) -> Result<Point> {
        let node = self
            .tree()
            .get(id)
            .ok_or_else(|| Error::Internal("no such node".into()))?;
        let r = node.geometry().inner;
        Ok(Point::new(r.tl.x + (r.w / 2) as i32, r.tl.y + (r.h / 2) as i32))
    }

    /// Press and release a key, one frame each.
    pub fn key(&mut self, k: impl Into<Key>) -> Result<usize> {
        let k = k.into();
        self.input.keys.insert(k);
        let events = self.frame()?.events;
        self.input.keys.remove(&k);
        Ok(events + self.frame()?.events)
    }

    /// Type text into the focused input in a single frame.
    pub fn type_text(&mut self, text: &str) -> Result<usize> {
        self.input.text.push_str(text);
        Ok(self.frame()?.events)
    }

    /// Scroll the wheel by `lines` in a single frame.
    pub fn wheel(&mut self, lines: i32) -> Result<usize> {
        self.input.wheel = lines;
        Ok(self.frame()?.events)
    }

    /// Press the debug chord, then release it.
    pub fn toggle_debug(&mut self) -> Result<()> {
        let k = Key::from(self.driver.config().debug_key);
        self.input.keys.insert(Key::Ctrl);
        self.input.keys.insert(k);
        self.frame()?;
        self.input.keys.remove(&k);
        self.input.keys.remove(&Key::Ctrl);
        self.frame()?;
        Ok(())
    }

    /// A plain-text dump of the published tree.
    pub fn dump(&self) -> Result<String> {
        dump_plain(self.tree())
    }
}
