//! The per-frame loop: input, dispatch, rebuild, layout, swap.

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::{
    build::{BuildOptions, Builder, FrameState},
    component::ComponentRef,
    config::{Config, RebuildPolicy},
    dispatch,
    draw::{Canvas, Painter},
    error::Result,
    event::{InputSnapshot, Key},
    geom::Expanse,
    layout::{FlexLayout, Layout},
    style::Color,
    template::TemplateCache,
    text::{MonoTypesetter, Typesetter},
    tree::Tree,
};

/// What happened during a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameReport {
    /// Time spent building the tree, excluding layout.
    pub build_time: Duration,
    /// Was the tree rebuilt?
    pub rebuilt: bool,
    /// Number of handlers invoked.
    pub events: usize,
}

/// Drives a root component frame by frame. Holds the published tree, which
/// is replaced wholesale by each successful build.
pub struct Driver {
    /// The root component.
    root: ComponentRef,
    /// Configuration.
    config: Config,
    /// The published tree.
    tree: Tree,
    /// Parsed templates, shared across builds.
    templates: TemplateCache,
    /// Layout engine.
    layout: Box<dyn Layout>,
    /// Text measurement and drawing.
    typesetter: Box<dyn Typesetter>,
    /// Image cache and draw state.
    painter: Painter,
    /// Input from the previous frame.
    last_input: InputSnapshot,
    /// Tree-wide debug flag.
    debug: bool,
}

impl Driver {
    /// Build and lay out the first tree for `root`.
    pub fn new(root: ComponentRef, config: Config) -> Result<Self> {
        let mut templates = TemplateCache::default();
        let debug = config.debug;
        let tree = Builder::new(&mut templates)
            .options(BuildOptions { debug })
            .build(&root)?;
        let mut driver = Self {
            root,
            layout: Box::new(FlexLayout::new(config.font_size)),
            typesetter: Box::new(MonoTypesetter::new(config.line_height)),
            config,
            tree,
            templates,
            painter: Painter::new(),
            last_input: InputSnapshot::default(),
            debug,
        };
        driver.relayout()?;
        Ok(driver)
    }

    /// Replace the typesetter and lay the tree out again with it.
    pub fn with_typesetter(mut self, typesetter: impl Typesetter + 'static) -> Result<Self> {
        self.typesetter = Box::new(typesetter);
        self.relayout()?;
        Ok(self)
    }

    /// Replace the layout engine and lay the tree out again with it.
    pub fn with_layout(mut self, layout: impl Layout + 'static) -> Result<Self> {
        self.layout = Box::new(layout);
        self.relayout()?;
        Ok(self)
    }

    /// The published tree.
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// The root component.
    pub fn root(&self) -> &ComponentRef {
        &self.root
    }

    /// The configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Is the debug overlay on?
    pub fn debug(&self) -> bool {
        self.debug
    }

    /// The viewport size.
    pub fn viewport(&self) -> Expanse {
        Expanse::new(self.config.width, self.config.height)
    }

    /// Change the viewport size. The tree is rebuilt and laid out again.
    pub fn resize(&mut self, viewport: Expanse) -> Result<()> {
        self.config.width = viewport.w;
        self.config.height = viewport.h;
        self.rebuild(None)?;
        Ok(())
    }

    /// Run one frame against a polled input snapshot.
    ///
    /// Events are raised against the current tree and dispatched before the
    /// rebuild, so handler changes show up in the tree this frame
    /// publishes. If the build fails the error is returned and the current
    /// tree stays published.
    pub fn frame(&mut self, input: &InputSnapshot) -> Result<FrameReport> {
        let pressed = input.pressed_since(&self.last_input);
        let toggled =
            input.held(Key::Ctrl) && pressed.contains(&Key::from(self.config.debug_key));
        if toggled {
            self.debug = !self.debug;
            debug!(debug = self.debug, "toggled debug overlay");
        }

        let derived = dispatch::derive(&self.tree, input, &self.last_input);
        self.last_input = input.carry();
        let events = dispatch::dispatch(&self.tree, &derived.events)?;

        let dirty = toggled || derived.is_dirty();
        if self.config.rebuild == RebuildPolicy::OnChange && !dirty {
            return Ok(FrameReport {
                events,
                ..FrameReport::default()
            });
        }
        let build_time = self.rebuild(Some(&derived.state))?;
        Ok(FrameReport {
            build_time,
            rebuilt: true,
            events,
        })
    }

    /// Build a replacement tree, lay it out, and publish it. Returns the
    /// build time.
    fn rebuild(&mut self, state: Option<&FrameState>) -> Result<Duration> {
        let start = Instant::now();
        let mut tree = Builder::new(&mut self.templates)
            .prev(Some(&self.tree))
            .state(state)
            .options(BuildOptions { debug: self.debug })
            .build(&self.root)?;
        let elapsed = start.elapsed();
        let budget = self.config.build_budget();
        if elapsed >= budget {
            warn!(?elapsed, ?budget, nodes = tree.len(), "build exceeded time budget");
        }
        let viewport = self.viewport();
        self.layout
            .layout(&mut tree, viewport, &mut *self.typesetter)?;
        self.tree = tree;
        Ok(elapsed)
    }

    /// Lay out the published tree again. Only used before the tree has
    /// been handed out, at construction and when a collaborator changes.
    fn relayout(&mut self) -> Result<()> {
        let viewport = self.viewport();
        self.layout
            .layout(&mut self.tree, viewport, &mut *self.typesetter)
    }

    /// Paint the published tree onto `canvas`.
    pub fn paint(&mut self, canvas: &mut Canvas) -> Result<()> {
        self.painter.paint(
            &self.tree,
            &mut *self.typesetter,
            canvas,
            self.config.font_size,
        )
    }

    /// Paint the published tree onto a fresh white canvas the size of the
    /// viewport.
    pub fn snapshot(&mut self) -> Result<Canvas> {
        let v = self.viewport();
        let mut canvas = Canvas::from_pixel(v.w, v.h, Color::WHITE.into());
        self.paint(&mut canvas)?;
        Ok(canvas)
    }
}
