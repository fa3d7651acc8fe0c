//! Drive a component without a window: replay a script of input steps and
//! write a PNG snapshot after each one.

use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{Context, Result, anyhow, bail};
use arbor::{ComponentRef, Config, Driver, Key, NodeId, testing::Harness, text::FontTypesetter};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// CLI flags shared by the headless demos.
#[derive(Parser, Debug, Default)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// TOML file with driver configuration.
    #[clap(long)]
    pub config: Option<PathBuf>,
    /// Viewport width, overriding the configuration.
    #[clap(long)]
    pub width: Option<u32>,
    /// Viewport height, overriding the configuration.
    #[clap(long)]
    pub height: Option<u32>,
    /// Start with the debug overlay on.
    #[clap(long)]
    pub debug: bool,
    /// A TrueType font. Without one, glyphs are drawn as boxes.
    #[clap(long)]
    pub font: Option<PathBuf>,
    /// Directory for snapshots.
    #[clap(short, long, default_value = "snapshots")]
    pub out: PathBuf,
    /// Print a dump of the tree after each step.
    #[clap(long)]
    pub dump: bool,
    /// Input steps: frame, click:<id>, hover:<id>, type:<text>, key:<key>,
    /// wheel:<lines>, debug.
    pub steps: Vec<Step>,
}

/// One step of scripted input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Run a frame with no new input.
    Frame,
    /// Click a node, named by `id` attribute or declared tag.
    Click(String),
    /// Move the pointer over a node.
    Hover(String),
    /// Type text into the focused input.
    Type(String),
    /// Press and release a key.
    Key(Key),
    /// Scroll the wheel.
    Wheel(i32),
    /// Toggle the debug overlay.
    Debug,
}

/// Parse a key name: a single character, or one of the named keys.
fn parse_key(s: &str) -> Result<Key> {
    let mut chars = s.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Ok(Key::from(c));
    }
    Ok(match s.to_lowercase().as_str() {
        "backspace" => Key::Backspace,
        "delete" | "del" => Key::Delete,
        "enter" | "return" => Key::Enter,
        "tab" => Key::Tab,
        "esc" | "escape" => Key::Esc,
        "left" => Key::Left,
        "right" => Key::Right,
        "up" => Key::Up,
        "down" => Key::Down,
        "home" => Key::Home,
        "end" => Key::End,
        "space" => Key::Char(' '),
        other => bail!("unknown key {other:?}"),
    })
}

impl FromStr for Step {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (verb, arg) = match s.split_once(':') {
            Some((verb, arg)) => (verb, Some(arg)),
            None => (s, None),
        };
        let arg = || arg.ok_or_else(|| anyhow!("step {verb:?} needs an argument"));
        Ok(match verb {
            "frame" => Self::Frame,
            "debug" => Self::Debug,
            "click" => Self::Click(arg()?.into()),
            "hover" => Self::Hover(arg()?.into()),
            "type" => Self::Type(arg()?.into()),
            "key" => Self::Key(parse_key(arg()?)?),
            "wheel" => Self::Wheel(
                arg()?
                    .parse()
                    .with_context(|| format!("invalid wheel step {s:?}"))?,
            ),
            other => bail!("unknown step {other:?}"),
        })
    }
}

impl Args {
    /// Load the configuration file, if any, and apply flag overrides.
    pub fn load_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                parse_config(&text)?
            }
            None => Config::default(),
        };
        if let Some(w) = self.width {
            config.width = w;
        }
        if let Some(h) = self.height {
            config.height = h;
        }
        config.debug |= self.debug;
        Ok(config)
    }
}

/// Parse driver configuration from TOML.
pub fn parse_config(text: &str) -> Result<Config> {
    toml::from_str(text).context("parsing configuration")
}

/// Install a log subscriber filtered by `RUST_LOG`, defaulting to `info`.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Find a node by `id` attribute, falling back to its declared tag.
fn target(h: &Harness, name: &str) -> Result<NodeId> {
    h.tree()
        .find_id(name)
        .or_else(|| h.tree().find_source(name))
        .ok_or_else(|| anyhow!("no node named {name:?}"))
}

/// Apply one step to the harness.
pub fn apply(h: &mut Harness, step: &Step) -> Result<usize> {
    Ok(match step {
        Step::Frame => h.frame()?.events,
        Step::Click(name) => {
            let id = target(h, name)?;
            h.click_node(id)?
        }
        Step::Hover(name) => {
            let p = h.center(target(h, name)?)?;
            h.hover(p.x, p.y)?.events
        }
        Step::Type(text) => h.type_text(text)?,
        Step::Key(k) => h.key(*k)?,
        Step::Wheel(lines) => h.wheel(*lines)?,
        Step::Debug => {
            h.toggle_debug()?;
            0
        }
    })
}

/// Write a snapshot of the current tree to `path`.
fn snapshot(h: &mut Harness, path: &Path) -> Result<()> {
    let img = h.driver.snapshot()?;
    img.save(path)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// Build a harness for `root` and replay the steps in `args`, writing
/// `000.png` for the initial frame and one numbered snapshot per step.
pub fn run(root: ComponentRef, args: &Args) -> Result<Harness> {
    let config = args.load_config()?;
    let mut driver = Driver::new(root, config.clone())?;
    if let Some(path) = &args.font {
        let data = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        let ts = FontTypesetter::from_bytes(data, config.glyph_cache_capacity, config.line_height)?;
        driver = driver.with_typesetter(ts)?;
    }
    let mut h = Harness::from_driver(driver);
    fs::create_dir_all(&args.out)
        .with_context(|| format!("creating {}", args.out.display()))?;

    snapshot(&mut h, &args.out.join("000.png"))?;
    for (i, step) in args.steps.iter().enumerate() {
        let events = apply(&mut h, step)?;
        let path = args.out.join(format!("{:03}.png", i + 1));
        snapshot(&mut h, &path)?;
        info!(?step, events, path = %path.display(), "step");
        if args.dump {
            print!("{}", h.dump()?);
        }
    }
    Ok(h)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn steps() {
        assert_eq!("frame".parse::<Step>().unwrap(), Step::Frame);
        assert_eq!(
            "click:next".parse::<Step>().unwrap(),
            Step::Click("next".into())
        );
        assert_eq!(
            "type:a:b".parse::<Step>().unwrap(),
            Step::Type("a:b".into())
        );
        assert_eq!(
            "key:Backspace".parse::<Step>().unwrap(),
            Step::Key(Key::Backspace)
        );
        assert_eq!("key:Q".parse::<Step>().unwrap(), Step::Key(Key::Char('q')));
        assert_eq!("wheel:-3".parse::<Step>().unwrap(), Step::Wheel(-3));
        assert!("wheel:x".parse::<Step>().is_err());
        assert!("click".parse::<Step>().is_err());
        assert!("jump:1".parse::<Step>().is_err());
        assert!("key:hyper".parse::<Step>().is_err());
    }

    #[test]
    fn config_overrides() {
        let c = parse_config("width = 200\nrebuild = \"on-change\"\n").unwrap();
        assert_eq!(c.width, 200);
        assert_eq!(c.height, 480);
        assert_eq!(c.rebuild, arbor::RebuildPolicy::OnChange);
        assert!(parse_config("width = \"wide\"").is_err());

        let args = Args {
            height: Some(100),
            debug: true,
            ..Args::default()
        };
        let c = args.load_config().unwrap();
        assert_eq!((c.width, c.height, c.debug), (640, 100, true));
    }
}
